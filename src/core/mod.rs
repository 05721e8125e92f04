pub mod coordinator;
pub mod notifier;
pub mod reconcile;
pub mod seen_store;

pub use coordinator::{RunCoordinator, RunSummary, run_once, watch};
pub use notifier::{DeliveryReport, Notifier};
pub use reconcile::{Reconciliation, reconcile};
pub use seen_store::{SeenSet, SeenStore};
