pub mod traits;
pub mod sources;
pub mod notifiers;

pub use traits::{ListingSource, NotifierPlugin};
