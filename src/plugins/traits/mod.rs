pub mod notifier;
pub mod source;

pub use notifier::NotifierPlugin;
pub use source::ListingSource;
