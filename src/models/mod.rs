pub mod listing;
pub mod source;

// Re-exports for convenience
pub use listing::*;
pub use source::*;
