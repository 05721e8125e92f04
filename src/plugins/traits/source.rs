use crate::models::ListingRecord;
use crate::scraper::RenderSession;

/// Trait for implementing listing sources (one per site)
pub trait ListingSource {
    /// Plugin metadata
    fn tag(&self) -> &str;
    fn name(&self) -> &str;

    /// Candidate records currently listed by the source, newest first.
    ///
    /// Never fails: navigation and extraction problems are logged and the
    /// result is whatever was collected before they happened.
    fn extract(&self, session: &dyn RenderSession) -> Vec<ListingRecord>;
}
