// Listing source implementations
pub mod selector;

pub use selector::{SelectorSource, SkipReason};

use crate::config::ScraperConfig;
use crate::models::SourceConfig;
use crate::plugins::traits::ListingSource;
use crate::utils::error::AppError;

/// Builds one adapter per configured source, keeping the configured order.
pub fn build_sources(
    configs: &[SourceConfig],
    scraper: &ScraperConfig,
) -> Result<Vec<Box<dyn ListingSource>>, AppError> {
    configs
        .iter()
        .map(|config| {
            SelectorSource::new(config.clone(), scraper)
                .map(|source| Box::new(source) as Box<dyn ListingSource>)
        })
        .collect()
}
