use serde::Serialize;

use crate::utils::error::AppError;

/// Placeholder for an optional field the page did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// One observed listing, normalized across sources.
///
/// Fields are private so every record goes through [`ListingRecord::new`],
/// which guarantees a non-empty, deterministic identity of the form
/// `"{source-tag}-{local-id}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRecord {
    identity: String,
    title: String,
    price: String,
    link: String,
}

impl ListingRecord {
    pub fn new(
        source_tag: &str,
        local_id: &str,
        title: impl Into<String>,
        price: impl Into<String>,
        link: impl Into<String>,
    ) -> Result<Self, AppError> {
        let source_tag = source_tag.trim();
        let local_id = local_id.trim();

        if source_tag.is_empty() {
            return Err(AppError::Validation("source tag must not be empty".into()));
        }
        if local_id.is_empty() {
            return Err(AppError::Validation(format!(
                "listing from '{}' has an empty local id",
                source_tag
            )));
        }

        let price = price.into();
        let price = if price.trim().is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            price
        };

        Ok(Self {
            identity: format!("{}-{}", source_tag, local_id),
            title: title.into(),
            price,
            link: link.into(),
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn link(&self) -> &str {
        &self.link
    }
}
