use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::config::ScraperConfig;
use crate::models::{AttributeRule, ListingRecord, NOT_AVAILABLE, SourceConfig};
use crate::plugins::traits::ListingSource;
use crate::scraper::{PageElement, RenderSession};
use crate::utils::error::AppError;

/// Why an item container did not become a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingIdentity,
    MissingTitle,
    MissingLink,
    FilteredOut,
    Unreadable(String),
}

impl From<anyhow::Error> for SkipReason {
    fn from(err: anyhow::Error) -> Self {
        SkipReason::Unreadable(err.to_string())
    }
}

struct CompiledRule {
    selector: Option<String>,
    attribute: String,
    pattern: Option<Regex>,
}

impl CompiledRule {
    fn compile(rule: &AttributeRule) -> Result<Self, AppError> {
        let pattern = rule
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| AppError::Validation(format!("Invalid identity pattern: {}", e)))?;

        Ok(Self {
            selector: rule.selector.clone(),
            attribute: rule.attribute.clone(),
            pattern,
        })
    }

    fn apply(&self, item: &dyn PageElement) -> Result<Option<String>, SkipReason> {
        let raw = match &self.selector {
            Some(selector) => match item.query_one(selector)? {
                Some(element) => element.attribute(&self.attribute)?,
                None => None,
            },
            None => item.attribute(&self.attribute)?,
        };

        let Some(raw) = raw else {
            return Ok(None);
        };

        let id = match &self.pattern {
            Some(pattern) => pattern.captures(&raw).and_then(|caps| {
                caps.get(1)
                    .or_else(|| caps.get(0))
                    .map(|m| m.as_str().to_string())
            }),
            None => Some(raw),
        };

        Ok(id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()))
    }
}

/// A listing source described entirely by selectors: where the items are,
/// where each field lives inside an item, and how to derive its identity.
pub struct SelectorSource {
    config: SourceConfig,
    base_url: Url,
    item_selector: String,
    primary: CompiledRule,
    fallback: Option<CompiledRule>,
    filter_terms: Vec<String>,
    navigation_timeout: Duration,
    ready_timeout: Duration,
    consent_timeout: Duration,
    screenshot_dir: PathBuf,
}

impl SelectorSource {
    pub fn new(config: SourceConfig, scraper: &ScraperConfig) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| AppError::Validation(format!("Invalid URL for '{}': {}", config.tag, e)))?;
        let primary = CompiledRule::compile(&config.identity.primary)?;
        let fallback = config
            .identity
            .fallback
            .as_ref()
            .map(CompiledRule::compile)
            .transpose()?;
        let filter_terms = config
            .filter
            .as_ref()
            .map(|f| f.contains.iter().map(|term| term.to_lowercase()).collect())
            .unwrap_or_default();

        Ok(Self {
            item_selector: config.item_selector(),
            base_url,
            primary,
            fallback,
            filter_terms,
            navigation_timeout: scraper.navigation_timeout(),
            ready_timeout: scraper.ready_timeout(),
            consent_timeout: scraper.consent_timeout(),
            screenshot_dir: scraper.screenshot_dir.clone(),
            config,
        })
    }

    fn try_extract(
        &self,
        session: &dyn RenderSession,
        records: &mut Vec<ListingRecord>,
    ) -> Result<(), AppError> {
        session
            .navigate(&self.config.url, self.navigation_timeout)
            .map_err(|e| AppError::Rendering(e.to_string()))?;
        session
            .wait_for(&self.config.ready_selector, self.ready_timeout)
            .map_err(|e| AppError::Rendering(e.to_string()))?;

        self.dismiss_consent(session);

        let items = session
            .query_all(&self.item_selector)
            .map_err(|e| AppError::Extraction(e.to_string()))?;
        tracing::debug!(source = %self.config.tag, "{} item containers", items.len());

        for (position, item) in items.iter().enumerate() {
            match self.extract_item(item.as_ref()) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    tracing::debug!(source = %self.config.tag, position, ?reason, "Skipping item");
                }
            }
        }

        Ok(())
    }

    /// Clicks the first visible consent button, if any. Absence of an
    /// overlay is the normal case.
    fn dismiss_consent(&self, session: &dyn RenderSession) {
        for selector in &self.config.consent_selectors {
            let button = match session.query_one(selector) {
                Ok(Some(button)) => button,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!("Consent selector '{}' failed: {}", selector, e);
                    continue;
                }
            };

            if !button.is_visible(self.consent_timeout) {
                continue;
            }

            match button.click() {
                Ok(()) => {
                    tracing::info!(source = %self.config.tag, "Dismissed consent overlay via '{}'", selector);
                    return;
                }
                Err(e) => tracing::debug!("Clicking consent button '{}' failed: {}", selector, e),
            }
        }
    }

    /// Turns one item container into a record, or explains why not.
    pub fn extract_item(&self, item: &dyn PageElement) -> Result<ListingRecord, SkipReason> {
        let local_id = match self.primary.apply(item)? {
            Some(id) => id,
            None => match &self.fallback {
                Some(fallback) => fallback.apply(item)?.ok_or(SkipReason::MissingIdentity)?,
                None => return Err(SkipReason::MissingIdentity),
            },
        };

        let title = item
            .query_one(&self.config.title_selector)?
            .map(|element| element.text())
            .transpose()?
            .filter(|title| !title.is_empty() && title != NOT_AVAILABLE)
            .ok_or(SkipReason::MissingTitle)?;

        let href = item
            .query_one(self.config.link_selector())?
            .map(|element| element.attribute(&self.config.link_attribute))
            .transpose()?
            .flatten()
            .filter(|href| !href.trim().is_empty())
            .ok_or(SkipReason::MissingLink)?;
        let link = self.resolve_link(&href).ok_or(SkipReason::MissingLink)?;

        if !self.matches_filter(item)? {
            return Err(SkipReason::FilteredOut);
        }

        ListingRecord::new(&self.config.tag, &local_id, title, self.price(item), link)
            .map_err(|_| SkipReason::MissingIdentity)
    }

    fn price(&self, item: &dyn PageElement) -> String {
        let Some(selector) = &self.config.price_selector else {
            return NOT_AVAILABLE.to_string();
        };

        match item.query_one(selector) {
            Ok(Some(element)) => element
                .text()
                .ok()
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            _ => NOT_AVAILABLE.to_string(),
        }
    }

    fn matches_filter(&self, item: &dyn PageElement) -> Result<bool, SkipReason> {
        let Some(filter) = &self.config.filter else {
            return Ok(true);
        };

        let text = match item.query_one(&filter.selector)? {
            Some(element) => element.text()?.to_lowercase(),
            None => return Ok(false),
        };

        Ok(self.filter_terms.iter().any(|term| text.contains(term.as_str())))
    }

    fn resolve_link(&self, href: &str) -> Option<String> {
        self.base_url.join(href.trim()).ok().map(String::from)
    }

    fn capture_failure(&self, session: &dyn RenderSession) {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let path = self
            .screenshot_dir
            .join(format!("error_{}_{}.png", self.config.tag, timestamp));

        match session.screenshot(&path) {
            Ok(()) => tracing::info!(source = %self.config.tag, "Saved page capture to {}", path.display()),
            Err(e) => tracing::warn!(source = %self.config.tag, "Could not capture page state: {}", e),
        }
    }
}

impl ListingSource for SelectorSource {
    fn tag(&self) -> &str {
        &self.config.tag
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn extract(&self, session: &dyn RenderSession) -> Vec<ListingRecord> {
        tracing::info!(source = %self.config.tag, "Scraping {}...", self.config.name);

        let mut records = Vec::new();
        if let Err(e) = self.try_extract(session, &mut records) {
            tracing::error!(
                source = %self.config.tag,
                url = %self.config.url,
                collected = records.len(),
                "Error scraping {}: {}",
                self.config.name,
                e
            );
            self.capture_failure(session);
        }

        tracing::info!(source = %self.config.tag, "Found {} ads on {}.", records.len(), self.config.name);
        records
    }
}
