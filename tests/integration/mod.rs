// Integration tests for Listing Watcher
// These tests drive the whole run pipeline through the public API

pub mod extraction_tests;
pub mod pipeline_tests;

use anyhow::anyhow;
use async_trait::async_trait;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use listing_watcher::config::ScraperConfig;
use listing_watcher::core::{Notifier, RunCoordinator, SeenStore};
use listing_watcher::plugins::{ListingSource, NotifierPlugin};
use listing_watcher::scraper::{PageElement, RenderSession, StaticPage};
use listing_watcher::utils::DelayRange;
use listing_watcher::{AppError, ListingRecord};

pub const NJUSKALO_HTML: &str = include_str!("../fixtures/njuskalo.html");
pub const INDEX_HTML: &str = include_str!("../fixtures/index.html");

/// Builds a record the way an adapter would for `tag` and `id`.
pub fn record(tag: &str, id: &str) -> ListingRecord {
    ListingRecord::new(
        tag,
        id,
        format!("Flat {} on {}", id, tag),
        "550 €",
        format!("https://{}.example.com/ad/{}", tag, id),
    )
    .expect("valid test record")
}

/// A source that yields a fixed list, standing in for a rendered site.
/// An empty list is what a failed adapter hands back.
pub struct FakeSource {
    tag: String,
    records: Vec<ListingRecord>,
}

impl FakeSource {
    pub fn new(tag: &str, records: Vec<ListingRecord>) -> Self {
        Self {
            tag: tag.to_string(),
            records,
        }
    }

    pub fn failing(tag: &str) -> Self {
        Self::new(tag, Vec::new())
    }
}

impl ListingSource for FakeSource {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn name(&self) -> &str {
        &self.tag
    }

    fn extract(&self, _session: &dyn RenderSession) -> Vec<ListingRecord> {
        self.records.clone()
    }
}

/// Records every delivered message. Messages containing `fail_on` are
/// rejected with a transport error instead.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub sent: Arc<Mutex<Vec<String>>>,
    fail_on: Option<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(needle: &str) -> Self {
        Self {
            sent: Arc::default(),
            fail_on: Some(needle.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierPlugin for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, text: &str) -> Result<(), AppError> {
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(AppError::Transport("429 Too Many Requests".to_string()));
            }
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Coordinator with no pacing delays, so tests run instantly.
pub fn coordinator(
    sources: Vec<Box<dyn ListingSource>>,
    state_path: &Path,
    transport: RecordingTransport,
) -> RunCoordinator {
    RunCoordinator::new(
        sources,
        SeenStore::new(state_path),
        Notifier::new(Box::new(transport), DelayRange::ZERO),
        DelayRange::ZERO,
    )
}

pub fn blank_page() -> StaticPage {
    StaticPage::new("<html><body></body></html>")
}

pub fn state_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("seen_ads.json")
}

pub fn read_state(path: &Path) -> Vec<String> {
    let raw = std::fs::read_to_string(path).expect("state file exists");
    serde_json::from_str(&raw).expect("state file is a JSON array")
}

pub fn fast_scraper_config(screenshot_dir: &Path) -> ScraperConfig {
    ScraperConfig {
        screenshot_dir: screenshot_dir.to_path_buf(),
        navigation_timeout_ms: 10,
        ready_timeout_ms: 10,
        consent_timeout_ms: 1,
        ..ScraperConfig::default()
    }
}

/// Several saved pages behind one session, picked by the URL last navigated
/// to. Unknown URLs fail navigation like an unreachable host.
pub struct RoutedPages {
    pages: Vec<(String, StaticPage)>,
    current: RefCell<Option<usize>>,
    blank: StaticPage,
}

impl RoutedPages {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: RefCell::new(None),
            blank: blank_page(),
        }
    }

    pub fn route(mut self, url: &str, html: &str) -> Self {
        self.pages.push((url.to_string(), StaticPage::new(html)));
        self
    }

    pub fn page(&self, url: &str) -> Option<&StaticPage> {
        self.pages.iter().find(|(u, _)| u == url).map(|(_, page)| page)
    }

    fn current(&self) -> &StaticPage {
        match *self.current.borrow() {
            Some(index) => &self.pages[index].1,
            None => &self.blank,
        }
    }
}

impl RenderSession for RoutedPages {
    fn navigate(&self, url: &str, timeout: Duration) -> anyhow::Result<()> {
        let index = self
            .pages
            .iter()
            .position(|(u, _)| u == url)
            .ok_or_else(|| anyhow!("net::ERR_NAME_NOT_RESOLVED at {}", url))?;
        *self.current.borrow_mut() = Some(index);
        self.pages[index].1.navigate(url, timeout)
    }

    fn wait_for(&self, selector: &str, timeout: Duration) -> anyhow::Result<()> {
        self.current().wait_for(selector, timeout)
    }

    fn query_all(&self, selector: &str) -> anyhow::Result<Vec<Box<dyn PageElement + '_>>> {
        self.current().query_all(selector)
    }

    fn query_one(&self, selector: &str) -> anyhow::Result<Option<Box<dyn PageElement + '_>>> {
        self.current().query_one(selector)
    }

    fn screenshot(&self, path: &Path) -> anyhow::Result<()> {
        self.current().screenshot(path)
    }
}
