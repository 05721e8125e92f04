use anyhow::{Result, anyhow};
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use scraper::{ElementRef, Html, Selector};
use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ScraperConfig;

/// A handle to one element on a rendered page.
pub trait PageElement {
    /// Visible text, whitespace-normalized.
    fn text(&self) -> Result<String>;
    fn attribute(&self, name: &str) -> Result<Option<String>>;
    /// First descendant matching `selector`, if any.
    fn query_one(&self, selector: &str) -> Result<Option<Box<dyn PageElement + '_>>>;
    fn click(&self) -> Result<()>;
    fn is_visible(&self, timeout: Duration) -> bool;
}

/// The browser capability the source adapters drive: one page, navigated
/// and queried sequentially.
pub trait RenderSession {
    fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;
    fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()>;
    fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement + '_>>>;
    fn query_one(&self, selector: &str) -> Result<Option<Box<dyn PageElement + '_>>>;
    /// Forensic capture of the current page state.
    fn screenshot(&self, path: &Path) -> Result<()>;
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// headless_chrome reports an empty match as an error. Only that case means
/// "absent"; anything else (closed connection, crashed tab) is passed up.
fn no_match<T>(result: Result<T>, empty: T) -> Result<T> {
    match result {
        Err(e) if e.is::<NoElementFound>() => Ok(empty),
        other => other,
    }
}

/// Headless Chrome session. The browser process lives as long as this value
/// and is killed when it is dropped.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    pub fn launch(config: &ScraperConfig) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .window_size(Some((config.viewport_width, config.viewport_height)))
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| anyhow!("Failed to create launch options: {}", e))?;

        // Set Chrome path if provided
        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        let tab = browser
            .new_tab()
            .map_err(|e| anyhow!("Failed to create tab: {}", e))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| anyhow!("Failed to set user agent: {}", e))?;

        tracing::debug!("Browser session ready");
        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

impl RenderSession for ChromeSession {
    fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        self.tab.set_default_timeout(timeout);
        self.tab
            .navigate_to(url)
            .map_err(|e| anyhow!("Navigation failed: {}", e))?
            .wait_until_navigated()
            .map_err(|e| anyhow!("Page load failed: {}", e))?;
        Ok(())
    }

    fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| anyhow!("Wait for selector '{}' failed: {}", selector, e))?;
        Ok(())
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement + '_>>> {
        let elements = no_match(self.tab.find_elements(selector), Vec::new())
            .map_err(|e| anyhow!("Query '{}' failed: {}", selector, e))?;
        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromeElement(element)) as Box<dyn PageElement + '_>)
            .collect())
    }

    fn query_one(&self, selector: &str) -> Result<Option<Box<dyn PageElement + '_>>> {
        let element = no_match(self.tab.find_element(selector).map(Some), None)
            .map_err(|e| anyhow!("Query '{}' failed: {}", selector, e))?;
        Ok(element.map(|element| Box::new(ChromeElement(element)) as Box<dyn PageElement + '_>))
    }

    fn screenshot(&self, path: &Path) -> Result<()> {
        let screenshot_data = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| anyhow!("Screenshot capture failed: {}", e))?;

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Failed to create screenshot directory: {}", e))?;
        }

        std::fs::write(path, screenshot_data)
            .map_err(|e| anyhow!("Failed to write screenshot: {}", e))?;
        Ok(())
    }
}

struct ChromeElement<'a>(Element<'a>);

impl PageElement for ChromeElement<'_> {
    fn text(&self) -> Result<String> {
        let text = self
            .0
            .get_inner_text()
            .map_err(|e| anyhow!("Failed to read element text: {}", e))?;
        Ok(normalize_whitespace(&text))
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.0
            .get_attribute_value(name)
            .map_err(|e| anyhow!("Failed to read attribute '{}': {}", name, e))
    }

    fn query_one(&self, selector: &str) -> Result<Option<Box<dyn PageElement + '_>>> {
        let element = no_match(self.0.find_element(selector).map(Some), None)
            .map_err(|e| anyhow!("Query '{}' failed: {}", selector, e))?;
        Ok(element.map(|element| Box::new(ChromeElement(element)) as Box<dyn PageElement + '_>))
    }

    fn click(&self) -> Result<()> {
        self.0
            .click()
            .map_err(|e| anyhow!("Click failed: {}", e))?;
        Ok(())
    }

    fn is_visible(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let visible = self
                .0
                .call_js_fn(
                    "function() { const r = this.getBoundingClientRect(); \
                     const s = window.getComputedStyle(this); \
                     return r.width > 0 && r.height > 0 && s.visibility !== 'hidden'; }",
                    vec![],
                    false,
                )
                .ok()
                .and_then(|object| object.value)
                .and_then(|value| value.as_bool())
                .unwrap_or(false);

            if visible {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }
}

/// A render session over a saved HTML snapshot. It has no layout engine, so
/// visibility only honours the `hidden` attribute and inline `display: none`
/// or `visibility: hidden`. Clicks are recorded but do nothing.
pub struct StaticPage {
    document: Html,
    html: String,
    navigations: RefCell<Vec<String>>,
    clicks: RefCell<Vec<String>>,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        let html = html.into();
        Self {
            document: Html::parse_document(&html),
            html,
            navigations: RefCell::new(Vec::new()),
            clicks: RefCell::new(Vec::new()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
        Ok(Self::new(html))
    }

    /// URLs passed to `navigate`, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.borrow().clone()
    }

    /// Outer HTML of every clicked element, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.clicks.borrow().clone()
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid CSS selector '{}': {:?}", selector, e))
}

impl RenderSession for StaticPage {
    fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.navigations.borrow_mut().push(url.to_string());
        Ok(())
    }

    fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<()> {
        let css = parse_selector(selector)?;
        if self.document.select(&css).next().is_some() {
            Ok(())
        } else {
            Err(anyhow!("Wait for selector '{}' failed: element not present", selector))
        }
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement + '_>>> {
        let css = parse_selector(selector)?;
        Ok(self
            .document
            .select(&css)
            .map(|element| {
                Box::new(StaticElement {
                    element,
                    clicks: &self.clicks,
                }) as Box<dyn PageElement + '_>
            })
            .collect())
    }

    fn query_one(&self, selector: &str) -> Result<Option<Box<dyn PageElement + '_>>> {
        let css = parse_selector(selector)?;
        Ok(self.document.select(&css).next().map(|element| {
            Box::new(StaticElement {
                element,
                clicks: &self.clicks,
            }) as Box<dyn PageElement + '_>
        }))
    }

    fn screenshot(&self, path: &Path) -> Result<()> {
        // No pixels to capture; the snapshot itself is the page state
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.with_extension("html"), &self.html)?;
        Ok(())
    }
}

struct StaticElement<'a> {
    element: ElementRef<'a>,
    clicks: &'a RefCell<Vec<String>>,
}

impl PageElement for StaticElement<'_> {
    fn text(&self) -> Result<String> {
        Ok(normalize_whitespace(&self.element.text().collect::<String>()))
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.element.value().attr(name).map(str::to_string))
    }

    fn query_one(&self, selector: &str) -> Result<Option<Box<dyn PageElement + '_>>> {
        let css = parse_selector(selector)?;
        Ok(self.element.select(&css).next().map(|element| {
            Box::new(StaticElement {
                element,
                clicks: self.clicks,
            }) as Box<dyn PageElement + '_>
        }))
    }

    fn click(&self) -> Result<()> {
        self.clicks.borrow_mut().push(self.element.html());
        Ok(())
    }

    fn is_visible(&self, _timeout: Duration) -> bool {
        let element = self.element.value();
        if element.attr("hidden").is_some() {
            return false;
        }
        let style: String = element
            .attr("style")
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        !(style.contains("display:none") || style.contains("visibility:hidden"))
    }
}
