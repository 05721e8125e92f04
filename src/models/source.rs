use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

/// Where to read a local id from: an attribute of the item container (or of a
/// sub-element when `selector` is set), optionally narrowed by a regex whose
/// first capture group (or whole match) is the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeRule {
    #[serde(default)]
    pub selector: Option<String>,
    pub attribute: String,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityRule {
    pub primary: AttributeRule,
    /// Consulted only when the primary rule yields nothing. It may produce a
    /// different id for the same listing than the primary would have.
    #[serde(default)]
    pub fallback: Option<AttributeRule>,
}

/// Keeps only items whose `selector` text contains one of `contains`
/// (case-insensitive), e.g. a neighbourhood name in the location line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentFilter {
    pub selector: String,
    pub contains: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub tag: String,
    pub name: String,
    pub url: String,
    pub ready_selector: String,
    pub item_selectors: Vec<String>,
    pub identity: IdentityRule,
    pub title_selector: String,
    /// Defaults to the title element.
    #[serde(default)]
    pub link_selector: Option<String>,
    #[serde(default = "default_link_attribute")]
    pub link_attribute: String,
    #[serde(default)]
    pub price_selector: Option<String>,
    #[serde(default)]
    pub filter: Option<ContentFilter>,
    #[serde(default = "default_consent_selectors")]
    pub consent_selectors: Vec<String>,
}

fn default_link_attribute() -> String {
    "href".to_string()
}

pub fn default_consent_selectors() -> Vec<String> {
    vec![
        "#didomi-notice-agree-button".to_string(),
        "#onetrust-accept-btn-handler".to_string(),
        "button.fc-cta-consent".to_string(),
        "button[aria-label='Prihvati']".to_string(),
    ]
}

impl SourceConfig {
    /// Item containers as a single selector list.
    pub fn item_selector(&self) -> String {
        self.item_selectors.join(", ")
    }

    pub fn link_selector(&self) -> &str {
        self.link_selector.as_deref().unwrap_or(&self.title_selector)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tag.trim().is_empty() || self.tag.chars().any(char::is_whitespace) {
            return Err(format!("Invalid source tag '{}'", self.tag));
        }

        if Url::parse(&self.url).is_err() {
            return Err(format!("Source '{}' has an invalid URL: {}", self.tag, self.url));
        }

        if self.item_selectors.is_empty() {
            return Err(format!("Source '{}' has no item selectors", self.tag));
        }

        let mut selectors: Vec<&str> = vec![&self.ready_selector, &self.title_selector];
        selectors.extend(self.item_selectors.iter().map(String::as_str));
        selectors.extend(self.consent_selectors.iter().map(String::as_str));
        selectors.extend(self.link_selector.as_deref());
        selectors.extend(self.price_selector.as_deref());
        if let Some(filter) = &self.filter {
            if filter.contains.iter().all(|term| term.trim().is_empty()) {
                return Err(format!("Source '{}' has a filter with no terms", self.tag));
            }
            selectors.push(&filter.selector);
        }

        let mut rules = vec![&self.identity.primary];
        rules.extend(self.identity.fallback.as_ref());
        for rule in rules {
            selectors.extend(rule.selector.as_deref());
            if let Some(pattern) = &rule.pattern {
                Regex::new(pattern).map_err(|e| {
                    format!("Source '{}' has an invalid identity pattern: {}", self.tag, e)
                })?;
            }
        }

        for selector in selectors {
            Selector::parse(selector).map_err(|e| {
                format!("Source '{}' has an invalid selector '{}': {:?}", self.tag, selector, e)
            })?;
        }

        Ok(())
    }

    /// Built-in sources: Njuškalo and Index Oglasi rentals in Zagreb.
    pub fn defaults() -> Vec<SourceConfig> {
        vec![
            SourceConfig {
                tag: "njuskalo".to_string(),
                name: "Njuškalo".to_string(),
                url: "https://www.njuskalo.hr/iznajmljivanje-stanova/tresnjevka-jug?price%5Bmax%5D=600".to_string(),
                ready_selector: ".EntityList-item".to_string(),
                item_selectors: vec![
                    ".EntityList-item--Regular".to_string(),
                    ".EntityList-item--VauVau".to_string(),
                ],
                identity: IdentityRule {
                    primary: AttributeRule {
                        selector: None,
                        attribute: "data-id".to_string(),
                        pattern: None,
                    },
                    fallback: None,
                },
                title_selector: ".entity-title a".to_string(),
                link_selector: None,
                link_attribute: default_link_attribute(),
                price_selector: Some(".entity-price".to_string()),
                filter: None,
                consent_selectors: default_consent_selectors(),
            },
            SourceConfig {
                tag: "index".to_string(),
                name: "Index Oglasi".to_string(),
                url: "https://www.index.hr/oglasi/nekretnine/najam-stanova/grad-zagreb/pretraga?searchQuery=%257B%2522category%2522%253A%2522najam-stanova%2522%252C%2522module%2522%253A%2522nekretnine%2522%252C%2522includeCountyIds%2522%253A%255B%2522056b6c84-e6f1-433f-8bdc-9b8dbb86d6fb%2522%255D%252C%2522priceTo%2522%253A%2522600%2522%252C%2522sortOption%2522%253A4%257D".to_string(),
                ready_selector: ".OglasiRezultati-ad-card".to_string(),
                item_selectors: vec![".OglasiRezultati-ad-card".to_string()],
                identity: IdentityRule {
                    // /oglasi/stan-zagreb-60-m2/1234567
                    primary: AttributeRule {
                        selector: Some("a".to_string()),
                        attribute: "href".to_string(),
                        pattern: Some(r"/(\d+)/?$".to_string()),
                    },
                    // /oglasi/1234567/stan-zagreb-60-m2
                    fallback: Some(AttributeRule {
                        selector: Some("a".to_string()),
                        attribute: "href".to_string(),
                        pattern: Some(r"/(\d+)/[^/]+/?$".to_string()),
                    }),
                },
                title_selector: ".title".to_string(),
                link_selector: Some("a".to_string()),
                link_attribute: default_link_attribute(),
                price_selector: Some(".price".to_string()),
                filter: None,
                consent_selectors: default_consent_selectors(),
            },
        ]
    }
}
