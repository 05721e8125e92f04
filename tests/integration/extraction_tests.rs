use super::*;
use listing_watcher::models::SourceConfig;
use listing_watcher::plugins::sources::SelectorSource;

fn default_source(tag: &str) -> SourceConfig {
    SourceConfig::defaults()
        .into_iter()
        .find(|s| s.tag == tag)
        .expect("built-in source")
}

#[test]
fn test_njuskalo_listing_page() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let source = SelectorSource::new(default_source("njuskalo"), &fast_scraper_config(dir.path()))?;
    let page = StaticPage::new(NJUSKALO_HTML);

    let records = source.extract(&page);

    let ids: Vec<&str> = records.iter().map(|r| r.identity()).collect();
    assert_eq!(ids, vec!["njuskalo-41990001", "njuskalo-41990002"]);

    assert_eq!(records[0].title(), "Stan Trešnjevka jug, 45 m2");
    assert_eq!(records[0].price(), "590 €");
    assert_eq!(
        records[0].link(),
        "https://www.njuskalo.hr/nekretnine/stan-tresnjevka-jug-45-m2-oglas-41990001"
    );
    assert_eq!(records[1].price(), "N/A");

    // The cookie banner was clicked away before reading items
    assert_eq!(page.clicks().len(), 1);
    assert!(page.clicks()[0].contains("didomi-notice-agree-button"));
    Ok(())
}

#[test]
fn test_index_listing_page() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let source = SelectorSource::new(default_source("index"), &fast_scraper_config(dir.path()))?;
    let page = StaticPage::new(INDEX_HTML);

    let records = source.extract(&page);

    let ids: Vec<&str> = records.iter().map(|r| r.identity()).collect();
    // Second card only matches the id-before-slug form
    assert_eq!(ids, vec!["index-5550001", "index-5550002"]);
    assert_eq!(records[0].title(), "Stan Zagreb, Trešnjevka sjever, 60 m2");
    assert_eq!(records[1].price(), "580 €");
    assert!(page.clicks().is_empty());
    Ok(())
}

#[test]
fn test_changed_layout_yields_nothing_and_leaves_a_capture() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let source = SelectorSource::new(default_source("index"), &fast_scraper_config(dir.path()))?;
    // Njuškalo markup on the Index adapter: the ready selector never shows up
    let page = StaticPage::new(NJUSKALO_HTML);

    assert!(source.extract(&page).is_empty());

    let captures = std::fs::read_dir(dir.path())?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("error_index_"))
        .count();
    assert_eq!(captures, 1);
    Ok(())
}
