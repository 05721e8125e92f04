use super::*;
use listing_watcher::core::{SeenSet, SeenStore};

#[tokio::test]
async fn test_first_run_notifies_everything_and_persists_in_discovery_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = state_path(&dir);
    let transport = RecordingTransport::new();

    let coordinator = coordinator(
        vec![
            Box::new(FakeSource::new("site-a", vec![record("site-a", "1")])),
            Box::new(FakeSource::new("site-b", vec![record("site-b", "9")])),
        ],
        &path,
        transport.clone(),
    );

    let summary = coordinator.run(&blank_page()).await?;

    assert_eq!(summary.candidates, 2);
    assert_eq!(summary.new_records, 2);
    assert_eq!(summary.delivery.delivered, 2);
    assert_eq!(summary.delivery.failed, 0);
    assert!(summary.persisted);

    // Oldest first: the last discovered listing is announced first
    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("https://site-b.example.com/ad/9"));
    assert!(sent[1].contains("https://site-a.example.com/ad/1"));

    assert_eq!(read_state(&path), vec!["site-a-1", "site-b-9"]);
    Ok(())
}

#[tokio::test]
async fn test_repeat_run_without_changes_is_silent_and_leaves_state_alone() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = state_path(&dir);
    SeenStore::new(&path).save(&SeenSet::from(vec![
        "site-a-1".to_string(),
        "site-b-9".to_string(),
    ]))?;
    let before = std::fs::read(&path)?;
    let modified_before = std::fs::metadata(&path)?.modified()?;

    let transport = RecordingTransport::new();
    let coordinator = coordinator(
        vec![
            Box::new(FakeSource::new("site-a", vec![record("site-a", "1")])),
            Box::new(FakeSource::new("site-b", vec![record("site-b", "9")])),
        ],
        &path,
        transport.clone(),
    );

    let summary = coordinator.run(&blank_page()).await?;

    assert_eq!(summary.new_records, 0);
    assert!(!summary.persisted);
    assert!(transport.sent().is_empty());
    assert_eq!(std::fs::read(&path)?, before);
    assert_eq!(std::fs::metadata(&path)?.modified()?, modified_before);
    Ok(())
}

#[tokio::test]
async fn test_run_with_nothing_found_does_not_create_state_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = state_path(&dir);
    let transport = RecordingTransport::new();

    let coordinator = coordinator(
        vec![
            Box::new(FakeSource::failing("site-a")),
            Box::new(FakeSource::failing("site-b")),
        ],
        &path,
        transport.clone(),
    );

    let summary = coordinator.run(&blank_page()).await?;

    assert_eq!(summary.candidates, 0);
    assert!(!summary.persisted);
    assert!(transport.sent().is_empty());
    assert!(!path.exists());
    Ok(())
}

#[tokio::test]
async fn test_failed_source_does_not_block_the_others() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = state_path(&dir);
    let transport = RecordingTransport::new();

    let coordinator = coordinator(
        vec![
            Box::new(FakeSource::failing("site-a")),
            Box::new(FakeSource::new("site-b", vec![record("site-b", "9")])),
        ],
        &path,
        transport.clone(),
    );

    let summary = coordinator.run(&blank_page()).await?;

    assert_eq!(summary.delivery.delivered, 1);
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(read_state(&path), vec!["site-b-9"]);
    Ok(())
}

#[tokio::test]
async fn test_failed_delivery_still_marks_listing_as_seen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = state_path(&dir);
    let transport = RecordingTransport::failing_on("site-b.example.com");

    let coordinator = coordinator(
        vec![
            Box::new(FakeSource::new("site-a", vec![record("site-a", "1")])),
            Box::new(FakeSource::new("site-b", vec![record("site-b", "9")])),
        ],
        &path,
        transport.clone(),
    );

    let summary = coordinator.run(&blank_page()).await?;

    assert_eq!(summary.delivery.delivered, 1);
    assert_eq!(summary.delivery.failed, 1);
    assert!(summary.persisted);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("site-a.example.com"));

    // No retry on the next run
    assert_eq!(read_state(&path), vec!["site-a-1", "site-b-9"]);
    Ok(())
}

#[tokio::test]
async fn test_only_unseen_listings_are_announced_and_appended() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = state_path(&dir);
    SeenStore::new(&path).save(&SeenSet::from(vec!["site-a-1".to_string()]))?;

    let transport = RecordingTransport::new();
    let coordinator = coordinator(
        vec![Box::new(FakeSource::new(
            "site-a",
            vec![record("site-a", "2"), record("site-a", "1"), record("site-a", "2")],
        ))],
        &path,
        transport.clone(),
    );

    let summary = coordinator.run(&blank_page()).await?;

    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.new_records, 1);
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(read_state(&path), vec!["site-a-1", "site-a-2"]);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_state_is_treated_as_first_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = state_path(&dir);
    std::fs::write(&path, "[\"site-a-1\", \"site-")?;

    let transport = RecordingTransport::new();
    let coordinator = coordinator(
        vec![Box::new(FakeSource::new("site-a", vec![record("site-a", "1")]))],
        &path,
        transport.clone(),
    );

    let summary = coordinator.run(&blank_page()).await?;

    assert_eq!(summary.new_records, 1);
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(read_state(&path), vec!["site-a-1"]);
    Ok(())
}

#[tokio::test]
async fn test_unwritable_state_fails_the_run_after_notifying() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    // A regular file where the state directory should be
    let blocker = dir.path().join("state");
    std::fs::write(&blocker, "not a directory")?;
    let path = blocker.join("seen_ads.json");

    let transport = RecordingTransport::new();
    let coordinator = coordinator(
        vec![Box::new(FakeSource::new("site-a", vec![record("site-a", "1")]))],
        &path,
        transport.clone(),
    );

    let err = coordinator.run(&blank_page()).await.unwrap_err();

    assert!(matches!(err, AppError::Persistence(_)));
    assert!(err.is_fatal());
    assert_eq!(transport.sent().len(), 1);
    Ok(())
}
