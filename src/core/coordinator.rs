use std::time::{Duration, Instant};

use crate::config::{AppConfig, TelegramCredentials};
use crate::core::notifier::{DeliveryReport, Notifier};
use crate::core::reconcile::reconcile;
use crate::core::seen_store::SeenStore;
use crate::plugins::notifiers::TelegramNotifier;
use crate::plugins::sources::build_sources;
use crate::plugins::traits::ListingSource;
use crate::scraper::{ChromeSession, RenderSession};
use crate::utils::delay::DelayRange;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub new_records: usize,
    pub delivery: DeliveryReport,
    pub persisted: bool,
}

/// Runs the pipeline once: load state, extract every source in order,
/// reconcile, notify, persist.
pub struct RunCoordinator {
    sources: Vec<Box<dyn ListingSource>>,
    store: SeenStore,
    notifier: Notifier,
    source_delay: DelayRange,
}

impl RunCoordinator {
    pub fn new(
        sources: Vec<Box<dyn ListingSource>>,
        store: SeenStore,
        notifier: Notifier,
        source_delay: DelayRange,
    ) -> Self {
        Self {
            sources,
            store,
            notifier,
            source_delay,
        }
    }

    /// Without credentials the run still extracts and persists, but sends
    /// nothing.
    pub fn from_config(
        config: &AppConfig,
        credentials: Option<&TelegramCredentials>,
    ) -> Result<Self, AppError> {
        let sources = build_sources(&config.sources, &config.scraper)?;
        let notifier = match credentials {
            Some(credentials) => {
                let transport = TelegramNotifier::new(credentials, &config.telegram)?;
                Notifier::new(Box::new(transport), config.telegram.delivery_delay)
            }
            None => Notifier::disabled(),
        };

        Ok(Self::new(
            sources,
            SeenStore::new(&config.state.path),
            notifier,
            config.run.source_delay,
        ))
    }

    /// Only a persistence failure is returned as an error; source and
    /// delivery failures are absorbed and show up in the summary.
    pub async fn run(&self, session: &dyn RenderSession) -> Result<RunSummary, AppError> {
        let started = Instant::now();
        tracing::info!("=== Run started ({} sources) ===", self.sources.len());

        let seen = self.store.load();

        let mut candidates = Vec::new();
        for (index, source) in self.sources.iter().enumerate() {
            if index > 0 {
                self.source_delay.pause().await;
            }
            let records = source.extract(session);
            tracing::debug!(source = source.tag(), "{} candidates", records.len());
            candidates.extend(records);
        }

        let mut summary = RunSummary {
            candidates: candidates.len(),
            ..RunSummary::default()
        };

        let result = reconcile(candidates, seen);
        summary.new_records = result.new_records.len();

        let mut saved = Ok(());
        if result.has_new() {
            summary.delivery = self.notifier.notify(&result.new_records).await;

            saved = self.store.save(&result.seen);
            match &saved {
                Ok(()) => summary.persisted = true,
                Err(e) => {
                    tracing::error!("Could not persist seen ads, next run will notify duplicates: {}", e)
                }
            }
        } else {
            tracing::info!("No new ads found.");
        }

        log_finished(&summary, started);
        saved.map(|()| summary)
    }
}

fn log_finished(summary: &RunSummary, started: Instant) {
    tracing::info!(
        candidates = summary.candidates,
        new = summary.new_records,
        delivered = summary.delivery.delivered,
        failed = summary.delivery.failed,
        persisted = summary.persisted,
        "=== Run finished in {:.1}s ===",
        started.elapsed().as_secs_f64()
    );
}

/// One production run: checks credentials before touching the network,
/// then drives a fresh headless browser that is closed when the run ends.
pub async fn run_once(config: &AppConfig) -> Result<RunSummary, AppError> {
    let credentials = config.telegram.credentials()?;
    let coordinator = RunCoordinator::from_config(config, Some(&credentials))?;

    let session = ChromeSession::launch(&config.scraper)
        .map_err(|e| AppError::Rendering(format!("Could not start browser: {}", e)))?;

    coordinator.run(&session).await
}

/// Runs `run_once` on every tick until the process is stopped. Missing
/// credentials end the loop before the first run; any other run error is
/// logged and the next tick tries again.
pub async fn watch(config: &AppConfig, interval: Duration) -> Result<(), AppError> {
    config.telegram.credentials()?;

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match run_once(config).await {
            Err(e @ AppError::Configuration(_)) => return Err(e),
            Err(e) => tracing::error!("Run failed: {}", e),
            Ok(_) => {}
        }
    }
}
