use crate::models::ListingRecord;
use crate::plugins::traits::NotifierPlugin;
use crate::utils::delay::DelayRange;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Sends one message per new listing, oldest first, pacing deliveries with a
/// randomized pause. A failed delivery is logged and skipped.
pub struct Notifier {
    transport: Option<Box<dyn NotifierPlugin>>,
    delay: DelayRange,
}

impl Notifier {
    pub fn new(transport: Box<dyn NotifierPlugin>, delay: DelayRange) -> Self {
        Self {
            transport: Some(transport),
            delay,
        }
    }

    /// A notifier without a transport; `notify` only warns.
    pub fn disabled() -> Self {
        Self {
            transport: None,
            delay: DelayRange::ZERO,
        }
    }

    /// `records` is in discovery order (newest first); delivery goes in
    /// reverse so the chat reads oldest to newest.
    pub async fn notify(&self, records: &[ListingRecord]) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        let Some(transport) = &self.transport else {
            tracing::warn!(
                "Telegram token or chat ID not set. Skipping {} notifications.",
                records.len()
            );
            return report;
        };

        tracing::info!("Found {} new ads in total. Sending notifications...", records.len());

        for (position, record) in records.iter().rev().enumerate() {
            if position > 0 {
                self.delay.pause().await;
            }

            match transport.deliver(&format_message(record)).await {
                Ok(()) => {
                    report.delivered += 1;
                    tracing::info!(
                        identity = record.identity(),
                        "Successfully sent {} notification",
                        transport.name()
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        identity = record.identity(),
                        "Error sending {} notification: {}",
                        transport.name(),
                        e
                    );
                }
            }
        }

        report
    }
}

/// Telegram legacy Markdown message for one listing.
pub fn format_message(record: &ListingRecord) -> String {
    format!(
        "*New Listing Found!*\n\n*Title:* {}\n*Price:* {}\n*Link:* [Click Here]({})",
        escape_markdown(record.title()),
        escape_markdown(record.price()),
        record.link().replace(')', "%29")
    )
}

fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
