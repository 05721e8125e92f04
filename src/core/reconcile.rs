use crate::core::seen_store::SeenSet;
use crate::models::ListingRecord;

/// Outcome of merging one run's candidates into the seen-set.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// New records in discovery order.
    pub new_records: Vec<ListingRecord>,
    pub seen: SeenSet,
}

impl Reconciliation {
    pub fn has_new(&self) -> bool {
        !self.new_records.is_empty()
    }
}

/// Splits `candidates` into already-seen and new. A record is new the first
/// time its identity appears; later duplicates in the same stream are dropped.
pub fn reconcile<I>(candidates: I, mut seen: SeenSet) -> Reconciliation
where
    I: IntoIterator<Item = ListingRecord>,
{
    let mut new_records = Vec::new();

    for candidate in candidates {
        if seen.insert(candidate.identity()) {
            tracing::info!(identity = candidate.identity(), "New ad found: {}", candidate.title());
            new_records.push(candidate);
        }
    }

    Reconciliation { new_records, seen }
}
