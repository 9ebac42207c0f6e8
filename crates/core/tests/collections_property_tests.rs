//! Property-based integration tests for status merging, filtering and
//! latest-row selection.
//!
//! These tests verify that universal properties hold across all valid inputs,
//! using the `proptest` crate for random test case generation.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use loantrack_core::filters::{FilterCriteria, FilterDimension, FilterEngine, Filterable};
use loantrack_core::ptp::PtpBucket;
use loantrack_core::status::{resolve_status, CollectionStatus};
use loantrack_core::utils::{latest_by_key, Timestamped};
use proptest::prelude::*;

// =============================================================================
// Generators
// =============================================================================

fn arb_status() -> impl Strategy<Value = CollectionStatus> {
    prop::sample::select(CollectionStatus::ALL.to_vec())
}

fn arb_not_paid() -> impl Strategy<Value = CollectionStatus> {
    arb_status().prop_filter("collection status other than Paid", |s| {
        *s != CollectionStatus::Paid
    })
}

#[derive(Debug, Clone, PartialEq)]
struct BoardItem {
    branch: Option<String>,
    dealer: Option<String>,
    status: CollectionStatus,
}

impl Filterable for BoardItem {
    fn dimension_value(&self, dimension: FilterDimension) -> Option<String> {
        match dimension {
            FilterDimension::Branch => self.branch.clone(),
            FilterDimension::Dealer => self.dealer.clone(),
            FilterDimension::Status => Some(self.status.as_str().to_string()),
            _ => None,
        }
    }
}

fn arb_item() -> impl Strategy<Value = BoardItem> {
    (
        proptest::option::of(prop::sample::select(vec!["Pune", "Nashik", "Nagpur"])),
        proptest::option::of(prop::sample::select(vec!["Alpha Motors", "Beta Autos"])),
        arb_status(),
    )
        .prop_map(|(branch, dealer, status)| BoardItem {
            branch: branch.map(str::to_string),
            dealer: dealer.map(str::to_string),
            status,
        })
}

fn arb_criteria() -> impl Strategy<Value = FilterCriteria> {
    (
        proptest::collection::vec(prop::sample::select(vec!["Pune", "Nashik", "Nagpur"]), 0..3),
        proptest::collection::vec(arb_status(), 0..3),
    )
        .prop_map(|(branches, statuses)| {
            FilterCriteria::new()
                .with(FilterDimension::Branch, branches)
                .with(
                    FilterDimension::Status,
                    statuses.into_iter().map(|s| s.as_str().to_string()),
                )
        })
}

#[derive(Debug, Clone)]
struct LoggedValue {
    key: u8,
    value: u32,
    at: DateTime<Utc>,
}

impl Timestamped for LoggedValue {
    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }
}

fn arb_log() -> impl Strategy<Value = Vec<LoggedValue>> {
    proptest::collection::vec((0u8..5, any::<u32>(), 0i64..20), 0..40).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(key, value, minute)| LoggedValue {
                key,
                value,
                at: Utc.timestamp_opt(1_750_000_000 + minute * 60, 0).unwrap(),
            })
            .collect()
    })
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A confirmed collection payment wins over any field status.
    #[test]
    fn prop_collection_paid_always_wins(field in proptest::option::of(arb_status())) {
        let (status, _) = resolve_status(field, Some(CollectionStatus::Paid));
        prop_assert_eq!(status, CollectionStatus::Paid);
    }

    /// A field update other than Unpaid wins unless collection says Paid.
    #[test]
    fn prop_field_update_wins_over_unconfirmed_collection(
        field in arb_status().prop_filter("not Unpaid", |s| *s != CollectionStatus::Unpaid),
        collection in proptest::option::of(arb_not_paid()),
    ) {
        let (status, _) = resolve_status(Some(field), collection);
        prop_assert_eq!(status, field);
    }

    /// The merged status is always one of the inputs, or Unpaid.
    #[test]
    fn prop_merge_never_invents_a_status(
        field in proptest::option::of(arb_status()),
        collection in proptest::option::of(arb_status()),
    ) {
        let (status, _) = resolve_status(field, collection);
        prop_assert!(
            Some(status) == field || Some(status) == collection || status == CollectionStatus::Unpaid,
            "{:?} is neither input ({:?}, {:?})",
            status,
            field,
            collection
        );
    }

    /// Empty criteria keep every item, in order.
    #[test]
    fn prop_empty_criteria_is_identity(items in proptest::collection::vec(arb_item(), 0..30)) {
        let outcome = FilterEngine::apply(&items, &FilterCriteria::new());
        prop_assert_eq!(outcome.filtered, items);
    }

    /// Filtering an already filtered list changes nothing.
    #[test]
    fn prop_filtering_is_idempotent(
        items in proptest::collection::vec(arb_item(), 0..30),
        criteria in arb_criteria(),
    ) {
        let once = FilterEngine::apply(&items, &criteria).filtered;
        let twice = FilterEngine::apply(&once, &criteria).filtered;
        prop_assert_eq!(once, twice);
    }

    /// Every kept item satisfies every criterion, and its values are offered.
    #[test]
    fn prop_filtered_items_match_and_are_offered(
        items in proptest::collection::vec(arb_item(), 0..30),
        criteria in arb_criteria(),
    ) {
        let outcome = FilterEngine::apply(&items, &criteria);
        for item in &outcome.filtered {
            prop_assert!(criteria.matches(item, None));
            for dimension in [FilterDimension::Branch, FilterDimension::Dealer, FilterDimension::Status] {
                if let Some(value) = item.dimension_value(dimension) {
                    prop_assert!(outcome.options(dimension).contains(&value));
                }
            }
        }
    }

    /// Status options always follow the canonical status order.
    #[test]
    fn prop_status_options_are_canonical(items in proptest::collection::vec(arb_item(), 0..30)) {
        let outcome = FilterEngine::apply(&items, &FilterCriteria::new());
        let ranks: Vec<usize> = outcome
            .options(FilterDimension::Status)
            .iter()
            .filter_map(|label| CollectionStatus::ALL.iter().position(|s| s.as_str() == label))
            .collect();
        prop_assert!(ranks.windows(2).all(|pair| pair[0] < pair[1]));
    }

    /// Later promise dates never fall in an earlier bucket.
    #[test]
    fn prop_ptp_buckets_are_monotonic(a in 0u64..60, b in 0u64..60) {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let (early, late) = (a.min(b), a.max(b));
        let early_bucket = PtpBucket::classify(start.checked_add_days(Days::new(early)), today);
        let late_bucket = PtpBucket::classify(start.checked_add_days(Days::new(late)), today);
        prop_assert!(early_bucket <= late_bucket);
        prop_assert!(late_bucket != PtpBucket::NoPtp);
    }

    /// The winner per key carries the maximum timestamp, and among equal
    /// timestamps it is the one received last.
    #[test]
    fn prop_latest_by_key_picks_last_maximum(log in arb_log()) {
        let latest = latest_by_key(log.clone(), |entry| entry.key);
        for (key, winner) in &latest {
            let expected = log
                .iter()
                .filter(|entry| entry.key == *key)
                .fold(None::<&LoggedValue>, |best, entry| match best {
                    Some(current) if entry.at < current.at => Some(current),
                    _ => Some(entry),
                });
            prop_assert_eq!(expected.map(|e| (e.value, e.at)), Some((winner.value, winner.at)));
        }
        let keys: std::collections::HashSet<u8> = log.iter().map(|entry| entry.key).collect();
        prop_assert_eq!(latest.len(), keys.len());
    }
}
