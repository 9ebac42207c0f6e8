//! "Most recent record wins" over append-only tables.
//!
//! Every tracked fact (status, PTP date, calling outcome) is stored as a log
//! of rows; the current value is the latest row per key. Records are scanned
//! in the order the data source returned them and a record replaces the
//! current winner when its timestamp is greater than or equal to the winner's,
//! so on equal timestamps the record received last wins.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};

/// A record carrying the timestamp used for latest-row selection.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Reduces `records` to the latest record per key.
pub fn latest_by_key<R, K, I, F>(records: I, key_of: F) -> HashMap<K, R>
where
    R: Timestamped,
    K: Eq + Hash,
    I: IntoIterator<Item = R>,
    F: Fn(&R) -> K,
{
    let mut latest: HashMap<K, R> = HashMap::new();
    for record in records {
        let key = key_of(&record);
        let replace = latest
            .get(&key)
            .map(|current| record.timestamp() >= current.timestamp())
            .unwrap_or(true);
        if replace {
            latest.insert(key, record);
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec {
        key: &'static str,
        value: &'static str,
        at: DateTime<Utc>,
    }

    impl Timestamped for Rec {
        fn timestamp(&self) -> DateTime<Utc> {
            self.at
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_newest_timestamp_wins_regardless_of_order() {
        let records = vec![
            Rec { key: "A", value: "new", at: at(12) },
            Rec { key: "A", value: "old", at: at(9) },
        ];
        let latest = latest_by_key(records, |r| r.key);
        assert_eq!(latest["A"].value, "new");
    }

    #[test]
    fn test_equal_timestamps_last_received_wins() {
        let records = vec![
            Rec { key: "A", value: "first", at: at(10) },
            Rec { key: "A", value: "second", at: at(10) },
        ];
        let latest = latest_by_key(records, |r| r.key);
        assert_eq!(latest["A"].value, "second");

        let reversed = vec![
            Rec { key: "A", value: "second", at: at(10) },
            Rec { key: "A", value: "first", at: at(10) },
        ];
        let latest = latest_by_key(reversed, |r| r.key);
        assert_eq!(latest["A"].value, "first");
    }

    #[test]
    fn test_keys_are_independent() {
        let records = vec![
            Rec { key: "A", value: "a", at: at(10) },
            Rec { key: "B", value: "b", at: at(8) },
        ];
        let latest = latest_by_key(records, |r| r.key);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["B"].value, "b");
    }
}
