use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::board::ApplicationRow;
use crate::ptp::PtpBucket;
use crate::status::CollectionStatus;

/// Collection totals for one group of board rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group: String,
    pub total: usize,
    pub by_status: BTreeMap<CollectionStatus, usize>,
    pub by_ptp: BTreeMap<PtpBucket, usize>,
    pub emi_total: Decimal,
    pub collected_emi: Decimal,
}

impl GroupSummary {
    pub fn new(group: &str) -> Self {
        GroupSummary {
            group: group.to_string(),
            total: 0,
            by_status: CollectionStatus::ALL.iter().map(|s| (*s, 0)).collect(),
            by_ptp: PtpBucket::ALL.iter().map(|b| (*b, 0)).collect(),
            emi_total: Decimal::ZERO,
            collected_emi: Decimal::ZERO,
        }
    }

    pub fn add_row(&mut self, row: &ApplicationRow) {
        let status = row.current_status();
        let emi = row.application.emi_amount.unwrap_or(Decimal::ZERO);

        self.total += 1;
        *self.by_status.entry(status).or_insert(0) += 1;
        *self.by_ptp.entry(row.ptp_bucket).or_insert(0) += 1;
        self.emi_total += emi;
        if status.is_collected() {
            self.collected_emi += emi;
        }
    }

    pub fn count(&self, status: CollectionStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn collected_count(&self) -> usize {
        self.by_status
            .iter()
            .filter(|(status, _)| status.is_collected())
            .map(|(_, count)| count)
            .sum()
    }

    /// Collected share of the EMI total, in percent, rounded to two places.
    pub fn collection_rate(&self) -> Option<Decimal> {
        if self.emi_total.is_zero() {
            return None;
        }
        Some((self.collected_emi / self.emi_total * Decimal::ONE_HUNDRED).round_dp(2))
    }
}

/// Overall totals plus one summary per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub overall: GroupSummary,
    pub groups: Vec<GroupSummary>,
}
