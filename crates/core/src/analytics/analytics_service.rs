//! Collection analytics over board rows.

use log::debug;

use super::analytics_model::{CollectionSummary, GroupSummary};
use crate::board::ApplicationRow;
use crate::constants::UNASSIGNED_GROUP;
use crate::filters::{FilterDimension, Filterable};

/// Label of the overall summary.
pub const OVERALL_GROUP: &str = "All";

/// Totals across every row.
pub fn summarize(rows: &[ApplicationRow]) -> GroupSummary {
    let mut summary = GroupSummary::new(OVERALL_GROUP);
    for row in rows {
        summary.add_row(row);
    }
    summary
}

/// One summary per value of `dimension`, in first-occurrence order. Rows
/// without a value are grouped under "Unassigned".
pub fn summarize_by(rows: &[ApplicationRow], dimension: FilterDimension) -> Vec<GroupSummary> {
    let mut groups: Vec<GroupSummary> = Vec::new();
    for row in rows {
        let label = row
            .dimension_value(dimension)
            .unwrap_or_else(|| UNASSIGNED_GROUP.to_string());
        match groups.iter_mut().find(|g| g.group == label) {
            Some(group) => group.add_row(row),
            None => {
                let mut group = GroupSummary::new(&label);
                group.add_row(row);
                groups.push(group);
            }
        }
    }
    debug!(
        "Summarized {} row(s) into {} {} group(s)",
        rows.len(),
        groups.len(),
        dimension
    );
    groups
}

pub fn build_summary(rows: &[ApplicationRow], dimension: FilterDimension) -> CollectionSummary {
    CollectionSummary {
        overall: summarize(rows),
        groups: summarize_by(rows, dimension),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applications::Application;
    use crate::calling::CallingSummary;
    use crate::ptp::PtpBucket;
    use crate::status::{resolve_status, CollectionStatus, MergedStatus};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn board_row(
        id: &str,
        branch: Option<&str>,
        status: CollectionStatus,
        bucket: PtpBucket,
        emi: Decimal,
    ) -> ApplicationRow {
        let (resolved, origin) = resolve_status(None, Some(status));
        ApplicationRow {
            application: Application {
                applicant_id: id.to_string(),
                applicant_name: id.to_string(),
                branch_name: branch.map(str::to_string),
                emi_amount: Some(emi),
                ..Default::default()
            },
            status: MergedStatus {
                status: resolved,
                origin,
                field_status: None,
                collection_status: Some(status),
            },
            ptp_date: None,
            ptp_bucket: bucket,
            calling: CallingSummary::default(),
            recent_comments: Vec::new(),
        }
    }

    fn rows() -> Vec<ApplicationRow> {
        vec![
            board_row("A", Some("Pune"), CollectionStatus::Paid, PtpBucket::NoPtp, dec!(1000)),
            board_row("B", Some("Nashik"), CollectionStatus::Unpaid, PtpBucket::Overdue, dec!(2000)),
            board_row("C", Some("Pune"), CollectionStatus::PaidPendingApproval, PtpBucket::NoPtp, dec!(500)),
            board_row("D", None, CollectionStatus::PartiallyPaid, PtpBucket::Today, dec!(1500)),
        ]
    }

    #[test]
    fn test_overall_summary() {
        let overall = summarize(&rows());
        assert_eq!(overall.total, 4);
        assert_eq!(overall.emi_total, dec!(5000));
        assert_eq!(overall.collected_emi, dec!(1500));
        assert_eq!(overall.collected_count(), 2);
        assert_eq!(overall.count(CollectionStatus::Unpaid), 1);
        assert_eq!(overall.by_ptp[&PtpBucket::NoPtp], 2);
        assert_eq!(overall.collection_rate(), Some(dec!(30)));
    }

    #[test]
    fn test_groups_in_first_occurrence_order_with_unassigned() {
        let groups = summarize_by(&rows(), FilterDimension::Branch);
        let labels: Vec<&str> = groups.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(labels, vec!["Pune", "Nashik", UNASSIGNED_GROUP]);

        assert_eq!(groups[0].total, 2);
        assert_eq!(groups[0].collected_emi, dec!(1500));
        assert_eq!(groups[2].count(CollectionStatus::PartiallyPaid), 1);
    }

    #[test]
    fn test_empty_rows() {
        let summary = build_summary(&[], FilterDimension::Status);
        assert_eq!(summary.overall.total, 0);
        assert_eq!(summary.overall.collection_rate(), None);
        assert!(summary.groups.is_empty());
    }
}
