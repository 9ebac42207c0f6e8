//! Cascading filters over board rows.
//!
//! Options for a dimension are computed over the rows that pass every
//! other criterion, so each select only offers values that would still
//! produce results.

use std::collections::{BTreeMap, HashSet};

use super::filters_model::{FilterCriteria, FilterDimension, FilterOutcome, Filterable};
use crate::ptp::PtpBucket;
use crate::status::CollectionStatus;

pub struct FilterEngine;

impl FilterEngine {
    /// Filters `items` and computes the options still available per dimension.
    pub fn apply<T>(items: &[T], criteria: &FilterCriteria) -> FilterOutcome<T>
    where
        T: Filterable + Clone,
    {
        let filtered: Vec<T> = items
            .iter()
            .filter(|item| criteria.matches(*item, None))
            .cloned()
            .collect();

        let available_options = FilterDimension::ALL
            .iter()
            .map(|dimension| (*dimension, Self::options_for(items, criteria, *dimension)))
            .collect::<BTreeMap<_, _>>();

        FilterOutcome {
            filtered,
            available_options,
        }
    }

    fn options_for<T: Filterable>(
        items: &[T],
        criteria: &FilterCriteria,
        dimension: FilterDimension,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut options: Vec<String> = items
            .iter()
            .filter(|item| criteria.matches(*item, Some(dimension)))
            .filter_map(|item| item.dimension_value(dimension))
            .filter(|value| seen.insert(value.clone()))
            .collect();

        match dimension {
            FilterDimension::Status => {
                options.sort_by_key(|label| rank(label.parse::<CollectionStatus>().ok()));
            }
            FilterDimension::PtpDate => {
                options.sort_by_key(|label| rank(PtpBucket::from_label(label)));
            }
            _ => {}
        }
        options
    }
}

/// Known values in their declared order; unknown ones after, as found.
/// Relies on `sort_by_key` being stable.
fn rank<T: Ord>(known: Option<T>) -> (bool, Option<T>) {
    (known.is_none(), known)
}
