//! Filter dimensions, criteria and outcomes.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A column the board can be filtered by.
///
/// Declaration order is the order dimensions are presented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterDimension {
    Branch,
    TeamLead,
    Rm,
    CollectionRm,
    Dealer,
    Lender,
    Status,
    PtpDate,
    RepaymentNumber,
    LastMonthBounce,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 10] = [
        FilterDimension::Branch,
        FilterDimension::TeamLead,
        FilterDimension::Rm,
        FilterDimension::CollectionRm,
        FilterDimension::Dealer,
        FilterDimension::Lender,
        FilterDimension::Status,
        FilterDimension::PtpDate,
        FilterDimension::RepaymentNumber,
        FilterDimension::LastMonthBounce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterDimension::Branch => "branch",
            FilterDimension::TeamLead => "teamLead",
            FilterDimension::Rm => "rm",
            FilterDimension::CollectionRm => "collectionRm",
            FilterDimension::Dealer => "dealer",
            FilterDimension::Lender => "lender",
            FilterDimension::Status => "status",
            FilterDimension::PtpDate => "ptpDate",
            FilterDimension::RepaymentNumber => "repaymentNumber",
            FilterDimension::LastMonthBounce => "lastMonthBounce",
        }
    }
}

impl fmt::Display for FilterDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything the filter engine can evaluate.
pub trait Filterable {
    /// The entity's value for `dimension`, or None when it has none.
    fn dimension_value(&self, dimension: FilterDimension) -> Option<String>;
}

/// Accepted values per dimension. A dimension that is absent or mapped
/// to an empty set accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterCriteria {
    selections: BTreeMap<FilterDimension, HashSet<String>>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `set`.
    pub fn with<I, S>(mut self, dimension: FilterDimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(dimension, values);
        self
    }

    pub fn set<I, S>(&mut self, dimension: FilterDimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: HashSet<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.selections.remove(&dimension);
        } else {
            self.selections.insert(dimension, values);
        }
    }

    pub fn clear(&mut self, dimension: FilterDimension) {
        self.selections.remove(&dimension);
    }

    pub fn accepted(&self, dimension: FilterDimension) -> Option<&HashSet<String>> {
        self.selections.get(&dimension).filter(|values| !values.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.selections.values().all(HashSet::is_empty)
    }

    /// True when `item` passes every criterion, ignoring `except` if given.
    pub fn matches<T: Filterable>(&self, item: &T, except: Option<FilterDimension>) -> bool {
        self.selections
            .iter()
            .filter(|(dimension, values)| Some(**dimension) != except && !values.is_empty())
            .all(|(dimension, values)| {
                item.dimension_value(*dimension)
                    .is_some_and(|value| values.contains(&value))
            })
    }
}

/// Result of `FilterEngine::apply`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOutcome<T> {
    pub filtered: Vec<T>,
    pub available_options: BTreeMap<FilterDimension, Vec<String>>,
}

impl<T> FilterOutcome<T> {
    pub fn options(&self, dimension: FilterDimension) -> &[String] {
        self.available_options
            .get(&dimension)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
