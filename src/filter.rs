//! Interactive policy filtering.
//!
//! Filter values are matched against the exact strings produced by the
//! extraction module, so a value picked from a graph node always matches the
//! policies that produced it.

use serde::{Deserialize, Serialize};

use crate::extraction::{extract_field_values, FieldValueSets};
use crate::policy::{Policy, PolicyState};
use crate::taxonomy::FieldName;

use crate::policy::wire_enum;

wire_enum! {
    /// How multiple filter rows combine.
    FilterOperator {
        And => "AND",
        Or => "OR",
    }
}

impl Default for FilterOperator {
    fn default() -> Self {
        FilterOperator::And
    }
}

/// One filter row: a field and a formatted value.
///
/// An incomplete row (no field, or an empty value) passes every policy, so
/// half-built filters in a UI never hide anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyFilter {
    pub field: Option<FieldName>,
    pub value: String,
}

impl PolicyFilter {
    fn matches_values(&self, values: &FieldValueSets) -> bool {
        let Some(field) = self.field else { return true };
        if self.value.is_empty() {
            return true;
        }
        values
            .get(&field)
            .is_some_and(|set| set.contains(&self.value))
    }
}

/// A set of filter rows combined under one operator, with an optional
/// enablement-state pre-filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSet {
    pub filters: Vec<PolicyFilter>,
    pub operator: FilterOperator,
    pub state: Option<PolicyState>,
}

impl FilterSet {
    /// Whether a single policy passes this filter set.
    ///
    /// The state pre-filter applies first; an empty filter list then passes
    /// everything.
    pub fn matches(&self, policy: &Policy) -> bool {
        if let Some(state) = self.state {
            if policy.state != Some(state) {
                return false;
            }
        }
        if self.filters.is_empty() {
            return true;
        }
        let values = extract_field_values(policy);
        match self.operator {
            FilterOperator::And => self.filters.iter().all(|f| f.matches_values(&values)),
            FilterOperator::Or => self.filters.iter().any(|f| f.matches_values(&values)),
        }
    }

    /// Apply this filter set to a policy collection.
    pub fn apply(&self, policies: &[Policy]) -> Vec<Policy> {
        policies
            .iter()
            .filter(|policy| self.matches(policy))
            .cloned()
            .collect()
    }
}

/// Whether `value` is one of the extracted values of `field` for a policy.
pub fn policy_matches_filter(policy: &Policy, field: FieldName, value: &str) -> bool {
    extract_field_values(policy)
        .get(&field)
        .is_some_and(|set| set.contains(value))
}
