//! Field value extraction from the canonical policy model.
//!
//! [`extract_field_values`] is the single implementation of every field
//! formatting rule. Both the graph compiler and the filter engine call it, so
//! the node values a user clicks and the filter values a user selects are
//! always the exact same strings.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::policy::{GuestsOrExternalUsers, Policy, TargetFilter};
use crate::taxonomy::FieldName;

/// Per-policy extraction result: field name to ordered set of formatted
/// string values.
pub type FieldValueSets = IndexMap<FieldName, BTreeSet<String>>;

/// Extract every configured field of a policy as formatted string values.
///
/// Pure function over an immutable policy; fields with nothing configured are
/// simply absent from the result. Does not depend on the policy code, so
/// filters work even for policies excluded from the graph.
pub fn extract_field_values(policy: &Policy) -> FieldValueSets {
    let mut values = FieldValueSets::new();

    let conditions = &policy.conditions;

    // Risk levels and client app types
    add_all(
        &mut values,
        FieldName::UserRiskLevels,
        conditions.user_risk_levels.iter().map(ToString::to_string),
    );
    add_all(
        &mut values,
        FieldName::SignInRiskLevels,
        conditions.sign_in_risk_levels.iter().map(ToString::to_string),
    );
    add_all(
        &mut values,
        FieldName::ServicePrincipalRiskLevels,
        conditions
            .service_principal_risk_levels
            .iter()
            .map(ToString::to_string),
    );
    add_all(
        &mut values,
        FieldName::ClientAppTypes,
        conditions.client_app_types.iter().map(ToString::to_string),
    );

    // Device filter: "(+) rule" | "(-) rule" | "rule"
    add_filter(
        &mut values,
        FieldName::DeviceFilter,
        conditions.devices.device_filter.as_ref(),
    );

    // Applications
    let applications = &conditions.applications;
    add_all(
        &mut values,
        FieldName::IncludeApplications,
        applications.include_applications.iter().cloned(),
    );
    add_all(
        &mut values,
        FieldName::ExcludeApplications,
        applications.exclude_applications.iter().cloned(),
    );
    add_all(
        &mut values,
        FieldName::IncludeUserActions,
        applications.include_user_actions.iter().map(ToString::to_string),
    );
    add_all(
        &mut values,
        FieldName::AuthenticationContextClassReferences,
        applications
            .include_authentication_context_class_references
            .iter()
            .cloned(),
    );
    add_filter(
        &mut values,
        FieldName::ApplicationFilter,
        applications.application_filter.as_ref(),
    );

    // Users
    let users = &conditions.users;
    add_all(&mut values, FieldName::IncludeUsers, users.include_users.iter().cloned());
    add_all(&mut values, FieldName::ExcludeUsers, users.exclude_users.iter().cloned());
    add_all(&mut values, FieldName::IncludeGroups, users.include_groups.iter().cloned());
    add_all(&mut values, FieldName::ExcludeGroups, users.exclude_groups.iter().cloned());
    add_all(&mut values, FieldName::IncludeRoles, users.include_roles.iter().cloned());
    add_all(&mut values, FieldName::ExcludeRoles, users.exclude_roles.iter().cloned());
    add_guests(
        &mut values,
        FieldName::IncludeGuestsOrExternalUsers,
        users.include_guests_or_external_users.as_ref(),
    );
    add_guests(
        &mut values,
        FieldName::ExcludeGuestsOrExternalUsers,
        users.exclude_guests_or_external_users.as_ref(),
    );

    // Platforms and locations
    add_all(
        &mut values,
        FieldName::IncludePlatforms,
        conditions.platforms.include_platforms.iter().map(ToString::to_string),
    );
    add_all(
        &mut values,
        FieldName::ExcludePlatforms,
        conditions.platforms.exclude_platforms.iter().map(ToString::to_string),
    );
    add_all(
        &mut values,
        FieldName::IncludeLocations,
        conditions.locations.include_locations.iter().cloned(),
    );
    add_all(
        &mut values,
        FieldName::ExcludeLocations,
        conditions.locations.exclude_locations.iter().cloned(),
    );

    // Client applications
    let client_applications = &conditions.client_applications;
    add_all(
        &mut values,
        FieldName::IncludeServicePrincipals,
        client_applications.include_service_principals.iter().cloned(),
    );
    add_all(
        &mut values,
        FieldName::ExcludeServicePrincipals,
        client_applications.exclude_service_principals.iter().cloned(),
    );
    add_filter(
        &mut values,
        FieldName::ServicePrincipalFilter,
        client_applications.service_principal_filter.as_ref(),
    );

    // Authentication flows
    add_all(
        &mut values,
        FieldName::TransferMethods,
        conditions.authentication_flows.transfer_methods.iter().cloned(),
    );

    // Session controls
    let session = &policy.session_controls;
    if let Some(disabled) = session.disable_resilience_defaults {
        add(&mut values, FieldName::DisableResilienceDefaults, disabled.to_string());
    }
    if let Some(enabled) = session.application_enforced_restrictions {
        add(
            &mut values,
            FieldName::ApplicationEnforcedRestrictions,
            enabled.to_string(),
        );
    }
    if let Some(security) = session.cloud_app_security {
        add(&mut values, FieldName::CloudAppSecurity, security.to_string());
    }
    if let Some(frequency) = &session.sign_in_frequency {
        use crate::policy::SignInFrequencyInterval as Interval;
        match frequency.frequency_interval {
            Some(Interval::EveryTime) => {
                add(&mut values, FieldName::SignInFrequency, "Every Time".to_string());
            }
            Some(Interval::TimeBased) => {
                if let (Some(value), Some(unit)) = (frequency.value, frequency.frequency_type) {
                    add(
                        &mut values,
                        FieldName::SignInFrequency,
                        format!("{} {}", value, unit),
                    );
                }
            }
            _ => {}
        }
    }
    if let Some(mode) = session.persistent_browser {
        add(&mut values, FieldName::PersistentBrowser, mode.to_string());
    }

    // Grant controls: prefix with the operator only when more than one
    // built-in control is combined.
    let grant = &policy.grant_controls;
    if !grant.built_in_controls.is_empty() {
        match grant.operator {
            Some(operator) if grant.built_in_controls.len() > 1 => {
                add_all(
                    &mut values,
                    FieldName::BuiltInControls,
                    grant
                        .built_in_controls
                        .iter()
                        .map(|control| format!("({}) {}", operator, control)),
                );
            }
            _ => {
                add_all(
                    &mut values,
                    FieldName::BuiltInControls,
                    grant.built_in_controls.iter().map(ToString::to_string),
                );
            }
        }
    }
    add_all(
        &mut values,
        FieldName::CustomAuthenticationFactor,
        grant.custom_authentication_factors.iter().cloned(),
    );
    add_all(&mut values, FieldName::TermsOfUse, grant.terms_of_use.iter().cloned());

    values
}

/// Aggregate every extracted value per field across a policy collection,
/// sorted and deduplicated. Feeds filter pickers.
pub fn aggregate_field_values(policies: &[Policy]) -> IndexMap<FieldName, Vec<String>> {
    let mut aggregate: IndexMap<FieldName, BTreeSet<String>> = IndexMap::new();

    for policy in policies {
        for (field, values) in extract_field_values(policy) {
            aggregate.entry(field).or_default().extend(values);
        }
    }

    aggregate
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(field, values)| (field, values.into_iter().collect()))
        .collect()
}

fn add(values: &mut FieldValueSets, field: FieldName, value: String) {
    if value.is_empty() {
        return;
    }
    values.entry(field).or_default().insert(value);
}

fn add_all(values: &mut FieldValueSets, field: FieldName, items: impl Iterator<Item = String>) {
    for item in items {
        add(values, field, item);
    }
}

fn add_filter(values: &mut FieldValueSets, field: FieldName, filter: Option<&TargetFilter>) {
    use crate::policy::FilterMode;
    let Some(filter) = filter else { return };
    let Some(rule) = filter.rule.as_deref().filter(|rule| !rule.is_empty()) else {
        return;
    };
    let formatted = match filter.mode {
        Some(FilterMode::Include) => format!("(+) {}", rule),
        Some(FilterMode::Exclude) => format!("(-) {}", rule),
        None => rule.to_string(),
    };
    add(values, field, formatted);
}

fn add_guests(
    values: &mut FieldValueSets,
    field: FieldName,
    guests: Option<&GuestsOrExternalUsers>,
) {
    let Some(guests) = guests else { return };
    if guests.guest_or_external_user_types.is_empty() {
        return;
    }
    if guests.external_tenants.is_empty() {
        for guest_type in &guests.guest_or_external_user_types {
            add(values, field, guest_type.to_string());
        }
    } else {
        for guest_type in &guests.guest_or_external_user_types {
            for tenant in &guests.external_tenants {
                add(values, field, format!("{} - {}", guest_type, tenant));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{
        BuiltInGrantControl, FilterMode, GrantOperator, GuestOrExternalUserType, RiskLevel,
        SignInFrequency, SignInFrequencyInterval, SignInFrequencyType,
    };

    fn values_for(policy: &Policy, field: FieldName) -> Vec<String> {
        extract_field_values(policy)
            .get(&field)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_empty_policy_extracts_nothing() {
        assert!(extract_field_values(&Policy::default()).is_empty());
    }

    #[test]
    fn test_plain_list_fields_use_wire_tokens() {
        let mut policy = Policy::default();
        policy.conditions.user_risk_levels = vec![RiskLevel::High, RiskLevel::Low];
        assert_eq!(
            values_for(&policy, FieldName::UserRiskLevels),
            vec!["high".to_string(), "low".to_string()]
        );
    }

    #[test]
    fn test_single_built_in_control_is_unprefixed() {
        let mut policy = Policy::default();
        policy.grant_controls.built_in_controls = vec![BuiltInGrantControl::Mfa];
        policy.grant_controls.operator = Some(GrantOperator::Or);
        assert_eq!(values_for(&policy, FieldName::BuiltInControls), vec!["mfa".to_string()]);
    }

    #[test]
    fn test_multiple_built_in_controls_carry_operator_prefix() {
        let mut policy = Policy::default();
        policy.grant_controls.built_in_controls =
            vec![BuiltInGrantControl::Mfa, BuiltInGrantControl::CompliantDevice];
        policy.grant_controls.operator = Some(GrantOperator::Or);
        assert_eq!(
            values_for(&policy, FieldName::BuiltInControls),
            vec!["(OR) compliantDevice".to_string(), "(OR) mfa".to_string()]
        );
    }

    #[test]
    fn test_multiple_controls_without_operator_stay_unprefixed() {
        let mut policy = Policy::default();
        policy.grant_controls.built_in_controls =
            vec![BuiltInGrantControl::Mfa, BuiltInGrantControl::Block];
        assert_eq!(
            values_for(&policy, FieldName::BuiltInControls),
            vec!["block".to_string(), "mfa".to_string()]
        );
    }

    #[test]
    fn test_guest_types_cross_external_tenants() {
        let mut policy = Policy::default();
        policy.conditions.users.include_guests_or_external_users = Some(GuestsOrExternalUsers {
            guest_or_external_user_types: vec![GuestOrExternalUserType::InternalGuest],
            external_tenants: vec!["tenant1".to_string(), "tenant2".to_string()],
        });
        assert_eq!(
            values_for(&policy, FieldName::IncludeGuestsOrExternalUsers),
            vec![
                "internalGuest - tenant1".to_string(),
                "internalGuest - tenant2".to_string()
            ]
        );
    }

    #[test]
    fn test_guest_types_alone_without_tenants() {
        let mut policy = Policy::default();
        policy.conditions.users.exclude_guests_or_external_users = Some(GuestsOrExternalUsers {
            guest_or_external_user_types: vec![GuestOrExternalUserType::B2bCollaborationGuest],
            external_tenants: vec![],
        });
        assert_eq!(
            values_for(&policy, FieldName::ExcludeGuestsOrExternalUsers),
            vec!["b2bCollaborationGuest".to_string()]
        );
    }

    #[test]
    fn test_filter_mode_prefixes() {
        let mut policy = Policy::default();
        policy.conditions.devices.device_filter = Some(TargetFilter {
            mode: Some(FilterMode::Include),
            rule: Some("device.isCompliant -eq True".to_string()),
        });
        policy.conditions.applications.application_filter = Some(TargetFilter {
            mode: Some(FilterMode::Exclude),
            rule: Some("app.tag -eq \"legacy\"".to_string()),
        });
        policy.conditions.client_applications.service_principal_filter = Some(TargetFilter {
            mode: None,
            rule: Some("sp.rule".to_string()),
        });
        assert_eq!(
            values_for(&policy, FieldName::DeviceFilter),
            vec!["(+) device.isCompliant -eq True".to_string()]
        );
        assert_eq!(
            values_for(&policy, FieldName::ApplicationFilter),
            vec!["(-) app.tag -eq \"legacy\"".to_string()]
        );
        assert_eq!(
            values_for(&policy, FieldName::ServicePrincipalFilter),
            vec!["sp.rule".to_string()]
        );
    }

    #[test]
    fn test_filter_without_rule_extracts_nothing() {
        let mut policy = Policy::default();
        policy.conditions.devices.device_filter = Some(TargetFilter {
            mode: Some(FilterMode::Include),
            rule: None,
        });
        assert!(values_for(&policy, FieldName::DeviceFilter).is_empty());
    }

    #[test]
    fn test_sign_in_frequency_time_based() {
        let mut policy = Policy::default();
        policy.session_controls.sign_in_frequency = Some(SignInFrequency {
            value: Some(5),
            frequency_type: Some(SignInFrequencyType::Hours),
            authentication_type: None,
            frequency_interval: Some(SignInFrequencyInterval::TimeBased),
        });
        assert_eq!(
            values_for(&policy, FieldName::SignInFrequency),
            vec!["5 hours".to_string()]
        );
    }

    #[test]
    fn test_sign_in_frequency_every_time() {
        let mut policy = Policy::default();
        policy.session_controls.sign_in_frequency = Some(SignInFrequency {
            frequency_interval: Some(SignInFrequencyInterval::EveryTime),
            ..SignInFrequency::default()
        });
        assert_eq!(
            values_for(&policy, FieldName::SignInFrequency),
            vec!["Every Time".to_string()]
        );
    }

    #[test]
    fn test_sign_in_frequency_incomplete_time_based_extracts_nothing() {
        let mut policy = Policy::default();
        policy.session_controls.sign_in_frequency = Some(SignInFrequency {
            value: Some(5),
            frequency_interval: Some(SignInFrequencyInterval::TimeBased),
            ..SignInFrequency::default()
        });
        assert!(values_for(&policy, FieldName::SignInFrequency).is_empty());
    }

    #[test]
    fn test_boolean_session_scalars_stringify() {
        let mut policy = Policy::default();
        policy.session_controls.disable_resilience_defaults = Some(true);
        policy.session_controls.application_enforced_restrictions = Some(false);
        assert_eq!(
            values_for(&policy, FieldName::DisableResilienceDefaults),
            vec!["true".to_string()]
        );
        assert_eq!(
            values_for(&policy, FieldName::ApplicationEnforcedRestrictions),
            vec!["false".to_string()]
        );
    }

    #[test]
    fn test_aggregate_merges_and_sorts_across_policies() {
        let mut first = Policy::default();
        first.conditions.user_risk_levels = vec![RiskLevel::High];
        let mut second = Policy::default();
        second.conditions.user_risk_levels = vec![RiskLevel::Low, RiskLevel::High];

        let aggregate = aggregate_field_values(&[first, second]);
        assert_eq!(
            aggregate.get(&FieldName::UserRiskLevels),
            Some(&vec!["high".to_string(), "low".to_string()])
        );
    }
}
