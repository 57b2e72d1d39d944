//! Remote directory-service record normalizer.
//!
//! The raw payload is validated once at the boundary into a typed schema;
//! a shape mismatch is a descriptive per-record parse failure rather than a
//! silent default. Opaque identifiers are resolved to display names through
//! an injected lookup, with the raw identifier retained as the fallback.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::policy::{
    derive_code, parse_token, parse_token_list, FilterMode, GuestsOrExternalUsers, Policy,
    SignInFrequency, TargetFilter,
};

/// Lookup surface for resolving opaque directory-object identifiers to
/// display names. Every method defaults to "unknown", so a partial resolver
/// is valid: unresolved identifiers pass through unchanged.
pub trait DirectoryLookup {
    fn user_display_name(&self, _id: &str) -> Option<String> {
        None
    }
    fn group_display_name(&self, _id: &str) -> Option<String> {
        None
    }
    fn role_display_name(&self, _id: &str) -> Option<String> {
        None
    }
    fn application_display_name(&self, _id: &str) -> Option<String> {
        None
    }
    fn service_principal_display_name(&self, _id: &str) -> Option<String> {
        None
    }
    fn named_location_display_name(&self, _id: &str) -> Option<String> {
        None
    }
}

/// Map-backed [`DirectoryLookup`]. Users, groups, roles, applications, and
/// service principals share one directory-object map, mirroring how the
/// directory service resolves them through a single endpoint; named
/// locations resolve separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryResolvers {
    pub directory_objects: IndexMap<String, String>,
    pub named_locations: IndexMap<String, String>,
}

impl DirectoryLookup for DirectoryResolvers {
    fn user_display_name(&self, id: &str) -> Option<String> {
        self.directory_objects.get(id).cloned()
    }
    fn group_display_name(&self, id: &str) -> Option<String> {
        self.directory_objects.get(id).cloned()
    }
    fn role_display_name(&self, id: &str) -> Option<String> {
        self.directory_objects.get(id).cloned()
    }
    fn application_display_name(&self, id: &str) -> Option<String> {
        self.directory_objects.get(id).cloned()
    }
    fn service_principal_display_name(&self, id: &str) -> Option<String> {
        self.directory_objects.get(id).cloned()
    }
    fn named_location_display_name(&self, id: &str) -> Option<String> {
        self.named_locations.get(id).cloned()
    }
}

/// A list that arrives either as a JSON array or as one comma-joined string,
/// both of which the directory service emits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TokenList {
    Many(Vec<String>),
    One(String),
}

impl Default for TokenList {
    fn default() -> Self {
        TokenList::Many(Vec::new())
    }
}

impl TokenList {
    fn into_tokens(self) -> Vec<String> {
        match self {
            TokenList::Many(tokens) => tokens,
            TokenList::One(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Treat an explicit JSON `null` like an absent field; the service emits the
/// two interchangeably for unconfigured sub-objects and lists.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Raw policy shape as returned by the directory service (subset consumed).
/// Unknown keys are ignored and never leak into the canonical model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPolicy {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub created_date_time: Option<String>,
    pub modified_date_time: Option<String>,
    pub state: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub conditions: RawConditions,
    #[serde(deserialize_with = "null_default")]
    pub grant_controls: RawGrantControls,
    #[serde(deserialize_with = "null_default")]
    pub session_controls: RawSessionControls,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawConditions {
    #[serde(deserialize_with = "null_default")]
    pub applications: RawApplications,
    #[serde(deserialize_with = "null_default")]
    pub authentication_flows: RawAuthenticationFlows,
    #[serde(deserialize_with = "null_default")]
    pub client_applications: RawClientApplications,
    #[serde(deserialize_with = "null_default")]
    pub client_app_types: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub devices: RawDevices,
    #[serde(deserialize_with = "null_default")]
    pub locations: RawLocations,
    #[serde(deserialize_with = "null_default")]
    pub platforms: RawPlatforms,
    #[serde(deserialize_with = "null_default")]
    pub service_principal_risk_levels: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub sign_in_risk_levels: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub user_risk_levels: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub insider_risk_levels: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub users: RawUsers,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawApplications {
    #[serde(deserialize_with = "null_default")]
    pub include_applications: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub exclude_applications: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub include_user_actions: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub include_authentication_context_class_references: Vec<String>,
    pub application_filter: Option<RawFilter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAuthenticationFlows {
    #[serde(deserialize_with = "null_default")]
    pub transfer_methods: TokenList,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawClientApplications {
    #[serde(deserialize_with = "null_default")]
    pub include_service_principals: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub exclude_service_principals: Vec<String>,
    pub service_principal_filter: Option<RawFilter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDevices {
    pub device_filter: Option<RawFilter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLocations {
    #[serde(deserialize_with = "null_default")]
    pub include_locations: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub exclude_locations: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPlatforms {
    #[serde(deserialize_with = "null_default")]
    pub include_platforms: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub exclude_platforms: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawUsers {
    #[serde(deserialize_with = "null_default")]
    pub include_users: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub exclude_users: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub include_groups: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub exclude_groups: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub include_roles: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub exclude_roles: Vec<String>,
    pub include_guests_or_external_users: Option<RawGuestsOrExternalUsers>,
    pub exclude_guests_or_external_users: Option<RawGuestsOrExternalUsers>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawGuestsOrExternalUsers {
    #[serde(deserialize_with = "null_default")]
    pub guest_or_external_user_types: TokenList,
    pub external_tenants: Option<RawExternalTenants>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawExternalTenants {
    #[serde(deserialize_with = "null_default")]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFilter {
    pub mode: Option<String>,
    pub rule: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawGrantControls {
    #[serde(deserialize_with = "null_default")]
    pub built_in_controls: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub custom_authentication_factors: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub terms_of_use: Vec<String>,
    pub operator: Option<String>,
    pub authentication_strength: Option<RawAuthenticationStrength>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAuthenticationStrength {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSessionControls {
    pub application_enforced_restrictions: Option<RawEnabled>,
    pub cloud_app_security: Option<RawCloudAppSecurity>,
    pub continuous_access_evaluation: Option<RawContinuousAccessEvaluation>,
    pub disable_resilience_defaults: Option<bool>,
    pub persistent_browser: Option<RawPersistentBrowser>,
    pub secure_sign_in_session: Option<RawEnabled>,
    pub sign_in_frequency: Option<RawSignInFrequency>,
    pub global_secure_access_filtering_profile: Option<RawFilteringProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEnabled {
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCloudAppSecurity {
    pub is_enabled: Option<bool>,
    pub cloud_app_security_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawContinuousAccessEvaluation {
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPersistentBrowser {
    pub is_enabled: Option<bool>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSignInFrequency {
    pub is_enabled: Option<bool>,
    pub value: Option<u32>,
    #[serde(rename = "type")]
    pub frequency_type: Option<String>,
    pub authentication_type: Option<String>,
    pub frequency_interval: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFilteringProfile {
    pub id: Option<String>,
}

/// Normalize one raw directory-service policy object.
///
/// # Errors
/// Returns a descriptive message when the payload does not match the raw
/// schema; the caller drops the record and continues the batch.
pub fn from_api_policy(
    raw: &serde_json::Value,
    lookup: &dyn DirectoryLookup,
) -> Result<Policy, String> {
    let raw: RawPolicy = serde_json::from_value(raw.clone())
        .map_err(|e| format!("policy payload does not match the expected shape: {}", e))?;
    Ok(build_policy(raw, lookup))
}

fn build_policy(raw: RawPolicy, lookup: &dyn DirectoryLookup) -> Policy {
    let code = derive_code(raw.display_name.as_deref(), raw.id.as_deref());

    let mut policy = Policy {
        id: raw.id,
        display_name: raw.display_name,
        code,
        description: raw.description,
        created_date_time: raw.created_date_time,
        modified_date_time: raw.modified_date_time,
        state: raw
            .state
            .as_deref()
            .and_then(|token| parse_token("state", token)),
        ..Policy::default()
    };

    let raw_conditions = raw.conditions;
    let conditions = &mut policy.conditions;

    let applications = raw_conditions.applications;
    conditions.applications.include_applications = resolve_ids(
        applications.include_applications,
        |id| lookup.application_display_name(id),
    );
    conditions.applications.exclude_applications = resolve_ids(
        applications.exclude_applications,
        |id| lookup.application_display_name(id),
    );
    conditions.applications.include_user_actions = parse_token_list(
        "conditions.applications.includeUserActions",
        applications.include_user_actions,
    );
    conditions
        .applications
        .include_authentication_context_class_references =
        applications.include_authentication_context_class_references;
    conditions.applications.application_filter =
        convert_filter("conditions.applications.applicationFilter", applications.application_filter);

    conditions.authentication_flows.transfer_methods =
        raw_conditions.authentication_flows.transfer_methods.into_tokens();

    let client_applications = raw_conditions.client_applications;
    conditions.client_applications.include_service_principals = resolve_ids(
        client_applications.include_service_principals,
        |id| lookup.service_principal_display_name(id),
    );
    conditions.client_applications.exclude_service_principals = resolve_ids(
        client_applications.exclude_service_principals,
        |id| lookup.service_principal_display_name(id),
    );
    conditions.client_applications.service_principal_filter = convert_filter(
        "conditions.clientApplications.servicePrincipalFilter",
        client_applications.service_principal_filter,
    );

    conditions.client_app_types =
        parse_token_list("conditions.clientAppTypes", raw_conditions.client_app_types);
    conditions.devices.device_filter =
        convert_filter("conditions.devices.deviceFilter", raw_conditions.devices.device_filter);

    conditions.locations.include_locations = resolve_ids(
        raw_conditions.locations.include_locations,
        |id| lookup.named_location_display_name(id),
    );
    conditions.locations.exclude_locations = resolve_ids(
        raw_conditions.locations.exclude_locations,
        |id| lookup.named_location_display_name(id),
    );

    conditions.platforms.include_platforms = parse_token_list(
        "conditions.platforms.includePlatforms",
        raw_conditions.platforms.include_platforms,
    );
    conditions.platforms.exclude_platforms = parse_token_list(
        "conditions.platforms.excludePlatforms",
        raw_conditions.platforms.exclude_platforms,
    );

    conditions.service_principal_risk_levels = parse_token_list(
        "conditions.servicePrincipalRiskLevels",
        raw_conditions.service_principal_risk_levels,
    );
    conditions.sign_in_risk_levels = parse_token_list(
        "conditions.signInRiskLevels",
        raw_conditions.sign_in_risk_levels,
    );
    conditions.user_risk_levels =
        parse_token_list("conditions.userRiskLevels", raw_conditions.user_risk_levels);
    conditions.insider_risk_levels = raw_conditions.insider_risk_levels;

    let users = raw_conditions.users;
    conditions.users.include_users =
        resolve_ids(users.include_users, |id| lookup.user_display_name(id));
    conditions.users.exclude_users =
        resolve_ids(users.exclude_users, |id| lookup.user_display_name(id));
    conditions.users.include_groups =
        resolve_ids(users.include_groups, |id| lookup.group_display_name(id));
    conditions.users.exclude_groups =
        resolve_ids(users.exclude_groups, |id| lookup.group_display_name(id));
    conditions.users.include_roles =
        resolve_ids(users.include_roles, |id| lookup.role_display_name(id));
    conditions.users.exclude_roles =
        resolve_ids(users.exclude_roles, |id| lookup.role_display_name(id));
    conditions.users.include_guests_or_external_users = convert_guests(
        "conditions.users.includeGuestsOrExternalUsers",
        users.include_guests_or_external_users,
    );
    conditions.users.exclude_guests_or_external_users = convert_guests(
        "conditions.users.excludeGuestsOrExternalUsers",
        users.exclude_guests_or_external_users,
    );

    let raw_grant = raw.grant_controls;
    let grant = &mut policy.grant_controls;
    grant.built_in_controls =
        parse_token_list("grantControls.builtInControls", raw_grant.built_in_controls);
    grant.custom_authentication_factors = raw_grant.custom_authentication_factors;
    grant.terms_of_use = raw_grant.terms_of_use;
    grant.operator = raw_grant
        .operator
        .as_deref()
        .and_then(|token| parse_token("grantControls.operator", token));
    grant.authentication_strength = raw_grant
        .authentication_strength
        .and_then(|strength| strength.display_name);

    let raw_session = raw.session_controls;
    let session = &mut policy.session_controls;
    session.application_enforced_restrictions = raw_session
        .application_enforced_restrictions
        .and_then(|carrier| carrier.is_enabled);
    session.cloud_app_security = raw_session
        .cloud_app_security
        .and_then(|carrier| carrier.cloud_app_security_type)
        .as_deref()
        .and_then(|token| parse_token("sessionControls.cloudAppSecurity", token));
    session.continuous_access_evaluation = raw_session
        .continuous_access_evaluation
        .and_then(|carrier| carrier.mode)
        .as_deref()
        .and_then(|token| parse_token("sessionControls.continuousAccessEvaluation", token));
    session.disable_resilience_defaults = raw_session.disable_resilience_defaults;
    session.persistent_browser = raw_session
        .persistent_browser
        .and_then(|carrier| carrier.mode)
        .as_deref()
        .and_then(|token| parse_token("sessionControls.persistentBrowser", token));
    session.secure_sign_in_session = raw_session
        .secure_sign_in_session
        .and_then(|carrier| carrier.is_enabled);
    session.sign_in_frequency = raw_session.sign_in_frequency.map(|frequency| SignInFrequency {
        value: frequency.value,
        frequency_type: frequency
            .frequency_type
            .as_deref()
            .and_then(|token| parse_token("sessionControls.signInFrequency.type", token)),
        authentication_type: frequency.authentication_type.as_deref().and_then(|token| {
            parse_token("sessionControls.signInFrequency.authenticationType", token)
        }),
        frequency_interval: frequency.frequency_interval.as_deref().and_then(|token| {
            parse_token("sessionControls.signInFrequency.frequencyInterval", token)
        }),
    });
    session.global_secure_access_filtering_profile = raw_session
        .global_secure_access_filtering_profile
        .and_then(|profile| profile.id);

    policy
}

/// Resolve each identifier to a display name, keeping the raw identifier when
/// the lookup misses.
fn resolve_ids(ids: Vec<String>, resolver: impl Fn(&str) -> Option<String>) -> Vec<String> {
    ids.into_iter()
        .map(|id| resolver(&id).unwrap_or(id))
        .collect()
}

fn convert_filter(field: &str, raw: Option<RawFilter>) -> Option<TargetFilter> {
    let raw = raw?;
    let mode = raw
        .mode
        .as_deref()
        .and_then(|token| parse_token::<FilterMode>(field, token));
    if mode.is_none() && raw.rule.is_none() {
        return None;
    }
    Some(TargetFilter { mode, rule: raw.rule })
}

fn convert_guests(
    field: &str,
    raw: Option<RawGuestsOrExternalUsers>,
) -> Option<GuestsOrExternalUsers> {
    let raw = raw?;
    Some(GuestsOrExternalUsers {
        guest_or_external_user_types: parse_token_list(
            field,
            raw.guest_or_external_user_types.into_tokens(),
        ),
        external_tenants: raw
            .external_tenants
            .map(|tenants| tenants.members)
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{
        BuiltInGrantControl, ClientAppType, DevicePlatform, GrantOperator,
        GuestOrExternalUserType, PolicyState, RiskLevel,
    };
    use serde_json::json;

    fn resolvers() -> DirectoryResolvers {
        let mut resolvers = DirectoryResolvers::default();
        resolvers.directory_objects.insert(
            "11111111-1111-1111-1111-111111111111".to_string(),
            "Alice".to_string(),
        );
        resolvers.directory_objects.insert(
            "22222222-2222-2222-2222-222222222222".to_string(),
            "Engineering".to_string(),
        );
        resolvers.named_locations.insert(
            "33333333-3333-3333-3333-333333333333".to_string(),
            "Headquarters".to_string(),
        );
        resolvers
    }

    #[test]
    fn test_resolves_identifiers_with_raw_fallback() {
        let raw = json!({
            "id": "policy-1",
            "displayName": "CA0001 - Require MFA",
            "state": "enabled",
            "conditions": {
                "users": {
                    "includeUsers": [
                        "11111111-1111-1111-1111-111111111111",
                        "99999999-9999-9999-9999-999999999999"
                    ],
                    "includeGroups": ["22222222-2222-2222-2222-222222222222"]
                },
                "locations": {
                    "includeLocations": ["33333333-3333-3333-3333-333333333333"]
                }
            }
        });
        let policy = from_api_policy(&raw, &resolvers()).unwrap();
        assert_eq!(policy.code.as_deref(), Some("CA0001"));
        assert_eq!(policy.state, Some(PolicyState::Enabled));
        assert_eq!(
            policy.conditions.users.include_users,
            vec!["Alice", "99999999-9999-9999-9999-999999999999"]
        );
        assert_eq!(policy.conditions.users.include_groups, vec!["Engineering"]);
        assert_eq!(
            policy.conditions.locations.include_locations,
            vec!["Headquarters"]
        );
    }

    #[test]
    fn test_enumeration_tokens_filtered_at_boundary() {
        let raw = json!({
            "id": "policy-2",
            "displayName": "CA0002",
            "conditions": {
                "userRiskLevels": ["high", "notARisk"],
                "clientAppTypes": ["browser", "fax"],
                "platforms": {"includePlatforms": ["iOS", "notAPlatform"]}
            },
            "grantControls": {
                "builtInControls": ["mfa", "notAControl"],
                "operator": "OR"
            }
        });
        let policy = from_api_policy(&raw, &DirectoryResolvers::default()).unwrap();
        assert_eq!(policy.conditions.user_risk_levels, vec![RiskLevel::High]);
        assert_eq!(policy.conditions.client_app_types, vec![ClientAppType::Browser]);
        assert_eq!(
            policy.conditions.platforms.include_platforms,
            vec![DevicePlatform::Ios]
        );
        assert_eq!(
            policy.grant_controls.built_in_controls,
            vec![BuiltInGrantControl::Mfa]
        );
        assert_eq!(policy.grant_controls.operator, Some(GrantOperator::Or));
    }

    #[test]
    fn test_filters_carry_mode_and_rule() {
        let raw = json!({
            "id": "policy-3",
            "conditions": {
                "devices": {
                    "deviceFilter": {"mode": "include", "rule": "device.isCompliant -eq True"}
                },
                "applications": {
                    "applicationFilter": {"mode": "exclude", "rule": "app rule"}
                }
            }
        });
        let policy = from_api_policy(&raw, &DirectoryResolvers::default()).unwrap();
        assert_eq!(
            policy.conditions.devices.device_filter,
            Some(TargetFilter {
                mode: Some(FilterMode::Include),
                rule: Some("device.isCompliant -eq True".to_string()),
            })
        );
        assert_eq!(
            policy.conditions.applications.application_filter,
            Some(TargetFilter {
                mode: Some(FilterMode::Exclude),
                rule: Some("app rule".to_string()),
            })
        );
        assert_eq!(policy.conditions.client_applications.service_principal_filter, None);
    }

    #[test]
    fn test_guest_types_accept_array_and_joined_string() {
        let raw = json!({
            "id": "policy-4",
            "conditions": {
                "users": {
                    "includeGuestsOrExternalUsers": {
                        "guestOrExternalUserTypes": "internalGuest,b2bCollaborationGuest",
                        "externalTenants": {"members": ["tenant1"]}
                    },
                    "excludeGuestsOrExternalUsers": {
                        "guestOrExternalUserTypes": ["b2bDirectConnectUser"]
                    }
                }
            }
        });
        let policy = from_api_policy(&raw, &DirectoryResolvers::default()).unwrap();
        assert_eq!(
            policy.conditions.users.include_guests_or_external_users,
            Some(GuestsOrExternalUsers {
                guest_or_external_user_types: vec![
                    GuestOrExternalUserType::InternalGuest,
                    GuestOrExternalUserType::B2bCollaborationGuest,
                ],
                external_tenants: vec!["tenant1".to_string()],
            })
        );
        assert_eq!(
            policy.conditions.users.exclude_guests_or_external_users,
            Some(GuestsOrExternalUsers {
                guest_or_external_user_types: vec![GuestOrExternalUserType::B2bDirectConnectUser],
                external_tenants: vec![],
            })
        );
    }

    #[test]
    fn test_session_controls_unwrap_nested_carriers() {
        let raw = json!({
            "id": "policy-5",
            "sessionControls": {
                "applicationEnforcedRestrictions": {"isEnabled": true},
                "cloudAppSecurity": {"isEnabled": true, "cloudAppSecurityType": "monitorOnly"},
                "persistentBrowser": {"isEnabled": true, "mode": "never"},
                "signInFrequency": {
                    "isEnabled": true,
                    "value": 12,
                    "type": "hours",
                    "frequencyInterval": "timeBased"
                },
                "disableResilienceDefaults": false
            }
        });
        let policy = from_api_policy(&raw, &DirectoryResolvers::default()).unwrap();
        let session = &policy.session_controls;
        assert_eq!(session.application_enforced_restrictions, Some(true));
        assert_eq!(
            session.cloud_app_security,
            Some(crate::policy::CloudAppSecurityType::MonitorOnly)
        );
        assert_eq!(
            session.persistent_browser,
            Some(crate::policy::PersistentBrowserMode::Never)
        );
        assert_eq!(session.disable_resilience_defaults, Some(false));
        let frequency = session.sign_in_frequency.as_ref().expect("frequency");
        assert_eq!(frequency.value, Some(12));
        assert_eq!(
            frequency.frequency_interval,
            Some(crate::policy::SignInFrequencyInterval::TimeBased)
        );
    }

    #[test]
    fn test_authentication_strength_uses_display_name() {
        let raw = json!({
            "id": "policy-6",
            "grantControls": {
                "authenticationStrength": {"id": "x", "displayName": "Phishing-resistant MFA"}
            }
        });
        let policy = from_api_policy(&raw, &DirectoryResolvers::default()).unwrap();
        assert_eq!(
            policy.grant_controls.authentication_strength.as_deref(),
            Some("Phishing-resistant MFA")
        );
    }

    #[test]
    fn test_missing_sub_objects_become_empty_defaults() {
        let raw = json!({"id": "policy-7"});
        let policy = from_api_policy(&raw, &DirectoryResolvers::default()).unwrap();
        assert_eq!(policy.code.as_deref(), Some("policy-7"));
        assert!(policy.conditions.users.include_users.is_empty());
        assert_eq!(policy.session_controls.sign_in_frequency, None);
        assert!(policy.grant_controls.built_in_controls.is_empty());
    }

    #[test]
    fn test_explicit_nulls_are_treated_as_absent() {
        let raw = json!({
            "id": "policy-10",
            "conditions": {
                "applications": null,
                "devices": null,
                "userRiskLevels": null,
                "users": {"includeUsers": null}
            },
            "grantControls": null,
            "sessionControls": null
        });
        let policy = from_api_policy(&raw, &DirectoryResolvers::default()).unwrap();
        assert!(policy.conditions.user_risk_levels.is_empty());
        assert!(policy.conditions.users.include_users.is_empty());
        assert_eq!(policy.conditions.devices.device_filter, None);
        assert!(policy.grant_controls.built_in_controls.is_empty());
    }

    #[test]
    fn test_shape_mismatch_is_a_descriptive_failure() {
        let raw = json!({"id": "policy-8", "conditions": {"userRiskLevels": "high"}});
        let error = from_api_policy(&raw, &DirectoryResolvers::default()).unwrap_err();
        assert!(error.contains("does not match the expected shape"));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let raw = json!({
            "id": "policy-9",
            "somethingNew": {"nested": true},
            "conditions": {"futureCondition": ["x"]}
        });
        let policy = from_api_policy(&raw, &DirectoryResolvers::default()).unwrap();
        assert_eq!(policy.id.as_deref(), Some("policy-9"));
    }
}
