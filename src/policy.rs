//! Canonical access-control policy model.
//!
//! Every normalizer (delimited text or remote directory service) produces this
//! model, and all extraction logic consumes it. Closed enumerations carry
//! their wire tokens; each enumeration's `FromStr` impl is the single registry
//! of valid members, and list normalization funnels through
//! [`parse_token_list`] so invalid tokens are dropped uniformly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// Error returned when a wire token is not a member of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownToken(pub String);

impl fmt::Display for UnknownToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized token: {:?}", self.0)
    }
}

impl std::error::Error for UnknownToken {}

/// Declare a closed enumeration over a fixed set of wire tokens.
///
/// Generates serde renames, `as_str`, `Display`, and a `FromStr` impl that is
/// the single source of truth for the enumeration's valid members.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $token)] $variant,)+
        }

        impl $name {
            /// Wire token for this member.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::policy::UnknownToken;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok(Self::$variant),)+
                    _ => Err($crate::policy::UnknownToken(s.to_string())),
                }
            }
        }
    };
}

pub(crate) use wire_enum;

wire_enum! {
    /// Enablement state of a policy.
    PolicyState {
        Enabled => "enabled",
        Disabled => "disabled",
        Report => "enabledForReportingButNotEnforced",
    }
}

wire_enum! {
    /// Risk level applied to users, sign-ins, or service principals.
    RiskLevel {
        Low => "low",
        Medium => "medium",
        High => "high",
        Hidden => "hidden",
        None => "none",
        UnknownFutureValue => "unknownFutureValue",
    }
}

wire_enum! {
    /// Client application categories a policy can target.
    ClientAppType {
        All => "all",
        Browser => "browser",
        MobileAppsAndDesktopClients => "mobileAppsAndDesktopClients",
        ExchangeActiveSync => "exchangeActiveSync",
        EasSupported => "easSupported",
        Other => "other",
    }
}

wire_enum! {
    /// Device platforms a policy can include or exclude.
    DevicePlatform {
        Android => "android",
        Ios => "iOS",
        Windows => "windows",
        WindowsPhone => "windowsPhone",
        MacOs => "macOS",
        Linux => "linux",
        All => "all",
        UnknownFutureValue => "unknownFutureValue",
    }
}

wire_enum! {
    /// Built-in grant controls a policy can require.
    BuiltInGrantControl {
        Block => "block",
        Mfa => "mfa",
        CompliantDevice => "compliantDevice",
        DomainJoinedDevice => "domainJoinedDevice",
        ApprovedApplication => "approvedApplication",
        CompliantApplication => "compliantApplication",
        PasswordChange => "passwordChange",
        UnknownFutureValue => "unknownFutureValue",
    }
}

wire_enum! {
    /// How multiple grant controls combine.
    GrantOperator {
        And => "AND",
        Or => "OR",
    }
}

wire_enum! {
    PersistentBrowserMode {
        Always => "always",
        Never => "never",
    }
}

wire_enum! {
    CloudAppSecurityType {
        McasConfigured => "mcasConfigured",
        MonitorOnly => "monitorOnly",
        BlockDownloads => "blockDownloads",
        UnknownFutureValue => "unknownFutureValue",
    }
}

wire_enum! {
    SignInFrequencyInterval {
        TimeBased => "timeBased",
        EveryTime => "everyTime",
        UnknownFutureValue => "unknownFutureValue",
    }
}

wire_enum! {
    SignInFrequencyType {
        Days => "days",
        Hours => "hours",
    }
}

wire_enum! {
    SignInFrequencyAuthenticationType {
        PrimaryAndSecondaryAuthentication => "primaryAndSecondaryAuthentication",
        SecondaryAuthentication => "secondaryAuthentication",
        UnknownFutureValue => "unknownFutureValue",
    }
}

wire_enum! {
    /// Guest and external user categories.
    GuestOrExternalUserType {
        None => "none",
        InternalGuest => "internalGuest",
        B2bCollaborationGuest => "b2bCollaborationGuest",
        B2bCollaborationMember => "b2bCollaborationMember",
        B2bDirectConnectUser => "b2bDirectConnectUser",
        OtherExternalUser => "otherExternalUser",
        ServiceProvider => "serviceProvider",
        UnknownFutureValue => "unknownFutureValue",
    }
}

wire_enum! {
    ContinuousAccessEvaluationType {
        Disabled => "disabled",
        StrictEnforcement => "strictEnforcement",
        StrictLocation => "strictLocation",
        UnknownFutureValue => "unknownFutureValue",
    }
}

wire_enum! {
    /// User actions a policy can gate instead of applications.
    UserAction {
        RegisterSecurityInfo => "urn:user:registersecurityinfo",
        RegisterDevice => "urn:user:registerdevice",
    }
}

wire_enum! {
    /// Whether a device/application/service-principal filter includes or
    /// excludes the entities matching its rule.
    FilterMode {
        Include => "include",
        Exclude => "exclude",
    }
}

/// An include/exclude filter rule attached to devices, applications, or
/// client service principals. Text imports carry only the rule; the remote
/// API carries both mode and rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetFilter {
    pub mode: Option<FilterMode>,
    pub rule: Option<String>,
}

/// Guest/external-user targeting: which categories, restricted to which
/// external tenants (empty tenant list means all).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuestsOrExternalUsers {
    pub guest_or_external_user_types: Vec<GuestOrExternalUserType>,
    pub external_tenants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Applications {
    pub include_applications: Vec<String>,
    pub exclude_applications: Vec<String>,
    pub include_user_actions: Vec<UserAction>,
    pub include_authentication_context_class_references: Vec<String>,
    pub application_filter: Option<TargetFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthenticationFlows {
    pub transfer_methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientApplications {
    pub include_service_principals: Vec<String>,
    pub exclude_service_principals: Vec<String>,
    pub service_principal_filter: Option<TargetFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Devices {
    pub device_filter: Option<TargetFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Locations {
    pub include_locations: Vec<String>,
    pub exclude_locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Platforms {
    pub include_platforms: Vec<DevicePlatform>,
    pub exclude_platforms: Vec<DevicePlatform>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Users {
    pub include_users: Vec<String>,
    pub exclude_users: Vec<String>,
    pub include_groups: Vec<String>,
    pub exclude_groups: Vec<String>,
    pub include_roles: Vec<String>,
    pub exclude_roles: Vec<String>,
    pub include_guests_or_external_users: Option<GuestsOrExternalUsers>,
    pub exclude_guests_or_external_users: Option<GuestsOrExternalUsers>,
}

/// Targeting conditions of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Conditions {
    pub applications: Applications,
    pub authentication_flows: AuthenticationFlows,
    pub client_applications: ClientApplications,
    pub client_app_types: Vec<ClientAppType>,
    pub devices: Devices,
    pub locations: Locations,
    pub platforms: Platforms,
    pub service_principal_risk_levels: Vec<RiskLevel>,
    pub sign_in_risk_levels: Vec<RiskLevel>,
    pub user_risk_levels: Vec<RiskLevel>,
    pub insider_risk_levels: Vec<String>,
    pub users: Users,
}

/// Controls required to grant access.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrantControls {
    pub built_in_controls: Vec<BuiltInGrantControl>,
    pub custom_authentication_factors: Vec<String>,
    pub terms_of_use: Vec<String>,
    pub operator: Option<GrantOperator>,
    pub authentication_strength: Option<String>,
}

/// Session sign-in frequency: either "every time" or a time-based interval.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignInFrequency {
    pub value: Option<u32>,
    #[serde(rename = "type")]
    pub frequency_type: Option<SignInFrequencyType>,
    pub authentication_type: Option<SignInFrequencyAuthenticationType>,
    pub frequency_interval: Option<SignInFrequencyInterval>,
}

/// Session-scoped controls applied after access is granted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionControls {
    pub application_enforced_restrictions: Option<bool>,
    pub cloud_app_security: Option<CloudAppSecurityType>,
    pub continuous_access_evaluation: Option<ContinuousAccessEvaluationType>,
    pub disable_resilience_defaults: Option<bool>,
    pub persistent_browser: Option<PersistentBrowserMode>,
    pub secure_sign_in_session: Option<bool>,
    pub sign_in_frequency: Option<SignInFrequency>,
    pub global_secure_access_filtering_profile: Option<String>,
}

/// One normalized access-control policy.
///
/// All leaf fields are optional; list fields are empty (never absent) after
/// normalization. A policy without a derivable [`code`](Self::code) is
/// excluded from graph construction but still valid for filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Policy {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub created_date_time: Option<String>,
    pub modified_date_time: Option<String>,
    pub state: Option<PolicyState>,
    pub conditions: Conditions,
    pub grant_controls: GrantControls,
    pub session_controls: SessionControls,
}

static CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CA\d{3,5}").expect("static pattern is valid"));

/// Derive the short policy code used to key graph nodes.
///
/// The first `CAnnn`-style token in the display name wins; otherwise the full
/// display name; otherwise the source identifier.
pub fn derive_code(display_name: Option<&str>, id: Option<&str>) -> Option<String> {
    match display_name {
        Some(name) => match CODE_PATTERN.find(name) {
            Some(m) => Some(m.as_str().to_string()),
            None => Some(name.to_string()),
        },
        None => id.map(str::to_string),
    }
}

/// Parse a single wire token against a closed enumeration, dropping invalid
/// tokens with a diagnostic.
pub(crate) fn parse_token<T>(field: &str, token: &str) -> Option<T>
where
    T: FromStr<Err = UnknownToken>,
{
    match token.parse() {
        Ok(member) => Some(member),
        Err(UnknownToken(raw)) => {
            tracing::warn!("dropping unrecognized {} token {:?}", field, raw);
            None
        }
    }
}

/// Parse a list of wire tokens, keeping only members of the enumeration.
pub(crate) fn parse_token_list<T>(
    field: &str,
    tokens: impl IntoIterator<Item = String>,
) -> Vec<T>
where
    T: FromStr<Err = UnknownToken>,
{
    tokens
        .into_iter()
        .filter_map(|token| parse_token(field, &token))
        .collect()
}
