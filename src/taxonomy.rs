//! Static field taxonomy: every extractable field name classified into an
//! ordered display category and a finer subcategory.
//!
//! The classification is looked up once per node at graph-compilation time
//! and never recomputed; the category order defines the graph's layers.

use crate::policy::wire_enum;

wire_enum! {
    /// Top-level graph layer, in fixed left-to-right order.
    Category {
        Users => "Users",
        TargetResources => "Target Resources",
        Network => "Network",
        Conditions => "Conditions",
        Grant => "Grant",
        Session => "Session",
    }
}

impl Category {
    /// The six categories in layer order.
    pub const ORDER: [Category; 6] = [
        Category::Users,
        Category::TargetResources,
        Category::Network,
        Category::Conditions,
        Category::Grant,
        Category::Session,
    ];

    /// Position of this category within [`Category::ORDER`].
    pub fn position(self) -> usize {
        match self {
            Category::Users => 0,
            Category::TargetResources => 1,
            Category::Network => 2,
            Category::Conditions => 3,
            Category::Grant => 4,
            Category::Session => 5,
        }
    }

    /// Sentinel field and value text for a policy that configured nothing in
    /// this category.
    pub fn sentinel(self) -> (FieldName, &'static str) {
        match self {
            Category::Users => (FieldName::UsersNone, "None"),
            Category::TargetResources => (FieldName::TargetResourcesNone, "None"),
            Category::Network => (FieldName::NetworkNotConfigured, "Not configured"),
            Category::Conditions => (FieldName::ConditionsNotConfigured, "Not configured"),
            Category::Grant => (FieldName::GrantNotConfigured, "Not configured"),
            Category::Session => (FieldName::SessionNotConfigured, "Not configured"),
        }
    }
}

wire_enum! {
    /// Finer grouping within a category; `Default` means no finer grouping.
    Subcategory {
        Default => "Default",
        // Users
        IncludeGroups => "Include Groups",
        ExcludeGroups => "Exclude Groups",
        IncludeExternalUsers => "Include External Users",
        ExcludeExternalUsers => "Exclude external Users",
        IncludeUsers => "Include Users",
        ExcludeUsers => "Exclude Users",
        IncludeRoles => "Include Roles",
        ExcludeRoles => "Exclude Roles",
        IncludeClientApps => "Include Client Apps",
        ExcludeClientApps => "Exclude Client Apps",
        ClientAppsFilter => "Client Apps Filter",
        // Target Resources
        IncludeResources => "Include Resources",
        ExcludeResources => "Exclude Resources",
        ResourcesFilter => "Resources Filter",
        UserAction => "User Action",
        AuthenticationContext => "Authentication context",
        // Network
        IncludeLocations => "Include locations",
        ExcludeLocations => "Exclude Locations",
        // Conditions
        IncludeDevicePlatforms => "Include Device platforms",
        ExcludeDevicePlatforms => "Exclude device platforms",
        ClientAppTypes => "Client app types",
        Devices => "Devices",
        UserRisk => "User risk",
        SignInRisk => "Sign-in risk",
        InsiderRisk => "Insider risk",
        ServicePrincipalRisk => "Service Principal Risk",
        AuthenticationFlows => "Authentication flows",
        // Grant
        BuiltinControls => "Builtin Controls",
        AuthenticationStrength => "Authentication Strength",
        TermsOfUse => "Terms of Use",
        CustomAuthenticationFactor => "Custom Authentication Factor",
        // Session
        SignInFrequency => "Sign In Frequency",
        PersistentBrowser => "Persistent Browser",
        CloudAppSecurity => "Cloud App Security",
    }
}

wire_enum! {
    /// Every extractable field, named by its logical dot path.
    FieldName {
        UserRiskLevels => "conditions.userRiskLevels",
        SignInRiskLevels => "conditions.signInRiskLevels",
        ClientAppTypes => "conditions.clientAppTypes",
        ServicePrincipalRiskLevels => "conditions.servicePrincipalRiskLevels",
        DeviceFilter => "conditions.devices.deviceFilter",
        IncludeApplications => "conditions.applications.includeApplications",
        ExcludeApplications => "conditions.applications.excludeApplications",
        IncludeUserActions => "conditions.applications.includeUserActions",
        AuthenticationContextClassReferences => "conditions.applications.includeAuthenticationContextClassReferences",
        ApplicationFilter => "conditions.applications.applicationFilter",
        IncludeUsers => "conditions.users.includeUsers",
        ExcludeUsers => "conditions.users.excludeUsers",
        IncludeGroups => "conditions.users.includeGroups",
        ExcludeGroups => "conditions.users.excludeGroups",
        IncludeRoles => "conditions.users.includeRoles",
        ExcludeRoles => "conditions.users.excludeRoles",
        IncludeGuestsOrExternalUsers => "conditions.users.includeGuestsOrExternalUsers.guestOrExternalUserTypes",
        ExcludeGuestsOrExternalUsers => "conditions.users.excludeGuestsOrExternalUsers.guestOrExternalUserTypes",
        IncludePlatforms => "conditions.platforms.includePlatforms",
        ExcludePlatforms => "conditions.platforms.excludePlatforms",
        IncludeLocations => "conditions.locations.includeLocations",
        ExcludeLocations => "conditions.locations.excludeLocations",
        IncludeServicePrincipals => "conditions.clientApplications.includeServicePrincipals",
        ExcludeServicePrincipals => "conditions.clientApplications.excludeServicePrincipals",
        ServicePrincipalFilter => "conditions.clientApplications.servicePrincipalFilter",
        TransferMethods => "conditions.authenticationFlows.transferMethods",
        DisableResilienceDefaults => "sessionControls.disableResilienceDefaults",
        ApplicationEnforcedRestrictions => "sessionControls.applicationEnforcedRestrictions",
        CloudAppSecurity => "sessionControls.cloudAppSecurity",
        SignInFrequency => "sessionControls.signInFrequency",
        PersistentBrowser => "sessionControls.persistentBrowser",
        BuiltInControls => "grantControls.builtInControls",
        CustomAuthenticationFactor => "grantControls.customAuthenticationFactor",
        AuthenticationStrength => "grantControls.authenticationStrength",
        TermsOfUse => "grantControls.termsOfUse",
        // Sentinels: one per category, meaning "nothing configured here".
        UsersNone => "users.none",
        TargetResourcesNone => "targetResources.none",
        NetworkNotConfigured => "network.notConfigured",
        ConditionsNotConfigured => "conditions.notConfigured",
        GrantNotConfigured => "grant.notConfigured",
        SessionNotConfigured => "session.notConfigured",
    }
}

impl FieldName {
    /// Category and subcategory this field belongs to.
    pub fn taxonomy(self) -> (Category, Subcategory) {
        use Category as C;
        use Subcategory as S;
        match self {
            FieldName::UserRiskLevels => (C::Conditions, S::UserRisk),
            FieldName::SignInRiskLevels => (C::Conditions, S::SignInRisk),
            FieldName::ClientAppTypes => (C::Conditions, S::ClientAppTypes),
            FieldName::ServicePrincipalRiskLevels => (C::Conditions, S::ServicePrincipalRisk),
            FieldName::DeviceFilter => (C::Conditions, S::Devices),
            FieldName::IncludeApplications => (C::TargetResources, S::IncludeResources),
            FieldName::ExcludeApplications => (C::TargetResources, S::ExcludeResources),
            FieldName::IncludeUserActions => (C::TargetResources, S::UserAction),
            FieldName::AuthenticationContextClassReferences => {
                (C::TargetResources, S::AuthenticationContext)
            }
            FieldName::ApplicationFilter => (C::TargetResources, S::ResourcesFilter),
            FieldName::IncludeUsers => (C::Users, S::IncludeUsers),
            FieldName::ExcludeUsers => (C::Users, S::ExcludeUsers),
            FieldName::IncludeGroups => (C::Users, S::IncludeGroups),
            FieldName::ExcludeGroups => (C::Users, S::ExcludeGroups),
            FieldName::IncludeRoles => (C::Users, S::IncludeRoles),
            FieldName::ExcludeRoles => (C::Users, S::ExcludeRoles),
            FieldName::IncludeGuestsOrExternalUsers => (C::Users, S::IncludeExternalUsers),
            FieldName::ExcludeGuestsOrExternalUsers => (C::Users, S::ExcludeExternalUsers),
            FieldName::IncludePlatforms => (C::Conditions, S::IncludeDevicePlatforms),
            FieldName::ExcludePlatforms => (C::Conditions, S::ExcludeDevicePlatforms),
            FieldName::IncludeLocations => (C::Network, S::IncludeLocations),
            FieldName::ExcludeLocations => (C::Network, S::ExcludeLocations),
            FieldName::IncludeServicePrincipals => (C::Users, S::IncludeClientApps),
            FieldName::ExcludeServicePrincipals => (C::Users, S::ExcludeClientApps),
            FieldName::ServicePrincipalFilter => (C::Users, S::ClientAppsFilter),
            FieldName::TransferMethods => (C::Conditions, S::AuthenticationFlows),
            FieldName::DisableResilienceDefaults => (C::Session, S::Default),
            FieldName::ApplicationEnforcedRestrictions => (C::Session, S::Default),
            FieldName::CloudAppSecurity => (C::Session, S::CloudAppSecurity),
            FieldName::SignInFrequency => (C::Session, S::SignInFrequency),
            FieldName::PersistentBrowser => (C::Session, S::PersistentBrowser),
            FieldName::BuiltInControls => (C::Grant, S::BuiltinControls),
            FieldName::CustomAuthenticationFactor => (C::Grant, S::CustomAuthenticationFactor),
            FieldName::AuthenticationStrength => (C::Grant, S::AuthenticationStrength),
            FieldName::TermsOfUse => (C::Grant, S::TermsOfUse),
            FieldName::UsersNone => (C::Users, S::Default),
            FieldName::TargetResourcesNone => (C::TargetResources, S::Default),
            FieldName::NetworkNotConfigured => (C::Network, S::Default),
            FieldName::ConditionsNotConfigured => (C::Conditions, S::Default),
            FieldName::GrantNotConfigured => (C::Grant, S::Default),
            FieldName::SessionNotConfigured => (C::Session, S::Default),
        }
    }

    /// Category this field belongs to.
    pub fn category(self) -> Category {
        self.taxonomy().0
    }

    /// Subcategory this field belongs to.
    pub fn subcategory(self) -> Subcategory {
        self.taxonomy().1
    }

    /// Whether this is one of the six "nothing configured" sentinel fields.
    /// Sentinels exist only in the graph; the extractor never produces them.
    pub fn is_sentinel(self) -> bool {
        matches!(
            self,
            FieldName::UsersNone
                | FieldName::TargetResourcesNone
                | FieldName::NetworkNotConfigured
                | FieldName::ConditionsNotConfigured
                | FieldName::GrantNotConfigured
                | FieldName::SessionNotConfigured
        )
    }
}
