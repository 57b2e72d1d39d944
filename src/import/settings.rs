//! Text-import configuration: delimiters and the logical-field column map.
//!
//! Settings load from YAML; anything missing falls back to the defaults the
//! original export format uses. The configuration is threaded explicitly into
//! every normalization call, so two imports with different settings never
//! contaminate each other.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default row delimiter of the delimited-text export.
pub const DEFAULT_CSV_DELIMITER: char = ';';

/// Default character separating elements inside a list-valued cell.
pub const DEFAULT_COLLECTION_SPLIT_CHAR: char = ',';

/// Import configuration for the delimited-text adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportSettings {
    /// Row delimiter handed to the tokenizer.
    pub csv_delimiter: char,

    /// Character splitting list-valued cells into elements.
    pub collection_split_char: char,

    /// Logical field path (dot notation) to actual column header. An empty
    /// header means the column is not present in this export.
    pub column_map: IndexMap<String, String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            csv_delimiter: DEFAULT_CSV_DELIMITER,
            collection_split_char: DEFAULT_COLLECTION_SPLIT_CHAR,
            column_map: default_column_map(),
        }
    }
}

impl ImportSettings {
    /// Load settings from a YAML file, filling unmapped logical fields from
    /// the default column map.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or has invalid format.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read settings file {}: {}", path.display(), e))?;

        let mut settings: ImportSettings = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse settings YAML: {}", e))?;

        for (logical, header) in default_column_map() {
            settings.column_map.entry(logical).or_insert(header);
        }

        Ok(settings)
    }

    /// Resolve the column header mapped to a logical field path.
    ///
    /// Returns `None` when the field is unmapped or mapped to an empty
    /// header.
    pub fn header_for(&self, logical: &str) -> Option<&str> {
        self.column_map
            .get(logical)
            .map(String::as_str)
            .filter(|header| !header.is_empty())
    }
}

/// Column headers of the stock delimited-text export, keyed by logical field
/// path.
pub fn default_column_map() -> IndexMap<String, String> {
    [
        ("id", "ID"),
        ("displayName", "Name"),
        ("createdDateTime", "Created"),
        ("modifiedDateTime", "Modified"),
        ("state", "State"),
        ("conditions.applications.includeApplications", "includeApplications"),
        ("conditions.applications.excludeApplications", "excludeApplications"),
        ("conditions.applications.includeUserActions", "IncludeUserActions"),
        (
            "conditions.applications.includeAuthenticationContextClassReferences",
            "IncludeAuthenticationContextClassReferences",
        ),
        ("conditions.applications.applicationFilter", "ApplicationFilter"),
        ("conditions.authenticationFlows.transferMethods", "transferMethods"),
        ("conditions.clientApplications.includeServicePrincipals", "IncludeServicePrincipals"),
        ("conditions.clientApplications.excludeServicePrincipals", "ExcludeServicePrincipals"),
        ("conditions.clientApplications.servicePrincipalFilter", "ServicePrincipalFilter"),
        ("conditions.clientAppTypes", "clientAppTypes"),
        ("conditions.devices.deviceFilter", "DeviceFilter"),
        ("conditions.locations.includeLocations", "IncludeLocations"),
        ("conditions.locations.excludeLocations", "ExcludeLocations"),
        ("conditions.platforms.includePlatforms", "IncludePlatforms"),
        ("conditions.platforms.excludePlatforms", "ExcludePlatforms"),
        ("conditions.servicePrincipalRiskLevels", "ServicePrincipalRiskLevels"),
        ("conditions.signInRiskLevels", "SignInRiskLevels"),
        ("conditions.userRiskLevels", "UserRiskLevels"),
        ("conditions.insiderRiskLevels", "conditions.insiderRiskLevels"),
        ("conditions.users.includeUsers", "IncludeUsers"),
        ("conditions.users.excludeUsers", "ExcludeUsers"),
        ("conditions.users.includeGroups", "includeGroups"),
        ("conditions.users.excludeGroups", "excludeGroups"),
        ("conditions.users.includeRoles", "IncludeRoles"),
        ("conditions.users.excludeRoles", "ExcludeRoles"),
        ("conditions.users.includeGuestsOrExternalUsers", "IncludeGuestsOrExternalUsers"),
        ("conditions.users.excludeGuestsOrExternalUsers", "excludeGuestsOrExternalUsers"),
        ("grantControls.builtInControls", "BuiltInControls"),
        ("grantControls.customAuthenticationFactors", "CustomAuthenticationFactors"),
        ("grantControls.termsOfUse", "TermsOfUse"),
        ("grantControls.operator", "Operator"),
        ("grantControls.authenticationStrength", "grantControls.authenticationStrength"),
        (
            "sessionControls.applicationEnforcedRestrictions",
            "ApplicationEnforcedRestrictions",
        ),
        (
            "sessionControls.cloudAppSecurity.cloudAppSecurityType",
            "CloudAppSecurity_cloudAppSecurityType",
        ),
        ("sessionControls.persistentBrowser.mode", "PersistentBrowser_Mode"),
        ("sessionControls.signInFrequency.value", "SignInFrequency_Value"),
        ("sessionControls.signInFrequency.type", "SignInFrequency_Type"),
        (
            "sessionControls.signInFrequency.authenticationType",
            "SignInFrequency_AuthenticationType",
        ),
        (
            "sessionControls.signInFrequency.frequencyInterval",
            "SignInFrequency_FrequencyInterval",
        ),
        ("sessionControls.disableResilienceDefaults", "DisableResilienceDefaults"),
    ]
    .into_iter()
    .map(|(logical, header)| (logical.to_string(), header.to_string()))
    .collect()
}
