//! Delimited-text record normalizer.
//!
//! Consumes parsed rows (header to cell maps) produced by the off-the-shelf
//! tokenizer and turns each into one canonical policy. Column lookup goes
//! through the configured column map and is case-insensitive on the header;
//! absent or blank cells become `None`/empty, never an error.

use std::io;
use std::path::Path;

use indexmap::IndexMap;

use crate::import::settings::ImportSettings;
use crate::policy::{
    parse_token, parse_token_list, derive_code, GuestsOrExternalUsers, Policy, SignInFrequency,
    TargetFilter, UnknownToken,
};

/// One parsed row of the export: column header to cell text.
pub type CsvRow = IndexMap<String, String>;

/// Normalize one parsed row into a policy.
pub fn from_csv_row(row: &CsvRow, settings: &ImportSettings) -> Policy {
    let reader = RowReader { row, settings };

    let display_name = reader.scalar("displayName");
    let id = reader.scalar("id");
    let code = derive_code(display_name.as_deref(), id.as_deref());

    let mut policy = Policy {
        id,
        display_name,
        code,
        description: None,
        created_date_time: reader.scalar("createdDateTime"),
        modified_date_time: reader.scalar("modifiedDateTime"),
        state: reader.enum_scalar("state"),
        ..Policy::default()
    };

    let conditions = &mut policy.conditions;
    conditions.applications.include_applications =
        reader.list("conditions.applications.includeApplications");
    conditions.applications.exclude_applications =
        reader.list("conditions.applications.excludeApplications");
    conditions.applications.include_user_actions =
        reader.enum_list("conditions.applications.includeUserActions");
    conditions
        .applications
        .include_authentication_context_class_references =
        reader.list("conditions.applications.includeAuthenticationContextClassReferences");
    conditions.applications.application_filter =
        reader.filter("conditions.applications.applicationFilter");

    conditions.authentication_flows.transfer_methods =
        reader.list("conditions.authenticationFlows.transferMethods");

    conditions.client_applications.include_service_principals =
        reader.list("conditions.clientApplications.includeServicePrincipals");
    conditions.client_applications.exclude_service_principals =
        reader.list("conditions.clientApplications.excludeServicePrincipals");
    conditions.client_applications.service_principal_filter =
        reader.filter("conditions.clientApplications.servicePrincipalFilter");

    conditions.client_app_types = reader.enum_list("conditions.clientAppTypes");
    conditions.devices.device_filter = reader.filter("conditions.devices.deviceFilter");

    conditions.locations.include_locations = reader.list("conditions.locations.includeLocations");
    conditions.locations.exclude_locations = reader.list("conditions.locations.excludeLocations");

    conditions.platforms.include_platforms =
        reader.enum_list("conditions.platforms.includePlatforms");
    conditions.platforms.exclude_platforms =
        reader.enum_list("conditions.platforms.excludePlatforms");

    conditions.service_principal_risk_levels =
        reader.enum_list("conditions.servicePrincipalRiskLevels");
    conditions.sign_in_risk_levels = reader.enum_list("conditions.signInRiskLevels");
    conditions.user_risk_levels = reader.enum_list("conditions.userRiskLevels");
    conditions.insider_risk_levels = reader.list("conditions.insiderRiskLevels");

    conditions.users.include_users = reader.list("conditions.users.includeUsers");
    conditions.users.exclude_users = reader.list("conditions.users.excludeUsers");
    conditions.users.include_groups = reader.list("conditions.users.includeGroups");
    conditions.users.exclude_groups = reader.list("conditions.users.excludeGroups");
    conditions.users.include_roles = reader.list("conditions.users.includeRoles");
    conditions.users.exclude_roles = reader.list("conditions.users.excludeRoles");
    conditions.users.include_guests_or_external_users =
        reader.guests("conditions.users.includeGuestsOrExternalUsers");
    conditions.users.exclude_guests_or_external_users =
        reader.guests("conditions.users.excludeGuestsOrExternalUsers");

    let grant = &mut policy.grant_controls;
    grant.built_in_controls = reader.enum_list("grantControls.builtInControls");
    grant.custom_authentication_factors =
        reader.list("grantControls.customAuthenticationFactors");
    grant.terms_of_use = reader.list("grantControls.termsOfUse");
    grant.operator = reader.enum_scalar("grantControls.operator");
    grant.authentication_strength = reader.scalar("grantControls.authenticationStrength");

    let session = &mut policy.session_controls;
    session.application_enforced_restrictions =
        reader.boolean("sessionControls.applicationEnforcedRestrictions");
    session.cloud_app_security =
        reader.enum_scalar("sessionControls.cloudAppSecurity.cloudAppSecurityType");
    session.persistent_browser = reader.enum_scalar("sessionControls.persistentBrowser.mode");
    session.disable_resilience_defaults =
        reader.boolean("sessionControls.disableResilienceDefaults");

    let sign_in_frequency = SignInFrequency {
        value: reader.number("sessionControls.signInFrequency.value"),
        frequency_type: reader.enum_scalar("sessionControls.signInFrequency.type"),
        authentication_type: reader.enum_scalar("sessionControls.signInFrequency.authenticationType"),
        frequency_interval: reader.enum_scalar("sessionControls.signInFrequency.frequencyInterval"),
    };
    if sign_in_frequency != SignInFrequency::default() {
        session.sign_in_frequency = Some(sign_in_frequency);
    }

    policy
}

/// Read and normalize every row of a delimited-text export.
///
/// The tokenizing itself is delegated to the `csv` crate, configured with the
/// settings' row delimiter; rows whose cells are all empty are skipped.
///
/// # Errors
/// Returns an error for an unreadable file, a non-ASCII row delimiter, or a
/// malformed record.
pub fn read_policies_from_path<P: AsRef<Path>>(
    path: P,
    settings: &ImportSettings,
) -> Result<Vec<Policy>, String> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| format!("Failed to open CSV file {}: {}", path.display(), e))?;
    read_policies_from_reader(file, settings)
}

/// Reader-based variant of [`read_policies_from_path`].
pub fn read_policies_from_reader<R: io::Read>(
    reader: R,
    settings: &ImportSettings,
) -> Result<Vec<Policy>, String> {
    if !settings.csv_delimiter.is_ascii() {
        return Err(format!(
            "CSV delimiter must be an ASCII character, got {:?}",
            settings.csv_delimiter
        ));
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(settings.csv_delimiter as u8)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| format!("Failed to read CSV headers: {}", e))?
        .clone();

    let mut policies = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record =
            record.map_err(|e| format!("Failed to parse CSV record {}: {}", index + 1, e))?;
        let row: CsvRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.to_string(), cell.to_string()))
            .collect();
        if row.values().all(|cell| cell.is_empty()) {
            continue;
        }
        policies.push(from_csv_row(&row, settings));
    }

    tracing::debug!("normalized {} rows from delimited text", policies.len());
    Ok(policies)
}

struct RowReader<'a> {
    row: &'a CsvRow,
    settings: &'a ImportSettings,
}

impl RowReader<'_> {
    /// Non-empty trimmed cell for a logical field, located case-insensitively
    /// through the column map.
    fn cell(&self, logical: &str) -> Option<&str> {
        let header = self.settings.header_for(logical)?;
        self.row
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(header))
            .map(|(_, cell)| cell.trim())
            .filter(|cell| !cell.is_empty())
    }

    fn scalar(&self, logical: &str) -> Option<String> {
        self.cell(logical).map(str::to_string)
    }

    fn list(&self, logical: &str) -> Vec<String> {
        match self.cell(logical) {
            Some(cell) => split_collection(cell, self.settings.collection_split_char),
            None => Vec::new(),
        }
    }

    fn enum_list<T>(&self, logical: &str) -> Vec<T>
    where
        T: std::str::FromStr<Err = UnknownToken>,
    {
        parse_token_list(logical, self.list(logical))
    }

    fn enum_scalar<T>(&self, logical: &str) -> Option<T>
    where
        T: std::str::FromStr<Err = UnknownToken>,
    {
        self.cell(logical).and_then(|cell| parse_token(logical, cell))
    }

    fn boolean(&self, logical: &str) -> Option<bool> {
        match self.cell(logical) {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }

    fn number(&self, logical: &str) -> Option<u32> {
        let cell = self.cell(logical)?;
        match cell.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("dropping non-numeric {} cell {:?}", logical, cell);
                None
            }
        }
    }

    /// A text export carries only the filter rule, never a mode.
    fn filter(&self, logical: &str) -> Option<TargetFilter> {
        self.scalar(logical).map(|rule| TargetFilter {
            mode: None,
            rule: Some(rule),
        })
    }

    fn guests(&self, logical: &str) -> Option<GuestsOrExternalUsers> {
        self.cell(logical)
            .and_then(|cell| parse_guests_cell(logical, cell, self.settings.collection_split_char))
    }
}

fn split_collection(cell: &str, split_char: char) -> Vec<String> {
    cell.split(split_char)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decompose a composite guest cell of the form
/// `@{guestOrExternalUserTypes=a,b; externalTenants=t1,t2}` into its
/// sub-lists.
fn parse_guests_cell(
    logical: &str,
    cell: &str,
    split_char: char,
) -> Option<GuestsOrExternalUsers> {
    let cell = cell.strip_prefix("@{")?;
    let content = cell.strip_suffix('}').unwrap_or(cell);

    let mut guests = GuestsOrExternalUsers::default();
    for part in content.split(';') {
        let Some((key, value)) = part.split_once('=') else { continue };
        match key.trim() {
            "guestOrExternalUserTypes" => {
                guests.guest_or_external_user_types =
                    parse_token_list(logical, split_collection(value, split_char));
            }
            "externalTenants" => {
                guests.external_tenants = split_collection(value, split_char);
            }
            _ => {}
        }
    }
    Some(guests)
}
