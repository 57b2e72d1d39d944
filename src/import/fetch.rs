//! Asynchronous import driver for the remote directory service.
//!
//! Everything network-shaped lives behind [`PolicySource`]; the driver owns
//! the orchestration the transport does not: collecting referenced
//! identifiers, batched resolution with per-identifier fallback, per-record
//! error isolation, and the final sorted report. A batch-level fetch failure
//! is the only typed error; everything below it degrades and continues.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::import::api::{from_api_policy, DirectoryResolvers};
use crate::policy::Policy;

/// Directory objects are resolved in batches of this many identifiers.
const DIRECTORY_BATCH_SIZE: usize = 1000;

/// Typed failure of an import run. Per-record and per-identifier problems are
/// not errors; only losing the policy list itself aborts the batch.
#[derive(Debug)]
pub enum ImportError {
    Fetch(String),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Fetch(message) => {
                write!(f, "failed to fetch the policy list: {}", message)
            }
        }
    }
}

impl std::error::Error for ImportError {}

/// One directory object returned by a batch resolution call.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedObject {
    pub id: String,
    pub display_name: Option<String>,
}

/// One record dropped during normalization.
#[derive(Debug, Clone, Serialize)]
pub struct RecordError {
    pub index: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Result of an import run: normalized policies sorted by code, plus what
/// was dropped or left unresolved along the way.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub policies: Vec<Policy>,
    pub record_errors: Vec<RecordError>,
    pub resolved_ids: usize,
    pub unresolved_ids: usize,
    pub imported_at: DateTime<Utc>,
}

/// Transport surface of the remote directory service.
///
/// Implementations are free to retry internally; the driver treats a fetch
/// failure as fatal and a resolution failure as degradable.
#[allow(async_fn_in_trait)]
pub trait PolicySource {
    /// Fetch the raw policy list.
    async fn fetch_policies(&self) -> Result<Vec<Value>, String>;

    /// Resolve a batch of directory object identifiers.
    async fn resolve_directory_objects(&self, ids: &[String]) -> Result<Vec<ResolvedObject>, String>;

    /// Resolve a single named location identifier.
    async fn resolve_named_location(&self, id: &str) -> Result<Option<String>, String>;
}

/// Identifiers referenced by a raw policy batch, grouped by directory object
/// kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferencedIds {
    pub users: IndexSet<String>,
    pub groups: IndexSet<String>,
    pub roles: IndexSet<String>,
    pub applications: IndexSet<String>,
    pub service_principals: IndexSet<String>,
    pub named_locations: IndexSet<String>,
}

impl ReferencedIds {
    /// All identifiers resolvable through the shared directory-object
    /// endpoint (everything except named locations), deduplicated.
    pub fn directory_object_ids(&self) -> Vec<String> {
        let mut ids: IndexSet<String> = IndexSet::new();
        ids.extend(self.users.iter().cloned());
        ids.extend(self.groups.iter().cloned());
        ids.extend(self.roles.iter().cloned());
        ids.extend(self.service_principals.iter().cloned());
        ids.extend(self.applications.iter().cloned());
        ids.into_iter().collect()
    }

    fn total(&self) -> usize {
        self.directory_object_ids().len() + self.named_locations.len()
    }
}

/// Collect every GUID-shaped identifier referenced in the raw policy list.
pub fn collect_referenced_ids(raw_policies: &[Value]) -> ReferencedIds {
    let mut referenced = ReferencedIds::default();

    for raw in raw_policies {
        let conditions = &raw["conditions"];
        let users = &conditions["users"];
        collect_guids(&users["includeUsers"], &mut referenced.users);
        collect_guids(&users["excludeUsers"], &mut referenced.users);
        collect_guids(&users["includeGroups"], &mut referenced.groups);
        collect_guids(&users["excludeGroups"], &mut referenced.groups);
        collect_guids(&users["includeRoles"], &mut referenced.roles);
        collect_guids(&users["excludeRoles"], &mut referenced.roles);

        let applications = &conditions["applications"];
        collect_guids(&applications["includeApplications"], &mut referenced.applications);
        collect_guids(&applications["excludeApplications"], &mut referenced.applications);

        let client_applications = &conditions["clientApplications"];
        collect_guids(
            &client_applications["includeServicePrincipals"],
            &mut referenced.service_principals,
        );
        collect_guids(
            &client_applications["excludeServicePrincipals"],
            &mut referenced.service_principals,
        );

        let locations = &conditions["locations"];
        collect_guids(&locations["includeLocations"], &mut referenced.named_locations);
        collect_guids(&locations["excludeLocations"], &mut referenced.named_locations);
    }

    referenced
}

fn collect_guids(value: &Value, into: &mut IndexSet<String>) {
    let Some(items) = value.as_array() else { return };
    for item in items {
        if let Some(id) = item.as_str() {
            if is_guid(id) {
                into.insert(id.to_string());
            }
        }
    }
}

/// Hyphenated GUID form, the only identifier shape the directory resolves.
fn is_guid(candidate: &str) -> bool {
    candidate.len() == 36 && Uuid::try_parse(candidate).is_ok()
}

/// Run a full import against a policy source.
///
/// Flow: fetch the raw list, resolve every referenced identifier (failed
/// batches and misses degrade to raw identifiers), normalize each record
/// (failures drop the record), and sort the result by policy code.
///
/// # Errors
/// Only a failure to fetch the policy list itself.
pub async fn import_policies<S: PolicySource>(source: &S) -> Result<ImportReport, ImportError> {
    let raw_policies = source.fetch_policies().await.map_err(ImportError::Fetch)?;
    if raw_policies.is_empty() {
        tracing::warn!("policy source returned no policies");
    }

    let referenced = collect_referenced_ids(&raw_policies);
    tracing::info!(
        users = referenced.users.len(),
        groups = referenced.groups.len(),
        roles = referenced.roles.len(),
        applications = referenced.applications.len(),
        service_principals = referenced.service_principals.len(),
        named_locations = referenced.named_locations.len(),
        "collected referenced identifiers"
    );

    let resolvers = resolve_referenced_ids(source, &referenced).await;
    let resolved_ids = resolvers.directory_objects.len() + resolvers.named_locations.len();
    let unresolved_ids = referenced.total().saturating_sub(resolved_ids);
    if unresolved_ids > 0 {
        tracing::warn!(
            "{} identifiers left unresolved; raw identifiers will be displayed",
            unresolved_ids
        );
    }

    let mut policies = Vec::new();
    let mut record_errors = Vec::new();
    for (index, raw) in raw_policies.iter().enumerate() {
        match from_api_policy(raw, &resolvers) {
            Ok(policy) => policies.push(policy),
            Err(message) => {
                let id = raw["id"].as_str().map(str::to_string);
                tracing::error!("dropping policy record {} ({:?}): {}", index, id, message);
                record_errors.push(RecordError { index, id, message });
            }
        }
    }
    policies.sort_by(|a, b| a.code.cmp(&b.code));

    tracing::info!(
        imported = policies.len(),
        dropped = record_errors.len(),
        "import completed"
    );

    Ok(ImportReport {
        policies,
        record_errors,
        resolved_ids,
        unresolved_ids,
        imported_at: Utc::now(),
    })
}

async fn resolve_referenced_ids<S: PolicySource>(
    source: &S,
    referenced: &ReferencedIds,
) -> DirectoryResolvers {
    let mut resolvers = DirectoryResolvers::default();

    let directory_ids = referenced.directory_object_ids();
    for chunk in directory_ids.chunks(DIRECTORY_BATCH_SIZE) {
        match source.resolve_directory_objects(chunk).await {
            Ok(objects) => {
                for object in objects {
                    if let Some(display_name) = object.display_name {
                        resolvers.directory_objects.insert(object.id, display_name);
                    }
                }
            }
            Err(message) => {
                // A lost batch only costs display names, not policies.
                tracing::error!("directory object batch failed: {}", message);
            }
        }
    }

    for id in &referenced.named_locations {
        match source.resolve_named_location(id).await {
            Ok(Some(display_name)) => {
                resolvers.named_locations.insert(id.clone(), display_name);
            }
            Ok(None) => {
                tracing::warn!("named location {} not found", id);
            }
            Err(message) => {
                tracing::warn!("failed to resolve named location {}: {}", id, message);
            }
        }
    }

    resolvers
}
