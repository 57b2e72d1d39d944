//! Record normalizers and the asynchronous import boundary.
//!
//! Two independent adapters produce the canonical policy model: one for
//! delimited-text exports (configurable column map and list splitting) and
//! one for the remote directory-service shape (typed boundary schema plus
//! injected identifier resolution). The `fetch` module orchestrates the
//! async side: batched identifier resolution and per-record error isolation.

pub mod api;
pub mod csv;
pub mod fetch;
pub mod settings;

pub use self::api::{from_api_policy, DirectoryLookup, DirectoryResolvers, RawPolicy};
pub use self::csv::{from_csv_row, read_policies_from_path, CsvRow};
pub use self::fetch::{
    collect_referenced_ids, import_policies, ImportError, ImportReport, PolicySource,
    RecordError, ReferencedIds, ResolvedObject,
};
pub use self::settings::ImportSettings;
