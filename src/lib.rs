//! # Camapper: Conditional-Access Policy Graph Compilation
//!
//! Camapper ingests heterogeneous records describing access-control policies
//! and compiles them into a canonical model, a layered graph for visual
//! analysis, and a filter-evaluation engine for interactive querying.
//!
//! ## Features
//!
//! - **Canonical policy model**: one schema produced by every normalizer and
//!   consumed by all extraction logic
//! - **Two record normalizers**: delimited-text exports (configurable column
//!   map and list splitting) and the remote directory-service shape (typed
//!   boundary schema plus injected identifier resolution)
//! - **Single-source field extraction**: every formatting rule lives in one
//!   function shared by the graph compiler and the filter engine
//! - **Layered graph compilation**: aggregated nodes across six ordered
//!   categories, sentinel placeholders, per-policy edges
//!
//! ## Example: compile a graph from a delimited export
//!
//! ```ignore
//! use camapper::{from_policy_collection, read_policies_from_path, ImportSettings};
//!
//! let settings = ImportSettings::default();
//! let policies = read_policies_from_path("policies.csv", &settings)?;
//! let graph = from_policy_collection(&policies, &[]);
//! println!("{} nodes, {} edges", graph.nodes.len(), graph.edges.len());
//! ```

// Core modules
pub mod policy;
pub mod taxonomy;
pub mod extraction;
pub mod graph;
pub mod filter;

// Record normalizers and the async import boundary
pub mod import;

// Re-export key types
pub use policy::{derive_code, Policy, PolicyState};
pub use taxonomy::{Category, FieldName, Subcategory};
pub use extraction::{aggregate_field_values, extract_field_values, FieldValueSets};
pub use graph::{from_policy_collection, Graph, GraphEdge, GraphNode};
pub use filter::{policy_matches_filter, FilterOperator, FilterSet, PolicyFilter};

// Re-export import types
pub use import::{
    from_api_policy, from_csv_row, import_policies, read_policies_from_path, DirectoryLookup,
    DirectoryResolvers, ImportError, ImportReport, ImportSettings, PolicySource,
};
