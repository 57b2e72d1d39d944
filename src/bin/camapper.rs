//! camapper CLI - policy import, graph compilation, and filtering
//!
//! Normalizes conditional-access policy exports (delimited text or a saved
//! directory-service dump) into canonical policy JSON, compiles the layered
//! graph, and evaluates filters against a policy collection.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

use camapper::import::fetch::{import_policies, PolicySource, ResolvedObject};
use camapper::{
    from_policy_collection, read_policies_from_path, DirectoryResolvers, FilterOperator,
    FilterSet, ImportSettings, Policy, PolicyFilter, Subcategory,
};

#[derive(Parser)]
#[command(name = "camapper")]
#[command(version, about = "Conditional-access policy graph compilation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a delimited-text policy export into canonical policy JSON
    ImportCsv {
        /// Path to the exported CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Optional import settings YAML (delimiters + column map)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Output file for policy JSON (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalize a saved directory-service policy dump into policy JSON
    ImportApi {
        /// Path to the JSON dump (either a bare array or {"value": [...]})
        #[arg(short, long)]
        input: PathBuf,

        /// Optional resolver map YAML (directoryObjects + namedLocations)
        #[arg(short, long)]
        resolvers: Option<PathBuf>,

        /// Output file for policy JSON (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile the layered graph from canonical policy JSON
    Graph {
        /// Path to policy JSON produced by an import command
        #[arg(short, long)]
        policies: PathBuf,

        /// Subcategories to leave out of the graph, by display name
        #[arg(long, value_delimiter = ',')]
        ignore: Vec<String>,

        /// Output file for graph JSON (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Filter canonical policy JSON by field values
    Filter {
        /// Path to policy JSON produced by an import command
        #[arg(short, long)]
        policies: PathBuf,

        /// Filter rows as field=value pairs, e.g.
        /// conditions.userRiskLevels=high
        #[arg(short = 'w', long = "where")]
        filters: Vec<String>,

        /// How filter rows combine: AND or OR
        #[arg(long, default_value = "AND")]
        operator: String,

        /// Enablement-state pre-filter (enabled, disabled,
        /// enabledForReportingButNotEnforced)
        #[arg(long)]
        state: Option<String>,

        /// Output file for the filtered policy JSON (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::ImportCsv { input, settings, output } => import_csv(input, settings, output),
        Commands::ImportApi { input, resolvers, output } => import_api(input, resolvers, output),
        Commands::Graph { policies, ignore, output } => compile_graph(policies, ignore, output),
        Commands::Filter { policies, filters, operator, state, output } => {
            filter_policies(policies, filters, operator, state, output)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn import_csv(
    input: PathBuf,
    settings: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), String> {
    let settings = match settings {
        Some(path) => ImportSettings::load_from_file(path)?,
        None => ImportSettings::default(),
    };

    let policies = read_policies_from_path(&input, &settings)?;
    println!("  ✓ Normalized {} policies from {}", policies.len(), input.display());

    let without_code = policies.iter().filter(|p| p.code.is_none()).count();
    if without_code > 0 {
        println!("  ℹ {} policies lack a derivable code and will be excluded from graphs", without_code);
    }

    write_json(&policies, output.as_deref())
}

/// Offline policy source backed by a saved dump and resolver maps.
struct FileSource {
    policies: Vec<serde_json::Value>,
    resolvers: DirectoryResolvers,
}

impl PolicySource for FileSource {
    async fn fetch_policies(&self) -> Result<Vec<serde_json::Value>, String> {
        Ok(self.policies.clone())
    }

    async fn resolve_directory_objects(
        &self,
        ids: &[String],
    ) -> Result<Vec<ResolvedObject>, String> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.resolvers.directory_objects.get(id).map(|name| ResolvedObject {
                    id: id.clone(),
                    display_name: Some(name.clone()),
                })
            })
            .collect())
    }

    async fn resolve_named_location(&self, id: &str) -> Result<Option<String>, String> {
        Ok(self.resolvers.named_locations.get(id).cloned())
    }
}

fn import_api(
    input: PathBuf,
    resolvers: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), String> {
    let contents = std::fs::read_to_string(&input)
        .map_err(|e| format!("Failed to read dump file {}: {}", input.display(), e))?;
    let dump: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse dump JSON: {}", e))?;

    // The service wraps the list in {"value": [...]}; accept both forms.
    let raw_policies = match dump {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut object) => match object.remove("value") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Err("Dump JSON has no \"value\" array".to_string()),
        },
        _ => return Err("Dump JSON must be an array or an object".to_string()),
    };

    let resolvers = match resolvers {
        Some(path) => load_resolvers(&path)?,
        None => DirectoryResolvers::default(),
    };

    let source = FileSource { policies: raw_policies, resolvers };

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start async runtime: {}", e))?;
    let report = runtime
        .block_on(import_policies(&source))
        .map_err(|e| e.to_string())?;

    println!("  ✓ Normalized {} policies from {}", report.policies.len(), input.display());
    if !report.record_errors.is_empty() {
        println!("  ℹ Dropped {} malformed records", report.record_errors.len());
    }
    if report.unresolved_ids > 0 {
        println!("  ℹ {} identifiers left unresolved (raw identifiers kept)", report.unresolved_ids);
    }

    write_json(&report.policies, output.as_deref())
}

fn load_resolvers(path: &Path) -> Result<DirectoryResolvers, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read resolver file {}: {}", path.display(), e))?;
    serde_yaml::from_str(&contents).map_err(|e| format!("Failed to parse resolver YAML: {}", e))
}

fn compile_graph(
    policies_path: PathBuf,
    ignore: Vec<String>,
    output: Option<PathBuf>,
) -> Result<(), String> {
    let policies = load_policies(&policies_path)?;

    let mut ignored = Vec::new();
    for name in &ignore {
        let subcategory: Subcategory = name
            .parse()
            .map_err(|_| format!("Unknown subcategory: {:?}", name))?;
        ignored.push(subcategory);
    }

    let graph = from_policy_collection(&policies, &ignored);
    println!(
        "  ✓ Compiled graph: {} nodes, {} edges from {} policies",
        graph.nodes.len(),
        graph.edges.len(),
        policies.len()
    );

    write_json(&graph, output.as_deref())
}

fn filter_policies(
    policies_path: PathBuf,
    filters: Vec<String>,
    operator: String,
    state: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), String> {
    let policies = load_policies(&policies_path)?;

    let operator: FilterOperator = operator
        .parse()
        .map_err(|_| format!("Unknown operator {:?}, expected AND or OR", operator))?;
    let state = match state {
        Some(token) => Some(
            token
                .parse()
                .map_err(|_| format!("Unknown policy state: {:?}", token))?,
        ),
        None => None,
    };

    let mut rows = Vec::new();
    for raw in &filters {
        let (field, value) = raw
            .split_once('=')
            .ok_or_else(|| format!("Filter {:?} is not of the form field=value", raw))?;
        let field = field
            .parse()
            .map_err(|_| format!("Unknown filter field: {:?}", field))?;
        rows.push(PolicyFilter {
            field: Some(field),
            value: value.to_string(),
        });
    }

    let filter_set = FilterSet { filters: rows, operator, state };
    let filtered = filter_set.apply(&policies);
    println!("  ✓ {} of {} policies match", filtered.len(), policies.len());

    write_json(&filtered, output.as_deref())
}

fn load_policies(path: &Path) -> Result<Vec<Policy>, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read policy file {}: {}", path.display(), e))?;
    serde_json::from_str(&contents).map_err(|e| format!("Failed to parse policy JSON: {}", e))
}

fn write_json<T: serde::Serialize>(value: &T, output: Option<&Path>) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize output: {}", e))?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            println!("  ✓ Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
