//! Integration tests for the full import-to-graph pipeline.

use std::io::Write;

use camapper::import::{from_api_policy, from_csv_row, read_policies_from_path, CsvRow};
use camapper::{
    extract_field_values, from_policy_collection, policy_matches_filter, DirectoryResolvers,
    FieldName, ImportSettings,
};
use serde_json::json;

fn csv_row(cells: &[(&str, &str)]) -> CsvRow {
    cells
        .iter()
        .map(|(header, cell)| (header.to_string(), cell.to_string()))
        .collect()
}

#[test]
fn test_csv_and_api_normalization_extract_identical_strings() {
    let settings = ImportSettings::default();
    let from_csv = from_csv_row(
        &csv_row(&[
            ("Name", "CA0001 - Baseline"),
            ("State", "enabled"),
            ("UserRiskLevels", "high,medium"),
            ("clientAppTypes", "browser"),
            ("IncludeUsers", "Alice"),
            ("IncludePlatforms", "iOS"),
            ("BuiltInControls", "mfa,compliantDevice"),
            ("Operator", "OR"),
            ("SignInFrequency_Value", "5"),
            ("SignInFrequency_Type", "hours"),
            ("SignInFrequency_FrequencyInterval", "timeBased"),
            (
                "IncludeGuestsOrExternalUsers",
                "@{guestOrExternalUserTypes=internalGuest; externalTenants=tenant1,tenant2}",
            ),
        ]),
        &settings,
    );

    let from_api = from_api_policy(
        &json!({
            "id": "guid-1",
            "displayName": "CA0001 - Baseline",
            "state": "enabled",
            "conditions": {
                "userRiskLevels": ["high", "medium"],
                "clientAppTypes": ["browser"],
                "platforms": {"includePlatforms": ["iOS"]},
                "users": {
                    "includeUsers": ["Alice"],
                    "includeGuestsOrExternalUsers": {
                        "guestOrExternalUserTypes": "internalGuest",
                        "externalTenants": {"members": ["tenant1", "tenant2"]}
                    }
                }
            },
            "grantControls": {
                "builtInControls": ["mfa", "compliantDevice"],
                "operator": "OR"
            },
            "sessionControls": {
                "signInFrequency": {
                    "value": 5,
                    "type": "hours",
                    "frequencyInterval": "timeBased"
                }
            }
        }),
        &DirectoryResolvers::default(),
    )
    .unwrap();

    // Both adapters must feed the extractor the same canonical data, so the
    // formatted strings are byte-identical.
    assert_eq!(extract_field_values(&from_csv), extract_field_values(&from_api));

    let values = extract_field_values(&from_csv);
    let grant: Vec<_> = values
        .get(&FieldName::BuiltInControls)
        .unwrap()
        .iter()
        .cloned()
        .collect();
    assert_eq!(grant, vec!["(OR) compliantDevice", "(OR) mfa"]);
    let guests: Vec<_> = values
        .get(&FieldName::IncludeGuestsOrExternalUsers)
        .unwrap()
        .iter()
        .cloned()
        .collect();
    assert_eq!(guests, vec!["internalGuest - tenant1", "internalGuest - tenant2"]);
    let frequency: Vec<_> = values
        .get(&FieldName::SignInFrequency)
        .unwrap()
        .iter()
        .cloned()
        .collect();
    assert_eq!(frequency, vec!["5 hours"]);
}

#[test]
fn test_file_to_graph_pipeline() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "Name;State;UserRiskLevels;IncludeUsers;BuiltInControls;Operator\n\
         CA0001 - MFA;enabled;high;Alice;mfa;OR\n\
         CA0002 - Block;enabled;high;;block;\n"
    )
    .unwrap();

    let settings = ImportSettings::default();
    let policies = read_policies_from_path(file.path(), &settings).unwrap();
    assert_eq!(policies.len(), 2);

    let graph = from_policy_collection(&policies, &[]);

    // The shared "high" risk node aggregates both codes exactly once each.
    let risk_node = graph
        .nodes
        .iter()
        .find(|n| n.name == FieldName::UserRiskLevels && n.value == "high")
        .expect("risk node");
    assert_eq!(risk_node.policies, vec!["CA0001".to_string(), "CA0002".to_string()]);

    // Per-policy edge-count law: edges equal the sum of adjacent-layer
    // Cartesian products, computed per policy.
    let mut expected_edges = 0;
    for code in ["CA0001", "CA0002"] {
        let mut per_layer = [0usize; 6];
        for node in &graph.nodes {
            if node.policies.iter().any(|p| p == code) {
                per_layer[node.category.position()] += 1;
            }
        }
        expected_edges += per_layer
            .windows(2)
            .map(|pair| pair[0] * pair[1])
            .sum::<usize>();
    }
    assert_eq!(graph.edges.len(), expected_edges);

    // Every edge connects nodes in adjacent layers, in order.
    for edge in &graph.edges {
        let layer1 = graph.nodes[edge.node1].category.position();
        let layer2 = graph.nodes[edge.node2].category.position();
        assert_eq!(layer2, layer1 + 1);
    }
}

#[test]
fn test_graph_node_values_round_trip_through_filters() {
    let settings = ImportSettings::default();
    let policies: Vec<_> = [
        csv_row(&[
            ("Name", "CA0001"),
            ("BuiltInControls", "mfa,compliantDevice"),
            ("Operator", "OR"),
        ]),
        csv_row(&[("Name", "CA0002"), ("BuiltInControls", "mfa")]),
    ]
    .iter()
    .map(|row| from_csv_row(row, &settings))
    .collect();

    let graph = from_policy_collection(&policies, &[]);

    // Clicking any node and filtering by its value must select exactly the
    // policies listed on that node. Sentinel nodes are graph-only and have no
    // filterable value.
    for node in graph.nodes.iter().filter(|n| !n.name.is_sentinel()) {
        for policy in &policies {
            let code = policy.code.as_deref().unwrap();
            let on_node = node.policies.iter().any(|p| p == code);
            assert_eq!(
                policy_matches_filter(policy, node.name, &node.value),
                on_node,
                "field {} value {:?} policy {}",
                node.name,
                node.value,
                code
            );
        }
    }
}
