use serde::Deserialize;

/// Append related nodes to one relationship of a node
pub const RELATIONSHIP_ADD: &str = r#"
mutation RelationshipAdd($id: String!, $name: String!, $nodes: [RelatedNodeInput]!) {
    RelationshipAdd(data: { id: $id, name: $name, nodes: $nodes }) {
        ok
    }
}
"#;

/// Circuit endpoints of a site together with their circuit and provider
pub const CIRCUIT_ENDPOINTS_BY_SITE: &str = r#"
query CircuitEndpointsBySite($site_name: String!) {
    InfraCircuitEndpoint(site__name__value: $site_name) {
        edges {
            node {
                id
                circuit {
                    node {
                        id
                        circuit_id {
                            value
                        }
                        provider {
                            node {
                                name {
                                    value
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
"#;

// --- Response shapes ---

#[derive(Debug, Clone, Deserialize)]
pub struct Edges<T> {
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct One<T> {
    pub node: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValueOf<T> {
    pub value: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitEndpointsBySite {
    #[serde(rename = "InfraCircuitEndpoint")]
    pub endpoints: Edges<EndpointRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointRef {
    pub id: String,
    pub circuit: One<CircuitRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitRef {
    pub id: String,
    pub circuit_id: ValueOf<String>,
    pub provider: One<ProviderRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderRef {
    pub name: ValueOf<String>,
}

/// A circuit endpoint flattened for filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteCircuit {
    pub endpoint_id: String,
    pub circuit_id: String,
    pub circuit_label: String,
    pub provider: Option<String>,
}

impl CircuitEndpointsBySite {
    pub fn into_circuits(self) -> Vec<SiteCircuit> {
        self.endpoints
            .edges
            .into_iter()
            .filter_map(|edge| {
                let endpoint = edge.node;
                let circuit = endpoint.circuit.node?;
                Some(SiteCircuit {
                    endpoint_id: endpoint.id,
                    circuit_label: circuit.circuit_id.value.unwrap_or_else(|| circuit.id.clone()),
                    circuit_id: circuit.id,
                    provider: circuit.provider.node.and_then(|p| p.name.value),
                })
            })
            .collect()
    }
}
