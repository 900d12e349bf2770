use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Infrahub API types ---

#[derive(Debug, Serialize)]
pub(crate) struct GraphqlRequest<'a> {
    pub query: &'a str,
    pub variables: &'a Value,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlErrorEntry {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Branch {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sync_with_git: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaResponse {
    #[serde(default)]
    pub nodes: Vec<NodeSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSchema {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeSchema>,
    #[serde(default)]
    pub relationships: Vec<RelationshipSchema>,
}

impl NodeSchema {
    pub fn kind(&self) -> String {
        self.kind
            .clone()
            .unwrap_or_else(|| format!("{}{}", self.namespace, self.name))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeSchema {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipSchema {
    pub name: String,
    #[serde(default = "default_cardinality")]
    pub cardinality: String,
}

fn default_cardinality() -> String {
    "many".to_string()
}

impl RelationshipSchema {
    pub fn is_many(&self) -> bool {
        self.cardinality == "many"
    }
}

// --- Query rendering ---

/// Render a JSON value as a GraphQL input literal (object keys unquoted)
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let fields: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, render_literal(v)))
                .collect();
            format!("{{ {} }}", fields.join(", "))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(render_literal).collect();
            format!("[{}]", items.join(", "))
        }
        // JSON scalars share GraphQL's literal syntax
        other => other.to_string(),
    }
}

/// Render filter arguments, e.g. `(name__value: "atl", ids: ["x"])`
pub fn render_filters(filter: &Value) -> String {
    match filter {
        Value::Object(map) if !map.is_empty() => {
            let args: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, render_literal(v)))
                .collect();
            format!("({})", args.join(", "))
        }
        _ => String::new(),
    }
}

/// Build a list query for `kind` returning every attribute value and related id
pub fn build_list_query(schema: &NodeSchema, filter: &Value) -> String {
    let mut fields = vec!["id".to_string()];
    for attr in &schema.attributes {
        fields.push(format!("{} {{ value }}", attr.name));
    }
    for rel in &schema.relationships {
        if rel.is_many() {
            fields.push(format!("{} {{ edges {{ node {{ id }} }} }}", rel.name));
        } else {
            fields.push(format!("{} {{ node {{ id }} }}", rel.name));
        }
    }

    format!(
        "query {{ {}{} {{ edges {{ node {{ {} }} }} }} }}",
        schema.kind(),
        render_filters(filter),
        fields.join(" ")
    )
}

/// Convert a queried node into the seeder's field layout:
/// `{node: {id}}` becomes `{id}`, `{edges: [{node: {id}}]}` becomes `[{id}]`.
pub fn normalize_node(raw: &Map<String, Value>) -> (Option<String>, Map<String, Value>) {
    let mut id = None;
    let mut data = Map::new();

    for (key, value) in raw {
        if key == "id" {
            id = value.as_str().map(|s| s.to_string());
            continue;
        }
        let normalized = match value {
            Value::Object(obj) if obj.contains_key("edges") => {
                let ids: Vec<Value> = obj
                    .get("edges")
                    .and_then(|e| e.as_array())
                    .map(|edges| {
                        edges
                            .iter()
                            .filter_map(|edge| edge.pointer("/node/id").cloned())
                            .map(|id| serde_json::json!({ "id": id }))
                            .collect()
                    })
                    .unwrap_or_default();
                Value::Array(ids)
            }
            Value::Object(obj) if obj.contains_key("node") => match obj.get("node") {
                Some(Value::Object(peer)) => match peer.get("id") {
                    Some(id) => serde_json::json!({ "id": id }),
                    None => Value::Null,
                },
                _ => Value::Null,
            },
            other => other.clone(),
        };
        data.insert(key.clone(), normalized);
    }

    (id, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interface_schema() -> NodeSchema {
        serde_json::from_value(json!({
            "namespace": "Infra",
            "name": "InterfaceL3",
            "attributes": [{"name": "name"}, {"name": "enabled"}],
            "relationships": [
                {"name": "device", "cardinality": "one"},
                {"name": "ip_addresses", "cardinality": "many"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_render_literal() {
        assert_eq!(render_literal(&json!("atl")), "\"atl\"");
        assert_eq!(render_literal(&json!(["a", "b"])), "[\"a\", \"b\"]");
        assert_eq!(render_literal(&json!({"value": 7})), "{ value: 7 }");
    }

    #[test]
    fn test_render_filters() {
        assert_eq!(render_filters(&json!({})), "");
        assert_eq!(
            render_filters(&json!({"name__value": "atl-leaf1"})),
            "(name__value: \"atl-leaf1\")"
        );
    }

    #[test]
    fn test_schema_kind_falls_back_to_namespace_and_name() {
        assert_eq!(interface_schema().kind(), "InfraInterfaceL3");
    }

    #[test]
    fn test_build_list_query() {
        let query = build_list_query(&interface_schema(), &json!({"device__ids": ["d1"]}));
        assert_eq!(
            query,
            "query { InfraInterfaceL3(device__ids: [\"d1\"]) { edges { node { id name { value } \
             enabled { value } device { node { id } } ip_addresses { edges { node { id } } } } } } }"
        );
    }

    #[test]
    fn test_normalize_node() {
        let raw = json!({
            "id": "intf-1",
            "name": {"value": "Ethernet1"},
            "device": {"node": {"id": "dev-1"}},
            "status": {"node": null},
            "ip_addresses": {"edges": [{"node": {"id": "ip-1"}}, {"node": {"id": "ip-2"}}]}
        });
        let (id, data) = normalize_node(raw.as_object().unwrap());
        assert_eq!(id.as_deref(), Some("intf-1"));
        assert_eq!(data["name"], json!({"value": "Ethernet1"}));
        assert_eq!(data["device"], json!({"id": "dev-1"}));
        assert_eq!(data["status"], Value::Null);
        assert_eq!(data["ip_addresses"], json!([{"id": "ip-1"}, {"id": "ip-2"}]));
    }
}
