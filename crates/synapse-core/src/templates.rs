use std::collections::HashMap;
use std::sync::OnceLock;

use crate::id::new_id;
use crate::model::{
    Edge, EdgeColor, EdgeData, GroupColor, GroupData, Node, NodeStatus, Position, ServiceData,
    Size,
};
use crate::store::DocumentStore;
use crate::{Error, Result};

/// A named prototype subgraph. Node and edge IDs are local to the template
/// and replaced on every instantiation.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Nodes and edges produced by one expansion, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Template IDs are the lowercased name with whitespace runs turned into `-`.
pub fn template_id(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

impl Template {
    fn new(name: &str, description: &str, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            id: template_id(name),
            name: name.to_string(),
            description: description.to_string(),
            nodes,
            edges,
        }
    }

    /// Copy of the template with fresh IDs, translated so its top-left-most
    /// node coordinates land on `at`.
    pub fn expand(&self, at: Position) -> Fragment {
        let min_x = self.nodes.iter().map(|n| n.position.x).fold(f64::INFINITY, f64::min);
        let min_y = self.nodes.iter().map(|n| n.position.y).fold(f64::INFINITY, f64::min);
        let (dx, dy) = if self.nodes.is_empty() {
            (0.0, 0.0)
        } else {
            (at.x - min_x, at.y - min_y)
        };

        let ids: HashMap<&str, String> = self
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), new_id()))
            .collect();
        let remap = |local: &str| ids.get(local).cloned().unwrap_or_else(|| local.to_string());

        let nodes = self
            .nodes
            .iter()
            .map(|n| Node {
                id: remap(&n.id),
                position: n.position.offset(dx, dy),
                ..n.clone()
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|e| Edge {
                id: new_id(),
                source: remap(&e.source),
                target: remap(&e.target),
                ..e.clone()
            })
            .collect();
        Fragment { nodes, edges }
    }
}

/// Built-in templates in palette order.
pub fn catalog() -> &'static [Template] {
    static CATALOG: OnceLock<Vec<Template>> = OnceLock::new();
    CATALOG.get_or_init(builtin)
}

pub fn find(id: &str) -> Option<&'static Template> {
    catalog().iter().find(|t| t.id == id)
}

/// Expand a catalog template at `at` and insert it: nodes first, then the
/// edges as one batch, all under a single undo checkpoint. Returns the new
/// node IDs.
pub fn instantiate(store: &mut DocumentStore, id: &str, at: Position) -> Result<Vec<String>> {
    let template = find(id).ok_or_else(|| Error::UnknownTemplate(id.to_string()))?;
    let fragment = template.expand(at);
    let node_ids: Vec<String> = fragment.nodes.iter().map(|n| n.id.clone()).collect();
    store.batch(|store| {
        for node in fragment.nodes {
            store.add_node(node);
        }
        store.add_edges(fragment.edges);
    });
    log::debug!("instantiated template {id} with {} nodes", node_ids.len());
    Ok(node_ids)
}

// --- Built-in data ---

fn service(id: &str, x: f64, y: f64, label: &str, icon: &str, status: NodeStatus) -> Node {
    Node::service(id, Position::new(x, y), ServiceData::new(label, icon).with_status(status))
}

fn group(id: &str, x: f64, y: f64, label: &str, color: GroupColor, description: &str, size: Size) -> Node {
    Node::group(
        id,
        Position::new(x, y),
        GroupData::new(label, color).with_description(description),
    )
    .with_size(size)
}

fn link(id: &str, source: &str, target: &str, color: EdgeColor) -> Edge {
    Edge::new(id, source, target).with_data(EdgeData::colored(color))
}

fn builtin() -> Vec<Template> {
    use NodeStatus::{Active, Idle};

    let mut monitor_link = link("g4", "process", "monitor", EdgeColor::Red);
    monitor_link.data.animated = false;

    vec![
        Template::new(
            "AWS Basic Web App",
            "Standard 3-tier web application with ELB, EC2, and RDS",
            vec![
                group("vpc", 50.0, 50.0, "VPC", GroupColor::Cyan, "Production Environment", Size::new(600.0, 400.0)),
                service("elb", 100.0, 200.0, "Load Balancer", "Network", Active),
                service("web1", 300.0, 150.0, "Web Server 1", "Server", Active),
                service("web2", 300.0, 250.0, "Web Server 2", "Server", Active),
                service("db", 500.0, 200.0, "Primary DB", "Database", Active),
            ],
            vec![
                link("e1", "elb", "web1", EdgeColor::Cyan),
                link("e2", "elb", "web2", EdgeColor::Cyan),
                link("e3", "web1", "db", EdgeColor::Purple),
                link("e4", "web2", "db", EdgeColor::Purple),
            ],
        ),
        Template::new(
            "Azure Microservices",
            "Kubernetes cluster with AKS, CosmosDB, and Azure Redis",
            vec![
                group("k8s", 50.0, 50.0, "AKS Cluster", GroupColor::Purple, "K8s Managed Service", Size::new(500.0, 400.0)),
                service("ingress", 100.0, 200.0, "Ingress", "Globe", Active),
                service("api", 250.0, 150.0, "API Service", "Cpu", Active),
                service("worker", 250.0, 250.0, "Worker", "Cpu", Idle),
                service("cosmos", 450.0, 150.0, "CosmosDB", "Database", Active),
                service("redis", 450.0, 250.0, "Cache", "Layers", Active),
            ],
            vec![
                link("t1", "ingress", "api", EdgeColor::Blue),
                link("t2", "api", "cosmos", EdgeColor::Cyan),
                link("t3", "api", "redis", EdgeColor::Yellow),
                link("t4", "api", "worker", EdgeColor::White),
            ],
        ),
        Template::new(
            "GCP Big Data",
            "Data processing pipeline with Pub/Sub, Dataflow, and BigQuery",
            vec![
                service("ingest", 50.0, 200.0, "Pub/Sub", "RadioReceiver", Active),
                service("process", 250.0, 200.0, "Dataflow", "Workflow", Active),
                service("store", 450.0, 200.0, "BigQuery", "Database", Active),
                service("analytics", 650.0, 200.0, "Looker", "BarChart3", Active),
                service("monitor", 450.0, 50.0, "Monitoring", "Activity", Active),
            ],
            vec![
                link("g1", "ingest", "process", EdgeColor::Yellow),
                link("g2", "process", "store", EdgeColor::Green),
                link("g3", "store", "analytics", EdgeColor::Blue),
                monitor_link,
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons;
    use std::collections::HashSet;

    #[test]
    fn ids_derive_from_names() {
        assert_eq!(template_id("AWS Basic Web App"), "aws-basic-web-app");
        assert_eq!(template_id("  GCP   Big Data "), "gcp-big-data");
        let ids: Vec<&str> = catalog().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["aws-basic-web-app", "azure-microservices", "gcp-big-data"]);
    }

    #[test]
    fn builtin_templates_are_well_formed() {
        for template in catalog() {
            let ids: HashSet<&str> = template.nodes.iter().map(|n| n.id.as_str()).collect();
            assert_eq!(ids.len(), template.nodes.len(), "{}", template.id);
            for edge in &template.edges {
                assert!(ids.contains(edge.source.as_str()), "{}", edge.id);
                assert!(ids.contains(edge.target.as_str()), "{}", edge.id);
            }
            for node in &template.nodes {
                if let Some(service) = node.as_service() {
                    assert!(icons::lookup(&service.icon_key).is_some(), "{}", service.icon_key);
                }
            }
        }
    }

    #[test]
    fn expansion_moves_the_corner_and_rewrites_ids() {
        let template = find("gcp-big-data").unwrap();
        let fragment = template.expand(Position::new(100.0, 100.0));

        let min_x = fragment.nodes.iter().map(|n| n.position.x).fold(f64::INFINITY, f64::min);
        let min_y = fragment.nodes.iter().map(|n| n.position.y).fold(f64::INFINITY, f64::min);
        assert_eq!((min_x, min_y), (100.0, 100.0));

        let ids: HashSet<&str> = fragment.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(template.nodes.iter().all(|n| !ids.contains(n.id.as_str())));
        for edge in &fragment.edges {
            assert!(ids.contains(edge.source.as_str()));
            assert!(ids.contains(edge.target.as_str()));
        }
        assert!(!fragment.edges[3].data.animated);
    }

    #[test]
    fn unmapped_endpoints_pass_through() {
        let template = Template::new(
            "Loose",
            "",
            vec![service("a", 0.0, 0.0, "A", "Box", NodeStatus::Idle)],
            vec![Edge::new("e", "a", "elsewhere")],
        );
        let fragment = template.expand(Position::default());
        assert_eq!(fragment.edges[0].source, fragment.nodes[0].id);
        assert_eq!(fragment.edges[0].target, "elsewhere");
    }

    #[test]
    fn instantiate_inserts_under_one_checkpoint() {
        let mut store = DocumentStore::new();
        let ids = instantiate(&mut store, "aws-basic-web-app", Position::new(100.0, 100.0)).unwrap();
        assert_eq!(ids.len(), 5);
        assert_eq!(store.nodes().len(), 5);
        assert_eq!(store.edges().len(), 4);
        assert_eq!(store.history().past_len(), 1);

        let vpc = store.nodes().iter().find(|n| n.is_group()).unwrap();
        assert_eq!(vpc.position, Position::new(100.0, 100.0));
        assert!(store.nodes().iter().filter(|n| !n.is_group()).all(|n| n.z_order > vpc.z_order));
    }

    #[test]
    fn unknown_template_is_rejected() {
        let mut store = DocumentStore::new();
        let err = instantiate(&mut store, "on-prem", Position::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownTemplate(id) if id == "on-prem"));
        assert!(store.nodes().is_empty());
        assert!(!store.can_undo());
    }
}
