use serde::{Deserialize, Serialize};

/// Icon used for keys missing from the catalog.
pub const DEFAULT_ICON: &str = "Box";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IconCategory {
    Compute,
    Network,
    Database,
    Messaging,
    Security,
    Monitoring,
    Templates,
}

impl IconCategory {
    /// Heading shown above the category in the asset palette.
    pub fn label(self) -> &'static str {
        match self {
            IconCategory::Compute => "Compute",
            IconCategory::Network => "Network",
            IconCategory::Database => "Data & Storage",
            IconCategory::Messaging => "Messaging",
            IconCategory::Security => "Security",
            IconCategory::Monitoring => "Observability",
            IconCategory::Templates => "Architecture Templates",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub category: IconCategory,
    /// Set for palette entries that drop a whole template.
    pub template_id: Option<&'static str>,
}

const fn icon(key: &'static str, name: &'static str, category: IconCategory) -> IconDescriptor {
    IconDescriptor { key, name, category, template_id: None }
}

const fn template(name: &'static str, template_id: &'static str) -> IconDescriptor {
    IconDescriptor {
        key: "LayoutTemplate",
        name,
        category: IconCategory::Templates,
        template_id: Some(template_id),
    }
}

use IconCategory::*;

pub static ICONS: &[IconDescriptor] = &[
    icon("Server", "Server / Bare Metal", Compute),
    icon("Box", "Virtual Machine", Compute),
    icon("Container", "Container / Pod", Compute),
    icon("Zap", "Function (Serverless)", Compute),
    icon("Cpu", "Microservice", Compute),
    icon("Clock", "Batch Job / Cron", Compute),
    icon("Smartphone", "Mobile Device", Compute),
    icon("Monitor", "Web Client", Compute),
    icon("Network", "Load Balancer", Network),
    icon("Router", "API Gateway", Network),
    icon("Globe", "CDN", Network),
    icon("Signpost", "DNS", Network),
    icon("BrickWall", "Firewall / WAF", Network),
    icon("Route", "VPN / Tunnel", Network),
    icon("Database", "Database (SQL)", Database),
    icon("FileJson", "NoSQL / Document", Database),
    icon("Layers", "Cache", Database),
    icon("HardDrive", "Object Storage", Database),
    icon("Warehouse", "Data Warehouse", Database),
    icon("Share2", "Graph DB", Database),
    icon("ListStart", "Message Queue", Messaging),
    icon("Activity", "Event Stream", Messaging),
    icon("RadioReceiver", "Pub/Sub", Messaging),
    icon("Bell", "Notification Service", Messaging),
    icon("Fingerprint", "Identity Provider", Security),
    icon("Key", "Key Management", Security),
    icon("Lock", "Certificate / SSL", Security),
    icon("Bot", "Bot / Crawler", Security),
    icon("Workflow", "CI/CD Pipeline", Monitoring),
    icon("ScrollText", "Log Aggregator", Monitoring),
    icon("BarChart3", "Metrics", Monitoring),
    icon("Library", "Registry", Monitoring),
    template("AWS Basic Web App", "aws-basic-web-app"),
    template("Azure Microservices", "azure-microservices"),
    template("GCP Big Data", "gcp-big-data"),
];

/// Exact lookup by icon key.
pub fn lookup(key: &str) -> Option<&'static IconDescriptor> {
    ICONS.iter().find(|d| d.key == key)
}

/// Lookup that never fails: unknown keys resolve to [`DEFAULT_ICON`].
pub fn resolve(key: &str) -> &'static IconDescriptor {
    lookup(key).unwrap_or(&FALLBACK)
}

static FALLBACK: IconDescriptor = icon(DEFAULT_ICON, "Virtual Machine", Compute);

pub fn by_category(category: IconCategory) -> impl Iterator<Item = &'static IconDescriptor> {
    ICONS.iter().filter(move |d| d.category == category)
}

/// Categories in palette order, each listed once.
pub fn categories() -> Vec<IconCategory> {
    let mut out: Vec<IconCategory> = Vec::new();
    for d in ICONS {
        if !out.contains(&d.category) {
            out.push(d.category);
        }
    }
    out
}

/// Case-insensitive match against display name or category.
pub fn search(query: &str) -> Vec<&'static IconDescriptor> {
    let query = query.to_lowercase();
    ICONS
        .iter()
        .filter(|d| {
            d.name.to_lowercase().contains(&query)
                || format!("{:?}", d.category).to_lowercase().contains(&query)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_fall_back_to_default() {
        assert_eq!(resolve("Database").name, "Database (SQL)");
        assert_eq!(resolve("NoSuchIcon").key, DEFAULT_ICON);
        assert!(lookup("NoSuchIcon").is_none());
    }

    #[test]
    fn categories_keep_palette_order() {
        let cats = categories();
        assert_eq!(cats.first(), Some(&Compute));
        assert_eq!(cats.last(), Some(&Templates));
        assert_eq!(cats.len(), 7);
    }

    #[test]
    fn search_matches_names_and_categories() {
        let hits = search("queue");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "ListStart");
        assert_eq!(search("SECURITY").len(), 4);
    }

    #[test]
    fn template_entries_carry_their_ids() {
        let ids: Vec<_> = by_category(Templates).filter_map(|d| d.template_id).collect();
        assert_eq!(ids, ["aws-basic-web-app", "azure-microservices", "gcp-big-data"]);
    }
}
