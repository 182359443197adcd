use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{DiagramState, Edge, Node, Viewport};
use crate::{Error, Result};

/// Version written by this build and the only one it reads.
pub const FORMAT_VERSION: u32 = 1;
pub const FILE_EXTENSION: &str = "syn";

// --- Types ---

/// Versioned on-disk form of a document, shared by the durable slot and
/// exported `.syn` files. Selection is never saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavedState {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(alias = "version", default = "current_version")]
    pub format_version: u32,
    /// ISO-8601 UTC timestamp of the save.
    #[serde(alias = "savedAt", default)]
    pub saved_at_iso: String,
}

fn current_version() -> u32 {
    FORMAT_VERSION
}

impl SavedState {
    pub fn capture(state: DiagramState, saved_at: DateTime<Utc>) -> Self {
        Self {
            nodes: state.nodes,
            edges: state.edges,
            viewport: state.viewport,
            format_version: FORMAT_VERSION,
            saved_at_iso: saved_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn into_diagram(self) -> DiagramState {
        DiagramState {
            nodes: self.nodes,
            edges: self.edges,
            viewport: self.viewport,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// --- Import ---

/// Parse a saved document. The text must be a JSON object carrying `nodes`
/// and `edges`; a version other than [`FORMAT_VERSION`] is refused before any
/// field is interpreted. Nothing partial is ever returned.
pub fn parse_saved_state(text: &str) -> Result<SavedState> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::Malformed(format!("not valid JSON: {e}")))?;
    let Value::Object(object) = &value else {
        return Err(Error::Malformed("top level is not a JSON object".into()));
    };
    for field in ["nodes", "edges"] {
        if !object.contains_key(field) {
            return Err(Error::MissingField(field));
        }
    }
    check_version(object)?;
    serde_json::from_value(value).map_err(|e| Error::Malformed(e.to_string()))
}

fn check_version(object: &Map<String, Value>) -> Result<()> {
    let Some(raw) = object.get("formatVersion").or_else(|| object.get("version")) else {
        return Ok(());
    };
    let supported = match raw {
        Value::Number(n) => n.as_u64() == Some(u64::from(FORMAT_VERSION)),
        _ => false,
    };
    if supported {
        Ok(())
    } else {
        Err(Error::UnsupportedVersion(raw.to_string()))
    }
}

// --- Export ---

/// `synapse-diagram-YYYY-MM-DD.syn`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("synapse-diagram-{}.{FILE_EXTENSION}", date.format("%Y-%m-%d"))
}

/// JSON Schema of the saved-document format.
pub fn saved_state_schema() -> Result<Value> {
    Ok(serde_json::to_value(schemars::schema_for!(SavedState))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Position, ServiceData, Size};
    use chrono::TimeZone;

    fn sample() -> DiagramState {
        DiagramState {
            nodes: vec![
                Node::service("a", Position::new(0.0, 0.0), ServiceData::new("A", "Server")),
                Node::service("b", Position::new(200.0, 0.0), ServiceData::new("B", "Database")),
            ],
            edges: vec![Edge::new("e", "a", "b")],
            viewport: Viewport { x: -12.5, y: 40.0, zoom: 0.75 },
        }
    }

    #[test]
    fn capture_stamps_version_and_millisecond_utc() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let saved = SavedState::capture(sample(), at);
        assert_eq!(saved.format_version, FORMAT_VERSION);
        assert_eq!(saved.saved_at_iso, "2024-03-09T14:05:00.000Z");

        let value = serde_json::to_value(&saved).unwrap();
        assert_eq!(value["formatVersion"], 1);
        assert!(value.get("savedAtIso").is_some());
    }

    #[test]
    fn export_then_import_is_lossless() {
        let state = sample();
        let text = SavedState::capture(state.clone(), Utc::now()).to_json_pretty().unwrap();
        assert_eq!(parse_saved_state(&text).unwrap().into_diagram(), state);
    }

    #[test]
    fn legacy_keys_are_accepted() {
        let saved = parse_saved_state(
            r#"{"nodes":[],"edges":[],"version":1,"savedAt":"2024-01-01T00:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(saved.saved_at_iso, "2024-01-01T00:00:00.000Z");
        assert_eq!(saved.viewport, Viewport::default());
    }

    #[test]
    fn files_from_the_web_editor_keep_node_sizes() {
        let saved = parse_saved_state(
            r#"{
                "nodes": [
                    {"id":"vpc","type":"group","position":{"x":50,"y":50},
                     "style":{"width":600,"height":400},
                     "data":{"label":"VPC","color":"cyan","description":""}},
                    {"id":"web","type":"service","position":{"x":100,"y":200},
                     "style":{"width":280,"height":180},"width":320,"height":200,
                     "data":{"label":"Web","icon":"Server","status":"idle","metadata":{"port":8080}}}
                ],
                "edges": [],
                "viewport": {"x":0,"y":0,"zoom":1},
                "version": 1,
                "savedAt": "2024-01-01T00:00:00.000Z"
            }"#,
        )
        .unwrap();
        assert_eq!(saved.nodes[0].size, Some(Size::new(600.0, 400.0)));
        assert_eq!(saved.nodes[1].size, Some(Size::new(320.0, 200.0)));

        let text = SavedState::capture(saved.clone().into_diagram(), Utc::now())
            .to_json_pretty()
            .unwrap();
        assert!(text.contains(r#""port": 8080"#));
        assert_eq!(parse_saved_state(&text).unwrap().nodes, saved.nodes);
    }

    #[test]
    fn missing_version_reads_as_current() {
        let saved = parse_saved_state(r#"{"nodes":[],"edges":[]}"#).unwrap();
        assert_eq!(saved.format_version, FORMAT_VERSION);
        assert!(saved.saved_at_iso.is_empty());
    }

    #[test]
    fn other_versions_are_refused() {
        for version in ["2", "0", "\"1\"", "1.0", "-1"] {
            let text = format!(r#"{{"nodes":[],"edges":[],"formatVersion":{version}}}"#);
            let err = parse_saved_state(&text).unwrap_err();
            assert!(matches!(err, Error::UnsupportedVersion(_)), "{version}");
        }
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(matches!(parse_saved_state("{nodes:"), Err(Error::Malformed(_))));
        assert!(matches!(parse_saved_state("[1,2]"), Err(Error::Malformed(_))));
        assert!(matches!(parse_saved_state(r#"{"nodes":[]}"#), Err(Error::MissingField("edges"))));
        assert!(matches!(
            parse_saved_state(r#"{"nodes":[{"id":"x","type":"note","data":{}}],"edges":[]}"#),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn file_name_embeds_the_date() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 2).unwrap();
        assert_eq!(export_file_name(date), "synapse-diagram-2025-11-02.syn");
    }

    #[test]
    fn schema_describes_the_top_level_keys() {
        let schema = saved_state_schema().unwrap();
        let props = schema["properties"].as_object().unwrap();
        for key in ["nodes", "edges", "viewport", "formatVersion", "savedAtIso"] {
            assert!(props.contains_key(key), "{key}");
        }
    }
}
