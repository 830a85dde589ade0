//! Trace input format introspection for tooling and trace producers.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SchemaDoc {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    #[serde(rename = "requiredTopLevelKeys")]
    pub required_top_level_keys: Vec<&'static str>,
    #[serde(rename = "recordingVariants")]
    pub recording_variants: Vec<RecordingVariant>,
    #[serde(rename = "eventTypes")]
    pub event_types: Vec<&'static str>,
    #[serde(rename = "metricsSchemaVersion")]
    pub metrics_schema_version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingVariant {
    pub name: &'static str,
    #[serde(rename = "requiredKeys")]
    pub required_keys: Vec<&'static str>,
    #[serde(rename = "minimalExample")]
    pub minimal_example: serde_json::Value,
}

pub fn schema_doc() -> SchemaDoc {
    SchemaDoc {
        schema_version: "perftrace.schema_doc.v1".to_string(),
        required_top_level_keys: vec!["shared", "profiles"],
        recording_variants: vec![
            RecordingVariant {
                name: "sampled",
                required_keys: vec!["samples"],
                minimal_example: serde_json::json!({
                    "shared": { "frames": [{ "name": "MyApp!MyApp.Program.Main" }] },
                    "profiles": [
                        { "type": "sampled", "samples": [0, 0], "weights": [1, 3] }
                    ]
                }),
            },
            RecordingVariant {
                name: "evented",
                required_keys: vec!["type", "startValue", "endValue", "events"],
                minimal_example: serde_json::json!({
                    "shared": { "frames": [{ "name": "MyApp!MyApp.Program.Main" }] },
                    "profiles": [
                        {
                            "type": "evented",
                            "startValue": 0,
                            "endValue": 10,
                            "events": [
                                { "type": "open", "frame": 0, "at": 0 },
                                { "type": "close", "frame": 0, "at": 10 }
                            ]
                        }
                    ]
                }),
            },
        ],
        event_types: vec!["open", "close", "O", "C"],
        metrics_schema_version: crate::METRICS_SCHEMA_VERSION,
    }
}
