//! Metrics record assembly from the aggregated trace ledger.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{DecodeDiagnostics, FrameId, FrameTable, MethodCategory, MethodClassifier, TraceLedger};

pub const METRICS_SCHEMA_VERSION: &str = "perftrace.metrics.v1";
pub const EMPTY_TRACE_ERROR: &str = "Empty trace file - no frames or profiles found";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotspotEntry {
    pub frame: FrameId,
    pub method: String,
    #[serde(rename = "inclusiveMs")]
    pub inclusive_ms: f64,
    #[serde(rename = "exclusiveMs")]
    pub exclusive_ms: f64,
    #[serde(rename = "inclusivePct")]
    pub inclusive_pct: f64,
    #[serde(rename = "exclusivePct")]
    pub exclusive_pct: f64,
    pub samples: u64,
    pub category: MethodCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsRecord {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    /// Set when the trace carried nothing to analyze; all metrics are zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "wallClockMs")]
    pub wall_clock_ms: f64,
    #[serde(rename = "cpuTimeMs")]
    pub cpu_time_ms: f64,
    /// Above 100 when threads ran in parallel.
    #[serde(rename = "cpuUtilizationPct")]
    pub cpu_utilization_pct: f64,
    #[serde(rename = "threadCount")]
    pub thread_count: usize,
    #[serde(rename = "totalSamples")]
    pub total_samples: u64,
    #[serde(rename = "topMethods")]
    pub top_methods: Vec<HotspotEntry>,
    #[serde(rename = "gcTimeMs")]
    pub gc_time_ms: f64,
    #[serde(rename = "gcPct")]
    pub gc_pct: f64,
    #[serde(rename = "allocTimeMs")]
    pub alloc_time_ms: f64,
    #[serde(rename = "allocPct")]
    pub alloc_pct: f64,
    #[serde(default)]
    pub diagnostics: DecodeDiagnostics,
    #[serde(rename = "sourceDigest", default, skip_serializing_if = "Option::is_none")]
    pub source_digest: Option<String>,
    pub timestamp: String,
}

impl MetricsRecord {
    pub fn empty(generated_at: OffsetDateTime) -> Self {
        Self {
            schema_version: METRICS_SCHEMA_VERSION.to_string(),
            error: Some(EMPTY_TRACE_ERROR.to_string()),
            wall_clock_ms: 0.0,
            cpu_time_ms: 0.0,
            cpu_utilization_pct: 0.0,
            thread_count: 0,
            total_samples: 0,
            top_methods: Vec::new(),
            gc_time_ms: 0.0,
            gc_pct: 0.0,
            alloc_time_ms: 0.0,
            alloc_pct: 0.0,
            diagnostics: DecodeDiagnostics::default(),
            source_digest: None,
            timestamp: format_timestamp(generated_at),
        }
    }

    pub fn is_empty_trace(&self) -> bool {
        self.error.is_some()
    }
}

pub fn build_metrics(
    ledger: &TraceLedger,
    frames: &FrameTable,
    classifier: &MethodClassifier,
    top_limit: usize,
    generated_at: OffsetDateTime,
) -> MetricsRecord {
    let mut ranked = ledger.frames.iter().collect::<Vec<_>>();
    // BTreeMap iteration is already index-ascending; the stable sort keeps that for ties.
    ranked.sort_by(|a, b| b.1.exclusive.total_cmp(&a.1.exclusive));

    let top_methods = ranked
        .into_iter()
        .take(top_limit)
        .map(|(id, totals)| {
            let method = display_name(frames, *id).to_string();
            HotspotEntry {
                frame: *id,
                category: classifier.classify(&method),
                method,
                inclusive_ms: totals.inclusive,
                exclusive_ms: totals.exclusive,
                inclusive_pct: round2(ledger.share_of_wall_clock(totals.inclusive)),
                exclusive_pct: round2(ledger.share_of_wall_clock(totals.exclusive)),
                samples: totals.count,
            }
        })
        .collect::<Vec<_>>();

    let mut gc_time_ms = 0.0;
    let mut alloc_time_ms = 0.0;
    for (id, totals) in &ledger.frames {
        let lower = display_name(frames, *id).to_lowercase();
        if lower.contains("gc") || lower.contains("garbage") {
            gc_time_ms += totals.exclusive;
        }
        if lower.contains("alloc") {
            alloc_time_ms += totals.exclusive;
        }
    }

    MetricsRecord {
        schema_version: METRICS_SCHEMA_VERSION.to_string(),
        error: None,
        wall_clock_ms: ledger.wall_clock,
        cpu_time_ms: ledger.total_cpu,
        cpu_utilization_pct: round2(ledger.share_of_wall_clock(ledger.total_cpu)),
        thread_count: ledger.thread_count,
        total_samples: ledger.total_count(),
        top_methods,
        gc_time_ms,
        gc_pct: round2(ledger.share_of_wall_clock(gc_time_ms)),
        alloc_time_ms,
        alloc_pct: round2(ledger.share_of_wall_clock(alloc_time_ms)),
        diagnostics: ledger.diagnostics,
        source_digest: None,
        timestamp: format_timestamp(generated_at),
    }
}

fn display_name(frames: &FrameTable, id: FrameId) -> &str {
    frames.get(id).map(|f| f.display_name()).unwrap_or("Unknown")
}

pub fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub(crate) fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}
