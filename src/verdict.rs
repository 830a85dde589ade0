//! Baseline comparison and regression verdicts.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::MetricsRecord;
use crate::metrics::round2;

pub const COMPARISON_SCHEMA_VERSION: &str = "perftrace.comparison.v1";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VerdictThresholds {
    /// Wall-clock growth above this percentage is a regression.
    pub regression_pct: f64,
    /// Wall-clock growth above this percentage is a minor impact.
    pub minor_pct: f64,
    /// Wall-clock shrinkage beyond this percentage is an improvement.
    pub improvement_pct: f64,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            regression_pct: 15.0,
            minor_pct: 5.0,
            improvement_pct: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Regression,
    MinorImpact,
    Improvement,
    NoSignificantChange,
}

impl Verdict {
    pub fn from_delta_pct(delta_pct: f64, thresholds: &VerdictThresholds) -> Self {
        if delta_pct > thresholds.regression_pct {
            Self::Regression
        } else if delta_pct > thresholds.minor_pct {
            Self::MinorImpact
        } else if delta_pct < -thresholds.improvement_pct {
            Self::Improvement
        } else {
            Self::NoSignificantChange
        }
    }

    pub fn is_regression(&self) -> bool {
        matches!(self, Self::Regression)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Regression => "regression",
            Self::MinorImpact => "minor impact",
            Self::Improvement => "improvement",
            Self::NoSignificantChange => "no significant change",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodShift {
    pub method: String,
    #[serde(rename = "baselineMs")]
    pub baseline_ms: f64,
    #[serde(rename = "currentMs")]
    pub current_ms: f64,
    #[serde(rename = "deltaMs")]
    pub delta_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comparison {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    #[serde(rename = "baselineWallClockMs")]
    pub baseline_wall_clock_ms: f64,
    #[serde(rename = "currentWallClockMs")]
    pub current_wall_clock_ms: f64,
    #[serde(rename = "deltaMs")]
    pub delta_ms: f64,
    #[serde(rename = "deltaPct")]
    pub delta_pct: f64,
    pub verdict: Verdict,
    #[serde(rename = "methodShifts")]
    pub method_shifts: Vec<MethodShift>,
}

/// Compares `current` against `baseline`. An empty trace on either side yields
/// no comparison.
pub fn compare(
    current: &MetricsRecord,
    baseline: &MetricsRecord,
    thresholds: &VerdictThresholds,
) -> Option<Comparison> {
    if baseline.is_empty_trace() {
        tracing::warn!("baseline carries no trace data; skipping comparison");
        return None;
    }
    if current.is_empty_trace() {
        tracing::warn!("current trace carries no data; skipping comparison");
        return None;
    }

    let lv = baseline.wall_clock_ms;
    let rv = current.wall_clock_ms;
    let delta = rv - lv;
    let delta_pct = if lv.abs() < f64::EPSILON {
        if rv.abs() < f64::EPSILON { 0.0 } else { 100.0 }
    } else {
        delta * 100.0 / lv
    };

    Some(Comparison {
        schema_version: COMPARISON_SCHEMA_VERSION.to_string(),
        baseline_wall_clock_ms: lv,
        current_wall_clock_ms: rv,
        delta_ms: delta,
        delta_pct: round2(delta_pct),
        verdict: Verdict::from_delta_pct(delta_pct, thresholds),
        method_shifts: method_shifts(current, baseline),
    })
}

fn method_shifts(current: &MetricsRecord, baseline: &MetricsRecord) -> Vec<MethodShift> {
    let mut by_method = BTreeMap::<&str, (f64, f64)>::new();
    for h in &baseline.top_methods {
        by_method.entry(h.method.as_str()).or_default().0 += h.exclusive_ms;
    }
    for h in &current.top_methods {
        by_method.entry(h.method.as_str()).or_default().1 += h.exclusive_ms;
    }

    let mut shifts = by_method
        .into_iter()
        .map(|(method, (baseline_ms, current_ms))| MethodShift {
            method: method.to_string(),
            baseline_ms,
            current_ms,
            delta_ms: current_ms - baseline_ms,
        })
        .filter(|s| s.delta_ms != 0.0)
        .collect::<Vec<_>>();
    shifts.sort_by(|a, b| {
        b.delta_ms
            .abs()
            .total_cmp(&a.delta_ms.abs())
            .then_with(|| a.method.cmp(&b.method))
    });
    shifts
}
