//! `perftrace.toml` config loading.

use serde::{Deserialize, Serialize};

use std::path::Path;

use crate::{
    AnalysisOptions, DEFAULT_NOISE_PATTERNS, DEFAULT_PRODUCT_MARKER, MethodClassifier,
    PerftraceError, PerftraceResult, VerdictThresholds,
};

pub const DEFAULT_CONFIG_FILE: &str = "perftrace.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Namespace substring identifying first-party code.
    #[serde(default = "default_product_marker")]
    pub product_marker: String,

    /// Case-insensitive substrings marking non-actionable wait machinery.
    #[serde(default = "default_noise_patterns")]
    pub noise_patterns: Vec<String>,

    /// Number of hotspots kept in the metrics record.
    #[serde(default = "default_top_limit")]
    pub top_limit: usize,

    #[serde(default)]
    pub thresholds: VerdictThresholds,

    /// Default reporter for CLI commands.
    #[serde(default = "default_reporter")]
    pub reporter: crate::Reporter,
}

fn default_product_marker() -> String {
    DEFAULT_PRODUCT_MARKER.to_string()
}

fn default_noise_patterns() -> Vec<String> {
    DEFAULT_NOISE_PATTERNS.iter().map(|p| p.to_string()).collect()
}

fn default_top_limit() -> usize {
    10
}

fn default_reporter() -> crate::Reporter {
    crate::Reporter::Pretty
}

impl Default for Config {
    fn default() -> Self {
        Self {
            product_marker: default_product_marker(),
            noise_patterns: default_noise_patterns(),
            top_limit: default_top_limit(),
            thresholds: VerdictThresholds::default(),
            reporter: default_reporter(),
        }
    }
}

impl Config {
    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Rejects settings that would make every verdict or classification meaningless.
    pub fn validate(&self) -> PerftraceResult<()> {
        if self.product_marker.trim().is_empty() {
            return Err(PerftraceError::Config(
                "product_marker must not be empty".to_string(),
            ));
        }
        if self.top_limit == 0 {
            return Err(PerftraceError::Config("top_limit must be at least 1".to_string()));
        }
        let t = &self.thresholds;
        for (name, value) in [
            ("regression_pct", t.regression_pct),
            ("minor_pct", t.minor_pct),
            ("improvement_pct", t.improvement_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PerftraceError::Config(format!(
                    "thresholds.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if t.minor_pct > t.regression_pct {
            return Err(PerftraceError::Config(format!(
                "thresholds.minor_pct ({}) exceeds regression_pct ({})",
                t.minor_pct, t.regression_pct
            )));
        }
        Ok(())
    }

    pub fn classifier(&self) -> MethodClassifier {
        MethodClassifier::new(&self.product_marker, &self.noise_patterns)
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            classifier: self.classifier(),
            top_limit: self.top_limit,
        }
    }
}
