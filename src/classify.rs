//! Frame classification into actionable categories.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MethodCategory {
    Application,
    Framework,
    Noise,
}

impl MethodCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Framework => "framework",
            Self::Noise => "noise",
        }
    }
}

pub const DEFAULT_PRODUCT_MARKER: &str = "probotsharp";

/// Thread-pool, synchronization and wait machinery. Checked in order.
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    "semaphore",
    "monitor.wait",
    "monitor.enter",
    "thread.sleep",
    "thread.join",
    "waithandle",
    "taskawaiter",
    "spinwait",
    "manualresetevent",
    "threadpoolworkqueue.dispatch",
    "portablethreadpool",
    "workerthread.workerthreadstart",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodClassifier {
    product_marker: String,
    noise_patterns: Vec<String>,
}

impl Default for MethodClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_PRODUCT_MARKER,
            DEFAULT_NOISE_PATTERNS.iter().map(|p| p.to_string()),
        )
    }
}

impl MethodClassifier {
    pub fn new<I, S>(product_marker: &str, noise_patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            product_marker: product_marker.to_lowercase(),
            noise_patterns: noise_patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Noise wins over application: a wait inside product code is still not actionable.
    pub fn classify(&self, display_name: &str) -> MethodCategory {
        let lower = display_name.to_lowercase();
        if self.noise_patterns.iter().any(|p| lower.contains(p.as_str())) {
            return MethodCategory::Noise;
        }
        if !self.product_marker.is_empty() && lower.contains(&self.product_marker) {
            return MethodCategory::Application;
        }
        MethodCategory::Framework
    }
}
