//! Human-readable rendering of metrics records.

use serde::{Deserialize, Serialize};

use crate::{Comparison, MetricsRecord};

const MAX_METHOD_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Reporter {
    Pretty,
    Json,
    Markdown,
}

impl clap::ValueEnum for Reporter {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Pretty, Self::Json, Self::Markdown]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Pretty => clap::builder::PossibleValue::new("pretty"),
            Self::Json => clap::builder::PossibleValue::new("json"),
            Self::Markdown => clap::builder::PossibleValue::new("markdown"),
        })
    }
}

pub fn render_markdown(metrics: &MetricsRecord, comparison: Option<&Comparison>) -> String {
    let mut lines = vec!["# Performance Trace Analysis".to_string(), String::new()];

    if let Some(error) = &metrics.error {
        lines.push(format!("**Error:** {error}"));
        lines.push(String::new());
        return lines.join("\n");
    }

    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push(format!("- **Wall Clock:** {:.2} ms", metrics.wall_clock_ms));
    lines.push(format!(
        "- **CPU Time:** {:.2} ms ({:.2}% of wall clock)",
        metrics.cpu_time_ms, metrics.cpu_utilization_pct
    ));
    lines.push(format!("- **Thread Count:** {}", metrics.thread_count));
    lines.push(format!(
        "- **GC Activity:** {:.2} ms ({:.2}%)",
        metrics.gc_time_ms, metrics.gc_pct
    ));
    lines.push(format!(
        "- **Allocation Activity:** {:.2} ms ({:.2}%)",
        metrics.alloc_time_ms, metrics.alloc_pct
    ));
    if !metrics.diagnostics.is_clean() {
        lines.push(format!(
            "- **Unattributed Events:** discarded closes={}, dangling opens={}, out-of-range refs={}",
            metrics.diagnostics.discarded_closes,
            metrics.diagnostics.dangling_opens,
            metrics.diagnostics.out_of_range_refs
        ));
    }
    lines.push(String::new());

    if let Some(c) = comparison {
        lines.push("## Comparison to Baseline".to_string());
        lines.push(String::new());
        lines.push(format!("**Verdict:** {}", c.verdict.label()));
        lines.push(format!(
            "- **Wall Clock:** {:.2} ms -> {:.2} ms ({:+.2} ms, {:+.1}%)",
            c.baseline_wall_clock_ms, c.current_wall_clock_ms, c.delta_ms, c.delta_pct
        ));
        for shift in c.method_shifts.iter().take(5) {
            lines.push(format!(
                "- `{}`: {:+.2} ms",
                truncate_method(&shift.method),
                shift.delta_ms
            ));
        }
        lines.push(String::new());
    }

    lines.push(format!("## Top {} Hotspot Methods", metrics.top_methods.len()));
    lines.push(String::new());
    lines.push("| Method | Category | Samples | Exclusive | Excl % | Inclusive | Incl % |".to_string());
    lines.push("|--------|----------|---------|-----------|--------|-----------|--------|".to_string());
    for h in &metrics.top_methods {
        lines.push(format!(
            "| `{}` | {} | {} | {:.1} ms | {:.1}% | {:.1} ms | {:.1}% |",
            truncate_method(&h.method),
            h.category.as_str(),
            h.samples,
            h.exclusive_ms,
            h.exclusive_pct,
            h.inclusive_ms,
            h.inclusive_pct,
        ));
    }
    lines.push(String::new());

    lines.join("\n")
}

fn truncate_method(name: &str) -> String {
    if name.chars().count() <= MAX_METHOD_CHARS {
        return name.to_string();
    }
    let head = name.chars().take(MAX_METHOD_CHARS - 3).collect::<String>();
    format!("{head}...")
}
