use anyhow::Result;
use perftrace::{AnalysisBatch, AnalysisOutput, MetricsRecord, Verdict, render_markdown};
use serde_json::Value;

const METHOD_COLUMN: usize = 60;

pub struct CliLogger {
    json: bool,
    no_color: bool,
}

impl CliLogger {
    pub fn new(json: bool, no_color: bool) -> Self {
        Self { json, no_color }
    }

    /// Compact JSON in json mode; otherwise a hotspot table for analyses and
    /// indented JSON for everything else.
    pub fn print_value(&self, value: &Value) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(value)?);
            return Ok(());
        }

        if let Ok(single) = serde_json::from_value::<AnalysisOutput>(value.clone()) {
            println!("{}", self.render_analysis(&single));
        } else if let Ok(batch) = serde_json::from_value::<AnalysisBatch>(value.clone()) {
            let blocks: Vec<String> = batch
                .results
                .iter()
                .map(|output| self.render_analysis(output))
                .collect();
            println!("{}", blocks.join("\n\n"));
        } else {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(())
    }

    /// Markdown for a single analysis; anything else falls back to the pretty form.
    pub fn print_markdown(&self, value: &Value) -> Result<()> {
        match serde_json::from_value::<AnalysisOutput>(value.clone()) {
            Ok(output) => {
                println!(
                    "{}",
                    render_markdown(&output.metrics, output.comparison.as_ref())
                );
                Ok(())
            }
            Err(_) => self.print_value(value),
        }
    }

    pub fn print_error(&self, msg: &str) {
        if self.json {
            println!("{}", serde_json::json!({ "status": "error", "message": msg }));
            return;
        }
        eprintln!("{} {msg}", self.style("error", "31;1"));
    }

    pub fn print_warning(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "status": "warning", "message": msg }));
            return;
        }
        eprintln!("{} {msg}", self.style("warn", "33;1"));
    }

    fn render_analysis(&self, output: &AnalysisOutput) -> String {
        let mut lines = vec![self.style(&output.trace, "1")];
        lines.extend(summary_lines(&output.metrics));
        if let Some(comparison) = &output.comparison {
            lines.push(format!(
                "  baseline   {:.2} ms -> {:.2} ms ({:+.2}%) {}",
                comparison.baseline_wall_clock_ms,
                comparison.current_wall_clock_ms,
                comparison.delta_pct,
                self.style(comparison.verdict.label(), verdict_color(comparison.verdict)),
            ));
        }
        if !output.metrics.top_methods.is_empty() {
            lines.push(String::new());
            lines.extend(hotspot_table(&output.metrics));
        }
        lines.join("\n")
    }

    fn style(&self, text: &str, ansi: &str) -> String {
        if self.no_color {
            return text.to_string();
        }
        format!("\x1b[{ansi}m{text}\x1b[0m")
    }
}

fn verdict_color(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Regression => "31;1",
        Verdict::MinorImpact => "33;1",
        Verdict::Improvement => "32;1",
        Verdict::NoSignificantChange => "37;1",
    }
}

fn summary_lines(metrics: &MetricsRecord) -> Vec<String> {
    if let Some(error) = &metrics.error {
        return vec![format!("  {error}")];
    }
    let mut lines = vec![
        format!("  wall clock {:.2} ms", metrics.wall_clock_ms),
        format!(
            "  cpu time   {:.2} ms ({:.2}%) across {} thread(s)",
            metrics.cpu_time_ms, metrics.cpu_utilization_pct, metrics.thread_count
        ),
        format!(
            "  gc         {:.2} ms ({:.2}%)  alloc {:.2} ms ({:.2}%)",
            metrics.gc_time_ms, metrics.gc_pct, metrics.alloc_time_ms, metrics.alloc_pct
        ),
    ];
    if !metrics.diagnostics.is_clean() {
        let d = &metrics.diagnostics;
        lines.push(format!(
            "  skipped    {} close(s), {} open(s), {} bad ref(s)",
            d.discarded_closes, d.dangling_opens, d.out_of_range_refs
        ));
    }
    lines
}

fn hotspot_table(metrics: &MetricsRecord) -> Vec<String> {
    let mut lines = vec![format!(
        "  {:>3}  {:<width$}  {:>10}  {:>7}  {:>8}  {}",
        "#",
        "method",
        "excl ms",
        "excl %",
        "samples",
        "category",
        width = METHOD_COLUMN
    )];
    for (rank, entry) in metrics.top_methods.iter().enumerate() {
        lines.push(format!(
            "  {:>3}  {:<width$}  {:>10.2}  {:>7.2}  {:>8}  {}",
            rank + 1,
            clip(&entry.method, METHOD_COLUMN),
            entry.exclusive_ms,
            entry.exclusive_pct,
            entry.samples,
            entry.category.as_str(),
            width = METHOD_COLUMN
        ));
    }
    lines
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_method_names_are_clipped_to_column() {
        let name = "x".repeat(80);
        let clipped = clip(&name, METHOD_COLUMN);
        assert_eq!(clipped.chars().count(), METHOD_COLUMN);
        assert!(clipped.ends_with('~'));
        assert_eq!(clip("short", METHOD_COLUMN), "short");
    }

    #[test]
    fn empty_record_summary_is_the_error_line() {
        let record = MetricsRecord::empty(time::OffsetDateTime::UNIX_EPOCH);
        let lines = summary_lines(&record);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(record.error.as_deref().unwrap_or("missing")));
        assert!(hotspot_table(&record).len() == 1);
    }

    #[test]
    fn verdict_appears_once_in_pretty_analysis() {
        let mut baseline = MetricsRecord::empty(time::OffsetDateTime::UNIX_EPOCH);
        baseline.error = None;
        baseline.wall_clock_ms = 100.0;
        let mut current = baseline.clone();
        current.wall_clock_ms = 150.0;
        let comparison = perftrace::compare(&current, &baseline, &Default::default());
        let output = AnalysisOutput {
            trace: "t.speedscope.json".to_string(),
            metrics: current,
            comparison,
        };
        let text = CliLogger::new(false, true).render_analysis(&output);
        assert_eq!(text.matches(Verdict::Regression.label()).count(), 1);
        assert!(text.contains("100.00 ms -> 150.00 ms (+50.00%)"));
    }
}
