//! Trace analysis commands (`perftrace analyze|top|compare|schema`).

use clap::Subcommand;
use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::{
    AnalysisOptions, Comparison, Config, MetricsRecord, PerftraceError, PerftraceResult, TracePath,
    analyze_path, compare, find_trace_files, render_markdown, schema_doc, write_json, write_text,
};

const TRACE_HELP: &str = "Speedscope trace path or glob pattern (e.g. 'traces/*.speedscope.json').";

#[derive(Debug, Subcommand)]
pub enum TraceCommand {
    /// Reduce one or more traces to metrics records.
    Analyze {
        #[arg(value_name = "TRACE", required = true, help = TRACE_HELP)]
        traces: Vec<String>,
        /// Write the metrics record (or batch) as JSON.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Write a Markdown summary.
        #[arg(long, short = 'm')]
        markdown: Option<PathBuf>,
        /// Baseline metrics JSON to compare against; ignored when missing.
        #[arg(long, short = 'b')]
        baseline: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the top hotspots of a single trace.
    Top {
        #[arg(value_name = "TRACE")]
        trace: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Compare two previously written metrics records.
    Compare {
        #[arg(value_name = "CURRENT_METRICS")]
        current: PathBuf,
        #[arg(value_name = "BASELINE_METRICS")]
        baseline: PathBuf,
    },
    /// Describe the accepted trace input format.
    Schema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub trace: String,
    pub metrics: MetricsRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBatch {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    pub count: usize,
    pub results: Vec<AnalysisOutput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<TraceFailure>,
}

/// A trace in a batch that could not be read or decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFailure {
    pub trace: String,
    pub error: String,
}

pub fn trace_command(config: &Config, command: &TraceCommand) -> PerftraceResult<serde_json::Value> {
    config.validate()?;
    match command {
        TraceCommand::Analyze {
            traces,
            output,
            markdown,
            baseline,
            limit,
        } => {
            let mut options = config.analysis_options();
            if let Some(limit) = limit {
                options.top_limit = checked_limit(*limit)?;
            }
            let baseline = match baseline {
                Some(path) => load_baseline(path)?,
                None => None,
            };
            let files = find_trace_files(traces)?;
            if files.is_empty() {
                return Err(PerftraceError::InvalidArgument(format!(
                    "no trace files matched {traces:?}"
                )));
            }

            if let [file] = files.as_slice() {
                let single = analyze_one(config, file, &options, baseline.as_ref())?;
                if let Some(path) = markdown {
                    write_text(path, &render_markdown(&single.metrics, single.comparison.as_ref()))?;
                }
                if let Some(path) = output {
                    write_json(path, &single.metrics)?;
                }
                let value = serde_json::to_value(&single)?;
                return Ok(match &single.comparison {
                    Some(c) => with_verdict(value, c),
                    None => value,
                });
            }

            let mut results = Vec::with_capacity(files.len());
            let mut failures = Vec::new();
            for file in &files {
                match analyze_one(config, file, &options, baseline.as_ref()) {
                    Ok(result) => results.push(result),
                    Err(err) => {
                        tracing::warn!("skipping {}: {err}", file.display());
                        failures.push(TraceFailure {
                            trace: file.display().to_string(),
                            error: err.to_string(),
                        });
                    }
                }
            }

            if let Some(path) = markdown {
                let text = results
                    .iter()
                    .map(|r| render_markdown(&r.metrics, r.comparison.as_ref()))
                    .collect::<Vec<_>>()
                    .join("\n");
                write_text(path, &text)?;
            }

            let regression = results
                .iter()
                .filter_map(|r| r.comparison.as_ref())
                .any(|c| c.verdict.is_regression());
            let mut value = serde_json::to_value(AnalysisBatch {
                schema_version: "perftrace.analysis_batch.v1".to_string(),
                count: results.len(),
                results,
                failures,
            })?;
            if let Some(path) = output {
                write_json(path, &value)?;
            }
            if let Some(obj) = value.as_object_mut() {
                obj.insert("regression".to_string(), serde_json::json!(regression));
            }
            Ok(value)
        }
        TraceCommand::Top { trace, limit } => {
            let mut options = config.analysis_options();
            options.top_limit = checked_limit(*limit)?;
            let record = analyze_path(&TracePath::new(trace.clone()), &options)?;
            let mut out = serde_json::Map::new();
            out.insert(
                "schemaVersion".to_string(),
                serde_json::json!("perftrace.top.v1"),
            );
            out.insert("trace".to_string(), serde_json::json!(trace));
            out.insert("limit".to_string(), serde_json::json!(limit));
            if let Some(error) = &record.error {
                out.insert("empty".to_string(), serde_json::json!(true));
                out.insert("reason".to_string(), serde_json::json!(error));
            }
            out.insert(
                "wallClockMs".to_string(),
                serde_json::json!(record.wall_clock_ms),
            );
            out.insert("top".to_string(), serde_json::to_value(&record.top_methods)?);
            Ok(serde_json::Value::Object(out))
        }
        TraceCommand::Compare { current, baseline } => {
            let current_record = read_metrics(current)?;
            let baseline_record = read_metrics(baseline)?;
            let comparison = compare(&current_record, &baseline_record, &config.thresholds);
            let value = serde_json::json!({
                "schemaVersion": "perftrace.compare.v1",
                "current": current,
                "baseline": baseline,
                "comparison": comparison,
            });
            Ok(match &comparison {
                Some(c) => with_verdict(value, c),
                None => value,
            })
        }
        TraceCommand::Schema => Ok(serde_json::to_value(schema_doc())?),
    }
}

fn analyze_one(
    config: &Config,
    file: &Path,
    options: &AnalysisOptions,
    baseline: Option<&MetricsRecord>,
) -> PerftraceResult<AnalysisOutput> {
    let metrics = analyze_path(&TracePath::new(file.to_path_buf()), options)?;
    let comparison = baseline.and_then(|b| compare(&metrics, b, &config.thresholds));
    if let Some(c) = &comparison {
        tracing::info!(
            trace = %file.display(),
            delta_pct = c.delta_pct,
            verdict = c.verdict.label(),
            "compared against baseline"
        );
    }
    Ok(AnalysisOutput {
        trace: file.display().to_string(),
        metrics,
        comparison,
    })
}

fn checked_limit(limit: usize) -> PerftraceResult<usize> {
    if limit == 0 {
        return Err(PerftraceError::InvalidArgument(
            "--limit must be at least 1".to_string(),
        ));
    }
    Ok(limit)
}

fn with_verdict(mut value: serde_json::Value, comparison: &Comparison) -> serde_json::Value {
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "regression".to_string(),
            serde_json::json!(comparison.verdict.is_regression()),
        );
    }
    value
}

/// A missing baseline is not an error; the comparison is simply omitted.
fn load_baseline(path: &Path) -> PerftraceResult<Option<MetricsRecord>> {
    if !path.exists() {
        tracing::warn!("baseline {} not found; skipping comparison", path.display());
        return Ok(None);
    }
    read_metrics(path).map(Some)
}

fn read_metrics(path: &Path) -> PerftraceResult<MetricsRecord> {
    let bytes = std::fs::read(path).map_err(|err| {
        PerftraceError::InvalidArgument(format!(
            "cannot read metrics {}: {err}",
            path.display()
        ))
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        PerftraceError::Report(format!("{} is not a metrics record: {err}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_workspace(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("perftrace-cmd-{name}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("workspace");
        dir
    }

    fn sampled_trace(weight: u64) -> serde_json::Value {
        serde_json::json!({
            "shared": {"frames": [
                {"name": "App!MyApp.ProbotSharp.Handlers.Foo"},
                {"name": "System.Linq.Enumerable.ToList"}
            ]},
            "profiles": [{"type": "sampled", "samples": [0, 1, 0], "weights": [weight, 1, weight]}]
        })
    }

    fn write_trace(dir: &Path, name: &str, value: &serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_vec_pretty(value).expect("bytes")).expect("write");
        path
    }

    #[test]
    fn analyze_writes_metrics_and_markdown() {
        let ws = temp_workspace("analyze");
        let trace = write_trace(&ws, "trace.speedscope.json", &sampled_trace(10));
        let output = ws.join("out").join("metrics.json");
        let markdown = ws.join("out").join("summary.md");
        let cmd = TraceCommand::Analyze {
            traces: vec![trace.to_string_lossy().to_string()],
            output: Some(output.clone()),
            markdown: Some(markdown.clone()),
            baseline: None,
            limit: None,
        };
        let out = trace_command(&Config::default(), &cmd).expect("analyze");
        assert!(out.get("comparison").is_none());

        let written: MetricsRecord =
            serde_json::from_slice(&std::fs::read(&output).expect("read")).expect("parse");
        assert_eq!(written.wall_clock_ms, 21.0);
        assert_eq!(written.top_methods[0].method, "MyApp.ProbotSharp.Handlers.Foo");
        let md = std::fs::read_to_string(markdown).expect("read md");
        assert!(md.contains("# Performance Trace Analysis"));
    }

    #[test]
    fn analyze_against_baseline_reports_regression() {
        let ws = temp_workspace("baseline");
        let base_trace = write_trace(&ws, "base.speedscope.json", &sampled_trace(10));
        let baseline = ws.join("baseline.json");
        trace_command(
            &Config::default(),
            &TraceCommand::Analyze {
                traces: vec![base_trace.to_string_lossy().to_string()],
                output: Some(baseline.clone()),
                markdown: None,
                baseline: None,
                limit: None,
            },
        )
        .expect("baseline");

        let slow_trace = write_trace(&ws, "slow.speedscope.json", &sampled_trace(20));
        let out = trace_command(
            &Config::default(),
            &TraceCommand::Analyze {
                traces: vec![slow_trace.to_string_lossy().to_string()],
                output: None,
                markdown: None,
                baseline: Some(baseline),
                limit: None,
            },
        )
        .expect("compare");
        assert_eq!(
            out.pointer("/comparison/verdict").and_then(|v| v.as_str()),
            Some("regression")
        );
        assert_eq!(out.get("regression").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn missing_baseline_omits_comparison() {
        let ws = temp_workspace("missing-baseline");
        let trace = write_trace(&ws, "t.speedscope.json", &sampled_trace(3));
        let cmd = TraceCommand::Analyze {
            traces: vec![trace.to_string_lossy().to_string()],
            output: None,
            markdown: None,
            baseline: Some(ws.join("nope.json")),
            limit: None,
        };
        let out = trace_command(&Config::default(), &cmd).expect("analyze");
        assert!(out.get("comparison").is_none());
    }

    #[test]
    fn glob_selects_batch() {
        let ws = temp_workspace("batch");
        write_trace(&ws, "a.speedscope.json", &sampled_trace(1));
        write_trace(
            &ws,
            "b.speedscope.json",
            &serde_json::json!({"shared": {"frames": []}, "profiles": []}),
        );
        let cmd = TraceCommand::Analyze {
            traces: vec![format!("{}/*.speedscope.json", ws.display())],
            output: None,
            markdown: None,
            baseline: None,
            limit: Some(1),
        };
        let out = trace_command(&Config::default(), &cmd).expect("batch");
        assert_eq!(out.get("count").and_then(|v| v.as_u64()), Some(2));
        let results = out.get("results").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        assert_eq!(
            results[0].pointer("/metrics/topMethods").and_then(|v| v.as_array()).map(|v| v.len()),
            Some(1)
        );
        assert!(results[1].pointer("/metrics/error").is_some());
    }

    #[test]
    fn batch_survives_an_unreadable_trace() {
        let ws = temp_workspace("batch-bad");
        write_trace(&ws, "a.speedscope.json", &sampled_trace(2));
        std::fs::write(ws.join("b.speedscope.json"), b"{truncated").expect("write");
        write_trace(&ws, "c.speedscope.json", &sampled_trace(4));
        let cmd = TraceCommand::Analyze {
            traces: vec![format!("{}/*.speedscope.json", ws.display())],
            output: None,
            markdown: None,
            baseline: None,
            limit: None,
        };
        let out = trace_command(&Config::default(), &cmd).expect("batch");
        let batch: AnalysisBatch = serde_json::from_value(out.clone()).expect("batch shape");
        assert_eq!(batch.count, 2);
        assert_eq!(batch.failures.len(), 1);
        assert!(batch.failures[0].trace.ends_with("b.speedscope.json"));
        assert!(batch.results.iter().all(|r| r.metrics.error.is_none()));
        assert_eq!(out.get("regression").and_then(|v| v.as_bool()), Some(false));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let ws = temp_workspace("zero-limit");
        let trace = write_trace(&ws, "t.speedscope.json", &sampled_trace(1));
        let analyze = TraceCommand::Analyze {
            traces: vec![trace.to_string_lossy().to_string()],
            output: None,
            markdown: None,
            baseline: None,
            limit: Some(0),
        };
        assert!(matches!(
            trace_command(&Config::default(), &analyze),
            Err(PerftraceError::InvalidArgument(_))
        ));
        let top = TraceCommand::Top { trace, limit: 0 };
        assert!(matches!(
            trace_command(&Config::default(), &top),
            Err(PerftraceError::InvalidArgument(_))
        ));
    }

    #[test]
    fn compare_flags_regression_for_exit_code() {
        let ws = temp_workspace("compare-regression");
        let mut paths = Vec::new();
        for (name, weight) in [("base", 10), ("slow", 20)] {
            let trace = write_trace(&ws, &format!("{name}.speedscope.json"), &sampled_trace(weight));
            let metrics = ws.join(format!("{name}.metrics.json"));
            trace_command(
                &Config::default(),
                &TraceCommand::Analyze {
                    traces: vec![trace.to_string_lossy().to_string()],
                    output: Some(metrics.clone()),
                    markdown: None,
                    baseline: None,
                    limit: None,
                },
            )
            .expect("analyze");
            paths.push(metrics);
        }
        let cmd = TraceCommand::Compare {
            current: paths[1].clone(),
            baseline: paths[0].clone(),
        };
        let out = trace_command(&Config::default(), &cmd).expect("compare");
        assert_eq!(
            out.pointer("/comparison/verdict").and_then(|v| v.as_str()),
            Some("regression")
        );
        assert_eq!(out.get("regression").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn top_reports_empty_reason() {
        let ws = temp_workspace("top-empty");
        let trace = write_trace(
            &ws,
            "empty.speedscope.json",
            &serde_json::json!({"shared": {"frames": []}, "profiles": []}),
        );
        let out = trace_command(
            &Config::default(),
            &TraceCommand::Top { trace, limit: 5 },
        )
        .expect("top");
        assert_eq!(out.get("empty").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(out.get("top").and_then(|v| v.as_array()).map(|v| v.len()), Some(0));
    }

    #[test]
    fn compare_requires_readable_metrics() {
        let ws = temp_workspace("compare-missing");
        let cmd = TraceCommand::Compare {
            current: ws.join("current.json"),
            baseline: ws.join("baseline.json"),
        };
        let err = trace_command(&Config::default(), &cmd).expect_err("must fail");
        match err {
            PerftraceError::InvalidArgument(msg) => {
                assert!(msg.contains("cannot read metrics"), "message: {msg}");
            }
            other => panic!("expected invalid argument, got {other:?}"),
        }
    }

    #[test]
    fn schema_lists_both_encodings() {
        let out = trace_command(&Config::default(), &TraceCommand::Schema).expect("schema");
        let names = out
            .get("recordingVariants")
            .and_then(|v| v.as_array())
            .map(|v| v.iter().filter_map(|x| x.get("name")?.as_str()).collect::<Vec<_>>())
            .unwrap_or_default();
        assert_eq!(names, vec!["sampled", "evented"]);
    }
}
