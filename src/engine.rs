//! Trace analysis pipeline: decode each thread, aggregate, build metrics.

use time::OffsetDateTime;

use crate::{
    Decode, MethodClassifier, MetricsRecord, PerftraceError, PerftraceResult, TraceDocument,
    TracePath, aggregate, build_metrics,
};

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub classifier: MethodClassifier,
    pub top_limit: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            classifier: MethodClassifier::default(),
            top_limit: 10,
        }
    }
}

/// Runs the full reduction over a parsed trace. Never fails: empty traces
/// produce an explicitly flagged, zeroed record.
pub fn analyze_document(doc: &TraceDocument, options: &AnalysisOptions) -> MetricsRecord {
    analyze_document_at(doc, options, OffsetDateTime::now_utc())
}

pub fn analyze_document_at(
    doc: &TraceDocument,
    options: &AnalysisOptions,
    generated_at: OffsetDateTime,
) -> MetricsRecord {
    if doc.is_empty() {
        tracing::warn!(
            frames = doc.shared.len(),
            profiles = doc.profiles.len(),
            "empty trace: no frames or profiles"
        );
        return MetricsRecord::empty(generated_at);
    }

    let ledgers = doc.profiles.iter().enumerate().map(|(idx, recording)| {
        let ledger = recording.decode(&doc.shared);
        tracing::debug!(
            thread = idx,
            name = recording.name().unwrap_or("unnamed"),
            kind = ?recording.kind(),
            frames = ledger.frames.len(),
            duration = ledger.duration,
            "decoded thread"
        );
        ledger
    });
    let trace = aggregate(ledgers);

    if !trace.diagnostics.is_clean() {
        tracing::warn!(
            discarded_closes = trace.diagnostics.discarded_closes,
            dangling_opens = trace.diagnostics.dangling_opens,
            out_of_range_refs = trace.diagnostics.out_of_range_refs,
            "trace contained events that could not be attributed"
        );
    }

    build_metrics(
        &trace,
        &doc.shared,
        &options.classifier,
        options.top_limit,
        generated_at,
    )
}

/// Parses and analyzes raw trace bytes, tagging the record with their digest.
pub fn analyze_bytes(bytes: &[u8], options: &AnalysisOptions) -> PerftraceResult<MetricsRecord> {
    let doc = TraceDocument::from_slice(bytes)?;
    let mut record = analyze_document(&doc, options);
    record.source_digest = Some(blake3::hash(bytes).to_hex().to_string());
    Ok(record)
}

pub fn analyze_path(path: &TracePath, options: &AnalysisOptions) -> PerftraceResult<MetricsRecord> {
    let shown = path.as_path().display();
    let bytes = std::fs::read(path.as_path())
        .map_err(|err| PerftraceError::Trace(format!("cannot read {shown}: {err}")))?;
    tracing::debug!("analyzing {} ({} bytes)", shown, bytes.len());
    analyze_bytes(&bytes, options)
        .map_err(|err| PerftraceError::Trace(format!("cannot decode {shown}: {err}")))
}
