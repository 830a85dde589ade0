//! Per-thread decoding: one recording in, one frame ledger out.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::{
    EventedRecording, FrameEventKind, FrameId, FrameTable, SampledRecording, ThreadRecording,
};

/// Accumulated time for one frame.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FrameTotals {
    pub inclusive: f64,
    pub exclusive: f64,
    pub count: u64,
}

impl FrameTotals {
    fn record(&mut self, inclusive: f64, exclusive: f64) {
        self.inclusive += inclusive;
        self.exclusive += exclusive;
        self.count = self.count.saturating_add(1);
    }

    pub fn merge(&mut self, other: &FrameTotals) {
        self.inclusive += other.inclusive;
        self.exclusive += other.exclusive;
        self.count = self.count.saturating_add(other.count);
    }
}

/// Input that was tolerated rather than attributed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecodeDiagnostics {
    #[serde(rename = "discardedCloses")]
    pub discarded_closes: u64,
    #[serde(rename = "danglingOpens")]
    pub dangling_opens: u64,
    #[serde(rename = "outOfRangeRefs")]
    pub out_of_range_refs: u64,
}

impl DecodeDiagnostics {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    pub fn merge(&mut self, other: &DecodeDiagnostics) {
        self.discarded_closes = self.discarded_closes.saturating_add(other.discarded_closes);
        self.dangling_opens = self.dangling_opens.saturating_add(other.dangling_opens);
        self.out_of_range_refs = self.out_of_range_refs.saturating_add(other.out_of_range_refs);
    }
}

/// Per-thread time ledger, keyed by frame index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadLedger {
    pub frames: BTreeMap<FrameId, FrameTotals>,
    pub duration: f64,
    pub diagnostics: DecodeDiagnostics,
}

impl ThreadLedger {
    pub fn get(&self, id: FrameId) -> Option<&FrameTotals> {
        self.frames.get(&id)
    }

    fn record(&mut self, id: FrameId, inclusive: f64, exclusive: f64) {
        self.frames.entry(id).or_default().record(inclusive, exclusive);
    }
}

/// Reduces a recording to its ledger. Decoding never fails: input the
/// encoding cannot account for is counted in the ledger's diagnostics.
pub trait Decode {
    fn decode(&self, frames: &FrameTable) -> ThreadLedger;
}

impl Decode for ThreadRecording {
    fn decode(&self, frames: &FrameTable) -> ThreadLedger {
        match self {
            Self::Sampled(r) => r.decode(frames),
            Self::Evented(r) => r.decode(frames),
        }
    }
}

impl Decode for SampledRecording {
    fn decode(&self, frames: &FrameTable) -> ThreadLedger {
        let mut ledger = ThreadLedger::default();
        for (idx, sample) in self.samples.iter().enumerate() {
            let weight = sanitize(self.weight_at(idx));
            ledger.duration += weight;
            let Some(frame) = sample.leaf() else {
                continue;
            };
            if !frames.contains(frame) {
                ledger.diagnostics.out_of_range_refs += 1;
                continue;
            }
            ledger.record(frame, weight, weight);
        }
        ledger
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenFrame {
    frame: FrameId,
    opened_at: f64,
    children: f64,
}

impl Decode for EventedRecording {
    fn decode(&self, frames: &FrameTable) -> ThreadLedger {
        let mut ledger = ThreadLedger {
            duration: sanitize(self.end_value - self.start_value),
            ..ThreadLedger::default()
        };
        let mut stack: Vec<OpenFrame> = Vec::new();

        for event in &self.events {
            if !frames.contains(event.frame) {
                ledger.diagnostics.out_of_range_refs += 1;
                continue;
            }
            match event.kind {
                FrameEventKind::Open => stack.push(OpenFrame {
                    frame: event.frame,
                    opened_at: event.at,
                    children: 0.0,
                }),
                FrameEventKind::Close => {
                    if stack.last().is_none_or(|top| top.frame != event.frame) {
                        ledger.diagnostics.discarded_closes += 1;
                        continue;
                    }
                    let Some(open) = stack.pop() else {
                        continue;
                    };
                    let inclusive = sanitize(event.at - open.opened_at);
                    // corrupt input can report more child time than the interval holds
                    let exclusive = sanitize(inclusive - open.children);
                    ledger.record(open.frame, inclusive, exclusive);
                    if let Some(parent) = stack.last_mut() {
                        parent.children += inclusive;
                    }
                }
            }
        }

        ledger.diagnostics.dangling_opens = stack.len() as u64;
        ledger
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
