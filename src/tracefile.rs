//! Speedscope trace document: the shared frame table plus per-thread recordings.

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::PerftraceResult;

/// Index of a frame in the trace's shared frame table.
pub type FrameId = usize;

#[derive(Debug, Clone)]
pub struct TracePath {
    path: PathBuf,
}

impl TracePath {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceDocument {
    #[serde(default)]
    pub shared: FrameTable,
    #[serde(default)]
    pub profiles: Vec<ThreadRecording>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exporter: Option<String>,
}

impl TraceDocument {
    pub fn from_slice(bytes: &[u8]) -> PerftraceResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn read_json(path: &TracePath) -> PerftraceResult<Self> {
        let bytes = std::fs::read(path.as_path())?;
        Self::from_slice(&bytes)
    }

    /// A trace with no frames or no recordings carries nothing to analyze.
    pub fn is_empty(&self) -> bool {
        self.shared.frames.is_empty() || self.profiles.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameTable {
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl FrameTable {
    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id)
    }

    pub fn contains(&self, id: FrameId) -> bool {
        id < self.frames.len()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    #[serde(default = "unknown_frame_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<u32>,
}

fn unknown_frame_name() -> String {
    "Unknown".to_string()
}

impl Frame {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: None,
            line: None,
            col: None,
        }
    }

    /// Method path with any `Module!` qualifier removed.
    pub fn display_name(&self) -> &str {
        match self.name.split_once('!') {
            Some((_, method)) => method,
            None => &self.name,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordingKind {
    #[default]
    Sampled,
    Evented,
}

/// One thread's recording, in either of the two speedscope encodings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawRecording", into = "RawRecording")]
pub enum ThreadRecording {
    Sampled(SampledRecording),
    Evented(EventedRecording),
}

impl ThreadRecording {
    pub fn kind(&self) -> RecordingKind {
        match self {
            Self::Sampled(_) => RecordingKind::Sampled,
            Self::Evented(_) => RecordingKind::Evented,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Sampled(r) => r.name.as_deref(),
            Self::Evented(r) => r.name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampledRecording {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub samples: Vec<SampleRef>,
    pub weights: Vec<f64>,
}

impl SampledRecording {
    /// Weight of the sample at `index`; samples beyond the weights array weigh 1.
    pub fn weight_at(&self, index: usize) -> f64 {
        self.weights.get(index).copied().unwrap_or(1.0)
    }
}

/// A sample is either a bare frame index or a full stack, root first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SampleRef {
    Frame(FrameId),
    Stack(Vec<FrameId>),
}

impl SampleRef {
    /// The frame the sample's weight is attributed to.
    pub fn leaf(&self) -> Option<FrameId> {
        match self {
            Self::Frame(id) => Some(*id),
            Self::Stack(stack) => stack.last().copied(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventedRecording {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub start_value: f64,
    pub end_value: f64,
    pub events: Vec<FrameEvent>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FrameEventKind {
    #[serde(rename = "open", alias = "O")]
    Open,
    #[serde(rename = "close", alias = "C")]
    Close,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FrameEvent {
    #[serde(rename = "type")]
    pub kind: FrameEventKind,
    pub frame: FrameId,
    #[serde(alias = "timestamp")]
    pub at: f64,
}

impl FrameEvent {
    pub fn open(frame: FrameId, at: f64) -> Self {
        Self {
            kind: FrameEventKind::Open,
            frame,
            at,
        }
    }

    pub fn close(frame: FrameId, at: f64) -> Self {
        Self {
            kind: FrameEventKind::Close,
            frame,
            at,
        }
    }
}

/// Wire shape shared by both encodings; `type` defaults to sampled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawRecording {
    #[serde(rename = "type", default)]
    kind: RecordingKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(rename = "startValue", default)]
    start_value: f64,
    #[serde(rename = "endValue", default)]
    end_value: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    samples: Vec<SampleRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    weights: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    events: Vec<FrameEvent>,
}

impl From<RawRecording> for ThreadRecording {
    fn from(raw: RawRecording) -> Self {
        match raw.kind {
            RecordingKind::Sampled => Self::Sampled(SampledRecording {
                name: raw.name,
                unit: raw.unit,
                samples: raw.samples,
                weights: raw.weights,
            }),
            RecordingKind::Evented => Self::Evented(EventedRecording {
                name: raw.name,
                unit: raw.unit,
                start_value: raw.start_value,
                end_value: raw.end_value,
                events: raw.events,
            }),
        }
    }
}

impl From<ThreadRecording> for RawRecording {
    fn from(recording: ThreadRecording) -> Self {
        match recording {
            ThreadRecording::Sampled(r) => Self {
                kind: RecordingKind::Sampled,
                name: r.name,
                unit: r.unit,
                samples: r.samples,
                weights: r.weights,
                ..Self::default()
            },
            ThreadRecording::Evented(r) => Self {
                kind: RecordingKind::Evented,
                name: r.name,
                unit: r.unit,
                start_value: r.start_value,
                end_value: r.end_value,
                events: r.events,
                ..Self::default()
            },
        }
    }
}
