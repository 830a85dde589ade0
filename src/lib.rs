//! perftrace core library: speedscope trace reduction, hotspot metrics and
//! baseline verdicts, shared by the CLI.

mod classify;
mod cmd;
mod config;
mod engine;
mod metrics;
mod platform;
mod reporting;
mod runtime;
mod tracefile;
mod verdict;

pub use classify::*;
pub use cmd::*;
pub use config::*;
pub use engine::*;
pub use metrics::*;
pub use platform::*;
pub use reporting::*;
pub use runtime::*;
pub use tracefile::*;
pub use verdict::*;
