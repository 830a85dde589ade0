//! Cross-thread aggregation of per-thread ledgers.

use std::collections::BTreeMap;

use crate::{DecodeDiagnostics, FrameId, FrameTotals, ThreadLedger};

/// Whole-trace totals.
///
/// Threads ran concurrently, so the wall clock is the longest single thread
/// while CPU time adds up across threads and may exceed it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceLedger {
    pub frames: BTreeMap<FrameId, FrameTotals>,
    pub wall_clock: f64,
    pub total_cpu: f64,
    pub thread_count: usize,
    pub diagnostics: DecodeDiagnostics,
}

impl TraceLedger {
    pub fn get(&self, id: FrameId) -> Option<&FrameTotals> {
        self.frames.get(&id)
    }

    pub fn total_count(&self) -> u64 {
        self.frames
            .values()
            .fold(0u64, |acc, t| acc.saturating_add(t.count))
    }

    /// `part` as a percentage of the wall clock; 0 when nothing elapsed.
    pub fn share_of_wall_clock(&self, part: f64) -> f64 {
        percent(part, self.wall_clock)
    }
}

pub fn aggregate<I>(ledgers: I) -> TraceLedger
where
    I: IntoIterator<Item = ThreadLedger>,
{
    let mut out = TraceLedger::default();
    for ledger in ledgers {
        out.thread_count += 1;
        out.wall_clock = out.wall_clock.max(ledger.duration);
        out.diagnostics.merge(&ledger.diagnostics);
        for (id, totals) in &ledger.frames {
            out.total_cpu += totals.exclusive;
            out.frames.entry(*id).or_default().merge(totals);
        }
    }
    out
}

pub(crate) fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 && whole.is_finite() {
        part / whole * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(duration: f64, frames: &[(FrameId, f64, f64)]) -> ThreadLedger {
        let mut out = ThreadLedger {
            duration,
            ..ThreadLedger::default()
        };
        for (id, inclusive, exclusive) in frames {
            out.frames.insert(
                *id,
                FrameTotals {
                    inclusive: *inclusive,
                    exclusive: *exclusive,
                    count: 1,
                },
            );
        }
        out
    }

    #[test]
    fn wall_clock_is_max_not_sum() {
        let trace = aggregate([ledger(100.0, &[]), ledger(250.0, &[])]);
        assert_eq!(trace.wall_clock, 250.0);
        assert_eq!(trace.thread_count, 2);
    }

    #[test]
    fn cpu_time_may_exceed_wall_clock() {
        let trace = aggregate([
            ledger(150.0, &[(0, 200.0, 200.0)]),
            ledger(150.0, &[(1, 200.0, 200.0)]),
        ]);
        assert_eq!(trace.wall_clock, 150.0);
        assert_eq!(trace.total_cpu, 400.0);
        assert!(trace.share_of_wall_clock(trace.total_cpu) > 100.0);
    }

    #[test]
    fn shared_frames_sum_across_threads() {
        let trace = aggregate([
            ledger(10.0, &[(3, 8.0, 5.0)]),
            ledger(20.0, &[(3, 12.0, 7.0), (4, 2.0, 2.0)]),
        ]);
        let shared = trace.get(3).copied().unwrap_or_default();
        assert_eq!((shared.inclusive, shared.exclusive, shared.count), (20.0, 12.0, 2));
        assert_eq!(trace.total_cpu, 14.0);
        assert_eq!(trace.total_count(), 3);
    }

    #[test]
    fn zero_threads_is_all_zero() {
        let trace = aggregate(Vec::new());
        assert_eq!(trace.wall_clock, 0.0);
        assert_eq!(trace.total_cpu, 0.0);
        assert_eq!(trace.thread_count, 0);
        assert_eq!(trace.share_of_wall_clock(5.0), 0.0);
    }

    #[test]
    fn diagnostics_are_summed() {
        let mut a = ledger(1.0, &[]);
        a.diagnostics.discarded_closes = 2;
        let mut b = ledger(1.0, &[]);
        b.diagnostics.discarded_closes = 1;
        b.diagnostics.dangling_opens = 4;
        let trace = aggregate([a, b]);
        assert_eq!(trace.diagnostics.discarded_closes, 3);
        assert_eq!(trace.diagnostics.dangling_opens, 4);
    }
}
