//! Pipeline run state machine and report.
//!
//! ```text
//! INIT ──start──▶ RUNNING ──record_turn──▶ RUNNING
//!   │                │  ├── all chunks read ──▶ EXHAUSTED
//!   │                │  └── turns == cap ─────▶ CAPPED
//!   │                └──── fail ──────────────▶ FAILED
//!   └── no chunks ─────────────────────────────▶ EXHAUSTED
//! ```

use std::time::Duration;

use serde::Serialize;

/// Outward success sentinel for both terminal success states.
pub const DONE_SENTINEL: &str = "done";

/// State of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Inputs validated, no turn issued yet.
    Init,
    /// Turns in progress.
    Running,
    /// Every chunk was read.
    Exhausted,
    /// The turn cap was reached before the last chunk.
    Capped,
    /// A turn failed.
    Failed,
}

impl RunState {
    /// Returns `true` for terminal states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted | Self::Capped | Self::Failed)
    }
}

/// Successful terminal status reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Complete analysis.
    Exhausted,
    /// Partial analysis; chunks past the cap were skipped.
    Capped,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Exhausted => "exhausted",
            Self::Capped => "capped",
        })
    }
}

/// Turn bookkeeping for one run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    state: RunState,
    turns: usize,
    total_chunks: usize,
    cap: usize,
}

impl PipelineRun {
    /// Creates a run in [`RunState::Init`].
    #[must_use]
    pub const fn new(total_chunks: usize, cap: usize) -> Self {
        Self {
            state: RunState::Init,
            turns: 0,
            total_chunks,
            cap,
        }
    }

    /// Leaves `Init`: straight to `Exhausted` when there is nothing to read.
    pub const fn start(&mut self) {
        if matches!(self.state, RunState::Init) {
            self.state = if self.total_chunks == 0 {
                RunState::Exhausted
            } else {
                RunState::Running
            };
        }
    }

    /// Index of the chunk the next turn must read, while running.
    #[must_use]
    pub const fn next_chunk(&self) -> Option<usize> {
        match self.state {
            RunState::Running => Some(self.turns),
            _ => None,
        }
    }

    /// Records a completed turn and applies the stop conditions.
    pub const fn record_turn(&mut self) {
        if !matches!(self.state, RunState::Running) {
            return;
        }
        self.turns += 1;
        if self.turns >= self.total_chunks {
            self.state = RunState::Exhausted;
        } else if self.turns >= self.cap {
            self.state = RunState::Capped;
        }
    }

    /// Marks the run failed. A run that already ended keeps its state.
    pub const fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = RunState::Failed;
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Turns completed.
    #[must_use]
    pub const fn turns(&self) -> usize {
        self.turns
    }

    /// Chunks never presented to the primary agent.
    #[must_use]
    pub const fn chunks_skipped(&self) -> usize {
        self.total_chunks.saturating_sub(self.turns)
    }

    /// Successful terminal status, if the run ended successfully.
    #[must_use]
    pub const fn status(&self) -> Option<RunStatus> {
        match self.state {
            RunState::Exhausted => Some(RunStatus::Exhausted),
            RunState::Capped => Some(RunStatus::Capped),
            _ => None,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Always [`DONE_SENTINEL`].
    pub result: &'static str,
    /// Document locator.
    pub source: String,
    /// Exhausted or capped.
    pub status: RunStatus,
    /// Turns issued.
    pub turns: usize,
    /// Chunks the document produced.
    pub chunks_total: usize,
    /// Chunks discarded by the cap.
    pub chunks_skipped: usize,
    /// Delegations issued across all turns.
    pub delegations: usize,
    /// Tokens used by the primary and delegate agents.
    pub total_tokens: u64,
    /// Wall-clock duration.
    #[serde(serialize_with = "serialize_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

impl RunReport {
    /// The outward sentinel.
    #[must_use]
    pub const fn sentinel(&self) -> &'static str {
        self.result
    }

    /// Returns `true` if some chunks were never analyzed.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        matches!(self.status, RunStatus::Capped)
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn drive(total: usize, cap: usize) -> (PipelineRun, Vec<usize>) {
        let mut run = PipelineRun::new(total, cap);
        run.start();
        let mut seen = Vec::new();
        while let Some(i) = run.next_chunk() {
            seen.push(i);
            run.record_turn();
        }
        (run, seen)
    }

    #[test_case(1, 10, RunState::Exhausted, 1; "single chunk")]
    #[test_case(10, 10, RunState::Exhausted, 10; "exactly cap")]
    #[test_case(11, 10, RunState::Capped, 10; "one over cap")]
    #[test_case(50, 3, RunState::Capped, 3; "far over cap")]
    #[test_case(0, 10, RunState::Exhausted, 0; "empty document")]
    fn test_terminal_state(total: usize, cap: usize, state: RunState, turns: usize) {
        let (run, seen) = drive(total, cap);
        assert_eq!(run.state(), state);
        assert_eq!(run.turns(), turns);
        assert_eq!(seen, (0..turns).collect::<Vec<_>>());
        assert_eq!(run.chunks_skipped(), total - turns);
    }

    #[test]
    fn test_failed_run_stops() {
        let mut run = PipelineRun::new(5, 10);
        run.start();
        run.record_turn();
        run.fail();
        assert_eq!(run.next_chunk(), None);
        assert!(run.state().is_terminal());
        assert!(run.status().is_none());
        run.record_turn();
        assert_eq!(run.turns(), 1);
    }

    #[test]
    fn test_fail_after_end_keeps_state() {
        let (mut run, _) = drive(2, 10);
        run.fail();
        assert_eq!(run.state(), RunState::Exhausted);
        assert_eq!(run.status(), Some(RunStatus::Exhausted));
    }

    #[test]
    fn test_init_is_not_running() {
        let run = PipelineRun::new(3, 10);
        assert_eq!(run.state(), RunState::Init);
        assert_eq!(run.next_chunk(), None);
    }

    #[test]
    fn test_report_serialization() {
        let report = RunReport {
            result: DONE_SENTINEL,
            source: "https://imsdb.com/x".to_string(),
            status: RunStatus::Capped,
            turns: 10,
            chunks_total: 11,
            chunks_skipped: 1,
            delegations: 2,
            total_tokens: 500,
            elapsed: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(&report).unwrap_or_default();
        assert_eq!(json["result"], "done");
        assert_eq!(json["status"], "capped");
        assert_eq!(json["elapsed_ms"], 1500);
        assert!(report.is_partial());
    }
}
