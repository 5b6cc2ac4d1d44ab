// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rimio::stats::IoStats;

use crate::core::error::ErrorFlags;

/// Notification emitted by a running test, in order.
///
/// `Finished` is always the last event of a run and comes exactly once;
/// it is preceded by exactly one `Succeeded` or `Failed`. A cancelled run
/// emits `Canceled` right before its `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum TestEvent {
    InitializationStarted { total: u64 },
    Initialized { reached: u64, mb_per_sec: f64 },
    WriteStarted,
    Written { reached: u64, mb_per_sec: f64 },
    VerifyStarted,
    Verified { reached: u64, mb_per_sec: f64 },
    CreateFailed { file_index: usize, offset: u64 },
    WriteFailed { offset: u64, size: u64 },
    VerifyFailed { offset: u64, size: u64 },
    Succeeded,
    Failed(ErrorFlags),
    Canceled,
    Finished,
}

/// Receiver of [`TestEvent`]s. Called synchronously from the test loop.
pub trait EventSink {
    fn on_event(&mut self, event: &TestEvent);
}

impl<F: FnMut(&TestEvent)> EventSink for F {
    #[inline]
    fn on_event(&mut self, event: &TestEvent) {
        self(event)
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    #[inline]
    fn on_event(&mut self, _event: &TestEvent) {}
}

/// Cooperative cancellation flag, shareable with signal handlers and
/// other threads. Polled at file and block boundaries only.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Planning,
    Initializing,
    Writing,
    Verifying,
    Succeeded,
    Failed,
    Canceled,
    CleanedUp,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::Succeeded | SessionPhase::Failed | SessionPhase::Canceled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Create,
    Write,
    Verify,
}

/// Where a run went wrong. `offset` is absolute in the test space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureDetail {
    pub kind: FailureKind,
    pub file_index: usize,
    pub offset: u64,
    pub size: u64,
}

impl FailureDetail {
    pub fn event(&self) -> TestEvent {
        match self.kind {
            FailureKind::Create => TestEvent::CreateFailed {
                file_index: self.file_index,
                offset: self.offset,
            },
            FailureKind::Write => TestEvent::WriteFailed {
                offset: self.offset,
                size: self.size,
            },
            FailureKind::Verify => TestEvent::VerifyFailed {
                offset: self.offset,
                size: self.size,
            },
        }
    }
}

/// Byte counters of the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub bytes_total: u64,
    pub bytes_written: u64,
    pub bytes_remaining: u64,
}

/// Final report of a run.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub phase: SessionPhase,
    pub errors: ErrorFlags,
    pub failure: Option<FailureDetail>,
    pub bytes_total: u64,
    pub bytes_written: u64,
    pub bytes_verified: u64,
    pub seed: Option<u64>,
    pub io: IoStats,
    pub elapsed: Duration,
}

impl TestOutcome {
    pub fn succeeded(&self) -> bool {
        self.phase == SessionPhase::Succeeded
    }

    pub fn canceled(&self) -> bool {
        self.phase == SessionPhase::Canceled
    }

    /// Bytes proven usable: everything on success, otherwise up to the
    /// first offset that failed.
    pub fn usable_bytes(&self) -> u64 {
        match (&self.phase, &self.failure) {
            (SessionPhase::Succeeded, _) => self.bytes_total,
            (_, Some(f)) => f.offset,
            _ => 0,
        }
    }
}
