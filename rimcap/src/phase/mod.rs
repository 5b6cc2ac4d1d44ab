// SPDX-License-Identifier: MIT

//! Test phases.
//!
//! Each phase runs to completion, to its first fault or to the first
//! checkpoint that observes cancellation. Faults are never retried.

use crate::core::{
    CancelToken, ErrorFlags, EventSink, FailureDetail, FailureKind, Pattern, Plan, Progress,
    TestEvent,
};

mod files;
mod initializer;
mod verifier;
mod writer;

pub(crate) use files::TestFiles;
pub(crate) use initializer::initialize;
pub(crate) use verifier::verify;
pub(crate) use writer::write;

/// Why a phase stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhaseError {
    Canceled,
    Fault {
        flags: ErrorFlags,
        detail: FailureDetail,
    },
}

impl PhaseError {
    pub(crate) fn fault(
        flags: ErrorFlags,
        kind: FailureKind,
        file_index: usize,
        offset: u64,
        size: u64,
    ) -> Self {
        PhaseError::Fault {
            flags,
            detail: FailureDetail {
                kind,
                file_index,
                offset,
                size,
            },
        }
    }
}

pub(crate) type PhaseResult<T = ()> = Result<T, PhaseError>;

/// Everything a phase reads or reports to, borrowed from the session.
pub(crate) struct PhaseContext<'a> {
    pub plan: &'a Plan,
    pub pattern: &'a Pattern,
    pub sync: bool,
    pub cancel: &'a CancelToken,
    pub sink: &'a mut dyn EventSink,
    pub progress: &'a mut Progress,
    /// Bytes proven by the verifier so far.
    pub verified: &'a mut u64,
}

impl PhaseContext<'_> {
    #[inline]
    pub(crate) fn emit(&mut self, event: TestEvent) {
        self.sink.on_event(&event);
    }

    /// Cancellation checkpoint.
    #[inline]
    pub(crate) fn checkpoint(&self) -> PhaseResult {
        if self.cancel.is_canceled() {
            Err(PhaseError::Canceled)
        } else {
            Ok(())
        }
    }
}
