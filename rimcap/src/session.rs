// SPDX-License-Identifier: MIT

//! Session controller.
//!
//! `Idle → Planning → Initializing → Writing → Verifying →
//! {Succeeded | Failed | Canceled} → CleanedUp`
//!
//! Every run owns fresh state: the plan, the open handles and the
//! counters live only for the duration of [`VolumeTester::start`], and
//! the test files are removed before `Finished` is emitted, whatever the
//! outcome.

use std::path::Path;
use std::time::Instant;

use rimio::stats::IoStats;

use crate::core::pattern::clock_seed;
use crate::core::*;
use crate::phase::{self, PhaseContext, PhaseError, PhaseResult, TestFiles};
use crate::volume::{Volume, sort_entries};

/// Capacity tester bound to one volume.
#[derive(Debug)]
pub struct VolumeTester<V: Volume> {
    volume: V,
    config: TesterConfig,
    cancel: CancelToken,
    phase: SessionPhase,
    progress: Progress,
    errors: ErrorFlags,
}

impl<V: Volume> VolumeTester<V> {
    /// Binds a tester to `volume`. Fails on an invalid configuration.
    pub fn new(volume: V, config: TesterConfig) -> CapResult<Self> {
        config.validate()?;
        Ok(Self {
            volume,
            config,
            cancel: CancelToken::new(),
            phase: SessionPhase::Idle,
            progress: Progress::default(),
            errors: ErrorFlags::UNKNOWN,
        })
    }

    #[inline]
    pub fn config(&self) -> &TesterConfig {
        &self.config
    }

    #[inline]
    pub fn volume(&self) -> &V {
        &self.volume
    }

    #[inline]
    pub fn volume_mut(&mut self) -> &mut V {
        &mut self.volume
    }

    pub fn into_volume(self) -> V {
        self.volume
    }

    // Queries

    #[inline]
    pub fn mountpoint(&self) -> &Path {
        self.volume.root()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.volume.is_valid()
    }

    fn space(&self) -> Option<crate::volume::SpaceInfo> {
        if !self.is_valid() {
            return None;
        }
        self.volume.space().ok()
    }

    pub fn bytes_total(&self) -> u64 {
        self.space().map_or(0, |s| s.total)
    }

    pub fn bytes_used(&self) -> u64 {
        self.space().map_or(0, |s| s.used)
    }

    pub fn bytes_available(&self) -> u64 {
        self.space().map_or(0, |s| s.available)
    }

    pub fn name(&self) -> Option<String> {
        if !self.is_valid() {
            return None;
        }
        self.volume.name().filter(|n| !n.is_empty())
    }

    /// `"<mountpoint>: <name>"`, the bare mountpoint when the volume has
    /// no name, or an empty string when the volume is invalid.
    pub fn label(&self) -> String {
        if !self.is_valid() {
            return String::new();
        }
        let root = self.mountpoint().display();
        match self.name() {
            Some(name) => format!("{root}: {name}"),
            None => root.to_string(),
        }
    }

    /// Root entries for display, directories suffixed with `/`.
    pub fn root_files(&self) -> Vec<String> {
        if !self.is_valid() {
            return vec![];
        }
        let Ok(mut entries) = self.volume.list_root() else {
            return vec![];
        };
        sort_entries(&mut entries);
        entries
            .into_iter()
            .map(|e| if e.is_dir { format!("{}/", e.name) } else { e.name })
            .collect()
    }

    /// Root entries carrying the test file prefix, left by an earlier run.
    pub fn conflict_files(&self) -> Vec<String> {
        if !self.is_valid() {
            return vec![];
        }
        self.find_conflicts().unwrap_or_default()
    }

    fn find_conflicts(&self) -> CapResult<Vec<String>> {
        let prefix = self.config.file_prefix.as_str();
        let mut names: Vec<String> = self
            .volume
            .list_root()?
            .into_iter()
            .filter(|e| e.name.starts_with(prefix))
            .map(|e| e.name)
            .collect();
        names.sort();
        Ok(names)
    }

    #[inline]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[inline]
    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Error classification of the current (or last) run.
    #[inline]
    pub fn errors(&self) -> ErrorFlags {
        self.errors
    }

    // Cancellation

    /// Requests cancellation; honored at the next file or block boundary.
    #[inline]
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle for requesting cancellation from elsewhere.
    #[inline]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    // Planning

    /// Checks that a run may start and returns the number of bytes to test.
    pub fn preflight(&self) -> CapResult<u64> {
        if !self.volume.is_valid() {
            return Err(CapError::InvalidMountpoint);
        }
        let conflicts = self.find_conflicts()?;
        if !conflicts.is_empty() {
            return Err(CapError::Conflicts(conflicts));
        }
        let available = self
            .volume
            .space()
            .map_err(|_| CapError::Volume("Could not query free space"))?
            .available;
        let bytes = match self.config.max_bytes {
            Some(max) => available.min(max),
            None => available,
        };
        if bytes == 0 {
            return Err(CapError::Volume("No space available on volume"));
        }
        Ok(bytes)
    }

    /// Plan of the next run.
    pub fn plan(&self) -> CapResult<Plan> {
        let bytes = self.preflight()?;
        Ok(Plan::new(
            self.volume.root(),
            &self.config.file_prefix,
            bytes,
            self.config.file_size_max,
            self.config.block_size_max,
        ))
    }

    // Run

    /// Runs a full test, reporting to `sink`, and returns its outcome.
    ///
    /// Blocks until the run is over. `sink` always receives exactly one
    /// `Finished`, last.
    pub fn start(&mut self, sink: &mut dyn EventSink) -> TestOutcome {
        let started = Instant::now();
        self.errors = ErrorFlags::UNKNOWN;
        self.progress = Progress::default();
        self.phase = SessionPhase::Planning;

        let mut failure = None;
        let mut verified = 0u64;
        let mut io = IoStats::default();
        let mut seed = None;

        match self.plan() {
            Ok(plan) => {
                let s = self.config.seed.unwrap_or_else(clock_seed);
                seed = Some(s);
                let pattern = Pattern::generate(self.config.block_size_max as usize, s);
                self.progress = Progress {
                    bytes_total: plan.total(),
                    bytes_written: 0,
                    bytes_remaining: plan.total(),
                };

                let mut files = TestFiles::new(&mut self.volume);
                let result = {
                    let mut ctx = PhaseContext {
                        plan: &plan,
                        pattern: &pattern,
                        sync: self.config.sync,
                        cancel: &self.cancel,
                        sink: &mut *sink,
                        progress: &mut self.progress,
                        verified: &mut verified,
                    };
                    run_phases(&mut files, &mut ctx, &mut self.phase)
                };
                io = files.io_stats();
                // A pending cancel marks any stopped run, faulted or not.
                if result.is_err() && self.cancel.is_canceled() {
                    self.errors |= ErrorFlags::ABORTED;
                }
                conclude(result, &mut self.phase, &mut self.errors, &mut failure, sink);
                // Cleanup.
                drop(files);
            }
            Err(e) => {
                self.errors = planning_flags(&e);
                self.phase = SessionPhase::Failed;
                sink.on_event(&TestEvent::Failed(self.errors));
            }
        }

        let terminal = self.phase;
        self.phase = SessionPhase::CleanedUp;
        self.cancel.reset();
        sink.on_event(&TestEvent::Finished);

        TestOutcome {
            phase: terminal,
            errors: self.errors,
            failure,
            bytes_total: self.progress.bytes_total,
            bytes_written: self.progress.bytes_written,
            bytes_verified: verified,
            seed,
            io,
            elapsed: started.elapsed(),
        }
    }
}

fn run_phases<V: Volume>(
    files: &mut TestFiles<'_, V>,
    ctx: &mut PhaseContext<'_>,
    phase: &mut SessionPhase,
) -> PhaseResult {
    *phase = SessionPhase::Initializing;
    ctx.emit(TestEvent::InitializationStarted {
        total: ctx.plan.total(),
    });
    phase::initialize(files, ctx)?;

    *phase = SessionPhase::Writing;
    ctx.emit(TestEvent::WriteStarted);
    phase::write(files.handles_mut(), ctx)?;

    *phase = SessionPhase::Verifying;
    ctx.emit(TestEvent::VerifyStarted);
    phase::verify(files.handles_mut(), ctx)
}

fn conclude(
    result: PhaseResult,
    phase: &mut SessionPhase,
    errors: &mut ErrorFlags,
    failure: &mut Option<FailureDetail>,
    sink: &mut dyn EventSink,
) {
    match result {
        Ok(()) => {
            *phase = SessionPhase::Succeeded;
            sink.on_event(&TestEvent::Succeeded);
        }
        Err(PhaseError::Canceled) => {
            *phase = SessionPhase::Canceled;
            sink.on_event(&TestEvent::Canceled);
            sink.on_event(&TestEvent::Failed(*errors));
        }
        Err(PhaseError::Fault { flags, detail }) => {
            *errors |= flags;
            *failure = Some(detail);
            *phase = SessionPhase::Failed;
            sink.on_event(&detail.event());
            sink.on_event(&TestEvent::Failed(*errors));
        }
    }
}

/// Space shortages and failed space queries are `FULL`; a root listing
/// that fails is only classified when it was denied.
fn planning_flags(e: &CapError) -> ErrorFlags {
    match e {
        CapError::Conflicts(_) => ErrorFlags::CONFLICT,
        CapError::Volume(_) => ErrorFlags::FULL,
        CapError::IO(io) if io.is_permission() => ErrorFlags::PERMISSIONS,
        _ => ErrorFlags::UNKNOWN,
    }
}
