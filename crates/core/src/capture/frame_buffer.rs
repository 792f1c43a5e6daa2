use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::detection::domain::detector::TickDetections;
use crate::session::session_manager::{RecordingTarget, SessionState};
use crate::shared::frame::Frame;

/// A raw frame and the wall-clock time it was read.
#[derive(Clone, Debug)]
pub struct TimedFrame {
    pub frame: Frame,
    pub captured_at: DateTime<Local>,
}

/// Output of one processing tick.
#[derive(Clone, Debug)]
pub struct ProcessedFrame {
    pub annotated: Frame,
    pub processed_at: DateTime<Local>,
    pub detections: TickDetections,
}

/// Everything a processing tick needs, copied out under one lock.
#[derive(Clone, Debug)]
pub struct TickInput {
    /// Camera run the tick was claimed in.
    pub generation: u64,
    pub raw: TimedFrame,
    pub recording: Option<RecordingTarget>,
}

#[derive(Debug, Default)]
pub struct PipelineState {
    raw: Option<TimedFrame>,
    processed: Option<ProcessedFrame>,
    /// `None` means the next tick runs immediately.
    next_due: Option<Instant>,
    /// Bumped on every camera start and stop. Frame writes tagged with an
    /// older value come from a retired grab thread and are dropped.
    generation: u64,
    pub session: SessionState,
}

impl PipelineState {
    pub fn processed_frame(&self) -> Option<ProcessedFrame> {
        self.processed.clone()
    }
}

/// State shared between the acquisition thread and command callers.
///
/// One mutex guards all of it. Callers copy in or out and release; nothing
/// holds the guard across device reads, detector calls, file writes or
/// observer callbacks.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Mutex<PipelineState>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state, recovering from a poisoned lock.
    pub fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("Pipeline state lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Starts a new camera run: retires older writers and makes the next
    /// tick due immediately. Returns the run's generation.
    pub fn begin_generation(&self) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        state.next_due = None;
        state.generation
    }

    /// Replaces the raw slot. The previous frame is dropped unprocessed if
    /// no tick claimed it. Returns `false` for a retired generation.
    pub fn store_raw(&self, generation: u64, frame: Frame, captured_at: DateTime<Local>) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.raw = Some(TimedFrame { frame, captured_at });
        true
    }

    pub fn latest_raw(&self) -> Option<TimedFrame> {
        self.lock().raw.clone()
    }

    /// Claims a processing tick if one is due at `now`.
    ///
    /// On success the next due time becomes `now + interval` and a private
    /// copy of the newest raw frame is returned together with the session
    /// to record into. Without a raw frame nothing is claimed.
    pub fn claim_tick(&self, now: Instant, interval: Duration) -> Option<TickInput> {
        let mut state = self.lock();
        if matches!(state.next_due, Some(due) if now < due) {
            return None;
        }
        let raw = state.raw.clone()?;
        state.next_due = Some(now + interval);
        Some(TickInput {
            generation: state.generation,
            raw,
            recording: state.session.recording_target(),
        })
    }

    /// Publishes a tick's output. Returns `false` for a retired generation.
    pub fn swap_processed(&self, generation: u64, processed: ProcessedFrame) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.processed = Some(processed);
        true
    }

    pub fn processed(&self) -> Option<ProcessedFrame> {
        self.lock().processed_frame()
    }

    /// Empties both slots and retires the current generation.
    pub fn clear_frames(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.raw = None;
        state.processed = None;
    }

    pub fn with_session<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.lock().session)
    }
}
