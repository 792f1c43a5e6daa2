use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::Local;

use crate::capture::domain::camera_device::{CameraDevice, DeviceConfig};
use crate::capture::frame_buffer::SharedState;
use crate::pipeline::periodic_processor::PeriodicProcessor;
use crate::shared::error::CameraError;

/// Builds a fresh, unopened device for each camera start.
pub type DeviceFactory = Box<dyn Fn() -> Box<dyn CameraDevice> + Send + Sync>;

/// Owns the dedicated frame-grabbing thread.
///
/// The thread reads as fast as the device delivers, overwrites the raw slot
/// with every frame, and runs the periodic processor inline after each read.
pub struct AcquisitionLoop {
    worker: Option<Worker>,
    /// Mirrors whether a worker is running, readable without locking the
    /// loop itself.
    active: Arc<AtomicBool>,
}

struct Worker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    done_rx: crossbeam_channel::Receiver<()>,
}

impl AcquisitionLoop {
    pub fn new() -> Self {
        Self {
            worker: None,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared handle to the running state, for status queries that must
    /// not wait on a start or stop in progress.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.active.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.running.load(Ordering::SeqCst))
    }

    /// Opens `device`, reads a first frame and spawns the grab thread.
    ///
    /// The open and the first read happen on the caller's thread, so a
    /// missing or broken camera fails here and the loop never reports
    /// running.
    pub fn start(
        &mut self,
        mut device: Box<dyn CameraDevice>,
        config: &DeviceConfig,
        state: Arc<SharedState>,
        processor: Arc<PeriodicProcessor>,
        read_backoff: Duration,
    ) -> Result<(), CameraError> {
        if self.is_running() {
            return Err(CameraError::AlreadyRunning);
        }
        // A previous worker that stopped on its own still needs reaping.
        self.reap();

        device
            .open(config)
            .map_err(|e| CameraError::DeviceUnavailable(format!("{}: {e}", config.device)))?;
        let first = match device.read() {
            Ok(frame) => frame,
            Err(e) => {
                device.release();
                return Err(CameraError::DeviceUnavailable(format!(
                    "{}: initial read failed: {e}",
                    config.device
                )));
            }
        };
        log::info!(
            "Camera {} started at {}x{}",
            config.device,
            first.width(),
            first.height()
        );

        let generation = state.begin_generation();
        state.store_raw(generation, first, Local::now());

        let running = Arc::new(AtomicBool::new(true));
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let thread_running = running.clone();
        let handle = std::thread::Builder::new()
            .name("camera-acquisition".into())
            .spawn(move || {
                run_loop(
                    device,
                    &thread_running,
                    generation,
                    &state,
                    &processor,
                    read_backoff,
                );
                let _ = done_tx.send(());
            })
            .map_err(|e| CameraError::DeviceUnavailable(format!("cannot spawn capture thread: {e}")))?;

        self.worker = Some(Worker {
            running,
            handle,
            done_rx,
        });
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Signals the thread to stop and waits up to `timeout` for it.
    ///
    /// Returns `false` when nothing was running. A thread that does not
    /// finish in time is detached with a warning; the device is released
    /// whenever its blocked read returns.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        let Some(worker) = self.worker.take() else {
            return false;
        };
        let was_running = worker.running.swap(false, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);

        match worker.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    log::error!("Camera acquisition thread panicked");
                }
                log::info!("Camera stopped");
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Camera thread did not stop within {:.1}s; detaching it",
                    timeout.as_secs_f64()
                );
            }
        }
        was_running
    }

    fn reap(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.handle.join();
        }
    }
}

impl Default for AcquisitionLoop {
    fn default() -> Self {
        Self::new()
    }
}

fn run_loop(
    mut device: Box<dyn CameraDevice>,
    running: &AtomicBool,
    generation: u64,
    state: &SharedState,
    processor: &PeriodicProcessor,
    read_backoff: Duration,
) {
    processor.run_if_due(Instant::now());

    while running.load(Ordering::SeqCst) {
        match device.read() {
            Ok(frame) => {
                if !running.load(Ordering::SeqCst)
                    || !state.store_raw(generation, frame, Local::now())
                {
                    break;
                }
                processor.run_if_due(Instant::now());
            }
            Err(e) => {
                log::warn!("Failed to read frame from camera: {e}");
                std::thread::sleep(read_backoff);
            }
        }
    }

    device.release();
    log::debug!("Camera acquisition loop exited");
}
