use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::capture::frame_buffer::{ProcessedFrame, SharedState};
use crate::detection::domain::detector::DetectorSet;
use crate::session::captured_image::{session_image_name, CapturedImage, DetectionCounts};
use crate::shared::error::CameraError;
use crate::video::domain::image_writer::ImageWriter;

use super::annotator::annotate;
use super::capture_observer::CaptureObserver;

#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    pub interval: Duration,
    pub image_quality: u8,
    pub center_threshold_percent: u32,
    pub preview_path: PathBuf,
}

/// What one call to [`PeriodicProcessor::run_if_due`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Interval not elapsed yet, or no frame to process.
    NotDue,
    Processed {
        /// `None` when the preview write failed or the camera was stopped
        /// while the tick ran.
        preview: Option<PathBuf>,
        session_image: Option<PathBuf>,
    },
}

/// Runs detection, annotation, preview and session recording on the newest
/// frame at most once per interval.
///
/// Called inline by the acquisition thread after every read. Failures are
/// logged and contained here; nothing propagates back into the loop.
pub struct PeriodicProcessor {
    state: Arc<SharedState>,
    detectors: Mutex<DetectorSet>,
    writer: Arc<dyn ImageWriter>,
    observer: Arc<dyn CaptureObserver>,
    config: ProcessorConfig,
}

impl PeriodicProcessor {
    pub fn new(
        state: Arc<SharedState>,
        detectors: DetectorSet,
        writer: Arc<dyn ImageWriter>,
        observer: Arc<dyn CaptureObserver>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            state,
            detectors: Mutex::new(detectors),
            writer,
            observer,
            config,
        }
    }

    pub fn run_if_due(&self, now: Instant) -> TickOutcome {
        let Some(tick) = self.state.claim_tick(now, self.config.interval) else {
            return TickOutcome::NotDue;
        };
        let captured_at = tick.raw.captured_at;
        let raw = tick.raw.frame;

        let detections = self
            .detectors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .detect_all(&raw);
        log::debug!(
            "Frame {}: {} face(s), {} material(s)",
            raw.sequence(),
            detections.faces.len(),
            detections.materials.len()
        );

        let annotated = annotate(
            &raw,
            &detections,
            tick.recording.is_some(),
            self.config.center_threshold_percent,
        );
        let counts = DetectionCounts {
            faces: detections.faces.len(),
            reading_materials: detections.materials.len(),
        };

        let preview_path = &self.config.preview_path;
        let preview = match self
            .writer
            .write_jpeg(preview_path, &annotated, self.config.image_quality)
        {
            Ok(()) => {
                let published = self.state.swap_processed(
                    tick.generation,
                    ProcessedFrame {
                        annotated,
                        processed_at: captured_at,
                        detections,
                    },
                );
                if published {
                    self.observer.on_frame_captured(preview_path);
                    Some(preview_path.clone())
                } else {
                    log::debug!("Camera stopped during frame {}; not published", raw.sequence());
                    None
                }
            }
            Err(e) => {
                let err = CameraError::IoWriteFailure {
                    path: preview_path.clone(),
                    message: e.to_string(),
                };
                log::error!("Error saving preview frame: {err}");
                None
            }
        };

        let session_image = tick.recording.and_then(|target| {
            let path = target.dir.join(session_image_name(&captured_at));
            if let Err(e) = self
                .writer
                .write_jpeg(&path, &raw, self.config.image_quality)
            {
                let err = CameraError::IoWriteFailure {
                    path,
                    message: e.to_string(),
                };
                log::error!("Error saving session image: {err}");
                return None;
            }

            let record = CapturedImage::new(path.clone(), &captured_at, &target.session_id, counts);
            let recorded = self
                .state
                .with_session(|session| session.record(target.epoch, record));
            if !recorded {
                log::debug!(
                    "Session {} ended before {} was recorded",
                    target.session_id,
                    path.display()
                );
                return None;
            }
            log::debug!("Image captured and saved to {}", path.display());
            self.observer.on_image_captured(&path);
            Some(path)
        });

        TickOutcome::Processed {
            preview,
            session_image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Local};
    use crate::detection::domain::detector::{Detector, DetectorSlot};
    use crate::pipeline::capture_observer::{CaptureEvent, ChannelObserver};
    use crate::shared::detection::{BoundingBox, Detection, DetectionKind};
    use crate::shared::frame::Frame;
    use crate::video::infrastructure::image_file_writer::ImageFileWriter;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};

    // --- Stubs ---

    struct StubDetector {
        kind: DetectionKind,
        fail: Arc<AtomicBool>,
    }

    impl Detector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err("stub failure".into());
            }
            Ok(vec![Detection::new(
                BoundingBox::new(1, 1, 4, 4),
                0.8,
                self.kind,
            )])
        }
    }

    struct FailingWriter;

    impl ImageWriter for FailingWriter {
        fn write_jpeg(
            &self,
            _path: &Path,
            _frame: &Frame,
            _quality: u8,
        ) -> Result<(), Box<dyn std::error::Error>> {
            Err("disk full".into())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        state: Arc<SharedState>,
        processor: PeriodicProcessor,
        events: crossbeam_channel::Receiver<CaptureEvent>,
        /// Makes the face detector fail.
        fail: Arc<AtomicBool>,
        run: u64,
    }

    fn fixture_with_writer(writer: Arc<dyn ImageWriter>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let state = Arc::new(SharedState::new());
        let run = state.begin_generation();
        let fail = Arc::new(AtomicBool::new(false));
        let detectors = DetectorSet::new(
            DetectorSlot::loaded(Box::new(StubDetector {
                kind: DetectionKind::Face,
                fail: fail.clone(),
            })),
            DetectorSlot::loaded(Box::new(StubDetector {
                kind: DetectionKind::Material,
                fail: Arc::new(AtomicBool::new(false)),
            })),
        );
        let (tx, events) = crossbeam_channel::unbounded();
        let processor = PeriodicProcessor::new(
            state.clone(),
            detectors,
            writer,
            Arc::new(ChannelObserver::new(tx)),
            ProcessorConfig {
                interval: Duration::from_secs(1),
                image_quality: 90,
                center_threshold_percent: 15,
                preview_path: root.join("preview").join("current_frame.jpg"),
            },
        );
        Fixture {
            _dir: dir,
            root,
            state,
            processor,
            events,
            fail,
            run,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_writer(Arc::new(ImageFileWriter::new()))
    }

    fn frame(sequence: u64) -> Frame {
        Frame::new(vec![90u8; 16 * 8 * 3], 16, 8, 3, sequence)
    }

    fn start_session(f: &Fixture, id: &str) -> PathBuf {
        let dir = f.root.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        f.state
            .with_session(|s| s.activate(id.to_string(), dir.clone()))
            .unwrap();
        dir
    }

    #[test]
    fn test_no_frame_is_not_due() {
        let f = fixture();
        assert_eq!(f.processor.run_if_due(Instant::now()), TickOutcome::NotDue);
    }

    #[test]
    fn test_tick_publishes_preview_and_detections() {
        let f = fixture();
        f.state.store_raw(f.run, frame(3), Local::now());

        let outcome = f.processor.run_if_due(Instant::now());
        let preview = f.root.join("preview").join("current_frame.jpg");
        assert_eq!(
            outcome,
            TickOutcome::Processed {
                preview: Some(preview.clone()),
                session_image: None,
            }
        );
        assert!(preview.exists());

        let processed = f.state.processed().unwrap();
        assert_eq!(processed.annotated.sequence(), 3);
        assert_eq!(processed.detections.faces.len(), 1);
        assert_eq!(processed.detections.materials.len(), 1);
        assert_eq!(
            f.events.try_iter().collect::<Vec<_>>(),
            vec![CaptureEvent::FrameCaptured(preview)]
        );
    }

    #[test]
    fn test_second_call_within_interval_is_not_due() {
        let f = fixture();
        f.state.store_raw(f.run, frame(1), Local::now());
        let t0 = Instant::now();
        assert!(matches!(f.processor.run_if_due(t0), TickOutcome::Processed { .. }));
        f.state.store_raw(f.run, frame(2), Local::now());
        assert_eq!(
            f.processor.run_if_due(t0 + Duration::from_millis(10)),
            TickOutcome::NotDue
        );
        assert_eq!(f.state.processed().unwrap().annotated.sequence(), 1);
    }

    #[test]
    fn test_detector_failure_counts_as_no_detections() {
        let f = fixture();
        start_session(&f, "s");
        f.state.store_raw(f.run, frame(1), Local::now());
        f.fail.store(true, Ordering::SeqCst);

        let TickOutcome::Processed {
            preview,
            session_image,
        } = f.processor.run_if_due(Instant::now())
        else {
            panic!("tick not processed");
        };
        assert!(preview.is_some());
        assert!(session_image.is_some());

        let processed = f.state.processed().unwrap();
        assert!(processed.detections.faces.is_empty());
        assert_eq!(processed.detections.materials.len(), 1);

        let images = f.state.with_session(|s| s.snapshot()).images;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].detections.faces, 0);
        assert_eq!(images[0].detections.reading_materials, 1);
    }

    #[test]
    fn test_session_image_uses_capture_time() {
        let f = fixture();
        start_session(&f, "abc");
        let captured_at: DateTime<Local> = Local::now() - chrono::Duration::milliseconds(1500);
        f.state.store_raw(f.run, frame(1), captured_at);

        let TickOutcome::Processed { session_image, .. } = f.processor.run_if_due(Instant::now())
        else {
            panic!("tick not processed");
        };
        let path = session_image.unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            session_image_name(&captured_at)
        );
        let images = f.state.with_session(|s| s.snapshot()).images;
        assert_eq!(images[0], CapturedImage::new(path, &captured_at, "abc", images[0].detections));
        assert_eq!(f.state.processed().unwrap().processed_at, captured_at);
    }

    #[test]
    fn test_active_session_records_raw_frame() {
        let f = fixture();
        let dir = start_session(&f, "abc");
        f.state.store_raw(f.run, frame(1), Local::now());

        let TickOutcome::Processed { session_image, .. } = f.processor.run_if_due(Instant::now())
        else {
            panic!("tick not processed");
        };
        let path = session_image.unwrap();
        assert_eq!(path.parent().unwrap(), dir);
        assert!(path.exists());

        let images = f.state.with_session(|s| s.snapshot()).images;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filename, path);
        assert_eq!(images[0].session_id, "abc");
        assert_eq!(images[0].detections.faces, 1);
        assert_eq!(images[0].detections.reading_materials, 1);

        let events: Vec<_> = f.events.try_iter().collect();
        assert_eq!(events.last(), Some(&CaptureEvent::ImageCaptured(path)));
    }

    #[test]
    fn test_image_count_matches_ticks_while_active() {
        let f = fixture();
        start_session(&f, "abc");
        let t0 = Instant::now();
        for i in 0..3u64 {
            f.state.store_raw(f.run, frame(i), Local::now());
            // Distinct millisecond stamps keep file names apart.
            std::thread::sleep(Duration::from_millis(2));
            f.processor.run_if_due(t0 + Duration::from_secs(i));
        }
        assert_eq!(f.state.with_session(|s| s.snapshot()).images.len(), 3);

        f.state.with_session(|s| s.deactivate()).unwrap();
        f.state.store_raw(f.run, frame(9), Local::now());
        f.processor.run_if_due(t0 + Duration::from_secs(10));
        assert_eq!(f.state.with_session(|s| s.snapshot()).images.len(), 3);
    }

    #[test]
    fn test_write_failure_is_contained() {
        let f = fixture_with_writer(Arc::new(FailingWriter));
        start_session(&f, "abc");
        f.state.store_raw(f.run, frame(1), Local::now());

        assert_eq!(
            f.processor.run_if_due(Instant::now()),
            TickOutcome::Processed {
                preview: None,
                session_image: None,
            }
        );
        assert!(f.state.processed().is_none());
        assert!(f.state.with_session(|s| s.snapshot()).images.is_empty());
        assert!(f.events.try_recv().is_err());
    }
}
