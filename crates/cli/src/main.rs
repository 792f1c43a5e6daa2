mod settings;

use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread::JoinHandle;

use clap::Parser;
use serde_json::{json, Value};

use robocam_core::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use robocam_core::command::command_dispatcher::{CommandDispatcher, CommandResult};
use robocam_core::detection::infrastructure::detector_factory::build_detectors;
use robocam_core::pipeline::camera_pipeline::CameraPipeline;
use robocam_core::pipeline::capture_observer::{CaptureEvent, ChannelObserver};
use robocam_core::shared::camera_settings::CameraSettings;
use robocam_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Print a progress line every this many preview frames.
const PROGRESS_EVERY: u64 = 30;

const EVENT_QUEUE_CAPACITY: usize = 64;

/// Camera capture with face and reading-material detection for robot guidance.
#[derive(Parser)]
#[command(name = "robocam")]
struct Cli {
    /// Settings file (JSON). Defaults to the per-user config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Camera device index or path.
    #[arg(long)]
    device: Option<String>,

    /// Seconds between processed frames.
    #[arg(long)]
    interval: Option<f64>,

    /// Directory for the preview frame and session folders.
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// JPEG quality (1-100).
    #[arg(long)]
    quality: Option<u8>,

    /// Disable face detection.
    #[arg(long)]
    no_face: bool,

    /// Disable reading-material detection.
    #[arg(long)]
    no_material: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_file.as_ref()) {
        eprintln!("Error: cannot open log file: {e}");
        process::exit(1);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::options().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = settings::load(cli.config.as_deref());
    apply_overrides(&mut settings, &cli);
    settings::validate(&settings)?;

    let detectors = build_detectors(&settings);
    let (event_tx, event_rx) = crossbeam_channel::bounded(EVENT_QUEUE_CAPACITY);
    let pipeline = CameraPipeline::new(
        settings,
        detectors,
        Box::new(|| Box::new(FfmpegCamera::new())),
        Arc::new(ImageFileWriter::new()),
        Arc::new(ChannelObserver::new(event_tx)),
    )?;
    let dispatcher = CommandDispatcher::new(Arc::new(pipeline));
    let events = spawn_event_printer(event_rx);

    let started = dispatcher.process_command("start_camera", &Value::Null);
    let result = if started.success {
        print_banner(&dispatcher);
        command_loop(&dispatcher)
    } else {
        Err(started.message.into())
    };

    let stopped = dispatcher.process_command("stop_camera", &Value::Null);
    println!("{}", stopped.message);
    // Dropping the pipeline closes the event channel.
    drop(dispatcher);
    let _ = events.join();
    result
}

fn apply_overrides(settings: &mut CameraSettings, cli: &Cli) {
    if let Some(device) = &cli.device {
        settings.device = device.clone();
    }
    if let Some(interval) = cli.interval {
        settings.capture_interval_secs = interval;
    }
    if let Some(dir) = &cli.image_dir {
        settings.image_dir = dir.clone();
    }
    if let Some(quality) = cli.quality {
        settings.image_quality = quality;
    }
    if cli.no_face {
        settings.face_detection_enabled = false;
    }
    if cli.no_material {
        settings.material_detection_enabled = false;
    }
}

fn spawn_event_printer(rx: crossbeam_channel::Receiver<CaptureEvent>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut frames: u64 = 0;
        for event in rx {
            match event {
                CaptureEvent::FrameCaptured(path) => {
                    frames += 1;
                    if frames % PROGRESS_EVERY == 0 {
                        println!(
                            "Camera running - {frames} frames processed (latest: {})",
                            file_name(&path)
                        );
                    }
                }
                CaptureEvent::ImageCaptured(path) => {
                    println!("Session image saved: {}", file_name(&path));
                }
            }
        }
    })
}

fn print_banner(dispatcher: &CommandDispatcher) {
    let settings = dispatcher.pipeline().settings();
    let enabled = |on: bool| if on { "Enabled" } else { "Disabled" };
    let status = dispatcher.pipeline().detection_status();
    println!("Camera running on device {}.", settings.device);
    println!(
        "  Face detection: {}{}",
        enabled(settings.face_detection_enabled),
        loaded_suffix(status.face_detection.enabled, status.face_detection.model_loaded)
    );
    println!(
        "  Reading material detection: {}{}",
        enabled(settings.material_detection_enabled),
        loaded_suffix(
            status.reading_material_detection.enabled,
            status.reading_material_detection.model_loaded
        )
    );
    println!(
        "  Preview: {} (every {:.1}s)",
        dispatcher.pipeline().preview_path().display(),
        settings.capture_interval_secs
    );
    println!("Type 'help' for commands.");
}

fn loaded_suffix(enabled: bool, loaded: bool) -> &'static str {
    if !enabled || loaded {
        ""
    } else {
        " (model not loaded)"
    }
}

fn command_loop(dispatcher: &CommandDispatcher) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }

        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            continue;
        };
        let (command, params) = match word {
            "start" => ("start_session", json!({ "session_id": words.next() })),
            "end" => ("end_session", Value::Null),
            "frame" => ("get_current_frame", Value::Null),
            "images" => ("get_captured_images", Value::Null),
            "summary" => ("write_session_summary", Value::Null),
            "status" => ("get_detection_status", Value::Null),
            "help" => {
                print_help();
                continue;
            }
            "quit" | "exit" => return Ok(()),
            // Raw command names pass straight through.
            other => (other, Value::Null),
        };
        print_result(&dispatcher.process_command(command, &params));
    }
}

fn print_help() {
    println!("Commands:");
    println!("  start [id]  start a recording session");
    println!("  end         end the recording session");
    println!("  frame       show the latest frame's detections and guidance");
    println!("  images      list images of the current or last session");
    println!("  summary     write session_info.txt for the current or last session");
    println!("  status      show detector and camera status");
    println!("  help        show this help");
    println!("  quit        stop the camera and exit");
}

fn print_result(result: &CommandResult) {
    let marker = if result.success { "ok" } else { "failed" };
    println!("[{marker}] {}", result.message);
    if !result.data.is_empty() {
        match serde_json::to_string_pretty(&result.data) {
            Ok(text) => println!("{text}"),
            Err(e) => log::error!("Cannot format result: {e}"),
        }
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
