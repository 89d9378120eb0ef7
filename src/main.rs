use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgAction, Command, value_parser};
use handcast::capture::{FacingMode, SyntheticCamera, SyntheticCameraConfig, SyntheticFault};
use handcast::config::{TrackerConfig, app_name, version};
use handcast::inference::ReplayDetectorFactory;
use handcast::{CaptureStatus, HandData, HandTracker};
use log::{error, info};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn command() -> Command {
    Command::new(app_name())
        .version(version())
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("landmarks")
                .short('l')
                .long("landmarks")
                .value_name("FILE")
                .help("JSON-lines landmark recording to replay (one record per frame).")
                .required(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON tracker configuration; missing fields use defaults.")
                .required(false),
        )
        .arg(
            Arg::new("tick-rate")
                .long("tick-rate")
                .value_name("HZ")
                .help("Scheduler cadence, overrides the config file.")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("fps")
                .long("fps")
                .value_name("FPS")
                .help("Frame rate of the synthetic camera.")
                .value_parser(value_parser!(u32))
                .default_value("30"),
        )
        .arg(
            Arg::new("facing")
                .long("facing")
                .value_name("MODE")
                .help("Which way the synthetic camera faces (user/environment).")
                .value_parser(value_parser!(FacingMode))
                .default_value("user"),
        )
        .arg(
            Arg::new("warmup")
                .long("warmup")
                .value_name("FRAMES")
                .help("Zero-area frames emitted before real frames.")
                .value_parser(value_parser!(u64))
                .default_value("3"),
        )
        .arg(
            Arg::new("fault")
                .long("fault")
                .value_name("KIND")
                .help("Make the camera fail every request (permission-denied/busy/missing).")
                .value_parser(["permission-denied", "busy", "missing"]),
        )
        .arg(
            Arg::new("duration")
                .short('d')
                .long("duration")
                .value_name("SECONDS")
                .help("Stop after this many seconds instead of waiting for Ctrl+C.")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("loop")
                .long("loop")
                .help("Restart the recording when it runs out.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("print-all")
                .long("print-all")
                .help("Print every published record, not only changes.")
                .action(ArgAction::SetTrue),
        )
}

fn camera_config(matches: &clap::ArgMatches) -> SyntheticCameraConfig {
    let fault = matches
        .get_one::<String>("fault")
        .map(|kind| match kind.as_str() {
            "permission-denied" => SyntheticFault::PermissionDenied,
            "busy" => SyntheticFault::Busy,
            _ => SyntheticFault::Missing,
        });

    SyntheticCameraConfig {
        facing: matches
            .get_one::<FacingMode>("facing")
            .copied()
            .unwrap_or(FacingMode::User),
        fps: matches.get_one::<u32>("fps").copied().unwrap_or(30),
        warmup_frames: matches.get_one::<u64>("warmup").copied().unwrap_or(3),
        fault,
        ..Default::default()
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => error!("Failed to encode output: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let matches = command().get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(rate) = matches.get_one::<u32>("tick-rate") {
        config.tick_rate_hz = *rate;
    }
    config.validate().context("invalid configuration")?;

    let landmarks = matches
        .get_one::<String>("landmarks")
        .ok_or_else(|| anyhow!("--landmarks is required"))?;
    let device = Arc::new(SyntheticCamera::new(camera_config(&matches)));
    let factory = Arc::new(ReplayDetectorFactory::new(
        landmarks,
        matches.get_flag("loop"),
    ));

    let mut tracker = HandTracker::new(config, device, factory);

    tracker.on_status_change(|status, message| {
        print_json(&serde_json::json!({ "status": status, "message": message }));
    });

    let print_all = matches.get_flag("print-all");
    let last: Mutex<Option<HandData>> = Mutex::new(None);
    tracker.on_hand_data(move |data| {
        let mut last = last.lock().unwrap_or_else(|e| e.into_inner());
        if print_all || *last != Some(data) {
            print_json(&data);
            *last = Some(data);
        }
    });

    // gracefully stop the tracker on SIGINT, SIGTERM, or SIGHUP
    let interrupted = CancellationToken::new();
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || interrupted.cancel())
            .context("Error setting Ctrl-C handler")?;
    }

    tracker.init().await.context("hand landmark engine")?;
    tracker.start()?;
    info!("{} {} tracking, press Ctrl+C to stop", app_name(), version());

    let duration = matches
        .get_one::<f64>("duration")
        .map(|secs| Duration::from_secs_f64(secs.max(0.0)));
    let mut status = tracker.subscribe_status();

    let outcome = tokio::select! {
        _ = interrupted.cancelled() => Ok(()),
        _ = async {
            match duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        } => Ok(()),
        _ = status.wait_for(CaptureStatus::is_error) => {
            Err(anyhow!(
                "camera unavailable: {}",
                tracker.status_message().unwrap_or_default()
            ))
        }
    };

    tracker.shutdown().await;
    let last = tracker.latest_hand_data();
    info!(
        "{} Last hand data: {} at ({:.3}, {:.3}), detected: {}",
        tracker.health().summary(),
        last.gesture,
        last.x,
        last.y,
        last.detected
    );

    outcome
}
