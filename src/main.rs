use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use webcam_app::{
    check_video_input, launch, run_scenario, AppConfig, CameraAppBuilder, DirectoryDownloads,
    ErrorSink, HeadlessPage, KeyboardInputHandler, ObjectUrls, ScenarioPlan, SimulatedHost,
    TestReport, TestSession,
};

#[derive(Parser, Debug)]
#[command(name = "webcam-app")]
#[command(about = "Camera preview, still capture and recording with a built-in UI test driver")]
#[command(version)]
#[command(long_about = "Runs the camera page against a simulated media host. By default the \
built-in test scenario drives every camera, frame rate and resolution and prints a JSON report. \
With --interactive the page is driven from the keyboard instead.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "webcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without running")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Drive the page from the keyboard instead of running the scenario
    #[arg(short, long, help = "Interactive keyboard mode")]
    interactive: bool,

    /// Per-step recording duration of the scenario
    #[arg(long, value_name = "SECONDS", help = "Seconds to record at each scenario step")]
    duration: Option<f64>,

    /// Override the download directory
    #[arg(long, value_name = "DIR", help = "Directory receiving downloaded files")]
    download_dir: Option<String>,
}

/// What the scenario run prints on stdout
#[derive(Serialize)]
struct RunReport {
    video_input_found: bool,
    failure: Option<String>,
    #[serde(flatten)]
    session: TestReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting webcam-app v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match AppConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(dir) = &args.download_dir {
        config.capture.download_dir = dir.clone();
    }
    if let Some(duration) = args.duration {
        config.harness.step_duration_secs = duration;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        return Err(e.into());
    }
    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let errors = Arc::new(ErrorSink::new());
    let host = Arc::new(SimulatedHost::new(&config.simulation));
    let urls = Arc::new(ObjectUrls::new());
    let page = Arc::new(HeadlessPage::new(
        config.capture.photo_canvas,
        Arc::clone(&errors),
    ));
    let downloads = Arc::new(DirectoryDownloads::new(
        config.capture.download_dir.clone(),
        Arc::clone(&urls),
    ));
    info!("Downloads go to {}", downloads.dir().display());

    let plan = ScenarioPlan::from_config(&config.harness);
    let poll_interval = Duration::from_millis(config.harness.poll_interval_ms);
    let frame_rates = config.harness.frame_rates.clone();

    let app = CameraAppBuilder::new()
        .config(config)
        .host(host.clone())
        .surface(page.clone())
        .download_target(downloads)
        .object_urls(urls)
        .build()?;

    if args.interactive {
        return run_interactive(app, page, errors, frame_rates).await;
    }

    let session = TestSession::new(errors, poll_interval);
    let video_input_found = check_video_input(&session, &*host).await;

    session.attach(&app);
    let failure = match run_scenario(&session, &app, &plan).await {
        Ok(()) => None,
        Err(e) => {
            error!("Scenario failed: {}", e);
            Some(e.to_string())
        }
    };

    let report = RunReport {
        video_input_found,
        failure,
        session: session.report(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    app.sessions().release();
    if report.failure.is_some() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_interactive(
    app: Arc<webcam_app::CameraApp>,
    page: Arc<HeadlessPage>,
    errors: Arc<ErrorSink>,
    frame_rates: Vec<f64>,
) -> Result<()> {
    let shutdown = CancellationToken::new();
    launch(&app, Arc::clone(&errors));

    let keyboard = KeyboardInputHandler::new(page, frame_rates, shutdown.clone());
    keyboard.start().await?;

    let mut reported = 0;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                let all = errors.errors();
                for message in all.iter().skip(reported) {
                    warn!("Page error: {}", message);
                }
                reported = all.len();
            }
        }
    }

    keyboard.stop().await?;
    app.sessions().release();
    info!("webcam-app exited");
    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("webcam_app={}", log_level)));

    // Logs go to stderr so stdout carries only the report
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# webcam-app configuration file");
    println!("# This is the default configuration with all available options");
    println!();
    println!("{}", AppConfig::default().to_toml()?);
    Ok(())
}
