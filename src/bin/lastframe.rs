use std::{
    net::IpAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lastframe::{
    ExtractOptions, ExtractionSession, FfmpegLogLevel, FrameExtractor, MediaBinding, ServeOptions,
    SourceVideo, StaticAssets, VideoSurface, download_name_for, router,
};
use serde_json::json;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const CLI_AFTER_HELP: &str = "Examples:\n  lastframe extract clip.mp4 --out stills\n  lastframe extract a.mp4 b.webm --drop --json\n  lastframe probe clip.webm --json\n  lastframe serve --root dist --port 8787\n  lastframe completions zsh > _lastframe";

#[derive(Debug, Parser)]
#[command(
    name = "lastframe",
    version,
    about = "Save the last frame of a video as PNG, or serve a single-page app",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a spinner while extracting.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<FfmpegLogLevel>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Save the final frame of each input as `<name>.png`.
    #[command(
        about = "Extract the last frame",
        after_help = "Examples:\n  lastframe extract clip.mp4\n  lastframe extract clip.mp4 --out stills --timeout 30"
    )]
    Extract {
        /// Input video paths.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory for the PNG files.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Treat inputs as dropped files: only video/mp4 and video/webm are accepted.
        #[arg(long)]
        drop: bool,
        /// Validate picked files the same way as dropped files.
        #[arg(long)]
        strict: bool,
        /// Give up on an input after this many seconds.
        #[arg(long)]
        timeout: Option<f64>,
        /// Print a machine-readable summary.
        #[arg(long)]
        json: bool,
    },

    /// Print the metadata the extractor sees.
    #[command(about = "Print video metadata", visible_alias = "info")]
    Probe {
        /// Input video path.
        input: PathBuf,
        /// Output metadata as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Serve a directory, answering unknown GET routes with /index.html.
    #[command(
        about = "Serve a single-page app",
        after_help = "Examples:\n  lastframe serve --root dist\n  lastframe serve --root build --host 0.0.0.0 --port 3000"
    )]
    Serve {
        /// Directory containing index.html and the built assets.
        #[arg(long, default_value = "dist")]
        root: PathBuf,
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,
        #[arg(long, default_value_t = 8787)]
        port: u16,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "lastframe=debug,tower_http=debug"
    } else {
        "lastframe=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if !overwrite {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("overwriting {}", path.display()).yellow()
        );
    }
    Ok(())
}

fn spinner(enabled: bool, message: String) -> Result<Option<ProgressBar>, Box<dyn std::error::Error>> {
    if !enabled {
        return Ok(None);
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")?);
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(Some(bar))
}

async fn extract(
    global: &GlobalOptions,
    inputs: Vec<PathBuf>,
    out: PathBuf,
    drop: bool,
    options: ExtractOptions,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&out)?;
    let session = ExtractionSession::new(FrameExtractor::new(options.clone()), options);

    let mut summary = Vec::new();
    let mut failures = 0_usize;

    for input in inputs {
        let source = SourceVideo::from_path(&input)?;
        let target = out.join(download_name_for(source.name()));
        ensure_writable_path(&target, global.overwrite)?;

        let started_before = session.extractions_started();
        let intake = if drop {
            session.drop_file(source)
        } else {
            session.select_file(source)
        };
        if let Err(error) = intake {
            failures += 1;
            eprintln!("{} {}: {error}", "rejected".red().bold(), input.display());
            summary.push(json!({ "input": input, "error": error.to_string() }));
            continue;
        }
        if session.extractions_started() == started_before {
            eprintln!("{} {} (already processed)", "skipped".yellow().bold(), input.display());
            continue;
        }

        let bar = spinner(global.progress, format!("extracting {}", input.display()))?;
        session.settled().await;
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        if let Some(message) = session.error_message() {
            failures += 1;
            eprintln!("{} {}: {message}", "failed".red().bold(), input.display());
            summary.push(json!({ "input": input, "error": message }));
            continue;
        }

        let frame = session.captured_frame();
        if let Some(path) = session.save_download(&out)? {
            if !json_output {
                println!("{} {}", "saved".green().bold(), path.display());
            }
            summary.push(json!({
                "input": input,
                "output": path,
                "width": frame.as_ref().map(|frame| frame.width),
                "height": frame.as_ref().map(|frame| frame.height),
                "position_seconds": frame.as_ref().map(|frame| frame.position.as_secs_f64()),
            }));
        }
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    if failures > 0 {
        return Err(format!("{failures} input(s) failed").into());
    }
    Ok(())
}

fn probe(input: &Path, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = SourceVideo::from_path(input)?;
    let binding = MediaBinding::bind(&source)?;
    let surface = VideoSurface::open(&binding)?;
    let metadata = surface.metadata();

    if json_output {
        let payload = json!({
            "name": source.name(),
            "media_type": source.media_type(),
            "size": source.size(),
            "last_modified_ms": source.last_modified(),
            "format": metadata.format,
            "codec": metadata.codec,
            "width": metadata.width,
            "height": metadata.height,
            "fps": metadata.frames_per_second,
            "duration_seconds": metadata.duration.as_secs_f64(),
            "drawable": metadata.is_drawable(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("Name: {}", source.name());
        println!("Type: {}", source.media_type().unwrap_or("unknown"));
        println!("Format: {}", metadata.format);
        println!(
            "Video: {}x{} @ {:.2} fps [{}]",
            metadata.width, metadata.height, metadata.frames_per_second, metadata.codec
        );
        println!("Duration: {:?}", metadata.duration);
    }
    Ok(())
}

async fn serve(options: ServeOptions) -> Result<(), Box<dyn std::error::Error>> {
    if !options.root.join("index.html").exists() {
        tracing::warn!(root = %options.root.display(), "No index.html in document root");
    }

    let app = router::app(StaticAssets::new(&options.root));
    let addr = options.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, root = %options.root.display(), "Serving assets");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => tracing::error!(%error, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    if let Some(level) = cli.global.log_level {
        lastframe::set_ffmpeg_log_level(level);
    }

    match cli.command {
        Commands::Extract {
            inputs,
            out,
            drop,
            strict,
            timeout,
            json,
        } => {
            let mut options = ExtractOptions::new().with_strict_picker(strict);
            if let Some(seconds) = timeout {
                if !seconds.is_finite() || seconds <= 0.0 {
                    return Err("--timeout must be a positive number of seconds".into());
                }
                options = options.with_timeout(Duration::from_secs_f64(seconds));
            }
            extract(&cli.global, inputs, out, drop, options, json).await?;
        }
        Commands::Probe { input, json } => probe(&input, json)?,
        Commands::Serve { root, host, port } => {
            let options = ServeOptions::default()
                .with_root(root)
                .with_host(host)
                .with_port(port);
            serve(options).await?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "lastframe", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
