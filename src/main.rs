//! GhostRelay CLI
//!
//! Command-line interface for inspecting and exercising GhostRelay.

use clap::{Parser, Subcommand};
use ghostrelay::sim::{
    SimulatedDeviceFactory, SimulatedEngineFactory, SimulatedPlatform, SimulatedSource,
};
use ghostrelay::{
    crop_to_fill, Collaborators, Renderer, RendererConfig, RendererEvent, Resolution,
    SchemeRegistry, Size,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Pid the simulator uses for the background (rendering) process
const SIM_BACKGROUND_PID: u32 = 4000;
/// Pid of the first simulated foreground process
const SIM_FOREGROUND_PID: u32 = 4100;

#[derive(Parser)]
#[command(name = "ghostrelay")]
#[command(about = "Background swap chain relay - Render, Duplicate, Retarget")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, handle backend and effective configuration
    Info {
        /// Renderer config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the crop rectangle for a control and video size
    Crop {
        /// Render control size (e.g., 640x480)
        #[arg(short, long)]
        control: Size,

        /// Native video size (e.g., 1920x1080)
        #[arg(short, long)]
        video: Size,
    },

    /// Run a full renderer session against simulated collaborators
    Simulate {
        /// Render control size
        #[arg(short, long, default_value = "1280x720")]
        control: Size,

        /// Native video size reported by the engine
        #[arg(short, long, default_value = "1920x1080")]
        video: Size,

        /// Foreground pid to retarget to mid-session
        #[arg(short, long, default_value = "4200")]
        retarget: u32,

        /// Engine ticks after the retarget
        #[arg(short, long, default_value = "5")]
        ticks: u32,

        /// Renderer config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ghostrelay=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { config } => cmd_info(config),
        Commands::Crop { control, video } => cmd_crop(control, video),
        Commands::Simulate {
            control,
            video,
            retarget,
            ticks,
            config,
        } => cmd_simulate(control, video, retarget, ticks, config).await,
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<RendererConfig> {
    Ok(match path {
        Some(path) => RendererConfig::load(path)?,
        None => RendererConfig::default(),
    })
}

fn cmd_info(config: Option<PathBuf>) -> anyhow::Result<()> {
    println!("GhostRelay System Information");
    println!("=============================\n");

    println!("Version: {}", ghostrelay::VERSION);
    println!(
        "Handle backend: {}",
        ghostrelay::native_platform_name().unwrap_or("none (simulation only)")
    );
    println!("Process id: {}", std::process::id());

    let config = load_config(config)?;
    println!("\n=== Renderer Config ===");
    print!("{}", config.to_toml_string()?);

    Ok(())
}

fn cmd_crop(control: Size, video: Size) -> anyhow::Result<()> {
    match crop_to_fill(control, video) {
        Some(rect) => {
            println!("Control: {}", control);
            println!("Video:   {}", video);
            println!(
                "Crop:    left {:.4}  top {:.4}  right {:.4}  bottom {:.4}",
                rect.left, rect.top, rect.right, rect.bottom
            );
        }
        None => anyhow::bail!(
            "both sizes must be positive (control {}, video {})",
            control,
            video
        ),
    }
    Ok(())
}

async fn cmd_simulate(
    control: Size,
    video: Size,
    retarget: u32,
    ticks: u32,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let stale_timeout = config.stale_timeout();

    println!("GhostRelay Simulation");
    println!("=====================\n");

    let platform = Arc::new(SimulatedPlatform::new(SIM_BACKGROUND_PID));
    platform.spawn_process(SIM_FOREGROUND_PID);
    platform.spawn_process(retarget);
    let sources = Arc::new(SchemeRegistry::new(config.url_scheme.clone()));
    let engines = Arc::new(SimulatedEngineFactory::new(
        platform.clone(),
        sources.clone(),
    ));

    let renderer = Renderer::new(
        config,
        Collaborators {
            platform: platform.clone(),
            devices: Arc::new(SimulatedDeviceFactory::new()),
            engines: engines.clone(),
            sources,
        },
    );
    let events = renderer.subscribe();

    let printer = tokio::task::spawn_blocking(move || {
        for event in events.iter() {
            match event {
                RendererEvent::RenderFormatUpdate(format) => println!(
                    "  -> swap chain {} for pid {} ({}x{})",
                    format.handle, format.foreground_process_id, format.width, format.height
                ),
                RendererEvent::EngineError { status } => {
                    println!("  -> engine error {:#010x}", status)
                }
            }
        }
    });

    println!("Setup (foreground pid {}, control {})", SIM_FOREGROUND_PID, control);
    renderer.setup(
        SIM_FOREGROUND_PID,
        Arc::new(SimulatedSource::new("simulated-peer")),
        control,
    )?;
    let engine = engines
        .last_engine()
        .ok_or_else(|| anyhow::anyhow!("engine was not created"))?;

    let native = Resolution::new(video.width as u32, video.height as u32);
    println!("Format change to {}", native);
    engine.format_change(native)?;
    engine.can_play()?;

    println!("Retarget to pid {}", retarget);
    renderer.update_foreground_process_id(retarget);
    for _ in 0..ticks {
        engine.tick()?;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    println!("Waiting {:?} for the stale handle to expire", stale_timeout);
    tokio::time::sleep(stale_timeout + Duration::from_millis(50)).await;
    engine.tick()?;

    println!("Teardown");
    renderer.teardown();
    drop(renderer);
    printer.await?;

    let stats = platform.stats();
    println!("\nStatistics:");
    println!("  Processes opened: {}", stats.processes_opened);
    println!("  Duplications: {}", stats.duplications);
    println!("  Local closes: {}", stats.local_closes);
    println!("  Remote closes: {}", stats.remote_closes);
    println!("  Failed closes: {}", stats.failed_closes);
    println!(
        "  Handles left open: {}",
        platform.open_handle_count(SIM_BACKGROUND_PID)
            + platform.open_handle_count(SIM_FOREGROUND_PID)
            + platform.open_handle_count(retarget)
    );

    Ok(())
}
