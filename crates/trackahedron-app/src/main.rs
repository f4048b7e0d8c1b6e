//! Trackahedron Application
//!
//! Turns the Trackahedron into a time tracker: the face the fixture rests on
//! selects the activity being tracked.
//!
//! # Usage
//!
//! ```bash
//! # Track faces live over BLE
//! trackahedron run
//!
//! # Feed a recorded capture through the pipeline, logging only
//! trackahedron replay capture.txt --dry-run
//!
//! # Show the reference table
//! trackahedron faces
//!
//! # Scan for sensors
//! trackahedron devices
//!
//! # Write the effective configuration as a starting file
//! trackahedron config --write trackahedron.toml
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use trackahedron_core::Classifier;
use trackahedron_native::{build_trigger, FaceTracker, ReplaySource, TrackerConfig, TriggerWorker};

/// Trackahedron face tracker
#[derive(Parser, Debug)]
#[command(name = "trackahedron")]
#[command(author, version, about = "Time tracking by dodecahedron orientation", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file (defaults to ./trackahedron.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect over BLE and track faces live
    Run,

    /// Feed a recorded capture through the pipeline
    Replay {
        /// Capture file (`<timestamp_ms> <hex payload>` per line)
        file: PathBuf,

        /// Log confirmed faces instead of calling the trigger backend
        #[arg(long)]
        dry_run: bool,

        /// Sleep between samples according to their timestamps
        #[arg(long)]
        paced: bool,
    },

    /// Print the reference table
    Faces,

    /// Scan for BLE sensors
    Devices,

    /// Print the effective configuration as TOML
    Config {
        /// Save to this file instead of printing
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Trackahedron v{}", env!("CARGO_PKG_VERSION"));

    let config = TrackerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => run_live(&config)?,
        Commands::Replay { file, dry_run, paced } => {
            let rt = Runtime::new()?;
            rt.block_on(replay(&config, &file, dry_run, paced))?;
        }
        Commands::Faces => print_faces(&config)?,
        Commands::Devices => list_devices(&config)?,
        Commands::Config { write } => show_config(&config, write.as_deref())?,
    }

    Ok(())
}

/// Replay a capture file through the tracker
async fn replay(config: &TrackerConfig, file: &Path, dry_run: bool, paced: bool) -> anyhow::Result<()> {
    let source = ReplaySource::from_file(file).await?;
    let (handle, worker) = TriggerWorker::spawn(build_trigger(config, dry_run)?);
    let mut tracker = FaceTracker::from_config(config, handle)?;

    let summary = tracker.run(source.spawn(paced)).await;
    drop(tracker);
    let stats = worker.await?;

    info!(
        samples = summary.samples,
        malformed = summary.malformed,
        confirmations = summary.confirmations,
        final_face = ?summary.confirmed.map(|f| f.get()),
        "Replay complete"
    );
    info!(
        started = stats.started,
        failed = stats.failed,
        superseded = stats.superseded,
        "Trigger summary"
    );

    Ok(())
}

/// Track faces live over BLE
fn run_live(config: &TrackerConfig) -> anyhow::Result<()> {
    #[cfg(feature = "ble")]
    {
        let rt = Runtime::new()?;
        rt.block_on(track_live(config))
    }

    #[cfg(not(feature = "ble"))]
    {
        let _ = config;
        anyhow::bail!(
            "BLE support not enabled. Rebuild with --features ble:\n\
             cargo run -p trackahedron-app --features ble -- run"
        );
    }
}

/// Connect, track until the link drops, reconnect
#[cfg(feature = "ble")]
async fn track_live(config: &TrackerConfig) -> anyhow::Result<()> {
    use std::time::Duration;
    use trackahedron_native::BleSensorLink;

    const RECONNECT_DELAY: Duration = Duration::from_secs(2);

    let link = BleSensorLink::new(config.device.clone()).await?;
    let (handle, _worker) = TriggerWorker::spawn(build_trigger(config, false)?);

    // One tracker for the whole session so debounce state survives reconnects
    let mut tracker = FaceTracker::from_config(config, handle)?;

    loop {
        match link.connect_first().await {
            Ok(events) => {
                let summary = tracker.run(events).await;
                info!(
                    samples = summary.samples,
                    confirmations = summary.confirmations,
                    "Sensor session ended"
                );
            }
            Err(e) => warn!("Connection failed: {}", e),
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// Print the reference table and the zero-sample classification
fn print_faces(config: &TrackerConfig) -> anyhow::Result<()> {
    let classifier = Classifier::new(config.build_table()?);
    let bounds = classifier.table().bounds();

    println!("scale min: {:?}", bounds.min());
    println!("scale max: {:?}", bounds.max());
    println!();
    println!("{:>4}  {:>22}  quaternion (w, x, y, z)", "face", "raw (x, y, z)");

    for ((face, rotation), raw) in classifier.table().iter().zip(&config.reference.faces) {
        println!(
            "{:>4}  {:>6} {:>7} {:>7}  ({:+.9}, {:+.9}, {:+.9}, {:+.9})",
            face.get(), raw[0], raw[1], raw[2], rotation.w, rotation.x, rotation.y, rotation.z
        );
    }

    if let Some(hit) = classifier.classify_raw(&[0; trackahedron_core::SAMPLE_LEN]) {
        println!();
        println!("zero sample -> face {} (distance {:.6e})", hit.face, hit.distance);
    }

    Ok(())
}

/// Print or save the merged configuration
fn show_config(config: &TrackerConfig, write: Option<&Path>) -> anyhow::Result<()> {
    match write {
        Some(path) => {
            config.save(path)?;
            info!("Configuration written to {}", path.display());
        }
        None => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

/// List sensors visible over BLE
fn list_devices(config: &TrackerConfig) -> anyhow::Result<()> {
    #[cfg(feature = "ble")]
    {
        use trackahedron_native::BleSensorLink;

        let rt = Runtime::new()?;
        rt.block_on(async {
            let link = BleSensorLink::new(config.device.clone()).await?;
            let sensors = link.scan().await?;

            if sensors.is_empty() {
                info!("  (none found)");
            }
            for sensor in sensors {
                info!(
                    "  {} [{}] rssi {} dBm{}",
                    sensor.display_name(),
                    sensor.address,
                    sensor.rssi,
                    if sensor.has_sample_service { " (sample service)" } else { "" }
                );
            }
            anyhow::Ok(())
        })?;
    }

    #[cfg(not(feature = "ble"))]
    {
        let _ = config;
        warn!("BLE support not enabled. Rebuild with --features ble");
    }

    Ok(())
}
