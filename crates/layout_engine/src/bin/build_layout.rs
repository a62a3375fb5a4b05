use anyhow::{Context, Result};
use clap::Parser;
use layout_engine::{BuildRequest, EngineConfig, LayoutWorker, export::export_placements_csv};
use log::{info, warn};
use std::{fs, path::PathBuf};

#[derive(Parser)]
#[command(author, version, about = "Build the best column layout for one article", long_about = None)]
struct Args {
    /// Build request (JSON with metaInfo, instanceMap, config, textViewMetrics)
    #[arg(short = 'r', long = "request")]
    request: PathBuf,

    /// Engine configuration file path
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Write the layout snapshot here instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Also export the placements as CSV into this directory
    #[arg(long = "csv-dir")]
    csv_dir: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(short = 'p', long = "pretty")]
    pretty: bool,
}

fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) if path.exists() => EngineConfig::load_from_file(path)?,
        Some(path) => {
            warn!(
                "Config file not found: {}, using default settings",
                path.display()
            );
            EngineConfig::default()
        }
        None => EngineConfig::default(),
    };

    let raw = fs::read_to_string(&args.request)
        .with_context(|| format!("Failed to read request {}", args.request.display()))?;
    let request: BuildRequest = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse request {}", args.request.display()))?;

    let mut worker = LayoutWorker::new(config);
    let layout = worker.build(request)?;

    match &layout {
        Some(layout) => info!(
            "Layout found: {} columns, {} blocks, rate {:.3}",
            layout.colspan(),
            layout.block_instances().len(),
            layout.rate()
        ),
        None => warn!("No valid layout for this request"),
    }

    if let (Some(dir), Some(layout)) = (&args.csv_dir, &layout) {
        let path = export_placements_csv(layout, Some(dir))?;
        info!("Placements saved to: {}", path.display());
    }

    let snapshot = layout.map(|layout| layout.to_snapshot());
    let json = if args.pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };

    match &args.output {
        Some(path) => {
            fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Snapshot saved to: {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
