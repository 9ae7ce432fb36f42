use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tabled::{Table, Tabled};
use tracing::{debug, info, warn};

use probelink::config::Config;
use probelink::fingerprint::{
    write_csv, Analysis, Correlator, GroupRecord, RosterPool, Summary, VendorDb,
};
use probelink::sessions::{write_common_csv, SessionIndex};
use probelink::wireless::{CaptureReader, CaptureStats};

#[derive(Parser)]
#[command(name = "probelink")]
#[command(author, version, about = "Probe-request fingerprinting and randomized MAC correlation")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fingerprint probe requests in a capture and link randomized addresses
    Analyze {
        /// pcap or pcapng capture (radiotap or bare 802.11)
        capture: PathBuf,

        /// airodump-ng CSV restricting which persistent addresses may be assigned
        #[arg(short, long)]
        roster: Option<PathBuf>,

        /// Wireshark manuf file for the vendor column (overrides config)
        #[arg(short, long)]
        manuf: Option<PathBuf>,

        /// Per-fingerprint CSV report
        #[arg(short, long, default_value = "fingerprint_report.csv")]
        output: PathBuf,

        /// Console output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List ESSIDs seen across several Kismet session CSVs
    CommonEssids {
        /// Kismet CSV exports, one per session
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output CSV (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured minimum BestQuality
        #[arg(long, allow_hyphen_values = true)]
        min_quality: Option<i32>,

        /// Override the configured minimum number of sessions
        #[arg(long)]
        min_sessions: Option<usize>,
    },

    /// Generate default configuration file
    GenConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Simple,
}

#[derive(Tabled)]
struct AssignmentRow {
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
    #[tabled(rename = "Randomized")]
    randomized: String,
    #[tabled(rename = "Assigned")]
    assigned: String,
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "Score")]
    score: i32,
    #[tabled(rename = "SSIDs")]
    ssids: String,
    #[tabled(rename = "Frames")]
    frames: usize,
}

impl From<&GroupRecord> for AssignmentRow {
    fn from(r: &GroupRecord) -> Self {
        Self {
            fingerprint: r.fingerprint.chars().take(12).collect(),
            randomized: r.random_macs.split(';').filter(|s| !s.is_empty()).count().to_string(),
            assigned: r.assigned_real.clone(),
            vendor: r.vendor.clone(),
            score: r.score,
            ssids: r.probed_ssids.replace(';', ", "),
            frames: r.frames,
        }
    }
}

pub fn run_command(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    match cli.command {
        Commands::Analyze {
            capture,
            roster,
            manuf,
            output,
            format,
        } => cmd_analyze(config, capture, roster, manuf, output, format),
        Commands::CommonEssids {
            files,
            output,
            min_quality,
            min_sessions,
        } => cmd_common_essids(config, files, output, min_quality, min_sessions),
        Commands::GenConfig { output } => cmd_gen_config(output),
    }
}

fn cmd_analyze(
    config: Config,
    capture: PathBuf,
    roster: Option<PathBuf>,
    manuf: Option<PathBuf>,
    output: PathBuf,
    format: OutputFormat,
) -> Result<()> {
    let pool = match &roster {
        Some(path) => RosterPool::from_path(path)
            .with_context(|| format!("Failed to read roster: {}", path.display()))?,
        None => RosterPool::new(),
    };
    if roster.is_some() {
        info!("roster pool holds {} persistent addresses", pool.len());
    }

    let manuf = manuf.or_else(|| config.vendor.manuf_path.clone());
    let vendors = VendorDb::locate(manuf.as_deref()).context("Failed to load vendor table")?;

    let mut reader = CaptureReader::open(&capture, config.capture.clone())
        .with_context(|| format!("Failed to open capture: {}", capture.display()))?;

    let mut frames = Vec::new();
    for frame in reader.by_ref() {
        match frame {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                // a capture cut off mid-record still yields everything before it
                warn!("stopping at unreadable capture record: {}", e);
                break;
            }
        }
    }
    let stats = reader.stats();
    debug!(?stats, "capture read");

    let correlator = Correlator::new(config.scoring.clone()).with_pool(pool);
    let analysis = Analysis::run(frames, &correlator);
    let records = analysis.records(&vendors);

    let file = File::create(&output)
        .with_context(|| format!("Failed to create report: {}", output.display()))?;
    write_csv(&records, BufWriter::new(file))
        .with_context(|| format!("Failed to write report: {}", output.display()))?;
    info!("wrote {} fingerprints to {}", records.len(), output.display());

    let summary = analysis.summary();
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Simple => {
            for record in records.iter().filter(|r| !r.assigned_real.is_empty()) {
                for random in record.random_macs.split(';') {
                    println!("{} {}", random, record.assigned_real);
                }
            }
        }
        OutputFormat::Table => {
            print_summary(&summary, &stats);
            let rows: Vec<AssignmentRow> = records
                .iter()
                .filter(|r| !r.assigned_real.is_empty())
                .map(AssignmentRow::from)
                .collect();
            if rows.is_empty() {
                println!("\nNo randomized addresses could be assigned");
            } else {
                println!("\n{}", Table::new(rows));
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &Summary, stats: &CaptureStats) {
    println!("{}", "=== probelink Summary ===".bold());
    println!();
    println!("Packets read:          {}", stats.packets);
    println!("Processed probes:      {}", summary.probes);
    println!("Unique fingerprints:   {}", summary.fingerprints.to_string().cyan());
    println!("Randomized addresses:  {}", summary.randomized_addresses);
    println!("Persistent addresses:  {}", summary.persistent_addresses);
    println!("Probed SSIDs:          {}", summary.probed_ssids);
    println!(
        "Assigned fingerprints: {}",
        summary.assigned.to_string().green().bold()
    );
    if stats.malformed > 0 || stats.empty_probes > 0 {
        println!(
            "{} {} malformed packets, {} probes without elements",
            "Skipped:".yellow().bold(),
            stats.malformed,
            stats.empty_probes
        );
    }
}

fn cmd_common_essids(
    config: Config,
    files: Vec<PathBuf>,
    output: Option<PathBuf>,
    min_quality: Option<i32>,
    min_sessions: Option<usize>,
) -> Result<()> {
    let min_quality = min_quality.unwrap_or(config.sessions.min_quality);
    let min_sessions = min_sessions.unwrap_or(config.sessions.min_sessions);

    let mut index = SessionIndex::new();
    for file in &files {
        if let Err(e) = index.add_file(file, min_quality) {
            warn!("skipping {}: {}", file.display(), e);
        }
    }

    let common = index.common(min_sessions);
    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_common_csv(&common, BufWriter::new(file))?;
            println!(
                "{} {} common ESSIDs written to {}",
                "Saved".green().bold(),
                common.len(),
                path.display()
            );
        }
        None => write_common_csv(&common, std::io::stdout().lock())?,
    }

    Ok(())
}

fn cmd_gen_config(output: Option<PathBuf>) -> Result<()> {
    let config = Config::default();

    match output {
        Some(path) => {
            config.save(&path)?;
            println!("Configuration written to {}", path.display());
        }
        None => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
