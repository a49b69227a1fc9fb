use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::{info, warn, Level};
use simple_logger::init_with_level;

use degepair::pipeline::{self, FileOutcome};
use degepair::{report, tsv, AmpliconWindow, Thresholds};

/// degepair CLI
#[derive(Parser)]
#[command(name = "degepair")]
#[command(version)]
#[command(about = "Degenerate primer metrics, filtering and pairing per orthologous group", long_about = None)]
struct Cli {
    /// Threads (0/None = all)
    #[arg(long, global = true)]
    threads: Option<usize>,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Write the per-OG summary table (TSV) here
    #[arg(long, global = true)]
    summary: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// OG metadata table (TSV)
    #[arg(long = "og-file", short = 'g')]
    og_file: PathBuf,
    /// Output directory for the evaluated primer tables
    #[arg(long, short = 'o')]
    output_dir: PathBuf,
    /// Minimum percentage of matched sequences
    #[arg(long = "nm", default_value_t = 80.0)]
    nm_threshold: f64,
    /// Maximum Tm (max-GC variant)
    #[arg(long = "tm-max", default_value_t = 70.0)]
    tm_max_threshold: f64,
    /// Minimum Tm (max-AT variant)
    #[arg(long = "tm-min", default_value_t = 50.0)]
    tm_min_threshold: f64,
    /// Reject primers with an ambiguity code in the last N (1-5) bases
    #[arg(long = "limiting-deg")]
    limiting_degeneracy: Option<usize>,
}

impl FilterArgs {
    fn thresholds(&self) -> Thresholds {
        Thresholds {
            nm_threshold: self.nm_threshold,
            tm_max_threshold: self.tm_max_threshold,
            tm_min_threshold: self.tm_min_threshold,
            limiting_degeneracy: self.limiting_degeneracy,
        }
    }
}

#[derive(Args)]
struct PairArgs {
    /// Folder with the OG alignments (FASTA), used to report alignment length
    #[arg(long = "alignment-folder", short = 'f')]
    alignment_folder: Option<PathBuf>,
    /// Minimum amplicon size
    #[arg(long = "amplicon-min-size", default_value_t = AmpliconWindow::STEP2.min)]
    amplicon_min: i64,
    /// Maximum amplicon size
    #[arg(long = "amplicon-max-size", default_value_t = AmpliconWindow::STEP2.max)]
    amplicon_max: i64,
}

impl PairArgs {
    fn window(&self) -> AmpliconWindow {
        AmpliconWindow { min: self.amplicon_min, max: self.amplicon_max }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute primer metrics and filter candidates (one miner output file per OG)
    Evaluate {
        /// Miner output files, named <prefix>_<OG>.tsv
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Enumerate and score primer pairs from evaluated primer tables
    Pair {
        /// Evaluated primer tables (*_stat_primer.tsv)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        pair: PairArgs,
    },

    /// Evaluate, then pair, in one pass
    Run {
        /// Miner output files, named <prefix>_<OG>.tsv
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        pair: PairArgs,
    },
}

fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();
    init_with_level(if cli.verbose { Level::Debug } else { Level::Info })?;

    let outcomes = match &cli.command {
        Commands::Evaluate { files, filter } => {
            let thresholds = filter.thresholds();
            thresholds.validate()?;
            std::fs::create_dir_all(&filter.output_dir)?;
            let ogs = tsv::read_og_table(&filter.og_file)?;
            info!("evaluate: {} files | {} OGs in metadata", files.len(), ogs.len());
            pipeline::run_evaluate(files, &ogs, &thresholds, &filter.output_dir, cli.threads)?
        }

        Commands::Pair { files, pair } => {
            let window = pair.window();
            window.validate()?;
            info!("pair: {} files | amplicon {}..={}", files.len(), window.min, window.max);
            pipeline::run_pairing(files, pair.alignment_folder.as_deref(), &window, cli.threads)?
        }

        Commands::Run { files, filter, pair } => {
            let thresholds = filter.thresholds();
            thresholds.validate()?;
            let window = pair.window();
            window.validate()?;
            std::fs::create_dir_all(&filter.output_dir)?;
            let ogs = tsv::read_og_table(&filter.og_file)?;
            info!("run: {} files | {} OGs in metadata | amplicon {}..={}", files.len(), ogs.len(), window.min, window.max);
            pipeline::run_full(
                files,
                &ogs,
                &thresholds,
                &filter.output_dir,
                pair.alignment_folder.as_deref(),
                &window,
                cli.threads,
            )?
        }
    };

    print_summary(&outcomes, cli.summary.as_ref())?;
    info!("Elapsed time: {:?}", start.elapsed());
    Ok(())
}

fn print_summary(outcomes: &[FileOutcome], path: Option<&PathBuf>) -> Result<()> {
    let mut df = report::summary_frame(outcomes)?;

    std::env::set_var("POLARS_FMT_TABLE_FORMATTING", "UTF8_FULL");
    std::env::set_var("POLARS_FMT_MAX_COLS", "100000");
    std::env::set_var("POLARS_FMT_MAX_ROWS", "1000000");
    std::env::set_var("POLARS_FMT_STR_LEN", "100000");
    println!("{}", df);

    if let Some(p) = path {
        report::write_summary(p, &mut df)?;
        info!("summary written to {}", p.display());
    }

    let t = report::totals(outcomes);
    info!(
        "files: {} ({} failed) | OGs: {} | primers kept: {} rejected: {} | pairs: {} ({} OGs without any)",
        t.files, t.failed_files, t.ogs, t.accepted, t.rejected, t.pairs, t.ogs_without_pairs
    );
    if t.failed_files > 0 {
        warn!("{} input files failed; see the errors above", t.failed_files);
    }
    Ok(())
}
