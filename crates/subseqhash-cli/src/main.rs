use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

use subseqhash_lib::constants::{DEFAULT_NUM_THREADS, THRESHOLD_FACTOR};
use subseqhash_lib::overlap::{count_shared_seeds, write_sorted_pairs};
use subseqhash_lib::seed_files::{load_occurrences, load_seeds, save_seeds};
use subseqhash_lib::{extract_seeds, run_read_pipeline, RandTable, SeedGraph, SeedParams};

#[derive(Parser)]
#[command(name = "subseqhash")]
#[command(version = "0.1.0")]
#[command(about = "FracSubseqHash seeds and multi-read seed graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the seeds of every read into per-read seed files
    ExtractSeeds {
        /// Input read file (.efa)
        reads: PathBuf,

        /// Window length
        n: usize,

        /// Seed length
        k: usize,

        /// Random score table file (generated if absent)
        table: PathBuf,

        /// Number of worker threads
        #[arg(short = 't', long, default_value_t = DEFAULT_NUM_THREADS)]
        threads: usize,
    },

    /// Build the pruned seed graph directly from a read file
    BuildGraph {
        /// Input read file (.efa)
        reads: PathBuf,

        /// Window length
        n: usize,

        /// Seed length
        k: usize,

        /// Random score table file (generated if absent)
        table: PathBuf,

        /// Number of worker threads
        #[arg(short = 't', long, default_value_t = DEFAULT_NUM_THREADS)]
        threads: usize,
    },

    /// Build the pruned seed graph from numbered per-read seed files
    LoadAndBuild {
        /// Directory of <read_id>.subseqseed files
        seeds_dir: PathBuf,

        /// Seed length
        k: usize,

        /// Number of reads (files 1..=N are loaded)
        num_reads: u64,
    },

    /// Reload a saved graph and emit it in dot format
    Reload {
        /// Binary graph file
        graph_file: PathBuf,

        /// Seed length
        k: usize,
    },

    /// Count shared seeds per read pair from per-read seed files
    Overlap {
        /// Directory of <read_id>.subseqseed files
        seeds_dir: PathBuf,

        /// Number of reads (files 1..=N are loaded)
        num_reads: u64,
    },
}

fn main() -> Result<()> {
    // Initialize tracing: use RUST_LOG if set, otherwise default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    match cli.command {
        Commands::ExtractSeeds { reads, n, k, table, threads } => {
            extract_seeds_command(reads, n, k, table, threads)?;
        }
        Commands::BuildGraph { reads, n, k, table, threads } => {
            build_graph_command(reads, n, k, table, threads)?;
        }
        Commands::LoadAndBuild { seeds_dir, k, num_reads } => {
            load_and_build_command(seeds_dir, k, num_reads)?;
        }
        Commands::Reload { graph_file, k } => {
            reload_command(graph_file, k)?;
        }
        Commands::Overlap { seeds_dir, num_reads } => {
            overlap_command(seeds_dir, num_reads)?;
        }
    }

    Ok(())
}

/// Load the score table if the file exists, otherwise generate and save one.
fn load_or_init_table(path: &Path, k: usize) -> Result<RandTable> {
    if path.exists() {
        Ok(RandTable::load(path, k)?)
    } else {
        info!("rand table {} not found, generating a fresh one", path.display());
        let table = RandTable::from_entropy(k);
        table
            .save(path)
            .with_context(|| format!("Failed to write rand table {}", path.display()))?;
        Ok(table)
    }
}

fn validated_params(n: usize, k: usize, threads: usize) -> Result<SeedParams> {
    let mut params = SeedParams::new(n, k).map_err(|e| anyhow!(e))?;
    params.num_threads = threads;
    params.validate().map_err(|e| anyhow!(e))?;
    Ok(params)
}

/// The read-file path with a trailing `.efa` removed.
fn read_file_stem(reads: &Path) -> String {
    let s = reads.to_string_lossy();
    s.strip_suffix(".efa").unwrap_or(&s).to_string()
}

/// The table file's name without its directory.
fn table_stem(table: &Path) -> String {
    table
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| table.to_string_lossy().into_owned())
}

fn seeds_dir_name(reads: &Path, table: &Path) -> PathBuf {
    PathBuf::from(format!(
        "{}-seeds-{}-t{:.6}",
        read_file_stem(reads),
        table_stem(table),
        THRESHOLD_FACTOR
    ))
}

fn graph_file_name(reads: &Path, table: &Path) -> PathBuf {
    PathBuf::from(format!(
        "{}-{}-t{:.6}.graph",
        read_file_stem(reads),
        table_stem(table),
        THRESHOLD_FACTOR
    ))
}

/// Extract seeds in parallel and write one seed file per read
fn extract_seeds_command(
    reads: PathBuf,
    n: usize,
    k: usize,
    table_path: PathBuf,
    threads: usize,
) -> Result<()> {
    let params = validated_params(n, k, threads)?;
    params.print();

    let table = load_or_init_table(&table_path, k)?;
    let threshold = params.threshold();

    let out_dir = seeds_dir_name(&reads, &table_path);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let table_ref = &table;
    let out_ref = &out_dir;
    run_read_pipeline(&reads, params.num_threads, |job| {
        let seeds = extract_seeds(&job.symbols, n, k, table_ref, threshold);
        let path = out_ref.join(format!("{}.subseqseed", job.read_id));
        if let Err(e) = save_seeds(&path, &seeds) {
            error!("Error writing {}: {}", path.display(), e);
        }
    })?;

    info!(
        "extract-seeds {} n={} k={} threshold={} table={} done",
        reads.display(),
        n,
        k,
        threshold,
        table_path.display()
    );
    Ok(())
}

/// Extract seeds in parallel and thread them into a shared graph
fn build_graph_command(
    reads: PathBuf,
    n: usize,
    k: usize,
    table_path: PathBuf,
    threads: usize,
) -> Result<()> {
    let params = validated_params(n, k, threads)?;
    params.print();

    let table = load_or_init_table(&table_path, k)?;
    let threshold = params.threshold();

    let graph = Mutex::new(SeedGraph::new());
    let table_ref = &table;
    let graph_ref = &graph;
    run_read_pipeline(&reads, params.num_threads, |job| {
        // Seed selection is CPU-bound and lock-free; all graph mutation for
        // the read happens under one lock acquisition.
        let seeds = extract_seeds(&job.symbols, n, k, table_ref, threshold);
        if seeds.is_empty() {
            return;
        }
        let mut g = graph_ref.lock().expect("graph lock poisoned");
        g.insert_read_seeds(job.read_id, &seeds);
    })?;

    let mut graph = graph.into_inner().expect("graph lock poisoned");
    info!("ingested graph: {} nodes", graph.num_nodes());
    graph.remove_unique_seeds();
    info!("after pruning: {} nodes", graph.num_nodes());

    let out = graph_file_name(&reads, &table_path);
    graph.save(&out)?;
    info!("graph written to {}", out.display());
    Ok(())
}

/// Build the graph from numbered seed files, prune, and emit dot + binary
fn load_and_build_command(seeds_dir: PathBuf, k: usize, num_reads: u64) -> Result<()> {
    let mut graph = SeedGraph::new();

    for j in 1..=num_reads {
        let path = seeds_dir.join(format!("{}.subseqseed", j));
        if !path.exists() {
            warn!("Stopped, cannot find file {}.subseqseed", j);
            break;
        }
        match load_seeds(&path) {
            Ok(seeds) => graph.insert_read_seeds(j, &seeds),
            Err(e) => error!("Error reading {}: {}", path.display(), e),
        }
    }

    info!("ingested graph: {} nodes", graph.num_nodes());
    graph.remove_unique_seeds();
    info!("after pruning: {} nodes", graph.num_nodes());

    let dot_path = seeds_dir.join(format!("overlap-n{}-graph.dot", num_reads));
    graph
        .save_dot(&dot_path, k)
        .with_context(|| format!("Failed to write {}", dot_path.display()))?;

    let bin_path = seeds_dir.join(format!("overlap-n{}.graph", num_reads));
    graph.save(&bin_path)?;
    info!(
        "graph written to {} and {}",
        dot_path.display(),
        bin_path.display()
    );
    Ok(())
}

/// Reload a saved graph and re-emit it in dot format
fn reload_command(graph_file: PathBuf, k: usize) -> Result<()> {
    let graph = SeedGraph::load(&graph_file)?;
    info!("loaded graph: {} nodes", graph.num_nodes());

    let out = PathBuf::from(format!("{}-withloc.dot", graph_file.display()));
    graph
        .save_dot(&out, k)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    info!("dot written to {}", out.display());
    Ok(())
}

/// Count shared seeds per read pair and write the sorted pair list
fn overlap_command(seeds_dir: PathBuf, num_reads: u64) -> Result<()> {
    let mut all_seeds = BTreeMap::new();

    for j in 1..=num_reads {
        let path = seeds_dir.join(format!("{}.subseqseed", j));
        if !path.exists() {
            warn!("Stopped, cannot find file {}.subseqseed", j);
            break;
        }
        if let Err(e) = load_occurrences(&path, j, &mut all_seeds) {
            error!("Error reading {}: {}", path.display(), e);
        }
    }
    info!("loaded {} distinct seeds", all_seeds.len());

    let (forward, reverse) = count_shared_seeds(&mut all_seeds, num_reads as usize);

    let out = seeds_dir.join(format!("overlapPos-n{}.all-pair", num_reads));
    let file =
        File::create(&out).with_context(|| format!("Failed to create {}", out.display()))?;
    let mut writer = BufWriter::new(file);
    write_sorted_pairs(&mut writer, &forward, &reverse)?;
    writer.flush()?;
    info!("pair counts written to {}", out.display());
    Ok(())
}
