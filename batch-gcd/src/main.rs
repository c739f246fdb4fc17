//! batch-gcd CLI: find RSA moduli sharing prime factors.
//!
//! Modes:
//!   --mode=scan (default)   Run the full pipeline on a moduli CSV
//!   --mode=generate         Synthesize a moduli CSV with known shared primes
//!
//! Options:
//!   --input=<path>      Moduli CSV (default: data/moduli.csv)
//!   --tree-dir=<path>   Product-tree scratch directory (default: data/product_tree)
//!   --fast              Level-by-level descent (more RAM, smaller reductions)
//!   --report=<path>     Write the compromised-key report as JSON
//!   --count=<N>         [generate] number of moduli (default: 100)
//!   --bits=<N>          [generate] modulus size in bits (default: 512)
//!   --shared=<N>        [generate] pairs sharing a prime (default: 3)
//!   --seed=<N>          [generate] RNG seed (default: from entropy)
//!   --output=<path>     [generate] output CSV (default: data/moduli.csv)

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use batch_gcd::error::Error;
use batch_gcd::extract::{extract_gcds, scan_outcome};
use batch_gcd::input::{read_moduli_csv, ModuliTable};
use batch_gcd::remainder::{compute_remainders, compute_remainders_fast};
use batch_gcd::store::LevelStore;
use batch_gcd::tree::build_product_tree;
use factoring_core::generate_shared_factor_batch;

/// CLI configuration parsed from command-line arguments.
struct CliConfig {
    mode: Mode,
    input: String,
    tree_dir: String,
    fast: bool,
    report: Option<String>,
    count: usize,
    bits: u32,
    shared: usize,
    seed: Option<u64>,
    output: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Scan,
    Generate,
}

fn parse_args() -> CliConfig {
    let args: Vec<String> = std::env::args().collect();

    let mode = if args.iter().any(|a| a.contains("generate")) {
        Mode::Generate
    } else {
        Mode::Scan
    };

    let string_opt = |prefix: &str| {
        args.iter()
            .find(|a| a.starts_with(prefix))
            .map(|a| a.strip_prefix(prefix).unwrap().to_string())
    };

    let input = string_opt("--input=").unwrap_or_else(|| "data/moduli.csv".to_string());
    let tree_dir = string_opt("--tree-dir=").unwrap_or_else(|| "data/product_tree".to_string());
    let fast = args.iter().any(|a| a == "--fast");
    let report = string_opt("--report=");

    let count = string_opt("--count=")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(100);
    let bits = string_opt("--bits=")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(512);
    let shared = string_opt("--shared=")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(3);
    let seed = string_opt("--seed=").and_then(|v| v.parse::<u64>().ok());
    let output = string_opt("--output=").unwrap_or_else(|| "data/moduli.csv".to_string());

    CliConfig {
        mode,
        input,
        tree_dir,
        fast,
        report,
        count,
        bits,
        shared,
        seed,
        output,
    }
}

fn main() {
    env_logger::init();

    let config = parse_args();
    let result = match config.mode {
        Mode::Scan => run_scan_mode(&config),
        Mode::Generate => run_generate_mode(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run parts A (product tree), B (remainders), and C (gcds) in order.
fn run_scan_mode(config: &CliConfig) -> Result<(), Error> {
    println!("========================================");
    println!("  batch-gcd: shared-prime scan");
    println!("========================================");
    println!();

    println!("--- Part (A): product tree of all moduli ---");
    let start = Instant::now();
    let table = read_moduli_csv(&config.input)?;
    println!("  Read {} moduli from {}", table.len(), config.input);
    let ModuliTable { ids, moduli } = table;

    let store = LevelStore::new(&config.tree_dir);
    let manifest = build_product_tree(&store, moduli)?;
    println!(
        "  {} levels written under {} ({:.2}s)",
        manifest.levels(),
        config.tree_dir,
        start.elapsed().as_secs_f64()
    );
    println!();

    println!("--- Part (B): remainders Z mod Ni^2 ---");
    let start = Instant::now();
    let remainders = if config.fast {
        compute_remainders_fast(&store, &manifest)?
    } else {
        compute_remainders(&store, &manifest)?
    };
    println!("  {} remainders ({:.2}s)", remainders.len(), start.elapsed().as_secs_f64());
    println!();

    println!("--- Part (C): final gcds ---");
    let start = Instant::now();
    let leaves = store.read_level(0, manifest.leaf_count())?;
    println!("  Sanity check: {} input moduli.", leaves.len());
    let gcds = extract_gcds(&leaves, remainders)?;
    let outcome = scan_outcome(&ids, &gcds);
    println!(
        "  Compromised keys: {} ({:.2}s)",
        outcome.compromised_count(),
        start.elapsed().as_secs_f64()
    );
    for key in &outcome.compromised {
        println!("    id {}  factor {}", key.id, key.factor);
    }

    if let Some(report) = &config.report {
        save_json(report, &outcome)?;
        println!();
        println!("  Report written to {}", report);
    }
    Ok(())
}

/// Synthesize a moduli CSV with a known number of shared-prime pairs.
fn run_generate_mode(config: &CliConfig) -> Result<(), Error> {
    println!("========================================");
    println!("  batch-gcd: dataset generation");
    println!("========================================");
    println!();
    println!(
        "  {} moduli of {} bits, {} shared-prime pairs",
        config.count, config.bits, config.shared
    );

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let start = Instant::now();
    let batch = generate_shared_factor_batch(config.count, config.bits, config.shared, &mut rng);

    let path = Path::new(&config.output);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::storage(parent, e))?;
        }
    }
    let mut file = fs::File::create(path).map_err(|e| Error::storage(path, e))?;
    for (i, n) in batch.moduli.iter().enumerate() {
        writeln!(file, "{},{},{}", i, config.bits, n).map_err(|e| Error::storage(path, e))?;
    }

    println!(
        "  Wrote {} moduli ({} compromised) to {} ({:.2}s)",
        batch.moduli.len(),
        batch.compromised.len(),
        config.output,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Serialize a result to pretty JSON on disk.
fn save_json<T: Serialize>(path: &str, value: &T) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Invariant(format!("cannot serialize report: {}", e)))?;
    fs::write(path, json).map_err(|e| Error::storage(Path::new(path), e))
}
