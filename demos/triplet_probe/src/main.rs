// =============================================================================
// triplet_probe: smoke test for a handwriting triplet corpus
// =============================================================================
//
// Indexes one split of a corpus, prints the index summary and pulls a few
// batches through the loader, reporting their shapes and value ranges.
//
// Usage:
//   cargo run -p triplet-probe -- --root /data/handwriting --sanity
//   cargo run -p triplet-probe -- --root /data/handwriting --validation --batches 2
//   cargo run -p triplet-probe -- --config loader.json
//
// Set RUST_LOG=debug to see skipped traced attempts and image substitutions.

use std::process::ExitCode;

use penmark_data::{build_loader, LoaderConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct Args {
    config: LoaderConfig,
    batches: usize,
}

fn parse_args() -> Result<Args, String> {
    let mut config = LoaderConfig::default();
    let mut batches = 3;
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    let value = |i: usize, flag: &str| -> Result<String, String> {
        args.get(i)
            .cloned()
            .ok_or_else(|| format!("missing value for {flag}"))
    };
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = value(i, "--config")?;
                config = LoaderConfig::from_json_file(&path).map_err(|e| e.to_string())?;
            }
            "--root" => {
                i += 1;
                config.root = value(i, "--root")?.into();
            }
            "--validation" => config.is_train = false,
            "--sanity" => config.sanity_check = true,
            "--no-shuffle" => config.shuffle = false,
            "--batch-size" => {
                i += 1;
                config.batch_size = value(i, "--batch-size")?
                    .parse()
                    .map_err(|_| "invalid --batch-size".to_string())?;
            }
            "--seed" => {
                i += 1;
                config.seed = Some(
                    value(i, "--seed")?
                        .parse()
                        .map_err(|_| "invalid --seed".to_string())?,
                );
            }
            "--workers" => {
                i += 1;
                config.num_workers = value(i, "--workers")?
                    .parse()
                    .map_err(|_| "invalid --workers".to_string())?;
            }
            "--batches" => {
                i += 1;
                batches = value(i, "--batches")?
                    .parse()
                    .map_err(|_| "invalid --batches".to_string())?;
            }
            "--help" | "-h" => {
                println!("Handwriting triplet loader probe");
                println!();
                println!("Options:");
                println!("  --root <path>       Corpus root containing Training/ and Validation/");
                println!("  --config <file>     Load a LoaderConfig from JSON");
                println!("  --validation        Use the validation split");
                println!("  --sanity            Index only a small prefix of the corpus");
                println!("  --batch-size <n>    Triplets per batch (default: 32)");
                println!("  --no-shuffle        Keep corpus order");
                println!("  --seed <n>          Seed shuffling and sampling");
                println!("  --workers <n>       Parallel fetch workers (default: 0)");
                println!("  --batches <n>       Batches to pull (default: 3)");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }
    Ok(Args { config, batches })
}

fn run(args: Args) -> penmark_data::Result<()> {
    let mut loader = build_loader(&args.config)?;
    let dataset = loader.dataset();
    info!(
        root = %args.config.root.display(),
        split = ?args.config.split(),
        samples = dataset.samples().len(),
        writers = dataset.identity().len(),
        batches_per_epoch = loader.num_batches(),
        "corpus indexed"
    );

    for (n, batch) in loader.iter_batches().take(args.batches).enumerate() {
        let batch = batch?;
        let (lo, hi) = batch
            .anchor
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        info!(batch = n, shape = ?batch.shape, min = lo, max = hi, "batch ready");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = match parse_args() {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
