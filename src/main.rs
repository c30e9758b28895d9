use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use ferrite_weeds::data::{organize, ImageLoader};
use ferrite_weeds::workflow::{accuracy_test, cross_validate, inference, ModelSource};
use ferrite_weeds::{Network, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "ferrite-weeds")]
#[command(about = "Train, cross-validate and time weed species classifiers", version)]
struct Args {
    /// TOML run configuration; built-in DeepWeeds defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// K-fold cross validation with restart-on-plateau training
    CrossValidate {
        /// "dense" or a model spec JSON file
        #[arg(long, default_value = "dense")]
        model: String,
    },
    /// Time preprocessing and inference for every image in labels.csv
    Inference {
        /// Trained network JSON file
        #[arg(long)]
        model: PathBuf,
    },
    /// Split a labelled image folder into per-species train/test folders
    Organize {
        #[arg(long)]
        labels: PathBuf,
        #[arg(long)]
        images: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 0.3)]
        test_fraction: f64,
    },
    /// Per-class accuracy with confidence intervals over a folder of class folders
    Accuracy {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        test_dir: PathBuf,
        /// Folder whose sorted sub-folders name the output units; defaults to --test-dir
        #[arg(long)]
        class_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 0.95)]
        confidence: f64,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(p) => RunConfig::load(p).with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(RunConfig::default()),
    }
}

fn load_network(path: &Path) -> Result<Network> {
    Network::load_json(path).with_context(|| format!("Failed to load model {}", path.display()))
}

fn fmt_interval(interval: Option<(f64, f64)>) -> String {
    match interval {
        Some((lo, hi)) => format!("({:.3}, {:.3})", lo, hi),
        None => "n/a".to_string(),
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::CrossValidate { model } => {
            let source = ModelSource::parse(&model).with_context(|| format!("Invalid model '{}'", model))?;
            let folds = cross_validate(&config, &source).context("Cross validation failed")?;
            for summary in &folds {
                let state = &summary.outcome.state;
                println!("Fold {}/{} - {}", summary.fold + 1, folds.len(), summary.output_dir.display());
                println!(
                    "  restarts: {}  best: {} (val_loss {:.6})",
                    state.restart_count,
                    summary.outcome.selected_checkpoint().file_name,
                    summary.outcome.selected_loss()
                );
                println!("{}", summary.report);
                println!("{}", summary.report.confusion);
            }
        }
        Command::Inference { model } => {
            let network = load_network(&model)?;
            let (path, timings) = inference(&config, &network).context("Inference failed")?;
            let n = timings.len().max(1) as f64;
            let pre: f64 = timings.iter().map(|t| t.preprocessing_ms).sum::<f64>() / n;
            let inf: f64 = timings.iter().map(|t| t.inference_ms).sum::<f64>() / n;
            println!("{} images, mean preprocessing {:.3} ms, mean inference {:.3} ms", timings.len(), pre, inf);
            println!("Times written to {}", path.display());
        }
        Command::Organize { labels, images, out, test_fraction } => {
            let splits = organize(&labels, &images, &out, test_fraction).context("Organize failed")?;
            println!("{:<20} {:>8} {:>8}", "species", "train", "test");
            for s in &splits {
                println!("{:<20} {:>8} {:>8}", s.species, s.train, s.test);
            }
        }
        Command::Accuracy { model, test_dir, class_dir, confidence } => {
            let network = load_network(&model)?;
            let (w, h) = match network.metadata.input_shape {
                Some(shape) => (shape.width, shape.height),
                None => (config.data.image_size[0], config.data.image_size[1]),
            };
            let loader = ImageLoader { resize: (w, h), crop: None };
            let class_dir = class_dir.unwrap_or_else(|| test_dir.clone());
            info!(model = %model.display(), width = w, height = h, "loaded the model");
            let report = accuracy_test(&network, loader, &class_dir, &test_dir, confidence)
                .context("Accuracy test failed")?;
            for (tally, interval) in report.classes.iter().zip(&report.class_intervals) {
                println!("{}: {:.3}  {}", tally.name, tally.accuracy(), fmt_interval(*interval));
            }
            println!("Combined: {:.3}  {}", report.combined, fmt_interval(report.combined_interval));
        }
    }
    Ok(())
}
