//! elprep CLI - Command-line interface
//!
//! Usage:
//!   elprep run [--config elprep.toml] [--dataset EMEA ...]
//!   elprep dictionary --terminology <dir> --output <dir>
//!   elprep convert --terminology <dir> --bigbio <dir> --output <dir>
//!   elprep show-config

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use elprep_core::{CorpusSourceConfig, LoggingConfig, PrepConfig};
use elprep_corpus::open_source;
use elprep_extractor::{convert_dataset, BatchOptions, DatasetWriter};
use elprep_terminology::{CorrectionMap, Terminology, TerminologyIndex};

#[derive(Parser)]
#[command(name = "elprep")]
#[command(about = "Prepare entity-linking mention data from biomedical corpora")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare dictionaries and mention files for configured datasets
    Run {
        /// Datasets to process (default: all configured)
        #[arg(short, long = "dataset")]
        datasets: Vec<String>,

        /// Override the output root directory
        #[arg(long)]
        output_root: Option<PathBuf>,

        /// Extract documents in parallel
        #[arg(long)]
        parallel: bool,
    },
    /// Build the dictionary artifacts of one terminology directory
    Dictionary {
        /// Directory with all_disambiguated and semantic_info tables
        #[arg(long)]
        terminology: PathBuf,

        /// Output directory
        #[arg(long)]
        output: PathBuf,
    },
    /// Convert a single corpus
    #[command(group(ArgGroup::new("source").required(true).args(["bigbio", "tsv"])))]
    Convert {
        /// Directory with all_disambiguated and semantic_info tables
        #[arg(long)]
        terminology: PathBuf,

        /// Directory of <split>.jsonl BigBio-KB exports
        #[arg(long)]
        bigbio: Option<PathBuf>,

        /// Directory of <split>.tsv annotation tables
        #[arg(long)]
        tsv: Option<PathBuf>,

        /// Output directory
        #[arg(long)]
        output: PathBuf,

        /// Optional old_id,new_id correction file
        #[arg(long)]
        corrections: Option<PathBuf>,

        /// Dataset name for the report (default: output directory name)
        #[arg(long)]
        name: Option<String>,

        /// Extract documents in parallel
        #[arg(long)]
        parallel: bool,
    },
    /// Print the effective configuration
    ShowConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Run {
            datasets,
            output_root,
            parallel,
        } => {
            if let Some(root) = output_root {
                config.output_root = root;
            }
            config.parallel |= parallel;
            run(&config, &datasets)?;
        }
        Commands::Dictionary {
            terminology,
            output,
        } => {
            let index = TerminologyIndex::load(&terminology)
                .with_context(|| format!("loading terminology from {}", terminology.display()))?;
            DatasetWriter::create(&output)?.write_terminology(&index)?;
        }
        Commands::Convert {
            terminology,
            bigbio,
            tsv,
            output,
            corrections,
            name,
            parallel,
        } => {
            let source = match (bigbio, tsv) {
                (Some(dir), _) => CorpusSourceConfig::BigbioJsonl { dir },
                (None, Some(dir)) => CorpusSourceConfig::LocalTsv { dir },
                (None, None) => bail!("one of --bigbio or --tsv is required"),
            };
            let name = name.unwrap_or_else(|| {
                output
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "dataset".to_string())
            });

            let terminology = Terminology::load(&terminology)
                .with_context(|| format!("loading terminology from {}", terminology.display()))?;
            let corrections = CorrectionMap::load_optional(corrections.as_deref())?;
            let writer =
                DatasetWriter::create(&output)?.with_diagnostics(config.write_diagnostics);
            convert_dataset(
                &name,
                &terminology,
                corrections.as_ref(),
                open_source(&source).as_ref(),
                &writer,
                BatchOptions {
                    parallel: parallel || config.parallel,
                },
            )?;
        }
        Commands::ShowConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Config file when given, defaults otherwise; environment always wins
fn load_config(path: Option<&Path>) -> anyhow::Result<PrepConfig> {
    let config = match path {
        Some(path) => PrepConfig::from_file(path)?.with_env_override()?,
        None => PrepConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Convert the selected datasets; terminologies shared between datasets
/// are loaded once
fn run(config: &PrepConfig, selected: &[String]) -> anyhow::Result<()> {
    let datasets = if selected.is_empty() {
        config.datasets.iter().collect::<Vec<_>>()
    } else {
        selected
            .iter()
            .map(|name| {
                config
                    .dataset(name)
                    .with_context(|| format!("unknown dataset: {name}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    let options = BatchOptions {
        parallel: config.parallel,
    };
    let mut terminologies: HashMap<PathBuf, Terminology> = HashMap::new();

    for dataset in datasets {
        tracing::info!("Processing dataset {}", dataset.name);

        if !terminologies.contains_key(&dataset.terminology_dir) {
            let terminology = Terminology::load(&dataset.terminology_dir).with_context(|| {
                format!(
                    "loading terminology for {} from {}",
                    dataset.name,
                    dataset.terminology_dir.display()
                )
            })?;
            terminologies.insert(dataset.terminology_dir.clone(), terminology);
        }
        let Some(terminology) = terminologies.get(&dataset.terminology_dir) else {
            continue;
        };

        let corrections = CorrectionMap::load_optional(dataset.correction_file.as_deref())
            .with_context(|| format!("loading corrections for {}", dataset.name))?;
        let writer = DatasetWriter::create(config.dataset_output_dir(dataset))?
            .with_diagnostics(config.write_diagnostics);
        let source = open_source(&dataset.source);

        convert_dataset(
            &dataset.name,
            terminology,
            corrections.as_ref(),
            source.as_ref(),
            &writer,
            options,
        )
        .with_context(|| format!("converting {}", dataset.name))?;
    }

    tracing::info!("Encoder data preparation complete");
    Ok(())
}
