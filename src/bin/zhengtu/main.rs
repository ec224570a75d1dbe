//! zhengtu CLI tool
//!
//! Command-line interface for building and validating the knowledge-base
//! indexes.
//!
//! ## Commands
//!
//! - `build <data-dir>`: validate, then derive and write every index
//!   artifact (evolution graph, symptom reverse-index, zhengsu mapping)
//! - `validate <data-dir>`: structural validation only; exits nonzero iff
//!   any error-tier finding is present
//!
//! Validation findings during `build` are advisory; the build still emits a
//! partially-inconsistent graph so downstream consumers can degrade
//! gracefully.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use zhengtu_core::{
    chains::canonical_chains,
    classify::{ClassifyConfig, NodeClassifier},
    index::{build_evolution_index, write_json},
    indexes::{build_symptom_index, build_zhengsu_mapping, SymptomCategories},
    store::RecordStore,
    validate::Validator,
    ZhengtuError,
};

#[derive(Parser)]
#[command(name = "zhengtu")]
#[command(author, version, about = "A tool for building and validating TCM knowledge-base indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum IndexKind {
    Evolution,
    Symptoms,
    Zhengsu,
}

#[derive(Subcommand)]
enum Commands {
    /// Build all index artifacts from a data directory
    Build {
        /// Path to the data directory
        #[arg(default_value = "data")]
        data_dir: PathBuf,

        /// Output directory for index artifacts (default: <data-dir>/indexes)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Skip the validation pass
        #[arg(long)]
        skip_validation: bool,

        /// Only build the named index
        #[arg(long, value_enum)]
        only: Option<IndexKind>,

        /// Optional TOML file overriding the classifier keyword tables
        #[arg(long)]
        classify_config: Option<PathBuf>,
    },

    /// Validate the data directory and report findings
    Validate {
        /// Path to the data directory
        #[arg(default_value = "data")]
        data_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, ZhengtuError> {
    match cli.command {
        Commands::Build {
            data_dir,
            output_dir,
            skip_validation,
            only,
            classify_config,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| data_dir.join("indexes"));
            let store = RecordStore::load(&data_dir)?;
            println!("載入了 {} 個證型", store.len());

            if !skip_validation {
                let report = Validator::new(&store).run();
                print!("{report}");
                if report.has_errors() {
                    println!("發現驗證錯誤，建議修正後再生成索引");
                }
            }

            let config = match classify_config {
                Some(path) => ClassifyConfig::from_toml_file(path)?,
                None => ClassifyConfig::default(),
            };
            let classifier = NodeClassifier::new(config);
            let today = chrono::Local::now().date_naive();

            if matches!(only, None | Some(IndexKind::Evolution)) {
                let index =
                    build_evolution_index(&store, &classifier, &canonical_chains(), today);
                let path = output_dir.join("evolution_graph.json");
                index.write_json(&path)?;
                println!("演變圖已生成: {}", path.display());
                println!("   節點數: {}", index.statistics.total_nodes);
                println!("   邊數: {}", index.statistics.total_edges);
                println!("   危重節點: {}", index.statistics.critical_nodes);
                println!("   演變鏈: {}", index.statistics.evolution_chains);
            }

            if matches!(only, None | Some(IndexKind::Symptoms)) {
                let index = build_symptom_index(&store, &SymptomCategories::default(), today);
                let path = output_dir.join("symptom_index.json");
                write_json(&path, &index)?;
                println!("症狀索引已生成: {}", path.display());
                println!("   總症狀數: {}", index.statistics.total_symptoms);
            }

            if matches!(only, None | Some(IndexKind::Zhengsu)) {
                let mapping = build_zhengsu_mapping(&store, today);
                let path = output_dir.join("zhengsu_mapping.json");
                write_json(&path, &mapping)?;
                println!("證素對應已生成: {}", path.display());
                println!("   證素數: {}", mapping.statistics.total_zhengsu);
            }

            Ok(ExitCode::SUCCESS)
        }

        Commands::Validate { data_dir } => {
            let store = RecordStore::load(&data_dir)?;
            let report = Validator::new(&store).run();
            print!("{report}");
            if report.has_errors() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
