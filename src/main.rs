use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use catalogue_collate::cli::check_config::{self, CheckConfigConfig};
use catalogue_collate::cli::migrate::{self, MigrateConfig};
use catalogue_collate::config::ConfigOverrides;
use catalogue_collate::logging::init_tracing;
use catalogue_collate::resolve::PriceMatchPolicy;
use catalogue_collate::util::env;

const DEFAULT_LOG_FILE: &str = "collation_migration.log";

#[derive(Parser, Debug)]
#[command(name = "catalogue-collate", version, about = "Collate product rows with metadata and pricing and load them into the catalogue")]
struct Cli {
    /// Append logs to this file as well as stdout
    #[arg(long, global = true, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,
    /// Log to stdout only
    #[arg(long, global = true, default_value_t = false)]
    no_log_file: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Run the collation and load the catalogue
    Migrate {
        #[command(flatten)]
        config: ConfigArgs,
        /// Print the summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Resolve and print the effective configuration
    CheckConfig {
        #[command(flatten)]
        config: ConfigArgs,
        /// Also connect to both databases
        #[arg(long, default_value_t = false)]
        connect: bool,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Input CSV (defaults to COLLATE_INPUT or single_product_test.csv)
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Rows per chunk (defaults to COLLATE_BATCH_SIZE or 50)
    #[arg(long)]
    batch_size: Option<usize>,
    /// Catalogue database URL override
    #[arg(long)]
    db_url: Option<String>,
    /// Pricing (ERP) database URL override
    #[arg(long)]
    erp_db_url: Option<String>,
    /// Directory for the skipped-rows CSV
    #[arg(long)]
    rejections_dir: Option<PathBuf>,
    /// first-match or last-match
    #[arg(long)]
    price_match: Option<PriceMatchPolicy>,
    /// Validation report path
    #[arg(long)]
    validation_report: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    no_validation_report: bool,
}

impl From<ConfigArgs> for ConfigOverrides {
    fn from(a: ConfigArgs) -> Self {
        ConfigOverrides {
            input_path: a.csv,
            chunk_size: a.batch_size,
            catalogue_db_url: a.db_url,
            erp_db_url: a.erp_db_url,
            rejections_dir: a.rejections_dir,
            price_match_policy: a.price_match,
            validation_report: a.validation_report,
            no_validation_report: a.no_validation_report,
        }
    }
}

#[tokio::main]
async fn main() {
    env::init_env();
    let cli = Cli::parse();

    let log_file = (!cli.no_log_file).then_some(cli.log_file.as_path());
    if let Err(e) = init_tracing("info,sqlx=warn", log_file) {
        eprintln!("{e:#}");
        std::process::exit(2);
    }

    let code = match cli.command {
        Commands::Migrate { config, json } => {
            let report = migrate::run(MigrateConfig {
                overrides: config.into(),
                json,
            })
            .await;
            if let Some(fatal) = &report.fatal {
                eprintln!("error: {fatal}");
            }
            report.exit_code()
        }
        Commands::CheckConfig { config, connect } => {
            match check_config::run(CheckConfigConfig {
                overrides: config.into(),
                connect,
            })
            .await
            {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("error: {e}");
                    e.exit_code()
                }
            }
        }
    };
    std::process::exit(code);
}
