use anyhow::Context;
use clap::{Parser, Subcommand};
use occurrence_join::config::JobConfig;
use occurrence_join::error::{describe_error_code, AppResult, JoinError};
use occurrence_join::storage::JsonlStore;
use occurrence_join::JoinJob;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Join mutation submission records into donor occurrences
#[derive(Parser)]
#[command(name = "occurrence-join")]
#[command(about = "Join primary, secondary and meta mutation records into occurrences", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the join and write its outputs
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Load and validate the configuration without touching any data
    CheckConfig {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(clap::Args)]
struct Overrides {
    /// Path to a YAML configuration file
    #[arg(short = 'c', long, env = "OCCURRENCE_JOIN_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the input record sets
    #[arg(short = 'w', long)]
    working_dir: Option<PathBuf>,

    /// Directory receiving the outputs (default: the working directory)
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Project scope for records without a project id
    #[arg(short = 'p', long)]
    project: Option<String>,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Number of partitions per record set
    #[arg(long)]
    partitions: Option<usize>,
}

impl Overrides {
    async fn load(self) -> Result<JobConfig, JoinError> {
        let mut config = match &self.config {
            Some(path) => JobConfig::load(path).await?,
            None => JobConfig::default(),
        };
        config.merge_env_vars()?;

        if let Some(working_dir) = self.working_dir {
            config.working_dir = working_dir;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = Some(output_dir);
        }
        if let Some(project) = self.project {
            config.project = Some(project);
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(partitions) = self.partitions {
            config.partitions = partitions;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (overrides, check_only) = match cli.command {
        Commands::Run { overrides } => (overrides, false),
        Commands::CheckConfig { overrides } => (overrides, true),
    };
    let config = overrides.load().await;

    let log_level = match (cli.verbose, &config) {
        (0, Ok(config)) => config.log_level.to_ascii_lowercase(),
        (0, Err(_)) => "info".to_string(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2) // Show target module for -vv
        .with_thread_ids(cli.verbose >= 2)
        .init();

    debug!("occurrence-join started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match config {
        Ok(config) if check_only => check_config(config),
        Ok(config) => run(config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        match e.downcast_ref::<JoinError>() {
            Some(join_error) => {
                eprintln!("Error: {}", join_error.user_message());
                eprintln!(
                    "  [E{:04}] {}",
                    join_error.code(),
                    describe_error_code(join_error.code())
                );
                std::process::exit(join_error.exit_code());
            }
            None => {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

async fn run(config: JobConfig) -> AppResult<()> {
    config.validate()?;

    let store = JsonlStore::new(&config.working_dir, config.output_dir()).await?;
    let job = JoinJob::new(config, Arc::new(store));
    let summary = job.run().await?;

    for (file_type, records) in &summary.outputs {
        println!("{}: {} records", file_type, records);
    }
    println!("Job {} finished", summary.job_id);
    Ok(())
}

fn check_config(config: JobConfig) -> AppResult<()> {
    config.validate()?;
    let rendered = serde_yaml::to_string(&config).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}
