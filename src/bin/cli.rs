//! TierVault CLI
//!
//! Runs archival and record operations against directory-backed stores.

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tiervault::{Archiver, Config, Gateway, TierContext, VerifyMode};
use tracing_subscriber::{fmt, EnvFilter};

/// TierVault CLI
#[derive(Parser, Debug)]
#[command(name = "tiervault-cli")]
#[command(about = "Two-tier record store with verified archival")]
#[command(version)]
struct Args {
    /// Data directory (holds hot/ and cold/)
    #[arg(short, long, default_value = "./tiervault_data")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Move records past the retention window to the archive
    Archive {
        /// Retention window in days
        #[arg(short, long, default_value = "90")]
        retention_days: u32,

        /// Worker threads
        #[arg(short, long, default_value = "1")]
        workers: usize,

        /// How cold writes are confirmed
        #[arg(long, value_enum, default_value = "exists")]
        verify: VerifyArg,

        /// Maximum records to migrate in this run
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Create a record from a JSON document
    Create {
        /// The JSON document
        json: String,
    },

    /// Get a record by id (hot tier, then archive)
    Get {
        /// The record id
        id: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VerifyArg {
    Exists,
    Checksum,
}

impl From<VerifyArg> for VerifyMode {
    fn from(arg: VerifyArg) -> Self {
        match arg {
            VerifyArg::Exists => VerifyMode::Exists,
            VerifyArg::Checksum => VerifyMode::Checksum,
        }
    }
}

fn main() -> ExitCode {
    // Initialize tracing/logging (stderr, so stdout stays machine-readable)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tiervault=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> tiervault::Result<()> {
    let mut builder = Config::builder().data_dir(&args.data_dir);
    if let Commands::Archive {
        retention_days,
        workers,
        verify,
        limit,
    } = &args.command
    {
        builder = builder
            .retention_days(*retention_days)
            .archive_workers(*workers)
            .verify_mode((*verify).into())
            .max_records_per_run(*limit);
    }

    let context = TierContext::open(builder.build())?;

    match args.command {
        Commands::Archive { .. } => {
            tracing::info!("TierVault v{} archival", tiervault::VERSION);
            let report = Archiver::new(&context).run_archival(context.config.retention())?;
            println!("{}", report);
            for (id, error) in &report.failed {
                println!("failed {}: {}", id, error);
            }
        }
        Commands::Create { json } => {
            let record = Gateway::new(&context).create(json.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&record.to_json_bytes()?));
        }
        Commands::Get { id } => {
            let fetched = Gateway::new(&context).read(&id)?;
            tracing::debug!(tier = ?fetched.tier(), "Record found");
            println!("{}", String::from_utf8_lossy(&fetched.to_json_bytes()?));
        }
    }

    Ok(())
}
