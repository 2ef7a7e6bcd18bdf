//! `tracker` command-line entry point.
//!
//! # Responsibility
//! - Parse flags (with environment fallbacks) and open the parcel database.
//! - Run one parcel lifecycle command and print its result.
//!
//! # Invariants
//! - Errors go to stderr and exit with code 1; results go to stdout.

use clap::{Parser, Subcommand};
use log::error;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracker_core::db::open_db;
use tracker_core::{
    core_version, default_log_level, init_logging, ClientId, LogTarget, Parcel, ParcelNumber,
    ParcelService, ParcelStore,
};

const STDERR_LOG_LEVEL: &str = "info";

#[derive(Parser)]
#[command(name = "tracker", version, about = "Track parcels in a local SQLite database")]
struct Cli {
    /// SQLite database file; created when missing.
    #[arg(long, global = true, env = "TRACKER_DB", default_value = "tracker.db")]
    db: PathBuf,
    /// trace|debug|info|warn|error. Defaults to `info` on stderr and to the
    /// build default (debug in debug builds) for log files.
    #[arg(long, global = true, env = "TRACKER_LOG_LEVEL")]
    log_level: Option<String>,
    /// Absolute directory for rotating log files. Logs go to stderr otherwise.
    #[arg(long, global = true, env = "TRACKER_LOG_DIR")]
    log_dir: Option<PathBuf>,
    /// Print parcels as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new parcel for a client.
    Register {
        #[arg(long)]
        client: ClientId,
        #[arg(long)]
        address: String,
    },
    /// Show one parcel.
    Show { number: ParcelNumber },
    /// List a client's parcels.
    List {
        #[arg(long)]
        client: ClientId,
    },
    /// Advance a parcel to its next status.
    NextStatus { number: ParcelNumber },
    /// Change the address of a registered parcel.
    SetAddress {
        number: ParcelNumber,
        address: String,
    },
    /// Delete a registered parcel.
    Delete { number: ParcelNumber },
    /// Print the core library version.
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (level, target) = log_settings(&cli);
    if let Err(err) = init_logging(&level, target) {
        eprintln!("tracker: {err}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("tracker: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Stderr shares the terminal with command output, so it stays at `info`
/// unless a level is given.
fn log_settings(cli: &Cli) -> (String, LogTarget) {
    let target = cli
        .log_dir
        .clone()
        .map_or(LogTarget::Stderr, LogTarget::Directory);
    let level = cli.log_level.clone().unwrap_or_else(|| {
        match &target {
            LogTarget::Stderr => STDERR_LOG_LEVEL,
            LogTarget::Directory(_) => default_log_level(),
        }
        .to_string()
    });
    (level, target)
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    if let Command::Version = cli.command {
        println!("tracker_core {}", core_version());
        return Ok(());
    }

    let conn = open_db(&cli.db)?;
    let service = ParcelService::new(ParcelStore::try_new(&conn)?);

    match &cli.command {
        Command::Register { client, address } => {
            let parcel = service.register(*client, address.as_str())?;
            print_parcels(&[parcel], cli.json)?;
        }
        Command::Show { number } => {
            let parcel = service.parcel(*number)?;
            print_parcels(&[parcel], cli.json)?;
        }
        Command::List { client } => {
            let parcels = service.client_parcels(*client)?;
            print_parcels(&parcels, cli.json)?;
        }
        Command::NextStatus { number } => match service.next_status(*number)? {
            Some(status) => println!("parcel #{number} is now {status}"),
            None => println!("parcel #{number} is already delivered"),
        },
        Command::SetAddress { number, address } => {
            service.change_address(*number, address)?;
            println!("parcel #{number} address changed to {address}");
        }
        Command::Delete { number } => {
            service.delete(*number)?;
            println!("parcel #{number} deleted");
        }
        Command::Version => {}
    }

    Ok(())
}

fn print_parcels(parcels: &[Parcel], json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(parcels)?);
    } else {
        for parcel in parcels {
            println!("{parcel}");
        }
    }
    Ok(())
}
