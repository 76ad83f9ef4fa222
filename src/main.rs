// Pilot Logbook command line
// Talks to the configured flight store through the logbook core.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use pilot_logbook_lib::views::{format_duration, FlightFilter};
use pilot_logbook_lib::{
    AppConfig, FileBackupSink, FlightRecord, FlightStatus, HttpFlightStore, Logbook, LogbookError, NewFlight,
    RestoreTarget, UserIdentity,
};

#[derive(Parser)]
#[command(name = "pilot-logbook")]
#[command(about = "Digital pilot logbook", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Totals, this month's hours and hours per aircraft
    Stats,
    /// Logged flights, optionally filtered
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        aircraft: Option<String>,
        #[arg(long = "type")]
        flight_type: Option<String>,
    },
    /// Flights dated today or later
    Upcoming,
    /// Flights grouped by month
    History,
    /// Log a completed flight
    Add {
        #[command(flatten)]
        flight: FlightArgs,
    },
    /// Schedule a future flight for PILOT_LOGBOOK_USER_ID
    Schedule {
        #[command(flatten)]
        flight: FlightArgs,
        #[arg(long)]
        notification: Option<String>,
        /// Mark as pending instead of confirmed
        #[arg(long, default_value_t = false)]
        pending: bool,
    },
    /// Delete a flight by id
    Delete { id: String },
    /// Write pilot_logbook_backup.json
    Backup {
        /// Overrides PILOT_LOGBOOK_BACKUP_DIR
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Restore a backup file
    Restore {
        file: PathBuf,
        /// Re-submit missing flights to the store instead of the local cache
        #[arg(long, default_value_t = false)]
        remote: bool,
    },
}

#[derive(clap::Args)]
struct FlightArgs {
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
    #[arg(long)]
    aircraft: String,
    /// Departure time, e.g. 08:00
    #[arg(long)]
    departure_time: String,
    /// Arrival time, e.g. 09:30
    #[arg(long)]
    arrival_time: String,
    #[arg(long = "type")]
    flight_type: Option<String>,
    #[arg(long)]
    remarks: Option<String>,
}

impl FlightArgs {
    fn into_new_flight(self) -> NewFlight {
        let mut flight = NewFlight::new(
            self.date,
            self.from,
            self.to,
            self.aircraft,
            self.departure_time,
            self.arrival_time,
        );
        if let Some(flight_type) = self.flight_type {
            flight = flight.flight_type(flight_type);
        }
        if let Some(remarks) = self.remarks {
            flight = flight.remarks(remarks);
        }
        flight
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging - default to info level for our crate
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("pilot_logbook=info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = AppConfig::from_env().map_err(|e| e.to_string())?;
    let store = HttpFlightStore::from_config(&config).map_err(|e| e.to_string())?;
    let logbook = Logbook::new(Arc::new(store));
    let identity = config.user_id.as_deref().map(UserIdentity::new);

    match cli.command {
        Commands::Stats => {
            let snapshot = logbook.refresh().await.map_err(report)?;
            let stats = snapshot.statistics;
            println!("Total hours:     {:.1}", stats.total_hours);
            println!("Total flights:   {}", stats.total_flights);
            println!("This month:      {:.1}", stats.month_hours);
            println!("Aircraft flown:  {}", stats.aircraft_count);
            for share in snapshot.hours_by_aircraft() {
                println!("  {:<12} {:>7.1} h  {:>5.1}%", share.aircraft, share.hours, share.share * 100.0);
            }
        }
        Commands::List {
            search,
            date,
            aircraft,
            flight_type,
        } => {
            let snapshot = logbook.refresh().await.map_err(report)?;
            let filter = FlightFilter {
                search,
                date,
                aircraft,
                flight_type,
            };
            let flights = filter.apply(&snapshot.all_flights());
            if flights.is_empty() {
                println!("No flights found");
            }
            flights.iter().for_each(print_flight);
        }
        Commands::Upcoming => {
            let snapshot = logbook.refresh().await.map_err(report)?;
            let today = Local::now().date_naive();
            let mut flights: Vec<FlightRecord> = snapshot.all_flights().into_iter().filter(|f| f.date >= today).collect();
            flights.reverse();
            if flights.is_empty() {
                println!("No upcoming flights");
            }
            flights.iter().for_each(print_flight);
        }
        Commands::History => {
            let snapshot = logbook.refresh().await.map_err(report)?;
            for (month, flights) in snapshot.history() {
                let hours: f64 = flights.iter().map(|f| f.total_hours).sum();
                println!("{} ({} flights, {})", month, flights.len(), format_duration(hours));
                flights.iter().for_each(print_flight);
            }
        }
        Commands::Add { flight } => {
            let record = flight.into_new_flight().completed().map_err(|e| e.to_string())?;
            let stored = logbook.add_flight_log(&record).await.map_err(report)?;
            println!("Logged flight {}", stored.id);
        }
        Commands::Schedule {
            flight,
            notification,
            pending,
        } => {
            let mut new_flight = flight.into_new_flight();
            if let Some(notification) = notification {
                new_flight = new_flight.notification(notification);
            }
            let status = if pending { FlightStatus::Pending } else { FlightStatus::Confirmed };
            let record = new_flight.scheduled(status).map_err(|e| e.to_string())?;
            let stored = logbook
                .schedule_new_flight(&record, identity.as_ref())
                .await
                .map_err(report)?;
            println!("Scheduled flight {}", stored.id);
        }
        Commands::Delete { id } => {
            logbook.delete_flight_log(&id).await.map_err(report)?;
            println!("Deleted flight {}", id);
        }
        Commands::Backup { dir } => {
            logbook.refresh().await.map_err(report)?;
            let sink = FileBackupSink::new(dir.unwrap_or(config.backup_dir));
            let receipt = logbook.backup_data(&sink).await.map_err(report)?;
            println!("Backed up {} flights to {}", receipt.backup.flight_count(), receipt.location);
        }
        Commands::Restore { file, remote } => {
            let data = tokio::fs::read_to_string(&file)
                .await
                .map_err(|e| format!("failed to read {}: {}", file.display(), e))?;
            let target = if remote { RestoreTarget::Remote } else { RestoreTarget::LocalCache };
            let report = logbook
                .restore_data(&data, target, identity.as_ref())
                .await
                .map_err(report)?;
            match target {
                RestoreTarget::LocalCache => {
                    println!("Restored {} flights into the local cache", report.restored);
                    let snapshot = logbook.snapshot().await;
                    println!("{}", snapshot.statistics);
                }
                RestoreTarget::Remote => println!(
                    "Restore complete: {} submitted, {} already present, {} failed",
                    report.submitted, report.skipped, report.failed
                ),
            }
        }
    }

    Ok(())
}

/// Error text for a failed logbook operation, with a hint when the store
/// refused us or could not be reached
fn report(e: LogbookError) -> String {
    match e.hint() {
        Some(hint) => format!("{} ({})", e, hint),
        None => e.to_string(),
    }
}

fn print_flight(flight: &FlightRecord) {
    println!(
        "  {}  {:<15} {:<10} {}-{}  {:>8}  {:<9} {}",
        flight.date,
        flight.route(),
        flight.aircraft,
        flight.departure_time,
        flight.arrival_time,
        format_duration(flight.total_hours),
        flight.status,
        flight.id
    );
}
