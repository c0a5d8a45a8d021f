use clap::{Parser, Subcommand};
use discharge_core::config::resolve_specialties;
use discharge_core::{
    ActiveRecord, CoreConfig, DischargeForm, DischargePanel, Mrn, Notifier, RecordKey,
    RecordKind, SearchFilter,
};
use discharge_store::{connect, StoreSettings};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "discharge")]
#[command(about = "Discharge management for active admissions and consultations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List active admissions and consultations
    List {
        /// Match patient name (any case) or MRN (exact case)
        #[arg(long)]
        search: Option<String>,
        /// Only show this specialty
        #[arg(long)]
        specialty: Option<String>,
    },
    /// Show today's discharges per specialty
    Stats,
    /// Discharge an admission or complete a consultation
    Complete {
        /// admission or consultation
        #[arg(long)]
        kind: RecordKind,
        /// Medical record number
        #[arg(long)]
        mrn: String,
        /// Discharge date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Discharge time (HH:MM)
        #[arg(long)]
        time: String,
        /// Discharge note (admissions only)
        #[arg(long)]
        note: Option<String>,
    },
}

/// Prints notifications to the terminal.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify_success(&self, message: &str) {
        println!("{message}");
    }

    fn notify_failure(&self, message: &str) {
        eprintln!("Error: {message}");
    }
}

type Panel = DischargePanel<discharge_store::StoreBackend, ConsoleNotifier>;

fn build_panel() -> Result<Panel, Box<dyn std::error::Error>> {
    let specialties = resolve_specialties(
        std::env::var("DISCHARGE_SPECIALTIES_FILE")
            .ok()
            .map(PathBuf::from),
        std::env::var("DISCHARGE_SPECIALTIES").ok(),
    )?;
    let cfg = Arc::new(CoreConfig::new(specialties)?);
    let store = connect(&StoreSettings::from_env()?)?;
    Ok(DischargePanel::new(cfg, store, ConsoleNotifier))
}

fn format_record(record: &ActiveRecord) -> String {
    let since = match record {
        ActiveRecord::Admission(a) => a.admission_date.to_string(),
        ActiveRecord::Consultation(c) => c.created_at.format("%Y-%m-%d").to_string(),
    };
    format!(
        "{:<12} {:<12} {:<24} {:<20} {}",
        record.kind(),
        record.mrn(),
        record.patient_name(),
        record.specialty(),
        since
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'discharge --help' for commands");
        return Ok(ExitCode::SUCCESS);
    };

    let mut panel = build_panel()?;

    // Failures are already reported by the notifier; only the exit code is left to set.
    match command {
        Commands::List { search, specialty } => {
            if panel.load_active_records().await.is_err() {
                return Ok(ExitCode::FAILURE);
            }
            let filter = SearchFilter::new(search.unwrap_or_default(), specialty);
            let records = panel.visible_records(&filter);
            if records.is_empty() {
                println!("No active records found.");
            } else {
                for record in records {
                    println!("{}", format_record(record));
                }
            }
        }
        Commands::Stats => {
            if panel.refresh_statistics().await.is_err() {
                return Ok(ExitCode::FAILURE);
            }
            if panel.statistics().is_empty() {
                println!("No discharges recorded today.");
            }
            for stat in panel.statistics() {
                println!(
                    "{}: {} admissions discharged, {} consultations completed",
                    stat.specialty, stat.admissions_discharged, stat.consultations_completed
                );
            }
        }
        Commands::Complete {
            kind,
            mrn,
            date,
            time,
            note,
        } => {
            if panel.load_active_records().await.is_err() {
                return Ok(ExitCode::FAILURE);
            }
            let key = RecordKey::new(kind, Mrn::new(&mrn)?);
            if panel.select(key).is_err() {
                return Ok(ExitCode::FAILURE);
            }
            panel.set_form(DischargeForm::new(date, time, note));
            if panel.submit_discharge().await.is_err() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
