use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use ward_core::{
    alert_thresholds_from_env_values, constants::DEFAULT_DATA_DIR, is_compatible, BloodType,
    CoreConfig, CurrentStatus, FileStore, PatientStatusService, PatientSummary, RecordId,
    RecordStore, TracingAuditSink, TransfusionService,
};

#[derive(Parser)]
#[command(name = "ward")]
#[command(about = "Ward transfusion safety and patient progress CLI")]
struct Cli {
    /// Record store directory
    #[arg(long, env = "WARD_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a recipient may receive a donor blood type
    Compat {
        /// Recipient blood type, e.g. A+
        recipient: BloodType,
        /// Donor blood type, e.g. O-
        donor: BloodType,
    },
    /// List donor types a recipient may receive
    Donors {
        /// Recipient blood type
        recipient: BloodType,
    },
    /// Store a patient summary handed over from registration
    RegisterPatient {
        name: String,
        hospital_number: String,
        /// Blood type if already grouped
        #[arg(long)]
        blood_type: Option<BloodType>,
    },
    /// Show a patient's transfusions, newest first
    History {
        /// Patient id (32 lowercase hex characters)
        patient_id: RecordId,
    },
    /// Show a patient's admission, plan progress and alerts
    Status {
        /// Patient id (32 lowercase hex characters)
        patient_id: RecordId,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Compat { recipient, donor }) => {
            if is_compatible(recipient, donor) {
                println!("{recipient} may receive {donor}");
            } else {
                println!("{recipient} must NOT receive {donor} without a confirmed override");
            }
        }
        Some(Commands::Donors { recipient }) => {
            let donors: Vec<String> = recipient
                .accepted_donors()
                .iter()
                .map(ToString::to_string)
                .collect();
            println!("{recipient} accepts: {}", donors.join(", "));
        }
        Some(Commands::RegisterPatient {
            name,
            hospital_number,
            blood_type,
        }) => {
            let store = FileStore::open(&cli.data_dir)?;
            let patient =
                PatientSummary::register(&name, &hospital_number, blood_type, chrono::Utc::now())?;
            store.put(&patient)?;
            println!("Registered patient with ID: {}", patient.id);
        }
        Some(Commands::History { patient_id }) => {
            let store = Arc::new(FileStore::open(&cli.data_dir)?);
            let service = TransfusionService::new(store, Arc::new(TracingAuditSink));
            let transfusions = service.history(patient_id)?;
            if transfusions.is_empty() {
                println!("No transfusions found.");
            }
            for t in transfusions {
                println!(
                    "ID: {}, Status: {}, Units: {}, Planned: {}, Adverse events: {}",
                    t.id(),
                    t.status(),
                    t.total_units(),
                    t.created_at().format("%Y-%m-%d %H:%M"),
                    if t.adverse_events() { "yes" } else { "no" }
                );
            }
        }
        Some(Commands::Status { patient_id }) => {
            let thresholds = alert_thresholds_from_env_values(
                std::env::var("WARD_LONG_STAY_DAYS").ok(),
                std::env::var("WARD_CRITICAL_STAY_DAYS").ok(),
                std::env::var("WARD_OVERDUE_STEPS_HIGH").ok(),
            )?;
            let cfg = Arc::new(CoreConfig::new(cli.data_dir.clone(), thresholds)?);
            let store = Arc::new(FileStore::open(cfg.data_dir())?);
            store.get::<PatientSummary>(patient_id)?;

            let status = PatientStatusService::new(store, cfg).patient_status(patient_id);
            match status.current_status {
                CurrentStatus::Admitted => println!("Status: admitted"),
                CurrentStatus::NotAdmitted => println!("Status: not admitted"),
            }
            if let (Some(admission), Some(los)) = (&status.admission, status.length_of_stay) {
                println!(
                    "Ward: {}, Diagnosis: {}, Length of stay: {} days ({} hours)",
                    admission.ward_location, admission.diagnosis, los.days, los.hours
                );
            }
            for plan in &status.plans {
                println!(
                    "Plan: {}, {}/{} steps ({:.0}%), {}",
                    plan.title,
                    plan.completed_steps,
                    plan.total_steps,
                    plan.completion_percentage,
                    if plan.is_on_schedule { "on schedule" } else { "behind schedule" }
                );
            }
            println!("Overall progress: {}%", status.overall_progress);
            for alert in &status.alerts {
                println!("[{:?}] {}", alert.severity, alert.message);
            }
            for issue in &status.issues {
                eprintln!("warning: {issue}");
            }
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
