use clap::{Parser, Subcommand, ValueEnum};
use clinic_core::constants::{DEFAULT_DATA_DIR, MAX_NOTES_LEN, MAX_PAGE_SIZE};
use clinic_core::metrics::{high_frequency_pta, pure_tone_average, HearingLossGrade};
use clinic_core::models::{AudiogramPoint, Ear, NewPatient, Sex};
use clinic_core::sanitizer::sanitize_text;
use clinic_core::services::PatientService;
use clinic_core::{ClinicConfig, PageRequest, Stores, TenantId, TenantScope};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic EMR command line tools")]
struct Cli {
    /// Directory of the YAML record store
    #[arg(long, global = true, env = "CLINIC_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with patient records
    Patients {
        #[command(subcommand)]
        command: PatientCommands,
    },
    /// Pure tone average and hearing-loss grade for one ear
    Pta {
        /// Thresholds as frequency=dB pairs, e.g. 500=20,1000=25,2000=30
        #[arg(long)]
        ear_thresholds: String,
    },
    /// Show how free text would be stored
    Sanitize {
        text: String,
        /// Maximum stored length in characters
        #[arg(long, default_value_t = MAX_NOTES_LEN)]
        max: usize,
    },
    /// Load configuration from the environment and print it
    CheckConfig,
}

#[derive(Subcommand)]
enum PatientCommands {
    /// List a tenant's patients
    List {
        #[arg(long)]
        tenant: String,
    },
    /// Register a patient
    Create {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        first: String,
        #[arg(long)]
        last: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: chrono::NaiveDate,
        #[arg(long, value_enum, default_value_t = SexArg::Unknown)]
        sex: SexArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SexArg {
    Male,
    Female,
    Other,
    Unknown,
}

impl From<SexArg> for Sex {
    fn from(value: SexArg) -> Self {
        match value {
            SexArg::Male => Sex::Male,
            SexArg::Female => Sex::Female,
            SexArg::Other => Sex::Other,
            SexArg::Unknown => Sex::Unknown,
        }
    }
}

/// Parses `500=20,1000=25` into audiogram points for a single ear.
fn parse_thresholds(input: &str) -> Result<Vec<AudiogramPoint>, String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (freq, db) = pair
                .split_once('=')
                .ok_or_else(|| format!("'{pair}' is not frequency=dB"))?;
            let frequency_hz = freq
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("'{freq}' is not a frequency in Hz"))?;
            let threshold_db = db
                .trim()
                .parse::<i32>()
                .map_err(|_| format!("'{db}' is not a threshold in dB"))?;
            Ok(AudiogramPoint {
                ear: Ear::Right,
                frequency_hz,
                threshold_db,
            })
        })
        .collect()
}

fn patient_service(data_dir: &std::path::Path) -> Result<PatientService, Box<dyn std::error::Error>> {
    Ok(PatientService::new(Stores::yaml(data_dir)?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Patients {
            command: PatientCommands::List { tenant },
        }) => {
            let scope = TenantScope::new(TenantId::new(&tenant)?);
            let service = patient_service(&cli.data_dir)?;
            let mut page_number = 1;
            let mut listed = 0;
            loop {
                let page = service.search(
                    &scope,
                    "",
                    &PageRequest::new(page_number, i64::from(MAX_PAGE_SIZE)),
                )?;
                for patient in &page.items {
                    println!(
                        "ID: {}, Name: {}, DOB: {}, Created: {}",
                        patient.id,
                        patient.full_name(),
                        patient.date_of_birth,
                        patient.created_at
                    );
                }
                listed += page.items.len();
                if page_number >= i64::from(page.total_pages) {
                    break;
                }
                page_number += 1;
            }
            if listed == 0 {
                println!("No patients found.");
            }
        }
        Some(Commands::Patients {
            command:
                PatientCommands::Create {
                    tenant,
                    first,
                    last,
                    dob,
                    sex,
                },
        }) => {
            let scope = TenantScope::new(TenantId::new(&tenant)?);
            let service = patient_service(&cli.data_dir)?;
            let input = NewPatient {
                first_name: first,
                last_name: last,
                date_of_birth: dob,
                sex: sex.into(),
                ..Default::default()
            };
            match service.create(&scope, input) {
                Ok(patient) => println!("Created patient with ID: {}", patient.id),
                Err(e) => eprintln!("Error creating patient: {}", e),
            }
        }
        Some(Commands::Pta { ear_thresholds }) => match parse_thresholds(&ear_thresholds) {
            Ok(points) => match pure_tone_average(&points, Ear::Right) {
                Some(pta) => {
                    println!("PTA: {:.1} dB HL", pta);
                    println!("Grade: {:?}", HearingLossGrade::from_pta(pta));
                    if let Some(hf) = high_frequency_pta(&points, Ear::Right) {
                        println!("High-frequency PTA: {:.1} dB HL", hf);
                    }
                }
                None => eprintln!("Thresholds at 500, 1000 and 2000 Hz are required"),
            },
            Err(e) => eprintln!("Error parsing thresholds: {}", e),
        },
        Some(Commands::Sanitize { text, max }) => {
            println!("{}", sanitize_text(&text, max));
        }
        Some(Commands::CheckConfig) => {
            match ClinicConfig::from_env_values(|key| std::env::var(key).ok()) {
                Ok(config) => {
                    let limits = config.rate_limits();
                    println!("Environment: {}", config.environment());
                    println!("Storage: {}", config.storage());
                    println!("Data dir: {}", config.data_dir().display());
                    println!("Attachments: {}", config.attachments_dir().display());
                    println!(
                        "Rate limits per {}s: global {}, auth {}, sensitive {}",
                        limits.window.as_secs(),
                        limits.global,
                        limits.auth,
                        limits.sensitive
                    );
                    println!("Request timeout: {}s", config.request_timeout().as_secs());
                    println!("Max upload: {} bytes", config.max_upload_bytes());
                }
                Err(e) => eprintln!("Invalid configuration: {}", e),
            }
        }
        None => {
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_threshold_pairs() {
        let points = parse_thresholds("500=20, 1000=25,2000=30,").unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].frequency_hz, 1000);
        assert_eq!(points[1].threshold_db, 25);

        let pta = pure_tone_average(&points, Ear::Right).unwrap();
        assert!((pta - 25.0).abs() < f64::EPSILON);
        assert_eq!(HearingLossGrade::from_pta(pta), HearingLossGrade::Normal);
    }

    #[test]
    fn rejects_malformed_pairs() {
        assert!(parse_thresholds("500:20").is_err());
        assert!(parse_thresholds("high=20").is_err());
        assert!(parse_thresholds("500=loud").is_err());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
