use anyhow::Context;
use clap::{Parser, Subcommand};
use icr_core::{
    normalize, resolve_data_dir, AssessmentFilter, AssessmentService, CallerIdentity, CoreConfig,
    RawTechniqueInput, SortSpec,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "icr")]
#[command(about = "Inhaler counselling record CLI")]
struct Cli {
    /// Username recorded on writes (default: Unknown)
    #[arg(long, global = true)]
    user: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List assessments, newest first unless sorted
    List {
        /// Substring of hospital number, first name or last name
        #[arg(long)]
        search: Option<String>,
        /// Primary diagnosis code, or `all`
        #[arg(long)]
        diagnosis: Option<String>,
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// assessmentDate, hospitalNumber or compliancePercent
        #[arg(long)]
        sort: Option<String>,
        /// asc or desc
        #[arg(long)]
        order: Option<String>,
    },
    /// Show one assessment with its patient, as JSON
    Show {
        /// Assessment id
        id: String,
    },
    /// Delete one assessment
    Delete {
        /// Assessment id
        id: String,
    },
    /// Dashboard counts
    Stats,
    /// Asthma control and COPD stage distributions
    Reports,
    /// Print export rows for the given assessments
    Export {
        /// Assessment ids, in output order
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print the canonical technique grid and device list for a raw JSON file
    Normalize {
        /// File holding the submitted `techniqueSteps` object
        file: PathBuf,
    },
}

fn open_service() -> anyhow::Result<AssessmentService> {
    let data_dir = resolve_data_dir(std::env::var("ICR_DATA_DIR").ok().map(PathBuf::from))?;
    let commit_email = std::env::var("ICR_COMMIT_EMAIL")
        .unwrap_or_else(|_| icr_core::constants::DEFAULT_COMMIT_EMAIL.into());
    let cfg = Arc::new(CoreConfig::new(data_dir, commit_email)?);
    Ok(AssessmentService::new(cfg)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("icr=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let caller = cli
        .user
        .as_deref()
        .map(CallerIdentity::new)
        .unwrap_or_default();

    match cli.command {
        Some(Commands::List {
            search,
            diagnosis,
            from,
            to,
            sort,
            order,
        }) => {
            let filter = AssessmentFilter::from_query(
                search.as_deref(),
                diagnosis.as_deref(),
                from.as_deref(),
                to.as_deref(),
                None,
            )?;
            let sort = SortSpec::from_query(sort.as_deref(), order.as_deref())?;
            let records = open_service()?.admin_list(&filter, sort);
            if records.is_empty() {
                println!("No assessments found.");
            }
            for record in records {
                let a = &record.assessment;
                let name = record
                    .patient
                    .as_ref()
                    .and_then(|p| p.full_name())
                    .unwrap_or_else(|| "-".into());
                let diagnosis = a.primary_diagnosis.map(|d| d.label()).unwrap_or("-");
                println!(
                    "ID: {}, HN: {}, Name: {}, Date: {}, Diagnosis: {}, Compliance: {}%",
                    a.id,
                    a.hospital_number,
                    name,
                    a.assessment_date.format("%Y-%m-%d"),
                    diagnosis,
                    a.compliance_percent.unwrap_or(0.0)
                );
            }
        }
        Some(Commands::Show { id }) => {
            print_json(&open_service()?.get_assessment(&id)?)?;
        }
        Some(Commands::Delete { id }) => {
            open_service()?.delete_assessment(&caller, &id)?;
            println!("Deleted assessment {}", id);
        }
        Some(Commands::Stats) => {
            print_json(&open_service()?.stats(chrono::Utc::now()))?;
        }
        Some(Commands::Reports) => {
            print_json(&open_service()?.reports(&AssessmentFilter::default()))?;
        }
        Some(Commands::Export { ids }) => {
            for row in open_service()?.export_rows(&ids)? {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    row.index,
                    row.hospital_number,
                    row.full_name,
                    row.age,
                    row.patient_type,
                    row.assessment_date,
                    row.assessment_round,
                    row.primary_diagnosis,
                    row.compliance_percent,
                    row.assessed_by,
                    row.created_at
                );
            }
        }
        Some(Commands::Normalize { file }) => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let raw: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not JSON", file.display()))?;
            print_json(&normalize(Some(&RawTechniqueInput::from(raw))))?;
        }
        None => {
            println!("Use 'icr --help' for commands");
        }
    }

    Ok(())
}
