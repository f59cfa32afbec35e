use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use halaqat_dashboard::client::{FileTransport, HttpTransport};
use halaqat_dashboard::filter::FilterState;
use halaqat_dashboard::models::StudentRecord;
use halaqat_dashboard::submission::EvaluationForm;
use halaqat_dashboard::{report, Config, Dashboard, DashboardError, RefreshOutcome, Transport, TransportError};

#[derive(Parser)]
#[command(name = "halaqat-dashboard")]
#[command(about = "Progress reports for Quran memorization circles", long_about = None)]
struct Cli {
    /// Read a saved JSON payload instead of calling the endpoint
    #[arg(long, global = true)]
    input: Option<PathBuf>,
    /// JSON config file; defaults apply for anything it omits
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    week: Option<String>,
    #[arg(long)]
    day: Option<String>,
    #[arg(long)]
    time: Option<String>,
    #[arg(long)]
    teacher: Option<String>,
    #[arg(long)]
    circle: Option<String>,
    #[arg(long, default_value = "")]
    search: String,
}

impl FilterArgs {
    /// Selections that name nothing in `records` are dropped.
    fn into_state(self, records: &[StudentRecord]) -> FilterState {
        let mut state = FilterState {
            search: self.search,
            week: self.week,
            day: self.day,
            circle_time: self.time,
            teacher: self.teacher,
            circle: self.circle,
        };
        state.reconcile(records);
        state
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print per-circle averages
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print the excellence ranking
    Rank {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write circle aggregates as CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "circles.csv")]
        out: PathBuf,
    },
    /// Submit a circle evaluation (scores as 0..1 or 0..100)
    SubmitEvaluation {
        #[arg(long)]
        circle: String,
        #[arg(long, default_value = "")]
        teacher: String,
        #[arg(long)]
        discipline: f64,
        #[arg(long)]
        memorization: f64,
        #[arg(long)]
        review: f64,
        #[arg(long)]
        consolidation: f64,
        #[arg(long)]
        attendance: f64,
        #[arg(long)]
        overall: f64,
    },
}

fn fraction(value: f64) -> f64 {
    halaqat_dashboard::parse::parse_percentage_like(Some(&serde_json::json!(value)))
}

async fn run<T: Transport>(transport: T, config: Config, command: Commands) -> anyhow::Result<()> {
    let dashboard = Dashboard::load(transport, config).await?;
    let config = dashboard.config();
    let dataset = dashboard.snapshot();

    match command {
        Commands::Summary { filters } => {
            let students = filters.into_state(&dataset.students).apply(&dataset.students);
            let circles = report::sorted_circles(halaqat_dashboard::aggregate::aggregate_by_circle(
                &students, config,
            ));

            if circles.is_empty() {
                println!("No students match these filters.");
                return Ok(());
            }

            println!("Circles ({} students):", students.len());
            for circle in circles.iter() {
                println!(
                    "- {} ({} students) general {:.0}% attendance {:.0}% points {}",
                    circle.circle,
                    circle.student_count,
                    circle.avg_general_index * 100.0,
                    circle.avg_attendance * 100.0,
                    circle.total_points
                );
            }
        }
        Commands::Rank { limit } => {
            let ranked = dataset.excellence(config);
            if ranked.is_empty() {
                println!("No circles eligible for ranking.");
                return Ok(());
            }

            println!("Top circles ({}):", config.excellence_time_slot);
            for entry in ranked.iter().take(limit) {
                println!(
                    "{}. {} score {:.1}%",
                    entry.rank,
                    entry.circle.circle,
                    entry.excellence_score * 100.0
                );
            }
        }
        Commands::Report { filters, out } => {
            let today = chrono::Local::now().date_naive();
            let report = report::build_report(&dataset, &filters.into_state(&dataset.students), config, today);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { filters, out } => {
            let students = filters.into_state(&dataset.students).apply(&dataset.students);
            let circles = report::sorted_circles(halaqat_dashboard::aggregate::aggregate_by_circle(
                &students, config,
            ));
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            report::write_circles_csv(file, &circles)?;
            println!("Exported {} circles to {}.", circles.len(), out.display());
        }
        Commands::SubmitEvaluation {
            circle,
            teacher,
            discipline,
            memorization,
            review,
            consolidation,
            attendance,
            overall,
        } => {
            let form = EvaluationForm {
                circle,
                teacher,
                discipline: fraction(discipline),
                memorization: fraction(memorization),
                review: fraction(review),
                consolidation: fraction(consolidation),
                attendance: fraction(attendance),
                general_index: (fraction(memorization) + fraction(review) + fraction(consolidation))
                    / 3.0,
                overall: fraction(overall),
            };
            let submission = form.to_submission(&config.sheets.evaluations, &config.evaluation_fields);

            // The script endpoint answers writes with a redirect chain; a
            // redirect failure comes after the write has landed.
            let outcome = dashboard
                .submit(&submission, |err| matches!(err, TransportError::Redirect(_)))
                .await?;
            match outcome {
                RefreshOutcome::Updated => println!("Evaluation submitted for {}.", form.circle),
                RefreshOutcome::Stale(warning) => {
                    println!("Evaluation submitted for {}; {warning}", form.circle)
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let result = match cli.input {
        Some(path) => run(FileTransport::new(path), config, cli.command).await,
        None => {
            let endpoint = config
                .endpoint
                .clone()
                .context("HALAQAT_ENDPOINT must be set to the sheet endpoint, or pass --input")?;
            run(HttpTransport::new(endpoint), config, cli.command).await
        }
    };

    if let Err(err) = &result {
        if let Some(dashboard_err) = err.downcast_ref::<DashboardError>() {
            tracing::error!(fatal = dashboard_err.is_fatal(), "{dashboard_err}");
        }
    }
    result
}
