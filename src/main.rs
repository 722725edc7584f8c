use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use call_analytics::models::CallRecord;
use call_analytics::{aggregate, daterange, db, normalize, report, serve};

#[derive(Parser)]
#[command(name = "call-analytics")]
#[command(about = "Sales-call performance analytics dashboard backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import call records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print aggregate scores for a member over a date window
    Summary {
        #[arg(long)]
        member: String,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Generate a markdown performance report
    Report {
        #[arg(long)]
        member: String,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Run the dashboard HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} call records from {}.", csv.display());
        }
        Commands::Summary {
            member,
            team,
            from,
            to,
        } => {
            let records = load_window(&pool, &member, team.as_deref(), from, to).await?;
            let summary = aggregate::aggregate(&records);

            if summary.total_calls == 0 {
                println!("No completed calls found for this window.");
                return Ok(());
            }

            println!("Performance summary for {member}:");
            println!("- Total calls: {}", summary.total_calls);
            println!("- Average score: {}", summary.overall_average);
            println!("- Best category: {}", summary.best_category);
            println!("- Needs improvement: {}", summary.needs_improvement);
            for entry in &summary.category_averages {
                println!("- {}: {:.1}", entry.category, entry.average);
            }
        }
        Commands::Report {
            member,
            team,
            from,
            to,
            out,
        } => {
            let records = load_window(&pool, &member, team.as_deref(), from, to).await?;
            let window = match (from, to) {
                (Some(from), Some(to)) => Some((from, to)),
                _ => None,
            };
            let report = report::build_report(&member, window, &records);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Serve { addr } => {
            serve::run(&addr, pool).await?;
        }
    }

    Ok(())
}

async fn load_window(
    pool: &PgPool,
    member: &str,
    team: Option<&str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> anyhow::Result<Vec<CallRecord>> {
    let rows = db::fetch_records(pool, member, team, None, None).await?;
    let records: Vec<CallRecord> = rows.into_iter().map(normalize::normalize).collect();
    Ok(match (from, to) {
        (Some(from), Some(to)) => daterange::filter_by_date_range(&records, from, to),
        _ => records,
    })
}
