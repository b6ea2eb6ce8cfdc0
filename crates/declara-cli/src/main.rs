use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use declara_storage::{PgStore, StorageConfig};
use declara_sync::CvImportFilter;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "declara-cli")]
#[command(about = "Candidate disclosure import and read API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import election processes, types, organizations, districts and candidates.
    ImportCatalog,
    /// Import the CV of every registered candidate matching the filters.
    ImportCvs {
        /// Source id of the election process.
        #[arg(long)]
        election_process: Option<i64>,
        /// Source id of the election type.
        #[arg(long)]
        election_type: Option<i64>,
    },
    /// Apply pending database migrations.
    Migrate,
    /// Serve the read-only JSON API.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match Cli::parse().command {
        Commands::ImportCatalog => {
            let summary = declara_sync::run_catalog_import_from_env().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("serializing summary")?
            );
        }
        Commands::ImportCvs {
            election_process,
            election_type,
        } => {
            let summary = declara_sync::run_cv_import_from_env(CvImportFilter {
                election_source_id: election_process,
                election_type_source_id: election_type,
            })
            .await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("serializing summary")?
            );
        }
        Commands::Migrate => {
            let store = PgStore::connect(&StorageConfig::from_env())
                .await
                .context("connecting to the database")?;
            store.migrate().await.context("running migrations")?;
            info!("migrations applied");
        }
        Commands::Serve => declara_web::serve_from_env().await?,
    }

    Ok(())
}
