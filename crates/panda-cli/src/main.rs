//! Panda CLI: manage the provider account and the transcoding jobs of media
//! files.
//!
//! Reads PANDA_* settings and DATABASE_URL from the environment (or `.env`).

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::PgPool;
use uuid::Uuid;

use panda_cli::{init_tracing, or_dash, print_json, truncate_string};
use panda_client::ProviderClient;
use panda_core::models::{Cloud, Encoding, MediaFile, PollOutcome, RemoteStatus};
use panda_core::Config;
use panda_db::{connect, run_migrations, MediaFileRepository, PgMediaFileRepository, TransactionGuard};
use panda_services::{ensure_custom_profiles, verify_settings, JobLifecycleManager};
use panda_storage::{EngineRegistry, PandaStorage, RemoteUrlStorage};

#[derive(Parser)]
#[command(name = "panda", about = "Panda transcoding CLI")]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Success,
    Fail,
    Processing,
}

impl From<StatusArg> for RemoteStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Success => RemoteStatus::Success,
            StatusArg::Fail => RemoteStatus::Fail,
            StatusArg::Processing => RemoteStatus::Processing,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cloud the credentials belong to
    Cloud,
    /// Check the configured credentials against the provider
    Verify,
    /// List the encoding profiles of the cloud
    Profiles,
    /// List the presets profiles can be created from
    Presets,
    /// Add the widescreen custom profiles missing from the cloud
    SeedProfiles,
    /// List the cloud's videos
    Videos {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Apply database migrations
    Migrate,
    /// Create a media file from a URL and submit it for transcoding
    Import {
        /// Media item the file belongs to
        #[arg(long)]
        media_id: Uuid,
        /// URL of the file
        url: String,
    },
    /// Submit an existing media file for transcoding now
    Submit {
        #[arg(long)]
        file_id: Uuid,
    },
    /// Show the remote jobs of a media file, or of every file of a media item
    Status {
        #[command(flatten)]
        target: Target,
    },
    /// Refresh jobs and harvest those that completed
    Poll {
        #[command(flatten)]
        target: Target,
        /// Only this job
        #[arg(long)]
        video_id: Option<String>,
    },
    /// Cancel an encoding of a media file's job
    Cancel {
        #[arg(long)]
        file_id: Uuid,
        #[arg(long)]
        encoding_id: String,
    },
    /// Replace an encoding of a media file's job with a fresh one
    Retry {
        #[arg(long)]
        file_id: Uuid,
        #[arg(long)]
        encoding_id: String,
    },
    /// List the URIs a media file is reachable under
    Uris {
        #[arg(long)]
        file_id: Uuid,
    },
}

#[derive(clap::Args)]
#[group(required = true, multiple = false)]
struct Target {
    #[arg(long)]
    file_id: Option<Uuid>,
    #[arg(long)]
    media_id: Option<Uuid>,
}

/// Database-backed services for the media file commands.
struct Services {
    pool: PgPool,
    repository: Arc<PgMediaFileRepository>,
    registry: EngineRegistry,
    lifecycle: Arc<JobLifecycleManager>,
}

impl Services {
    async fn open(config: &Config) -> anyhow::Result<Self> {
        let database_url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set for this command")?;
        let pool = connect(database_url).await?;
        let repository = Arc::new(PgMediaFileRepository::new(pool.clone()));

        let panda = Arc::new(PandaStorage::from_config(config, repository.clone())?);
        let lifecycle = panda.lifecycle().clone();
        let registry = EngineRegistry::new(repository.clone());
        registry.register(panda).await;
        registry.register(Arc::new(RemoteUrlStorage::new())).await;
        let engines = registry.engine_types().await;
        tracing::debug!(engines = ?engines, "Storage engines registered");

        Ok(Self {
            pool,
            repository,
            registry,
            lifecycle,
        })
    }

    async fn media_file(&self, id: Uuid) -> anyhow::Result<MediaFile> {
        self.repository
            .get_media_file(id)
            .await?
            .with_context(|| format!("Media file {} not found", id))
    }
}

fn print_cloud(cloud: &Cloud) {
    println!(
        "Cloud {} ({}) bucket {}",
        cloud.id,
        or_dash(cloud.name.as_deref()),
        or_dash(cloud.s3_videos_bucket.as_deref())
    );
}

fn print_encodings(encodings: &[Encoding]) {
    println!(
        "{:<34} {:<34} {:<12} {:>8} {:>6}",
        "ENCODING", "VIDEO", "STATUS", "PROFILE", "DONE"
    );
    for e in encodings {
        println!(
            "{:<34} {:<34} {:<12} {:>8} {:>5}%",
            e.id,
            e.video_id,
            e.status,
            truncate_string(e.profile_name.as_deref().unwrap_or(&e.profile_id), 8),
            or_dash(e.encoding_progress),
        );
    }
}

fn print_outcomes(outcomes: &[PollOutcome]) {
    if outcomes.is_empty() {
        println!("No transcoding jobs to poll");
        return;
    }
    for outcome in outcomes {
        println!(
            "{} ({}): {}",
            outcome.job.video_id, outcome.job.media_file_id, outcome.job.state
        );
        for file in &outcome.artifacts {
            println!("  + {} {}", file.id, file.display_name);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG may come from .env.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = Config::from_env().context(
        "Failed to load configuration. Set PANDA_CLOUD_ID, PANDA_ACCESS_KEY, PANDA_SECRET_KEY and S3_BUCKET_NAME",
    )?;
    let json = cli.format == OutputFormat::Json;

    match cli.command {
        Commands::Cloud => {
            let client = ProviderClient::from_settings(&config.settings)?;
            let cloud = client.get_cloud().await?;
            if json {
                print_json(&cloud)?;
            } else {
                print_cloud(&cloud);
            }
        }
        Commands::Verify => {
            let client = ProviderClient::from_settings(&config.settings)?;
            let cloud = verify_settings(&config.settings, &client).await?;
            if json {
                print_json(&cloud)?;
            } else {
                println!("Settings verified");
                print_cloud(&cloud);
            }
        }
        Commands::Profiles => {
            let client = ProviderClient::from_settings(&config.settings)?;
            let profiles = client.get_profiles().await?;
            if json {
                print_json(&profiles)?;
            } else {
                println!("{:<34} {:<24} {:<8} {:>6} {:>6}", "ID", "NAME", "EXT", "WIDTH", "HEIGHT");
                for p in &profiles {
                    let selected = if config.settings.profiles.contains(&p.name) { "*" } else { "" };
                    println!(
                        "{:<34} {:<24} {:<8} {:>6} {:>6}",
                        p.id,
                        format!("{}{}", truncate_string(&p.name, 23), selected),
                        or_dash(p.extname.as_deref()),
                        or_dash(p.width),
                        or_dash(p.height),
                    );
                }
            }
        }
        Commands::Presets => {
            let client = ProviderClient::from_settings(&config.settings)?;
            let presets = client.get_presets().await?;
            if json {
                print_json(&presets)?;
            } else {
                for p in &presets {
                    println!("{:<24} {}", p.name, or_dash(p.title.as_deref()));
                }
            }
        }
        Commands::SeedProfiles => {
            let client = ProviderClient::from_settings(&config.settings)?;
            let created = ensure_custom_profiles(&client).await?;
            if json {
                print_json(&created)?;
            } else if created.is_empty() {
                println!("All custom profiles already exist");
            } else {
                for p in &created {
                    println!("Created {} ({})", p.name, p.id);
                }
            }
        }
        Commands::Videos { status } => {
            let client = ProviderClient::from_settings(&config.settings)?;
            let videos = client.get_videos(status.map(Into::into)).await?;
            if json {
                print_json(&videos)?;
            } else {
                for v in &videos {
                    println!(
                        "{:<34} {:<12} {}",
                        v.id,
                        v.status,
                        or_dash(v.original_filename.as_deref())
                    );
                }
            }
        }
        Commands::Migrate => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for this command")?;
            let pool = connect(database_url).await?;
            run_migrations(&pool).await?;
            println!("Migrations applied");
        }
        Commands::Import { media_id, url } => {
            let ctx = Services::open(&config).await?;
            let new_file = ctx.registry.parse(media_id, &url).await?;

            let mut tx = TransactionGuard::begin(&ctx.pool).await?;
            let file = PgMediaFileRepository::insert_with(tx.connection()?, new_file).await?;
            let accepted = match ctx.registry.transcode_all(&file, tx.hooks_mut()).await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tx.rollback().await?;
                    return Err(e.into());
                }
            };
            let failed = tx.commit().await?;
            tracing::info!(
                media_file_id = %file.id,
                engines = accepted,
                failed_hooks = failed,
                "Media file imported"
            );

            if json {
                print_json(&file)?;
            } else {
                println!("Created {} {} ({})", file.id, file.display_name, file.storage_engine);
                if accepted == 0 {
                    println!("Not submitted for transcoding");
                }
            }
            if failed > 0 {
                bail!("Submitting media file {} for transcoding failed", file.id);
            }
        }
        Commands::Submit { file_id } => {
            let ctx = Services::open(&config).await?;
            let file = ctx.media_file(file_id).await?;
            ctx.lifecycle
                .check_transcodable(&file, &config.settings.profiles)?;
            let job = ctx
                .lifecycle
                .submit(
                    &file,
                    &config.settings.profiles,
                    config.state_update_url_for(file.id).as_deref(),
                )
                .await?;
            if json {
                print_json(&job)?;
            } else {
                println!("Submitted {} as job {}", file.display_name, job.video_id);
            }
        }
        Commands::Status { target } => {
            let ctx = Services::open(&config).await?;
            let status = match (target.file_id, target.media_id) {
                (Some(file_id), _) => {
                    let file = ctx.media_file(file_id).await?;
                    vec![ctx.lifecycle.file_status(&file).await?]
                }
                (None, Some(media_id)) => ctx.lifecycle.media_status(media_id).await?.files,
                (None, None) => bail!("Either --file-id or --media-id is required"),
            };
            if json {
                print_json(&status)?;
            } else {
                for file in &status {
                    println!("{} {}", file.media_file_id, file.display_name);
                    if file.is_transcoding() {
                        print_encodings(&file.encodings);
                    } else {
                        println!("  no transcoding jobs");
                    }
                }
            }
        }
        Commands::Poll { target, video_id } => {
            let ctx = Services::open(&config).await?;
            let outcomes = match (target.file_id, target.media_id) {
                (Some(file_id), _) => {
                    let file = ctx.media_file(file_id).await?;
                    ctx.lifecycle
                        .poll_status(&file, video_id.as_deref(), &ctx.registry)
                        .await?
                }
                (None, Some(media_id)) => {
                    ctx.lifecycle
                        .poll_media(media_id, video_id.as_deref(), &ctx.registry)
                        .await?
                }
                (None, None) => bail!("Either --file-id or --media-id is required"),
            };
            if json {
                print_json(&outcomes)?;
            } else {
                print_outcomes(&outcomes);
            }
        }
        Commands::Cancel { file_id, encoding_id } => {
            let ctx = Services::open(&config).await?;
            let file = ctx.media_file(file_id).await?;
            let deleted = ctx.lifecycle.cancel(&file, &encoding_id).await?;
            if json {
                print_json(&serde_json::json!({ "encoding_id": encoding_id, "deleted": deleted }))?;
            } else if deleted {
                println!("Encoding {} cancelled", encoding_id);
            } else {
                println!("Encoding {} was not deleted by the provider", encoding_id);
            }
        }
        Commands::Retry { file_id, encoding_id } => {
            let ctx = Services::open(&config).await?;
            let file = ctx.media_file(file_id).await?;
            let fresh = ctx.lifecycle.retry(&file, &encoding_id).await?;
            if json {
                print_json(&fresh)?;
            } else {
                println!("Encoding {} replaced by {}", encoding_id, fresh.id);
            }
        }
        Commands::Uris { file_id } => {
            let ctx = Services::open(&config).await?;
            let file = ctx.media_file(file_id).await?;
            let uris = ctx.registry.get_uris(&file).await?;
            if json {
                print_json(&uris)?;
            } else {
                for uri in &uris {
                    println!("{:<6} {}", uri.scheme, uri.url());
                }
            }
        }
    }

    Ok(())
}
