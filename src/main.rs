//! s3-bucket command line tool
//!
//! Fetches or stores a single object in a bucket configured through
//! environment variables (or a `.env` file).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s3_bucket::{Bucket, BucketError, BucketRegistry};

#[derive(Parser, Debug)]
#[command(name = "s3-bucket", version, about = "Get and put objects in an S3-compatible bucket")]
struct Cli {
    /// Environment variable prefix, e.g. `S3` reads `S3_BUCKET`, `S3_REGION`, ...
    #[arg(long, short, env = "S3_BUCKET_PROFILE", default_value = "S3")]
    profile: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download an object to a file or stdout
    Get {
        key: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Upload a file or stdin. The whole body is buffered in memory first.
    Put {
        key: String,
        #[arg(long, short = 't', default_value = "application/octet-stream")]
        content_type: String,
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "s3_bucket=info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<BucketError>() {
            Some(BucketError::NotFound(key)) => {
                tracing::error!("No object stored under {}", key);
                ExitCode::from(2)
            }
            _ => {
                tracing::error!("{:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut registry = BucketRegistry::new();
    let bucket = registry
        .register_from_env(&cli.profile, &cli.profile)
        .with_context(|| {
            format!("Failed to configure bucket from {}_* variables", cli.profile)
        })?;

    tracing::info!("Using bucket {} at {}", bucket.bucket(), bucket.endpoint());

    match cli.command {
        Command::Get { key, output } => get(bucket, &key, output).await,
        Command::Put {
            key,
            content_type,
            file,
        } => put(bucket, &key, &content_type, file).await,
    }
}

async fn get(bucket: &Bucket, key: &str, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut object = bucket.get_object(key).await?;

    tracing::info!(
        content_type = %object.content_type,
        content_length = ?object.content_length,
        "Fetched {}",
        key
    );

    let written = match output {
        Some(path) => write_to_file(&mut object, &path).await?,
        None => {
            let mut stdout = tokio::io::stdout();
            let n = tokio::io::copy(&mut object, &mut stdout).await?;
            stdout.flush().await?;
            n
        }
    };

    tracing::debug!(bytes = written, "Wrote object body");
    Ok(())
}

/// Copy `reader` into `path` through a `.part` sibling.
///
/// `path` only appears once the copy finished; a failed copy leaves nothing behind.
async fn write_to_file<R>(reader: &mut R, path: &Path) -> anyhow::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let copied = async {
        let mut file = tokio::fs::File::create(&partial)
            .await
            .with_context(|| format!("Failed to create {}", partial.display()))?;
        let n = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        anyhow::Ok(n)
    }
    .await;

    match copied {
        Ok(n) => {
            tokio::fs::rename(&partial, path)
                .await
                .with_context(|| format!("Failed to move body into {}", path.display()))?;
            Ok(n)
        }
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                tracing::debug!("Could not remove {}: {}", partial.display(), cleanup);
            }
            Err(e)
        }
    }
}

async fn put(
    bucket: &Bucket,
    key: &str,
    content_type: &str,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    match file {
        Some(path) => {
            let body = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            bucket.put_object_buffered(key, content_type, body).await?;
        }
        None => {
            bucket
                .put_object_buffered(key, content_type, tokio::io::stdin())
                .await?;
        }
    }

    tracing::info!(content_type = %content_type, "Stored {}", key);
    Ok(())
}
