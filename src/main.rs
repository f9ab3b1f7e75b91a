use asset_uploader::app::{ui, Uploader};
use asset_uploader::config::Settings;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "asset-uploader", version, about = "Upload files to the storage API")]
struct Cli {
    /// Config file, defaults to <config dir>/asset-uploader/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL, overrides config and environment
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload files or folders
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        max_files: Option<usize>,
        /// Per-file limit in bytes
        #[arg(long)]
        max_size: Option<u64>,
        /// Comma separated MIME patterns, e.g. "image/*,application/pdf"
        #[arg(long)]
        accept: Option<String>,
        /// Only take the first file
        #[arg(long)]
        single: bool,
        /// Retry rounds for failed files
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// List uploaded files
    List {
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
    /// Delete uploaded files by asset id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Store the bearer token used for API calls
    Login { token: String },
    /// Forget the stored token
    Logout,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("asset_uploader=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> asset_uploader::Result<bool> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_env();
    if let Some(base_url) = cli.base_url {
        settings.client.base_url = base_url;
    }

    if let Command::Upload {
        max_files,
        max_size,
        accept,
        single,
        ..
    } = &cli.command
    {
        if let Some(max_files) = max_files {
            settings.upload.max_files = *max_files;
        }
        if let Some(max_size) = max_size {
            settings.upload.max_size = *max_size;
        }
        if let Some(accept) = accept {
            settings.upload.accept = accept.clone();
        }
        if *single {
            settings.upload.multiple = false;
        }
    }
    settings.validate()?;

    let uploader = Uploader::new(settings)?;
    match cli.command {
        Command::Upload { paths, retries, .. } => {
            let summary = uploader.upload(paths, retries).await?;
            Ok(!summary.has_failures())
        }
        Command::List { offset, limit } => {
            let page = uploader.list(offset, limit).await?;
            print!("{}", ui::render_page(&page));
            Ok(true)
        }
        Command::Delete { ids } => {
            uploader.delete(&ids).await?;
            println!("Deleted {} files", ids.len());
            Ok(true)
        }
        Command::Login { token } => {
            uploader.login(&token)?;
            println!("Token stored");
            Ok(true)
        }
        Command::Logout => {
            uploader.logout()?;
            println!("Logged out");
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(2)
        }
    }
}
