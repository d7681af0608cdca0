//! `fserver` command-line front end.
//!
//! Runs a single action against the configured store and prints the
//! response exactly as the HTTP collaborator would send it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fserver::{ActionRequest, FuegoServer, UploadedFile};
use fserver_logging::{init_logging, LogConfig};
use fserver_store::ServerConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fserver", about = "Fuego test-fleet server")]
struct Cli {
    /// Configuration file (overrides FSERVER_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one action, e.g. `fserver call put_board --field host=h --field board=b`
    Call {
        /// Action name (put_test, query_requests, show, ...)
        action: String,

        /// Form field as key=value; repeatable
        #[arg(short = 'f', long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// File to upload with put_test / put_binary_package / put_run
        #[arg(long)]
        file: Option<PathBuf>,

        /// Upload under this name instead of the file's own name
        #[arg(long, requires = "file")]
        filename: Option<String>,

        /// Page for `show`
        #[arg(long)]
        page: Option<String>,
    },

    /// Print the resolved configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty field name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ServerConfig::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::from(2);
        }
    };

    if let Err(err) = init_logging(LogConfig {
        app_name: "fserver",
        log_dir: &config.logs_dir(),
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: {:#}", err);
    }

    match run(cli.command, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the action succeeded.
fn run(command: Commands, config: ServerConfig) -> Result<bool> {
    match command {
        Commands::Call {
            action,
            fields,
            file,
            filename,
            page,
        } => {
            let mut request = ActionRequest::new(action);
            request.fields = fields.into_iter().collect();
            request.page = page;
            if let Some(path) = file {
                let mut upload = UploadedFile::from_path(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                if let Some(name) = filename {
                    upload.filename = name;
                }
                request.upload = Some(upload);
            }

            let server = FuegoServer::open(config).context("Failed to open server store")?;
            info!("fserver call {}", request.action);
            let response = server.handle(request);
            println!("{}", response.render());
            Ok(response.is_ok())
        }
        Commands::Config { json } => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&config).context("Failed to encode config")?
                );
            } else {
                println!("data_dir:              {}", config.data_dir.display());
                println!("files_dir:             {}", config.files_dir.display());
                println!("url_base:              {}", config.url_base);
                println!("files_url_base:        {}", config.files_url_base);
                println!("request_timeout_hours: {}", config.request_timeout_hours);
            }
            Ok(true)
        }
    }
}
