//! coderun - multi-language code runner.
//!
//! Usage:
//!   coderun serve [--port 8000]                      # Start HTTP server
//!   coderun run --language java --entrypoint Main.java \
//!       [--jar lib.jar]... [--stdin-file in.txt] Main.java Util.java

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use coderun::config::ConfigArgs;
use coderun::http_server;
use coderun::state::AppState;
use coderun::submission::{OrderedMap, RunRequest, DEFAULT_TIMEOUT_SECS};
use std::path::{Path, PathBuf};
use std::process::exit;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "coderun")]
#[command(about = "Run code submissions locally or on a Judge0 instance")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value = "8000")]
        port: u16,
    },
    /// Execute one submission from files on disk and print the result
    Run {
        #[arg(long)]
        language: String,

        /// File holding the program's entry point
        #[arg(long)]
        entrypoint: String,

        /// JAR dependency, may be repeated
        #[arg(long = "jar")]
        jars: Vec<PathBuf>,

        /// File fed to the program's stdin
        #[arg(long)]
        stdin_file: Option<PathBuf>,

        /// Timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,

        /// Print the unprocessed backend response as well
        #[arg(long)]
        raw: bool,

        /// Source files, submitted under their file names
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match args.config.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(2);
        }
    };
    let state = AppState::from_config(&config);

    match args.command {
        Commands::Serve { port } => {
            if let Err(e) = http_server::run_server(port, state).await {
                eprintln!("Error: {}", e);
                exit(1);
            }
        }
        Commands::Run {
            language,
            entrypoint,
            jars,
            stdin_file,
            timeout,
            raw,
            files,
        } => {
            let request =
                match build_request(language, entrypoint, &files, &jars, stdin_file, timeout) {
                    Ok(request) => request,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        exit(1);
                    }
                };
            match state.dispatcher.run(request, raw).await {
                Ok(result) => {
                    match serde_json::to_string_pretty(&result) {
                        Ok(json) => println!("{}", json),
                        Err(e) => eprintln!("Error: {}", e),
                    }
                    exit(if result.success { 0 } else { 1 });
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    exit(1);
                }
            }
        }
    }
}

fn build_request(
    language: String,
    entrypoint: String,
    files: &[PathBuf],
    jars: &[PathBuf],
    stdin_file: Option<PathBuf>,
    timeout: u64,
) -> Result<RunRequest, String> {
    let files = files
        .iter()
        .map(|path| -> Result<(String, String), String> {
            let content = std::fs::read_to_string(path)
                .map_err(|e| format!("read {}: {}", path.display(), e))?;
            Ok((file_name(path)?, content))
        })
        .collect::<Result<Vec<_>, String>>()?;

    let jars = jars
        .iter()
        .map(|path| -> Result<(String, String), String> {
            let bytes = std::fs::read(path).map_err(|e| format!("read {}: {}", path.display(), e))?;
            Ok((file_name(path)?, STANDARD.encode(bytes)))
        })
        .collect::<Result<Vec<_>, String>>()?;

    let stdin = stdin_file
        .map(|path| {
            std::fs::read_to_string(&path).map_err(|e| format!("read {}: {}", path.display(), e))
        })
        .transpose()?;

    Ok(RunRequest {
        language,
        entrypoint,
        files: OrderedMap(files),
        jars: if jars.is_empty() { None } else { Some(OrderedMap(jars)) },
        stdin,
        timeout_seconds: Some(timeout),
    })
}

fn file_name(path: &Path) -> Result<String, String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| format!("{} has no usable file name", path.display()))
}
