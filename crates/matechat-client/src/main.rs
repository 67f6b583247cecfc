//! MateChat terminal client.
//!
//! - Connects to `ws://<server>/ws` (or the given ws:// URL)
//! - Terminal surface on stdout, logs on stderr (`RUST_LOG`)
//! - Exits non-zero when the connection is lost

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use matechat_client::config::{self, ClientConfig};
use matechat_client::engine::{server_url, Engine};
use matechat_client::runtime::{Exit, Runtime};
use matechat_client::surface::{read_terminal_input, TerminalSurface};

#[derive(Debug, Parser)]
#[command(name = "matechat", about = "Two-party chat client")]
struct Args {
    /// Server endpoint, `ip:port` or a full ws:// URL.
    #[arg(value_name = "ip:port")]
    server: String,

    /// Optional YAML config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cfg = match &args.config {
        Some(path) => match config::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => ClientConfig::default(),
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let code = rt.block_on(run(args.server, cfg));
    // A pending stdin read cannot be cancelled.
    rt.shutdown_background();
    code
}

async fn run(server: String, cfg: ClientConfig) -> ExitCode {
    let url = server_url(&server, &cfg.connection.path);
    let engine = match Engine::connect(&cfg, &url).await {
        Ok(engine) => engine,
        Err(e) => {
            println!("Failed to connect to server: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (events, input) = mpsc::channel(8);
    let runtime = Runtime::new(engine, TerminalSurface::stdout(), input);
    tokio::spawn(read_terminal_input(runtime.phase_watch(), events));

    match runtime.run().await {
        (Exit::Quit, _) => ExitCode::SUCCESS,
        (Exit::ConnectionLost(reason), _) => {
            tracing::info!(%reason, "session ended");
            ExitCode::FAILURE
        }
    }
}
