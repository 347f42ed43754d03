#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::path::PathBuf;

use clap::Parser;
use maelstrom::{Maelstrom, config};

/// Outbound mail gateway fronting several delivery providers
#[derive(Parser, Debug)]
#[command(name = "maelstrom")]
#[command(version)]
struct Args {
    /// Configuration file (RON)
    #[arg(short, long, env = "MAELSTROM_CONFIG")]
    config: Option<PathBuf>,

    /// Password callers must supply, overriding the configured one
    #[arg(long)]
    password: Option<String>,

    /// Port to listen on, keeping the configured host
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Log at DEBUG or finer
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut maelstrom = match config::find_config_file(args.config.as_deref())? {
        Some(path) => config::load(&path)?,
        None => {
            eprintln!("No configuration file found, using defaults");
            Maelstrom::default()
        }
    };

    if let Some(password) = args.password {
        maelstrom = maelstrom.with_password(password);
    }

    if let Some(port) = args.port {
        maelstrom = maelstrom.with_port(port);
    }

    maelstrom.with_debug(args.debug).run().await
}
