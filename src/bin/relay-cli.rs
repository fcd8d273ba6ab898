use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use url::Url;

use login_relay::config::loader::load_config;
use login_relay::hop::{H2HopClient, HopClient, HopRequest, HopResult};
use login_relay::net::TlsDialer;
use login_relay::observability::logging;
use login_relay::resilience::HopDeadlines;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Diagnostics for the login relay", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Perform one HTTP/2 GET hop and print the result
    Hop {
        url: Url,

        /// Raw cookie string to forward (repeatable)
        #[arg(long = "cookie")]
        cookies: Vec<String>,

        #[arg(long, default_value_t = 15)]
        timeout_secs: u64,

        #[arg(long, default_value_t = 1024 * 1024)]
        max_body_bytes: usize,
    },
    /// Load and validate a config file
    CheckConfig { path: PathBuf },
}

#[derive(Serialize)]
struct HopReport {
    status: u16,
    location: Option<String>,
    set_cookie: Vec<String>,
    headers: Vec<(String, String)>,
    body: String,
}

impl From<HopResult> for HopReport {
    fn from(result: HopResult) -> Self {
        Self {
            status: result.status.as_u16(),
            headers: result
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body: String::from_utf8_lossy(&result.body).into_owned(),
            location: result.location,
            set_cookie: result.set_cookie,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Commands::Hop {
            url,
            cookies,
            timeout_secs,
            max_body_bytes,
        } => {
            let deadlines = HopDeadlines {
                hop: Duration::from_secs(timeout_secs),
                ..HopDeadlines::default()
            };
            let client = H2HopClient::new(TlsDialer::new(), deadlines, max_body_bytes);
            let result = client
                .execute(HopRequest::new(url).with_cookies(cookies))
                .await?;
            println!("{}", serde_json::to_string_pretty(&HopReport::from(result))?);
        }
        Commands::CheckConfig { path } => match load_config(&path) {
            Ok(config) => {
                println!("Config OK: {}", path.display());
                println!("{}", toml::to_string_pretty(&config)?);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
