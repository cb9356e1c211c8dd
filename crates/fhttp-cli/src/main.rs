//! `fhttp`: run one FlipperHTTP command from the shell.
//!
//! ```text
//! fhttp --port /dev/ttyACM0 ping
//! fhttp --tcp 192.168.4.1:2323 get https://catfact.ninja/fact
//! fhttp --config board.yaml save-wifi home hunter2
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fhttp_client::{ClientConfig, ClientError, FlipperHttp, Transport, TransportConfig, DEFAULT_BAUD_RATE};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "fhttp")]
#[command(about = "Send commands to a FlipperHTTP board")]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Serial port, overriding the configured transport
    #[arg(long, conflicts_with = "tcp")]
    port: Option<String>,

    /// Serial baud rate (with --port)
    #[arg(long, requires = "port")]
    baud: Option<u32>,

    /// `host:port` of a TCP bridge, overriding the configured transport
    #[arg(long)]
    tcp: Option<String>,

    /// More log output (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check that the board answers
    Ping,
    /// Print the board's command list
    List,
    /// Blink the LED while the board works
    LedOn,
    /// Keep the LED off while the board works
    LedOff,
    /// Restart the board
    Reboot,
    /// Connect to the saved network
    Connect,
    /// Disconnect from the current network
    Disconnect,
    /// Save network credentials
    SaveWifi { ssid: String, password: String },
    /// Scan for nearby networks
    Scan,
    /// Show the saved network settings
    SavedWifi,
    /// Show the board's local address
    Ip,
    /// Show the address assigned by the network
    WifiIp,
    /// HTTP GET
    Get {
        url: String,
        /// Headers as a JSON object
        #[arg(long, default_value = "")]
        headers: String,
        /// Ask for the body as raw bytes
        #[arg(long)]
        bytes: bool,
    },
    /// HTTP POST
    Post {
        url: String,
        #[arg(long, default_value = "")]
        headers: String,
        /// Request body as JSON
        #[arg(long, default_value = "")]
        payload: String,
        #[arg(long)]
        bytes: bool,
    },
    /// HTTP PUT
    Put {
        url: String,
        #[arg(long, default_value = "")]
        headers: String,
        #[arg(long, default_value = "")]
        payload: String,
    },
    /// HTTP DELETE
    Delete {
        url: String,
        #[arg(long, default_value = "")]
        headers: String,
        #[arg(long, default_value = "")]
        payload: String,
    },
    /// Extract a key from a JSON object on the board
    Parse { key: String, json: String },
    /// Extract a key from one element of a JSON array on the board
    ParseArray { key: String, index: u32, json: String },
    /// Send a raw command line and print the first reply
    Raw { command: String },
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_logging(verbose: u8) {
    let env_filter = match verbose {
        0 => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        1 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path).with_context(|| format!("reading {path}"))?,
        None => ClientConfig::default(),
    };

    if let Some(path) = &cli.port {
        config.transport = TransportConfig::Serial {
            path: path.clone(),
            baud_rate: cli.baud.unwrap_or(DEFAULT_BAUD_RATE),
        };
    } else if let Some(address) = &cli.tcp {
        config.transport = TransportConfig::Tcp {
            address: address.clone(),
        };
    }

    Ok(config)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// What a command produced, for printing and the exit status.
enum Outcome {
    Flag(bool),
    Text(String),
    Sent,
}

fn run<T: Transport>(board: &mut FlipperHttp<T>, command: Cmd) -> Result<Outcome> {
    let outcome = match command {
        Cmd::Ping => Outcome::Flag(board.ping()?),
        Cmd::List => Outcome::Text(board.list_commands()?),
        Cmd::LedOn => {
            board.led_on()?;
            Outcome::Sent
        }
        Cmd::LedOff => {
            board.led_off()?;
            Outcome::Sent
        }
        Cmd::Reboot => {
            board.reboot()?;
            Outcome::Sent
        }
        Cmd::Connect => Outcome::Flag(board.connect_wifi()?),
        Cmd::Disconnect => Outcome::Flag(board.disconnect_wifi()?),
        Cmd::SaveWifi { ssid, password } => Outcome::Flag(board.save_wifi(&ssid, &password)?),
        Cmd::Scan => Outcome::Text(board.scan_wifi()?),
        Cmd::SavedWifi => Outcome::Text(board.list_saved_wifi()?),
        Cmd::Ip => Outcome::Text(board.ip_address()?),
        Cmd::WifiIp => Outcome::Text(board.ip_wifi()?),
        Cmd::Get { url, headers, bytes } => Outcome::Text(if bytes {
            board.get_request_bytes(&url, &headers)?
        } else if headers.is_empty() {
            board.get_request(&url)?
        } else {
            board.get_request_with_headers(&url, &headers)?
        }),
        Cmd::Post {
            url,
            headers,
            payload,
            bytes,
        } => Outcome::Text(if bytes {
            board.post_request_bytes(&url, &headers, &payload)?
        } else {
            board.post_request_with_headers(&url, &headers, &payload)?
        }),
        Cmd::Put { url, headers, payload } => {
            Outcome::Text(board.put_request_with_headers(&url, &headers, &payload)?)
        }
        Cmd::Delete { url, headers, payload } => {
            Outcome::Text(board.delete_request_with_headers(&url, &headers, &payload)?)
        }
        Cmd::Parse { key, json } => Outcome::Text(board.parse_json(&key, &json)?),
        Cmd::ParseArray { key, index, json } => {
            Outcome::Text(board.parse_json_array(&key, index, &json)?)
        }
        Cmd::Raw { command } => Outcome::Text(board.send_raw(&command)?),
    };
    Ok(outcome)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    fhttp_metrics::describe_metrics();

    match try_main(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            let status = error_status(&e);
            if status == EXIT_RETRY {
                eprintln!("the link dropped; running the command again may work");
            }
            ExitCode::from(status)
        }
    }
}

/// Exit status for a link error that reopening the transport may clear.
const EXIT_RETRY: u8 = 3;

/// Exit status for any other error.
const EXIT_ERROR: u8 = 2;

fn error_status(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<ClientError>() {
        Some(client) if client.is_retryable() => EXIT_RETRY,
        _ => EXIT_ERROR,
    }
}

fn try_main(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    debug!("config: {:?}", config);

    let transport = config
        .open_transport()
        .with_context(|| format!("opening {:?}", config.transport))?;
    let mut board = FlipperHttp::new(transport, &config);

    let outcome = run(&mut board, cli.command)?;
    let failure = board.last_failure();
    let stats = board.stats().clone();
    board.close().context("closing link")?;

    debug!(
        "sent {} command(s), drained {} line(s)",
        stats.commands_sent, stats.lines_drained
    );

    let ok = match outcome {
        Outcome::Flag(ok) => {
            println!("{}", if ok { "ok" } else { "failed" });
            ok
        }
        Outcome::Text(text) => {
            if !text.is_empty() {
                println!("{text}");
            }
            failure.is_none()
        }
        Outcome::Sent => {
            info!("sent");
            true
        }
    };

    if let Some(failure) = failure {
        warn!("{}: {}", config.device_name, failure);
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_error_status() {
        let dropped = anyhow::Error::from(ClientError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "link closed by peer",
        )))
        .context("closing link");
        assert_eq!(error_status(&dropped), EXIT_RETRY);

        let missing = anyhow::Error::from(ClientError::Io(io::Error::from(io::ErrorKind::NotFound)));
        assert_eq!(error_status(&missing), EXIT_ERROR);

        let bad_config = anyhow::Error::from(ClientConfig::from_yaml_str("transport: [").unwrap_err());
        assert_eq!(error_status(&bad_config), EXIT_ERROR);

        assert_eq!(error_status(&anyhow::anyhow!("reading board.yaml")), EXIT_ERROR);
    }

    #[test]
    fn test_port_and_tcp_conflict() {
        assert!(Cli::try_parse_from(["fhttp", "--port", "/dev/ttyACM0", "--tcp", "h:1", "ping"]).is_err());
        let cli = Cli::try_parse_from(["fhttp", "--tcp", "127.0.0.1:2323", "ping"]).unwrap();
        assert!(matches!(cli.command, Cmd::Ping));
    }
}
