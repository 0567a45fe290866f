//! testroom-client - Remote Testroom Display Client
//!
//! Entry point for the client binary.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use testroom_client::client::GuacClientFactory;
use testroom_client::config::Config;
use testroom_client::session::{ControllerCommand, SessionController};
use testroom_client::surface::TracingSurface;
use testroom_client::timer::{CountdownTimer, ExpiryAction, ExpirySink};

/// Command-line arguments for testroom-client
#[derive(Parser, Debug)]
#[command(name = "testroom-client")]
#[command(version, about = "Remote Testroom Display Client", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Remote-display gateway base URL
    #[arg(short, long, env = "TESTROOM_SERVER")]
    pub server: Option<Url>,

    /// Auth token
    #[arg(short, long, env = "TESTROOM_TOKEN")]
    pub token: Option<String>,

    /// Base64-encoded connection identifier
    #[arg(short, long, env = "TESTROOM_IDENTIFIER")]
    pub identifier: Option<String>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Write logs to file (in addition to stdout)
    #[arg(long)]
    pub log_file: Option<String>,
}

/// Expiry sink for the headless binary: the side effect is reported, then
/// the session is shut down.
struct LoggingExpiry {
    commands: mpsc::Sender<ControllerCommand>,
}

impl ExpirySink for LoggingExpiry {
    fn submit_form(&self, form_name: &str) {
        info!("Session time expired: submitting form '{}'", form_name);
        let _ = self.commands.try_send(ControllerCommand::Shutdown);
    }

    fn redirect(&self, url: &str) {
        info!("Session time expired: redirecting to {}", url);
        let _ = self.commands.try_send(ControllerCommand::Shutdown);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    info!("testroom-client v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(&args.config)
        .map(|c| c.with_overrides(args.server.clone(), args.token.clone(), args.identifier.clone()))
        .or_else(|e| -> Result<Config> {
            warn!("Failed to load config: {}, falling back to CLI arguments", e);
            let (Some(server), Some(token), Some(identifier)) =
                (args.server.clone(), args.token.clone(), args.identifier.clone())
            else {
                anyhow::bail!(
                    "no config file and missing --server/--token/--identifier arguments"
                );
            };
            let config = Config {
                session: testroom_client::config::SessionConfig {
                    server_base_url: server,
                    auth_token: token,
                    encoded_identifier: identifier,
                    duration_minutes: 60,
                    instructions: None,
                },
                reconnect: Default::default(),
                display: Default::default(),
                input: Default::default(),
                timer: Default::default(),
                logging: Default::default(),
            };
            config.validate()?;
            Ok(config)
        })?;

    info!("Configuration loaded successfully");
    if let Some(instructions) = &config.session.instructions {
        info!("Instructions: {}", instructions);
    }

    // Input capture is a hosting-integration concern: wire an InputPump to
    // controller.client_handle() when a capture source exists. This binary
    // runs headless and sends no input.
    let surface = Arc::new(TracingSurface);
    let mut controller = SessionController::new(
        config.session.clone(),
        config.reconnect.clone(),
        config.display.clone(),
        Arc::new(GuacClientFactory),
        surface,
    );

    let (commands_tx, commands_rx) = mpsc::channel(8);

    // Countdown: expiry ends the session
    let timer = CountdownTimer::new(
        config.session.duration_minutes,
        ExpiryAction::from_config(&config.timer),
    );
    let (display_tx, mut display_rx) = watch::channel(String::new());
    let expiry = LoggingExpiry {
        commands: commands_tx.clone(),
    };
    tokio::spawn(async move { timer.run(display_tx, &expiry).await });
    tokio::spawn(async move {
        while display_rx.changed().await.is_ok() {
            info!("Time remaining: {}", *display_rx.borrow());
        }
    });

    // Teardown on interrupt, the unload analog
    let shutdown_tx = commands_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = shutdown_tx.send(ControllerCommand::Shutdown).await;
        }
    });

    info!("Initializing display session");
    if let Err(e) = controller.initialize().await {
        eprintln!("{}", testroom_client::utils::format_user_error(&e));
        return Err(e.into());
    }

    if let Err(e) = controller.run(commands_rx).await {
        eprintln!("{}", testroom_client::utils::format_user_error(&e));
        return Err(e.into());
    }

    info!("Session ended");
    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use std::fs::File;

    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "testroom_client={level},reqwest=info,warn",
            level = log_level
        ))
    });

    // If log file is specified, write to both stdout and file
    if let Some(log_file_path) = &args.log_file {
        let file = File::create(log_file_path)?;

        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stdout),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            "compact" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stdout),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stdout),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
        }
        info!("Logging to file: {}", log_file_path);
    } else {
        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().json())
                    .init();
            }
            "compact" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().compact())
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().pretty())
                    .init();
            }
        }
    }

    Ok(())
}
