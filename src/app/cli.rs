use std::future::Future;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::error::AppError;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Reusable CLI application runner that handles:
/// - Logging to stderr (stdout carries data)
/// - Signal handling (SIGINT, SIGTERM, SIGHUP)
/// - Stdout buffering and exit codes (0 = success, 1 = error, 130 = SIGINT, 143 = SIGTERM)
pub struct CliApp {
    name: String,
    log_filter: String,
}

impl CliApp {
    /// Create a new CLI application runner
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn with_log_filter(mut self, filter: &str) -> Self {
        self.log_filter = filter.to_string();
        self
    }

    /// Run the application with logging, signal handling and exit codes
    ///
    /// The main function receives a buffered stdout writer and must flush
    /// it before returning. This function never returns; it calls
    /// std::process::exit with the appropriate code.
    pub async fn run<F, Fut>(self, main_fn: F) -> !
    where
        F: FnOnce(tokio::io::BufWriter<tokio::io::Stdout>) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        self.init_tracing();
        info!(app = %self.name, "Starting");

        let writer = tokio::io::BufWriter::new(tokio::io::stdout());

        tokio::select! {
            result = main_fn(writer) => {
                match result {
                    Ok(()) => std::process::exit(0),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            signal_code = wait_for_signal() => {
                std::process::exit(signal_code);
            }
        }
    }

    fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_filter));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Wait for any Unix signal (SIGINT, SIGTERM, SIGHUP) or Ctrl+C
/// Returns the exit code to use (130 for SIGINT, 143 for SIGTERM, etc.)
async fn wait_for_signal() -> i32 {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let handlers = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::hangup()),
        );

        let (Ok(mut sigterm), Ok(mut sigint), Ok(mut sighup)) = handlers else {
            warn!("Failed to install signal handlers");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigterm.recv() => {
                eprintln!("Received SIGTERM");
                143 // 128 + 15
            }
            _ = sigint.recv() => {
                eprintln!("Received SIGINT");
                130 // 128 + 2
            }
            _ = sighup.recv() => {
                eprintln!("Received SIGHUP");
                129 // 128 + 1
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Failed to install Ctrl+C handler");
            return std::future::pending().await;
        }
        eprintln!("Received Ctrl+C");
        130
    }
}
