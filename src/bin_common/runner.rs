//! Binary runner utilities
//!
//! Provides a standardized way to run the console binaries with proper
//! logging, line input and graceful shutdown.

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// Who the session runs as, shown in the banner
    pub identity: Option<String>,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: None,
        }
    }

    pub fn with_identity(mut self, identity: impl ToString) -> Self {
        self.identity = Some(identity.to_string());
        self
    }
}

/// Trait for binary applications
pub trait BinaryRunner {
    /// Run the application main loop
    async fn run(&mut self) -> anyhow::Result<()>;

    /// Get the run configuration
    fn config(&self) -> &RunConfig;

    /// Summary line for the shutdown banner
    fn stats(&self) -> Option<String> {
        None
    }

    /// Print startup banner
    fn print_banner(&self) {
        let config = self.config();
        info!("");
        info!("========================================");
        info!("Starting {}", config.name);
        if let Some(identity) = &config.identity {
            info!("Session: {}", identity);
        }
        info!("Press Ctrl+C or Ctrl+D to stop");
        info!("========================================");
        info!("");
    }

    /// Print shutdown banner
    fn print_shutdown(&self, stats: Option<&str>) {
        let config = self.config();
        info!("");
        info!("========================================");
        info!("{} stopped gracefully", config.name);
        if let Some(stats) = stats {
            info!("{}", stats);
        }
        info!("========================================");
    }

    /// Execute the binary with proper initialization and cleanup
    async fn execute(&mut self) -> anyhow::Result<()> {
        self.print_banner();
        let result = self.run().await;
        let stats = self.stats();
        self.print_shutdown(stats.as_deref());
        result
    }
}

/// Stdin line reader for the console loops
pub fn stdin_lines() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

/// Next trimmed input line
///
/// `None` on end of input, a read error or Ctrl+C.
pub async fn next_input_line(lines: &mut Lines<BufReader<Stdin>>) -> Option<String> {
    tokio::select! {
        line = lines.next_line() => match line {
            Ok(Some(line)) => Some(line.trim().to_string()),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("[Console] stdin read failed: {}", e);
                None
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("[Console] Ctrl+C received");
            None
        }
    }
}
