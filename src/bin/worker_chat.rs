//! Worker chat console
//!
//! Joins the worker's own conversation, prints it as it changes and sends
//! every typed line.
//!
//! Usage: worker-chat <worker-id>

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use workhub_dashboard::bin_common::{
    load_config_from_env, next_input_line, parse_args, parse_id_arg, stdin_lines, BinaryRunner,
    ConfigType, ConsolePrinter, RunConfig,
};
use workhub_dashboard::workhub::{
    init_tracing, RestMessageStore, Role, SessionHandle, SessionIdentity, SyncSession,
    WorkhubConfig,
};

struct WorkerChat {
    run_config: RunConfig,
    session: Option<SessionHandle>,
    sent: usize,
    refused: usize,
}

impl BinaryRunner for WorkerChat {
    async fn run(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        let mut lines = stdin_lines();
        while let Some(line) = next_input_line(&mut lines).await {
            if line.is_empty() {
                continue;
            }
            match session.send(line).await {
                Some(_) => self.sent += 1,
                None => {
                    self.refused += 1;
                    println!("[not sent] no live connection, try again shortly");
                }
            }
        }

        session.logout().await;
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn stats(&self) -> Option<String> {
        Some(format!(
            "Messages sent: {}, refused: {}",
            self.sent, self.refused
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let worker_id = parse_id_arg(&parse_args(), "worker-id")?;

    let config_path = load_config_from_env(ConfigType::Workhub);
    let config = WorkhubConfig::load_or_default(&config_path)?;
    init_tracing(&config.log_level);
    config.log();

    let token = config.require_token()?.to_string();
    let store = RestMessageStore::new(
        config.api.base_url.clone(),
        Some(token),
        Duration::from_secs(config.api.timeout_secs),
    )?;

    let identity = SessionIdentity::worker(worker_id);
    let session = SyncSession::start(
        identity,
        config.session_settings(),
        Arc::new(store),
        Arc::new(ConsolePrinter::new(Role::Worker)),
    );

    let mut app = WorkerChat {
        run_config: RunConfig::new("Worker Chat").with_identity(identity),
        session: Some(session),
        sent: 0,
        refused: 0,
    };
    app.execute().await
}
