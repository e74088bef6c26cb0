//! Manager console
//!
//! Watches every worker conversation for unread messages and the live
//! activity feed, and chats in whichever conversation is open.
//!
//! Usage: manager-console <manager-id>
//!
//! Commands: /open <worker-id>, /close, /unread, /feed, /help, /quit.
//! Any other line is sent to the open conversation.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use workhub_dashboard::bin_common::{
    load_config_from_env, next_input_line, parse_args, parse_id_arg, stdin_lines, BinaryRunner,
    ConfigType, ConsoleCommand, ConsolePrinter, RunConfig,
};
use workhub_dashboard::workhub::{
    init_tracing, RestMessageStore, Role, SessionHandle, SessionIdentity, SyncSession,
    WorkhubConfig,
};

const HELP: &str = "/open <worker-id>  /close  /unread  /feed  /help  /quit";

struct ManagerConsole {
    run_config: RunConfig,
    session: Option<SessionHandle>,
    active: Option<i64>,
    sent: usize,
}

impl ManagerConsole {
    fn print_unread(&self, session: &SessionHandle) {
        let dashboard = session.dashboard();
        let state = dashboard.read();
        let counts = state.unread_counts();
        if counts.is_empty() {
            println!("[unread] nothing new");
            return;
        }
        for (worker, count) in counts {
            println!("[unread] worker {}: {}", worker, count);
        }
        println!("[unread] total {}", state.total_unread());
    }

    fn print_feed(&self, session: &SessionHandle) {
        let dashboard = session.dashboard();
        let state = dashboard.read();
        if state.activity_len() == 0 {
            println!("[feed] no activity yet");
            return;
        }
        for entry in state.activity() {
            let sender = entry
                .sender_id
                .map(|id| format!("#{}", id))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "[feed] {} {:<20} {:>6} {}",
                entry.received_at.format("%H:%M:%S"),
                entry.kind.as_str(),
                sender,
                entry.content
            );
        }
        println!("[feed] incidents reported: {}", state.incidents());
    }

    async fn say(&mut self, session: &SessionHandle, text: String) {
        if self.active.is_none() {
            println!("[not sent] open a conversation first: /open <worker-id>");
            return;
        }
        match session.send(text).await {
            Some(_) => self.sent += 1,
            None => println!("[not sent] no live connection, try again shortly"),
        }
    }
}

impl BinaryRunner for ManagerConsole {
    async fn run(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        println!("{}", HELP);

        let mut lines = stdin_lines();
        while let Some(line) = next_input_line(&mut lines).await {
            let Some(command) = ConsoleCommand::parse(&line) else {
                continue;
            };
            match command {
                ConsoleCommand::Open(worker) => {
                    self.active = Some(worker);
                    session.switch_conversation(Some(worker));
                    println!("--- worker {} ---", worker);
                }
                ConsoleCommand::Close => {
                    self.active = None;
                    session.switch_conversation(None);
                }
                ConsoleCommand::Unread => self.print_unread(&session),
                ConsoleCommand::Feed => self.print_feed(&session),
                ConsoleCommand::Help => println!("{}", HELP),
                ConsoleCommand::Quit => break,
                ConsoleCommand::Say(text) => self.say(&session, text).await,
                ConsoleCommand::Invalid(reason) => println!("[?] {}", reason),
            }
        }

        session.logout().await;
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn stats(&self) -> Option<String> {
        Some(format!("Messages sent: {}", self.sent))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let manager_id = parse_id_arg(&parse_args(), "manager-id")?;

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

    let identity = SessionIdentity::manager(manager_id);
    let session = SyncSession::start(
        identity,
        config.session_settings(),
        Arc::new(store),
        Arc::new(ConsolePrinter::new(Role::Manager)),
    );

    let mut app = ManagerConsole {
        run_config: RunConfig::new("Manager Console").with_identity(identity),
        session: Some(session),
        active: None,
        sent: 0,
    };
    app.execute().await
}
