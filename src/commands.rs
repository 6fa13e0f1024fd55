use anyhow::{Context, Result, bail};
use std::io::{self, Write};
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::FAILURE_NOTICE;
use crate::events::SessionEvent;
use crate::llm::LlmClient;
use crate::session::SessionHandle;
use crate::tui::{self, AppEvent, EventHandler, Tui};
use crate::ui::conversation::{ConversationAction, ConversationManager, QuickAction};

/// Launch the interactive chat screen
pub async fn chat(config: Config) -> Result<()> {
    let client = LlmClient::from_config(&config)?;
    let (session, mut session_events) = SessionHandle::spawn(client);
    let mut manager = ConversationManager::new(session, config.ui.show_quick_actions);

    tui::install_panic_hook();
    let mut terminal = tui::init().context("Failed to initialise terminal")?;
    let mut events = EventHandler::new(Duration::from_millis(config.ui.tick_millis.max(1)));

    let result = run(&mut terminal, &mut manager, &mut events, &mut session_events).await;
    tui::restore()?;
    result
}

async fn run(
    terminal: &mut Tui,
    manager: &mut ConversationManager,
    events: &mut EventHandler,
    session_events: &mut mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| manager.render(frame))?;

        tokio::select! {
            Some(event) = events.next() => match event {
                AppEvent::Key(key) => {
                    if manager.handle_key(key) == ConversationAction::Exit {
                        break;
                    }
                }
                AppEvent::Resize(..) => {}
                AppEvent::Tick => manager.on_tick(),
            },
            Some(event) = session_events.recv() => manager.handle_session_event(event),
            else => break,
        }
    }
    Ok(())
}

/// Send one message and print the reply as it streams in
pub async fn ask(config: Config, text: &str) -> Result<()> {
    let mut stdout = io::stdout();
    ask_to(&config, text, &mut stdout).await
}

/// Like [`ask`], writing the reply to `out`. Ctrl+C aborts the reply.
pub async fn ask_to<W: Write>(config: &Config, text: &str, out: &mut W) -> Result<()> {
    let client = LlmClient::from_config(config)?;
    let (session, mut events) = SessionHandle::spawn(client);
    session.send(text)?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Delta(delta)) => {
                    write!(out, "{delta}")?;
                    out.flush()?;
                }
                Some(SessionEvent::Completed) => {
                    writeln!(out)?;
                    return Ok(());
                }
                Some(SessionEvent::Failed(err)) => {
                    writeln!(out)?;
                    return Err(anyhow::Error::new(err).context(FAILURE_NOTICE));
                }
                Some(SessionEvent::Cancelled) => {
                    writeln!(out)?;
                    eprintln!("Reply stopped.");
                    return Ok(());
                }
                Some(_) => {}
                None => bail!("Session worker stopped unexpectedly"),
            },
            _ = tokio::signal::ctrl_c() => session.cancel(),
        }
    }
}

/// Print the quick-action shortcuts
pub fn list_actions() {
    println!("Quick actions (press the key in the chat screen):");
    println!();
    for action in QuickAction::iter() {
        println!("  F{}  {}", action.key_number(), action.label());
        println!("      {}", action.query());
    }
}

/// Print the resolved configuration, optionally writing a default file
pub fn show_config(config: &Config, init: bool) -> Result<()> {
    let path = config.config_path();
    if init {
        if path.exists() {
            println!("Config file already exists: {}", path.display());
        } else {
            config.save()?;
            println!("Wrote default config to {}", path.display());
        }
        println!();
    }

    println!("Config file:      {}", path.display());
    println!(
        "Endpoint:         {}",
        config.endpoint_url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "API key:          {}",
        config.masked_api_key().unwrap_or_else(|| "(not set)".to_string())
    );
    println!("Connect timeout:  {}s", config.connect_timeout_secs);
    println!("Quick actions:    {}", config.ui.show_quick_actions);
    println!("Tick interval:    {}ms", config.ui.tick_millis);
    println!("Log file:         {}", config.log_path().display());
    Ok(())
}
