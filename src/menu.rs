//! Host menus: user-invoked commands outside the overlay itself.
//!
//! A menu turns user input into [`MenuCommand`]s on a channel read by the
//! controller loop, so commands run on the same task as everything else.

use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    ToggleDisplay,
    Quit,
}

impl MenuCommand {
    /// Key bound to the command in the terminal overlay.
    pub fn key(self) -> char {
        match self {
            MenuCommand::ToggleDisplay => 't',
            MenuCommand::Quit => 'q',
        }
    }

    /// Word accepted on stdin in pipe mode.
    pub fn word(self) -> &'static str {
        match self {
            MenuCommand::ToggleDisplay => "toggle",
            MenuCommand::Quit => "quit",
        }
    }
}

pub trait HostMenu {
    fn register_command(&mut self, label: &str, command: MenuCommand);
}

type Bindings = Arc<Mutex<BTreeMap<char, (String, MenuCommand)>>>;

/// Terminal key bindings, read on a dedicated input thread.
pub struct KeyMenu {
    bindings: Bindings,
}

impl KeyMenu {
    /// Start forwarding bound key presses to `commands`.
    ///
    /// `Esc` and `Ctrl-C` always quit, since raw mode swallows the usual signal.
    pub fn spawn(commands: mpsc::Sender<MenuCommand>) -> Self {
        let bindings: Bindings = Arc::default();
        let thread_bindings = Arc::clone(&bindings);
        // A plain OS thread: crossterm's event reading is blocking.
        thread::spawn(move || {
            loop {
                match crossterm::event::poll(Duration::from_millis(100)) {
                    Ok(true) => match crossterm::event::read() {
                        Ok(event) => {
                            let Some(command) = command_for_event(&event, &thread_bindings) else {
                                continue;
                            };
                            if commands.blocking_send(command).is_err() {
                                break;
                            }
                        }
                        Err(_) => {
                            // ignore and continue polling
                        }
                    },
                    Ok(false) => {
                        if commands.is_closed() {
                            break;
                        }
                    }
                    Err(_) => thread::sleep(Duration::from_millis(100)),
                }
            }
        });
        Self { bindings }
    }

    /// One-line summary of the bindings, e.g. `t: Toggle time display · q: Quit`.
    pub fn hint(&self) -> String {
        let bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
        bindings
            .iter()
            .map(|(key, (label, _))| format!("{key}: {label}"))
            .collect::<Vec<_>>()
            .join(" · ")
    }
}

fn command_for_event(event: &Event, bindings: &Bindings) -> Option<MenuCommand> {
    let Event::Key(key) = event else {
        return None;
    };
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Esc => Some(MenuCommand::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(MenuCommand::Quit),
        KeyCode::Char(c) => {
            let bindings = bindings.lock().unwrap_or_else(|e| e.into_inner());
            bindings.get(&c.to_ascii_lowercase()).map(|(_, command)| *command)
        }
        _ => None,
    }
}

impl HostMenu for KeyMenu {
    fn register_command(&mut self, label: &str, command: MenuCommand) {
        let mut bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
        bindings.insert(command.key(), (label.to_string(), command));
        tracing::debug!(key = %command.key(), label, "Registered menu command");
    }
}

/// Commands typed on stdin, one per line (pipe mode).
pub struct StdinMenu {
    bindings: Arc<Mutex<Vec<(String, MenuCommand)>>>,
}

impl StdinMenu {
    pub fn spawn(commands: mpsc::Sender<MenuCommand>) -> Self {
        let bindings: Arc<Mutex<Vec<(String, MenuCommand)>>> = Arc::default();
        let task_bindings = Arc::clone(&bindings);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let command = {
                            let bindings = task_bindings.lock().unwrap_or_else(|e| e.into_inner());
                            parse_command_line(&line, &bindings)
                        };
                        match command {
                            Some(command) => {
                                if commands.send(command).await.is_err() {
                                    break;
                                }
                            }
                            None if !line.trim().is_empty() => {
                                tracing::warn!(input = %line.trim(), "Unknown command");
                            }
                            None => {}
                        }
                    }
                    // stdin closed: no further commands can arrive
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
        });
        Self { bindings }
    }
}

fn parse_command_line(line: &str, bindings: &[(String, MenuCommand)]) -> Option<MenuCommand> {
    let input = line.trim().to_lowercase();
    if input.is_empty() {
        return None;
    }
    bindings.iter().map(|(label, command)| (label, *command)).find_map(|(label, command)| {
        let matches = input == command.word()
            || input == command.key().to_string()
            || input == label.to_lowercase();
        matches.then_some(command)
    })
}

impl HostMenu for StdinMenu {
    fn register_command(&mut self, label: &str, command: MenuCommand) {
        let mut bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
        bindings.retain(|(_, existing)| *existing != command);
        bindings.push((label.to_string(), command));
    }
}
