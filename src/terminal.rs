//! Terminal backend for headless and dedicated-server consoles.
//!
//! A reader thread owns stdin and hands complete lines to the app over an
//! mpsc channel; a system drains the channel into [`ConsoleInputEvent`]s each
//! frame. Output messages are written to stdout.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use bevy::prelude::*;
use parking_lot::Mutex;

use crate::core::{ConVarChangedEvent, ConsoleInputEvent, ConsoleOutputEvent, ConsoleOutputLevel};

/// Plugin that feeds stdin lines to the console and prints its output.
#[derive(Default)]
pub struct TerminalPlugin {
    /// Settings inserted as the [`TerminalConfig`] resource.
    pub config: TerminalConfig,
}

impl Plugin for TerminalPlugin {
    fn build(&self, app: &mut App) {
        let (sender, receiver) = mpsc::channel();
        let _reader = spawn_stdin_reader(sender);

        app.insert_resource(StdinReceiver(Mutex::new(receiver)))
            .insert_resource(self.config.clone())
            .add_systems(PreUpdate, read_stdin)
            .add_systems(Last, (write_stdout, write_changes));
    }
}

/// Configuration for terminal behavior.
#[derive(Resource, Debug, Clone, Default)]
pub struct TerminalConfig {
    /// Color lines by level with ANSI escape codes.
    pub colored: bool,
    /// Also print a line for every variable change.
    pub show_changes: bool,
}

#[derive(Resource)]
struct StdinReceiver(Mutex<Receiver<String>>);

fn spawn_stdin_reader(sender: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();

        for line in stdin.lock().lines().map_while(Result::ok) {
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if sender.send(text.to_string()).is_err() {
                break;
            }
        }
    })
}

fn read_stdin(receiver: Res<StdinReceiver>, mut input: MessageWriter<ConsoleInputEvent>) {
    let rx = receiver.0.lock();
    loop {
        match rx.try_recv() {
            Ok(line) => {
                input.write(ConsoleInputEvent::new(line));
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                debug!(target: "cvars", "stdin closed");
                break;
            }
        }
    }
}

fn write_stdout(mut output: MessageReader<ConsoleOutputEvent>, config: Res<TerminalConfig>) {
    let mut stdout = io::stdout().lock();
    for event in output.read() {
        let _ = match config.colored {
            true => writeln!(stdout, "{}{}\x1b[0m", level_color(event.level), event.message),
            false => writeln!(stdout, "{}", event.message),
        };
    }
    let _ = stdout.flush();
}

fn write_changes(mut changes: MessageReader<ConVarChangedEvent>, config: Res<TerminalConfig>) {
    if !config.show_changes {
        return;
    }

    let mut stdout = io::stdout().lock();
    for change in changes.read() {
        let _ = writeln!(
            stdout,
            "{}: {} -> {}",
            change.name, change.old_value, change.new_value
        );
    }
    let _ = stdout.flush();
}

fn level_color(level: ConsoleOutputLevel) -> &'static str {
    match level {
        ConsoleOutputLevel::Debug => "\x1b[90m",
        ConsoleOutputLevel::Info => "\x1b[0m",
        ConsoleOutputLevel::Warn => "\x1b[33m",
        ConsoleOutputLevel::Error => "\x1b[31m",
        ConsoleOutputLevel::Command => "\x1b[36m",
        ConsoleOutputLevel::Result => "\x1b[32m",
    }
}
