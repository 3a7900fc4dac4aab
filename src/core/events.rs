//! Messages connecting the console engine to the rest of a Bevy app.
//!
//! - Front ends -> engine: typed input lines
//! - Engine -> front ends: echoed statements, responses and diagnostics
//! - Engine -> systems: variable changes

use bevy::prelude::*;

use super::{ConVarChange, ConVarHandle};

/// A line typed into a console front end.
///
/// Input lines are executed as interactive input: statements are echoed and
/// restricted mode applies.
///
/// # Examples
///
/// ```ignore
/// fn submit_command(mut input: MessageWriter<ConsoleInputEvent>) {
///     input.write(ConsoleInputEvent::new("q_shading 3"));
/// }
/// ```
#[derive(Message, Debug, Clone)]
pub struct ConsoleInputEvent {
    /// The line to execute.
    pub command: String,
}

impl ConsoleInputEvent {
    /// Create a new input event.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// A line for console front ends to display.
///
/// # Examples
///
/// ```ignore
/// fn show_output(mut output: MessageReader<ConsoleOutputEvent>) {
///     for line in output.read() {
///         println!("{}", line.message);
///     }
/// }
/// ```
#[derive(Message, Debug, Clone)]
pub struct ConsoleOutputEvent {
    /// The message text.
    pub message: String,
    /// The log level/type.
    pub level: ConsoleOutputLevel,
}

/// Log level for console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleOutputLevel {
    /// Debug information.
    Debug,
    /// General information.
    #[default]
    Info,
    /// A statement ran into something suspicious.
    Warn,
    /// A statement was refused or failed.
    Error,
    /// Echo of an executed statement.
    Command,
    /// Response of a command or variable.
    Result,
}

impl ConsoleOutputEvent {
    /// Create a new output event.
    pub fn new(level: ConsoleOutputLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }

    /// Create a debug message.
    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Debug, message)
    }

    /// Create an info message.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Info, message)
    }

    /// Create a warning message.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Warn, message)
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Error, message)
    }

    /// Create a command echo message.
    pub fn command(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Command, message)
    }

    /// Create a result message.
    pub fn result(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Result, message)
    }
}

/// A variable changed value.
///
/// Written once per accepted mutation, after its callbacks ran.
///
/// # Examples
///
/// ```ignore
/// fn on_shading_change(mut changes: MessageReader<ConVarChangedEvent>) {
///     for change in changes.read() {
///         if &*change.name == "q_shading" {
///             info!("Shading quality is now {}", change.new_value);
///         }
///     }
/// }
/// ```
#[derive(Message, Debug, Clone)]
pub struct ConVarChangedEvent {
    /// Handle of the changed variable; stale once it unregisters.
    pub handle: ConVarHandle,
    /// Variable name as registered.
    pub name: Box<str>,
    /// Printed value before the change.
    pub old_value: String,
    /// Printed value after the change.
    pub new_value: String,
}

impl From<ConVarChange> for ConVarChangedEvent {
    fn from(change: ConVarChange) -> Self {
        Self {
            handle: change.handle,
            old_value: change.old.to_string(),
            new_value: change.new.to_string(),
            name: change.name,
        }
    }
}

/// Plugin that registers the console messages.
pub struct ConsoleEventsPlugin;

impl Plugin for ConsoleEventsPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ConsoleInputEvent>()
            .add_message::<ConsoleOutputEvent>()
            .add_message::<ConVarChangedEvent>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConVarValue;

    #[test]
    fn test_console_input_event() {
        let event = ConsoleInputEvent::new("q_shading 3");
        assert_eq!(event.command, "q_shading 3");
    }

    #[test]
    fn test_console_output_event() {
        let event = ConsoleOutputEvent::command("$ wait_frames 2");
        assert_eq!(event.level, ConsoleOutputLevel::Command);
        assert_eq!(event.message, "$ wait_frames 2");
    }

    #[test]
    fn test_convar_changed_event_from_change() {
        let change = ConVarChange {
            handle: ConVarHandle::default(),
            name: "q_shading".into(),
            old: ConVarValue::Int(2),
            new: ConVarValue::Int(3),
        };

        let event = ConVarChangedEvent::from(change);
        assert_eq!(&*event.name, "q_shading");
        assert_eq!(event.old_value, "2");
        assert_eq!(event.new_value, "3");
    }
}
