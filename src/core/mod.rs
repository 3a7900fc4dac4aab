//! The console engine, usable with or without a Bevy app.
//!
//! This module provides the building blocks:
//! - [`Console`] - The engine context owning every registry
//! - [`ConVar`] - Typed console variables with flags and change callbacks
//! - [`ConCommand`] - Native and template console commands
//! - [`ChangeGate`] - Protection checks around every variable mutation
//! - [`CommandQueue`] - Deferred execution with frame and time waits
//! - Variable groups - Presets selected by an Int variable, with state inference
//! - Messages for communication with the rest of an app

mod binds;
mod bitfield;
mod builtins;
mod concommand;
mod console;
mod convar;
mod dispatch;
mod error;
mod events;
mod gate;
mod group;
mod log;
mod overlay;
mod queue;
mod registry;
mod script;
mod source;
mod substitute;
mod tokenizer;
mod trie;

pub use binds::KeyBindings;
pub use bitfield::{bit_letter, describe_bitfield, letter_bit, parse_bitfield};
pub use concommand::{CommandAction, CommandArgs, CommandHandler, CommandRegistry, ConCommand};
pub use console::Console;
pub use convar::{ConVar, ConVarCallback, ConVarChange, ConVarFlags, ConVarKind, ConVarValue};
pub use dispatch::MAX_EXPANSION_DEPTH;
pub use error::ConsoleError;
pub use events::{
    ConVarChangedEvent, ConsoleEventsPlugin, ConsoleInputEvent, ConsoleOutputEvent,
    ConsoleOutputLevel,
};
pub use gate::{ChangeGate, ConVarSink, GateSettings, GateVerdict, SinkId};
pub use group::{
    ConVarGroup, GroupLogMode, GroupReport, GroupSnapshot, MAX_GROUP_DEPTH, NO_MATCHING_STATE,
};
pub use log::{BevyLogSink, LogLevel, LogRecord, LogSink, MemoryLogSink};
pub use overlay::{ConfigOverlay, OverlayEntry};
pub use queue::{CommandQueue, QueuedCommand};
pub use registry::{is_valid_name, ConVarHandle, ConVarRegistry};
pub use script::{ScriptLibrary, ScriptSource};
pub use source::{ConfigEntries, ConfigEntry, ConfigSink, ConfigSource};
pub use substitute::expand_template;
pub use tokenizer::{split_commands, split_head, strip_value, tokenize, tokenize_string, TokenizedCommand};
pub use trie::{PrefixIter, Trie};
