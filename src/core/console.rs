//! The console engine.
//!
//! [`Console`] owns every registry, the change gate, the deferred queue and
//! the configuration overlay. It is passed explicitly wherever the engine is
//! used; in a Bevy app it lives as a resource inserted by
//! [`ConsolePlugin`](crate::ConsolePlugin).

use std::sync::Arc;
use std::time::Instant;

use bevy::log::debug;
use bevy::prelude::*;

use super::registry::is_valid_name;
use super::{
    builtins, BevyLogSink, ChangeGate, CommandRegistry, ConCommand, ConVar, ConVarChange,
    ConVarChangedEvent, ConVarFlags, ConVarHandle, ConVarRegistry, ConVarValue, CommandQueue,
    ConfigOverlay, ConsoleError, ConsoleOutputEvent, GateSettings, KeyBindings, LogLevel,
    LogSink, ScriptSource,
};

/// Runtime variable and command engine.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::{Console, ConVar, ConVarFlags};
///
/// let mut console = Console::new();
/// let shading = console
///     .register_var(ConVar::new("q_shading", 2).help("Shading quality"))
///     .unwrap();
///
/// console.execute_string("q_shading 3", true, false);
/// assert_eq!(console.get_int(shading), Some(3));
///
/// let fullscreen = console
///     .register_var(ConVar::new("r_fullscreen", 0).flags(ConVarFlags::READ_ONLY))
///     .unwrap();
/// assert!(console.set_int(fullscreen, 1).is_err());
/// ```
#[derive(Resource)]
pub struct Console {
    pub(super) vars: ConVarRegistry,
    pub(super) commands: CommandRegistry,
    pub(super) overlay: ConfigOverlay,
    pub(super) gate: ChangeGate,
    pub(super) queue: CommandQueue,
    pub(super) binds: KeyBindings,
    pub(super) log: Arc<dyn LogSink>,
    pub(super) scripts: Option<Box<dyn ScriptSource>>,
    pub(super) started: Instant,
    /// Nesting of template expansions currently being dispatched.
    pub(super) expansion_depth: u32,
    /// Nesting of interactive input currently being dispatched.
    pub(super) interactive: u32,
    /// Nesting of silent native commands currently running.
    pub(super) silent: u32,
    outputs: Vec<ConsoleOutputEvent>,
    changes: Vec<ConVarChangedEvent>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    /// Create a console logging through `bevy::log`, with the built-in commands registered.
    pub fn new() -> Self {
        Self::with_log_sink(BevyLogSink)
    }

    /// Create a console that sends its diagnostics to `sink`.
    pub fn with_log_sink(sink: impl LogSink + 'static) -> Self {
        let mut console = Self {
            vars: ConVarRegistry::new(),
            commands: CommandRegistry::new(),
            overlay: ConfigOverlay::new(),
            gate: ChangeGate::new(GateSettings::default()),
            queue: CommandQueue::new(),
            binds: KeyBindings::new(),
            log: Arc::new(sink),
            scripts: None,
            started: Instant::now(),
            expansion_depth: 0,
            interactive: 0,
            silent: 0,
            outputs: Vec::new(),
            changes: Vec::new(),
        };
        builtins::register(&mut console);
        console
    }

    /// Replace the gate settings, builder style.
    pub fn with_settings(mut self, settings: GateSettings) -> Self {
        *self.gate.settings_mut() = settings;
        self
    }

    /// Current gate settings.
    #[inline]
    pub fn settings(&self) -> &GateSettings {
        self.gate.settings()
    }

    /// Mutable gate settings.
    #[inline]
    pub fn settings_mut(&mut self) -> &mut GateSettings {
        self.gate.settings_mut()
    }

    /// The change gate, for adding or removing sinks.
    #[inline]
    pub fn gate_mut(&mut self) -> &mut ChangeGate {
        &mut self.gate
    }

    /// Set where `exec` reads scripts from.
    pub fn set_script_source(&mut self, source: impl ScriptSource + 'static) {
        self.scripts = Some(Box::new(source));
    }

    /// Send a diagnostic to the log sink.
    pub fn log(&self, level: LogLevel, message: &str) {
        self.log.log(level, message);
    }

    /// Send a diagnostic to the log sink, and to the output channel while
    /// interactive input is being dispatched.
    pub fn report(&mut self, level: LogLevel, message: &str) {
        self.log.log(level, message);
        if self.interactive > 0 {
            let line = match level.prefix() {
                "" => message.to_string(),
                prefix => format!("{} {}", prefix, message),
            };
            self.outputs.push(match level {
                LogLevel::Error => ConsoleOutputEvent::error(line),
                LogLevel::Warning => ConsoleOutputEvent::warn(line),
                LogLevel::Info => ConsoleOutputEvent::info(line),
            });
        }
    }

    /// Print a response line.
    ///
    /// Interactive responses go to the output channel; unattended ones are
    /// logged at info level.
    pub fn print(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.interactive > 0 {
            self.outputs.push(ConsoleOutputEvent::result(text));
        } else {
            self.log.log(LogLevel::Info, &text);
        }
    }

    /// Queue an output message unconditionally.
    pub fn output(&mut self, event: ConsoleOutputEvent) {
        self.outputs.push(event);
    }

    /// Take the output produced since the last call.
    pub fn drain_outputs(&mut self) -> Vec<ConsoleOutputEvent> {
        std::mem::take(&mut self.outputs)
    }

    /// Take the variable changes made since the last call.
    pub fn drain_changes(&mut self) -> Vec<ConVarChangedEvent> {
        std::mem::take(&mut self.changes)
    }

    // Registration

    /// Register a variable.
    ///
    /// A taken name logs an error and returns the handle of the variable
    /// already registered, which is left untouched. A value buffered by
    /// configuration ingestion is applied through the gated path and marks
    /// the variable `WAS_IN_CONFIG`; otherwise `MODIFIED` is cleared.
    pub fn register_var(&mut self, var: ConVar) -> Result<ConVarHandle, ConsoleError> {
        if !is_valid_name(var.name()) {
            self.log.log(
                LogLevel::Error,
                &format!("[CVARS]: [INVALID NAME] variable [{}] cannot be registered", var.name()),
            );
            return Err(ConsoleError::InvalidName(var.name().to_string()));
        }

        let name = var.name().to_string();
        let handle = match self.vars.insert(var) {
            Ok(handle) => handle,
            Err(existing) => {
                self.log.log(
                    LogLevel::Error,
                    &format!("[CVARS]: [DUPLICATE] variable [{}] is already registered", name),
                );
                return Ok(existing);
            }
        };

        match self.overlay.get(&name).cloned() {
            Some(entry) => {
                let saved = self.gate.swap_group_scope(entry.in_group_scope);
                // Rejections are logged by the gate
                let _ = self.set_from_text(handle, &entry.text);
                self.gate.restore_group_scope(saved);
                if let Some(var) = self.vars.get_mut(handle) {
                    var.insert_flags(ConVarFlags::WAS_IN_CONFIG);
                }
            }
            None => {
                if let Some(var) = self.vars.get_mut(handle) {
                    var.remove_flags(ConVarFlags::MODIFIED);
                }
            }
        }

        debug!(target: "cvars", "registered variable {}", name);
        Ok(handle)
    }

    /// Remove a variable. Its handle never resolves again.
    pub fn unregister_var(&mut self, name: &str) -> Option<ConVar> {
        let removed = self.vars.remove(name);
        if removed.is_none() {
            self.log.log(
                LogLevel::Warning,
                &format!("[CVARS]: [UNREGISTER] variable [{}] is not registered", name),
            );
        }
        removed
    }

    /// Register a command. A taken name logs an error and keeps the first command.
    pub fn register_command(&mut self, command: ConCommand) -> Result<(), ConsoleError> {
        if !is_valid_name(command.name()) {
            self.log.log(
                LogLevel::Error,
                &format!("[CVARS]: [INVALID NAME] console command [{}] cannot be registered", command.name()),
            );
            return Err(ConsoleError::InvalidName(command.name().to_string()));
        }

        match self.commands.insert(command) {
            Ok(()) => Ok(()),
            Err(rejected) => {
                self.log.log(
                    LogLevel::Error,
                    &format!("[CVARS]: [DUPLICATE] console command [{}] is already registered", rejected.name()),
                );
                Err(ConsoleError::DuplicateRegistration(rejected.name().to_string()))
            }
        }
    }

    /// Remove a command.
    pub fn unregister_command(&mut self, name: &str) -> Option<ConCommand> {
        self.commands.remove(name)
    }

    // Lookup

    /// Case-insensitive variable lookup.
    pub fn lookup(&self, name: &str) -> Option<ConVarHandle> {
        self.vars.lookup(name)
    }

    /// Get a variable by handle.
    pub fn var(&self, handle: ConVarHandle) -> Option<&ConVar> {
        self.vars.get(handle)
    }

    /// Get a variable by name.
    pub fn var_by_name(&self, name: &str) -> Option<&ConVar> {
        self.vars.get_by_name(name)
    }

    /// Get a command by name.
    pub fn command(&self, name: &str) -> Option<&ConCommand> {
        self.commands.get(name)
    }

    /// The variable registry.
    #[inline]
    pub fn vars(&self) -> &ConVarRegistry {
        &self.vars
    }

    /// The command registry.
    #[inline]
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// The key bindings.
    #[inline]
    pub fn binds(&self) -> &KeyBindings {
        &self.binds
    }

    /// Mutable key bindings.
    #[inline]
    pub fn binds_mut(&mut self) -> &mut KeyBindings {
        &mut self.binds
    }

    /// Values buffered for variables that are not registered yet.
    #[inline]
    pub fn overlay(&self) -> &ConfigOverlay {
        &self.overlay
    }

    /// Integer view of a variable.
    pub fn get_int(&self, handle: ConVarHandle) -> Option<i64> {
        self.vars.get(handle).map(ConVar::get_int)
    }

    /// Float view of a variable.
    pub fn get_float(&self, handle: ConVarHandle) -> Option<f32> {
        self.vars.get(handle).map(ConVar::get_float)
    }

    /// Text of a variable.
    pub fn get_string(&self, handle: ConVarHandle) -> Option<String> {
        self.vars.get(handle).map(ConVar::get_string)
    }

    /// Integer view of a variable, by name.
    pub fn get_int_by_name(&self, name: &str) -> Option<i64> {
        self.vars.get_by_name(name).map(ConVar::get_int)
    }

    /// Float view of a variable, by name.
    pub fn get_float_by_name(&self, name: &str) -> Option<f32> {
        self.vars.get_by_name(name).map(ConVar::get_float)
    }

    /// Text of a variable, by name.
    pub fn get_string_by_name(&self, name: &str) -> Option<String> {
        self.vars.get_by_name(name).map(ConVar::get_string)
    }

    // Mutation

    /// Set a variable, converting `value` to the variable's kind.
    ///
    /// Returns `Ok(false)` when the value did not change and nothing ran.
    pub fn set_value(
        &mut self,
        handle: ConVarHandle,
        value: impl Into<ConVarValue>,
    ) -> Result<bool, ConsoleError> {
        let var = self.vars.get(handle).ok_or_else(|| unknown_handle(handle))?;
        let value = value.into().convert(var.kind());
        self.store_value(handle, value)
    }

    /// Set a variable from text, using its parse rules.
    pub fn set_from_text(&mut self, handle: ConVarHandle, text: &str) -> Result<bool, ConsoleError> {
        let var = self.vars.get(handle).ok_or_else(|| unknown_handle(handle))?;
        let value = var.parse_text(text);
        self.store_value(handle, value)
    }

    /// Set a variable to an integer.
    pub fn set_int(&mut self, handle: ConVarHandle, value: i64) -> Result<bool, ConsoleError> {
        self.set_value(handle, value)
    }

    /// Set a variable to a float.
    pub fn set_float(&mut self, handle: ConVarHandle, value: f32) -> Result<bool, ConsoleError> {
        self.set_value(handle, value)
    }

    /// Set a variable from a string.
    pub fn set_string(&mut self, handle: ConVarHandle, value: &str) -> Result<bool, ConsoleError> {
        self.set_from_text(handle, value)
    }

    /// Set a variable to an integer, by name.
    pub fn set_int_by_name(&mut self, name: &str, value: i64) -> Result<bool, ConsoleError> {
        let handle = self.named(name)?;
        self.set_value(handle, value)
    }

    /// Set a variable from text, by name.
    pub fn set_text_by_name(&mut self, name: &str, text: &str) -> Result<bool, ConsoleError> {
        let handle = self.named(name)?;
        self.set_from_text(handle, text)
    }

    /// Append a change callback to a registered variable.
    pub fn add_on_change<F>(&mut self, handle: ConVarHandle, callback: F) -> bool
    where
        F: Fn(&mut Console, &ConVarChange) + Send + Sync + 'static,
    {
        match self.vars.get_mut(handle) {
            Some(var) => {
                var.push_callback(Arc::new(callback));
                true
            }
            None => false,
        }
    }

    /// Restore every `RESETTABLE` variable to its compiled default.
    ///
    /// Returns how many variables changed.
    pub fn reset_resettable(&mut self) -> usize {
        let targets: Vec<_> = self
            .vars
            .iter()
            .filter(|(_, var)| var.get_flags().contains(ConVarFlags::RESETTABLE))
            .map(|(handle, var)| (handle, var.default_value().clone()))
            .collect();

        targets
            .into_iter()
            .filter(|(handle, default)| matches!(self.store_value(*handle, default.clone()), Ok(true)))
            .count()
    }

    /// Names of visible variables and commands starting with `prefix`, sorted.
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .vars
            .prefix_iter(prefix)
            .filter(|(_, var)| !var.get_flags().contains(ConVarFlags::INVISIBLE))
            .map(|(_, var)| var.name().to_string())
            .chain(
                self.commands
                    .prefix_iter(prefix)
                    .filter(|command| !command.get_flags().contains(ConVarFlags::INVISIBLE))
                    .map(|command| command.name().to_string()),
            )
            .collect();
        names.sort_by_key(|name| name.to_ascii_lowercase());
        names.dedup();
        names
    }

    fn named(&self, name: &str) -> Result<ConVarHandle, ConsoleError> {
        self.vars
            .lookup(name)
            .ok_or_else(|| ConsoleError::UnknownVariable(name.to_string()))
    }

    /// The mutation protocol shared by every setter.
    fn store_value(&mut self, handle: ConVarHandle, value: ConVarValue) -> Result<bool, ConsoleError> {
        let var = self.vars.get(handle).ok_or_else(|| unknown_handle(handle))?;
        if *var.value() == value && !var.get_flags().contains(ConVarFlags::ALWAYS_ON_CHANGE) {
            return Ok(false);
        }

        let text = value.to_string();
        if !self.gate.before(var, &text, self.log.as_ref()) {
            return Err(ConsoleError::ProtectedMutationRejected {
                name: var.name().to_string(),
                value: text,
            });
        }

        let var = self.vars.get_mut(handle).ok_or_else(|| unknown_handle(handle))?;
        let old = var.value().clone();
        var.store(value);
        var.insert_flags(ConVarFlags::MODIFIED);

        // Callbacks may register more callbacks or set this variable again
        let callbacks = var.callbacks().to_vec();
        let change = ConVarChange {
            handle,
            name: var.name().into(),
            old,
            new: var.value().clone(),
        };
        for callback in &callbacks {
            callback(self, &change);
        }

        if let Some(var) = self.vars.get(handle) {
            self.gate.after(var);
        }
        self.changes.push(change.into());
        Ok(true)
    }
}

fn unknown_handle(handle: ConVarHandle) -> ConsoleError {
    ConsoleError::UnknownVariable(format!("{:?}", handle))
}
