//! A runtime variable and command console for Bevy.
//!
//! Inspired by the cvar systems of classic engines, bevy_cvar_console provides:
//!
//! - **ConVar**: Typed console variables with protection flags and change callbacks
//! - **ConCommand**: Native commands and text templates with `%1` style arguments
//! - **Variable groups**: Presets selected by an Int variable, with state inference
//! - **Deferred execution**: A command queue drained once per frame, with waits
//! - **Console**: The engine context, usable with or without an app
//!
//! # Features
//!
//! - `terminal`: stdin/stdout backend for dedicated servers
//! - `persist`: RON configuration files, file scripts for `exec`, `host_writeconfig`
//! - `full`: Enable persist
//!
//! # Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_cvar_console::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(ConsolePlugin::default().deferred(true))
//!         .add_systems(Startup, setup_console)
//!         .run();
//! }
//!
//! fn setup_console(mut console: ResMut<Console>) {
//!     // Register a variable
//!     let gravity = console
//!         .register_var(ConVar::new("sv_gravity", 800.0f32)
//!             .help("World gravity")
//!             .flags(ConVarFlags::CHEAT))
//!         .unwrap();
//!
//!     // Register a command
//!     console
//!         .register_command(ConCommand::new("noclip", |_args, console| {
//!             console.print("Noclip toggled!");
//!         }).help("Toggle noclip mode"))
//!         .unwrap();
//!
//!     // Get and set values
//!     let value = console.get_float(gravity);
//!     console.execute_string("sv_gravity 1000; wait_frames 1; noclip", false, false);
//! }
//! ```

use bevy::prelude::*;

pub mod core;

// Re-export core types at crate root for convenience
pub use crate::core::{
    CommandAction, CommandArgs, CommandHandler, ConCommand, ConVar, ConVarCallback,
    ConVarChange, ConVarChangedEvent, ConVarFlags, ConVarHandle, ConVarKind, ConVarValue,
    ConfigEntries, ConfigSink, ConfigSource, Console, ConsoleError, ConsoleEventsPlugin,
    ConsoleInputEvent, ConsoleOutputEvent, ConsoleOutputLevel, GateSettings, GroupLogMode,
    LogLevel, LogSink, MemoryLogSink, ScriptLibrary, ScriptSource,
};

// Terminal backend (feature-gated)
#[cfg(feature = "terminal")]
pub mod terminal;

// Persistence module (feature-gated)
#[cfg(feature = "persist")]
pub mod persist;

#[cfg(feature = "persist")]
pub use persist::{ConfigError, ConfigPath, ConsoleConfigFile, FileScriptSource};

#[cfg(feature = "terminal")]
pub use terminal::{TerminalConfig, TerminalPlugin};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::core::{
        split_commands, tokenize, CommandArgs, ConCommand, ConVar, ConVarChangedEvent,
        ConVarFlags, ConVarHandle, ConVarValue, ConfigEntries, Console, ConsoleInputEvent,
        ConsoleOutputEvent, ConsoleOutputLevel, GateSettings, LogLevel,
    };
    pub use crate::ConsolePlugin;
}

/// Main console plugin.
///
/// Inserts the [`Console`] resource, registers the console messages and runs
/// the per-frame pipeline: input lines are executed, the deferred queue is
/// drained, then output and change messages are written.
///
/// # Configuration
///
/// ```ignore
/// ConsolePlugin::default()
///     .dev_mode(cfg!(debug_assertions))
///     .deferred(true)
/// ```
#[derive(Debug, Clone)]
pub struct ConsolePlugin {
    /// Context switches for the change gate.
    pub settings: GateSettings,
    /// Queue every executed line until the next frame.
    pub deferred: bool,
    /// Config file loaded at startup and written by `host_writeconfig`.
    #[cfg(feature = "persist")]
    pub config_path: std::path::PathBuf,
    /// Directory `exec` reads scripts from.
    #[cfg(feature = "persist")]
    pub script_dir: std::path::PathBuf,
}

impl Default for ConsolePlugin {
    fn default() -> Self {
        Self {
            settings: GateSettings::default(),
            deferred: false,
            #[cfg(feature = "persist")]
            config_path: persist::DEFAULT_CONFIG_FILE.into(),
            #[cfg(feature = "persist")]
            script_dir: ".".into(),
        }
    }
}

impl ConsolePlugin {
    /// Allow protected changes, reporting them as warnings.
    pub fn dev_mode(mut self, enabled: bool) -> Self {
        self.settings.dev_mode = enabled;
        self
    }

    /// Allow protected changes silently.
    pub fn editor(mut self, enabled: bool) -> Self {
        self.settings.editor = enabled;
        self
    }

    /// Only let typed input reach entries flagged `RESTRICTED_MODE`.
    pub fn restricted(mut self, enabled: bool) -> Self {
        self.settings.restricted = enabled;
        self
    }

    /// Let group presets bypass protection checks.
    pub fn groups_privileged(mut self, enabled: bool) -> Self {
        self.settings.groups_privileged = enabled;
        self
    }

    /// Apply refused protected changes anyway (still logged).
    pub fn allow_const_modifications(mut self, enabled: bool) -> Self {
        self.settings.allow_const_modifications = enabled;
        self
    }

    /// Queue executed lines for the next frame instead of running them.
    pub fn deferred(mut self, enabled: bool) -> Self {
        self.deferred = enabled;
        self
    }

    /// Config file loaded at startup and written by `host_writeconfig`.
    #[cfg(feature = "persist")]
    pub fn config_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Directory `exec` reads scripts from.
    #[cfg(feature = "persist")]
    pub fn script_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.script_dir = dir.into();
        self
    }
}

impl Plugin for ConsolePlugin {
    fn build(&self, app: &mut App) {
        let mut console = Console::new().with_settings(self.settings);
        console.set_deferred(self.deferred);

        #[cfg(feature = "persist")]
        {
            console.set_script_source(persist::FileScriptSource::new(&self.script_dir));
            if let Err(e) = persist::register_commands(&mut console, &self.config_path) {
                warn!("Persistence commands not registered: {}", e);
            }
        }

        app.insert_resource(console)
            .add_plugins(crate::core::ConsoleEventsPlugin);

        // Frame pipeline:
        // 1. process_console_input: execute typed lines
        // 2. update_console: drain the deferred queue
        // 3. send_pending_outputs: write output and change messages
        app.add_systems(
            Update,
            (process_console_input, update_console, send_pending_outputs).chain(),
        );

        // Persistence (feature-gated)
        #[cfg(feature = "persist")]
        {
            app.insert_resource(persist::ConfigPath(self.config_path.clone()))
                .add_systems(Startup, persist::load_config_on_startup);
        }

        // Terminal backend (feature-gated)
        #[cfg(feature = "terminal")]
        {
            app.add_plugins(terminal::TerminalPlugin::default());
        }
    }
}

/// System that executes typed input lines.
fn process_console_input(
    mut console: ResMut<Console>,
    mut input_events: MessageReader<ConsoleInputEvent>,
) {
    for event in input_events.read() {
        let line = event.command.trim();
        if !line.is_empty() {
            console.execute_input(line);
        }
    }
}

/// System that drains the deferred queue once per frame.
fn update_console(mut console: ResMut<Console>, time: Option<Res<Time>>) {
    match time {
        Some(time) => console.update_at(time.elapsed()),
        None => console.update(),
    }
}

/// System that sends queued output and change messages.
fn send_pending_outputs(
    mut console: ResMut<Console>,
    mut output_events: MessageWriter<ConsoleOutputEvent>,
    mut change_events: MessageWriter<ConVarChangedEvent>,
) {
    for output in console.drain_outputs() {
        output_events.write(output);
    }
    for change in console.drain_changes() {
        change_events.write(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    /// Lines written as input messages at the start of the next frame.
    #[derive(Resource, Default)]
    struct PendingInput(Vec<String>);

    /// Everything the console wrote during the test.
    #[derive(Resource, Default)]
    struct Received {
        outputs: Vec<ConsoleOutputEvent>,
        changes: Vec<ConVarChangedEvent>,
    }

    fn write_input(mut pending: ResMut<PendingInput>, mut input: MessageWriter<ConsoleInputEvent>) {
        for line in pending.0.drain(..) {
            input.write(ConsoleInputEvent::new(line));
        }
    }

    fn collect_messages(
        mut received: ResMut<Received>,
        mut outputs: MessageReader<ConsoleOutputEvent>,
        mut changes: MessageReader<ConVarChangedEvent>,
    ) {
        received.outputs.extend(outputs.read().cloned());
        received.changes.extend(changes.read().cloned());
    }

    /// App with a console logging into `logs`.
    fn test_app(plugin: ConsolePlugin, logs: &MemoryLogSink) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);

        let mut console = Console::with_log_sink(logs.clone()).with_settings(plugin.settings);
        console.set_deferred(plugin.deferred);
        app.add_plugins(plugin);
        app.insert_resource(console);

        app.init_resource::<PendingInput>()
            .init_resource::<Received>()
            .add_systems(PreUpdate, write_input)
            .add_systems(PostUpdate, collect_messages);
        app
    }

    fn type_line(app: &mut App, line: &str) {
        app.world_mut()
            .resource_mut::<PendingInput>()
            .0
            .push(line.to_string());
    }

    fn console(app: &mut App) -> Mut<'_, Console> {
        app.world_mut().resource_mut::<Console>()
    }

    fn output_lines(app: &App) -> Vec<String> {
        app.world()
            .resource::<Received>()
            .outputs
            .iter()
            .map(|o| o.message.clone())
            .collect()
    }

    #[test]
    fn test_read_only_rejected_outside_dev() {
        let logs = MemoryLogSink::new();
        let mut app = test_app(ConsolePlugin::default(), &logs);
        app.update();

        let mut console = console(&mut app);
        let fullscreen = console
            .register_var(ConVar::new("r_fullscreen", 0).flags(ConVarFlags::READ_ONLY))
            .unwrap();

        assert!(console.set_from_text(fullscreen, "1").is_err());
        assert_eq!(console.get_int(fullscreen), Some(0));
        assert_eq!(logs.count(LogLevel::Error), 1);
    }

    #[test]
    fn test_input_sets_variable_and_fires_callback_once() {
        let logs = MemoryLogSink::new();
        let mut app = test_app(ConsolePlugin::default(), &logs);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let recorder = seen.clone();
        let shading = console(&mut app)
            .register_var(ConVar::new("q_shading", 2).on_change(move |_, change| {
                recorder.lock().push((change.old.as_int(), change.new.as_int()));
            }))
            .unwrap();

        type_line(&mut app, "q_shading 3");
        app.update();

        assert_eq!(console(&mut app).get_int(shading), Some(3));
        assert_eq!(*seen.lock(), vec![(2, 3)]);

        let received = app.world().resource::<Received>();
        assert_eq!(received.changes.len(), 1);
        assert_eq!(received.changes[0].old_value, "2");
        assert_eq!(received.changes[0].new_value, "3");
        assert!(output_lines(&app).contains(&"$ q_shading 3".to_string()));
    }

    #[test]
    fn test_group_real_state_follows_members() {
        let logs = MemoryLogSink::new();
        let mut app = test_app(ConsolePlugin::default(), &logs);
        let mut console = console(&mut app);

        let spec = ConfigEntries::new()
            .with_group("default", "q_shading", "0")
            .with_group("1", "q_shading", "1")
            .with_group("2", "q_shading", "2");
        let group = console
            .register_group("sys_spec", "Overall quality", ConVarFlags::empty(), &spec)
            .unwrap();
        let shading = console.register_var(ConVar::new("q_shading", 1)).unwrap();
        assert_eq!(console.group_real_state(group), 1);

        console.set_group_state(group, 1).unwrap();
        console.set_int(shading, 2).unwrap();

        assert_eq!(console.group_real_state(group), 2);
        assert_eq!(console.get_int(group), Some(1));
    }

    #[test]
    fn test_template_command_binds() {
        let logs = MemoryLogSink::new();
        let mut app = test_app(ConsolePlugin::default(), &logs);
        console(&mut app)
            .register_command(ConCommand::template("alias", "bind %1 %2"))
            .unwrap();

        type_line(&mut app, "alias w forward");
        app.update();

        assert_eq!(console(&mut app).binds().find("w"), Some("forward"));
        assert_eq!(output_lines(&app).first().map(String::as_str), Some("$ alias w forward"));
    }

    #[test]
    fn test_deferred_wait_frames() {
        let logs = MemoryLogSink::new();
        let mut app = test_app(ConsolePlugin::default().deferred(true), &logs);
        console(&mut app).execute_string("wait_frames 2; unknown_cmd", false, false);

        let ran = |logs: &MemoryLogSink| logs.contains(LogLevel::Warning, "Unknown command: unknown_cmd");

        app.update();
        assert!(!ran(&logs));
        app.update();
        assert!(!ran(&logs));
        app.update();
        assert!(ran(&logs));
        assert_eq!(logs.count(LogLevel::Warning), 1);
    }

    #[test]
    fn test_typed_input_runs_while_deferred() {
        let logs = MemoryLogSink::new();
        let mut app = test_app(ConsolePlugin::default().deferred(true), &logs);
        let fov = console(&mut app).register_var(ConVar::new("cl_fov", 90)).unwrap();

        type_line(&mut app, "cl_fov 100");
        console(&mut app).execute_string("cl_fov 110", false, false);
        app.update();

        // Typed input runs first, then the queue drains
        assert_eq!(console(&mut app).get_int(fov), Some(110));
        assert_eq!(app.world().resource::<Received>().changes.len(), 2);
    }

    #[test]
    fn test_same_value_set_is_idle() {
        let logs = MemoryLogSink::new();
        let mut app = test_app(ConsolePlugin::default(), &logs);
        let calls = Arc::new(Mutex::new(0));

        let counter = calls.clone();
        let fov = console(&mut app)
            .register_var(ConVar::new("cl_fov", 90).on_change(move |_, _| *counter.lock() += 1))
            .unwrap();

        type_line(&mut app, "cl_fov 90");
        app.update();

        let flags = console(&mut app).var(fov).unwrap().get_flags();
        assert_eq!(*calls.lock(), 0);
        assert!(!flags.contains(ConVarFlags::MODIFIED));
        assert!(app.world().resource::<Received>().changes.is_empty());
    }

    #[test]
    fn test_dev_mode_allows_protected_with_warning() {
        let logs = MemoryLogSink::new();
        let mut app = test_app(ConsolePlugin::default().dev_mode(true), &logs);

        type_line(&mut app, "sv_cheats_demo 1");
        console(&mut app)
            .register_var(ConVar::new("sv_cheats_demo", 0).flags(ConVarFlags::CHEAT))
            .unwrap();
        app.update();

        assert_eq!(console(&mut app).get_int_by_name("sv_cheats_demo"), Some(1));
        assert!(logs.count(LogLevel::Warning) >= 1);
        assert_eq!(logs.count(LogLevel::Error), 0);
    }

    #[test]
    fn test_restricted_input_only_reaches_flagged_entries() {
        let logs = MemoryLogSink::new();
        let mut app = test_app(ConsolePlugin::default().restricted(true), &logs);
        {
            let mut console = console(&mut app);
            console.register_var(ConVar::new("sv_secret", 0)).unwrap();
            console
                .register_var(ConVar::new("cl_volume", 5).flags(ConVarFlags::RESTRICTED_MODE))
                .unwrap();
        }

        type_line(&mut app, "sv_secret 1; cl_volume 7");
        app.update();

        let console = console(&mut app);
        assert_eq!(console.get_int_by_name("sv_secret"), Some(0));
        assert_eq!(console.get_int_by_name("cl_volume"), Some(7));
    }

    #[test]
    fn test_group_states_self_consistent() {
        let logs = MemoryLogSink::new();
        let mut app = test_app(ConsolePlugin::default(), &logs);
        let mut console = console(&mut app);
        console.register_var(ConVar::new("q_shading", 0)).unwrap();
        console.register_var(ConVar::new("r_fog", 1)).unwrap();

        let spec = ConfigEntries::new()
            .with_group("default", "q_shading", "0")
            .with_group("default", "r_fog", "1")
            .with_group("1", "q_shading", "1")
            .with_group("2", "q_shading", "2")
            .with_group("2", "r_fog", "0")
            .with_group("3", "q_shading", "3");
        let group = console
            .register_group("sys_spec", "Overall quality", ConVarFlags::empty(), &spec)
            .unwrap();

        for state in [2, 1, 3, 2] {
            console.set_group_state(group, state).unwrap();
            assert_eq!(console.group_real_state(group), state);
        }
    }

    #[test]
    fn test_silent_flag_does_not_change_results() {
        let run = |silent: bool| {
            let logs = MemoryLogSink::new();
            let mut console = Console::with_log_sink(logs);
            let fov = console.register_var(ConVar::new("cl_fov", 90)).unwrap();
            console
                .register_command(ConCommand::template("wide", "cl_fov %1"))
                .unwrap();
            console.execute_string("wide 120; cl_fov; missing 1; bind q quit", silent, false);
            (console.get_int(fov), console.binds().find("q").map(str::to_string))
        };

        assert_eq!(run(true), run(false));
        assert_eq!(run(true), (Some(120), Some("quit".to_string())));
    }

    #[test]
    fn test_help_output_reaches_messages() {
        let logs = MemoryLogSink::new();
        let mut app = test_app(ConsolePlugin::default(), &logs);

        type_line(&mut app, "wait_frames ?");
        app.update();

        let lines = output_lines(&app);
        assert!(lines.iter().any(|line| line.starts_with("    ")));
    }

    #[cfg(feature = "persist")]
    #[test]
    fn test_config_loaded_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.ron");
        std::fs::write(&path, r#"(cvars: { "cl_fov": "105" })"#).unwrap();

        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins(ConsolePlugin::default().config_path(&path))
            .add_systems(Startup, |mut console: ResMut<Console>| {
                console.register_var(ConVar::new("cl_fov", 90)).unwrap();
            });
        app.update();

        let console = app.world().resource::<Console>();
        assert_eq!(console.get_int_by_name("cl_fov"), Some(105));
        assert!(console.command("host_writeconfig").is_some());
    }
}
