//! Statement dispatch.
//!
//! A line is split into statements; each statement resolves its head against
//! the command registry first and the variable registry second.

use std::panic::{catch_unwind, AssertUnwindSafe};

use bevy::log::debug;

use super::bitfield::describe_bitfield;
use super::group::NO_MATCHING_STATE;
use super::tokenizer::{split_commands, split_head, strip_value, tokenize_string};
use super::{
    expand_template, CommandAction, CommandArgs, ConCommand, ConVarFlags, ConVarHandle,
    ConVarKind, Console, ConsoleError, ConsoleOutputEvent, LogLevel,
};

/// Nesting limit for template commands expanding into other templates.
pub const MAX_EXPANSION_DEPTH: u32 = 32;

impl Console {
    /// Execute a line of statements.
    ///
    /// The line runs immediately unless deferred mode is on or `defer` is
    /// set, in which case each statement is queued for [`Console::update`].
    /// A deferred line starting with `exec` runs right away with deferred
    /// mode forced on, so the script it reads is queued in order.
    pub fn execute_string(&mut self, line: &str, silent: bool, defer: bool) {
        if !self.queue.is_deferred() && !defer {
            self.dispatch_line(line, false, silent);
            return;
        }

        let is_exec = tokenize_string(line.trim_start())
            .first()
            .is_some_and(|head| head.eq_ignore_ascii_case("exec"));
        if is_exec {
            let previous = self.queue.set_deferred(true);
            self.dispatch_line(line, false, silent);
            self.queue.set_deferred(previous);
            return;
        }

        for statement in split_commands(line) {
            self.queue.push(statement, silent);
        }
    }

    /// Execute a line typed by a user.
    ///
    /// Statements are echoed, responses go to the output channel and
    /// restricted mode applies.
    pub fn execute_input(&mut self, line: &str) {
        self.interactive += 1;
        self.dispatch_line(line, true, false);
        self.interactive -= 1;
    }

    pub(crate) fn dispatch_line(&mut self, line: &str, from_console: bool, silent: bool) {
        for statement in split_commands(line) {
            self.dispatch_statement(statement, from_console, silent);
        }
    }

    fn dispatch_statement(&mut self, statement: &str, from_console: bool, silent: bool) {
        let restricted = from_console && self.gate.settings().restricted;

        if statement.starts_with(['#', '@']) {
            if !restricted {
                self.print(statement);
            }
            return;
        }

        if from_console && !silent {
            self.output(ConsoleOutputEvent::command(format!("$ {}", statement)));
        }

        let (head, rest) = split_head(statement);
        if let Some(needle) = head.strip_prefix('?').filter(|needle| !needle.is_empty()) {
            self.find_vars(needle);
            return;
        }

        if let Some(command) = self.commands.get(head) {
            if !restricted || command.get_flags().contains(ConVarFlags::RESTRICTED_MODE) {
                let command = command.clone();
                if command.get_flags().contains(ConVarFlags::BLOCK_FRAME) {
                    self.queue.bump_block_counter();
                }
                self.run_command(&command, statement, from_console, silent);
                return;
            }
        }

        if let Some(handle) = self.vars.lookup(head) {
            let flags = self.vars.get(handle).map(|var| var.get_flags()).unwrap_or_default();
            if !restricted || flags.contains(ConVarFlags::RESTRICTED_MODE) {
                if flags.contains(ConVarFlags::BLOCK_FRAME) {
                    self.queue.bump_block_counter();
                }
                self.assign_var(handle, head, rest, silent);
                return;
            }
        }

        if !silent {
            let err = ConsoleError::UnknownCommand(head.to_string());
            self.report(LogLevel::Warning, &err.to_string());
        }
    }

    fn assign_var(&mut self, handle: ConVarHandle, head: &str, rest: Option<&str>, silent: bool) {
        if let Some(rest) = rest {
            let value = strip_value(rest);
            if value == "?" {
                let help = self.vars.get(handle).map(|var| var.get_help().to_string());
                self.print_help(head, help.as_deref().unwrap_or_default());
                return;
            }

            let is_string = self.vars.get(handle).is_some_and(|var| var.kind() == ConVarKind::String);
            if !value.is_empty() || is_string {
                // Rejections are logged by the gate
                let _ = self.set_from_text(handle, value);
            }
        }

        if !silent {
            if let Some(line) = self.describe_var(handle) {
                self.print(line);
            }
        }
    }

    fn run_command(&mut self, command: &ConCommand, statement: &str, from_console: bool, silent: bool) {
        debug!(target: "cvars", "executing console command '{}'", statement);

        let tokens = tokenize_string(statement);
        if tokens.get(1) == Some(&"?") {
            self.print_help(command.name(), command.get_help());
            return;
        }

        let settings = *self.gate.settings();
        if command.get_flags().intersects(ConVarFlags::ANY_CHEAT) && !settings.editor {
            self.log.log(
                LogLevel::Error,
                &format!("[CVARS]: [EXECUTE] command {} is marked [VF_CHEAT]", command.name()),
            );
            if !settings.dev_mode {
                return;
            }
        }

        match command.action() {
            CommandAction::Native(handler) => {
                let args = CommandArgs::new(statement, tokens);
                if silent {
                    self.silent += 1;
                }
                let result = catch_unwind(AssertUnwindSafe(|| handler(&args, self)));
                if silent {
                    self.silent -= 1;
                }

                if let Err(panic_info) = result {
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    self.report(
                        LogLevel::Error,
                        &format!("Command '{}' panicked: {}", command.name(), panic_msg),
                    );
                }
            }
            CommandAction::Template(template) => {
                let expanded = match expand_template(template, &tokens, statement) {
                    Ok(expanded) => expanded,
                    Err(err) => {
                        self.report(LogLevel::Warning, &err.to_string());
                        return;
                    }
                };

                if self.expansion_depth >= MAX_EXPANSION_DEPTH {
                    self.report(
                        LogLevel::Warning,
                        &format!("Command '{}' expands too deeply, statement dropped", command.name()),
                    );
                    return;
                }
                self.expansion_depth += 1;
                self.dispatch_line(&expanded, from_console, silent);
                self.expansion_depth -= 1;
            }
        }
    }

    /// Print every visible variable whose name contains `needle`.
    fn find_vars(&mut self, needle: &str) {
        let handles: Vec<_> = self
            .vars
            .search(needle)
            .into_iter()
            .filter_map(|var| self.vars.lookup(var.name()))
            .collect();
        for handle in handles {
            if let Some(line) = self.describe_var(handle) {
                self.print(line);
            }
        }
    }

    /// Print a help text line by line, or a note that there is none.
    pub(crate) fn print_help(&mut self, name: &str, help: &str) {
        if help.is_empty() {
            self.print(format!("No help available for {}", name));
            return;
        }
        for line in help.lines() {
            self.print(format!("    {}", line));
        }
    }

    /// Render a variable as `name = value [flags]`.
    ///
    /// Invisible variables show no value. Bitfields append their letter form;
    /// groups whose live values disagree with the stored state append the
    /// inferred state.
    pub fn describe_var(&self, handle: ConVarHandle) -> Option<String> {
        let var = self.vars.get(handle)?;
        let flags = var.get_flags();

        let mut value = if flags.contains(ConVarFlags::INVISIBLE) {
            String::new()
        } else {
            var.get_string()
        };

        if flags.contains(ConVarFlags::BITFIELD) && !flags.contains(ConVarFlags::INVISIBLE) {
            let bits = var.get_int();
            let letters = describe_bitfield(bits & !63);
            if !letters.is_empty() {
                match bits & 63 {
                    0 => value.push_str(&format!(" ({})", letters)),
                    low => value.push_str(&format!(" ({}, {})", low, letters)),
                }
            }
        }

        let mut real_state = String::new();
        if var.is_group() {
            match self.group_real_state(handle) {
                state if state == var.get_int() => {}
                NO_MATCHING_STATE => real_state.push_str(" RealState=Custom"),
                state => real_state.push_str(&format!(" RealState={}", state)),
            }
        }

        Some(format!("{} = {} [{}]{}", var.name(), value, flags.describe(), real_state))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::core::{ConVar, ConfigEntries, ConsoleOutputLevel, GateSettings, MemoryLogSink};

    fn counting(name: &str, flags: ConVarFlags) -> (ConCommand, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let command = ConCommand::new(name, move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .flags(flags);
        (command, calls)
    }

    #[test]
    fn test_set_forms() {
        let mut console = Console::new();
        let width = console.register_var(ConVar::new("r_width", 800)).unwrap();

        for (line, expected) in [
            ("r_width 1024", 1024),
            ("r_width=1280", 1280),
            ("r_width = 1600", 1600),
            ("R_WIDTH \"1920\"", 1920),
        ] {
            console.execute_string(line, true, false);
            assert_eq!(console.get_int(width), Some(expected), "{}", line);
        }
    }

    #[test]
    fn test_empty_value_only_sets_strings() {
        let mut console = Console::new();
        let width = console.register_var(ConVar::new("r_width", 800)).unwrap();
        let name = console.register_var(ConVar::new("name", "player")).unwrap();

        console.execute_string("r_width \"\"", true, false);
        console.execute_string("name \"\"", true, false);

        assert_eq!(console.get_int(width), Some(800));
        assert_eq!(console.get_string(name).as_deref(), Some(""));
    }

    #[test]
    fn test_unknown_command_warns_unless_silent() {
        let logs = MemoryLogSink::new();
        let mut console = Console::with_log_sink(logs.clone());

        console.execute_string("nope", true, false);
        assert_eq!(logs.count(LogLevel::Warning), 0);

        console.execute_string("nope", false, false);
        assert!(logs.contains(LogLevel::Warning, "Unknown command: nope"));
    }

    #[test]
    fn test_silent_template_stays_silent() {
        let logs = MemoryLogSink::new();
        let mut console = Console::with_log_sink(logs.clone());
        let fov = console.register_var(ConVar::new("cl_fov", 90)).unwrap();
        console
            .register_command(ConCommand::template("wide", "cl_fov %1; nope"))
            .unwrap();

        console.execute_string("wide 120", true, false);
        assert_eq!(console.get_int(fov), Some(120));
        assert!(logs.records().is_empty(), "{:?}", logs.records());

        console.execute_string("wide 100", false, false);
        assert!(logs.contains(LogLevel::Info, "cl_fov = 100"));
        assert!(logs.contains(LogLevel::Warning, "Unknown command: nope"));
    }

    #[test]
    fn test_silent_mode_does_not_change_outcome() {
        let mut loud = Console::new();
        let mut quiet = Console::new();
        for console in [&mut loud, &mut quiet] {
            console.register_var(ConVar::new("a", 1)).unwrap();
            console.register_var(ConVar::new("b", "x")).unwrap();
        }

        let line = "a 5; b hello; missing 3; a=7";
        loud.execute_string(line, false, false);
        quiet.execute_string(line, true, false);

        assert_eq!(loud.get_int_by_name("a"), quiet.get_int_by_name("a"));
        assert_eq!(loud.get_string_by_name("b"), quiet.get_string_by_name("b"));
    }

    #[test]
    fn test_interactive_echo_and_value() {
        let mut console = Console::new();
        console
            .register_var(ConVar::new("r_mode", 3).flags(ConVarFlags::READ_ONLY))
            .unwrap();

        console.execute_input("r_mode");
        let outputs = console.drain_outputs();
        assert_eq!(outputs[0].level, ConsoleOutputLevel::Command);
        assert_eq!(outputs[0].message, "$ r_mode");
        assert_eq!(outputs[1].message, "r_mode = 3 [READONLY]");
    }

    #[test]
    fn test_unattended_output_goes_to_log() {
        let logs = MemoryLogSink::new();
        let mut console = Console::with_log_sink(logs.clone());
        console.register_var(ConVar::new("r_mode", 3)).unwrap();

        console.execute_string("r_mode", false, false);
        assert!(console.drain_outputs().is_empty());
        assert!(logs.contains(LogLevel::Info, "r_mode = 3 []"));
    }

    #[test]
    fn test_variable_help_aborts_statement() {
        let mut console = Console::new();
        let handle = console
            .register_var(ConVar::new("r_fog", 1).help("Fog\nSecond line"))
            .unwrap();

        console.execute_input("r_fog ?");
        assert_eq!(console.get_int(handle), Some(1));

        let messages: Vec<_> = console.drain_outputs().into_iter().map(|o| o.message).collect();
        assert_eq!(messages, vec!["$ r_fog ?", "    Fog", "    Second line"]);
    }

    #[test]
    fn test_command_help() {
        let mut console = Console::new();
        let (command, calls) = counting("noclip", ConVarFlags::empty());
        console.register_command(command).unwrap();

        console.execute_input("noclip ?");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let outputs = console.drain_outputs();
        assert_eq!(outputs[1].message, "No help available for noclip");
    }

    #[test]
    fn test_find_lists_matches() {
        let mut console = Console::new();
        console.register_var(ConVar::new("r_width", 800)).unwrap();
        console.register_var(ConVar::new("r_height", 600)).unwrap();
        console.register_var(ConVar::new("sv_gravity", 800)).unwrap();

        console.execute_input("?R_");
        let messages: Vec<_> = console.drain_outputs().into_iter().map(|o| o.message).collect();
        assert_eq!(messages, vec!["$ ?R_", "r_height = 600 []", "r_width = 800 []"]);
    }

    #[test]
    fn test_template_expands_to_bind() {
        let mut console = Console::new();
        console
            .register_command(ConCommand::template("alias", "bind %1 %2"))
            .unwrap();

        console.execute_string("alias w forward", false, false);
        assert_eq!(console.binds().find("w"), Some("forward"));
    }

    #[test]
    fn test_template_argument_mismatch_warns() {
        let logs = MemoryLogSink::new();
        let mut console = Console::with_log_sink(logs.clone());
        console
            .register_command(ConCommand::template("alias", "bind %1 %2"))
            .unwrap();

        console.execute_string("alias w", false, false);
        assert!(logs.contains(LogLevel::Warning, "Not enough arguments for: alias"));
        assert!(console.binds().is_empty());
    }

    #[test]
    fn test_recursive_template_bounded() {
        let logs = MemoryLogSink::new();
        let mut console = Console::with_log_sink(logs.clone());
        console.register_command(ConCommand::template("loop", "loop")).unwrap();

        console.execute_string("loop", false, false);
        assert!(logs.contains(LogLevel::Warning, "expands too deeply"));
        assert_eq!(console.expansion_depth, 0);
    }

    #[test]
    fn test_cheat_command_refused_outside_dev() {
        let logs = MemoryLogSink::new();
        let mut console = Console::with_log_sink(logs.clone());
        let (command, calls) = counting("god", ConVarFlags::CHEAT);
        console.register_command(command).unwrap();

        console.execute_string("god", false, false);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(logs.contains(LogLevel::Error, "command god is marked [VF_CHEAT]"));

        console.settings_mut().dev_mode = true;
        console.execute_string("god", false, false);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        console.settings_mut().editor = true;
        logs.clear();
        console.execute_string("god", false, false);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(logs.count(LogLevel::Error), 0);
    }

    #[test]
    fn test_restricted_mode_filters_console_input() {
        let mut console = Console::new().with_settings(GateSettings {
            restricted: true,
            ..Default::default()
        });
        let (open, open_calls) = counting("status", ConVarFlags::RESTRICTED_MODE);
        let (closed, closed_calls) = counting("kick", ConVarFlags::empty());
        console.register_command(open).unwrap();
        console.register_command(closed).unwrap();

        console.execute_input("status; kick; #raw");
        assert_eq!(open_calls.load(Ordering::SeqCst), 1);
        assert_eq!(closed_calls.load(Ordering::SeqCst), 0);
        assert!(console.drain_outputs().iter().all(|o| o.message != "#raw"));

        // Scripts are not restricted
        console.execute_string("kick", false, false);
        assert_eq!(closed_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_handler_reported() {
        let logs = MemoryLogSink::new();
        let mut console = Console::with_log_sink(logs.clone());
        console
            .register_command(ConCommand::new("boom", |_, _| panic!("kaboom")))
            .unwrap();
        let after = console.register_var(ConVar::new("after", 0)).unwrap();

        console.execute_string("boom; after 1", false, false);
        assert!(logs.contains(LogLevel::Error, "Command 'boom' panicked: kaboom"));
        assert_eq!(console.get_int(after), Some(1));
    }

    #[test]
    fn test_describe_bitfield_and_group() {
        let mut console = Console::new();
        let bits = console
            .register_var(ConVar::new("r_debug", 0).flags(ConVarFlags::BITFIELD))
            .unwrap();
        console.execute_string("r_debug 3ab", true, false);
        assert_eq!(console.describe_var(bits).as_deref(), Some("r_debug = 195 (3, ab) []"));

        console.register_var(ConVar::new("q_shading", 0)).unwrap();
        let source = ConfigEntries::new()
            .with_group("default", "q_shading", "0")
            .with_group("1", "q_shading", "1");
        let group = console
            .register_group("sys_spec", "", ConVarFlags::empty(), &source)
            .unwrap();

        console.execute_string("q_shading 1", true, false);
        assert_eq!(console.describe_var(group).as_deref(), Some("sys_spec = 0 [] RealState=1"));

        console.execute_string("q_shading 5", true, false);
        assert_eq!(
            console.describe_var(group).as_deref(),
            Some("sys_spec = 0 [] RealState=Custom")
        );
    }

    #[test]
    fn test_invisible_value_hidden() {
        let mut console = Console::new();
        let handle = console
            .register_var(ConVar::new("rcon_password", "hunter2").flags(ConVarFlags::INVISIBLE))
            .unwrap();
        assert_eq!(console.describe_var(handle).as_deref(), Some("rcon_password =  []"));
    }
}
