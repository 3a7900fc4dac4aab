//! Protection checks run around every variable mutation.
//!
//! Protected variables (const, cheat, read-only or deprecated) may only change
//! in development or editor contexts, or while a variable group applies one of
//! its presets. Infractions are logged; rejected changes leave the variable
//! untouched.

use super::{ConVar, ConVarFlags, LogLevel, LogSink};

/// Context switches consulted by the change gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSettings {
    /// Development build or `-devmode` style session.
    pub dev_mode: bool,
    /// Running inside the editor.
    pub editor: bool,
    /// Group preset application bypasses protection checks.
    pub groups_privileged: bool,
    /// Apply protected changes even when the gate refuses them (still logged).
    pub allow_const_modifications: bool,
    /// Interactive input may only reach entries flagged `RESTRICTED_MODE`.
    pub restricted: bool,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            dev_mode: false,
            editor: false,
            groups_privileged: true,
            allow_const_modifications: false,
            restricted: false,
        }
    }
}

/// Outcome of the protection rule for one change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// Not protected, or exempt; no diagnostics.
    Allowed,
    /// Protected but allowed; the change is reported as a warning.
    AllowedWithWarning,
    /// Protected and allowed in the editor; no diagnostics.
    AllowedSilently,
    /// Protected and refused; reported as an error.
    Rejected,
}

impl GateVerdict {
    /// Whether the mutation may proceed.
    pub fn is_allowed(self) -> bool {
        !matches!(self, GateVerdict::Rejected)
    }
}

/// External observer that may veto variable changes.
///
/// Sinks run after the protection rule, in the order they were added. The
/// first veto aborts the change.
pub trait ConVarSink: Send + Sync {
    /// Return `false` to refuse the change of `var` to `new_value`.
    fn on_before_var_change(&mut self, _var: &ConVar, _new_value: &str) -> bool {
        true
    }

    /// Called after `var` changed.
    fn on_after_var_change(&mut self, _var: &ConVar) {}
}

/// Identifies a sink added with [`ChangeGate::add_sink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

/// The permission protocol for variable mutation.
#[derive(Default)]
pub struct ChangeGate {
    settings: GateSettings,
    group_depth: u32,
    sinks: Vec<(SinkId, Box<dyn ConVarSink>)>,
    next_sink: u64,
}

impl ChangeGate {
    /// Create a gate with the given settings.
    pub fn new(settings: GateSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Current settings.
    #[inline]
    pub fn settings(&self) -> &GateSettings {
        &self.settings
    }

    /// Mutable settings.
    #[inline]
    pub fn settings_mut(&mut self) -> &mut GateSettings {
        &mut self.settings
    }

    /// Whether a group is currently applying a preset.
    #[inline]
    pub fn in_group_scope(&self) -> bool {
        self.group_depth > 0
    }

    /// Nesting depth of group preset application.
    #[inline]
    pub fn group_depth(&self) -> u32 {
        self.group_depth
    }

    pub(crate) fn enter_group_scope(&mut self) {
        self.group_depth += 1;
    }

    pub(crate) fn leave_group_scope(&mut self) {
        self.group_depth = self.group_depth.saturating_sub(1);
    }

    /// Force the group scope open or closed, returning the previous depth.
    pub(crate) fn swap_group_scope(&mut self, inside: bool) -> u32 {
        let saved = self.group_depth;
        self.group_depth = u32::from(inside);
        saved
    }

    pub(crate) fn restore_group_scope(&mut self, saved: u32) {
        self.group_depth = saved;
    }

    /// Apply the protection rule to a variable with `flags`.
    pub fn verdict(&self, flags: ConVarFlags) -> GateVerdict {
        if !flags.is_protected() {
            return GateVerdict::Allowed;
        }
        if self.in_group_scope() && self.settings.groups_privileged {
            return GateVerdict::Allowed;
        }

        let deprecated = flags.contains(ConVarFlags::DEPRECATED);
        let allowed = !deprecated && (self.settings.dev_mode || self.settings.editor);

        if !allowed {
            GateVerdict::Rejected
        } else if self.settings.editor {
            GateVerdict::AllowedSilently
        } else {
            GateVerdict::AllowedWithWarning
        }
    }

    /// Check whether `var` may change to `new_value`, logging any infraction.
    pub fn before(&mut self, var: &ConVar, new_value: &str, log: &dyn LogSink) -> bool {
        let verdict = self.verdict(var.get_flags());
        match verdict {
            GateVerdict::Rejected => {
                log.log(LogLevel::Error, &self.change_message(var, new_value, false));
                if !self.settings.allow_const_modifications {
                    return false;
                }
            }
            GateVerdict::AllowedWithWarning => {
                log.log(LogLevel::Warning, &self.change_message(var, new_value, true));
                log.log(
                    LogLevel::Warning,
                    "Modifying marked variables will not be allowed in Release mode!",
                );
            }
            GateVerdict::Allowed | GateVerdict::AllowedSilently => {}
        }

        self.sinks
            .iter_mut()
            .all(|(_, sink)| sink.on_before_var_change(var, new_value))
    }

    /// Notify sinks that `var` changed.
    pub fn after(&mut self, var: &ConVar) {
        for (_, sink) in &mut self.sinks {
            sink.on_after_var_change(var);
        }
    }

    /// Add an external sink.
    pub fn add_sink(&mut self, sink: impl ConVarSink + 'static) -> SinkId {
        let id = SinkId(self.next_sink);
        self.next_sink += 1;
        self.sinks.push((id, Box::new(sink)));
        id
    }

    /// Remove a sink. Returns `false` if it was not present.
    pub fn remove_sink(&mut self, id: SinkId) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(sink_id, _)| *sink_id != id);
        self.sinks.len() != before
    }

    fn change_message(&self, var: &ConVar, new_value: &str, allowed: bool) -> String {
        format!(
            "[CVARS]: [{}] variable [{}] from [{}] to [{}]{}; Marked as{}",
            if allowed { "CHANGED" } else { "IGNORED CHANGE" },
            var.name(),
            var.get_string(),
            new_value,
            if self.in_group_scope() { " as part of a cvar group" } else { "" },
            var.get_flags().protection_markers(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MemoryLogSink;

    fn read_only() -> ConVar {
        ConVar::new("r_fullscreen", 0).flags(ConVarFlags::READ_ONLY)
    }

    #[test]
    fn test_unprotected_is_silent() {
        let logs = MemoryLogSink::new();
        let mut gate = ChangeGate::default();
        assert!(gate.before(&ConVar::new("q_shading", 2), "3", &logs));
        assert!(logs.records().is_empty());
    }

    #[test]
    fn test_read_only_rejected_outside_dev() {
        let logs = MemoryLogSink::new();
        let mut gate = ChangeGate::default();
        assert!(!gate.before(&read_only(), "1", &logs));
        assert_eq!(logs.count(LogLevel::Error), 1);
        assert!(logs.contains(LogLevel::Error, "[IGNORED CHANGE] variable [r_fullscreen] from [0] to [1]"));
        assert!(logs.contains(LogLevel::Error, "[VF_READONLY]"));
    }

    #[test]
    fn test_dev_mode_allows_with_warning() {
        let logs = MemoryLogSink::new();
        let mut gate = ChangeGate::new(GateSettings { dev_mode: true, ..Default::default() });
        assert!(gate.before(&read_only(), "1", &logs));
        assert_eq!(logs.count(LogLevel::Warning), 2);
        assert_eq!(logs.count(LogLevel::Error), 0);
    }

    #[test]
    fn test_editor_allows_silently() {
        let logs = MemoryLogSink::new();
        let mut gate = ChangeGate::new(GateSettings { editor: true, ..Default::default() });
        assert!(gate.before(&read_only(), "1", &logs));
        assert!(logs.records().is_empty());
    }

    #[test]
    fn test_deprecated_never_allowed_by_context() {
        let gate = ChangeGate::new(GateSettings { dev_mode: true, editor: true, ..Default::default() });
        assert_eq!(gate.verdict(ConVarFlags::DEPRECATED), GateVerdict::Rejected);
    }

    #[test]
    fn test_group_scope_privileged() {
        let mut gate = ChangeGate::default();
        gate.enter_group_scope();
        assert_eq!(gate.verdict(ConVarFlags::CHEAT), GateVerdict::Allowed);
        gate.leave_group_scope();
        assert_eq!(gate.verdict(ConVarFlags::CHEAT), GateVerdict::Rejected);

        let mut gate = ChangeGate::new(GateSettings { groups_privileged: false, ..Default::default() });
        gate.enter_group_scope();
        assert_eq!(gate.verdict(ConVarFlags::CHEAT), GateVerdict::Rejected);
    }

    #[test]
    fn test_group_scope_is_reported() {
        let logs = MemoryLogSink::new();
        let mut gate = ChangeGate::new(GateSettings { groups_privileged: false, ..Default::default() });
        gate.enter_group_scope();
        gate.before(&read_only(), "1", &logs);
        assert!(logs.contains(LogLevel::Error, "as part of a cvar group"));
    }

    #[test]
    fn test_const_override_applies_but_logs() {
        let logs = MemoryLogSink::new();
        let mut gate = ChangeGate::new(GateSettings { allow_const_modifications: true, ..Default::default() });
        assert!(gate.before(&read_only(), "1", &logs));
        assert_eq!(logs.count(LogLevel::Error), 1);
    }

    struct Veto;

    impl ConVarSink for Veto {
        fn on_before_var_change(&mut self, var: &ConVar, _new_value: &str) -> bool {
            var.name() != "locked"
        }
    }

    #[test]
    fn test_sink_veto_and_removal() {
        let logs = MemoryLogSink::new();
        let mut gate = ChangeGate::default();
        let id = gate.add_sink(Veto);

        assert!(!gate.before(&ConVar::new("locked", 0), "1", &logs));
        assert!(gate.before(&ConVar::new("open", 0), "1", &logs));

        assert!(gate.remove_sink(id));
        assert!(!gate.remove_sink(id));
        assert!(gate.before(&ConVar::new("locked", 0), "1", &logs));
    }
}
