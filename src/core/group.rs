//! Variable groups: Int variables that select among presets of other variables.
//!
//! A group holds a Default snapshot plus one snapshot per state id. Setting the
//! group applies the chosen snapshot followed by the Default entries it does
//! not override. The inverse direction, the *real state*, inspects the live
//! values and reports which state they currently correspond to.

use std::sync::Arc;

use super::convar::leading_int;
use super::{
    ConVar, ConVarCallback, ConVarChange, ConVarFlags, ConVarHandle, ConVarKind, ConVarValue,
    ConfigSink, ConfigSource, Console, ConsoleError, LogLevel,
};

/// Nesting limit for groups that reference other groups.
pub const MAX_GROUP_DEPTH: u32 = 16;

/// Real state reported when no snapshot matches.
pub const NO_MATCHING_STATE: i64 = -1;

/// Section tag of the Default snapshot.
const DEFAULT_TAG: &str = "default";

/// An ordered, case-insensitive `name -> text` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupSnapshot {
    entries: Vec<(Box<str>, String)>,
}

impl GroupSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `text`, replacing an earlier value for the same name.
    pub fn insert(&mut self, name: &str, text: impl Into<String>) {
        let text = text.into();
        match self.entries.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
            Some((_, value)) => *value = text,
            None => self.entries.push((name.into(), text)),
        }
    }

    /// Value text for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether `name` has an entry.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (&**key, value.as_str()))
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Preset data carried by a group variable.
#[derive(Debug, Clone, Default)]
pub struct ConVarGroup {
    default: GroupSnapshot,
    states: Vec<(i64, GroupSnapshot)>,
    default_state: Option<i64>,
}

impl ConVarGroup {
    /// The Default snapshot.
    pub fn default_snapshot(&self) -> &GroupSnapshot {
        &self.default
    }

    /// Snapshot of state `id`.
    pub fn state(&self, id: i64) -> Option<&GroupSnapshot> {
        self.states.iter().find(|(state, _)| *state == id).map(|(_, s)| s)
    }

    /// State ids in definition order.
    pub fn state_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.states.iter().map(|(id, _)| *id)
    }

    /// State selected when the group registers, if the definition names one.
    pub fn default_state(&self) -> Option<i64> {
        self.default_state
    }

    /// Entries of state `id` followed by the Default entries it does not override.
    pub fn effective_entries(&self, id: i64) -> impl Iterator<Item = (&str, &str)> {
        let state = self.state(id);
        state.into_iter().flat_map(GroupSnapshot::iter).chain(
            self.default
                .iter()
                .filter(move |(key, _)| !state.is_some_and(|s| s.contains(key))),
        )
    }

    fn state_mut(&mut self, id: i64) -> &mut GroupSnapshot {
        let index = match self.states.iter().position(|(state, _)| *state == id) {
            Some(index) => index,
            None => {
                self.states.push((id, GroupSnapshot::new()));
                self.states.len() - 1
            }
        };
        &mut self.states[index].1
    }
}

/// Collects a group definition from a [`ConfigSource`].
#[derive(Debug, Default)]
struct GroupBuilder {
    group: ConVarGroup,
    warnings: Vec<String>,
}

impl ConfigSink for GroupBuilder {
    fn on_entry(&mut self, key: &str, value: &str, tag: Option<&str>) {
        match tag {
            Some(tag) if tag.eq_ignore_ascii_case(DEFAULT_TAG) => {
                if key.is_empty() {
                    self.group.default_state = Some(leading_int(value).0);
                } else {
                    self.group.default.insert(key, value);
                }
            }
            Some(tag) => match tag.trim().parse::<i64>() {
                Ok(id) if !key.is_empty() => self.group.state_mut(id).insert(key, value),
                Ok(_) => self.warnings.push(format!("empty key in state section [{}]", tag)),
                Err(_) => self.warnings.push(format!("unknown section [{}]", tag)),
            },
            None => self
                .warnings
                .push(format!("entry [{}] outside a section", key)),
        }
    }
}

/// How much a group test reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupLogMode {
    /// Test quietly.
    #[default]
    Off,
    /// Log missing members as errors and mismatches as warnings.
    Full,
}

/// Result of [`Console::check_group`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupReport {
    /// Stored selector value.
    pub value: i64,
    /// Inferred state, or [`NO_MATCHING_STATE`].
    pub real_state: i64,
    /// Problems found while testing the stored state.
    pub problems: Vec<ConsoleError>,
}

impl Console {
    /// Register a variable group named `name` from a group definition.
    ///
    /// Entries tagged `default` form the Default snapshot; a `default` entry
    /// with an empty key names the state selected at registration. Entries
    /// tagged with a decimal id form that state's snapshot.
    ///
    /// # Examples
    ///
    /// ```
    /// use bevy_cvar_console::core::{ConfigEntries, Console, ConVar, ConVarFlags};
    ///
    /// let mut console = Console::new();
    /// let shading = console.register_var(ConVar::new("q_shading", 0)).unwrap();
    ///
    /// let spec = ConfigEntries::new()
    ///     .with_group("default", "q_shading", "0")
    ///     .with_group("1", "q_shading", "1")
    ///     .with_group("2", "q_shading", "2");
    /// let group = console
    ///     .register_group("sys_spec", "Overall quality", ConVarFlags::empty(), &spec)
    ///     .unwrap();
    ///
    /// console.set_group_state(group, 2).unwrap();
    /// assert_eq!(console.get_int(shading), Some(2));
    /// assert_eq!(console.group_real_state(group), 2);
    /// ```
    pub fn register_group(
        &mut self,
        name: &str,
        help: &str,
        flags: ConVarFlags,
        source: &dyn ConfigSource,
    ) -> Result<ConVarHandle, ConsoleError> {
        let mut builder = GroupBuilder::default();
        source.ingest(&mut builder);
        for warning in &builder.warnings {
            self.log.log(
                LogLevel::Warning,
                &format!("[CVARS]: [GROUP] {}: {}", name, warning),
            );
        }

        let group = builder.group;
        for (id, snapshot) in &group.states {
            for (key, _) in snapshot.iter() {
                if !group.default.contains(key) {
                    self.log.log(
                        LogLevel::Warning,
                        &format!(
                            "[CVARS]: [GROUP] {}: state {} sets [{}] which has no default value",
                            name, id, key
                        ),
                    );
                }
            }
        }

        let default_state = group.default_state;
        let apply: ConVarCallback = Arc::new(|console: &mut Console, change: &ConVarChange| {
            console.apply_group_state(change.handle, change.new.as_int());
        });
        let mut var = ConVar::new(name, default_state.unwrap_or(0))
            .help(help)
            .flags(flags)
            .with_group(Arc::new(group));
        var.push_callback(apply);

        let handle = self.register_var(var)?;
        let Some(var) = self.vars.get(handle).filter(|var| var.is_group()) else {
            // A plain variable already owned the name
            return Ok(handle);
        };

        if default_state.is_some() || var.get_flags().contains(ConVarFlags::WAS_IN_CONFIG) {
            let current = var.get_int();
            self.apply_group_state(handle, current);
        }
        Ok(handle)
    }

    /// Select state `id` of a group.
    ///
    /// Does nothing if the group already holds `id` and the live values match
    /// it. Otherwise the selector is set through the normal mutation path and
    /// the preset is applied with protection checks relaxed for the group.
    pub fn set_group_state(&mut self, handle: ConVarHandle, id: i64) -> Result<(), ConsoleError> {
        let var = self.group_var(handle)?;
        if var.get_int() == id && self.test_group_state(handle, id, GroupLogMode::Off) {
            return Ok(());
        }

        self.gate.enter_group_scope();
        let result = self.set_value(handle, ConVarValue::Int(id));
        if matches!(result, Ok(false)) {
            // Selector already equal, so its callback did not run
            self.apply_group_state(handle, id);
        }
        self.gate.leave_group_scope();
        result.map(|_| ())
    }

    /// Infer the state the live values correspond to.
    ///
    /// The stored state is tried first, then every other state in definition
    /// order. Returns [`NO_MATCHING_STATE`] when nothing matches or `handle`
    /// is not a group.
    pub fn group_real_state(&self, handle: ConVarHandle) -> i64 {
        self.real_state(handle, 0)
    }

    /// Test whether the live values match state `id` of a group.
    pub fn test_group_state(&self, handle: ConVarHandle, id: i64, mode: GroupLogMode) -> bool {
        let mut problems = Vec::new();
        let matched = self.test_state(handle, id, 0, Some(&mut problems));
        if mode == GroupLogMode::Full {
            self.log_group_problems(&problems);
        }
        matched
    }

    /// Re-test a group's stored state with full diagnostics.
    pub fn check_group(&self, name: &str) -> Result<GroupReport, ConsoleError> {
        let handle = self
            .vars
            .lookup(name)
            .ok_or_else(|| ConsoleError::UnknownVariable(name.to_string()))?;
        let value = self.group_var(handle)?.get_int();

        let mut problems = Vec::new();
        self.test_state(handle, value, 0, Some(&mut problems));
        self.log_group_problems(&problems);

        let real_state = self.group_real_state(handle);
        self.log.log(
            LogLevel::Info,
            &format!("[CVARS]: [GROUP CHECK] {} = {} (real state {})", name, value, real_state),
        );
        Ok(GroupReport {
            value,
            real_state,
            problems,
        })
    }

    fn group_var(&self, handle: ConVarHandle) -> Result<&ConVar, ConsoleError> {
        self.vars
            .get(handle)
            .filter(|var| var.is_group())
            .ok_or_else(|| ConsoleError::UnknownVariable(format!("{:?}", handle)))
    }

    fn log_group_problems(&self, problems: &[ConsoleError]) {
        for problem in problems {
            let level = match problem {
                ConsoleError::MissingGroupMember { .. } => LogLevel::Error,
                _ => LogLevel::Warning,
            };
            self.log.log(level, &format!("[CVARS]: [GROUP CHECK] {}", problem));
        }
    }

    /// Write the effective entries of state `id` into the registry.
    pub(crate) fn apply_group_state(&mut self, handle: ConVarHandle, id: i64) {
        let Some(var) = self.vars.get(handle) else {
            return;
        };
        let Some(group) = var.group().cloned() else {
            return;
        };
        if self.gate.group_depth() >= MAX_GROUP_DEPTH {
            self.log.log(
                LogLevel::Warning,
                &format!("[CVARS]: [GROUP] {}: nesting too deep, state {} not applied", var.name(), id),
            );
            return;
        }

        self.gate.enter_group_scope();
        for (name, text) in group.effective_entries(id) {
            self.apply_group_entry(name, text);
        }
        self.gate.leave_group_scope();
    }

    fn apply_group_entry(&mut self, name: &str, text: &str) {
        let Some(handle) = self.vars.lookup(name) else {
            self.overlay.record(name, text, true);
            return;
        };
        let Some(var) = self.vars.get(handle) else {
            return;
        };

        if var.get_string() != text || var.get_flags().contains(ConVarFlags::ALWAYS_ON_CHANGE) {
            // Rejections are logged by the gate
            let _ = self.set_from_text(handle, text);
        }
    }

    fn real_state(&self, handle: ConVarHandle, depth: u32) -> i64 {
        let Some(var) = self.vars.get(handle) else {
            return NO_MATCHING_STATE;
        };
        let Some(group) = var.group() else {
            return NO_MATCHING_STATE;
        };
        if depth >= MAX_GROUP_DEPTH {
            return NO_MATCHING_STATE;
        }

        let current = var.get_int();
        if group.state(current).is_some() && self.test_state(handle, current, depth, None) {
            return current;
        }

        group
            .state_ids()
            .filter(|&id| id != current)
            .find(|&id| self.test_state(handle, id, depth, None))
            .unwrap_or(NO_MATCHING_STATE)
    }

    fn test_state(
        &self,
        handle: ConVarHandle,
        id: i64,
        depth: u32,
        mut problems: Option<&mut Vec<ConsoleError>>,
    ) -> bool {
        let Some(var) = self.vars.get(handle) else {
            return false;
        };
        let Some(group) = var.group() else {
            return false;
        };

        let mut matched = true;
        for (member, expected) in group.effective_entries(id) {
            let ok = self.test_member(var.name(), member, expected, depth, problems.as_deref_mut());
            matched &= ok;
            if !matched && problems.is_none() {
                break;
            }
        }
        matched
    }

    fn test_member(
        &self,
        group: &str,
        member: &str,
        expected: &str,
        depth: u32,
        problems: Option<&mut Vec<ConsoleError>>,
    ) -> bool {
        let Some(handle) = self.vars.lookup(member) else {
            if let Some(problems) = problems {
                problems.push(ConsoleError::MissingGroupMember {
                    group: group.to_string(),
                    member: member.to_string(),
                });
            }
            return false;
        };
        let Some(var) = self.vars.get(handle) else {
            return false;
        };
        if var.get_flags().contains(ConVarFlags::IGNORE_IN_REAL_VALUE) {
            return true;
        }

        let matched = match var.kind() {
            ConVarKind::Int => {
                let want = var.parse_text(expected).as_int();
                var.get_int() == want && (!var.is_group() || self.real_state(handle, depth + 1) == want)
            }
            ConVarKind::Float => var.parse_text(expected) == *var.value(),
            ConVarKind::String => var.get_string() == expected,
        };

        if !matched {
            if let Some(problems) = problems {
                problems.push(ConsoleError::GroupMemberMismatch {
                    group: group.to_string(),
                    member: member.to_string(),
                    expected: expected.to_string(),
                    actual: var.get_string(),
                });
            }
        }
        matched
    }
}
