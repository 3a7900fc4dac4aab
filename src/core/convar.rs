//! Console variable (ConVar) implementation.
//!
//! A ConVar is a named cell holding one of three value kinds. The kind is fixed
//! at construction; all text conversion rules live here so that every mutation
//! path parses and prints values the same way.

use std::fmt::{self, Display};
use std::sync::Arc;

use bitflags::bitflags;

use super::bitfield::parse_bitfield;
use super::group::ConVarGroup;
use super::registry::ConVarHandle;
use super::Console;

bitflags! {
    /// Flags controlling ConVar behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConVarFlags: u32 {
        /// Cannot be changed outside development contexts.
        const READ_ONLY = 1 << 0;
        /// Compiled-in constant.
        const CONST = 1 << 1;
        /// Cheat protected.
        const CHEAT = 1 << 2;
        /// Cheat protected, excluded from integrity checks.
        const CHEAT_NO_CHECK = 1 << 3;
        /// Cheat protected, always integrity checked.
        const CHEAT_ALWAYS_CHECK = 1 << 4;
        /// Scheduled for removal; changes are never allowed in dev mode either.
        const DEPRECATED = 1 << 5;
        /// Run the change path even when the value does not change.
        const ALWAYS_ON_CHANGE = 1 << 6;
        /// Int value using the letter bit syntax.
        const BITFIELD = 1 << 7;
        /// Changed since registration.
        const MODIFIED = 1 << 8;
        /// Value came from configuration ingestion.
        const WAS_IN_CONFIG = 1 << 9;
        /// Usable from the console while restricted mode is on.
        const RESTRICTED_MODE = 1 << 10;
        /// Hidden from listings and completion; value is not printed.
        const INVISIBLE = 1 << 11;
        /// Replicated to clients.
        const NET_SYNCED = 1 << 12;
        /// Only present in development builds.
        const DEV_ONLY = 1 << 13;
        /// Only present on dedicated servers.
        const DEDI_ONLY = 1 << 14;
        /// Pauses deferred execution until the next update.
        const BLOCK_FRAME = 1 << 15;
        /// Restored to its default by `resetcvars`.
        const RESETTABLE = 1 << 16;
        /// Always counts as matching when a group infers its state.
        const IGNORE_IN_REAL_VALUE = 1 << 17;
        /// Takes effect after an application restart.
        const REQUIRE_APP_RESTART = 1 << 18;
        /// Takes effect after a level reload.
        const REQUIRE_LEVEL_RELOAD = 1 << 19;
        /// Written out when variables are dumped to disk.
        const DUMP_TO_DISK = 1 << 20;

        /// Any of the cheat flags.
        const ANY_CHEAT = Self::CHEAT.bits() | Self::CHEAT_NO_CHECK.bits() | Self::CHEAT_ALWAYS_CHECK.bits();
    }
}

impl ConVarFlags {
    /// Whether changes to a variable with these flags go through protection checks.
    #[inline]
    pub fn is_protected(self) -> bool {
        self.intersects(Self::CONST | Self::ANY_CHEAT | Self::READ_ONLY | Self::DEPRECATED)
    }

    /// Human readable list of the display-relevant flags, comma separated.
    pub fn describe(self) -> String {
        const NAMES: [(ConVarFlags, &str); 6] = [
            (ConVarFlags::READ_ONLY, "READONLY"),
            (ConVarFlags::DEPRECATED, "DEPRECATED"),
            (ConVarFlags::DUMP_TO_DISK, "DUMPTODISK"),
            (ConVarFlags::REQUIRE_LEVEL_RELOAD, "REQUIRE_LEVEL_RELOAD"),
            (ConVarFlags::REQUIRE_APP_RESTART, "REQUIRE_APP_RESTART"),
            (ConVarFlags::RESTRICTED_MODE, "RESTRICTEDMODE"),
        ];

        NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Bracketed protection markers used in change diagnostics.
    pub fn protection_markers(self) -> String {
        let mut out = String::new();
        if self.contains(Self::CONST) {
            out.push_str(" [VF_CONST_CVAR]");
        }
        if self.intersects(Self::ANY_CHEAT) {
            out.push_str(" [VF_CHEAT]");
        }
        if self.contains(Self::READ_ONLY) {
            out.push_str(" [VF_READONLY]");
        }
        if self.contains(Self::DEPRECATED) {
            out.push_str(" [VF_DEPRECATED]");
        }
        out
    }
}

/// The kind of value a ConVar holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConVarKind {
    /// 64-bit signed integer.
    Int,
    /// 32-bit float.
    Float,
    /// Verbatim text.
    String,
}

impl Display for ConVarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConVarKind::Int => "int",
            ConVarKind::Float => "float",
            ConVarKind::String => "string",
        })
    }
}

/// A typed ConVar value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConVarValue {
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f32),
    /// String value.
    String(String),
}

impl ConVarValue {
    /// The kind of this value.
    pub fn kind(&self) -> ConVarKind {
        match self {
            ConVarValue::Int(_) => ConVarKind::Int,
            ConVarValue::Float(_) => ConVarKind::Float,
            ConVarValue::String(_) => ConVarKind::String,
        }
    }

    /// Parse `text` as a value of `kind`.
    ///
    /// Numeric parsing is lenient: the longest numeric prefix is used and text
    /// without one yields zero. `current` feeds the bitfield operators.
    pub fn parse(kind: ConVarKind, text: &str, bitfield: bool, current: i64) -> Self {
        match kind {
            ConVarKind::Int if bitfield => ConVarValue::Int(parse_bitfield(text, current)),
            ConVarKind::Int => ConVarValue::Int(leading_int(text).0),
            ConVarKind::Float => ConVarValue::Float(leading_float(text)),
            ConVarKind::String => ConVarValue::String(text.to_string()),
        }
    }

    /// Integer view of the value.
    pub fn as_int(&self) -> i64 {
        match self {
            ConVarValue::Int(v) => *v,
            ConVarValue::Float(v) => *v as i64,
            ConVarValue::String(s) => leading_int(s).0,
        }
    }

    /// Float view of the value.
    pub fn as_float(&self) -> f32 {
        match self {
            ConVarValue::Int(v) => *v as f32,
            ConVarValue::Float(v) => *v,
            ConVarValue::String(s) => leading_float(s),
        }
    }

    /// Convert to `kind`, going through text for strings.
    pub fn convert(&self, kind: ConVarKind) -> ConVarValue {
        match kind {
            ConVarKind::Int => ConVarValue::Int(self.as_int()),
            ConVarKind::Float => ConVarValue::Float(self.as_float()),
            ConVarKind::String => ConVarValue::String(self.to_string()),
        }
    }
}

impl Display for ConVarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConVarValue::Int(v) => write!(f, "{}", v),
            // Rust's float Display is already the shortest round-trippable form
            ConVarValue::Float(v) => write!(f, "{}", v),
            ConVarValue::String(s) => f.write_str(s),
        }
    }
}

impl From<i32> for ConVarValue {
    fn from(v: i32) -> Self {
        ConVarValue::Int(i64::from(v))
    }
}

impl From<i64> for ConVarValue {
    fn from(v: i64) -> Self {
        ConVarValue::Int(v)
    }
}

impl From<f32> for ConVarValue {
    fn from(v: f32) -> Self {
        ConVarValue::Float(v)
    }
}

impl From<&str> for ConVarValue {
    fn from(v: &str) -> Self {
        ConVarValue::String(v.to_string())
    }
}

impl From<String> for ConVarValue {
    fn from(v: String) -> Self {
        ConVarValue::String(v)
    }
}

/// Parse the longest leading decimal integer, returning it and the unparsed rest.
///
/// Leading whitespace and a sign are accepted. Without any digit the result is
/// 0 and the whole input is returned as the rest. Overflow saturates.
pub(crate) fn leading_int(text: &str) -> (i64, &str) {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut pos = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            pos = 1;
            true
        }
        Some(b'+') => {
            pos = 1;
            false
        }
        _ => false,
    };

    let digits_start = pos;
    let mut value: i64 = 0;
    while let Some(&c) = bytes.get(pos) {
        if !c.is_ascii_digit() {
            break;
        }
        let digit = i64::from(c - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
        pos += 1;
    }

    if pos == digits_start {
        return (0, text);
    }
    (value, &trimmed[pos..])
}

/// Parse the longest leading decimal float; 0.0 when there is none.
pub(crate) fn leading_float(text: &str) -> f32 {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;

    for (i, &c) in bytes.iter().enumerate() {
        match c {
            b'0'..=b'9' => seen_digit = true,
            b'+' | b'-' if i == 0 => {}
            b'+' | b'-' if matches!(bytes[i - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end = i + 1;
    }

    // Back off until the prefix parses, dropping a dangling exponent or sign
    let mut candidate = &trimmed[..end];
    while !candidate.is_empty() {
        if let Ok(v) = candidate.parse::<f32>() {
            return v;
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    0.0
}

/// Details of one variable mutation, handed to change callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct ConVarChange {
    /// Handle of the changed variable.
    pub handle: ConVarHandle,
    /// Variable name as registered.
    pub name: Box<str>,
    /// Value before the change.
    pub old: ConVarValue,
    /// Value after the change.
    pub new: ConVarValue,
}

/// Callback invoked after a variable changes.
///
/// Callbacks receive the whole console, so they may read or set other
/// variables; nested changes complete before the outer change returns.
pub type ConVarCallback = Arc<dyn Fn(&mut Console, &ConVarChange) + Send + Sync>;

/// A console variable with a typed value.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::{ConVar, ConVarFlags, ConVarKind};
///
/// let gravity = ConVar::new("sv_gravity", 800.0f32)
///     .help("World gravity")
///     .flags(ConVarFlags::CHEAT)
///     .limits(0.0, 4000.0);
///
/// assert_eq!(gravity.kind(), ConVarKind::Float);
/// assert_eq!(gravity.get_string(), "800");
/// ```
#[derive(Clone)]
pub struct ConVar {
    name: Box<str>,
    value: ConVarValue,
    default: ConVarValue,
    flags: ConVarFlags,
    help: String,
    limits: Option<(f32, f32)>,
    callbacks: Vec<ConVarCallback>,
    group: Option<Arc<ConVarGroup>>,
}

impl ConVar {
    /// Create a new ConVar; the kind follows the initial value.
    pub fn new(name: impl Into<Box<str>>, initial: impl Into<ConVarValue>) -> Self {
        let initial = initial.into();
        Self {
            name: name.into(),
            value: initial.clone(),
            default: initial,
            flags: ConVarFlags::empty(),
            help: String::new(),
            limits: None,
            callbacks: Vec::new(),
            group: None,
        }
    }

    /// Set the help text.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Set the flags.
    pub fn flags(mut self, flags: ConVarFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Record numeric limits. They are informational and never clamp values.
    pub fn limits(mut self, min: f32, max: f32) -> Self {
        self.limits = Some((min, max));
        self
    }

    /// Append a change callback.
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Console, &ConVarChange) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
        self
    }

    pub(crate) fn with_group(mut self, group: Arc<ConVarGroup>) -> Self {
        self.group = Some(group);
        self
    }

    /// Get the name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the kind.
    #[inline]
    pub fn kind(&self) -> ConVarKind {
        self.value.kind()
    }

    /// Get the current value.
    #[inline]
    pub fn value(&self) -> &ConVarValue {
        &self.value
    }

    /// Get the compiled default value.
    #[inline]
    pub fn default_value(&self) -> &ConVarValue {
        &self.default
    }

    /// Get the flags.
    #[inline]
    pub fn get_flags(&self) -> ConVarFlags {
        self.flags
    }

    /// Get the help text.
    #[inline]
    pub fn get_help(&self) -> &str {
        &self.help
    }

    /// Get the recorded limits.
    #[inline]
    pub fn get_limits(&self) -> Option<(f32, f32)> {
        self.limits
    }

    /// Integer view of the current value.
    #[inline]
    pub fn get_int(&self) -> i64 {
        self.value.as_int()
    }

    /// Float view of the current value.
    #[inline]
    pub fn get_float(&self) -> f32 {
        self.value.as_float()
    }

    /// Current value as text.
    #[inline]
    pub fn get_string(&self) -> String {
        self.value.to_string()
    }

    /// Whether this variable is a variable group.
    #[inline]
    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }

    /// The group data, if this variable is a group.
    #[inline]
    pub fn group(&self) -> Option<&Arc<ConVarGroup>> {
        self.group.as_ref()
    }

    /// Parse `text` the way this variable would store it.
    pub fn parse_text(&self, text: &str) -> ConVarValue {
        ConVarValue::parse(
            self.kind(),
            text,
            self.flags.contains(ConVarFlags::BITFIELD),
            self.get_int(),
        )
    }

    pub(crate) fn callbacks(&self) -> &[ConVarCallback] {
        &self.callbacks
    }

    pub(crate) fn push_callback(&mut self, callback: ConVarCallback) {
        self.callbacks.push(callback);
    }

    pub(crate) fn insert_flags(&mut self, flags: ConVarFlags) {
        self.flags.insert(flags);
    }

    pub(crate) fn remove_flags(&mut self, flags: ConVarFlags) {
        self.flags.remove(flags);
    }

    /// Store a value already converted to this variable's kind.
    pub(crate) fn store(&mut self, value: ConVarValue) {
        debug_assert_eq!(value.kind(), self.kind());
        self.value = value;
    }
}

impl std::fmt::Debug for ConVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConVar")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("flags", &self.flags)
            .field("callbacks", &self.callbacks.len())
            .field("group", &self.group.is_some())
            .finish_non_exhaustive()
    }
}

impl Display for ConVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}
