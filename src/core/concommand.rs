//! Console command (ConCommand) implementation.
//!
//! A command is either native, running a handler with the parsed arguments, or
//! a template whose text is expanded with the arguments and executed as a new
//! line.

use std::sync::Arc;

use super::{ConVarFlags, Console, Trie};

/// Arguments passed to a command handler.
#[derive(Debug, Clone)]
pub struct CommandArgs<'a> {
    /// The raw statement.
    raw: &'a str,
    /// All tokens, starting with the command name.
    tokens: Vec<&'a str>,
}

impl<'a> CommandArgs<'a> {
    /// Create command args from a raw statement and its tokens.
    ///
    /// The first token is the command name.
    pub fn new(raw: &'a str, tokens: Vec<&'a str>) -> Self {
        Self { raw, tokens }
    }

    /// Get the raw statement.
    #[inline]
    pub fn raw(&self) -> &str {
        self.raw
    }

    /// Get the command name as typed.
    #[inline]
    pub fn name(&self) -> &str {
        self.tokens.first().copied().unwrap_or("")
    }

    /// Get every token, including the command name.
    #[inline]
    pub fn tokens(&self) -> &[&'a str] {
        &self.tokens
    }

    /// Get the number of arguments (excluding the command name).
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len().saturating_sub(1)
    }

    /// Check if there are no arguments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get an argument by index, not counting the command name.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.tokens.get(index + 1).copied()
    }

    /// Get an argument or a default value.
    #[inline]
    pub fn get_or(&self, index: usize, default: &'a str) -> &'a str {
        self.get(index).unwrap_or(default)
    }

    /// Try to parse an argument as a specific type.
    pub fn parse<T: std::str::FromStr>(&self, index: usize) -> Option<T> {
        self.get(index).and_then(|s| s.parse().ok())
    }

    /// Parse an argument with a default value.
    pub fn parse_or<T: std::str::FromStr>(&self, index: usize, default: T) -> T {
        self.parse(index).unwrap_or(default)
    }

    /// Iterate over arguments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.tokens.iter().skip(1).copied()
    }

    /// Join all arguments with a separator.
    pub fn join(&self, separator: &str) -> String {
        self.join_from(0, separator)
    }

    /// Join arguments starting from an index.
    pub fn join_from(&self, start: usize, separator: &str) -> String {
        self.tokens.get(start + 1..).unwrap_or(&[]).join(separator)
    }
}

impl std::ops::Index<usize> for CommandArgs<'_> {
    type Output = str;

    fn index(&self, index: usize) -> &Self::Output {
        self.tokens[index + 1]
    }
}

/// Type alias for native command handlers.
///
/// Handlers receive the parsed arguments and the console, so they can read and
/// set variables or execute further lines.
pub type CommandHandler = Arc<dyn Fn(&CommandArgs, &mut Console) + Send + Sync>;

/// What running a command does.
#[derive(Clone)]
pub enum CommandAction {
    /// Call a handler.
    Native(CommandHandler),
    /// Expand the text with `%1`..`%9`, `%%` or `%line` and execute it.
    Template(String),
}

impl std::fmt::Debug for CommandAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandAction::Native(_) => f.write_str("Native(..)"),
            CommandAction::Template(text) => f.debug_tuple("Template").field(text).finish(),
        }
    }
}

/// A console command.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::{ConCommand, ConVarFlags};
///
/// let noclip = ConCommand::new("noclip", |_args, _console| {})
///     .help("Toggle noclip mode")
///     .flags(ConVarFlags::CHEAT);
///
/// let alias = ConCommand::template("alias", "bind %1 %2")
///     .help("Bind a key");
///
/// assert!(alias.is_template());
/// assert!(!noclip.is_template());
/// ```
#[derive(Clone, Debug)]
pub struct ConCommand {
    name: Box<str>,
    help: String,
    flags: ConVarFlags,
    action: CommandAction,
}

impl ConCommand {
    /// Create a native command with the given name and handler.
    pub fn new<F>(name: impl Into<Box<str>>, handler: F) -> Self
    where
        F: Fn(&CommandArgs, &mut Console) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            help: String::new(),
            flags: ConVarFlags::empty(),
            action: CommandAction::Native(Arc::new(handler)),
        }
    }

    /// Create a template command.
    pub fn template(name: impl Into<Box<str>>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: String::new(),
            flags: ConVarFlags::empty(),
            action: CommandAction::Template(text.into()),
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

    /// Get the command name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the help text.
    #[inline]
    pub fn get_help(&self) -> &str {
        &self.help
    }

    /// Get the flags.
    #[inline]
    pub fn get_flags(&self) -> ConVarFlags {
        self.flags
    }

    /// Get the action.
    #[inline]
    pub fn action(&self) -> &CommandAction {
        &self.action
    }

    /// Whether this is a template command.
    #[inline]
    pub fn is_template(&self) -> bool {
        matches!(self.action, CommandAction::Template(_))
    }
}

/// Registry of console commands, keyed case-insensitively.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Trie<ConCommand>,
}

impl CommandRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a command. A taken name gives the command back untouched.
    pub fn insert(&mut self, command: ConCommand) -> Result<(), ConCommand> {
        let key = command.name().to_ascii_lowercase();
        if self.commands.contains(&key) {
            return Err(command);
        }
        self.commands.insert(&key, command);
        Ok(())
    }

    /// Remove a command by name.
    pub fn remove(&mut self, name: &str) -> Option<ConCommand> {
        self.commands.remove(&name.to_ascii_lowercase())
    }

    /// Get a command by name.
    pub fn get(&self, name: &str) -> Option<&ConCommand> {
        self.commands.get(&name.to_ascii_lowercase())
    }

    /// Check if a command exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Commands whose name starts with `prefix`, sorted by name.
    pub fn prefix_iter<'a>(
        &'a self,
        prefix: &str,
    ) -> impl Iterator<Item = &'a ConCommand> + Clone + use<'a> {
        self.commands
            .prefix_iter(&prefix.to_ascii_lowercase())
            .map(|(_, command)| command)
    }

    /// All commands, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &ConCommand> + Clone {
        self.commands.iter().map(|(_, command)| command)
    }

    /// Get the number of commands.
    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the registry is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
