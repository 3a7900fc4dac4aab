//! Tokenizer for console statements.
//!
//! A line holds statements separated by `;`, `\n` or `\r`. Inside a statement,
//! tokens are separated by spaces and a single- or double-quoted span is one
//! token with the quotes removed. There are no escape sequences: a quote always
//! opens or closes a span, and an unterminated span runs to the end of input.

/// Result of tokenizing a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedCommand<'a> {
    /// The command name (first token).
    pub command: &'a str,
    /// The arguments (remaining tokens).
    pub args: Vec<&'a str>,
    /// The raw statement.
    pub raw: &'a str,
}

/// Tokenize a statement into command name and arguments.
///
/// Returns `None` for a statement without tokens.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::tokenize;
///
/// let result = tokenize(r#"bind F1 "toggle sv_cheats""#).unwrap();
/// assert_eq!(result.command, "bind");
/// assert_eq!(result.args, vec!["F1", "toggle sv_cheats"]);
/// ```
pub fn tokenize(input: &str) -> Option<TokenizedCommand<'_>> {
    let mut tokens = tokenize_string(input).into_iter();
    let command = tokens.next()?;
    Some(TokenizedCommand {
        command,
        args: tokens.collect(),
        raw: input,
    })
}

/// Tokenize a string into individual tokens, including the command name.
pub fn tokenize_string(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            ' ' => continue,

            '"' | '\'' => {
                let content_start = start + 1;
                let mut end = input.len();

                for (i, ch) in chars.by_ref() {
                    if ch == c {
                        end = i;
                        break;
                    }
                }

                tokens.push(&input[content_start..end]);
            }

            _ => {
                let mut end = start + c.len_utf8();

                while let Some(&(i, ch)) = chars.peek() {
                    match ch {
                        ' ' | '"' | '\'' => break,
                        _ => {
                            end = i + ch.len_utf8();
                            chars.next();
                        }
                    }
                }

                tokens.push(&input[start..end]);
            }
        }
    }

    tokens
}

/// Split a line into statements.
///
/// Separators inside quotes are preserved; statements are trimmed and empty
/// ones dropped.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::split_commands;
///
/// let commands = split_commands("sv_cheats 1; noclip\ngod");
/// assert_eq!(commands, vec!["sv_cheats 1", "noclip", "god"]);
///
/// let commands = split_commands(r#"echo "hello; world"; quit"#);
/// assert_eq!(commands, vec![r#"echo "hello; world""#, "quit"]);
/// ```
pub fn split_commands(input: &str) -> Vec<&str> {
    let mut commands = Vec::new();
    let mut start = 0;
    let mut open_quote: Option<char> = None;

    for (i, c) in input.char_indices() {
        match (open_quote, c) {
            (Some(q), c) if c == q => open_quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => open_quote = Some(c),
            (None, ';' | '\n' | '\r') => {
                let cmd = input[start..i].trim();
                if !cmd.is_empty() {
                    commands.push(cmd);
                }
                start = i + 1;
            }
            (None, _) => {}
        }
    }

    let cmd = input[start..].trim();
    if !cmd.is_empty() {
        commands.push(cmd);
    }

    commands
}

/// Split a statement into its head and the text after the first `=` or space.
///
/// A remainder that starts with `=` after a space (as in `name = value`) loses
/// the `=`. The head is trimmed; the remainder is returned untouched.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::split_head;
///
/// assert_eq!(split_head("r_width=1024"), ("r_width", Some("1024")));
/// assert_eq!(split_head("r_width = 1024"), ("r_width", Some(" 1024")));
/// assert_eq!(split_head("quit"), ("quit", None));
/// ```
pub fn split_head(statement: &str) -> (&str, Option<&str>) {
    let Some(pos) = statement.find(['=', ' ']) else {
        return (statement.trim(), None);
    };

    let head = statement[..pos].trim();
    let mut rest = &statement[pos + 1..];
    if statement.as_bytes()[pos] == b' ' {
        if let Some(after) = rest.trim_start().strip_prefix('=') {
            rest = after;
        }
    }
    (head, Some(rest))
}

/// Strip whitespace and quote characters from both ends of a value.
pub fn strip_value(value: &str) -> &str {
    value.trim_matches([' ', '\t', '\r', '\n', '"', '\''])
}
