//! Argument substitution for template commands.
//!
//! A template uses exactly one placeholder style, checked in this order:
//!
//! - `%%` becomes every argument, each quoted, joined with `,`
//! - `%line` becomes the whole text after the command name as one quoted token
//! - `%1`..`%9` become the positional arguments, quoted
//!
//! Positional templates must consume exactly the arguments given.

use super::ConsoleError;

/// Expand `template` with the statement's tokens.
///
/// `tokens` starts with the command name; `statement` is the raw statement
/// the tokens came from.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::expand_template;
///
/// let out = expand_template("bind %1 %2", &["alias", "w", "forward"], "alias w forward");
/// assert_eq!(out.unwrap(), r#"bind "w" "forward""#);
/// ```
pub fn expand_template(template: &str, tokens: &[&str], statement: &str) -> Result<String, ConsoleError> {
    let name = tokens.first().copied().unwrap_or_default();
    let args = tokens.get(1..).unwrap_or_default();
    let mut out = template.to_string();

    if let Some(pos) = out.find("%%") {
        let list = args
            .iter()
            .map(|arg| format!("\"{}\"", arg))
            .collect::<Vec<_>>()
            .join(",");
        out.replace_range(pos..pos + 2, &list);
        return Ok(out);
    }

    if let Some(pos) = out.find("%line") {
        let line = if args.is_empty() {
            String::new()
        } else {
            let rest = statement.split_once(' ').map_or(statement, |(_, rest)| rest);
            format!("\"{}\"", rest)
        };
        out.replace_range(pos..pos + 5, &line);
        return Ok(out);
    }

    let count = tokens.len();
    for i in 1..=count {
        let placeholder = format!("%{}", i);
        match out.find(&placeholder) {
            None if i != count => return Err(malformed(name, "Too many arguments")),
            None => {}
            Some(_) if i == count => return Err(malformed(name, "Not enough arguments")),
            Some(pos) => {
                let arg = format!("\"{}\"", tokens[i]);
                out.replace_range(pos..pos + placeholder.len(), &arg);
            }
        }
    }
    Ok(out)
}

fn malformed(command: &str, reason: &'static str) -> ConsoleError {
    ConsoleError::MalformedSubstitution {
        command: command.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional() {
        let out = expand_template("give %1 %2", &["g", "ammo", "50"], "g ammo 50").unwrap();
        assert_eq!(out, r#"give "ammo" "50""#);
    }

    #[test]
    fn test_positional_out_of_order() {
        let out = expand_template("swap %2 %1", &["s", "a", "b"], "s a b").unwrap();
        assert_eq!(out, r#"swap "b" "a""#);
    }

    #[test]
    fn test_too_many_arguments() {
        let err = expand_template("kick %1", &["k", "bob", "extra"], "k bob extra").unwrap_err();
        assert_eq!(err.to_string(), "Too many arguments for: k");
    }

    #[test]
    fn test_not_enough_arguments() {
        let err = expand_template("bind %1 %2", &["alias", "w"], "alias w").unwrap_err();
        assert_eq!(err.to_string(), "Not enough arguments for: alias");
    }

    #[test]
    fn test_no_placeholders_no_args() {
        let out = expand_template("r_fog 0; r_ssao 0", &["lowfx"], "lowfx").unwrap();
        assert_eq!(out, "r_fog 0; r_ssao 0");
    }

    #[test]
    fn test_all_args_list() {
        let out = expand_template("call(%%)", &["c", "a", "b c"], r#"c a "b c""#).unwrap();
        assert_eq!(out, r#"call("a","b c")"#);

        let out = expand_template("call(%%)", &["c"], "c").unwrap();
        assert_eq!(out, "call()");
    }

    #[test]
    fn test_line() {
        let out = expand_template("say %line", &["s", "hello", "there"], "s hello there").unwrap();
        assert_eq!(out, r#"say "hello there""#);

        let out = expand_template("say %line", &["s"], "s").unwrap();
        assert_eq!(out, "say ");
    }
}
