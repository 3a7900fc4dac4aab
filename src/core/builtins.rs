//! Commands every console starts with.

use bevy::log::warn;

use super::convar::{leading_float, leading_int};
use super::{ConCommand, ConVarFlags, Console, LogLevel};

/// Flags that keep an entry out of the audit unless asked for.
const AUDIT_CHEAT: ConVarFlags = ConVarFlags::ANY_CHEAT;
const AUDIT_MASK: ConVarFlags = AUDIT_CHEAT
    .union(ConVarFlags::CONST)
    .union(ConVarFlags::READ_ONLY)
    .union(ConVarFlags::DEV_ONLY)
    .union(ConVarFlags::DEDI_ONLY);

pub(super) fn register(console: &mut Console) {
    let builtins = [
        ConCommand::new("wait_frames", |args, console| {
            let frames = leading_int(args.get_or(0, "")).0;
            console.queue.set_wait_frames(frames.clamp(0, i64::from(u32::MAX)) as u32);
        })
        .help(
            "Forces the console to wait for a given number of frames before the next deferred command is processed\n\
             Works only in deferred command mode",
        )
        .flags(ConVarFlags::BLOCK_FRAME),
        ConCommand::new("wait_seconds", |args, console| {
            let seconds = leading_float(args.get_or(0, ""));
            console.queue.set_wait_seconds(f64::from(seconds));
        })
        .help(
            "Forces the console to wait for a given number of seconds before the next deferred command is processed\n\
             Works only in deferred command mode",
        )
        .flags(ConVarFlags::BLOCK_FRAME),
        ConCommand::new("exec", exec).help("Executes a script; in deferred mode its lines are queued"),
        ConCommand::new("resetcvars", |_args, console| {
            let count = console.reset_resettable();
            console.print(format!("{} variables reset", count));
        })
        .help("Resets all cvars to their initial values"),
        ConCommand::new("bind", |args, console| {
            if args.len() < 2 {
                console.report(LogLevel::Warning, "Usage: bind <name> <command>");
                return;
            }
            let command = args.join_from(1, " ");
            console.binds.bind(&args[0], command);
        })
        .help("Binds a name to a command; the first binding wins"),
        ConCommand::new("audit_cvars", |args, console| {
            let mut include = ConVarFlags::empty();
            for arg in args.iter() {
                include |= match arg.to_ascii_lowercase().as_str() {
                    "cheat" => AUDIT_CHEAT,
                    "const" => ConVarFlags::CONST,
                    "readonly" => ConVarFlags::READ_ONLY,
                    "dev" => ConVarFlags::DEV_ONLY,
                    "dedi" => ConVarFlags::DEDI_ONLY,
                    _ => ConVarFlags::empty(),
                };
            }
            audit(console, include);
        })
        .help("Logs all console commands and cvars"),
        ConCommand::new("cvarlist", |args, console| {
            let prefix = args.get_or(0, "");
            let lines: Vec<String> = console
                .vars
                .prefix_iter(prefix)
                .filter(|(_, var)| !var.get_flags().contains(ConVarFlags::INVISIBLE))
                .map(|(_, var)| {
                    let modified = if var.get_flags().contains(ConVarFlags::MODIFIED) { "*" } else { "" };
                    format!("{}{} = \"{}\"", var.name(), modified, var.get_string())
                })
                .collect();

            let count = lines.len();
            for line in lines {
                console.print(line);
            }
            console.print(format!("{} convars", count));
        })
        .help("List console variables"),
        ConCommand::new("cvar_group_check", |args, console| {
            let Some(name) = args.get(0) else {
                console.report(LogLevel::Warning, "Usage: cvar_group_check <group>");
                return;
            };
            if let Err(err) = console.check_group(name) {
                console.report(LogLevel::Warning, &err.to_string());
            }
        })
        .help("Checks a cvar group against the live values and logs any difference"),
        ConCommand::new("echo", |args, console| {
            console.print(args.join(" "));
        })
        .help("Print text to console"),
        ConCommand::new("help", help).help("Show help for a command or variable, or list all commands"),
    ];

    for command in builtins {
        if let Err(e) = console.register_command(command) {
            warn!(target: "cvars", "built-in command not registered: {}", e);
        }
    }
}

fn exec(args: &super::CommandArgs, console: &mut Console) {
    let Some(name) = args.get(0) else {
        console.report(LogLevel::Warning, "Usage: exec <script>");
        return;
    };
    let script = match &console.scripts {
        Some(scripts) => scripts.read_script(name),
        None => None,
    };
    let Some(script) = script else {
        console.report(LogLevel::Warning, &format!("Script {} not found", name));
        return;
    };

    // Script lines inherit the silence of the exec statement
    let silent = console.silent > 0;
    if !silent {
        console.log(LogLevel::Info, &format!("Executing script {}", name));
    }
    for line in script.lines() {
        console.execute_string(line, silent, false);
    }
}

fn help(args: &super::CommandArgs, console: &mut Console) {
    let Some(name) = args.get(0) else {
        let names: Vec<String> = console
            .commands
            .iter()
            .filter(|command| !command.get_flags().contains(ConVarFlags::INVISIBLE))
            .map(|command| format!("  {}", command.name()))
            .collect();
        console.print("Commands:");
        for name in names {
            console.print(name);
        }
        console.print("Use 'help <name>' for details, 'cvarlist' for variables");
        return;
    };

    if let Some(command) = console.command(name) {
        let (name, text) = (command.name().to_string(), command.get_help().to_string());
        console.print_help(&name, &text);
    } else if let Some(handle) = console.lookup(name) {
        let help = console.var(handle).map(|var| var.get_help().to_string()).unwrap_or_default();
        if let Some(line) = console.describe_var(handle) {
            console.print(line);
        }
        console.print_help(name, &help);
    } else {
        console.report(LogLevel::Warning, &format!("Unknown command or variable: {}", name));
    }
}

/// Log every command and variable, skipping entries whose only special
/// flags are outside `include`.
fn audit(console: &Console, include: ConVarFlags) {
    let exclude = AUDIT_MASK.difference(include);
    let listed = |special: ConVarFlags| special.is_empty() || !special.difference(exclude).is_empty();

    console.log(LogLevel::Info, "[CVARS]: [BEGIN AUDIT]");

    let mut commands = 0;
    for command in console.commands.iter() {
        let special = command.get_flags() & (AUDIT_CHEAT | ConVarFlags::DEV_ONLY | ConVarFlags::DEDI_ONLY);
        if listed(special) {
            console.log(
                LogLevel::Info,
                &format!("[CVARS]: [COMMAND] {}{}", command.name(), audit_markers(special)),
            );
            commands += 1;
        }
    }

    let mut variables = 0;
    for (_, var) in console.vars.iter() {
        let special = var.get_flags() & AUDIT_MASK;
        if listed(special) {
            console.log(
                LogLevel::Info,
                &format!("[CVARS]: [VARIABLE] {}{}", var.name(), audit_markers(special)),
            );
            variables += 1;
        }
    }

    console.log(
        LogLevel::Info,
        &format!(
            "[CVARS]: [END AUDIT] (commands {}/{}; variables {}/{})",
            commands,
            console.commands.len(),
            variables,
            console.vars.len()
        ),
    );
}

fn audit_markers(flags: ConVarFlags) -> String {
    const MARKERS: [(ConVarFlags, &str); 5] = [
        (AUDIT_CHEAT, " [VF_CHEAT]"),
        (ConVarFlags::CONST, " [VF_CONST_CVAR]"),
        (ConVarFlags::READ_ONLY, " [VF_READONLY]"),
        (ConVarFlags::DEV_ONLY, " [VF_DEV_ONLY]"),
        (ConVarFlags::DEDI_ONLY, " [VF_DEDI_ONLY]"),
    ];

    MARKERS
        .iter()
        .filter(|(flag, _)| flags.intersects(*flag))
        .map(|(_, marker)| *marker)
        .collect()
}
