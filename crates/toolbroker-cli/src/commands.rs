//! Line commands understood by the interactive loop

use toolbroker_core::McpServerConfig;

pub const HELP: &str = "\
Commands:
  /add <name> <command> [args...]  start a tool provider
  /remove <name>                   stop a tool provider
  /providers                       list active providers
  /tools [name]                    list tools (all providers, or one)
  /save                            write active providers to the config file
  /new                             start a fresh conversation
  /help                            show this help
  /quit                            exit
Anything else is sent as a chat message.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add(McpServerConfig),
    Remove(String),
    Providers,
    Tools(Option<String>),
    Save,
    NewSession,
    Help,
    Quit,
    Chat(String),
    Empty,
}

/// Parse one input line
///
/// Errors carry a usage message for the offending command.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    if !line.starts_with('/') {
        return Ok(Command::Chat(line.to_string()));
    }

    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let rest: Vec<&str> = words.collect();

    match (command, rest.as_slice()) {
        ("/add", [name, program, args @ ..]) => Ok(Command::Add(
            McpServerConfig::new(*name, *program).with_args(args.iter().copied()),
        )),
        ("/add", _) => Err("usage: /add <name> <command> [args...]".to_string()),
        ("/remove", [name]) => Ok(Command::Remove(name.to_string())),
        ("/remove", _) => Err("usage: /remove <name>".to_string()),
        ("/providers", []) => Ok(Command::Providers),
        ("/tools", []) => Ok(Command::Tools(None)),
        ("/tools", [name]) => Ok(Command::Tools(Some(name.to_string()))),
        ("/tools", _) => Err("usage: /tools [name]".to_string()),
        ("/save", []) => Ok(Command::Save),
        ("/new", []) => Ok(Command::NewSession),
        ("/help", _) => Ok(Command::Help),
        ("/quit" | "/exit", _) => Ok(Command::Quit),
        (other, _) => Err(format!("unknown command {} (try /help)", other)),
    }
}
