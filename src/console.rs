//! Line-based operator console.

pub const HELP: &str = "commands: go | stop | status | symbol <SYMBOL> | flatten | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Go,
    Stop,
    Status,
    Symbol(String),
    Flatten,
    Help,
    Quit,
}

/// Parse one console line. Blank lines parse to `None`; a leading `/` is
/// accepted so chat-style commands work too.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };

    let command = match word.to_lowercase().as_str() {
        "go" | "start" => ConsoleCommand::Go,
        "stop" => ConsoleCommand::Stop,
        "status" => ConsoleCommand::Status,
        "symbol" => match words.next() {
            Some(symbol) => ConsoleCommand::Symbol(symbol.to_uppercase()),
            None => return Err("usage: symbol <SYMBOL>".to_string()),
        },
        "flatten" | "close" => ConsoleCommand::Flatten,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{}'; {}", other, HELP)),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("go"), Ok(Some(ConsoleCommand::Go)));
        assert_eq!(parse("  /STOP "), Ok(Some(ConsoleCommand::Stop)));
        assert_eq!(
            parse("symbol ethusdt"),
            Ok(Some(ConsoleCommand::Symbol("ETHUSDT".into())))
        );
        assert_eq!(parse("flatten"), Ok(Some(ConsoleCommand::Flatten)));
        assert_eq!(parse(""), Ok(None));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("symbol").is_err());
        assert!(parse("buy 1 btc").unwrap_err().contains("unknown command 'buy'"));
    }
}
