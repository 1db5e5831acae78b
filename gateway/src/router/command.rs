//! Parsing of router prompts into commands.
//!
//! The prompt doubles as a command channel: a shutdown keyword, a looped
//! exchange prefix, and an embedded relay flag. All of that is decided here,
//! before any business logic runs.

use crate::error::{Error, Result};

/// Substring (case-insensitive) that turns a prompt into a shutdown command.
pub const SHUTDOWN_KEYWORD: &str = "shutdown";
/// First token of a looped exchange: `chatBot <count> <message...>`.
pub const LOOP_KEYWORD: &str = "chatBot";
/// Token asking a second model to answer the first one.
pub const RELAY_FLAG: &str = "2ai";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Shutdown,
    Loop { rounds: u32, message: String },
    Relay { prompt: String },
    Single { prompt: String },
}

impl Command {
    /// Classify `prompt`. Shutdown wins over everything else.
    pub fn parse(prompt: &str, max_rounds: u32) -> Result<Self> {
        if prompt.to_lowercase().contains(SHUTDOWN_KEYWORD) {
            return Ok(Command::Shutdown);
        }

        if prompt.split(' ').next() == Some(LOOP_KEYWORD) {
            return parse_loop(prompt, max_rounds);
        }

        if prompt.contains(RELAY_FLAG) {
            Ok(Command::Relay {
                prompt: strip_relay_flag(prompt),
            })
        } else {
            Ok(Command::Single {
                prompt: prompt.trim().to_string(),
            })
        }
    }
}

fn parse_loop(prompt: &str, max_rounds: u32) -> Result<Command> {
    let syntax_error =
        || Error::InvalidRequest("Invalid chatBot syntax. Use: chatBot <count> <prompt>".to_string());

    let mut parts = prompt.splitn(3, ' ');
    let _keyword = parts.next();
    let count = parts.next().ok_or_else(syntax_error)?;
    let message = parts.next().ok_or_else(syntax_error)?;

    let rounds: u32 = count.parse().map_err(|_| syntax_error())?;
    if rounds > max_rounds {
        return Err(Error::InvalidRequest(format!(
            "chatBot count {} exceeds the maximum of {}",
            rounds, max_rounds
        )));
    }

    Ok(Command::Loop {
        rounds,
        message: message.to_string(),
    })
}

/// Remove every relay flag and the whitespace around it.
fn strip_relay_flag(prompt: &str) -> String {
    prompt
        .split(RELAY_FLAG)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(prompt: &str) -> Result<Command> {
        Command::parse(prompt, 50)
    }

    #[test]
    fn test_single() {
        assert_eq!(
            parse("  tell me a joke ").unwrap(),
            Command::Single {
                prompt: "tell me a joke".to_string()
            }
        );
    }

    #[test]
    fn test_shutdown_is_case_insensitive() {
        assert_eq!(parse("SHUTDOWN now").unwrap(), Command::Shutdown);
        assert_eq!(parse("please Shutdown").unwrap(), Command::Shutdown);
    }

    #[test]
    fn test_shutdown_takes_precedence() {
        assert_eq!(parse("chatBot 3 shutdown").unwrap(), Command::Shutdown);
        assert_eq!(parse("2ai shutdown").unwrap(), Command::Shutdown);
        assert_eq!(parse("chatBot x shutdown").unwrap(), Command::Shutdown);
    }

    #[test]
    fn test_loop() {
        assert_eq!(
            parse("chatBot 2 hello there").unwrap(),
            Command::Loop {
                rounds: 2,
                message: "hello there".to_string()
            }
        );
    }

    #[test]
    fn test_loop_keeps_message_spacing() {
        assert_eq!(
            parse("chatBot 1 a  b").unwrap(),
            Command::Loop {
                rounds: 1,
                message: "a  b".to_string()
            }
        );
    }

    #[test]
    fn test_loop_syntax_errors() {
        assert!(matches!(parse("chatBot"), Err(Error::InvalidRequest(_))));
        assert!(matches!(parse("chatBot 2"), Err(Error::InvalidRequest(_))));
        assert!(matches!(parse("chatBot two hi"), Err(Error::InvalidRequest(_))));
        assert!(matches!(parse("chatBot -1 hi"), Err(Error::InvalidRequest(_))));
        assert!(matches!(parse("chatBot  2 hi"), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_loop_round_limit() {
        assert!(Command::parse("chatBot 5 hi", 5).is_ok());
        let err = Command::parse("chatBot 6 hi", 5).unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"));
    }

    #[test]
    fn test_loop_keyword_must_be_whole_token() {
        assert_eq!(
            parse("chatBots are fun").unwrap(),
            Command::Single {
                prompt: "chatBots are fun".to_string()
            }
        );
    }

    #[test]
    fn test_relay_flag_is_stripped() {
        assert_eq!(
            parse("tell me a joke 2ai").unwrap(),
            Command::Relay {
                prompt: "tell me a joke".to_string()
            }
        );
        assert_eq!(
            parse("2ai  hello 2ai world ").unwrap(),
            Command::Relay {
                prompt: "hello world".to_string()
            }
        );
    }

    #[test]
    fn test_relay_prompt_never_contains_flag() {
        for prompt in ["22aiai", "x2ai2aiy", "2ai", "a 2ai2ai b"] {
            match parse(prompt).unwrap() {
                Command::Relay { prompt } => assert!(!prompt.contains(RELAY_FLAG), "{prompt}"),
                other => panic!("expected relay, got {:?}", other),
            }
        }
    }
}
