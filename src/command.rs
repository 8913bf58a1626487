//! Command dispatcher for the line protocol.
//!
//! Maps one trimmed input line to a response and a session action:
//! - Greetings: hello, bye
//! - Slash commands: /time, /quit, /echo
//! - Anything else falls through to the plain echo in the session loop.

use bytes::BytesMut;
use chrono::Local;

/// Recognized command tokens, matched case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// "hello" greeting
    Hello,

    /// "bye" farewell, closes the session
    Bye,

    /// "/time": current server time
    Time,

    /// "/quit": closes the session
    Quit,

    /// "/echo <message>": echo the remaining fields
    Echo { args: Vec<String> },

    /// Unrecognized "/"-prefixed command
    Unknown,

    /// Plain text, echoed back verbatim by the session loop
    Plain,
}

impl Command {
    /// Classify a trimmed, non-empty line.
    pub fn parse(line: &str) -> Command {
        match line.to_lowercase().as_str() {
            "hello" => return Command::Hello,
            "bye" => return Command::Bye,
            _ => {}
        }

        if line.starts_with('/') {
            let mut fields = line.split_whitespace();
            // split_whitespace on a non-empty line always yields a first field
            let cmd = fields.next().unwrap_or_default().to_lowercase();
            return match cmd.as_str() {
                "/time" => Command::Time,
                "/quit" => Command::Quit,
                "/echo" => Command::Echo {
                    args: fields.map(str::to_string).collect(),
                },
                _ => Command::Unknown,
            };
        }

        Command::Plain
    }
}

/// What the session loop should do after writing the response
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Continue,
    Terminate,
}

/// Result of dispatching one line: an optional newline-terminated response
/// and the follow-up action. A `None` response means the session loop echoes
/// the line itself.
#[derive(Debug)]
pub struct Dispatch {
    pub response: Option<BytesMut>,
    pub action: Action,
}

impl Dispatch {
    fn reply(text: &str, action: Action) -> Self {
        let mut buf = BytesMut::with_capacity(text.len() + 1);
        buf.extend_from_slice(text.as_bytes());
        buf.extend_from_slice(b"\n");
        Dispatch {
            response: Some(buf),
            action,
        }
    }

    fn fall_through() -> Self {
        Dispatch {
            response: None,
            action: Action::Continue,
        }
    }
}

/// Dispatch one trimmed, non-empty line. Pure except for reading the clock
/// for `/time`.
pub fn dispatch(line: &str) -> Dispatch {
    match Command::parse(line) {
        Command::Hello => Dispatch::reply("Hi there!", Action::Continue),
        Command::Bye => Dispatch::reply("Goodbye!", Action::Terminate),
        Command::Time => {
            let now = Local::now().to_rfc2822();
            Dispatch::reply(&format!("Current time: {}", now), Action::Continue)
        }
        Command::Quit => Dispatch::reply("Closing connection...", Action::Terminate),
        Command::Echo { args } => {
            if args.is_empty() {
                Dispatch::reply("Usage: /echo <message>", Action::Continue)
            } else {
                Dispatch::reply(&args.join(" "), Action::Continue)
            }
        }
        Command::Unknown => Dispatch::reply("Unknown command.", Action::Continue),
        Command::Plain => Dispatch::fall_through(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_text(d: &Dispatch) -> String {
        String::from_utf8(d.response.as_ref().expect("expected a response").to_vec()).unwrap()
    }

    #[test]
    fn test_parse_greetings_case_insensitive() {
        assert_eq!(Command::parse("hello"), Command::Hello);
        assert_eq!(Command::parse("HeLLo"), Command::Hello);
        assert_eq!(Command::parse("BYE"), Command::Bye);
    }

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(Command::parse("/time"), Command::Time);
        assert_eq!(Command::parse("/QUIT"), Command::Quit);
        assert_eq!(
            Command::parse("/echo foo bar"),
            Command::Echo {
                args: vec!["foo".to_string(), "bar".to_string()]
            }
        );
        assert_eq!(Command::parse("/frobnicate"), Command::Unknown);
    }

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(Command::parse("hello world"), Command::Plain);
        assert_eq!(Command::parse("just some text"), Command::Plain);
    }

    #[test]
    fn test_dispatch_hello() {
        let d = dispatch("hello");
        assert_eq!(response_text(&d), "Hi there!\n");
        assert_eq!(d.action, Action::Continue);
    }

    #[test]
    fn test_dispatch_bye_terminates() {
        let d = dispatch("bye");
        assert_eq!(response_text(&d), "Goodbye!\n");
        assert_eq!(d.action, Action::Terminate);
    }

    #[test]
    fn test_dispatch_quit_terminates() {
        let d = dispatch("/quit");
        assert_eq!(response_text(&d), "Closing connection...\n");
        assert_eq!(d.action, Action::Terminate);
    }

    #[test]
    fn test_dispatch_echo() {
        let d = dispatch("/echo foo   bar");
        assert_eq!(response_text(&d), "foo bar\n");
        assert_eq!(d.action, Action::Continue);
    }

    #[test]
    fn test_dispatch_echo_usage() {
        let d = dispatch("/echo");
        assert_eq!(response_text(&d), "Usage: /echo <message>\n");
        assert_eq!(d.action, Action::Continue);
    }

    #[test]
    fn test_dispatch_unknown_command() {
        let d = dispatch("/nope");
        assert_eq!(response_text(&d), "Unknown command.\n");
        assert_eq!(d.action, Action::Continue);
    }

    #[test]
    fn test_dispatch_time() {
        let d = dispatch("/time");
        assert!(response_text(&d).starts_with("Current time: "));
        assert_eq!(d.action, Action::Continue);
    }

    #[test]
    fn test_dispatch_plain_falls_through() {
        let d = dispatch("hello world");
        assert!(d.response.is_none());
        assert_eq!(d.action, Action::Continue);
    }
}
