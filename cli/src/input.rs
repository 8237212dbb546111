//! Parsing of interactive input lines.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

pub const HELP: &str = "\
commands:
  /join <name> [room]        join a room (default room from config)
  /signal [asset] [timeframe] request a signal update (default EURUSD 1m)
  /open                      open the chat widget
  /close                     close the chat widget and clear the log
  /status                    show connection state
  /help                      show this help
  /quit                      exit
anything else is sent as a chat message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Join { name: String, room: Option<String> },
    Signal { asset: Option<String>, timeframe: Option<String> },
    Open,
    Close,
    Status,
    Help,
    Quit,
    Message(String),
    /// A `/command` that was not recognized or is missing arguments.
    Invalid(String),
    Empty,
}

impl Input {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(line.to_owned());
        };

        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let mut arg = || words.next().map(str::to_owned);
        match name {
            "join" => match arg() {
                Some(name) => Self::Join { name, room: arg() },
                None => Self::Invalid("usage: /join <name> [room]".to_owned()),
            },
            "signal" => Self::Signal { asset: arg(), timeframe: arg() },
            "open" => Self::Open,
            "close" => Self::Close,
            "status" => Self::Status,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Invalid(format!("unknown command `/{other}`; try /help")),
        }
    }
}
