//! Slash command parsing for the composer.

/// Parsed composer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/connect`
    Connect,
    /// `/disconnect`
    Disconnect,
    /// `/open <peer>`: open a conversation by peer id or name.
    Open {
        /// Peer id or display name.
        peer: String,
    },
    /// `/read <message-id>`
    Read {
        /// Message to mark read.
        message_id: String,
    },
    /// `/logout`
    Logout,
    /// `/quit`
    Quit,
    /// Plain text to send.
    Message {
        /// Text as typed.
        text: String,
    },
    /// Unrecognised `/command`.
    Unknown {
        /// Full input line.
        input: String,
    },
    /// Known command with wrong arguments.
    InvalidArgs {
        /// Command name without the slash.
        command: &'static str,
        /// What was wrong.
        error: &'static str,
    },
}

/// Parse a composer line.
///
/// Lines not starting with `/` are messages. `//text` escapes a leading
/// slash.
pub fn parse(input: &str) -> Command {
    let Some(rest) = input.strip_prefix('/') else {
        return Command::Message { text: input.to_string() };
    };
    if rest.starts_with('/') {
        return Command::Message { text: rest.to_string() };
    }

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();
    let extra = parts.next().is_some();

    match (name, arg, extra) {
        ("connect", None, _) => Command::Connect,
        ("disconnect", None, _) => Command::Disconnect,
        ("logout", None, _) => Command::Logout,
        ("quit" | "q", None, _) => Command::Quit,
        ("open", Some(peer), false) => Command::Open { peer: peer.to_string() },
        ("open", ..) => Command::InvalidArgs { command: "open", error: "usage: /open <peer>" },
        ("read", Some(id), false) => Command::Read { message_id: id.to_string() },
        ("read", ..) => {
            Command::InvalidArgs { command: "read", error: "usage: /read <message-id>" }
        },
        ("connect" | "disconnect" | "logout" | "quit" | "q", Some(_), _) => {
            Command::InvalidArgs { command: "command", error: "takes no arguments" }
        },
        _ => Command::Unknown { input: input.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(parse("hello there"), Command::Message { text: "hello there".into() });
    }

    #[test]
    fn double_slash_escapes() {
        assert_eq!(parse("//shrug"), Command::Message { text: "/shrug".into() });
    }

    #[test]
    fn commands_without_arguments() {
        assert_eq!(parse("/connect"), Command::Connect);
        assert_eq!(parse("/disconnect"), Command::Disconnect);
        assert_eq!(parse("/logout"), Command::Logout);
        assert_eq!(parse("/quit"), Command::Quit);
        assert_eq!(parse("/q"), Command::Quit);
        assert!(matches!(parse("/quit now"), Command::InvalidArgs { .. }));
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(parse("/open u42"), Command::Open { peer: "u42".into() });
        assert_eq!(parse("/read m1"), Command::Read { message_id: "m1".into() });
        assert!(matches!(parse("/open"), Command::InvalidArgs { command: "open", .. }));
        assert!(matches!(parse("/read a b"), Command::InvalidArgs { command: "read", .. }));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(parse("/dance"), Command::Unknown { input: "/dance".into() });
        assert_eq!(parse("/"), Command::Unknown { input: "/".into() });
    }
}
