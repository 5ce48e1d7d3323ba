// src/irc/message.rs
//! The small slice of the IRC line protocol the bridge speaks.

use std::fmt;

pub const RPL_WELCOME: &str = "001";
pub const RPL_ENDOFMOTD: &str = "376";
pub const ERR_NOMOTD: &str = "422";

/// Classified inbound line. Anything the bridge does not react to is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Ping { token: String },
    /// Registration accepted (001).
    Welcome,
    /// Handshake complete (376 end of MOTD, or 422 no MOTD).
    MotdDone,
    Join { nick: String, channel: String },
    Error { reason: String },
    Other,
}

impl Inbound {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let parts: Vec<&str> = line.split(' ').filter(|p| !p.is_empty()).collect();
        let Some(first) = parts.first() else {
            return Inbound::Other;
        };

        // PING and ERROR may arrive with or without a server prefix.
        let verb_at = usize::from(first.starts_with(':'));
        if let Some(verb) = parts.get(verb_at) {
            let rest = || parts[verb_at + 1..].join(" ").trim_start_matches(':').to_string();
            match *verb {
                "PING" => return Inbound::Ping { token: rest() },
                "ERROR" => return Inbound::Error { reason: rest() },
                _ => {}
            }
        }

        if !first.starts_with(':') || parts.len() < 2 {
            return Inbound::Other;
        }
        match parts[1] {
            RPL_WELCOME => Inbound::Welcome,
            RPL_ENDOFMOTD | ERR_NOMOTD => Inbound::MotdDone,
            "JOIN" if parts.len() >= 3 => {
                let nick = first[1..].split('!').next().unwrap_or_default();
                let channel = parts[2].trim_start_matches(':');
                if nick.is_empty() || channel.is_empty() {
                    return Inbound::Other;
                }
                Inbound::Join {
                    nick: nick.to_string(),
                    channel: channel.to_string(),
                }
            }
            _ => Inbound::Other,
        }
    }
}

/// Outbound command. `Display` yields the wire form without terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Nick(String),
    User { user: String, realname: String },
    Join(String),
    Pong(String),
    Privmsg { target: String, text: String },
    Identify { password: String },
    Quit(String),
}

impl Command {
    pub fn user_for(nick: &str) -> Self {
        Command::User {
            user: nick.to_string(),
            realname: nick.to_string(),
        }
    }

    /// Wire form with credentials masked, for logs.
    pub fn redacted(&self) -> String {
        match self {
            Command::Identify { .. } => "PRIVMSG NickServ :IDENTIFY ****".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Nick(n) => write!(f, "NICK {n}"),
            Command::User { user, realname } => write!(f, "USER {user} 0 * :{realname}"),
            Command::Join(ch) => write!(f, "JOIN {ch}"),
            Command::Pong(token) => write!(f, "PONG {token}"),
            Command::Privmsg { target, text } => write!(f, "PRIVMSG {target} :{text}"),
            Command::Identify { password } => write!(f, "PRIVMSG NickServ :IDENTIFY {password}"),
            Command::Quit(reason) => write!(f, "QUIT :{reason}"),
        }
    }
}
