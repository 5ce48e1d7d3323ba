// src/irc/machine.rs
//! Connection state machine without any I/O.
//!
//! The session driver feeds it events (connect, line, link lost) and executes
//! the returned [`Step`]: lines to send, whether to arm the poll timer, and
//! whether the server asked to close.

use std::sync::Arc;

use crate::config::BotSettings;
use crate::irc::message::{Command, Inbound};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Handshaking,
    Joined,
    /// Handshake complete, poll timer armed.
    Active,
    Reconnecting,
}

impl SessionState {
    pub fn is_registered(self) -> bool {
        matches!(self, SessionState::Joined | SessionState::Active)
    }
}

/// What the driver must do after an event.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub outbound: Vec<Command>,
    pub arm_poller: bool,
    /// Server sent ERROR; the connection is over.
    pub closed_by_server: Option<String>,
}

pub struct SessionMachine {
    settings: Arc<BotSettings>,
    state: SessionState,
    activated: bool,
}

impl SessionMachine {
    pub fn new(settings: Arc<BotSettings>) -> Self {
        Self {
            settings,
            state: SessionState::Disconnected,
            activated: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the current connection has reached `Active`.
    pub fn activated(&self) -> bool {
        self.activated
    }

    pub fn begin_connect(&mut self) {
        self.state = SessionState::Connecting;
        self.activated = false;
    }

    /// Transport is up: identify immediately, without waiting for the server.
    pub fn on_connected(&mut self) -> Vec<Command> {
        self.state = SessionState::Handshaking;
        let nick = &self.settings.irc.nick;
        vec![Command::Nick(nick.clone()), Command::user_for(nick)]
    }

    pub fn on_line(&mut self, line: &str) -> Step {
        match Inbound::parse(line) {
            Inbound::Ping { token } => self.on_ping(token),
            Inbound::Welcome => self.on_welcome(),
            Inbound::MotdDone => self.on_motd_done(),
            Inbound::Join { nick, channel } => self.on_join(&nick, &channel),
            Inbound::Error { reason } => Step {
                closed_by_server: Some(reason),
                ..Step::default()
            },
            Inbound::Other => Step::default(),
        }
    }

    pub fn on_link_lost(&mut self) {
        self.state = SessionState::Reconnecting;
        self.activated = false;
    }

    pub fn on_fatal(&mut self) {
        self.state = SessionState::Disconnected;
        self.activated = false;
    }

    fn on_ping(&self, token: String) -> Step {
        Step {
            outbound: vec![Command::Pong(token)],
            ..Step::default()
        }
    }

    fn on_welcome(&mut self) -> Step {
        if self.state != SessionState::Handshaking {
            return Step::default();
        }
        self.state = SessionState::Joined;
        Step {
            outbound: self
                .settings
                .irc
                .channels
                .iter()
                .map(|c| Command::Join(c.clone()))
                .collect(),
            ..Step::default()
        }
    }

    fn on_motd_done(&mut self) -> Step {
        if self.state != SessionState::Joined || self.activated {
            return Step::default();
        }
        self.state = SessionState::Active;
        self.activated = true;

        let password = &self.settings.irc.nickserv_password;
        let outbound = if password.is_empty() {
            Vec::new()
        } else {
            vec![Command::Identify {
                password: password.clone(),
            }]
        };
        Step {
            outbound,
            arm_poller: true,
            closed_by_server: None,
        }
    }

    fn on_join(&self, nick: &str, channel: &str) -> Step {
        let irc = &self.settings.irc;
        if !self.state.is_registered()
            || irc.greeting.is_empty()
            || nick.eq_ignore_ascii_case(&irc.nick)
            || channel.eq_ignore_ascii_case(&irc.announce_channel)
        {
            return Step::default();
        }
        Step {
            outbound: vec![Command::Privmsg {
                target: channel.to_string(),
                text: irc.greeting.replace("{nick}", nick),
            }],
            ..Step::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Arc<BotSettings> {
        let s = r##"
[irc]
server = "irc.example.net"
nick = "announceBot"
channels = ["#announce", "#lobby"]
announce_channel = "#announce"
nickserv_password = "sekrit"

[source]
kind = "api"
base_url = "https://tracker.example"
api_token = "t"
"##;
        Arc::new(BotSettings::from_toml_str(s).unwrap())
    }

    #[test]
    fn duplicate_numerics_do_not_rejoin_or_rearm() {
        let mut m = SessionMachine::new(settings());
        m.begin_connect();
        m.on_connected();
        assert_eq!(m.on_line(":s 001 announceBot :hi").outbound.len(), 2);
        assert!(m.on_line(":s 376 announceBot :end").arm_poller);

        assert_eq!(m.on_line(":s 001 announceBot :hi"), Step::default());
        assert_eq!(m.on_line(":s 376 announceBot :end"), Step::default());
        assert_eq!(m.state(), SessionState::Active);
    }

    #[test]
    fn motd_before_welcome_is_ignored() {
        let mut m = SessionMachine::new(settings());
        m.begin_connect();
        m.on_connected();
        assert_eq!(m.on_line(":s 376 announceBot :end"), Step::default());
        assert_eq!(m.state(), SessionState::Handshaking);
    }

    #[test]
    fn joins_before_registration_are_not_greeted() {
        let mut m = SessionMachine::new(settings());
        m.begin_connect();
        m.on_connected();
        assert!(m.on_line(":alice!a@h JOIN :#lobby").outbound.is_empty());
    }

    #[test]
    fn link_loss_clears_activation() {
        let mut m = SessionMachine::new(settings());
        m.begin_connect();
        m.on_connected();
        m.on_line(":s 001 announceBot :hi");
        m.on_line(":s 376 announceBot :end");
        assert!(m.activated());
        m.on_link_lost();
        assert_eq!(m.state(), SessionState::Reconnecting);
        assert!(!m.activated());
    }
}
