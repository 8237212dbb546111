//! Message view model: the ordered, append-only chat log.
//!
//! DESIGN
//! ======
//! Entries are kept in insertion order, never sorted by timestamp. The only
//! operation that changes earlier entries is `replace_all`, which swaps the
//! whole log for a server history snapshot. Own/remote classification is
//! decided once, when a record is turned into a [`Message`], by comparing
//! connection identifiers; display names are never consulted.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use std::collections::HashSet;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, warn};

use crate::net::types::{Signal, WireMessage};

/// Author shown on locally synthesized notices.
pub const SYSTEM_AUTHOR: &str = "System";
/// Display name the backend uses for its AI assistant.
pub const AI_AUTHOR: &str = "AI Support";

const BADGE_CAP: usize = 99;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    UserMessage,
    SystemNotice,
    AiResponse,
    ErrorNotice,
}

impl MessageKind {
    /// Map the wire `type` field. Missing or unknown types are user messages.
    #[must_use]
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            None | Some("user_message") => Self::UserMessage,
            Some("system") => Self::SystemNotice,
            Some("ai_response") => Self::AiResponse,
            Some("error") => Self::ErrorNotice,
            Some(other) => {
                debug!(kind = other, "chat: unknown message type; treating as user message");
                Self::UserMessage
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Own,
    Remote,
}

/// One chat-log entry. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub author: String,
    pub body: String,
    pub timestamp: OffsetDateTime,
    pub kind: MessageKind,
    pub origin: Origin,
}

impl Message {
    /// Build a log entry from a delivered record.
    ///
    /// The message is [`Origin::Own`] only when both the record's author id
    /// and `own_session_id` are known and equal.
    #[must_use]
    pub fn from_wire(wire: WireMessage, own_session_id: Option<&str>) -> Self {
        let origin = match (wire.author_id.as_deref(), own_session_id) {
            (Some(author), Some(own)) if author == own => Origin::Own,
            _ => Origin::Remote,
        };
        Self {
            kind: MessageKind::from_wire(wire.kind.as_deref()),
            timestamp: parse_timestamp(wire.timestamp.as_deref()),
            id: wire.id,
            author: wire.username,
            body: wire.body,
            origin,
        }
    }

    /// A locally synthesized notice with a fresh `local-` identifier.
    #[must_use]
    pub fn notice(text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            author: SYSTEM_AUTHOR.to_owned(),
            body: text.into(),
            timestamp: OffsetDateTime::now_utc(),
            kind,
            origin: Origin::Remote,
        }
    }

    #[must_use]
    pub fn is_own(&self) -> bool {
        self.origin == Origin::Own
    }

    #[must_use]
    pub fn is_ai(&self) -> bool {
        self.kind == MessageKind::AiResponse || self.author == AI_AUTHOR
    }

    /// `HH:MM` in UTC.
    #[must_use]
    pub fn clock(&self) -> String {
        self.timestamp
            .format(format_description!("[hour]:[minute]"))
            .unwrap_or_else(|_| "--:--".to_owned())
    }

    /// Single-line rendering used by text front-ends.
    #[must_use]
    pub fn display_line(&self) -> String {
        let clock = self.clock();
        match self.kind {
            MessageKind::SystemNotice => format!("[{clock}] * {}", self.body),
            MessageKind::ErrorNotice => format!("[{clock}] ! {}", self.body),
            _ if self.is_own() => format!("[{clock}] {} (you): {}", self.author, self.body),
            _ if self.is_ai() => format!("[{clock}] [AI] {}: {}", self.author, self.body),
            _ => format!("[{clock}] {}: {}", self.author, self.body),
        }
    }
}

/// Text of the notice appended for a pushed trading signal.
#[must_use]
pub fn signal_notice_text(signal: &Signal) -> String {
    format!(
        "New {} signal: {} {} ({:.1}% confidence)",
        signal.tier, signal.direction, signal.asset, signal.confidence
    )
}

/// Parse a backend timestamp, falling back to the local receive time.
///
/// Accepts RFC 3339 and naive ISO-8601 date-times (read as UTC).
#[must_use]
pub fn parse_timestamp(raw: Option<&str>) -> OffsetDateTime {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return OffsetDateTime::now_utc();
    };
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return ts;
    }
    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");
    if let Ok(ts) = PrimitiveDateTime::parse(raw, naive) {
        return ts.assume_utc();
    }
    debug!(raw, "chat: unparseable timestamp; using receive time");
    OffsetDateTime::now_utc()
}

/// Ordered chat log with unique identifiers.
#[derive(Clone, Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    ids: HashSet<String>,
    revision: u64,
}

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry. Returns `false` when the identifier is already
    /// present, in which case the log is unchanged.
    pub fn append(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id.clone()) {
            debug!(id = %message.id, "chat: duplicate message ignored");
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Atomically replace the whole log with `messages`, in their order.
    ///
    /// A repeated identifier keeps its first occurrence.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        let mut ids = HashSet::with_capacity(messages.len());
        let mut kept = Vec::with_capacity(messages.len());
        for message in messages {
            if ids.insert(message.id.clone()) {
                kept.push(message);
            } else {
                warn!(id = %message.id, "chat: duplicate id in history dropped");
            }
        }
        self.messages = kept;
        self.ids = ids;
        self.bump_revision();
    }

    /// Append a locally synthesized notice and return it.
    pub fn append_system(&mut self, text: impl Into<String>, kind: MessageKind) -> &Message {
        let message = Message::notice(text, kind);
        self.ids.insert(message.id.clone());
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.ids.clear();
        self.bump_revision();
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Bumped whenever earlier entries change (replace or clear), so a
    /// renderer knows to redraw instead of appending.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Count label for the collapsed widget button, `None` when empty.
    #[must_use]
    pub fn badge_label(&self) -> Option<String> {
        match self.messages.len() {
            0 => None,
            n if n > BADGE_CAP => Some(format!("{BADGE_CAP}+")),
            n => Some(n.to_string()),
        }
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
