//! Line-oriented rendering of chat view snapshots.
//!
//! The renderer remembers what it already printed. New entries are appended;
//! a log revision change (history replay or clear) reprints the whole log.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use client::{ChatState, ChatView};

#[derive(Debug, Default)]
pub struct Renderer {
    state: Option<ChatState>,
    revision: Option<u64>,
    printed: usize,
}

impl Renderer {
    /// Lines to print for `view`, given everything rendered so far.
    pub fn render(&mut self, view: &ChatView) -> Vec<String> {
        let mut lines = Vec::new();

        if self.state != Some(view.state) {
            self.state = Some(view.state);
            lines.push(format!("-- {}", status_text(view)));
        }

        if self.revision != Some(view.revision) || view.messages.len() < self.printed {
            let redraw = self.revision.is_some();
            self.revision = Some(view.revision);
            self.printed = 0;
            if redraw && !view.messages.is_empty() {
                lines.push("-- history --".to_owned());
            }
        }

        lines.extend(view.messages[self.printed..].iter().map(client::state::chat::Message::display_line));
        self.printed = view.messages.len();
        lines
    }
}

/// One-line summary of the connection and room.
#[must_use]
pub fn status_text(view: &ChatView) -> String {
    match view.state {
        ChatState::Idle => "chat closed; /open to connect".to_owned(),
        ChatState::Connecting => view.banner.unwrap_or("connecting").to_owned(),
        ChatState::Connected => "connected; /join <name> to enter a room".to_owned(),
        ChatState::Joined => format!(
            "joined #{} as {}",
            view.room.as_deref().unwrap_or("?"),
            view.display_name.as_deref().unwrap_or("?"),
        ),
    }
}

/// Status line with the message badge, for `/status`.
#[must_use]
pub fn status_report(view: &ChatView) -> String {
    let badge = view.badge.as_deref().unwrap_or("0");
    format!("{} [{}] ({badge} messages)", status_text(view), view.state)
}
