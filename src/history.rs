//! # Conversation history
//! Session-local record of user/bot exchanges for the chatbot-style hosts of
//! the pipeline. Owned by one session; sharing it across concurrent callers
//! needs external synchronization. History lives in memory until it is
//! cleared or explicitly saved to a flat text file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Local};

use crate::render::Message;
use crate::template::Role;

/// One user/bot exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub user: String,
    pub bot: String,
}

/// In-memory, ordered conversation history for one session.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
    context_window: usize,
}

/// Exchanges included when rendering context for the next model call.
pub const DEFAULT_CONTEXT_WINDOW: usize = 5;

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self { entries: Vec::new(), context_window: DEFAULT_CONTEXT_WINDOW }
    }

    /// Sets how many of the most recent exchanges [Self::context_messages]
    /// renders.
    pub fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = window;
        self
    }

    /// Appends an exchange, timestamped now.
    pub fn record(&mut self, user: impl Into<String>, bot: impl Into<String>) {
        self.entries.push(HistoryEntry {
            timestamp: Local::now(),
            user: user.into(),
            bot: bot.into(),
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Renders the last few exchanges as alternating user/assistant messages,
    /// oldest first, so the model sees the recent conversation.
    pub fn context_messages(&self) -> Vec<Message> {
        let skip = self.entries.len().saturating_sub(self.context_window);
        self.entries[skip..]
            .iter()
            .flat_map(|entry| {
                [
                    Message { role: Role::User, content: entry.user.clone() },
                    Message { role: Role::Assistant, content: entry.bot.clone() },
                ]
            })
            .collect()
    }

    /// Writes the whole history to a flat text file: timestamp line, user
    /// line, bot line, dash delimiter per entry.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for entry in &self.entries {
            writeln!(writer, "[{}]", entry.timestamp.to_rfc3339())?;
            writeln!(writer, "User: {}", entry.user)?;
            writeln!(writer, "Bot: {}", entry.bot)?;
            writeln!(writer, "{}", "-".repeat(60))?;
        }
        writer.flush()
    }
}
