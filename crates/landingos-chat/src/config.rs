use std::str::FromStr;

use chrono::{FixedOffset, Local};

/// What to do with a realtime insert authored by the current user that is
/// neither in the view nor pending. That happens when a send reported failure
/// although the write went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfEchoPolicy {
    /// Drop it and log a warning.
    #[default]
    Ignore,
    /// Fetch and append it like a remote message.
    RecoverUnmatched,
}

impl FromStr for SelfEchoPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "recover" | "recover-unmatched" => Ok(Self::RecoverUnmatched),
            other => Err(format!("unknown self-echo policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Most recent messages loaded per channel.
    pub message_limit: usize,
    pub self_echo: SelfEchoPolicy,
    /// Offset used to place messages on calendar days.
    pub local_offset: FixedOffset,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            message_limit: 100,
            self_echo: SelfEchoPolicy::default(),
            local_offset: *Local::now().offset(),
        }
    }
}
