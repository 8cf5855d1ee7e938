use std::collections::VecDeque;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The peer went away. The conversation owning this channel is abandoned
    /// with no persisted partial state.
    #[error("channel disconnected")]
    Disconnected,
    #[error("channel transport failed: {0}")]
    Transport(String),
}

/// Duplex text channel the engine converses over. One logical conversation
/// per channel; reads and writes are decoupled in time but never overlap
/// within a conversation.
#[async_trait]
pub trait Channel: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), ChannelError>;
    async fn recv_text(&self) -> Result<String, ChannelError>;
}

/// In-memory channel with a scripted inbound queue and a recorded outbound
/// log. Drains replies in order; an exhausted script reads as a disconnect.
#[derive(Default)]
pub struct ScriptedChannel {
    state: Mutex<ScriptedState>,
}

#[derive(Default)]
struct ScriptedState {
    replies: VecDeque<Result<String, ChannelError>>,
    sent: Vec<String>,
}

impl ScriptedChannel {
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Mutex::new(ScriptedState {
                replies: replies.into_iter().map(|reply| Ok(reply.into())).collect(),
                sent: Vec::new(),
            }),
        }
    }

    pub fn with_script(replies: Vec<Result<String, ChannelError>>) -> Self {
        Self {
            state: Mutex::new(ScriptedState { replies: replies.into(), sent: Vec::new() }),
        }
    }

    pub async fn sent(&self) -> Vec<String> {
        self.state.lock().await.sent.clone()
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn send_text(&self, text: &str) -> Result<(), ChannelError> {
        self.state.lock().await.sent.push(text.to_string());
        Ok(())
    }

    async fn recv_text(&self) -> Result<String, ChannelError> {
        self.state.lock().await.replies.pop_front().unwrap_or(Err(ChannelError::Disconnected))
    }
}

#[cfg(test)]
mod tests {
    use super::{Channel, ChannelError, ScriptedChannel};

    #[tokio::test]
    async fn scripted_channel_replays_in_order_then_disconnects() {
        let channel = ScriptedChannel::with_replies(["first", "second"]);

        assert_eq!(channel.recv_text().await, Ok("first".to_string()));
        assert_eq!(channel.recv_text().await, Ok("second".to_string()));
        assert_eq!(channel.recv_text().await, Err(ChannelError::Disconnected));
    }

    #[tokio::test]
    async fn sends_are_recorded() {
        let channel = ScriptedChannel::default();
        channel.send_text("hello").await.expect("send should succeed");
        channel.send_text("world").await.expect("send should succeed");

        assert_eq!(channel.sent().await, vec!["hello", "world"]);
    }
}
