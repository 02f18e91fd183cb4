//! In-process platform double for tests and local runs.
//!
//! Records every outbound call. DM channels are named `dm-<user id>`.
//! Channels can be made to fail and users can refuse DMs.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use weinbot_sdk::client::{CANNOT_MESSAGE_USER, MessageRef, RestError};
use weinbot_sdk::component::MessagePayload;

use crate::platform::Platform;

#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub channel_id: String,
    pub message_id: String,
    pub payload: MessagePayload,
}

#[derive(Default)]
struct Recorded {
    posts: Vec<Posted>,
    edits: Vec<Posted>,
    original_edits: Vec<(String, MessagePayload)>,
    blocked: HashSet<String>,
    failing: HashSet<String>,
    next_id: u64,
}

#[derive(Clone, Default)]
pub struct RecordingPlatform {
    inner: Arc<Mutex<Recorded>>,
}

fn unavailable() -> RestError {
    RestError::Api {
        status: 503,
        code: None,
        message: "service unavailable".into(),
    }
}

impl RecordingPlatform {
    /// The user refuses DMs from now on.
    pub fn block_dms(&self, user_id: &str) {
        self.inner.lock().blocked.insert(user_id.to_string());
    }

    /// Posts and edits to this channel fail until healed.
    pub fn fail_channel(&self, channel_id: &str) {
        self.inner.lock().failing.insert(channel_id.to_string());
    }

    pub fn heal_channel(&self, channel_id: &str) {
        self.inner.lock().failing.remove(channel_id);
    }

    pub fn posts_to(&self, channel_id: &str) -> Vec<Posted> {
        self.inner
            .lock()
            .posts
            .iter()
            .filter(|p| p.channel_id == channel_id)
            .cloned()
            .collect()
    }

    pub fn dms_to(&self, user_id: &str) -> Vec<MessagePayload> {
        self.posts_to(&format!("dm-{user_id}"))
            .into_iter()
            .map(|p| p.payload)
            .collect()
    }

    pub fn edits(&self) -> Vec<Posted> {
        self.inner.lock().edits.clone()
    }

    pub fn original_edits(&self) -> Vec<(String, MessagePayload)> {
        self.inner.lock().original_edits.clone()
    }
}

impl Platform for RecordingPlatform {
    async fn post_message(
        &self,
        channel_id: &str,
        payload: &MessagePayload,
    ) -> Result<MessageRef, RestError> {
        let mut rec = self.inner.lock();
        if rec.failing.contains(channel_id) {
            return Err(unavailable());
        }
        rec.next_id += 1;
        let message_id = format!("msg-{}", rec.next_id);
        rec.posts.push(Posted {
            channel_id: channel_id.to_string(),
            message_id: message_id.clone(),
            payload: payload.clone(),
        });
        Ok(MessageRef {
            id: message_id,
            channel_id: channel_id.to_string(),
        })
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        payload: &MessagePayload,
    ) -> Result<(), RestError> {
        let mut rec = self.inner.lock();
        if rec.failing.contains(channel_id) {
            return Err(unavailable());
        }
        rec.edits.push(Posted {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }

    async fn open_dm(&self, user_id: &str) -> Result<String, RestError> {
        if self.inner.lock().blocked.contains(user_id) {
            return Err(RestError::Api {
                status: 403,
                code: Some(CANNOT_MESSAGE_USER),
                message: "Cannot send messages to this user".into(),
            });
        }
        Ok(format!("dm-{user_id}"))
    }

    async fn edit_original_response(
        &self,
        token: &str,
        payload: &MessagePayload,
    ) -> Result<(), RestError> {
        self.inner
            .lock()
            .original_edits
            .push((token.to_string(), payload.clone()));
        Ok(())
    }
}
