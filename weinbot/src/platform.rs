//! The outbound side of the chat platform, as seen by the flows.
//!
//! Implemented by [`RestClient`] in production and by
//! [`crate::testing::RecordingPlatform`] in tests.

use std::future::Future;

use weinbot_sdk::client::{MessageRef, RestClient, RestError};
use weinbot_sdk::component::MessagePayload;

pub trait Platform: Clone + Send + Sync + 'static {
    fn post_message(
        &self,
        channel_id: &str,
        payload: &MessagePayload,
    ) -> impl Future<Output = Result<MessageRef, RestError>> + Send;

    fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        payload: &MessagePayload,
    ) -> impl Future<Output = Result<(), RestError>> + Send;

    /// Open the DM channel with a user and return its id.
    fn open_dm(&self, user_id: &str) -> impl Future<Output = Result<String, RestError>> + Send;

    /// Replace the original response of an interaction, by token.
    fn edit_original_response(
        &self,
        token: &str,
        payload: &MessagePayload,
    ) -> impl Future<Output = Result<(), RestError>> + Send;
}

impl Platform for RestClient {
    async fn post_message(
        &self,
        channel_id: &str,
        payload: &MessagePayload,
    ) -> Result<MessageRef, RestError> {
        self.create_message(channel_id, payload).await
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        payload: &MessagePayload,
    ) -> Result<(), RestError> {
        RestClient::edit_message(self, channel_id, message_id, payload).await?;
        Ok(())
    }

    async fn open_dm(&self, user_id: &str) -> Result<String, RestError> {
        self.create_dm(user_id).await
    }

    async fn edit_original_response(
        &self,
        token: &str,
        payload: &MessagePayload,
    ) -> Result<(), RestError> {
        RestClient::edit_original_response(self, token, payload).await
    }
}
