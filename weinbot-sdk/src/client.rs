//! REST client for the calls a bot makes outside of interaction responses.

use std::time::Duration;

use reqwest::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::component::MessagePayload;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Default per-request timeout. Kept well below the platform's retry and
/// lease windows so a hung call fails instead of overlapping a retry.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON error code returned when a user does not accept DMs from the bot.
pub const CANNOT_MESSAGE_USER: u64 = 50007;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<u64>,
        message: String,
    },
}

impl RestError {
    /// The recipient refuses direct messages (privacy settings, block, no shared guild).
    pub fn is_dm_blocked(&self) -> bool {
        matches!(self, RestError::Api { code: Some(CANNOT_MESSAGE_USER), .. })
    }
}

/// Identifies a posted message so it can be edited later.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageRef {
    pub id: String,
    pub channel_id: String,
}

/// An application command to register.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    kind: u8,
}

impl CommandSpec {
    /// A chat-input (slash) command.
    pub fn chat_input(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: 1,
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: Option<u64>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ChannelBody {
    id: String,
}

#[derive(Serialize)]
struct DmRequest<'a> {
    recipient_id: &'a str,
}

/// Handle to the REST API. Cheap to clone.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: String,
    token: String,
    application_id: String,
    timeout: Duration,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base", &self.base)
            .field("application_id", &self.application_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(token: impl Into<String>, application_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            application_id: application_id.into(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Point the client at another API root (tests, proxies).
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, RestError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base, path);
        tracing::debug!(%method, %url, "REST request");
        let resp = self
            .http
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.token))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let parsed: Option<ApiErrorBody> = serde_json::from_str(&text).ok();
            let (code, message) = match parsed {
                Some(p) => (p.code, p.message.unwrap_or(text)),
                None => (None, text),
            };
            return Err(RestError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }
        Ok(resp.json::<T>().await?)
    }

    pub async fn create_message(
        &self,
        channel_id: &str,
        payload: &MessagePayload,
    ) -> Result<MessageRef, RestError> {
        self.send(Method::POST, &format!("/channels/{channel_id}/messages"), payload)
            .await
    }

    pub async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        payload: &MessagePayload,
    ) -> Result<MessageRef, RestError> {
        self.send(
            Method::PATCH,
            &format!("/channels/{channel_id}/messages/{message_id}"),
            payload,
        )
        .await
    }

    /// Open (or reuse) the DM channel with a user. Returns its channel id.
    pub async fn create_dm(&self, user_id: &str) -> Result<String, RestError> {
        let channel: ChannelBody = self
            .send(
                Method::POST,
                "/users/@me/channels",
                &DmRequest { recipient_id: user_id },
            )
            .await?;
        Ok(channel.id)
    }

    /// Edit the response to a (possibly deferred) interaction.
    pub async fn edit_original_response(
        &self,
        interaction_token: &str,
        payload: &MessagePayload,
    ) -> Result<(), RestError> {
        let path = format!(
            "/webhooks/{}/{interaction_token}/messages/@original",
            self.application_id
        );
        let _: IgnoredAny = self.send(Method::PATCH, &path, payload).await?;
        Ok(())
    }

    /// Bulk-overwrite application commands, guild-scoped when `guild_id` is set.
    /// Returns the number of commands the platform now holds.
    pub async fn register_commands(
        &self,
        guild_id: Option<&str>,
        commands: &[CommandSpec],
    ) -> Result<usize, RestError> {
        let path = match guild_id {
            Some(guild) => format!(
                "/applications/{}/guilds/{guild}/commands",
                self.application_id
            ),
            None => format!("/applications/{}/commands", self.application_id),
        };
        let registered: Vec<IgnoredAny> = self.send(Method::PUT, &path, commands).await?;
        Ok(registered.len())
    }
}
