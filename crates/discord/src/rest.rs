//! Discord REST API client.
//!
//! A thin reqwest wrapper over the handful of endpoints the bot needs. The
//! `ChannelApi` trait fronts the surface so event handlers can be exercised
//! against an in-memory fake.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::components::{ActionRow, MessagePayload};

const API_BASE: &str = "https://discord.com/api/v10";

/// Ephemeral flag on interaction responses: only the clicker sees them.
const EPHEMERAL: u64 = 1 << 6;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bot token is not usable as an authorization header")]
    InvalidToken,
    #[error("discord request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
    #[error("discord returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Identifies one component interaction for response/followup calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionRef {
    pub interaction_id: String,
    pub interaction_token: String,
}

/// The REST surface the event handlers depend on.
#[async_trait]
pub trait ChannelApi: Send + Sync {
    /// Post a message; returns the created message id.
    async fn create_message(
        &self,
        channel_id: &str,
        payload: &MessagePayload,
    ) -> Result<String, ApiError>;

    /// Replace the component rows on an existing message.
    async fn edit_message_components(
        &self,
        channel_id: &str,
        message_id: &str,
        components: &[ActionRow],
    ) -> Result<(), ApiError>;

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), ApiError>;

    /// Initial ephemeral response to an interaction.
    async fn ephemeral_reply(
        &self,
        interaction: &InteractionRef,
        text: &str,
    ) -> Result<(), ApiError>;

    /// Ephemeral followup after the initial response was already sent.
    async fn ephemeral_followup(
        &self,
        interaction: &InteractionRef,
        text: &str,
    ) -> Result<(), ApiError>;
}

#[derive(Clone, Debug, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GatewayInfo {
    url: String,
}

pub struct DiscordApi {
    client: reqwest::Client,
    application_id: String,
}

impl DiscordApi {
    /// `application_id` is needed for followup webhooks; for bot accounts it
    /// equals the bot user id (see [`Self::get_me`]).
    pub fn new(bot_token: &SecretString, application_id: String) -> Result<Self, ApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bot {}", bot_token.expose_secret());
        let mut auth =
            reqwest::header::HeaderValue::from_str(&auth).map_err(|_| ApiError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("huddle/0.1"),
        );

        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self { client, application_id })
    }

    /// Builds a client and resolves the bot identity in one step; the bot
    /// user id doubles as the application id for followup webhooks.
    pub async fn connect(bot_token: &SecretString) -> Result<(Self, DiscordUser), ApiError> {
        let mut api = Self::new(bot_token, String::new())?;
        let me = api.get_me().await?;
        api.application_id = me.id.clone();
        Ok((api, me))
    }

    pub async fn get_me(&self) -> Result<DiscordUser, ApiError> {
        let response = self.client.get(format!("{API_BASE}/users/@me")).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Gateway WebSocket URL for this bot.
    pub async fn gateway_url(&self) -> Result<String, ApiError> {
        let response = self.client.get(format!("{API_BASE}/gateway/bot")).send().await?;
        let response = check_status(response).await?;
        let info: GatewayInfo = response.json().await?;
        Ok(format!("{}/?v=10&encoding=json", info.url))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status { status: status.as_u16(), body })
}

#[async_trait]
impl ChannelApi for DiscordApi {
    async fn create_message(
        &self,
        channel_id: &str,
        payload: &MessagePayload,
    ) -> Result<String, ApiError> {
        let response = self
            .client
            .post(format!("{API_BASE}/channels/{channel_id}/messages"))
            .json(payload)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::UnknownChannel(channel_id.to_string()));
        }
        let response = check_status(response).await?;
        let created: CreatedMessage = response.json().await?;
        Ok(created.id)
    }

    async fn edit_message_components(
        &self,
        channel_id: &str,
        message_id: &str,
        components: &[ActionRow],
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .patch(format!("{API_BASE}/channels/{channel_id}/messages/{message_id}"))
            .json(&serde_json::json!({ "components": components }))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), ApiError> {
        let emoji = urlencoding::encode(emoji);
        let response = self
            .client
            .put(format!(
                "{API_BASE}/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me"
            ))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    async fn ephemeral_reply(
        &self,
        interaction: &InteractionRef,
        text: &str,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({
            // CHANNEL_MESSAGE_WITH_SOURCE
            "type": 4,
            "data": { "content": text, "flags": EPHEMERAL },
        });
        let response = self
            .client
            .post(format!(
                "{API_BASE}/interactions/{}/{}/callback",
                interaction.interaction_id, interaction.interaction_token
            ))
            .json(&body)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    async fn ephemeral_followup(
        &self,
        interaction: &InteractionRef,
        text: &str,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({ "content": text, "flags": EPHEMERAL });
        let response = self
            .client
            .post(format!(
                "{API_BASE}/webhooks/{}/{}",
                self.application_id, interaction.interaction_token
            ))
            .json(&body)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}
