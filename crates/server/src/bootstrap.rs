use std::sync::Arc;

use huddle_core::config::{AppConfig, ConfigError, LoadOptions};
use huddle_core::detect::SessionDetector;
use huddle_discord::confirm::{spawn_expiry_sweeper, ConfirmationStore};
use huddle_discord::events::{EventDispatcher, InteractionHandler, MessageCreateHandler};
use huddle_discord::gateway::{GatewayRunner, ReconnectPolicy};
use huddle_discord::rest::{ApiError, DiscordApi};
use huddle_discord::transport::WsGatewayTransport;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub gateway_runner: GatewayRunner,
    pub expiry_sweeper: JoinHandle<()>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("discord api unavailable: {0}")]
    Api(#[from] ApiError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    // Config errors surface before any network call.
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let (api, me) = DiscordApi::connect(&config.discord.bot_token).await?;
    let api = Arc::new(api);
    info!(
        event_name = "system.bootstrap.authenticated",
        correlation_id = "bootstrap",
        bot_user_id = %me.id,
        bot_username = %me.username,
        "discord identity resolved"
    );

    let store = Arc::new(ConfirmationStore::new());

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageCreateHandler::new(
        api.clone(),
        SessionDetector::default(),
        store.clone(),
        config.channels.general_id.clone(),
    ));
    dispatcher.register(InteractionHandler::new(
        api.clone(),
        store.clone(),
        config.channels.planning_id.clone(),
    ));

    let transport = Arc::new(WsGatewayTransport::new(
        api.clone(),
        config.discord.bot_token.clone(),
        config.discord.intents,
    ));
    let gateway_runner = GatewayRunner::new(transport, dispatcher, ReconnectPolicy::default());

    let expiry_sweeper = spawn_expiry_sweeper(api, store);
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        general_channel_id = %config.channels.general_id,
        planning_channel_id = %config.channels.planning_id,
        "handlers registered and expiry sweeper running"
    );

    Ok(Application { config, gateway_runner, expiry_sweeper })
}

#[cfg(test)]
mod tests {
    use huddle_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_bot_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some(String::new()),
                general_channel_id: Some("100".to_string()),
                planning_channel_id: Some("200".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("discord.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_rejects_identical_channel_ids() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some("test-token".to_string()),
                general_channel_id: Some("100".to_string()),
                planning_channel_id: Some("100".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
    }
}
