//! Typed gateway events and their handlers.
//!
//! Every decoded gateway event passes through the [`EventDispatcher`];
//! handlers register per event type. The two handlers here implement the
//! message router (proposal detection) and the confirmation buttons.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use huddle_core::detect::SessionDetector;
use huddle_core::when::{eastern_now, WhenParser};

use crate::announce::{announcement_message, RSVP_REACTIONS};
use crate::components::{
    confirm_prompt_message, disabled_confirm_rows, CONFIRM_NO_ID, CONFIRM_YES_ID,
};
use crate::confirm::{ConfirmationStore, Decision, ProposalCandidate, Resolution, WorkflowState};
use crate::rest::{ApiError, ChannelApi, InteractionRef};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageCreateEvent {
    pub message_id: String,
    pub channel_id: String,
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentInteractionEvent {
    pub interaction_id: String,
    pub interaction_token: String,
    /// Message the clicked component is attached to (the prompt).
    pub message_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub custom_id: String,
}

impl ComponentInteractionEvent {
    pub fn interaction_ref(&self) -> InteractionRef {
        InteractionRef {
            interaction_id: self.interaction_id.clone(),
            interaction_token: self.interaction_token.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscordEvent {
    MessageCreate(MessageCreateEvent),
    ComponentInteraction(ComponentInteractionEvent),
    Unsupported { event_type: String },
}

impl DiscordEvent {
    pub fn event_type(&self) -> DiscordEventType {
        match self {
            Self::MessageCreate(_) => DiscordEventType::MessageCreate,
            Self::ComponentInteraction(_) => DiscordEventType::ComponentInteraction,
            Self::Unsupported { .. } => DiscordEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiscordEventType {
    MessageCreate,
    ComponentInteraction,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    Ignored,
}

#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> DiscordEventType;
    async fn handle(
        &self,
        event: &DiscordEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<DiscordEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    /// Every event is offered to the handler set before any per-handler
    /// filtering; unhandled types resolve to `Ignored`.
    pub async fn dispatch(
        &self,
        event: &DiscordEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(event, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// The message router: watches the general channel and posts the yes/no
/// prompt when a message looks like a study-session proposal.
pub struct MessageCreateHandler<A> {
    api: Arc<A>,
    detector: SessionDetector,
    store: Arc<ConfirmationStore>,
    general_channel_id: String,
}

impl<A> MessageCreateHandler<A>
where
    A: ChannelApi,
{
    pub fn new(
        api: Arc<A>,
        detector: SessionDetector,
        store: Arc<ConfirmationStore>,
        general_channel_id: impl Into<String>,
    ) -> Self {
        Self { api, detector, store, general_channel_id: general_channel_id.into() }
    }
}

#[async_trait]
impl<A> EventHandler for MessageCreateHandler<A>
where
    A: ChannelApi + 'static,
{
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::MessageCreate
    }

    async fn handle(
        &self,
        event: &DiscordEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::MessageCreate(message) = event else {
            return Ok(HandlerResult::Ignored);
        };

        // Hard gates, in order: other bots, wrong channel, no proposal.
        if message.author_is_bot {
            return Ok(HandlerResult::Ignored);
        }
        if message.channel_id != self.general_channel_id {
            return Ok(HandlerResult::Ignored);
        }
        if !self.detector.looks_like_session(&message.content) {
            return Ok(HandlerResult::Ignored);
        }

        let prompt = confirm_prompt_message(&message.message_id);
        let prompt_message_id = self.api.create_message(&message.channel_id, &prompt).await?;

        self.store
            .insert(
                prompt_message_id.clone(),
                ProposalCandidate {
                    author_id: message.author_id.clone(),
                    channel_id: message.channel_id.clone(),
                    text: message.content.clone(),
                },
            )
            .await;

        info!(
            event_name = "session.prompt_posted",
            correlation_id = %ctx.correlation_id,
            channel_id = %message.channel_id,
            prompt_message_id = %prompt_message_id,
            author_id = %message.author_id,
            "posted study-session confirmation prompt"
        );

        Ok(HandlerResult::Processed)
    }
}

const ONLY_AUTHOR_CONFIRM: &str = "Only the person who wrote the message can confirm this.";
const ONLY_AUTHOR_RESPOND: &str = "Only the person who wrote the message can respond.";
const ACCEPT_ACK: &str = "Got it. Posting this in the study-planning channel.";
const DECLINE_ACK: &str = "No problem. I will ignore that message.";
const CHANNEL_MISSING: &str = "I could not find the study-planning channel.";
const PROMPT_STALE: &str = "This confirmation is no longer active.";

/// Applies confirmation clicks: authorization gate, announcement posting,
/// and control disabling.
pub struct InteractionHandler<A> {
    api: Arc<A>,
    store: Arc<ConfirmationStore>,
    when_parser: WhenParser,
    planning_channel_id: String,
}

impl<A> InteractionHandler<A>
where
    A: ChannelApi,
{
    pub fn new(
        api: Arc<A>,
        store: Arc<ConfirmationStore>,
        planning_channel_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            when_parser: WhenParser::new(),
            planning_channel_id: planning_channel_id.into(),
        }
    }

    async fn handle_accept(
        &self,
        event: &ComponentInteractionEvent,
        candidate: &ProposalCandidate,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let interaction = event.interaction_ref();
        self.api.ephemeral_reply(&interaction, ACCEPT_ACK).await?;

        let when = self.when_parser.parse(&candidate.text, eastern_now());
        let announcement = announcement_message(candidate, when);

        let announcement_id =
            match self.api.create_message(&self.planning_channel_id, &announcement).await {
                Ok(announcement_id) => announcement_id,
                Err(ApiError::UnknownChannel(channel_id)) => {
                    // The workflow stays resolved; the failure is only
                    // reported privately and nothing is retried.
                    info!(
                        event_name = "session.planning_channel_missing",
                        correlation_id = %ctx.correlation_id,
                        channel_id = %channel_id,
                        "planning channel lookup failed"
                    );
                    self.api.ephemeral_followup(&interaction, CHANNEL_MISSING).await?;
                    return Ok(());
                }
                Err(error) => return Err(error.into()),
            };

        for emoji in RSVP_REACTIONS {
            self.api.add_reaction(&self.planning_channel_id, &announcement_id, emoji).await?;
        }

        self.api
            .edit_message_components(
                &event.channel_id,
                &event.message_id,
                &disabled_confirm_rows(),
            )
            .await?;

        info!(
            event_name = "session.announcement_posted",
            correlation_id = %ctx.correlation_id,
            channel_id = %self.planning_channel_id,
            announcement_id = %announcement_id,
            when_determined = when.is_some(),
            "posted study-session announcement"
        );

        Ok(())
    }

    async fn handle_decline(
        &self,
        event: &ComponentInteractionEvent,
    ) -> Result<(), EventHandlerError> {
        self.api.ephemeral_reply(&event.interaction_ref(), DECLINE_ACK).await?;
        self.api
            .edit_message_components(
                &event.channel_id,
                &event.message_id,
                &disabled_confirm_rows(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<A> EventHandler for InteractionHandler<A>
where
    A: ChannelApi + 'static,
{
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::ComponentInteraction
    }

    async fn handle(
        &self,
        event: &DiscordEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::ComponentInteraction(interaction) = event else {
            return Ok(HandlerResult::Ignored);
        };

        let decision = match interaction.custom_id.as_str() {
            CONFIRM_YES_ID => Decision::Accept,
            CONFIRM_NO_ID => Decision::Decline,
            _ => return Ok(HandlerResult::Ignored),
        };

        let resolution =
            self.store.resolve(&interaction.message_id, &interaction.user_id, decision).await;

        match resolution {
            Resolution::NotFound | Resolution::Expired => {
                self.api.ephemeral_reply(&interaction.interaction_ref(), PROMPT_STALE).await?;
            }
            Resolution::NotAuthor => {
                let notice = match decision {
                    Decision::Accept => ONLY_AUTHOR_CONFIRM,
                    Decision::Decline => ONLY_AUTHOR_RESPOND,
                };
                self.api.ephemeral_reply(&interaction.interaction_ref(), notice).await?;
            }
            Resolution::Resolved { candidate, state: WorkflowState::ResolvedYes } => {
                self.handle_accept(interaction, &candidate, ctx).await?;
            }
            Resolution::Resolved { .. } => {
                self.handle_decline(interaction).await?;
            }
        }

        Ok(HandlerResult::Processed)
    }
}
