//! Discord integration - Gateway bot interface
//!
//! This crate provides the Discord interface for huddle:
//! - **Gateway** (`gateway`, `transport`) - WebSocket connection to Discord
//!   with identify/heartbeat and reconnect backoff
//! - **Events** (`events`) - message routing and button interactions
//! - **REST** (`rest`) - messages, reactions, interaction responses
//! - **Components** (`components`) - button/action-row payload builders
//! - **Confirmation** (`confirm`) - the per-prompt yes/no workflow state
//!
//! # Architecture
//!
//! ```text
//! Gateway events → EventDispatcher → MessageCreateHandler → confirm prompt
//!                                  → InteractionHandler → announcement
//! ```
//!
//! # Key Types
//!
//! - `GatewayRunner` - event loop with reconnection logic
//! - `EventDispatcher` - routes events to registered handlers
//! - `ConfirmationStore` - pending confirmations keyed by prompt message id
//! - `ChannelApi` - trait over the REST surface (fakeable in tests)

pub mod announce;
pub mod components;
pub mod confirm;
pub mod events;
pub mod gateway;
pub mod rest;
pub mod transport;
