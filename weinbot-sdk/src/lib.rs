//! weinbot-sdk: a small client for Discord's HTTP interactions model.
//!
//! - `signature`: Ed25519 verification of incoming interaction webhooks
//! - `interaction`: decoding raw interaction payloads into [`event::Event`]s
//! - `component`: outbound messages, embeds, buttons, selects, modals
//! - `response`: interaction callback bodies
//! - `client`: REST calls (messages, DMs, deferred edits, command registration)

pub mod client;
pub mod component;
pub mod event;
pub mod interaction;
pub mod response;
pub mod signature;
