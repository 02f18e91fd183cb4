//! weinbot: wine orders and coin flips in a Discord guild.
//!
//! Interactions arrive over the signed HTTP endpoint (`web`), are decoded
//! once into typed routes (`router`, `action`) and handled by the flows:
//! - `ordering`: product selection, quantity form, order submission
//! - `staff`: accept / reject with customer notification
//! - `coinflip`: classic flip and the two-button duel
//!
//! Orders live in SQLite (`store`); staff posts that fail are retried from
//! the outbox (`outbox`).

pub mod action;
pub mod bot;
pub mod catalog;
pub mod coinflip;
pub mod config;
pub mod error;
pub mod notify;
pub mod order;
pub mod ordering;
pub mod outbox;
pub mod platform;
pub mod router;
pub mod selection;
pub mod staff;
pub mod store;
pub mod testing;
pub mod web;
