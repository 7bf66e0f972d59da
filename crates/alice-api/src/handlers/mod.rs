//! HTTP handlers for alice-api.

pub mod analysis;
pub mod chat;
pub mod health;
pub mod verify;
