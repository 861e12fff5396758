//! Keyword relay: forwards embeds from monitored channels to target
//! channels according to per-channel keyword rules.

pub mod admin;
pub mod channels;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod relay;
pub mod rules;
