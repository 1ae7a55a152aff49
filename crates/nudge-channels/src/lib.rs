//! # nudge-channels
//!
//! Messaging platform integrations for Nudge.

pub mod telegram;
