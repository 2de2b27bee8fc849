//! Command handlers behind the dispatch registry.

pub mod actions;
pub mod admin;
pub mod duel;
pub mod misc;
pub mod moderation;
pub mod passive;
pub mod posts;
pub mod quotes;
pub mod restrict;
pub mod rules_admin;
