//! Platform-independent core of the magpie chat bot
//!
//! This crate carries everything that does not touch the Telegram API
//! directly: the dispatch table and its guards, trigger response rules,
//! the delayed-job scheduler, the approval workflow, duels, membership
//! watches, and the key-value store behind them. The transport side
//! plugs in through the [`gateway::Gateway`] trait.

pub mod approvals;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod duel;
pub mod durations;
pub mod error;
pub mod events;
pub mod gateway;
pub mod gifs;
pub mod quotes;
pub mod responses;
pub mod rules;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod types;
pub mod watch;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

// Re-export commonly used types
pub use config::BotConfig;
pub use dispatch::Dispatcher;
pub use error::{BotError, Result};
pub use events::{CallbackPress, IncomingMessage, MessageBody, RepliedMessage};
pub use gateway::{Gateway, SearchProvider, StockProvider};
pub use scheduler::Scheduler;
pub use state::BotState;
pub use store::Store;
