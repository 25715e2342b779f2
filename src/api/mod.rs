//! Discord REST API access: the guild client and its retry policy.

pub mod client;
pub mod retry;

pub use client::{Guild, GuildClient, DISCORD_API};
pub use retry::RetryPolicy;
