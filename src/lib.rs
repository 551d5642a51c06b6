//! # Kitredeem - kit redemption for game-server administration
//!
//! Administrators define named *kits* (bundles of item stacks and console
//! commands); players redeem them subject to per-kit one-time and cooldown
//! rules, permissions and cost.
//!
//! ## Features
//!
//! - **Redemption engine**: a small state machine with cancellable pre-redeem
//!   hooks, all-or-nothing allocation on request and exact cooldown reporting.
//! - **Kit store**: one JSON document with a backup copy and locked, atomic
//!   rewrites.
//! - **Usage ledger**: per-user profiles in an embedded sled database.
//! - **Editing sessions**: at most one interactive editor per kit.
//! - **Token substitution**: `%player%`, `%displayname%`, `%uuid%` and
//!   `%world%` in item names and lore.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kitredeem::config::Config;
//! use kitredeem::kits::{ItemStack, KitService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let mut service = KitService::open(&config)?;
//!     service.add_kit("starter", vec![ItemStack::new("wooden_sword", 1)])?;
//!     service.set_auto_redeem("starter", true)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`kits`] - kit model, persistence, policy and the redemption engine
//! - [`config`] - configuration management and validation
//! - [`validation`] - kit name validation
//! - [`metrics`] - in-process redemption counters
//! - [`logutil`] - single-line log sanitizing
//!
//! ## Threading
//!
//! Everything in [`kits`] runs on the host's simulation thread. Work started
//! elsewhere has to be handed back to that thread before it touches a kit,
//! an inventory or the ledger.

pub mod config;
pub mod kits;
pub mod logutil;
pub mod metrics;
pub mod validation;
