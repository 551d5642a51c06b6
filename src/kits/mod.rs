//! Kit definitions and their redemption.
//!
//! Layering, leaves first:
//!
//! - [`types`] - kits, item stacks, recipients and capabilities
//! - [`store`] - the JSON kit document
//! - [`ledger`] - per-user usage timestamps in sled
//! - [`policy`] - one-time/cooldown decisions and the access gate
//! - [`inventory`] - slot containers, snapshots and allocation
//! - [`tokens`] - `%player%`-style substitution in item text
//! - [`engine`] - the redemption state machine
//! - [`editor`] - interactive template editing sessions
//! - [`service`] - the facade the command layer calls

pub mod editor;
pub mod engine;
pub mod errors;
pub mod inventory;
pub mod ledger;
pub mod policy;
pub mod service;
pub mod store;
pub mod tokens;
pub mod types;

pub use editor::{ContainerId, EditingSession, EditingSessions};
pub use engine::{
    HookOutcome, KitHost, RedeemError, RedeemEvent, RedeemOptions, RedeemOutcome, RedeemRequest,
    RedemptionEngine,
};
pub use errors::KitError;
pub use inventory::{Allocation, Container, InventorySnapshot, SlotInventory};
pub use ledger::{ProfileStore, ProfileStoreBuilder, UsageLedger, UserProfile};
pub use policy::{AccessDenied, PolicySettings};
pub use service::{ClaimError, ClaimReceipt, Economy, KitService};
pub use store::KitStore;
pub use types::{Capabilities, ItemStack, Kit, Recipient};
