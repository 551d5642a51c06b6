//! Usage policy for kit redemption.
//!
//! [`evaluate`] is the pure one-time/cooldown decision the redemption engine
//! runs. [`authorize`] is the access gate (per-kit permission, then
//! affordability) the service runs before handing a claim to the engine.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use super::types::{Capabilities, Kit};
use crate::config::KitsConfig;

/// Settings consulted on every redemption. Built from configuration and
/// replaced wholesale on reload; never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySettings {
    /// Default for `must_get_all` when a caller does not choose
    pub must_get_all: bool,
    /// Timestamp usage even when the one-time/cooldown checks were skipped
    pub record_usage_on_override: bool,
    /// Drop rejected stacks at the recipient instead of handing them back
    pub drop_rejected: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            must_get_all: false,
            record_usage_on_override: true,
            drop_rejected: true,
        }
    }
}

impl From<&KitsConfig> for PolicySettings {
    fn from(config: &KitsConfig) -> Self {
        Self {
            must_get_all: config.must_get_all,
            record_usage_on_override: config.record_usage_on_override,
            drop_rejected: config.drop_rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    AlreadyRedeemed,
    CooldownNotExpired { remaining: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

/// Decide whether `kit` may be redeemed now given its last use.
///
/// The one-time check runs first so a one-time kit's cooldown can never mask
/// the one-time violation. Nothing is checked when `perform_checks` is false.
pub fn evaluate(
    kit: &Kit,
    last_used: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    capabilities: &Capabilities,
    perform_checks: bool,
) -> Decision {
    if !perform_checks {
        return Decision::Allow;
    }
    let Some(last_used) = last_used else {
        return Decision::Allow;
    };

    if kit.one_time && !capabilities.bypass_one_time {
        return Decision::Deny(Denial::AlreadyRedeemed);
    }

    if !capabilities.bypass_cooldown {
        if let Some(cooldown) = kit.cooldown() {
            // Past chrono's last representable instant the kit never comes back.
            let remaining = match last_used.checked_add_signed(cooldown) {
                Some(next_eligible) => next_eligible - now,
                None => Duration::MAX,
            };
            if remaining > Duration::zero() {
                return Decision::Deny(Denial::CooldownNotExpired { remaining });
            }
        }
    }

    Decision::Allow
}

/// Why a claim was refused before reaching the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessDenied {
    #[error("no permission to use kit {kit}")]
    NoPermission { kit: String },

    #[error("kit {kit} costs {cost} but balance is {balance}")]
    InsufficientFunds { kit: String, cost: f64, balance: f64 },
}

/// Whether redeeming `kit` should charge the recipient.
pub fn requires_payment(kit: &Kit, capabilities: &Capabilities) -> bool {
    kit.cost > 0.0 && !capabilities.bypass_cost
}

/// Access gate: permission (unless the kit ignores permissions), then cost.
pub fn authorize(
    kit: &Kit,
    capabilities: &Capabilities,
    balance: f64,
) -> Result<(), AccessDenied> {
    if !kit.ignores_permission && !capabilities.kit_access {
        return Err(AccessDenied::NoPermission {
            kit: kit.name.clone(),
        });
    }
    if requires_payment(kit, capabilities) && balance < kit.cost {
        return Err(AccessDenied::InsufficientFunds {
            kit: kit.name.clone(),
            cost: kit.cost,
            balance,
        });
    }
    Ok(())
}
