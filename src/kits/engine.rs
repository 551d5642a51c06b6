//! The kit redemption state machine.
//!
//! ```text
//! START → POLICY_CHECK → PRE_EVENT → ALLOCATING → {COMMITTED | ROLLED_BACK}
//!       → LEDGER_UPDATE → DONE
//! ```
//!
//! Every failure short-circuits with a [`RedeemError`] that names the stage
//! it came from. The engine runs on the simulation thread only: callers that
//! start a redemption from a worker must hand it back to that thread before
//! calling [`RedemptionEngine::redeem`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use thiserror::Error;

use super::inventory::{self, Container, InventorySnapshot};
use super::ledger::UsageLedger;
use super::policy::{self, Decision, Denial, PolicySettings};
use super::tokens;
use super::types::{Capabilities, ItemStack, Kit, Recipient};
use crate::logutil::escape_log;
use crate::metrics;

/// Outcome of the cancellable pre-redeem hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Proceed,
    Cancel(Option<String>),
}

/// What the hooks get to see about a redemption.
#[derive(Debug, Clone, Copy)]
pub struct RedeemEvent<'a> {
    pub kit: &'a Kit,
    pub recipient: &'a Recipient,
    pub last_used: Option<DateTime<Utc>>,
}

/// Host capabilities the engine drives: hooks, console and ground drops.
pub trait KitHost {
    fn pre_redeem(&mut self, _event: &RedeemEvent<'_>) -> HookOutcome {
        HookOutcome::Proceed
    }

    fn post_redeem(&mut self, _event: &RedeemEvent<'_>) {}

    fn failed_redeem(&mut self, _event: &RedeemEvent<'_>) {}

    /// Run a console command. Returns false if the host rejected it.
    fn dispatch_command(&mut self, command: &str) -> bool;

    /// Place a stack on the ground at the recipient's location.
    fn drop_item(&mut self, _recipient: &Recipient, _stack: ItemStack) {}
}

/// Redemption failures. Each variant identifies where the state machine stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedeemError {
    #[error("one-time kit already redeemed")]
    AlreadyRedeemed,

    #[error("kit is on cooldown for another {}s", .remaining.num_seconds())]
    CooldownNotExpired { remaining: Duration },

    #[error("redemption cancelled by a pre-redeem hook")]
    PreEventCancelled { message: Option<String> },

    #[error("not enough inventory space for the whole kit")]
    NoSpace,

    #[error("nothing was redeemed")]
    Unknown,
}

impl RedeemError {
    /// Short stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RedeemError::AlreadyRedeemed => "already_redeemed",
            RedeemError::CooldownNotExpired { .. } => "cooldown",
            RedeemError::PreEventCancelled { .. } => "cancelled",
            RedeemError::NoSpace => "no_space",
            RedeemError::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemOptions {
    /// Run the one-time and cooldown checks
    pub perform_checks: bool,
    /// Roll back unless every stack fits; `None` uses the configured default
    pub must_get_all: Option<bool>,
    /// Automatic first-join grant; never rolled back for lack of space
    pub first_join: bool,
}

impl Default for RedeemOptions {
    fn default() -> Self {
        Self {
            perform_checks: true,
            must_get_all: None,
            first_join: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RedeemRequest<'a> {
    pub recipient: &'a Recipient,
    pub capabilities: Capabilities,
    pub options: RedeemOptions,
    pub now: DateTime<Utc>,
}

impl<'a> RedeemRequest<'a> {
    pub fn new(recipient: &'a Recipient, capabilities: Capabilities) -> Self {
        Self {
            recipient,
            capabilities,
            options: RedeemOptions::default(),
            now: Utc::now(),
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_options(mut self, options: RedeemOptions) -> Self {
        self.options = options;
        self
    }

    pub fn without_checks(mut self) -> Self {
        self.options.perform_checks = false;
        self
    }

    pub fn must_get_all(mut self, must_get_all: bool) -> Self {
        self.options.must_get_all = Some(must_get_all);
        self
    }
}

/// A committed redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemOutcome {
    /// Stacks that did not fit; the caller decides what happens to them
    pub rejected: Vec<ItemStack>,
    /// Every slot of the target inventory as it was before allocation
    pub snapshot: InventorySnapshot,
    /// Console commands the host accepted
    pub commands_run: usize,
}

pub struct RedemptionEngine {
    settings: Arc<PolicySettings>,
}

impl RedemptionEngine {
    pub fn new(settings: PolicySettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> Arc<PolicySettings> {
        Arc::clone(&self.settings)
    }

    /// Swap in freshly loaded settings. In-flight readers keep the old copy.
    pub fn reload(&mut self, settings: PolicySettings) {
        info!("Kit policy settings reloaded: {:?}", settings);
        self.settings = Arc::new(settings);
    }

    /// Redeem `kit` for the request's recipient.
    pub fn redeem(
        &self,
        kit: &Kit,
        request: &RedeemRequest<'_>,
        ledger: &mut UsageLedger,
        target: &mut dyn Container,
        host: &mut dyn KitHost,
    ) -> Result<RedeemOutcome, RedeemError> {
        let result = self.run(kit, request, ledger, target, host);
        match &result {
            Ok(outcome) => {
                metrics::record_redeemed(&kit.key(), !outcome.rejected.is_empty());
                info!(
                    "Kit {} redeemed by {} ({} rejected stack(s))",
                    kit.name,
                    escape_log(&request.recipient.username),
                    outcome.rejected.len()
                );
            }
            Err(e) => {
                metrics::record_refused(&kit.key(), e.label());
                debug!(
                    "Kit {} refused for {}: {}",
                    kit.name,
                    escape_log(&request.recipient.username),
                    e
                );
            }
        }
        result
    }

    fn run(
        &self,
        kit: &Kit,
        request: &RedeemRequest<'_>,
        ledger: &mut UsageLedger,
        target: &mut dyn Container,
        host: &mut dyn KitHost,
    ) -> Result<RedeemOutcome, RedeemError> {
        let settings = self.settings();
        let recipient = request.recipient;
        let last_used = ledger.last_used(&kit.name);
        let perform_checks =
            request.options.perform_checks && !request.capabilities.ignore_checks;

        // POLICY_CHECK
        match policy::evaluate(
            kit,
            last_used,
            request.now,
            &request.capabilities,
            perform_checks,
        ) {
            Decision::Allow => {}
            Decision::Deny(Denial::AlreadyRedeemed) => return Err(RedeemError::AlreadyRedeemed),
            Decision::Deny(Denial::CooldownNotExpired { remaining }) => {
                return Err(RedeemError::CooldownNotExpired { remaining })
            }
        }

        // PRE_EVENT
        let event = RedeemEvent {
            kit,
            recipient,
            last_used,
        };
        if let HookOutcome::Cancel(message) = host.pre_redeem(&event) {
            return Err(RedeemError::PreEventCancelled { message });
        }

        // ALLOCATING
        let snapshot = inventory::snapshot(target);
        let mut rejected = Vec::new();
        if !kit.item_stacks.is_empty() {
            let mut stacks = kit.item_stacks.clone();
            tokens::process(&mut stacks, recipient);
            let allocation = inventory::offer_all(stacks, target);

            let must_get_all = request
                .options
                .must_get_all
                .unwrap_or(settings.must_get_all);
            if must_get_all && !allocation.rejected.is_empty() && !request.options.first_join {
                inventory::restore(&snapshot, target);
                return Err(RedeemError::NoSpace);
            }
            if !allocation.deposited && allocation.rejected.is_empty() {
                inventory::restore(&snapshot, target);
                host.failed_redeem(&event);
                return Err(RedeemError::Unknown);
            }
            rejected = allocation.rejected;
        }

        // COMMITTED
        let mut commands_run = 0;
        for command in kit.render_commands(recipient) {
            if host.dispatch_command(&command) {
                commands_run += 1;
            } else {
                warn!(
                    "Host rejected command from kit {}: {}",
                    kit.name,
                    escape_log(&command)
                );
            }
        }

        // LEDGER_UPDATE
        if perform_checks || settings.record_usage_on_override {
            ledger.record(&kit.name, request.now);
        }

        host.post_redeem(&event);
        Ok(RedeemOutcome {
            rejected,
            snapshot,
            commands_run,
        })
    }
}

impl Default for RedemptionEngine {
    fn default() -> Self {
        Self::new(PolicySettings::default())
    }
}
