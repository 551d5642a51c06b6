//! Kit service: the single object the command layer talks to.
//!
//! Owns the kit store, the profile store, the redemption engine and the
//! editing sessions, and exposes one method per kit command (`/kit`,
//! `/kit give`, `/kit cost`, ...). Every method runs on the simulation thread.

use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use thiserror::Error;
use uuid::Uuid;

use super::editor::{ContainerId, EditingSession, EditingSessions};
use super::engine::{KitHost, RedeemError, RedeemOptions, RedeemRequest, RedemptionEngine};
use super::errors::KitError;
use super::inventory::{Container, InventorySnapshot};
use super::ledger::{ProfileStore, ProfileStoreBuilder, UserProfile};
use super::policy::{self, AccessDenied, PolicySettings};
use super::store::KitStore;
use super::types::{Capabilities, ItemStack, Kit, Recipient};
use crate::config::Config;
use crate::logutil::escape_log;

macro_rules! audit_log {
    ($($arg:tt)*) => { log::info!(target: "security", $($arg)*); };
}

/// External economy; balance arithmetic is the provider's business.
pub trait Economy {
    fn balance(&self, recipient: &Recipient) -> f64;

    /// Take `amount` from the recipient. Returns false if it could not.
    fn withdraw(&mut self, recipient: &Recipient, amount: f64) -> bool;
}

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("unknown kit: {0}")]
    UnknownKit(String),

    #[error(transparent)]
    Denied(#[from] AccessDenied),

    #[error(transparent)]
    Redeem(#[from] RedeemError),

    #[error("storage error: {0}")]
    Storage(#[from] KitError),
}

/// What a successful claim or give did.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimReceipt {
    pub kit: String,
    /// Stacks that did not fit in the inventory
    pub rejected: Vec<ItemStack>,
    /// Whether `rejected` was dropped at the recipient's location
    pub dropped: bool,
    /// Amount withdrawn from the recipient
    pub charged: f64,
    /// False when the usage record could not be written; the items were still
    /// delivered.
    pub usage_saved: bool,
    pub snapshot: InventorySnapshot,
}

pub struct KitService {
    store: KitStore,
    profiles: ProfileStore,
    engine: RedemptionEngine,
    editors: EditingSessions,
    editor_slots: usize,
}

impl KitService {
    pub fn open(config: &Config) -> Result<Self, KitError> {
        let store = KitStore::open(&config.kits.data_dir)?;
        let profiles = ProfileStoreBuilder::new(config.kits.profiles_path()).open()?;
        Ok(Self::new(
            store,
            profiles,
            PolicySettings::from(&config.kits),
            config.inventory.editor_slots,
        ))
    }

    pub fn new(
        store: KitStore,
        profiles: ProfileStore,
        settings: PolicySettings,
        editor_slots: usize,
    ) -> Self {
        Self {
            store,
            profiles,
            engine: RedemptionEngine::new(settings),
            editors: EditingSessions::new(),
            editor_slots,
        }
    }

    pub fn store(&self) -> &KitStore {
        &self.store
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Apply a reloaded configuration: new policy settings and a fresh read of
    /// the kit document.
    pub fn reload(&mut self, config: &Config) -> Result<(), KitError> {
        self.engine.reload(PolicySettings::from(&config.kits));
        self.editor_slots = config.inventory.editor_slots;
        self.store.reload()
    }

    // ------------------------------------------------------------------
    // Redemption
    // ------------------------------------------------------------------

    /// `/kit <name>`: access gate, redemption, payment, then drop leftovers.
    pub fn claim(
        &mut self,
        recipient: &Recipient,
        kit_name: &str,
        capabilities: Capabilities,
        target: &mut dyn Container,
        host: &mut dyn KitHost,
        economy: &mut dyn Economy,
    ) -> Result<ClaimReceipt, ClaimError> {
        self.claim_at(recipient, kit_name, capabilities, target, host, economy, Utc::now())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn claim_at(
        &mut self,
        recipient: &Recipient,
        kit_name: &str,
        capabilities: Capabilities,
        target: &mut dyn Container,
        host: &mut dyn KitHost,
        economy: &mut dyn Economy,
        now: DateTime<Utc>,
    ) -> Result<ClaimReceipt, ClaimError> {
        let kit = self
            .store
            .get_kit(kit_name)
            .ok_or_else(|| ClaimError::UnknownKit(kit_name.to_string()))?;
        policy::authorize(kit, &capabilities, economy.balance(recipient))?;

        let mut profile = self
            .profiles
            .load_or_create(&recipient.uuid, &recipient.username)?;
        let request = RedeemRequest::new(recipient, capabilities).at(now);
        let outcome = self
            .engine
            .redeem(kit, &request, &mut profile.usage, target, host)?;
        let usage_saved = self.save_usage(profile, recipient, &kit.name);

        let mut charged = 0.0;
        if policy::requires_payment(kit, &capabilities) {
            if economy.withdraw(recipient, kit.cost) {
                charged = kit.cost;
            } else {
                warn!(
                    "Could not charge {} for kit {} ({})",
                    escape_log(&recipient.username),
                    kit.name,
                    kit.cost
                );
            }
        }

        let kit_name = kit.name.clone();
        let dropped = self.drop_rejected(recipient, &outcome.rejected, host);
        Ok(ClaimReceipt {
            kit: kit_name,
            rejected: outcome.rejected,
            dropped,
            charged,
            usage_saved,
            snapshot: outcome.snapshot,
        })
    }

    /// `/kit give <player> <kit> [--ignore]`: no access gate and no payment.
    /// With `perform_checks == false` the one-time and cooldown checks are skipped.
    #[allow(clippy::too_many_arguments)]
    pub fn give(
        &mut self,
        recipient: &Recipient,
        kit_name: &str,
        capabilities: Capabilities,
        perform_checks: bool,
        target: &mut dyn Container,
        host: &mut dyn KitHost,
        now: DateTime<Utc>,
    ) -> Result<ClaimReceipt, ClaimError> {
        let kit = self
            .store
            .get_kit(kit_name)
            .ok_or_else(|| ClaimError::UnknownKit(kit_name.to_string()))?;
        let mut profile = self
            .profiles
            .load_or_create(&recipient.uuid, &recipient.username)?;
        let request = RedeemRequest::new(recipient, capabilities)
            .at(now)
            .with_options(RedeemOptions {
                perform_checks,
                ..RedeemOptions::default()
            });
        let outcome = self
            .engine
            .redeem(kit, &request, &mut profile.usage, target, host)?;
        let usage_saved = self.save_usage(profile, recipient, &kit.name);

        audit_log!(
            "Kit {} given to {} (checks: {})",
            kit.name,
            escape_log(&recipient.username),
            perform_checks
        );
        let kit_name = kit.name.clone();
        let dropped = self.drop_rejected(recipient, &outcome.rejected, host);
        Ok(ClaimReceipt {
            kit: kit_name,
            rejected: outcome.rejected,
            dropped,
            charged: 0.0,
            usage_saved,
            snapshot: outcome.snapshot,
        })
    }

    /// Hand out every first-join kit once per user. Returns the kits granted.
    pub fn grant_first_join_kits(
        &mut self,
        recipient: &Recipient,
        target: &mut dyn Container,
        host: &mut dyn KitHost,
    ) -> Result<Vec<String>, KitError> {
        let mut profile = self
            .profiles
            .load_or_create(&recipient.uuid, &recipient.username)?;
        if profile.first_join_granted {
            return Ok(Vec::new());
        }

        let mut granted = Vec::new();
        let options = RedeemOptions {
            perform_checks: false,
            must_get_all: None,
            first_join: true,
        };
        for kit in self.store.first_join_kits() {
            let request = RedeemRequest::new(recipient, Capabilities::player()).with_options(options);
            match self
                .engine
                .redeem(kit, &request, &mut profile.usage, target, host)
            {
                Ok(outcome) => {
                    self.drop_rejected(recipient, &outcome.rejected, host);
                    granted.push(kit.name.clone());
                }
                Err(e) => warn!(
                    "First-join kit {} not granted to {}: {}",
                    kit.name,
                    escape_log(&recipient.username),
                    e
                ),
            }
        }

        profile.first_join_granted = true;
        self.profiles.put_profile(profile)?;
        info!(
            "Granted {} first-join kit(s) to {}",
            granted.len(),
            escape_log(&recipient.username)
        );
        Ok(granted)
    }

    /// Store the profile after a committed redemption. A failure is logged and
    /// reported rather than returned, since the items have already moved.
    fn save_usage(&self, profile: UserProfile, recipient: &Recipient, kit_name: &str) -> bool {
        match self.profiles.put_profile(profile) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Kit {} delivered to {} but usage was not saved: {}",
                    kit_name,
                    escape_log(&recipient.username),
                    e
                );
                false
            }
        }
    }

    fn drop_rejected(
        &self,
        recipient: &Recipient,
        rejected: &[ItemStack],
        host: &mut dyn KitHost,
    ) -> bool {
        if rejected.is_empty() || !self.engine.settings().drop_rejected {
            return false;
        }
        for stack in rejected {
            host.drop_item(recipient, stack.clone());
        }
        true
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    pub fn list_kits(&self, include_hidden: bool) -> Vec<String> {
        self.store.get_kit_names(include_hidden).into_iter().collect()
    }

    pub fn view_kit(&self, name: &str) -> Option<&Kit> {
        self.store.get_kit(name)
    }

    /// `/kit add <name>`: create an empty kit, or one holding `items`.
    pub fn add_kit(&mut self, name: &str, items: Vec<ItemStack>) -> Result<(), KitError> {
        let mut kit = self.store.create_kit(name)?;
        kit.item_stacks = items;
        audit_log!("Kit {} created", kit.name);
        self.store.save_kit(kit)
    }

    /// `/kit set <name>`: replace the kit's items, creating it if needed.
    pub fn set_kit_items(&mut self, name: &str, items: Vec<ItemStack>) -> Result<(), KitError> {
        self.ensure_not_editing(name)?;
        let mut kit = match self.store.get_kit(name) {
            Some(existing) => existing.clone(),
            None => self.store.create_kit(name)?,
        };
        kit.item_stacks = items;
        audit_log!("Kit {} items replaced ({} stack(s))", kit.name, kit.item_stacks.len());
        self.store.save_kit(kit)
    }

    pub fn remove_kit(&mut self, name: &str) -> Result<bool, KitError> {
        self.ensure_not_editing(name)?;
        let removed = self.store.remove_kit(name)?;
        if removed {
            audit_log!("Kit {} removed", name);
        }
        Ok(removed)
    }

    pub fn rename_kit(&mut self, old: &str, new: &str) -> Result<(), KitError> {
        self.ensure_not_editing(old)?;
        self.store.rename_kit(old, new)?;
        audit_log!("Kit {} renamed to {}", old, new);
        Ok(())
    }

    pub fn set_cost(&mut self, name: &str, cost: f64) -> Result<(), KitError> {
        self.update_kit(name, |kit| kit.set_cost(cost))
    }

    pub fn set_cooldown(&mut self, name: &str, cooldown: Option<Duration>) -> Result<(), KitError> {
        self.update_kit(name, |kit| kit.set_cooldown(cooldown))
    }

    pub fn set_one_time(&mut self, name: &str, one_time: bool) -> Result<(), KitError> {
        self.update_kit(name, |kit| kit.one_time = one_time)
    }

    pub fn set_auto_redeem(&mut self, name: &str, first_join: bool) -> Result<(), KitError> {
        self.update_kit(name, |kit| kit.first_join_kit = first_join)
    }

    pub fn set_permission_bypass(&mut self, name: &str, ignores: bool) -> Result<(), KitError> {
        self.update_kit(name, |kit| kit.ignores_permission = ignores)
    }

    pub fn set_hidden(&mut self, name: &str, hidden: bool) -> Result<(), KitError> {
        self.update_kit(name, |kit| kit.hidden = hidden)
    }

    pub fn add_command(&mut self, name: &str, command: &str) -> Result<(), KitError> {
        let command = command.trim().trim_start_matches('/').to_string();
        self.update_kit(name, |kit| kit.commands.push(command))
    }

    /// Remove the command at `index` (0-based), returning it.
    pub fn remove_command(&mut self, name: &str, index: usize) -> Result<String, KitError> {
        let mut kit = self.kit_for_update(name)?;
        if index >= kit.commands.len() {
            return Err(KitError::NotFound(format!(
                "command #{} of kit {}",
                index + 1,
                kit.name
            )));
        }
        let removed = kit.commands.remove(index);
        audit_log!("Kit {} command removed: {}", kit.name, escape_log(&removed));
        self.store.save_kit(kit)?;
        Ok(removed)
    }

    /// `/kit resetusage <player> [kit]`. Returns how many entries were cleared.
    pub fn reset_usage(&mut self, user: &Uuid, kit_name: Option<&str>) -> Result<usize, KitError> {
        let mut profile = self.profiles.get_profile(user)?;
        let cleared = match kit_name {
            Some(name) => usize::from(profile.usage.reset(name)),
            None => profile.usage.reset_all(),
        };
        self.profiles.put_profile(profile)?;
        audit_log!(
            "Usage reset for {} ({}): {} cleared",
            user,
            kit_name.unwrap_or("all kits"),
            cleared
        );
        Ok(cleared)
    }

    fn kit_for_update(&self, name: &str) -> Result<Kit, KitError> {
        self.ensure_not_editing(name)?;
        self.store
            .get_kit(name)
            .cloned()
            .ok_or_else(|| KitError::NotFound(format!("kit: {}", name)))
    }

    fn update_kit(&mut self, name: &str, apply: impl FnOnce(&mut Kit)) -> Result<(), KitError> {
        let mut kit = self.kit_for_update(name)?;
        apply(&mut kit);
        audit_log!("Kit {} updated", kit.name);
        self.store.save_kit(kit)
    }

    fn ensure_not_editing(&self, name: &str) -> Result<(), KitError> {
        if self.editors.is_open(name) {
            return Err(KitError::Busy(name.to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Editing sessions
    // ------------------------------------------------------------------

    /// Open the kit's template in `container`. Refused while another editor
    /// has the same kit open.
    pub fn open_editor(&mut self, name: &str, container: ContainerId) -> Result<&EditingSession, KitError> {
        let kit = self
            .store
            .get_kit(name)
            .ok_or_else(|| KitError::NotFound(format!("kit: {}", name)))?;
        if self.editors.is_open(&kit.name) {
            return Err(KitError::Busy(kit.name.clone()));
        }
        self.editors.open_session(kit, container, self.editor_slots);
        self.editors
            .session(container)
            .ok_or_else(|| KitError::NotFound(format!("editor: {}", container)))
    }

    pub fn editor_session_mut(&mut self, container: ContainerId) -> Option<&mut EditingSession> {
        self.editors.session_mut(container)
    }

    pub fn is_editing(&self, name: &str) -> bool {
        self.editors.is_open(name)
    }

    /// Close the editor bound to `container`; with `save` the working copy
    /// replaces the kit's items. Returns the kit name if a session existed.
    pub fn close_editor(&mut self, container: ContainerId, save: bool) -> Result<Option<String>, KitError> {
        let Some(session) = self.editors.close_session(container) else {
            return Ok(None);
        };
        if save {
            match self.store.get_kit(&session.kit_name).cloned() {
                Some(mut kit) => {
                    session.apply_to(&mut kit);
                    audit_log!("Kit {} edited ({} stack(s))", kit.name, kit.item_stacks.len());
                    self.store.save_kit(kit)?;
                }
                None => warn!("Kit {} vanished while being edited", session.kit_name),
            }
        }
        Ok(Some(session.kit_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kits::inventory::SlotInventory;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingHost {
        commands: Vec<String>,
        dropped: Vec<ItemStack>,
    }

    impl KitHost for RecordingHost {
        fn dispatch_command(&mut self, command: &str) -> bool {
            self.commands.push(command.to_string());
            true
        }

        fn drop_item(&mut self, _recipient: &Recipient, stack: ItemStack) {
            self.dropped.push(stack);
        }
    }

    struct Wallet(f64);

    impl Economy for Wallet {
        fn balance(&self, _recipient: &Recipient) -> f64 {
            self.0
        }

        fn withdraw(&mut self, _recipient: &Recipient, amount: f64) -> bool {
            if self.0 < amount {
                return false;
            }
            self.0 -= amount;
            true
        }
    }

    fn service(dir: &TempDir) -> KitService {
        let store = KitStore::open(dir.path()).expect("kit store");
        let profiles = ProfileStoreBuilder::new(dir.path().join("profiles"))
            .temporary()
            .open()
            .expect("profile store");
        KitService::new(store, profiles, PolicySettings::default(), 27)
    }

    #[test]
    fn claim_charges_only_after_success() {
        let dir = TempDir::new().expect("tempdir");
        let mut svc = service(&dir);
        svc.add_kit("vip", vec![ItemStack::new("diamond", 3)]).expect("add");
        svc.set_cost("vip", 10.0).expect("cost");
        svc.set_one_time("vip", true).expect("one time");

        let alice = Recipient::new("alice");
        let mut inv = SlotInventory::new(9);
        let mut host = RecordingHost::default();
        let mut wallet = Wallet(25.0);

        let receipt = svc
            .claim(&alice, "VIP", Capabilities::player(), &mut inv, &mut host, &mut wallet)
            .expect("first claim");
        assert_eq!(receipt.charged, 10.0);
        assert_eq!(wallet.0, 15.0);
        assert_eq!(inv.count("diamond"), 3);

        let err = svc
            .claim(&alice, "vip", Capabilities::player(), &mut inv, &mut host, &mut wallet)
            .expect_err("one-time");
        assert!(matches!(err, ClaimError::Redeem(RedeemError::AlreadyRedeemed)));
        assert_eq!(wallet.0, 15.0);
    }

    /// Records whether the usage entry was already on disk when charged.
    struct AuditingWallet {
        profiles: ProfileStore,
        kit: &'static str,
        usage_on_disk_at_charge: Option<bool>,
    }

    impl Economy for AuditingWallet {
        fn balance(&self, _recipient: &Recipient) -> f64 {
            100.0
        }

        fn withdraw(&mut self, recipient: &Recipient, _amount: f64) -> bool {
            let stored = self
                .profiles
                .get_profile(&recipient.uuid)
                .map(|p| p.usage.last_used(self.kit).is_some())
                .unwrap_or(false);
            self.usage_on_disk_at_charge = Some(stored);
            true
        }
    }

    #[test]
    fn usage_is_stored_before_payment_is_taken() {
        let dir = TempDir::new().expect("tempdir");
        let mut svc = service(&dir);
        svc.add_kit("vip", vec![ItemStack::new("diamond", 3)]).expect("add");
        svc.set_cost("vip", 10.0).expect("cost");
        svc.set_one_time("vip", true).expect("one time");

        let cara = Recipient::new("cara");
        let mut inv = SlotInventory::new(9);
        let mut host = RecordingHost::default();
        let mut wallet = AuditingWallet {
            profiles: svc.profiles().clone(),
            kit: "vip",
            usage_on_disk_at_charge: None,
        };

        let receipt = svc
            .claim(&cara, "vip", Capabilities::player(), &mut inv, &mut host, &mut wallet)
            .expect("claim");
        assert!(receipt.usage_saved);
        assert_eq!(receipt.charged, 10.0);
        assert_eq!(wallet.usage_on_disk_at_charge, Some(true));

        let given = svc
            .give(&cara, "vip", Capabilities::player(), false, &mut inv, &mut host, Utc::now())
            .expect("give without checks");
        assert!(given.usage_saved);
        assert!(svc
            .profiles()
            .get_profile(&cara.uuid)
            .expect("profile")
            .usage
            .last_used("vip")
            .is_some());
    }

    #[test]
    fn claim_refuses_without_permission_or_funds() {
        let dir = TempDir::new().expect("tempdir");
        let mut svc = service(&dir);
        svc.add_kit("pricey", vec![ItemStack::new("gold_ingot", 1)]).expect("add");
        svc.set_cost("pricey", 50.0).expect("cost");

        let bob = Recipient::new("bob");
        let mut inv = SlotInventory::new(9);
        let mut host = RecordingHost::default();
        let mut wallet = Wallet(5.0);

        let no_access = Capabilities::default();
        let err = svc
            .claim(&bob, "pricey", no_access, &mut inv, &mut host, &mut wallet)
            .expect_err("no permission");
        assert!(matches!(err, ClaimError::Denied(AccessDenied::NoPermission { .. })));

        let err = svc
            .claim(&bob, "pricey", Capabilities::player(), &mut inv, &mut host, &mut wallet)
            .expect_err("too poor");
        assert!(matches!(err, ClaimError::Denied(AccessDenied::InsufficientFunds { .. })));
        assert_eq!(inv.count("gold_ingot"), 0);

        let err = svc
            .claim(&bob, "missing", Capabilities::player(), &mut inv, &mut host, &mut wallet)
            .expect_err("unknown");
        assert!(matches!(err, ClaimError::UnknownKit(_)));
    }

    #[test]
    fn rejected_stacks_are_dropped_at_the_recipient() {
        let dir = TempDir::new().expect("tempdir");
        let mut svc = service(&dir);
        svc.add_kit(
            "bulk",
            vec![ItemStack::new("stone", 64), ItemStack::new("dirt", 64)],
        )
        .expect("add");

        let carol = Recipient::new("carol");
        let mut inv = SlotInventory::new(1);
        let mut host = RecordingHost::default();
        let mut wallet = Wallet(0.0);

        let receipt = svc
            .claim(&carol, "bulk", Capabilities::player(), &mut inv, &mut host, &mut wallet)
            .expect("partial claim");
        assert!(receipt.dropped);
        assert_eq!(receipt.rejected, vec![ItemStack::new("dirt", 64)]);
        assert_eq!(host.dropped, receipt.rejected);
    }

    #[test]
    fn give_without_checks_ignores_cooldown() {
        let dir = TempDir::new().expect("tempdir");
        let mut svc = service(&dir);
        svc.add_kit("daily", vec![ItemStack::new("bread", 8)]).expect("add");
        svc.set_cooldown("daily", Some(Duration::hours(24))).expect("cooldown");

        let dave = Recipient::new("dave");
        let mut inv = SlotInventory::new(9);
        let mut host = RecordingHost::default();
        let now = Utc::now();

        svc.give(&dave, "daily", Capabilities::player(), true, &mut inv, &mut host, now)
            .expect("first give");
        let err = svc
            .give(&dave, "daily", Capabilities::player(), true, &mut inv, &mut host, now)
            .expect_err("cooldown");
        assert!(matches!(
            err,
            ClaimError::Redeem(RedeemError::CooldownNotExpired { .. })
        ));
        svc.give(&dave, "daily", Capabilities::player(), false, &mut inv, &mut host, now)
            .expect("override");
        assert_eq!(inv.count("bread"), 16);
    }

    #[test]
    fn reset_usage_clears_one_or_all() {
        let dir = TempDir::new().expect("tempdir");
        let mut svc = service(&dir);
        svc.add_kit("a", vec![ItemStack::new("apple", 1)]).expect("add a");
        svc.add_kit("b", vec![ItemStack::new("apple", 1)]).expect("add b");
        svc.set_one_time("a", true).expect("one time");

        let erin = Recipient::new("erin");
        let mut inv = SlotInventory::new(9);
        let mut host = RecordingHost::default();
        let now = Utc::now();
        svc.give(&erin, "a", Capabilities::player(), true, &mut inv, &mut host, now)
            .expect("a");
        svc.give(&erin, "b", Capabilities::player(), true, &mut inv, &mut host, now)
            .expect("b");

        assert_eq!(svc.reset_usage(&erin.uuid, Some("A")).expect("reset a"), 1);
        svc.give(&erin, "a", Capabilities::player(), true, &mut inv, &mut host, now)
            .expect("a again after reset");
        assert_eq!(svc.reset_usage(&erin.uuid, None).expect("reset all"), 2);
        assert!(matches!(
            svc.reset_usage(&uuid::Uuid::new_v4(), None),
            Err(KitError::NotFound(_))
        ));
    }

    #[test]
    fn first_join_kits_are_granted_once() {
        let dir = TempDir::new().expect("tempdir");
        let mut svc = service(&dir);
        svc.add_kit("starter", vec![ItemStack::new("wooden_sword", 1)])
            .expect("add");
        svc.set_auto_redeem("starter", true).expect("auto");
        svc.add_command("starter", "/say welcome {player}").expect("command");

        let frank = Recipient::new("frank");
        let mut inv = SlotInventory::new(9);
        let mut host = RecordingHost::default();

        let granted = svc
            .grant_first_join_kits(&frank, &mut inv, &mut host)
            .expect("grant");
        assert_eq!(granted, vec!["starter".to_string()]);
        assert_eq!(host.commands, vec!["say welcome frank"]);

        let again = svc
            .grant_first_join_kits(&frank, &mut inv, &mut host)
            .expect("second grant");
        assert!(again.is_empty());
        assert_eq!(inv.count("wooden_sword"), 1);
    }

    #[test]
    fn editor_blocks_second_open_and_admin_changes() {
        let dir = TempDir::new().expect("tempdir");
        let mut svc = service(&dir);
        svc.add_kit("tools", vec![ItemStack::new("iron_pickaxe", 1)])
            .expect("add");

        let session = svc.open_editor("tools", 1).expect("open");
        assert_eq!(session.working_copy.len(), 27);
        assert!(matches!(svc.open_editor("TOOLS", 2), Err(KitError::Busy(_))));
        assert!(matches!(svc.rename_kit("tools", "gear"), Err(KitError::Busy(_))));
        assert!(matches!(svc.set_cost("tools", 1.0), Err(KitError::Busy(_))));

        if let Some(session) = svc.editor_session_mut(1) {
            session.working_copy[1] = Some(ItemStack::new("torch", 16));
        }
        assert_eq!(
            svc.close_editor(1, true).expect("close"),
            Some("tools".to_string())
        );
        assert!(!svc.is_editing("tools"));

        let kit = svc.view_kit("tools").expect("kit");
        assert_eq!(kit.item_stacks.len(), 2);
        svc.rename_kit("tools", "gear").expect("rename after close");
        assert_eq!(svc.list_kits(false), vec!["gear".to_string()]);
    }

    #[test]
    fn remove_command_out_of_range_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let mut svc = service(&dir);
        svc.add_kit("cmds", Vec::new()).expect("add");
        svc.add_command("cmds", "give {player} cake 1").expect("add command");

        assert!(matches!(
            svc.remove_command("cmds", 3),
            Err(KitError::NotFound(_))
        ));
        assert_eq!(
            svc.remove_command("cmds", 0).expect("remove"),
            "give {player} cake 1"
        );
        assert!(svc.view_kit("cmds").expect("kit").commands.is_empty());
    }
}
