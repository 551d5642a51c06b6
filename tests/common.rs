//! Test utilities & fixtures.
//! Provides a fixture kit document under `tests/test-data-int` plus a host and
//! an economy that record what the engine asked of them.

use std::path::{Path, PathBuf};

use kitredeem::kits::{
    Economy, HookOutcome, ItemStack, KitHost, KitService, KitStore, PolicySettings,
    ProfileStoreBuilder, RedeemEvent, Recipient,
};

/// Return the path to the static integration test fixture directory.
pub fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("test-data-int")
}

/// A temp dir holding a copy of the fixture kit document.
#[allow(dead_code)]
pub fn writable_fixture() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::fs::copy(
        fixture_root().join("kits.json"),
        tmp.path().join("kits.json"),
    )
    .expect("copy fixture");
    tmp
}

/// Service over `dir` with a throwaway profile database.
#[allow(dead_code)]
pub fn service_in(dir: &Path, settings: PolicySettings) -> KitService {
    let store = KitStore::open(dir).expect("kit store");
    let profiles = ProfileStoreBuilder::new(dir.join("profiles"))
        .temporary()
        .open()
        .expect("profile store");
    KitService::new(store, profiles, settings, 36)
}

#[derive(Default)]
pub struct RecordingHost {
    pub cancel_with: Option<Option<String>>,
    pub events: Vec<String>,
    pub commands: Vec<String>,
    pub dropped: Vec<ItemStack>,
}

#[allow(dead_code)]
impl RecordingHost {
    pub fn cancelling(message: &str) -> Self {
        Self {
            cancel_with: Some(Some(message.to_string())),
            ..Self::default()
        }
    }
}

impl KitHost for RecordingHost {
    fn pre_redeem(&mut self, event: &RedeemEvent<'_>) -> HookOutcome {
        self.events.push(format!("pre:{}", event.kit.name));
        match self.cancel_with.clone() {
            Some(message) => HookOutcome::Cancel(message),
            None => HookOutcome::Proceed,
        }
    }

    fn post_redeem(&mut self, event: &RedeemEvent<'_>) {
        self.events.push(format!("post:{}", event.kit.name));
    }

    fn failed_redeem(&mut self, event: &RedeemEvent<'_>) {
        self.events.push(format!("failed:{}", event.kit.name));
    }

    fn dispatch_command(&mut self, command: &str) -> bool {
        self.commands.push(command.to_string());
        true
    }

    fn drop_item(&mut self, _recipient: &Recipient, stack: ItemStack) {
        self.dropped.push(stack);
    }
}

/// Flat balance shared by every recipient.
pub struct Wallet {
    pub balance: f64,
    pub withdrawals: Vec<f64>,
}

#[allow(dead_code)]
impl Wallet {
    pub fn with(balance: f64) -> Self {
        Self {
            balance,
            withdrawals: Vec::new(),
        }
    }
}

impl Economy for Wallet {
    fn balance(&self, _recipient: &Recipient) -> f64 {
        self.balance
    }

    fn withdraw(&mut self, _recipient: &Recipient, amount: f64) -> bool {
        if self.balance < amount {
            return false;
        }
        self.balance -= amount;
        self.withdrawals.push(amount);
        true
    }
}
