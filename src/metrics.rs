//! In-process redemption counters.
//! Global totals are plain atomics; per-kit counters sit behind a mutex that is
//! only touched once per redemption.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

static REDEEMED: AtomicU64 = AtomicU64::new(0);
static REDEEMED_PARTIAL: AtomicU64 = AtomicU64::new(0);
static REFUSED: AtomicU64 = AtomicU64::new(0);

static KIT_COUNTERS: OnceLock<Mutex<HashMap<String, KitCounter>>> = OnceLock::new();

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KitCounter {
    pub redeemed: u64,
    /// Committed with at least one rejected stack handed back
    pub partial: u64,
    /// Refusals keyed by reason label
    pub refused: HashMap<&'static str, u64>,
}

fn kit_counter_lock() -> &'static Mutex<HashMap<String, KitCounter>> {
    KIT_COUNTERS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn with_counter<R>(kit: &str, f: impl FnOnce(&mut KitCounter) -> R) -> R {
    // A poisoned lock only means another thread panicked mid-update; the
    // counters are still usable.
    let mut guard = kit_counter_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f(guard.entry(kit.to_string()).or_default())
}

pub fn record_redeemed(kit: &str, partial: bool) -> KitCounter {
    REDEEMED.fetch_add(1, Ordering::Relaxed);
    if partial {
        REDEEMED_PARTIAL.fetch_add(1, Ordering::Relaxed);
    }
    with_counter(kit, |counter| {
        counter.redeemed = counter.redeemed.saturating_add(1);
        if partial {
            counter.partial = counter.partial.saturating_add(1);
        }
        counter.clone()
    })
}

pub fn record_refused(kit: &str, reason: &'static str) -> KitCounter {
    REFUSED.fetch_add(1, Ordering::Relaxed);
    with_counter(kit, |counter| {
        let slot = counter.refused.entry(reason).or_insert(0);
        *slot = slot.saturating_add(1);
        counter.clone()
    })
}

pub fn kit_counters_snapshot() -> HashMap<String, KitCounter> {
    kit_counter_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub redeemed: u64,
    pub redeemed_partial: u64,
    pub refused: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        redeemed: REDEEMED.load(Ordering::Relaxed),
        redeemed_partial: REDEEMED_PARTIAL.load(Ordering::Relaxed),
        refused: REFUSED.load(Ordering::Relaxed),
    }
}
