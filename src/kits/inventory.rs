//! Inventory allocation for kit delivery: deposit, snapshot and rollback.
use super::types::ItemStack;

// ============================================================================
// Container seam
// ============================================================================

/// A mutable slot container owned by the host (a player's inventory).
pub trait Container {
    /// Every slot in order, including empty ones.
    fn contents(&self) -> Vec<Option<ItemStack>>;

    /// Overwrite every slot. `slots.len()` equals the container size.
    fn set_contents(&mut self, slots: Vec<Option<ItemStack>>);

    /// Try to place `stack`, returning whatever could not be placed.
    fn offer(&mut self, stack: ItemStack) -> Option<ItemStack>;
}

/// A fixed-size slot array with vanilla-style stacking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInventory {
    slots: Vec<Option<ItemStack>>,
}

impl SlotInventory {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }

    pub fn set_slot(&mut self, index: usize, stack: Option<ItemStack>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = stack;
        }
    }

    /// Put `stack` into every empty slot, filling the inventory.
    pub fn fill_with(&mut self, stack: &ItemStack) {
        for slot in self.slots.iter_mut().filter(|s| s.is_none()) {
            *slot = Some(stack.clone());
        }
    }

    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Total amount of `material` across all slots.
    pub fn count(&self, material: &str) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.material == material)
            .map(|s| s.amount)
            .sum()
    }
}

impl Container for SlotInventory {
    fn contents(&self) -> Vec<Option<ItemStack>> {
        self.slots.clone()
    }

    fn set_contents(&mut self, slots: Vec<Option<ItemStack>>) {
        self.slots = slots;
    }

    fn offer(&mut self, mut stack: ItemStack) -> Option<ItemStack> {
        if stack.is_empty() {
            return None;
        }

        // Top up existing similar stacks first
        for existing in self.slots.iter_mut().flatten() {
            if stack.amount == 0 {
                break;
            }
            if existing.is_similar(&stack) {
                let moved = existing.room().min(stack.amount);
                existing.amount += moved;
                stack.amount -= moved;
            }
        }

        // Then open new stacks in empty slots
        for slot in self.slots.iter_mut() {
            if stack.amount == 0 {
                break;
            }
            if slot.is_none() {
                let moved = stack.amount.min(stack.max_stack.max(1));
                let mut placed = stack.clone();
                placed.amount = moved;
                *slot = Some(placed);
                stack.amount -= moved;
            }
        }

        if stack.amount == 0 {
            None
        } else {
            Some(stack)
        }
    }
}

// ============================================================================
// Allocation
// ============================================================================

/// Full copy of every slot taken before a deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySnapshot {
    slots: Vec<Option<ItemStack>>,
}

impl InventorySnapshot {
    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }
}

/// Result of offering a batch of stacks to a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    /// At least one offered stack was fully or partially accepted
    pub deposited: bool,
    /// Stacks (or remainders of stacks) the container refused
    pub rejected: Vec<ItemStack>,
}

/// Capture every slot of `target`, not only the ones a kit will touch.
pub fn snapshot(target: &dyn Container) -> InventorySnapshot {
    InventorySnapshot {
        slots: target.contents(),
    }
}

/// Put `target` back exactly as it was when `snapshot` was taken.
pub fn restore(snapshot: &InventorySnapshot, target: &mut dyn Container) {
    target.set_contents(snapshot.slots.clone());
}

/// Offer each stack independently. Accepted items are not individually
/// reversible; callers roll back with [`restore`].
pub fn offer_all(stacks: Vec<ItemStack>, target: &mut dyn Container) -> Allocation {
    let mut allocation = Allocation::default();
    for stack in stacks {
        if stack.is_empty() {
            continue;
        }
        let offered = stack.amount;
        match target.offer(stack) {
            None => allocation.deposited = true,
            Some(leftover) => {
                if leftover.amount < offered {
                    allocation.deposited = true;
                }
                allocation.rejected.push(leftover);
            }
        }
    }
    allocation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_merges_before_using_empty_slots() {
        let mut inv = SlotInventory::new(3);
        inv.set_slot(1, Some(ItemStack::new("bread", 60)));
        let leftover = inv.offer(ItemStack::new("bread", 10));
        assert!(leftover.is_none());
        assert_eq!(inv.slot(1).map(|s| s.amount), Some(64));
        assert_eq!(inv.slot(0).map(|s| s.amount), Some(6));
        assert_eq!(inv.count("bread"), 70);
    }

    #[test]
    fn offer_splits_over_max_stack() {
        let mut inv = SlotInventory::new(2);
        let leftover = inv.offer(ItemStack::new("arrow", 200));
        assert_eq!(leftover.map(|s| s.amount), Some(72));
        assert_eq!(inv.free_slots(), 0);
    }

    #[test]
    fn full_inventory_rejects_everything() {
        let mut inv = SlotInventory::new(2);
        inv.fill_with(&ItemStack::new("dirt", 64));
        let allocation = offer_all(vec![ItemStack::new("sword", 1)], &mut inv);
        assert!(!allocation.deposited);
        assert_eq!(allocation.rejected, vec![ItemStack::new("sword", 1)]);
    }

    #[test]
    fn partial_acceptance_counts_as_deposited() {
        let mut inv = SlotInventory::new(1);
        let allocation = offer_all(vec![ItemStack::new("arrow", 100)], &mut inv);
        assert!(allocation.deposited);
        assert_eq!(allocation.rejected.len(), 1);
        assert_eq!(allocation.rejected[0].amount, 36);
    }

    #[test]
    fn restore_returns_every_slot() {
        let mut inv = SlotInventory::new(4);
        inv.set_slot(3, Some(ItemStack::new("torch", 5)));
        let before = snapshot(&inv);
        offer_all(
            vec![ItemStack::new("stone", 64), ItemStack::new("torch", 10)],
            &mut inv,
        );
        inv.set_slot(2, None);
        restore(&before, &mut inv);
        assert_eq!(snapshot(&inv), before);
    }
}
