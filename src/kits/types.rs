use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const KIT_SCHEMA_VERSION: u8 = 1;
pub const PROFILE_SCHEMA_VERSION: u8 = 1;

/// Longest cooldown a kit may carry: 100 years, in seconds.
pub const MAX_COOLDOWN_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Placeholder replaced with the recipient's username in kit commands.
pub const PLAYER_PLACEHOLDER: &str = "{player}";

fn default_max_stack() -> u32 {
    64
}

/// A stack of identical items as held in an inventory slot or a kit template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemStack {
    /// Material / item type identifier (e.g. `iron_sword`)
    pub material: String,
    /// Number of items in this stack
    pub amount: u32,
    /// Largest amount a single slot may hold for this material
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    /// Custom display name, may carry `%token%` markers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Lore lines, may carry `%token%` markers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lore: Vec<String>,
}

impl ItemStack {
    pub fn new(material: &str, amount: u32) -> Self {
        Self {
            material: material.to_string(),
            amount,
            max_stack: default_max_stack(),
            display_name: None,
            lore: Vec::new(),
        }
    }

    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack.max(1);
        self
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    pub fn with_lore(mut self, line: &str) -> Self {
        self.lore.push(line.to_string());
        self
    }

    /// Same material and metadata; amounts may differ.
    pub fn is_similar(&self, other: &ItemStack) -> bool {
        self.material == other.material
            && self.display_name == other.display_name
            && self.lore == other.lore
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    /// Free room left in this stack before it reaches `max_stack`.
    pub fn room(&self) -> u32 {
        self.max_stack.saturating_sub(self.amount)
    }
}

/// The user a kit is being redeemed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub uuid: Uuid,
    pub username: String,
    pub display_name: String,
    pub world: Option<String>,
}

impl Recipient {
    pub fn new(username: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            username: username.to_string(),
            display_name: username.to_string(),
            world: None,
        }
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    pub fn in_world(mut self, world: &str) -> Self {
        self.world = Some(world.to_string());
        self
    }
}

/// An administrator-defined bundle of item stacks and console commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kit {
    pub name: String,
    #[serde(default)]
    pub item_stacks: Vec<ItemStack>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub cost: f64,
    /// Cooldown in whole seconds; `None` means no cooldown
    #[serde(default, rename = "cooldown", skip_serializing_if = "Option::is_none")]
    pub cooldown_secs: Option<i64>,
    #[serde(default)]
    pub one_time: bool,
    #[serde(default)]
    pub ignores_permission: bool,
    #[serde(default)]
    pub first_join_kit: bool,
    #[serde(default)]
    pub display_message_on_redeem: bool,
    /// Left out of name listings unless hidden kits are requested
    #[serde(default)]
    pub hidden: bool,
}

impl Kit {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            item_stacks: Vec::new(),
            commands: Vec::new(),
            cost: 0.0,
            cooldown_secs: None,
            one_time: false,
            ignores_permission: false,
            first_join_kit: false,
            display_message_on_redeem: false,
            hidden: false,
        }
    }

    /// Case-insensitive key used by the store and the usage ledger.
    pub fn key(&self) -> String {
        kit_key(&self.name)
    }

    pub fn cooldown(&self) -> Option<Duration> {
        self.cooldown_secs
            .filter(|secs| *secs > 0)
            .and_then(|secs| Duration::try_seconds(secs.min(MAX_COOLDOWN_SECS)))
    }

    /// Non-positive cooldowns clear it; longer ones are capped at
    /// [`MAX_COOLDOWN_SECS`].
    pub fn set_cooldown(&mut self, cooldown: Option<Duration>) {
        self.cooldown_secs = cooldown
            .map(|d| d.num_seconds().min(MAX_COOLDOWN_SECS))
            .filter(|secs| *secs > 0);
    }

    /// Bring values read from disk back into range.
    pub fn normalize(&mut self) {
        self.set_cooldown(self.cooldown());
        self.set_cost(self.cost);
    }

    /// Costs are never negative.
    pub fn set_cost(&mut self, cost: f64) {
        self.cost = if cost.is_finite() { cost.max(0.0) } else { 0.0 };
    }

    pub fn with_item(mut self, stack: ItemStack) -> Self {
        self.item_stacks.push(stack);
        self
    }

    pub fn with_command(mut self, command: &str) -> Self {
        self.commands.push(command.to_string());
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.set_cooldown(Some(cooldown));
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.set_cost(cost);
        self
    }

    pub fn one_time(mut self) -> Self {
        self.one_time = true;
        self
    }

    /// Copy every field except the name into a kit called `name`.
    pub fn renamed(&self, name: &str) -> Kit {
        Kit {
            name: name.to_string(),
            ..self.clone()
        }
    }

    /// Command lines with the player placeholder substituted.
    pub fn render_commands(&self, recipient: &Recipient) -> Vec<String> {
        self.commands
            .iter()
            .map(|template| template.replace(PLAYER_PLACEHOLDER, &recipient.username))
            .collect()
    }
}

pub fn kit_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Resolved capability checks for one (user, kit) pair, supplied by the
/// external permission system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Holds the per-kit access permission
    pub kit_access: bool,
    pub bypass_one_time: bool,
    pub bypass_cooldown: bool,
    pub bypass_cost: bool,
    /// Administrative override: skip all usage checks
    pub ignore_checks: bool,
}

impl Capabilities {
    /// A regular player who may use the kit but holds no exemptions.
    pub fn player() -> Self {
        Self {
            kit_access: true,
            ..Self::default()
        }
    }

    /// Every exemption held.
    pub fn admin() -> Self {
        Self {
            kit_access: true,
            bypass_one_time: true,
            bypass_cooldown: true,
            bypass_cost: true,
            ignore_checks: true,
        }
    }
}
