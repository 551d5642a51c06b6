//! Kit name validation shared by the store and the admin binary.

/// Maximum length of a kit name in characters.
pub const MAX_KIT_NAME_LEN: usize = 32;

/// Kit name validation errors with helpful messages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KitNameError {
    #[error("Kit name cannot be empty")]
    Empty,

    #[error("Kit name is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Kit name cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Kit name contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Kit name is reserved: {0}")]
    Reserved(String),
}

/// Subcommand words of the kit command layer; a kit with one of these names
/// could never be addressed by `/kit <name>`.
const RESERVED_KIT_NAMES: &[&str] = &[
    "add",
    "set",
    "remove",
    "rename",
    "list",
    "view",
    "cost",
    "cooldown",
    "onetime",
    "autoredeem",
    "permissionbypass",
    "resetusage",
    "give",
    "command",
    "help",
];

/// Validate a kit name, returning it trimmed with its original casing.
///
/// Allowed characters are ASCII letters, digits, `_` and `-`, which keeps the
/// name safe to use inside permission nodes and console commands.
pub fn validate_kit_name(name: &str) -> Result<String, KitNameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(KitNameError::Empty);
    }
    if trimmed != name {
        return Err(KitNameError::InvalidWhitespace);
    }
    if trimmed.chars().count() > MAX_KIT_NAME_LEN {
        return Err(KitNameError::TooLong {
            max: MAX_KIT_NAME_LEN,
        });
    }

    let mut invalid: Vec<char> = trimmed
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        .collect();
    if !invalid.is_empty() {
        invalid.sort_unstable();
        invalid.dedup();
        let chars = invalid
            .iter()
            .map(|c| {
                if c.is_control() {
                    format!("\\u{{{:04x}}}", *c as u32)
                } else {
                    c.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        return Err(KitNameError::InvalidCharacters { chars });
    }

    let lower = trimmed.to_lowercase();
    if RESERVED_KIT_NAMES.contains(&lower.as_str()) {
        return Err(KitNameError::Reserved(lower));
    }

    Ok(trimmed.to_string())
}
