//! Recipient-aware rendering of `%token%` markers in item display names and lore.
//!
//! Supported tokens: `%player%`, `%displayname%`, `%uuid%`, `%world%`.
//! Unknown tokens are left verbatim. Substituted values never contain `%`,
//! and rendering runs to a fixed point, so rendered text renders to itself.

use super::types::{ItemStack, Recipient};

const MARKER: char = '%';

/// Render every stack in place for `recipient`.
pub fn process(stacks: &mut [ItemStack], recipient: &Recipient) {
    for stack in stacks.iter_mut() {
        if let Some(name) = stack.display_name.as_mut() {
            if has_marker(name) {
                *name = render(name, recipient);
            }
        }
        for line in stack.lore.iter_mut() {
            if has_marker(line) {
                *line = render(line, recipient);
            }
        }
    }
}

/// Cheap pre-check so untouched text is never reallocated.
pub fn has_marker(text: &str) -> bool {
    text.contains(MARKER)
}

fn lookup(token: &str, recipient: &Recipient) -> Option<String> {
    let value = match token.to_ascii_lowercase().as_str() {
        "player" => recipient.username.clone(),
        "displayname" => recipient.display_name.clone(),
        "uuid" => recipient.uuid.to_string(),
        "world" => recipient.world.clone().unwrap_or_default(),
        _ => return None,
    };
    Some(value.replace(MARKER, ""))
}

/// Render `text` until it stops changing. Each pass that changes the text
/// consumes at least two markers, so this terminates.
pub fn render(text: &str, recipient: &Recipient) -> String {
    let mut current = render_pass(text, recipient);
    loop {
        let next = render_pass(&current, recipient);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn render_pass(text: &str, recipient: &Recipient) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(MARKER) {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(MARKER) {
            Some(end) => {
                let token = &after[..end];
                match lookup(token, recipient) {
                    Some(value) => {
                        out.push_str(&value);
                        rest = &after[end + 1..];
                    }
                    None => {
                        // Keep the opening marker; the closing one may start a real token
                        out.push(MARKER);
                        rest = after;
                    }
                }
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn alice() -> Recipient {
        Recipient::new("alice")
            .with_uuid(Uuid::nil())
            .with_display_name("Alice the Brave")
            .in_world("overworld")
    }

    #[test]
    fn renders_known_tokens() {
        let out = render("Sword of %player% in %world%", &alice());
        assert_eq!(out, "Sword of alice in overworld");
        let out = render("%displayname%'s bread", &alice());
        assert_eq!(out, "Alice the Brave's bread");
        let out = render("%UUID%", &alice());
        assert_eq!(out, Uuid::nil().to_string());
    }

    #[test]
    fn unknown_tokens_and_lone_markers_survive() {
        assert_eq!(render("100% %nope% fun", &alice()), "100% %nope% fun");
        assert_eq!(render("50%%player%", &alice()), "50%alice");
    }

    #[test]
    fn rendering_twice_matches_rendering_once() {
        let sneaky = Recipient::new("%player%").with_display_name("x%world%y");
        for text in ["%player%", "hi %displayname%!", "%%player%%", "odd % marker"] {
            let once = render(text, &sneaky);
            assert_eq!(render(&once, &sneaky), once, "text: {}", text);
        }
    }

    #[test]
    fn process_touches_name_and_lore_only_with_markers() {
        let mut stacks = vec![
            ItemStack::new("book", 1)
                .with_display_name("Diary of %player%")
                .with_lore("Owned by %displayname%")
                .with_lore("plain line"),
            ItemStack::new("stone", 3),
        ];
        process(&mut stacks, &alice());
        assert_eq!(stacks[0].display_name.as_deref(), Some("Diary of alice"));
        assert_eq!(stacks[0].lore[0], "Owned by Alice the Brave");
        assert_eq!(stacks[0].lore[1], "plain line");
        assert_eq!(stacks[1], ItemStack::new("stone", 3));
    }
}
