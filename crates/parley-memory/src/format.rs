//! Render conversation history for inclusion in a model prompt

use crate::{ConversationStore, Message};

/// First line of a non-empty history block
pub const HISTORY_HEADER: &str = "Previous conversation:";

/// Render the store's current contents as a prompt history block.
///
/// Returns an empty string for an empty store; callers should then omit the
/// history section entirely. Otherwise the block is the header line, one
/// `Role: content` line per message in stored order, and a trailing newline.
pub fn format_for_prompt(store: &ConversationStore) -> String {
    store.with_messages(format_messages)
}

/// Same rendering as [`format_for_prompt`] over an explicit slice
pub fn format_messages(messages: &[Message]) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let mut out = String::from(HISTORY_HEADER);
    out.push('\n');
    for message in messages {
        out.push_str(message.role.label());
        out.push_str(": ");
        out.push_str(&message.content);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[test]
    fn test_empty_store_formats_to_nothing() {
        let store = ConversationStore::new(3).unwrap();
        assert_eq!(format_for_prompt(&store), "");
    }

    #[test]
    fn test_window_scenario() {
        let store = ConversationStore::new(3).unwrap();
        store.append("user", "hi").unwrap();
        store.append("assistant", "hello").unwrap();
        store.append("user", "how are you").unwrap();
        store.append("assistant", "fine, thanks").unwrap();

        assert_eq!(
            format_for_prompt(&store),
            "Previous conversation:\nAssistant: hello\nUser: how are you\nAssistant: fine, thanks\n"
        );

        store.clear();
        assert_eq!(format_for_prompt(&store), "");
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let store = ConversationStore::new(4).unwrap();
        store.push(Role::User, "What is Rust?");
        store.push(Role::Assistant, "A systems language.");

        let first = format_for_prompt(&store);
        let second = format_for_prompt(&store);
        assert_eq!(first, second);
        assert_eq!(store.size(), 2);
    }

    #[test]
    fn test_multiline_content_kept_verbatim() {
        let store = ConversationStore::new(2).unwrap();
        store.push(Role::Assistant, "line one\nline two");
        assert_eq!(
            format_for_prompt(&store),
            "Previous conversation:\nAssistant: line one\nline two\n"
        );
    }

    #[test]
    fn test_format_messages_matches_store_rendering() {
        let store = ConversationStore::new(2).unwrap();
        store.push(Role::User, "ping");
        assert_eq!(format_messages(&store.snapshot()), format_for_prompt(&store));
    }
}
