//! Message context builder for a chat turn.

use crate::types::*;
use tracing::debug;

/// Number of previous messages carried into each turn.
const HISTORY_WINDOW: usize = 20;

/// Build the full message list for an inference call.
pub fn build_messages(
    system_prompt: &str,
    previous_messages: &[ChatMessage],
    user_input: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(HISTORY_WINDOW + 2);

    messages.push(ChatMessage::system(system_prompt));

    let start = previous_messages.len().saturating_sub(HISTORY_WINDOW);
    messages.extend(previous_messages[start..].iter().cloned());

    messages.push(ChatMessage::user(user_input));

    debug!("Built {} messages for turn", messages.len());
    messages
}

/// Drop the oldest messages once history grows past twice the window.
pub fn trim_history(history: &mut Vec<ChatMessage>) {
    if history.len() > HISTORY_WINDOW * 2 {
        history.drain(..history.len() - HISTORY_WINDOW);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_system_history_user() {
        let history = vec![ChatMessage::user("a"), ChatMessage::assistant("b")];
        let messages = build_messages("sys", &history, "c");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].content, "a");
        assert_eq!(messages[3], ChatMessage::user("c"));
    }

    #[test]
    fn test_history_window_keeps_latest() {
        let history: Vec<_> = (0..30).map(|i| ChatMessage::user(i.to_string())).collect();
        let messages = build_messages("sys", &history, "now");
        assert_eq!(messages.len(), HISTORY_WINDOW + 2);
        assert_eq!(messages[1].content, "10");
    }

    #[test]
    fn test_trim_history() {
        let mut history: Vec<_> = (0..41).map(|i| ChatMessage::user(i.to_string())).collect();
        trim_history(&mut history);
        assert_eq!(history.len(), HISTORY_WINDOW);
        assert_eq!(history[0].content, "21");

        let mut short: Vec<_> = (0..5).map(|i| ChatMessage::user(i.to_string())).collect();
        trim_history(&mut short);
        assert_eq!(short.len(), 5);
    }
}
