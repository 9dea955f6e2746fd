//! Model Prompt Assembly

use relay_common::{ConversationMessage, Role};

/// Build the message list sent to the model.
///
/// The server's system message always comes first; caller-supplied system
/// messages are dropped so callers cannot replace the persona. The rest of
/// the history keeps its order.
pub fn build_messages(
    system_prompt: &str,
    login: Option<&str>,
    history: Vec<ConversationMessage>,
) -> Vec<ConversationMessage> {
    std::iter::once(system_message(system_prompt, login))
        .chain(history.into_iter().filter(|m| !m.role.is_system()))
        .collect()
}

fn system_message(system_prompt: &str, login: Option<&str>) -> ConversationMessage {
    let content = match login {
        Some(login) => format!("{system_prompt}\n\nThe user's GitHub login is: {login}"),
        None => system_prompt.to_string(),
    };
    ConversationMessage::new(Role::System, content)
}
