use super::state::BotState;
use crate::api::{ApiError, Peer};
use crate::peer::{config_file, interface_name};
use crate::render::qr_png;
use std::fmt::Display;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, InputFile, MessageId, ParseMode};

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub fn callback_message_target(q: &CallbackQuery) -> Option<(ChatId, MessageId)> {
    q.message.as_ref().map(|msg| (msg.chat().id, msg.id()))
}

pub fn callback_chat_id(q: &CallbackQuery) -> ChatId {
    callback_message_target(q)
        .map(|(chat_id, _)| chat_id)
        .unwrap_or(ChatId(q.from.id.0 as i64))
}

pub fn callback_prefix_filter(prefix: &'static str) -> impl Fn(CallbackQuery) -> Option<CallbackQuery> {
    move |q: CallbackQuery| {
        if q.data.as_deref().is_some_and(|payload| payload.starts_with(prefix)) {
            Some(q)
        } else {
            None
        }
    }
}

pub fn callback_payload<'a>(q: &'a CallbackQuery, prefix: &str) -> &'a str {
    q.data
        .as_deref()
        .and_then(|data| data.strip_prefix(prefix))
        .unwrap_or("")
}

/// `wg0:alice` -> (`wg0`, `alice`). Имя интерфейса не содержит `:`.
pub fn split_target(payload: &str) -> Option<(&str, &str)> {
    let (interface, peer_name) = payload.split_once(':')?;
    if interface.is_empty() || peer_name.is_empty() {
        None
    } else {
        Some((interface, peer_name))
    }
}

/// Текст сообщения; на стикеры и фото просим прислать текст.
pub async fn require_text<'a>(
    bot: &Bot,
    msg: &'a Message,
) -> Result<Option<&'a str>, teloxide::RequestError> {
    match msg.text() {
        Some(text) => Ok(Some(text)),
        None => {
            bot.send_message(msg.chat.id, "Please send a text message.")
                .await?;
            Ok(None)
        }
    }
}

pub fn error_text(context: &str, error: &dyn Display) -> String {
    format!("❌ Error {}: {}", context, error)
}

pub async fn report_error(
    bot: &Bot,
    chat_id: ChatId,
    context: &str,
    error: &(dyn Display + Sync),
    back: InlineKeyboardMarkup,
) -> HandlerResult {
    tracing::warn!(chat_id = chat_id.0, context = context, error = %error, "Operation failed");
    bot.send_message(chat_id, error_text(context, error))
        .reply_markup(back)
        .await?;
    Ok(())
}

pub async fn send_screen(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
) -> HandlerResult {
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

/// Перерисовывает сообщение с кнопкой; если это невозможно (фото, удалено), шлёт новое.
pub async fn show_screen(
    bot: &Bot,
    q: &CallbackQuery,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
) -> HandlerResult {
    let text = text.into();
    if let Some((chat_id, message_id)) = callback_message_target(q) {
        match bot
            .edit_message_text(chat_id, message_id, text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard.clone())
            .await
        {
            Ok(_) => return Ok(()),
            Err(error) => {
                tracing::debug!(error = %error, "Could not edit menu message, sending a new one");
            }
        }
    }
    send_screen(bot, callback_chat_id(q), text, keyboard).await
}

pub async fn find_peers(state: &BotState, interface: &str, query: &str) -> Result<Vec<Peer>, ApiError> {
    let peers = state.api.peers_by_interface(interface, None).await?;
    Ok(peers.into_iter().filter(|peer| peer.matches(query)).collect())
}

pub async fn send_peer_config(
    bot: &Bot,
    chat_id: ChatId,
    state: &BotState,
    peer_name: &str,
    config: &str,
) -> Result<(), anyhow::Error> {
    let text = state.api.peer_config(peer_name, config).await?;
    tracing::info!(peer_name = peer_name, config = %config_file(config), "Sending peer config");
    bot.send_document(
        chat_id,
        InputFile::memory(text.into_bytes()).file_name(format!("{}.conf", peer_name)),
    )
    .caption(format!("Config for {} ({})", peer_name, interface_name(config)))
    .await?;
    Ok(())
}

pub async fn send_peer_qr(
    bot: &Bot,
    chat_id: ChatId,
    state: &BotState,
    peer_name: &str,
    config: &str,
) -> Result<(), anyhow::Error> {
    let png = if state.config.render_qr_locally {
        let text = state.api.peer_config(peer_name, config).await?;
        qr_png(&text)?
    } else {
        state.api.peer_qr(peer_name, config).await?
    };
    tracing::info!(
        peer_name = peer_name,
        config = %config_file(config),
        local = state.config.render_qr_locally,
        "Sending peer QR code"
    );
    bot.send_photo(
        chat_id,
        InputFile::memory(png).file_name(format!("{}.png", peer_name)),
    )
    .caption(format!("QR code for {}", peer_name))
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_target_uses_first_colon() {
        assert_eq!(split_target("wg0:alice"), Some(("wg0", "alice")));
        assert_eq!(split_target("wg0:a:b"), Some(("wg0", "a:b")));
        assert_eq!(split_target("wg0:"), None);
        assert_eq!(split_target("alice"), None);
    }

    #[test]
    fn error_text_has_context() {
        assert_eq!(
            error_text("creating peer", &"IP already in use"),
            "❌ Error creating peer: IP already in use"
        );
    }
}
