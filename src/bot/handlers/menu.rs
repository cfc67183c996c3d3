use super::shared::{callback_payload, send_screen, show_screen, HandlerResult};
use super::state::{BotState, State, WizardDialogue};
use super::{backups, bans, create_peer, edit_peer, metrics, peers};
use crate::bot::keyboards;
use teloxide::prelude::*;

pub const MAIN_MENU_TEXT: &str = "🛡 WireGuard panel\nChoose a section:";
pub const PEERS_MENU_TEXT: &str = "👥 Peers\nChoose an action:";
pub const BACKUPS_MENU_TEXT: &str = "💾 Backups\nChoose an action:";
pub const BANS_MENU_TEXT: &str = "🚫 IP bans\nChoose an action:";

pub async fn send_main_menu(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    send_screen(bot, chat_id, MAIN_MENU_TEXT, keyboards::main_menu()).await
}

/// Переходы по разделам всегда доступны и сбрасывают мастер.
pub async fn callback_menu(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    dialogue.update(State::Idle).await?;
    let target = callback_payload(&q, "menu:").to_string();
    tracing::debug!(user_id = q.from.id.0, target = %target, "Menu callback");

    match target.as_str() {
        "peers" => {
            bot.answer_callback_query(q.id.clone()).await?;
            show_screen(&bot, &q, PEERS_MENU_TEXT, keyboards::peers_menu()).await
        }
        "backups" => {
            bot.answer_callback_query(q.id.clone()).await?;
            show_screen(&bot, &q, BACKUPS_MENU_TEXT, keyboards::backups_menu()).await
        }
        "bans" => {
            bot.answer_callback_query(q.id.clone()).await?;
            show_screen(&bot, &q, BANS_MENU_TEXT, keyboards::bans_menu()).await
        }
        "metrics" => metrics::show_metrics(bot, q, state).await,
        _ => {
            bot.answer_callback_query(q.id.clone()).await?;
            show_screen(&bot, &q, MAIN_MENU_TEXT, keyboards::main_menu()).await
        }
    }
}

pub async fn callback_peers_action(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let action = callback_payload(&q, "peers:").to_string();
    tracing::info!(user_id = q.from.id.0, action = %action, "Peers menu action");

    match action.as_str() {
        "create" => create_peer::start(bot, q, dialogue, state).await,
        "edit" => edit_peer::start(bot, q, dialogue, state).await,
        "delete" => peers::start_delete(bot, q, dialogue).await,
        "status" => peers::start_status(bot, q, dialogue).await,
        "block" => peers::start_block(bot, q, dialogue).await,
        "download" => peers::start_download(bot, q, dialogue).await,
        _ => show_screen(&bot, &q, PEERS_MENU_TEXT, keyboards::peers_menu()).await,
    }
}

pub async fn callback_backups_action(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    dialogue.update(State::Idle).await?;
    bot.answer_callback_query(q.id.clone()).await?;
    let action = callback_payload(&q, "backups:").to_string();
    tracing::info!(user_id = q.from.id.0, action = %action, "Backups menu action");

    match action.as_str() {
        "show" => backups::show_list(bot, q, state).await,
        "create" => backups::create(bot, q, state).await,
        "delete" => backups::pick_for_delete(bot, q, state).await,
        "restore" => backups::pick_for_restore(bot, q, state).await,
        _ => show_screen(&bot, &q, BACKUPS_MENU_TEXT, keyboards::backups_menu()).await,
    }
}

pub async fn callback_bans_action(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let action = callback_payload(&q, "bans:").to_string();
    tracing::info!(user_id = q.from.id.0, action = %action, "IP bans menu action");

    match action.as_str() {
        "show" => bans::show_list(bot, q, dialogue, state).await,
        "ban" => bans::start_ban(bot, q, dialogue).await,
        "unban" => bans::start_unban(bot, q, dialogue, state).await,
        _ => show_screen(&bot, &q, BANS_MENU_TEXT, keyboards::bans_menu()).await,
    }
}

/// Текст вне шага, который ждёт ввода.
pub async fn handle_stray_text(bot: Bot, msg: Message, dialogue: WizardDialogue) -> HandlerResult {
    let waiting_for_button = !matches!(dialogue.get().await?, None | Some(State::Idle));
    if waiting_for_button {
        bot.send_message(
            msg.chat.id,
            "Please use the buttons above, or /cancel to start over.",
        )
        .await?;
        return Ok(());
    }
    send_main_menu(&bot, msg.chat.id).await
}

/// Кнопка из старого меню, которое уже не соответствует текущему шагу.
pub async fn callback_expired(bot: Bot, q: CallbackQuery) -> HandlerResult {
    tracing::debug!(user_id = q.from.id.0, data = ?q.data, "Stale callback");
    bot.answer_callback_query(q.id.clone())
        .text("This menu has expired")
        .await?;
    Ok(())
}
