use super::format::render_bans;
use super::shared::{
    callback_chat_id, callback_payload, report_error, require_text, send_screen, show_screen,
    HandlerResult,
};
use super::state::{BotState, State, WizardDialogue};
use crate::bot::keyboards::{self, MENU_BANS};
use crate::peer::parse_ip;
use teloxide::prelude::*;
use teloxide::utils::html::escape;

pub async fn show_list(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    dialogue.update(State::Idle).await?;
    match state.api.ip_bans().await {
        Ok(bans) => show_screen(&bot, &q, render_bans(&bans), keyboards::back_to(MENU_BANS)).await,
        Err(error) => report_error(&bot, callback_chat_id(&q), "fetching IP bans", &error, keyboards::back_to(MENU_BANS)).await,
    }
}

pub async fn start_ban(bot: Bot, q: CallbackQuery, dialogue: WizardDialogue) -> HandlerResult {
    dialogue.update(State::BanIp).await?;
    show_screen(&bot, &q, "Enter the IP address to ban:", keyboards::back_to(MENU_BANS)).await
}

/// Список забаненных адресов кнопками; адрес можно и ввести вручную.
pub async fn start_unban(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    dialogue.update(State::UnbanIp).await?;
    let banned: Vec<String> = match state.api.ip_bans().await {
        Ok(bans) => bans.banned().map(str::to_string).collect(),
        Err(error) => {
            tracing::warn!(error = %error, "Could not load banned IPs, falling back to manual input");
            Vec::new()
        }
    };
    let text = if banned.is_empty() {
        "Enter the IP address to unban:"
    } else {
        "Select an IP to unban or type it:"
    };
    show_screen(&bot, &q, text, keyboards::unban_keyboard(&banned)).await
}

async fn apply(bot: &Bot, chat_id: ChatId, state: &BotState, ip: &str, ban: bool) -> HandlerResult {
    let result = if ban {
        state.api.ban_ip(ip).await
    } else {
        state.api.unban_ip(ip).await
    };
    let (verb, context) = if ban {
        ("banned", "banning IP")
    } else {
        ("unbanned", "unbanning IP")
    };
    match result {
        Ok(reply) => {
            tracing::info!(ip = ip, banned = ban, "IP ban status changed");
            let text = reply.or(format!("IP {} {}.", ip, verb));
            send_screen(bot, chat_id, format!("✅ {}", escape(&text)), keyboards::bans_menu()).await
        }
        Err(error) => report_error(bot, chat_id, context, &error, keyboards::bans_menu()).await,
    }
}

async fn receive_ip(bot: Bot, msg: Message, dialogue: WizardDialogue, state: BotState, ban: bool) -> HandlerResult {
    let Some(text) = require_text(&bot, &msg).await? else {
        return Ok(());
    };
    let ip = match parse_ip(text) {
        Ok(ip) => ip.to_string(),
        Err(error) => {
            bot.send_message(msg.chat.id, error.to_string()).await?;
            return Ok(());
        }
    };
    dialogue.update(State::Idle).await?;
    apply(&bot, msg.chat.id, &state, &ip, ban).await
}

pub async fn receive_ban_ip(bot: Bot, msg: Message, dialogue: WizardDialogue, state: BotState) -> HandlerResult {
    receive_ip(bot, msg, dialogue, state, true).await
}

pub async fn receive_unban_ip(bot: Bot, msg: Message, dialogue: WizardDialogue, state: BotState) -> HandlerResult {
    receive_ip(bot, msg, dialogue, state, false).await
}

pub async fn pick_unban(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    let Ok(ip) = parse_ip(callback_payload(&q, "unban:")) else {
        bot.answer_callback_query(q.id.clone())
            .text("This menu has expired")
            .await?;
        return Ok(());
    };
    bot.answer_callback_query(q.id.clone()).await?;
    dialogue.update(State::Idle).await?;
    apply(&bot, callback_chat_id(&q), &state, &ip.to_string(), false).await
}
