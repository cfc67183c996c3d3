//! Удаление, статус, блокировка и выгрузка конфигов пиров.

use super::format::{peer_status, render_peer_card};
use super::shared::{
    callback_chat_id, callback_payload, find_peers, report_error, require_text, send_peer_config,
    send_peer_qr, send_screen, show_screen, split_target, HandlerResult,
};
use super::state::{BlockToggle, BotState, PeerTarget, State, WizardDialogue};
use crate::api::Peer;
use crate::bot::keyboards::{self, CONFIRM_YES, MENU_PEERS};
use crate::peer::{interface_name, validate_config_file};
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html::escape;

async fn ask_interface(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &WizardDialogue,
    state: &BotState,
    next: State,
) -> HandlerResult {
    let interfaces = match state.api.interfaces().await {
        Ok(interfaces) => interfaces,
        Err(error) => {
            dialogue.update(State::Idle).await?;
            return report_error(bot, chat_id, "fetching interfaces", &error, keyboards::back_to(MENU_PEERS)).await;
        }
    };
    if interfaces.is_empty() {
        dialogue.update(State::Idle).await?;
        return send_screen(bot, chat_id, "No interfaces found.", keyboards::back_to(MENU_PEERS)).await;
    }
    dialogue.update(next).await?;
    send_screen(
        bot,
        chat_id,
        "Select an interface:",
        keyboards::choices("iface:", &interfaces, MENU_PEERS),
    )
    .await
}

async fn receive_query(bot: &Bot, msg: &Message) -> Result<Option<String>, teloxide::RequestError> {
    let Some(text) = require_text(bot, msg).await? else {
        return Ok(None);
    };
    let query = text.trim();
    if query.is_empty() {
        bot.send_message(msg.chat.id, "Please enter a peer name.").await?;
        return Ok(None);
    }
    Ok(Some(query.to_string()))
}

pub async fn start_delete(bot: Bot, q: CallbackQuery, dialogue: WizardDialogue) -> HandlerResult {
    dialogue.update(State::DeleteName).await?;
    show_screen(
        &bot,
        &q,
        "🗑 Delete peer\nEnter the peer name (or part of it):",
        keyboards::back_to(MENU_PEERS),
    )
    .await
}

pub async fn receive_delete_name(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    let Some(query) = receive_query(&bot, &msg).await? else {
        return Ok(());
    };
    ask_interface(&bot, msg.chat.id, &dialogue, &state, State::DeleteInterface(query)).await
}

pub async fn pick_delete_interface(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
    query: String,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let interface = callback_payload(&q, "iface:").to_string();
    let matches = match find_peers(&state, &interface, &query).await {
        Ok(matches) => matches,
        Err(error) => {
            dialogue.update(State::Idle).await?;
            return report_error(&bot, callback_chat_id(&q), "fetching peers", &error, keyboards::back_to(MENU_PEERS)).await;
        }
    };
    if matches.is_empty() {
        dialogue.update(State::Idle).await?;
        return show_screen(
            &bot,
            &q,
            format!("No peers matching '{}' on {}.", escape(&query), escape(&interface)),
            keyboards::back_to(MENU_PEERS),
        )
        .await;
    }

    let keyboard = keyboards::delete_peers_keyboard(&interface, &matches);
    dialogue.update(State::DeletePick(interface)).await?;
    show_screen(&bot, &q, "Select the peer to delete:", keyboard).await
}

pub async fn pick_delete_peer(bot: Bot, q: CallbackQuery, dialogue: WizardDialogue) -> HandlerResult {
    let Some((interface, peer_name)) = split_target(callback_payload(&q, "pdel:")) else {
        bot.answer_callback_query(q.id.clone())
            .text("This menu has expired")
            .await?;
        return Ok(());
    };
    bot.answer_callback_query(q.id.clone()).await?;
    let text = format!(
        "Delete peer '{}' from {}? This cannot be undone.",
        escape(peer_name),
        escape(interface)
    );
    let target = PeerTarget {
        interface: interface.to_string(),
        peer_name: peer_name.to_string(),
    };
    dialogue.update(State::DeleteConfirm(target)).await?;
    show_screen(&bot, &q, text, keyboards::confirm_keyboard("🗑 Delete", "❌ Cancel")).await
}

pub async fn confirm_delete(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
    target: PeerTarget,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    dialogue.update(State::Idle).await?;
    if q.data.as_deref() != Some(CONFIRM_YES) {
        return show_screen(&bot, &q, "Deletion cancelled.", keyboards::peers_menu()).await;
    }

    match state.api.delete_peer(&target.peer_name, &target.interface).await {
        Ok(reply) => {
            tracing::info!(peer_name = %target.peer_name, interface = %target.interface, "Peer deleted");
            let text = reply.or(format!("Peer '{}' deleted.", target.peer_name));
            show_screen(&bot, &q, format!("✅ {}", escape(&text)), keyboards::peers_menu()).await
        }
        Err(error) => report_error(&bot, callback_chat_id(&q), "deleting peer", &error, keyboards::peers_menu()).await,
    }
}

pub async fn start_status(bot: Bot, q: CallbackQuery, dialogue: WizardDialogue) -> HandlerResult {
    dialogue.update(State::StatusName).await?;
    show_screen(
        &bot,
        &q,
        "🔍 Peer status\nEnter the peer name (or part of it):",
        keyboards::back_to(MENU_PEERS),
    )
    .await
}

/// Ищет пира во всех интерфейсах, одна выборка `api/peers` на интерфейс.
pub async fn receive_status_name(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    let Some(query) = receive_query(&bot, &msg).await? else {
        return Ok(());
    };
    let interfaces = match state.api.interfaces().await {
        Ok(interfaces) => interfaces,
        Err(error) => {
            dialogue.update(State::Idle).await?;
            return report_error(&bot, msg.chat.id, "fetching interfaces", &error, keyboards::back_to(MENU_PEERS)).await;
        }
    };

    let mut matches: Vec<(String, Peer)> = Vec::new();
    let mut last_error = None;
    for interface in &interfaces {
        match state
            .api
            .peers(interface, 1, state.config.peers_page_limit)
            .await
        {
            Ok(peers) => matches.extend(
                peers
                    .into_iter()
                    .filter(|peer| peer.matches(&query))
                    .map(|peer| (interface_name(interface).to_string(), peer)),
            ),
            Err(error) => {
                tracing::warn!(interface = %interface, error = %error, "Failed to list peers");
                last_error = Some(error);
            }
        }
    }

    if matches.is_empty() {
        if let Some(error) = last_error {
            dialogue.update(State::Idle).await?;
            return report_error(&bot, msg.chat.id, "fetching peers", &error, keyboards::back_to(MENU_PEERS)).await;
        }
        bot.send_message(
            msg.chat.id,
            format!("No peers match '{}'. Enter another name:", query),
        )
        .await?;
        return Ok(());
    }

    dialogue.update(State::Idle).await?;
    let count = matches.len();
    for (index, (interface, peer)) in matches.iter().enumerate() {
        let card = format!("<b>Interface:</b> {}\n{}", escape(interface), render_peer_card(peer));
        if index + 1 == count {
            send_screen(&bot, msg.chat.id, card, keyboards::back_to(MENU_PEERS)).await?;
        } else {
            bot.send_message(msg.chat.id, card)
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }
    Ok(())
}

pub async fn start_block(bot: Bot, q: CallbackQuery, dialogue: WizardDialogue) -> HandlerResult {
    dialogue.update(State::BlockConfig).await?;
    show_screen(
        &bot,
        &q,
        "🔒 Block/Unblock\nEnter the config file name (e.g. wg0.conf):",
        keyboards::back_to(MENU_PEERS),
    )
    .await
}

pub async fn receive_block_config(bot: Bot, msg: Message, dialogue: WizardDialogue) -> HandlerResult {
    let Some(text) = require_text(&bot, &msg).await? else {
        return Ok(());
    };
    match validate_config_file(text) {
        Ok(config) => {
            dialogue.update(State::BlockName(config)).await?;
            bot.send_message(msg.chat.id, "Enter the exact peer name:").await?;
            Ok(())
        }
        Err(error) => {
            bot.send_message(msg.chat.id, error.to_string()).await?;
            Ok(())
        }
    }
}

pub async fn receive_block_name(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    state: BotState,
    config: String,
) -> HandlerResult {
    let Some(peer_name) = receive_query(&bot, &msg).await? else {
        return Ok(());
    };
    let peers = match state.api.peers_by_interface(&config, Some(&peer_name)).await {
        Ok(peers) => peers,
        Err(error) => {
            dialogue.update(State::Idle).await?;
            return report_error(&bot, msg.chat.id, "fetching peer", &error, keyboards::back_to(MENU_PEERS)).await;
        }
    };
    let Some(peer) = peers.iter().find(|peer| peer.peer_name == peer_name) else {
        bot.send_message(
            msg.chat.id,
            format!("Peer '{}' not found in {}. Enter the exact name:", peer_name, config),
        )
        .await?;
        return Ok(());
    };

    let currently_blocked = peer.is_blocked();
    let question = format!(
        "Peer '{}' is currently {}.\n{}",
        escape(&peer_name),
        peer_status(peer),
        if currently_blocked { "Unblock it?" } else { "Block it?" }
    );
    dialogue
        .update(State::BlockConfirm(BlockToggle {
            config,
            peer_name,
            blocked: !currently_blocked,
        }))
        .await?;
    send_screen(&bot, msg.chat.id, question, keyboards::confirm_keyboard("✅ Yes", "❌ No")).await
}

pub async fn confirm_block(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
    toggle: BlockToggle,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    dialogue.update(State::Idle).await?;
    if q.data.as_deref() != Some(CONFIRM_YES) {
        return show_screen(&bot, &q, "No changes made.", keyboards::peers_menu()).await;
    }

    match state
        .api
        .toggle_peer(&toggle.peer_name, toggle.blocked, &toggle.config)
        .await
    {
        Ok(_) => {
            let verb = if toggle.blocked { "blocked" } else { "unblocked" };
            tracing::info!(peer_name = %toggle.peer_name, blocked = toggle.blocked, "Peer block status changed");
            show_screen(
                &bot,
                &q,
                format!("✅ Peer '{}' is now {}.", escape(&toggle.peer_name), verb),
                keyboards::peers_menu(),
            )
            .await
        }
        Err(error) => report_error(&bot, callback_chat_id(&q), "changing block status", &error, keyboards::peers_menu()).await,
    }
}

pub async fn start_download(bot: Bot, q: CallbackQuery, dialogue: WizardDialogue) -> HandlerResult {
    dialogue.update(State::DownloadName).await?;
    show_screen(
        &bot,
        &q,
        "📥 Download config / QR\nEnter the peer name (or part of it):",
        keyboards::back_to(MENU_PEERS),
    )
    .await
}

pub async fn receive_download_name(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    let Some(query) = receive_query(&bot, &msg).await? else {
        return Ok(());
    };
    ask_interface(&bot, msg.chat.id, &dialogue, &state, State::DownloadInterface(query)).await
}

pub async fn pick_download_interface(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
    query: String,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let interface = callback_payload(&q, "iface:").to_string();
    let matches = match find_peers(&state, &interface, &query).await {
        Ok(matches) => matches,
        Err(error) => {
            dialogue.update(State::Idle).await?;
            return report_error(&bot, callback_chat_id(&q), "fetching peers", &error, keyboards::back_to(MENU_PEERS)).await;
        }
    };
    if matches.is_empty() {
        dialogue.update(State::Idle).await?;
        return show_screen(
            &bot,
            &q,
            format!("No peers matching '{}' on {}.", escape(&query), escape(&interface)),
            keyboards::back_to(MENU_PEERS),
        )
        .await;
    }

    let keyboard = keyboards::download_keyboard(&interface, &matches);
    dialogue.update(State::DownloadPick(interface)).await?;
    show_screen(&bot, &q, "Choose what to download:", keyboard).await
}

/// `dl:conf:<iface>:<peer>` или `dl:qr:<iface>:<peer>`.
pub async fn download(bot: Bot, q: CallbackQuery, state: BotState) -> HandlerResult {
    let payload = callback_payload(&q, "dl:");
    let Some((kind, rest)) = payload.split_once(':') else {
        bot.answer_callback_query(q.id.clone())
            .text("This menu has expired")
            .await?;
        return Ok(());
    };
    let Some((interface, peer_name)) = split_target(rest) else {
        bot.answer_callback_query(q.id.clone())
            .text("This menu has expired")
            .await?;
        return Ok(());
    };
    bot.answer_callback_query(q.id.clone()).await?;
    let chat_id = callback_chat_id(&q);

    let (context, result) = if kind == "qr" {
        (
            "fetching QR code",
            send_peer_qr(&bot, chat_id, &state, peer_name, interface).await,
        )
    } else {
        (
            "downloading config",
            send_peer_config(&bot, chat_id, &state, peer_name, interface).await,
        )
    };
    if let Err(error) = result {
        report_error(&bot, chat_id, context, &error, keyboards::back_to(MENU_PEERS)).await?;
    }
    Ok(())
}
