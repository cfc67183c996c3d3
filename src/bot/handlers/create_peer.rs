//! Мастер создания пира: интерфейс, IP, имя, лимит, DNS, срок, подтверждение.

use super::format::render_create_summary;
use super::shared::{
    callback_chat_id, callback_payload, report_error, require_text, send_screen, show_screen,
    HandlerResult,
};
use super::state::{BotState, PeerDraft, State, WizardDialogue};
use crate::api::NewPeer;
use crate::bot::keyboards::{self, MENU_PEERS};
use crate::peer::{
    config_file, parse_positive, validate_dns_list, validate_peer_name, DataLimit, DataUnit,
};
use teloxide::prelude::*;
use teloxide::utils::html::escape;

pub async fn start(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    let chat_id = callback_chat_id(&q);
    let interfaces = match state.api.interfaces().await {
        Ok(interfaces) => interfaces,
        Err(error) => {
            dialogue.update(State::Idle).await?;
            return report_error(&bot, chat_id, "fetching interfaces", &error, keyboards::back_to(MENU_PEERS)).await;
        }
    };
    if interfaces.is_empty() {
        dialogue.update(State::Idle).await?;
        return show_screen(&bot, &q, "No interfaces found.", keyboards::back_to(MENU_PEERS)).await;
    }

    dialogue.update(State::CreateInterface).await?;
    show_screen(
        &bot,
        &q,
        "➕ New peer\nSelect an interface:",
        keyboards::choices("iface:", &interfaces, MENU_PEERS),
    )
    .await
}

pub async fn pick_interface(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let interface = callback_payload(&q, "iface:").to_string();
    let chat_id = callback_chat_id(&q);

    let ips = match state.api.available_ips(&interface).await {
        Ok(ips) => ips,
        Err(error) => {
            dialogue.update(State::Idle).await?;
            return report_error(&bot, chat_id, "fetching available IPs", &error, keyboards::back_to(MENU_PEERS)).await;
        }
    };
    let ips: Vec<String> = ips.into_iter().take(state.config.ip_choices).collect();
    if ips.is_empty() {
        dialogue.update(State::Idle).await?;
        return show_screen(
            &bot,
            &q,
            format!("No available IPs on {}.", escape(&interface)),
            keyboards::back_to(MENU_PEERS),
        )
        .await;
    }

    tracing::debug!(chat_id = chat_id.0, interface = %interface, "Create wizard: interface selected");
    dialogue
        .update(State::CreateIp(PeerDraft {
            interface: interface.clone(),
            ..PeerDraft::default()
        }))
        .await?;
    show_screen(
        &bot,
        &q,
        format!("Interface: {}\nSelect an IP address:", escape(&interface)),
        keyboards::choices("ip:", &ips, MENU_PEERS),
    )
    .await
}

pub async fn pick_ip(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    mut draft: PeerDraft,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    draft.ip = callback_payload(&q, "ip:").to_string();
    let text = format!(
        "IP: {}\nEnter a peer name (letters, numbers and underscores):",
        escape(&draft.ip)
    );
    dialogue.update(State::CreateName(draft)).await?;
    show_screen(&bot, &q, text, keyboards::back_to(MENU_PEERS)).await
}

pub async fn receive_name(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    mut draft: PeerDraft,
) -> HandlerResult {
    let Some(text) = require_text(&bot, &msg).await? else {
        return Ok(());
    };
    match validate_peer_name(text) {
        Ok(name) => {
            draft.name = name;
            dialogue.update(State::CreateUnit(draft)).await?;
            send_screen(&bot, msg.chat.id, "Choose the data limit unit:", keyboards::unit_keyboard()).await
        }
        Err(error) => {
            bot.send_message(msg.chat.id, error.to_string()).await?;
            Ok(())
        }
    }
}

pub async fn pick_unit(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    mut draft: PeerDraft,
) -> HandlerResult {
    let Ok(unit) = callback_payload(&q, "unit:").parse::<DataUnit>() else {
        bot.answer_callback_query(q.id.clone())
            .text("This menu has expired")
            .await?;
        return Ok(());
    };
    bot.answer_callback_query(q.id.clone()).await?;
    draft.unit = Some(unit);
    dialogue.update(State::CreateLimit(draft)).await?;
    show_screen(
        &bot,
        &q,
        format!("Enter the data limit in {}:", unit.as_str()),
        keyboards::back_to(MENU_PEERS),
    )
    .await
}

pub async fn receive_limit(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    state: BotState,
    mut draft: PeerDraft,
) -> HandlerResult {
    let Some(text) = require_text(&bot, &msg).await? else {
        return Ok(());
    };
    let unit = draft.unit.unwrap_or(DataUnit::MiB);
    let limit = match parse_positive(text).and_then(|value| DataLimit::new(value, unit)) {
        Ok(limit) => limit,
        Err(error) => {
            bot.send_message(msg.chat.id, error.to_string()).await?;
            return Ok(());
        }
    };
    draft.limit = Some(limit);
    dialogue.update(State::CreateDns(draft)).await?;
    send_screen(
        &bot,
        msg.chat.id,
        format!("Data limit: {}\nChoose DNS servers:", limit),
        keyboards::dns_keyboard(&state.config.dns_presets),
    )
    .await
}

pub async fn pick_dns(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    mut draft: PeerDraft,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    if q.data.as_deref() == Some(keyboards::DNS_CUSTOM) {
        dialogue.update(State::CreateCustomDns(draft)).await?;
        return show_screen(
            &bot,
            &q,
            "Enter DNS servers separated by commas (e.g. 1.1.1.1,8.8.8.8):",
            keyboards::back_to(MENU_PEERS),
        )
        .await;
    }

    match validate_dns_list(callback_payload(&q, "dns:")) {
        Ok(dns) => {
            draft.dns = Some(dns);
            dialogue.update(State::CreateExpiry(draft)).await?;
            show_screen(&bot, &q, "Enter the expiry in days:", keyboards::back_to(MENU_PEERS)).await
        }
        Err(error) => {
            tracing::warn!(data = ?q.data, "Configured DNS preset is invalid");
            show_screen(&bot, &q, error.to_string(), keyboards::back_to(MENU_PEERS)).await
        }
    }
}

pub async fn receive_custom_dns(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    mut draft: PeerDraft,
) -> HandlerResult {
    let Some(text) = require_text(&bot, &msg).await? else {
        return Ok(());
    };
    match validate_dns_list(text) {
        Ok(dns) => {
            draft.dns = Some(dns);
            dialogue.update(State::CreateExpiry(draft)).await?;
            send_screen(&bot, msg.chat.id, "Enter the expiry in days:", keyboards::back_to(MENU_PEERS)).await
        }
        Err(error) => {
            bot.send_message(msg.chat.id, error.to_string()).await?;
            Ok(())
        }
    }
}

pub async fn receive_expiry(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    mut draft: PeerDraft,
) -> HandlerResult {
    let Some(text) = require_text(&bot, &msg).await? else {
        return Ok(());
    };
    match parse_positive(text) {
        Ok(days) => {
            draft.expiry_days = Some(days);
            dialogue.update(State::CreateFirstUsage(draft)).await?;
            send_screen(
                &bot,
                msg.chat.id,
                "Start the expiry countdown on first usage?",
                keyboards::first_usage_keyboard(),
            )
            .await
        }
        Err(error) => {
            bot.send_message(msg.chat.id, error.to_string()).await?;
            Ok(())
        }
    }
}

pub async fn pick_first_usage(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    mut draft: PeerDraft,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    draft.first_usage = callback_payload(&q, "first:") == "on";
    let summary = render_create_summary(&draft);
    dialogue.update(State::CreateConfirm(draft)).await?;
    show_screen(
        &bot,
        &q,
        summary,
        keyboards::confirm_keyboard("✅ Confirm", "❌ Cancel"),
    )
    .await
}

pub async fn confirm(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
    draft: PeerDraft,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    dialogue.update(State::Idle).await?;
    let chat_id = callback_chat_id(&q);

    if q.data.as_deref() != Some(keyboards::CONFIRM_YES) {
        return show_screen(&bot, &q, "Peer creation cancelled.", keyboards::peers_menu()).await;
    }
    let Some(peer) = new_peer(&draft) else {
        return report_error(&bot, chat_id, "creating peer", &"incomplete form", keyboards::peers_menu()).await;
    };

    match state.api.create_peer(&peer).await {
        Ok(_) => {
            tracing::info!(chat_id = chat_id.0, peer_name = %peer.peer_name, "Peer created");
            show_screen(
                &bot,
                &q,
                format!("✅ Peer '{}' created successfully!", escape(&peer.peer_name)),
                keyboards::peers_menu(),
            )
            .await
        }
        Err(error) => report_error(&bot, chat_id, "creating peer", &error, keyboards::peers_menu()).await,
    }
}

/// Тело запроса `create-peer`; срок задаётся только в днях.
pub fn new_peer(draft: &PeerDraft) -> Option<NewPeer> {
    Some(NewPeer {
        peer_name: draft.name.clone(),
        peer_ip: draft.ip.clone(),
        data_limit: draft.limit?.to_string(),
        config_file: config_file(&draft.interface),
        first_usage: draft.first_usage,
        dns: draft.dns.clone()?,
        expiry_days: draft.expiry_days?,
        expiry_months: 0,
        expiry_hours: 0,
        expiry_minutes: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_draft_becomes_request_body() {
        let draft = PeerDraft {
            interface: "wg0".into(),
            ip: "10.0.0.7".into(),
            name: "anna".into(),
            unit: Some(DataUnit::GiB),
            limit: Some(DataLimit { value: 5, unit: DataUnit::GiB }),
            dns: Some("1.1.1.1,8.8.8.8".into()),
            expiry_days: Some(30),
            first_usage: true,
        };
        let body = serde_json::to_value(new_peer(&draft).unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "peerName": "anna",
                "peerIp": "10.0.0.7",
                "dataLimit": "5GiB",
                "configFile": "wg0.conf",
                "firstUsage": true,
                "dns": "1.1.1.1,8.8.8.8",
                "expiryDays": 30,
                "expiryMonths": 0,
                "expiryHours": 0,
                "expiryMinutes": 0
            })
        );
    }

    #[test]
    fn incomplete_draft_is_rejected() {
        let draft = PeerDraft {
            interface: "wg0".into(),
            name: "anna".into(),
            ..PeerDraft::default()
        };
        assert!(new_peer(&draft).is_none());
    }
}
