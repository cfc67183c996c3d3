//! Мастер изменения пира: интерфейс, выбор или поиск, поле, новое значение.

use super::format::render_peer_card;
use super::shared::{
    callback_chat_id, callback_payload, find_peers, report_error, require_text, send_screen,
    show_screen, HandlerResult,
};
use super::state::{BotState, EditField, PeerTarget, PendingEdit, State, WizardDialogue};
use crate::api::{Peer, PeerEdit};
use crate::bot::keyboards::{self, MENU_PEERS};
use crate::peer::{parse_block_status, validate_dns_list, DataLimit, Expiry, ValidationError};
use teloxide::prelude::*;
use teloxide::utils::html::escape;

/// Что отправить в API после ввода нового значения.
#[derive(Debug, PartialEq)]
pub enum EditRequest {
    Fields(PeerEdit),
    Block(bool),
}

impl EditField {
    fn from_callback(value: &str) -> Option<Self> {
        match value {
            "limit" => Some(EditField::DataLimit),
            "dns" => Some(EditField::Dns),
            "expiry" => Some(EditField::Expiry),
            "block" => Some(EditField::BlockStatus),
            _ => None,
        }
    }

    fn prompt(self) -> &'static str {
        match self {
            EditField::DataLimit => "Enter the new data limit (e.g. 500MiB or 1GiB):",
            EditField::Dns => "Enter DNS servers separated by commas:",
            EditField::Expiry => "Enter the new expiry in days (e.g. 10) or days,hours,minutes (e.g. 10,0,0):",
            EditField::BlockStatus => "Enter the new status: Blocked or Unblocked",
        }
    }

    fn label(self) -> &'static str {
        match self {
            EditField::DataLimit => "data limit",
            EditField::Dns => "DNS",
            EditField::Expiry => "expiry",
            EditField::BlockStatus => "block status",
        }
    }
}

pub fn build_edit(pending: &PendingEdit, input: &str) -> Result<EditRequest, ValidationError> {
    let peer_name = pending.target.peer_name.clone();
    Ok(match pending.field {
        EditField::DataLimit => EditRequest::Fields(PeerEdit {
            data_limit: Some(input.parse::<DataLimit>()?.to_string()),
            ..PeerEdit::new(peer_name)
        }),
        EditField::Dns => EditRequest::Fields(PeerEdit {
            dns: Some(validate_dns_list(input)?),
            ..PeerEdit::new(peer_name)
        }),
        EditField::Expiry => {
            EditRequest::Fields(PeerEdit::new(peer_name).with_expiry(input.parse::<Expiry>()?))
        }
        EditField::BlockStatus => EditRequest::Block(parse_block_status(input)?),
    })
}

fn pick_prompt(interface: &str, no_peers: bool) -> String {
    if no_peers {
        format!("No peers on {}. You can still search by name:", escape(interface))
    } else {
        format!("Select a peer on {} or search by name:", escape(interface))
    }
}

/// Только точное совпадение имени: правка уходит тому пиру, чья карточка показана.
fn exact_peer<'a>(peers: &'a [Peer], peer_name: &str) -> Option<&'a Peer> {
    peers.iter().find(|peer| peer.peer_name == peer_name)
}

fn updated_text(peer_name: &str, field: EditField) -> String {
    format!("✅ Peer '{}' updated: {} changed.", escape(peer_name), field.label())
}

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

    dialogue.update(State::EditInterface).await?;
    show_screen(
        &bot,
        &q,
        "✏️ Edit peer\nSelect an interface:",
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
    let peers = match state.api.peers_by_interface(&interface, None).await {
        Ok(peers) => peers,
        Err(error) => {
            dialogue.update(State::Idle).await?;
            return report_error(&bot, callback_chat_id(&q), "fetching peers", &error, keyboards::back_to(MENU_PEERS)).await;
        }
    };

    let text = pick_prompt(&interface, peers.is_empty());
    dialogue.update(State::EditPeer(interface)).await?;
    show_screen(
        &bot,
        &q,
        text,
        keyboards::edit_pick_keyboard(&peers, state.config.peer_choices),
    )
    .await
}

pub async fn pick_peer(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
    interface: String,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let target = PeerTarget {
        interface,
        peer_name: callback_payload(&q, "peer:").to_string(),
    };
    show_details(&bot, callback_chat_id(&q), &dialogue, &state, target).await
}

pub async fn start_search(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    interface: String,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    dialogue.update(State::EditSearch(interface)).await?;
    show_screen(&bot, &q, "Enter part of the peer name:", keyboards::back_to(MENU_PEERS)).await
}

pub async fn receive_search(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    state: BotState,
    interface: String,
) -> HandlerResult {
    let Some(query) = require_text(&bot, &msg).await? else {
        return Ok(());
    };
    let matches = match find_peers(&state, &interface, query).await {
        Ok(matches) => matches,
        Err(error) => {
            dialogue.update(State::Idle).await?;
            return report_error(&bot, msg.chat.id, "searching peers", &error, keyboards::back_to(MENU_PEERS)).await;
        }
    };
    if matches.is_empty() {
        bot.send_message(
            msg.chat.id,
            format!("No peers match '{}'. Try another name:", query.trim()),
        )
        .await?;
        return Ok(());
    }

    dialogue.update(State::EditPeer(interface)).await?;
    send_screen(
        &bot,
        msg.chat.id,
        format!("Found {} peer(s). Select one:", matches.len()),
        keyboards::edit_pick_keyboard(&matches, state.config.peer_choices),
    )
    .await
}

async fn show_details(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &WizardDialogue,
    state: &BotState,
    target: PeerTarget,
) -> HandlerResult {
    let peers = match state
        .api
        .peers_by_interface(&target.interface, Some(&target.peer_name))
        .await
    {
        Ok(peers) => peers,
        Err(error) => {
            dialogue.update(State::Idle).await?;
            return report_error(bot, chat_id, "fetching peer details", &error, keyboards::back_to(MENU_PEERS)).await;
        }
    };
    let Some(peer) = exact_peer(&peers, &target.peer_name) else {
        dialogue.update(State::Idle).await?;
        return send_screen(
            bot,
            chat_id,
            format!("Peer '{}' not found.", escape(&target.peer_name)),
            keyboards::back_to(MENU_PEERS),
        )
        .await;
    };

    let card = format!("{}\n\nWhat do you want to change?", render_peer_card(peer));
    dialogue.update(State::EditOption(target)).await?;
    send_screen(bot, chat_id, card, keyboards::edit_options_keyboard()).await
}

pub async fn pick_option(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    target: PeerTarget,
) -> HandlerResult {
    let Some(field) = EditField::from_callback(callback_payload(&q, "edit:")) else {
        bot.answer_callback_query(q.id.clone())
            .text("This menu has expired")
            .await?;
        return Ok(());
    };
    bot.answer_callback_query(q.id.clone()).await?;
    dialogue
        .update(State::EditValue(PendingEdit { target, field }))
        .await?;
    show_screen(&bot, &q, field.prompt(), keyboards::back_to(MENU_PEERS)).await
}

pub async fn receive_value(
    bot: Bot,
    msg: Message,
    dialogue: WizardDialogue,
    state: BotState,
    pending: PendingEdit,
) -> HandlerResult {
    let Some(text) = require_text(&bot, &msg).await? else {
        return Ok(());
    };
    let request = match build_edit(&pending, text) {
        Ok(request) => request,
        Err(error) => {
            bot.send_message(msg.chat.id, error.to_string()).await?;
            return Ok(());
        }
    };

    dialogue.update(State::Idle).await?;
    let target = &pending.target;
    let result = match &request {
        EditRequest::Fields(edit) => state.api.edit_peer(edit).await,
        EditRequest::Block(blocked) => {
            state
                .api
                .toggle_peer(&target.peer_name, *blocked, &target.interface)
                .await
        }
    };

    match result {
        Ok(_) => {
            tracing::info!(
                chat_id = msg.chat.id.0,
                peer_name = %target.peer_name,
                field = pending.field.label(),
                "Peer updated"
            );
            send_screen(
                &bot,
                msg.chat.id,
                updated_text(&target.peer_name, pending.field),
                keyboards::peers_menu(),
            )
            .await
        }
        Err(error) => report_error(&bot, msg.chat.id, "updating peer", &error, keyboards::peers_menu()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(field: EditField) -> PendingEdit {
        PendingEdit {
            target: PeerTarget {
                interface: "wg0".into(),
                peer_name: "anna".into(),
            },
            field,
        }
    }

    #[test]
    fn data_limit_edit_sends_only_limit() {
        let request = build_edit(&pending(EditField::DataLimit), "1GiB").unwrap();
        assert_eq!(
            request,
            EditRequest::Fields(PeerEdit {
                data_limit: Some("1GiB".into()),
                ..PeerEdit::new("anna")
            })
        );
    }

    #[test]
    fn expiry_edit_accepts_triplet() {
        let EditRequest::Fields(edit) = build_edit(&pending(EditField::Expiry), "2,3,4").unwrap() else {
            panic!("expected field edit");
        };
        assert_eq!(edit.expiry_days, Some(2));
        assert_eq!(edit.expiry_hours, Some(3));
        assert_eq!(edit.expiry_minutes, Some(4));
        assert_eq!(edit.expiry_months, Some(0));
        assert!(edit.data_limit.is_none());
    }

    #[test]
    fn block_status_goes_to_toggle() {
        assert_eq!(
            build_edit(&pending(EditField::BlockStatus), "blocked").unwrap(),
            EditRequest::Block(true)
        );
        assert_eq!(
            build_edit(&pending(EditField::BlockStatus), "later"),
            Err(ValidationError::BlockStatus)
        );
    }

    #[test]
    fn invalid_input_is_rejected() {
        assert_eq!(
            build_edit(&pending(EditField::DataLimit), "100"),
            Err(ValidationError::DataLimit)
        );
        assert_eq!(build_edit(&pending(EditField::Dns), "nope"), Err(ValidationError::Dns));
    }

    #[test]
    fn details_require_exact_name() {
        let peers = vec![
            Peer {
                peer_name: "anna2".into(),
                ..Peer::default()
            },
            Peer {
                peer_name: "anna".into(),
                ..Peer::default()
            },
        ];
        assert_eq!(exact_peer(&peers, "anna").map(|p| p.peer_name.as_str()), Some("anna"));
        assert!(exact_peer(&peers[..1], "anna").is_none());
        assert!(exact_peer(&[], "anna").is_none());
    }

    #[test]
    fn screen_texts_escape_api_names() {
        assert_eq!(
            pick_prompt("wg<0>", false),
            "Select a peer on wg&lt;0&gt; or search by name:"
        );
        assert!(pick_prompt("wg&1", true).starts_with("No peers on wg&amp;1."));
        assert_eq!(
            updated_text("a<b", EditField::Dns),
            "✅ Peer 'a&lt;b' updated: DNS changed."
        );
    }

    #[test]
    fn option_callbacks_map_to_fields() {
        assert_eq!(EditField::from_callback("dns"), Some(EditField::Dns));
        assert_eq!(EditField::from_callback("name"), None);
    }
}
