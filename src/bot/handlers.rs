//! Обработчики меню, мастеров и текстовых команд.

#[path = "handlers/backups.rs"]
mod backups;
#[path = "handlers/bans.rs"]
mod bans;
#[path = "handlers/callbacks/mod.rs"]
mod callbacks;
#[path = "handlers/commands/mod.rs"]
mod commands;
#[path = "handlers/create_peer.rs"]
mod create_peer;
#[path = "handlers/edit_peer.rs"]
mod edit_peer;
#[path = "handlers/format.rs"]
mod format;
#[path = "handlers/menu.rs"]
mod menu;
#[path = "handlers/metrics.rs"]
mod metrics;
#[path = "handlers/peers.rs"]
mod peers;
#[path = "handlers/shared.rs"]
mod shared;
#[path = "handlers/state.rs"]
mod state;

pub use state::{BotState, State};

use shared::HandlerResult;
use state::is_admin_update;
use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::dispatching::DpHandlerDescription;
use teloxide::dptree;
use teloxide::prelude::*;

pub fn schema() -> dptree::Handler<
    'static,
    Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>,
    DpHandlerDescription,
> {
    let message_handler = Update::filter_message()
        .branch(commands::handler())
        .branch(dptree::case![State::CreateName(draft)].endpoint(create_peer::receive_name))
        .branch(dptree::case![State::CreateLimit(draft)].endpoint(create_peer::receive_limit))
        .branch(dptree::case![State::CreateCustomDns(draft)].endpoint(create_peer::receive_custom_dns))
        .branch(dptree::case![State::CreateExpiry(draft)].endpoint(create_peer::receive_expiry))
        .branch(dptree::case![State::EditSearch(interface)].endpoint(edit_peer::receive_search))
        .branch(dptree::case![State::EditValue(pending)].endpoint(edit_peer::receive_value))
        .branch(dptree::case![State::DeleteName].endpoint(peers::receive_delete_name))
        .branch(dptree::case![State::StatusName].endpoint(peers::receive_status_name))
        .branch(dptree::case![State::BlockConfig].endpoint(peers::receive_block_config))
        .branch(dptree::case![State::BlockName(config)].endpoint(peers::receive_block_name))
        .branch(dptree::case![State::DownloadName].endpoint(peers::receive_download_name))
        .branch(dptree::case![State::BanIp].endpoint(bans::receive_ban_ip))
        .branch(dptree::case![State::UnbanIp].endpoint(bans::receive_unban_ip))
        .endpoint(menu::handle_stray_text);

    let authorized = dptree::filter(|update: Update, state: BotState| is_admin_update(&update, &state))
        .chain(dialogue::enter::<Update, InMemStorage<State>, State, _>())
        .branch(message_handler)
        .branch(callbacks::handler());

    dptree::entry()
        .branch(authorized)
        .branch(Update::filter_message().endpoint(deny_message))
        .branch(Update::filter_callback_query().endpoint(deny_callback))
}

async fn deny_message(bot: Bot, msg: Message) -> HandlerResult {
    tracing::warn!(
        user_id = ?msg.from.as_ref().map(|user| user.id.0),
        chat_id = msg.chat.id.0,
        "Unauthorized message"
    );
    bot.send_message(msg.chat.id, "⛔️ Access denied").await?;
    Ok(())
}

async fn deny_callback(bot: Bot, q: CallbackQuery) -> HandlerResult {
    tracing::warn!(user_id = q.from.id.0, "Unauthorized callback");
    bot.answer_callback_query(q.id.clone())
        .text("⛔️ Access denied")
        .show_alert(true)
        .await?;
    Ok(())
}
