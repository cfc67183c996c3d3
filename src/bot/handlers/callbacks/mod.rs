use super::shared::callback_prefix_filter;
use super::state::State;
use super::{backups, bans, create_peer, edit_peer, menu, peers};
use crate::bot::keyboards::EDIT_SEARCH;
use teloxide::dptree;
use teloxide::prelude::*;

fn callback_exact_filter(data: &'static str) -> impl Fn(CallbackQuery) -> Option<CallbackQuery> {
    move |q: CallbackQuery| (q.data.as_deref() == Some(data)).then_some(q)
}

/// Кнопки списков бэкапов действуют только вне мастера.
fn backup_action_allowed(state: &State) -> bool {
    matches!(state, State::Idle)
}

/// Кнопки мастеров проходят только в своём шаге, остальные считаются устаревшими.
pub fn handler() -> teloxide::dispatching::UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    Update::filter_callback_query()
        .branch(dptree::filter_map(callback_prefix_filter("menu:")).endpoint(menu::callback_menu))
        .branch(
            dptree::filter_map(callback_prefix_filter("peers:")).endpoint(menu::callback_peers_action),
        )
        .branch(
            dptree::filter_map(callback_prefix_filter("backups:"))
                .endpoint(menu::callback_backups_action),
        )
        .branch(dptree::filter_map(callback_prefix_filter("bans:")).endpoint(menu::callback_bans_action))
        .branch(
            dptree::filter(|state: State| backup_action_allowed(&state))
                .branch(dptree::filter_map(callback_prefix_filter("bk_del:")).endpoint(backups::delete))
                .branch(dptree::filter_map(callback_prefix_filter("bk_res:")).endpoint(backups::ask_restore)),
        )
        .branch(create_branch())
        .branch(edit_branch())
        .branch(peers_branch())
        .branch(
            dptree::case![State::BackupRestoreConfirm(name)]
                .filter_map(callback_prefix_filter("confirm:"))
                .endpoint(backups::confirm_restore),
        )
        .branch(
            dptree::case![State::UnbanIp]
                .filter_map(callback_prefix_filter("unban:"))
                .endpoint(bans::pick_unban),
        )
        .endpoint(menu::callback_expired)
}

fn create_branch() -> teloxide::dispatching::UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(
            dptree::case![State::CreateInterface]
                .filter_map(callback_prefix_filter("iface:"))
                .endpoint(create_peer::pick_interface),
        )
        .branch(
            dptree::case![State::CreateIp(draft)]
                .filter_map(callback_prefix_filter("ip:"))
                .endpoint(create_peer::pick_ip),
        )
        .branch(
            dptree::case![State::CreateUnit(draft)]
                .filter_map(callback_prefix_filter("unit:"))
                .endpoint(create_peer::pick_unit),
        )
        .branch(
            dptree::case![State::CreateDns(draft)]
                .filter_map(callback_prefix_filter("dns:"))
                .endpoint(create_peer::pick_dns),
        )
        .branch(
            dptree::case![State::CreateFirstUsage(draft)]
                .filter_map(callback_prefix_filter("first:"))
                .endpoint(create_peer::pick_first_usage),
        )
        .branch(
            dptree::case![State::CreateConfirm(draft)]
                .filter_map(callback_prefix_filter("confirm:"))
                .endpoint(create_peer::confirm),
        )
}

fn edit_branch() -> teloxide::dispatching::UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(
            dptree::case![State::EditInterface]
                .filter_map(callback_prefix_filter("iface:"))
                .endpoint(edit_peer::pick_interface),
        )
        .branch(
            dptree::case![State::EditPeer(interface)]
                .branch(dptree::filter_map(callback_prefix_filter("peer:")).endpoint(edit_peer::pick_peer))
                .branch(dptree::filter_map(callback_exact_filter(EDIT_SEARCH)).endpoint(edit_peer::start_search)),
        )
        .branch(
            dptree::case![State::EditOption(target)]
                .filter_map(callback_prefix_filter("edit:"))
                .endpoint(edit_peer::pick_option),
        )
}

fn peers_branch() -> teloxide::dispatching::UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(
            dptree::case![State::DeleteInterface(query)]
                .filter_map(callback_prefix_filter("iface:"))
                .endpoint(peers::pick_delete_interface),
        )
        .branch(
            dptree::case![State::DeletePick(interface)]
                .filter_map(callback_prefix_filter("pdel:"))
                .endpoint(peers::pick_delete_peer),
        )
        .branch(
            dptree::case![State::DeleteConfirm(target)]
                .filter_map(callback_prefix_filter("confirm:"))
                .endpoint(peers::confirm_delete),
        )
        .branch(
            dptree::case![State::BlockConfirm(toggle)]
                .filter_map(callback_prefix_filter("confirm:"))
                .endpoint(peers::confirm_block),
        )
        .branch(
            dptree::case![State::DownloadInterface(query)]
                .filter_map(callback_prefix_filter("iface:"))
                .endpoint(peers::pick_download_interface),
        )
        .branch(
            dptree::case![State::DownloadPick(interface)]
                .filter_map(callback_prefix_filter("dl:"))
                .endpoint(peers::download),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::handlers::state::PeerDraft;

    #[test]
    fn backup_buttons_are_stale_inside_wizards() {
        assert!(backup_action_allowed(&State::Idle));
        assert!(!backup_action_allowed(&State::CreateName(PeerDraft::default())));
        assert!(!backup_action_allowed(&State::BanIp));
        assert!(!backup_action_allowed(&State::BackupRestoreConfirm("a.zip".into())));
    }
}
