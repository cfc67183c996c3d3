//! Inline-клавиатуры меню и шагов мастеров.

use crate::api::Peer;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Ограничение Telegram на размер callback_data.
pub const CALLBACK_DATA_LIMIT: usize = 64;

pub const MENU_MAIN: &str = "menu:main";
pub const MENU_PEERS: &str = "menu:peers";
pub const MENU_BACKUPS: &str = "menu:backups";
pub const MENU_BANS: &str = "menu:bans";
pub const MENU_METRICS: &str = "menu:metrics";

pub const CONFIRM_YES: &str = "confirm:yes";
pub const CONFIRM_NO: &str = "confirm:no";
pub const EDIT_SEARCH: &str = "edit_search";
pub const DNS_CUSTOM: &str = "dns:custom";

/// Кнопка с callback_data, либо `None`, если данные не влезают в лимит.
pub fn callback_button(text: impl Into<String>, data: impl Into<String>) -> Option<InlineKeyboardButton> {
    let data = data.into();
    if data.len() > CALLBACK_DATA_LIMIT {
        tracing::warn!(
            callback_data = %data,
            len = data.len(),
            "Callback payload exceeds Telegram limit, button skipped"
        );
        return None;
    }
    Some(InlineKeyboardButton::callback(text, data))
}

fn back_row(target: &'static str) -> Vec<InlineKeyboardButton> {
    let text = if target == MENU_MAIN {
        "⬅️ Main menu"
    } else {
        "⬅️ Back"
    };
    vec![InlineKeyboardButton::callback(text, target)]
}

pub fn back_to(target: &'static str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::default().append_row(back_row(target))
}

pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::default()
        .append_row(vec![
            InlineKeyboardButton::callback("👥 Peers", MENU_PEERS),
            InlineKeyboardButton::callback("📊 Metrics", MENU_METRICS),
        ])
        .append_row(vec![
            InlineKeyboardButton::callback("💾 Backups", MENU_BACKUPS),
            InlineKeyboardButton::callback("🚫 IP bans", MENU_BANS),
        ])
}

pub fn peers_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::default()
        .append_row(vec![
            InlineKeyboardButton::callback("➕ Create", "peers:create"),
            InlineKeyboardButton::callback("✏️ Edit", "peers:edit"),
        ])
        .append_row(vec![
            InlineKeyboardButton::callback("🗑 Delete", "peers:delete"),
            InlineKeyboardButton::callback("🔍 Status", "peers:status"),
        ])
        .append_row(vec![
            InlineKeyboardButton::callback("🔒 Block/Unblock", "peers:block"),
            InlineKeyboardButton::callback("📥 Download/QR", "peers:download"),
        ])
        .append_row(back_row(MENU_MAIN))
}

pub fn backups_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::default()
        .append_row(vec![
            InlineKeyboardButton::callback("📋 Show", "backups:show"),
            InlineKeyboardButton::callback("➕ Create", "backups:create"),
        ])
        .append_row(vec![
            InlineKeyboardButton::callback("🗑 Delete", "backups:delete"),
            InlineKeyboardButton::callback("♻️ Restore", "backups:restore"),
        ])
        .append_row(back_row(MENU_MAIN))
}

pub fn bans_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::default()
        .append_row(vec![InlineKeyboardButton::callback("📋 Show", "bans:show")])
        .append_row(vec![
            InlineKeyboardButton::callback("⛔ Ban", "bans:ban"),
            InlineKeyboardButton::callback("✅ Unban", "bans:unban"),
        ])
        .append_row(back_row(MENU_MAIN))
}

/// Список вариантов по одному в строке: `prefix` + значение.
pub fn choices(prefix: &str, items: &[String], back: &'static str) -> InlineKeyboardMarkup {
    let mut keyboard = InlineKeyboardMarkup::default();
    for item in items {
        if let Some(button) = callback_button(item.clone(), format!("{}{}", prefix, item)) {
            keyboard = keyboard.append_row(vec![button]);
        }
    }
    keyboard.append_row(back_row(back))
}

pub fn unit_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::default()
        .append_row(vec![
            InlineKeyboardButton::callback("MiB", "unit:MiB"),
            InlineKeyboardButton::callback("GiB", "unit:GiB"),
        ])
        .append_row(back_row(MENU_PEERS))
}

pub fn dns_keyboard(presets: &[String]) -> InlineKeyboardMarkup {
    let mut keyboard = InlineKeyboardMarkup::default();
    let row: Vec<InlineKeyboardButton> = presets
        .iter()
        .filter_map(|dns| callback_button(dns.clone(), format!("dns:{}", dns)))
        .collect();
    if !row.is_empty() {
        keyboard = keyboard.append_row(row);
    }
    keyboard
        .append_row(vec![InlineKeyboardButton::callback("✏️ Custom", DNS_CUSTOM)])
        .append_row(back_row(MENU_PEERS))
}

pub fn first_usage_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::default()
        .append_row(vec![
            InlineKeyboardButton::callback("✅ Enable", "first:on"),
            InlineKeyboardButton::callback("❌ Disable", "first:off"),
        ])
        .append_row(back_row(MENU_PEERS))
}

pub fn confirm_keyboard(yes: &str, no: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::default().append_row(vec![
        InlineKeyboardButton::callback(yes, CONFIRM_YES),
        InlineKeyboardButton::callback(no, CONFIRM_NO),
    ])
}

pub fn edit_pick_keyboard(peers: &[Peer], limit: usize) -> InlineKeyboardMarkup {
    let mut keyboard = InlineKeyboardMarkup::default();
    for peer in peers.iter().take(limit) {
        if let Some(button) = callback_button(peer.peer_name.clone(), format!("peer:{}", peer.peer_name)) {
            keyboard = keyboard.append_row(vec![button]);
        }
    }
    keyboard
        .append_row(vec![InlineKeyboardButton::callback("🔍 Search by name", EDIT_SEARCH)])
        .append_row(back_row(MENU_PEERS))
}

pub fn edit_options_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::default()
        .append_row(vec![
            InlineKeyboardButton::callback("📦 Data limit", "edit:limit"),
            InlineKeyboardButton::callback("🌐 DNS", "edit:dns"),
        ])
        .append_row(vec![
            InlineKeyboardButton::callback("⏳ Expiry", "edit:expiry"),
            InlineKeyboardButton::callback("🔒 Block status", "edit:block"),
        ])
        .append_row(back_row(MENU_PEERS))
}

pub fn delete_peers_keyboard(interface: &str, peers: &[Peer]) -> InlineKeyboardMarkup {
    let mut keyboard = InlineKeyboardMarkup::default();
    for peer in peers {
        if let Some(button) = callback_button(
            format!("🗑 {}", peer.peer_name),
            format!("pdel:{}:{}", interface, peer.peer_name),
        ) {
            keyboard = keyboard.append_row(vec![button]);
        }
    }
    keyboard.append_row(back_row(MENU_PEERS))
}

pub fn download_keyboard(interface: &str, peers: &[Peer]) -> InlineKeyboardMarkup {
    let mut keyboard = InlineKeyboardMarkup::default();
    for peer in peers {
        let row: Vec<InlineKeyboardButton> = [
            (format!("📄 {}", peer.peer_name), "dl:conf"),
            (format!("🔳 QR {}", peer.peer_name), "dl:qr"),
        ]
        .into_iter()
        .filter_map(|(text, kind)| {
            callback_button(text, format!("{}:{}:{}", kind, interface, peer.peer_name))
        })
        .collect();
        if row.len() == 2 {
            keyboard = keyboard.append_row(row);
        }
    }
    keyboard.append_row(back_row(MENU_PEERS))
}

/// Строка на бэкап: ссылка на скачивание, удаление и восстановление.
pub fn backup_links_keyboard(links: &[(String, String)]) -> InlineKeyboardMarkup {
    let mut keyboard = InlineKeyboardMarkup::default();
    for (name, link) in links {
        let mut row = Vec::with_capacity(3);
        match reqwest::Url::parse(link) {
            Ok(url) => row.push(InlineKeyboardButton::url(format!("📥 {}", name), url)),
            Err(error) => tracing::warn!(backup = %name, error = %error, "Invalid backup download URL"),
        }
        row.extend(callback_button("🗑", format!("bk_del:{}", name)));
        row.extend(callback_button("♻️", format!("bk_res:{}", name)));
        if !row.is_empty() {
            keyboard = keyboard.append_row(row);
        }
    }
    keyboard.append_row(back_row(MENU_BACKUPS))
}

pub fn backup_pick_keyboard(prefix: &str, backups: &[String]) -> InlineKeyboardMarkup {
    choices(prefix, backups, MENU_BACKUPS)
}

pub fn unban_keyboard(banned: &[String]) -> InlineKeyboardMarkup {
    choices("unban:", banned, MENU_BANS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_data(keyboard: &InlineKeyboardMarkup) -> Vec<String> {
        keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    fn peer(name: &str) -> Peer {
        Peer {
            peer_name: name.to_string(),
            ..Peer::default()
        }
    }

    #[test]
    fn static_menus_fit_callback_limit() {
        for keyboard in [
            main_menu(),
            peers_menu(),
            backups_menu(),
            bans_menu(),
            unit_keyboard(),
            first_usage_keyboard(),
            edit_options_keyboard(),
            confirm_keyboard("Yes", "No"),
        ] {
            for data in callback_data(&keyboard) {
                assert!(data.len() <= CALLBACK_DATA_LIMIT, "{data}");
            }
        }
    }

    #[test]
    fn oversized_entries_are_skipped() {
        let long_name = "x".repeat(70);
        let keyboard = delete_peers_keyboard("wg0", &[peer("anna"), peer(&long_name)]);
        let data = callback_data(&keyboard);
        assert_eq!(data, vec!["pdel:wg0:anna".to_string(), MENU_PEERS.to_string()]);
    }

    #[test]
    fn edit_pick_is_capped_and_offers_search() {
        let peers: Vec<Peer> = ["a", "b", "c", "d"].into_iter().map(peer).collect();
        let data = callback_data(&edit_pick_keyboard(&peers, 2));
        assert_eq!(data, vec!["peer:a", "peer:b", EDIT_SEARCH, MENU_PEERS]);
    }

    #[test]
    fn download_rows_pair_config_and_qr() {
        let data = callback_data(&download_keyboard("wg1", &[peer("bob")]));
        assert_eq!(data, vec!["dl:conf:wg1:bob", "dl:qr:wg1:bob", MENU_PEERS]);
    }

    #[test]
    fn backup_rows_carry_link_and_actions() {
        let keyboard = backup_links_keyboard(&[
            ("a.zip".to_string(), "http://panel/api/download-backup?name=a.zip".to_string()),
            ("bad".to_string(), "not a url".to_string()),
        ]);
        let rows = &keyboard.inline_keyboard;
        assert_eq!(rows.len(), 3);
        assert!(matches!(rows[0][0].kind, InlineKeyboardButtonKind::Url(_)));
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[1].len(), 2);
        assert_eq!(
            callback_data(&keyboard),
            vec!["bk_del:a.zip", "bk_res:a.zip", "bk_del:bad", "bk_res:bad", MENU_BACKUPS]
        );
    }
}
