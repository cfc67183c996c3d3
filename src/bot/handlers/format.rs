use super::state::PeerDraft;
use crate::api::{ExpiryTime, IpBans, Metrics, Peer};
use crate::peer::{bytes_to_human, DataLimit};
use chrono::{DateTime, Local};
use teloxide::utils::html::escape;

pub fn format_timestamp(ts: DateTime<Local>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S %:z").to_string()
}

fn or_dash(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => escape(value),
        _ => "—".to_string(),
    }
}

pub fn format_expiry(expiry: Option<&ExpiryTime>) -> String {
    match expiry {
        Some(e) => format!(
            "{} months, {} days, {} hours, {} minutes",
            e.months, e.days, e.hours, e.minutes
        ),
        None => "—".to_string(),
    }
}

pub fn peer_status(peer: &Peer) -> &'static str {
    if peer.is_blocked() {
        "🔒 Blocked"
    } else {
        "✅ Active"
    }
}

/// Остаток трафика; при известном лимите добавляется доля в процентах.
pub fn format_remaining(peer: &Peer) -> String {
    let Some(remaining) = peer.remaining else {
        return or_dash(peer.remaining_human.as_deref());
    };
    let human = peer
        .remaining_human
        .as_deref()
        .map(escape)
        .unwrap_or_else(|| bytes_to_human(remaining));
    match peer.limit.as_deref().and_then(|limit| limit.parse::<DataLimit>().ok()) {
        Some(limit) => format!(
            "{} ({}% of {})",
            human,
            remaining.saturating_mul(100) / limit.bytes(),
            limit
        ),
        None => human,
    }
}

/// Карточка пира в HTML.
pub fn render_peer_card(peer: &Peer) -> String {
    format!(
        "<b>Peer:</b> {}\n\
         <b>IP:</b> {}\n\
         <b>Public key:</b> <code>{}</code>\n\
         <b>Data limit:</b> {}\n\
         <b>Expiry:</b> {}\n\
         <b>DNS:</b> {}\n\
         <b>Remaining:</b> {}\n\
         <b>Status:</b> {}",
        escape(&peer.peer_name),
        or_dash(peer.peer_ip.as_deref()),
        or_dash(peer.public_key.as_deref()),
        or_dash(peer.limit.as_deref()),
        format_expiry(peer.expiry_time.as_ref()),
        or_dash(peer.dns.as_deref()),
        format_remaining(peer),
        peer_status(peer),
    )
}

pub fn render_create_summary(draft: &PeerDraft) -> String {
    format!(
        "<b>New peer</b>\n\
         Interface: {}\n\
         IP: {}\n\
         Name: {}\n\
         Data limit: {}\n\
         DNS: {}\n\
         Expiry: {} days\n\
         First usage: {}\n\n\
         Create this peer?",
        escape(&draft.interface),
        escape(&draft.ip),
        escape(&draft.name),
        draft
            .limit
            .map(|limit| limit.to_string())
            .unwrap_or_else(|| "—".to_string()),
        or_dash(draft.dns.as_deref()),
        draft.expiry_days.unwrap_or_default(),
        if draft.first_usage { "enabled" } else { "disabled" },
    )
}

pub fn render_metrics_caption(metrics: &Metrics, at: DateTime<Local>) -> String {
    format!(
        "📊 Server metrics\n\
         CPU: {}\n\
         RAM: {}\n\
         Disk: {} / {}\n\
         Uptime: {}\n\
         Updated: {}",
        or_dash(metrics.cpu.as_deref()),
        or_dash(metrics.ram.as_deref()),
        or_dash(metrics.disk.used.as_deref()),
        or_dash(metrics.disk.total.as_deref()),
        or_dash(metrics.uptime.as_deref()),
        format_timestamp(at),
    )
}

pub fn render_backups(backups: &[String]) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }
    let mut text = format!("💾 Backups ({}):\n", backups.len());
    for name in backups {
        text.push_str(&format!("• <code>{}</code>\n", escape(name)));
    }
    text.push_str("\n📥 download, 🗑 delete, ♻️ restore.");
    text
}

pub fn render_bans(bans: &IpBans) -> String {
    if bans.ip_status.is_empty() {
        return "No IP records found.".to_string();
    }
    let mut text = String::from("🚫 IP status:\n");
    for (ip, status) in &bans.ip_status {
        text.push_str(&format!("• <code>{}</code>: {}\n", escape(ip), escape(status)));
    }
    text
}

pub fn help_text() -> &'static str {
    "Commands:\n\
     /start, /menu: open the main menu\n\
     /qr <peer_name> <config_name>: get a peer QR code\n\
     /config <peer_name> <config_name>: download a peer config\n\
     /export <peer_name> <config_name>: show a peer config as text\n\
     /cancel: abort the current action\n\
     /help: this message\n\n\
     Everything else is available from the menu buttons."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{DataLimit, DataUnit};
    use chrono::TimeZone;

    #[test]
    fn peer_card_escapes_and_fills_gaps() {
        let peer = Peer {
            peer_name: "a<b>".to_string(),
            peer_ip: Some("10.0.0.2".to_string()),
            monitor_blocked: true,
            ..Peer::default()
        };
        let card = render_peer_card(&peer);
        assert!(card.contains("a&lt;b&gt;"));
        assert!(card.contains("<b>IP:</b> 10.0.0.2"));
        assert!(card.contains("<b>DNS:</b> —"));
        assert!(card.contains("🔒 Blocked"));
    }

    #[test]
    fn remaining_shows_share_of_limit() {
        let peer = Peer {
            limit: Some("2GiB".to_string()),
            remaining: Some(512 * 1024 * 1024),
            ..Peer::default()
        };
        assert_eq!(format_remaining(&peer), "512.00 MiB (25% of 2GiB)");

        let unlimited = Peer {
            remaining_human: Some("1.5 GiB".to_string()),
            ..Peer::default()
        };
        assert_eq!(format_remaining(&unlimited), "1.5 GiB");
        assert_eq!(format_remaining(&Peer::default()), "—");
    }

    #[test]
    fn create_summary_lists_all_fields() {
        let draft = PeerDraft {
            interface: "wg0".into(),
            ip: "10.0.0.5".into(),
            name: "anna".into(),
            limit: Some(DataLimit { value: 2, unit: DataUnit::GiB }),
            dns: Some("1.1.1.1".into()),
            expiry_days: Some(30),
            first_usage: true,
            ..PeerDraft::default()
        };
        let summary = render_create_summary(&draft);
        assert!(summary.contains("Data limit: 2GiB"));
        assert!(summary.contains("Expiry: 30 days"));
        assert!(summary.contains("First usage: enabled"));
    }

    #[test]
    fn metrics_caption_includes_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let metrics: Metrics = serde_json::from_str(
            r#"{"cpu": "12%", "ram": "40%", "disk": {"used": "3 GB", "total": "20 GB"}}"#,
        )
        .unwrap();
        let caption = render_metrics_caption(&metrics, at);
        assert!(caption.contains("Disk: 3 GB / 20 GB"));
        assert!(caption.contains("Uptime: —"));
        assert!(caption.contains("2024-05-01 12:30:00"));
    }

    #[test]
    fn empty_lists_have_friendly_text() {
        assert_eq!(render_backups(&[]), "No backups found.");
        assert_eq!(render_bans(&IpBans::default()), "No IP records found.");
    }
}
