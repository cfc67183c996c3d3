use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Значения API иногда приходят числом, иногда строкой.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64)),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_number(deserializer)?.unwrap_or_default())
}

/// `null` и пропуск дают `false`; принимаются также `1`/`0` и `"true"`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(serde_json::Value::String(s)) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
        }
        _ => false,
    })
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|v| v as i64))
            .unwrap_or_default(),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ExpiryTime {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub months: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub days: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub hours: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub minutes: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Peer {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub peer_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub peer_ip: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub limit: Option<String>,
    #[serde(default)]
    pub dns: Option<String>,
    #[serde(default)]
    pub expiry_time: Option<ExpiryTime>,
    /// Остаток трафика в байтах.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub remaining: Option<u64>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub remaining_human: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub blocked: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub expiry_blocked: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub monitor_blocked: bool,
}

impl Peer {
    pub fn is_blocked(&self) -> bool {
        self.blocked || self.expiry_blocked || self.monitor_blocked
    }

    pub fn matches(&self, query: &str) -> bool {
        self.peer_name
            .to_lowercase()
            .contains(&query.trim().to_lowercase())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct InterfacesResponse {
    #[serde(default)]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AvailableIpsResponse {
    #[serde(default, rename = "availableIps")]
    pub available_ips: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PeersResponse {
    #[serde(default)]
    pub peers: Vec<Peer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BackupsResponse {
    #[serde(default)]
    pub backups: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiMessage {
    pub fn or(self, fallback: impl Into<String>) -> String {
        self.message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| fallback.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiskUsage {
    #[serde(default, deserialize_with = "string_or_number")]
    pub used: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub total: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metrics {
    #[serde(default, deserialize_with = "string_or_number")]
    pub cpu: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub ram: Option<String>,
    #[serde(default)]
    pub disk: DiskUsage,
    #[serde(default, deserialize_with = "string_or_number")]
    pub uptime: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpBans {
    #[serde(default)]
    pub ip_status: BTreeMap<String, String>,
}

impl IpBans {
    pub fn banned(&self) -> impl Iterator<Item = &str> {
        self.ip_status
            .iter()
            .filter(|(_, status)| status.eq_ignore_ascii_case("banned"))
            .map(|(ip, _)| ip.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPeer {
    pub peer_name: String,
    pub peer_ip: String,
    pub data_limit: String,
    pub config_file: String,
    pub first_usage: bool,
    pub dns: String,
    pub expiry_days: u32,
    pub expiry_months: u32,
    pub expiry_hours: u32,
    pub expiry_minutes: u32,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeerEdit {
    pub peer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_hours: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_minutes: Option<u32>,
}

impl PeerEdit {
    pub fn new(peer_name: impl Into<String>) -> Self {
        Self {
            peer_name: peer_name.into(),
            ..Self::default()
        }
    }

    pub fn with_expiry(mut self, expiry: crate::peer::Expiry) -> Self {
        self.expiry_months = Some(expiry.months);
        self.expiry_days = Some(expiry.days);
        self.expiry_hours = Some(expiry.hours);
        self.expiry_minutes = Some(expiry.minutes);
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeletePeerBody<'a> {
    pub peer_name: &'a str,
    pub config_file: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TogglePeerBody<'a> {
    pub peer_name: &'a str,
    pub blocked: bool,
    pub config: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RestoreBackupBody<'a> {
    pub backup_name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct IpBody<'a> {
    pub ip: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_decodes_partial_records() {
        let peer: Peer = serde_json::from_str(
            r#"{"peer_name": "anna", "limit": 1024, "monitor_blocked": true,
                "expiry_time": {"days": 3}}"#,
        )
        .unwrap();
        assert_eq!(peer.peer_name, "anna");
        assert_eq!(peer.limit.as_deref(), Some("1024"));
        assert!(peer.is_blocked());
        assert_eq!(peer.expiry_time.unwrap().days, 3);
        assert!(peer.public_key.is_none());
        assert!(peer.remaining.is_none());
    }

    #[test]
    fn null_flags_do_not_break_peer_list() {
        let response: PeersResponse = serde_json::from_str(
            r#"{"peers": [
                {"peer_name": "anna", "blocked": null, "expiry_blocked": null, "monitor_blocked": null},
                {"peer_name": null, "blocked": "true", "expiry_blocked": 0},
                {"peer_name": "igor", "monitor_blocked": 1}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.peers.len(), 3);
        assert!(!response.peers[0].is_blocked());
        assert_eq!(response.peers[1].peer_name, "");
        assert!(response.peers[1].blocked);
        assert!(!response.peers[1].expiry_blocked);
        assert!(response.peers[2].is_blocked());
    }

    #[test]
    fn expiry_fields_accept_strings_and_null() {
        let peer: Peer = serde_json::from_str(
            r#"{"peer_name": "anna",
                "expiry_time": {"months": null, "days": "3", "hours": 4.0, "minutes": "soon"}}"#,
        )
        .unwrap();
        assert_eq!(
            peer.expiry_time,
            Some(ExpiryTime {
                months: 0,
                days: 3,
                hours: 4,
                minutes: 0,
            })
        );
    }

    #[test]
    fn remaining_accepts_numbers_and_numeric_strings() {
        let peer: Peer = serde_json::from_str(r#"{"peer_name": "a", "remaining": 1048576.0}"#).unwrap();
        assert_eq!(peer.remaining, Some(1048576));
        let peer: Peer = serde_json::from_str(r#"{"peer_name": "a", "remaining": "2048"}"#).unwrap();
        assert_eq!(peer.remaining, Some(2048));
        let peer: Peer = serde_json::from_str(r#"{"peer_name": "a", "remaining": "unlimited"}"#).unwrap();
        assert_eq!(peer.remaining, None);
    }

    #[test]
    fn peer_edit_omits_unset_fields() {
        let edit = PeerEdit {
            dns: Some("1.1.1.1".into()),
            ..PeerEdit::new("anna")
        };
        let json = serde_json::to_value(&edit).unwrap();
        assert_eq!(json, serde_json::json!({"peerName": "anna", "dns": "1.1.1.1"}));
    }

    #[test]
    fn banned_ips_are_filtered_by_status() {
        let bans: IpBans = serde_json::from_str(
            r#"{"ip_status": {"1.2.3.4": "banned", "5.6.7.8": "active", "9.9.9.9": "Banned"}}"#,
        )
        .unwrap();
        assert_eq!(bans.banned().collect::<Vec<_>>(), vec!["1.2.3.4", "9.9.9.9"]);
    }
}
