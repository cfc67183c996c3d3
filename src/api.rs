//! HTTP-клиент API панели WireGuard.

#[path = "api/types.rs"]
mod types;

pub use types::{ExpiryTime, IpBans, Metrics, NewPeer, Peer, PeerEdit};

use crate::config::Config;
use crate::peer::{config_file, interface_name};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use types::{
    ApiMessage, AvailableIpsResponse, BackupsResponse, DeletePeerBody, InterfacesResponse, IpBody,
    PeersResponse, RestoreBackupBody, TogglePeerBody,
};

const MAX_ERROR_BODY: usize = 300;

/// Ошибка запроса к API. `Display` отдаёт только текст для пользователя.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("{0}")]
    Remote(String),
    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Ссылка на скачивание бэкапа для inline-кнопки.
    pub fn backup_download_url(&self, name: &str) -> String {
        format!(
            "{}?name={}",
            self.url("api/download-backup"),
            urlencoding::encode(name)
        )
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ApiError> {
        tracing::debug!(method = %method, endpoint = endpoint, "API request");
        let mut request = self
            .http
            .request(method.clone(), self.url(endpoint))
            .bearer_auth(&self.api_key);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|error| {
            tracing::warn!(method = %method, endpoint = endpoint, error = %error, "API request failed");
            ApiError::Transport(error)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = error_message(status, &text);
        tracing::warn!(
            method = %method,
            endpoint = endpoint,
            status = status.as_u16(),
            message = %message,
            "API returned error status"
        );
        Err(ApiError::Status { status, message })
    }

    /// Общий запрос: JSON-ответ, поле `error` в теле считается ошибкой.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, endpoint, query, body).await?;
        let text = response.text().await?;
        let value: serde_json::Value = if text.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&text).map_err(|error| ApiError::Decode(error.to_string()))?
        };

        if let Some(error) = value.get("error").filter(|error| !error.is_null()) {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            tracing::warn!(endpoint = endpoint, message = %message, "API reported error");
            return Err(ApiError::Remote(message));
        }

        serde_json::from_value(value).map_err(|error| ApiError::Decode(error.to_string()))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        self.request(Method::GET, endpoint, query, None).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|error| ApiError::Decode(error.to_string()))?;
        self.request(Method::POST, endpoint, &[], body).await
    }

    pub async fn interfaces(&self) -> Result<Vec<String>, ApiError> {
        let response: InterfacesResponse = self.get("api/get-interfaces", &[]).await?;
        Ok(response.interfaces)
    }

    pub async fn available_ips(&self, interface: &str) -> Result<Vec<String>, ApiError> {
        let response: AvailableIpsResponse = self
            .get(
                "api/available-ips",
                &[("interface", interface_name(interface))],
            )
            .await?;
        Ok(response.available_ips)
    }

    pub async fn peers(&self, config: &str, page: u32, limit: u32) -> Result<Vec<Peer>, ApiError> {
        let config = config_file(config);
        let page = page.to_string();
        let limit = limit.to_string();
        let response: PeersResponse = self
            .get(
                "api/peers",
                &[
                    ("config", config.as_str()),
                    ("page", page.as_str()),
                    ("limit", limit.as_str()),
                ],
            )
            .await?;
        Ok(response.peers)
    }

    pub async fn peers_by_interface(
        &self,
        interface: &str,
        peer_name: Option<&str>,
    ) -> Result<Vec<Peer>, ApiError> {
        let mut query = vec![("interface", interface_name(interface))];
        if let Some(name) = peer_name {
            query.push(("peerName", name));
        }
        let response: PeersResponse = self.get("api/peers-by-interface", &query).await?;
        Ok(response.peers)
    }

    pub async fn create_peer(&self, peer: &NewPeer) -> Result<ApiMessage, ApiError> {
        tracing::info!(
            peer_name = %peer.peer_name,
            peer_ip = %peer.peer_ip,
            config_file = %peer.config_file,
            "Creating peer"
        );
        self.post("api/create-peer", Some(peer)).await
    }

    pub async fn edit_peer(&self, edit: &PeerEdit) -> Result<ApiMessage, ApiError> {
        tracing::info!(peer_name = %edit.peer_name, "Editing peer");
        self.post("api/edit-peer", Some(edit)).await
    }

    pub async fn delete_peer(&self, peer_name: &str, config: &str) -> Result<ApiMessage, ApiError> {
        tracing::info!(peer_name = peer_name, config = config, "Deleting peer");
        let body = DeletePeerBody {
            peer_name,
            config_file: config_file(config),
        };
        self.post("api/delete-peer", Some(&body)).await
    }

    pub async fn toggle_peer(
        &self,
        peer_name: &str,
        blocked: bool,
        config: &str,
    ) -> Result<ApiMessage, ApiError> {
        tracing::info!(peer_name = peer_name, blocked = blocked, "Toggling peer block status");
        let body = TogglePeerBody {
            peer_name,
            blocked,
            config: config_file(config),
        };
        self.post("api/toggle-peer", Some(&body)).await
    }

    pub async fn peer_config(&self, peer_name: &str, config: &str) -> Result<String, ApiError> {
        let config = config_file(config);
        let response = self
            .send(
                Method::GET,
                "api/download-peer-config",
                &[("peerName", peer_name), ("config", config.as_str())],
                None,
            )
            .await?;
        Ok(response.text().await?)
    }

    pub async fn export_peer(&self, peer_name: &str, config: &str) -> Result<String, ApiError> {
        let config = config_file(config);
        let response = self
            .send(
                Method::GET,
                "api/export-peer",
                &[("peerName", peer_name), ("config", config.as_str())],
                None,
            )
            .await?;
        Ok(response.text().await?)
    }

    pub async fn peer_qr(&self, peer_name: &str, config: &str) -> Result<Vec<u8>, ApiError> {
        let config = config_file(config);
        let response = self
            .send(
                Method::GET,
                "api/download-peer-qr",
                &[("peerName", peer_name), ("config", config.as_str())],
                None,
            )
            .await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn metrics(&self) -> Result<Metrics, ApiError> {
        self.get("api/metrics", &[]).await
    }

    pub async fn backups(&self) -> Result<Vec<String>, ApiError> {
        let response: BackupsResponse = self.get("api/backups", &[]).await?;
        Ok(response.backups)
    }

    pub async fn create_backup(&self) -> Result<ApiMessage, ApiError> {
        tracing::info!("Creating backup");
        self.post::<_, serde_json::Value>("api/create-backup", None)
            .await
    }

    pub async fn delete_backup(&self, name: &str) -> Result<ApiMessage, ApiError> {
        tracing::info!(backup = name, "Deleting backup");
        self.request(
            Method::DELETE,
            "api/delete-backup",
            &[("name", name), ("folder", "root")],
            None,
        )
        .await
    }

    pub async fn restore_backup(&self, name: &str) -> Result<ApiMessage, ApiError> {
        tracing::info!(backup = name, "Restoring backup");
        self.post("api/restore-backup", Some(&RestoreBackupBody { backup_name: name }))
            .await
    }

    pub async fn ip_bans(&self) -> Result<IpBans, ApiError> {
        self.get("api/public-ip-settings", &[]).await
    }

    pub async fn ban_ip(&self, ip: &str) -> Result<ApiMessage, ApiError> {
        tracing::info!(ip = ip, "Banning IP");
        self.post("api/ban-ip", Some(&IpBody { ip })).await
    }

    pub async fn unban_ip(&self, ip: &str) -> Result<ApiMessage, ApiError> {
        tracing::info!(ip = ip, "Unbanning IP");
        self.post("api/unban-ip", Some(&IpBody { ip })).await
    }
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["error", "message"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    if trimmed.is_empty() || trimmed.starts_with('<') {
        return format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("error")
        );
    }
    if trimmed.chars().count() > MAX_ERROR_BODY {
        let head: String = trimmed.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(server.url(), "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn sends_bearer_token_and_decodes_interfaces() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/get-interfaces")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"interfaces": ["wg0", "wg1"]}"#)
            .create_async()
            .await;

        let interfaces = client(&server).interfaces().await.unwrap();
        assert_eq!(interfaces, vec!["wg0", "wg1"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn available_ips_strip_conf_suffix() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/available-ips")
            .match_query(Matcher::UrlEncoded("interface".into(), "wg0".into()))
            .with_status(200)
            .with_body(r#"{"availableIps": ["10.0.0.2", "10.0.0.3"]}"#)
            .create_async()
            .await;

        let ips = client(&server).available_ips("wg0.conf").await.unwrap();
        assert_eq!(ips, vec!["10.0.0.2", "10.0.0.3"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_field_in_success_body_is_remote_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/create-peer")
            .with_status(200)
            .with_body(r#"{"error": "Peer already exists"}"#)
            .create_async()
            .await;

        let peer = NewPeer {
            peer_name: "anna".into(),
            peer_ip: "10.0.0.2".into(),
            data_limit: "1GiB".into(),
            config_file: "wg0.conf".into(),
            first_usage: false,
            dns: "1.1.1.1".into(),
            expiry_days: 30,
            expiry_months: 0,
            expiry_hours: 0,
            expiry_minutes: 0,
        };
        let error = client(&server).create_peer(&peer).await.unwrap_err();
        assert!(matches!(error, ApiError::Remote(_)));
        assert_eq!(error.to_string(), "Peer already exists");
    }

    #[tokio::test]
    async fn non_success_status_uses_json_error_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/backups")
            .with_status(401)
            .with_body(r#"{"error": "Unauthorized"}"#)
            .create_async()
            .await;

        let error = client(&server).backups().await.unwrap_err();
        match error {
            ApiError::Status { status, message } => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn html_error_pages_are_not_shown_raw() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/metrics")
            .with_status(502)
            .with_body("<html><body>Bad Gateway</body></html>")
            .create_async()
            .await;

        let error = client(&server).metrics().await.unwrap_err();
        assert_eq!(error.to_string(), "HTTP 502 Bad Gateway");
    }

    #[tokio::test]
    async fn edit_peer_posts_only_changed_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/edit-peer")
            .match_body(Matcher::Json(json!({"peerName": "anna", "dataLimit": "2GiB"})))
            .with_status(200)
            .with_body(r#"{"message": "Peer updated"}"#)
            .create_async()
            .await;

        let edit = PeerEdit {
            data_limit: Some("2GiB".into()),
            ..PeerEdit::new("anna")
        };
        let reply = client(&server).edit_peer(&edit).await.unwrap();
        assert_eq!(reply.or("fallback"), "Peer updated");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_peer_appends_conf_extension() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/delete-peer")
            .match_body(Matcher::Json(json!({"peerName": "anna", "configFile": "wg0.conf"})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let reply = client(&server).delete_peer("anna", "wg0").await.unwrap();
        assert_eq!(reply.or("Peer deleted"), "Peer deleted");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_backup_uses_delete_method_with_root_folder() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/delete-backup")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("name".into(), "backup 1.zip".into()),
                Matcher::UrlEncoded("folder".into(), "root".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"message": "Deleted"}"#)
            .create_async()
            .await;

        client(&server).delete_backup("backup 1.zip").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn peer_qr_returns_raw_bytes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/download-peer-qr")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("peerName".into(), "anna".into()),
                Matcher::UrlEncoded("config".into(), "wg0.conf".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(vec![0x89, b'P', b'N', b'G'])
            .create_async()
            .await;

        let bytes = client(&server).peer_qr("anna", "wg0").await.unwrap();
        assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let api = ApiClient::new("http://127.0.0.1:9", "k", Duration::from_secs(2)).unwrap();
        let error = api.interfaces().await.unwrap_err();
        assert!(matches!(error, ApiError::Transport(_)));
    }

    #[test]
    fn backup_download_url_is_encoded() {
        let api = ApiClient::new("http://panel/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(
            api.backup_download_url("a b.zip"),
            "http://panel/api/download-backup?name=a%20b.zip"
        );
    }

    #[test]
    fn long_plain_error_bodies_are_truncated() {
        let body = "x".repeat(500);
        let message = error_message(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert_eq!(message.chars().count(), MAX_ERROR_BODY + 3);
    }
}
