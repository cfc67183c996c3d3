use crate::api::ApiClient;
use crate::config::Config;
use crate::peer::{DataLimit, DataUnit};
use std::sync::Arc;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::{Message, Update};

#[derive(Clone)]
pub struct BotState {
    pub config: Arc<Config>,
    pub api: Arc<ApiClient>,
}

pub type WizardDialogue = Dialogue<State, InMemStorage<State>>;

/// Поля нового пира, собранные мастером создания.
#[derive(Clone, Debug, Default)]
pub struct PeerDraft {
    pub interface: String,
    pub ip: String,
    pub name: String,
    pub unit: Option<DataUnit>,
    pub limit: Option<DataLimit>,
    pub dns: Option<String>,
    pub expiry_days: Option<u32>,
    pub first_usage: bool,
}

#[derive(Clone, Debug)]
pub struct PeerTarget {
    pub interface: String,
    pub peer_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditField {
    DataLimit,
    Dns,
    Expiry,
    BlockStatus,
}

#[derive(Clone, Debug)]
pub struct PendingEdit {
    pub target: PeerTarget,
    pub field: EditField,
}

#[derive(Clone, Debug)]
pub struct BlockToggle {
    pub config: String,
    pub peer_name: String,
    pub blocked: bool,
}

/// Шаг мастера для конкретного чата.
#[derive(Clone, Debug, Default)]
pub enum State {
    #[default]
    Idle,
    CreateInterface,
    CreateIp(PeerDraft),
    CreateName(PeerDraft),
    CreateUnit(PeerDraft),
    CreateLimit(PeerDraft),
    CreateDns(PeerDraft),
    CreateCustomDns(PeerDraft),
    CreateExpiry(PeerDraft),
    CreateFirstUsage(PeerDraft),
    CreateConfirm(PeerDraft),
    /// Интерфейс выбран, ждём пира или поиск.
    EditPeer(String),
    EditInterface,
    EditSearch(String),
    EditOption(PeerTarget),
    EditValue(PendingEdit),
    DeleteName,
    /// Имя для поиска введено, ждём интерфейс.
    DeleteInterface(String),
    DeletePick(String),
    DeleteConfirm(PeerTarget),
    StatusName,
    BlockConfig,
    BlockName(String),
    BlockConfirm(BlockToggle),
    DownloadName,
    DownloadInterface(String),
    DownloadPick(String),
    BackupRestoreConfirm(String),
    BanIp,
    UnbanIp,
}

pub fn sender_user_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(|user| user.id.0 as i64)
}

pub fn update_user_id(update: &Update) -> Option<i64> {
    update.from().map(|user| user.id.0 as i64)
}

pub fn is_admin_update(update: &Update, state: &BotState) -> bool {
    update_user_id(update).is_some_and(|user_id| state.config.is_admin(user_id))
}
