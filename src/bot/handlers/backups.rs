use super::format::render_backups;
use super::shared::{callback_chat_id, callback_payload, report_error, show_screen, HandlerResult};
use super::state::{BotState, State, WizardDialogue};
use crate::bot::keyboards::{self, CONFIRM_YES, MENU_BACKUPS};
use teloxide::prelude::*;
use teloxide::utils::html::escape;

async fn fetch_backups(
    bot: &Bot,
    q: &CallbackQuery,
    state: &BotState,
) -> Result<Option<Vec<String>>, Box<dyn std::error::Error + Send + Sync>> {
    match state.api.backups().await {
        Ok(backups) => Ok(Some(backups)),
        Err(error) => {
            report_error(bot, callback_chat_id(q), "fetching backups", &error, keyboards::back_to(MENU_BACKUPS)).await?;
            Ok(None)
        }
    }
}

pub async fn show_list(bot: Bot, q: CallbackQuery, state: BotState) -> HandlerResult {
    let Some(backups) = fetch_backups(&bot, &q, &state).await? else {
        return Ok(());
    };
    let links: Vec<(String, String)> = backups
        .iter()
        .map(|name| (name.clone(), state.api.backup_download_url(name)))
        .collect();
    show_screen(
        &bot,
        &q,
        render_backups(&backups),
        keyboards::backup_links_keyboard(&links),
    )
    .await
}

pub async fn create(bot: Bot, q: CallbackQuery, state: BotState) -> HandlerResult {
    match state.api.create_backup().await {
        Ok(reply) => {
            let text = reply.or("Backup created.");
            show_screen(&bot, &q, format!("✅ {}", escape(&text)), keyboards::backups_menu()).await
        }
        Err(error) => report_error(&bot, callback_chat_id(&q), "creating backup", &error, keyboards::backups_menu()).await,
    }
}

async fn pick(bot: Bot, q: CallbackQuery, state: BotState, prefix: &str, prompt: &str) -> HandlerResult {
    let Some(backups) = fetch_backups(&bot, &q, &state).await? else {
        return Ok(());
    };
    if backups.is_empty() {
        return show_screen(&bot, &q, "No backups found.", keyboards::back_to(MENU_BACKUPS)).await;
    }
    show_screen(&bot, &q, prompt, keyboards::backup_pick_keyboard(prefix, &backups)).await
}

pub async fn pick_for_delete(bot: Bot, q: CallbackQuery, state: BotState) -> HandlerResult {
    pick(bot, q, state, "bk_del:", "Select a backup to delete:").await
}

pub async fn pick_for_restore(bot: Bot, q: CallbackQuery, state: BotState) -> HandlerResult {
    pick(bot, q, state, "bk_res:", "Select a backup to restore:").await
}

pub async fn delete(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    dialogue.update(State::Idle).await?;
    let name = callback_payload(&q, "bk_del:").to_string();
    match state.api.delete_backup(&name).await {
        Ok(reply) => {
            let text = reply.or(format!("Backup '{}' deleted.", name));
            show_screen(&bot, &q, format!("✅ {}", escape(&text)), keyboards::backups_menu()).await
        }
        Err(error) => report_error(&bot, callback_chat_id(&q), "deleting backup", &error, keyboards::backups_menu()).await,
    }
}

pub async fn ask_restore(bot: Bot, q: CallbackQuery, dialogue: WizardDialogue) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let name = callback_payload(&q, "bk_res:").to_string();
    let text = format!(
        "Restore backup '{}'? Current configuration will be replaced.",
        escape(&name)
    );
    dialogue.update(State::BackupRestoreConfirm(name)).await?;
    show_screen(&bot, &q, text, keyboards::confirm_keyboard("♻️ Restore", "❌ Cancel")).await
}

pub async fn confirm_restore(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WizardDialogue,
    state: BotState,
    name: String,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    dialogue.update(State::Idle).await?;
    if q.data.as_deref() != Some(CONFIRM_YES) {
        return show_screen(&bot, &q, "Restore cancelled.", keyboards::backups_menu()).await;
    }

    match state.api.restore_backup(&name).await {
        Ok(reply) => {
            tracing::info!(backup = %name, "Backup restored");
            let text = reply.or(format!("Backup '{}' restored.", name));
            show_screen(&bot, &q, format!("✅ {}", escape(&text)), keyboards::backups_menu()).await
        }
        Err(error) => report_error(&bot, callback_chat_id(&q), "restoring backup", &error, keyboards::backups_menu()).await,
    }
}
