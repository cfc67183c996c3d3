use super::format::render_metrics_caption;
use super::shared::{callback_chat_id, report_error, send_screen, HandlerResult};
use super::state::BotState;
use crate::bot::keyboards::{self, MENU_MAIN};
use crate::render::{disk_value, metrics_chart_png, percent_value};
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};

pub async fn show_metrics(bot: Bot, q: CallbackQuery, state: BotState) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let chat_id = callback_chat_id(&q);

    let metrics = match state.api.metrics().await {
        Ok(metrics) => metrics,
        Err(error) => {
            return report_error(&bot, chat_id, "fetching metrics", &error, keyboards::back_to(MENU_MAIN)).await;
        }
    };
    let caption = render_metrics_caption(&metrics, chrono::Local::now());
    let chart = metrics_chart_png(
        percent_value(metrics.cpu.as_deref()),
        percent_value(metrics.ram.as_deref()),
        disk_value(metrics.disk.used.as_deref()),
    );

    match chart {
        Ok(png) => {
            bot.send_photo(chat_id, InputFile::memory(png).file_name("metrics.png"))
                .caption(caption)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::back_to(MENU_MAIN))
                .await?;
            Ok(())
        }
        Err(error) => {
            tracing::warn!(error = %error, "Failed to render metrics chart");
            send_screen(&bot, chat_id, caption, keyboards::back_to(MENU_MAIN)).await
        }
    }
}
