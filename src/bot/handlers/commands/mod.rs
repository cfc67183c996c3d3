use super::format::help_text;
use super::menu::send_main_menu;
use super::shared::{report_error, send_peer_config, send_peer_qr, HandlerResult};
use super::state::{sender_user_id, BotState, State, WizardDialogue};
use crate::bot::keyboards::{self, MENU_MAIN};
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use teloxide::utils::html::escape;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum BotCommand {
    #[command(description = "Open the main menu")]
    Start,
    #[command(description = "Open the main menu")]
    Menu,
    #[command(description = "Show help")]
    Help,
    #[command(description = "Abort the current action")]
    Cancel,
    #[command(description = "Peer QR code: /qr <peer_name> <config_name>")]
    Qr(String),
    #[command(description = "Peer config file: /config <peer_name> <config_name>")]
    Config(String),
    #[command(description = "Peer config as text: /export <peer_name> <config_name>")]
    Export(String),
}

pub fn handler() -> teloxide::dispatching::UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    teloxide::filter_command::<BotCommand, _>()
        .branch(dptree::case![BotCommand::Start].endpoint(cmd_menu))
        .branch(dptree::case![BotCommand::Menu].endpoint(cmd_menu))
        .branch(dptree::case![BotCommand::Help].endpoint(cmd_help))
        .branch(dptree::case![BotCommand::Cancel].endpoint(cmd_cancel))
        .branch(dptree::case![BotCommand::Qr(args)].endpoint(cmd_qr))
        .branch(dptree::case![BotCommand::Config(args)].endpoint(cmd_config))
        .branch(dptree::case![BotCommand::Export(args)].endpoint(cmd_export))
}

/// Аргументы `/qr anna wg0` -> (`anna`, `wg0`). Ровно два значения.
pub fn parse_peer_args(args: &str) -> Option<(String, String)> {
    let mut parts = args.split_whitespace();
    let peer_name = parts.next()?;
    let config = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((peer_name.to_string(), config.to_string()))
}

fn usage(command: &str) -> String {
    format!(
        "❌ Invalid format. Use /{} <peer_name> <config_name>.",
        command
    )
}

async fn cmd_menu(bot: Bot, msg: Message, dialogue: WizardDialogue) -> HandlerResult {
    tracing::info!(user_id = ?sender_user_id(&msg), "Received menu command");
    dialogue.update(State::Idle).await?;
    send_main_menu(&bot, msg.chat.id).await
}

async fn cmd_help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, help_text()).await?;
    Ok(())
}

async fn cmd_cancel(bot: Bot, msg: Message, dialogue: WizardDialogue) -> HandlerResult {
    tracing::info!(user_id = ?sender_user_id(&msg), "Wizard cancelled");
    dialogue.update(State::Idle).await?;
    bot.send_message(msg.chat.id, "Cancelled.")
        .reply_markup(keyboards::main_menu())
        .await?;
    Ok(())
}

async fn cmd_qr(bot: Bot, msg: Message, state: BotState, args: String) -> HandlerResult {
    let Some((peer_name, config)) = parse_peer_args(&args) else {
        bot.send_message(msg.chat.id, usage("qr")).await?;
        return Ok(());
    };
    if let Err(error) = send_peer_qr(&bot, msg.chat.id, &state, &peer_name, &config).await {
        report_error(&bot, msg.chat.id, "fetching QR code", &error, keyboards::back_to(MENU_MAIN)).await?;
    }
    Ok(())
}

async fn cmd_config(bot: Bot, msg: Message, state: BotState, args: String) -> HandlerResult {
    let Some((peer_name, config)) = parse_peer_args(&args) else {
        bot.send_message(msg.chat.id, usage("config")).await?;
        return Ok(());
    };
    if let Err(error) = send_peer_config(&bot, msg.chat.id, &state, &peer_name, &config).await {
        report_error(&bot, msg.chat.id, "downloading config", &error, keyboards::back_to(MENU_MAIN)).await?;
    }
    Ok(())
}

async fn cmd_export(bot: Bot, msg: Message, state: BotState, args: String) -> HandlerResult {
    let Some((peer_name, config)) = parse_peer_args(&args) else {
        bot.send_message(msg.chat.id, usage("export")).await?;
        return Ok(());
    };
    match state.api.export_peer(&peer_name, &config).await {
        Ok(text) => {
            tracing::info!(peer_name = %peer_name, config = %config, "Exported peer config");
            bot.send_message(msg.chat.id, format!("<pre>{}</pre>", escape(text.trim())))
                .parse_mode(ParseMode::Html)
                .await?;
            Ok(())
        }
        Err(error) => report_error(&bot, msg.chat.id, "exporting peer", &error, keyboards::back_to(MENU_MAIN)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_args_need_exactly_two_values() {
        assert_eq!(
            parse_peer_args("anna wg0.conf"),
            Some(("anna".to_string(), "wg0.conf".to_string()))
        );
        assert_eq!(parse_peer_args("anna"), None);
        assert_eq!(parse_peer_args(""), None);
        assert_eq!(parse_peer_args("anna wg0 extra"), None);
    }

    #[test]
    fn usage_names_the_command() {
        assert_eq!(
            usage("qr"),
            "❌ Invalid format. Use /qr <peer_name> <config_name>."
        );
    }

    #[test]
    fn command_list_mentions_every_command() {
        let descriptions = BotCommand::descriptions().to_string();
        for command in ["/start", "/menu", "/help", "/cancel", "/qr", "/config", "/export"] {
            assert!(descriptions.contains(command), "{command} missing");
        }
    }
}
