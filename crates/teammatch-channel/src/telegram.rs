use anyhow::{anyhow, Result};
use std::sync::Arc;
use teloxide::{
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup},
    utils::command::BotCommands,
};
use tracing::{debug, info, warn};

use crate::router::{Button, CallbackAction, ChatCommand, CommandRouter, Inbound, Reply};
use crate::utils::{number_chunks, split_message};

/// Telegram front end for the matching bot
pub struct TelegramService {
    bot: Bot,
    router: Arc<CommandRouter>,
}

/// Bot commands; the aliases are the Turkish command names
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "Show the welcome message")]
    Start,
    #[command(description = "Create your profile", aliases = ["kayit"])]
    Register,
    #[command(description = "View your profile and connections", aliases = ["profil"])]
    Profile,
    #[command(description = "Find potential team members", aliases = ["eslesme"])]
    Matches,
    #[command(description = "Update part of your profile", aliases = ["guncelle"])]
    Update,
    #[command(description = "Cancel the registration or update in progress")]
    Cancel,
    #[command(description = "Get help", aliases = ["yardim"])]
    Help,
}

impl From<Command> for ChatCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::Start => ChatCommand::Start,
            Command::Register => ChatCommand::Register,
            Command::Profile => ChatCommand::Profile,
            Command::Matches => ChatCommand::Matches,
            Command::Update => ChatCommand::Update,
            Command::Cancel => ChatCommand::Cancel,
            Command::Help => ChatCommand::Help,
        }
    }
}

impl TelegramService {
    pub fn new(token: &str, router: CommandRouter) -> Self {
        let bot = Bot::new(token);
        info!("Telegram service initialized");
        Self {
            bot,
            router: Arc::new(router),
        }
    }

    /// Validate the bot token by making a test API call
    pub async fn validate_token(&self) -> Result<()> {
        info!("Validating Telegram bot token...");

        match self.bot.get_me().await {
            Ok(me) => {
                info!("Telegram bot token is valid (@{})", me.username());
                Ok(())
            }
            Err(teloxide::RequestError::Api(teloxide::ApiError::InvalidToken)) => Err(anyhow!(
                "Invalid Telegram bot token. Please check TELEGRAM_BOT_TOKEN environment variable \
                or edit ~/.teammatch/teammatch.toml"
            )),
            Err(e) => Err(anyhow!("Failed to validate Telegram bot token: {}", e)),
        }
    }

    /// Run the bot until the dispatcher stops (blocking)
    pub async fn run(self) -> Result<()> {
        self.validate_token().await?;

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!("Failed to register the command menu: {}", e);
        }

        info!("Starting Telegram bot...");

        let router = self.router.clone();

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .branch(
                        dptree::entry()
                            .filter_command::<Command>()
                            .endpoint(Self::handle_command),
                    )
                    .branch(
                        dptree::filter(|msg: Message| msg.text().is_some())
                            .endpoint(Self::handle_message),
                    ),
            )
            .branch(Update::filter_callback_query().endpoint(Self::handle_callback));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![router])
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .build();

        dispatcher.dispatch().await;

        Ok(())
    }

    async fn handle_command(
        bot: Bot,
        msg: Message,
        cmd: Command,
        router: Arc<CommandRouter>,
    ) -> Result<(), teloxide::RequestError> {
        let Some(user) = msg.from.as_ref() else {
            return Ok(());
        };
        let replies = router
            .dispatch(user.id.0 as i64, Inbound::Command(cmd.into()))
            .await;
        Self::deliver(&bot, replies).await
    }

    async fn handle_message(
        bot: Bot,
        msg: Message,
        router: Arc<CommandRouter>,
    ) -> Result<(), teloxide::RequestError> {
        let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
            return Ok(());
        };
        let replies = router
            .dispatch(user.id.0 as i64, Inbound::Text(text.to_string()))
            .await;
        Self::deliver(&bot, replies).await
    }

    async fn handle_callback(
        bot: Bot,
        q: CallbackQuery,
        router: Arc<CommandRouter>,
    ) -> Result<(), teloxide::RequestError> {
        // Stops the client-side spinner whatever happens next
        bot.answer_callback_query(q.id.clone()).await?;

        let data = q.data.clone().unwrap_or_default();
        let inbound = match data.parse::<CallbackAction>() {
            Ok(action) => Inbound::Action(action),
            Err(()) => Inbound::UnknownAction(data),
        };
        let replies = router.dispatch(q.from.id.0 as i64, inbound).await;
        Self::deliver(&bot, replies).await
    }

    /// Send every reply; a failed notice to another user does not abort the rest
    async fn deliver(bot: &Bot, replies: Vec<Reply>) -> Result<(), teloxide::RequestError> {
        let Some(sender) = replies.first().map(|reply| reply.chat) else {
            return Ok(());
        };

        for reply in replies {
            match Self::send_reply(bot, &reply).await {
                Ok(()) => debug!("Delivered reply to {}", reply.chat),
                Err(e) if reply.chat != sender => {
                    warn!("Failed to notify user {}: {}", reply.chat, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Send one reply, split to fit Telegram's limits; buttons go on the last part
    async fn send_reply(bot: &Bot, reply: &Reply) -> Result<(), teloxide::RequestError> {
        let chat_id = ChatId(reply.chat);
        let chunks = number_chunks(split_message(&reply.text));
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut request = bot.send_message(chat_id, chunk);
            if i == last && !reply.buttons.is_empty() {
                request = request.reply_markup(keyboard(&reply.buttons));
            }
            request.await?;
        }
        Ok(())
    }
}

fn keyboard(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.data.clone()))
            .collect::<Vec<_>>()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_aliases() {
        let parse = |text: &str| Command::parse(text, "teammatch_bot").ok().map(ChatCommand::from);
        assert_eq!(parse("/register"), Some(ChatCommand::Register));
        assert_eq!(parse("/kayit"), Some(ChatCommand::Register));
        assert_eq!(parse("/eslesme"), Some(ChatCommand::Matches));
        assert_eq!(parse("/yardim"), Some(ChatCommand::Help));
        assert_eq!(parse("/cancel"), Some(ChatCommand::Cancel));
        assert_eq!(parse("/nonsense"), None);
    }

    #[test]
    fn test_keyboard_layout() {
        let rows = vec![vec![
            Button {
                label: "A".to_string(),
                data: "update:name".to_string(),
            },
            Button {
                label: "B".to_string(),
                data: "update:bio".to_string(),
            },
        ]];
        let markup = keyboard(&rows);
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
    }
}
