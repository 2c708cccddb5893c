pub mod callback;
pub mod membership;
pub mod message;

use std::sync::Arc;
use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
};

use crate::config::Config;
use crate::database::DatabaseManager;
use crate::services::{CampService, Notifier, ParticipationService};

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Shared state handed to every update endpoint.
#[derive(Clone)]
pub struct BotHandler {
    pub db: Arc<DatabaseManager>,
    pub config: Arc<Config>,
    pub notifier: Arc<dyn Notifier>,
    pub participation: ParticipationService,
    pub camps: CampService,
}

impl BotHandler {
    pub fn new(db: Arc<DatabaseManager>, config: Arc<Config>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            participation: ParticipationService::new(db.clone(), config.timezone),
            camps: CampService::new(db.clone(), config.timezone),
            db,
            config,
            notifier,
        }
    }

    pub fn schema(&self) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        let on_command = self.clone();
        let on_callback = self.clone();
        let on_membership = self.clone();

        dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<crate::bot::commands::Command>()
                    .endpoint(move |bot, msg, cmd| {
                        let handler = on_command.clone();
                        async move { message::command_handler(bot, msg, cmd, handler).await }
                    }),
            )
            .branch(Update::filter_callback_query().endpoint(move |bot, q| {
                let handler = on_callback.clone();
                async move { callback::callback_handler(bot, q, handler).await }
            }))
            .branch(Update::filter_my_chat_member().endpoint(move |bot, update| {
                let handler = on_membership.clone();
                async move { membership::bot_membership_handler(bot, update, handler).await }
            }))
    }
}
