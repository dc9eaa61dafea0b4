use std::{sync::Arc, time::Duration};

use {
    joingate_gate::{Command, Dispatcher},
    secrecy::{ExposeSecret, Secret},
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    Result, handlers,
    lanes::Lanes,
    outbound::TelegramOutbound,
    state::BotState,
};

/// Build a bot whose HTTP client outlives the long-polling timeout, so the
/// client doesn't abort `getUpdates` before Telegram responds.
pub fn build_bot(token: &Secret<String>, poll_timeout_secs: u32) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(poll_timeout_secs) + 15))
        .build()?;
    Ok(Bot::with_client(token.expose_secret(), client))
}

/// Verify credentials, clear any webhook and register the command menu.
///
/// Returns the bot's username, used to build deep links.
pub async fn connect(bot: &Bot) -> Result<Option<String>> {
    let me = bot.get_me().await?;
    bot.delete_webhook().send().await?;

    let commands: Vec<BotCommand> = Command::MENU
        .iter()
        .map(|(name, description)| BotCommand::new(*name, *description))
        .collect();
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?me.username, "telegram bot connected (webhook cleared)");
    Ok(me.username.clone())
}

/// Spawn the long-polling loop.
///
/// Updates are fanned out to per-chat lanes; the loop runs until `cancel`
/// fires or another instance takes over the token.
pub fn start_polling(
    bot: Bot,
    dispatcher: Arc<Dispatcher>,
    poll_timeout_secs: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let state = Arc::new(BotState {
        dispatcher,
        outbound: TelegramOutbound::new(bot.clone()),
    });

    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut lanes = Lanes::new(state, cancel.clone());
        let mut offset: i32 = 0;

        loop {
            let request = bot
                .get_updates()
                .offset(offset)
                .timeout(poll_timeout_secs)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("telegram polling stopped");
                    break;
                },
                result = request.send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        match handlers::lane_key(&update) {
                            Some(key) => lanes.submit(key, update),
                            None => debug!("ignoring update without a chat: {:?}", update.kind),
                        }
                    }
                    lanes.prune();
                },
                Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                    warn!("telegram bot stopped: another instance is already running with this token");
                    cancel.cancel();
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                },
            }
        }
    })
}
