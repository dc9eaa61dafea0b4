use {
    joingate_gate::{ButtonAction, Keyboard, Reply},
    teloxide::{
        ApiError, RequestError,
        payloads::{AnswerCallbackQuerySetters, EditMessageTextSetters, SendMessageSetters},
        prelude::*,
        types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId},
    },
    tracing::{debug, warn},
};

/// Executes transport-neutral replies against the Bot API.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Deliver replies in order. A failed reply is logged and the rest are
    /// still attempted.
    pub async fn deliver(&self, replies: Vec<Reply>) {
        for reply in replies {
            if let Err(e) = self.deliver_one(&reply).await {
                if is_message_not_modified_error(&e) {
                    debug!("telegram edit skipped, message not modified");
                    continue;
                }
                warn!(error = %e, reply = reply_kind(&reply), "failed to deliver telegram reply");
            }
        }
    }

    async fn deliver_one(&self, reply: &Reply) -> Result<(), RequestError> {
        match reply {
            Reply::Send {
                chat_id,
                text,
                keyboard,
            } => {
                let mut req = self.bot.send_message(ChatId(*chat_id), text);
                if let Some(keyboard) = keyboard {
                    req = req.reply_markup(inline_keyboard(keyboard));
                }
                req.await?;
            },
            Reply::Edit {
                message,
                text,
                keyboard,
            } => {
                let mut req = self.bot.edit_message_text(
                    ChatId(message.chat_id),
                    MessageId(message.message_id),
                    text,
                );
                if let Some(keyboard) = keyboard {
                    req = req.reply_markup(inline_keyboard(keyboard));
                }
                req.await?;
            },
            Reply::AnswerCallback {
                query_id,
                text,
                alert,
            } => {
                let mut req = self.bot.answer_callback_query(query_id);
                if let Some(text) = text {
                    req = req.text(text).show_alert(*alert);
                }
                req.await?;
            },
        }
        Ok(())
    }
}

fn reply_kind(reply: &Reply) -> &'static str {
    match reply {
        Reply::Send { .. } => "send",
        Reply::Edit { .. } => "edit",
        Reply::AnswerCallback { .. } => "answer_callback",
    }
}

fn is_message_not_modified_error(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::MessageNotModified))
}

/// Build the Telegram inline keyboard. URL buttons with an unparseable
/// link are dropped, as are rows left empty by that.
pub fn inline_keyboard(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .filter_map(|button| match &button.action {
                    ButtonAction::Callback(data) => Some(InlineKeyboardButton::callback(
                        button.label.clone(),
                        data.clone(),
                    )),
                    ButtonAction::Url(url) => match reqwest::Url::parse(url) {
                        Ok(url) => Some(InlineKeyboardButton::url(button.label.clone(), url)),
                        Err(e) => {
                            warn!(link = %url, error = %e, "skipping button with invalid link");
                            None
                        },
                    },
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();
    InlineKeyboardMarkup::new(rows)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        joingate_gate::Button,
        teloxide::types::InlineKeyboardButtonKind,
    };

    #[test]
    fn keyboard_maps_url_and_callback_buttons() {
        let mut keyboard = Keyboard::default();
        keyboard.push_row(vec![Button::url("Join Group 1", "https://t.me/g1")]);
        keyboard.push_row(vec![Button::callback("🔄 Check Again", "check_42")]);

        let markup = inline_keyboard(&keyboard);
        assert_eq!(markup.inline_keyboard.len(), 2);

        let first = &markup.inline_keyboard[0][0];
        assert_eq!(first.text, "Join Group 1");
        match &first.kind {
            InlineKeyboardButtonKind::Url(url) => assert_eq!(url.as_str(), "https://t.me/g1"),
            other => panic!("expected url button, got {other:?}"),
        }

        let second = &markup.inline_keyboard[1][0];
        assert_eq!(
            second.kind,
            InlineKeyboardButtonKind::CallbackData("check_42".into())
        );
    }

    #[test]
    fn invalid_links_are_dropped_with_their_row() {
        let mut keyboard = Keyboard::default();
        keyboard.push_row(vec![Button::url("Join Group 1", "not a url")]);
        keyboard.push_row(vec![
            Button::url("Join Group 2", "t.me/missing-scheme"),
            Button::callback("🔄 Check Again", "check_42"),
        ]);

        let markup = inline_keyboard(&keyboard);
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0].len(), 1);
        assert_eq!(markup.inline_keyboard[0][0].text, "🔄 Check Again");
    }

    #[test]
    fn not_modified_is_recognised() {
        assert!(is_message_not_modified_error(&RequestError::Api(
            ApiError::MessageNotModified
        )));
        assert!(!is_message_not_modified_error(&RequestError::Io(
            std::io::Error::other("boom")
        )));
    }
}
