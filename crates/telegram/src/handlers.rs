use {
    async_trait::async_trait,
    joingate_gate::{Inbound, MessageHandle, Sender, UserId},
    teloxide::types::{CallbackQuery, Message, Update, UpdateKind, User},
    tracing::debug,
};

use crate::{lanes::LaneWorker, state::BotState};

/// Chat that orders an update: the message chat, or for callbacks the chat
/// of the message carrying the keyboard (falling back to the presser).
pub fn lane_key(update: &Update) -> Option<i64> {
    match &update.kind {
        UpdateKind::Message(msg) => Some(msg.chat.id.0),
        UpdateKind::CallbackQuery(query) => match &query.message {
            Some(message) => Some(message.chat().id.0),
            None => i64::try_from(query.from.id.0).ok(),
        },
        _ => None,
    }
}

/// Translate a Telegram update into a core event, if it carries one.
pub fn inbound_from_update(update: &Update) -> Option<Inbound> {
    match &update.kind {
        UpdateKind::Message(msg) => inbound_from_message(msg),
        UpdateKind::CallbackQuery(query) => inbound_from_callback(query),
        _ => None,
    }
}

fn inbound_from_message(msg: &Message) -> Option<Inbound> {
    let text = msg.text()?;
    let sender = sender_from_user(msg.from.as_ref()?)?;
    Some(Inbound::message(sender, msg.chat.id.0, text))
}

fn inbound_from_callback(query: &CallbackQuery) -> Option<Inbound> {
    let data = query.data.as_deref()?;
    let sender = sender_from_user(&query.from)?;
    let message = query.message.as_ref().map(|m| MessageHandle {
        chat_id: m.chat().id.0,
        message_id: m.id().0,
    });
    let chat_id = message.map_or(sender.id.0, |m| m.chat_id);
    Some(Inbound::callback(
        sender,
        chat_id,
        query.id.clone(),
        message,
        data,
    ))
}

fn sender_from_user(user: &User) -> Option<Sender> {
    if user.is_bot {
        return None;
    }
    let id = i64::try_from(user.id.0).ok()?;
    Some(Sender {
        id: UserId(id),
        username: user.username.clone(),
    })
}

/// Handle a single update: dispatch it and deliver the replies.
pub async fn handle_update(update: Update, state: &BotState) {
    let Some(inbound) = inbound_from_update(&update) else {
        debug!(update_id = update.id.0, "ignoring update without text or callback data");
        return;
    };
    debug!(
        user_id = inbound.sender.id.0,
        chat_id = inbound.chat_id,
        event = ?inbound.event,
        "inbound telegram event"
    );

    let replies = state.dispatcher.handle(inbound).await;
    state.outbound.deliver(replies).await;
}

#[async_trait]
impl LaneWorker for BotState {
    type Item = Update;

    async fn process(&self, _chat_id: i64, update: Update) {
        handle_update(update, self).await;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        joingate_gate::{Command, Event},
        serde_json::json,
    };

    fn text_update(chat_id: i64, from_id: u64, text: &str) -> Update {
        serde_json::from_str(&json!({
            "update_id": 1,
            "message": {
                "message_id": 5,
                "date": 1,
                "chat": { "id": chat_id, "type": "private", "first_name": "Alice" },
                "from": {
                    "id": from_id,
                    "is_bot": false,
                    "first_name": "Alice",
                    "username": "alice"
                },
                "text": text
            }
        }).to_string())
        .expect("deserialize text update")
    }

    fn callback_update(data: &str) -> Update {
        serde_json::from_str(&json!({
            "update_id": 2,
            "callback_query": {
                "id": "4382",
                "from": { "id": 777, "is_bot": false, "first_name": "Vis" },
                "chat_instance": "-1",
                "data": data,
                "message": {
                    "message_id": 11,
                    "date": 1,
                    "chat": { "id": 777, "type": "private", "first_name": "Vis" },
                    "from": { "id": 1, "is_bot": true, "first_name": "Gate" },
                    "text": "🚫 Join all groups first:"
                }
            }
        }).to_string())
        .expect("deserialize callback update")
    }

    #[test]
    fn text_command_becomes_command_event() {
        let inbound = inbound_from_update(&text_update(42, 42, "/start admin_9")).unwrap();
        assert_eq!(inbound.chat_id, 42);
        assert_eq!(inbound.sender.id, UserId(42));
        assert_eq!(inbound.sender.username.as_deref(), Some("alice"));
        assert_eq!(
            inbound.event,
            Event::Command(Command::Start {
                payload: Some("admin_9".into())
            })
        );
    }

    #[test]
    fn free_text_becomes_text_event() {
        let inbound = inbound_from_update(&text_update(42, 42, "-1001 https://t.me/g1")).unwrap();
        assert_eq!(inbound.event, Event::Text("-1001 https://t.me/g1".into()));
    }

    #[test]
    fn callback_carries_message_handle() {
        let update = callback_update("check_42");
        assert_eq!(lane_key(&update), Some(777));

        let inbound = inbound_from_update(&update).unwrap();
        assert_eq!(inbound.chat_id, 777);
        assert_eq!(
            inbound.event,
            Event::Callback {
                query_id: "4382".into(),
                message: Some(MessageHandle {
                    chat_id: 777,
                    message_id: 11,
                }),
                data: "check_42".into(),
            }
        );
    }

    #[test]
    fn inline_callback_lanes_by_presser() {
        let update: Update = serde_json::from_str(&json!({
            "update_id": 4,
            "callback_query": {
                "id": "99",
                "from": { "id": 555, "is_bot": false, "first_name": "Ina" },
                "chat_instance": "-7",
                "inline_message_id": "AAEC",
                "data": "check_42"
            }
        }).to_string())
        .expect("deserialize inline callback");

        assert_eq!(lane_key(&update), Some(555));
        let inbound = inbound_from_update(&update).unwrap();
        assert_eq!(inbound.chat_id, 555);
        assert!(matches!(inbound.event, Event::Callback { message: None, .. }));
    }

    #[test]
    fn non_text_message_is_ignored() {
        let update: Update = serde_json::from_str(&json!({
            "update_id": 3,
            "message": {
                "message_id": 1,
                "date": 1,
                "chat": { "id": 42, "type": "private", "first_name": "Alice" },
                "from": { "id": 42, "is_bot": false, "first_name": "Alice" },
                "location": { "latitude": 48.8566, "longitude": 2.3522 }
            }
        }).to_string())
        .expect("deserialize location update");

        assert_eq!(lane_key(&update), Some(42));
        assert!(inbound_from_update(&update).is_none());
    }
}
