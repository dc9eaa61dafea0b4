use {
    anyhow::Context,
    async_trait::async_trait,
    joingate_gate::{MemberStatus, MembershipProbe, UserId},
    teloxide::{
        prelude::*,
        types::{ChatMemberStatus, Recipient},
    },
};

/// Live membership lookups through `getChatMember`.
///
/// The bot must be able to see the member list of every gate group,
/// normally by being an administrator there.
#[derive(Clone)]
pub struct TelegramMembership {
    bot: Bot,
}

impl TelegramMembership {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MembershipProbe for TelegramMembership {
    async fn status(&self, chat_id: &str, user: UserId) -> anyhow::Result<MemberStatus> {
        let recipient = parse_recipient(chat_id)?;
        let user_id = u64::try_from(user.0)
            .map(teloxide::types::UserId)
            .with_context(|| format!("user id {user} out of range"))?;
        let member = self
            .bot
            .get_chat_member(recipient, user_id)
            .await
            .with_context(|| format!("getChatMember failed for chat {chat_id}"))?;
        Ok(map_status(member.status()))
    }
}

/// Numeric ids address chats directly; `@name` addresses public chats.
fn parse_recipient(chat_id: &str) -> anyhow::Result<Recipient> {
    let chat_id = chat_id.trim();
    if let Ok(id) = chat_id.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if chat_id.len() > 1 && chat_id.starts_with('@') {
        return Ok(Recipient::ChannelUsername(chat_id.to_string()));
    }
    anyhow::bail!("invalid chat identifier {chat_id:?}")
}

fn map_status(status: ChatMemberStatus) -> MemberStatus {
    match status {
        ChatMemberStatus::Owner => MemberStatus::Owner,
        ChatMemberStatus::Administrator => MemberStatus::Administrator,
        ChatMemberStatus::Member => MemberStatus::Member,
        ChatMemberStatus::Restricted => MemberStatus::Restricted,
        ChatMemberStatus::Left => MemberStatus::Left,
        ChatMemberStatus::Banned => MemberStatus::Kicked,
    }
}
