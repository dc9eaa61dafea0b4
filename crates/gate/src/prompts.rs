//! User-facing message texts.

use crate::types::{RecordKind, UserId};

pub const GREET_SUPER_ADMIN: &str = "🤖 Welcome Super Admin!\nCommands:\n/approve <user_id>";
pub const GREET_APPROVED: &str =
    "✅ Approved Admin! Use /setup to configure your channels and groups.";
pub const GREET_UNAPPROVED: &str = "❌ You are not approved. Use /request to apply for Admin.";

pub const REQUEST_SENT: &str = "✅ Your request has been sent to Super Admin.";
pub const NOT_SUPER_ADMIN: &str = "❌ You are not Super Admin.";
pub const APPROVE_USAGE: &str = "❌ Usage: /approve <user_id>";
pub const NOW_APPROVED: &str =
    "🎉 You are now an Approved Admin! Use /setup to configure your channels and groups.";

pub const SETUP_NOT_APPROVED: &str = "❌ You are not approved admin.";
pub const ASK_CHANNEL_COUNT: &str = "📌 How many Channels do you want to add? (Enter number)";
pub const CHANNELS_DONE: &str =
    "📌 All Channels added! Now enter how many Groups you want to add.";
pub const SETUP_COMPLETE: &str = "🎉 Setup Complete! Your Channels and Groups are saved.";
pub const INVALID_COUNT: &str = "❌ Enter a valid number.";

pub const INVALID_LINK: &str = "❌ Invalid link.";
pub const NOT_SET_UP: &str = "❌ Admin has not setup yet.";
pub const JOIN_FIRST: &str = "🚫 Join all groups first:";
pub const STILL_BLOCKED: &str = "❌ You still need to join all groups.";
pub const CHECK_AGAIN: &str = "Check Again";
pub const TRY_AGAIN_LATER: &str = "⚠️ Something went wrong. Please try again.";

pub fn approval_request(requester: UserId, username: Option<&str>) -> String {
    let username = username.unwrap_or("NoUsername");
    format!(
        "🆕 New Admin Request:\nUser ID: {requester}\nUsername: @{username}\nApprove: /approve {requester}"
    )
}

pub fn approved(target: UserId) -> String {
    format!("✅ User {target} approved.")
}

pub fn first_detail(kind: RecordKind) -> String {
    let label = kind.label();
    let example = match kind {
        RecordKind::Channel => "-100123456789 https://t.me/mychannel",
        RecordKind::Group => "-100987654321 https://t.me/mygroup",
    };
    format!(
        "✅ Great! Now send {label} ID and Link for {label} 1 separated by space.\nExample:\n{example}"
    )
}

pub fn next_detail(kind: RecordKind, number: u32) -> String {
    let label = kind.label();
    format!("Send {label} ID and Link for {label} {number}")
}

pub fn invalid_detail(kind: RecordKind) -> String {
    format!("❌ Invalid format. Send: <{kind}_id> <{kind}_link>")
}

pub fn join_group(number: usize) -> String {
    format!("Join Group {number}")
}

pub fn share_link(bot_username: &str, admin: UserId) -> String {
    format!("https://t.me/{bot_username}?start=admin_{admin}")
}

pub fn setup_complete_with_link(bot_username: &str, admin: UserId) -> String {
    format!(
        "{SETUP_COMPLETE}\nShare this link with your users:\n{}",
        share_link(bot_username, admin)
    )
}

pub fn verified(reward_links: &[String]) -> String {
    let mut text = String::from("✅ Verified!\nJoin Channels:\n");
    for link in reward_links {
        text.push_str(link);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_notification_carries_approve_command() {
        let text = approval_request(UserId(5), None);
        assert!(text.contains("User ID: 5"));
        assert!(text.contains("@NoUsername"));
        assert!(text.ends_with("/approve 5"));
    }

    #[test]
    fn detail_prompts_name_the_kind() {
        assert_eq!(
            next_detail(RecordKind::Group, 3),
            "Send Group ID and Link for Group 3"
        );
        assert_eq!(
            invalid_detail(RecordKind::Channel),
            "❌ Invalid format. Send: <channel_id> <channel_link>"
        );
        assert!(first_detail(RecordKind::Group).contains("https://t.me/mygroup"));
    }

    #[test]
    fn share_link_is_a_start_deep_link() {
        assert_eq!(
            share_link("GateBot", UserId(42)),
            "https://t.me/GateBot?start=admin_42"
        );
        assert!(setup_complete_with_link("GateBot", UserId(42)).starts_with(SETUP_COMPLETE));
    }

    #[test]
    fn verified_lists_links_one_per_line() {
        let text = verified(&["https://t.me/c1".into(), "https://t.me/c2".into()]);
        assert_eq!(
            text,
            "✅ Verified!\nJoin Channels:\nhttps://t.me/c1\nhttps://t.me/c2\n"
        );
    }
}
