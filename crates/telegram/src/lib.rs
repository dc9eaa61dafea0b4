//! Telegram transport for the join gate.
//!
//! Long-polls the Bot API with teloxide, turns updates into core
//! [`joingate_gate::Inbound`] events, executes the returned replies
//! (messages, inline keyboards, edit-in-place, callback answers) and answers
//! membership lookups with `getChatMember`.

pub mod bot;
pub mod error;
pub mod handlers;
mod lanes;
pub mod membership;
pub mod outbound;
pub mod state;

pub use {
    bot::{build_bot, connect, start_polling},
    error::{Error, Result},
    membership::TelegramMembership,
    outbound::TelegramOutbound,
    state::BotState,
};
