use std::sync::Arc;

use joingate_gate::Dispatcher;

use crate::outbound::TelegramOutbound;

/// Runtime state shared by every chat lane.
pub struct BotState {
    pub dispatcher: Arc<Dispatcher>,
    pub outbound: TelegramOutbound,
}
