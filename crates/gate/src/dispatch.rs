//! Inbound event dispatch.
//!
//! Every inbound event is one of a known command, free text, or a callback.
//! Commands always win; free text only means something while the sender
//! has an open setup session.

use tracing::{debug, warn};

use crate::{
    Error, Result,
    approval::ApprovalRegistry,
    gate::{VerificationGate, VerificationOutcome},
    prompts,
    reply::{Button, Keyboard, MessageHandle, Reply},
    types::{ChatRecord, Sender, UserId},
    wizard::{SetupWizard, WizardStep},
};

const ADMIN_PAYLOAD_PREFIX: &str = "admin_";
const CHECK_PAYLOAD_PREFIX: &str = "check_";

/// Commands understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Greeting, or a deep-link visit when a payload is present.
    Start { payload: Option<String> },
    Request,
    Approve { target: String },
    Setup,
    /// Explicit visit with an `admin_<id>` payload.
    StartUser { payload: String },
}

impl Command {
    /// Commands advertised to clients, with their descriptions.
    pub const MENU: &'static [(&'static str, &'static str)] = &[
        ("start", "Show your approval status"),
        ("request", "Ask the super admin for approval"),
        ("setup", "Configure your channels and groups"),
        ("approve", "Approve an admin (super admin only)"),
    ];

    /// Parse `/name[@bot] [args]`. Unknown commands are `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head);
        let args = (!args.is_empty()).then(|| args.to_string());

        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start { payload: args }),
            "request" => Some(Self::Request),
            "approve" => Some(Self::Approve {
                target: args.unwrap_or_default(),
            }),
            "setup" => Some(Self::Setup),
            "startuser" => Some(Self::StartUser {
                payload: args.unwrap_or_default(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command(Command),
    Text(String),
    Callback {
        query_id: String,
        message: Option<MessageHandle>,
        data: String,
    },
}

/// One inbound event with its sender and originating chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub sender: Sender,
    pub chat_id: i64,
    pub event: Event,
}

impl Inbound {
    /// Classify a text message as a known command or free text.
    pub fn message(sender: Sender, chat_id: i64, text: &str) -> Self {
        let event = match Command::parse(text) {
            Some(command) => Event::Command(command),
            None => Event::Text(text.to_string()),
        };
        Self {
            sender,
            chat_id,
            event,
        }
    }

    pub fn callback(
        sender: Sender,
        chat_id: i64,
        query_id: impl Into<String>,
        message: Option<MessageHandle>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            chat_id,
            event: Event::Callback {
                query_id: query_id.into(),
                message,
                data: data.into(),
            },
        }
    }
}

/// Parse a deep-link payload of the form `admin_<id>`.
pub fn parse_admin_payload(payload: &str) -> Result<UserId> {
    parse_prefixed(payload, ADMIN_PAYLOAD_PREFIX)
}

/// Parse a re-check callback payload of the form `check_<id>`.
pub fn parse_check_payload(data: &str) -> Result<UserId> {
    parse_prefixed(data, CHECK_PAYLOAD_PREFIX)
}

pub fn admin_payload(admin: UserId) -> String {
    format!("{ADMIN_PAYLOAD_PREFIX}{admin}")
}

pub fn check_payload(admin: UserId) -> String {
    format!("{CHECK_PAYLOAD_PREFIX}{admin}")
}

fn parse_prefixed(raw: &str, prefix: &str) -> Result<UserId> {
    let id = raw
        .trim()
        .strip_prefix(prefix)
        .ok_or_else(|| Error::invalid_argument(format!("expected `{prefix}<id>`, got {raw:?}")))?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_argument(format!(
            "expected `{prefix}<id>`, got {raw:?}"
        )));
    }
    id.parse()
}

/// Keyboard for a blocked visitor: one join button per unsatisfied group
/// and a single re-check button.
pub fn blocked_keyboard(admin: UserId, unsatisfied: &[ChatRecord]) -> Keyboard {
    let mut keyboard = Keyboard::default();
    for (i, group) in unsatisfied.iter().enumerate() {
        keyboard.push_row(vec![Button::url(prompts::join_group(i + 1), &group.link)]);
    }
    keyboard.push_row(vec![Button::callback(
        prompts::CHECK_AGAIN,
        check_payload(admin),
    )]);
    keyboard
}

/// Routes inbound events to the approval registry, setup wizard and
/// verification gate.
pub struct Dispatcher {
    approvals: ApprovalRegistry,
    wizard: SetupWizard,
    gate: VerificationGate,
    bot_username: Option<String>,
}

impl Dispatcher {
    pub fn new(approvals: ApprovalRegistry, wizard: SetupWizard, gate: VerificationGate) -> Self {
        Self {
            approvals,
            wizard,
            gate,
            bot_username: None,
        }
    }

    /// Bot username used to hand administrators their share link when
    /// setup completes.
    #[must_use]
    pub fn with_bot_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username.filter(|u| !u.is_empty());
        self
    }

    pub fn approvals(&self) -> &ApprovalRegistry {
        &self.approvals
    }

    pub fn wizard(&self) -> &SetupWizard {
        &self.wizard
    }

    pub fn gate(&self) -> &VerificationGate {
        &self.gate
    }

    /// Handle one event. Failures degrade to a retry prompt.
    pub async fn handle(&self, inbound: Inbound) -> Vec<Reply> {
        let chat_id = inbound.chat_id;
        let query_id = match &inbound.event {
            Event::Callback { query_id, .. } => Some(query_id.clone()),
            _ => None,
        };
        let user_id = inbound.sender.id.0;

        match self.try_handle(inbound).await {
            Ok(replies) => replies,
            Err(e) => {
                warn!(user_id, chat_id, error = %e, "failed to handle inbound event");
                match query_id {
                    Some(query_id) => vec![Reply::AnswerCallback {
                        query_id,
                        text: Some(prompts::TRY_AGAIN_LATER.into()),
                        alert: true,
                    }],
                    None => vec![Reply::text(chat_id, prompts::TRY_AGAIN_LATER)],
                }
            },
        }
    }

    async fn try_handle(&self, inbound: Inbound) -> Result<Vec<Reply>> {
        let Inbound {
            sender,
            chat_id,
            event,
        } = inbound;

        match event {
            Event::Command(Command::Start { payload: None }) => self.greet(&sender, chat_id).await,
            Event::Command(
                Command::Start {
                    payload: Some(payload),
                }
                | Command::StartUser { payload },
            ) => self.visit(&sender, chat_id, &payload).await,
            Event::Command(Command::Request) => self.request(&sender, chat_id).await,
            Event::Command(Command::Approve { target }) => {
                self.approve(&sender, chat_id, &target).await
            },
            Event::Command(Command::Setup) => self.setup(&sender, chat_id).await,
            Event::Text(text) => self.setup_input(&sender, chat_id, &text).await,
            Event::Callback {
                query_id,
                message,
                data,
            } => {
                self.recheck(&sender, chat_id, query_id, message, &data)
                    .await
            },
        }
    }

    async fn greet(&self, sender: &Sender, chat_id: i64) -> Result<Vec<Reply>> {
        let text = if self.approvals.is_super_admin(sender.id) {
            prompts::GREET_SUPER_ADMIN
        } else if self.approvals.is_approved(sender.id).await? {
            prompts::GREET_APPROVED
        } else {
            prompts::GREET_UNAPPROVED
        };
        Ok(vec![Reply::text(chat_id, text)])
    }

    async fn request(&self, sender: &Sender, chat_id: i64) -> Result<Vec<Reply>> {
        self.approvals
            .request_approval(sender.id, sender.username.as_deref())
            .await?;
        Ok(vec![
            Reply::text(chat_id, prompts::REQUEST_SENT),
            Reply::text(
                self.approvals.super_admin().0,
                prompts::approval_request(sender.id, sender.username.as_deref()),
            ),
        ])
    }

    async fn approve(&self, sender: &Sender, chat_id: i64, target: &str) -> Result<Vec<Reply>> {
        match self.approvals.approve(sender.id, target).await {
            Ok(approved) => Ok(vec![
                Reply::text(chat_id, prompts::approved(approved)),
                Reply::text(approved.0, prompts::NOW_APPROVED),
            ]),
            Err(Error::PermissionDenied { .. }) => {
                debug!(user_id = sender.id.0, "approve rejected: not super admin");
                Ok(vec![Reply::text(chat_id, prompts::NOT_SUPER_ADMIN)])
            },
            Err(Error::InvalidArgument { message }) => {
                debug!(user_id = sender.id.0, %message, "approve rejected: bad target");
                Ok(vec![Reply::text(chat_id, prompts::APPROVE_USAGE)])
            },
            Err(e) => Err(e),
        }
    }

    async fn setup(&self, sender: &Sender, chat_id: i64) -> Result<Vec<Reply>> {
        if !self.approvals.is_approved(sender.id).await? {
            debug!(user_id = sender.id.0, "setup rejected: not approved");
            return Ok(vec![Reply::text(chat_id, prompts::SETUP_NOT_APPROVED)]);
        }
        self.wizard.start(sender.id, chat_id);
        Ok(vec![Reply::text(chat_id, prompts::ASK_CHANNEL_COUNT)])
    }

    async fn setup_input(&self, sender: &Sender, chat_id: i64, text: &str) -> Result<Vec<Reply>> {
        let Some(step) = self.wizard.advance(sender.id, chat_id, text).await? else {
            debug!(user_id = sender.id.0, "ignoring text outside a setup session");
            return Ok(Vec::new());
        };
        let text = match step {
            WizardStep::CountAccepted { kind } => prompts::first_detail(kind),
            WizardStep::RecordStored { kind, received, .. } => {
                prompts::next_detail(kind, received + 1)
            },
            WizardStep::ChannelsComplete => prompts::CHANNELS_DONE.to_string(),
            WizardStep::SetupComplete => match &self.bot_username {
                Some(bot) => prompts::setup_complete_with_link(bot, sender.id),
                None => prompts::SETUP_COMPLETE.to_string(),
            },
            WizardStep::Rejected { phase, .. } => match phase.kind() {
                Some(_) if phase.is_count() => prompts::INVALID_COUNT.to_string(),
                Some(kind) => prompts::invalid_detail(kind),
                None => return Ok(Vec::new()),
            },
        };
        Ok(vec![Reply::text(chat_id, text)])
    }

    async fn visit(&self, sender: &Sender, chat_id: i64, payload: &str) -> Result<Vec<Reply>> {
        let admin = match parse_admin_payload(payload) {
            Ok(admin) => admin,
            Err(e) => {
                debug!(user_id = sender.id.0, error = %e, "malformed deep link");
                return Ok(vec![Reply::text(chat_id, prompts::INVALID_LINK)]);
            },
        };

        let reply = match self.gate.check(admin, sender.id).await? {
            VerificationOutcome::NotConfigured => Reply::text(chat_id, prompts::NOT_SET_UP),
            VerificationOutcome::Blocked { unsatisfied } => Reply::Send {
                chat_id,
                text: prompts::JOIN_FIRST.into(),
                keyboard: Some(blocked_keyboard(admin, &unsatisfied)),
            },
            VerificationOutcome::Verified { reward_links } => {
                Reply::text(chat_id, prompts::verified(&reward_links))
            },
        };
        Ok(vec![reply])
    }

    async fn recheck(
        &self,
        sender: &Sender,
        chat_id: i64,
        query_id: String,
        message: Option<MessageHandle>,
        data: &str,
    ) -> Result<Vec<Reply>> {
        let admin = match parse_check_payload(data) {
            Ok(admin) => admin,
            Err(e) => {
                debug!(user_id = sender.id.0, error = %e, "malformed callback payload");
                return Ok(vec![alert(query_id, prompts::INVALID_LINK)]);
            },
        };

        let replies = match self.gate.check(admin, sender.id).await? {
            VerificationOutcome::NotConfigured => vec![alert(query_id, prompts::NOT_SET_UP)],
            VerificationOutcome::Blocked { unsatisfied } => {
                let mut replies = vec![alert(query_id, prompts::STILL_BLOCKED)];
                if let Some(message) = message {
                    replies.push(Reply::Edit {
                        message,
                        text: prompts::JOIN_FIRST.into(),
                        keyboard: Some(blocked_keyboard(admin, &unsatisfied)),
                    });
                }
                replies
            },
            VerificationOutcome::Verified { reward_links } => {
                let text = prompts::verified(&reward_links);
                let update = match message {
                    Some(message) => Reply::Edit {
                        message,
                        text,
                        keyboard: None,
                    },
                    None => Reply::text(chat_id, text),
                };
                vec![
                    Reply::AnswerCallback {
                        query_id,
                        text: None,
                        alert: false,
                    },
                    update,
                ]
            },
        };
        Ok(replies)
    }
}

fn alert(query_id: String, text: &str) -> Reply {
    Reply::AnswerCallback {
        query_id,
        text: Some(text.into()),
        alert: true,
    }
}
