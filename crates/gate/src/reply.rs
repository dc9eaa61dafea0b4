//! Transport-neutral outbound actions.

/// A previously sent message that can be edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHandle {
    pub chat_id: i64,
    pub message_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Open a URL (invite link).
    Url(String),
    /// Send an opaque payload back as a callback event.
    Callback(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }
}

/// Inline keyboard, one inner `Vec` per row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn push_row(&mut self, row: Vec<Button>) {
        self.rows.push(row);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Send {
        chat_id: i64,
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Replace the text (and keyboard) of an earlier message. A `None`
    /// keyboard removes any buttons.
    Edit {
        message: MessageHandle,
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Acknowledge a callback, optionally with a toast or alert.
    AnswerCallback {
        query_id: String,
        text: Option<String>,
        alert: bool,
    },
}

impl Reply {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self::Send {
            chat_id,
            text: text.into(),
            keyboard: None,
        }
    }

    /// Text of a `Send` or `Edit`, or the callback answer text.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Send { text, .. } | Self::Edit { text, .. } => Some(text),
            Self::AnswerCallback { text, .. } => text.as_deref(),
        }
    }
}
