use murmur_llm::{ProviderConfig, ProviderError};
use snafu::Snafu;

use crate::chat::message::TurnId;
use crate::chat::turn::TurnTransition;

/// User intent sent from the presentation layer to the controller loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Submit(String),
    NewChat,
    ApplyConfig(ProviderConfig),
}

/// Result of handing text to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Admitted(TurnId),
    /// Empty or whitespace-only input.
    Ignored,
    /// Another turn is still awaiting its response.
    Busy(TurnId),
}

/// Notifications broadcast to observers alongside store snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeEvent {
    /// The pending input buffer was emptied by an admitted submit.
    InputCleared,
    TurnStarted(TurnId),
    SubmitRejected { active: TurnId },
    TurnSettled { turn: TurnId, failed: bool },
    ConversationReset,
}

/// Why a turn settled without a reply.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TurnError {
    #[snafu(display("{source}"))]
    Provider {
        stage: &'static str,
        source: ProviderError,
    },
    #[snafu(display("turn worker panicked on `{stage}`: {message}"))]
    WorkerPanicked {
        stage: &'static str,
        message: String,
    },
}

pub type TurnResult = Result<String, TurnError>;

/// Emitted by a turn worker once the provider call settles.
#[derive(Debug)]
pub struct TurnCompleted {
    pub turn: TurnId,
    pub result: TurnResult,
}

impl TurnCompleted {
    pub fn transition(&self) -> TurnTransition {
        TurnTransition::Settle(self.turn)
    }
}
