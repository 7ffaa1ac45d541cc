/// Event contracts between the controller and its observers.
pub mod events;
/// Request/response orchestration for one conversation.
pub mod exchange;
/// Domain entities shown in the conversation.
pub mod message;
pub mod store;
pub mod turn;

#[cfg(test)]
pub(crate) mod testing;

pub use events::{ExchangeEvent, Intent, SubmitOutcome, TurnCompleted, TurnError, TurnResult};
pub use exchange::ExchangeController;
pub use message::{
    DEFAULT_ERROR_NOTICE, DEFAULT_GREETING, Message, MessageId, MessageStatus, Notices, TurnId,
};
pub use store::{ConversationStore, Snapshot};
pub use turn::{ExchangeState, TurnTransition, TurnTransitionRejection, TurnTransitionResult};
