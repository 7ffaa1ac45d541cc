use super::message::TurnId;

/// Exchange state for one conversation: `Idle -> AwaitingResponse -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    AwaitingResponse(TurnId),
}

/// State transition input for the turn lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnTransition {
    Begin(TurnId),
    Settle(TurnId),
    Abandon,
}

/// Rejection reason for illegal turn transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnTransitionRejection {
    AlreadyAwaiting { active: TurnId, attempted: TurnId },
    NoActiveTurn,
    TurnMismatch { active: TurnId, attempted: TurnId },
}

pub type TurnTransitionResult = Result<ExchangeState, TurnTransitionRejection>;

impl ExchangeState {
    pub fn active_turn(&self) -> Option<TurnId> {
        match self {
            Self::AwaitingResponse(turn) => Some(*turn),
            Self::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Applies one transition deterministically.
    ///
    /// Only an idle exchange may begin a turn, and a settle must name the
    /// active turn exactly.
    pub fn apply(&self, transition: TurnTransition) -> TurnTransitionResult {
        match transition {
            TurnTransition::Begin(turn) => match self {
                Self::Idle => Ok(Self::AwaitingResponse(turn)),
                Self::AwaitingResponse(active) => Err(TurnTransitionRejection::AlreadyAwaiting {
                    active: *active,
                    attempted: turn,
                }),
            },
            TurnTransition::Settle(turn) => match self {
                Self::AwaitingResponse(active) if *active == turn => Ok(Self::Idle),
                Self::AwaitingResponse(active) => Err(TurnTransitionRejection::TurnMismatch {
                    active: *active,
                    attempted: turn,
                }),
                Self::Idle => Err(TurnTransitionRejection::NoActiveTurn),
            },
            TurnTransition::Abandon => Ok(Self::Idle),
        }
    }
}
