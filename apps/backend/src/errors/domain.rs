//! Domain-level error type used across the engine, the lobby manager and
//! the websocket boundary.
//!
//! This error type is transport-agnostic. The websocket session turns it
//! into a `ServerMsg::Error` for the originating player only; HTTP handlers
//! convert it into `AppError` via `From<DomainError>`.

use thiserror::Error;

use crate::errors::ErrorCode;

/// What could not be found.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    Lobby,
    Player,
}

/// Why an otherwise well-formed request was refused for this player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedKind {
    NotYourTurn,
    NotHost,
    NotAMember,
}

/// Sub-reasons for a rejected move, kept separate so clients can render
/// a precise message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalMoveKind {
    /// A draw penalty is pending; only a matching draw card may be played.
    MustRespondToStack,
    /// Card matches neither the active color nor the top value.
    NotPlayable,
    CardIndexOutOfRange,
    /// The acting player owes a color choice for the Wild they just played.
    AwaitingColorChoice,
    NoColorChoicePending,
    InvalidColor,
    /// `card_index` does not identify the Wild that triggered the choice.
    CardMismatch,
    MustDrawFirst,
    GameNotInProgress,
    NotEnoughPlayers,
}

/// Central domain error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("not found {0:?}: {1}")]
    NotFound(NotFoundKind, String),
    #[error("unauthorized {0:?}: {1}")]
    Unauthorized(UnauthorizedKind, String),
    #[error("illegal move {0:?}: {1}")]
    IllegalMove(IllegalMoveKind, String),
    #[error("already drew a card this turn")]
    AlreadyDrawn,
    #[error("lobby is full")]
    Full,
    #[error("wrong lobby password")]
    WrongPassword,
    #[error("player is already in lobby {0}")]
    AlreadyInLobby(String),
    #[error("game already started")]
    AlreadyStarted,
    #[error("payment not verified: {0}")]
    PaymentNotVerified(String),
    #[error("validation error: {0}")]
    Validation(String),
    /// Both piles are empty. Unreachable while card conservation holds.
    #[error("deck exhausted")]
    DeckExhausted,
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl DomainError {
    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound(kind, detail.into())
    }

    pub fn unauthorized(kind: UnauthorizedKind, detail: impl Into<String>) -> Self {
        Self::Unauthorized(kind, detail.into())
    }

    pub fn illegal(kind: IllegalMoveKind, detail: impl Into<String>) -> Self {
        Self::IllegalMove(kind, detail.into())
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    pub fn payment(reason: impl Into<String>) -> Self {
        Self::PaymentNotVerified(reason.into())
    }

    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::Invariant(detail.into())
    }

    /// Internal invariant violations are fatal to the lobby (never to the
    /// process); everything else is a recoverable user error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DeckExhausted | Self::Invariant(_))
    }

    /// Human-readable message without the variant prefix of `Display`.
    pub fn detail(&self) -> String {
        match self {
            Self::NotFound(_, d)
            | Self::Unauthorized(_, d)
            | Self::IllegalMove(_, d)
            | Self::PaymentNotVerified(d)
            | Self::Validation(d)
            | Self::Invariant(d) => d.clone(),
            other => other.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(NotFoundKind::Lobby, _) => ErrorCode::LobbyNotFound,
            Self::NotFound(NotFoundKind::Player, _) => ErrorCode::PlayerNotFound,
            Self::Unauthorized(UnauthorizedKind::NotYourTurn, _) => ErrorCode::NotYourTurn,
            Self::Unauthorized(UnauthorizedKind::NotHost, _) => ErrorCode::NotHost,
            Self::Unauthorized(UnauthorizedKind::NotAMember, _) => ErrorCode::NotAMember,
            Self::IllegalMove(IllegalMoveKind::MustRespondToStack, _) => {
                ErrorCode::MustRespondToStack
            }
            Self::IllegalMove(IllegalMoveKind::MustDrawFirst, _) => ErrorCode::MustDrawFirst,
            Self::IllegalMove(IllegalMoveKind::AwaitingColorChoice, _) => {
                ErrorCode::AwaitingColorChoice
            }
            Self::IllegalMove(IllegalMoveKind::GameNotInProgress, _) => ErrorCode::PhaseMismatch,
            Self::IllegalMove(_, _) => ErrorCode::IllegalMove,
            Self::AlreadyDrawn => ErrorCode::AlreadyDrawn,
            Self::Full => ErrorCode::LobbyFull,
            Self::WrongPassword => ErrorCode::WrongPassword,
            Self::AlreadyInLobby(_) => ErrorCode::AlreadyInLobby,
            Self::AlreadyStarted => ErrorCode::AlreadyStarted,
            Self::PaymentNotVerified(_) => ErrorCode::PaymentNotVerified,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::DeckExhausted => ErrorCode::DeckExhausted,
            Self::Invariant(_) => ErrorCode::InvariantViolated,
        }
    }
}
