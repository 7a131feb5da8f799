//! Error codes for the lobby server.
//!
//! Every error the server reports carries one of these codes. Add new codes
//! here; never pass ad-hoc strings as error codes.
//!
//! All codes are SCREAMING_SNAKE_CASE and map 1:1 to the strings that appear
//! in websocket `error` frames and HTTP problem responses.

use core::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Protocol
    /// Unsupported protocol version in `hello`
    BadProtocol,
    /// Frame could not be decoded
    BadRequest,
    /// Command sent before `hello`
    HelloRequired,

    // Authorization
    /// Not the acting player's turn
    NotYourTurn,
    /// Only the host may do this
    NotHost,
    /// Player is not a member of the lobby
    NotAMember,

    // Moves
    /// Generic rejected move
    IllegalMove,
    /// A draw penalty is pending
    MustRespondToStack,
    /// Pass attempted without drawing first
    MustDrawFirst,
    /// Color choice for a Wild is still owed
    AwaitingColorChoice,
    /// Already drew this turn
    AlreadyDrawn,
    /// Lobby is not in the right phase
    PhaseMismatch,

    // Membership
    /// Lobby does not exist
    LobbyNotFound,
    /// Player does not exist in the lobby
    PlayerNotFound,
    /// Lobby at capacity
    LobbyFull,
    /// Wrong password for a private lobby
    WrongPassword,
    /// Player already belongs to a lobby
    AlreadyInLobby,
    /// Game already started
    AlreadyStarted,
    /// Payment proof rejected or unverifiable
    PaymentNotVerified,
    /// Malformed request values
    ValidationError,
    /// Generic not found (HTTP)
    NotFound,

    // System
    /// Deck ran dry (internal)
    DeckExhausted,
    /// Lobby state failed a consistency check (internal)
    InvariantViolated,
    /// Internal server error
    Internal,
    /// Configuration error
    ConfigError,
}

impl ErrorCode {
    /// Returns the canonical SCREAMING_SNAKE_CASE string for this code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BadProtocol => "BAD_PROTOCOL",
            Self::BadRequest => "BAD_REQUEST",
            Self::HelloRequired => "HELLO_REQUIRED",

            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::NotHost => "NOT_HOST",
            Self::NotAMember => "NOT_A_MEMBER",

            Self::IllegalMove => "ILLEGAL_MOVE",
            Self::MustRespondToStack => "MUST_RESPOND_TO_STACK",
            Self::MustDrawFirst => "MUST_DRAW_FIRST",
            Self::AwaitingColorChoice => "AWAITING_COLOR_CHOICE",
            Self::AlreadyDrawn => "ALREADY_DRAWN",
            Self::PhaseMismatch => "PHASE_MISMATCH",

            Self::LobbyNotFound => "LOBBY_NOT_FOUND",
            Self::PlayerNotFound => "PLAYER_NOT_FOUND",
            Self::LobbyFull => "LOBBY_FULL",
            Self::WrongPassword => "WRONG_PASSWORD",
            Self::AlreadyInLobby => "ALREADY_IN_LOBBY",
            Self::AlreadyStarted => "ALREADY_STARTED",
            Self::PaymentNotVerified => "PAYMENT_NOT_VERIFIED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",

            Self::DeckExhausted => "DECK_EXHAUSTED",
            Self::InvariantViolated => "INVARIANT_VIOLATED",
            Self::Internal => "INTERNAL",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
