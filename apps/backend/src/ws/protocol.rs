//! Websocket wire protocol.
//!
//! Every frame is a JSON text message tagged by `"type"` in snake_case.
//! A session must open with `hello`; anything else before it is answered
//! with `HELLO_REQUIRED`.

use serde::{Deserialize, Serialize};

use crate::domain::play::GameEvent;
use crate::domain::snapshot::{LobbySnapshot, LobbySummary};
use crate::domain::state::{LobbyId, LobbyKind, OnchainLobbyId, PlayerId, WinnerEntry};
use crate::domain::{Card, Color};
use crate::errors::ErrorCode;

pub const PROTOCOL_VERSION: i32 = 1;

/// How a paid lobby names its escrow record at creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onchain_lobby_id: Option<OnchainLobbyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_tx: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    Hello {
        protocol: i32,
        player_id: PlayerId,
        display_name: String,
    },
    CreateLobby {
        name: String,
        kind: LobbyKind,
        #[serde(default)]
        capacity: Option<usize>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        payment: Option<PaymentRef>,
    },
    JoinLobby {
        lobby_id: LobbyId,
        #[serde(default)]
        password: Option<String>,
        /// Join transaction hash for paid lobbies.
        #[serde(default)]
        payment_proof: Option<String>,
    },
    LeaveLobby {
        lobby_id: LobbyId,
    },
    CancelLobby {
        lobby_id: LobbyId,
    },
    ListLobbies,
    StartGame {
        lobby_id: LobbyId,
    },
    PlayCard {
        lobby_id: LobbyId,
        card_index: usize,
    },
    DrawCard {
        lobby_id: LobbyId,
    },
    PassTurn {
        lobby_id: LobbyId,
    },
    ChooseColor {
        lobby_id: LobbyId,
        color: Color,
        #[serde(default)]
        card_index: Option<usize>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    HelloAck {
        protocol: i32,
        player_id: PlayerId,
        /// Present when the player resumes a lobby they are still seated in.
        #[serde(skip_serializing_if = "Option::is_none")]
        lobby: Option<Box<LobbySnapshot>>,
    },
    LobbyCreated {
        lobby: Box<LobbySnapshot>,
    },
    LobbyJoined {
        lobby: Box<LobbySnapshot>,
    },
    LobbyLeft {
        lobby_id: LobbyId,
    },
    LobbyCancelled {
        lobby_id: LobbyId,
    },
    LobbyList {
        lobbies: Vec<LobbySummary>,
    },
    LobbyUpdate {
        lobby: Box<LobbySnapshot>,
    },
    YourHand {
        lobby_id: LobbyId,
        hand: Vec<Card>,
        playable: Vec<usize>,
    },
    GameUpdate {
        lobby: Box<LobbySnapshot>,
        event: GameEvent,
        #[serde(skip_serializing_if = "Option::is_none")]
        next_turn: Option<PlayerId>,
    },
    ChooseColor {
        lobby_id: LobbyId,
        card_index: usize,
    },
    WinnerFound {
        lobby_id: LobbyId,
        player_id: PlayerId,
        rank: u32,
    },
    GameOver {
        lobby_id: LobbyId,
        winners: Vec<WinnerEntry>,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerMsg {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}
