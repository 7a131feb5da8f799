//! Lobby manager: the catalog of live lobbies, membership and the
//! disconnect grace period.
//!
//! Locking: each lobby sits behind its own async mutex, held by a command
//! from validation to broadcast. The catalog and the player → lobby index
//! share one short-held sync mutex that is never held across an await.
//! Order is always lobby, then index.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use time::OffsetDateTime;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use crate::adapters::payment_oracle::{JoinVerification, PaymentOracle};
use crate::config::GameConfig;
use crate::domain::play::{self, GameEvent};
use crate::domain::ranking::end_game;
use crate::domain::rules::{MAX_LOBBY_NAME_LEN, MIN_PLAYERS};
use crate::domain::snapshot::{hand_view, snapshot, HandView, LobbySnapshot, LobbySummary};
use crate::domain::state::{
    check_invariants, ConnectionId, Lobby, LobbyId, LobbyKind, LobbyStatus, OnchainLobbyId,
    Player, PlayerId,
};
use crate::domain::Color;
use crate::errors::domain::{DomainError, NotFoundKind, UnauthorizedKind};
use crate::services::game_flow;
use crate::services::grace::GraceTimers;
use crate::ws::hub::ConnectionRegistry;
use crate::ws::protocol::{PaymentRef, ServerMsg};

/// Parameters of `create_lobby`, as sent by the client.
#[derive(Debug, Clone)]
pub struct CreateLobby {
    pub name: String,
    pub kind: LobbyKind,
    pub capacity: Option<usize>,
    pub password: Option<String>,
    pub payment: Option<PaymentRef>,
}

/// What a reconnecting player needs to resume.
#[derive(Debug, Clone)]
pub struct Resume {
    pub lobby: LobbySnapshot,
    /// `None` outside a running game.
    pub hand: Option<HandView>,
    /// Hand index of a Wild the player still owes a color for.
    pub color_prompt: Option<usize>,
}

struct LobbySlot {
    lobby: Lobby,
    /// Cleared by cleanup; a command that acquired the lock after that
    /// sees the lobby as gone.
    open: bool,
}

type LobbyGuard = OwnedMutexGuard<LobbySlot>;

struct LobbyEntry {
    cell: Arc<tokio::sync::Mutex<LobbySlot>>,
    summary: LobbySummary,
}

#[derive(Default)]
struct LobbyIndex {
    lobbies: HashMap<LobbyId, LobbyEntry>,
    members: HashMap<PlayerId, LobbyId>,
    /// Live paid lobbies by escrow id. One escrow backs at most one lobby.
    escrows: HashMap<OnchainLobbyId, LobbyId>,
    /// Creators of paid lobbies they have not joined yet.
    pending_hosts: HashMap<PlayerId, LobbyId>,
}

impl LobbyIndex {
    /// The lobby `player` is seated in or still owes a join to.
    fn held_by(&self, player: &PlayerId) -> Option<LobbyId> {
        self.members
            .get(player)
            .or_else(|| self.pending_hosts.get(player))
            .copied()
    }

    /// Like `held_by`, except a creator may join their own paid lobby.
    fn blocking_join(&self, player: &PlayerId, lobby_id: &LobbyId) -> Option<LobbyId> {
        match self.members.get(player) {
            Some(seated) => Some(*seated),
            None => self
                .pending_hosts
                .get(player)
                .filter(|pending| *pending != lobby_id)
                .copied(),
        }
    }
}

struct Inner {
    index: Mutex<LobbyIndex>,
    timers: GraceTimers,
    /// Keyed by creator; deletes paid lobbies nobody joined in time.
    unjoined: GraceTimers,
    oracle: Arc<dyn PaymentOracle>,
    registry: Arc<ConnectionRegistry>,
    config: GameConfig,
}

#[derive(Clone)]
pub struct LobbyManager {
    inner: Arc<Inner>,
}

fn lobby_not_found(id: &LobbyId) -> DomainError {
    DomainError::not_found(NotFoundKind::Lobby, format!("Lobby {id}"))
}

fn hash_password(lobby_id: &LobbyId, password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(lobby_id.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize()
}

impl LobbyManager {
    pub fn new(
        config: GameConfig,
        oracle: Arc<dyn PaymentOracle>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                index: Mutex::new(LobbyIndex::default()),
                timers: GraceTimers::new(),
                unjoined: GraceTimers::new(),
                oracle,
                registry,
                config,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.inner.registry
    }

    pub fn config(&self) -> &GameConfig {
        &self.inner.config
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Waiting and in-game lobbies, oldest first. Never waits on a lobby lock.
    pub fn list_lobbies(&self) -> Vec<LobbySummary> {
        let index = self.inner.index.lock();
        let mut out: Vec<LobbySummary> = index
            .lobbies
            .values()
            .map(|e| e.summary.clone())
            .filter(|s| s.status != LobbyStatus::Finished)
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        out
    }

    pub fn lobby_count(&self) -> usize {
        self.inner.index.lock().lobbies.len()
    }

    pub fn lobby_of(&self, player: &PlayerId) -> Option<LobbyId> {
        self.inner.index.lock().members.get(player).copied()
    }

    pub fn has_pending_expulsion(&self, player: &PlayerId) -> bool {
        self.inner.timers.is_pending(player)
    }

    /// Public view only; nobody's hand.
    pub async fn view(&self, lobby_id: &LobbyId) -> Result<LobbySnapshot, DomainError> {
        let guard = self.lock(lobby_id).await?;
        Ok(snapshot(&guard.lobby))
    }

    /// Public view plus `viewer`'s own hand when they are a member.
    pub async fn snapshot(
        &self,
        lobby_id: &LobbyId,
        viewer: &PlayerId,
    ) -> Result<(LobbySnapshot, Option<HandView>), DomainError> {
        let guard = self.lock(lobby_id).await?;
        Ok((snapshot(&guard.lobby), hand_view(&guard.lobby, viewer)))
    }

    // ---------------------------------------------------------------------
    // Membership
    // ---------------------------------------------------------------------

    pub async fn create_lobby(
        &self,
        creator: &PlayerId,
        display_name: &str,
        conn: ConnectionId,
        req: CreateLobby,
    ) -> Result<LobbySnapshot, DomainError> {
        if let Some(existing) = self.inner.index.lock().held_by(creator) {
            return Err(DomainError::AlreadyInLobby(existing.to_string()));
        }
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("Lobby name must not be empty"));
        }
        if name.chars().count() > MAX_LOBBY_NAME_LEN {
            return Err(DomainError::validation(format!(
                "Lobby name must be at most {MAX_LOBBY_NAME_LEN} characters"
            )));
        }
        let password = req.password.filter(|p| !p.is_empty());
        if req.kind == LobbyKind::Private && password.is_none() {
            return Err(DomainError::validation("Private lobbies need a password"));
        }

        let mut capacity = req.capacity;
        let mut onchain_lobby_id = None;
        if req.kind == LobbyKind::Paid {
            let (id, max_players) = self.resolve_paid_lobby(req.payment.as_ref()).await?;
            onchain_lobby_id = Some(id);
            if capacity.is_none() {
                capacity = max_players.map(|m| m.min(self.inner.config.max_capacity));
            }
        }
        let capacity = capacity.unwrap_or(self.inner.config.default_capacity);
        let max = self.inner.config.max_capacity;
        if !(MIN_PLAYERS..=max).contains(&capacity) {
            return Err(DomainError::validation(format!(
                "Capacity must be between {MIN_PLAYERS} and {max}"
            )));
        }

        let id = LobbyId::generate();
        let mut lobby = Lobby::new(
            id,
            name,
            req.kind,
            creator.clone(),
            capacity,
            self.inner.config.rules,
        );
        lobby.password_hash = password.map(|p| *hash_password(&id, &p).as_bytes());
        lobby.onchain_lobby_id = onchain_lobby_id;
        // Paid lobbies start empty: the creator pays to join like anyone else.
        if req.kind != LobbyKind::Paid {
            let mut host = Player::new(creator.clone(), display_name, conn);
            host.is_host = true;
            lobby.players.push(host);
        }

        let view = snapshot(&lobby);
        {
            let mut index = self.inner.index.lock();
            if let Some(existing) = index.held_by(creator) {
                return Err(DomainError::AlreadyInLobby(existing.to_string()));
            }
            if let Some(onchain) = onchain_lobby_id {
                if let Some(existing) = index.escrows.get(&onchain) {
                    return Err(DomainError::validation(format!(
                        "On-chain lobby {onchain} already backs lobby {existing}"
                    )));
                }
                index.escrows.insert(onchain, id);
                index.pending_hosts.insert(creator.clone(), id);
            } else {
                index.members.insert(creator.clone(), id);
            }
            index.lobbies.insert(
                id,
                LobbyEntry {
                    summary: LobbySummary::from(&lobby),
                    cell: Arc::new(tokio::sync::Mutex::new(LobbySlot { lobby, open: true })),
                },
            );
        }

        if onchain_lobby_id.is_some() {
            self.schedule_unjoined_expiry(creator, id);
        }
        info!(lobby_id = %id, player_id = %creator, kind = ?req.kind, capacity, "lobby created");
        self.inner.registry.send(
            creator,
            ServerMsg::LobbyCreated {
                lobby: Box::new(view.clone()),
            },
        );
        Ok(view)
    }

    /// On-chain id for a new paid lobby, plus the escrow's player cap when
    /// it was looked up.
    async fn resolve_paid_lobby(
        &self,
        payment: Option<&PaymentRef>,
    ) -> Result<(OnchainLobbyId, Option<usize>), DomainError> {
        if !self.inner.config.payment.paid_lobbies_enabled {
            return Err(DomainError::validation("Paid lobbies are disabled"));
        }
        let payment = payment.cloned().unwrap_or_default();
        let Some(tx) = payment.creation_tx.filter(|t| !t.is_empty()) else {
            return payment.onchain_lobby_id.map(|id| (id, None)).ok_or_else(|| {
                DomainError::validation("Paid lobbies need an on-chain lobby id or creation tx")
            });
        };

        let timeout = self.inner.config.payment.oracle_timeout;
        let resolved = tokio::time::timeout(timeout, self.inner.oracle.resolve_lobby_id_from_tx(&tx))
            .await
            .map_err(|_| DomainError::payment("Payment oracle timed out"))?
            .map_err(|e| DomainError::payment(e.to_string()))?;

        let id = match payment.onchain_lobby_id {
            Some(supplied) if supplied != resolved.onchain_lobby_id => {
                warn!(
                    supplied,
                    resolved = resolved.onchain_lobby_id,
                    creation_tx = %tx,
                    "on-chain lobby id mismatch; keeping supplied id"
                );
                supplied
            }
            Some(supplied) => supplied,
            None => resolved.onchain_lobby_id,
        };
        Ok((id, Some(resolved.max_players as usize)))
    }

    pub async fn join_lobby(
        &self,
        lobby_id: &LobbyId,
        player: &PlayerId,
        display_name: &str,
        conn: ConnectionId,
        password: Option<&str>,
        payment_proof: Option<&str>,
    ) -> Result<LobbySnapshot, DomainError> {
        self.ensure_free_for(player, lobby_id)?;
        let mut guard = self.lock(lobby_id).await?;
        let lobby = &guard.lobby;

        if lobby.status != LobbyStatus::Waiting {
            return Err(DomainError::AlreadyStarted);
        }
        if let Some(stored) = lobby.password_hash {
            let given = hash_password(lobby_id, password.unwrap_or_default());
            if blake3::Hash::from(stored) != given {
                return Err(DomainError::WrongPassword);
            }
        }
        if lobby.member_count() >= lobby.capacity {
            return Err(DomainError::Full);
        }

        let mut proof_used = None;
        if lobby.kind == LobbyKind::Paid {
            let proof = payment_proof
                .filter(|p| !p.is_empty())
                .ok_or_else(|| DomainError::payment("Payment proof required"))?;
            if lobby.used_payment_proofs.contains(proof) {
                return Err(DomainError::payment("Payment proof already used"));
            }
            let expected = lobby
                .onchain_lobby_id
                .ok_or_else(|| DomainError::invariant("paid lobby without on-chain id"))?;
            self.verify_join(player, proof, expected).await?;
            proof_used = Some(proof.to_string());
        }

        {
            let mut index = self.inner.index.lock();
            if let Some(existing) = index.blocking_join(player, lobby_id) {
                return Err(DomainError::AlreadyInLobby(existing.to_string()));
            }
            index.members.insert(player.clone(), *lobby_id);
            if index.pending_hosts.get(player) == Some(lobby_id) {
                index.pending_hosts.remove(player);
                self.inner.unjoined.cancel(player);
            }
        }
        let lobby = &mut guard.lobby;
        let mut seat = Player::new(player.clone(), display_name, conn);
        seat.is_host = lobby.host_id == *player;
        lobby.players.push(seat);
        if let Some(proof) = proof_used {
            lobby.used_payment_proofs.insert(proof);
        }

        info!(lobby_id = %lobby_id, player_id = %player, members = lobby.member_count(), "player joined");
        self.publish_summary(&guard.lobby);
        let view = snapshot(&guard.lobby);
        self.inner.registry.send(
            player,
            ServerMsg::LobbyJoined {
                lobby: Box::new(view.clone()),
            },
        );
        game_flow::lobby_update(&self.inner.registry, &guard.lobby, Some(player));
        Ok(view)
    }

    async fn verify_join(
        &self,
        joining: &PlayerId,
        proof: &str,
        expected: OnchainLobbyId,
    ) -> Result<(), DomainError> {
        let timeout = self.inner.config.payment.oracle_timeout;
        let verdict = tokio::time::timeout(timeout, self.inner.oracle.verify_join_tx(proof, expected))
            .await
            .map_err(|_| DomainError::payment("Payment oracle timed out"))?
            .map_err(|e| DomainError::payment(e.to_string()))?;
        match verdict {
            JoinVerification::Verified {
                player,
                total_players,
            } => {
                if !payer_matches(&player, joining) {
                    warn!(
                        payer = %player,
                        player_id = %joining,
                        onchain_lobby_id = expected,
                        "join paid by a different account"
                    );
                }
                debug!(payer = %player, total_players, onchain_lobby_id = expected, "join payment verified");
                Ok(())
            }
            JoinVerification::Rejected { reason } => Err(DomainError::payment(reason)),
        }
    }

    pub async fn leave_lobby(&self, lobby_id: &LobbyId, player: &PlayerId) -> Result<(), DomainError> {
        let mut guard = self.lock(lobby_id).await?;
        if !guard.lobby.is_member(player) {
            return Err(DomainError::unauthorized(
                UnauthorizedKind::NotAMember,
                format!("Player {player} is not in lobby {lobby_id}"),
            ));
        }
        self.remove_member(&mut guard, player);
        info!(lobby_id = %lobby_id, player_id = %player, "player left");
        self.inner
            .registry
            .send(player, ServerMsg::LobbyLeft { lobby_id: *lobby_id });
        Ok(())
    }

    /// Tear down a lobby that has not started. Refunds, if any, are the
    /// escrow's business.
    pub async fn cancel_lobby(
        &self,
        lobby_id: &LobbyId,
        requester: &PlayerId,
        admin_override: bool,
    ) -> Result<(), DomainError> {
        let mut guard = self.lock(lobby_id).await?;
        if !admin_override && guard.lobby.host_id != *requester {
            return Err(DomainError::unauthorized(
                UnauthorizedKind::NotHost,
                "Only the host can cancel the lobby",
            ));
        }
        if guard.lobby.status != LobbyStatus::Waiting {
            return Err(DomainError::AlreadyStarted);
        }

        let msg = ServerMsg::LobbyCancelled {
            lobby_id: *lobby_id,
        };
        let members = guard.lobby.member_ids();
        self.inner.registry.broadcast(&members, &msg);
        if !members.contains(requester) {
            self.inner.registry.send(requester, msg);
        }
        info!(lobby_id = %lobby_id, player_id = %requester, admin_override, "lobby cancelled");
        self.close(&mut guard);
        Ok(())
    }

    /// Administrative removal of a member, same path as a grace expiry.
    pub async fn expel(&self, lobby_id: &LobbyId, player: &PlayerId) -> Result<(), DomainError> {
        let mut guard = self.lock(lobby_id).await?;
        if !guard.lobby.is_member(player) {
            return Err(DomainError::not_found(
                NotFoundKind::Player,
                format!("Player {player} in lobby {lobby_id}"),
            ));
        }
        self.remove_member(&mut guard, player);
        info!(lobby_id = %lobby_id, player_id = %player, "player expelled");
        self.inner
            .registry
            .send(player, ServerMsg::LobbyLeft { lobby_id: *lobby_id });
        Ok(())
    }

    /// Cancel every member's grace timer, drop all mappings and delete the
    /// lobby. Idempotent.
    pub async fn cleanup(&self, lobby_id: &LobbyId) {
        if let Ok(mut guard) = self.lock(lobby_id).await {
            self.close(&mut guard);
        }
    }

    // ---------------------------------------------------------------------
    // Game commands
    // ---------------------------------------------------------------------

    pub async fn start_game(&self, lobby_id: &LobbyId, actor: &PlayerId) -> Result<(), DomainError> {
        let mut guard = self.lock(lobby_id).await?;
        if !guard.lobby.is_member(actor) {
            return Err(DomainError::unauthorized(
                UnauthorizedKind::NotAMember,
                format!("Player {actor} is not in lobby {lobby_id}"),
            ));
        }
        if guard.lobby.host_id != *actor {
            return Err(DomainError::unauthorized(
                UnauthorizedKind::NotHost,
                "Only the host can start the game",
            ));
        }
        let result = self.apply(&mut guard, Some(actor), "start_game", play::start_game);
        if result.is_ok() {
            info!(
                lobby_id = %lobby_id,
                players = guard.lobby.players.len(),
                draw_pile = guard.lobby.draw_pile.len(),
                "game started"
            );
        }
        result
    }

    pub async fn play_card(
        &self,
        lobby_id: &LobbyId,
        actor: &PlayerId,
        card_index: usize,
    ) -> Result<(), DomainError> {
        let mut guard = self.lock(lobby_id).await?;
        self.apply(&mut guard, Some(actor), "play_card", |lobby| {
            play::play_card(lobby, actor, card_index)
        })
    }

    pub async fn draw_card(&self, lobby_id: &LobbyId, actor: &PlayerId) -> Result<(), DomainError> {
        let mut guard = self.lock(lobby_id).await?;
        self.apply(&mut guard, Some(actor), "draw_card", |lobby| {
            play::draw_card(lobby, actor)
        })
    }

    pub async fn pass_turn(&self, lobby_id: &LobbyId, actor: &PlayerId) -> Result<(), DomainError> {
        let mut guard = self.lock(lobby_id).await?;
        self.apply(&mut guard, Some(actor), "pass_turn", |lobby| {
            play::pass_turn(lobby, actor)
        })
    }

    pub async fn choose_color(
        &self,
        lobby_id: &LobbyId,
        actor: &PlayerId,
        color: Color,
        card_index: Option<usize>,
    ) -> Result<(), DomainError> {
        let mut guard = self.lock(lobby_id).await?;
        self.apply(&mut guard, Some(actor), "choose_color", |lobby| {
            play::choose_color(lobby, actor, color, card_index)
        })
    }

    // ---------------------------------------------------------------------
    // Connection lifecycle
    // ---------------------------------------------------------------------

    /// Bind a fresh connection for `player`. When they are still seated
    /// somewhere the seat is rebound under that lobby's lock, so no push
    /// can fall between the resume snapshot and the new channel.
    pub async fn connect(
        &self,
        player: &PlayerId,
        conn: ConnectionId,
    ) -> (UnboundedReceiver<ServerMsg>, Option<Resume>) {
        let Some(lobby_id) = self.lobby_of(player) else {
            return (self.inner.registry.register(player.clone(), conn), None);
        };
        match self.lock(&lobby_id).await {
            Ok(mut guard) if guard.lobby.is_member(player) => {
                let rx = self.inner.registry.register(player.clone(), conn);
                let resume = self.reattach(&mut guard, player, conn);
                (rx, Some(resume))
            }
            _ => (self.inner.registry.register(player.clone(), conn), None),
        }
    }

    pub async fn handle_reconnect(
        &self,
        lobby_id: &LobbyId,
        player: &PlayerId,
        conn: ConnectionId,
    ) -> Result<Resume, DomainError> {
        let mut guard = self.lock(lobby_id).await?;
        if !guard.lobby.is_member(player) {
            return Err(DomainError::unauthorized(
                UnauthorizedKind::NotAMember,
                format!("Player {player} is not in lobby {lobby_id}"),
            ));
        }
        Ok(self.reattach(&mut guard, player, conn))
    }

    fn reattach(&self, guard: &mut LobbyGuard, player: &PlayerId, conn: ConnectionId) -> Resume {
        let cancelled = self.inner.timers.cancel(player);
        let lobby = &mut guard.lobby;
        if let Some(p) = lobby.player_mut(player) {
            p.connection = Some(conn);
            p.is_connected = true;
            p.disconnected_at = None;
        }
        info!(lobby_id = %lobby.id, player_id = %player, cancelled_expulsion = cancelled, "player reconnected");
        game_flow::lobby_update(&self.inner.registry, lobby, Some(player));

        let in_game = lobby.status == LobbyStatus::InGame;
        Resume {
            lobby: snapshot(lobby),
            hand: in_game.then(|| hand_view(lobby, player)).flatten(),
            color_prompt: lobby
                .color_choice
                .as_ref()
                .filter(|c| &c.player_id == player)
                .map(|c| c.card_index),
        }
    }

    /// Transport for `conn` is gone. Ignored when the player has already
    /// moved to a newer connection.
    pub async fn handle_disconnect(&self, player: &PlayerId, conn: ConnectionId) {
        let Some(lobby_id) = self.lobby_of(player) else {
            return;
        };
        let Ok(mut guard) = self.lock(&lobby_id).await else {
            return;
        };
        let Some(p) = guard.lobby.player_mut(player) else {
            return;
        };
        if p.connection != Some(conn) {
            debug!(lobby_id = %lobby_id, player_id = %player, "stale disconnect ignored");
            return;
        }
        p.connection = None;
        p.is_connected = false;
        p.disconnected_at = Some(OffsetDateTime::now_utc());
        p.disconnect_epoch += 1;
        let epoch = p.disconnect_epoch;

        let grace = self.inner.config.grace_period;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let expiring = player.clone();
        self.inner.timers.schedule(player.clone(), grace, move || async move {
            if let Some(inner) = weak.upgrade() {
                LobbyManager { inner }
                    .expire(&lobby_id, &expiring, epoch)
                    .await;
            }
        });

        info!(lobby_id = %lobby_id, player_id = %player, grace_secs = grace.as_secs_f64(), "player disconnected");
        game_flow::lobby_update(&self.inner.registry, &guard.lobby, Some(player));
    }

    fn schedule_unjoined_expiry(&self, creator: &PlayerId, lobby_id: LobbyId) {
        let ttl = self.inner.config.payment.unjoined_ttl;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let host = creator.clone();
        self.inner.unjoined.schedule(creator.clone(), ttl, move || async move {
            if let Some(inner) = weak.upgrade() {
                LobbyManager { inner }.expire_unjoined(&lobby_id, &host).await;
            }
        });
    }

    /// The creator of a paid lobby never joined it. An empty lobby is
    /// deleted; otherwise the earliest joiner takes over as host.
    async fn expire_unjoined(&self, lobby_id: &LobbyId, creator: &PlayerId) {
        let Ok(mut guard) = self.lock(lobby_id).await else {
            return;
        };
        {
            let mut index = self.inner.index.lock();
            if index.pending_hosts.get(creator) != Some(lobby_id) {
                return;
            }
            index.pending_hosts.remove(creator);
        }
        if guard.lobby.member_count() == 0 {
            info!(lobby_id = %lobby_id, player_id = %creator, "paid lobby never joined; deleting");
            self.inner.registry.send(
                creator,
                ServerMsg::LobbyCancelled {
                    lobby_id: *lobby_id,
                },
            );
            self.close(&mut guard);
            return;
        }
        reassign_host(&mut guard.lobby, creator);
        self.publish_summary(&guard.lobby);
        game_flow::lobby_update(&self.inner.registry, &guard.lobby, None);
    }

    /// Grace period ran out. Only expels if the same disconnection is still
    /// current.
    async fn expire(&self, lobby_id: &LobbyId, player: &PlayerId, epoch: u64) {
        let Ok(mut guard) = self.lock(lobby_id).await else {
            return;
        };
        let still_gone = guard
            .lobby
            .player(player)
            .is_some_and(|p| !p.is_connected && p.disconnect_epoch == epoch);
        if !still_gone {
            debug!(lobby_id = %lobby_id, player_id = %player, "grace expiry superseded");
            return;
        }
        info!(lobby_id = %lobby_id, player_id = %player, "grace period expired; expelling");
        self.remove_member(&mut guard, player);
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    async fn lock(&self, lobby_id: &LobbyId) -> Result<LobbyGuard, DomainError> {
        let cell = self
            .inner
            .index
            .lock()
            .lobbies
            .get(lobby_id)
            .map(|e| Arc::clone(&e.cell))
            .ok_or_else(|| lobby_not_found(lobby_id))?;
        let guard = cell.lock_owned().await;
        if !guard.open {
            return Err(lobby_not_found(lobby_id));
        }
        Ok(guard)
    }

    fn ensure_free_for(&self, player: &PlayerId, lobby_id: &LobbyId) -> Result<(), DomainError> {
        match self.inner.index.lock().blocking_join(player, lobby_id) {
            Some(existing) => Err(DomainError::AlreadyInLobby(existing.to_string())),
            None => Ok(()),
        }
    }

    /// Run an engine command and everything that follows a commit:
    /// invariant check, summary, fan-out and teardown once finished.
    fn apply<F>(
        &self,
        guard: &mut LobbyGuard,
        actor: Option<&PlayerId>,
        op: &'static str,
        command: F,
    ) -> Result<(), DomainError>
    where
        F: FnOnce(&mut Lobby) -> Result<Vec<GameEvent>, DomainError>,
    {
        let outcome = match command(&mut guard.lobby) {
            Ok(events) => check_invariants(&guard.lobby).map(|()| events),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(events) => {
                self.after_commit(guard, &events);
                Ok(())
            }
            Err(err) if err.is_fatal() => {
                self.abort(guard, &err, actor, op);
                Err(err)
            }
            Err(err) => {
                debug!(
                    lobby_id = %guard.lobby.id,
                    player_id = actor.map(|a| a.as_str()).unwrap_or("-"),
                    op,
                    code = %err.code(),
                    "command rejected"
                );
                Err(err)
            }
        }
    }

    fn after_commit(&self, guard: &mut LobbyGuard, events: &[GameEvent]) {
        self.publish_summary(&guard.lobby);
        game_flow::fan_out(&self.inner.registry, &guard.lobby, events);
        if guard.lobby.status == LobbyStatus::Finished {
            info!(
                lobby_id = %guard.lobby.id,
                winners = guard.lobby.winners.len(),
                "game over"
            );
            self.close(guard);
        }
    }

    /// The lobby's state can no longer be trusted: end it for everyone.
    fn abort(
        &self,
        guard: &mut LobbyGuard,
        err: &DomainError,
        actor: Option<&PlayerId>,
        op: &'static str,
    ) {
        let lobby = &mut guard.lobby;
        error!(lobby_id = %lobby.id, op, error = %err, "lobby aborted");
        end_game(lobby);
        let members = lobby.member_ids();
        let error_msg = ServerMsg::error(err.code(), err.detail());
        // The actor hears about the error from their own command's reply.
        let others = members.iter().filter(|m| Some(*m) != actor);
        self.inner.registry.broadcast(others, &error_msg);
        self.inner.registry.broadcast(
            &members,
            &ServerMsg::GameOver {
                lobby_id: lobby.id,
                winners: lobby.winners.clone(),
            },
        );
        self.close(guard);
    }

    /// Remove `player` from the lobby under its lock. Waiting lobbies drop
    /// the seat; running games take it through the forfeit rules.
    fn remove_member(&self, guard: &mut LobbyGuard, player: &PlayerId) {
        self.inner.timers.cancel(player);
        {
            let mut index = self.inner.index.lock();
            if index.members.get(player) == Some(&guard.lobby.id) {
                index.members.remove(player);
            }
        }

        if guard.lobby.status == LobbyStatus::InGame {
            match play::forfeit(&mut guard.lobby, player) {
                Ok(events) => {
                    reassign_host(&mut guard.lobby, player);
                    if let Err(err) = check_invariants(&guard.lobby) {
                        self.abort(guard, &err, None, "forfeit");
                        return;
                    }
                    if guard.lobby.member_count() == 0 {
                        self.close(guard);
                        return;
                    }
                    self.after_commit(guard, &events);
                    if guard.open {
                        game_flow::lobby_update(&self.inner.registry, &guard.lobby, None);
                    }
                }
                Err(err) => {
                    warn!(lobby_id = %guard.lobby.id, player_id = %player, error = %err, "forfeit failed");
                }
            }
            return;
        }

        guard.lobby.players.retain(|p| &p.id != player);
        guard.lobby.finished_players.retain(|p| &p.id != player);
        if guard.lobby.member_count() == 0 {
            self.close(guard);
            return;
        }
        reassign_host(&mut guard.lobby, player);
        self.publish_summary(&guard.lobby);
        game_flow::lobby_update(&self.inner.registry, &guard.lobby, None);
    }

    fn publish_summary(&self, lobby: &Lobby) {
        if let Some(entry) = self.inner.index.lock().lobbies.get_mut(&lobby.id) {
            entry.summary = LobbySummary::from(lobby);
        }
    }

    fn close(&self, guard: &mut LobbyGuard) {
        if !guard.open {
            return;
        }
        guard.open = false;
        let id = guard.lobby.id;
        let members = guard.lobby.member_ids();
        self.inner.timers.cancel_all(&members);
        {
            let mut index = self.inner.index.lock();
            index.lobbies.remove(&id);
            for member in &members {
                if index.members.get(member) == Some(&id) {
                    index.members.remove(member);
                }
            }
            if let Some(onchain) = guard.lobby.onchain_lobby_id {
                if index.escrows.get(&onchain) == Some(&id) {
                    index.escrows.remove(&onchain);
                }
            }
            let creator = &guard.lobby.host_id;
            if index.pending_hosts.get(creator) == Some(&id) {
                index.pending_hosts.remove(creator);
                self.inner.unjoined.cancel(creator);
            }
        }
        info!(lobby_id = %id, members = members.len(), "lobby closed");
    }
}

/// Payer addresses come back from the chain in whatever case the oracle
/// chose.
fn payer_matches(payer: &str, player: &PlayerId) -> bool {
    payer.eq_ignore_ascii_case(player.as_str())
}

/// Hand the host role to the earliest remaining member when the host left.
fn reassign_host(lobby: &mut Lobby, departed: &PlayerId) {
    if lobby.host_id != *departed {
        return;
    }
    let next = lobby
        .players
        .iter()
        .chain(lobby.finished_players.iter())
        .min_by_key(|p| p.joined_at)
        .map(|p| p.id.clone());
    let Some(next) = next else {
        return;
    };
    for p in lobby
        .players
        .iter_mut()
        .chain(lobby.finished_players.iter_mut())
    {
        p.is_host = p.id == next;
    }
    info!(lobby_id = %lobby.id, old_host = %departed, new_host = %next, "host reassigned");
    lobby.host_id = next;
}
