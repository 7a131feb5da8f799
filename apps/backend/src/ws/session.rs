use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::state::PlayerId;
use crate::errors::domain::DomainError;
use crate::errors::ErrorCode;
use crate::services::lobbies::{CreateLobby, LobbyManager, Resume};
use crate::state::app_state::AppState;
use crate::ws::protocol::{ClientMsg, ServerMsg, PROTOCOL_VERSION};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = WsSession::new(Uuid::new_v4(), app_state.lobbies.clone());
    ws::start(session, &req, stream)
}

/// Who this socket speaks for, fixed by `hello`.
#[derive(Clone)]
struct Identity {
    player_id: PlayerId,
    display_name: String,
}

pub struct WsSession {
    conn_id: Uuid,
    lobbies: LobbyManager,
    identity: Option<Identity>,
    last_heartbeat: Instant,
    heartbeat_handle: Option<SpawnHandle>,
}

impl WsSession {
    fn new(conn_id: Uuid, lobbies: LobbyManager) -> Self {
        Self {
            conn_id,
            lobbies,
            identity: None,
            last_heartbeat: Instant::now(),
            heartbeat_handle: None,
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "[WS SESSION] failed to serialize outbound message"),
        }
    }

    /// Replies share the push channel once it exists so they stay ordered
    /// behind earlier broadcasts.
    fn reply(&self, ctx: &mut ws::WebsocketContext<Self>, msg: ServerMsg) {
        match &self.identity {
            Some(id) if self.lobbies.registry().is_current(&id.player_id, self.conn_id) => {
                self.lobbies.registry().send(&id.player_id, msg);
            }
            _ => Self::send_json(ctx, &msg),
        }
    }

    fn send_error_and_close(
        &self,
        ctx: &mut ws::WebsocketContext<Self>,
        code: ErrorCode,
        message: impl Into<String>,
    ) {
        Self::send_json(ctx, &ServerMsg::error(code, message));
        ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
        ctx.stop();
    }

    fn start_heartbeat(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let handle = ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(conn_id = %actor.conn_id, "[WS SESSION] heartbeat timed out");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
        self.heartbeat_handle = Some(handle);
    }

    fn handle_hello(
        &mut self,
        ctx: &mut ws::WebsocketContext<Self>,
        protocol: i32,
        player_id: PlayerId,
        display_name: String,
    ) {
        if protocol != PROTOCOL_VERSION {
            self.send_error_and_close(ctx, ErrorCode::BadProtocol, "Unsupported protocol version");
            return;
        }
        if self.identity.is_some() {
            Self::send_json(
                ctx,
                &ServerMsg::error(ErrorCode::BadRequest, "Session already identified"),
            );
            return;
        }
        if player_id.as_str().trim().is_empty() {
            self.send_error_and_close(ctx, ErrorCode::BadRequest, "player_id must not be empty");
            return;
        }

        let display_name = match display_name.trim() {
            "" => player_id.to_string(),
            name => name.to_string(),
        };
        self.identity = Some(Identity {
            player_id: player_id.clone(),
            display_name,
        });
        info!(conn_id = %self.conn_id, player_id = %player_id, "[WS SESSION] hello");

        let lobbies = self.lobbies.clone();
        let conn_id = self.conn_id;
        // `wait` holds back further frames until the channel is attached.
        ctx.wait(
            async move { lobbies.connect(&player_id, conn_id).await }
                .into_actor(self)
                .map(|(rx, resume), actor, ctx| {
                    let Some(identity) = actor.identity.clone() else {
                        return;
                    };
                    Self::send_resume(ctx, identity.player_id, resume);
                    ctx.add_stream(UnboundedReceiverStream::new(rx));
                }),
        );
    }

    fn send_resume(
        ctx: &mut ws::WebsocketContext<Self>,
        player_id: PlayerId,
        resume: Option<Resume>,
    ) {
        let Some(resume) = resume else {
            Self::send_json(
                ctx,
                &ServerMsg::HelloAck {
                    protocol: PROTOCOL_VERSION,
                    player_id,
                    lobby: None,
                },
            );
            return;
        };
        let lobby_id = resume.lobby.id;
        Self::send_json(
            ctx,
            &ServerMsg::HelloAck {
                protocol: PROTOCOL_VERSION,
                player_id,
                lobby: Some(Box::new(resume.lobby)),
            },
        );
        if let Some(hand) = resume.hand {
            Self::send_json(
                ctx,
                &ServerMsg::YourHand {
                    lobby_id,
                    hand: hand.hand,
                    playable: hand.playable,
                },
            );
        }
        if let Some(card_index) = resume.color_prompt {
            Self::send_json(
                ctx,
                &ServerMsg::ChooseColor {
                    lobby_id,
                    card_index,
                },
            );
        }
    }

    fn handle_command(&mut self, ctx: &mut ws::WebsocketContext<Self>, cmd: ClientMsg) {
        let Some(identity) = self.identity.clone() else {
            Self::send_json(
                ctx,
                &ServerMsg::error(ErrorCode::HelloRequired, "Must send hello first"),
            );
            return;
        };
        let lobbies = self.lobbies.clone();
        let conn_id = self.conn_id;

        ctx.wait(
            async move { dispatch(&lobbies, &identity, conn_id, cmd).await }
                .into_actor(self)
                .map(|res, actor, ctx| match res {
                    Ok(Some(msg)) => actor.reply(ctx, msg),
                    Ok(None) => {}
                    Err(err) => {
                        debug!(
                            conn_id = %actor.conn_id,
                            code = %err.code(),
                            error = %err,
                            "[WS SESSION] command failed"
                        );
                        actor.reply(ctx, ServerMsg::error(err.code(), err.detail()));
                    }
                }),
        );
    }
}

/// Run one command. Successful commands push their own messages; the
/// returned message, if any, goes only to the caller.
async fn dispatch(
    lobbies: &LobbyManager,
    me: &Identity,
    conn_id: Uuid,
    cmd: ClientMsg,
) -> Result<Option<ServerMsg>, DomainError> {
    let player = &me.player_id;
    match cmd {
        ClientMsg::Hello { .. } => Ok(None),
        ClientMsg::ListLobbies => Ok(Some(ServerMsg::LobbyList {
            lobbies: lobbies.list_lobbies(),
        })),
        ClientMsg::CreateLobby {
            name,
            kind,
            capacity,
            password,
            payment,
        } => {
            let req = CreateLobby {
                name,
                kind,
                capacity,
                password,
                payment,
            };
            lobbies
                .create_lobby(player, &me.display_name, conn_id, req)
                .await
                .map(|_| None)
        }
        ClientMsg::JoinLobby {
            lobby_id,
            password,
            payment_proof,
        } => lobbies
            .join_lobby(
                &lobby_id,
                player,
                &me.display_name,
                conn_id,
                password.as_deref(),
                payment_proof.as_deref(),
            )
            .await
            .map(|_| None),
        ClientMsg::LeaveLobby { lobby_id } => {
            lobbies.leave_lobby(&lobby_id, player).await.map(|()| None)
        }
        ClientMsg::CancelLobby { lobby_id } => lobbies
            .cancel_lobby(&lobby_id, player, false)
            .await
            .map(|()| None),
        ClientMsg::StartGame { lobby_id } => {
            lobbies.start_game(&lobby_id, player).await.map(|()| None)
        }
        ClientMsg::PlayCard {
            lobby_id,
            card_index,
        } => lobbies
            .play_card(&lobby_id, player, card_index)
            .await
            .map(|()| None),
        ClientMsg::DrawCard { lobby_id } => {
            lobbies.draw_card(&lobby_id, player).await.map(|()| None)
        }
        ClientMsg::PassTurn { lobby_id } => {
            lobbies.pass_turn(&lobby_id, player).await.map(|()| None)
        }
        ClientMsg::ChooseColor {
            lobby_id,
            color,
            card_index,
        } => lobbies
            .choose_color(&lobby_id, player, color, card_index)
            .await
            .map(|()| None),
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.conn_id, "[WS SESSION] started");
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(identity) = self.identity.take() {
            let registry = self.lobbies.registry();
            registry.unregister(&identity.player_id, self.conn_id);
            let lobbies = self.lobbies.clone();
            let conn_id = self.conn_id;
            actix::spawn(async move {
                lobbies
                    .handle_disconnect(&identity.player_id, conn_id)
                    .await;
            });
        }
        info!(conn_id = %self.conn_id, "[WS SESSION] stopped");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();

                let cmd = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(cmd) => cmd,
                    Err(err) => {
                        let msg = ServerMsg::error(
                            ErrorCode::BadRequest,
                            format!("Malformed message: {err}"),
                        );
                        self.reply(ctx, msg);
                        return;
                    }
                };

                match cmd {
                    ClientMsg::Hello {
                        protocol,
                        player_id,
                        display_name,
                    } => self.handle_hello(ctx, protocol, player_id, display_name),
                    other => self.handle_command(ctx, other),
                }
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                self.send_error_and_close(ctx, ErrorCode::BadRequest, "Binary not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(conn_id = %self.conn_id, error = %err, "[WS SESSION] protocol error");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}

/// Pushes from the lobby manager.
impl StreamHandler<ServerMsg> for WsSession {
    fn handle(&mut self, msg: ServerMsg, ctx: &mut Self::Context) {
        Self::send_json(ctx, &msg);
    }

    /// The channel closes when a newer connection took over this player.
    fn finished(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.conn_id, "[WS SESSION] superseded by a newer connection");
        ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Policy)));
        ctx.stop();
    }
}
