//! Read-only lobby endpoints. Everything that changes a lobby goes through
//! the websocket.

use actix_web::{web, HttpResponse};

use crate::domain::state::LobbyId;
use crate::error::AppError;
use crate::state::app_state::AppState;

/// GET /api/lobbies
///
/// Same summaries as the websocket `list_lobbies` command.
async fn list(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(app_state.lobbies.list_lobbies()))
}

/// GET /api/lobbies/{lobby_id}
///
/// Public table view: card counts, never hands.
async fn get_one(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let lobby_id: LobbyId = path.into_inner().parse()?;
    let view = app_state.lobbies.view(&lobby_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(list))
        .route("/{lobby_id}", web::get().to(get_one));
}
