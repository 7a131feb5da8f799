use actix_web::web;

pub mod health;
pub mod lobbies;
pub mod realtime;

/// Configure application routes.
///
/// `main.rs` wraps these in the tracing, logging and CORS middleware; tests
/// register the same paths without the wrappers so endpoint behavior can be
/// exercised directly.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Health check routes: /health
    cfg.configure(health::configure_routes);

    // Lobby listing: /api/lobbies/**
    cfg.service(web::scope("/api/lobbies").configure(lobbies::configure_routes));

    // Websocket endpoint: /ws
    cfg.configure(realtime::configure_routes);
}
