// Real HTTP server on an ephemeral port, for websocket clients.

use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use backend::adapters::payment_oracle::InMemoryPaymentOracle;
use backend::config::GameConfig;
use backend::infra::state::build_state;
use backend::middleware::request_trace::RequestTrace;
use backend::routes;
use backend::state::app_state::AppState;

use crate::support::lobby_helpers::test_config;

pub fn test_state() -> AppState {
    test_state_with(test_config())
}

pub fn test_state_with(config: GameConfig) -> AppState {
    build_state()
        .with_game_config(config)
        .with_oracle(Arc::new(InMemoryPaymentOracle::new()))
        .build()
        .expect("build test state")
}

/// Start the full route table bound to 127.0.0.1 on a random port.
///
/// Returns the server handle (to stop it), the bound address and the join
/// handle of the server task.
pub async fn start_test_server(
    state: AppState,
) -> Result<
    (
        actix_web::dev::ServerHandle,
        std::net::SocketAddr,
        tokio::task::JoinHandle<Result<(), std::io::Error>>,
    ),
    Box<dyn std::error::Error>,
> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let state_data = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .wrap(RequestTrace)
            .configure(routes::configure)
    })
    .workers(1)
    .listen(listener)?
    .run();

    let server_handle = server.handle();
    let join = tokio::spawn(server);

    Ok((server_handle, addr, join))
}

pub fn ws_url(addr: std::net::SocketAddr) -> String {
    format!("ws://{addr}/ws")
}
