use actix_web::{web, App, HttpServer};
use backend::config::{GameConfig, ServerConfig};
use backend::infra::state::build_state;
use backend::middleware::cors::cors_middleware;
use backend::middleware::request_trace::RequestTrace;
use backend::routes;
use backend::telemetry;
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment
    // (docker env_file, or sourced manually for local dev).
    let server_config = match ServerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "invalid server configuration");
            std::process::exit(1);
        }
    };
    let game_config = match GameConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "invalid game configuration");
            std::process::exit(1);
        }
    };

    let app_state = match build_state().with_game_config(game_config).build() {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to build application state");
            std::process::exit(1);
        }
    };

    let host = server_config.host.clone();
    let port = server_config.port;
    info!(host = %host, port, "starting lobby server");

    let data = web::Data::new(app_state);

    HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware(&server_config))
            .wrap(RequestTrace)
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
