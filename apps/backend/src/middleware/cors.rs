use actix_cors::Cors;
use actix_web::http::header;

use crate::config::ServerConfig;

/// Build CORS middleware from the configured origins.
///
/// Entries that are empty, `null` or not http(s) are ignored; with nothing
/// valid left, only the local development frontends are allowed.
pub fn cors_middleware(config: &ServerConfig) -> Cors {
    let allowed_origins: Vec<&str> = config
        .cors_allowed_origins
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != "null")
        .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
        .collect();

    let effective_origins: Vec<&str> = if allowed_origins.is_empty() {
        vec!["http://localhost:3000", "http://127.0.0.1:3000"]
    } else {
        allowed_origins
    };

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers(vec![header::HeaderName::from_static("x-trace-id")])
        .max_age(3600);

    for origin in effective_origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}
