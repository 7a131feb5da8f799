#![allow(dead_code)]

pub mod lobby_helpers;
pub mod test_server;
pub mod websocket_client;
