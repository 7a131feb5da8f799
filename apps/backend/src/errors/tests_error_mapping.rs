// Unit tests for error mapping - pure domain errors to codes and HTTP statuses
use crate::errors::domain::{DomainError, IllegalMoveKind, NotFoundKind, UnauthorizedKind};
use crate::{AppError, ErrorCode};

#[test]
fn maps_not_found_to_404() {
    let de = DomainError::not_found(NotFoundKind::Lobby, "no lobby");
    assert_eq!(de.code(), ErrorCode::LobbyNotFound);
    let app: AppError = de.into();
    assert_eq!(app.status().as_u16(), 404);
    assert_eq!(app.code().as_str(), "LOBBY_NOT_FOUND");
}

#[test]
fn maps_membership_conflicts_to_409() {
    for (err, code) in [
        (DomainError::Full, "LOBBY_FULL"),
        (DomainError::AlreadyStarted, "ALREADY_STARTED"),
        (DomainError::AlreadyInLobby("x".into()), "ALREADY_IN_LOBBY"),
        (DomainError::AlreadyDrawn, "ALREADY_DRAWN"),
    ] {
        let app: AppError = err.into();
        assert_eq!(app.status().as_u16(), 409);
        assert_eq!(app.code().as_str(), code);
    }
}

#[test]
fn stack_response_has_its_own_code() {
    let stack = DomainError::illegal(IllegalMoveKind::MustRespondToStack, "respond");
    let mismatch = DomainError::illegal(IllegalMoveKind::NotPlayable, "mismatch");
    assert_eq!(stack.code(), ErrorCode::MustRespondToStack);
    assert_eq!(mismatch.code(), ErrorCode::IllegalMove);
}

#[test]
fn unauthorized_maps_to_403() {
    let app: AppError = DomainError::unauthorized(UnauthorizedKind::NotHost, "host only").into();
    assert_eq!(app.status().as_u16(), 403);
    assert_eq!(app.code(), ErrorCode::NotHost);
}

#[test]
fn payment_maps_to_402() {
    let app: AppError = DomainError::payment("wrong lobby id").into();
    assert_eq!(app.status().as_u16(), 402);
    assert_eq!(app.code(), ErrorCode::PaymentNotVerified);
}

#[test]
fn only_internal_errors_are_fatal() {
    assert!(DomainError::DeckExhausted.is_fatal());
    assert!(DomainError::invariant("count").is_fatal());
    assert!(!DomainError::Full.is_fatal());
    assert!(!DomainError::illegal(IllegalMoveKind::NotPlayable, "x").is_fatal());
}

#[test]
fn humanized_title() {
    assert_eq!(AppError::humanize_code("LOBBY_NOT_FOUND"), "Lobby Not Found");
}
