//! Per-player deadline timers: disconnect grace and unjoined paid lobbies.
//!
//! One cancellable task per player. Scheduling again for the
//! same player replaces (and cancels) the previous timer. Cancelling twice
//! or after the timer fired is a no-op.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::state::PlayerId;

struct Pending {
    generation: u64,
    token: CancellationToken,
}

#[derive(Default)]
pub struct GraceTimers {
    pending: Arc<DashMap<PlayerId, Pending>>,
    generation: AtomicU64,
}

impl GraceTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_expiry` after `delay` unless cancelled first. Must be called
    /// from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, player: PlayerId, delay: Duration, on_expiry: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let replaced = self.pending.insert(
            player.clone(),
            Pending {
                generation,
                token: token.clone(),
            },
        );
        if let Some(old) = replaced {
            old.token.cancel();
        }

        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(player_id = %player, "grace timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let ours = pending
                        .remove_if(&player, |_, p| p.generation == generation)
                        .is_some();
                    if ours {
                        debug!(player_id = %player, "grace timer fired");
                        on_expiry().await;
                    }
                }
            }
        });
    }

    /// Returns whether a pending timer was cancelled.
    pub fn cancel(&self, player: &PlayerId) -> bool {
        match self.pending.remove(player) {
            Some((_, p)) => {
                p.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all<'a, I>(&self, players: I)
    where
        I: IntoIterator<Item = &'a PlayerId>,
    {
        for player in players {
            self.cancel(player);
        }
    }

    pub fn is_pending(&self, player: &PlayerId) -> bool {
        self.pending.contains_key(player)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
