//! Utterance-end debounce timer (spec §4.7: a 500ms grace window after
//! `UtteranceEnd` before the engine is triggered, so a trailing partial
//! that arrives a moment later can coalesce into the same turn instead of
//! starting a second one).
//!
//! New to this spec. Cancel-before-overwrite, same discipline as
//! [`crate::cancel::CancelMap`]: scheduling while a timer is already
//! pending cancels it first rather than letting two timers race.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct Debouncer {
    pending: Option<CancellationToken>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `fire_tx` to receive a `()` after `delay`, unless
    /// cancelled or superseded by another `schedule` call first.
    pub fn schedule(&mut self, delay: Duration, fire_tx: mpsc::Sender<()>) {
        self.cancel();
        let token = CancellationToken::new();
        self.pending = Some(token.clone());
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let _ = fire_tx.send(()).await;
                }
                _ = token.cancelled() => {}
            }
        });
    }

    /// Cancel any pending timer without scheduling a new one.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}
