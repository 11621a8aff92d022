//! Cancellable list loads tied to a key.
//!
//! Starting a load for a new key cancels the one in flight, and dropping
//! the loader cancels whatever is still running. A cancelled load never
//! touches the state.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::ClientResult;
use crate::views::ViewState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Cancelled,
}

struct Slot<K, T> {
    key: Option<K>,
    state: ViewState<T>,
}

struct Inflight {
    generation: u64,
    token: CancellationToken,
}

pub struct KeyedLoader<K, T> {
    slot: Mutex<Slot<K, T>>,
    inflight: Mutex<Option<Inflight>>,
    generation: AtomicU64,
}

impl<K, T> Default for KeyedLoader<K, T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(Slot {
                key: None,
                state: ViewState::Idle,
            }),
            inflight: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }
}

impl<K, T> KeyedLoader<K, T>
where
    K: Clone,
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// `Loading` while a load is in flight, otherwise the last applied
    /// result.
    pub fn state(&self) -> ViewState<T> {
        if self.is_loading() {
            return ViewState::Loading;
        }
        self.slot.lock().state.clone()
    }

    pub fn key(&self) -> Option<K> {
        self.slot.lock().key.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inflight.lock().is_some()
    }

    /// Run `fetch` for `key`, replacing whatever load was in flight.
    pub async fn load<F>(&self, key: K, fetch: F) -> LoadOutcome
    where
        F: Future<Output = ClientResult<T>>,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        let previous = self.inflight.lock().replace(Inflight {
            generation,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            previous.token.cancel();
        }

        let result = tokio::select! {
            _ = token.cancelled() => None,
            result = fetch => Some(result),
        };

        let Some(result) = result else {
            tracing::debug!(generation, "Stale load cancelled");
            return LoadOutcome::Cancelled;
        };

        {
            let mut slot = self.slot.lock();
            if token.is_cancelled() {
                tracing::debug!(generation, "Load finished after cancellation, result dropped");
                return LoadOutcome::Cancelled;
            }
            slot.key = Some(key);
            slot.state = ViewState::from_result(result);
        }

        let mut inflight = self.inflight.lock();
        if inflight.as_ref().is_some_and(|i| i.generation == generation) {
            *inflight = None;
        }
        LoadOutcome::Applied
    }

    /// Abandon the load in flight, if any.
    pub fn cancel(&self) {
        if let Some(inflight) = self.inflight.lock().take() {
            inflight.token.cancel();
        }
    }
}

impl<K, T> Drop for KeyedLoader<K, T> {
    fn drop(&mut self) {
        if let Some(inflight) = self.inflight.get_mut().take() {
            inflight.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::ClientError;

    #[tokio::test]
    async fn test_load_applies_result() {
        let loader: KeyedLoader<&str, Vec<i32>> = KeyedLoader::new();
        assert_eq!(loader.state(), ViewState::Idle);

        let outcome = loader.load("cities", async { Ok(vec![1, 2]) }).await;
        assert_eq!(outcome, LoadOutcome::Applied);
        assert_eq!(loader.state(), ViewState::Success(vec![1, 2]));
        assert_eq!(loader.key(), Some("cities"));
        assert!(!loader.is_loading());

        loader
            .load("cities", async { Err(ClientError::Network("down".into())) })
            .await;
        assert_eq!(loader.state().error(), Some("Could not reach server"));
    }

    #[tokio::test]
    async fn test_new_key_cancels_previous_load() {
        let loader: Arc<KeyedLoader<u32, &'static str>> = Arc::new(KeyedLoader::new());

        let slow = {
            let loader = loader.clone();
            tokio::spawn(async move {
                loader
                    .load(1, async {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok("stale")
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let fresh = loader.load(2, async { Ok("fresh") }).await;

        assert_eq!(fresh, LoadOutcome::Applied);
        assert_eq!(slow.await.unwrap(), LoadOutcome::Cancelled);
        assert_eq!(loader.state(), ViewState::Success("fresh"));
        assert_eq!(loader.key(), Some(2));
    }

    #[tokio::test]
    async fn test_cancel_leaves_state_untouched() {
        let loader: Arc<KeyedLoader<(), i32>> = Arc::new(KeyedLoader::new());
        loader.load((), async { Ok(1) }).await;

        let pending = {
            let loader = loader.clone();
            tokio::spawn(async move {
                loader
                    .load((), async {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok(2)
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(loader.state(), ViewState::Loading);
        loader.cancel();

        assert_eq!(pending.await.unwrap(), LoadOutcome::Cancelled);
        assert_eq!(loader.state(), ViewState::Success(1));
        assert!(!loader.is_loading());
    }
}
