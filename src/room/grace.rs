//! Lifecycle Grace Manager (spec §4.F) — host-transfer and abandonment
//! timers, one active timer per room at a time (the two conditions
//! that arm them are mutually exclusive: host-transfer requires ≥1
//! other connected member, abandonment requires zero). Grounded on the
//! teacher's `ws::room::engine`'s `tokio::spawn` + `sleep` countdown
//! used for its `Starting`-status lobby countdown, generalized here to
//! a cancellable timer keyed by room id via a `oneshot` channel per arm.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};
use uuid::Uuid;

#[derive(Clone)]
pub struct GraceManager {
    host_transfer: Duration,
    abandonment: Duration,
    cancels: Arc<Mutex<HashMap<Uuid, oneshot::Sender<()>>>>,
}

impl GraceManager {
    pub fn new(host_transfer_secs: u64, abandonment_secs: u64) -> Self {
        Self {
            host_transfer: Duration::from_secs(host_transfer_secs),
            abandonment: Duration::from_secs(abandonment_secs),
            cancels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn host_transfer_duration(&self) -> Duration {
        self.host_transfer
    }

    pub fn abandonment_duration(&self) -> Duration {
        self.abandonment
    }

    /// Arms a timer for `room_id`, clearing any prior timer for the
    /// same room first (spec §4.F: "re-arming clears the prior timer").
    /// `on_expire` runs only if the timer is not cancelled first.
    pub async fn arm<F>(&self, room_id: Uuid, duration: Duration, on_expire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        {
            let mut cancels = self.cancels.lock().await;
            if let Some(old) = cancels.insert(room_id, cancel_tx) {
                let _ = old.send(());
            }
        }

        let cancels = self.cancels.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    let mut cancels = cancels.lock().await;
                    // Only fire if we're still the armed timer; a newer
                    // `arm` call for this room already replaced us and
                    // will have sent us a cancel that lost the select race,
                    // which is harmless since on_expire checks state itself.
                    cancels.remove(&room_id);
                    drop(cancels);
                    on_expire.await;
                }
                _ = cancel_rx => {
                    tracing::debug!(room_id = %room_id, "grace timer cancelled");
                }
            }
        });
    }

    /// Cancels any armed timer for `room_id` (spec §4.F: cancel-on-
    /// reconnect / cancel-on-join).
    pub async fn cancel(&self, room_id: Uuid) {
        let mut cancels = self.cancels.lock().await;
        if let Some(tx) = cancels.remove(&room_id) {
            let _ = tx.send(());
        }
    }

    pub async fn is_armed(&self, room_id: Uuid) -> bool {
        self.cancels.lock().await.contains_key(&room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn cancelled_timer_never_fires() {
        let manager = GraceManager::new(30, 120);
        let room_id = Uuid::new_v4();
        let fired = Arc::new(AtomicBool::new(false));

        let fired_clone = fired.clone();
        manager
            .arm(room_id, Duration::from_millis(30), async move {
                fired_clone.store(true, Ordering::SeqCst);
            })
            .await;
        assert!(manager.is_armed(room_id).await);

        manager.cancel(room_id).await;
        assert!(!manager.is_armed(room_id).await);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!fired.load(Ordering::SeqCst), "cancelled timer must not run its callback");
    }

    #[tokio::test]
    async fn uncancelled_timer_fires_once() {
        let manager = GraceManager::new(30, 120);
        let room_id = Uuid::new_v4();
        let fired = Arc::new(AtomicBool::new(false));

        let fired_clone = fired.clone();
        manager
            .arm(room_id, Duration::from_millis(10), async move {
                fired_clone.store(true, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!manager.is_armed(room_id).await, "expired timer clears its own armed entry");
    }

    #[tokio::test]
    async fn rearming_clears_the_prior_timer() {
        let manager = GraceManager::new(30, 120);
        let room_id = Uuid::new_v4();
        let first_fired = Arc::new(AtomicBool::new(false));
        let second_fired = Arc::new(AtomicBool::new(false));

        let first_clone = first_fired.clone();
        manager
            .arm(room_id, Duration::from_millis(20), async move {
                first_clone.store(true, Ordering::SeqCst);
            })
            .await;

        let second_clone = second_fired.clone();
        manager
            .arm(room_id, Duration::from_millis(20), async move {
                second_clone.store(true, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!first_fired.load(Ordering::SeqCst), "superseded timer must not fire");
        assert!(second_fired.load(Ordering::SeqCst), "the latest arm must still fire");
    }

    #[tokio::test]
    async fn durations_are_configurable() {
        let manager = GraceManager::new(30, 150);
        assert_eq!(manager.host_transfer_duration(), Duration::from_secs(30));
        assert_eq!(manager.abandonment_duration(), Duration::from_secs(150));
    }
}
