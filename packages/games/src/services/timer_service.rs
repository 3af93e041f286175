use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

type TimerTable<K> = Arc<Mutex<HashMap<K, ArmedTimer>>>;

fn lock<K>(table: &Mutex<HashMap<K, ArmedTimer>>) -> MutexGuard<'_, HashMap<K, ArmedTimer>> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// At most one pending timer per key.
///
/// Arming a key replaces (and aborts) whatever was armed before. A timer that
/// wakes up after being superseded does nothing. A fired timer leaves the
/// table before its callback runs, so `is_armed` turning true again while the
/// callback waits means someone acted in between.
pub struct TurnTimerService<K> {
    timers: TimerTable<K>,
    next_generation: AtomicU64,
}

impl<K> Default for TurnTimerService<K> {
    fn default() -> Self {
        Self {
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }
}

impl<K> TurnTimerService<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `on_fire` to run after `duration`, cancelling any timer for `key`.
    /// Returns the generation of the new timer.
    pub fn start<F, Fut>(&self, key: K, duration: Duration, on_fire: F) -> u64
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let table = Arc::clone(&self.timers);
        let task_key = key.clone();

        // Held across the spawn so the task cannot look itself up before it is inserted.
        let mut timers = lock(&self.timers);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let current = {
                let mut timers = lock(&table);
                match timers.get(&task_key) {
                    Some(armed) if armed.generation == generation => {
                        timers.remove(&task_key);
                        true
                    }
                    _ => false,
                }
            };
            if current {
                debug!(key = ?task_key, generation, "Timer fired");
                on_fire().await;
            } else {
                debug!(key = ?task_key, generation, "Ignoring stale timer");
            }
        });

        if let Some(previous) = timers.insert(key.clone(), ArmedTimer { generation, handle }) {
            previous.handle.abort();
            debug!(key = ?key, replaced = previous.generation, generation, "Timer re-armed");
        } else {
            debug!(key = ?key, generation, ?duration, "Timer armed");
        }
        generation
    }

    /// Cancels the timer for `key`. A no-op when nothing is armed or it already fired.
    pub fn cancel(&self, key: &K) -> bool {
        match lock(&self.timers).remove(key) {
            Some(armed) => {
                armed.handle.abort();
                debug!(key = ?key, generation = armed.generation, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, key: &K) -> bool {
        lock(&self.timers).contains_key(key)
    }

    pub fn armed_generation(&self, key: &K) -> Option<u64> {
        lock(&self.timers).get(key).map(|armed| armed.generation)
    }

    pub fn armed_count(&self) -> usize {
        lock(&self.timers).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn bump(count: &Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> + Send + 'static {
        let count = Arc::clone(count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once_and_disarms() {
        let timers = TurnTimerService::new();
        let fired = counter();

        timers.start(1i64, Duration::from_secs(30), bump(&fired));
        assert!(timers.is_armed(&1));

        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timers.is_armed(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_supersedes_previous_timer() {
        let timers = TurnTimerService::new();
        let first = counter();
        let second = counter();

        let a = timers.start(1i64, Duration::from_secs(10), bump(&first));
        tokio::time::sleep(Duration::from_secs(5)).await;
        let b = timers.start(1i64, Duration::from_secs(10), bump(&second));

        assert_ne!(a, b);
        assert_eq!(timers.armed_generation(&1), Some(b));

        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_safe_on_any_key() {
        let timers = TurnTimerService::new();
        let fired = counter();

        assert!(!timers.cancel(&9i64));

        timers.start(9i64, Duration::from_secs(1), bump(&fired));
        assert!(timers.cancel(&9));
        assert!(!timers.cancel(&9));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        timers.start(9i64, Duration::from_secs(1), bump(&fired));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!timers.cancel(&9));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let timers = TurnTimerService::new();
        let fired = counter();

        timers.start((1i64, 10i64), Duration::from_secs(3), bump(&fired));
        timers.start((1i64, 11i64), Duration::from_secs(3), bump(&fired));
        timers.cancel(&(1, 10));

        assert_eq!(timers.armed_count(), 1);
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_can_rearm_its_own_key() {
        let timers = Arc::new(TurnTimerService::new());
        let fired = counter();

        let inner_timers = Arc::clone(&timers);
        let inner_fired = Arc::clone(&fired);
        timers.start(5i64, Duration::from_secs(1), move || async move {
            inner_fired.fetch_add(1, Ordering::SeqCst);
            let again = Arc::clone(&inner_fired);
            inner_timers.start(5i64, Duration::from_secs(1), move || async move {
                again.fetch_add(1, Ordering::SeqCst);
            });
        });

        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert!(!timers.is_armed(&5));
    }
}
