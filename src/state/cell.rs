use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use tokio::sync::watch;

type Callback<T> = Box<dyn FnMut(&T) + Send>;

struct Slot<T> {
    callback: Option<Callback<T>>,
    /// Version last handed to the callback
    delivered: Option<u64>,
}

struct Observer<T> {
    id: u64,
    slot: Mutex<Slot<T>>,
}

impl<T> Observer<T> {
    fn deliver(&self, version: u64, value: &T) {
        let mut slot = lock(&self.slot);
        if slot.delivered == Some(version) {
            return;
        }
        slot.delivered = Some(version);
        if let Some(callback) = slot.callback.as_mut() {
            callback(value);
        }
    }
}

/// Thread currently running callbacks, and whether it owes another pass.
#[derive(Default)]
struct Delivery {
    owner: Option<ThreadId>,
    pending: bool,
}

struct Registry<T> {
    observers: Mutex<Vec<Arc<Observer<T>>>>,
    delivery: Mutex<Delivery>,
    idle: Condvar,
    next_id: AtomicU64,
}

struct Versioned<T> {
    version: u64,
    value: T,
}

/// A replay-latest state holder.
///
/// Every [`set`](StateCell::set) stores the value and pushes it synchronously
/// to all callback observers before returning. New observers are called with
/// the current value as soon as they attach. Async consumers can use
/// [`watch`](StateCell::watch) instead of callbacks.
///
/// Callbacks may read or write any cell, including the one that is calling
/// them. A write made from inside a callback is delivered once the current
/// callback returns, so observers always end on the latest value, though an
/// intermediate value may be skipped. A callback must not drop its own
/// [`Subscription`].
pub struct StateCell<T> {
    current: Mutex<Versioned<T>>,
    tx: watch::Sender<T>,
    registry: Arc<Registry<T>>,
}

impl<T: Clone + Send + Sync + 'static> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial.clone());
        Self {
            current: Mutex::new(Versioned {
                version: 0,
                value: initial,
            }),
            tx,
            registry: Arc::new(Registry {
                observers: Mutex::new(Vec::new()),
                delivery: Mutex::new(Delivery::default()),
                idle: Condvar::new(),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Latest published value.
    pub fn get(&self) -> T {
        lock(&self.current).value.clone()
    }

    /// Publish a new value and notify observers.
    pub fn set(&self, value: T) {
        self.replace(value);
        self.notify();
    }

    /// Store a value without running callback observers yet. Watch receivers
    /// are woken as usual.
    pub(crate) fn replace(&self, value: T) {
        let mut current = lock(&self.current);
        current.version += 1;
        current.value = value.clone();
        self.tx.send_replace(value);
    }

    /// Deliver the stored value to every callback observer that has not seen it.
    pub(crate) fn notify(&self) {
        let Some(_owner) = self.claim_delivery() else {
            return;
        };

        loop {
            {
                let mut delivery = lock(&self.registry.delivery);
                if !delivery.pending {
                    break;
                }
                delivery.pending = false;
            }

            let (version, value) = {
                let current = lock(&self.current);
                (current.version, current.value.clone())
            };
            // Snapshot so observers can attach or detach while delivery runs.
            let observers: Vec<_> = lock(&self.registry.observers).clone();
            for observer in observers {
                observer.deliver(version, &value);
            }
        }
    }

    /// Become the delivering thread, waiting out another thread's pass. Returns
    /// `None` when this thread is already delivering; the running pass picks up
    /// the new value.
    fn claim_delivery(&self) -> Option<DeliveryOwner<'_, T>> {
        let me = thread::current().id();
        let mut delivery = lock(&self.registry.delivery);
        if delivery.owner == Some(me) {
            delivery.pending = true;
            return None;
        }
        while delivery.owner.is_some() {
            delivery = self
                .registry
                .idle
                .wait(delivery)
                .unwrap_or_else(PoisonError::into_inner);
        }
        delivery.owner = Some(me);
        delivery.pending = true;
        Some(DeliveryOwner {
            registry: &self.registry,
        })
    }

    /// Register a callback, which is immediately invoked with the current value.
    ///
    /// The callback stays registered until the returned [`Subscription`] is dropped.
    pub fn observe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&T) + Send + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let observer = Arc::new(Observer {
            id,
            slot: Mutex::new(Slot {
                callback: Some(Box::new(callback) as Callback<T>),
                delivered: None,
            }),
        });
        lock(&self.registry.observers).push(observer);

        // Observers that are up to date are skipped, so this only replays to
        // the new one.
        self.notify();

        let registry = Arc::downgrade(&self.registry);
        Subscription {
            detach: Some(Box::new(move || detach(&registry, id))),
        }
    }

    /// Async receiver that starts at the current value.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.registry.observers).len()
    }
}

/// Releases delivery ownership, also when a callback panics.
struct DeliveryOwner<'a, T> {
    registry: &'a Registry<T>,
}

impl<T> Drop for DeliveryOwner<'_, T> {
    fn drop(&mut self) {
        let mut delivery = lock(&self.registry.delivery);
        delivery.owner = None;
        delivery.pending = false;
        self.registry.idle.notify_all();
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCell")
            .field("value", &lock(&self.current).value)
            .finish_non_exhaustive()
    }
}

fn detach<T>(registry: &Weak<Registry<T>>, id: u64) {
    let Some(registry) = registry.upgrade() else {
        return;
    };

    let removed = {
        let mut observers = lock(&registry.observers);
        observers
            .iter()
            .position(|o| o.id == id)
            .map(|index| observers.remove(index))
    };

    // Taking the callback waits out a delivery already in progress, so nothing
    // reaches the observer once detach returns.
    if let Some(observer) = removed {
        lock(&observer.slot).callback.take();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RAII handle for a callback registered with [`StateCell::observe`].
///
/// Dropping it unregisters the callback.
#[must_use = "dropping a Subscription unregisters the observer"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl FnMut(&T) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |value: &T| sink.lock().unwrap().push(value.clone()))
    }

    #[test]
    fn test_get_returns_latest() {
        let cell = StateCell::new(1);
        assert_eq!(cell.get(), 1);
        cell.set(2);
        assert_eq!(cell.get(), 2);
    }

    #[test]
    fn test_observer_replays_current_value() {
        let cell = StateCell::new("a".to_string());
        cell.set("b".to_string());

        let (seen, callback) = recorder::<String>();
        let _sub = cell.observe(callback);

        assert_eq!(*seen.lock().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_observer_sees_every_change_in_order() {
        let cell = StateCell::new(0);
        let (seen, callback) = recorder::<i32>();
        let _sub = cell.observe(callback);

        cell.set(1);
        cell.set(2);
        cell.set(3);

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_callback_can_write_back_to_its_own_cell() {
        let cell = Arc::new(StateCell::new(0));
        let writer = cell.clone();
        let (seen, mut record) = recorder::<i32>();
        let _sub = cell.observe(move |value: &i32| {
            record(value);
            if value % 2 == 1 {
                writer.set(value + 1);
            }
        });

        cell.set(3);

        assert_eq!(cell.get(), 4);
        assert_eq!(*seen.lock().unwrap(), vec![0, 3, 4]);
    }

    #[test]
    fn test_replay_callback_can_set_the_cell() {
        let cell = Arc::new(StateCell::new(String::new()));
        let writer = cell.clone();
        let (seen, mut record) = recorder::<String>();
        let _sub = cell.observe(move |value: &String| {
            record(value);
            if value.is_empty() {
                writer.set("default".to_string());
            }
        });

        assert_eq!(cell.get(), "default");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![String::new(), "default".to_string()]
        );
    }

    #[test]
    fn test_late_observer_is_not_replayed_to_others() {
        let cell = StateCell::new(1);
        let (first, callback) = recorder::<i32>();
        let _first = cell.observe(callback);
        let (second, callback) = recorder::<i32>();
        let _second = cell.observe(callback);

        assert_eq!(*first.lock().unwrap(), vec![1]);
        assert_eq!(*second.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_set_from_other_thread_during_delivery() {
        let cell = Arc::new(StateCell::new(0));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let (seen, mut record) = recorder::<i32>();
        let _sub = cell.observe(move |value: &i32| {
            record(value);
            if *value == 1 {
                let _ = entered_tx.send(());
                let _ = release_rx.lock().unwrap().recv();
            }
        });

        let producer = {
            let cell = cell.clone();
            std::thread::spawn(move || cell.set(1))
        };
        entered_rx.recv().unwrap();
        let second = {
            let cell = cell.clone();
            std::thread::spawn(move || cell.set(2))
        };
        release_tx.send(()).unwrap();
        producer.join().unwrap();
        second.join().unwrap();

        assert_eq!(cell.get(), 2);
        assert_eq!(seen.lock().unwrap().last(), Some(&2));
    }

    #[test]
    fn test_drop_subscription_stops_delivery() {
        let cell = StateCell::new(0);
        let (seen, callback) = recorder::<i32>();
        let sub = cell.observe(callback);
        assert_eq!(cell.observer_count(), 1);

        cell.set(1);
        drop(sub);
        cell.set(2);

        assert_eq!(cell.observer_count(), 0);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_unsubscribe_only_removes_own_observer() {
        let cell = StateCell::new(0);
        let (first, callback) = recorder::<i32>();
        let sub_first = cell.observe(callback);
        let (second, callback) = recorder::<i32>();
        let _sub_second = cell.observe(callback);

        sub_first.unsubscribe();
        cell.set(5);

        assert_eq!(*first.lock().unwrap(), vec![0]);
        assert_eq!(*second.lock().unwrap(), vec![0, 5]);
    }

    #[test]
    fn test_subscription_outliving_cell_is_harmless() {
        let cell = StateCell::new(0);
        let (_seen, callback) = recorder::<i32>();
        let sub = cell.observe(callback);
        drop(cell);
        drop(sub);
    }

    #[test]
    fn test_concurrent_unsubscribe_and_delivery() {
        let cell = Arc::new(StateCell::new(0u32));
        let mut subs = Vec::new();
        for _ in 0..8 {
            let (_seen, callback) = recorder::<u32>();
            subs.push(cell.observe(callback));
        }

        let producer = {
            let cell = cell.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    cell.set(i);
                }
            })
        };
        for sub in subs {
            sub.unsubscribe();
        }
        producer.join().unwrap();

        assert_eq!(cell.observer_count(), 0);
        assert_eq!(cell.get(), 199);
    }

    #[test]
    fn test_watch_receiver_sees_latest() {
        let cell = StateCell::new(1);
        let mut rx = cell.watch();
        assert_eq!(*rx.borrow(), 1);

        cell.set(7);
        tokio_test::block_on(async {
            rx.changed().await.unwrap();
        });
        assert_eq!(*rx.borrow_and_update(), 7);
    }
}
