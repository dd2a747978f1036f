//! Listener registry and event delivery
//!
//! Samplers publish into one `watch` slot per event kind. A single delivery
//! task forwards the latest value of each slot to the subscribers, so
//! callbacks never run on a sampling task and a slow subscriber skips
//! intermediate values instead of building a backlog.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::application::ports::{
    ListenerKind, MeteringListener, PlaybackListener, RecordingListener, Subscription,
};
use crate::domain::progress::{MeteringInfo, PlaybackProgress, RecordingProgress};

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Channel<E> {
    kind: ListenerKind,
    subscribers: Mutex<Vec<(u64, Listener<E>)>>,
    latest: watch::Sender<Option<E>>,
}

impl<E: Clone> Channel<E> {
    fn new(kind: ListenerKind) -> (Arc<Self>, watch::Receiver<Option<E>>) {
        let (latest, rx) = watch::channel(None);
        let channel = Self {
            kind,
            subscribers: Mutex::new(Vec::new()),
            latest,
        };
        (Arc::new(channel), rx)
    }

    fn subscribe(&self, id: u64, listener: Listener<E>) {
        self.subscribers.lock().push((id, listener));
    }

    fn unsubscribe(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    fn clear(&self) {
        self.subscribers.lock().clear();
    }

    fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn publish(&self, event: E) {
        self.latest.send_replace(Some(event));
    }

    /// Hand the latest event to every subscriber. The subscriber list is
    /// copied first so callbacks may (un)subscribe.
    fn deliver(&self, rx: &mut watch::Receiver<Option<E>>) {
        let Some(event) = rx.borrow_and_update().clone() else {
            return;
        };
        let listeners: Vec<Listener<E>> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                warn!(kind = ?self.kind, "Listener panicked; event dropped for it");
            }
        }
    }
}

/// Multi-subscriber listener registry.
pub struct ListenerHub {
    next_id: AtomicU64,
    recording: Arc<Channel<RecordingProgress>>,
    playback: Arc<Channel<PlaybackProgress>>,
    metering: Arc<Channel<MeteringInfo>>,
    delivery: JoinHandle<()>,
}

impl ListenerHub {
    /// Create the registry; callbacks run on a task spawned on `runtime`.
    pub fn new(runtime: &Handle) -> Self {
        let (recording, recording_rx) = Channel::new(ListenerKind::Recording);
        let (playback, playback_rx) = Channel::new(ListenerKind::Playback);
        let (metering, metering_rx) = Channel::new(ListenerKind::Metering);

        let delivery = runtime.spawn(deliver_events(
            (Arc::clone(&recording), recording_rx),
            (Arc::clone(&playback), playback_rx),
            (Arc::clone(&metering), metering_rx),
        ));

        Self {
            next_id: AtomicU64::new(1),
            recording,
            playback,
            metering,
            delivery,
        }
    }

    fn next_subscription(&self, kind: ListenerKind) -> Subscription {
        Subscription::new(self.next_id.fetch_add(1, Ordering::Relaxed), kind)
    }

    pub fn add_recording(&self, listener: RecordingListener) -> Subscription {
        let subscription = self.next_subscription(ListenerKind::Recording);
        self.recording.subscribe(subscription.id(), listener);
        subscription
    }

    pub fn add_playback(&self, listener: PlaybackListener) -> Subscription {
        let subscription = self.next_subscription(ListenerKind::Playback);
        self.playback.subscribe(subscription.id(), listener);
        subscription
    }

    pub fn add_metering(&self, listener: MeteringListener) -> Subscription {
        let subscription = self.next_subscription(ListenerKind::Metering);
        self.metering.subscribe(subscription.id(), listener);
        subscription
    }

    pub fn remove(&self, subscription: Subscription) -> bool {
        match subscription.kind() {
            ListenerKind::Recording => self.recording.unsubscribe(subscription.id()),
            ListenerKind::Playback => self.playback.unsubscribe(subscription.id()),
            ListenerKind::Metering => self.metering.unsubscribe(subscription.id()),
        }
    }

    pub fn clear(&self) {
        self.recording.clear();
        self.playback.clear();
        self.metering.clear();
    }

    pub fn count(&self, kind: ListenerKind) -> usize {
        match kind {
            ListenerKind::Recording => self.recording.len(),
            ListenerKind::Playback => self.playback.len(),
            ListenerKind::Metering => self.metering.len(),
        }
    }

    pub fn publish_recording(&self, event: RecordingProgress) {
        self.recording.publish(event);
    }

    pub fn publish_playback(&self, event: PlaybackProgress) {
        self.playback.publish(event);
    }

    pub fn publish_metering(&self, event: MeteringInfo) {
        self.metering.publish(event);
    }
}

impl Drop for ListenerHub {
    fn drop(&mut self) {
        self.delivery.abort();
    }
}

type Feed<E> = (Arc<Channel<E>>, watch::Receiver<Option<E>>);

async fn deliver_events(
    (recording, mut recording_rx): Feed<RecordingProgress>,
    (playback, mut playback_rx): Feed<PlaybackProgress>,
    (metering, mut metering_rx): Feed<MeteringInfo>,
) {
    loop {
        tokio::select! {
            changed = recording_rx.changed() => {
                if changed.is_err() { break; }
                recording.deliver(&mut recording_rx);
            }
            changed = playback_rx.changed() => {
                if changed.is_err() { break; }
                playback.deliver(&mut playback_rx);
            }
            changed = metering_rx.changed() => {
                if changed.is_err() { break; }
                metering.deliver(&mut metering_rx);
            }
        }
    }
    trace!("Listener delivery finished");
}
