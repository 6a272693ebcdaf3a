use crate::core::kernel::codec::{Route, WsCodec};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tracing::{trace, warn};

/// What happened to one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Queued on the topic's channel
    Delivered(String),
    /// Queued on the fallback channel
    Fallback,
    /// Channel full or gone, frame discarded
    Dropped,
    Ignored,
    Malformed,
}

struct TopicRoute {
    sender: mpsc::Sender<Message>,
    dropped: Arc<AtomicU64>,
}

/// Fans inbound frames out to bounded per-topic channels
///
/// The reader task is the only caller of [`dispatch`](Self::dispatch), which
/// never awaits channel capacity: a full channel drops the newest frame.
/// Frames without a routing key, or for a topic nobody registered, go to a
/// bounded fallback channel under the same policy.
pub struct Dispatcher<C: WsCodec> {
    codec: Arc<C>,
    capacity: usize,
    routes: RwLock<HashMap<String, TopicRoute>>,
    fallback: Mutex<Option<mpsc::Sender<Message>>>,
    fallback_dropped: AtomicU64,
}

impl<C: WsCodec> Dispatcher<C> {
    /// Create a dispatcher and the read end of its fallback channel
    pub fn new(codec: Arc<C>, capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let dispatcher = Self {
            codec,
            capacity,
            routes: RwLock::new(HashMap::new()),
            fallback: Mutex::new(Some(tx)),
            fallback_dropped: AtomicU64::new(0),
        };
        (dispatcher, rx)
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Open a channel for `topic`, replacing (and closing) any previous one
    pub async fn register(&self, topic: &str) -> mpsc::Receiver<Message> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let route = TopicRoute {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        self.routes.write().await.insert(topic.to_string(), route);
        receiver
    }

    /// Close the channel for `topic`
    pub async fn remove(&self, topic: &str) -> bool {
        self.routes.write().await.remove(topic).is_some()
    }

    /// Close every channel, fallback included
    pub async fn close_all(&self) {
        self.routes.write().await.clear();
        self.fallback.lock().await.take();
    }

    pub async fn is_registered(&self, topic: &str) -> bool {
        self.routes.read().await.contains_key(topic)
    }

    /// Frames dropped for `topic` since it was registered
    pub async fn dropped(&self, topic: &str) -> u64 {
        self.routes
            .read()
            .await
            .get(topic)
            .map_or(0, |route| route.dropped.load(Ordering::Relaxed))
    }

    pub fn fallback_dropped(&self) -> u64 {
        self.fallback_dropped.load(Ordering::Relaxed)
    }

    pub async fn dispatch(&self, frame: Message) -> Dispatched {
        let topic = match self.codec.route(&frame) {
            Ok(Route::Topic(topic)) => topic,
            Ok(Route::Unrouted) => return self.to_fallback(frame).await,
            Ok(Route::Ignore) => return Dispatched::Ignored,
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                return Dispatched::Malformed;
            }
        };

        let routes = self.routes.read().await;
        let Some(route) = routes.get(&topic) else {
            drop(routes);
            trace!(topic = %topic, "no channel registered");
            return self.to_fallback(frame).await;
        };

        match route.sender.try_send(frame) {
            Ok(()) => Dispatched::Delivered(topic),
            Err(TrySendError::Full(_)) => {
                let dropped = route.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(topic = %topic, dropped, "Topic channel full, dropping frame");
                Dispatched::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                trace!(topic = %topic, "consumer gone, dropping frame");
                Dispatched::Dropped
            }
        }
    }

    async fn to_fallback(&self, frame: Message) -> Dispatched {
        let fallback = self.fallback.lock().await;
        let Some(sender) = fallback.as_ref() else {
            return Dispatched::Dropped;
        };
        match sender.try_send(frame) {
            Ok(()) => Dispatched::Fallback,
            Err(TrySendError::Full(_)) => {
                let dropped = self.fallback_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(dropped, "Fallback channel full, dropping frame");
                Dispatched::Dropped
            }
            Err(TrySendError::Closed(_)) => Dispatched::Dropped,
        }
    }
}
