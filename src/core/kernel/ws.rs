use crate::core::errors::ExchangeError;
use crate::core::kernel::backoff::Backoff;
use crate::core::kernel::codec::WsCodec;
use crate::core::kernel::connection::{Connection, Heartbeat, WsConfig};
use crate::core::kernel::dispatcher::Dispatcher;
use crate::core::kernel::registry::SubscriptionRegistry;
use crate::core::types::ConnectionState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// A WebSocket session that survives connection loss
///
/// Owns at most one live [`Connection`] at a time. A single supervisor task
/// reads frames into the [`Dispatcher`] and, when the connection fails,
/// redials with exponential backoff and replays every registered
/// subscription once, in registration order. Consumers see gaps, never
/// errors; when reconnecting is given up every channel is closed.
///
/// Handles are cheap to clone. Background tasks run until [`close`] is
/// called or the reconnect budget runs out.
///
/// [`close`]: ResilientStream::close
pub struct ResilientStream<C: WsCodec> {
    inner: Arc<Inner<C>>,
}

impl<C: WsCodec> Clone for ResilientStream<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: WsCodec> std::fmt::Debug for ResilientStream<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientStream")
            .field("exchange", &self.inner.exchange_name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct Inner<C: WsCodec> {
    exchange_name: String,
    config: WsConfig,
    codec: Arc<C>,
    state: watch::Sender<ConnectionState>,
    connection: RwLock<Option<Arc<Connection>>>,
    registry: Mutex<SubscriptionRegistry>,
    dispatcher: Dispatcher<C>,
    fallback: Mutex<mpsc::Receiver<Message>>,
    cancel: CancellationToken,
    started: AtomicBool,
    closed: AtomicBool,
}

impl<C: WsCodec> ResilientStream<C> {
    pub fn new(exchange_name: impl Into<String>, codec: C, config: WsConfig) -> Self {
        let codec = Arc::new(codec);
        let (dispatcher, fallback) = Dispatcher::new(Arc::clone(&codec), config.channel_capacity);
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                exchange_name: exchange_name.into(),
                config,
                codec,
                state,
                connection: RwLock::new(None),
                registry: Mutex::new(SubscriptionRegistry::new()),
                dispatcher,
                fallback: Mutex::new(fallback),
                cancel: CancellationToken::new(),
                started: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn exchange_name(&self) -> &str {
        &self.inner.exchange_name
    }

    pub fn codec(&self) -> &C {
        &self.inner.codec
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every state transition
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Dial `url` and start the supervisor
    ///
    /// A failed first dial is not an error: the stream moves to
    /// `Reconnecting` and keeps trying per the reconnect policy. Calling
    /// `connect` on a started stream is a no-op.
    #[instrument(skip(self), fields(exchange = %self.inner.exchange_name))]
    pub async fn connect(&self, url: &str) -> Result<(), ExchangeError> {
        self.inner.ensure_open()?;
        url.into_client_request()?;

        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!("already started");
            return Ok(());
        }

        self.inner.set_state(ConnectionState::Connecting);
        let current = match self.inner.establish(url).await {
            Ok(connection) => Some(connection),
            Err(ExchangeError::Closed) => return Err(ExchangeError::Closed),
            Err(e) => {
                warn!("Initial connect failed: {}", e);
                self.inner.set_state(ConnectionState::Reconnecting);
                None
            }
        };

        let inner = Arc::clone(&self.inner);
        let url = url.to_string();
        tokio::spawn(async move { inner.supervise(url, current).await });
        Ok(())
    }

    /// Register `topic` and send its subscribe frame
    ///
    /// The frame goes out immediately when connected and is replayed after
    /// every reconnect. Subscribing again to the same topic replaces the
    /// stored frame and the returned channel.
    #[instrument(skip(self, payload), fields(exchange = %self.inner.exchange_name, topic = %topic))]
    pub async fn subscribe(
        &self,
        topic: &str,
        payload: Message,
    ) -> Result<mpsc::Receiver<Message>, ExchangeError> {
        self.inner.ensure_open()?;
        let mut registry = self.inner.registry.lock().await;
        self.inner.ensure_open()?;

        let receiver = self.inner.dispatcher.register(topic).await;
        registry.upsert(topic, payload.clone());

        if let Some(connection) = self.inner.live_connection().await {
            if let Err(e) = connection.write(payload).await {
                debug!("Subscribe send failed, will replay on reconnect: {}", e);
            }
        }
        Ok(receiver)
    }

    /// Subscribe with the codec's own subscribe frame
    pub async fn subscribe_topic(
        &self,
        topic: &str,
    ) -> Result<mpsc::Receiver<Message>, ExchangeError> {
        let payload = self.inner.codec.encode_subscription(topic)?;
        self.subscribe(topic, payload).await
    }

    /// Forget `topic`, close its channel and tell the venue
    ///
    /// Without an explicit payload the codec's unsubscribe frame is used.
    #[instrument(skip(self, payload), fields(exchange = %self.inner.exchange_name, topic = %topic))]
    pub async fn unsubscribe(
        &self,
        topic: &str,
        payload: Option<Message>,
    ) -> Result<(), ExchangeError> {
        self.inner.ensure_open()?;
        let payload = match payload {
            Some(payload) => payload,
            None => self.inner.codec.encode_unsubscription(topic)?,
        };

        let mut registry = self.inner.registry.lock().await;
        registry.remove(topic);
        self.inner.dispatcher.remove(topic).await;

        match self.inner.live_connection().await {
            Some(connection) => connection.write(payload).await,
            None => Ok(()),
        }
    }

    /// Send an ad hoc frame on the live connection
    pub async fn send(&self, message: Message) -> Result<(), ExchangeError> {
        self.inner.ensure_open()?;
        let connection = self.inner.live_connection().await.ok_or_else(|| {
            ExchangeError::TransportError("WebSocket not connected".to_string())
        })?;
        connection.write(message).await
    }

    /// Next frame that no topic channel claimed
    pub async fn read(&self) -> Result<Message, ExchangeError> {
        self.inner
            .fallback
            .lock()
            .await
            .recv()
            .await
            .ok_or(ExchangeError::Closed)
    }

    /// Drop the live connection and let the supervisor redial
    #[instrument(skip(self), fields(exchange = %self.inner.exchange_name))]
    pub async fn reconnect(&self) -> Result<(), ExchangeError> {
        self.inner.ensure_open()?;
        if let Some(connection) = self.inner.connection.read().await.as_ref() {
            info!("Forcing reconnect");
            connection.abort();
        }
        Ok(())
    }

    /// Stop all background work and close every channel
    ///
    /// Idempotent and safe to call concurrently or during a dial. Does not
    /// wait for the background tasks to finish.
    #[instrument(skip(self), fields(exchange = %self.inner.exchange_name))]
    pub async fn close(&self) {
        self.inner.shutdown().await;
    }

    pub async fn subscriptions(&self) -> Vec<String> {
        self.inner.registry.lock().await.topics()
    }

    /// Frames dropped for `topic` because its consumer fell behind
    pub async fn dropped(&self, topic: &str) -> u64 {
        self.inner.dispatcher.dropped(topic).await
    }
}

impl<C: WsCodec> Inner<C> {
    fn ensure_open(&self) -> Result<(), ExchangeError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ExchangeError::Closed)
        } else {
            Ok(())
        }
    }

    /// Closed is terminal; nothing moves the stream out of it
    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if current.is_closed() || *current == next {
                false
            } else {
                debug!(from = %current, to = %next, "state change");
                *current = next;
                true
            }
        });
    }

    async fn live_connection(&self) -> Option<Arc<Connection>> {
        self.connection
            .read()
            .await
            .as_ref()
            .filter(|c| !c.is_aborted())
            .cloned()
    }

    /// Dial, replay the registry and publish the connection
    ///
    /// The registry lock is held from replay until the connection is
    /// published, so a concurrent `subscribe` is sent either by the replay or
    /// directly, never both.
    async fn establish(&self, url: &str) -> Result<Arc<Connection>, ExchangeError> {
        let connection = tokio::select! {
            () = self.cancel.cancelled() => return Err(ExchangeError::Closed),
            dialed = Connection::dial(url, &self.config) => Arc::new(dialed?),
        };

        let registry = self.registry.lock().await;
        if let Err(e) = registry.replay(&connection).await {
            connection.abort();
            return Err(e);
        }
        *self.connection.write().await = Some(Arc::clone(&connection));
        drop(registry);

        if self.cancel.is_cancelled() {
            connection.close().await;
            return Err(ExchangeError::Closed);
        }
        self.set_state(ConnectionState::Connected);
        info!(url = %url, "connected");
        Ok(connection)
    }

    async fn supervise(self: Arc<Self>, url: String, mut current: Option<Arc<Connection>>) {
        let mut backoff = Backoff::new(
            Duration::from_millis(self.config.reconnect_delay_ms),
            Duration::from_millis(self.config.reconnect_delay_max_ms),
        )
        .with_jitter(Duration::from_millis(self.config.reconnect_jitter_ms));
        let mut attempts: u32 = 0;

        loop {
            if let Some(connection) = current.take() {
                backoff.reset();
                attempts = 0;

                let keep_alive = self.cancel.child_token();
                self.spawn_keep_alive(Arc::clone(&connection), keep_alive.clone());

                let failure = loop {
                    let frame = tokio::select! {
                        () = self.cancel.cancelled() => return,
                        frame = connection.read_next() => frame,
                    };
                    match frame {
                        Ok(frame) => {
                            self.dispatcher.dispatch(frame).await;
                        }
                        Err(e) => break e,
                    }
                };
                keep_alive.cancel();
                connection.abort();
                if self.cancel.is_cancelled() {
                    return;
                }

                warn!(exchange = %self.exchange_name, "Connection lost: {}", failure);
                self.connection.write().await.take();
                self.set_state(ConnectionState::Reconnecting);
            }

            if let Some(max) = self.config.max_reconnect_attempts {
                if attempts >= max {
                    error!(
                        exchange = %self.exchange_name,
                        "Max reconnection attempts ({}) exceeded, closing stream", max
                    );
                    self.shutdown().await;
                    return;
                }
            }

            let delay = backoff.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "backing off");
            tokio::select! {
                () = self.cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }

            attempts += 1;
            match self.establish(&url).await {
                Ok(connection) => current = Some(connection),
                Err(ExchangeError::Closed) => return,
                Err(e) => warn!(
                    exchange = %self.exchange_name,
                    attempt = attempts,
                    "Reconnect attempt failed: {}", e
                ),
            }
        }
    }

    fn spawn_keep_alive(&self, connection: Arc<Connection>, stop: CancellationToken) {
        let heartbeat = self.codec.heartbeat();
        if heartbeat == Heartbeat::Disabled || self.config.heartbeat_interval_ms == 0 {
            return;
        }
        let period = Duration::from_millis(self.config.heartbeat_interval_ms);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = connection.ping(&heartbeat).await {
                            warn!("Keep-alive failed: {}", e);
                            connection.abort();
                            break;
                        }
                    }
                }
            }
        });
    }

    async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.send_replace(ConnectionState::Closed);
        self.cancel.cancel();

        let connection = self.connection.write().await.take();
        if let Some(connection) = connection {
            connection.close().await;
        }

        // A subscribe that passed its open check holds the registry until it
        // has registered, so its channel is closed here too.
        let _registry = self.registry.lock().await;
        self.dispatcher.close_all().await;
        debug!(exchange = %self.exchange_name, "closed");
    }
}
