//! Price Stream Client - Live Feed with Reconnect and Polling Fallback
//!
//! Owns one streaming connection to the price server and hands every
//! update to the presentation callback. Lifecycle:
//!
//! 1. Connect at startup. If the very first attempt fails the stream is
//!    considered unavailable and the client goes straight to polling.
//! 2. On open: reset the retry ladder and subscribe the current symbol.
//! 3. On close or error: retry after `base_delay * attempt` while
//!    attempts remain, otherwise fall back to polling.
//! 4. Polling is terminal for the session: one GET per interval.
//!
//! The client runs as a single tokio task. Each state is a phase that
//! owns its socket or timer locally, so leaving a phase drops them and
//! at most one transport is ever live. Callers talk to the task through
//! a `PriceStreamHandle`; no handle operation awaits the task.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::OptionFuture;
use tokio::sync::{RwLock, broadcast, mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::{MetricsRegistry, Transport};
use crate::config::FeedConfig;
use crate::domain::backoff::LinearBackoff;
use crate::domain::error::FeedError;
use crate::domain::price::{
    ConnectionState, InboundMessage, PriceUpdate, SubscriptionRequest, normalize_symbol,
};
use crate::ports::price_source::PriceSource;
use crate::ports::price_stream::{StreamConnector, StreamSession};

/// Longest payload excerpt written to the log for a dropped message.
const LOG_EXCERPT_LEN: usize = 120;

/// Runtime settings for the price client.
#[derive(Debug, Clone)]
pub struct PriceStreamConfig {
    /// Streaming endpoint.
    pub ws_url: String,
    /// Symbol subscribed on connect until changed.
    pub default_symbol: String,
    /// Retries before falling back to polling.
    pub max_reconnect_attempts: u32,
    /// Linear backoff unit.
    pub reconnect_base_delay: Duration,
    /// Polling fallback period.
    pub poll_interval: Duration,
    /// Limit on a single connect attempt.
    pub connect_timeout: Duration,
}

impl Default for PriceStreamConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000/ws/price".to_string(),
            default_symbol: "btcusdt".to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(1000),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&FeedConfig> for PriceStreamConfig {
    fn from(feed: &FeedConfig) -> Self {
        Self {
            ws_url: feed.ws_url.clone(),
            default_symbol: feed.default_symbol.clone(),
            max_reconnect_attempts: feed.max_reconnect_attempts,
            reconnect_base_delay: Duration::from_millis(feed.reconnect_base_delay_ms),
            poll_interval: Duration::from_millis(feed.poll_interval_ms),
            connect_timeout: Duration::from_millis(feed.connect_timeout_ms),
        }
    }
}

type UpdateCallback = Box<dyn FnMut(&PriceUpdate) + Send>;
type PollFuture = Pin<Box<dyn Future<Output = Result<PriceUpdate, FeedError>> + Send>>;
type StatusCallback = Box<dyn FnMut(ConnectionState) + Send>;

/// Requests from handles to the client task.
#[derive(Debug)]
enum Command {
    Subscribe(String),
    SelectSymbol(String),
    Reconnect,
    Shutdown,
}

/// What a command means for a phase without an open stream.
enum Directive {
    Stay,
    Reconnect,
    Stop,
}

/// The state the task is about to enter, with the resources it owns.
enum Phase {
    Connecting { initial: bool },
    Connected(Box<dyn StreamSession>),
    Backoff(Duration),
    Polling,
    Stopped,
}

/// Everything the task listens to besides its own transport.
struct Inbox {
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: broadcast::Receiver<()>,
}

/// Live price client.
///
/// Construct it with its transport and polling ports, register the
/// presentation hooks, then `spawn` it.
pub struct PriceStreamClient {
    /// Runtime settings.
    config: PriceStreamConfig,
    /// Opens streaming sessions.
    connector: Arc<dyn StreamConnector>,
    /// Polling fallback.
    source: Arc<dyn PriceSource>,
    /// Retry ladder; reset on every successful open.
    backoff: LinearBackoff,
    /// Authoritative connection state. Only the task mutates it.
    state: ConnectionState,
    /// Symbol used for the next subscription and for polling.
    symbol: String,
    /// Presentation hook.
    on_update: Option<UpdateCallback>,
    /// Connection indicator hook.
    on_status: Option<StatusCallback>,
    /// Read-only copies of `state` for handles and health probes.
    state_tx: watch::Sender<ConnectionState>,
    /// Fan-out of delivered updates for other consumers.
    update_tx: broadcast::Sender<PriceUpdate>,
    /// Last price per symbol.
    prices: Arc<RwLock<HashMap<String, f64>>>,
    /// Optional Prometheus accounting.
    metrics: Option<Arc<MetricsRegistry>>,
}

impl PriceStreamClient {
    /// Create a client; nothing connects until `spawn`.
    pub fn new(
        config: PriceStreamConfig,
        connector: Arc<dyn StreamConnector>,
        source: Arc<dyn PriceSource>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (update_tx, _) = broadcast::channel(1024);
        let symbol =
            normalize_symbol(&config.default_symbol).unwrap_or_else(|| "btcusdt".to_string());
        let backoff = LinearBackoff::new(config.reconnect_base_delay, config.max_reconnect_attempts);

        Self {
            config,
            connector,
            source,
            backoff,
            state: ConnectionState::Disconnected,
            symbol,
            on_update: None,
            on_status: None,
            state_tx,
            update_tx,
            prices: Arc::new(RwLock::new(HashMap::new())),
            metrics: None,
        }
    }

    /// Register the presentation hook, called once per delivered update.
    #[must_use]
    pub fn on_update<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&PriceUpdate) + Send + 'static,
    {
        self.on_update = Some(Box::new(callback));
        self
    }

    /// Register the connection indicator hook, called on every state change.
    #[must_use]
    pub fn on_status<F>(mut self, callback: F) -> Self
    where
        F: FnMut(ConnectionState) + Send + 'static,
    {
        self.on_status = Some(Box::new(callback));
        self
    }

    /// Attach Prometheus metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Receiver of every delivered update, for consumers besides the display.
    pub fn update_stream(&self) -> broadcast::Receiver<PriceUpdate> {
        self.update_tx.subscribe()
    }

    /// Read-only view of the connection state.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Start the client task. The first connect attempt begins immediately.
    pub fn spawn(self, shutdown_rx: broadcast::Receiver<()>) -> PriceStreamHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state_rx = self.state_tx.subscribe();
        let prices = Arc::clone(&self.prices);

        let inbox = Inbox {
            commands: command_rx,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(self.run(inbox));

        PriceStreamHandle {
            commands: command_tx,
            state_rx,
            prices,
            task,
        }
    }

    #[instrument(skip_all, name = "price_stream")]
    async fn run(mut self, mut inbox: Inbox) {
        info!(
            url = %self.config.ws_url,
            symbol = %self.symbol,
            max_attempts = self.config.max_reconnect_attempts,
            "Price stream client starting"
        );

        let mut phase = Phase::Connecting { initial: true };
        loop {
            phase = match phase {
                Phase::Connecting { initial } => self.connect(initial, &mut inbox).await,
                Phase::Connected(session) => self.stream(session, &mut inbox).await,
                Phase::Backoff(delay) => self.wait_backoff(delay, &mut inbox).await,
                Phase::Polling => self.poll(&mut inbox).await,
                Phase::Stopped => break,
            };
        }

        self.set_state(ConnectionState::Disconnected);
        info!("Price stream client stopped");
    }

    // ── Phases ──────────────────────────────────────────────

    /// One connect attempt. Only the startup attempt may skip the ladder.
    async fn connect(&mut self, initial: bool, inbox: &mut Inbox) -> Phase {
        self.set_state(ConnectionState::Connecting);

        let connector = Arc::clone(&self.connector);
        let url = self.config.ws_url.clone();
        let attempt = time::timeout(self.config.connect_timeout, async move {
            connector.connect(&url).await
        });
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                biased;
                _ = inbox.shutdown.recv() => return Phase::Stopped,
                command = inbox.commands.recv() => {
                    if let Directive::Stop = self.handle_offline_command(command) {
                        return Phase::Stopped;
                    }
                }
                result = &mut attempt => {
                    let outcome = result.unwrap_or_else(|_| {
                        Err(FeedError::TransportUnavailable(format!(
                            "connect timed out after {:?}",
                            self.config.connect_timeout
                        )))
                    });

                    return match outcome {
                        Ok(session) => self.on_open(session).await,
                        Err(e) if initial => {
                            warn!(error = %e, "Price stream unavailable, falling back to polling");
                            Phase::Polling
                        }
                        Err(e) => {
                            warn!(error = %e, "Reconnect attempt failed");
                            self.on_close()
                        }
                    };
                }
            }
        }
    }

    /// Pump an open stream until it closes or the client stops.
    async fn stream(&mut self, mut session: Box<dyn StreamSession>, inbox: &mut Inbox) -> Phase {
        loop {
            tokio::select! {
                biased;
                _ = inbox.shutdown.recv() => {
                    session.close().await;
                    return Phase::Stopped;
                }
                command = inbox.commands.recv() => match command {
                    None | Some(Command::Shutdown) => {
                        session.close().await;
                        return Phase::Stopped;
                    }
                    Some(Command::Subscribe(symbol)) => {
                        let request = SubscriptionRequest::subscribe(symbol.clone());
                        if let Err(e) = session.send_text(request.to_json()).await {
                            warn!(error = %e, symbol = %symbol, "Subscription write failed");
                            return self.on_close();
                        }
                        info!(symbol = %symbol, "Subscribed to price updates");
                        self.symbol = symbol;
                    }
                    Some(Command::SelectSymbol(symbol)) => self.symbol = symbol,
                    Some(Command::Reconnect) => debug!("Stream already open, reconnect ignored"),
                },
                frame = session.recv_text() => match frame {
                    Ok(Some(text)) => self.handle_frame(&text).await,
                    Ok(None) => {
                        info!("Price stream closed by server");
                        return self.on_close();
                    }
                    Err(e) => {
                        warn!(error = %e, "Price stream failed");
                        return self.on_close();
                    }
                },
            }
        }
    }

    /// Wait out one backoff delay; an explicit reconnect cuts it short.
    async fn wait_backoff(&mut self, delay: Duration, inbox: &mut Inbox) -> Phase {
        let retry = time::sleep(delay);
        tokio::pin!(retry);

        loop {
            tokio::select! {
                biased;
                _ = inbox.shutdown.recv() => return Phase::Stopped,
                command = inbox.commands.recv() => match self.handle_offline_command(command) {
                    Directive::Stop => return Phase::Stopped,
                    Directive::Reconnect => {
                        info!("Explicit reconnect, skipping backoff delay");
                        return Phase::Connecting { initial: false };
                    }
                    Directive::Stay => {}
                },
                () = &mut retry => return Phase::Connecting { initial: false },
            }
        }
    }

    /// Fixed-interval polling. Never leads back to streaming.
    ///
    /// At most one request is in flight. It stays in the select set, so
    /// shutdown and commands are not held up by a slow server.
    async fn poll(&mut self, inbox: &mut Inbox) -> Phase {
        self.set_state(ConnectionState::Polling);

        // interval() panics on a zero period
        let period = self.config.poll_interval.max(Duration::from_millis(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight: Option<PollFuture> = None;

        info!(interval = ?period, symbol = %self.symbol, "Polling fallback active");

        loop {
            tokio::select! {
                biased;
                _ = inbox.shutdown.recv() => return Phase::Stopped,
                command = inbox.commands.recv() => match self.handle_offline_command(command) {
                    Directive::Stop => return Phase::Stopped,
                    Directive::Reconnect => {
                        warn!("Streaming abandoned for this session, reconnect ignored");
                    }
                    Directive::Stay => {}
                },
                Some(result) = OptionFuture::from(in_flight.as_mut()) => {
                    in_flight = None;
                    self.on_poll_result(result).await;
                }
                _ = ticker.tick() => {
                    if in_flight.is_some() {
                        debug!(symbol = %self.symbol, "Previous poll still in flight, tick skipped");
                    } else {
                        in_flight = Some(self.start_poll());
                    }
                }
            }
        }
    }

    // ── Event handlers ──────────────────────────────────────

    /// Transport opened: reset the ladder and subscribe the current symbol.
    async fn on_open(&mut self, mut session: Box<dyn StreamSession>) -> Phase {
        self.backoff.reset();
        self.set_state(ConnectionState::Connected);

        let request = SubscriptionRequest::subscribe(self.symbol.clone());
        match session.send_text(request.to_json()).await {
            Ok(()) => {
                info!(symbol = %self.symbol, "Subscribed to price updates");
                Phase::Connected(session)
            }
            Err(e) => {
                warn!(error = %e, "Initial subscription write failed");
                self.on_close()
            }
        }
    }

    /// Transport closed or failed: next ladder rung, or polling.
    fn on_close(&mut self) -> Phase {
        self.set_state(ConnectionState::Disconnected);

        match self.backoff.next_delay() {
            Some(delay) => {
                if let Some(metrics) = &self.metrics {
                    metrics.reconnect_attempts.inc();
                }
                info!(
                    attempt = self.backoff.attempts(),
                    max_attempts = self.backoff.max_attempts(),
                    delay = ?delay,
                    "Scheduling reconnect"
                );
                Phase::Backoff(delay)
            }
            None => {
                warn!(
                    max_attempts = self.backoff.max_attempts(),
                    "Max reconnect attempts reached, falling back to polling"
                );
                Phase::Polling
            }
        }
    }

    /// Decode one stream frame. Bad frames are dropped; the stream stays up.
    async fn handle_frame(&mut self, text: &str) {
        match InboundMessage::parse(text) {
            Ok(InboundMessage::Price(update)) => self.deliver(update, Transport::Stream).await,
            Ok(InboundMessage::Heartbeat) => debug!("Heartbeat received"),
            Err(e) => {
                warn!(error = %e, payload = %excerpt(text), "Dropping malformed price message");
                if let Some(metrics) = &self.metrics {
                    metrics.record_malformed(Transport::Stream);
                }
            }
        }
    }

    /// Request the current symbol's price. The future owns what it needs.
    fn start_poll(&self) -> PollFuture {
        let source = Arc::clone(&self.source);
        let symbol = self.symbol.clone();
        Box::pin(async move { source.fetch_price(&symbol).await })
    }

    /// Outcome of one poll. Failures are logged; the next tick is unaffected.
    async fn on_poll_result(&mut self, result: Result<PriceUpdate, FeedError>) {
        match result {
            Ok(update) => self.deliver(update, Transport::Polling).await,
            Err(e) => {
                warn!(error = %e, symbol = %self.symbol, "Fallback polling failed");
                if let Some(metrics) = &self.metrics {
                    metrics.poll_failures.inc();
                }
            }
        }
    }

    /// Hand an update to the cache, metrics, presentation hook and fan-out.
    async fn deliver(&mut self, update: PriceUpdate, transport: Transport) {
        debug!(
            symbol = %update.symbol,
            price = update.price,
            transport = transport.as_label(),
            "Price update"
        );

        self.prices
            .write()
            .await
            .insert(update.symbol.clone(), update.price);

        if let Some(metrics) = &self.metrics {
            metrics.record_update(transport, &update);
        }

        if let Some(callback) = self.on_update.as_mut() {
            callback(&update);
        }

        // Ignore if no receivers
        let _ = self.update_tx.send(update);
    }

    /// Commands while no stream is open. Subscriptions are skipped.
    fn handle_offline_command(&mut self, command: Option<Command>) -> Directive {
        match command {
            None | Some(Command::Shutdown) => Directive::Stop,
            Some(Command::Subscribe(symbol)) => {
                debug!(symbol = %symbol, state = ?self.state, "Not connected, subscription skipped");
                Directive::Stay
            }
            Some(Command::SelectSymbol(symbol)) => {
                debug!(symbol = %symbol, "Symbol selected");
                self.symbol = symbol;
                Directive::Stay
            }
            Some(Command::Reconnect) => Directive::Reconnect,
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }

        info!(from = ?self.state, to = ?next, "Connection state changed");
        self.state = next;
        self.state_tx.send_replace(next);

        if let Some(metrics) = &self.metrics {
            metrics.record_state(next);
        }
        if let Some(callback) = self.on_status.as_mut() {
            callback(next);
        }
    }
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(LOG_EXCERPT_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Caller-side handle to a running `PriceStreamClient`.
///
/// Every operation is non-blocking: requests are queued to the client
/// task and applied according to its state at that moment.
pub struct PriceStreamHandle {
    commands: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    prices: Arc<RwLock<HashMap<String, f64>>>,
    task: JoinHandle<()>,
}

impl PriceStreamHandle {
    /// Ask the server to stream `symbol`.
    ///
    /// Sent only if the stream is open when the task handles the request;
    /// skipped silently otherwise. Delivery is never confirmed.
    pub fn subscribe(&self, symbol: &str) {
        self.send_symbol(symbol, Command::Subscribe);
    }

    /// Change the symbol used by the next subscription and by polling,
    /// without writing to the transport.
    pub fn select_symbol(&self, symbol: &str) {
        self.send_symbol(symbol, Command::SelectSymbol);
    }

    /// Skip a pending backoff delay and connect now.
    ///
    /// No effect while connecting, connected or polling.
    pub fn reconnect(&self) {
        self.send(Command::Reconnect);
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Last price delivered for `symbol`, from either transport.
    pub async fn last_price(&self, symbol: &str) -> Option<f64> {
        let key = normalize_symbol(symbol)?;
        self.prices.read().await.get(&key).copied()
    }

    /// Whether the client task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the client and wait for its task to exit.
    ///
    /// # Errors
    /// Returns the join error if the task panicked.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.send(Command::Shutdown);
        self.task.await
    }

    fn send_symbol(&self, symbol: &str, command: fn(String) -> Command) {
        match normalize_symbol(symbol) {
            Some(symbol) => self.send(command(symbol)),
            None => warn!("Ignoring empty symbol"),
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Price stream client already stopped");
        }
    }
}
