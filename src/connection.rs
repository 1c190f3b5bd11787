//! Connection lifecycle for the charger link
//!
//! A single `ConnectionManager` owns the socket, the write buffer and the
//! reconnect timer. Socket tasks and the timer never touch that state
//! directly: they post `LinkEvent`s which the manager handles one at a time,
//! so every transition runs to completion before the next one starts.
//!
//! Each connect attempt gets a new generation number. Events carrying an
//! older generation belong to a socket that has already been torn down and
//! are dropped.

mod link;
mod timer;


use crate::buffer::WriteBuffer;
use crate::codec::{self, PendingWrite};
use crate::commands::CommandRouter;
use crate::config::{ChargerConfig, Config};
use crate::error::{BridgeError, DecodeError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::store::{StateChange, StateStore};
use crate::telemetry::TelemetryPublisher;
use link::Link;
use std::io;
use timer::ReconnectTimer;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Something that happened to the socket or the reconnect timer
#[derive(Debug)]
pub(crate) enum LinkEvent {
    Connected { generation: u64, stream: TcpStream },
    ConnectFailed { generation: u64, error: io::Error },
    Data { generation: u64, bytes: Vec<u8> },
    Error { generation: u64, error: io::Error },
    Closed { generation: u64 },
    ReconnectTick,
}

/// Requests from the bridge handle
#[derive(Debug)]
pub(crate) enum Message {
    Command(StateChange),
    Shutdown(oneshot::Sender<()>),
}

pub struct ConnectionManager<S: StateStore> {
    charger: ChargerConfig,
    state: ConnectionState,
    generation: u64,
    connecting: Option<JoinHandle<()>>,
    link: Option<Link>,
    reconnect: Option<ReconnectTimer>,
    timers_started: u64,
    buffer: WriteBuffer,
    publisher: TelemetryPublisher<S>,
    router: CommandRouter,
    events_tx: mpsc::UnboundedSender<LinkEvent>,
    events_rx: mpsc::UnboundedReceiver<LinkEvent>,
    closed: bool,
    logger: StructuredLogger,
}

impl<S: StateStore> ConnectionManager<S> {
    pub fn new(config: &Config, store: S) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let logger = get_logger_with_context(
            LogContext::new("connection")
                .with_endpoint(format!(
                    "{}:{}",
                    config.charger.ip_address, config.charger.port
                ))
                .with_field("unit_id", config.charger.unit_id.to_string()),
        );

        Self {
            charger: config.charger.clone(),
            state: ConnectionState::Disconnected,
            generation: 0,
            connecting: None,
            link: None,
            reconnect: None,
            timers_started: 0,
            buffer: WriteBuffer::new(),
            publisher: TelemetryPublisher::new(store),
            router: CommandRouter::new(config.registers.clone()),
            events_tx,
            events_rx,
            closed: false,
            logger,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Writes waiting for the next connect
    pub fn pending_writes(&self) -> &WriteBuffer {
        &self.buffer
    }

    pub fn has_reconnect_timer(&self) -> bool {
        self.reconnect.is_some()
    }

    /// Open a socket to the configured endpoint
    ///
    /// A missing host or port is fatal and nothing is attempted. The outcome
    /// of the attempt arrives later as a `Connected` or `ConnectFailed` event.
    pub fn start(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let (host, port) = match self.charger.endpoint() {
            Ok((host, port)) => (host.to_string(), port),
            Err(e) => {
                self.logger.error(&e.to_string());
                return Err(e);
            }
        };

        self.state = ConnectionState::Connecting;
        self.generation += 1;
        let generation = self.generation;
        let events = self.events_tx.clone();

        self.logger
            .debug(&format!("Opening connection (generation {})", generation));
        if let Some(previous) = self.connecting.take() {
            previous.abort();
        }
        self.connecting = Some(tokio::spawn(async move {
            let event = match TcpStream::connect((host.as_str(), port)).await {
                Ok(stream) => LinkEvent::Connected { generation, stream },
                Err(error) => LinkEvent::ConnectFailed { generation, error },
            };
            let _ = events.send(event);
        }));
        Ok(())
    }

    pub(crate) fn handle_event(&mut self, event: LinkEvent) {
        if self.closed {
            self.logger.trace("Ignoring socket event after shutdown");
            return;
        }

        match event {
            LinkEvent::Connected { generation, stream } => {
                if generation != self.generation || self.state != ConnectionState::Connecting {
                    self.logger.debug("Dropping socket from a superseded attempt");
                    return;
                }
                self.connecting = None;
                if let Err(e) = stream.set_nodelay(true) {
                    self.logger.debug(&format!("Could not set TCP_NODELAY: {}", e));
                }
                let link = Link::spawn(stream, self.events_tx.clone(), generation);
                self.on_link_up(link);
            }
            LinkEvent::ConnectFailed { generation, error } => {
                if generation == self.generation {
                    self.connecting = None;
                    self.on_transport_error(&error);
                }
            }
            LinkEvent::Data { generation, bytes } => {
                if generation == self.generation && self.is_connected() {
                    self.on_data(&bytes);
                }
            }
            LinkEvent::Error { generation, error } => {
                if generation == self.generation {
                    self.on_transport_error(&error);
                }
            }
            LinkEvent::Closed { generation } => {
                if generation == self.generation {
                    self.on_closed();
                }
            }
            LinkEvent::ReconnectTick => self.on_reconnect_tick(),
        }
    }

    fn on_link_up(&mut self, link: Link) {
        self.state = ConnectionState::Connected;
        self.cancel_reconnect();
        self.link = Some(link);
        self.logger.info("Successfully connected to charger");
        self.publisher.publish_connection(true);
        self.flush_pending();
    }

    fn flush_pending(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        self.logger.info(&format!(
            "Processing {} cached write operations",
            self.buffer.len()
        ));

        let link = self.link.as_ref();
        let sent = self
            .buffer
            .drain_into(|write| link.is_some_and(|l| l.send(write.encode().to_vec())));

        if !self.buffer.is_empty() {
            self.logger.warn(&format!(
                "Connection lost while flushing: {} sent, {} still queued",
                sent,
                self.buffer.len()
            ));
        }
    }

    fn on_data(&mut self, bytes: &[u8]) {
        self.logger
            .debug(&format!("Received data: {}", codec::to_hex(bytes)));
        match codec::decode(bytes) {
            Ok(record) => self.publisher.publish(&record),
            Err(e @ DecodeError::UnsupportedFunction { .. }) => {
                self.logger.debug(&format!("Skipping frame: {}", e));
            }
            Err(e) => {
                let err = BridgeError::from(e);
                self.logger.warn(&format!("Error processing data: {}", err));
            }
        }
    }

    fn on_transport_error(&mut self, error: &io::Error) {
        let err = BridgeError::transport(error.to_string());
        self.logger.error(&format!("Connection error: {}", err));
        self.tear_down();
        self.publisher.publish_connection(false);
        self.schedule_reconnect();
    }

    fn on_closed(&mut self) {
        if self.state != ConnectionState::Connected {
            return;
        }
        self.logger.info("Connection to charger closed");
        self.tear_down();
        self.publisher.publish_connection(false);
        self.schedule_reconnect();
    }

    /// Drop the socket and fence off any event it still has in flight
    fn tear_down(&mut self) {
        self.link = None;
        self.state = ConnectionState::Disconnected;
        self.generation += 1;
    }

    /// Arm the recurring reconnect timer unless one is already running
    pub fn schedule_reconnect(&mut self) {
        if self.closed || self.reconnect.is_some() {
            return;
        }
        let period = self.charger.reconnect_interval();
        let timer = ReconnectTimer::start(period, self.events_tx.clone());
        self.timers_started += 1;
        self.logger.info(&format!(
            "Reconnecting every {} ms (timer {})",
            timer.period().as_millis(),
            self.timers_started
        ));
        self.reconnect = Some(timer);
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect.take() {
            timer.cancel();
        }
    }

    fn on_reconnect_tick(&mut self) {
        match self.state {
            ConnectionState::Disconnected => {
                self.logger.info("Attempting to reconnect...");
                if let Err(e) = self.start() {
                    self.logger.error(&format!("Reconnect failed: {}", e));
                }
            }
            // Never overlap dials
            ConnectionState::Connecting => self.logger.debug("Connect attempt still pending"),
            ConnectionState::Connected => {}
        }
    }

    /// Hand `frame` to the socket; `false` when there is no live connection
    pub fn transmit(&self, frame: &[u8]) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.link.as_ref().is_some_and(|l| l.send(frame.to_vec()))
    }

    /// Transmit `write`, or queue it for the next connect
    pub fn submit(&mut self, write: PendingWrite) {
        if self.transmit(&write.encode()) {
            self.logger.info(&format!(
                "Wrote value {} to register {}",
                write.value, write.register
            ));
        } else {
            self.logger.warn(&format!(
                "Cannot write to charger, not connected. Queued value {} for register {}",
                write.value, write.register
            ));
            self.buffer.enqueue(write);
        }
    }

    pub fn handle_command(&mut self, change: &StateChange) {
        if let Some(write) = self.router.route(change) {
            self.submit(write);
        }
    }

    /// Cancel the timer and close the socket
    ///
    /// Safe in any state and on repeated calls. Failures while closing are
    /// logged and swallowed; `done` runs exactly once per call.
    pub async fn shutdown<F: FnOnce()>(&mut self, done: F) {
        let first = !self.closed;
        self.closed = true;
        self.cancel_reconnect();
        if let Some(task) = self.connecting.take() {
            task.abort();
        }
        self.generation += 1;

        let was_connected = self.is_connected();
        self.state = ConnectionState::Disconnected;
        if let Some(link) = self.link.take() {
            if let Err(e) = link.close().await {
                self.logger
                    .warn(&format!("Ignoring error while closing connection: {}", e));
            }
        }
        if was_connected {
            self.publisher.publish_connection(false);
        }
        if first {
            self.logger.info("Connection to charger closed");
        }
        done();
    }

    /// Drive the manager until shutdown is requested or every handle is gone
    pub(crate) async fn run(mut self, mut messages: mpsc::UnboundedReceiver<Message>) -> Result<()> {
        self.publisher.define_channels();
        self.publisher.publish_connection(false);
        self.logger.info("Connecting to charger...");
        self.start()?;

        loop {
            tokio::select! {
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                message = messages.recv() => match message {
                    Some(Message::Command(change)) => self.handle_command(&change),
                    Some(Message::Shutdown(done)) => {
                        self.shutdown(move || {
                            let _ = done.send(());
                        })
                        .await;
                        return Ok(());
                    }
                    None => {
                        self.shutdown(|| {}).await;
                        return Ok(());
                    }
                },
            }
        }
    }
}
