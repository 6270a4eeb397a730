//! The `mio` event loop.
//!
//! One thread owns the listener and every connection. Each connection
//! carries a single request: once the response is flushed the socket is
//! closed. Connections that stay silent past the idle timeout are dropped.

use std::collections::HashMap;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use mio::event::Event;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::{ServerError, ServerResult};
use crate::handler::RequestHandler;
use crate::http::HttpResponse;

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
#[cfg(unix)]
const SIGNALS: Token = Token(2);
const FIRST_CONNECTION: usize = 3;

/// Upper bound on how long the loop sleeps between idle sweeps.
const MAX_POLL_WAIT: Duration = Duration::from_secs(1);

/// Stops a running [`Server`] from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Requests shutdown and wakes the event loop.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        if let Err(e) = self.waker.wake() {
            warn!(error = %e, "failed to wake event loop");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// HTTP server over a single-threaded poll loop.
pub struct Server {
    config: ServerConfig,
    handler: RequestHandler,
    poll: Poll,
    listener: TcpListener,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    shutdown: Arc<AtomicBool>,
    waker: Arc<Waker>,
    #[cfg(unix)]
    signals: Option<signal_hook_mio::v1_0::Signals>,
}

impl Server {
    /// Binds the listener. Requests are not served until [`Server::run`].
    pub fn new(config: ServerConfig, handler: RequestHandler) -> ServerResult<Self> {
        let poll = Poll::new()?;

        let addr = config.bind_addr;
        let mut listener =
            TcpListener::bind(addr).map_err(|source| ServerError::BindFailed { addr, source })?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);

        Ok(Self {
            config,
            handler,
            poll,
            listener,
            connections: HashMap::new(),
            next_token: FIRST_CONNECTION,
            shutdown: Arc::new(AtomicBool::new(false)),
            waker,
            #[cfg(unix)]
            signals: None,
        })
    }

    /// Stops the loop on SIGINT or SIGTERM.
    #[cfg(unix)]
    pub fn with_signal_handling(mut self) -> ServerResult<Self> {
        use signal_hook::consts::{SIGINT, SIGTERM};

        let mut signals = signal_hook_mio::v1_0::Signals::new([SIGINT, SIGTERM])?;
        self.poll
            .registry()
            .register(&mut signals, SIGNALS, Interest::READABLE)?;
        self.signals = Some(signals);
        Ok(self)
    }

    /// Signals are not wired up on this platform; use a [`ShutdownHandle`].
    #[cfg(not(unix))]
    pub fn with_signal_handling(self) -> ServerResult<Self> {
        Ok(self)
    }

    /// Returns the bound address. Useful when binding to port 0.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            waker: Arc::clone(&self.waker),
        }
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Runs the event loop until shutdown is requested.
    pub fn run(&mut self) -> ServerResult<()> {
        let mut events = Events::with_capacity(1024);
        let wait = self.config.idle_timeout.min(MAX_POLL_WAIT);

        info!(addr = %self.local_addr()?, "server listening");

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.poll.poll(&mut events, Some(wait)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }

            for event in &events {
                match event.token() {
                    LISTENER => self.accept()?,
                    WAKER => {}
                    #[cfg(unix)]
                    SIGNALS => self.drain_signals(),
                    token => self.handle_connection_event(token, event),
                }
            }

            self.close_idle();
        }

        info!(open = self.connections.len(), "server shutting down");
        let tokens: Vec<Token> = self.connections.keys().copied().collect();
        for token in tokens {
            self.close(token);
        }
        Ok(())
    }

    fn accept(&mut self) -> ServerResult<()> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    if self.connections.len() >= self.config.max_connections {
                        warn!(%peer, limit = self.config.max_connections, "connection limit reached");
                        let mut out = BytesMut::new();
                        HttpResponse::error(503, "Service unavailable").encode(&mut out);
                        let _ = stream.write(&out);
                        continue;
                    }

                    let token = Token(self.next_token);
                    self.next_token += 1;

                    self.poll
                        .registry()
                        .register(&mut stream, token, Interest::READABLE)?;
                    self.connections
                        .insert(token, Connection::new(stream, self.config.buffer_size));
                    debug!(%peer, token = token.0, "connection accepted");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    return Ok(());
                }
            }
        }
    }

    #[cfg(unix)]
    fn drain_signals(&mut self) {
        if let Some(signals) = self.signals.as_mut() {
            for signal in signals.pending() {
                info!(signal, "shutdown signal received");
                self.shutdown.store(true, Ordering::SeqCst);
            }
        }
    }

    fn handle_connection_event(&mut self, token: Token, event: &Event) {
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };
        let mut close = false;

        if event.is_readable() && !conn.closing {
            match conn.read(self.config.limits.max_request_bytes()) {
                Ok(open) => {
                    conn.touch();
                    match conn.try_parse_request(self.config.limits) {
                        Ok(Some(request)) => {
                            let response = self.handler.handle(&request);
                            conn.queue_response(&response);
                        }
                        Ok(None) => close = !open,
                        Err(e) => {
                            debug!(token = token.0, error = %e, "unparseable request");
                            conn.queue_response(&e.to_response());
                        }
                    }
                }
                Err(e) => {
                    debug!(token = token.0, error = %e, "read failed");
                    close = true;
                }
            }
        }

        if !close && !conn.write_buf.is_empty() {
            match conn.write() {
                Ok(_) => conn.touch(),
                Err(e) => {
                    debug!(token = token.0, error = %e, "write failed");
                    close = true;
                }
            }
        }

        if close || conn.is_done() {
            self.close(token);
            return;
        }

        let interest = conn.interest();
        if let Err(e) = self
            .poll
            .registry()
            .reregister(&mut conn.stream, token, interest)
        {
            warn!(token = token.0, error = %e, "reregister failed");
            self.close(token);
        }
    }

    fn close_idle(&mut self) {
        let timeout = self.config.idle_timeout;
        let idle: Vec<Token> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.is_idle(timeout))
            .map(|(token, _)| *token)
            .collect();

        for token in idle {
            debug!(token = token.0, "closing idle connection");
            self.close(token);
        }
    }

    fn close(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
    }
}
