//! Connection state management.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use mio::net::TcpStream;
use mio::Interest;

use crate::http::{HttpError, HttpRequest, HttpResponse, Limits, parse_request};

/// State of a client connection.
///
/// A connection carries a single request. Once its response is queued the
/// connection stops reading and closes after the write buffer drains.
pub struct Connection {
    pub stream: TcpStream,
    pub read_buf: BytesMut,
    pub write_buf: BytesMut,
    /// Set once a response is queued.
    pub closing: bool,
    /// Last activity timestamp for idle timeout tracking.
    pub last_activity: Instant,
}

impl Connection {
    pub fn new(stream: TcpStream, buffer_size: usize) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(buffer_size),
            write_buf: BytesMut::with_capacity(buffer_size),
            closing: false,
            last_activity: Instant::now(),
        }
    }

    /// Updates the last activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Checks if the connection has been idle for longer than the timeout.
    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }

    /// Reads data from the socket into the read buffer.
    ///
    /// Stops once the buffer holds more than `max_bytes`; anything past that
    /// cannot be a valid request and the parser rejects it.
    ///
    /// Returns `true` if the peer has not closed its side.
    pub fn read(&mut self, max_bytes: usize) -> io::Result<bool> {
        let mut temp_buf = [0u8; 4096];

        loop {
            if self.read_buf.len() > max_bytes {
                return Ok(true);
            }

            match self.stream.read(&mut temp_buf) {
                Ok(0) => return Ok(false),
                Ok(n) => self.read_buf.extend_from_slice(&temp_buf[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Writes data from the write buffer to the socket.
    ///
    /// Returns `true` if all data was written.
    pub fn write(&mut self) -> io::Result<bool> {
        while !self.write_buf.is_empty() {
            match self.stream.write(&self.write_buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write to socket",
                    ));
                }
                Ok(n) => {
                    let _ = self.write_buf.split_to(n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }

    /// Attempts to parse a request from the read buffer.
    pub fn try_parse_request(&mut self, limits: Limits) -> Result<Option<HttpRequest>, HttpError> {
        parse_request(&mut self.read_buf, limits)
    }

    /// Queues the response and marks the connection for closing.
    pub fn queue_response(&mut self, response: &HttpResponse) {
        response.encode(&mut self.write_buf);
        self.read_buf.clear();
        self.closing = true;
    }

    /// Returns the interest flags for this connection.
    pub fn interest(&self) -> Interest {
        if self.write_buf.is_empty() {
            Interest::READABLE
        } else {
            Interest::WRITABLE
        }
    }

    /// True once the response has been fully flushed.
    pub fn is_done(&self) -> bool {
        self.closing && self.write_buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::net::{TcpListener, TcpStream as StdStream};
    use std::thread;

    use super::*;

    fn pair() -> (Connection, StdStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = StdStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        (Connection::new(TcpStream::from_std(server), 1024), client)
    }

    #[test]
    fn read_stops_past_request_limit() {
        let (mut conn, mut client) = pair();
        let limits = Limits {
            max_header_bytes: 1024,
            max_body_bytes: 1024,
        };

        let writer = thread::spawn(move || {
            let _ = client.write_all(&vec![b'a'; 256 * 1024]);
            client
        });
        thread::sleep(Duration::from_millis(200));

        assert!(conn.read(limits.max_request_bytes()).unwrap());
        assert!(conn.read_buf.len() > limits.max_request_bytes());
        assert!(conn.read_buf.len() <= limits.max_request_bytes() + 4096);

        // Oversized input is rejected rather than buffered further.
        assert_eq!(
            conn.try_parse_request(limits),
            Err(HttpError::HeadersTooLarge)
        );

        drop(conn);
        let _ = writer.join();
    }

    #[test]
    fn read_reports_peer_close() {
        let (mut conn, mut client) = pair();
        client.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        drop(client);
        thread::sleep(Duration::from_millis(100));

        assert!(!conn.read(Limits::default().max_request_bytes()).unwrap());
        assert!(conn.try_parse_request(Limits::default()).unwrap().is_some());
    }

    #[test]
    fn queued_response_switches_to_write_interest() {
        let (mut conn, _client) = pair();
        assert_eq!(conn.interest(), Interest::READABLE);

        conn.queue_response(&HttpResponse::error(404, "Not found"));
        assert!(conn.closing);
        assert_eq!(conn.interest(), Interest::WRITABLE);

        assert!(conn.write().unwrap());
        assert!(conn.is_done());
    }
}
