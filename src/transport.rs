//! Request/response transports
//!
//! A [`Transport`] carries one JSON payload to a named remote event and hands
//! back the reply. It knows nothing about wire nodes.
//!
//! [`LineTransport`] speaks newline-delimited JSON over TCP:
//!
//! ```text
//! -> {"id": "<uuid>", "method": "get_value", "params": "voltage"}
//! <- {"id": "<uuid>", "result": { ...wire node... }}
//! <- {"id": "<uuid>", "error": {"code": "...", "message": "..."}}
//! ```

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{PathwireError, Result};

pub trait Transport {
    /// Opens the connection. Calling it while connected does nothing.
    fn connect(&mut self) -> Result<()>;

    /// Closes the connection. Calling it while disconnected does nothing.
    fn disconnect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Sends `payload` to the remote `event` and waits for the reply. `None`
    /// means the remote produced no result.
    fn call(&mut self, event: &str, payload: serde_json::Value)
    -> Result<Option<serde_json::Value>>;
}

/// A request to the remote service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request identifier
    pub id: String,
    /// Remote event name
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Request {
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A reply from the remote service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this response corresponds to
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl Response {
    pub fn success(id: impl Into<String>, result: Option<serde_json::Value>) -> Self {
        Self {
            id: id.into(),
            result,
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, error: RemoteError) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<Option<serde_json::Value>> {
        match self.error {
            Some(err) => Err(PathwireError::Remote {
                code: err.code,
                message: err.message,
            }),
            None => Ok(self.result),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: String,
    pub message: String,
}

struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

/// Newline-delimited JSON over a single TCP connection.
pub struct LineTransport {
    address: String,
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
    conn: Option<Connection>,
}

impl LineTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self::from_config(&ClientConfig::new(address))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            address: config.address().to_string(),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            conn: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn open(&self) -> Result<TcpStream> {
        let addrs = self.address.to_socket_addrs().map_err(|e| {
            PathwireError::Transport(format!("cannot resolve {}: {}", self.address, e))
        })?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(PathwireError::Transport(match last_err {
            Some(e) => format!("failed to connect to {}: {}", self.address, e),
            None => format!("no addresses found for {}", self.address),
        }))
    }

    fn abandon(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = conn.writer.shutdown(Shutdown::Both);
            debug!(address = %self.address, "Dropped connection after failed request");
        }
    }
}

impl Transport for LineTransport {
    fn connect(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let stream = self.open()?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.request_timeout)?;
        let writer = stream.try_clone()?;
        self.conn = Some(Connection {
            reader: BufReader::new(stream),
            writer,
        });
        debug!(address = %self.address, "Connected");
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            match conn.writer.shutdown(Shutdown::Both) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotConnected => {}
                Err(e) => return Err(e.into()),
            }
            debug!(address = %self.address, "Disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn call(
        &mut self,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<Option<serde_json::Value>> {
        let conn = self.conn.as_mut().ok_or(PathwireError::NotConnected)?;
        let start = Instant::now();
        let request = Request::new(event, payload);

        // A failed exchange can leave a late reply in the stream, so the
        // connection is not reused.
        let response = match conn.exchange(&request) {
            Ok(response) => response,
            Err(e) => {
                self.abandon();
                return Err(e);
            }
        };

        debug!(
            method = event,
            elapsed_ms = start.elapsed().as_micros() as f64 / 1000.0,
            "Request completed"
        );
        response.into_result()
    }
}

impl Connection {
    fn exchange(&mut self, request: &Request) -> Result<Response> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        trace!(method = %request.method, id = %request.id, "Sending request");

        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;

        let mut reply = String::new();
        let read = match self.reader.read_line(&mut reply) {
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                warn!(method = %request.method, "Request timed out");
                return Err(PathwireError::Transport(format!(
                    "'{}' timed out",
                    request.method
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if read == 0 {
            return Err(PathwireError::Transport(
                "connection closed by remote".to_string(),
            ));
        }

        let response: Response = serde_json::from_str(&reply)?;
        if response.id != request.id {
            return Err(PathwireError::Transport(format!(
                "response id mismatch: expected {}, got {}",
                request.id, response.id
            )));
        }
        Ok(response)
    }
}

impl Drop for LineTransport {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            debug!("Error while disconnecting: {}", e);
        }
    }
}
