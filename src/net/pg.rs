//! Minimal PostgreSQL client connection.
//!
//! Startup with trust authentication, simple queries, terminate. Nothing
//! else of the protocol is spoken.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::net::backend::BackendError;
use crate::protocol::messages::{self, tag, AUTH_OK};

/// Largest backend message accepted.
pub const MAX_MESSAGE_LEN: usize = 1 << 20;

#[derive(Debug)]
pub struct PgConnection {
    stream: BufReader<TcpStream>,
}

impl PgConnection {
    /// Connect and run the startup handshake up to `ReadyForQuery`.
    pub async fn connect(address: &str, user: &str, database: &str) -> Result<Self, BackendError> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        let mut conn = Self {
            stream: BufReader::new(stream),
        };

        let mut buf = BytesMut::new();
        messages::startup_message(
            &[("user", user), ("database", database), ("application_name", "storage-watchdog")],
            &mut buf,
        );
        conn.write(&buf).await?;

        loop {
            let (code, mut body) = conn.read_message().await?;
            match code {
                tag::AUTHENTICATION => {
                    if body.remaining() < 4 {
                        return Err(BackendError::Protocol("short authentication message".into()));
                    }
                    let auth = body.get_u32();
                    if auth != AUTH_OK {
                        return Err(BackendError::UnsupportedAuth(auth));
                    }
                    tracing::trace!(address, user, "Authentication ok");
                }
                tag::ERROR_RESPONSE => {
                    return Err(BackendError::Server(messages::error_message(&body)));
                }
                tag::READY_FOR_QUERY => break,
                tag::PARAMETER_STATUS | tag::BACKEND_KEY_DATA | tag::NOTICE_RESPONSE => {}
                other => {
                    return Err(BackendError::Protocol(format!(
                        "unexpected message '{}' during startup",
                        other as char
                    )));
                }
            }
        }

        Ok(conn)
    }

    /// Run a simple query and return its first `DataRow`, tag and length
    /// included. Reads until `ReadyForQuery` so the connection stays usable.
    pub async fn simple_query(&mut self, query: &str) -> Result<Bytes, BackendError> {
        let mut buf = BytesMut::new();
        messages::query_message(query, &mut buf);
        self.write(&buf).await?;

        let mut row = None;
        let mut error = None;
        loop {
            let (code, body) = self.read_message().await?;
            match code {
                tag::DATA_ROW if row.is_none() => row = Some(frame(code, &body)),
                tag::ERROR_RESPONSE => error = Some(messages::error_message(&body)),
                tag::READY_FOR_QUERY => break,
                _ => {}
            }
        }

        if let Some(message) = error {
            return Err(BackendError::Server(message));
        }
        row.ok_or(BackendError::NoRows)
    }

    /// Send `Terminate` and close the socket.
    pub async fn terminate(mut self) -> Result<(), BackendError> {
        let mut buf = BytesMut::new();
        messages::terminate_message(&mut buf);
        self.write(&buf).await?;
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), BackendError> {
        let stream = self.stream.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read_message(&mut self) -> Result<(u8, Bytes), BackendError> {
        let code = self.stream.read_u8().await?;
        let len = self.stream.read_i32().await?;
        let len = usize::try_from(len)
            .ok()
            .filter(|len| (4..=MAX_MESSAGE_LEN).contains(len))
            .ok_or_else(|| BackendError::Protocol(format!("invalid message length {len}")))?;

        let mut body = vec![0u8; len - 4];
        self.stream.read_exact(&mut body).await?;
        Ok((code, Bytes::from(body)))
    }
}

fn frame(code: u8, body: &[u8]) -> Bytes {
    let mut raw = BytesMut::with_capacity(5 + body.len());
    raw.put_u8(code);
    raw.put_u32((body.len() + 4) as u32);
    raw.put_slice(body);
    raw.freeze()
}
