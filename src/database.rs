//! Attached database: the request/response conversation over one connection.

use crate::error::{Error, Result};
use crate::options::DatabaseOptions;
use crate::protocol::constants::*;
use crate::protocol::message::Message;
use crate::protocol::messages::{CancelMessage, PingMessage};
use crate::protocol::response::{read_response, GenericResponse, Response};
use crate::protocol::status::IscException;
use crate::protocol::stream::{XdrReader, XdrWriter};
use crate::protocol::ProtocolVersion;
use crate::statement::Statement;
use crate::transaction::Transaction;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::io::{split, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::{Mutex, MutexGuard};

/// Byte stream a database talks over.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + 'static> Transport for T {}

type BoxedTransport = Box<dyn Transport>;
pub(crate) type Reader = XdrReader<ReadHalf<BoxedTransport>>;
type Writer = XdrWriter<WriteHalf<BoxedTransport>>;

/// Callback receiving warnings the server attaches to successful replies.
pub type WarningHandler = Arc<dyn Fn(&IscException) + Send + Sync>;

/// Kind of `op_cancel` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelKind {
    /// Stop accepting cancel requests on this attachment.
    Disable,
    /// Accept cancel requests again.
    Enable,
    /// Cancel the running request; it fails with `isc_cancelled`.
    Raise,
    /// Abort the attachment.
    Abort,
}

impl CancelKind {
    fn code(self) -> i32 {
        match self {
            Self::Disable => FB_CANCEL_DISABLE,
            Self::Enable => FB_CANCEL_ENABLE,
            Self::Raise => FB_CANCEL_RAISE,
            Self::Abort => FB_CANCEL_ABORT,
        }
    }
}

struct DatabaseInner {
    reader: Mutex<Reader>,
    writer: Mutex<Writer>,
    handle: i32,
    options: DatabaseOptions,
    warning_handler: StdMutex<Option<WarningHandler>>,
}

/// An attached database.
///
/// Cloning is cheap; clones share the connection. Exchanges are serialized:
/// a [`Conversation`] holds the read half for the duration of one request
/// and its reply, while the write half is locked only while a request is
/// being written. That lets [`cancel_operation`](Self::cancel_operation)
/// reach the server while another task waits for a reply.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("handle", &self.inner.handle)
            .field("options", &self.inner.options)
            .finish()
    }
}

impl Database {
    /// Wrap a stream whose attachment has already been accepted.
    ///
    /// `handle` is the database handle returned by `op_attach`.
    pub fn from_stream<S: Transport>(stream: S, handle: i32, options: DatabaseOptions) -> Self {
        let boxed: BoxedTransport = Box::new(stream);
        let (read_half, write_half) = split(boxed);
        Self {
            inner: Arc::new(DatabaseInner {
                reader: Mutex::new(XdrReader::new(read_half)),
                writer: Mutex::new(XdrWriter::new(write_half)),
                handle,
                options,
                warning_handler: StdMutex::new(None),
            }),
        }
    }

    pub fn handle(&self) -> i32 {
        self.inner.handle
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.inner.options
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.inner.options.protocol
    }

    /// Install a handler for server warnings. Without one they are logged.
    pub fn set_warning_handler(&self, handler: impl Fn(&IscException) + Send + Sync + 'static) {
        if let Ok(mut guard) = self.inner.warning_handler.lock() {
            *guard = Some(Arc::new(handler));
        }
    }

    pub(crate) fn warn(&self, warning: &IscException) {
        let handler = self
            .inner
            .warning_handler
            .lock()
            .ok()
            .and_then(|guard| guard.clone());
        match handler {
            Some(handler) => handler(warning),
            None => tracing::warn!(code = warning.error_code, "{}", warning.message),
        }
    }

    /// Start an exchange; waits until the previous one has finished.
    pub(crate) async fn conversation(&self) -> Conversation<'_> {
        Conversation {
            db: self,
            reader: self.inner.reader.lock().await,
        }
    }

    /// Ask the server to cancel the running request.
    ///
    /// Only the write half is used, so this can be called while another
    /// task is waiting for a reply on the same connection.
    pub async fn cancel_operation(&self, kind: CancelKind) -> Result<()> {
        self.protocol().require(ProtocolVersion::V12, "op_cancel")?;
        tracing::debug!(?kind, "cancelling operation");
        let mut writer = self.inner.writer.lock().await;
        writer.send_message(&CancelMessage { kind: kind.code() }).await
    }

    /// Round trip to check the connection is alive.
    pub async fn ping(&self) -> Result<()> {
        let mut conv = self.conversation().await;
        conv.send(&PingMessage).await?;
        conv.read_generic().await.map(|_| ())
    }

    /// Start a transaction; `tpb` defaults to read-committed, read-write, wait.
    pub async fn begin_transaction(&self, tpb: Option<&[u8]>) -> Result<Transaction> {
        Transaction::begin(self, tpb).await
    }

    /// Prepare a statement under `transaction`.
    pub async fn prepare(&self, transaction: &Transaction, sql: &str) -> Result<Statement> {
        let mut statement = Statement::new(self);
        statement.set_transaction(transaction);
        statement.prepare(sql).await?;
        Ok(statement)
    }
}

/// Exclusive use of the connection for one request and its reply.
pub(crate) struct Conversation<'a> {
    db: &'a Database,
    reader: MutexGuard<'a, Reader>,
}

impl Conversation<'_> {
    /// Serialize and write one request.
    pub(crate) async fn send<M: Message>(&mut self, msg: &M) -> Result<()> {
        tracing::debug!(op = operation_name(msg.operation()), "request");
        let mut writer = self.db.inner.writer.lock().await;
        writer.send_message(msg).await
    }

    /// Read half of the connection, for row data following a response header.
    pub(crate) fn reader(&mut self) -> &mut Reader {
        &mut self.reader
    }

    pub(crate) async fn read_response(&mut self) -> Result<Response> {
        read_response(&mut self.reader).await
    }

    /// Read an `op_response`, forwarding any warning it carries.
    pub(crate) async fn read_generic(&mut self) -> Result<GenericResponse> {
        match self.read_response().await? {
            Response::Generic(response) => {
                if let Some(warning) = &response.warning {
                    self.db.warn(warning);
                }
                Ok(response)
            }
            other => Err(Error::UnexpectedOperation {
                expected: OP_RESPONSE,
                actual: response_operation(&other),
            }),
        }
    }

    /// Send a request and read its `op_response`.
    pub(crate) async fn call<M: Message>(&mut self, msg: &M) -> Result<GenericResponse> {
        self.send(msg).await?;
        self.read_generic().await
    }
}

pub(crate) fn response_operation(response: &Response) -> i32 {
    match response {
        Response::Generic(_) => OP_RESPONSE,
        Response::Sql(_) => OP_SQL_RESPONSE,
        Response::Fetch(_) => OP_FETCH_RESPONSE,
        Response::Batch(_) => OP_BATCH_CS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::WriteExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{duplex, AsyncReadExt};

    fn ok_response(warning: Option<i32>) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_i32(OP_RESPONSE);
        buf.write_i32(0);
        buf.write_i64(0);
        buf.write_buffer(&[]);
        if let Some(code) = warning {
            buf.write_i32(ISC_ARG_WARNING);
            buf.write_i32(code);
        }
        buf.write_i32(ISC_ARG_END);
        buf
    }

    #[tokio::test]
    async fn test_ping_forwards_warnings() {
        let (client, mut server) = duplex(1024);
        let db = Database::from_stream(client, 1, DatabaseOptions::default());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        db.set_warning_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::io::AsyncWriteExt::write_all(&mut server, &ok_response(Some(ISC_ARITH_EXCEPT)))
            .await
            .unwrap();
        db.ping().await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        let mut op = [0u8; 4];
        server.read_exact(&mut op).await.unwrap();
        assert_eq!(i32::from_be_bytes(op), OP_PING);
    }

    #[tokio::test]
    async fn test_cancel_requires_protocol_12() {
        let (client, _server) = duplex(64);
        let db = Database::from_stream(
            client,
            1,
            DatabaseOptions::default().with_protocol(ProtocolVersion::V11),
        );
        assert!(matches!(
            db.cancel_operation(CancelKind::Raise).await,
            Err(Error::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_while_conversation_is_open() {
        let (client, mut server) = duplex(1024);
        let db = Database::from_stream(client, 1, DatabaseOptions::default());
        let conv = db.conversation().await;
        db.cancel_operation(CancelKind::Raise).await.unwrap();
        drop(conv);

        let mut bytes = [0u8; 8];
        server.read_exact(&mut bytes).await.unwrap();
        assert_eq!(&bytes[..4], &OP_CANCEL.to_be_bytes());
        assert_eq!(&bytes[4..], &FB_CANCEL_RAISE.to_be_bytes());
    }
}
