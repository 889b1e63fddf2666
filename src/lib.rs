//! Firebird Thin Client for Rust
//!
//! A pure Rust implementation of the client side of the Firebird remote
//! protocol: the XDR wire format, statements and their cursors, the value
//! codec, blobs, arrays, transactions and batches. The attachment handshake
//! is left to the caller; a [`Database`] is created from a stream whose
//! attachment has already been accepted.
//!
//! # Example
//!
//! ```no_run
//! use firebird_thin_rs::{no_parameters, open_stream, ConnectParams, Database, DatabaseOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let params = ConnectParams::new("localhost", 3050, "employee");
//!     let stream = open_stream(&params).await?;
//!     // ... attach and obtain the database handle ...
//!     let db = Database::from_stream(stream, 0, DatabaseOptions::default());
//!
//!     let tr = db.begin_transaction(None).await?;
//!     let mut stmt = db.prepare(&tr, "SELECT 42 FROM RDB$DATABASE").await?;
//!     stmt.execute(None, no_parameters).await?;
//!     while let Some(row) = stmt.fetch().await? {
//!         println!("{}", row[0].get_i32()?);
//!     }
//!     stmt.release().await?;
//!     tr.commit().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod array;
pub mod batch;
pub mod blob;
pub mod blocking;
pub mod database;
pub mod error;
pub mod options;
pub mod protocol;
pub mod statement;
pub mod transaction;

// Re-export main types
pub use array::ArrayHandle;
pub use batch::Batch;
pub use blob::{BlobReader, BlobWriter, SeekMode};
pub use blocking::{BlockingArray, BlockingDatabase, BlockingStatement, BlockingTransaction};
pub use database::{CancelKind, Database, Transport};
pub use error::{Error, Result};
pub use options::DatabaseOptions;
pub use protocol::connect::{open_stream, ConnectParams};
pub use protocol::types::{
    ArrayBound, ArrayDescriptor, Charset, DbDataType, DbField, DbValue, Descriptor, FbArray, Storage,
};
pub use protocol::{BatchCompletion, IscException, ProtocolVersion};
pub use statement::{no_parameters, PoolStats, Statement, StatementState, StatementType};
pub use transaction::{default_tpb, Transaction, TransactionState};
