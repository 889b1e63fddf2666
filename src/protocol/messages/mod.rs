//! Request message definitions.
//!
//! Each message implements the `Message` trait and serializes into a single
//! allocation.

pub mod array;
pub mod batch;
pub mod blob;
pub mod control;
pub mod execute;
pub mod fetch;
pub mod statement;
pub mod transaction;

pub use array::{GetSliceMessage, PutSliceMessage};
pub use batch::{batch_parameters, BatchCreateMessage, BatchExecuteMessage, BatchMessagesMessage};
pub use blob::{BlobInfoMessage, GetSegmentMessage, OpenBlobMessage, PutSegmentMessage, SeekBlobMessage};
pub use control::{CancelMessage, HandleMessage, PingMessage};
pub use execute::{ExecuteMessage, OutputBlr};
pub use fetch::FetchMessage;
pub use statement::{FreeStatementMessage, InfoSqlMessage, PrepareMessage};
pub use transaction::StartTransactionMessage;
