//! Firebird remote protocol implementation.

pub mod buffer;
pub mod codec;
pub mod connect;
pub mod constants;
pub mod message;
pub mod messages;
pub mod response;
pub mod row;
pub mod status;
pub mod stream;
pub mod types;
pub mod version;

pub use buffer::ReadBuffer;
pub use message::{Message, WriteExt};
pub use response::{BatchCompletion, FetchResponse, GenericResponse, Response, SqlResponse};
pub use row::MessageFormat;
pub use status::{IscException, StatusEntry};
pub use stream::{XdrReader, XdrWriter};
pub use types::{DbField, DbValue, Descriptor, Storage};
pub use version::ProtocolVersion;
