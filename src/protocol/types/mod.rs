//! Firebird data types: field descriptors, value storage and value holders.

mod array;
mod charset;
mod data_type;
mod descriptor;
mod field;
mod storage;
mod value;
mod zoned;

pub use array::{ArrayBound, ArrayDescriptor, FbArray};
pub use charset::Charset;
pub use data_type::DbDataType;
pub use descriptor::{Blr, Descriptor};
pub use field::DbField;
pub use storage::Storage;
pub use value::{DbValue, ValueLink};
pub use zoned::{FbZonedDateTime, FbZonedTime, TimeZoneId};
