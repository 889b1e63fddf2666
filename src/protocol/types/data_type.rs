//! Logical data type of a column, derived from its SQL type attributes.

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::types::Charset;

/// Logical data type of a field.
///
/// Several SQL types share one logical type (SHORT/LONG with a scale are
/// both `Decimal`), and one SQL type can map to several (TEXT is `Char`
/// except CHAR(16) OCTETS, which holds a `Guid`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbDataType {
    Array,
    BigInt,
    Binary,
    Boolean,
    Char,
    Date,
    Decimal,
    Double,
    Float,
    Guid,
    Integer,
    Numeric,
    SmallInt,
    Text,
    Time,
    TimeStamp,
    VarChar,
    Dec16,
    Dec34,
    Int128,
    TimeStampTz,
    TimeStampTzEx,
    TimeTz,
    TimeTzEx,
    Null,
}

impl DbDataType {
    /// Classify a field from its describe attributes.
    ///
    /// Returns `Err(Error::TypeConversion)` for an unknown SQL type code.
    pub fn from_sql_type(
        sql_type: i32,
        sub_type: i16,
        scale: i16,
        length: i16,
        charset: Charset,
    ) -> Result<Self> {
        let scaled = |plain: DbDataType| match sub_type {
            2 => DbDataType::Decimal,
            1 => DbDataType::Numeric,
            _ if scale < 0 => DbDataType::Decimal,
            _ => plain,
        };

        Ok(match sql_type & !1 {
            SQL_TEXT if charset.is_octets() && length == 16 => DbDataType::Guid,
            SQL_TEXT => DbDataType::Char,
            SQL_VARYING => DbDataType::VarChar,
            SQL_SHORT => scaled(DbDataType::SmallInt),
            SQL_LONG => scaled(DbDataType::Integer),
            SQL_INT64 | SQL_QUAD => scaled(DbDataType::BigInt),
            SQL_INT128 => scaled(DbDataType::Int128),
            SQL_FLOAT => DbDataType::Float,
            SQL_DOUBLE | SQL_D_FLOAT => scaled(DbDataType::Double),
            SQL_BLOB if sub_type == BLOB_SUB_TYPE_TEXT => DbDataType::Text,
            SQL_BLOB => DbDataType::Binary,
            SQL_TIMESTAMP => DbDataType::TimeStamp,
            SQL_TYPE_TIME => DbDataType::Time,
            SQL_TYPE_DATE => DbDataType::Date,
            SQL_ARRAY => DbDataType::Array,
            SQL_BOOLEAN => DbDataType::Boolean,
            SQL_DEC16 => DbDataType::Dec16,
            SQL_DEC34 => DbDataType::Dec34,
            SQL_TIMESTAMP_TZ => DbDataType::TimeStampTz,
            SQL_TIMESTAMP_TZ_EX => DbDataType::TimeStampTzEx,
            SQL_TIME_TZ => DbDataType::TimeTz,
            SQL_TIME_TZ_EX => DbDataType::TimeTzEx,
            SQL_NULL => DbDataType::Null,
            other => {
                return Err(Error::type_conversion(format!(
                    "Unknown SQL type {}",
                    other
                )))
            }
        })
    }

    /// Whether values are fetched lazily through a blob/array id.
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Text | Self::Binary | Self::Array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_integers() {
        let t = DbDataType::from_sql_type(SQL_LONG, 0, -2, 4, Charset::None).unwrap();
        assert_eq!(t, DbDataType::Decimal);
        let t = DbDataType::from_sql_type(SQL_SHORT + 1, 1, -1, 2, Charset::None).unwrap();
        assert_eq!(t, DbDataType::Numeric);
        let t = DbDataType::from_sql_type(SQL_INT64, 0, 0, 8, Charset::None).unwrap();
        assert_eq!(t, DbDataType::BigInt);
    }

    #[test]
    fn test_text_types() {
        let t = DbDataType::from_sql_type(SQL_TEXT, 1, 0, 16, Charset::Octets).unwrap();
        assert_eq!(t, DbDataType::Guid);
        let t = DbDataType::from_sql_type(SQL_TEXT, 4, 0, 40, Charset::Utf8).unwrap();
        assert_eq!(t, DbDataType::Char);
        let t = DbDataType::from_sql_type(SQL_BLOB, 1, 4, 8, Charset::Utf8).unwrap();
        assert_eq!(t, DbDataType::Text);
        assert!(t.is_lazy());
    }

    #[test]
    fn test_unknown_type() {
        assert!(DbDataType::from_sql_type(12, 0, 0, 0, Charset::None).is_err());
    }
}
