//! Firebird wire protocol constants.
//!
//! Operation codes, SQL type codes, info items and BLR/SDL verbs used by the
//! remote protocol (protocol versions 10 through 16).

// Operations
pub const OP_VOID: i32 = 0;
pub const OP_RESPONSE: i32 = 9;
pub const OP_TRANSACTION: i32 = 29;
pub const OP_COMMIT: i32 = 30;
pub const OP_ROLLBACK: i32 = 31;
pub const OP_CREATE_BLOB: i32 = 34;
pub const OP_OPEN_BLOB: i32 = 35;
pub const OP_GET_SEGMENT: i32 = 36;
pub const OP_PUT_SEGMENT: i32 = 37;
pub const OP_CANCEL_BLOB: i32 = 38;
pub const OP_CLOSE_BLOB: i32 = 39;
pub const OP_INFO_BLOB: i32 = 43;
pub const OP_BATCH_SEGMENTS: i32 = 44;
pub const OP_COMMIT_RETAINING: i32 = 50;
pub const OP_OPEN_BLOB2: i32 = 56;
pub const OP_CREATE_BLOB2: i32 = 57;
pub const OP_GET_SLICE: i32 = 58;
pub const OP_PUT_SLICE: i32 = 59;
pub const OP_SLICE: i32 = 60;
pub const OP_SEEK_BLOB: i32 = 61;
pub const OP_ALLOCATE_STATEMENT: i32 = 62;
pub const OP_EXECUTE: i32 = 63;
pub const OP_FETCH: i32 = 65;
pub const OP_FETCH_RESPONSE: i32 = 66;
pub const OP_FREE_STATEMENT: i32 = 67;
pub const OP_PREPARE_STATEMENT: i32 = 68;
pub const OP_INFO_SQL: i32 = 70;
pub const OP_DUMMY: i32 = 71;
pub const OP_EXECUTE2: i32 = 76;
pub const OP_SQL_RESPONSE: i32 = 78;
pub const OP_ROLLBACK_RETAINING: i32 = 86;
pub const OP_CANCEL: i32 = 91;
pub const OP_PING: i32 = 93;
pub const OP_BATCH_CREATE: i32 = 99;
pub const OP_BATCH_MSG: i32 = 100;
pub const OP_BATCH_EXEC: i32 = 101;
pub const OP_BATCH_RLS: i32 = 102;
pub const OP_BATCH_CS: i32 = 103;

// Cancel kinds (op_cancel)
pub const FB_CANCEL_DISABLE: i32 = 1;
pub const FB_CANCEL_ENABLE: i32 = 2;
pub const FB_CANCEL_RAISE: i32 = 3;
pub const FB_CANCEL_ABORT: i32 = 4;

// op_free_statement options
pub const DSQL_CLOSE: i32 = 1;
pub const DSQL_DROP: i32 = 2;

// SQL dialect used for prepare
pub const SQL_DIALECT_CURRENT: i32 = 3;

// SQL types (odd value = nullable)
pub const SQL_VARYING: i32 = 448;
pub const SQL_TEXT: i32 = 452;
pub const SQL_DOUBLE: i32 = 480;
pub const SQL_FLOAT: i32 = 482;
pub const SQL_LONG: i32 = 496;
pub const SQL_SHORT: i32 = 500;
pub const SQL_TIMESTAMP: i32 = 510;
pub const SQL_BLOB: i32 = 520;
pub const SQL_D_FLOAT: i32 = 530;
pub const SQL_ARRAY: i32 = 540;
pub const SQL_QUAD: i32 = 550;
pub const SQL_TYPE_TIME: i32 = 560;
pub const SQL_TYPE_DATE: i32 = 570;
pub const SQL_INT64: i32 = 580;
pub const SQL_TIMESTAMP_TZ_EX: i32 = 32748;
pub const SQL_TIME_TZ_EX: i32 = 32750;
pub const SQL_INT128: i32 = 32752;
pub const SQL_TIMESTAMP_TZ: i32 = 32754;
pub const SQL_TIME_TZ: i32 = 32756;
pub const SQL_DEC16: i32 = 32760;
pub const SQL_DEC34: i32 = 32762;
pub const SQL_BOOLEAN: i32 = 32764;
pub const SQL_NULL: i32 = 32766;

// Generic info items
pub const ISC_INFO_END: u8 = 1;
pub const ISC_INFO_TRUNCATED: u8 = 2;
pub const ISC_INFO_ERROR: u8 = 3;

// SQL info items
pub const ISC_INFO_SQL_SELECT: u8 = 4;
pub const ISC_INFO_SQL_BIND: u8 = 5;
pub const ISC_INFO_SQL_NUM_VARIABLES: u8 = 6;
pub const ISC_INFO_SQL_DESCRIBE_VARS: u8 = 7;
pub const ISC_INFO_SQL_DESCRIBE_END: u8 = 8;
pub const ISC_INFO_SQL_SQLDA_SEQ: u8 = 9;
pub const ISC_INFO_SQL_TYPE: u8 = 11;
pub const ISC_INFO_SQL_SUB_TYPE: u8 = 12;
pub const ISC_INFO_SQL_SCALE: u8 = 13;
pub const ISC_INFO_SQL_LENGTH: u8 = 14;
pub const ISC_INFO_SQL_NULL_IND: u8 = 15;
pub const ISC_INFO_SQL_FIELD: u8 = 16;
pub const ISC_INFO_SQL_RELATION: u8 = 17;
pub const ISC_INFO_SQL_OWNER: u8 = 18;
pub const ISC_INFO_SQL_ALIAS: u8 = 19;
pub const ISC_INFO_SQL_SQLDA_START: u8 = 20;
pub const ISC_INFO_SQL_STMT_TYPE: u8 = 21;
pub const ISC_INFO_SQL_GET_PLAN: u8 = 22;
pub const ISC_INFO_SQL_RECORDS: u8 = 23;
pub const ISC_INFO_SQL_EXPLAIN_PLAN: u8 = 26;

// Request counters reported under isc_info_sql_records
pub const ISC_INFO_REQ_SELECT_COUNT: u8 = 13;
pub const ISC_INFO_REQ_INSERT_COUNT: u8 = 14;
pub const ISC_INFO_REQ_UPDATE_COUNT: u8 = 15;
pub const ISC_INFO_REQ_DELETE_COUNT: u8 = 16;

// Statement types (isc_info_sql_stmt_*)
pub const ISC_INFO_SQL_STMT_SELECT: i32 = 1;
pub const ISC_INFO_SQL_STMT_INSERT: i32 = 2;
pub const ISC_INFO_SQL_STMT_UPDATE: i32 = 3;
pub const ISC_INFO_SQL_STMT_DELETE: i32 = 4;
pub const ISC_INFO_SQL_STMT_DDL: i32 = 5;
pub const ISC_INFO_SQL_STMT_GET_SEGMENT: i32 = 6;
pub const ISC_INFO_SQL_STMT_PUT_SEGMENT: i32 = 7;
pub const ISC_INFO_SQL_STMT_EXEC_PROCEDURE: i32 = 8;
pub const ISC_INFO_SQL_STMT_START_TRANS: i32 = 9;
pub const ISC_INFO_SQL_STMT_COMMIT: i32 = 10;
pub const ISC_INFO_SQL_STMT_ROLLBACK: i32 = 11;
pub const ISC_INFO_SQL_STMT_SELECT_FOR_UPD: i32 = 12;
pub const ISC_INFO_SQL_STMT_SET_GENERATOR: i32 = 13;
pub const ISC_INFO_SQL_STMT_SAVEPOINT: i32 = 14;

// Blob info items
pub const ISC_INFO_BLOB_NUM_SEGMENTS: u8 = 4;
pub const ISC_INFO_BLOB_MAX_SEGMENT: u8 = 5;
pub const ISC_INFO_BLOB_TOTAL_LENGTH: u8 = 6;
pub const ISC_INFO_BLOB_TYPE: u8 = 7;

// op_get_segment response handle values
pub const BLOB_SEGMENT: i32 = 1;
pub const BLOB_EOF: i32 = 2;

// Blob seek modes
pub const BLOB_SEEK_FROM_START: i32 = 0;
pub const BLOB_SEEK_FROM_CURRENT: i32 = 1;
pub const BLOB_SEEK_FROM_END: i32 = 2;

// Status vector argument kinds
pub const ISC_ARG_END: i32 = 0;
pub const ISC_ARG_GDS: i32 = 1;
pub const ISC_ARG_STRING: i32 = 2;
pub const ISC_ARG_CSTRING: i32 = 3;
pub const ISC_ARG_NUMBER: i32 = 4;
pub const ISC_ARG_INTERPRETED: i32 = 5;
pub const ISC_ARG_WARNING: i32 = 18;
pub const ISC_ARG_SQL_STATE: i32 = 19;

// Error codes raised by the client itself
pub const ISC_ARITH_EXCEPT: i32 = 335544321;
pub const ISC_BAD_REQ_HANDLE: i32 = 335544327;
pub const ISC_BAD_SEGSTR_HANDLE: i32 = 335544328;
pub const ISC_BAD_TRANS_HANDLE: i32 = 335544332;
pub const ISC_SEGSTR_EOF: i32 = 335544367;
pub const ISC_NET_READ_ERR: i32 = 335544726;
pub const ISC_NET_WRITE_ERR: i32 = 335544727;
pub const ISC_CANCELLED: i32 = 335544794;

// BLR
pub const BLR_VERSION5: u8 = 5;
pub const BLR_BEGIN: u8 = 2;
pub const BLR_MESSAGE: u8 = 4;
pub const BLR_END: u8 = 255;
pub const BLR_EOC: u8 = 76;

pub const BLR_TEXT: u8 = 14;
pub const BLR_TEXT2: u8 = 15;
pub const BLR_SHORT: u8 = 7;
pub const BLR_LONG: u8 = 8;
pub const BLR_QUAD: u8 = 9;
pub const BLR_FLOAT: u8 = 10;
pub const BLR_D_FLOAT: u8 = 11;
pub const BLR_SQL_DATE: u8 = 12;
pub const BLR_SQL_TIME: u8 = 13;
pub const BLR_INT64: u8 = 16;
pub const BLR_BOOL: u8 = 23;
pub const BLR_DEC64: u8 = 24;
pub const BLR_DEC128: u8 = 25;
pub const BLR_INT128: u8 = 26;
pub const BLR_DOUBLE: u8 = 27;
pub const BLR_SQL_TIME_TZ: u8 = 28;
pub const BLR_TIMESTAMP_TZ: u8 = 29;
pub const BLR_EX_TIME_TZ: u8 = 30;
pub const BLR_EX_TIMESTAMP_TZ: u8 = 31;
pub const BLR_TIMESTAMP: u8 = 35;
pub const BLR_VARYING: u8 = 37;
pub const BLR_VARYING2: u8 = 38;
pub const BLR_CSTRING: u8 = 40;
pub const BLR_BLOB2: u8 = 17;

// SDL (array slice description language)
pub const ISC_SDL_VERSION1: u8 = 1;
pub const ISC_SDL_EOC: u8 = 255;
pub const ISC_SDL_RELATION: u8 = 2;
pub const ISC_SDL_FIELD: u8 = 4;
pub const ISC_SDL_STRUCT: u8 = 6;
pub const ISC_SDL_VARIABLE: u8 = 7;
pub const ISC_SDL_SCALAR: u8 = 8;
pub const ISC_SDL_TINY_INTEGER: u8 = 9;
pub const ISC_SDL_SHORT_INTEGER: u8 = 10;
pub const ISC_SDL_LONG_INTEGER: u8 = 11;
pub const ISC_SDL_DO2: u8 = 34;
pub const ISC_SDL_DO1: u8 = 35;
pub const ISC_SDL_ELEMENT: u8 = 36;

// Transaction parameter buffer
pub const ISC_TPB_VERSION3: u8 = 3;
pub const ISC_TPB_CONCURRENCY: u8 = 2;
pub const ISC_TPB_WAIT: u8 = 6;
pub const ISC_TPB_NOWAIT: u8 = 7;
pub const ISC_TPB_READ: u8 = 8;
pub const ISC_TPB_WRITE: u8 = 9;
pub const ISC_TPB_READ_COMMITTED: u8 = 15;
pub const ISC_TPB_REC_VERSION: u8 = 17;

// Blob parameter buffer
pub const ISC_BPB_VERSION1: u8 = 1;

// Batch parameter buffer (IBatch::VERSION1 and tags)
pub const BATCH_VERSION1: u8 = 1;
pub const BATCH_TAG_MULTIERROR: u8 = 1;
pub const BATCH_TAG_RECORD_COUNTS: u8 = 2;

// Charset ids
pub const CS_NONE: u8 = 0;
pub const CS_OCTETS: u8 = 1;
pub const CS_ASCII: u8 = 2;
pub const CS_UNICODE_FSS: u8 = 3;
pub const CS_UTF8: u8 = 4;
pub const CS_ISO8859_1: u8 = 21;
pub const CS_WIN1252: u8 = 53;
pub const CS_DYNAMIC: u8 = 127;

// Blob subtypes
pub const BLOB_SUB_TYPE_BINARY: i16 = 0;
pub const BLOB_SUB_TYPE_TEXT: i16 = 1;

// Buffer sizes
pub const DEFAULT_MAX_BUFFER_SIZE: i32 = 32767;
pub const ROWS_AFFECTED_BUFFER_SIZE: i32 = 34;
pub const STATEMENT_TYPE_BUFFER_SIZE: i32 = 8;
pub const BLOB_INFO_BUFFER_SIZE: i32 = 32;
pub const PREPARE_INFO_BUFFER_SIZE: i32 = 32768;

// Time zones
pub const TZ_GMT: u16 = 65535;
pub const TZ_ONE_DAY_MINUTES: i32 = 1439;

// Protocol defaults
pub const DEFAULT_PORT: u16 = 3050;
pub const DEFAULT_FETCH_SIZE: u32 = 200;
pub const DEFAULT_PACKET_SIZE: u32 = 8192;
pub const INVALID_OBJECT: i32 = 0xFFFF;

/// Human-readable operation name for tracing.
pub fn operation_name(op: i32) -> &'static str {
    match op {
        OP_RESPONSE => "op_response",
        OP_TRANSACTION => "op_transaction",
        OP_COMMIT => "op_commit",
        OP_ROLLBACK => "op_rollback",
        OP_CREATE_BLOB2 => "op_create_blob2",
        OP_OPEN_BLOB2 => "op_open_blob2",
        OP_GET_SEGMENT => "op_get_segment",
        OP_PUT_SEGMENT => "op_put_segment",
        OP_CANCEL_BLOB => "op_cancel_blob",
        OP_CLOSE_BLOB => "op_close_blob",
        OP_INFO_BLOB => "op_info_blob",
        OP_SEEK_BLOB => "op_seek_blob",
        OP_COMMIT_RETAINING => "op_commit_retaining",
        OP_ROLLBACK_RETAINING => "op_rollback_retaining",
        OP_GET_SLICE => "op_get_slice",
        OP_PUT_SLICE => "op_put_slice",
        OP_SLICE => "op_slice",
        OP_ALLOCATE_STATEMENT => "op_allocate_statement",
        OP_EXECUTE => "op_execute",
        OP_EXECUTE2 => "op_execute2",
        OP_FETCH => "op_fetch",
        OP_FETCH_RESPONSE => "op_fetch_response",
        OP_FREE_STATEMENT => "op_free_statement",
        OP_PREPARE_STATEMENT => "op_prepare_statement",
        OP_INFO_SQL => "op_info_sql",
        OP_SQL_RESPONSE => "op_sql_response",
        OP_CANCEL => "op_cancel",
        OP_PING => "op_ping",
        OP_BATCH_CREATE => "op_batch_create",
        OP_BATCH_MSG => "op_batch_msg",
        OP_BATCH_EXEC => "op_batch_exec",
        OP_BATCH_RLS => "op_batch_rls",
        OP_BATCH_CS => "op_batch_cs",
        _ => "op_unknown",
    }
}
