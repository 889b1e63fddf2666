//! In-process server speaking the statement subset of the remote protocol.
//!
//! Requests are decoded with the crate's own XDR reader and row codec, so a
//! scripted statement only has to declare its columns, parameters and rows.

#![allow(dead_code)]

use firebird_thin_rs::protocol::buffer::{write_clumplet_bytes, write_clumplet_int};
use firebird_thin_rs::protocol::constants::*;
use firebird_thin_rs::protocol::row::{bitmap_len, read_row, read_value, write_value, MessageFormat};
use firebird_thin_rs::protocol::{WriteExt, XdrReader};
use firebird_thin_rs::{ArrayDescriptor, Database, DatabaseOptions, DbField, Result, Storage};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::io::{duplex, split, DuplexStream, ReadHalf};

/// Error code sent for SQL the script does not know.
pub const UNKNOWN_TABLE: i32 = 335544580;
/// Error code sent for a batch message marked to fail.
pub const BATCH_ROW_FAILED: i32 = 335544665;

// ============================================================================
// Script
// ============================================================================

/// One column or parameter as the server describes it.
#[derive(Debug, Clone)]
pub struct Column {
    pub sql_type: i32,
    pub sub_type: i16,
    pub scale: i16,
    pub length: i16,
    pub name: String,
    pub relation: String,
}

impl Column {
    fn new(sql_type: i32, length: i16, name: &str) -> Self {
        Self {
            sql_type,
            sub_type: 0,
            scale: 0,
            length,
            name: name.to_string(),
            relation: String::new(),
        }
    }

    pub fn int(name: &str) -> Self {
        Self::new(SQL_LONG + 1, 4, name)
    }

    pub fn smallint(name: &str) -> Self {
        Self::new(SQL_SHORT + 1, 2, name)
    }

    pub fn varchar(name: &str, chars: i16) -> Self {
        let mut column = Self::new(SQL_VARYING + 1, chars * 4, name);
        column.sub_type = CS_UTF8 as i16;
        column
    }

    pub fn text_blob(name: &str) -> Self {
        let mut column = Self::new(SQL_BLOB + 1, 8, name);
        column.sub_type = BLOB_SUB_TYPE_TEXT;
        column.scale = CS_UTF8 as i16;
        column
    }

    pub fn binary_blob(name: &str) -> Self {
        Self::new(SQL_BLOB + 1, 8, name)
    }

    pub fn array(name: &str) -> Self {
        Self::new(SQL_ARRAY + 1, 8, name)
    }

    pub fn of(mut self, relation: &str) -> Self {
        self.relation = relation.to_string();
        self
    }

    fn to_field(&self) -> Arc<DbField> {
        let mut field = DbField::new(self.sql_type, self.length);
        field.sub_type = self.sub_type;
        field.scale = self.scale;
        field.name = self.name.clone();
        field.relation = self.relation.clone();
        Arc::new(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    ArrayDescriptor,
    ArrayBounds,
}

/// Statement the server knows by its SQL text.
#[derive(Debug, Clone)]
pub struct Scripted {
    pub kind: i32,
    pub columns: Vec<Column>,
    pub params: Vec<Column>,
    pub rows: Vec<Vec<Storage>>,
    /// Inserted, updated and deleted rows reported after execute.
    pub counts: (i32, i32, i32),
    pub plan: String,
    /// Batch messages (by index) answered with an error.
    pub failing_messages: Vec<usize>,
    lookup: Option<Lookup>,
}

impl Scripted {
    fn of_kind(kind: i32) -> Self {
        Self {
            kind,
            columns: Vec::new(),
            params: Vec::new(),
            rows: Vec::new(),
            counts: (0, 0, 0),
            plan: String::new(),
            failing_messages: Vec::new(),
            lookup: None,
        }
    }

    pub fn select(columns: Vec<Column>, rows: Vec<Vec<Storage>>) -> Self {
        Self {
            columns,
            rows,
            ..Self::of_kind(ISC_INFO_SQL_STMT_SELECT)
        }
    }

    /// Stored procedure answering `op_execute2` with one output row.
    pub fn procedure(columns: Vec<Column>, output: Vec<Storage>) -> Self {
        Self {
            columns,
            rows: vec![output],
            ..Self::of_kind(ISC_INFO_SQL_STMT_EXEC_PROCEDURE)
        }
    }

    pub fn insert(params: Vec<Column>) -> Self {
        Self {
            params,
            counts: (1, 0, 0),
            ..Self::of_kind(ISC_INFO_SQL_STMT_INSERT)
        }
    }

    pub fn update(params: Vec<Column>, updated: i32) -> Self {
        Self {
            params,
            counts: (0, updated, 0),
            ..Self::of_kind(ISC_INFO_SQL_STMT_UPDATE)
        }
    }

    pub fn with_params(mut self, params: Vec<Column>) -> Self {
        self.params = params;
        self
    }

    pub fn with_plan(mut self, plan: &str) -> Self {
        self.plan = plan.to_string();
        self
    }

    pub fn failing(mut self, messages: Vec<usize>) -> Self {
        self.failing_messages = messages;
        self
    }

    fn lookup(lookup: Lookup) -> Self {
        let relation_params = vec![Column::varchar("RDB$RELATION_NAME", 63), Column::varchar("RDB$FIELD_NAME", 63)];
        let columns = match lookup {
            Lookup::ArrayDescriptor => [
                "RDB$FIELD_TYPE",
                "RDB$FIELD_SCALE",
                "RDB$FIELD_LENGTH",
                "RDB$FIELD_SUB_TYPE",
                "RDB$CHARACTER_SET_ID",
                "RDB$DIMENSIONS",
            ]
            .iter()
            .map(|name| Column::smallint(name))
            .collect(),
            Lookup::ArrayBounds => vec![Column::int("RDB$LOWER_BOUND"), Column::int("RDB$UPPER_BOUND")],
        };
        Self {
            lookup: Some(lookup),
            ..Self::select(columns, Vec::new()).with_params(relation_params)
        }
    }
}

/// How the server misbehaves on a given operation.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Answer with an error status vector.
    Status(i32),
    /// Drop the connection after reading the request.
    Disconnect,
}

/// What the server saw, shared with the test.
#[derive(Debug, Default)]
pub struct Journal {
    pub ops: Vec<i32>,
    pub params: Vec<Vec<Storage>>,
    pub batch_messages: Vec<Vec<Storage>>,
    pub timeouts: Vec<Option<u32>>,
    pub cancels: Vec<i32>,
    pub frees: Vec<(i32, i32)>,
    pub fetch_sizes: Vec<u32>,
    pub blobs: HashMap<i64, Vec<u8>>,
    pub arrays: HashMap<i64, Vec<Storage>>,
}

pub type SharedJournal = Arc<Mutex<Journal>>;

/// Scripted server, configured before it is started.
pub struct FakeServer {
    options: DatabaseOptions,
    statements: HashMap<String, Scripted>,
    describe_cap: usize,
    faults: Vec<(i32, Fault)>,
    array_columns: Vec<ArrayDescriptor>,
    journal: SharedJournal,
}

impl FakeServer {
    pub fn new(options: DatabaseOptions) -> Self {
        Self {
            options,
            statements: HashMap::new(),
            describe_cap: usize::MAX,
            faults: Vec::new(),
            array_columns: Vec::new(),
            journal: SharedJournal::default(),
        }
    }

    pub fn statement(mut self, sql: &str, scripted: Scripted) -> Self {
        self.statements.insert(sql.to_string(), scripted);
        self
    }

    /// Fields described per describe reply before it is truncated.
    pub fn describe_cap(mut self, cap: usize) -> Self {
        self.describe_cap = cap;
        self
    }

    /// Misbehave on the first request with operation `op`.
    pub fn fault(mut self, op: i32, fault: Fault) -> Self {
        self.faults.push((op, fault));
        self
    }

    pub fn blob(self, id: i64, data: &[u8]) -> Self {
        self.lock().blobs.insert(id, data.to_vec());
        self
    }

    pub fn array_column(mut self, descriptor: ArrayDescriptor) -> Self {
        self.array_columns.push(descriptor);
        self
    }

    pub fn array_data(self, id: i64, values: Vec<Storage>) -> Self {
        self.lock().arrays.insert(id, values);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }

    /// Client stream, options, journal and the server future.
    pub fn into_parts(
        self,
    ) -> (
        DuplexStream,
        DatabaseOptions,
        SharedJournal,
        impl Future<Output = ()> + Send + 'static,
    ) {
        let (client, server) = duplex(256 * 1024);
        let options = self.options.clone();
        let journal = self.journal.clone();
        let session = Session {
            format: options.protocol.message_format(),
            timeouts: options.protocol.supports_statement_timeout(),
            script: self,
            next_handle: 1,
            next_id: 1000,
            statements: HashMap::new(),
            pending: HashMap::new(),
            blob_handles: HashMap::new(),
            batch_pending: HashMap::new(),
        };
        (client, options, journal, session.run(server))
    }

    /// Spawn the server and return a database attached to it.
    pub fn start(self) -> (Database, SharedJournal) {
        let (client, options, journal, server) = self.into_parts();
        tokio::spawn(server);
        (Database::from_stream(client, 1, options), journal)
    }
}

// ============================================================================
// Session
// ============================================================================

struct Session {
    script: FakeServer,
    format: MessageFormat,
    timeouts: bool,
    next_handle: i32,
    next_id: i64,
    statements: HashMap<i32, Scripted>,
    pending: HashMap<i32, VecDeque<Vec<Storage>>>,
    blob_handles: HashMap<i32, (i64, usize)>,
    batch_pending: HashMap<i32, Vec<Vec<Storage>>>,
}

type Reader = XdrReader<ReadHalf<DuplexStream>>;

fn ok(handle: i32, id: i64, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_i32(OP_RESPONSE);
    buf.write_i32(handle);
    buf.write_i64(id);
    buf.write_buffer(data);
    buf.write_i32(ISC_ARG_GDS);
    buf.write_i32(0);
    buf.write_i32(ISC_ARG_END);
    buf
}

fn error(code: i32) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_i32(OP_RESPONSE);
    buf.write_i32(0);
    buf.write_i64(0);
    buf.write_buffer(&[]);
    buf.write_i32(ISC_ARG_GDS);
    buf.write_i32(code);
    buf.write_i32(ISC_ARG_END);
    buf
}

fn fields(columns: &[Column]) -> Vec<Arc<DbField>> {
    columns.iter().map(Column::to_field).collect()
}

fn describe_column(out: &mut Vec<u8>, seq: usize, column: &Column) {
    write_clumplet_int(out, ISC_INFO_SQL_SQLDA_SEQ, seq as i32);
    write_clumplet_int(out, ISC_INFO_SQL_TYPE, column.sql_type);
    write_clumplet_int(out, ISC_INFO_SQL_SUB_TYPE, column.sub_type as i32);
    write_clumplet_int(out, ISC_INFO_SQL_SCALE, column.scale as i32);
    write_clumplet_int(out, ISC_INFO_SQL_LENGTH, column.length as i32);
    write_clumplet_bytes(out, ISC_INFO_SQL_FIELD, column.name.as_bytes());
    write_clumplet_bytes(out, ISC_INFO_SQL_RELATION, column.relation.as_bytes());
    write_clumplet_bytes(out, ISC_INFO_SQL_OWNER, b"SYSDBA");
    write_clumplet_bytes(out, ISC_INFO_SQL_ALIAS, column.name.as_bytes());
    out.push(ISC_INFO_SQL_DESCRIBE_END);
}

/// First field (1-based) requested per group by a describe continuation.
fn continuation_starts(items: &[u8]) -> [usize; 2] {
    let mut starts = Vec::new();
    let mut i = 0;
    while i < items.len() {
        if items[i] == ISC_INFO_SQL_DESCRIBE_VARS
            && items.get(i + 1) == Some(&ISC_INFO_SQL_SQLDA_START)
            && i + 4 < items.len()
        {
            starts.push(u16::from_le_bytes([items[i + 3], items[i + 4]]) as usize);
            i += 5;
        } else {
            i += 1;
        }
    }
    [
        starts.first().copied().unwrap_or(1).max(1),
        starts.get(1).copied().unwrap_or(1).max(1),
    ]
}

impl Session {
    async fn run(mut self, stream: DuplexStream) {
        let (read, mut write) = split(stream);
        let mut reader = XdrReader::new(read);
        loop {
            let Ok(op) = reader.read_operation().await else {
                return;
            };
            self.script.lock().ops.push(op);
            let fault = self
                .script
                .faults
                .iter()
                .position(|(target, _)| *target == op)
                .map(|index| self.script.faults.remove(index).1);

            let reply = match self.handle(op, &mut reader).await {
                Ok(Some(reply)) => reply,
                Ok(None) => continue,
                Err(_) => return,
            };
            let reply = match fault {
                Some(Fault::Disconnect) => return,
                Some(Fault::Status(code)) => error(code),
                None => reply,
            };
            if tokio::io::AsyncWriteExt::write_all(&mut write, &reply).await.is_err() {
                return;
            }
        }
    }

    fn scripted_for(&self, sql: &str) -> Option<Scripted> {
        if sql.starts_with("SELECT F.RDB$FIELD_TYPE") {
            return Some(Scripted::lookup(Lookup::ArrayDescriptor));
        }
        if sql.starts_with("SELECT D.RDB$LOWER_BOUND") {
            return Some(Scripted::lookup(Lookup::ArrayBounds));
        }
        self.script.statements.get(sql).cloned()
    }

    fn handle_for(&mut self) -> i32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn id_for(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    async fn handle(&mut self, op: i32, reader: &mut Reader) -> Result<Option<Vec<u8>>> {
        let reply = match op {
            OP_PING => ok(0, 0, &[]),
            OP_CANCEL => {
                let kind = reader.read_i32().await?;
                self.script.lock().cancels.push(kind);
                return Ok(None);
            }
            OP_TRANSACTION => {
                reader.read_i32().await?;
                reader.read_buffer().await?;
                ok(self.handle_for(), 0, &[])
            }
            OP_COMMIT | OP_ROLLBACK | OP_COMMIT_RETAINING | OP_ROLLBACK_RETAINING => {
                reader.read_i32().await?;
                ok(0, 0, &[])
            }
            OP_ALLOCATE_STATEMENT => {
                reader.read_i32().await?;
                ok(self.handle_for(), 0, &[])
            }
            OP_PREPARE_STATEMENT => self.prepare(reader).await?,
            OP_INFO_SQL => self.info_sql(reader).await?,
            OP_EXECUTE | OP_EXECUTE2 => self.execute(op, reader).await?,
            OP_FETCH => self.fetch(reader).await?,
            OP_FREE_STATEMENT => {
                let statement = reader.read_i32().await?;
                let option = reader.read_i32().await?;
                self.script.lock().frees.push((statement, option));
                self.pending.remove(&statement);
                if option == DSQL_DROP {
                    self.statements.remove(&statement);
                }
                ok(0, 0, &[])
            }
            OP_CREATE_BLOB2 | OP_OPEN_BLOB2 => {
                reader.read_buffer().await?;
                reader.read_i32().await?;
                let requested = reader.read_i64().await?;
                let id = if op == OP_CREATE_BLOB2 {
                    let id = self.id_for();
                    self.script.lock().blobs.insert(id, Vec::new());
                    id
                } else if self.script.lock().blobs.contains_key(&requested) {
                    requested
                } else {
                    return Ok(Some(error(ISC_BAD_SEGSTR_HANDLE)));
                };
                let handle = self.handle_for();
                self.blob_handles.insert(handle, (id, 0));
                ok(handle, id, &[])
            }
            OP_PUT_SEGMENT => {
                let handle = reader.read_i32().await?;
                reader.read_i32().await?;
                let data = reader.read_buffer().await?;
                let (id, _) = self.blob_handles[&handle];
                self.script
                    .lock()
                    .blobs
                    .entry(id)
                    .or_default()
                    .extend_from_slice(&data);
                ok(0, 0, &[])
            }
            OP_GET_SEGMENT => {
                let handle = reader.read_i32().await?;
                let length = reader.read_i32().await?.max(3) as usize;
                reader.read_buffer().await?;
                let (id, pos) = self.blob_handles[&handle];
                let content = self.script.lock().blobs.get(&id).cloned().unwrap_or_default();
                let end = (pos + length - 2).min(content.len());
                let mut data = Vec::new();
                write_chunk(&mut data, &content[pos..end]);
                self.blob_handles.insert(handle, (id, end));
                let status = if end >= content.len() { BLOB_EOF } else { 0 };
                ok(status, 0, &data)
            }
            OP_SEEK_BLOB => {
                let handle = reader.read_i32().await?;
                let mode = reader.read_i32().await?;
                let offset = reader.read_i32().await?;
                let (id, pos) = self.blob_handles[&handle];
                let len = self.script.lock().blobs.get(&id).map_or(0, Vec::len) as i64;
                let target = match mode {
                    BLOB_SEEK_FROM_CURRENT => pos as i64 + offset as i64,
                    BLOB_SEEK_FROM_END => len + offset as i64,
                    _ => offset as i64,
                }
                .clamp(0, len);
                self.blob_handles.insert(handle, (id, target as usize));
                ok(target as i32, 0, &[])
            }
            OP_INFO_BLOB => {
                let handle = reader.read_i32().await?;
                reader.read_i32().await?;
                reader.read_buffer().await?;
                reader.read_i32().await?;
                let (id, _) = self.blob_handles[&handle];
                let len = self.script.lock().blobs.get(&id).map_or(0, Vec::len);
                let mut data = Vec::new();
                write_clumplet_int(&mut data, ISC_INFO_BLOB_TOTAL_LENGTH, len as i32);
                data.push(ISC_INFO_END);
                ok(0, 0, &data)
            }
            OP_CLOSE_BLOB | OP_CANCEL_BLOB => {
                let handle = reader.read_i32().await?;
                if let Some((id, _)) = self.blob_handles.remove(&handle) {
                    if op == OP_CANCEL_BLOB {
                        self.script.lock().blobs.remove(&id);
                    }
                }
                ok(0, 0, &[])
            }
            OP_GET_SLICE => self.get_slice(reader).await?,
            OP_PUT_SLICE => self.put_slice(reader).await?,
            OP_BATCH_CREATE => {
                let statement = reader.read_i32().await?;
                reader.read_buffer().await?;
                reader.read_i32().await?;
                reader.read_buffer().await?;
                self.batch_pending.insert(statement, Vec::new());
                ok(0, 0, &[])
            }
            OP_BATCH_MSG => {
                let statement = reader.read_i32().await?;
                let count = reader.read_i32().await?;
                let params = fields(&self.statements[&statement].params);
                for _ in 0..count {
                    let mut row = Vec::new();
                    read_row(reader, &params, self.format, &mut row).await?;
                    self.script.lock().batch_messages.push(row.clone());
                    self.batch_pending.entry(statement).or_default().push(row);
                }
                ok(0, 0, &[])
            }
            OP_BATCH_EXEC => {
                let statement = reader.read_i32().await?;
                reader.read_i32().await?;
                let messages = self.batch_pending.insert(statement, Vec::new()).unwrap_or_default();
                let failing = self.statements[&statement].failing_messages.clone();
                batch_completion(statement, messages.len(), &failing)
            }
            OP_BATCH_RLS => {
                let statement = reader.read_i32().await?;
                self.batch_pending.remove(&statement);
                ok(0, 0, &[])
            }
            _ => return Err(firebird_thin_rs::Error::protocol(format!("unscripted operation {}", op))),
        };
        Ok(Some(reply))
    }

    async fn prepare(&mut self, reader: &mut Reader) -> Result<Vec<u8>> {
        reader.read_i32().await?;
        let statement = reader.read_i32().await?;
        reader.read_i32().await?;
        let sql = reader.read_string().await?;
        reader.read_buffer().await?;
        reader.read_i32().await?;

        let Some(scripted) = self.scripted_for(&sql) else {
            return Ok(error(UNKNOWN_TABLE));
        };
        let data = self.describe(&scripted, [1, 1]);
        self.statements.insert(statement, scripted);
        Ok(ok(0, 0, &data))
    }

    fn describe(&self, scripted: &Scripted, starts: [usize; 2]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut budget = self.script.describe_cap;
        let groups = [
            (ISC_INFO_SQL_SELECT, &scripted.columns),
            (ISC_INFO_SQL_BIND, &scripted.params),
        ];
        for (g, (group, columns)) in groups.into_iter().enumerate() {
            out.push(group);
            write_clumplet_int(&mut out, ISC_INFO_SQL_DESCRIBE_VARS, columns.len() as i32);
            for (i, column) in columns.iter().enumerate().skip(starts[g] - 1) {
                if budget == 0 {
                    out.push(ISC_INFO_TRUNCATED);
                    return out;
                }
                budget -= 1;
                describe_column(&mut out, i + 1, column);
            }
        }
        out.push(ISC_INFO_END);
        out
    }

    async fn info_sql(&mut self, reader: &mut Reader) -> Result<Vec<u8>> {
        let statement = reader.read_i32().await?;
        reader.read_i32().await?;
        let items = reader.read_buffer().await?;
        let buffer_length = reader.read_i32().await?.max(0) as usize;
        let Some(scripted) = self.statements.get(&statement).cloned() else {
            return Ok(error(ISC_BAD_REQ_HANDLE));
        };

        let mut data = Vec::new();
        match items.first().copied() {
            Some(ISC_INFO_SQL_SELECT) => {
                data = self.describe(&scripted, continuation_starts(&items));
            }
            Some(ISC_INFO_SQL_STMT_TYPE) => {
                write_clumplet_int(&mut data, ISC_INFO_SQL_STMT_TYPE, scripted.kind);
                data.push(ISC_INFO_END);
            }
            Some(ISC_INFO_SQL_RECORDS) => {
                let (inserted, updated, deleted) = scripted.counts;
                let mut counters = Vec::new();
                write_clumplet_int(&mut counters, ISC_INFO_REQ_SELECT_COUNT, scripted.rows.len() as i32);
                write_clumplet_int(&mut counters, ISC_INFO_REQ_INSERT_COUNT, inserted);
                write_clumplet_int(&mut counters, ISC_INFO_REQ_UPDATE_COUNT, updated);
                write_clumplet_int(&mut counters, ISC_INFO_REQ_DELETE_COUNT, deleted);
                counters.push(ISC_INFO_END);
                write_clumplet_bytes(&mut data, ISC_INFO_SQL_RECORDS, &counters);
                data.push(ISC_INFO_END);
            }
            Some(item @ (ISC_INFO_SQL_GET_PLAN | ISC_INFO_SQL_EXPLAIN_PLAN)) => {
                let text = if item == ISC_INFO_SQL_EXPLAIN_PLAN {
                    format!("\nSelect Expression\n    -> {}", scripted.plan)
                } else {
                    format!("\n{}", scripted.plan)
                };
                if text.len() + 4 > buffer_length {
                    data.push(ISC_INFO_TRUNCATED);
                } else {
                    write_clumplet_bytes(&mut data, item, text.as_bytes());
                    data.push(ISC_INFO_END);
                }
            }
            _ => data.push(ISC_INFO_END),
        }
        Ok(ok(0, 0, &data))
    }

    async fn execute(&mut self, op: i32, reader: &mut Reader) -> Result<Vec<u8>> {
        let statement = reader.read_i32().await?;
        reader.read_i32().await?;
        reader.read_buffer().await?;
        reader.read_i32().await?;
        let count = reader.read_i32().await?;
        let Some(scripted) = self.statements.get(&statement).cloned() else {
            return Ok(error(ISC_BAD_REQ_HANDLE));
        };
        let mut params = Vec::new();
        if count > 0 {
            read_row(reader, &fields(&scripted.params), self.format, &mut params).await?;
        }
        if op == OP_EXECUTE2 {
            reader.read_buffer().await?;
            reader.read_i32().await?;
        }
        let timeout = if self.timeouts {
            Some(reader.read_u32().await?)
        } else {
            None
        };
        {
            let mut journal = self.script.lock();
            journal.params.push(params.clone());
            journal.timeouts.push(timeout);
        }

        let rows = match scripted.lookup {
            Some(lookup) => self.lookup_rows(lookup, &params),
            None => scripted.rows.clone(),
        };

        if op == OP_EXECUTE2 {
            let mut reply = Vec::new();
            reply.write_i32(OP_SQL_RESPONSE);
            match rows.first() {
                Some(row) => {
                    reply.write_i32(1);
                    self.encode_row(&mut reply, &fields(&scripted.columns), row)?;
                }
                None => reply.write_i32(0),
            }
            reply.extend_from_slice(&ok(0, 0, &[]));
            return Ok(reply);
        }
        self.pending.insert(statement, rows.into());
        Ok(ok(0, 0, &[]))
    }

    fn lookup_rows(&self, lookup: Lookup, params: &[Storage]) -> Vec<Vec<Storage>> {
        let (Some(Storage::String(relation)), Some(Storage::String(field))) = (params.first(), params.get(1))
        else {
            return Vec::new();
        };
        let Some(descriptor) = self
            .script
            .array_columns
            .iter()
            .find(|d| &d.relation == relation && &d.field == field)
        else {
            return Vec::new();
        };
        match lookup {
            Lookup::ArrayDescriptor => vec![vec![
                Storage::Int16(descriptor.blr_type as i16),
                Storage::Int16(descriptor.scale),
                Storage::Int16(descriptor.length),
                Storage::Int16(descriptor.sub_type),
                Storage::Int16(descriptor.sub_type),
                Storage::Int16(descriptor.bounds.len() as i16),
            ]],
            Lookup::ArrayBounds => descriptor
                .bounds
                .iter()
                .map(|b| vec![Storage::Int32(b.lower), Storage::Int32(b.upper)])
                .collect(),
        }
    }

    fn encode_row(&self, buf: &mut Vec<u8>, fields: &[Arc<DbField>], values: &[Storage]) -> Result<()> {
        match self.format {
            MessageFormat::NullBitmap => {
                let mut bitmap = vec![0u8; bitmap_len(fields.len())];
                for (i, value) in values.iter().enumerate() {
                    if value.is_null() {
                        bitmap[i / 8] |= 1 << (i % 8);
                    }
                }
                buf.write_opaque(&bitmap);
                for (field, value) in fields.iter().zip(values).filter(|(_, v)| !v.is_null()) {
                    write_value(buf, field, value)?;
                }
            }
            MessageFormat::IndicatorWords => {
                for (field, value) in fields.iter().zip(values) {
                    write_value(buf, field, value)?;
                    buf.write_i32(if value.is_null() { -1 } else { 0 });
                }
            }
        }
        Ok(())
    }

    async fn fetch(&mut self, reader: &mut Reader) -> Result<Vec<u8>> {
        let statement = reader.read_i32().await?;
        reader.read_buffer().await?;
        reader.read_i32().await?;
        let fetch_size = reader.read_u32().await?;
        self.script.lock().fetch_sizes.push(fetch_size);

        let Some(scripted) = self.statements.get(&statement).cloned() else {
            return Ok(error(ISC_BAD_REQ_HANDLE));
        };
        let columns = fields(&scripted.columns);
        let queue = self.pending.entry(statement).or_default();
        let mut rows = Vec::new();
        while rows.len() < fetch_size as usize {
            match queue.pop_front() {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        let exhausted = queue.is_empty();

        let mut reply = Vec::new();
        for row in &rows {
            reply.write_i32(OP_FETCH_RESPONSE);
            reply.write_i32(0);
            reply.write_i32(1);
            self.encode_row(&mut reply, &columns, row)?;
        }
        reply.write_i32(OP_FETCH_RESPONSE);
        reply.write_i32(if exhausted { 100 } else { 0 });
        reply.write_i32(0);
        Ok(reply)
    }

    fn array_for_sdl(&self, sdl: &[u8]) -> Option<ArrayDescriptor> {
        self.script
            .array_columns
            .iter()
            .find(|d| d.to_sdl() == sdl)
            .cloned()
    }

    async fn get_slice(&mut self, reader: &mut Reader) -> Result<Vec<u8>> {
        reader.read_i32().await?;
        let id = reader.read_i64().await?;
        reader.read_i32().await?;
        let sdl = reader.read_buffer().await?;
        reader.read_buffer().await?;
        reader.read_i32().await?;

        let (Some(descriptor), Some(values)) = (
            self.array_for_sdl(&sdl),
            self.script.lock().arrays.get(&id).cloned(),
        ) else {
            return Ok(error(ISC_BAD_SEGSTR_HANDLE));
        };
        let element = descriptor.element_field()?;
        let length = (values.len() * descriptor.element_size()) as i32;
        let mut reply = Vec::new();
        reply.write_i32(OP_SLICE);
        reply.write_i32(length);
        reply.write_i32(length);
        for value in &values {
            write_value(&mut reply, &element, value)?;
        }
        Ok(reply)
    }

    async fn put_slice(&mut self, reader: &mut Reader) -> Result<Vec<u8>> {
        reader.read_i32().await?;
        reader.read_i64().await?;
        reader.read_i32().await?;
        let sdl = reader.read_buffer().await?;
        reader.read_buffer().await?;
        let length = reader.read_i32().await?.max(0) as usize;
        let Some(descriptor) = self.array_for_sdl(&sdl) else {
            return Err(firebird_thin_rs::Error::protocol("slice for an unknown array"));
        };
        let element = descriptor.element_field()?;
        let mut values = Vec::new();
        for _ in 0..length / descriptor.element_size().max(1) {
            values.push(read_value(reader, &element).await?);
        }
        let id = self.id_for();
        self.script.lock().arrays.insert(id, values);
        Ok(ok(0, id, &[]))
    }
}

fn write_chunk(out: &mut Vec<u8>, chunk: &[u8]) {
    out.extend_from_slice(&(chunk.len() as u16).to_le_bytes());
    out.extend_from_slice(chunk);
}

fn batch_completion(statement: i32, messages: usize, failing: &[usize]) -> Vec<u8> {
    let failing: Vec<usize> = failing.iter().copied().filter(|i| *i < messages).collect();
    let mut reply = Vec::new();
    reply.write_i32(OP_BATCH_CS);
    reply.write_i32(statement);
    reply.write_i32(messages as i32);
    reply.write_i32(messages as i32);
    reply.write_i32(failing.len() as i32);
    reply.write_i32(0);
    for i in 0..messages {
        reply.write_i32(if failing.contains(&i) { -1 } else { 1 });
    }
    for index in failing {
        reply.write_i32(index as i32);
        reply.write_i32(ISC_ARG_GDS);
        reply.write_i32(BATCH_ROW_FAILED);
        reply.write_i32(ISC_ARG_END);
    }
    reply
}

/// Install a subscriber once so `RUST_LOG` works in tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
