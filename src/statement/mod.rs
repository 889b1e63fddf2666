//! Prepared statements.
//!
//! A statement walks through `Deallocated -> Allocated -> Prepared ->
//! Executed`, may be `Closed` (cursor released, statement kept) and lands in
//! `Error` when the connection fails underneath it. Rows fetched ahead of the
//! consumer are queued as pooled storages and copied into one reusable row
//! of [`DbValue`]s on each [`fetch`](Statement::fetch).

mod info;
mod pool;

pub use info::StatementType;
pub use pool::PoolStats;

use crate::array::ArrayHandle;
use crate::blob::{BlobReader, BlobWriter};
use crate::database::{response_operation, Database};
use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::messages::{
    ExecuteMessage, FetchMessage, FreeStatementMessage, HandleMessage, InfoSqlMessage, OutputBlr,
    PrepareMessage,
};
use crate::protocol::response::{FetchResponse, Response, SqlResponse, FETCH_END_OF_CURSOR};
use crate::protocol::row::{read_row, write_row};
use crate::protocol::types::{ArrayDescriptor, DbValue, Descriptor, Storage, ValueLink};
use crate::protocol::ProtocolVersion;
use crate::transaction::{CompletionObserver, Transaction, TransactionInner};
use bytes::Bytes;
use info::{describe_items, parse_plan, parse_records_affected, parse_statement_type, DescribeState, PlanReply};
use pool::RowPool;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Times a plan request is retried with a doubled buffer.
const PLAN_RETRIES: usize = 4;

/// Lifecycle state of a [`Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    Deallocated,
    Allocated,
    Prepared,
    Executed,
    Closed,
    Error,
}

/// Filler that assigns no parameter values.
pub fn no_parameters(_: &mut Descriptor, _: usize) -> Result<()> {
    Ok(())
}

/// Statement state a completing transaction resets directly.
#[derive(Debug)]
struct Cursor {
    state: StatementState,
    transaction: Option<i32>,
    rows: VecDeque<Vec<Storage>>,
    output_params: VecDeque<Vec<Storage>>,
    pool: RowPool,
    all_rows_fetched: bool,
}

impl Cursor {
    fn clear_queues(&mut self) {
        for row in self.rows.drain(..).chain(self.output_params.drain(..)) {
            self.pool.give_back(row);
        }
        self.all_rows_fetched = false;
    }
}

struct CursorCell {
    cursor: Mutex<Cursor>,
    link: Arc<ValueLink>,
}

impl CursorCell {
    fn lock(&self) -> MutexGuard<'_, Cursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CompletionObserver for CursorCell {
    fn notify_completed(&self) {
        let mut cursor = self.lock();
        if cursor.state != StatementState::Deallocated {
            cursor.state = StatementState::Closed;
        }
        tracing::debug!(queued = cursor.rows.len(), "transaction completed under statement");
        cursor.clear_queues();
        cursor.transaction = None;
        self.link.set_transaction(None);
    }
}

/// A statement allocated on an attached database.
pub struct Statement {
    db: Database,
    handle: i32,
    statement_type: StatementType,
    cursor: Arc<CursorCell>,
    /// Transaction this statement is registered with for completion notices.
    subscription: Option<Weak<TransactionInner>>,
    parameters: Option<Descriptor>,
    fields: Option<Descriptor>,
    row: Vec<DbValue>,
    records_affected: i64,
    fetch_size: u32,
    param_buffer: Vec<u8>,
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cursor = self.cursor.lock();
        f.debug_struct("Statement")
            .field("handle", &self.handle)
            .field("state", &cursor.state)
            .field("statement_type", &self.statement_type)
            .field("queued_rows", &cursor.rows.len())
            .finish()
    }
}

fn not_created() -> Error {
    Error::invalid_state("Statement is not correctly created.")
}

impl Statement {
    /// A deallocated statement; [`prepare`](Self::prepare) allocates it.
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            handle: INVALID_OBJECT,
            statement_type: StatementType::None,
            cursor: Arc::new(CursorCell {
                cursor: Mutex::new(Cursor {
                    state: StatementState::Deallocated,
                    transaction: None,
                    rows: VecDeque::new(),
                    output_params: VecDeque::new(),
                    pool: RowPool::default(),
                    all_rows_fetched: false,
                }),
                link: Arc::new(ValueLink::new(db.clone())),
            }),
            subscription: None,
            parameters: None,
            fields: None,
            row: Vec::new(),
            records_affected: -1,
            fetch_size: db.options().fetch_size,
            param_buffer: Vec::new(),
        }
    }

    pub fn handle(&self) -> i32 {
        self.handle
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    pub fn state(&self) -> StatementState {
        self.cursor.lock().state
    }

    fn set_state(&self, state: StatementState) {
        self.cursor.lock().state = state;
    }

    pub fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    /// Rows changed by the last execute, or -1 when not reported.
    pub fn records_affected(&self) -> i64 {
        self.records_affected
    }

    pub fn fetch_size(&self) -> u32 {
        self.fetch_size
    }

    pub fn set_fetch_size(&mut self, fetch_size: u32) {
        self.fetch_size = fetch_size.max(1);
    }

    /// Select-list descriptor, available once prepared.
    pub fn fields(&self) -> Option<&Descriptor> {
        self.fields.as_ref()
    }

    /// Parameter descriptor, available once prepared.
    pub fn parameters(&self) -> Option<&Descriptor> {
        self.parameters.as_ref()
    }

    /// Parameter descriptor for assigning values before execute.
    pub fn parameters_mut(&mut self) -> Option<&mut Descriptor> {
        self.parameters.as_mut()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.cursor.lock().pool.stats()
    }

    // ========================================================================
    // Transaction binding
    // ========================================================================

    /// Run subsequent operations under `transaction`.
    ///
    /// The statement is closed when the transaction commits or rolls back.
    pub fn set_transaction(&mut self, transaction: &Transaction) {
        self.unsubscribe();
        self.subscription = Some(transaction.subscribe(self.observer()));
        self.bind_handle(transaction.handle());
    }

    /// Bind a bare transaction handle without completion tracking.
    pub(crate) fn set_transaction_handle(&mut self, handle: i32) {
        self.unsubscribe();
        self.bind_handle(handle);
    }

    fn observer(&self) -> Weak<dyn CompletionObserver> {
        Arc::downgrade(&self.cursor) as Weak<dyn CompletionObserver>
    }

    fn bind_handle(&self, handle: i32) {
        self.cursor.lock().transaction = Some(handle);
        self.cursor.link.set_transaction(Some(handle));
    }

    fn unsubscribe(&mut self) {
        if let Some(inner) = self.subscription.take().and_then(|weak| weak.upgrade()) {
            inner.unsubscribe(&self.observer());
        }
        self.cursor.lock().transaction = None;
        self.cursor.link.set_transaction(None);
    }

    fn transaction_handle(&self) -> Option<i32> {
        self.cursor.lock().transaction
    }

    pub(crate) fn require_transaction(&self) -> Result<i32> {
        self.transaction_handle()
            .ok_or_else(|| Error::invalid_state("No transaction is associated with the statement."))
    }

    // ========================================================================
    // Housekeeping
    // ========================================================================

    fn clear_queues(&self) {
        self.cursor.lock().clear_queues();
    }

    fn clear_all(&mut self) {
        self.clear_queues();
        self.records_affected = -1;
        self.statement_type = StatementType::None;
        self.parameters = None;
        self.fields = None;
        self.row.clear();
    }

    fn clear_array_handles(&mut self) {
        for descriptor in [&self.fields, &self.parameters].into_iter().flatten() {
            for field in descriptor.fields() {
                field.clear_array_descriptor();
            }
        }
    }

    async fn allocate(&mut self) -> Result<()> {
        let response = {
            let mut conv = self.db.conversation().await;
            conv.call(&HandleMessage::new(OP_ALLOCATE_STATEMENT, self.db.handle()))
                .await?
        };
        self.handle = response.handle;
        self.set_state(StatementState::Allocated);
        tracing::debug!(handle = self.handle, "statement allocated");
        Ok(())
    }

    async fn free(&mut self, option: i32) -> Result<()> {
        if self.statement_type == StatementType::StoredProcedure && option == DSQL_CLOSE {
            return Ok(());
        }
        let mut conv = self.db.conversation().await;
        conv.call(&FreeStatementMessage {
            statement: self.handle,
            option,
        })
        .await
        .map(|_| ())
    }

    async fn sql_info(&self, items: &[u8], buffer_length: i32) -> Result<Bytes> {
        let mut conv = self.db.conversation().await;
        let response = conv
            .call(&InfoSqlMessage {
                statement: self.handle,
                items,
                buffer_length,
            })
            .await?;
        Ok(response.data)
    }

    // ========================================================================
    // Prepare
    // ========================================================================

    /// Prepare `sql`, allocating the statement first when needed.
    pub async fn prepare(&mut self, sql: &str) -> Result<()> {
        self.clear_all();
        let result = self.prepare_inner(sql).await;
        if let Err(e) = &result {
            if e.is_network() && self.state() == StatementState::Allocated {
                self.set_state(StatementState::Error);
            }
        }
        result
    }

    async fn prepare_inner(&mut self, sql: &str) -> Result<()> {
        if self.state() == StatementState::Deallocated {
            self.allocate().await?;
        }

        let charset = self.db.options().charset;
        let sql_bytes = charset.encode(sql)?;
        let items = describe_items();
        let response = {
            let mut conv = self.db.conversation().await;
            conv.call(&PrepareMessage {
                transaction: self.transaction_handle().unwrap_or(0),
                statement: self.handle,
                dialect: self.db.options().dialect,
                sql: &sql_bytes,
                items: &items,
                buffer_length: PREPARE_INFO_BUFFER_SIZE,
            })
            .await?
        };

        let mut describe = DescribeState::default();
        describe.parse(response.data, charset)?;
        while describe.truncated {
            let before = describe.described();
            let items = describe.continuation_items();
            tracing::debug!(handle = self.handle, described = before, "describe output truncated, re-querying");
            let data = self.sql_info(&items, PREPARE_INFO_BUFFER_SIZE).await?;
            describe.parse(data, charset)?;
            if describe.described() == before {
                return Err(Error::MetadataNegotiation {
                    message: format!("no field described after {} of the statement metadata", before),
                });
            }
        }

        let (fields, parameters) = describe.finish();
        for descriptor in [&fields, &parameters] {
            if descriptor.actual_count() != descriptor.count() {
                return Err(Error::MetadataNegotiation {
                    message: format!(
                        "{} of {} fields described",
                        descriptor.actual_count(),
                        descriptor.count()
                    ),
                });
            }
        }

        let data = self
            .sql_info(&[ISC_INFO_SQL_STMT_TYPE], STATEMENT_TYPE_BUFFER_SIZE)
            .await?;
        self.statement_type = parse_statement_type(data)?;

        self.row = fields
            .fields()
            .iter()
            .map(|f| DbValue::new(f.clone(), Some(self.cursor.link.clone())))
            .collect();
        self.fields = Some(fields);
        self.parameters = Some(parameters);
        self.set_state(StatementState::Prepared);
        tracing::debug!(
            handle = self.handle,
            statement_type = ?self.statement_type,
            fields = self.row.len(),
            "statement prepared"
        );
        Ok(())
    }

    // ========================================================================
    // Execute
    // ========================================================================

    /// Execute the prepared statement.
    ///
    /// `fill` assigns parameter values (row index 0) before anything is
    /// sent; an error from it aborts the execute. `timeout` overrides the
    /// connection default and needs protocol 16.
    pub async fn execute<F>(&mut self, timeout: Option<Duration>, mut fill: F) -> Result<()>
    where
        F: FnMut(&mut Descriptor, usize) -> Result<()>,
    {
        if self.state() == StatementState::Deallocated {
            return Err(not_created());
        }
        let transaction = self.require_transaction()?;
        self.clear_queues();

        let parameters = self.parameters.get_or_insert_with(Descriptor::default);
        fill(parameters, 0)?;
        let timeout = self.timeout_millis(timeout)?;

        let result = match self.store_lazy_parameters(transaction).await {
            Ok(()) => self.execute_encoded(transaction, timeout).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            if e.is_network() {
                self.set_state(StatementState::Error);
            }
        }
        result
    }

    /// Execute with the current parameter values, which must not need blob
    /// or array writes.
    pub(crate) async fn execute_direct(&mut self) -> Result<()> {
        if self.state() == StatementState::Deallocated {
            return Err(not_created());
        }
        let transaction = self.require_transaction()?;
        self.clear_queues();
        let timeout = self.timeout_millis(None)?;
        let result = self.execute_encoded(transaction, timeout).await;
        if let Err(e) = &result {
            if e.is_network() {
                self.set_state(StatementState::Error);
            }
        }
        result
    }

    fn timeout_millis(&self, timeout: Option<Duration>) -> Result<Option<u32>> {
        let protocol = self.db.protocol();
        if timeout.is_some() {
            protocol.require(ProtocolVersion::V16, "statement timeout")?;
        }
        if !protocol.supports_statement_timeout() {
            return Ok(None);
        }
        let effective = timeout.or(self.db.options().statement_timeout);
        Ok(Some(effective.map_or(0, |d| d.as_millis().min(u32::MAX as u128) as u32)))
    }

    /// Write blob and array parameter payloads and replace them with their ids.
    pub(crate) async fn store_lazy_parameters(&mut self, transaction: i32) -> Result<()> {
        let Some(parameters) = self.parameters.as_mut() else {
            return Ok(());
        };
        for index in 0..parameters.count() {
            let Some(field) = parameters.get(index) else {
                continue;
            };
            let id = match (field.is_blob(), field.is_array(), field.value()) {
                (true, _, Storage::String(s)) => {
                    let data = field.charset().encode(s)?;
                    crate::blob::write_blob(&self.db, transaction, &data).await?
                }
                (true, _, Storage::Binary(b)) => {
                    let data = b.clone();
                    crate::blob::write_blob(&self.db, transaction, &data).await?
                }
                (_, true, Storage::Array(array)) => {
                    let array = array.clone();
                    let handle = ArrayHandle::for_field(&self.db, transaction, field).await?;
                    handle.put_slice(&array).await?
                }
                _ => continue,
            };
            parameters.set_value(index, id)?;
        }
        Ok(())
    }

    /// Encode the parameter message into the scratch buffer.
    pub(crate) fn encode_parameters(&mut self) -> Result<Bytes> {
        self.param_buffer.clear();
        match self.parameters.as_ref() {
            Some(parameters) if !parameters.is_empty() => {
                let blr = parameters.to_blr()?;
                write_row(
                    &mut self.param_buffer,
                    parameters.fields(),
                    self.db.protocol().message_format(),
                )?;
                Ok(blr.data)
            }
            _ => Ok(Bytes::new()),
        }
    }

    pub(crate) fn param_buffer(&self) -> &[u8] {
        &self.param_buffer
    }

    async fn execute_encoded(&mut self, transaction: i32, timeout: Option<u32>) -> Result<()> {
        let input_blr = self.encode_parameters()?;
        let is_procedure = self.statement_type == StatementType::StoredProcedure;
        let output_blr = match (&self.fields, is_procedure) {
            (Some(fields), true) => Some(fields.to_blr()?.data),
            _ => None,
        };
        let format = self.db.protocol().message_format();

        let mut conv = self.db.conversation().await;
        conv.send(&ExecuteMessage {
            statement: self.handle,
            transaction,
            input_blr: &input_blr,
            message: &self.param_buffer,
            output: output_blr.as_deref().map(|blr| OutputBlr { blr }),
            timeout,
        })
        .await?;

        if output_blr.is_some() {
            match conv.read_response().await? {
                Response::Sql(SqlResponse { count }) => {
                    if count > 0 {
                        let fields = self.fields.as_ref().map(Descriptor::fields).unwrap_or_default();
                        let mut storage = self.rent(fields.len());
                        match read_row(conv.reader(), fields, format, &mut storage).await {
                            Ok(()) => self.queue(storage, true),
                            Err(e) => {
                                self.give_back(storage);
                                return Err(e);
                            }
                        }
                    }
                }
                other => {
                    return Err(Error::UnexpectedOperation {
                        expected: OP_SQL_RESPONSE,
                        actual: response_operation(&other),
                    })
                }
            }
        }
        conv.read_generic().await?;

        self.records_affected = -1;
        if self.db.options().return_records_affected && self.statement_type.reports_records() {
            let response = conv
                .call(&InfoSqlMessage {
                    statement: self.handle,
                    items: &[ISC_INFO_SQL_RECORDS, ISC_INFO_END],
                    buffer_length: ROWS_AFFECTED_BUFFER_SIZE,
                })
                .await?;
            self.records_affected = parse_records_affected(response.data)?;
        }
        self.set_state(StatementState::Executed);
        drop(conv);

        tracing::debug!(
            handle = self.handle,
            records_affected = self.records_affected,
            "statement executed"
        );
        Ok(())
    }

    // ========================================================================
    // Fetch
    // ========================================================================

    /// Next row, or `None` when the statement produces no more rows.
    ///
    /// The returned slice is the statement's single reusable row: every
    /// call overwrites the values handed out by the previous one.
    pub async fn fetch(&mut self) -> Result<Option<&mut [DbValue]>> {
        if self.state() == StatementState::Deallocated {
            return Err(not_created());
        }

        let storage = match self.statement_type {
            StatementType::StoredProcedure => self.take_procedure_output(),
            kind if !kind.has_cursor() => None,
            _ => self.next_queued_row().await?,
        };

        match storage {
            Some(storage) => {
                self.load_row(storage);
                Ok(Some(&mut self.row[..]))
            }
            None => Ok(None),
        }
    }

    /// The output row of a procedure, handed out once per execute.
    fn take_procedure_output(&self) -> Option<Vec<Storage>> {
        let mut cursor = self.cursor.lock();
        if cursor.all_rows_fetched {
            return None;
        }
        cursor.all_rows_fetched = true;
        cursor.output_params.pop_front()
    }

    async fn next_queued_row(&mut self) -> Result<Option<Vec<Storage>>> {
        let refill = {
            let cursor = self.cursor.lock();
            if cursor.state == StatementState::Closed {
                return Ok(None);
            }
            cursor.rows.is_empty() && !cursor.all_rows_fetched
        };
        if refill {
            self.fetch_rows().await?;
        }
        Ok(self.cursor.lock().rows.pop_front())
    }

    fn rent(&self, width: usize) -> Vec<Storage> {
        self.cursor.lock().pool.rent(width)
    }

    fn give_back(&self, storage: Vec<Storage>) {
        self.cursor.lock().pool.give_back(storage);
    }

    fn queue(&self, storage: Vec<Storage>, output: bool) {
        let mut cursor = self.cursor.lock();
        if output {
            cursor.output_params.push_back(storage);
        } else {
            cursor.rows.push_back(storage);
        }
    }

    /// Move a queued storage into the reusable row and pool the emptied vector.
    fn load_row(&mut self, mut storage: Vec<Storage>) {
        for (value, item) in self.row.iter_mut().zip(storage.drain(..)) {
            value.import_storage(item);
        }
        self.give_back(storage);
    }

    async fn fetch_rows(&mut self) -> Result<()> {
        let fields = self.fields.as_ref().ok_or_else(not_created)?;
        let blr = fields.to_blr()?;
        let format = self.db.protocol().message_format();

        let mut conv = self.db.conversation().await;
        conv.send(&FetchMessage::new(self.handle, &blr.data, self.fetch_size))
            .await?;
        loop {
            match conv.read_response().await? {
                Response::Fetch(FetchResponse { status: 0, count }) if count > 0 => {
                    let mut storage = self.rent(fields.count());
                    match read_row(conv.reader(), fields.fields(), format, &mut storage).await {
                        Ok(()) => self.queue(storage, false),
                        Err(e) => {
                            self.give_back(storage);
                            return Err(e);
                        }
                    }
                }
                Response::Fetch(FetchResponse {
                    status: FETCH_END_OF_CURSOR,
                    ..
                }) => {
                    self.cursor.lock().all_rows_fetched = true;
                    break;
                }
                Response::Fetch(_) => break,
                other => {
                    return Err(Error::UnexpectedOperation {
                        expected: OP_FETCH_RESPONSE,
                        actual: response_operation(&other),
                    })
                }
            }
        }
        drop(conv);
        tracing::trace!(handle = self.handle, queued = self.cursor.lock().rows.len(), "rows fetched");
        Ok(())
    }

    /// Output row of an executed stored procedure, detached from the statement.
    pub fn get_output_parameters(&mut self) -> Option<Vec<DbValue>> {
        let mut storage = self.cursor.lock().output_params.pop_front()?;
        let values = self
            .row
            .iter()
            .zip(storage.drain(..))
            .map(|(template, item)| {
                let mut value = template.clone();
                value.import_storage(item);
                value
            })
            .collect();
        self.give_back(storage);
        Some(values)
    }

    // ========================================================================
    // Close / release
    // ========================================================================

    /// Close the cursor but keep the statement prepared. Errors are ignored.
    pub async fn close(&mut self) {
        if !matches!(
            self.statement_type,
            StatementType::Select | StatementType::SelectForUpdate | StatementType::StoredProcedure
        ) {
            return;
        }
        if matches!(
            self.state(),
            StatementState::Allocated | StatementState::Prepared | StatementState::Executed
        ) {
            if let Err(e) = self.free(DSQL_CLOSE).await {
                tracing::debug!(handle = self.handle, error = %e, "closing cursor failed");
            }
        }
        self.clear_queues();
        self.clear_array_handles();
        self.set_state(StatementState::Closed);
    }

    /// Drop the statement on the server; it can be prepared again afterwards.
    pub async fn release(&mut self) -> Result<()> {
        self.unsubscribe();
        if self.state() != StatementState::Deallocated {
            self.free(DSQL_DROP).await?;
        }
        self.clear_array_handles();
        self.clear_all();
        self.handle = INVALID_OBJECT;
        self.set_state(StatementState::Deallocated);
        Ok(())
    }

    // ========================================================================
    // Plans, blobs and arrays
    // ========================================================================

    /// Execution plan of the prepared statement.
    pub async fn get_execution_plan(&mut self) -> Result<String> {
        self.plan(ISC_INFO_SQL_GET_PLAN).await
    }

    /// Detailed execution plan of the prepared statement.
    pub async fn get_execution_explained_plan(&mut self) -> Result<String> {
        self.plan(ISC_INFO_SQL_EXPLAIN_PLAN).await
    }

    async fn plan(&mut self, item: u8) -> Result<String> {
        if self.state() == StatementState::Deallocated {
            return Err(not_created());
        }
        let mut buffer_length = DEFAULT_MAX_BUFFER_SIZE;
        for _ in 0..PLAN_RETRIES {
            let data = self.sql_info(&[item], buffer_length).await?;
            match parse_plan(&data)? {
                PlanReply::Plan(plan) => return Ok(plan),
                PlanReply::Truncated => {
                    buffer_length = buffer_length.saturating_mul(2);
                    tracing::debug!(handle = self.handle, buffer_length, "plan truncated, retrying");
                }
            }
        }
        Err(Error::protocol("Execution plan does not fit the info buffer"))
    }

    /// Create a blob under the statement's transaction.
    pub async fn create_blob(&self) -> Result<BlobWriter> {
        BlobWriter::create(&self.db, self.require_transaction()?).await
    }

    /// Open blob `blob_id` under the statement's transaction.
    pub async fn open_blob(&self, blob_id: i64) -> Result<BlobReader> {
        BlobReader::open(&self.db, self.require_transaction()?, blob_id).await
    }

    /// Array handle for a known descriptor.
    pub fn create_array(&self, descriptor: ArrayDescriptor) -> Result<ArrayHandle> {
        Ok(ArrayHandle::new(
            &self.db,
            self.require_transaction()?,
            Arc::new(descriptor),
        ))
    }

    /// Array handle for a column, looking its descriptor up in the system tables.
    pub async fn lookup_array(&self, table: &str, column: &str) -> Result<ArrayHandle> {
        ArrayHandle::lookup(&self.db, self.require_transaction()?, table, column).await
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        self.unsubscribe();
        if self.state() != StatementState::Deallocated {
            tracing::debug!(handle = self.handle, "statement dropped without release");
        }
    }
}
