//! Blocking facade.
//!
//! Every call drives the async implementation to completion on a private
//! current-thread runtime, so ordering and error behavior are the same as
//! in async code. Do not call these from inside another runtime.

use crate::array::ArrayHandle;
use crate::database::{CancelKind, Database};
use crate::error::{Error, Result};
use crate::options::DatabaseOptions;
use crate::protocol::types::{ArrayDescriptor, DbValue, Descriptor, FbArray};
use crate::statement::{Statement, StatementState, StatementType};
use crate::transaction::Transaction;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

/// Build the runtime the facade runs on.
pub fn new_runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::Io)
}

/// Blocking wrapper over [`Database`].
#[derive(Debug, Clone)]
pub struct BlockingDatabase {
    runtime: Arc<Runtime>,
    inner: Database,
}

impl BlockingDatabase {
    pub fn new(runtime: Arc<Runtime>, inner: Database) -> Self {
        Self { runtime, inner }
    }

    /// Take over a connected socket whose attachment has been accepted.
    pub fn from_std_stream(
        stream: std::net::TcpStream,
        handle: i32,
        options: DatabaseOptions,
    ) -> Result<Self> {
        let runtime = Arc::new(new_runtime()?);
        stream.set_nonblocking(true)?;
        let stream = {
            let _guard = runtime.enter();
            tokio::net::TcpStream::from_std(stream)?
        };
        Ok(Self::new(runtime, Database::from_stream(stream, handle, options)))
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn database(&self) -> &Database {
        &self.inner
    }

    /// Run any future of this crate on the facade's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn ping(&self) -> Result<()> {
        self.runtime.block_on(self.inner.ping())
    }

    pub fn cancel_operation(&self, kind: CancelKind) -> Result<()> {
        self.runtime.block_on(self.inner.cancel_operation(kind))
    }

    pub fn begin_transaction(&self, tpb: Option<&[u8]>) -> Result<BlockingTransaction> {
        let inner = self.runtime.block_on(Transaction::begin(&self.inner, tpb))?;
        Ok(BlockingTransaction {
            runtime: self.runtime.clone(),
            inner,
        })
    }

    /// A deallocated statement.
    pub fn statement(&self) -> BlockingStatement {
        BlockingStatement {
            runtime: self.runtime.clone(),
            inner: Statement::new(&self.inner),
        }
    }

    pub fn prepare(&self, transaction: &BlockingTransaction, sql: &str) -> Result<BlockingStatement> {
        let mut statement = self.statement();
        statement.set_transaction(transaction);
        statement.prepare(sql)?;
        Ok(statement)
    }
}

/// Blocking wrapper over [`Transaction`].
#[derive(Debug, Clone)]
pub struct BlockingTransaction {
    runtime: Arc<Runtime>,
    inner: Transaction,
}

impl BlockingTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.inner
    }

    pub fn handle(&self) -> i32 {
        self.inner.handle()
    }

    pub fn commit(&self) -> Result<()> {
        self.runtime.block_on(self.inner.commit())
    }

    pub fn rollback(&self) -> Result<()> {
        self.runtime.block_on(self.inner.rollback())
    }

    pub fn commit_retaining(&self) -> Result<()> {
        self.runtime.block_on(self.inner.commit_retaining())
    }

    pub fn rollback_retaining(&self) -> Result<()> {
        self.runtime.block_on(self.inner.rollback_retaining())
    }
}

/// Blocking wrapper over [`Statement`].
#[derive(Debug)]
pub struct BlockingStatement {
    runtime: Arc<Runtime>,
    inner: Statement,
}

impl BlockingStatement {
    pub fn statement(&self) -> &Statement {
        &self.inner
    }

    pub fn statement_mut(&mut self) -> &mut Statement {
        &mut self.inner
    }

    pub fn state(&self) -> StatementState {
        self.inner.state()
    }

    pub fn statement_type(&self) -> StatementType {
        self.inner.statement_type()
    }

    pub fn records_affected(&self) -> i64 {
        self.inner.records_affected()
    }

    pub fn set_transaction(&mut self, transaction: &BlockingTransaction) {
        self.inner.set_transaction(&transaction.inner);
    }

    pub fn prepare(&mut self, sql: &str) -> Result<()> {
        self.runtime.block_on(self.inner.prepare(sql))
    }

    pub fn execute<F>(&mut self, timeout: Option<Duration>, fill: F) -> Result<()>
    where
        F: FnMut(&mut Descriptor, usize) -> Result<()>,
    {
        self.runtime.block_on(self.inner.execute(timeout, fill))
    }

    /// Next row; the slice is overwritten by the following call.
    pub fn fetch(&mut self) -> Result<Option<&mut [DbValue]>> {
        self.runtime.block_on(self.inner.fetch())
    }

    pub fn get_output_parameters(&mut self) -> Option<Vec<DbValue>> {
        self.inner.get_output_parameters()
    }

    pub fn close(&mut self) {
        self.runtime.block_on(self.inner.close())
    }

    pub fn release(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.release())
    }

    pub fn get_execution_plan(&mut self) -> Result<String> {
        self.runtime.block_on(self.inner.get_execution_plan())
    }

    pub fn get_execution_explained_plan(&mut self) -> Result<String> {
        self.runtime.block_on(self.inner.get_execution_explained_plan())
    }

    /// Store `data` as a new blob and return its id.
    pub fn create_blob(&self, data: &[u8]) -> Result<i64> {
        self.runtime.block_on(async {
            let mut writer = self.inner.create_blob().await?;
            writer.write(data).await?;
            writer.close().await
        })
    }

    /// Read blob `blob_id` completely.
    pub fn read_blob(&self, blob_id: i64) -> Result<Vec<u8>> {
        self.runtime
            .block_on(async { self.inner.open_blob(blob_id).await?.read_all().await })
    }

    pub fn create_array(&self, descriptor: ArrayDescriptor) -> Result<BlockingArray> {
        Ok(BlockingArray {
            runtime: self.runtime.clone(),
            inner: self.inner.create_array(descriptor)?,
        })
    }

    pub fn lookup_array(&self, table: &str, column: &str) -> Result<BlockingArray> {
        let inner = self.runtime.block_on(self.inner.lookup_array(table, column))?;
        Ok(BlockingArray {
            runtime: self.runtime.clone(),
            inner,
        })
    }
}

/// Blocking wrapper over [`ArrayHandle`].
#[derive(Debug, Clone)]
pub struct BlockingArray {
    runtime: Arc<Runtime>,
    inner: ArrayHandle,
}

impl BlockingArray {
    pub fn descriptor(&self) -> &ArrayDescriptor {
        self.inner.descriptor()
    }

    pub fn get_slice(&self, array_id: i64) -> Result<FbArray> {
        self.runtime.block_on(self.inner.get_slice(array_id))
    }

    pub fn put_slice(&self, array: &FbArray) -> Result<i64> {
        self.runtime.block_on(self.inner.put_slice(array))
    }
}
