//! Batch execution (protocol 16 and later).
//!
//! A batch sends many parameter messages for one prepared statement and
//! executes them in a single round trip. The server reports an update count
//! per message and, with the multi-error option, the error of every failed
//! message.

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::messages::{
    batch_parameters, BatchCreateMessage, BatchExecuteMessage, BatchMessagesMessage, HandleMessage,
};
use crate::protocol::response::{BatchCompletion, Response};
use crate::protocol::types::Descriptor;
use crate::protocol::ProtocolVersion;
use crate::statement::{Statement, StatementState};

/// Batch bound to a prepared statement.
#[derive(Debug)]
pub struct Batch<'a> {
    statement: &'a mut Statement,
    messages: Vec<u8>,
    pending: usize,
}

impl<'a> Batch<'a> {
    /// Create a server-side batch for `statement`.
    pub async fn create(statement: &'a mut Statement) -> Result<Batch<'a>> {
        let db = statement.database().clone();
        db.protocol().require(ProtocolVersion::V16, "batch execution")?;
        if !matches!(
            statement.state(),
            StatementState::Prepared | StatementState::Executed | StatementState::Closed
        ) {
            return Err(Error::invalid_state("Batch needs a prepared statement."));
        }

        let blr = statement
            .parameters()
            .map(Descriptor::to_blr)
            .transpose()?
            .ok_or_else(|| Error::invalid_state("Batch needs a prepared statement."))?;
        let bpb = batch_parameters();
        {
            let mut conv = db.conversation().await;
            conv.call(&BatchCreateMessage {
                statement: statement.handle(),
                blr: &blr.data,
                message_length: blr.length as i32,
                bpb: &bpb,
            })
            .await?;
        }
        tracing::debug!(handle = statement.handle(), "batch created");

        Ok(Self {
            statement,
            messages: Vec::new(),
            pending: 0,
        })
    }

    /// Messages sent since the last execute.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Append `rows` messages; `fill` assigns the parameters of each row.
    ///
    /// Every row is filled before any blob or array value is written or a
    /// message is sent, so an error from `fill` leaves the batch and the
    /// server untouched.
    pub async fn add<F>(&mut self, rows: usize, mut fill: F) -> Result<()>
    where
        F: FnMut(&mut Descriptor, usize) -> Result<()>,
    {
        if rows == 0 {
            return Ok(());
        }
        let transaction = self.statement.require_transaction()?;

        let mut filled = Vec::with_capacity(rows);
        for row in 0..rows {
            let parameters = self.parameters()?;
            fill(parameters, row)?;
            filled.push(
                parameters
                    .fields()
                    .iter()
                    .map(|field| field.value().clone())
                    .collect::<Vec<_>>(),
            );
        }

        self.messages.clear();
        for values in filled {
            let parameters = self.parameters()?;
            for (index, value) in values.into_iter().enumerate() {
                parameters.set_value(index, value)?;
            }
            self.statement.store_lazy_parameters(transaction).await?;
            self.statement.encode_parameters()?;
            self.messages.extend_from_slice(self.statement.param_buffer());
        }

        let mut conv = self.statement.database().conversation().await;
        conv.call(&BatchMessagesMessage {
            statement: self.statement.handle(),
            count: rows as i32,
            messages: &self.messages,
        })
        .await?;
        self.pending += rows;
        Ok(())
    }

    fn parameters(&mut self) -> Result<&mut Descriptor> {
        self.statement
            .parameters_mut()
            .ok_or_else(|| Error::invalid_state("Batch needs a prepared statement."))
    }

    /// Execute every pending message.
    pub async fn execute(&mut self) -> Result<BatchCompletion> {
        let transaction = self.statement.require_transaction()?;
        let mut conv = self.statement.database().conversation().await;
        conv.send(&BatchExecuteMessage {
            statement: self.statement.handle(),
            transaction,
        })
        .await?;
        let completion = match conv.read_response().await? {
            Response::Batch(completion) => completion,
            other => {
                return Err(Error::UnexpectedOperation {
                    expected: OP_BATCH_CS,
                    actual: crate::database::response_operation(&other),
                })
            }
        };
        tracing::debug!(
            handle = self.statement.handle(),
            records = completion.record_count,
            errors = completion.errors.len(),
            "batch executed"
        );
        self.pending = 0;
        Ok(completion)
    }

    /// Release the server-side batch.
    pub async fn release(self) -> Result<()> {
        let mut conv = self.statement.database().conversation().await;
        conv.call(&HandleMessage::new(OP_BATCH_RLS, self.statement.handle()))
            .await
            .map(|_| ())
    }
}
