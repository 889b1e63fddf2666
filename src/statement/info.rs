//! Statement info buffers: describe output, statement type, record counts and plans.
//!
//! Describe output is a stream of items. `isc_info_sql_select` and
//! `isc_info_sql_bind` open the select-list and parameter groups; inside a
//! group `isc_info_sql_describe_vars` declares the field count and every
//! field is a run of attribute clumplets closed by `isc_info_sql_describe_end`.
//! When the reply does not fit the server ends it with `isc_info_truncated`
//! and the client asks again from the first undescribed field.

use crate::error::{Error, Result};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::constants::*;
use crate::protocol::types::{Charset, Descriptor};
use bytes::Bytes;

/// Describe items requested for each group at prepare time.
pub(crate) const DESCRIBE_SELECT_ITEMS: &[u8] = &[
    ISC_INFO_SQL_SELECT,
    ISC_INFO_SQL_DESCRIBE_VARS,
    ISC_INFO_SQL_SQLDA_SEQ,
    ISC_INFO_SQL_TYPE,
    ISC_INFO_SQL_SUB_TYPE,
    ISC_INFO_SQL_SCALE,
    ISC_INFO_SQL_LENGTH,
    ISC_INFO_SQL_FIELD,
    ISC_INFO_SQL_RELATION,
    ISC_INFO_SQL_OWNER,
    ISC_INFO_SQL_ALIAS,
    ISC_INFO_SQL_DESCRIBE_END,
];

pub(crate) const DESCRIBE_BIND_ITEMS: &[u8] = &[
    ISC_INFO_SQL_BIND,
    ISC_INFO_SQL_DESCRIBE_VARS,
    ISC_INFO_SQL_SQLDA_SEQ,
    ISC_INFO_SQL_TYPE,
    ISC_INFO_SQL_SUB_TYPE,
    ISC_INFO_SQL_SCALE,
    ISC_INFO_SQL_LENGTH,
    ISC_INFO_SQL_FIELD,
    ISC_INFO_SQL_RELATION,
    ISC_INFO_SQL_OWNER,
    ISC_INFO_SQL_ALIAS,
    ISC_INFO_SQL_DESCRIBE_END,
];

/// Full describe request: select list then parameters.
pub(crate) fn describe_items() -> Vec<u8> {
    let mut items = Vec::with_capacity(DESCRIBE_SELECT_ITEMS.len() + DESCRIBE_BIND_ITEMS.len());
    items.extend_from_slice(DESCRIBE_SELECT_ITEMS);
    items.extend_from_slice(DESCRIBE_BIND_ITEMS);
    items
}

/// Kind of a prepared statement (`isc_info_sql_stmt_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementType {
    #[default]
    None,
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    GetSegment,
    PutSegment,
    StoredProcedure,
    StartTransaction,
    Commit,
    Rollback,
    SelectForUpdate,
    SetGenerator,
    Savepoint,
}

impl StatementType {
    pub fn from_code(code: i32) -> Self {
        match code {
            ISC_INFO_SQL_STMT_SELECT => Self::Select,
            ISC_INFO_SQL_STMT_INSERT => Self::Insert,
            ISC_INFO_SQL_STMT_UPDATE => Self::Update,
            ISC_INFO_SQL_STMT_DELETE => Self::Delete,
            ISC_INFO_SQL_STMT_DDL => Self::Ddl,
            ISC_INFO_SQL_STMT_GET_SEGMENT => Self::GetSegment,
            ISC_INFO_SQL_STMT_PUT_SEGMENT => Self::PutSegment,
            ISC_INFO_SQL_STMT_EXEC_PROCEDURE => Self::StoredProcedure,
            ISC_INFO_SQL_STMT_START_TRANS => Self::StartTransaction,
            ISC_INFO_SQL_STMT_COMMIT => Self::Commit,
            ISC_INFO_SQL_STMT_ROLLBACK => Self::Rollback,
            ISC_INFO_SQL_STMT_SELECT_FOR_UPD => Self::SelectForUpdate,
            ISC_INFO_SQL_STMT_SET_GENERATOR => Self::SetGenerator,
            ISC_INFO_SQL_STMT_SAVEPOINT => Self::Savepoint,
            _ => Self::None,
        }
    }

    /// Statements that open a server-side cursor.
    pub fn has_cursor(self) -> bool {
        matches!(self, Self::Select | Self::SelectForUpdate)
    }

    /// Statements whose execution reports record counts.
    pub fn reports_records(self) -> bool {
        matches!(
            self,
            Self::Insert | Self::Update | Self::Delete | Self::StoredProcedure | Self::Select
        )
    }
}

// ============================================================================
// Describe output
// ============================================================================

/// Select-list and parameter descriptors being filled from describe output.
#[derive(Debug, Default)]
pub(crate) struct DescribeState {
    /// Index 0: select list, index 1: parameters.
    pub groups: [Option<Descriptor>; 2],
    /// Whether the last reply ended with `isc_info_truncated`.
    pub truncated: bool,
}

impl DescribeState {
    /// Fields described so far across both groups.
    pub fn described(&self) -> usize {
        self.groups
            .iter()
            .flatten()
            .map(Descriptor::actual_count)
            .sum()
    }

    /// Item list asking for the rest of each group, starting after the
    /// fields already received.
    pub fn continuation_items(&self) -> Vec<u8> {
        let mut items = Vec::new();
        for (group, template) in [DESCRIBE_SELECT_ITEMS, DESCRIBE_BIND_ITEMS].iter().enumerate() {
            let start = self.groups[group]
                .as_ref()
                .map_or(0, Descriptor::actual_count)
                + 1;
            for &item in template.iter() {
                items.push(item);
                if item == ISC_INFO_SQL_DESCRIBE_VARS {
                    items.push(ISC_INFO_SQL_SQLDA_START);
                    items.push(2);
                    items.extend_from_slice(&(start as u16).to_le_bytes());
                }
            }
        }
        items.push(ISC_INFO_END);
        items
    }

    /// Parse one describe reply, continuing from what earlier replies filled.
    pub fn parse(&mut self, data: Bytes, charset: Charset) -> Result<()> {
        let mut buf = ReadBuffer::new(data);
        let mut group: Option<usize> = None;
        let mut index = 0usize;
        self.truncated = false;

        while let Some(item) = buf.peek_u8() {
            buf.skip(1)?;
            match item {
                ISC_INFO_END => break,
                ISC_INFO_TRUNCATED => {
                    self.truncated = true;
                    break;
                }
                ISC_INFO_ERROR => {
                    return Err(Error::protocol("Server rejected a describe item"));
                }
                ISC_INFO_SQL_SELECT => group = Some(0),
                ISC_INFO_SQL_BIND => group = Some(1),
                ISC_INFO_SQL_DESCRIBE_VARS => {
                    let count = buf.read_clumplet_int()?.max(0) as usize;
                    let g = current_group(group)?;
                    if self.groups[g].is_none() {
                        let mut descriptor = Descriptor::new(count);
                        for i in 0..count {
                            descriptor.field_mut(i)?.connection_charset = charset;
                        }
                        self.groups[g] = Some(descriptor);
                    }
                }
                ISC_INFO_SQL_SQLDA_SEQ => {
                    index = (buf.read_clumplet_int()? - 1).max(0) as usize;
                }
                ISC_INFO_SQL_DESCRIBE_END => {
                    let descriptor = self.descriptor(group)?;
                    let next = descriptor.actual_count() + 1;
                    descriptor.set_actual_count(next);
                }
                ISC_INFO_SQL_TYPE
                | ISC_INFO_SQL_SUB_TYPE
                | ISC_INFO_SQL_SCALE
                | ISC_INFO_SQL_LENGTH
                | ISC_INFO_SQL_NULL_IND => {
                    let value = buf.read_clumplet_int()?;
                    let field = self.descriptor(group)?.field_mut(index)?;
                    match item {
                        ISC_INFO_SQL_TYPE => field.sql_type = value as i32,
                        ISC_INFO_SQL_SUB_TYPE => field.sub_type = value as i16,
                        ISC_INFO_SQL_SCALE => field.scale = value as i16,
                        ISC_INFO_SQL_LENGTH => field.length = value as i16,
                        _ => {}
                    }
                }
                ISC_INFO_SQL_FIELD | ISC_INFO_SQL_RELATION | ISC_INFO_SQL_OWNER | ISC_INFO_SQL_ALIAS => {
                    let raw = buf.read_clumplet_bytes()?;
                    let text = String::from_utf8_lossy(&raw).into_owned();
                    let field = self.descriptor(group)?.field_mut(index)?;
                    match item {
                        ISC_INFO_SQL_FIELD => field.name = text,
                        ISC_INFO_SQL_RELATION => field.relation = text,
                        ISC_INFO_SQL_OWNER => field.owner = text,
                        _ => field.alias = text,
                    }
                }
                other => {
                    return Err(Error::protocol(format!(
                        "Unexpected describe item: {}",
                        other
                    )));
                }
            }
        }
        Ok(())
    }

    fn descriptor(&mut self, group: Option<usize>) -> Result<&mut Descriptor> {
        let g = current_group(group)?;
        self.groups[g]
            .as_mut()
            .ok_or_else(|| Error::protocol("Field attributes before isc_info_sql_describe_vars"))
    }

    /// Hand out the finished descriptors as (fields, parameters).
    pub fn finish(self) -> (Descriptor, Descriptor) {
        let [fields, parameters] = self.groups;
        (fields.unwrap_or_default(), parameters.unwrap_or_default())
    }
}

fn current_group(group: Option<usize>) -> Result<usize> {
    group.ok_or_else(|| Error::protocol("Describe item outside select or bind group"))
}

// ============================================================================
// Other info queries
// ============================================================================

/// Parse the reply to an `isc_info_sql_stmt_type` request.
pub(crate) fn parse_statement_type(data: Bytes) -> Result<StatementType> {
    let mut buf = ReadBuffer::new(data);
    while let Some(item) = buf.peek_u8() {
        buf.skip(1)?;
        match item {
            ISC_INFO_END => break,
            ISC_INFO_SQL_STMT_TYPE => {
                return Ok(StatementType::from_code(buf.read_clumplet_int()? as i32));
            }
            _ => {
                buf.read_clumplet_bytes()?;
            }
        }
    }
    Ok(StatementType::None)
}

/// Parse the reply to an `isc_info_sql_records` request.
///
/// Returns inserted + updated + deleted rows.
pub(crate) fn parse_records_affected(data: Bytes) -> Result<i64> {
    let mut buf = ReadBuffer::new(data);
    let mut total = 0i64;
    while let Some(item) = buf.peek_u8() {
        buf.skip(1)?;
        match item {
            ISC_INFO_END => break,
            ISC_INFO_SQL_RECORDS => {
                let len = buf.read_u16_le()? as usize;
                let mut counters = ReadBuffer::new(buf.read_bytes(len)?);
                while let Some(counter) = counters.peek_u8() {
                    counters.skip(1)?;
                    if counter == ISC_INFO_END {
                        break;
                    }
                    let value = counters.read_clumplet_int()?;
                    match counter {
                        ISC_INFO_REQ_INSERT_COUNT
                        | ISC_INFO_REQ_UPDATE_COUNT
                        | ISC_INFO_REQ_DELETE_COUNT => total += value,
                        _ => {}
                    }
                }
            }
            _ => {
                buf.read_clumplet_bytes()?;
            }
        }
    }
    Ok(total)
}

/// Outcome of a plan request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PlanReply {
    Plan(String),
    /// The buffer was too small; ask again with a larger one.
    Truncated,
}

/// Parse the reply to an `isc_info_sql_get_plan` / `isc_info_sql_explain_plan` request.
///
/// The plan text starts after the item and its 2-byte length and begins
/// with a newline, which is dropped.
pub(crate) fn parse_plan(data: &[u8]) -> Result<PlanReply> {
    match data.first() {
        None | Some(&ISC_INFO_END) => Ok(PlanReply::Plan(String::new())),
        Some(&ISC_INFO_TRUNCATED) => Ok(PlanReply::Truncated),
        Some(_) => {
            if data.len() < 3 {
                return Err(Error::protocol("Plan reply too short"));
            }
            let len = u16::from_le_bytes([data[1], data[2]]) as usize;
            if len == 0 {
                return Ok(PlanReply::Plan(String::new()));
            }
            let end = (4 + len - 1).min(data.len());
            let text = data.get(4..end).unwrap_or_default();
            Ok(PlanReply::Plan(String::from_utf8_lossy(text).into_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clumplet_int(out: &mut Vec<u8>, item: u8, value: i32) {
        out.push(item);
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
    }

    fn clumplet_str(out: &mut Vec<u8>, item: u8, value: &str) {
        out.push(item);
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
        out.extend_from_slice(value.as_bytes());
    }

    fn describe_field(out: &mut Vec<u8>, seq: i32, sql_type: i32, name: &str) {
        clumplet_int(out, ISC_INFO_SQL_SQLDA_SEQ, seq);
        clumplet_int(out, ISC_INFO_SQL_TYPE, sql_type);
        clumplet_int(out, ISC_INFO_SQL_SUB_TYPE, 0);
        clumplet_int(out, ISC_INFO_SQL_SCALE, 0);
        clumplet_int(out, ISC_INFO_SQL_LENGTH, 4);
        clumplet_str(out, ISC_INFO_SQL_FIELD, name);
        clumplet_str(out, ISC_INFO_SQL_RELATION, "T");
        clumplet_str(out, ISC_INFO_SQL_OWNER, "SYSDBA");
        clumplet_str(out, ISC_INFO_SQL_ALIAS, name);
        out.push(ISC_INFO_SQL_DESCRIBE_END);
    }

    #[test]
    fn test_parse_truncated_then_continue() {
        let mut first = vec![ISC_INFO_SQL_SELECT];
        clumplet_int(&mut first, ISC_INFO_SQL_DESCRIBE_VARS, 3);
        describe_field(&mut first, 1, SQL_LONG, "A");
        first.push(ISC_INFO_TRUNCATED);

        let mut state = DescribeState::default();
        state.parse(Bytes::from(first), Charset::Utf8).unwrap();
        assert!(state.truncated);
        assert_eq!(state.described(), 1);

        let items = state.continuation_items();
        let pos = items
            .iter()
            .position(|&b| b == ISC_INFO_SQL_SQLDA_START)
            .unwrap();
        assert_eq!(&items[pos..pos + 4], &[ISC_INFO_SQL_SQLDA_START, 2, 2, 0]);
        assert_eq!(items.last(), Some(&ISC_INFO_END));

        let mut second = vec![ISC_INFO_SQL_SELECT];
        clumplet_int(&mut second, ISC_INFO_SQL_DESCRIBE_VARS, 3);
        describe_field(&mut second, 2, SQL_LONG + 1, "B");
        describe_field(&mut second, 3, SQL_SHORT, "C");
        second.push(ISC_INFO_SQL_BIND);
        clumplet_int(&mut second, ISC_INFO_SQL_DESCRIBE_VARS, 0);
        second.push(ISC_INFO_END);
        state.parse(Bytes::from(second), Charset::Utf8).unwrap();
        assert!(!state.truncated);

        let (fields, params) = state.finish();
        assert_eq!(fields.count(), 3);
        assert_eq!(fields.actual_count(), 3);
        assert_eq!(fields.get(1).unwrap().name, "B");
        assert!(fields.get(1).unwrap().is_nullable());
        assert_eq!(fields.get(2).unwrap().base_type(), SQL_SHORT);
        assert!(params.is_empty());
    }

    #[test]
    fn test_attribute_outside_group_is_protocol_error() {
        let mut data = Vec::new();
        clumplet_int(&mut data, ISC_INFO_SQL_TYPE, SQL_LONG);
        let mut state = DescribeState::default();
        assert!(matches!(
            state.parse(Bytes::from(data), Charset::Utf8),
            Err(Error::Protocol { .. })
        ));
    }

    #[test]
    fn test_records_affected_sums_dml_counters() {
        let mut counters = Vec::new();
        clumplet_int(&mut counters, ISC_INFO_REQ_SELECT_COUNT, 9);
        clumplet_int(&mut counters, ISC_INFO_REQ_INSERT_COUNT, 2);
        clumplet_int(&mut counters, ISC_INFO_REQ_UPDATE_COUNT, 3);
        clumplet_int(&mut counters, ISC_INFO_REQ_DELETE_COUNT, 1);
        counters.push(ISC_INFO_END);

        let mut data = vec![ISC_INFO_SQL_RECORDS];
        data.extend_from_slice(&(counters.len() as u16).to_le_bytes());
        data.extend_from_slice(&counters);
        data.push(ISC_INFO_END);
        assert_eq!(parse_records_affected(Bytes::from(data)).unwrap(), 6);
    }

    #[test]
    fn test_statement_type() {
        let mut data = Vec::new();
        clumplet_int(&mut data, ISC_INFO_SQL_STMT_TYPE, ISC_INFO_SQL_STMT_EXEC_PROCEDURE);
        data.push(ISC_INFO_END);
        let kind = parse_statement_type(Bytes::from(data)).unwrap();
        assert_eq!(kind, StatementType::StoredProcedure);
        assert!(!kind.has_cursor());
        assert!(kind.reports_records());
    }

    #[test]
    fn test_parse_plan() {
        let plan = "\nPLAN (T NATURAL)";
        let mut data = vec![ISC_INFO_SQL_GET_PLAN];
        data.extend_from_slice(&(plan.len() as u16).to_le_bytes());
        data.extend_from_slice(plan.as_bytes());
        assert_eq!(
            parse_plan(&data).unwrap(),
            PlanReply::Plan("PLAN (T NATURAL)".to_string())
        );
        assert_eq!(parse_plan(&[ISC_INFO_TRUNCATED]).unwrap(), PlanReply::Truncated);
        assert_eq!(parse_plan(&[ISC_INFO_END]).unwrap(), PlanReply::Plan(String::new()));
    }
}
