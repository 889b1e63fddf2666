//! Status vectors and server exceptions.
//!
//! A status vector is an ordered list of tagged arguments. Error and warning
//! codes are followed by the string/number arguments that fill the `@n`
//! placeholders of their message template.

use crate::protocol::constants::*;
use std::fmt;

/// One argument of a status vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEntry {
    /// Error code (`isc_arg_gds`).
    Gds(i32),
    /// Warning code (`isc_arg_warning`).
    Warning(i32),
    /// String parameter for the preceding code.
    String(String),
    /// Numeric parameter for the preceding code.
    Number(i32),
    /// Preformatted message line.
    Interpreted(String),
    /// SQLSTATE reported by the server.
    SqlState(String),
}

impl StatusEntry {
    fn is_code(&self) -> bool {
        matches!(self, Self::Gds(_) | Self::Warning(_))
    }
}

/// A server-reported error (or warning) built from a status vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IscException {
    /// Entries in the order the server sent them.
    pub entries: Vec<StatusEntry>,
    /// First error code, or first warning code if the vector has no error.
    pub error_code: i32,
    /// SQLSTATE from the vector, else from the fallback table.
    pub sql_state: String,
    /// Formatted message, one line per code.
    pub message: String,
}

impl IscException {
    /// Build an exception from status vector entries.
    pub fn from_entries(entries: Vec<StatusEntry>) -> Self {
        let error_code = entries
            .iter()
            .find_map(|e| match e {
                StatusEntry::Gds(code) => Some(*code),
                _ => None,
            })
            .or_else(|| {
                entries.iter().find_map(|e| match e {
                    StatusEntry::Warning(code) => Some(*code),
                    _ => None,
                })
            })
            .unwrap_or(0);

        let sql_state = entries
            .iter()
            .find_map(|e| match e {
                StatusEntry::SqlState(s) => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_else(|| fallback_sql_state(error_code).to_string());

        let message = build_message(&entries);

        Self {
            entries,
            error_code,
            sql_state,
            message,
        }
    }

    /// Build an exception for a single client-side error code.
    pub fn from_code(code: i32, params: &[&str]) -> Self {
        let mut entries = vec![StatusEntry::Gds(code)];
        entries.extend(params.iter().map(|p| StatusEntry::String(p.to_string())));
        Self::from_entries(entries)
    }

    /// True when the vector carries only warnings.
    pub fn is_warning(&self) -> bool {
        !self.entries.iter().any(|e| matches!(e, StatusEntry::Gds(_)))
            && self.entries.iter().any(|e| matches!(e, StatusEntry::Warning(_)))
    }

    /// All error codes in order.
    pub fn error_codes(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter().filter_map(|e| match e {
            StatusEntry::Gds(code) | StatusEntry::Warning(code) => Some(*code),
            _ => None,
        })
    }
}

impl fmt::Display for IscException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for IscException {}

fn build_message(entries: &[StatusEntry]) -> String {
    let mut lines = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        match &entries[i] {
            StatusEntry::Gds(code) | StatusEntry::Warning(code) => {
                let mut params = Vec::new();
                let mut j = i + 1;
                while j < entries.len() && !entries[j].is_code() {
                    match &entries[j] {
                        StatusEntry::String(s) => params.push(s.clone()),
                        StatusEntry::Number(n) => params.push(n.to_string()),
                        _ => {}
                    }
                    j += 1;
                }
                lines.push(format_template(*code, &params));
                // Interpreted lines between codes are emitted below
                for entry in &entries[i + 1..j] {
                    if let StatusEntry::Interpreted(text) = entry {
                        lines.push(text.clone());
                    }
                }
                i = j;
            }
            StatusEntry::Interpreted(text) => {
                lines.push(text.clone());
                i += 1;
            }
            _ => i += 1,
        }
    }
    lines.join("\n")
}

/// Substitute `@1..@n` in the template for `code`.
pub fn format_template(code: i32, params: &[String]) -> String {
    let Some(template) = message_template(code) else {
        return format!("No message for error code {} found.", code);
    };

    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '@' {
            if let Some(d) = chars.peek().and_then(|d| d.to_digit(10)) {
                chars.next();
                let index = d as usize;
                match params.get(index.wrapping_sub(1)) {
                    Some(p) => out.push_str(p),
                    None => {
                        out.push('@');
                        out.push_str(&index.to_string());
                    }
                }
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Message template for an error code.
pub fn message_template(code: i32) -> Option<&'static str> {
    MESSAGES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, template, _)| *template)
}

/// SQLSTATE used when the server does not send one.
pub fn fallback_sql_state(code: i32) -> &'static str {
    MESSAGES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, _, state)| *state)
        .unwrap_or("HY000")
}

const MESSAGES: &[(i32, &str, &str)] = &[
    (
        ISC_ARITH_EXCEPT,
        "arithmetic exception, numeric overflow, or string truncation",
        "22000",
    ),
    (ISC_BAD_REQ_HANDLE, "invalid request handle", "HY000"),
    (ISC_BAD_SEGSTR_HANDLE, "invalid BLOB handle", "HY000"),
    (335544329, "invalid BLOB ID", "HY000"),
    (
        ISC_BAD_TRANS_HANDLE,
        "invalid transaction handle (expecting explicit transaction start)",
        "25000",
    ),
    (335544336, "deadlock", "40001"),
    (
        335544344,
        "I/O error during \"@1\" operation for file \"@2\"",
        "HY000",
    ),
    (335544345, "lock conflict on no wait transaction", "40001"),
    (
        335544347,
        "validation error for column @1, value \"@2\"",
        "23000",
    ),
    (
        335544349,
        "attempt to store duplicate value (visible to active transactions) in unique index \"@1\"",
        "23000",
    ),
    (335544351, "unsuccessful metadata update", "42000"),
    (
        335544366,
        "segment buffer length shorter than expected",
        "HY000",
    ),
    (
        ISC_SEGSTR_EOF,
        "attempted retrieval of more segments than exist",
        "HY000",
    ),
    (335544382, "@1", "HY000"),
    (335544436, "SQL error code = @1", "42000"),
    (
        335544466,
        "violation of FOREIGN KEY constraint \"@1\" on table \"@2\"",
        "23000",
    ),
    (
        335544472,
        "Your user name and password are not defined. Ask your database administrator to set up a Firebird login.",
        "28000",
    ),
    (335544510, "lock time-out on wait transaction", "40001"),
    (335544517, "exception @1", "HY000"),
    (
        335544558,
        "Operation violates CHECK constraint @1 on view or table @2",
        "23000",
    ),
    (335544569, "Dynamic SQL Error", "42000"),
    (335544578, "Column unknown", "42S22"),
    (335544580, "Table unknown", "42S02"),
    (335544634, "Token unknown - line @1, column @2", "42000"),
    (
        335544665,
        "violation of PRIMARY or UNIQUE KEY constraint \"@1\" on table \"@2\"",
        "23000",
    ),
    (
        335544721,
        "Unable to complete network request to host \"@1\".",
        "08006",
    ),
    (
        ISC_NET_READ_ERR,
        "Error reading data from the connection.",
        "08006",
    ),
    (
        ISC_NET_WRITE_ERR,
        "Error writing data to the connection.",
        "08006",
    ),
    (ISC_CANCELLED, "operation was cancelled", "HY008"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_substitution() {
        let params = vec!["PK_T".to_string(), "T".to_string()];
        assert_eq!(
            format_template(335544665, &params),
            "violation of PRIMARY or UNIQUE KEY constraint \"PK_T\" on table \"T\""
        );
        assert_eq!(
            format_template(1, &[]),
            "No message for error code 1 found."
        );
    }

    #[test]
    fn test_exception_from_status_vector() {
        let ex = IscException::from_entries(vec![
            StatusEntry::Gds(335544569),
            StatusEntry::Gds(335544436),
            StatusEntry::Number(-104),
            StatusEntry::Gds(335544634),
            StatusEntry::Number(1),
            StatusEntry::Number(8),
            StatusEntry::String("FROMM".into()),
            StatusEntry::SqlState("42000".into()),
        ]);
        assert_eq!(ex.error_code, 335544569);
        assert_eq!(ex.sql_state, "42000");
        assert_eq!(
            ex.message,
            "Dynamic SQL Error\nSQL error code = -104\nToken unknown - line 1, column 8"
        );
        assert!(!ex.is_warning());
        assert_eq!(ex.error_codes().count(), 3);
    }

    #[test]
    fn test_fallback_sql_state() {
        let ex = IscException::from_entries(vec![StatusEntry::Gds(335544336)]);
        assert_eq!(ex.sql_state, "40001");
        let ex = IscException::from_entries(vec![StatusEntry::Gds(42)]);
        assert_eq!(ex.sql_state, "HY000");
    }

    #[test]
    fn test_warning_only_vector() {
        let ex = IscException::from_entries(vec![
            StatusEntry::Warning(335544382),
            StatusEntry::String("careful".into()),
        ]);
        assert!(ex.is_warning());
        assert_eq!(ex.error_code, 335544382);
        assert_eq!(ex.message, "careful");
    }

    #[test]
    fn test_interpreted_lines() {
        let ex = IscException::from_entries(vec![
            StatusEntry::Gds(335544517),
            StatusEntry::String("E_FAIL".into()),
            StatusEntry::Interpreted("custom text".into()),
        ]);
        assert_eq!(ex.message, "exception E_FAIL\ncustom text");
    }
}
