//! The input-line loader: decodes one `RawEvent` per line of the
//! whitespace-separated wire format documented in `DESIGN.md`.
//!
//! `sequence txid_hex idx vout offset satoshi pkScript_hex inscr_number
//! content_hex createIdxKey_hex height tx_idx block_time [parent_ref_hex]`
//!
//! The first thirteen fields are the wire format as given; the optional
//! fourteenth field is this crate's own extension carrying
//! [`RawEvent::parent`] (see `DESIGN.md`'s Open Question record) — absent,
//! or written as `-`, means "no parent reference".

use std::io::BufRead;

use thiserror::Error;

use crate::event::RawEvent;
use crate::ids::{CreateIdxKey, InscriptionId};
use crate::script::PkScript;

pub const MIN_FIELDS: usize = 13;
pub const MAX_FIELDS: usize = 14;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("line {line}: expected {MIN_FIELDS}..={MAX_FIELDS} space-separated fields, got {actual}")]
    WrongFieldCount { line: usize, actual: usize },
    #[error("line {line}: invalid `{field}` field: {detail}")]
    BadField {
        line: usize,
        field: &'static str,
        detail: String,
    },
}

impl LoadError {
    fn bad(line: usize, field: &'static str, detail: impl std::fmt::Display) -> Self {
        LoadError::BadField {
            line,
            field,
            detail: detail.to_string(),
        }
    }
}

/// Parse a single input line into a [`RawEvent`]. `line_no` is 1-based and
/// used only for error messages.
pub fn parse_line(line_no: usize, line: &str) -> Result<RawEvent, LoadError> {
    let fields: Vec<&str> = line.split_ascii_whitespace().collect();
    if fields.len() < MIN_FIELDS || fields.len() > MAX_FIELDS {
        return Err(LoadError::WrongFieldCount {
            line: line_no,
            actual: fields.len(),
        });
    }

    let sequence: u64 = fields[0]
        .parse()
        .map_err(|e| LoadError::bad(line_no, "sequence", e))?;

    let txid_bytes = hex::decode(fields[1]).map_err(|e| LoadError::bad(line_no, "txid", e))?;
    if txid_bytes.len() != 32 {
        return Err(LoadError::bad(
            line_no,
            "txid",
            format!("expected 32 bytes, got {}", txid_bytes.len()),
        ));
    }
    let mut txid = [0u8; 32];
    txid.copy_from_slice(&txid_bytes);

    let idx: u32 = fields[2]
        .parse()
        .map_err(|e| LoadError::bad(line_no, "idx", e))?;
    let vout: u32 = fields[3]
        .parse()
        .map_err(|e| LoadError::bad(line_no, "vout", e))?;
    let offset: u64 = fields[4]
        .parse()
        .map_err(|e| LoadError::bad(line_no, "offset", e))?;
    let satoshi: u64 = fields[5]
        .parse()
        .map_err(|e| LoadError::bad(line_no, "satoshi", e))?;

    let pk_script_bytes =
        hex::decode(fields[6]).map_err(|e| LoadError::bad(line_no, "pkScript", e))?;
    let pk_script = PkScript(pk_script_bytes);

    let inscr_number: i64 = fields[7]
        .parse()
        .map_err(|e| LoadError::bad(line_no, "inscr_number", e))?;

    let content = if fields[8] == "-" {
        Vec::new()
    } else {
        hex::decode(fields[8]).map_err(|e| LoadError::bad(line_no, "content", e))?
    };

    let create_key_bytes =
        hex::decode(fields[9]).map_err(|e| LoadError::bad(line_no, "createIdxKey", e))?;
    if create_key_bytes.len() != 12 {
        return Err(LoadError::bad(
            line_no,
            "createIdxKey",
            format!("expected 12 bytes, got {}", create_key_bytes.len()),
        ));
    }
    let mut create_key = [0u8; 12];
    create_key.copy_from_slice(&create_key_bytes);
    let create_idx_key = CreateIdxKey::from_bytes(create_key);

    let height: u32 = fields[10]
        .parse()
        .map_err(|e| LoadError::bad(line_no, "height", e))?;
    let tx_idx: u32 = fields[11]
        .parse()
        .map_err(|e| LoadError::bad(line_no, "tx_idx", e))?;
    let block_time: u64 = fields[12]
        .parse()
        .map_err(|e| LoadError::bad(line_no, "block_time", e))?;

    let parent = match fields.get(13) {
        None | Some(&"-") => None,
        Some(raw) => {
            let bytes = hex::decode(raw).map_err(|e| LoadError::bad(line_no, "parent", e))?;
            Some(
                InscriptionId::from_binary_ref(&bytes)
                    .map_err(|e| LoadError::bad(line_no, "parent", e))?,
            )
        }
    };

    Ok(RawEvent {
        sequence,
        txid,
        idx,
        vout,
        offset,
        satoshi,
        pk_script,
        inscr_number,
        content,
        create_idx_key,
        height,
        tx_idx,
        block_time,
        parent,
    })
}

/// Iterator adapter over a [`BufRead`] yielding one [`RawEvent`] per
/// non-blank line. Blank lines (and lines that are only whitespace) are
/// skipped silently; everything else that fails to parse surfaces as
/// `Err` and the caller decides whether to skip or abort.
pub struct EventReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<RawEvent, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.lines.next()?;
            self.line_no += 1;
            let line = match raw {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(LoadError::bad(self.line_no, "line", e)));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(parse_line(self.line_no, &line));
        }
    }
}
