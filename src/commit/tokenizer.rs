//! Byte-length extraction per commit function (C6, §4.4).
//!
//! A single streaming scan of the raw commit JSON body records, for every
//! top-level element of the `"data"` array, the inclusive byte span
//! `[open_brace, close_brace]`. This is what gas is charged against before
//! `ENABLE_SWAP_WITHDRAW_HEIGHT`. The scan below ports the reference
//! tokeniser's *behavior* (find `"data"`, find its array, record each
//! element's brace span) as a small recursive-descent byte scanner rather
//! than its literal two-state stack machine.

use crate::error::CommitError;

/// Byte offsets `[open_brace, close_brace]` (inclusive) for every element
/// of the commit body's top-level `"data"` array, in array order. Errors
/// if the body is not a JSON object, has no `"data"` array, or is
/// otherwise malformed enough that brace matching fails.
pub fn data_element_byte_sizes(raw: &[u8]) -> Result<Vec<usize>, CommitError> {
    let mut pos = 0usize;
    skip_ws(raw, &mut pos);
    expect(raw, &mut pos, b'{')?;

    loop {
        skip_ws(raw, &mut pos);
        if peek(raw, pos) == Some(b'}') {
            pos += 1;
            break;
        }
        let key = parse_string(raw, &mut pos)?;
        skip_ws(raw, &mut pos);
        expect(raw, &mut pos, b':')?;
        skip_ws(raw, &mut pos);

        if key == "data" {
            return parse_data_array(raw, &mut pos);
        }
        skip_value(raw, &mut pos)?;

        skip_ws(raw, &mut pos);
        match peek(raw, pos) {
            Some(b',') => {
                pos += 1;
            }
            Some(b'}') => {
                pos += 1;
                break;
            }
            _ => return Err(malformed("expected ',' or '}'")),
        }
    }

    Err(malformed("commit body has no top-level \"data\" key"))
}

fn parse_data_array(raw: &[u8], pos: &mut usize) -> Result<Vec<usize>, CommitError> {
    expect(raw, pos, b'[')?;
    let mut sizes = Vec::new();

    skip_ws(raw, pos);
    if peek(raw, *pos) == Some(b']') {
        *pos += 1;
        return Ok(sizes);
    }

    loop {
        skip_ws(raw, pos);
        let start = *pos;
        if peek(raw, *pos) != Some(b'{') {
            return Err(malformed("\"data\" array element is not an object"));
        }
        skip_value(raw, pos)?;
        let end = *pos - 1;
        sizes.push(end - start + 1);

        skip_ws(raw, pos);
        match peek(raw, *pos) {
            Some(b',') => {
                *pos += 1;
            }
            Some(b']') => {
                *pos += 1;
                break;
            }
            _ => return Err(malformed("expected ',' or ']' in \"data\" array")),
        }
    }

    Ok(sizes)
}

/// Advance `pos` past one complete JSON value of any kind, without
/// retaining its content.
fn skip_value(raw: &[u8], pos: &mut usize) -> Result<(), CommitError> {
    skip_ws(raw, pos);
    match peek(raw, *pos) {
        Some(b'{') => skip_container(raw, pos, b'{', b'}'),
        Some(b'[') => skip_container(raw, pos, b'[', b']'),
        Some(b'"') => {
            parse_string(raw, pos)?;
            Ok(())
        }
        Some(b't') => skip_literal(raw, pos, b"true"),
        Some(b'f') => skip_literal(raw, pos, b"false"),
        Some(b'n') => skip_literal(raw, pos, b"null"),
        Some(c) if c == b'-' || c.is_ascii_digit() => skip_number(raw, pos),
        _ => Err(malformed("unexpected byte while skipping a JSON value")),
    }
}

fn skip_container(raw: &[u8], pos: &mut usize, open: u8, close: u8) -> Result<(), CommitError> {
    expect(raw, pos, open)?;
    skip_ws(raw, pos);
    if peek(raw, *pos) == Some(close) {
        *pos += 1;
        return Ok(());
    }
    loop {
        skip_ws(raw, pos);
        if open == b'{' {
            parse_string(raw, pos)?;
            skip_ws(raw, pos);
            expect(raw, pos, b':')?;
        }
        skip_value(raw, pos)?;
        skip_ws(raw, pos);
        match peek(raw, *pos) {
            Some(b',') => {
                *pos += 1;
            }
            Some(c) if c == close => {
                *pos += 1;
                break;
            }
            _ => return Err(malformed("unterminated JSON container")),
        }
    }
    Ok(())
}

fn skip_literal(raw: &[u8], pos: &mut usize, lit: &[u8]) -> Result<(), CommitError> {
    if raw[*pos..].starts_with(lit) {
        *pos += lit.len();
        Ok(())
    } else {
        Err(malformed("invalid literal"))
    }
}

fn skip_number(raw: &[u8], pos: &mut usize) -> Result<(), CommitError> {
    let start = *pos;
    if peek(raw, *pos) == Some(b'-') {
        *pos += 1;
    }
    while matches!(peek(raw, *pos), Some(c) if c.is_ascii_digit() || c == b'.' || c == b'e' || c == b'E' || c == b'+' || c == b'-') {
        *pos += 1;
    }
    if *pos == start {
        return Err(malformed("empty number"));
    }
    Ok(())
}

fn parse_string(raw: &[u8], pos: &mut usize) -> Result<String, CommitError> {
    expect(raw, pos, b'"')?;
    let mut out = String::new();
    loop {
        match raw.get(*pos) {
            None => return Err(malformed("unterminated string")),
            Some(b'"') => {
                *pos += 1;
                break;
            }
            Some(b'\\') => {
                *pos += 1;
                match raw.get(*pos) {
                    Some(b'"') => out.push('"'),
                    Some(b'\\') => out.push('\\'),
                    Some(b'/') => out.push('/'),
                    Some(b'n') => out.push('\n'),
                    Some(b't') => out.push('\t'),
                    Some(b'r') => out.push('\r'),
                    Some(b'b') => out.push('\u{8}'),
                    Some(b'f') => out.push('\u{c}'),
                    Some(b'u') => {
                        // Skip the 4 hex digits verbatim; commit bodies
                        // never rely on unicode escapes in the keys or
                        // string values this tokeniser inspects.
                        *pos += 4;
                    }
                    _ => return Err(malformed("invalid escape sequence")),
                }
                *pos += 1;
            }
            Some(&b) => {
                out.push(b as char);
                *pos += 1;
            }
        }
    }
    Ok(out)
}

fn skip_ws(raw: &[u8], pos: &mut usize) {
    while matches!(peek(raw, *pos), Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')) {
        *pos += 1;
    }
}

fn peek(raw: &[u8], pos: usize) -> Option<u8> {
    raw.get(pos).copied()
}

fn expect(raw: &[u8], pos: &mut usize, want: u8) -> Result<(), CommitError> {
    if peek(raw, *pos) == Some(want) {
        *pos += 1;
        Ok(())
    } else {
        Err(malformed(&format!("expected '{}'", want as char)))
    }
}

fn malformed(msg: &str) -> CommitError {
    CommitError::MalformedBody(msg.to_string())
}
