//! Identifiers: [`InscriptionId`], [`CreateIdxKey`],
//! [`Ticker`], [`PoolPair`] and the [`ModuleId`] alias.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IdError, TokenError};

/// `hex(reverse(txid)) || "i" || decimal(idx)`. Always derived from the
/// underlying `(txid, idx)` pair, never stored redundantly.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InscriptionId {
    /// Raw (non-reversed) txid bytes, 32 bytes.
    pub txid: [u8; 32],
    pub index: u32,
}

impl InscriptionId {
    pub fn new(txid: [u8; 32], index: u32) -> Self {
        Self { txid, index }
    }

    /// Decode a 32..36-byte binary inscription reference: 32 reversed txid
    /// bytes followed by an optional little-endian index (defaults to 0
    /// when the reference is exactly 32 bytes).
    pub fn from_binary_ref(bytes: &[u8]) -> Result<Self, IdError> {
        if bytes.len() < 32 || bytes.len() > 36 {
            return Err(IdError::BadInscriptionRefLength(bytes.len()));
        }
        let mut txid = [0u8; 32];
        txid.copy_from_slice(&bytes[0..32]);
        txid.reverse();
        let index = if bytes.len() > 32 {
            let mut idx_bytes = [0u8; 4];
            idx_bytes[..bytes.len() - 32].copy_from_slice(&bytes[32..]);
            u32::from_le_bytes(idx_bytes)
        } else {
            0
        };
        Ok(Self { txid, index })
    }
}

impl fmt::Display for InscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.txid;
        reversed.reverse();
        write!(f, "{}i{}", hex::encode(reversed), self.index)
    }
}

impl std::str::FromStr for InscriptionId {
    type Err = IdError;

    /// Parse the `hex(reverse(txid))i<index>` textual form used in wire
    /// payloads (module ids, commit parent references).
    fn from_str(s: &str) -> Result<Self, IdError> {
        let (txid_hex, index_str) = s
            .split_once('i')
            .ok_or_else(|| IdError::BadDisplayFormat(s.to_string()))?;
        let reversed =
            hex::decode(txid_hex).map_err(|_| IdError::BadDisplayFormat(s.to_string()))?;
        if reversed.len() != 32 {
            return Err(IdError::BadDisplayFormat(s.to_string()));
        }
        let mut txid = [0u8; 32];
        txid.copy_from_slice(&reversed);
        txid.reverse();
        let index: u32 = index_str
            .parse()
            .map_err(|_| IdError::BadDisplayFormat(s.to_string()))?;
        Ok(Self { txid, index })
    }
}

/// Opaque 12-byte creation-site key: `(height: u32 LE, idx_in_block: u64 LE)`.
/// Unique per inscription creation, used as the join handle a later
/// transfer-move uses to rediscover its creation payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreateIdxKey([u8; 12]);

impl CreateIdxKey {
    pub fn new(height: u32, idx_in_block: u64) -> Self {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&height.to_le_bytes());
        bytes[4..12].copy_from_slice(&idx_in_block.to_le_bytes());
        Self(bytes)
    }

    pub fn height(&self) -> u32 {
        u32::from_le_bytes(self.0[0..4].try_into().unwrap())
    }

    pub fn idx_in_block(&self) -> u64 {
        u64::from_le_bytes(self.0[4..12].try_into().unwrap())
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

impl fmt::Display for CreateIdxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.height(), self.idx_in_block())
    }
}

/// `ModuleId` is just the `InscriptionId` of the module-deploy inscription.
pub type ModuleId = InscriptionId;

/// 4 or 5 byte printable-ASCII ticker. Comparison and hashing are
/// case-insensitive (via the stored lowercase form); [`Ticker::display`]
/// preserves the case recorded at deploy time.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
pub struct Ticker {
    lower: String,
    display: String,
}

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let len = raw.len();
        if (len != 4 && len != 5) || !raw.is_ascii() || raw.chars().any(|c| c.is_control()) {
            return Err(TokenError::BadTickerLength(len));
        }
        Ok(Self {
            lower: raw.to_ascii_lowercase(),
            display: raw.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_self_mint_length(&self) -> bool {
        self.len() == 5
    }

    pub fn lower(&self) -> &str {
        &self.lower
    }

    pub fn display(&self) -> &str {
        &self.display
    }
}

impl PartialEq for Ticker {
    fn eq(&self, other: &Self) -> bool {
        self.lower == other.lower
    }
}

impl std::hash::Hash for Ticker {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.lower.hash(state);
    }
}

impl PartialOrd for Ticker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ticker {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lower.cmp(&other.lower)
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

/// Canonical ordering of a pair of tickers: both lowercased, the
/// lexicographically smaller one first, encoded as `len(a):u8 || a || b`.
/// Deterministic and collision-free because ticker length is fixed at 4
/// or 5 bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolPair {
    key: Vec<u8>,
    pub tick0: String,
    pub tick1: String,
}

impl PoolPair {
    pub fn new(a: &Ticker, b: &Ticker) -> Self {
        let (tick0, tick1) = if a.lower() <= b.lower() {
            (a.lower().to_string(), b.lower().to_string())
        } else {
            (b.lower().to_string(), a.lower().to_string())
        };
        let mut key = Vec::with_capacity(1 + tick0.len() + tick1.len());
        key.push(tick0.len() as u8);
        key.extend_from_slice(tick0.as_bytes());
        key.extend_from_slice(tick1.as_bytes());
        Self { key, tick0, tick1 }
    }

    /// Index of `tick` within the pair (0 or 1), if it is a member.
    pub fn index_of(&self, tick_lower: &str) -> Option<usize> {
        if self.tick0 == tick_lower {
            Some(0)
        } else if self.tick1 == tick_lower {
            Some(1)
        } else {
            None
        }
    }

    pub fn other_index(idx: usize) -> usize {
        1 - idx
    }

    /// The lowercased ticker at position `idx` (0 or 1).
    pub fn tick_at(&self, idx: usize) -> String {
        if idx == 0 {
            self.tick0.clone()
        } else {
            self.tick1.clone()
        }
    }

    /// Lower range-query bound: sorts before every real `PoolPair` because
    /// `key` is compared first and no real pair has an empty encoding.
    pub fn range_start() -> Self {
        Self {
            key: Vec::new(),
            tick0: String::new(),
            tick1: String::new(),
        }
    }

    /// The legacy single-parameter commit wire form (before
    /// `ENABLE_SWAP_WITHDRAW_HEIGHT`): the same `len(a):u8 || a || b`
    /// encoding as `key`, carried as a commit function parameter string.
    pub fn to_wire_param(&self) -> String {
        String::from_utf8(self.key.clone()).expect("tickers are printable ASCII")
    }

    /// Inverse of [`Self::to_wire_param`].
    pub fn decode_wire_param(s: &str) -> Option<(String, String)> {
        let bytes = s.as_bytes();
        let len0 = *bytes.first()? as usize;
        if bytes.len() < 1 + len0 {
            return None;
        }
        let tick0 = std::str::from_utf8(&bytes[1..1 + len0]).ok()?.to_string();
        let tick1 = std::str::from_utf8(&bytes[1 + len0..]).ok()?.to_string();
        Some((tick0, tick1))
    }
}

impl fmt::Display for PoolPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tick0, self.tick1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_case_insensitive_eq() {
        let a = Ticker::parse("ordi").unwrap();
        let b = Ticker::parse("ORDI").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.display(), "ordi");
        assert_eq!(b.display(), "ORDI");
    }

    #[test]
    fn ticker_rejects_bad_length() {
        assert!(Ticker::parse("abc").is_err());
        assert!(Ticker::parse("abcdef").is_err());
    }

    #[test]
    fn pool_pair_canonical_ordering_is_symmetric() {
        let a = Ticker::parse("zzzz").unwrap();
        let b = Ticker::parse("aaaa").unwrap();
        let p1 = PoolPair::new(&a, &b);
        let p2 = PoolPair::new(&b, &a);
        assert_eq!(p1, p2);
        assert_eq!(p1.tick0, "aaaa");
        assert_eq!(p1.tick1, "zzzz");
    }

    #[test]
    fn inscription_id_display_format() {
        let mut txid = [0u8; 32];
        txid[0] = 0xab;
        let id = InscriptionId::new(txid, 3);
        let s = id.to_string();
        assert!(s.ends_with("i3"));
        assert_eq!(s.len(), 64 + 2);
    }

    #[test]
    fn inscription_id_from_binary_ref_reverses_txid() {
        let mut raw = [0u8; 36];
        raw[0] = 0xff;
        raw[35] = 0x07;
        let id = InscriptionId::from_binary_ref(&raw).unwrap();
        assert_eq!(id.txid[31], 0xff);
        assert_eq!(id.index, 0x07000000);
    }

    #[test]
    fn inscription_id_display_parse_roundtrip() {
        let mut txid = [0u8; 32];
        txid[5] = 0x42;
        let id = InscriptionId::new(txid, 12);
        let parsed: InscriptionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn pool_pair_wire_param_roundtrip() {
        let a = Ticker::parse("ordi").unwrap();
        let b = Ticker::parse("sats5").unwrap();
        let pair = PoolPair::new(&a, &b);
        let wire = pair.to_wire_param();
        let (t0, t1) = PoolPair::decode_wire_param(&wire).unwrap();
        assert_eq!(t0, pair.tick0);
        assert_eq!(t1, pair.tick1);
    }

    #[test]
    fn create_idx_key_roundtrip() {
        let k = CreateIdxKey::new(800_000, 42);
        assert_eq!(k.height(), 800_000);
        assert_eq!(k.idx_in_block(), 42);
    }
}

