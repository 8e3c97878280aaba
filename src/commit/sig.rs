//! Signature rule for commit functions (§4.3): canonical text
//! construction, the double-sha256 function id, and the
//! [`SignatureVerifier`] seam a real Schnorr/BIP322 verifier plugs into.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::script::PkScript;

/// Verifies the BIP322-style witness carried by a commit function's `sig`
/// field. The real verifier (Schnorr/ECDSA over the receiver chain's
/// curve) is an external collaborator (`spec.md` §1); this crate only
/// needs the interface.
pub trait SignatureVerifier {
    /// `signature_b64` is the function's raw `sig` field. `message` is the
    /// exact byte string the signer was expected to sign (built by
    /// [`signing_message`]).
    fn verify(&self, pk_script: &PkScript, message: &[u8], signature_b64: &str) -> bool;
}

/// Deterministic stand-in for testing and for deployments that have not
/// wired in a real verifier: a signature is valid iff it is the base64 of
/// `sha256(pk_script || message)`. Never use against real chain data.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubVerifier;

impl SignatureVerifier for StubVerifier {
    fn verify(&self, pk_script: &PkScript, message: &[u8], signature_b64: &str) -> bool {
        let Ok(expected) = BASE64.decode(signature_b64) else {
            return false;
        };
        let mut hasher = Sha256::new();
        hasher.update(&pk_script.0);
        hasher.update(message);
        let digest = hasher.finalize();
        digest.as_slice() == expected.as_slice()
    }
}

impl StubVerifier {
    /// Produce a signature this verifier accepts, for test fixtures.
    pub fn sign(pk_script: &PkScript, message: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&pk_script.0);
        hasher.update(message);
        BASE64.encode(hasher.finalize())
    }
}

/// sha256(sha256(bytes)).
pub fn sha256d(bytes: &[u8]) -> [u8; 32] {
    let once = Sha256::digest(bytes);
    let twice = Sha256::digest(once);
    twice.into()
}

/// `addr: <addr>\nfunc: <name>\nparams: <param1 param2 ...>\nts: <ts>\n`,
/// the part of the canonical text common to both the id-hash input and
/// the signed message.
fn function_body(addr: &str, func: &str, params: &[String], ts: u64) -> String {
    format!("addr: {}\nfunc: {}\nparams: {}\nts: {}\n", addr, func, params.join(" "), ts)
}

/// The full canonical text a function id is hashed from: `module`,
/// optional `parent`, optional `gas_price`, optional `prevs` (ids of
/// earlier functions by the same address in this commit, in order), then
/// [`function_body`]. Whitespace and trailing newlines are
/// protocol-critical and must match byte-for-byte (`spec.md` §4.3,
/// §9 Open Questions).
#[allow(clippy::too_many_arguments)]
pub fn canonical_text(
    module: &str,
    parent: Option<&str>,
    gas_price: Option<&str>,
    prevs: &[String],
    addr: &str,
    func: &str,
    params: &[String],
    ts: u64,
) -> String {
    let mut s = format!("module: {}\n", module);
    if let Some(p) = parent {
        s.push_str(&format!("parent: {}\n", p));
    }
    if let Some(g) = gas_price {
        s.push_str(&format!("gas_price: {}\n", g));
    }
    if !prevs.is_empty() {
        s.push_str(&format!("prevs: {}\n", prevs.join(" ")));
    }
    s.push_str(&function_body(addr, func, params, ts));
    s
}

/// `hex(sha256(sha256(canonical_text)))`.
pub fn function_id(canonical_text: &str) -> String {
    hex::encode(sha256d(canonical_text.as_bytes()))
}

/// The message actually signed: `id: <function_id>\n` followed by
/// [`function_body`] — note this is *not* the same prefix as
/// [`canonical_text`] (the module/parent/gas_price/prevs header is
/// replaced by the single `id:` line).
pub fn signing_message(function_id: &str, addr: &str, func: &str, params: &[String], ts: u64) -> String {
    format!("id: {}\n", function_id) + &function_body(addr, func, params, ts)
}
