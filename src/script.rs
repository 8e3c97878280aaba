//! Script codec (C2): the narrow slice of the host chain's script model
//! the protocol actually touches — raw output-script bytes, the burn
//! sink, and `OP_RETURN`-style module commitment scripts.
//!
//! The full address <-> pkScript codec is an external collaborator;
//! [`AddressCodec`] is the seam a real implementation plugs into.

use serde::{Deserialize, Serialize};

use crate::config::Network;
use crate::ids::{InscriptionId, ModuleId};

/// Raw host-chain output-script bytes. Equality is by bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PkScript(pub Vec<u8>);

/// The single-byte `OP_RETURN` opcode; a script consisting of exactly
/// this byte denotes the burn sink.
pub const BURN_SINK_SCRIPT: u8 = 0x6a;

impl PkScript {
    pub fn is_burn_sink(&self) -> bool {
        self.0.as_slice() == [BURN_SINK_SCRIPT]
    }

    pub fn burn_sink() -> Self {
        Self(vec![BURN_SINK_SCRIPT])
    }

    /// Attempt to decode this script as an `OP_RETURN`-style module
    /// commitment and recover the module's inscription id. The wire form
    /// is `OP_RETURN <32..36 bytes of inscription reference>`: byte 0 is
    /// the opcode, byte 1 a push-length, the remainder the reference.
    pub fn as_module_commitment(&self) -> Option<ModuleId> {
        let bytes = &self.0;
        if bytes.len() < 3 || bytes[0] != BURN_SINK_SCRIPT {
            return None;
        }
        let push_len = bytes[1] as usize;
        let payload = bytes.get(2..2 + push_len)?;
        InscriptionId::from_binary_ref(payload).ok()
    }
}

/// Address ↔ pkScript codec, parameterised by [`Network`]. The core ledger
/// never needs a decoded address (everything keys off raw pkScript bytes);
/// this trait exists purely so CLI tooling and dump formatting can render
/// human-readable addresses.
pub trait AddressCodec {
    fn network(&self) -> Network;

    /// Decode a host-chain address string into its output script.
    fn address_to_script(&self, address: &str) -> Option<PkScript>;

    /// Encode an output script back into its canonical address string,
    /// when the script has a canonical address form.
    fn script_to_address(&self, script: &PkScript) -> Option<String>;
}

/// A codec that never resolves addresses; sufficient for the core ledger,
/// which only ever needs the raw script bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAddressCodec {
    pub network: Network,
}

impl AddressCodec for NullAddressCodec {
    fn network(&self) -> Network {
        self.network
    }

    fn address_to_script(&self, _address: &str) -> Option<PkScript> {
        None
    }

    fn script_to_address(&self, _script: &PkScript) -> Option<String> {
        None
    }
}

/// A codec that treats the address string as the hex encoding of the raw
/// pkScript bytes, in both directions. The real Base58/Bech32 codec is an
/// external collaborator (`spec.md` §1's Out of scope); this is the
/// minimal stand-in the commit engine's signature pre-verify needs to
/// resolve `addr` fields to pkScripts in tests and in deployments that
/// have not wired in a real codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct HexAddressCodec {
    pub network: Network,
}

impl AddressCodec for HexAddressCodec {
    fn network(&self) -> Network {
        self.network
    }

    fn address_to_script(&self, address: &str) -> Option<PkScript> {
        hex::decode(address).ok().map(PkScript)
    }

    fn script_to_address(&self, script: &PkScript) -> Option<String> {
        Some(hex::encode(&script.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burn_sink_detection() {
        assert!(PkScript::burn_sink().is_burn_sink());
        assert!(!PkScript(vec![0x00]).is_burn_sink());
        assert!(!PkScript(vec![0x6a, 0x01]).is_burn_sink());
    }

    #[test]
    fn module_commitment_roundtrip() {
        let mut txid = [0u8; 32];
        txid[0] = 0x11;
        let id = InscriptionId::new(txid, 7);
        let mut reversed = txid;
        reversed.reverse();
        let mut bytes = vec![BURN_SINK_SCRIPT, reversed.len() as u8];
        bytes.extend_from_slice(&reversed);
        let script = PkScript(bytes);
        let decoded = script.as_module_commitment().unwrap();
        assert_eq!(decoded, id);
    }

    #[test]
    fn non_commitment_script_decodes_to_none() {
        let script = PkScript(vec![0x76, 0xa9, 0x14]);
        assert!(script.as_module_commitment().is_none());
    }

    #[test]
    fn hex_address_codec_roundtrips() {
        let codec = HexAddressCodec::default();
        let script = codec.address_to_script("aabbcc").unwrap();
        assert_eq!(script.0, vec![0xaa, 0xbb, 0xcc]);
        assert_eq!(codec.script_to_address(&script).unwrap(), "aabbcc");
    }
}

