//! JSON payload decoders for inscription bodies.

use serde::Deserialize;
use serde_json::Value;

pub use crate::error::PayloadError;

/// Cheap prefilter the dispatcher applies before attempting a full JSON
/// parse: the body must at least look like a JSON object.
pub fn looks_like_json(content: &[u8]) -> bool {
    let trimmed = content
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .copied()
        .next();
    trimmed == Some(b'{')
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployPayload {
    pub tick: String,
    pub max: String,
    #[serde(default)]
    pub lim: Option<String>,
    #[serde(default)]
    pub dec: Option<String>,
    #[serde(default)]
    pub self_mint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MintOrTransferPayload {
    pub tick: String,
    pub amt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDeployInit {
    pub sequencer: String,
    pub gas_to: String,
    pub fee_to: String,
    pub gas_tick: String,
    #[serde(default)]
    pub swap_fee_rate: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDeployPayload {
    pub name: String,
    pub source: String,
    pub init: ModuleDeployInit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleWithdrawPayload {
    pub module: String,
    pub tick: String,
    pub amt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovePayload {
    pub module: String,
    pub tick: String,
    pub amt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitFunctionRaw {
    pub addr: String,
    pub func: String,
    #[serde(default)]
    pub params: Vec<String>,
    pub ts: u64,
    pub sig: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitPayload {
    pub module: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub gas_price: String,
    pub data: Vec<CommitFunctionRaw>,
}

#[derive(Debug, Clone)]
pub enum Operation {
    Deploy(DeployPayload),
    Mint(MintOrTransferPayload),
    Transfer(MintOrTransferPayload),
    ModuleDeploy(ModuleDeployPayload),
    ModuleWithdraw(ModuleWithdrawPayload),
    Approve(ApprovePayload),
    CondApprove(ApprovePayload),
    Commit(CommitPayload),
}

/// Decode an inscription body into a typed [`Operation`], dispatching on
/// its `p`/`op` fields.
pub fn decode_payload(content: &[u8]) -> Result<Operation, PayloadError> {
    let value: Value = serde_json::from_slice(content)
        .map_err(|e| PayloadError::Malformed(e.to_string()))?;

    let p = value
        .get("p")
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingField("p"))?;
    let op = value
        .get("op")
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingField("op"))?;

    let from_value = |v: Value| -> Result<Operation, PayloadError> {
        let malformed = |e: serde_json::Error| PayloadError::Malformed(e.to_string());
        match (p, op) {
            ("brc-20", "deploy") => Ok(Operation::Deploy(
                serde_json::from_value(v).map_err(malformed)?,
            )),
            ("brc-20", "mint") => Ok(Operation::Mint(
                serde_json::from_value(v).map_err(malformed)?,
            )),
            ("brc-20", "transfer") => Ok(Operation::Transfer(
                serde_json::from_value(v).map_err(malformed)?,
            )),
            ("brc20-module", "deploy") => Ok(Operation::ModuleDeploy(
                serde_json::from_value(v).map_err(malformed)?,
            )),
            ("brc20-module", "withdraw") => Ok(Operation::ModuleWithdraw(
                serde_json::from_value(v).map_err(malformed)?,
            )),
            ("brc20-swap", "approve") => Ok(Operation::Approve(
                serde_json::from_value(v).map_err(malformed)?,
            )),
            ("brc20-swap", "conditional-approve") => Ok(Operation::CondApprove(
                serde_json::from_value(v).map_err(malformed)?,
            )),
            ("brc20-swap", "commit") => Ok(Operation::Commit(
                serde_json::from_value(v).map_err(malformed)?,
            )),
            _ => {
                if p != "brc-20" && p != "brc20-module" && p != "brc20-swap" {
                    Err(PayloadError::UnknownProtocol(p.to_string()))
                } else {
                    Err(PayloadError::UnknownOperation(op.to_string()))
                }
            }
        }
    };

    from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_deploy() {
        let body = br#"{"p":"brc-20","op":"deploy","tick":"ordi","max":"21000000","lim":"1000"}"#;
        match decode_payload(body).unwrap() {
            Operation::Deploy(d) => {
                assert_eq!(d.tick, "ordi");
                assert_eq!(d.max, "21000000");
                assert_eq!(d.lim.as_deref(), Some("1000"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn rejects_unknown_protocol() {
        let body = br#"{"p":"nope","op":"deploy"}"#;
        assert!(matches!(
            decode_payload(body),
            Err(PayloadError::UnknownProtocol(_))
        ));
    }

    #[test]
    fn rejects_unknown_op_for_known_protocol() {
        let body = br#"{"p":"brc-20","op":"burn"}"#;
        assert!(matches!(
            decode_payload(body),
            Err(PayloadError::UnknownOperation(_))
        ));
    }

    #[test]
    fn looks_like_json_prefilter() {
        assert!(looks_like_json(b" {\"p\":1}"));
        assert!(!looks_like_json(b"hello"));
        assert!(!looks_like_json(b""));
    }

    #[test]
    fn decodes_commit_with_function_list() {
        let body = br#"{"p":"brc20-swap","op":"commit","module":"abc","gas_price":"1","data":[{"addr":"a","func":"swap","params":["x","y"],"ts":1,"sig":"s"}]}"#;
        match decode_payload(body).unwrap() {
            Operation::Commit(c) => {
                assert_eq!(c.data.len(), 1);
                assert_eq!(c.data[0].func, "swap");
            }
            _ => panic!("wrong variant"),
        }
    }
}

