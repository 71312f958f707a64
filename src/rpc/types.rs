//! JSON-RPC wire types and value helpers.

use std::str::FromStr;

use alloy::primitives::{hex, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IpcError, IpcResult};

/// Request id sent with every call. Flows are strictly request/response.
pub const REQUEST_ID: u64 = 42;

/// Outgoing JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub id: u64,
    pub params: &'a Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            id: REQUEST_ID,
            params,
        }
    }
}

/// Error object returned by a node.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Turn a decoded response body into the `result` member or an error.
///
/// A present `error` member wins; a missing `result` member is an error,
/// while `"result": null` is a legitimate value.
pub fn into_result(method: &str, mut body: Value) -> IpcResult<Value> {
    let obj = body
        .as_object_mut()
        .ok_or_else(|| IpcError::schema(method, "response is not a JSON object"))?;

    if let Some(error) = obj.remove("error") {
        if !error.is_null() {
            let parsed: JsonRpcErrorObject =
                serde_json::from_value(error.clone()).unwrap_or(JsonRpcErrorObject {
                    code: 0,
                    message: error.to_string(),
                });
            return Err(IpcError::Rpc {
                code: parsed.code,
                message: parsed.message,
            });
        }
    }

    obj.remove("result").ok_or_else(|| IpcError::Rpc {
        code: 0,
        message: format!("{method}: response carried no result"),
    })
}

/// A point in chain history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Pending,
    Latest,
    Earliest,
    Number(u64),
}

impl BlockTag {
    /// Wire form: a literal tag or a `0x` hex quantity.
    pub fn as_param(&self) -> String {
        match self {
            BlockTag::Pending => "pending".to_string(),
            BlockTag::Latest => "latest".to_string(),
            BlockTag::Earliest => "earliest".to_string(),
            BlockTag::Number(n) => quantity(*n),
        }
    }
}

impl From<u64> for BlockTag {
    fn from(n: u64) -> Self {
        BlockTag::Number(n)
    }
}

/// Encode an integer as a hex quantity (`0x0`, `0x2a`).
pub fn quantity(n: u64) -> String {
    format!("{:#x}", n)
}

/// Encode a U256 as a hex quantity.
pub fn quantity_u256(n: U256) -> String {
    format!("0x{:x}", n)
}

fn as_str<'v>(method: &str, value: &'v Value) -> IpcResult<&'v str> {
    value
        .as_str()
        .ok_or_else(|| IpcError::schema(method, format!("expected string, got {value}")))
}

fn strip_hex_prefix<'s>(method: &str, s: &'s str) -> IpcResult<&'s str> {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| IpcError::schema(method, format!("'{s}' is not 0x-prefixed")))
}

/// Parse a hex quantity result into a u64.
pub fn parse_u64(method: &str, value: &Value) -> IpcResult<u64> {
    let s = as_str(method, value)?;
    let digits = strip_hex_prefix(method, s)?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| IpcError::schema(method, format!("bad quantity '{s}': {e}")))
}

/// Parse a hex quantity result into a U256.
pub fn parse_u256(method: &str, value: &Value) -> IpcResult<U256> {
    let s = as_str(method, value)?;
    let digits = strip_hex_prefix(method, s)?;
    U256::from_str_radix(digits, 16)
        .map_err(|e| IpcError::schema(method, format!("bad quantity '{s}': {e}")))
}

/// Parse a 32-byte hash result.
pub fn parse_hash(method: &str, value: &Value) -> IpcResult<B256> {
    let s = as_str(method, value)?;
    B256::from_str(s).map_err(|e| IpcError::schema(method, format!("bad hash '{s}': {e}")))
}

/// Parse a 20-byte address result.
pub fn parse_address(method: &str, value: &Value) -> IpcResult<Address> {
    let s = as_str(method, value)?;
    Address::from_str(s).map_err(|e| IpcError::schema(method, format!("bad address '{s}': {e}")))
}

/// Parse a hex data result.
pub fn parse_bytes(method: &str, value: &Value) -> IpcResult<Bytes> {
    let s = as_str(method, value)?;
    hex::decode(s)
        .map(Bytes::from)
        .map_err(|e| IpcError::schema(method, format!("bad data '{s}': {e}")))
}

/// Parse a boolean result.
pub fn parse_bool(method: &str, value: &Value) -> IpcResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| IpcError::schema(method, format!("expected bool, got {value}")))
}

/// Parse a string result.
pub fn parse_string(method: &str, value: &Value) -> IpcResult<String> {
    as_str(method, value).map(str::to_string)
}

/// Serde adapters for hex quantities inside node objects.
pub(crate) mod serde_quantity {
    use serde::{de, Deserialize, Deserializer};

    fn parse<E: de::Error>(s: &str) -> Result<u64, E> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        u64::from_str_radix(digits, 16).map_err(E::custom)
    }

    pub mod opt {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(s) => parse(&s).map(Some),
                None => Ok(None),
            }
        }
    }

    /// `null` (still pending) reads as zero.
    pub mod or_zero {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
            super::opt::deserialize(d).map(Option::unwrap_or_default)
        }
    }
}
