//! LMS JSON-RPC 报文
//!
//! 所有接口都是 POST `{jsonrpc: "2.0", method: "call", params, id}`，
//! 返回 `{jsonrpc, result?, error?, id}`。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ApiError, AppError, Result};

/// JSON-RPC 请求体
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<P: Serialize> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: P,
    pub id: u64,
}

impl<P: Serialize> RpcRequest<P> {
    pub fn call(params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            method: "call",
            params,
            id: rand::random_range(0..1_000_000_000u64),
        }
    }
}

/// JSON-RPC error 字段
#[derive(Debug, Clone, Deserialize)]
pub struct RpcFault {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<JsonValue>,
    #[serde(default)]
    error: Option<RpcFault>,
}

/// 解码后的 JSON-RPC 响应
#[derive(Debug, Clone)]
pub enum RpcReply<T> {
    Ok(T),
    Fault { code: i64, message: String },
}

impl<T> RpcReply<T> {
    /// 把 Fault 转成错误
    pub fn into_result(self, endpoint: &str) -> Result<T> {
        match self {
            RpcReply::Ok(value) => Ok(value),
            RpcReply::Fault { code, message } => Err(AppError::Api(ApiError::RpcFault {
                endpoint: endpoint.to_string(),
                code,
                message,
            })),
        }
    }
}

/// 按接口的 schema 解码响应
///
/// `result` 为 null 且没有 `error` 视为结构异常。
pub fn decode_reply<T: DeserializeOwned>(endpoint: &str, body: &JsonValue) -> Result<RpcReply<T>> {
    let unexpected = || {
        AppError::Api(ApiError::UnexpectedShape {
            endpoint: endpoint.to_string(),
            raw: body.to_string(),
        })
    };

    let envelope: RpcEnvelope = serde_json::from_value(body.clone()).map_err(|_| unexpected())?;

    if let Some(fault) = envelope.error {
        let message = fault
            .data
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(|m| m.as_str())
            .map(|m| format!("{} ({})", fault.message, m))
            .unwrap_or(fault.message);
        return Ok(RpcReply::Fault {
            code: fault.code,
            message,
        });
    }

    match envelope.result {
        Some(result) if !result.is_null() => {
            let typed = serde_json::from_value(result).map_err(|_| unexpected())?;
            Ok(RpcReply::Ok(typed))
        }
        _ => Err(unexpected()),
    }
}
