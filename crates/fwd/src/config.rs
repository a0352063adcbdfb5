// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forwarding parameters.
//!
//! The full option set is declared in the module descriptor so the core
//! can dispatch by name; the `tls-*` and `proxy-*` families are
//! recognized but refused at activation until those transports exist.

use sm_engine::{EngineError, ModuleParams, ParamDescr, RetryPolicy};
use sm_wire::Framing;
use std::time::Duration;

pub(crate) const PARAMS: [ParamDescr; 15] = [
    ParamDescr::required("target"),
    ParamDescr::optional("port"),
    ParamDescr::optional("protocol"),
    ParamDescr::optional("framing"),
    ParamDescr::optional("compression-level"),
    ParamDescr::optional("timeout-ms"),
    ParamDescr::optional("retry-max"),
    ParamDescr::optional("retry-initial-ms"),
    ParamDescr::optional("retry-max-ms"),
    ParamDescr::optional("tls-ca"),
    ParamDescr::optional("tls-cert"),
    ParamDescr::optional("tls-key"),
    ParamDescr::optional("tls-verify"),
    ParamDescr::optional("proxy-host"),
    ParamDescr::optional("proxy-port"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

#[derive(Debug, Clone)]
pub struct FwdConfig {
    pub target: String,
    pub port: u16,
    pub protocol: Protocol,
    pub framing: Framing,
    pub compression_level: u32,
    pub min_compress_size: usize,
    pub max_line: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl FwdConfig {
    pub fn from_params(params: &ModuleParams) -> Result<Self, EngineError> {
        for family in ["tls-", "proxy-"] {
            if let Some(key) = params.keys().find(|k| k.starts_with(family)) {
                return Err(EngineError::Config(format!(
                    "fwd: {key} is recognized but not supported by this build"
                )));
            }
        }

        let target = str_param(params, "target")?
            .ok_or_else(|| EngineError::Config("fwd: target is required".into()))?;

        let protocol = match str_param(params, "protocol")?.as_deref() {
            None | Some("udp") => Protocol::Udp,
            Some("tcp") => Protocol::Tcp,
            Some(other) => {
                return Err(EngineError::Config(format!("fwd: unknown protocol {other:?}")))
            }
        };

        let framing = match str_param(params, "framing")?.as_deref() {
            None | Some("octet-stuffing") => Framing::OctetStuffing,
            Some("octet-counting") => Framing::OctetCounting,
            Some(other) => {
                return Err(EngineError::Config(format!("fwd: unknown framing {other:?}")))
            }
        };

        let compression_level = int_param(params, "compression-level")?.unwrap_or(0);
        if compression_level > 9 {
            return Err(EngineError::Config(format!(
                "fwd: compression-level {compression_level} out of range 0..9"
            )));
        }

        let retry = RetryPolicy {
            initial: Duration::from_millis(int_param(params, "retry-initial-ms")?.unwrap_or(2000)),
            max: Duration::from_millis(int_param(params, "retry-max-ms")?.unwrap_or(30_000)),
            jitter_pct: 20,
            max_retries: int_param(params, "retry-max")?.unwrap_or(30) as u32,
        };

        Ok(Self {
            target,
            port: int_param(params, "port")?.unwrap_or(514) as u16,
            protocol,
            framing,
            compression_level: compression_level as u32,
            min_compress_size: sm_wire::MIN_COMPRESS_SIZE,
            max_line: 2048,
            timeout: Duration::from_millis(int_param(params, "timeout-ms")?.unwrap_or(10_000)),
            retry,
        })
    }
}

fn str_param(params: &ModuleParams, key: &str) -> Result<Option<String>, EngineError> {
    match params.get(key) {
        None => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(EngineError::Config(format!("fwd: {key} must be a string, got {other}"))),
    }
}

fn int_param(params: &ModuleParams, key: &str) -> Result<Option<u64>, EngineError> {
    match params.get(key) {
        None => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| EngineError::Config(format!("fwd: {key} must be a non-negative integer"))),
        Some(serde_json::Value::String(s)) => s
            .parse::<u64>()
            .map(Some)
            .map_err(|_| EngineError::Config(format!("fwd: {key} must be an integer, got {s:?}"))),
        Some(other) => {
            Err(EngineError::Config(format!("fwd: {key} must be an integer, got {other}")))
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
