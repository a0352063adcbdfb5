// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sm-fwd: the forwarding output module.
//!
//! Sends rendered records to a remote syslog receiver over UDP or TCP.
//! Payloads are truncated to the line limit, optionally compressed into
//! the `z` envelope (which forces octet-counting framing), then framed
//! and shipped. All transport failures surface as `Suspend`; only an
//! oversized datagram is discarded.

mod config;
mod tcp;
mod udp;

pub use config::{FwdConfig, Protocol};

use async_trait::async_trait;
use sm_engine::{
    DoResult, EngineError, ModuleFactory, ModuleInstance, ModuleParams, ModuleWorker, ParamDescr,
    RenderMode, Rendered, ResumeResult,
};
use sm_wire::Framing;
use std::sync::Arc;
use tcp::TcpSession;
use udp::UdpSender;

/// Module entry point; register under the name `fwd`.
#[derive(Default)]
pub struct FwdFactory;

impl FwdFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleFactory for FwdFactory {
    fn name(&self) -> &'static str {
        "fwd"
    }

    fn params(&self) -> &'static [ParamDescr] {
        &config::PARAMS
    }

    fn instantiate(&self, params: &ModuleParams) -> Result<Arc<dyn ModuleInstance>, EngineError> {
        let cfg = FwdConfig::from_params(params)?;
        Ok(Arc::new(FwdInstance { cfg }))
    }
}

struct FwdInstance {
    cfg: FwdConfig,
}

impl ModuleInstance for FwdInstance {
    fn render_mode(&self) -> RenderMode {
        RenderMode::AsBytes
    }

    fn retry_hint(&self) -> Option<sm_engine::RetryPolicy> {
        Some(self.cfg.retry.clone())
    }

    fn spawn_worker(&self) -> Box<dyn ModuleWorker> {
        Box::new(FwdWorker::new(self.cfg.clone()))
    }
}

enum Sender {
    Udp(UdpSender),
    Tcp(TcpSession),
}

struct FwdWorker {
    cfg: FwdConfig,
    sender: Sender,
}

impl FwdWorker {
    fn new(cfg: FwdConfig) -> Self {
        let sender = match cfg.protocol {
            Protocol::Udp => Sender::Udp(UdpSender::new(cfg.target.clone(), cfg.port)),
            Protocol::Tcp => {
                Sender::Tcp(TcpSession::new(cfg.target.clone(), cfg.port, cfg.timeout))
            }
        };
        Self { cfg, sender }
    }
}

/// Truncate, optionally compress, and select the effective framing.
/// Compressed payloads always go octet-counted, whatever the session
/// framing says.
fn prepare(cfg: &FwdConfig, payload: &[u8]) -> (Vec<u8>, Framing) {
    let payload = &payload[..payload.len().min(cfg.max_line)];
    match sm_wire::compress_payload(payload, cfg.compression_level, cfg.min_compress_size) {
        Some(compressed) => (compressed, Framing::OctetCounting),
        None => (payload.to_vec(), cfg.framing),
    }
}

#[async_trait]
impl ModuleWorker for FwdWorker {
    async fn do_action(&mut self, msg: Rendered) -> DoResult {
        let Rendered::Bytes(payload) = msg else {
            tracing::warn!("fwd expects rendered bytes, discarding");
            return DoResult::Discard;
        };
        let (payload, framing) = prepare(&self.cfg, &payload);
        match &mut self.sender {
            Sender::Udp(udp) => udp.send(&payload).await,
            Sender::Tcp(tcp) => tcp.send(sm_wire::encode_frame(&payload, framing)).await,
        }
    }

    async fn try_resume(&mut self) -> ResumeResult {
        match &mut self.sender {
            Sender::Udp(udp) => udp.try_resume().await,
            Sender::Tcp(tcp) => tcp.try_resume().await,
        }
    }
}

#[cfg(test)]
#[path = "fwd_tests.rs"]
mod tests;
