// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UDP fan-out.
//!
//! The target resolves once and the addresses are cached; each send
//! fans out across all of them and succeeds when at least one datagram
//! leaves complete. A resolve failure suspends the action; the resume
//! probe re-resolves.

use sm_engine::{DoResult, ResumeResult};
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Largest payload that fits a UDP datagram.
pub(crate) const MAX_DGRAM: usize = 65_507;

pub(crate) struct UdpSender {
    target: String,
    port: u16,
    socket: Option<UdpSocket>,
    addrs: Option<Vec<SocketAddr>>,
    oversize_dropped: u64,
}

impl UdpSender {
    pub(crate) fn new(target: String, port: u16) -> Self {
        Self { target, port, socket: None, addrs: None, oversize_dropped: 0 }
    }

    async fn ensure_ready(&mut self) -> std::io::Result<()> {
        if self.socket.is_none() {
            self.socket = Some(UdpSocket::bind(("0.0.0.0", 0)).await?);
        }
        if self.addrs.is_none() {
            let addrs: Vec<SocketAddr> =
                tokio::net::lookup_host((self.target.as_str(), self.port)).await?.collect();
            if addrs.is_empty() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no addresses resolved",
                ));
            }
            self.addrs = Some(addrs);
        }
        Ok(())
    }

    pub(crate) async fn send(&mut self, payload: &[u8]) -> DoResult {
        if payload.len() > MAX_DGRAM {
            self.oversize_dropped += 1;
            tracing::warn!(
                target = %self.target,
                len = payload.len(),
                dropped = self.oversize_dropped,
                "payload exceeds a datagram, discarding"
            );
            return DoResult::Discard;
        }
        if let Err(e) = self.ensure_ready().await {
            tracing::warn!(target = %self.target, error = %e, "udp resolve failed");
            return DoResult::Suspend;
        }
        let (Some(socket), Some(addrs)) = (&self.socket, &self.addrs) else {
            return DoResult::Suspend;
        };

        let mut sent = false;
        for addr in addrs {
            match socket.send_to(payload, addr).await {
                Ok(n) if n == payload.len() => sent = true,
                Ok(n) => {
                    tracing::debug!(%addr, sent = n, want = payload.len(), "short udp send");
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "udp send failed");
                }
            }
        }
        if sent {
            DoResult::Committed
        } else {
            // force a fresh resolve on resume
            self.addrs = None;
            DoResult::Suspend
        }
    }

    pub(crate) async fn try_resume(&mut self) -> ResumeResult {
        self.addrs = None;
        match self.ensure_ready().await {
            Ok(()) => ResumeResult::Ok,
            Err(_) => ResumeResult::Suspend,
        }
    }
}
