// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The TCP sending session.
//!
//! Connection state is `{NotConnected, Connecting, Ready}` behind a
//! mutex, because the state is inspected concurrently with the connect
//! task that advances it. While the handshake is in flight one frame is
//! held in a single-slot buffer; anything beyond that is dropped and
//! counted. A send error closes the socket, the session falls back to
//! `NotConnected`, and the caller sees `Suspend`.

use parking_lot::Mutex;
use sm_engine::{DoResult, ResumeResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkState {
    NotConnected,
    Connecting,
    Ready,
}

struct LinkInner {
    state: LinkState,
    stream: Option<TcpStream>,
    /// one frame held while the handshake completes
    saved: Option<Vec<u8>>,
    dropped_connecting: u64,
}

pub(crate) struct TcpSession {
    target: String,
    port: u16,
    timeout: Duration,
    link: Arc<Mutex<LinkInner>>,
}

impl TcpSession {
    pub(crate) fn new(target: String, port: u16, timeout: Duration) -> Self {
        Self {
            target,
            port,
            timeout,
            link: Arc::new(Mutex::new(LinkInner {
                state: LinkState::NotConnected,
                stream: None,
                saved: None,
                dropped_connecting: 0,
            })),
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> LinkState {
        self.link.lock().state
    }

    /// Send one framed record.
    pub(crate) async fn send(&mut self, frame: Vec<u8>) -> DoResult {
        // decide under the lock; all awaits happen outside it
        enum Plan {
            Write { stream: TcpStream, saved: Option<Vec<u8>> },
            StartConnect,
            Held,
        }

        let plan = {
            let mut link = self.link.lock();
            match link.state {
                LinkState::Ready => match link.stream.take() {
                    Some(stream) => Plan::Write { stream, saved: link.saved.take() },
                    // a sibling worker holds the stream right now
                    None => {
                        if link.saved.is_none() {
                            link.saved = Some(frame.clone());
                        } else {
                            link.dropped_connecting += 1;
                        }
                        Plan::Held
                    }
                },
                LinkState::NotConnected => {
                    link.state = LinkState::Connecting;
                    link.saved = Some(frame.clone());
                    Plan::StartConnect
                }
                LinkState::Connecting => {
                    if link.saved.is_none() {
                        link.saved = Some(frame.clone());
                    } else {
                        link.dropped_connecting += 1;
                        tracing::debug!(
                            target = %self.target,
                            dropped = link.dropped_connecting,
                            "frame dropped while connecting"
                        );
                    }
                    Plan::Held
                }
            }
        };

        match plan {
            Plan::Held => DoResult::Committed,
            Plan::StartConnect => {
                self.spawn_connect();
                DoResult::Committed
            }
            Plan::Write { mut stream, saved } => {
                let write = async {
                    if let Some(held) = saved {
                        stream.write_all(&held).await?;
                    }
                    stream.write_all(&frame).await
                };
                match tokio::time::timeout(self.timeout, write).await {
                    Ok(Ok(())) => {
                        self.link.lock().stream = Some(stream);
                        DoResult::Committed
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(target = %self.target, error = %e, "tcp send failed");
                        self.close();
                        DoResult::Suspend
                    }
                    Err(_) => {
                        tracing::warn!(target = %self.target, "tcp send timed out");
                        self.close();
                        DoResult::Suspend
                    }
                }
            }
        }
    }

    /// Probe reactivation: connect synchronously (with timeout) and
    /// flush the held frame.
    pub(crate) async fn try_resume(&mut self) -> ResumeResult {
        {
            let link = self.link.lock();
            if link.state == LinkState::Ready {
                return ResumeResult::Ok;
            }
            if link.state == LinkState::Connecting {
                return ResumeResult::Suspend;
            }
        }
        match self.connect().await {
            Ok(()) => ResumeResult::Ok,
            Err(e) => {
                tracing::debug!(target = %self.target, error = %e, "tcp resume probe failed");
                self.link.lock().state = LinkState::NotConnected;
                ResumeResult::Suspend
            }
        }
    }

    async fn connect(&self) -> std::io::Result<()> {
        {
            let mut link = self.link.lock();
            link.state = LinkState::Connecting;
        }
        let connect = TcpStream::connect((self.target.as_str(), self.port));
        let mut stream = match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.link.lock().state = LinkState::NotConnected;
                return Err(e);
            }
            Err(_) => {
                self.link.lock().state = LinkState::NotConnected;
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "connect timed out",
                ));
            }
        };
        let saved = self.link.lock().saved.take();
        if let Some(held) = saved {
            if let Err(e) = stream.write_all(&held).await {
                self.link.lock().state = LinkState::NotConnected;
                return Err(e);
            }
        }
        let mut link = self.link.lock();
        link.stream = Some(stream);
        link.state = LinkState::Ready;
        Ok(())
    }

    fn spawn_connect(&self) {
        let link = Arc::clone(&self.link);
        let target = self.target.clone();
        let port = self.port;
        let timeout = self.timeout;
        tokio::spawn(async move {
            let connect = TcpStream::connect((target.as_str(), port));
            match tokio::time::timeout(timeout, connect).await {
                Ok(Ok(mut stream)) => {
                    let saved = link.lock().saved.take();
                    if let Some(held) = saved {
                        if let Err(e) = stream.write_all(&held).await {
                            tracing::warn!(target = %target, error = %e, "flush after connect failed");
                            link.lock().state = LinkState::NotConnected;
                            return;
                        }
                    }
                    let mut inner = link.lock();
                    inner.stream = Some(stream);
                    inner.state = LinkState::Ready;
                }
                Ok(Err(e)) => {
                    tracing::debug!(target = %target, error = %e, "tcp connect failed");
                    link.lock().state = LinkState::NotConnected;
                }
                Err(_) => {
                    tracing::debug!(target = %target, "tcp connect timed out");
                    link.lock().state = LinkState::NotConnected;
                }
            }
        });
    }

    fn close(&self) {
        let mut link = self.link.lock();
        link.stream = None;
        link.state = LinkState::NotConnected;
    }
}
