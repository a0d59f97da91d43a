//! The raw byte stream to a single broker.
//!
//! SSL/SASL and SOCKS5 proxying are explicit non-goals; this keeps the teacher's
//! `AsyncRead`/`AsyncWrite`-wrapping enum shape (a useful seam for tests that want to swap in an
//! in-memory duplex stream) but the only variant it ever constructs is a plain `TcpStream`.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Connecting to broker timed out")]
    ConnectTimeout,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Transport {
    Plain { inner: TcpStream },
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Plain { inner } => Pin::new(inner).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Self::Plain { inner } => Pin::new(inner).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Plain { inner } => Pin::new(inner).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Plain { inner } => Pin::new(inner).poll_shutdown(cx),
        }
    }
}

impl Transport {
    pub async fn connect(broker: &str, timeout: Option<Duration>) -> Result<Self> {
        let inner = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(broker))
                .await
                .map_err(|_| Error::ConnectTimeout)??,
            None => TcpStream::connect(broker).await?,
        };
        inner.set_nodelay(true).ok();
        Ok(Self::Plain { inner })
    }
}
