//! An optional external coordination service client (spec.md 6): a ZooKeeper-shaped trait for
//! watching group membership out of band. Never a hard dependency of correctness — a
//! `GroupedConsumer` configured with no coordinator hosts simply never calls it, and group
//! membership still converges through the broker-side `JoinGroup`/`SyncGroup`/`Heartbeat` cycle
//! alone (spec.md 4.F).

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("connecting to the coordinator service timed out")]
    ConnectTimeout,

    #[error("node {0} does not exist")]
    NoNode(String),

    #[error("node {0} already exists")]
    NodeExists(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The operations a membership-watch accelerant needs: create znode-like paths (ephemeral or
/// persistent), read/write their data, and list/watch children.
#[async_trait]
pub trait CoordinatorService: std::fmt::Debug + Send + Sync {
    async fn create_ephemeral(&self, path: &str, data: &[u8]) -> Result<()>;
    async fn create_persistent(&self, path: &str, data: &[u8]) -> Result<()>;
    async fn get_children(&self, path: &str) -> Result<Vec<String>>;
    async fn get_data(&self, path: &str) -> Result<Vec<u8>>;
    async fn set_data(&self, path: &str, data: &[u8]) -> Result<()>;
    /// Blocks until `path` is created, deleted, or its data changes, then returns.
    async fn exists_watch(&self, path: &str) -> Result<bool>;
}

#[derive(Debug, Clone, Copy)]
#[repr(u8)]
enum Op {
    CreateEphemeral = 1,
    CreatePersistent = 2,
    GetChildren = 3,
    GetData = 4,
    SetData = 5,
    ExistsWatch = 6,
}

fn write_frame(op: Op, path: &str, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(op as u8);
    buf.extend_from_slice(&(path.len() as u32).to_be_bytes());
    buf.extend_from_slice(path.as_bytes());
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
    let mut framed = (buf.len() as u32).to_be_bytes().to_vec();
    framed.extend_from_slice(&buf);
    framed
}

/// A minimal TCP client for the wire protocol above, talking to a single coordination-service
/// host. Built from scratch: no crate in the surrounding stack depends on a real ZooKeeper
/// client, so this follows the same length-prefixed framing idiom the broker protocol uses
/// rather than pulling in an unrelated ecosystem crate.
#[derive(Debug)]
pub struct TcpCoordinatorService {
    addr: String,
    connect_timeout: Duration,
}

impl TcpCoordinatorService {
    pub fn new(addr: String) -> Self {
        Self { addr, connect_timeout: Duration::from_secs(10) }
    }

    async fn connect(&self) -> Result<TcpStream> {
        tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| Error::ConnectTimeout)?
            .map_err(Error::IO)
    }

    async fn call(&self, op: Op, path: &str, data: &[u8]) -> Result<Vec<u8>> {
        let mut socket = self.connect().await?;
        socket.write_all(&write_frame(op, path, data)).await?;

        let mut status = [0u8; 1];
        socket.read_exact(&mut status).await?;

        let mut len_buf = [0u8; 4];
        socket.read_exact(&mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut payload = vec![0u8; len];
        socket.read_exact(&mut payload).await?;

        match status[0] {
            0 => Ok(payload),
            1 => Err(Error::NoNode(path.to_string())),
            2 => Err(Error::NodeExists(path.to_string())),
            code => Err(Error::IO(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("coordinator service returned unknown status {code}"),
            ))),
        }
    }
}

#[async_trait]
impl CoordinatorService for TcpCoordinatorService {
    async fn create_ephemeral(&self, path: &str, data: &[u8]) -> Result<()> {
        self.call(Op::CreateEphemeral, path, data).await.map(|_| ())
    }

    async fn create_persistent(&self, path: &str, data: &[u8]) -> Result<()> {
        self.call(Op::CreatePersistent, path, data).await.map(|_| ())
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>> {
        let payload = self.call(Op::GetChildren, path, &[]).await?;
        let mut cursor = std::io::Cursor::new(payload);
        let mut count_buf = [0u8; 4];
        std::io::Read::read_exact(&mut cursor, &mut count_buf)?;
        let count = u32::from_be_bytes(count_buf);

        let mut children = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut len_buf = [0u8; 4];
            std::io::Read::read_exact(&mut cursor, &mut len_buf)?;
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut name = vec![0u8; len];
            std::io::Read::read_exact(&mut cursor, &mut name)?;
            children.push(String::from_utf8_lossy(&name).into_owned());
        }
        Ok(children)
    }

    async fn get_data(&self, path: &str) -> Result<Vec<u8>> {
        self.call(Op::GetData, path, &[]).await
    }

    async fn set_data(&self, path: &str, data: &[u8]) -> Result<()> {
        self.call(Op::SetData, path, data).await.map(|_| ())
    }

    async fn exists_watch(&self, path: &str) -> Result<bool> {
        let payload = self.call(Op::ExistsWatch, path, &[]).await?;
        Ok(payload.first().copied().unwrap_or(0) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_carries_op_path_and_data() {
        let frame = write_frame(Op::GetData, "/groups/g1", b"payload");
        // u32 total length + 1 op byte + u32 path length + path + u32 data length + data
        assert_eq!(frame.len(), 4 + 1 + 4 + 10 + 4 + 7);
        assert_eq!(frame[4], Op::GetData as u8);
    }
}
