//! WriterDestination - adapts any `AsyncWrite` (stdio, sockets, pipes)

use async_trait::async_trait;
use contracts::Destination;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stderr, Stdout};

/// Destination backed by an async writer.
///
/// Each payload is written in full and flushed before the write returns.
pub struct WriterDestination<W> {
    name: String,
    writer: W,
}

impl<W> WriterDestination<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap `writer` under the given name
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
        }
    }

    /// Borrow the wrapped writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterDestination<Stdout> {
    /// Destination writing to the process's standard output
    pub fn stdout() -> Self {
        Self::new("stdout", tokio::io::stdout())
    }
}

impl WriterDestination<Stderr> {
    /// Destination writing to the process's standard error
    pub fn stderr() -> Self {
        Self::new("stderr", tokio::io::stderr())
    }
}

#[async_trait]
impl<W> Destination for WriterDestination<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write_all(buf).await?;
        self.writer.flush().await?;
        Ok(buf.len())
    }
}
