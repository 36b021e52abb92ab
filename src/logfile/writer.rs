//! Streaming log writer
//!
//! The header goes out in one write when the sink is opened; after that
//! every sample is a single `write_all` of one complete line, so a crash
//! can lose at most the line in flight. Writes are async so a slow disk
//! parks only the channel that owns it.

use parking_lot::Mutex;
use std::fmt::Write as _;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::logfile::header::LogHeader;
use crate::logfile::CRLF;

/// Somewhere a channel's log can be opened
pub trait SinkTarget: Send + 'static {
    type Writer: AsyncWrite + Unpin + Send + 'static;

    /// Context line for the header, usually the destination path
    fn describe(&self) -> String;

    /// Open (truncating) the destination
    fn open(self) -> impl Future<Output = io::Result<Self::Writer>> + Send;
}

impl SinkTarget for PathBuf {
    type Writer = File;

    fn describe(&self) -> String {
        self.display().to_string()
    }

    fn open(self) -> impl Future<Output = io::Result<File>> + Send {
        File::create(self)
    }
}

/// In-memory sink, shared so the contents stay readable after the writer closes
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

impl AsyncWrite for MemorySink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.buffer.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl SinkTarget for MemorySink {
    type Writer = MemorySink;

    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn open(self) -> impl Future<Output = io::Result<MemorySink>> + Send {
        async move { Ok(self) }
    }
}

/// Append-only writer for one session's log
pub struct LogWriter<W> {
    inner: Option<W>,
    /// Reused line buffer
    line: String,
}

impl<W: AsyncWrite + Unpin> LogWriter<W> {
    /// Wrap an already-open writer and emit the header
    pub async fn new(mut inner: W, header: &LogHeader) -> io::Result<Self> {
        inner.write_all(header.render().as_bytes()).await?;
        inner.flush().await?;

        Ok(Self {
            inner: Some(inner),
            line: String::with_capacity(32),
        })
    }

    /// Open a sink target and emit the header
    pub async fn open<T>(target: T, header: &LogHeader) -> io::Result<Self>
    where
        T: SinkTarget<Writer = W>,
    {
        Self::new(target.open().await?, header).await
    }

    /// Append one `time<TAB>value` line
    pub async fn append_sample(
        &mut self,
        adjusted_time: i64,
        calibrated_value: f64,
    ) -> io::Result<()> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log writer is closed"))?;

        self.line.clear();
        // Writing into a String cannot fail
        let _ = write!(self.line, "{}\t{:.1}{}", adjusted_time, calibrated_value, CRLF);
        inner.write_all(self.line.as_bytes()).await
    }

    /// Flush and release the underlying handle.
    ///
    /// Safe to call more than once; the handle is dropped even if the
    /// final flush fails.
    pub async fn close(&mut self) -> io::Result<()> {
        match self.inner.take() {
            Some(mut inner) => inner.shutdown().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibration;
    use crate::logfile::DATA_START;

    fn header() -> LogHeader {
        LogHeader::new("test", 6000, Calibration::default())
    }

    /// Accepts the header, then fails every write
    struct FailAfterHeader {
        writes: usize,
    }

    impl AsyncWrite for FailAfterHeader {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.writes += 1;
            if self.writes > 1 {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk full")))
            } else {
                Poll::Ready(Ok(buf.len()))
            }
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_samples_follow_header() {
        let sink = MemorySink::new();
        let mut writer = LogWriter::open(sink.clone(), &header()).await.unwrap();
        writer.append_sample(0, 5.0).await.unwrap();
        writer.append_sample(100, -1.3).await.unwrap();
        writer.close().await.unwrap();

        let text = sink.contents();
        let body = text.split(&format!("{}{}", DATA_START, CRLF)).nth(1).unwrap();
        assert_eq!(body, "0\t5.0\r\n100\t-1.3\r\n");
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let sink = MemorySink::new();
        let mut writer = LogWriter::open(sink.clone(), &header()).await.unwrap();
        for t in 0..10 {
            writer.append_sample(t, 1.0).await.unwrap();
        }
        writer.close().await.unwrap();
        assert_eq!(sink.contents().matches(DATA_START).count(), 1);
        assert_eq!(sink.contents().matches("DM_TestTitle=").count(), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut writer = LogWriter::open(MemorySink::new(), &header()).await.unwrap();
        assert!(writer.close().await.is_ok());
        assert!(writer.close().await.is_ok());
        assert!(writer.append_sample(1, 1.0).await.is_err());
    }

    #[tokio::test]
    async fn test_close_after_write_error() {
        let mut writer = LogWriter::new(FailAfterHeader { writes: 0 }, &header())
            .await
            .unwrap();
        assert!(writer.append_sample(0, 1.0).await.is_err());
        assert!(writer.close().await.is_ok());
        assert!(writer.append_sample(1, 1.0).await.is_err());
    }

    #[tokio::test]
    async fn test_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.txt");
        let mut writer = LogWriter::open(path.clone(), &header()).await.unwrap();
        writer.append_sample(42, 3.5).await.unwrap();
        writer.close().await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("DM_TestTitle=\r\n"));
        assert!(text.ends_with("DM_Start=\r\n42\t3.5\r\n"));
    }

    #[tokio::test]
    async fn test_missing_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("bridge.txt");
        assert!(LogWriter::open(path, &header()).await.is_err());
    }
}
