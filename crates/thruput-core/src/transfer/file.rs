//! File transfers.

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{FileSource, Session, SessionState, TransferResult};
use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::protocol::{self, ChunkPlan};

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Receive the file offered by the server and store it in `dir`.
    ///
    /// The destination file exists before the ready signal is sent.
    pub(crate) async fn receive_file(
        &mut self,
        chunk_size: usize,
        dir: &Path,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<TransferResult> {
        protocol::write_text(&mut self.stream, &chunk_size.to_string()).await?;

        let header = protocol::read_file_header(&mut self.stream).await?;
        let path = destination(dir, &header.name)?;
        tracing::info!("Receiving {} ({} bytes)", header.name, header.size);

        tokio::fs::create_dir_all(dir).await?;
        let mut file = File::create(&path).await?;

        protocol::write_ready(&mut self.stream).await?;
        self.set_state(SessionState::Transferring);

        let started = Instant::now();
        let plan = ChunkPlan::new(header.size, chunk_size)?;
        tracing::debug!("Expecting {} chunks", plan.chunk_count());
        let mut buffer = vec![0u8; chunk_size];
        let mut received = 0u64;

        for _ in 0..plan.full_chunks {
            protocol::read_chunk(&mut self.stream, &mut buffer, received, plan.total).await?;
            file.write_all(&buffer).await?;
            received += chunk_size as u64;
            reporter.report(plan.percent(received));
        }

        if plan.remainder > 0 {
            let tail = &mut buffer[..plan.remainder];
            protocol::read_chunk(&mut self.stream, tail, received, plan.total).await?;
            file.write_all(tail).await?;
            reporter.report(100.0);
        }

        file.flush().await?;
        file.sync_all().await?;

        Ok(TransferResult {
            path: Some(path),
            file_name: Some(header.name),
            ..TransferResult::completed(plan.total, started.elapsed())
        })
    }

    /// Announce `name` and stream `source` to the server.
    ///
    /// Progress is reported against `total`; an empty file reports nothing.
    pub(crate) async fn send_file(
        &mut self,
        chunk_size: usize,
        name: &str,
        total: u64,
        mut source: FileSource,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<TransferResult> {
        let announcement = protocol::upload_announcement(chunk_size, name);
        protocol::write_text(&mut self.stream, &announcement).await?;
        protocol::read_ready(&mut self.stream).await?;
        self.set_state(SessionState::Transferring);
        tracing::info!("Sending {} ({} bytes)", name, total);

        let started = Instant::now();
        let mut buffer = vec![0u8; chunk_size];
        let mut sent = 0u64;

        loop {
            let n = source.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            self.stream.write_all(&buffer[..n]).await?;
            sent += n as u64;
            if total > 0 {
                reporter.report(protocol::percent(sent, total));
            }
        }
        self.stream.flush().await?;

        if sent != total {
            tracing::warn!("Sent {} bytes, {} were announced", sent, total);
        }

        Ok(TransferResult::completed(sent, started.elapsed()))
    }
}

/// Resolve where a received file is written.
///
/// The name must be a single plain path component.
fn destination(dir: &Path, name: &str) -> Result<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(dir.join(part)),
        _ => Err(Error::InvalidHeader(format!("unsafe file name '{name}'"))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempfile::TempDir;
    use tokio::io::duplex;

    use super::*;

    #[test]
    fn test_destination() {
        let dir = Path::new("/tmp/out");
        assert_eq!(
            destination(dir, "data.bin").unwrap(),
            PathBuf::from("/tmp/out/data.bin")
        );

        for bad in ["../x", "/etc/passwd", "a/b", "..", ".", "dir/"] {
            assert!(
                matches!(destination(dir, bad), Err(Error::InvalidHeader(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    #[allow(clippy::float_cmp)]
    async fn test_receive_file() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("nested");
        let (client, mut server) = duplex(1024);

        let peer = tokio::spawn(async move {
            let mut chunk_size = [0u8; 1];
            server.read_exact(&mut chunk_size).await.unwrap();
            assert_eq!(&chunk_size, b"4");
            server.write_all(b"data.bin;10").await.unwrap();

            let mut ready = [0u8; 1];
            server.read_exact(&mut ready).await.unwrap();
            assert_eq!(ready[0], 1);
            server.write_all(b"0123456789").await.unwrap();
        });

        let seen = Mutex::new(Vec::new());
        let observer = |p: f64| seen.lock().unwrap().push(p);
        let mut reporter = ProgressReporter::new(Some(&observer));

        let mut session = Session::new(client);
        let result = session
            .receive_file(4, &out, &mut reporter)
            .await
            .unwrap();
        peer.await.unwrap();

        let path = out.join("data.bin");
        assert_eq!(result.path.as_deref(), Some(path.as_path()));
        assert_eq!(result.file_name.as_deref(), Some("data.bin"));
        assert_eq!(std::fs::read(&path).unwrap(), b"0123456789");
        assert_eq!(*seen.lock().unwrap(), vec![40.0, 80.0, 100.0]);
    }

    #[tokio::test]
    async fn test_receive_file_truncated() {
        let temp_dir = TempDir::new().unwrap();
        let (client, mut server) = duplex(1024);

        let peer = tokio::spawn(async move {
            let mut chunk_size = [0u8; 2];
            server.read_exact(&mut chunk_size).await.unwrap();
            server.write_all(b"short.bin;100").await.unwrap();

            let mut ready = [0u8; 1];
            server.read_exact(&mut ready).await.unwrap();
            server.write_all(&[5u8; 30]).await.unwrap();
        });

        let mut reporter = ProgressReporter::new(None);
        let mut session = Session::new(client);
        let err = session
            .receive_file(16, temp_dir.path(), &mut reporter)
            .await
            .unwrap_err();
        peer.await.unwrap();

        assert!(matches!(
            err,
            Error::Truncated {
                expected: 100,
                received: 30
            }
        ));
    }

    #[tokio::test]
    async fn test_receive_file_rejects_unsafe_name() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");
        let (client, mut server) = duplex(1024);

        let peer = tokio::spawn(async move {
            let mut chunk_size = [0u8; 1];
            server.read_exact(&mut chunk_size).await.unwrap();
            server.write_all(b"../escape.txt;3").await.unwrap();

            let mut rest = Vec::new();
            server.read_to_end(&mut rest).await.unwrap();
            rest
        });

        let mut reporter = ProgressReporter::new(None);
        let mut session = Session::new(client);
        let err = session
            .receive_file(8, &out, &mut reporter)
            .await
            .unwrap_err();
        session.close().await;

        assert!(matches!(err, Error::InvalidHeader(_)));
        assert!(peer.await.unwrap().is_empty(), "no ready signal expected");
        assert!(!temp_dir.path().join("escape.txt").exists());
        assert!(!out.exists());
    }

    #[tokio::test]
    #[allow(clippy::float_cmp)]
    async fn test_send_file() {
        let (client, mut server) = duplex(1024);

        let peer = tokio::spawn(async move {
            let mut announcement = [0u8; 9];
            server.read_exact(&mut announcement).await.unwrap();
            assert_eq!(&announcement, b"4;log.txt");
            server.write_all(&[1]).await.unwrap();

            let mut payload = Vec::new();
            server.read_to_end(&mut payload).await.unwrap();
            payload
        });

        let seen = Mutex::new(Vec::new());
        let observer = |p: f64| seen.lock().unwrap().push(p);
        let mut reporter = ProgressReporter::new(Some(&observer));

        let source: FileSource = Box::new(&b"abcdefghij"[..]);
        let mut session = Session::new(client);
        let result = session
            .send_file(4, "log.txt", 10, source, &mut reporter)
            .await
            .unwrap();
        session.close().await;

        assert_eq!(result.bytes, 10);
        assert_eq!(peer.await.unwrap(), b"abcdefghij");
        assert_eq!(*seen.lock().unwrap(), vec![40.0, 80.0, 100.0]);
    }

    #[tokio::test]
    async fn test_send_empty_file_reports_nothing() {
        let (client, mut server) = duplex(1024);

        let peer = tokio::spawn(async move {
            let mut announcement = [0u8; 11];
            server.read_exact(&mut announcement).await.unwrap();
            assert_eq!(&announcement, b"64;empty.md");
            server.write_all(&[1]).await.unwrap();

            let mut payload = Vec::new();
            server.read_to_end(&mut payload).await.unwrap();
            payload
        });

        let mut reporter = ProgressReporter::new(None);
        let mut session = Session::new(client);
        let result = session
            .send_file(64, "empty.md", 0, Box::new(tokio::io::empty()), &mut reporter)
            .await
            .unwrap();
        session.close().await;

        assert_eq!(result.bytes, 0);
        assert!(peer.await.unwrap().is_empty());
        assert_eq!(reporter.updates(), 0);
    }

    #[tokio::test]
    async fn test_send_file_server_not_ready() {
        let (client, mut server) = duplex(1024);

        let peer = tokio::spawn(async move {
            let mut announcement = [0u8; 7];
            server.read_exact(&mut announcement).await.unwrap();
            drop(server);
        });

        let mut reporter = ProgressReporter::new(None);
        let mut session = Session::new(client);
        let err = session
            .send_file(8, "a.bin", 3, Box::new(&b"xyz"[..]), &mut reporter)
            .await
            .unwrap_err();
        peer.await.unwrap();

        assert!(matches!(err, Error::ServerNotReady { received: None }));
    }
}
