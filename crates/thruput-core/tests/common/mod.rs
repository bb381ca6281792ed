//! Common test utilities for `Thruput` integration tests.
//!
//! Tests drive a real [`TransferClient`](thruput_core::transfer::TransferClient)
//! against a scripted server bound to an ephemeral loopback port.

#![allow(dead_code)]

use std::future::Future;
use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use thruput_core::connection::Endpoint;

/// Create a temporary directory for test files.
///
/// The directory will be automatically cleaned up when the returned
/// `TempDir` is dropped.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create a test file with the given content.
pub fn create_test_file(dir: &std::path::Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Generate random bytes for testing.
pub fn random_bytes(size: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Serve exactly one connection with `script`.
///
/// Returns the endpoint to dial and the handle of the server task.
pub async fn serve_once<F, Fut, T>(script: F) -> (Endpoint, JoinHandle<T>)
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let port = listener.local_addr().expect("local addr").port();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Failed to accept");
        script(stream).await
    });

    (Endpoint::new("127.0.0.1", port), handle)
}

/// A port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("local addr").port()
}

/// Read exactly `len` bytes and return them as text.
pub async fn read_text<R: AsyncRead + Unpin>(reader: &mut R, len: usize) -> String {
    let mut buffer = vec![0u8; len];
    reader
        .read_exact(&mut buffer)
        .await
        .expect("Failed to read message");
    String::from_utf8(buffer).expect("message is not UTF-8")
}

/// Read everything until the peer closes.
pub async fn read_all<R: AsyncRead + Unpin>(reader: &mut R) -> Vec<u8> {
    let mut buffer = Vec::new();
    reader
        .read_to_end(&mut buffer)
        .await
        .expect("Failed to read payload");
    buffer
}
