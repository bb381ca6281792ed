//! Dummy transfers: synthetic bytes used to time the link.

use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::{Session, SessionState, TransferResult};
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::protocol::{self, ChunkPlan};

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Receive `plan.total` bytes and discard them.
    pub(crate) async fn receive_dummy(
        &mut self,
        plan: ChunkPlan,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<TransferResult> {
        protocol::write_text(&mut self.stream, &plan.chunk_size.to_string()).await?;
        self.set_state(SessionState::Transferring);
        tracing::debug!("Receiving {} bytes in {} chunks", plan.total, plan.chunk_count());

        let started = Instant::now();
        let mut buffer = vec![0u8; plan.chunk_size];
        let mut received = 0u64;

        for _ in 0..plan.full_chunks {
            protocol::read_chunk(&mut self.stream, &mut buffer, received, plan.total).await?;
            received += plan.chunk_size as u64;
            reporter.report(plan.percent(received));
        }

        if plan.remainder > 0 {
            protocol::read_chunk(
                &mut self.stream,
                &mut buffer[..plan.remainder],
                received,
                plan.total,
            )
            .await?;
            reporter.report(100.0);
        }

        Ok(TransferResult::completed(plan.total, started.elapsed()))
    }

    /// Send `plan.total` zero bytes once the server confirms.
    pub(crate) async fn send_dummy(
        &mut self,
        plan: ChunkPlan,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<TransferResult> {
        protocol::write_text(&mut self.stream, &plan.chunk_size.to_string()).await?;
        protocol::read_ready(&mut self.stream).await?;
        self.set_state(SessionState::Transferring);
        tracing::debug!("Sending {} bytes in {} chunks", plan.total, plan.chunk_count());

        let started = Instant::now();
        let buffer = vec![0u8; plan.chunk_size];
        let mut sent = 0u64;

        while sent < plan.total {
            #[allow(clippy::cast_possible_truncation)]
            let len = (plan.total - sent).min(plan.chunk_size as u64) as usize;
            self.stream.write_all(&buffer[..len]).await?;
            sent += len as u64;
            reporter.report(plan.percent(sent));
        }
        self.stream.flush().await?;

        Ok(TransferResult::completed(sent, started.elapsed()))
    }
}
