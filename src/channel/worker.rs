//! Channel worker
//!
//! Binds the channel's UDP port, writes the log header, then turns every
//! received datagram into log lines until cancelled. All failures end up in
//! the returned [`ChannelState`]; nothing here panics or aborts other
//! channels.

use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn, Instrument};

use crate::calibration::Calibration;
use crate::channel::cancel::CancelSignal;
use crate::channel::monitor::{ChannelMonitor, ChannelStats};
use crate::channel::state::ChannelState;
use crate::channel::timebase::Timebase;
use crate::config::ChannelConfig;
use crate::constants::{DEFAULT_RECV_BUFFER_BYTES, MAX_DATAGRAM_SIZE};
use crate::error::ChannelError;
use crate::logfile::{LogHeader, LogWriter, SinkTarget};
use crate::network::bind_udp;
use crate::protocol::parse_datagram;

/// Parse, normalize, calibrate and write the records of one datagram.
///
/// Holds the per-session timebase; everything else is passed in so the
/// pipeline can be driven without a socket.
#[derive(Debug, Default)]
pub struct DatagramProcessor {
    timebase: Timebase,
}

impl DatagramProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of samples written. Malformed records are counted
    /// and skipped; only a sink failure is an error.
    pub async fn process<W: AsyncWrite + Unpin>(
        &mut self,
        payload: &[u8],
        calibration: Calibration,
        writer: &mut LogWriter<W>,
        stats: &ChannelStats,
    ) -> std::io::Result<usize> {
        let mut written = 0;

        for parsed in parse_datagram(payload) {
            let record = match parsed {
                Ok(record) => record,
                Err(e) => {
                    stats.record_malformed();
                    debug!("Skipping malformed record: {}", e);
                    continue;
                }
            };

            let adjusted = self.timebase.adjust(record.raw_timestamp);
            if adjusted.wrapped {
                stats.record_wrap();
                debug!(
                    "Timestamp wrap at raw {}, continuing from {}",
                    record.raw_timestamp, adjusted.time
                );
            }

            writer
                .append_sample(adjusted.time, calibration.apply(record.raw_value))
                .await?;
            stats.record_sample(adjusted.time);
            written += 1;
        }

        Ok(written)
    }
}

/// Acquisition task for one channel
pub struct ChannelWorker {
    config: ChannelConfig,
    calibration: watch::Receiver<Calibration>,
    monitor: Arc<ChannelMonitor>,
    recv_buffer_bytes: usize,
}

impl ChannelWorker {
    /// `calibration` carries live coefficient updates; its current value
    /// is what the header records.
    pub fn new(
        config: ChannelConfig,
        calibration: watch::Receiver<Calibration>,
        monitor: Arc<ChannelMonitor>,
    ) -> Self {
        Self {
            config,
            calibration,
            monitor,
            recv_buffer_bytes: DEFAULT_RECV_BUFFER_BYTES,
        }
    }

    /// Worker with a fixed calibration taken from its config
    pub fn standalone(config: ChannelConfig, monitor: Arc<ChannelMonitor>) -> Self {
        let (_tx, rx) = watch::channel(config.calibration());
        Self::new(config, rx, monitor)
    }

    pub fn with_recv_buffer(mut self, bytes: usize) -> Self {
        self.recv_buffer_bytes = bytes;
        self
    }

    /// Run until `cancel` fires or the channel fails.
    ///
    /// The terminal state is both returned and published on the monitor.
    pub async fn run<T: SinkTarget>(mut self, cancel: CancelSignal, sink: T) -> ChannelState {
        let span = tracing::info_span!(
            "channel",
            port = self.config.port,
            name = %self.config.name
        );

        async move {
            let final_state = match self.acquire(cancel, sink).await {
                Ok(()) => {
                    info!(
                        "Stopped after {} samples",
                        self.monitor.stats().samples_written()
                    );
                    ChannelState::Stopped
                }
                Err(e) => {
                    error!("Channel failed: {}", e);
                    ChannelState::Failed(e.to_string())
                }
            };
            self.monitor.transition(final_state.clone());
            final_state
        }
        .instrument(span)
        .await
    }

    async fn acquire<T: SinkTarget>(
        &mut self,
        mut cancel: CancelSignal,
        sink: T,
    ) -> Result<(), ChannelError> {
        let socket = bind_udp(
            &self.config.bind_address,
            self.config.port,
            self.recv_buffer_bytes,
        )
        .await?;

        let local_addr = socket.local_addr().ok();
        self.monitor.set_local_addr(local_addr);
        let port = local_addr.map(|a| a.port()).unwrap_or(self.config.port);

        let header = LogHeader::new(sink.describe(), port, *self.calibration.borrow());
        let mut writer = LogWriter::open(sink, &header)
            .await
            .map_err(|e| ChannelError::Sink(e.to_string()))?;

        info!(
            "Logging {} to {}",
            local_addr.map(|a| a.to_string()).unwrap_or_default(),
            header.context
        );
        self.monitor.transition(ChannelState::Running);

        let result = self.receive_loop(&socket, &mut writer, &mut cancel).await;

        // Close the sink whatever happened in the loop
        let closed = writer
            .close()
            .await
            .map_err(|e| ChannelError::Sink(e.to_string()));
        drop(socket);

        result.and(closed)
    }

    async fn receive_loop<W: AsyncWrite + Unpin>(
        &mut self,
        socket: &UdpSocket,
        writer: &mut LogWriter<W>,
        cancel: &mut CancelSignal,
    ) -> Result<(), ChannelError> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut processor = DatagramProcessor::new();
        let stats = self.monitor.stats();

        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = socket.recv_from(&mut buf) => received,
            };

            match received {
                Ok((len, peer)) => {
                    stats.record_datagram();
                    trace!("{} bytes from {}", len, peer);

                    // One coefficient pair per datagram, never a mix
                    let calibration = *self.calibration.borrow_and_update();
                    processor
                        .process(&buf[..len], calibration, writer, stats)
                        .await
                        .map_err(|e| ChannelError::Sink(e.to_string()))?;
                }
                Err(e) => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    // e.g. ICMP port unreachable surfacing on some platforms
                    warn!("Receive error: {}", e);
                }
            }

            if cancel.is_cancelled() {
                break;
            }
        }

        Ok(())
    }
}
