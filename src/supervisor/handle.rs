//! Read-only view of a supervised channel

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::channel::{ChannelMonitor, ChannelState, StatsSnapshot};
use crate::config::ChannelConfig;
use crate::supervisor::ChannelId;

/// Cheap to clone; display surfaces hold one per channel
#[derive(Clone)]
pub struct ChannelHandle {
    id: ChannelId,
    config: ChannelConfig,
    log_path: PathBuf,
    monitor: Arc<ChannelMonitor>,
}

impl ChannelHandle {
    pub(crate) fn new(
        id: ChannelId,
        config: ChannelConfig,
        log_path: PathBuf,
        monitor: Arc<ChannelMonitor>,
    ) -> Self {
        Self {
            id,
            config,
            log_path,
            monitor,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn state(&self) -> ChannelState {
        self.monitor.state()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.monitor.stats().snapshot()
    }

    /// Address the worker actually bound, once it is running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.monitor.local_addr()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.monitor.warnings()
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("port", &self.config.port)
            .field("state", &self.state())
            .finish()
    }
}
