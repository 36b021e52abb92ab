//! Channel supervisor

use dashmap::DashMap;
use futures_util::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::calibration::{self, Calibration, CalibrationPoint};
use crate::channel::{
    cancel_pair, CancelHandle, ChannelMonitor, ChannelState, ChannelWorker, StatsSnapshot,
};
use crate::config::{ChannelConfig, ServiceConfig};
use crate::error::{ChannelError, Error, Result};
use crate::supervisor::{ChannelHandle, ChannelId};

/// A worker task in flight
struct Session {
    cancel: CancelHandle,
    task: JoinHandle<ChannelState>,
}

struct ChannelEntry {
    config: ChannelConfig,
    monitor: Arc<ChannelMonitor>,
    calibration: watch::Sender<Calibration>,
    session: Option<Session>,
}

/// Owns every channel's lifecycle
pub struct ChannelSupervisor {
    service: ServiceConfig,
    channels: DashMap<ChannelId, ChannelEntry>,
    next_id: AtomicU32,
}

impl ChannelSupervisor {
    pub fn new(service: ServiceConfig) -> Self {
        Self {
            service,
            channels: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    pub fn service(&self) -> &ServiceConfig {
        &self.service
    }

    /// Register a channel without starting it
    pub fn add_channel(&self, config: ChannelConfig) -> ChannelId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (calibration, _) = watch::channel(config.calibration());

        self.channels.insert(
            id,
            ChannelEntry {
                config,
                monitor: Arc::new(ChannelMonitor::new()),
                calibration,
                session: None,
            },
        );
        id
    }

    /// Register every config and start the ones marked `include`.
    ///
    /// Each started channel runs independently; one failing to bind does
    /// not affect the others. Must be called inside a tokio runtime.
    pub fn start_all(&self, configs: &[ChannelConfig]) -> HashMap<ChannelId, ChannelHandle> {
        let mut started = HashMap::new();

        for config in configs {
            let include = config.include;
            let id = self.add_channel(config.clone());
            if !include {
                continue;
            }
            match self.start_channel(id) {
                Ok(handle) => {
                    started.insert(id, handle);
                }
                Err(e) => warn!("Channel {} not started: {}", id, e),
            }
        }

        info!("Started {} of {} channel(s)", started.len(), configs.len());
        started
    }

    /// Start a new logging session for a registered channel
    pub fn start_channel(
        &self,
        id: ChannelId,
    ) -> std::result::Result<ChannelHandle, ChannelError> {
        let mut entry = self
            .channels
            .get_mut(&id)
            .ok_or(ChannelError::NotFound(id))?;

        if let Some(session) = &entry.session {
            if !session.task.is_finished() {
                return Err(ChannelError::AlreadyRunning(id));
            }
        }

        entry.monitor.begin_session();

        // Restarts pick up whatever calibration is current
        let mut config = entry.config.clone();
        let current = *entry.calibration.borrow();
        config.slope = current.slope;
        config.intercept = current.intercept;
        if config.bind_address.is_empty() {
            config.bind_address = self.service.default_bind_address.clone();
        }

        let log_path = self.service.log_path(&config);
        let worker = ChannelWorker::new(
            config.clone(),
            entry.calibration.subscribe(),
            entry.monitor.clone(),
        )
        .with_recv_buffer(self.service.recv_buffer_bytes);

        let (cancel, signal) = cancel_pair();
        let task = tokio::spawn(worker.run(signal, log_path.clone()));
        entry.session = Some(Session { cancel, task });

        info!("Channel {} ({}) starting on port {}", id, config.name, config.port);
        Ok(ChannelHandle::new(id, config, log_path, entry.monitor.clone()))
    }

    /// Cancel one channel and wait for it to finish
    pub async fn stop_channel(
        &self,
        id: ChannelId,
    ) -> std::result::Result<ChannelState, ChannelError> {
        let (session, monitor) = {
            let mut entry = self
                .channels
                .get_mut(&id)
                .ok_or(ChannelError::NotFound(id))?;
            (entry.session.take(), entry.monitor.clone())
        };

        match session {
            Some(session) => {
                let grace = self.service.stop_grace();
                Ok(Self::finish(id, session, monitor, grace).await)
            }
            None => Ok(monitor.state()),
        }
    }

    /// Cancel every running channel and wait until all are terminal.
    ///
    /// Channels that already failed are collected like the rest.
    pub async fn stop_all(&self) -> BTreeMap<ChannelId, ChannelState> {
        let sessions: Vec<(ChannelId, Session, Arc<ChannelMonitor>)> = self
            .channels
            .iter_mut()
            .filter_map(|mut entry| {
                let id = *entry.key();
                let monitor = entry.monitor.clone();
                entry.session.take().map(|session| (id, session, monitor))
            })
            .collect();

        // Signal everyone first so they wind down in parallel
        for (_, session, _) in &sessions {
            session.cancel.cancel();
        }

        let grace = self.service.stop_grace();
        let finished = join_all(
            sessions
                .into_iter()
                .map(|(id, session, monitor)| async move {
                    (id, Self::finish(id, session, monitor, grace).await)
                }),
        )
        .await;

        info!("Stopped {} channel(s)", finished.len());
        finished.into_iter().collect()
    }

    async fn finish(
        id: ChannelId,
        session: Session,
        monitor: Arc<ChannelMonitor>,
        grace: Duration,
    ) -> ChannelState {
        let Session { cancel, mut task } = session;

        monitor.transition(ChannelState::Stopping);
        cancel.cancel();

        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => {
                let state = ChannelState::Failed(format!("worker task ended abnormally: {}", e));
                monitor.transition(state.clone());
                state
            }
            Err(_) => {
                let warning = ChannelError::CancellationTimeout(grace.as_millis() as u64);
                warn!("Channel {}: {}, aborting", id, warning);
                monitor.record_warning(warning.to_string());

                // Aborting drops the task, releasing its socket and sink
                task.abort();
                let _ = task.await;
                monitor.transition(ChannelState::Stopped);
                monitor.state()
            }
        }
    }

    /// Swap a channel's calibration; affects lines written from now on
    pub fn set_calibration(&self, id: ChannelId, slope: f64, intercept: f64) -> Result<()> {
        if !slope.is_finite() || !intercept.is_finite() {
            return Err(Error::Config(format!(
                "non-finite calibration for channel {}",
                id
            )));
        }

        let mut entry = self
            .channels
            .get_mut(&id)
            .ok_or(ChannelError::NotFound(id))?;
        entry.config.slope = slope;
        entry.config.intercept = intercept;
        entry.calibration.send_replace(Calibration::new(slope, intercept));

        info!("Channel {} calibration: slope={}, intercept={}", id, slope, intercept);
        Ok(())
    }

    /// Fit calibration points and install the result.
    ///
    /// A rejected fit leaves the channel's coefficients untouched.
    pub fn calibrate(&self, id: ChannelId, points: &[CalibrationPoint]) -> Result<Calibration> {
        if !self.channels.contains_key(&id) {
            return Err(ChannelError::NotFound(id).into());
        }
        let fitted = calibration::fit(points)?;
        self.set_calibration(id, fitted.slope, fitted.intercept)?;
        Ok(fitted)
    }

    pub fn calibration(&self, id: ChannelId) -> Option<Calibration> {
        self.channels.get(&id).map(|entry| *entry.calibration.borrow())
    }

    pub fn status(&self, id: ChannelId) -> Option<ChannelState> {
        self.channels.get(&id).map(|entry| entry.monitor.state())
    }

    pub fn statuses(&self) -> BTreeMap<ChannelId, ChannelState> {
        self.channels
            .iter()
            .map(|entry| (*entry.key(), entry.monitor.state()))
            .collect()
    }

    pub fn stats(&self, id: ChannelId) -> Option<StatsSnapshot> {
        self.channels
            .get(&id)
            .map(|entry| entry.monitor.stats().snapshot())
    }

    pub fn handle(&self, id: ChannelId) -> Option<ChannelHandle> {
        self.channels.get(&id).map(|entry| {
            ChannelHandle::new(
                id,
                entry.config.clone(),
                self.service.log_path(&entry.config),
                entry.monitor.clone(),
            )
        })
    }

    pub fn handles(&self) -> Vec<ChannelHandle> {
        let mut ids: Vec<ChannelId> = self.channels.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids.into_iter().filter_map(|id| self.handle(id)).collect()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Drop for ChannelSupervisor {
    fn drop(&mut self) {
        for entry in self.channels.iter() {
            if let Some(session) = &entry.session {
                session.cancel.cancel();
            }
        }
    }
}
