use crate::config::Config;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use vibescan_core::badges::{self, Badge};
use vibescan_core::entitlement::is_premium_or_free;
use vibescan_core::history::HistoryEntry;
use vibescan_core::quota::{self, ModeError};
use vibescan_core::store;
use vibescan_core::{
    complete_scan, Entitlement, FaceDetector, FrameError, FrameSource, KeyValueStore, Mode, PollOutcome,
    ScanError, ScanReport, Session, SessionError,
};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error(transparent)]
    Mode(#[from] ModeError),
    #[error("daily limit reached: {0} free scans per day")]
    DailyLimitReached(u32),
    #[error("scan cancelled")]
    Cancelled,
    #[error("frame stream ended before the scan completed")]
    StreamEnded,
    #[error("frame source error: {0}")]
    Frame(#[from] FrameError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Persisted state, as shown by `vibescan status`.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub scan_count: u64,
    pub daily_count: u32,
    pub premium: bool,
    pub badges: Vec<Badge>,
    pub history: Vec<HistoryEntry>,
}

/// Messages sent from handles to the engine thread.
enum EngineRequest {
    Scan {
        mode: Mode,
        epoch: u64,
        reply: oneshot::Sender<Result<ScanReport, EngineError>>,
    },
    Summary {
        reply: oneshot::Sender<Summary>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    cancel_epoch: Arc<AtomicU64>,
}

impl EngineHandle {
    /// Run one scan to completion: search, accumulate a window, score, record.
    pub async fn scan(&self, mode: Mode) -> Result<ScanReport, EngineError> {
        let epoch = self.cancel_epoch.load(Ordering::SeqCst);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Scan {
                mode,
                epoch,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    pub async fn summary(&self) -> Result<Summary, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Summary { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Cancel every scan submitted so far. Takes effect on the next frame.
    pub fn cancel(&self) {
        self.cancel_epoch.fetch_add(1, Ordering::SeqCst);
    }
}

/// Resources owned by the engine thread.
struct Engine<D, F, S, E> {
    detector: D,
    frames: F,
    store: S,
    entitlement: E,
    rng: StdRng,
    window_frames: usize,
    free_daily_scans: u32,
    cancel_epoch: Arc<AtomicU64>,
}

/// Spawn the engine on a dedicated OS thread.
///
/// The detector, frame source and store are moved onto the thread; every
/// detector call and every store write happens there.
pub fn spawn_engine<D, F, S, E>(
    config: &Config,
    detector: D,
    frames: F,
    store: S,
    entitlement: E,
) -> Result<EngineHandle, EngineError>
where
    D: FaceDetector + Send + 'static,
    F: FrameSource + Send + 'static,
    S: KeyValueStore + Send + 'static,
    E: Entitlement + Send + 'static,
{
    if !detector.is_ready() {
        tracing::warn!("detector not ready at startup; scans will fail until it loads");
    }

    let cancel_epoch = Arc::new(AtomicU64::new(0));
    let mut engine = Engine {
        detector,
        frames,
        store,
        entitlement,
        rng: StdRng::from_entropy(),
        window_frames: config.window_frames,
        free_daily_scans: config.free_daily_scans,
        cancel_epoch: Arc::clone(&cancel_epoch),
    };

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(config.request_queue.max(1));

    std::thread::Builder::new()
        .name("vibescan-engine".into())
        .spawn(move || {
            tracing::info!(window = engine.window_frames, "engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Scan { mode, epoch, reply } => {
                        let result = engine.run_scan(mode, epoch);
                        if let Err(e) = &result {
                            tracing::info!(mode = %mode, error = %e, "scan ended without a result");
                        }
                        let _ = reply.send(result);
                    }
                    EngineRequest::Summary { reply } => {
                        let _ = reply.send(engine.summary());
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx, cancel_epoch })
}

impl<D, F, S, E> Engine<D, F, S, E>
where
    D: FaceDetector,
    F: FrameSource,
    S: KeyValueStore,
    E: Entitlement,
{
    fn cancelled(&self, epoch: u64) -> bool {
        self.cancel_epoch.load(Ordering::SeqCst) != epoch
    }

    fn run_scan(&mut self, requested: Mode, epoch: u64) -> Result<ScanReport, EngineError> {
        let premium = is_premium_or_free(&self.entitlement);
        let mode = quota::select_mode(requested, premium)?;
        if !quota::can_scan_today(&mut self.store, premium, Utc::now().date_naive(), self.free_daily_scans) {
            return Err(EngineError::DailyLimitReached(self.free_daily_scans));
        }

        let mut session = Session::with_window(mode, self.window_frames);
        session.start(&self.detector)?;

        loop {
            if self.cancelled(epoch) {
                session.cancel();
                return Err(EngineError::Cancelled);
            }

            let Some(frame) = self.frames.next_frame()? else {
                session.cancel();
                return Err(EngineError::StreamEnded);
            };

            let detections = match self.detector.detect(&frame) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(sequence = frame.sequence, error = %e, "detection failed; skipping frame");
                    continue;
                }
            };

            match session.poll(&detections, frame.size())? {
                PollOutcome::Complete(window) => {
                    match complete_scan(
                        &window,
                        mode,
                        &mut self.store,
                        &self.entitlement,
                        &mut self.rng,
                        Utc::now(),
                    ) {
                        Ok(report) => return Ok(report),
                        Err(ScanError::NoScorableFace) => {
                            tracing::warn!(mode = %mode, "no scorable face in window; searching again");
                            session.restart_search();
                        }
                    }
                }
                outcome => {
                    tracing::trace!(sequence = frame.sequence, ?outcome, hud = %session.hud_status().text());
                }
            }
        }
    }

    fn summary(&self) -> Summary {
        Summary {
            scan_count: store::scan_count(&self.store),
            daily_count: quota::daily_count(&self.store),
            premium: is_premium_or_free(&self.entitlement),
            badges: store::unlocked_badges(&self.store)
                .iter()
                .filter_map(|id| badges::find(id).copied())
                .collect(),
            history: store::history(&self.store),
        }
    }
}
