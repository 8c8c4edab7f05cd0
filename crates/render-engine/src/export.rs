//! Export state machine and the render backend seam.
//!
//! A [`HighlightExporter`] runs exactly once:
//!
//! ```text
//! Idle ─► Configuring ─► Exporting ─┬─► Completed
//!              │                    ├─► Failed
//!              └──────► Failed      └─► Cancelled
//! ```
//!
//! The backend writes to a staging file beside the destination. Only a
//! finished render is renamed into place, so the destination never holds a
//! partial file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

use reelcut_common::config::ExportProfile;
use reelcut_common::error::{ErrorKind, ReelcutError, ReelcutResult};
use reelcut_highlight_model::MediaTime;

use crate::compositor::Composition;
use crate::orientation::RenderTarget;
use crate::overlay::OverlayPlan;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle of one export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    Idle,
    Configuring,
    Exporting,
    Completed,
    Failed,
    Cancelled,
}

impl ExportState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExportState::Completed | ExportState::Failed | ExportState::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExportState::Idle => "idle",
            ExportState::Configuring => "configuring",
            ExportState::Exporting => "exporting",
            ExportState::Completed => "completed",
            ExportState::Failed => "failed",
            ExportState::Cancelled => "cancelled",
        }
    }
}

/// Shared flag that asks a running export to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
        }
    }
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send + Sync>;

/// Export progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

impl ExportProgress {
    pub fn at_stage(stage: ExportStage, total_frames: u64) -> Self {
        let done = matches!(stage, ExportStage::Complete);
        Self {
            progress: if done { 1.0 } else { 0.0 },
            frames_rendered: if done { total_frames } else { 0 },
            total_frames,
            eta_secs: 0.0,
            stage,
        }
    }
}

/// Stages reported through the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Everything a backend needs to render one highlight video.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Source media file.
    pub source: PathBuf,

    pub composition: Composition,
    pub render_target: RenderTarget,
    pub overlays: OverlayPlan,
    pub profile: ExportProfile,

    /// Where the caller wants the result.
    pub destination: PathBuf,

    /// Where the backend must write. Renamed to `destination` on success.
    pub staging_path: PathBuf,
}

impl ExportJob {
    /// Frames the encoder is expected to emit.
    pub fn total_frames(&self) -> u64 {
        self.composition
            .duration
            .round_to_frames(self.render_target.frame_rate)
            .unwrap_or(0)
    }
}

/// Trait for render backends.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Render `job` into `job.staging_path`.
    ///
    /// The future may be dropped at any await point when the export is
    /// cancelled; implementations must not leave work running after that.
    async fn render(
        &self,
        job: &ExportJob,
        progress: Option<&ProgressCallback>,
    ) -> ReelcutResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Terminal result of an export. Produced exactly once per exporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportOutcome {
    Success {
        output: PathBuf,
        duration: MediaTime,
        segment_count: usize,
    },
    Failure {
        kind: ErrorKind,
        reason: String,
        partial_artifact_cleaned: bool,
    },
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Success { .. })
    }

    /// Failure kind, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ExportOutcome::Success { .. } => None,
            ExportOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    fn failure(err: &ReelcutError, partial_artifact_cleaned: bool) -> Self {
        ExportOutcome::Failure {
            kind: err.kind(),
            reason: err.to_string(),
            partial_artifact_cleaned,
        }
    }
}

/// Drives one export through its states.
pub struct HighlightExporter {
    backend: Box<dyn RenderBackend>,
    profile: ExportProfile,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
    state: watch::Sender<ExportState>,
}

impl HighlightExporter {
    pub fn new(backend: Box<dyn RenderBackend>, profile: ExportProfile) -> Self {
        let (state, _) = watch::channel(ExportState::Idle);
        Self {
            backend,
            profile,
            cancel: CancelToken::new(),
            progress: None,
            state,
        }
    }

    /// Use an externally owned cancel token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> ExportState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ExportState> {
        self.state.subscribe()
    }

    /// Render `composition` with its overlays and write the result to
    /// `destination`.
    ///
    /// Never returns an error directly; every failure becomes
    /// [`ExportOutcome::Failure`].
    pub async fn export(
        &self,
        source: &Path,
        composition: &Composition,
        render_target: &RenderTarget,
        overlays: &OverlayPlan,
        destination: impl Into<PathBuf>,
    ) -> ExportOutcome {
        let destination = destination.into();

        // Claim the exporter in one step so concurrent callers cannot both
        // see it idle.
        let mut seen = ExportState::Idle;
        let claimed = self.state.send_if_modified(|state| {
            seen = *state;
            if *state == ExportState::Idle {
                *state = ExportState::Configuring;
                true
            } else {
                false
            }
        });
        if !claimed {
            let err = ReelcutError::config(format!(
                "exporter already ran (state: {}); create a new one per export",
                seen.as_str()
            ));
            tracing::warn!(error = %err, "Rejected export on a used exporter");
            return ExportOutcome::failure(&err, false);
        }
        tracing::debug!(
            from = ExportState::Idle.as_str(),
            to = ExportState::Configuring.as_str(),
            "Export state changed"
        );
        let job = match self
            .configure(source, composition, render_target, overlays, &destination)
            .await
        {
            Ok(job) => job,
            Err(err) => {
                tracing::error!(error = %err, kind = %err.kind(), "Export configuration failed");
                self.report(ExportProgress::at_stage(ExportStage::Failed, 0));
                self.transition(ExportState::Failed);
                return ExportOutcome::failure(&err, true);
            }
        };

        let total_frames = job.total_frames();
        self.report(ExportProgress::at_stage(ExportStage::Preparing, total_frames));
        self.transition(ExportState::Exporting);

        let started = std::time::Instant::now();
        tracing::info!(
            backend = self.backend.name(),
            destination = %job.destination.display(),
            staging = %job.staging_path.display(),
            segments = job.composition.segment_count(),
            duration_secs = job.composition.duration.as_secs_f64(),
            "Starting export"
        );

        let rendered = if self.cancel.is_cancelled() {
            Err(ReelcutError::Cancelled)
        } else {
            tokio::select! {
                result = self.backend.render(&job, self.progress.as_ref()) => result,
                _ = self.cancel.cancelled() => Err(ReelcutError::Cancelled),
            }
        };

        let finished = match rendered {
            Ok(()) => self.finalize(&job).await,
            Err(err) => Err(err),
        };

        match finished {
            Ok(()) => {
                tracing::info!(
                    output = %job.destination.display(),
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Export finished"
                );
                self.report(ExportProgress::at_stage(ExportStage::Complete, total_frames));
                self.transition(ExportState::Completed);
                ExportOutcome::Success {
                    output: job.destination.clone(),
                    duration: job.composition.duration,
                    segment_count: job.composition.segment_count(),
                }
            }
            Err(err) => {
                let cleaned = remove_staging(&job.staging_path).await;
                let terminal = if matches!(err, ReelcutError::Cancelled) {
                    tracing::info!(staging_cleaned = cleaned, "Export cancelled");
                    ExportState::Cancelled
                } else {
                    tracing::error!(
                        error = %err,
                        kind = %err.kind(),
                        staging_cleaned = cleaned,
                        "Export failed"
                    );
                    ExportState::Failed
                };
                self.report(ExportProgress::at_stage(ExportStage::Failed, total_frames));
                self.transition(terminal);
                ExportOutcome::failure(&err, cleaned)
            }
        }
    }

    async fn configure(
        &self,
        source: &Path,
        composition: &Composition,
        render_target: &RenderTarget,
        overlays: &OverlayPlan,
        destination: &Path,
    ) -> ReelcutResult<ExportJob> {
        if composition.is_empty() {
            return Err(ReelcutError::config(
                "Nothing to export: the highlight list produced an empty composition",
            ));
        }
        if render_target.width == 0 || render_target.height == 0 {
            return Err(ReelcutError::config(format!(
                "Render target {}x{} has no area",
                render_target.width, render_target.height
            )));
        }
        if destination.file_name().is_none() {
            return Err(ReelcutError::config(format!(
                "Destination {} does not name a file",
                destination.display()
            )));
        }
        if !self.backend.is_available() {
            return Err(ReelcutError::config(format!(
                "Render backend '{}' is not available on this system",
                self.backend.name()
            )));
        }

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        Ok(ExportJob {
            source: source.to_path_buf(),
            composition: composition.clone(),
            render_target: *render_target,
            overlays: overlays.clone(),
            profile: self.profile.clone(),
            destination: destination.to_path_buf(),
            staging_path: staging_path_for(destination),
        })
    }

    async fn finalize(&self, job: &ExportJob) -> ReelcutResult<()> {
        self.report(ExportProgress::at_stage(
            ExportStage::Finalizing,
            job.total_frames(),
        ));

        let metadata = tokio::fs::metadata(&job.staging_path).await.map_err(|e| {
            ReelcutError::export(format!(
                "backend '{}' reported success but wrote no output: {e}",
                self.backend.name()
            ))
        })?;
        if !metadata.is_file() {
            return Err(ReelcutError::export(format!(
                "backend '{}' left something other than a file at {}",
                self.backend.name(),
                job.staging_path.display()
            )));
        }
        if metadata.len() == 0 {
            return Err(ReelcutError::export(format!(
                "backend '{}' wrote an empty file",
                self.backend.name()
            )));
        }

        tokio::fs::rename(&job.staging_path, &job.destination)
            .await
            .map_err(|e| {
                ReelcutError::export(format!(
                    "Failed to move {} into place: {e}",
                    job.destination.display()
                ))
            })
    }

    fn transition(&self, next: ExportState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = previous.as_str(), to = next.as_str(), "Export state changed");
    }

    fn report(&self, progress: ExportProgress) {
        if let Some(cb) = &self.progress {
            cb(progress);
        }
    }
}

/// Hidden file in the destination directory, unique per call.
pub fn staging_path_for(destination: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "highlight".to_string());
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

    destination.with_file_name(format!(
        ".{name}.{pid}-{nanos:08x}-{seq}.partial",
        pid = std::process::id()
    ))
}

/// Remove the staging file. Returns whether nothing is left behind.
async fn remove_staging(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "Failed to remove staging file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_path_is_hidden_sibling() {
        let dest = Path::new("/videos/out/final.mp4");
        let staging = staging_path_for(dest);
        assert_eq!(staging.parent(), dest.parent());
        let name = staging.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".final.mp4."));
        assert!(name.ends_with(".partial"));
        assert_ne!(staging_path_for(dest), staging);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ExportState::Idle.is_terminal());
        assert!(!ExportState::Exporting.is_terminal());
        assert!(ExportState::Completed.is_terminal());
        assert!(ExportState::Cancelled.is_terminal());
    }

    #[tokio::test]
    async fn test_cancel_token_resolves() {
        let token = CancelToken::new();
        let remote = token.clone();
        tokio::spawn(async move { remote.cancel() });
        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = ExportOutcome::Failure {
            kind: ErrorKind::ConfigurationError,
            reason: "empty".to_string(),
            partial_artifact_cleaned: true,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["kind"], "configuration_error");
    }
}
