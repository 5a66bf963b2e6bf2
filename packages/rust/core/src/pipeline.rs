//! End-to-end answer pipeline: expand → coalesce → overlay → weight → score.
//!
//! Every stage is gated on the previous one: the first stage that fails or
//! returns an unusable answer ends the run with a [`StageFailure`]. There are
//! no retries and no partial results.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use aragorn_services::{ServiceClient, clients};
use aragorn_shared::{AragornError, JsonMap, MergeStrategy, Message, PipelineConfig, Result};

use crate::snapshot::{NoSnapshots, SnapshotSink};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One step of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Expand,
    Merge,
    Annotate,
    Weight,
    Score,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expand => "expand",
            Self::Merge => "merge",
            Self::Annotate => "annotate",
            Self::Weight => "weight",
            Self::Score => "score",
        }
    }

    /// Human-readable upstream name used in failure messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Expand => "Strider",
            Self::Merge => "Answer coalesce",
            Self::Annotate => "aragorn-ranker/omnicorp_overlay",
            Self::Weight => "aragorn-ranker/weight_correctness",
            Self::Score => "aragorn-ranker/score",
        }
    }

    /// Service name the stage calls.
    pub fn service(&self) -> &'static str {
        match self {
            Self::Expand => clients::STRIDER,
            Self::Merge => clients::COALESCE,
            Self::Annotate => clients::OMNICORP,
            Self::Weight => clients::WEIGHT,
            Self::Score => clients::SCORE,
        }
    }

    /// Fixed snapshot name for the stage's answer. Expansion isn't snapshotted.
    pub fn snapshot_name(&self) -> Option<&'static str> {
        match self {
            Self::Expand => None,
            Self::Merge => Some("coalesce_answer"),
            Self::Annotate => Some("omni_answer"),
            Self::Weight => Some("weighted_answer"),
            Self::Score => Some("scored_answer"),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// The stage that ended a run, and why.
#[derive(Debug, thiserror::Error)]
#[error("Error detected getting answer from {}, aborting.", .stage.label())]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub cause: AragornError,
}

/// A completed run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Per-invocation id carried on every log line of the run.
    pub correlation_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// The scoring service's response, exactly as received.
    pub scored: JsonMap,
    /// Stages that ran, in order. `Merge` is absent when skipped.
    pub stages: Vec<Stage>,
    pub elapsed: Duration,
}

/// Mapping form of a run: the scored answer, or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PipelineResult {
    Scored(JsonMap),
    Failed { error: String },
}

impl PipelineResult {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn into_json(self) -> Value {
        match self {
            Self::Scored(map) => Value::Object(map),
            Self::Failed { error } => serde_json::json!({ "error": error }),
        }
    }
}

impl From<std::result::Result<PipelineRun, StageFailure>> for PipelineResult {
    fn from(outcome: std::result::Result<PipelineRun, StageFailure>) -> Self {
        match outcome {
            Ok(run) => Self::Scored(run.scored),
            Err(failure) => Self::Failed {
                error: failure.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a stage's service is contacted.
    fn stage_started(&self, stage: Stage);
    /// Called once a stage's answer passed its gate.
    fn stage_finished(&self, stage: Stage);
    /// Called for a stage that doesn't run (merge with strategy `none`).
    fn stage_skipped(&self, stage: Stage);
    /// Called when the pipeline completes successfully.
    fn done(&self, run: &PipelineRun);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _stage: Stage) {}
    fn stage_finished(&self, _stage: Stage) {}
    fn stage_skipped(&self, _stage: Stage) {}
    fn done(&self, _run: &PipelineRun) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The configured service chain. Holds no per-run state.
pub struct Pipeline {
    client: ServiceClient,
    config: PipelineConfig,
}

impl Pipeline {
    /// Build the pipeline and its HTTP client.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let client = ServiceClient::new(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    /// Run the pipeline without snapshots or progress, returning the mapping form.
    pub async fn entry(&self, message: &Message, strategy: &MergeStrategy) -> PipelineResult {
        self.run(message, strategy, &NoSnapshots, &SilentProgress)
            .await
            .into()
    }

    /// Run every stage in order, stopping at the first failure.
    pub async fn run(
        &self,
        message: &Message,
        strategy: &MergeStrategy,
        snapshots: &dyn SnapshotSink,
        progress: &dyn ProgressReporter,
    ) -> std::result::Result<PipelineRun, StageFailure> {
        let correlation_id = Uuid::now_v7();
        let span = info_span!("pipeline", %correlation_id, %strategy);

        self.run_stages(correlation_id, message, strategy, snapshots, progress)
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        correlation_id: Uuid,
        message: &Message,
        strategy: &MergeStrategy,
        snapshots: &dyn SnapshotSink,
        progress: &dyn ProgressReporter,
    ) -> std::result::Result<PipelineRun, StageFailure> {
        let start = Instant::now();
        let started_at = Utc::now();
        let endpoints = &self.config.endpoints;
        let mut stages = Vec::with_capacity(5);

        info!("starting pipeline");
        debug!(%correlation_id, message = %to_json_string(message), "aragorn post");

        let expanded = self
            .gated(
                Stage::Expand,
                correlation_id,
                clients::expand(&self.client, &self.config.expansion, message),
                snapshots,
                progress,
            )
            .await?;
        stages.push(Stage::Expand);

        let merged = match strategy {
            MergeStrategy::None => {
                debug!(%correlation_id, "merge strategy is none, using expansion answer");
                progress.stage_skipped(Stage::Merge);
                expanded
            }
            MergeStrategy::Coalesce(kind) => {
                let answer = self
                    .gated(
                        Stage::Merge,
                        correlation_id,
                        clients::coalesce(&self.client, endpoints, kind, &expanded),
                        snapshots,
                        progress,
                    )
                    .await?;
                stages.push(Stage::Merge);
                answer
            }
        };

        let overlaid = self
            .gated(
                Stage::Annotate,
                correlation_id,
                clients::overlay(&self.client, endpoints, &merged),
                snapshots,
                progress,
            )
            .await?;
        stages.push(Stage::Annotate);

        let weighted = self
            .gated(
                Stage::Weight,
                correlation_id,
                clients::weight(&self.client, endpoints, &overlaid),
                snapshots,
                progress,
            )
            .await?;
        stages.push(Stage::Weight);

        let scored = self
            .gated(
                Stage::Score,
                correlation_id,
                clients::score(&self.client, endpoints, &weighted),
                snapshots,
                progress,
            )
            .await?;
        stages.push(Stage::Score);

        let run = PipelineRun {
            correlation_id,
            started_at,
            scored,
            stages,
            elapsed: start.elapsed(),
        };

        progress.done(&run);

        info!(
            stages = run.stages.len(),
            elapsed_ms = run.elapsed.as_millis(),
            "pipeline complete"
        );

        Ok(run)
    }

    /// Await one stage's call, apply its gate, and snapshot the answer.
    async fn gated<F>(
        &self,
        stage: Stage,
        correlation_id: Uuid,
        call: F,
        snapshots: &dyn SnapshotSink,
        progress: &dyn ProgressReporter,
    ) -> std::result::Result<JsonMap, StageFailure>
    where
        F: Future<Output = Result<JsonMap>>,
    {
        progress.stage_started(stage);

        let answer = match call.await.and_then(|answer| check_answer(stage, answer)) {
            Ok(answer) => answer,
            Err(cause) => {
                let failure = StageFailure { stage, cause };
                error!(%stage, cause = %failure.cause, "{failure}");
                return Err(failure);
            }
        };

        debug!(
            %correlation_id,
            %stage,
            answer = %to_json_string(&answer),
            "{} answer",
            stage.service()
        );

        if let Some(name) = stage.snapshot_name() {
            if let Err(e) = snapshots.write(name, &answer) {
                warn!(%stage, snapshot = name, error = %e, "failed to write snapshot");
            }
        }

        progress.stage_finished(stage);
        Ok(answer)
    }
}

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------

/// Expansion needs real answers; every other stage just needs a non-empty object.
fn check_answer(stage: Stage, answer: JsonMap) -> Result<JsonMap> {
    match stage {
        Stage::Expand if !has_answers(&answer) => {
            error!("error response from Strider, no answer returned");
            Err(AragornError::NoAnswer {
                service: stage.service().to_string(),
            })
        }
        _ if answer.is_empty() => Err(AragornError::EmptyResponse {
            service: stage.service().to_string(),
        }),
        _ => Ok(answer),
    }
}

/// True when `message.results` holds at least one result with non-empty node bindings.
///
/// Bindings may be a list (older TRAPI) or a map keyed by query node id.
pub fn has_answers(answer: &JsonMap) -> bool {
    answer
        .get("message")
        .and_then(|message| message.get("results"))
        .and_then(Value::as_array)
        .is_some_and(|results| {
            results
                .iter()
                .any(|result| result.get("node_bindings").is_some_and(is_non_empty))
        })
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => false,
    }
}

fn to_json_string<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}
