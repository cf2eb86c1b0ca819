//! Stage graph and runner
//!
//! A [`Stage`] is either a leaf action or a composite of other stages:
//!
//! - `Sequence`: strict order. Step N+1 starts only after step N finished,
//!   and a failure stops the sequence before the next step.
//! - `Group`: every member starts without waiting for the others. The group
//!   finishes when all members finished and reports every failure, not just
//!   the first. Members are never cancelled because a sibling failed.
//!
//! Ordering intent is declared by choosing the combinator, so dependencies
//! between stages are exactly the sequence edges.

use dlp_common::{DlpError, Result};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// How a leaf action finished when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    /// Required state was already in place; no work was done
    Skipped,
}

/// Unit of work run by a leaf stage
///
/// Implemented for any `Fn() -> impl Future<Output = Result<Completion>>`,
/// so leaves are usually declared with a closure.
pub trait Action: Send + Sync {
    fn run(&self) -> BoxFuture<'_, Result<Completion>>;
}

impl<F, Fut> Action for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Completion>> + Send + 'static,
{
    fn run(&self) -> BoxFuture<'_, Result<Completion>> {
        (self)().boxed()
    }
}

/// A failed leaf stage and why it failed
#[derive(Debug)]
pub struct StageFailure {
    pub stage: String,
    pub error: DlpError,
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage '{}' failed: {}", self.stage, self.error)
    }
}

/// Result of running a stage
#[derive(Debug)]
pub enum Outcome {
    Skipped,
    Succeeded,
    /// One entry per failed leaf, in the order they were collected
    Failed(Vec<StageFailure>),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn failures(&self) -> &[StageFailure] {
        match self {
            Outcome::Failed(failures) => failures,
            _ => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Skipped => "skipped",
            Outcome::Succeeded => "succeeded",
            Outcome::Failed(_) => "failed",
        }
    }
}

/// Node of the stage graph
pub enum Stage {
    Leaf {
        name: String,
        action: Arc<dyn Action>,
    },
    Sequence {
        name: String,
        steps: Vec<Stage>,
    },
    Group {
        name: String,
        steps: Vec<Stage>,
    },
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Leaf { name, .. } => f.debug_tuple("Leaf").field(name).finish(),
            Stage::Sequence { name, steps } => {
                f.debug_struct("Sequence").field("name", name).field("steps", steps).finish()
            },
            Stage::Group { name, steps } => {
                f.debug_struct("Group").field("name", name).field("steps", steps).finish()
            },
        }
    }
}

impl Stage {
    pub fn leaf(name: impl Into<String>, action: impl Action + 'static) -> Self {
        Stage::Leaf {
            name: name.into(),
            action: Arc::new(action),
        }
    }

    pub fn sequence(name: impl Into<String>, steps: Vec<Stage>) -> Self {
        Stage::Sequence {
            name: name.into(),
            steps,
        }
    }

    pub fn group(name: impl Into<String>, steps: Vec<Stage>) -> Self {
        Stage::Group {
            name: name.into(),
            steps,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Stage::Leaf { name, .. } | Stage::Sequence { name, .. } | Stage::Group { name, .. } => {
                name
            },
        }
    }

    /// Run this stage and everything below it
    pub fn run(&self) -> BoxFuture<'_, Outcome> {
        let span = info_span!("stage", name = %self.name());

        async move {
            match self {
                Stage::Leaf { name, action } => run_leaf(name, action.as_ref()).await,
                Stage::Sequence { steps, .. } => run_sequence(steps).await,
                Stage::Group { steps, .. } => run_group(steps).await,
            }
        }
        .instrument(span)
        .boxed()
    }
}

async fn run_leaf(name: &str, action: &dyn Action) -> Outcome {
    debug!(stage = name, "Starting");

    match action.run().await {
        Ok(Completion::Succeeded) => {
            info!(stage = name, "Finished");
            Outcome::Succeeded
        },
        Ok(Completion::Skipped) => {
            info!(stage = name, "Skipped, nothing to do");
            Outcome::Skipped
        },
        Err(error) => {
            error!(stage = name, kind = error.kind(), error = %error, "Failed");
            Outcome::Failed(vec![StageFailure {
                stage: name.to_string(),
                error,
            }])
        },
    }
}

/// Run `stages` one after another, stopping at the first failure
pub async fn run_sequence(stages: &[Stage]) -> Outcome {
    let mut completed = Vec::with_capacity(stages.len());

    for (idx, stage) in stages.iter().enumerate() {
        let outcome = stage.run().await;
        if outcome.is_failure() {
            let not_started: Vec<&str> = stages[idx + 1..].iter().map(Stage::name).collect();
            if !not_started.is_empty() {
                warn!(failed = stage.name(), ?not_started, "Sequence aborted");
            }
            return outcome;
        }
        completed.push(outcome);
    }

    combine(completed)
}

/// Run `stages` concurrently and wait for all of them
pub async fn run_group(stages: &[Stage]) -> Outcome {
    let outcomes = join_all(stages.iter().map(Stage::run)).await;
    combine(outcomes)
}

/// Failed if anything failed (all failures kept), skipped if everything
/// skipped, succeeded otherwise. An empty composite succeeds.
fn combine(outcomes: Vec<Outcome>) -> Outcome {
    let total = outcomes.len();
    let mut skipped = 0;
    let mut failures = Vec::new();

    for outcome in outcomes {
        match outcome {
            Outcome::Skipped => skipped += 1,
            Outcome::Succeeded => {},
            Outcome::Failed(mut f) => failures.append(&mut f),
        }
    }

    if !failures.is_empty() {
        Outcome::Failed(failures)
    } else if total > 0 && skipped == total {
        Outcome::Skipped
    } else {
        Outcome::Succeeded
    }
}
