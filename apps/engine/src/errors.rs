use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::conversation::SessionError;
use crate::plan::PlanError;
use crate::provider::ChainError;

/// Umbrella error for callers that drive the whole engine through one
/// result type. Individual modules keep their own narrower errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Provider(#[from] ChainError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}
