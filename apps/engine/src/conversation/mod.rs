//! Conversation Session: follow-up Q&A anchored to a completed gap analysis.
//!
//! State machine: Ready -> Awaiting (one turn in flight) -> Ready. A second
//! `ask` while Awaiting is rejected synchronously, never queued. `cancel`
//! stops the in-flight provider call between chunks and keeps exactly the
//! partial text the user had already seen as a terminal assistant turn.
//!
//! The session exclusively owns its turn history: a bounded ring that
//! evicts oldest-first once the budget is exceeded. The state lock is never
//! held across an await.

pub mod prompts;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::GapAnalysis;
use crate::provider::{CancelToken, ChainError, CompletionRequest, ProviderChain};

use prompts::{build_chat_prompt, CHAT_SYSTEM};

/// Default bound on retained turns.
pub const DEFAULT_HISTORY_BUDGET: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TurnRole {
    User,
    Assistant,
}

/// One entry in a session's ordered, append-only turn history.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    fn now(role: TurnRole, content: String) -> Self {
        Self {
            role,
            content,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    Awaiting,
}

/// How an accepted `ask` ended.
#[derive(Debug)]
pub enum AskOutcome {
    /// Full answer delivered and appended to history.
    Answered(String),
    /// The caller cancelled mid-stream; carries the partial text that was
    /// preserved as the terminal assistant turn.
    Cancelled(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// A turn is already in flight; the new question was rejected, not
    /// queued, and history is untouched.
    #[error("a question is already awaiting an answer")]
    TurnInFlight,

    /// Every provider failed. Distinct from cancellation so the caller can
    /// render a different state.
    #[error("assistant unavailable: {0}")]
    Provider(String),
}

struct Inner {
    state: SessionState,
    turns: VecDeque<ConversationTurn>,
    in_flight: Option<CancelToken>,
}

pub struct ConversationSession {
    id: Uuid,
    analysis: GapAnalysis,
    job_title: String,
    chain: Arc<ProviderChain>,
    history_budget: usize,
    inner: Mutex<Inner>,
}

impl ConversationSession {
    /// Starts a session anchored to a completed analysis. The analysis is
    /// retained read-only as context; no turns are seeded.
    pub fn start(analysis: GapAnalysis, job_title: impl Into<String>, chain: Arc<ProviderChain>) -> Self {
        Self::with_history_budget(analysis, job_title, chain, DEFAULT_HISTORY_BUDGET)
    }

    pub fn with_history_budget(
        analysis: GapAnalysis,
        job_title: impl Into<String>,
        chain: Arc<ProviderChain>,
        history_budget: usize,
    ) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, "conversation session started");
        Self {
            id,
            analysis,
            job_title: job_title.into(),
            chain,
            history_budget: history_budget.max(1),
            inner: Mutex::new(Inner {
                state: SessionState::Ready,
                turns: VecDeque::new(),
                in_flight: None,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().unwrap().state
    }

    /// Snapshot of the retained turn history, oldest first.
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.inner.lock().unwrap().turns.iter().cloned().collect()
    }

    pub fn analysis(&self) -> &GapAnalysis {
        &self.analysis
    }

    /// Asks a follow-up question. Rejects synchronously with `TurnInFlight`
    /// if a previous ask is still awaiting its answer.
    pub async fn ask(&self, question: &str) -> Result<AskOutcome, SessionError> {
        let (cancel, prompt) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == SessionState::Awaiting {
                return Err(SessionError::TurnInFlight);
            }
            inner.state = SessionState::Awaiting;
            let cancel = CancelToken::new();
            inner.in_flight = Some(cancel.clone());
            let recent: Vec<ConversationTurn> = inner.turns.iter().cloned().collect();
            let prompt = build_chat_prompt(&self.analysis, &self.job_title, &recent, question);
            (cancel, prompt)
        };

        let request = CompletionRequest::new(prompt, CHAT_SYSTEM);
        let result = self.chain.run(&request, &cancel).await;

        let mut inner = self.inner.lock().unwrap();
        inner.in_flight = None;
        inner.state = SessionState::Ready;

        match result {
            Ok(outcome) => {
                push_trimmed(&mut inner, self.history_budget, TurnRole::User, question.to_string());
                push_trimmed(
                    &mut inner,
                    self.history_budget,
                    TurnRole::Assistant,
                    outcome.text.clone(),
                );
                debug!(session = %self.id, turns = inner.turns.len(), "turn completed");
                Ok(AskOutcome::Answered(outcome.text))
            }
            Err(ChainError::Cancelled { partial, .. }) => {
                // Keep exactly what the user had already seen, as a
                // terminal, non-resumable turn.
                push_trimmed(&mut inner, self.history_budget, TurnRole::User, question.to_string());
                push_trimmed(
                    &mut inner,
                    self.history_budget,
                    TurnRole::Assistant,
                    partial.clone(),
                );
                info!(session = %self.id, "turn cancelled, partial answer retained");
                Ok(AskOutcome::Cancelled(partial))
            }
            Err(err @ ChainError::AllProvidersFailed { .. }) => {
                debug!(session = %self.id, "turn failed, history unchanged");
                Err(SessionError::Provider(err.to_string()))
            }
        }
    }

    /// Signals the in-flight turn to stop. Meaningful only while Awaiting;
    /// returns whether a turn was actually signalled. Takes effect without
    /// waiting for the provider call to finish.
    pub fn cancel(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        match (&inner.state, &inner.in_flight) {
            (SessionState::Awaiting, Some(token)) => {
                token.cancel();
                true
            }
            _ => false,
        }
    }
}

fn push_trimmed(inner: &mut Inner, budget: usize, role: TurnRole, content: String) {
    inner.turns.push_back(ConversationTurn::now(role, content));
    while inner.turns.len() > budget {
        inner.turns.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisSource, GapAnalysis};
    use crate::provider::testing::{ScriptedProvider, SlowStreamingProvider};
    use crate::provider::{ProviderError, RetryPolicy};
    use std::time::Duration;

    fn analysis() -> GapAnalysis {
        GapAnalysis {
            matching_skills: vec![],
            missing_skills: vec![],
            skills_to_advance: vec![],
            overall_score: Some(60),
            level: None,
            strengths: vec![],
            summary: "Decent fit.".to_string(),
            source: AnalysisSource::DeterministicFallback,
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            backoff_base: Duration::from_millis(1),
        }
    }

    fn session_with(script: Vec<Result<String, ProviderError>>) -> ConversationSession {
        let chain = Arc::new(ProviderChain::new(
            vec![Arc::new(ScriptedProvider::new("stub", script))],
            fast_retry(),
        ));
        ConversationSession::start(analysis(), "Backend Engineer", chain)
    }

    #[tokio::test]
    async fn test_ask_appends_user_and_assistant_turns() {
        let session = session_with(vec![Ok("Learn Docker first.".to_string())]);
        let outcome = session.ask("Where should I start?").await.unwrap();

        assert!(matches!(outcome, AskOutcome::Answered(ref a) if a == "Learn Docker first."));
        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[1].role, TurnRole::Assistant);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_history_unchanged() {
        let session = session_with(vec![Err(ProviderError::ServerError("503".into()))]);
        let err = session.ask("Hello?").await.unwrap_err();

        assert!(matches!(err, SessionError::Provider(_)));
        assert!(session.turns().is_empty());
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_ask_rejected_without_history_corruption() {
        let chain = Arc::new(ProviderChain::new(
            vec![Arc::new(SlowStreamingProvider::new(
                "slow",
                vec!["part one ", "part two"],
                Duration::from_millis(50),
            ))],
            fast_retry(),
        ));
        let session = Arc::new(ConversationSession::start(
            analysis(),
            "Backend Engineer",
            chain,
        ));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.ask("first question").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = session.ask("second question").await;
        assert!(matches!(second, Err(SessionError::TurnInFlight)));

        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, AskOutcome::Answered(ref a) if a == "part one part two"));

        // exactly one question made it into history, in order
        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "first question");
    }

    #[tokio::test]
    async fn test_cancel_preserves_partial_and_returns_to_ready() {
        let chain = Arc::new(ProviderChain::new(
            vec![Arc::new(SlowStreamingProvider::new(
                "slow",
                vec!["chunk one ", "chunk two ", "chunk three"],
                Duration::from_millis(40),
            ))],
            fast_retry(),
        ));
        let session = Arc::new(ConversationSession::start(
            analysis(),
            "Backend Engineer",
            chain,
        ));

        let asking = {
            let session = session.clone();
            tokio::spawn(async move { session.ask("long question").await })
        };
        // let the first chunk land, then stop generating
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(session.cancel());

        let outcome = asking.await.unwrap().unwrap();
        let partial = match outcome {
            AskOutcome::Cancelled(partial) => partial,
            other => panic!("expected cancellation, got {other:?}"),
        };
        assert_eq!(partial, "chunk one ");

        let turns = session.turns();
        assert_eq!(turns.last().unwrap().content, partial);
        assert_eq!(session.state(), SessionState::Ready);

        // the session accepts a new ask afterwards
        let followup = session.ask("follow-up").await.unwrap();
        assert!(matches!(followup, AskOutcome::Answered(_)));
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_a_no_op() {
        let session = session_with(vec![]);
        assert!(!session.cancel());
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_history_trims_oldest_first() {
        let script: Vec<Result<String, ProviderError>> =
            (0..4).map(|i| Ok(format!("answer {i}"))).collect();
        let chain = Arc::new(ProviderChain::new(
            vec![Arc::new(ScriptedProvider::new("stub", script))],
            fast_retry(),
        ));
        let session =
            ConversationSession::with_history_budget(analysis(), "Backend Engineer", chain, 3);

        for i in 0..4 {
            session.ask(&format!("question {i}")).await.unwrap();
        }

        let turns = session.turns();
        assert_eq!(turns.len(), 3, "budget bounds the ring");
        // the newest turns survive
        assert_eq!(turns[2].content, "answer 3");
        assert_eq!(turns[1].content, "question 3");
        assert_eq!(turns[0].content, "answer 2");
    }
}
