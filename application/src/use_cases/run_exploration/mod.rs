//! Run Exploration use case
//!
//! Drives one [`Session`] from `Init` to a terminal state:
//!
//! | Step | Action                                                       |
//! |------|--------------------------------------------------------------|
//! | 1    | Cancelled? → `Aborted`                                       |
//! | 2    | Round budget spent? → `MaxRoundsExceeded`                    |
//! | 3    | Request a decision (timeout, corrective retry) or `Aborted`  |
//! | 4    | Final answer → `Completed`                                   |
//! | 5    | Tool calls → execute sequentially, record, next round        |
//!
//! Every terminated session yields a [`Transcript`].

mod types;

pub use types::{ExplorationError, RunExplorationInput};

use types::DecisionFailure;

use crate::config::ExplorationParams;
use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger};
use crate::ports::decision_model::{ChartImage, DecisionContext, DecisionModel, ModelError};
use crate::ports::progress::{ExplorationProgressNotifier, NoExplorationProgress};
use crate::ports::tool_executor::ToolExecutorPort;
use chartscout_domain::core::string::truncate;
use chartscout_domain::{
    ChartState, Decision, RESET_VIEW_TOOL, Session, ToolDescriptor, Transcript, parse_decision,
    require_offered_tools, reset_view_descriptor,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// `session-<unix millis>-<process-wide sequence>`
fn next_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let sequence = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("session-{}-{}", millis, sequence)
}

const CANCELLED_REASON: &str = "cancelled";

/// Use case for exploring one chart with a decision model
pub struct RunExplorationUseCase<
    M: DecisionModel + ?Sized + 'static,
    T: ToolExecutorPort + ?Sized + 'static,
> {
    model: Arc<M>,
    tool_executor: Arc<T>,
    params: ExplorationParams,
    logger: Arc<dyn ConversationLogger>,
    progress: Arc<dyn ExplorationProgressNotifier>,
    cancellation_token: Option<CancellationToken>,
}

impl<M, T> Clone for RunExplorationUseCase<M, T>
where
    M: DecisionModel + ?Sized + 'static,
    T: ToolExecutorPort + ?Sized + 'static,
{
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            tool_executor: self.tool_executor.clone(),
            params: self.params.clone(),
            logger: self.logger.clone(),
            progress: self.progress.clone(),
            cancellation_token: self.cancellation_token.clone(),
        }
    }
}

impl<M, T> RunExplorationUseCase<M, T>
where
    M: DecisionModel + ?Sized + 'static,
    T: ToolExecutorPort + ?Sized + 'static,
{
    pub fn new(model: Arc<M>, tool_executor: Arc<T>) -> Self {
        Self {
            model,
            tool_executor,
            params: ExplorationParams::default(),
            logger: Arc::new(NoConversationLogger),
            progress: Arc::new(NoExplorationProgress),
            cancellation_token: None,
        }
    }

    pub fn with_params(mut self, params: ExplorationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ExplorationProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn params(&self) -> &ExplorationParams {
        &self.params
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    /// Run one session to termination
    pub async fn execute(&self, input: RunExplorationInput) -> Result<Transcript, ExplorationError> {
        let query = input.query.trim();
        if query.is_empty() {
            return Err(ExplorationError::InvalidQuery("query is empty".to_string()));
        }
        if !input.spec.is_object() {
            return Err(ExplorationError::InvalidChart(
                "specification must be a JSON object".to_string(),
            ));
        }

        let chart_type = input.resolved_chart_type();
        let mut session = Session::new(
            next_session_id(),
            query,
            chart_type,
            ChartState::new(input.spec.clone()),
        );
        if let Some(task_id) = &input.task_id {
            session = session.with_task_id(task_id.clone());
        }
        session.start()?;

        info!(
            session = session.id(),
            chart_type = %chart_type,
            model = self.model.name(),
            "Exploration started"
        );
        self.progress
            .on_session_start(session.id(), session.query(), chart_type);
        self.log(
            &session,
            "session_start",
            json!({
                "query": session.query(),
                "chart_type": chart_type,
                "task_id": session.task_id(),
                "model": self.model.name(),
            }),
        );

        let tools = if self.params.tools_enabled {
            let mut tools = self.tool_executor.applicable_tools(chart_type);
            tools.push(reset_view_descriptor());
            tools
        } else {
            Vec::new()
        };

        loop {
            if self.is_cancelled() {
                info!(session = session.id(), "Exploration cancelled");
                session.abort(CANCELLED_REASON)?;
                break;
            }

            let round = session.round();
            if round >= self.params.max_rounds {
                warn!(
                    session = session.id(),
                    max_rounds = self.params.max_rounds,
                    "Round budget exhausted"
                );
                session.exceed_rounds()?;
                break;
            }

            self.progress.on_round_start(round, self.params.max_rounds);

            let decision = match self
                .request_decision(&session, &tools, input.image.as_ref())
                .await
            {
                Ok(decision) => decision,
                Err(DecisionFailure::Cancelled) => {
                    info!(session = session.id(), "Exploration cancelled during model request");
                    session.abort(CANCELLED_REASON)?;
                    break;
                }
                Err(DecisionFailure::Exhausted(reason)) => {
                    warn!(session = session.id(), reason = %reason, "Model communication failed");
                    session.abort(reason)?;
                    break;
                }
            };

            self.progress.on_decision(&decision);
            session.add_insights(decision.insights());

            if let Decision::FinalAnswer { text, .. } = &decision {
                info!(session = session.id(), round, "Final answer received");
                session.complete(text.clone())?;
                break;
            }

            for call in decision.tool_calls(round) {
                debug!(session = session.id(), call = %call.signature(), "Executing tool");
                self.progress.on_tool_call(&call);

                if call.tool_name == RESET_VIEW_TOOL {
                    self.log(
                        &session,
                        "tool_execution",
                        json!({"round": round, "tool": RESET_VIEW_TOOL, "success": true}),
                    );
                    let record = session.reset_state(call)?;
                    self.progress.on_tool_result(record);
                    continue;
                }

                let record = self.tool_executor.execute(&call, session.state()).await;
                self.log(
                    &session,
                    "tool_execution",
                    json!({
                        "round": round,
                        "tool": call.tool_name,
                        "arguments": call.arguments,
                        "success": record.is_success(),
                        "observation": record.observation(),
                        "duration_ms": record.duration_ms(),
                    }),
                );
                if let Some(error) = record.error() {
                    debug!(session = session.id(), tool = %call.tool_name, error = %error, "Tool call failed");
                }

                let record = session.record(record)?;
                self.progress.on_tool_result(record);
            }

            session.advance_round();
        }

        let transcript = session.to_transcript();
        info!(
            session = session.id(),
            termination = transcript.termination.as_str(),
            rounds = transcript.rounds,
            calls = transcript.calls.len(),
            "Exploration finished"
        );
        self.log(
            &session,
            "session_end",
            json!({
                "termination": transcript.termination,
                "rounds": transcript.rounds,
                "calls": transcript.calls.len(),
                "insights": transcript.insights.len(),
                "abort_reason": transcript.abort_reason,
            }),
        );
        self.progress.on_session_end(&transcript);
        Ok(transcript)
    }

    /// Request a decision.
    ///
    /// Failed requests and undecodable responses draw on separate budgets:
    /// `max_model_retries` extra requests after communication failures, and
    /// `max_corrective_retries` (never fewer than one) corrective re-prompts
    /// after rejected responses.
    async fn request_decision(
        &self,
        session: &Session,
        tools: &[&ToolDescriptor],
        image: Option<&ChartImage>,
    ) -> Result<Decision, DecisionFailure> {
        let max_failures = self.params.model_attempts();
        let max_rejections = self.params.corrective_retries() + 1;
        let max_requests = self.params.max_requests_per_round();
        let round = session.round();
        let mut hint: Option<String> = None;
        let mut last_error = String::new();
        let mut failures = 0;
        let mut rejections = 0;
        let mut attempt = 0;

        loop {
            attempt += 1;
            if attempt > 1 && self.is_cancelled() {
                return Err(DecisionFailure::Cancelled);
            }

            let context = DecisionContext {
                query: session.query(),
                chart_type: session.chart_type(),
                state: session.state(),
                history: session.history().recent(self.params.history_window),
                insights: session.insights(),
                round,
                max_rounds: self.params.max_rounds,
                tools,
                image,
                corrective_hint: hint.as_deref(),
                include_payloads: self.params.include_tool_payloads,
            };

            self.progress.on_model_request(round, attempt);
            self.log(
                session,
                "model_request",
                json!({
                    "round": round,
                    "attempt": attempt,
                    "corrective_hint": hint,
                    "prompt": context.user_prompt(),
                }),
            );

            match self.call_model(&context).await {
                Ok(response) => {
                    self.log(
                        session,
                        "model_response",
                        json!({"round": round, "attempt": attempt, "response": response}),
                    );
                    let decision = parse_decision(&response)
                        .and_then(|d| require_offered_tools(d, !tools.is_empty()));
                    match decision {
                        Ok(decision) => return Ok(decision),
                        Err(e) => {
                            warn!(
                                session = session.id(),
                                attempt,
                                error = %e,
                                response = %truncate(&response, 200),
                                "Decision rejected"
                            );
                            self.log(
                                session,
                                "decision_rejected",
                                json!({"round": round, "attempt": attempt, "error": e.to_string()}),
                            );
                            rejections += 1;
                            last_error = e.to_string();
                            hint = Some(e.corrective_hint());
                        }
                    }
                }
                Err(ModelError::Cancelled) => return Err(DecisionFailure::Cancelled),
                Err(e) => {
                    warn!(session = session.id(), attempt, error = %e, "Model request failed");
                    self.log(
                        session,
                        "model_error",
                        json!({"round": round, "attempt": attempt, "error": e.to_string()}),
                    );
                    failures += 1;
                    last_error = e.to_string();
                }
            }

            if failures >= max_failures || rejections >= max_rejections {
                return Err(DecisionFailure::Exhausted(format!(
                    "model communication failed after {} attempt(s): {}",
                    attempt, last_error
                )));
            }
            self.progress.on_model_retry(attempt, max_requests, &last_error);
        }
    }

    /// One model request, bounded by the timeout and the cancellation token
    async fn call_model(&self, context: &DecisionContext<'_>) -> Result<String, ModelError> {
        let request = async {
            match self.params.model_timeout {
                Some(timeout) => tokio::time::timeout(timeout, self.model.decide(context))
                    .await
                    .unwrap_or(Err(ModelError::Timeout(timeout))),
                None => self.model.decide(context).await,
            }
        };

        match &self.cancellation_token {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ModelError::Cancelled),
                    result = request => result,
                }
            }
            None => request.await,
        }
    }

    fn log(&self, session: &Session, event_type: &'static str, payload: serde_json::Value) {
        self.logger
            .log(ConversationEvent::new(event_type, session.id(), payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chartscout_domain::{
        ChartType, ExecutionRecord, ParamType, TerminationState, ToolCall, ToolCatalog,
        ToolCategory, ToolError, ToolErrorKind, ToolParameter,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    // ==================== Mocks ====================

    /// Replays queued responses and remembers each corrective hint it saw
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String, ModelError>>>,
        hints: Mutex<Vec<Option<String>>>,
        rounds: Mutex<Vec<usize>>,
        delay: Option<Duration>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<String, ModelError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                hints: Mutex::new(Vec::new()),
                rounds: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        fn ok(responses: &[&str]) -> Self {
            Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl DecisionModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn decide(&self, context: &DecisionContext<'_>) -> Result<String, ModelError> {
            self.hints
                .lock()
                .unwrap()
                .push(context.corrective_hint.map(str::to_string));
            self.rounds.lock().unwrap().push(context.round);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ModelError::ScriptExhausted(0)))
        }
    }

    /// Executes `mark_*` tools by rewriting the chart mark; `broken` always fails
    struct MockToolExecutor {
        catalog: ToolCatalog,
        calls: Mutex<Vec<String>>,
        marks_seen: Mutex<Vec<String>>,
    }

    impl MockToolExecutor {
        fn new() -> Self {
            let catalog = ToolCatalog::builder()
                .register(
                    ToolDescriptor::new("set_mark", ToolCategory::Action, "Change the mark")
                        .with_param(
                            "mark",
                            ToolParameter::new(ParamType::String, "new mark").required(),
                        ),
                )
                .register(ToolDescriptor::new(
                    "broken",
                    ToolCategory::Analysis,
                    "Always fails",
                ))
                .register(
                    ToolDescriptor::new("bar_only", ToolCategory::Action, "Bar tool")
                        .applicable_to(ChartType::BarChart),
                )
                .build()
                .unwrap();
            Self {
                catalog,
                calls: Mutex::new(Vec::new()),
                marks_seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolExecutorPort for MockToolExecutor {
        fn catalog(&self) -> &ToolCatalog {
            &self.catalog
        }

        async fn execute(&self, call: &ToolCall, state: &ChartState) -> ExecutionRecord {
            self.calls.lock().unwrap().push(call.tool_name.clone());
            self.marks_seen
                .lock()
                .unwrap()
                .push(state.mark_type().unwrap_or_default().to_string());

            match call.tool_name.as_str() {
                "set_mark" => match call.get_string("mark") {
                    Some(mark) => {
                        let mut spec = state.to_spec();
                        spec["mark"] = json!(mark);
                        ExecutionRecord::success(
                            call.clone(),
                            ChartState::new(spec),
                            json!({"mark": mark}),
                        )
                    }
                    None => ExecutionRecord::failure(
                        call.clone(),
                        ToolError::invalid_argument("mark", "mark is required"),
                    ),
                },
                "broken" => {
                    ExecutionRecord::failure(call.clone(), ToolError::execution_failed("boom"))
                }
                name => ExecutionRecord::failure(call.clone(), ToolError::unknown_tool(name)),
            }
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        events: Mutex<Vec<&'static str>>,
    }

    impl ConversationLogger for RecordingLogger {
        fn log(&self, event: ConversationEvent) {
            self.events.lock().unwrap().push(event.event_type);
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        retries: Mutex<usize>,
        tool_results: Mutex<Vec<bool>>,
        ended: Mutex<Option<TerminationState>>,
    }

    impl ExplorationProgressNotifier for RecordingProgress {
        fn on_model_retry(&self, _attempt: usize, _max_attempts: usize, _error: &str) {
            *self.retries.lock().unwrap() += 1;
        }

        fn on_tool_result(&self, record: &ExecutionRecord) {
            self.tool_results.lock().unwrap().push(record.is_success());
        }

        fn on_session_end(&self, transcript: &Transcript) {
            *self.ended.lock().unwrap() = Some(transcript.termination);
        }
    }

    // ==================== Helpers ====================

    const SET_BAR: &str =
        r#"{"type": "tool_calls", "calls": [{"name": "set_mark", "arguments": {"mark": "bar"}}]}"#;
    const DONE: &str =
        r#"{"type": "final_answer", "text": "done", "insights": ["the chart has two groups"]}"#;

    fn input() -> RunExplorationInput {
        RunExplorationInput::new(
            "What groups exist?",
            json!({"mark": "point", "data": {"values": [{"x": 1, "y": 2}]}}),
        )
        .with_task_id("task-1")
    }

    fn use_case(
        model: ScriptedModel,
    ) -> (
        RunExplorationUseCase<ScriptedModel, MockToolExecutor>,
        Arc<ScriptedModel>,
        Arc<MockToolExecutor>,
    ) {
        let model = Arc::new(model);
        let executor = Arc::new(MockToolExecutor::new());
        let use_case = RunExplorationUseCase::new(model.clone(), executor.clone());
        (use_case, model, executor)
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_completes_with_final_answer() {
        let (use_case, _, executor) = use_case(ScriptedModel::ok(&[SET_BAR, DONE]));
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Completed);
        assert_eq!(transcript.final_answer.as_deref(), Some("done"));
        assert_eq!(transcript.rounds, 1);
        assert_eq!(transcript.task_id.as_deref(), Some("task-1"));
        assert_eq!(transcript.chart_type, ChartType::ScatterPlot);
        assert_eq!(transcript.insights, vec!["the chart has two groups"]);
        assert_eq!(transcript.tool_sequence(), vec!["set_mark"]);
        assert_eq!(executor.calls(), vec!["set_mark"]);
        assert_eq!(
            transcript.final_state.unwrap().mark_type(),
            Some("bar"),
            "successful call replaces the chart state"
        );
        assert!(transcript.session_id.starts_with("session-"));
    }

    #[tokio::test]
    async fn test_calls_in_a_round_run_sequentially_on_updated_state() {
        let both = r#"{"type": "tool_calls", "calls": [
            {"name": "set_mark", "arguments": {"mark": "bar"}},
            {"name": "set_mark", "arguments": {"mark": "line"}}
        ]}"#;
        let (use_case, _, executor) = use_case(ScriptedModel::ok(&[both, DONE]));
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(*executor.marks_seen.lock().unwrap(), vec!["point", "bar"]);
        assert_eq!(transcript.calls.iter().map(|c| c.round).collect::<Vec<_>>(), vec![0, 0]);
        assert_eq!(transcript.final_state.unwrap().mark_type(), Some("line"));
    }

    #[tokio::test]
    async fn test_tool_errors_are_recorded_and_session_continues() {
        let calls = r#"{"type": "tool_calls", "calls": [
            {"name": "broken"},
            {"name": "nonexistent", "arguments": {"a": 1}},
            {"name": "set_mark", "arguments": {}}
        ]}"#;
        let progress = Arc::new(RecordingProgress::default());
        let (use_case, model, _) = use_case(ScriptedModel::ok(&[calls, DONE]));
        let use_case = use_case.with_progress(progress.clone());
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Completed);
        let kinds: Vec<_> = transcript.calls.iter().map(|c| c.error_kind()).collect();
        assert_eq!(
            kinds,
            vec![
                Some(ToolErrorKind::ToolExecutionFailed),
                Some(ToolErrorKind::UnknownTool),
                Some(ToolErrorKind::InvalidArgument),
            ]
        );
        assert_eq!(transcript.final_state.unwrap().mark_type(), Some("point"));
        assert_eq!(*progress.tool_results.lock().unwrap(), vec![false, false, false]);
        assert_eq!(*model.rounds.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_malformed_response_is_retried_with_hint() {
        let progress = Arc::new(RecordingProgress::default());
        let (use_case, model, _) = use_case(ScriptedModel::ok(&["I think it is a scatter plot", DONE]));
        let use_case = use_case.with_progress(progress.clone());
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Completed);
        let hints = model.hints.lock().unwrap();
        assert_eq!(hints.len(), 2);
        assert!(hints[0].is_none());
        assert!(hints[1].as_deref().unwrap().contains("rejected"));
        assert_eq!(*progress.retries.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_aborts_after_retry_budget() {
        let (use_case, model, _) = use_case(ScriptedModel::ok(&["nope", "{\"type\": \"maybe\"}", DONE]));
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Aborted);
        assert!(transcript.final_answer.is_none());
        assert!(
            transcript
                .abort_reason
                .as_deref()
                .unwrap()
                .contains("after 2 attempt(s)")
        );
        assert_eq!(model.hints.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_model_errors_exhaust_retry_budget() {
        let model = ScriptedModel::new(vec![
            Err(ModelError::Connection("refused".to_string())),
            Err(ModelError::RequestFailed("500".to_string())),
        ]);
        let (use_case, _, _) = use_case(model);
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Aborted);
        assert!(transcript.abort_reason.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_malformed_reply_after_transport_error_gets_corrective_retry() {
        let model = ScriptedModel::new(vec![
            Err(ModelError::Connection("refused".to_string())),
            Ok("I think it is a scatter plot".to_string()),
            Ok(DONE.to_string()),
        ]);
        let (use_case, model, _) = use_case(model);
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Completed);
        let hints = model.hints.lock().unwrap();
        assert_eq!(hints.len(), 3);
        assert!(hints[0].is_none());
        assert!(hints[1].is_none());
        assert!(hints[2].as_deref().unwrap().contains("rejected"));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_retried_without_model_retries() {
        let (use_case, model, _) = use_case(ScriptedModel::ok(&["nope", DONE]));
        let use_case =
            use_case.with_params(ExplorationParams::default().with_max_model_retries(0));
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Completed);
        assert_eq!(model.hints.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_share_no_state() {
        struct EchoMark;

        #[async_trait]
        impl DecisionModel for EchoMark {
            fn name(&self) -> &str {
                "echo-mark"
            }

            // Asks for the query text as mark, then stops once the chart carries it
            async fn decide(&self, context: &DecisionContext<'_>) -> Result<String, ModelError> {
                tokio::task::yield_now().await;
                if context.state.mark_type() == Some(context.query) {
                    return Ok(format!(
                        r#"{{"type": "final_answer", "text": "{}", "insights": ["{}"]}}"#,
                        context.query, context.query
                    ));
                }
                Ok(format!(
                    r#"{{"type": "tool_calls", "calls": [{{"name": "set_mark", "arguments": {{"mark": "{}"}}}}]}}"#,
                    context.query
                ))
            }
        }

        let use_case = RunExplorationUseCase::new(Arc::new(EchoMark), Arc::new(MockToolExecutor::new()));
        let first = use_case.clone();
        let second = use_case.clone();
        let spec = json!({"mark": "point"});

        let (a, b) = tokio::join!(
            first.execute(RunExplorationInput::new("bar", spec.clone())),
            second.execute(RunExplorationInput::new("line", spec.clone())),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.session_id, b.session_id);
        assert_eq!(a.termination, TerminationState::Completed);
        assert_eq!(b.termination, TerminationState::Completed);
        assert_eq!(a.calls.len(), 1);
        assert_eq!(b.calls.len(), 1);
        assert_eq!(a.calls[0].arguments["mark"], json!("bar"));
        assert_eq!(b.calls[0].arguments["mark"], json!("line"));
        assert_eq!(a.insights, vec!["bar"]);
        assert_eq!(b.insights, vec!["line"]);
        assert_eq!(a.final_state.unwrap().mark_type(), Some("bar"));
        assert_eq!(b.final_state.unwrap().mark_type(), Some("line"));
    }

    #[tokio::test]
    async fn test_model_timeout_aborts() {
        let model = ScriptedModel::ok(&[DONE]).with_delay(Duration::from_secs(5));
        let (use_case, _, _) = use_case(model);
        let use_case = use_case.with_params(
            ExplorationParams::default()
                .with_max_model_retries(0)
                .with_model_timeout(Some(Duration::from_millis(20))),
        );
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Aborted);
        assert!(transcript.abort_reason.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_max_rounds_exceeded() {
        let (use_case, _, executor) = use_case(ScriptedModel::ok(&[SET_BAR, SET_BAR, SET_BAR, DONE]));
        let use_case = use_case.with_params(ExplorationParams::default().with_max_rounds(2));
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::MaxRoundsExceeded);
        assert_eq!(transcript.rounds, 2);
        assert_eq!(executor.calls().len(), 2);
        assert!(transcript.final_answer.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_round() {
        let token = CancellationToken::new();
        token.cancel();
        let (use_case, model, _) = use_case(ScriptedModel::ok(&[DONE]));
        let use_case = use_case.with_cancellation(token);
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Aborted);
        assert_eq!(transcript.abort_reason.as_deref(), Some("cancelled"));
        assert!(model.hints.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_pending_request() {
        let token = CancellationToken::new();
        let model = ScriptedModel::ok(&[DONE]).with_delay(Duration::from_secs(30));
        let (use_case, _, _) = use_case(model);
        let use_case = use_case
            .with_params(ExplorationParams::default().with_model_timeout(None))
            .with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let transcript = use_case.execute(input()).await.unwrap();
        canceller.await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Aborted);
        assert_eq!(transcript.abort_reason.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_only_applicable_tools_are_offered() {
        struct ToolNames(Mutex<Vec<String>>);

        #[async_trait]
        impl DecisionModel for ToolNames {
            fn name(&self) -> &str {
                "tool-names"
            }

            async fn decide(&self, context: &DecisionContext<'_>) -> Result<String, ModelError> {
                *self.0.lock().unwrap() = context.tools.iter().map(|t| t.name.clone()).collect();
                Ok(DONE.to_string())
            }
        }

        let model = Arc::new(ToolNames(Mutex::new(Vec::new())));
        let use_case = RunExplorationUseCase::new(model.clone(), Arc::new(MockToolExecutor::new()));
        use_case.execute(input()).await.unwrap();

        assert_eq!(*model.0.lock().unwrap(), vec!["broken", "set_mark", "reset_view"]);
    }

    #[tokio::test]
    async fn test_reset_view_restores_initial_chart() {
        let reset = r#"{"type": "tool_calls", "calls": [{"name": "reset_view"}]}"#;
        let (use_case, _, executor) = use_case(ScriptedModel::ok(&[SET_BAR, reset, DONE]));
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Completed);
        assert_eq!(executor.calls(), vec!["set_mark"]);
        let names: Vec<&str> = transcript.calls.iter().map(|c| c.tool_name.as_str()).collect();
        assert_eq!(names, vec!["set_mark", "reset_view"]);
        assert!(transcript.calls.iter().all(|c| c.success));
        assert_eq!(transcript.final_state.unwrap().mark_type(), Some("point"));
    }

    #[tokio::test]
    async fn test_static_baseline_offers_no_tools() {
        let (use_case, model, executor) = use_case(ScriptedModel::ok(&[SET_BAR, DONE]));
        let use_case =
            use_case.with_params(ExplorationParams::default().with_tools_enabled(false));
        let transcript = use_case.execute(input()).await.unwrap();

        assert_eq!(transcript.termination, TerminationState::Completed);
        assert_eq!(transcript.rounds, 0);
        assert!(transcript.calls.is_empty());
        assert!(executor.calls().is_empty());
        let hints = model.hints.lock().unwrap();
        assert_eq!(hints.len(), 2);
        assert!(hints[1].as_deref().unwrap().contains("no tools are available"));
    }

    #[tokio::test]
    async fn test_logger_and_progress_events() {
        let logger = Arc::new(RecordingLogger::default());
        let progress = Arc::new(RecordingProgress::default());
        let (use_case, _, _) = use_case(ScriptedModel::ok(&[SET_BAR, DONE]));
        let use_case = use_case
            .with_logger(logger.clone())
            .with_progress(progress.clone());
        use_case.execute(input()).await.unwrap();

        assert_eq!(
            *logger.events.lock().unwrap(),
            vec![
                "session_start",
                "model_request",
                "model_response",
                "tool_execution",
                "model_request",
                "model_response",
                "session_end",
            ]
        );
        assert_eq!(*progress.ended.lock().unwrap(), Some(TerminationState::Completed));
    }

    #[tokio::test]
    async fn test_rejects_invalid_input() {
        let (use_case, _, _) = use_case(ScriptedModel::ok(&[DONE]));

        let err = use_case
            .execute(RunExplorationInput::new("   ", json!({"mark": "bar"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ExplorationError::InvalidQuery(_)));

        let err = use_case
            .execute(RunExplorationInput::new("q", json!([1, 2])))
            .await
            .unwrap_err();
        assert!(matches!(err, ExplorationError::InvalidChart(_)));
    }

    #[tokio::test]
    async fn test_explicit_chart_type_overrides_detection() {
        let (use_case, _, _) = use_case(ScriptedModel::ok(&[DONE]));
        let transcript = use_case
            .execute(input().with_chart_type(ChartType::Heatmap))
            .await
            .unwrap();
        assert_eq!(transcript.chart_type, ChartType::Heatmap);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = next_session_id();
        let b = next_session_id();
        assert_ne!(a, b);
        assert!(a.starts_with("session-"));
    }
}
