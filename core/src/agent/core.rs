//! AgentCore implementation
//!
//! One run alternates planning requests and tool executions:
//!
//! ```text
//! PLANNING --answer--> DONE
//! PLANNING --action--> EXECUTING_TOOL --> PLANNING
//! PLANNING --ceiling exceeded / stop at boundary--> DONE
//! PLANNING --stop while the request is in flight--> ABORTED
//! ```

use std::sync::Arc;
use std::time::Instant;

use super::config::AgentConfig;
use super::context::TaskExecutionContext;
use super::execution::AgentExecution;
use super::history::create_agent_history;
use super::prompt::PromptAssembler;
use super::stop::StopSignal;
use super::types::{Action, ChatMessage, PluginInfo, PluginResult, ReactAgentResult};
use super::AgentMode;
use crate::encoding::TokenEncoding;
use crate::error::Result;
use crate::llm::{ChatOptions, LlmClient, LlmMessage};
use crate::output::{
    AgentEvent, AgentOutput, NullOutput, RunEnding, ToolExecutionInfo, ToolExecutionStatus,
};
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::trajectory::{TrajectoryEntry, TrajectoryRecorder};

/// Inputs longer than this are not echoed in progress notes
const PROGRESS_PREVIEW_LIMIT: usize = 100;

/// States of the planning loop
#[derive(Debug)]
enum LoopState {
    Planning,
    ExecutingTool(Action),
    Done { answer: String, ending: RunEnding },
    Aborted,
}

/// The ReAct agent: plans with the model and runs the chosen tools
pub struct AgentCore {
    config: AgentConfig,
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
    assembler: PromptAssembler,
    output: Arc<dyn AgentOutput>,
    recorder: Option<Arc<TrajectoryRecorder>>,
}

impl AgentCore {
    /// Create an agent over a model client and a tool registry
    pub fn new(
        config: AgentConfig,
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            llm,
            executor: ToolExecutor::new(registry.clone()),
            registry,
            assembler: PromptAssembler::new()?,
            output: Arc::new(NullOutput),
            recorder: None,
        })
    }

    /// Report events to `output`
    pub fn with_output(mut self, output: Arc<dyn AgentOutput>) -> Self {
        self.output = output;
        self
    }

    /// Record the run into a trajectory
    pub fn with_trajectory_recorder(mut self, recorder: Arc<TrajectoryRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// One planning request: prompt, model call and parse
    ///
    /// `tool_names` selects the plugins offered to the model; the capability
    /// tools they need are added automatically.
    pub async fn plan(
        &self,
        context: &TaskExecutionContext,
        tool_names: &[String],
        input: &str,
        results: &[PluginResult],
        history: &[ChatMessage],
    ) -> Result<ReactAgentResult> {
        let encoding = context.encoding()?;
        self.plan_step(&*encoding, context, tool_names, input, results, history, 0)
            .await
    }

    /// Execute one action and pair it with its observation
    pub async fn run_plugin(
        &self,
        context: &TaskExecutionContext,
        action: Action,
    ) -> Result<PluginResult> {
        self.run_plugin_step(context, action, 0).await
    }

    /// Drive the loop until an answer, the ceiling or a stop
    ///
    /// `history` is the conversation before `input`. A stop that arrives
    /// while a planning request is in flight drops the request. Every stop
    /// is consumed so it cannot leak into the next run.
    pub async fn run(
        &self,
        context: &TaskExecutionContext,
        tool_names: &[String],
        input: &str,
        history: &[ChatMessage],
        stop: &StopSignal,
    ) -> Result<AgentExecution> {
        let start = Instant::now();
        let encoding = match context.encoding() {
            Ok(encoding) => encoding,
            Err(e) => {
                stop.take();
                return Err(e);
            }
        };

        let _ = self
            .output
            .emit_event(AgentEvent::RunStarted {
                task_id: context.task_id.clone(),
                input: input.to_string(),
                tools: tool_names.to_vec(),
            })
            .await;
        self.record(TrajectoryEntry::task_start(
            context.task_id.clone(),
            input.to_string(),
            tool_names.to_vec(),
        ))
        .await;

        let mut results: Vec<PluginResult> = Vec::new();
        let mut planning_calls = 0;
        let driven = self
            .drive(
                &*encoding,
                context,
                tool_names,
                input,
                history,
                stop,
                &mut results,
                &mut planning_calls,
            )
            .await;
        drop(encoding);

        let (answer, ending) = match driven {
            Ok(done) => done,
            Err(e) => {
                // A stop raised before the failure must not end the next run
                stop.take();
                tracing::error!("Agent run {} failed: {}", context.task_id, e);
                self.record(TrajectoryEntry::error(
                    e.to_string(),
                    Some(input.to_string()),
                    planning_calls,
                ))
                .await;
                let _ = self.output.error(&e.to_string()).await;
                return Err(e);
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Agent run {} finished ({:?}) after {} planning calls",
            context.task_id,
            ending,
            planning_calls
        );
        self.record(TrajectoryEntry::task_complete(
            ending == RunEnding::Answered,
            answer.clone(),
            planning_calls,
            duration_ms,
        ))
        .await;
        let _ = self
            .output
            .emit_event(AgentEvent::RunCompleted {
                answer: answer.clone(),
                ending,
                planning_calls,
            })
            .await;

        Ok(AgentExecution {
            task_id: context.task_id.clone(),
            answer,
            ending,
            planning_calls,
            results,
            duration_ms,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn drive(
        &self,
        encoding: &dyn TokenEncoding,
        context: &TaskExecutionContext,
        tool_names: &[String],
        input: &str,
        history: &[ChatMessage],
        stop: &StopSignal,
        results: &mut Vec<PluginResult>,
        planning_calls: &mut usize,
    ) -> Result<(String, RunEnding)> {
        let messages = &self.config.messages;
        let mut iterations = 0;
        let mut state = LoopState::Planning;

        loop {
            state = match state {
                LoopState::Planning if iterations > self.config.max_planning_iterations => {
                    LoopState::Done {
                        answer: messages.no_result.clone(),
                        ending: RunEnding::IterationLimit,
                    }
                }
                LoopState::Planning if stop.take() => LoopState::Done {
                    answer: messages.stopped.clone(),
                    ending: RunEnding::Stopped,
                },
                LoopState::Planning => {
                    *planning_calls += 1;
                    let step = *planning_calls;
                    let _ = self
                        .output
                        .emit_event(AgentEvent::PlanningStarted { iteration: step })
                        .await;

                    let planned = tokio::select! {
                        biased;
                        _ = stop.stopped() => None,
                        planned = self.plan_step(encoding, context, tool_names, input, results.as_slice(), history, step) => Some(planned),
                    };
                    match planned {
                        None => LoopState::Aborted,
                        Some(decision) => {
                            let decision = decision?;
                            let _ = self
                                .output
                                .emit_event(AgentEvent::PlanningResolved {
                                    iteration: step,
                                    decision: decision.clone(),
                                })
                                .await;
                            match decision {
                                ReactAgentResult::Answer { answer } => LoopState::Done {
                                    answer,
                                    ending: RunEnding::Answered,
                                },
                                ReactAgentResult::Action(action) => {
                                    iterations += 1;
                                    LoopState::ExecutingTool(action)
                                }
                            }
                        }
                    }
                }
                LoopState::ExecutingTool(action) => {
                    if action.plugin.display_for_user {
                        let _ = self
                            .output
                            .emit_event(AgentEvent::Progress {
                                message: self.progress_message(&action),
                            })
                            .await;
                    }
                    let result = self
                        .run_plugin_step(context, action, *planning_calls)
                        .await?;
                    results.push(result);

                    if stop.take() {
                        LoopState::Done {
                            answer: messages.stopped.clone(),
                            ending: RunEnding::Stopped,
                        }
                    } else {
                        LoopState::Planning
                    }
                }
                LoopState::Done { answer, ending } => return Ok((answer, ending)),
                LoopState::Aborted => {
                    stop.take();
                    tracing::info!("Planning request for {} aborted", context.task_id);
                    return Ok((messages.stopped.clone(), RunEnding::Aborted));
                }
            };
        }
    }

    /// Progress note shown before a displayed tool runs
    ///
    /// Short inputs that do not look like JSON are echoed after the name.
    pub fn progress_message(&self, action: &Action) -> String {
        let base = format!(
            "{} {}",
            action.plugin.name_for_human, self.config.messages.executing
        );
        let input = &action.plugin_input;
        let simple = input.chars().count() < PROGRESS_PREVIEW_LIMIT
            && !input.starts_with('[')
            && !input.starts_with('{');
        if simple {
            format!("{} - {}", base, input)
        } else {
            base
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn plan_step(
        &self,
        encoding: &dyn TokenEncoding,
        context: &TaskExecutionContext,
        tool_names: &[String],
        input: &str,
        results: &[PluginResult],
        history: &[ChatMessage],
        step: usize,
    ) -> Result<ReactAgentResult> {
        let tools: Vec<PluginInfo> = self
            .registry
            .list_tools_filtered(tool_names)
            .await
            .iter()
            .map(|tool| tool.info().clone())
            .collect();
        let messages = self.build_messages(encoding, context, &tools, input, results, history)?;

        if context.verbose {
            tracing::debug!("LLM Request:");
            for message in &messages {
                tracing::debug!("{}: {}", message.role.as_str(), message.content);
            }
        }
        self.record(TrajectoryEntry::llm_request(
            messages.clone(),
            self.llm.model_name().to_string(),
            self.llm.provider_name().to_string(),
            step,
        ))
        .await;

        let stop = (!self.config.stop_sequences.is_empty())
            .then(|| self.config.stop_sequences.clone());
        let options = ChatOptions {
            temperature: Some(self.config.temperature),
            ..ChatOptions::planning(stop)
        };

        let started = Instant::now();
        let response = self.llm.chat_completion(messages, options).await?;
        let elapsed = started.elapsed();
        if context.verbose {
            tracing::debug!(
                "LLM Response:\nelapsed: {:.3} sec.\n{}",
                elapsed.as_secs_f64(),
                response.content
            );
        }

        let decision = self.config.parser().parse(&tools, &response.content);
        self.record(TrajectoryEntry::llm_response(
            response.content.clone(),
            decision.as_ref().ok().cloned(),
            elapsed.as_millis() as u64,
            step,
        ))
        .await;
        decision
    }

    fn build_messages(
        &self,
        encoding: &dyn TokenEncoding,
        context: &TaskExecutionContext,
        tools: &[PluginInfo],
        input: &str,
        results: &[PluginResult],
        history: &[ChatMessage],
    ) -> Result<Vec<LlmMessage>> {
        match self.config.mode {
            AgentMode::Agent => Ok(self
                .assembler
                .render_agent(
                    &context.locale,
                    tools,
                    input,
                    results,
                    self.config.scratchpad_style,
                )?
                .into_messages()),
            AgentMode::Conversational => {
                let history = create_agent_history(
                    encoding,
                    &context.model,
                    self.config.history_token_budget,
                    history,
                );
                self.assembler
                    .render_conversational(&context.locale, tools, input, results, &history)
            }
        }
    }

    async fn run_plugin_step(
        &self,
        context: &TaskExecutionContext,
        action: Action,
        step: usize,
    ) -> Result<PluginResult> {
        let mut info = ToolExecutionInfo {
            tool_name: action.plugin.name_for_model.clone(),
            display_name: action.plugin.name_for_human.clone(),
            input: action.plugin_input.clone(),
            status: ToolExecutionStatus::Executing,
            result: None,
            error: None,
            timestamp: chrono::Utc::now(),
        };
        let _ = self
            .output
            .emit_event(AgentEvent::ToolExecutionStarted {
                tool_info: info.clone(),
            })
            .await;
        self.record(TrajectoryEntry::tool_call(action.clone(), step))
            .await;

        let outcome = self.executor.execute(context, &action).await;
        info.timestamp = chrono::Utc::now();
        match &outcome {
            Ok(result) => {
                info.status = ToolExecutionStatus::Success;
                info.result = Some(result.clone());
                self.record(TrajectoryEntry::tool_result(
                    info.tool_name.clone(),
                    result.clone(),
                    step,
                ))
                .await;
            }
            Err(e) => {
                info.status = ToolExecutionStatus::Error;
                info.error = Some(e.to_string());
            }
        }
        let _ = self
            .output
            .emit_event(AgentEvent::ToolExecutionCompleted { tool_info: info })
            .await;

        Ok(PluginResult {
            action,
            result: outcome?,
        })
    }

    async fn record(&self, entry: TrajectoryEntry) {
        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record(entry).await {
                tracing::warn!("Failed to record trajectory entry: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginSettings;
    use crate::encoding::LexicalEncodingProvider;
    use crate::error::ToolError;
    use crate::llm::{LlmResponse, MessageRole};
    use crate::output::OutputError;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted responses, repeating the last one
    struct ScriptedLlm {
        responses: Mutex<VecDeque<String>>,
        last: Mutex<String>,
        requests: Mutex<Vec<(Vec<LlmMessage>, ChatOptions)>>,
    }

    impl ScriptedLlm {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                last: Mutex::new(String::new()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat_completion(
            &self,
            messages: Vec<LlmMessage>,
            options: ChatOptions,
        ) -> Result<LlmResponse> {
            self.requests.lock().unwrap().push((messages, options));
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.responses.lock().unwrap().pop_front() {
                *last = next;
            }
            Ok(LlmResponse {
                content: last.clone(),
                usage: None,
                model: "scripted".to_string(),
                finish_reason: None,
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }

    /// Never answers
    struct HangingLlm;

    #[async_trait]
    impl LlmClient for HangingLlm {
        async fn chat_completion(
            &self,
            _messages: Vec<LlmMessage>,
            _options: ChatOptions,
        ) -> Result<LlmResponse> {
            std::future::pending().await
        }

        fn model_name(&self) -> &str {
            "hanging"
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }

    /// Echoes its input, optionally requesting a stop while running
    struct EchoTool {
        info: PluginInfo,
        stop: Option<StopSignal>,
        failure: Option<&'static str>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn info(&self) -> &PluginInfo {
            &self.info
        }

        async fn execute(&self, _context: &TaskExecutionContext, action: &Action) -> Result<String> {
            if let Some(stop) = &self.stop {
                stop.stop();
            }
            if let Some(message) = self.failure {
                return Err(ToolError::ExecutionFailed {
                    name: self.info.name_for_model.clone(),
                    message: message.to_string(),
                }
                .into());
            }
            Ok(format!("echo: {}", action.plugin_input))
        }
    }

    #[derive(Default)]
    struct Collector(Mutex<Vec<AgentEvent>>);

    impl Collector {
        fn progress(&self) -> Vec<String> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter_map(|event| match event {
                    AgentEvent::Progress { message } => Some(message.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl AgentOutput for Collector {
        async fn emit_event(&self, event: AgentEvent) -> std::result::Result<(), OutputError> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct Harness {
        agent: AgentCore,
        provider: Arc<LexicalEncodingProvider>,
        output: Arc<Collector>,
    }

    impl Harness {
        fn new(config: AgentConfig, llm: Arc<dyn LlmClient>, stop: Option<StopSignal>) -> Self {
            Self::with_failure(config, llm, stop, None)
        }

        fn with_failure(
            config: AgentConfig,
            llm: Arc<dyn LlmClient>,
            stop: Option<StopSignal>,
            failure: Option<&'static str>,
        ) -> Self {
            let echo = EchoTool {
                info: PluginInfo::new("echo", "Echo", "Repeats the input.").displayed(),
                stop,
                failure,
            };
            let registry = ToolRegistry::builder(PluginSettings::default())
                .with_tool(Arc::new(echo))
                .build();
            let output = Arc::new(Collector::default());
            let agent = AgentCore::new(config, llm, Arc::new(registry))
                .unwrap()
                .with_output(output.clone());
            Self {
                agent,
                provider: Arc::new(LexicalEncodingProvider::new()),
                output,
            }
        }

        fn context(&self) -> TaskExecutionContext {
            TaskExecutionContext::new(
                HashMap::from([("accept-language".to_string(), "en-US".to_string())]),
                "gpt-3.5-turbo",
                true,
                self.provider.clone(),
            )
        }

        async fn run(&self, input: &str, stop: &StopSignal) -> Result<AgentExecution> {
            self.agent
                .run(&self.context(), &["echo".to_string()], input, &[], stop)
                .await
        }
    }

    const ECHO_ACTION: &str = "Thought: I should echo\nAction: echo\nAction Input: rust";

    #[tokio::test]
    async fn test_answer_ends_run() {
        let llm = ScriptedLlm::new(&["Thought: easy\nFinal Answer: 42"]);
        let harness = Harness::new(AgentConfig::default(), llm.clone(), None);

        let execution = harness.run("6 * 7?", &StopSignal::new()).await.unwrap();
        assert_eq!(execution.answer, "42");
        assert_eq!(execution.ending, RunEnding::Answered);
        assert!(execution.success());
        assert_eq!(execution.planning_calls, 1);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_tool_then_answer() {
        let llm = ScriptedLlm::new(&[ECHO_ACTION, "Thought: done\nFinal Answer: it echoed"]);
        let harness = Harness::new(AgentConfig::default(), llm.clone(), None);

        let execution = harness.run("echo rust", &StopSignal::new()).await.unwrap();
        assert_eq!(execution.answer, "it echoed");
        assert_eq!(execution.results.len(), 1);
        assert_eq!(execution.results[0].result, "echo: rust");

        let requests = llm.requests.lock().unwrap();
        let (messages, options) = &requests[1];
        assert!(messages[1].content.contains("Observation: echo: rust"));
        assert_eq!(options.temperature, Some(0.0));
        assert_eq!(options.stop, Some(vec!["\nObservation:".to_string()]));
    }

    #[tokio::test]
    async fn test_planning_ceiling() {
        let llm = ScriptedLlm::new(&[ECHO_ACTION]);
        let harness = Harness::new(AgentConfig::default(), llm.clone(), None);

        let execution = harness.run("loop forever", &StopSignal::new()).await.unwrap();
        assert_eq!(execution.answer, "No Result");
        assert_eq!(execution.ending, RunEnding::IterationLimit);
        assert_eq!(llm.calls(), 6);
        assert_eq!(execution.planning_calls, 6);
    }

    #[tokio::test]
    async fn test_configured_ceiling() {
        let llm = ScriptedLlm::new(&[ECHO_ACTION]);
        let config = AgentConfig::builder().max_planning_iterations(1).build();
        let harness = Harness::new(config, llm.clone(), None);

        harness.run("loop", &StopSignal::new()).await.unwrap();
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_stop_at_boundary_is_consumed() {
        let stop = StopSignal::new();
        let llm = ScriptedLlm::new(&[ECHO_ACTION]);
        let harness = Harness::new(AgentConfig::default(), llm.clone(), Some(stop.clone()));

        let execution = harness.run("echo", &stop).await.unwrap();
        assert_eq!(execution.answer, "Conversation stopped");
        assert_eq!(execution.ending, RunEnding::Stopped);
        assert_eq!(llm.calls(), 1);
        assert!(!stop.is_stopped());
    }

    #[tokio::test]
    async fn test_stop_cleared_when_tool_fails() {
        let stop = StopSignal::new();
        let failing = Harness::with_failure(
            AgentConfig::default(),
            ScriptedLlm::new(&[ECHO_ACTION]),
            Some(stop.clone()),
            Some("network down"),
        );

        let err = failing.run("echo", &stop).await.unwrap_err();
        assert!(err.to_string().contains("network down"));
        assert!(!stop.is_stopped());

        let llm = ScriptedLlm::new(&["Thought: ok\nFinal Answer: fresh answer"]);
        let next = Harness::new(AgentConfig::default(), llm.clone(), None);
        let execution = next.run("again", &stop).await.unwrap();
        assert_eq!(execution.answer, "fresh answer");
        assert_eq!(execution.ending, RunEnding::Answered);
        assert_eq!(llm.calls(), 1);
    }

    #[test]
    fn test_progress_preview_counts_characters() {
        let harness = Harness::new(AgentConfig::default(), ScriptedLlm::new(&[]), None);
        let mut action = Action {
            thought: String::new(),
            plugin: PluginInfo::new("echo", "Echo", ""),
            plugin_input: "東京の天気".repeat(8),
        };
        assert_eq!(
            harness.agent.progress_message(&action),
            format!("Echo executing... - {}", action.plugin_input)
        );

        action.plugin_input = "あ".repeat(100);
        assert_eq!(harness.agent.progress_message(&action), "Echo executing...");
    }

    #[tokio::test]
    async fn test_stop_severs_planning_request() {
        let stop = StopSignal::new();
        let harness = Harness::new(AgentConfig::default(), Arc::new(HangingLlm), None);

        let trigger = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.stop();
        });

        let execution = tokio::time::timeout(Duration::from_secs(5), harness.run("hi", &stop))
            .await
            .expect("run should be aborted")
            .unwrap();
        assert_eq!(execution.ending, RunEnding::Aborted);
        assert_eq!(execution.answer, "Conversation stopped");
        assert!(!stop.is_stopped());
        assert_eq!(harness.provider.live_count(), 0);
    }

    #[tokio::test]
    async fn test_encoder_released_on_error() {
        let llm = ScriptedLlm::new(&["Thought: hmm\nAction: ghost\nAction Input: boo"]);
        let harness = Harness::new(AgentConfig::default(), llm, None);

        let err = harness.run("summon", &StopSignal::new()).await.unwrap_err();
        assert!(err.is_tool_not_found());
        assert_eq!(err.tool_name(), Some("ghost"));
        assert_eq!(harness.provider.live_count(), 0);
    }

    #[tokio::test]
    async fn test_progress_message_for_displayed_tools() {
        let llm = ScriptedLlm::new(&[
            ECHO_ACTION,
            "Thought: again\nAction: echo\nAction Input: {\"q\": 1}",
            "Final Answer: ok",
        ]);
        let harness = Harness::new(AgentConfig::default(), llm, None);

        harness.run("echo twice", &StopSignal::new()).await.unwrap();
        assert_eq!(
            harness.output.progress(),
            vec!["Echo executing... - rust", "Echo executing..."]
        );
    }

    #[tokio::test]
    async fn test_conversational_mode_uses_history() {
        let llm = ScriptedLlm::new(&[
            "```json\n{\"action\": \"echo\", \"action_input\": {\"text\": \"hi\"}}\n```",
            "```json\n{\"action\": \"Final Answer\", \"action_input\": \"hi back\"}\n```",
        ]);
        let config = AgentConfig::builder().mode(AgentMode::Conversational).build();
        let harness = Harness::new(config, llm.clone(), None);
        let history = vec![
            ChatMessage::new(MessageRole::User, "earlier question"),
            ChatMessage::new(MessageRole::Assistant, "earlier answer"),
        ];

        let execution = harness
            .agent
            .run(
                &harness.context(),
                &["echo".to_string()],
                "say hi",
                &history,
                &StopSignal::new(),
            )
            .await
            .unwrap();
        assert_eq!(execution.answer, "hi back");
        assert_eq!(execution.results[0].action.plugin_input, r#"{"text":"hi"}"#);

        let requests = llm.requests.lock().unwrap();
        let (messages, _) = &requests[1];
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages.last().unwrap().role, MessageRole::Assistant);
        assert!(messages.last().unwrap().content.contains("echo: {\"text\":\"hi\"}"));
    }

    #[tokio::test]
    async fn test_plan_and_run_plugin() {
        let llm = ScriptedLlm::new(&[ECHO_ACTION]);
        let harness = Harness::new(AgentConfig::default(), llm, None);
        let context = harness.context();

        let decision = harness
            .agent
            .plan(&context, &["echo".to_string()], "echo", &[], &[])
            .await
            .unwrap();
        let ReactAgentResult::Action(action) = decision else {
            panic!("expected an action");
        };
        assert_eq!(action.plugin.name_for_model, "echo");

        let result = harness.agent.run_plugin(&context, action).await.unwrap();
        assert_eq!(result.result, "echo: rust");
        assert_eq!(harness.provider.live_count(), 0);
    }

    #[tokio::test]
    async fn test_trajectory_is_recorded() {
        let llm = ScriptedLlm::new(&[ECHO_ACTION, "Final Answer: done"]);
        let recorder = Arc::new(TrajectoryRecorder::new());
        let mut harness = Harness::new(AgentConfig::default(), llm, None);
        harness.agent = harness.agent.with_trajectory_recorder(recorder.clone());

        harness.run("echo", &StopSignal::new()).await.unwrap();
        let kinds: Vec<String> = recorder
            .get_entries()
            .await
            .iter()
            .map(|entry| {
                serde_json::to_value(&entry.entry_type).unwrap()["type"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "task_start",
                "llm_request",
                "llm_response",
                "tool_call",
                "tool_result",
                "llm_request",
                "llm_response",
                "task_complete"
            ]
        );
    }
}
