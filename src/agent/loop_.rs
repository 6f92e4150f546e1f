// Agent loop - bounded propose/execute/feed-back cycle
//
// One iteration: send the conversation to the model, execute any tool
// calls it proposes (in emission order, each behind the policy gate),
// append the results, repeat. The run ends when the model calls the done
// tool or the iteration budget runs out. A tool's internal failure never
// terminates the loop; only provider-fatal errors and budget exhaustion
// do.

use crate::agent::error::AgentError;
use crate::agent::types::{AgentConfig, AgentRunOutput, ToolCall};
use crate::executor::{ToolContext, ToolOutput, DONE_TOOL};
use crate::policy::{ExecutionDecision, Gate};
use crate::provider::{
    ContentBlock, Message, MessageRequest, MessageResponse, Provider, Role, ToolDefinition, Usage,
};
use crate::session::SessionSink;
use crate::observer::Observer;

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Brain seam, implemented by the provider client and by test mocks.
#[async_trait::async_trait]
pub trait BrainRef: Send + Sync {
    async fn infer(&self, request: MessageRequest) -> Result<MessageResponse, String>;
    fn model(&self) -> &str;
    fn max_output_tokens(&self) -> u32;
    fn temperature(&self) -> Option<f32>;
}

#[async_trait::async_trait]
impl BrainRef for Provider {
    async fn infer(&self, request: MessageRequest) -> Result<MessageResponse, String> {
        Provider::infer(self, request).await.map_err(|e| e.to_string())
    }

    fn model(&self) -> &str {
        Provider::model(self)
    }

    fn max_output_tokens(&self) -> u32 {
        Provider::max_output_tokens(self)
    }

    fn temperature(&self) -> Option<f32> {
        Provider::temperature(self)
    }
}

/// Executor seam, implemented by the dispatch table and by test mocks.
#[async_trait::async_trait]
pub trait ExecutorRef: Send + Sync {
    async fn execute(
        &self,
        tool_name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, String>;
    fn tool_definitions(&self) -> Vec<ToolDefinition>;
}

/// Per-run options for the loop.
pub struct RunOptions<'a> {
    pub system: &'a str,
    pub max_iterations: u32,
    pub session: Option<&'a dyn SessionSink>,
    pub observer: Option<&'a dyn Observer>,
}

/// Run one agent loop to completion.
///
/// `messages` carries prior conversation turns in and the new turns out,
/// so a caller can keep a session going across invocations. The prompt is
/// appended as a user message before the first iteration.
pub async fn run_agent<B: BrainRef, E: ExecutorRef>(
    brain: &B,
    executor: &E,
    gate: &dyn Gate,
    messages: &mut Vec<Message>,
    prompt: &str,
    opts: RunOptions<'_>,
) -> Result<AgentRunOutput, AgentError> {
    let tool_defs = executor.tool_definitions();

    if let Some(observer) = opts.observer {
        observer.on_run_start(prompt);
    }
    if let Some(session) = opts.session {
        session.add_message("user", prompt);
    }
    messages.push(Message::user_text(prompt));

    let mut usage = Usage::default();
    let mut last_text = String::new();

    for iteration in 1..=opts.max_iterations {
        debug!(iteration = iteration, model = %brain.model(), "inference round");
        if let Some(observer) = opts.observer {
            observer.on_iteration(iteration);
        }

        let request = MessageRequest::new(
            brain.model(),
            opts.system,
            messages.clone(),
            tool_defs.clone(),
            brain.max_output_tokens(),
        )
        .map_err(AgentError::RequestBuild)?
        .with_temperature(brain.temperature());

        let response = match brain.infer(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "inference failed");
                if let Some(observer) = opts.observer {
                    observer.on_run_error(&e);
                }
                return Err(AgentError::Inference(e));
            }
        };

        if let Some(u) = &response.usage {
            usage.absorb(u);
        }

        let text = response.text();
        if !text.is_empty() {
            last_text = text.clone();
            if let Some(session) = opts.session {
                session.add_message("assistant", &text);
            }
        }

        let tool_calls = extract_tool_calls(&response);

        messages.push(Message {
            role: Role::Assistant,
            content: response.content.clone(),
        });

        if tool_calls.is_empty() {
            // Malformed turn, or the model thinking out loud. Counts
            // against the budget; never a crash.
            warn!(iteration = iteration, "model turn contained no tool calls, continuing");
            continue;
        }

        let ctx = ToolContext { iteration };
        let mut calls = tool_calls.into_iter();
        while let Some(call) = calls.next() {
            if call.name == DONE_TOOL {
                let summary = call
                    .input
                    .get("summary")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| last_text.clone());

                // Every tool_use in the assistant turn must be answered,
                // or the next request on this conversation is rejected.
                messages.push(Message::tool_result(call.id, summary.clone(), false));
                for skipped in calls {
                    messages.push(Message::tool_result(
                        skipped.id,
                        "Skipped: the run already completed.",
                        false,
                    ));
                }

                info!(iterations = iteration, "run completed via done signal");
                if let Some(session) = opts.session {
                    session.add_message("assistant", &summary);
                }
                if let Some(observer) = opts.observer {
                    observer.on_run_done(&summary, iteration);
                }
                return Ok(AgentRunOutput {
                    text: summary,
                    iterations: iteration,
                    usage: Some(usage),
                });
            }

            if let Some(observer) = opts.observer {
                observer.on_tool_call(&call.name, &call.input);
            }

            // Exactly one result per call, whatever happens inside.
            let output = match gate.should_execute(&call.name, &call.input) {
                ExecutionDecision::Deny(reason) => {
                    info!(tool = %call.name, "execution denied by policy gate");
                    ToolOutput::error(reason)
                }
                ExecutionDecision::Allow => {
                    match executor.execute(&call.name, call.input.clone(), &ctx).await {
                        Ok(output) => output,
                        Err(e) => {
                            error!(tool = %call.name, error = %e, "tool execution failed");
                            ToolOutput::error(e)
                        }
                    }
                }
            };

            if let Some(observer) = opts.observer {
                observer.on_tool_result(&call.name, output.is_error);
            }
            if let Some(session) = opts.session {
                session.add_message("tool", &format!("{}: {}", call.name, output.content));
            }

            let content = if output.is_error {
                format!("Error: {}", output.content)
            } else {
                output.content
            };
            messages.push(Message::tool_result(call.id, content, output.is_error));
        }
    }

    warn!(max = opts.max_iterations, "iteration budget exhausted");
    if let Some(observer) = opts.observer {
        observer.on_run_error("iteration budget exhausted");
    }
    Err(AgentError::BudgetExhausted {
        max: opts.max_iterations,
    })
}

/// Extract tool calls from a response, in emission order.
fn extract_tool_calls(response: &MessageResponse) -> Vec<ToolCall> {
    response
        .content
        .iter()
        .filter_map(|block| {
            if let ContentBlock::ToolUse { id, name, input } = block {
                Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Top-level orchestrator agent: the provider, dispatch table, policy gate
/// and conversation state for one interactive session.
pub struct Agent<E: ExecutorRef> {
    provider: Provider,
    executor: E,
    gate: Arc<dyn Gate>,
    config: AgentConfig,
    session: Option<Arc<dyn SessionSink>>,
    observer: Option<Arc<dyn Observer>>,
    messages: Mutex<Vec<Message>>,
}

impl<E: ExecutorRef> Agent<E> {
    pub fn new(
        provider: Provider,
        executor: E,
        gate: Arc<dyn Gate>,
        config: AgentConfig,
        session: Option<Arc<dyn SessionSink>>,
        observer: Option<Arc<dyn Observer>>,
    ) -> Self {
        Self {
            provider,
            executor,
            gate,
            config,
            session,
            observer,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Seed conversation state from a resumed session's message log.
    /// Tool records are skipped: the transcript keeps user/assistant turns
    /// only, which is enough context to continue.
    pub async fn preload(&self, records: &[crate::session::MessageRecord]) {
        let mut messages = self.messages.lock().await;
        for record in records {
            match record.role.as_str() {
                "user" => messages.push(Message::user_text(&record.content)),
                "assistant" => messages.push(Message::assistant_text(&record.content)),
                _ => {}
            }
        }
        info!(turns = messages.len(), "conversation preloaded from session");
    }

    /// Handle one user prompt with a full agent run.
    pub async fn handle(&self, input: &str) -> Result<AgentRunOutput, AgentError> {
        let mut messages = self.messages.lock().await;
        run_agent(
            &self.provider,
            &self.executor,
            self.gate.as_ref(),
            &mut messages,
            input,
            RunOptions {
                system: &self.config.system_prompt,
                max_iterations: self.config.max_iterations,
                session: self.session.as_deref(),
                observer: self.observer.as_deref(),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::NoGate;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// Mock brain replaying scripted responses, last first.
    struct MockBrain {
        responses: RwLock<Vec<MessageResponse>>,
    }

    impl MockBrain {
        fn new(mut responses: Vec<MessageResponse>) -> Self {
            responses.reverse();
            Self {
                responses: RwLock::new(responses),
            }
        }
    }

    #[async_trait::async_trait]
    impl BrainRef for MockBrain {
        async fn infer(&self, _request: MessageRequest) -> Result<MessageResponse, String> {
            self.responses
                .write()
                .unwrap()
                .pop()
                .ok_or_else(|| "no more scripted responses".to_string())
        }

        fn model(&self) -> &str {
            "test-model"
        }

        fn max_output_tokens(&self) -> u32 {
            4096
        }

        fn temperature(&self) -> Option<f32> {
            None
        }
    }

    /// Mock executor returning scripted results and recording call order.
    struct MockExecutor {
        results: RwLock<Vec<Result<ToolOutput, String>>>,
        calls: RwLock<Vec<String>>,
    }

    impl MockExecutor {
        fn new(mut results: Vec<Result<ToolOutput, String>>) -> Self {
            results.reverse();
            Self {
                results: RwLock::new(results),
                calls: RwLock::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ExecutorRef for MockExecutor {
        async fn execute(
            &self,
            tool_name: &str,
            _input: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolOutput, String> {
            self.calls.write().unwrap().push(tool_name.to_string());
            self.results
                .write()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(ToolOutput::success("default")))
        }

        fn tool_definitions(&self) -> Vec<ToolDefinition> {
            vec![]
        }
    }

    fn done_response(summary: &str) -> MessageResponse {
        tool_use_response(vec![(DONE_TOOL, json!({"summary": summary}))])
    }

    fn tool_use_response(calls: Vec<(&str, serde_json::Value)>) -> MessageResponse {
        let content = calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, input))| ContentBlock::ToolUse {
                id: format!("call-{}", i),
                name: name.to_string(),
                input,
            })
            .collect();
        MessageResponse {
            id: "resp".to_string(),
            content,
            model: "test".to_string(),
            role: Role::Assistant,
            stop_reason: Some(crate::provider::StopReason::ToolUse),
            usage: Some(Usage {
                input_tokens: 10,
                output_tokens: 5,
            }),
            extra: HashMap::new(),
        }
    }

    fn text_response(text: &str) -> MessageResponse {
        MessageResponse {
            id: "resp".to_string(),
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
            model: "test".to_string(),
            role: Role::Assistant,
            stop_reason: Some(crate::provider::StopReason::EndTurn),
            usage: None,
            extra: HashMap::new(),
        }
    }

    fn opts(max_iterations: u32) -> RunOptions<'static> {
        RunOptions {
            system: "You are a test agent.",
            max_iterations,
            session: None,
            observer: None,
        }
    }

    #[tokio::test]
    async fn test_done_on_first_iteration() {
        let brain = MockBrain::new(vec![done_response("all finished")]);
        let executor = MockExecutor::new(vec![]);
        let mut messages = Vec::new();

        let output = run_agent(&brain, &executor, &NoGate, &mut messages, "hi", opts(25))
            .await
            .unwrap();

        assert_eq!(output.text, "all finished");
        assert_eq!(output.iterations, 1);
        assert_eq!(output.usage.unwrap().total(), 15);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_terminates() {
        // Model never calls done.
        let responses = (0..30)
            .map(|_| tool_use_response(vec![("shell", json!({"command": "ls"}))]))
            .collect();
        let brain = MockBrain::new(responses);
        let executor = MockExecutor::new(vec![]);
        let mut messages = Vec::new();

        let result = run_agent(&brain, &executor, &NoGate, &mut messages, "go", opts(5)).await;

        assert!(matches!(result, Err(AgentError::BudgetExhausted { max: 5 })));
        // Exactly five dispatches happened.
        assert_eq!(executor.calls.read().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_empty_turn_counts_but_continues() {
        let brain = MockBrain::new(vec![
            text_response("thinking out loud"),
            done_response("ok"),
        ]);
        let executor = MockExecutor::new(vec![]);
        let mut messages = Vec::new();

        let output = run_agent(&brain, &executor, &NoGate, &mut messages, "hi", opts(25))
            .await
            .unwrap();
        assert_eq!(output.iterations, 2);
    }

    #[tokio::test]
    async fn test_tool_results_feed_back_in_order() {
        let brain = MockBrain::new(vec![
            tool_use_response(vec![
                ("fs", json!({"action": "read", "path": "a"})),
                ("shell", json!({"command": "ls"})),
            ]),
            done_response("ok"),
        ]);
        let executor = MockExecutor::new(vec![
            Ok(ToolOutput::success("first result")),
            Ok(ToolOutput::success("second result")),
        ]);
        let mut messages = Vec::new();

        run_agent(&brain, &executor, &NoGate, &mut messages, "go", opts(25))
            .await
            .unwrap();

        assert_eq!(*executor.calls.read().unwrap(), vec!["fs", "shell"]);
        // user, assistant(tool_use), 2 tool results, assistant(done),
        // done tool_result
        assert_eq!(messages.len(), 6);
        let ContentBlock::ToolResult { content, .. } = &messages[2].content[0] else {
            panic!("expected tool result");
        };
        assert_eq!(content, "first result");
    }

    #[tokio::test]
    async fn test_tool_internal_failure_becomes_error_result() {
        let brain = MockBrain::new(vec![
            tool_use_response(vec![("shell", json!({"command": "x"}))]),
            done_response("recovered"),
        ]);
        let executor = MockExecutor::new(vec![Err("tool exploded".to_string())]);
        let mut messages = Vec::new();

        let output = run_agent(&brain, &executor, &NoGate, &mut messages, "go", opts(25))
            .await
            .unwrap();

        assert_eq!(output.text, "recovered");
        let ContentBlock::ToolResult { content, is_error, .. } = &messages[2].content[0] else {
            panic!("expected tool result");
        };
        assert!(content.contains("tool exploded"));
        assert_eq!(*is_error, Some(true));
    }

    #[tokio::test]
    async fn test_policy_denial_feeds_back_without_executing() {
        struct DenyAll;
        impl Gate for DenyAll {
            fn should_execute(
                &self,
                tool_name: &str,
                _input: &serde_json::Value,
            ) -> ExecutionDecision {
                ExecutionDecision::Deny(format!("User denied execution of '{}'", tool_name))
            }
        }

        let brain = MockBrain::new(vec![
            tool_use_response(vec![("shell", json!({"command": "rm -rf /"}))]),
            done_response("adapted"),
        ]);
        let executor = MockExecutor::new(vec![]);
        let mut messages = Vec::new();

        let output = run_agent(&brain, &executor, &DenyAll, &mut messages, "go", opts(25))
            .await
            .unwrap();

        assert_eq!(output.text, "adapted");
        // The tool was never dispatched.
        assert!(executor.calls.read().unwrap().is_empty());
        let ContentBlock::ToolResult { content, .. } = &messages[2].content[0] else {
            panic!("expected tool result");
        };
        assert!(content.contains("User denied execution of 'shell'"));
    }

    #[tokio::test]
    async fn test_inference_failure_propagates() {
        let brain = MockBrain::new(vec![]);
        let executor = MockExecutor::new(vec![]);
        let mut messages = Vec::new();

        let result = run_agent(&brain, &executor, &NoGate, &mut messages, "go", opts(25)).await;
        assert!(matches!(result, Err(AgentError::Inference(_))));
    }

    #[tokio::test]
    async fn test_done_without_summary_falls_back_to_text() {
        let mut response = tool_use_response(vec![(DONE_TOOL, json!({}))]);
        response.content.insert(
            0,
            ContentBlock::Text {
                text: "implicit summary".to_string(),
            },
        );
        let brain = MockBrain::new(vec![response]);
        let executor = MockExecutor::new(vec![]);
        let mut messages = Vec::new();

        let output = run_agent(&brain, &executor, &NoGate, &mut messages, "go", opts(25))
            .await
            .unwrap();
        assert_eq!(output.text, "implicit summary");
    }

    #[tokio::test]
    async fn test_calls_after_done_are_ignored() {
        let brain = MockBrain::new(vec![tool_use_response(vec![
            (DONE_TOOL, json!({"summary": "stop here"})),
            ("shell", json!({"command": "ls"})),
        ])]);
        let executor = MockExecutor::new(vec![]);
        let mut messages = Vec::new();

        let output = run_agent(&brain, &executor, &NoGate, &mut messages, "go", opts(25))
            .await
            .unwrap();
        assert_eq!(output.text, "stop here");
        assert!(executor.calls.read().unwrap().is_empty());

        // The skipped call still gets a result so the turn stays answered.
        let results: Vec<_> = messages
            .iter()
            .flat_map(|m| &m.content)
            .filter_map(|block| match block {
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => Some((tool_use_id.as_str(), content.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 2);
        assert!(results[1].1.contains("Skipped"));
    }

    #[tokio::test]
    async fn test_done_turn_leaves_no_unanswered_tool_use() {
        let brain = MockBrain::new(vec![
            tool_use_response(vec![("fs", json!({"action": "read", "path": "a"}))]),
            tool_use_response(vec![
                (DONE_TOOL, json!({"summary": "wrapped up"})),
                ("shell", json!({"command": "ls"})),
            ]),
        ]);
        let executor = MockExecutor::new(vec![Ok(ToolOutput::success("contents"))]);
        let mut messages = Vec::new();

        run_agent(&brain, &executor, &NoGate, &mut messages, "go", opts(25))
            .await
            .unwrap();

        // Continuing the same conversation requires a tool_result for every
        // tool_use, including the done call and anything after it.
        let use_ids: Vec<&str> = messages
            .iter()
            .flat_map(|m| &m.content)
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        let result_ids: Vec<&str> = messages
            .iter()
            .flat_map(|m| &m.content)
            .filter_map(|block| match block {
                ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect();

        assert!(!use_ids.is_empty());
        for id in use_ids {
            assert!(result_ids.contains(&id), "tool_use {} has no result", id);
        }
    }
}
