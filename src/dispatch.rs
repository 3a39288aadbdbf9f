//! The tool-calling exchange.
//!
//! One user message produces one exchange: a first round trip with the tool
//! advertisement, then for every serviced tool call an executor run and a
//! follow-up round trip, up to `max_hops` calls. Only the first tool call of
//! a reply is serviced.

use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::api::{ChatRequest, ModelReply, RoundTripper};
use crate::config::Config;
use crate::error::{Result, ToolChatError};
use crate::models::{Message, ToolCallRequest};
use crate::tools::SharedRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeState {
    AwaitingModelReply,
    AwaitingToolResult,
    AwaitingFollowUpReply,
    Done,
    Failed,
    InputRequired,
}

#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    pub max_hops: u32,
    pub advertise_tools: bool,
    pub system_prompt: Option<String>,
    /// Deadline for each round trip.
    pub request_timeout: Option<Duration>,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            max_hops: 1,
            advertise_tools: true,
            system_prompt: None,
            request_timeout: None,
        }
    }
}

impl ExchangeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_hops: config.max_hops.max(1),
            advertise_tools: config.tools_enabled,
            system_prompt: config.system_prompt.clone(),
            request_timeout: config.request_timeout.map(Duration::from_secs),
        }
    }
}

/// A tool call that ran to completion.
#[derive(Debug, Clone, Serialize)]
pub struct ToolRun {
    pub call_id: String,
    pub tool: String,
    pub arguments: Value,
    pub result: Value,
}

/// Called after each tool run, before the follow-up round trip.
pub type ToolObserver = Arc<dyn Fn(&ToolRun) + Send + Sync>;

#[derive(Debug)]
pub enum ExchangeOutcome {
    /// The final model reply.
    Done(ModelReply),
    Failed(ToolChatError),
    /// The model called a tool whose input must come from the user.
    InputRequired(ToolCallRequest),
}

#[derive(Debug)]
pub struct ExchangeReport {
    pub outcome: ExchangeOutcome,
    pub turns: Vec<Message>,
    pub tool_runs: Vec<ToolRun>,
    pub round_trips: u32,
    pub states: Vec<ExchangeState>,
}

impl ExchangeReport {
    pub fn final_state(&self) -> ExchangeState {
        self.states
            .last()
            .copied()
            .unwrap_or(ExchangeState::AwaitingModelReply)
    }

    pub fn reply(&self) -> Option<&ModelReply> {
        match &self.outcome {
            ExchangeOutcome::Done(reply) => Some(reply),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ToolChatError> {
        match &self.outcome {
            ExchangeOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

pub struct Exchange<'a> {
    round_tripper: &'a dyn RoundTripper,
    registry: &'a SharedRegistry,
    settings: &'a ExchangeSettings,
    cancel: CancellationToken,
    observer: Option<ToolObserver>,
}

impl<'a> Exchange<'a> {
    pub fn new(
        round_tripper: &'a dyn RoundTripper,
        registry: &'a SharedRegistry,
        settings: &'a ExchangeSettings,
    ) -> Self {
        Self {
            round_tripper,
            registry,
            settings,
            cancel: CancellationToken::new(),
            observer: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_tool_observer(mut self, observer: ToolObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub async fn run(&self, user_text: &str) -> ExchangeReport {
        let mut trace = Trace::new();

        if let Some(prompt) = &self.settings.system_prompt {
            trace.turns.push(Message::system(prompt.clone()));
        }
        trace.turns.push(Message::user(user_text));

        let mut tools = if self.settings.advertise_tools {
            let advertised = self.registry.read().await.format_tools_for_llm();
            (!advertised.is_empty()).then_some(advertised)
        } else {
            None
        };
        let mut hops = 0u32;

        loop {
            let request = ChatRequest {
                messages: trace.turns.clone(),
                tools: tools.clone(),
            };
            trace.round_trips += 1;

            let reply = match self.round_trip(&request).await {
                Ok(reply) => reply,
                Err(e) => return trace.fail(e),
            };

            let call = match reply.first_tool_call() {
                Some(call) => call.clone(),
                None => return trace.done(reply),
            };

            if request.tools.is_none() {
                if !self.registry.read().await.contains(&call.function.name) {
                    return trace.fail(ToolChatError::UnknownTool(call.function.name.clone()));
                }
                tracing::warn!(
                    tool = %call.function.name,
                    hops,
                    "tool call after the hop budget was spent; not serviced"
                );
                return trace.done(reply);
            }

            if reply.tool_calls.len() > 1 {
                tracing::warn!(
                    ignored = reply.tool_calls.len() - 1,
                    "only the first tool call of a reply is serviced"
                );
            }

            trace.enter(ExchangeState::AwaitingToolResult);

            let request_call = match call.parse_arguments() {
                Ok(parsed) => parsed,
                Err(e) => {
                    return trace.fail(ToolChatError::InvalidArguments {
                        tool: call.function.name.clone(),
                        message: format!("arguments are not valid JSON: {}", e),
                    })
                }
            };

            tracing::info!(
                tool = %request_call.tool_name,
                arguments = %request_call.arguments,
                "model requested tool"
            );

            let prepared = {
                let registry = self.registry.read().await;
                match registry.get(&request_call.tool_name) {
                    None => {
                        return trace.fail(ToolChatError::UnknownTool(request_call.tool_name))
                    }
                    Some(descriptor) if descriptor.requires_interactive_input => {
                        return trace.input_required(request_call)
                    }
                    Some(_) => {}
                }
                match registry.prepare(&request_call.tool_name, request_call.arguments.clone()) {
                    Ok(prepared) => prepared,
                    Err(e) => return trace.fail(e),
                }
            };

            let result = match guard(&self.cancel, None, prepared.run(&self.cancel)).await {
                Ok(result) => result,
                Err(e) => return trace.fail(e),
            };

            let serialized = match serde_json::to_string(&result) {
                Ok(serialized) => serialized,
                Err(e) => return trace.fail(e.into()),
            };

            tracing::info!(tool = %request_call.tool_name, result = %serialized, "tool finished");

            let run = ToolRun {
                call_id: request_call.id.clone(),
                tool: request_call.tool_name.clone(),
                arguments: request_call.arguments,
                result,
            };
            if let Some(observer) = &self.observer {
                observer(&run);
            }
            trace.tool_runs.push(run);
            trace
                .turns
                .push(Message::assistant_tool_call(reply.content.clone(), call));
            trace
                .turns
                .push(Message::tool_result(request_call.id, serialized));

            hops += 1;
            if hops >= self.settings.max_hops {
                tools = None;
            }

            trace.enter(ExchangeState::AwaitingFollowUpReply);
        }
    }

    async fn round_trip(&self, request: &ChatRequest) -> Result<ModelReply> {
        guard(
            &self.cancel,
            self.settings.request_timeout,
            self.round_tripper.send(request),
        )
        .await
    }
}

/// Race `fut` against cancellation and an optional deadline.
async fn guard<T, F>(cancel: &CancellationToken, deadline: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let timed = async {
        match deadline {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(ToolChatError::Timeout),
            },
            None => fut.await,
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => Err(ToolChatError::Cancelled),
        result = timed => result,
    }
}

struct Trace {
    turns: Vec<Message>,
    tool_runs: Vec<ToolRun>,
    round_trips: u32,
    states: Vec<ExchangeState>,
}

impl Trace {
    fn new() -> Self {
        Self {
            turns: Vec::new(),
            tool_runs: Vec::new(),
            round_trips: 0,
            states: vec![ExchangeState::AwaitingModelReply],
        }
    }

    fn enter(&mut self, state: ExchangeState) {
        tracing::trace!(?state, "exchange transition");
        self.states.push(state);
    }

    fn done(mut self, reply: ModelReply) -> ExchangeReport {
        self.enter(ExchangeState::Done);
        self.turns.push(Message::assistant(reply.content_or_empty()));
        self.finish(ExchangeOutcome::Done(reply))
    }

    fn fail(mut self, error: ToolChatError) -> ExchangeReport {
        tracing::warn!(kind = error.kind(), error = %error, "exchange failed");
        self.enter(ExchangeState::Failed);
        self.finish(ExchangeOutcome::Failed(error))
    }

    fn input_required(mut self, call: ToolCallRequest) -> ExchangeReport {
        self.enter(ExchangeState::InputRequired);
        self.finish(ExchangeOutcome::InputRequired(call))
    }

    fn finish(self, outcome: ExchangeOutcome) -> ExchangeReport {
        ExchangeReport {
            outcome,
            turns: self.turns,
            tool_runs: self.tool_runs,
            round_trips: self.round_trips,
            states: self.states,
        }
    }
}
