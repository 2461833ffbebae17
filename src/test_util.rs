use anyhow::anyhow;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::providers::{Provider, ProviderFuture, ProviderResponse, ToolSpec};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub(crate) tool: String,
    pub(crate) system: Vec<String>,
    pub(crate) user: Vec<String>,
}

/// Replays queued tool arguments (or errors) in order and records every call.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<Result<Value, String>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    system: Vec<String>,
    user: Vec<String>,
    tools: Vec<String>,
}

impl ScriptedProvider {
    pub(crate) fn new(replies: Vec<Result<Value, String>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Provider for ScriptedProvider {
    fn append_system_input(mut self, input: String) -> Self {
        self.system.push(input);
        self
    }

    fn append_user_input(mut self, input: String) -> Self {
        self.user.push(input);
        self
    }

    fn register_tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool.name);
        self
    }

    fn call_tool(self, tool_name: &str) -> ProviderFuture {
        let tool_name = tool_name.to_string();
        Box::pin(async move {
            if !self.tools.contains(&tool_name) {
                return Err(anyhow!("tool '{}' not registered", tool_name));
            }
            self.calls.lock().expect("calls lock").push(RecordedCall {
                tool: tool_name,
                system: self.system.clone(),
                user: self.user.clone(),
            });
            let reply = self
                .replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .unwrap_or_else(|| Err("no scripted reply left".to_string()));
            match reply {
                Ok(args) => Ok(ProviderResponse {
                    args,
                    model: Some("scripted".to_string()),
                    usage: None,
                }),
                Err(message) => Err(anyhow!(message)),
            }
        })
    }
}
