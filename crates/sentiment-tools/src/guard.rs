//! Per-run call guard for tools

use crate::{Result, Tool, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// The one call a guarded tool let through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Query the tool was invoked with, verbatim
    pub query: String,
    /// Text the tool returned
    pub output: String,
}

/// Wraps a tool so that it can be invoked at most once
///
/// Create one guard per agent run. The first call is forwarded to the inner tool;
/// every later call fails with [`ToolError::CallLimitExceeded`] without reaching it.
pub struct SingleUseTool {
    inner: Arc<dyn Tool>,
    calls: AtomicUsize,
    invocation: OnceLock<ToolInvocation>,
}

impl SingleUseTool {
    /// Guard `inner` for one run
    pub fn new(inner: Arc<dyn Tool>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            invocation: OnceLock::new(),
        }
    }

    /// Number of calls attempted so far, refused ones included
    pub fn attempts(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The successful call, if there was one
    pub fn invocation(&self) -> Option<&ToolInvocation> {
        self.invocation.get()
    }

    /// Consume the guard, keeping the successful call
    pub fn into_invocation(self) -> Option<ToolInvocation> {
        self.invocation.into_inner()
    }
}

#[async_trait]
impl Tool for SingleUseTool {
    async fn invoke(&self, query: &str) -> Result<String> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if previous > 0 {
            warn!(
                tool_name = %self.inner.name(),
                attempt = previous + 1,
                "Refusing repeated tool call"
            );
            return Err(ToolError::CallLimitExceeded {
                tool: self.inner.name().to_string(),
            });
        }

        let output = self.inner.invoke(query).await?;
        let _ = self.invocation.set(ToolInvocation {
            query: query.to_string(),
            output: output.clone(),
        });
        Ok(output)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn input_schema(&self) -> Value {
        self.inner.input_schema()
    }
}
