//! Sandboxed evaluator
//!
//! Wraps another evaluator and runs every evaluation on its own tokio task
//! against a deep copy of the context:
//!
//! ```text
//! evaluate(expr, ctx)
//!   ├─ serialized size > limit ──► ContextTooLarge
//!   ├─ spawn(inner.evaluate(expr, ctx.clone()))
//!   └─ timeout(duration)
//!        ├─ finished ──► result
//!        ├─ panicked ──► Task
//!        └─ elapsed  ──► abort task, Timeout
//! ```
//!
//! The inner evaluator never sees the caller's context, so it cannot keep a
//! reference to it past the call.

use crate::direct::DirectEvaluator;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_CONTEXT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxOptions {
    pub timeout: Duration,
    /// Upper bound on the serialized context size
    pub max_context_bytes: usize,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_context_bytes: DEFAULT_MAX_CONTEXT_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SandboxedEvaluator<E = DirectEvaluator> {
    inner: Arc<E>,
    options: SandboxOptions,
}

impl SandboxedEvaluator<DirectEvaluator> {
    pub fn direct(options: SandboxOptions) -> Self {
        Self::new(DirectEvaluator::new(), options)
    }
}

impl<E: Evaluator + 'static> SandboxedEvaluator<E> {
    pub fn new(inner: E, options: SandboxOptions) -> Self {
        Self {
            inner: Arc::new(inner),
            options,
        }
    }

    pub fn options(&self) -> &SandboxOptions {
        &self.options
    }
}

#[async_trait]
impl<E: Evaluator + 'static> Evaluator for SandboxedEvaluator<E> {
    async fn evaluate(&self, expression: &str, context: &Value) -> EvalResult<Value> {
        let bytes = serde_json::to_vec(context).map_err(|e| EvalError::Task(e.to_string()))?;
        if bytes.len() > self.options.max_context_bytes {
            return Err(EvalError::ContextTooLarge {
                size: bytes.len(),
                limit: self.options.max_context_bytes,
            });
        }

        // Deep copy: the task owns its context outright
        let context: Value =
            serde_json::from_slice(&bytes).map_err(|e| EvalError::Task(e.to_string()))?;
        let source = expression.to_string();
        let inner = Arc::clone(&self.inner);

        let handle = tokio::spawn(async move { inner.evaluate(&source, &context).await });
        let abort = handle.abort_handle();

        match tokio::time::timeout(self.options.timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(EvalError::Task(join_error.to_string())),
            Err(_) => {
                abort.abort();
                let millis = self.options.timeout.as_millis() as u64;
                warn!(expression, timeout_ms = millis, "Expression evaluation timed out");
                Err(EvalError::Timeout(millis))
            }
        }
    }
}
