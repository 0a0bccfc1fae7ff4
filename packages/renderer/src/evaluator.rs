//! Evaluator port
//!
//! Expressions are opaque strings; the renderer hands each one, together with
//! the current data context, to an [`Evaluator`]. Two implementations ship
//! with the crate: [`crate::DirectEvaluator`] (in-process) and
//! [`crate::SandboxedEvaluator`] (own task, timeout, context size limit).

use crate::error::EvalResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate `expression` against `context` (a JSON object)
    async fn evaluate(&self, expression: &str, context: &Value) -> EvalResult<Value>;
}

#[async_trait]
impl<E: Evaluator + ?Sized> Evaluator for Arc<E> {
    async fn evaluate(&self, expression: &str, context: &Value) -> EvalResult<Value> {
        (**self).evaluate(expression, context).await
    }
}

#[async_trait]
impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    async fn evaluate(&self, expression: &str, context: &Value) -> EvalResult<Value> {
        (**self).evaluate(expression, context).await
    }
}
