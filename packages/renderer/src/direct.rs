use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::expr::{evaluate, parse_expression};
use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

/// In-process evaluator for the bundled expression subset
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectEvaluator;

impl DirectEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous evaluation, shared by the async port
    pub fn evaluate_now(&self, expression: &str, context: &Value) -> EvalResult<Value> {
        let Value::Object(scope) = context else {
            return Err(EvalError::Type("Evaluation context must be an object".to_string()));
        };
        let expr = parse_expression(expression)?;
        let result = evaluate(&expr, scope);
        trace!(expression, ok = result.is_ok(), "Evaluated expression");
        result
    }
}

#[async_trait]
impl Evaluator for DirectEvaluator {
    async fn evaluate(&self, expression: &str, context: &Value) -> EvalResult<Value> {
        self.evaluate_now(expression, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_evaluates_against_context() {
        let evaluator = DirectEvaluator::new();
        let context = json!({ "total": 40, "tax": 2 });

        let value = evaluator.evaluate("total + tax", &context).await.unwrap();
        assert_eq!(value, json!(42));
    }

    #[tokio::test]
    async fn test_deeply_nested_expression_is_an_error() {
        let evaluator = DirectEvaluator::new();
        let source = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));

        let result = evaluator.evaluate(&source, &json!({})).await;
        assert!(matches!(result, Err(EvalError::Syntax { .. })));
    }

    #[tokio::test]
    async fn test_rejects_non_object_context() {
        let evaluator = DirectEvaluator::new();
        let result = evaluator.evaluate("1", &json!([1])).await;
        assert!(matches!(result, Err(EvalError::Type(_))));
    }
}
