//! Assertion types and builders for verifying step outcomes.

use overlay_core::{Operation, Record, Value};
use overlay_transaction::{Transaction, TransactionResult};

use crate::error::{ScenarioError, ScenarioResult};

/// Expectations checked after a step runs.
#[derive(Debug, Default)]
pub struct Assertion {
    // State assertions
    pub record: Option<Record>,
    pub fields: Vec<(String, Option<Value>)>,
    pub pending: Option<bool>,

    // Log assertions
    pub operations: Option<Vec<Operation>>,
    pub log_len: Option<usize>,

    // Error assertions
    pub error: Option<String>,
}

impl Assertion {
    /// Create a new empty assertion.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify the assertion against a step result and the transaction after it.
    ///
    /// State checks still run when an expected error occurred, so a test can
    /// pin down what a failed step left behind.
    pub fn verify(
        &self,
        step: &str,
        transaction: &Transaction,
        result: TransactionResult<()>,
    ) -> ScenarioResult<()> {
        match (&self.error, result) {
            (Some(expected), Err(error)) if error.to_string().contains(expected.as_str()) => {}
            (Some(expected), Err(error)) => {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected error containing '{}', got: {}", expected, error),
                ))
            }
            (Some(expected), Ok(())) => {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected error containing '{}', but step succeeded", expected),
                ))
            }
            (None, result) => result.map_err(|e| ScenarioError::step_failed(step, e))?,
        }

        self.verify_state(step, transaction)?;
        self.verify_log(step, transaction)
    }

    fn verify_state(&self, step: &str, transaction: &Transaction) -> ScenarioResult<()> {
        if let Some(ref expected) = self.record {
            let actual = transaction.record();
            if &actual != expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected record {:?}, got {:?}", expected, actual),
                ));
            }
        }

        if !self.fields.is_empty() {
            let merged = transaction.view().to_record();
            for (name, expected) in &self.fields {
                let actual = merged.get(name);
                if actual != expected.as_ref() {
                    return Err(ScenarioError::assertion_failed(
                        step,
                        format!("expected view field '{}' = {:?}, got {:?}", name, expected, actual),
                    ));
                }
            }
        }

        if let Some(expected) = self.pending {
            let actual = transaction.has_changes();
            if actual != expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!(
                        "expected pending changes: {}, got {} ({:?})",
                        expected,
                        actual,
                        transaction.delta()
                    ),
                ));
            }
        }

        Ok(())
    }

    fn verify_log(&self, step: &str, transaction: &Transaction) -> ScenarioResult<()> {
        let operations = transaction.operations();

        if let Some(ref expected) = self.operations {
            if &operations != expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected operations {:?}, got {:?}", expected, operations),
                ));
            }
        }

        if let Some(expected) = self.log_len {
            if operations.len() != expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected {} log entries, got {}", expected, operations.len()),
                ));
            }
        }

        Ok(())
    }
}

/// Fluent builder for assertions.
#[derive(Debug, Default)]
pub struct AssertionBuilder {
    assertion: Assertion,
}

impl AssertionBuilder {
    /// Create a new assertion builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the assertion.
    pub fn build(self) -> Assertion {
        self.assertion
    }

    // ========== State assertions ==========

    /// Assert the base record, ignoring pending changes.
    pub fn record(mut self, expected: Record) -> Self {
        self.assertion.record = Some(expected);
        self
    }

    /// Assert a field's value through the merged view.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assertion.fields.push((name.into(), Some(value.into())));
        self
    }

    /// Assert a field is not visible through the merged view.
    pub fn absent(mut self, name: impl Into<String>) -> Self {
        self.assertion.fields.push((name.into(), None));
        self
    }

    /// Assert whether anything is pending.
    pub fn pending(mut self, pending: bool) -> Self {
        self.assertion.pending = Some(pending);
        self
    }

    // ========== Log assertions ==========

    /// Assert the exact sequence of logged operations.
    pub fn operations(mut self, expected: impl Into<Vec<Operation>>) -> Self {
        self.assertion.operations = Some(expected.into());
        self
    }

    /// Assert the number of log entries.
    pub fn log_len(mut self, n: usize) -> Self {
        self.assertion.log_len = Some(n);
        self
    }

    // ========== Error assertions ==========

    /// Assert that the step fails with an error containing `message`.
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.assertion.error = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_core::{record, shared};
    use overlay_transaction::ListenerError;

    fn transaction() -> Transaction {
        Transaction::start(shared(record! { "name" => "Marcus Aurelius" }))
    }

    #[test]
    fn test_builder_collects_expectations() {
        let assertion = AssertionBuilder::new()
            .field("name", "Marcus Aurelius")
            .absent("city")
            .pending(false)
            .log_len(1)
            .build();

        assert_eq!(assertion.fields.len(), 2);
        assert_eq!(assertion.pending, Some(false));
        assert_eq!(assertion.log_len, Some(1));
    }

    #[test]
    fn test_field_mismatch_reported() {
        // GIVEN
        let transaction = transaction();
        let assertion = AssertionBuilder::new().field("name", "Mao Zedong").build();

        // WHEN
        let result = assertion.verify("read", &transaction, Ok(()));

        // THEN
        let message = result.unwrap_err().to_string();
        assert!(message.contains("view field 'name'"), "{}", message);
    }

    #[test]
    fn test_unexpected_step_error() {
        // GIVEN
        let transaction = transaction();
        let assertion = AssertionBuilder::new().build();

        // WHEN
        let result = assertion.verify(
            "commit",
            &transaction,
            Err(ListenerError::new("vetoed").into()),
        );

        // THEN
        assert!(matches!(result, Err(ScenarioError::StepFailed { .. })));
    }

    #[test]
    fn test_expected_error_matches() {
        let transaction = transaction();
        let assertion = AssertionBuilder::new().error("vetoed").pending(false).build();

        let result = assertion.verify(
            "commit",
            &transaction,
            Err(ListenerError::new("vetoed").into()),
        );

        assert!(result.is_ok());
    }

    #[test]
    fn test_expected_error_missing() {
        let transaction = transaction();
        let assertion = AssertionBuilder::new().error("vetoed").build();

        let result = assertion.verify("commit", &transaction, Ok(()));

        assert!(matches!(result, Err(ScenarioError::AssertionFailed { .. })));
    }
}
