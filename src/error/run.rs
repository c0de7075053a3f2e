use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(
        "Result sink held {drained} of {expected} expected outcomes after all workers \
reported; records were lost."
    )]
    ResultShortfall { expected: u64, drained: u64 },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
