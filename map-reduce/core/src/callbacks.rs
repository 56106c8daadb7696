// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::record::Record;

/// Error type returned by user-supplied map and reduce code
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// User map callback: turns one input unit into records.
/// The output is unordered, may be empty, and may repeat keys.
pub trait MapFunction: Send + Sync {
    fn map(&self, unit: &str, content: &str) -> Result<Vec<Record>, CallbackError>;
}

impl<F> MapFunction for F
where
    F: Fn(&str, &str) -> Result<Vec<Record>, CallbackError> + Send + Sync,
{
    fn map(&self, unit: &str, content: &str) -> Result<Vec<Record>, CallbackError> {
        (self)(unit, content)
    }
}

/// User reduce callback: folds every value of one key into a single value
pub trait ReduceFunction: Send + Sync {
    fn reduce(&self, key: &str, values: &[String]) -> Result<String, CallbackError>;
}

impl<F> ReduceFunction for F
where
    F: Fn(&str, &[String]) -> Result<String, CallbackError> + Send + Sync,
{
    fn reduce(&self, key: &str, values: &[String]) -> Result<String, CallbackError> {
        (self)(key, values)
    }
}
