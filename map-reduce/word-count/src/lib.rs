// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Word count, the canonical MapReduce job.

use map_reduce_shuffle::{CallbackError, Record};

/// Emit `(word, "1")` for every word of `content`, in order.
/// A word is a maximal run of letters.
pub fn map(_unit: &str, content: &str) -> Result<Vec<Record>, CallbackError> {
    Ok(content
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
        .map(|word| Record::new(word, "1"))
        .collect())
}

/// Sum the counts of one word
pub fn reduce(key: &str, values: &[String]) -> Result<String, CallbackError> {
    let mut total: u64 = 0;
    for value in values {
        let count: u64 = value
            .parse()
            .map_err(|e| format!("count '{}' for '{}' is not a number: {}", value, key, e))?;
        total += count;
    }
    Ok(total.to_string())
}
