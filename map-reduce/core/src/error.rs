// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::callbacks::CallbackError;
use crate::naming::StreamId;
use std::fmt;
use thiserror::Error;

/// Which side of the shuffle an invocation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Map,
    Reduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Map => write!(f, "map"),
            Phase::Reduce => write!(f, "reduce"),
        }
    }
}

/// Identifies the invocation that failed, so a scheduler can re-run it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub job: String,
    pub phase: Phase,
    pub task: usize,
}

impl TaskContext {
    pub fn new(job: impl Into<String>, phase: Phase, task: usize) -> Self {
        Self {
            job: job.into(),
            phase,
            task,
        }
    }
}

impl fmt::Display for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job '{}' {} task {}", self.job, self.phase, self.task)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOp {
    Create,
    Open,
    Read,
    Write,
    Remove,
}

impl fmt::Display for StreamOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            StreamOp::Create => "create",
            StreamOp::Open => "open",
            StreamOp::Read => "read",
            StreamOp::Write => "write",
            StreamOp::Remove => "remove",
        };
        write!(f, "{}", op)
    }
}

/// Why a partitioner or merger invocation aborted.
///
/// Every variant is fatal for the invocation that produced it. Outputs of an
/// aborted invocation must be treated as invalid and the whole task redone.
#[derive(Debug, Error)]
pub enum ShuffleError {
    #[error("{context}: invalid task: {reason}")]
    InvalidTask {
        context: TaskContext,
        reason: String,
    },

    #[error("{context}: failed to {op} stream {stream}: {source}")]
    Io {
        context: TaskContext,
        op: StreamOp,
        stream: StreamId,
        #[source]
        source: std::io::Error,
    },

    /// A malformed record was found before a clean end of stream
    #[error("{context}: malformed record in stream {stream}: {source}")]
    Decode {
        context: TaskContext,
        stream: StreamId,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: failed to encode record for stream {stream}: {source}")]
    Encode {
        context: TaskContext,
        stream: StreamId,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: map callback failed on unit '{unit}': {source}")]
    MapCallback {
        context: TaskContext,
        unit: String,
        #[source]
        source: CallbackError,
    },

    #[error("{context}: reduce callback failed on key '{key}': {source}")]
    ReduceCallback {
        context: TaskContext,
        key: String,
        #[source]
        source: CallbackError,
    },
}

impl ShuffleError {
    pub fn context(&self) -> &TaskContext {
        match self {
            ShuffleError::InvalidTask { context, .. }
            | ShuffleError::Io { context, .. }
            | ShuffleError::Decode { context, .. }
            | ShuffleError::Encode { context, .. }
            | ShuffleError::MapCallback { context, .. }
            | ShuffleError::ReduceCallback { context, .. } => context,
        }
    }

    /// The stream involved in the failure, if the failure was tied to one
    pub fn stream(&self) -> Option<&StreamId> {
        match self {
            ShuffleError::Io { stream, .. }
            | ShuffleError::Decode { stream, .. }
            | ShuffleError::Encode { stream, .. } => Some(stream),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShuffleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_names_task_and_stream() {
        let err = ShuffleError::Io {
            context: TaskContext::new("wc", Phase::Reduce, 3),
            op: StreamOp::Open,
            stream: StreamId::new("mrtmp.wc-1-3"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(
            err.to_string(),
            "job 'wc' reduce task 3: failed to open stream mrtmp.wc-1-3: no such file"
        );
        assert_eq!(err.stream().map(StreamId::as_str), Some("mrtmp.wc-1-3"));
        assert_eq!(err.context().task, 3);
    }

    #[test]
    fn test_callback_error_has_no_stream() {
        let err = ShuffleError::ReduceCallback {
            context: TaskContext::new("wc", Phase::Reduce, 0),
            key: "a".to_string(),
            source: "not a number".into(),
        };
        assert!(err.stream().is_none());
        assert!(err.to_string().contains("key 'a'"));
    }
}
