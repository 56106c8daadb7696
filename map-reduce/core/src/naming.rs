// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Stream identities.
//!
//! Safety across concurrent invocations rests entirely on these names being
//! injective: each (job, map task, reduce task) shard has one writer and one
//! reader, each (job, reduce task) output has one writer.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for the naming capability injected into partitioners and mergers
/// Implementations must be pure functions of their arguments
pub trait StreamNaming: Send + Sync {
    /// Shard written by `map_task` for `reduce_task`
    fn shard_name(&self, job: &str, map_task: usize, reduce_task: usize) -> StreamId;

    /// Merged output of `reduce_task`
    fn merged_name(&self, job: &str, reduce_task: usize) -> StreamId;

    /// Whole-job output assembled from every merged output
    fn final_name(&self, job: &str) -> StreamId {
        StreamId::new(format!("{}.final", job))
    }
}

/// The `mrtmp.` naming scheme
#[derive(Debug, Clone, Copy, Default)]
pub struct LabNaming;

impl StreamNaming for LabNaming {
    fn shard_name(&self, job: &str, map_task: usize, reduce_task: usize) -> StreamId {
        StreamId::new(format!("mrtmp.{}-{}-{}", job, map_task, reduce_task))
    }

    fn merged_name(&self, job: &str, reduce_task: usize) -> StreamId {
        StreamId::new(format!("mrtmp.{}-res-{}", job, reduce_task))
    }

    fn final_name(&self, job: &str) -> StreamId {
        StreamId::new(format!("mrtmp.{}", job))
    }
}
