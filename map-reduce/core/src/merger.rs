// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::callbacks::ReduceFunction;
use crate::error::{Phase, Result, ShuffleError, StreamOp, TaskContext};
use crate::naming::{StreamId, StreamNaming};
use crate::record::Record;
use crate::record_codec::{RecordReader, RecordWriter};
use crate::stream_store::StreamStore;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// What happens to the input shards once a merged output is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Shards stay in place for replay and debugging
    #[default]
    Retain,
    /// Shards are removed after the merged output has been flushed
    RemoveShards,
}

/// Work assignment for one merger invocation
#[derive(Debug, Clone)]
pub struct ReduceTask {
    pub job: String,
    pub task: usize,
    pub map_count: usize,
}

impl ReduceTask {
    pub fn context(&self) -> TaskContext {
        TaskContext::new(self.job.clone(), Phase::Reduce, self.task)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceOutcome {
    /// Distinct keys written, which is also the number of output records
    pub keys: usize,
    /// Records decoded across every input shard
    pub records_read: usize,
}

/// Reduce side of the shuffle: groups every shard addressed to one reduce
/// task by key and writes the reduced values in ascending key order.
pub struct ShuffleMerger<N: StreamNaming, S: StreamStore> {
    naming: N,
    store: S,
    cleanup: CleanupPolicy,
}

impl<N: StreamNaming, S: StreamStore> ShuffleMerger<N, S> {
    pub fn new(naming: N, store: S) -> Self {
        Self {
            naming,
            store,
            cleanup: CleanupPolicy::default(),
        }
    }

    pub fn with_cleanup(mut self, cleanup: CleanupPolicy) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Merge the shards of `task` and write its merged output.
    ///
    /// Nothing is written until every shard has been decoded and every key
    /// reduced, so a missing shard, a malformed record or a failing callback
    /// leaves no merged output behind.
    pub fn run(
        &self,
        task: &ReduceTask,
        reduce_fn: &impl ReduceFunction,
    ) -> Result<ReduceOutcome> {
        let context = task.context();
        if task.map_count == 0 {
            return Err(ShuffleError::InvalidTask {
                context,
                reason: "map count must be positive".to_string(),
            });
        }

        let (groups, records_read) = self.group(task, &context)?;

        let mut output = Vec::with_capacity(groups.len());
        for (key, values) in groups {
            let value =
                reduce_fn
                    .reduce(&key, &values)
                    .map_err(|source| ShuffleError::ReduceCallback {
                        context: context.clone(),
                        key: key.clone(),
                        source,
                    })?;
            output.push(Record { key, value });
        }

        let merged = self.naming.merged_name(&task.job, task.task);
        if let Err(e) = self.write_output(&merged, &context, &output) {
            if self.store.exists(&merged) {
                if let Err(remove_err) = self.store.remove(&merged) {
                    warn!(
                        stream = %merged,
                        error = %remove_err,
                        "failed to remove partial merged output"
                    );
                }
            }
            return Err(e);
        }

        if self.cleanup == CleanupPolicy::RemoveShards {
            self.remove_shards(task);
        }

        let outcome = ReduceOutcome {
            keys: output.len(),
            records_read,
        };
        info!(
            job = %task.job,
            task = task.task,
            keys = outcome.keys,
            records = outcome.records_read,
            stream = %merged,
            "reduce task merged"
        );
        Ok(outcome)
    }

    /// Values per key, in map task order then stream order. The map keeps
    /// keys sorted and distinct.
    fn group(
        &self,
        task: &ReduceTask,
        context: &TaskContext,
    ) -> Result<(BTreeMap<String, Vec<String>>, usize)> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut records_read = 0;

        for map_task in 0..task.map_count {
            let stream = self.naming.shard_name(&task.job, map_task, task.task);
            let input = self.store.open(&stream).map_err(|source| ShuffleError::Io {
                context: context.clone(),
                op: StreamOp::Open,
                stream: stream.clone(),
                source,
            })?;

            let mut from_shard = 0;
            for record in RecordReader::new(input, context.clone(), stream.clone()) {
                let Record { key, value } = record?;
                groups.entry(key).or_default().push(value);
                from_shard += 1;
            }
            debug!(
                job = %task.job,
                task = task.task,
                stream = %stream,
                records = from_shard,
                "shard decoded"
            );
            records_read += from_shard;
        }

        Ok((groups, records_read))
    }

    fn write_output(
        &self,
        merged: &StreamId,
        context: &TaskContext,
        output: &[Record],
    ) -> Result<()> {
        let file = self.store.create(merged).map_err(|source| ShuffleError::Io {
            context: context.clone(),
            op: StreamOp::Create,
            stream: merged.clone(),
            source,
        })?;
        let mut writer = RecordWriter::new(file, context.clone(), merged.clone());
        for record in output {
            writer.write(record)?;
        }
        writer.finish()?;
        Ok(())
    }

    /// The merged output is already durable here, so a shard that cannot be
    /// removed is only reported.
    fn remove_shards(&self, task: &ReduceTask) {
        for map_task in 0..task.map_count {
            let stream = self.naming.shard_name(&task.job, map_task, task.task);
            match self.store.remove(&stream) {
                Ok(()) => debug!(stream = %stream, "shard removed"),
                Err(e) => warn!(stream = %stream, error = %e, "failed to remove shard"),
            }
        }
    }
}
