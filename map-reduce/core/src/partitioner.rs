// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::callbacks::MapFunction;
use crate::error::{Phase, Result, ShuffleError, StreamOp, TaskContext};
use crate::key_hash::partition_for;
use crate::naming::{StreamId, StreamNaming};
use crate::record_codec::RecordWriter;
use crate::stream_store::StreamStore;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Work assignment for one partitioner invocation
#[derive(Debug, Clone)]
pub struct MapTask {
    pub job: String,
    pub task: usize,
    /// Name of the input unit, passed through to the map callback
    pub unit: String,
    pub reduce_count: usize,
}

impl MapTask {
    pub fn context(&self) -> TaskContext {
        TaskContext::new(self.job.clone(), Phase::Map, self.task)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapOutcome {
    /// Number of records routed to each reduce task, indexed by reduce task
    pub records_per_shard: Vec<usize>,
}

impl MapOutcome {
    pub fn total(&self) -> usize {
        self.records_per_shard.iter().sum()
    }
}

/// Map side of the shuffle: splits one map task's output into one shard per
/// reduce task.
pub struct Partitioner<N: StreamNaming, S: StreamStore> {
    naming: N,
    store: S,
}

impl<N: StreamNaming, S: StreamStore> Partitioner<N, S> {
    pub fn new(naming: N, store: S) -> Self {
        Self { naming, store }
    }

    /// Read the input unit from `path` and partition it
    pub fn run_input(
        &self,
        task: &MapTask,
        path: &Path,
        map_fn: &impl MapFunction,
    ) -> Result<MapOutcome> {
        let content = std::fs::read_to_string(path).map_err(|source| ShuffleError::Io {
            context: task.context(),
            op: StreamOp::Read,
            stream: StreamId::new(path.display().to_string()),
            source,
        })?;
        self.run(task, &content, map_fn)
    }

    /// Run the map callback once over `content` and write its records to
    /// `reduce_count` shards.
    ///
    /// Every shard is created, including the ones that receive no record.
    /// Within a shard records keep the order the callback emitted them in.
    pub fn run(
        &self,
        task: &MapTask,
        content: &str,
        map_fn: &impl MapFunction,
    ) -> Result<MapOutcome> {
        let context = task.context();
        if task.reduce_count == 0 {
            return Err(ShuffleError::InvalidTask {
                context,
                reason: "reduce count must be positive".to_string(),
            });
        }

        let records =
            map_fn
                .map(&task.unit, content)
                .map_err(|source| ShuffleError::MapCallback {
                    context: context.clone(),
                    unit: task.unit.clone(),
                    source,
                })?;
        debug!(
            job = %task.job,
            task = task.task,
            unit = %task.unit,
            records = records.len(),
            "map callback returned"
        );

        let mut writers: Vec<RecordWriter<Box<dyn Write + Send>>> =
            Vec::with_capacity(task.reduce_count);
        for reduce_task in 0..task.reduce_count {
            let stream = self.naming.shard_name(&task.job, task.task, reduce_task);
            let file = self
                .store
                .create(&stream)
                .map_err(|source| ShuffleError::Io {
                    context: context.clone(),
                    op: StreamOp::Create,
                    stream: stream.clone(),
                    source,
                })?;
            writers.push(RecordWriter::new(file, context.clone(), stream));
        }

        for record in &records {
            let shard = partition_for(&record.key, task.reduce_count);
            writers[shard].write(record)?;
        }

        let mut records_per_shard = Vec::with_capacity(writers.len());
        for writer in writers {
            let written = writer.written();
            let stream = writer.stream().clone();
            writer.finish()?;
            debug!(job = %task.job, task = task.task, stream = %stream, written, "shard closed");
            records_per_shard.push(written);
        }

        let outcome = MapOutcome { records_per_shard };
        info!(
            job = %task.job,
            task = task.task,
            records = outcome.total(),
            shards = task.reduce_count,
            "map task partitioned"
        );
        Ok(outcome)
    }
}
