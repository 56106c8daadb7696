// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::{Phase, Result, ShuffleError, StreamOp, TaskContext};
use crate::naming::StreamNaming;
use crate::record::Record;
use crate::record_codec::RecordReader;
use crate::stream_store::StreamStore;
use std::io::Write;
use tracing::info;

/// Collect the merged outputs of all `reduce_count` reduce tasks into one
/// key-sorted list.
///
/// Each key is owned by exactly one reduce task, so the result holds one
/// record per distinct key of the job.
pub fn merge_outputs(
    naming: &impl StreamNaming,
    store: &impl StreamStore,
    job: &str,
    reduce_count: usize,
) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for reduce_task in 0..reduce_count {
        let context = TaskContext::new(job, Phase::Reduce, reduce_task);
        let stream = naming.merged_name(job, reduce_task);
        let input = store.open(&stream).map_err(|source| ShuffleError::Io {
            context: context.clone(),
            op: StreamOp::Open,
            stream: stream.clone(),
            source,
        })?;
        for record in RecordReader::new(input, context, stream) {
            records.push(record?);
        }
    }
    records.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(records)
}

/// Write the job result as `key: value` lines to the job's final stream
pub fn write_final(
    naming: &impl StreamNaming,
    store: &impl StreamStore,
    job: &str,
    records: &[Record],
) -> Result<()> {
    let stream = naming.final_name(job);
    // The final merge runs after every reduce task; it has no index of its own.
    let context = TaskContext::new(job, Phase::Reduce, 0);
    let io_error = |op: StreamOp, source: std::io::Error| ShuffleError::Io {
        context: context.clone(),
        op,
        stream: stream.clone(),
        source,
    };

    let mut out = store
        .create(&stream)
        .map_err(|source| io_error(StreamOp::Create, source))?;
    for record in records {
        writeln!(out, "{}: {}", record.key, record.value)
            .map_err(|source| io_error(StreamOp::Write, source))?;
    }
    out.flush()
        .map_err(|source| io_error(StreamOp::Write, source))?;

    info!(job, stream = %stream, records = records.len(), "final output written");
    Ok(())
}
