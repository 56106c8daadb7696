// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Shuffle protocol of a MapReduce job.
//!
//! The [`Partitioner`] routes the output of one map task into one shard per
//! reduce task. The [`ShuffleMerger`] reads every shard addressed to one
//! reduce task, groups the values by key and writes one merged output in
//! ascending key order. Both are synchronous, stateless invocations; the
//! scheduling around them belongs to the caller.

mod callbacks;
pub use callbacks::{CallbackError, MapFunction, ReduceFunction};

mod config;
pub use config::{ConfigError, JobConfig};

mod error;
pub use error::{Phase, Result, ShuffleError, StreamOp, TaskContext};

mod final_merge;
pub use final_merge::{merge_outputs, write_final};

pub mod key_hash;
pub use key_hash::{fnv1a_32, partition_for};

mod merger;
pub use merger::{CleanupPolicy, ReduceOutcome, ReduceTask, ShuffleMerger};

pub mod naming;
pub use naming::{LabNaming, StreamId, StreamNaming};

mod partitioner;
pub use partitioner::{MapOutcome, MapTask, Partitioner};

mod record;
pub use record::Record;

pub mod record_codec;
pub use record_codec::{RecordReader, RecordWriter};

pub mod stream_store;
pub use stream_store::{FileStreamStore, InMemoryStreamStore, StreamStore};
