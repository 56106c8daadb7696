// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Record stream encoding: one JSON object per record, newline separated.
//!
//! A reader reports a clean end of stream as `None`. A truncated or
//! malformed record is always an error, so a damaged shard is never taken
//! for an empty one.

use crate::error::{Result, ShuffleError, StreamOp, TaskContext};
use crate::naming::StreamId;
use crate::record::Record;
use serde_json::de::IoRead;
use serde_json::StreamDeserializer;
use std::io::{Read, Write};

pub struct RecordWriter<W: Write> {
    inner: W,
    context: TaskContext,
    stream: StreamId,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W, context: TaskContext, stream: StreamId) -> Self {
        Self {
            inner,
            context,
            stream,
            written: 0,
        }
    }

    pub fn write(&mut self, record: &Record) -> Result<()> {
        let mut line = serde_json::to_vec(record).map_err(|source| ShuffleError::Encode {
            context: self.context.clone(),
            stream: self.stream.clone(),
            source,
        })?;
        line.push(b'\n');
        self.inner
            .write_all(&line)
            .map_err(|source| self.io_error(source))?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    /// Flush everything written so far and hand back the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush().map_err(|source| self.io_error(source))?;
        Ok(self.inner)
    }

    fn io_error(&self, source: std::io::Error) -> ShuffleError {
        ShuffleError::Io {
            context: self.context.clone(),
            op: StreamOp::Write,
            stream: self.stream.clone(),
            source,
        }
    }
}

pub struct RecordReader<R: Read> {
    records: StreamDeserializer<'static, IoRead<R>, Record>,
    context: TaskContext,
    stream: StreamId,
    failed: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R, context: TaskContext, stream: StreamId) -> Self {
        Self {
            records: serde_json::Deserializer::from_reader(inner).into_iter::<Record>(),
            context,
            stream,
            failed: false,
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.records.next()?;
        Some(item.map_err(|source| {
            self.failed = true;
            if source.is_io() {
                ShuffleError::Io {
                    context: self.context.clone(),
                    op: StreamOp::Read,
                    stream: self.stream.clone(),
                    source: source.into(),
                }
            } else {
                ShuffleError::Decode {
                    context: self.context.clone(),
                    stream: self.stream.clone(),
                    source,
                }
            }
        }))
    }
}
