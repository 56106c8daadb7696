// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use anyhow::{bail, Context};
use map_reduce_shuffle::{
    merge_outputs, write_final, FileStreamStore, JobConfig, LabNaming, MapOutcome, MapTask,
    Partitioner, Phase, Record, ReduceOutcome, ReduceTask, ShuffleError, ShuffleMerger,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Orchestrator coordinates the map-reduce workflow
/// Runs every map task, waits for all of them, then runs every reduce task
pub struct Orchestrator {
    config: JobConfig,
    store: FileStreamStore,
    cancellation_token: CancellationToken,
}

impl Orchestrator {
    pub fn new(config: JobConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let store = FileStreamStore::new(&config.work_dir).with_context(|| {
            format!("failed to create work dir {}", config.work_dir.display())
        })?;
        Ok(Self {
            config,
            store,
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Returns a clone of the cancellation token for external control
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Runs the complete job and returns its key-sorted result
    pub async fn run(&self) -> anyhow::Result<Vec<Record>> {
        let job = self.config.job_name.clone();
        let map_count = self.config.map_count();
        let reduce_count = self.config.reduce_count;
        info!(job = %job, map_count, reduce_count, "job started");

        // MAP PHASE
        let partitioner = Arc::new(Partitioner::new(LabNaming, self.store.clone()));
        let inputs = Arc::new(self.config.inputs.clone());
        let map_job = job.clone();
        let map_outcomes: Vec<MapOutcome> = self
            .run_phase(Phase::Map, map_count, move |task| {
                let path = &inputs[task];
                let map_task = MapTask {
                    job: map_job.clone(),
                    task,
                    unit: path.display().to_string(),
                    reduce_count,
                };
                partitioner.run_input(&map_task, path, &map_reduce_word_count::map)
            })
            .await?;
        let routed: usize = map_outcomes.iter().map(MapOutcome::total).sum();
        info!(job = %job, records = routed, "map phase completed");

        // REDUCE PHASE
        let merger = Arc::new(
            ShuffleMerger::new(LabNaming, self.store.clone()).with_cleanup(self.config.cleanup),
        );
        let reduce_job = job.clone();
        let reduce_outcomes: Vec<ReduceOutcome> = self
            .run_phase(Phase::Reduce, reduce_count, move |task| {
                let reduce_task = ReduceTask {
                    job: reduce_job.clone(),
                    task,
                    map_count,
                };
                merger.run(&reduce_task, &map_reduce_word_count::reduce)
            })
            .await?;
        let keys: usize = reduce_outcomes.iter().map(|o| o.keys).sum();
        info!(job = %job, keys, "reduce phase completed");

        let records = merge_outputs(&LabNaming, &self.store, &job, reduce_count)?;
        write_final(&LabNaming, &self.store, &job, &records)?;
        info!(job = %job, "job finished");
        Ok(records)
    }

    /// Run tasks `0..count` of one phase on the blocking pool, at most
    /// `max_workers` at a time.
    ///
    /// The first failing task stops further dispatch; tasks already running
    /// are awaited before the failure is returned.
    async fn run_phase<T, F>(&self, phase: Phase, count: usize, work: F) -> anyhow::Result<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(usize) -> Result<T, ShuffleError> + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let phase_token = self.cancellation_token.child_token();
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let mut handles = Vec::with_capacity(count);

        for task in 0..count {
            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => permit?,
                _ = phase_token.cancelled() => break,
            };
            let work = work.clone();
            let token = phase_token.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                if token.is_cancelled() {
                    return None;
                }
                let result = (*work)(task);
                if result.is_err() {
                    token.cancel();
                }
                Some(result)
            }));
        }

        let mut outcomes = Vec::with_capacity(count);
        let mut first_error: Option<ShuffleError> = None;
        for handle in handles {
            match handle.await.context("task panicked")? {
                Some(Ok(outcome)) => outcomes.push(outcome),
                Some(Err(e)) => {
                    error!(phase = %phase, error = %e, "task failed");
                    first_error.get_or_insert(e);
                }
                None => {}
            }
        }

        if let Some(e) = first_error {
            return Err(e.into());
        }
        if outcomes.len() < count {
            bail!("{} phase cancelled after {} of {} tasks", phase, outcomes.len(), count);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use map_reduce_shuffle::{CleanupPolicy, StreamNaming, StreamStore};
    use std::path::PathBuf;

    fn config(dir: &std::path::Path, inputs: Vec<PathBuf>, cleanup: CleanupPolicy) -> JobConfig {
        JobConfig {
            job_name: "wc".to_string(),
            inputs,
            reduce_count: 3,
            work_dir: dir.join("work"),
            max_workers: 2,
            cleanup,
        }
    }

    fn write_inputs(dir: &std::path::Path, contents: &[&str]) -> Vec<PathBuf> {
        contents
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let path = dir.join(format!("input-{}.txt", i));
                std::fs::write(&path, text).unwrap();
                path
            })
            .collect()
    }

    #[tokio::test]
    async fn test_runs_word_count_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_inputs(dir.path(), &["a b a", "b c", "c c a"]);
        let orchestrator =
            Orchestrator::new(config(dir.path(), inputs, CleanupPolicy::Retain)).unwrap();

        let records = orchestrator.run().await.unwrap();
        assert_eq!(
            records,
            vec![Record::new("a", "3"), Record::new("b", "2"), Record::new("c", "3")]
        );

        let store = FileStreamStore::new(dir.path().join("work")).unwrap();
        assert!(store.exists(&LabNaming.final_name("wc")));
        assert!(store.exists(&LabNaming.shard_name("wc", 2, 2)));
    }

    #[tokio::test]
    async fn test_remove_shards_leaves_only_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_inputs(dir.path(), &["x y", "y z"]);
        let orchestrator =
            Orchestrator::new(config(dir.path(), inputs, CleanupPolicy::RemoveShards)).unwrap();
        orchestrator.run().await.unwrap();

        let store = FileStreamStore::new(dir.path().join("work")).unwrap();
        for map_task in 0..2 {
            for reduce_task in 0..3 {
                assert!(!store.exists(&LabNaming.shard_name("wc", map_task, reduce_task)));
            }
        }
        for reduce_task in 0..3 {
            assert!(store.exists(&LabNaming.merged_name("wc", reduce_task)));
        }
    }

    #[tokio::test]
    async fn test_missing_input_fails_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = write_inputs(dir.path(), &["a"]);
        inputs.push(dir.path().join("missing.txt"));
        let orchestrator =
            Orchestrator::new(config(dir.path(), inputs, CleanupPolicy::Retain)).unwrap();

        let err = orchestrator.run().await.unwrap_err();
        let shuffle = err.downcast_ref::<ShuffleError>().unwrap();
        assert_eq!(shuffle.context().phase, Phase::Map);
        assert_eq!(shuffle.context().task, 1);
    }

    #[tokio::test]
    async fn test_cancelled_job_dispatches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = write_inputs(dir.path(), &["a", "b"]);
        let orchestrator =
            Orchestrator::new(config(dir.path(), inputs, CleanupPolicy::Retain)).unwrap();
        orchestrator.cancellation_token().cancel();

        assert!(orchestrator.run().await.is_err());
        let store = FileStreamStore::new(dir.path().join("work")).unwrap();
        assert!(!store.exists(&LabNaming.shard_name("wc", 0, 0)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bad = config(dir.path(), Vec::new(), CleanupPolicy::Retain);
        assert!(Orchestrator::new(bad).is_err());
    }
}
