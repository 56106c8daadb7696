// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use map_reduce_shuffle::{
    merge_outputs, InMemoryStreamStore, LabNaming, MapTask, Partitioner, Phase, Record,
    RecordReader, ReduceTask, ShuffleMerger, StreamNaming, StreamStore, TaskContext,
};

const JOB: &str = "wc";

fn shard(store: &InMemoryStreamStore, map_task: usize, reduce_task: usize) -> Vec<Record> {
    let stream = LabNaming.shard_name(JOB, map_task, reduce_task);
    let input = store.open(&stream).unwrap();
    RecordReader::new(input, TaskContext::new(JOB, Phase::Reduce, reduce_task), stream)
        .map(|r| r.unwrap())
        .collect()
}

fn merged(store: &InMemoryStreamStore, reduce_task: usize) -> Vec<Record> {
    let stream = LabNaming.merged_name(JOB, reduce_task);
    let input = store.open(&stream).unwrap();
    RecordReader::new(input, TaskContext::new(JOB, Phase::Reduce, reduce_task), stream)
        .map(|r| r.unwrap())
        .collect()
}

// ============================================================
// Two map tasks, two reduce tasks
// ("a" and "c" hash to reducer 0, "b" to reducer 1)
// ============================================================

#[test]
fn test_two_by_two_word_count() {
    let store = InMemoryStreamStore::new();
    let partitioner = Partitioner::new(LabNaming, store.clone());
    for (task, content) in ["a b a", "b c"].iter().enumerate() {
        let map_task = MapTask {
            job: JOB.to_string(),
            task,
            unit: format!("input-{}", task),
            reduce_count: 2,
        };
        partitioner
            .run(&map_task, content, &map_reduce_word_count::map)
            .unwrap();
    }

    assert_eq!(shard(&store, 0, 0), vec![Record::new("a", "1"), Record::new("a", "1")]);
    assert_eq!(shard(&store, 0, 1), vec![Record::new("b", "1")]);
    assert_eq!(shard(&store, 1, 0), vec![Record::new("c", "1")]);
    assert_eq!(shard(&store, 1, 1), vec![Record::new("b", "1")]);

    let merger = ShuffleMerger::new(LabNaming, store.clone());
    for task in 0..2 {
        let reduce_task = ReduceTask {
            job: JOB.to_string(),
            task,
            map_count: 2,
        };
        merger
            .run(&reduce_task, &map_reduce_word_count::reduce)
            .unwrap();
    }

    assert_eq!(merged(&store, 0), vec![Record::new("a", "2"), Record::new("c", "1")]);
    assert_eq!(merged(&store, 1), vec![Record::new("b", "2")]);

    assert_eq!(
        merge_outputs(&LabNaming, &store, JOB, 2).unwrap(),
        vec![Record::new("a", "2"), Record::new("b", "2"), Record::new("c", "1")]
    );
}

#[test]
fn test_input_files_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");
    std::fs::write(&first, "the quick brown fox\njumps over the lazy dog").unwrap();
    std::fs::write(&second, "The dog sleeps. The fox runs!").unwrap();

    let store = InMemoryStreamStore::new();
    let partitioner = Partitioner::new(LabNaming, store.clone());
    for (task, path) in [&first, &second].iter().enumerate() {
        let map_task = MapTask {
            job: JOB.to_string(),
            task,
            unit: path.display().to_string(),
            reduce_count: 3,
        };
        partitioner
            .run_input(&map_task, path, &map_reduce_word_count::map)
            .unwrap();
    }

    let merger = ShuffleMerger::new(LabNaming, store.clone());
    for task in 0..3 {
        let reduce_task = ReduceTask {
            job: JOB.to_string(),
            task,
            map_count: 2,
        };
        merger
            .run(&reduce_task, &map_reduce_word_count::reduce)
            .unwrap();
    }

    let result = merge_outputs(&LabNaming, &store, JOB, 3).unwrap();
    let lookup = |word: &str| {
        result
            .iter()
            .find(|r| r.key == word)
            .map(|r| r.value.clone())
    };
    assert_eq!(lookup("the"), Some("2".to_string()));
    assert_eq!(lookup("The"), Some("2".to_string()));
    assert_eq!(lookup("fox"), Some("2".to_string()));
    assert_eq!(lookup("dog"), Some("2".to_string()));
    assert_eq!(lookup("lazy"), Some("1".to_string()));
    assert_eq!(lookup("cat"), None);
}
