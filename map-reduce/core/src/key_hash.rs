// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Key routing shared by the map and reduce sides.
//!
//! Partitioners and mergers may live in different processes, so the hash is
//! a fixed 32-bit FNV-1a over the UTF-8 bytes of the key. It takes no seed
//! and reads no process state.

const FNV_OFFSET: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

pub fn fnv1a_32(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Index of the reduce task that owns `key`.
///
/// `reduce_count` must be non-zero; task validation rejects zero before any
/// record is routed.
pub fn partition_for(key: &str, reduce_count: usize) -> usize {
    (fnv1a_32(key.as_bytes()) as u64 % reduce_count as u64) as usize
}
