// Copyright contributors to the unimod project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Two hash tables: an open-addressing table keyed by byte strings and a
//! separate-chaining integer multimap, plus the signed-hash projection that
//! keeps incremental vector hashes inside a safe range.

pub const RANGE_SIGNED_HASH: i64 = i64::MAX / 2;

/// Projects `value` towards `[-(R-1), R-1]` for `R = RANGE_SIGNED_HASH` via
/// a truncating modulo computation, so that incremental updates (adding or
/// subtracting one projected coefficient) never overflow. Kept bit-exact,
/// including the truncation behavior on negative sums, so that hash
/// collisions, and therefore certificates, are reproducible.
pub fn project_signed_hash(value: i64) -> i64 {
    (value.wrapping_add(RANGE_SIGNED_HASH - 1) % (2 * RANGE_SIGNED_HASH - 1))
        .wrapping_sub(RANGE_SIGNED_HASH - 1)
}

/// Per-index hash coefficients: `h_0 = 1`, `h_{e+1} = project(3 h_e)`.
pub fn hash_coefficients(size: usize) -> Vec<i64> {
    let mut coefficients = Vec::with_capacity(size);
    let mut h: i64 = 1;
    for _ in 0..size {
        coefficients.push(h);
        h = project_signed_hash(h.wrapping_mul(3));
    }
    coefficients
}

/// Smallest power of two strictly larger than `x`.
pub fn next_power_of_two(x: usize) -> usize {
    let mut x = x;
    x |= x >> 1;
    x |= x >> 2;
    x |= x >> 4;
    x |= x >> 8;
    x |= x >> 16;
    x |= x >> 32;
    x + 1
}

pub const NO_ENTRY: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct ListNode {
    hash: u64,
    value: usize,
    next: usize,
}

/// Separate-chaining multimap from 64-bit hashes to indices. Multiple
/// entries may share a hash; callers confirm equality themselves via
/// [`ListHashTable::find_first`] / [`ListHashTable::find_next`].
#[derive(Debug)]
pub struct ListHashTable {
    buckets: Vec<usize>,
    nodes: Vec<ListNode>,
    first_free: usize,
}

impl ListHashTable {
    pub fn new(num_buckets: usize, capacity: usize) -> Self {
        let num_buckets = num_buckets.max(1);
        let capacity = capacity.max(1);
        let mut nodes = Vec::with_capacity(capacity);
        for index in 0..capacity {
            nodes.push(ListNode {
                hash: 0,
                value: 0,
                next: if index + 1 < capacity { index + 1 } else { NO_ENTRY },
            });
        }
        Self {
            buckets: vec![NO_ENTRY; num_buckets],
            nodes,
            first_free: 0,
        }
    }

    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    /// First entry whose hash equals `hash`, or [`NO_ENTRY`].
    pub fn find_first(&self, hash: u64) -> usize {
        let mut entry = self.buckets[self.bucket_of(hash)];
        while entry != NO_ENTRY && self.nodes[entry].hash != hash {
            entry = self.nodes[entry].next;
        }
        entry
    }

    /// Next entry after `entry` with the same hash, or [`NO_ENTRY`].
    pub fn find_next(&self, hash: u64, entry: usize) -> usize {
        let mut entry = self.nodes[entry].next;
        while entry != NO_ENTRY && self.nodes[entry].hash != hash {
            entry = self.nodes[entry].next;
        }
        entry
    }

    pub fn value(&self, entry: usize) -> usize {
        self.nodes[entry].value
    }

    /// Inserts a hash/value pair and returns its entry handle.
    pub fn insert(&mut self, hash: u64, value: usize) -> usize {
        if self.first_free == NO_ENTRY {
            let old_capacity = self.nodes.len();
            let new_capacity = 2 * old_capacity;
            for index in old_capacity..new_capacity {
                self.nodes.push(ListNode {
                    hash: 0,
                    value: 0,
                    next: if index + 1 < new_capacity { index + 1 } else { NO_ENTRY },
                });
            }
            self.first_free = old_capacity;
        }
        let entry = self.first_free;
        self.first_free = self.nodes[entry].next;
        let bucket = self.bucket_of(hash);
        self.nodes[entry] = ListNode {
            hash,
            value,
            next: self.buckets[bucket],
        };
        self.buckets[bucket] = entry;
        entry
    }

    /// Unlinks `entry` from its bucket chain.
    pub fn remove(&mut self, entry: usize) {
        let bucket = self.bucket_of(self.nodes[entry].hash);
        let next = self.nodes[entry].next;
        if self.buckets[bucket] == entry {
            self.buckets[bucket] = next;
        } else {
            let mut current = self.buckets[bucket];
            while self.nodes[current].next != entry {
                current = self.nodes[current].next;
                debug_assert!(current != NO_ENTRY);
            }
            self.nodes[current].next = next;
        }
        self.nodes[entry].next = self.first_free;
        self.first_free = entry;
    }
}

#[derive(Debug, Clone)]
struct KeyedBucket {
    key_index: usize,
    key_length: usize,
    hash: u64,
    value: usize,
}

/// Open-addressing table with linear probing, keyed by byte strings that are
/// copied into a grow-only key store. Doubles its capacity when the load
/// exceeds 1/8.
#[derive(Debug)]
pub struct KeyedHashTable {
    buckets: Vec<Option<KeyedBucket>>,
    key_storage: Vec<u8>,
    num_elements: usize,
}

fn djb2(key: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for &byte in key {
        hash = hash.wrapping_shl(5).wrapping_add(hash).wrapping_add(byte as u64);
    }
    hash
}

impl KeyedHashTable {
    pub fn new(initial_size: usize) -> Self {
        Self {
            buckets: vec![None; initial_size.max(16)],
            key_storage: Vec::new(),
            num_elements: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.num_elements
    }

    pub fn is_empty(&self) -> bool {
        self.num_elements == 0
    }

    fn probe(&self, key: &[u8]) -> (usize, u64) {
        let hash = djb2(key);
        let mut bucket = (hash % self.buckets.len() as u64) as usize;
        loop {
            match &self.buckets[bucket] {
                None => return (bucket, hash),
                Some(data) => {
                    let stored = &self.key_storage[data.key_index..data.key_index + data.key_length];
                    if stored == key {
                        return (bucket, hash);
                    }
                }
            }
            bucket = (bucket + 1) % self.buckets.len();
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<usize> {
        let (bucket, _) = self.probe(key);
        self.buckets[bucket].as_ref().map(|data| data.value)
    }

    pub fn insert(&mut self, key: &[u8], value: usize) {
        assert!(!key.is_empty());
        let (bucket, hash) = self.probe(key);
        if let Some(data) = &mut self.buckets[bucket] {
            data.value = value;
            return;
        }
        let key_index = self.key_storage.len();
        self.key_storage.extend_from_slice(key);
        self.buckets[bucket] = Some(KeyedBucket {
            key_index,
            key_length: key.len(),
            hash,
            value,
        });
        self.num_elements += 1;

        if self.num_elements > self.buckets.len() / 8 {
            let new_size = 2 * self.buckets.len();
            let old = std::mem::replace(&mut self.buckets, vec![None; new_size]);
            for data in old.into_iter().flatten() {
                let mut bucket = (data.hash % new_size as u64) as usize;
                while self.buckets[bucket].is_some() {
                    bucket = (bucket + 1) % new_size;
                }
                self.buckets[bucket] = Some(data);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_fixes_in_range_values() {
        assert_eq!(project_signed_hash(0), 0);
        assert_eq!(project_signed_hash(42), 42);
        assert_eq!(project_signed_hash(-42), -42);
        assert_eq!(project_signed_hash(RANGE_SIGNED_HASH - 1), RANGE_SIGNED_HASH - 1);
        // Values beyond the range wrap around.
        assert_eq!(project_signed_hash(RANGE_SIGNED_HASH), -(RANGE_SIGNED_HASH - 1));
    }

    #[test]
    fn coefficients_are_deterministic() {
        let a = hash_coefficients(100);
        let b = hash_coefficients(100);
        assert_eq!(a, b);
        assert_eq!(a[0], 1);
        assert_eq!(a[1], 3);
        assert_eq!(a[2], 9);
    }

    #[test]
    fn next_power_of_two_rounds_up() {
        assert_eq!(next_power_of_two(0), 1);
        assert_eq!(next_power_of_two(1), 2);
        assert_eq!(next_power_of_two(7), 8);
        assert_eq!(next_power_of_two(8), 16);
    }

    #[test]
    fn list_table_supports_collisions_and_removal() {
        let mut table = ListHashTable::new(4, 2);
        let e1 = table.insert(17, 100);
        let _e2 = table.insert(17, 200);
        let e3 = table.insert(21, 300); // 21 % 4 == 17 % 4
        let mut values = Vec::new();
        let mut entry = table.find_first(17);
        while entry != NO_ENTRY {
            values.push(table.value(entry));
            entry = table.find_next(17, entry);
        }
        values.sort();
        assert_eq!(values, vec![100, 200]);
        assert_eq!(table.value(table.find_first(21)), 300);

        table.remove(e1);
        let entry = table.find_first(17);
        assert_eq!(table.value(entry), 200);
        assert_eq!(table.find_next(17, entry), NO_ENTRY);
        table.remove(e3);
        assert_eq!(table.find_first(21), NO_ENTRY);
    }

    #[test]
    fn keyed_table_grows_and_keeps_keys() {
        let mut table = KeyedHashTable::new(16);
        for index in 0..100usize {
            table.insert(format!("node{index}").as_bytes(), index);
        }
        assert_eq!(table.len(), 100);
        for index in 0..100usize {
            assert_eq!(table.get(format!("node{index}").as_bytes()), Some(index));
        }
        assert_eq!(table.get(b"missing"), None);
        table.insert(b"node7", 777);
        assert_eq!(table.get(b"node7"), Some(777));
        assert_eq!(table.len(), 100);
    }
}
