//! Sharded fixed-geometry hash table backing the handle table.
//!
//! Bucket count is fixed at construction and never resized; colliding keys
//! chain within their bucket. Shards lock independently, so operations on
//! different handles contend only when they land on the same shard.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// Key usable by [`KeyedTable`]: equality plus a bucket hash over the raw
/// key bytes.
pub trait TableKey: Eq {
    /// Bucket-selection hash for this key.
    fn bucket_hash(&self) -> u32;
}

impl TableKey for u64 {
    fn bucket_hash(&self) -> u32 {
        elf_hash(&self.to_le_bytes())
    }
}

/// ELF-style string hash: fold left with a four-bit shift per byte, any
/// carry out of bit 28 folded back into the low bits.
pub fn elf_hash(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &b in bytes {
        hash = (hash << 4).wrapping_add(u32::from(b));
        let g = hash & 0xf000_0000;
        if g != 0 {
            hash ^= g >> 24;
            hash ^= g;
        }
    }
    hash
}

/// Value handed back by a rejected [`KeyedTable::insert_if_absent`].
#[derive(Debug)]
pub enum InsertRejected<V> {
    /// The key is already present; the existing value is untouched.
    Occupied(V),
    /// The table reached its configured entry capacity.
    Full(V),
}

struct Shard<K, V> {
    buckets: Mutex<Vec<Vec<(K, V)>>>,
}

/// Fixed-bucket, chained, sharded hash table with exclusive value ownership.
pub struct KeyedTable<K, V> {
    shards: Vec<Shard<K, V>>,
    buckets_per_shard: usize,
    max_entries: usize,
    len: AtomicUsize,
}

impl<K: TableKey, V> KeyedTable<K, V> {
    /// Creates a table with `shards * buckets_per_shard` buckets and at most
    /// `max_entries` live entries. Zero counts are clamped to one.
    pub fn new(shards: usize, buckets_per_shard: usize, max_entries: usize) -> Self {
        let shards = shards.max(1);
        let buckets_per_shard = buckets_per_shard.max(1);

        Self {
            shards: (0..shards)
                .map(|_| Shard {
                    buckets: Mutex::new((0..buckets_per_shard).map(|_| Vec::new()).collect()),
                })
                .collect(),
            buckets_per_shard,
            max_entries: max_entries.max(1),
            len: AtomicUsize::new(0),
        }
    }

    /// Inserts `value` under `key` unless the key is present or the table is
    /// at capacity; a rejected value is handed back untouched.
    pub fn insert_if_absent(&self, key: K, value: V) -> Result<(), InsertRejected<V>> {
        let (shard, bucket) = self.slot(&key);
        let mut buckets = self.shards[shard].buckets.lock();
        let chain = &mut buckets[bucket];

        if chain.iter().any(|(existing, _)| *existing == key) {
            return Err(InsertRejected::Occupied(value));
        }

        let reserved = self.len.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
            (n < self.max_entries).then_some(n + 1)
        });
        if reserved.is_err() {
            return Err(InsertRejected::Full(value));
        }

        chain.push((key, value));
        Ok(())
    }

    /// Runs `f` on the value for `key` under the owning shard lock, so
    /// lookup-then-mutate is atomic per key.
    pub fn with_value_mut<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let (shard, bucket) = self.slot(key);
        let mut buckets = self.shards[shard].buckets.lock();

        buckets[bucket]
            .iter_mut()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| f(value))
    }

    /// Unlinks the entry for `key` and returns exclusive ownership of its
    /// value.
    pub fn remove(&self, key: &K) -> Option<V> {
        let (shard, bucket) = self.slot(key);
        let mut buckets = self.shards[shard].buckets.lock();
        let chain = &mut buckets[bucket];

        let position = chain.iter().position(|(existing, _)| existing == key)?;
        let (_, value) = chain.swap_remove(position);
        self.len.fetch_sub(1, Ordering::Relaxed);
        Some(value)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// True when no entries are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &K) -> (usize, usize) {
        let hash = key.bucket_hash() as usize;
        let shard = hash % self.shards.len();
        let bucket = (hash / self.shards.len()) % self.buckets_per_shard;
        (shard, bucket)
    }
}
