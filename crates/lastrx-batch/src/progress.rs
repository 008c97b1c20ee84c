use std::sync::{Arc, Mutex, PoisonError};

/// Chunk counter shared by every file task of a run.
///
/// Each processed chunk adds exactly one; the lock is held only for the increment.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    chunks: Arc<Mutex<u64>>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        let mut chunks = self.chunks.lock().unwrap_or_else(PoisonError::into_inner);
        *chunks += 1;
    }

    pub fn get(&self) -> u64 {
        *self.chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Completed share of `total` chunks as a whole percentage
    pub fn percent(&self, total: u64) -> u8 {
        percent(self.get(), total)
    }
}

/// `floor(100 * done / total)`, capped at 100. An empty run counts as complete.
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let value = (done as u128 * 100) / total as u128;
    value.min(100) as u8
}

/// Chunks a file of `point_count` points is streamed in
pub fn chunks_for(point_count: u64, chunk_size: u64) -> u64 {
    point_count.div_ceil(chunk_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_percent_floors() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(5, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_chunks_for() {
        assert_eq!(chunks_for(0, 10_000), 0);
        assert_eq!(chunks_for(1, 10_000), 1);
        assert_eq!(chunks_for(10_000, 10_000), 1);
        assert_eq!(chunks_for(10_001, 10_000), 2);
        assert_eq!(chunks_for(250_000_000, 10_000), 25_000);
    }

    #[test]
    fn test_concurrent_increments_are_counted_once() {
        let counter = ProgressCounter::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.increment();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.get(), 8000);
        assert_eq!(counter.percent(16_000), 50);
    }
}
