//! Splitting a payload into frame-sized chunks.

use std::ops::Range;

/// One frame-sized slice of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position in the transfer.
    pub index: usize,
    /// Byte offset of the chunk within the payload.
    pub offset: usize,
    /// Chunk length in bytes (unpadded).
    pub len: usize,
}

impl Chunk {
    /// Byte range of this chunk within the payload.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// The chunk layout of a payload of `total` bytes.
///
/// Every chunk but the last holds exactly `max_chunk` bytes; the last holds
/// the remainder, which is never zero. An empty payload has no chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total: usize,
    max_chunk: usize,
}

impl ChunkPlan {
    /// Plan a transfer. `max_chunk` must be non-zero (see `FrameConfig::validate`).
    pub fn new(total: usize, max_chunk: usize) -> Self {
        debug_assert!(max_chunk > 0, "max_chunk must be non-zero");
        Self {
            total,
            max_chunk: max_chunk.max(1),
        }
    }

    /// Total payload size.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of chunks: `ceil(total / max_chunk)`.
    pub fn chunk_count(&self) -> usize {
        self.total.div_ceil(self.max_chunk)
    }

    /// Iterate the chunks in transfer order.
    pub fn chunks(&self) -> Chunks {
        Chunks {
            plan: *self,
            next: 0,
            offset: 0,
        }
    }
}

/// Iterator over the chunks of a [`ChunkPlan`].
#[derive(Debug, Clone)]
pub struct Chunks {
    plan: ChunkPlan,
    next: usize,
    offset: usize,
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.next >= self.plan.chunk_count() {
            return None;
        }
        let len = if self.next + 1 == self.plan.chunk_count() {
            self.plan.total - self.offset
        } else {
            self.plan.max_chunk
        };
        let chunk = Chunk {
            index: self.next,
            offset: self.offset,
            len,
        };
        self.next += 1;
        self.offset += len;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.plan.chunk_count() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Chunks {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MAX_CHUNK;

    #[test]
    fn chunk_count_is_ceiling() {
        for total in [1usize, 45, 46, 1499, 1500, 1501, 2999, 3000, 3001, 10_000] {
            let plan = ChunkPlan::new(total, MAX_CHUNK);
            assert_eq!(plan.chunk_count(), total.div_ceil(MAX_CHUNK), "total={total}");
            assert_eq!(plan.chunks().len(), plan.chunk_count());
        }
    }

    #[test]
    fn sizes_sum_to_total_and_only_last_is_short() {
        for total in [1usize, 777, 1500, 1501, 4500, 4501, 65_537] {
            let plan = ChunkPlan::new(total, MAX_CHUNK);
            let chunks: Vec<Chunk> = plan.chunks().collect();

            assert_eq!(chunks.iter().map(|c| c.len).sum::<usize>(), total);

            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|c| c.len == MAX_CHUNK));
            assert!(last.len > 0 && last.len <= MAX_CHUNK);
            assert_eq!(last.len, total - (chunks.len() - 1) * MAX_CHUNK);
            assert_eq!(last.index + 1, plan.chunk_count());
        }
    }

    #[test]
    fn exact_multiple_has_full_last_chunk() {
        let plan = ChunkPlan::new(3 * MAX_CHUNK, MAX_CHUNK);
        let chunks: Vec<Chunk> = plan.chunks().collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len, MAX_CHUNK);
        assert_eq!(chunks[2].range(), 2 * MAX_CHUNK..3 * MAX_CHUNK);
    }

    #[test]
    fn offsets_are_contiguous() {
        let plan = ChunkPlan::new(4000, 1500);
        let ranges: Vec<_> = plan.chunks().map(|c| c.range()).collect();
        assert_eq!(ranges, vec![0..1500, 1500..3000, 3000..4000]);
    }

    #[test]
    fn empty_payload_has_no_chunks() {
        let plan = ChunkPlan::new(0, MAX_CHUNK);
        assert_eq!(plan.chunk_count(), 0);
        assert_eq!(plan.chunks().next(), None);
    }
}
