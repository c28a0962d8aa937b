//! An address-indexed byte store with gaps.
//!
//! Stores non-overlapping, non-adjacent [`MemBlock`]s keyed by their target
//! `offset`, coalescing any insertion that overlaps or touches existing
//! blocks. A read cursor walks the stored blocks in address order; callers
//! should reset it with [`SparseBuffer::rewind`] after any mutation, but a
//! cursor left stale across a [`SparseBuffer::set`] call recovers to the
//! start of whichever block now contains its address rather than reading
//! as exhausted.

use std::collections::BTreeMap;

/// A contiguous run of bytes at a target address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemBlock {
    pub offset: u64,
    pub data: Vec<u8>,
}

impl MemBlock {
    pub fn new(offset: u64, data: Vec<u8>) -> Self {
        Self { offset, data }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn end(&self) -> u64 {
        self.offset + self.len()
    }
}

/// Position of the read cursor: the block it sits in, and the byte offset
/// within that block's data (which may equal the block's length, meaning
/// "advance to the next block on the following read").
#[derive(Debug, Clone, Copy)]
struct Cursor {
    offset: u64,
    position: u64,
}

/// A sparse, coalescing, address-ordered byte store.
#[derive(Debug, Default)]
pub struct SparseBuffer {
    blocks: BTreeMap<u64, MemBlock>,
    cursor: Option<Cursor>,
}

fn touches(a_offset: u64, a_len: u64, b_offset: u64, b_len: u64) -> bool {
    let a_end = a_offset + a_len;
    let b_end = b_offset + b_len;
    a_offset <= b_end && b_offset <= a_end
}

impl SparseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `block`, merging with any stored block it overlaps or
    /// touches. Inserted bytes win over existing bytes at shared addresses.
    pub fn set(&mut self, block: MemBlock) {
        if block.is_empty() {
            return;
        }

        let mut merged_offset = block.offset;
        let mut merged_end = block.end();

        // Collect the offsets of every stored block that touches the
        // inserted range so we can splice them out below. BTreeMap has no
        // interval query, so we scan blocks that could plausibly touch:
        // anything whose start is <= our end, walked from the predecessor
        // of our offset onward.
        let scan_start = self
            .blocks
            .range(..=block.offset)
            .next_back()
            .map(|(&o, _)| o)
            .unwrap_or(block.offset);

        let touched: Vec<u64> = self
            .blocks
            .range(scan_start..)
            .take_while(|(&o, _)| o <= merged_end)
            .filter(|(&o, b)| touches(merged_offset, merged_end - merged_offset, o, b.len()))
            .map(|(&o, _)| o)
            .collect();

        for offset in &touched {
            let existing = self.blocks.get(offset).unwrap();
            merged_offset = merged_offset.min(existing.offset);
            merged_end = merged_end.max(existing.end());
        }

        let mut data = vec![0u8; (merged_end - merged_offset) as usize];
        for offset in &touched {
            let existing = self.blocks.remove(offset).unwrap();
            let start = (existing.offset - merged_offset) as usize;
            data[start..start + existing.data.len()].copy_from_slice(&existing.data);
        }
        let start = (block.offset - merged_offset) as usize;
        data[start..start + block.data.len()].copy_from_slice(&block.data);

        self.blocks.insert(
            merged_offset,
            MemBlock {
                offset: merged_offset,
                data,
            },
        );
    }

    /// Adds `delta` to every stored block's address and to the cursor.
    /// `delta` must not underflow any block's offset.
    pub fn shift(&mut self, delta: i64) {
        let shifted: BTreeMap<u64, MemBlock> = std::mem::take(&mut self.blocks)
            .into_values()
            .map(|b| {
                let offset = apply_delta(b.offset, delta);
                (offset, MemBlock { offset, data: b.data })
            })
            .collect();
        self.blocks = shifted;

        if let Some(cursor) = &mut self.cursor {
            cursor.offset = apply_delta(cursor.offset, delta);
        }
    }

    /// Returns the total number of stored bytes, excluding gaps.
    pub fn size(&self) -> u64 {
        self.blocks.values().map(MemBlock::len).sum()
    }

    /// Resets the read cursor to the first stored block's start.
    pub fn rewind(&mut self) {
        self.cursor = self
            .blocks
            .values()
            .next()
            .map(|b| Cursor { offset: b.offset, position: 0 });
    }

    /// Returns the next contiguous slice from the cursor, at most `max_len`
    /// bytes (or the whole remainder of the current block if `max_len ==
    /// 0`), and advances the cursor. Returns an empty block once exhausted.
    ///
    /// If an intervening [`SparseBuffer::set`] merged away the block the
    /// cursor was sitting in, the cursor is reset to the start of whichever
    /// stored block now contains its address, rather than being treated as
    /// exhausted — callers are still expected to call [`SparseBuffer::rewind`]
    /// after a mutation, but a stale cursor recovers instead of silently
    /// reading nothing.
    pub fn read(&mut self, max_len: u64) -> MemBlock {
        if self.cursor.is_none() {
            self.rewind();
        }

        let Some(stored_cursor) = self.cursor else {
            return MemBlock::new(0, Vec::new());
        };

        let cursor = if self.blocks.contains_key(&stored_cursor.offset) {
            stored_cursor
        } else {
            let absolute = stored_cursor.offset + stored_cursor.position;
            match self.block_containing(absolute) {
                Some(block) => Cursor { offset: block.offset, position: 0 },
                None => {
                    self.cursor = None;
                    return MemBlock::new(0, Vec::new());
                }
            }
        };

        let block = self
            .blocks
            .get(&cursor.offset)
            .expect("cursor resolved above to an offset that is a stored block");

        let remaining = block.len() - cursor.position;
        let take = if max_len == 0 { remaining } else { remaining.min(max_len) };
        let start = cursor.position as usize;
        let end = start + take as usize;
        let out = MemBlock::new(cursor.offset + cursor.position, block.data[start..end].to_vec());

        let new_position = cursor.position + take;
        if new_position >= block.len() {
            let next = self
                .blocks
                .range((std::ops::Bound::Excluded(cursor.offset), std::ops::Bound::Unbounded))
                .next()
                .map(|(&o, _)| o);
            self.cursor = next.map(|offset| Cursor { offset, position: 0 });
        } else {
            self.cursor = Some(Cursor { offset: cursor.offset, position: new_position });
        }

        out
    }

    /// Stored blocks in address order, for testing and for callers that
    /// want to walk the buffer without mutating the cursor.
    pub fn blocks(&self) -> impl Iterator<Item = &MemBlock> {
        self.blocks.values()
    }

    /// The stored block whose range covers `addr`, if any.
    fn block_containing(&self, addr: u64) -> Option<&MemBlock> {
        self.blocks.range(..=addr).next_back().map(|(_, b)| b).filter(|b| addr < b.end())
    }
}

fn apply_delta(offset: u64, delta: i64) -> u64 {
    if delta >= 0 {
        offset + delta as u64
    } else {
        offset.checked_sub((-delta) as u64).expect("sparse buffer shift underflowed a block offset")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_adjacent_blocks() {
        let mut buf = SparseBuffer::new();
        buf.set(MemBlock::new(0, vec![0x01, 0x02, 0x03, 0x04]));
        buf.set(MemBlock::new(4, vec![0x05, 0x06]));

        buf.rewind();
        let block = buf.read(0);
        assert_eq!(block, MemBlock::new(0, vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06]));
        assert_eq!(buf.read(0), MemBlock::new(0, Vec::new()));
    }

    #[test]
    fn last_write_wins_and_preserves_overhang() {
        let mut buf = SparseBuffer::new();
        buf.set(MemBlock::new(10, vec![0xAA, 0xAA]));
        buf.set(MemBlock::new(0, vec![0x01, 0x02]));
        buf.set(MemBlock::new(2, vec![0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A]));

        let blocks: Vec<&MemBlock> = buf.blocks().collect();
        assert_eq!(
            blocks,
            vec![&MemBlock::new(
                0,
                vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0xAA, 0xAA]
            )]
        );
    }

    #[test]
    fn shift_moves_blocks_and_cursor() {
        let mut buf = SparseBuffer::new();
        buf.set(MemBlock::new(0, vec![0xDE, 0xAD, 0xBE, 0xEF]));
        buf.shift(0x0800_0000);

        let blocks: Vec<&MemBlock> = buf.blocks().collect();
        assert_eq!(blocks, vec![&MemBlock::new(0x0800_0000, vec![0xDE, 0xAD, 0xBE, 0xEF])]);
    }

    #[test]
    fn overlapping_insert_overwrites_only_covered_bytes() {
        let mut buf = SparseBuffer::new();
        buf.set(MemBlock::new(0, vec![1, 1, 1, 1, 1]));
        buf.set(MemBlock::new(2, vec![2, 2]));

        let blocks: Vec<&MemBlock> = buf.blocks().collect();
        assert_eq!(blocks, vec![&MemBlock::new(0, vec![1, 1, 2, 2, 1])]);
    }

    #[test]
    fn size_excludes_gaps() {
        let mut buf = SparseBuffer::new();
        buf.set(MemBlock::new(0, vec![1, 2, 3]));
        buf.set(MemBlock::new(100, vec![4, 5]));
        assert_eq!(buf.size(), 5);
    }

    #[test]
    fn read_respects_max_len_and_spans_reads() {
        let mut buf = SparseBuffer::new();
        buf.set(MemBlock::new(0, (0u8..10).collect()));
        buf.rewind();

        let first = buf.read(4);
        assert_eq!(first, MemBlock::new(0, vec![0, 1, 2, 3]));
        let second = buf.read(4);
        assert_eq!(second, MemBlock::new(4, vec![4, 5, 6, 7]));
        let third = buf.read(4);
        assert_eq!(third, MemBlock::new(8, vec![8, 9]));
        assert_eq!(buf.read(4), MemBlock::new(0, Vec::new()));
    }

    #[test]
    fn read_after_merge_without_rewind_resets_to_the_merged_blocks_start() {
        let mut buf = SparseBuffer::new();
        buf.set(MemBlock::new(0, vec![1, 2, 3, 4]));
        buf.rewind();
        let first = buf.read(2);
        assert_eq!(first, MemBlock::new(0, vec![1, 2]));

        // Merges the block the cursor is sitting in (offset 0) with a new
        // one, so the stored key the cursor remembers no longer exists.
        buf.set(MemBlock::new(4, vec![5, 6]));

        // No `rewind` call: the cursor should recover to the start of the
        // merged block rather than silently reading as exhausted.
        let recovered = buf.read(0);
        assert_eq!(recovered, MemBlock::new(0, vec![1, 2, 3, 4, 5, 6]));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn blocks_never_overlap_or_touch(
            inserts in proptest::collection::vec((0u64..200, proptest::collection::vec(any::<u8>(), 1..8)), 1..20)
        ) {
            let mut buf = SparseBuffer::new();
            for (offset, data) in inserts {
                buf.set(MemBlock::new(offset, data));
            }

            let blocks: Vec<&MemBlock> = buf.blocks().collect();
            for pair in blocks.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                prop_assert!(a.offset + a.len() < b.offset);
            }
            for b in &blocks {
                prop_assert!(!b.is_empty());
            }
        }
    }
}
