//! Per-layer interning tables.
//!
//! A table stores its entries directly in serialized form: a stream of
//! length-delimited records already tagged with the table's layer field
//! number, ready to be spliced into the layer message at build time. An
//! entry's index is its zero-based position in that stream.

use std::collections::HashMap;

use crate::wire::{put_len_field, read_varint};

// Below this entry count, duplicate detection is a linear scan over the
// serialized record stream. At the threshold a map is populated from the
// stream once and used from then on.
const MAX_ENTRIES_FLAT: u32 = 20;

/// Deduplicating table of byte-string entries (keys, encoded values, or
/// version 3 string values).
#[derive(Debug)]
pub(crate) struct ValueTable {
    field: u32,
    data: Vec<u8>,
    index: HashMap<Vec<u8>, u32>,
    num: u32,
}

impl ValueTable {
    pub(crate) fn new(field: u32) -> Self {
        Self {
            field,
            data: Vec::new(),
            index: HashMap::new(),
            num: 0,
        }
    }

    /// The serialized record stream.
    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    /// Appends an entry without consulting the duplicate index.
    pub(crate) fn add_without_dup_check(&mut self, payload: &[u8]) -> u32 {
        put_len_field(&mut self.data, self.field, payload);
        let index = self.num;
        self.num += 1;
        index
    }

    /// Returns the index of `payload`, appending it first if absent.
    pub(crate) fn add(&mut self, payload: &[u8]) -> u32 {
        if self.num < MAX_ENTRIES_FLAT {
            if let Some(index) = self.find_flat(payload) {
                return index;
            }
            return self.add_without_dup_check(payload);
        }

        if self.index.is_empty() {
            self.populate_index();
        }
        if let Some(&index) = self.index.get(payload) {
            return index;
        }
        let index = self.add_without_dup_check(payload);
        self.index.insert(payload.to_vec(), index);
        index
    }

    fn find_flat(&self, payload: &[u8]) -> Option<u32> {
        let mut index = 0u32;
        for entry in RecordIter::new(&self.data) {
            if entry == payload {
                return Some(index);
            }
            index += 1;
        }
        None
    }

    fn populate_index(&mut self) {
        let mut index = 0u32;
        for entry in RecordIter::new(&self.data) {
            self.index.insert(entry.to_vec(), index);
            index += 1;
        }
    }
}

/// Iterator over the payloads of a serialized record stream.
struct RecordIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RecordIter<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.data.len() {
            return None;
        }
        let _tag = read_varint(self.data, &mut self.pos);
        let len = read_varint(self.data, &mut self.pos) as usize;
        let entry = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Some(entry)
    }
}
