//! Chunk carry-over.
//!
//! The working buffer is the carried tail of the previous buffer followed by
//! the newest chunk. Whatever the scan has not consumed when it stops is
//! retained as the next carry, capped at the maximum artifact size, so a
//! match or structure straddling a chunk boundary is seen once in full.

pub struct CarryBuffer {
    working: Vec<u8>,
    working_origin: u64,
    carry: Vec<u8>,
    carry_origin: u64,
    max_carry: usize,
}

impl CarryBuffer {
    /// Both buffers are sized up front and never grow past their capacity.
    pub fn new(chunk_size: usize, max_carry: usize) -> Self {
        Self {
            working: Vec::with_capacity(chunk_size.saturating_add(max_carry)),
            working_origin: 0,
            carry: Vec::with_capacity(max_carry),
            carry_origin: 0,
            max_carry,
        }
    }

    pub fn has_carry(&self) -> bool {
        !self.carry.is_empty()
    }

    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }

    /// True when a chunk starting at `address` directly follows the carried
    /// bytes (or nothing is carried).
    pub fn continues_at(&self, address: u64) -> bool {
        self.carry.is_empty()
            || self.carry_origin.saturating_add(self.carry.len() as u64) == address
    }

    /// Build the working buffer from the carry and `chunk`, which starts at
    /// `address`. The carry is consumed.
    pub fn assemble(&mut self, address: u64, chunk: &[u8]) {
        self.working.clear();
        self.working_origin = if self.carry.is_empty() {
            address
        } else {
            self.carry_origin
        };
        self.working.extend_from_slice(&self.carry);
        self.carry.clear();
        self.working.extend_from_slice(chunk);
    }

    /// Move the carry alone into the working buffer. Used once no more data
    /// will follow it.
    pub fn assemble_final(&mut self) {
        self.working.clear();
        self.working_origin = self.carry_origin;
        self.working.extend_from_slice(&self.carry);
        self.carry.clear();
    }

    pub fn working(&self) -> &[u8] {
        &self.working
    }

    /// Address of the first working-buffer byte.
    pub fn working_origin(&self) -> u64 {
        self.working_origin
    }

    /// Keep `working[from..]`, truncated to the carry cap, for the next chunk.
    pub fn retain(&mut self, from: usize) {
        self.carry.clear();
        if from >= self.working.len() {
            return;
        }
        let end = self.working.len().min(from.saturating_add(self.max_carry));
        self.carry.extend_from_slice(&self.working[from..end]);
        self.carry_origin = self.working_origin.saturating_add(from as u64);
    }

    pub fn clear(&mut self) {
        self.working.clear();
        self.carry.clear();
    }

    /// Address ranges of the buffers owned by this value.
    pub fn owned_ranges(&self) -> [(u64, u64); 2] {
        let span = |v: &Vec<u8>| {
            let start = v.as_ptr() as u64;
            (start, start.saturating_add(v.capacity() as u64))
        };
        [span(&self.working), span(&self.carry)]
    }
}

impl std::fmt::Debug for CarryBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarryBuffer")
            .field("working_len", &self.working.len())
            .field("working_origin", &self.working_origin)
            .field("carry_len", &self.carry.len())
            .field("carry_origin", &self.carry_origin)
            .field("max_carry", &self.max_carry)
            .finish()
    }
}
