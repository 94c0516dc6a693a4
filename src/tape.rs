/// Default number of cells a fresh tape starts with.
pub const DEFAULT_CELLS: usize = 300;

/// Why a cursor move failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Underflow;

/// The growable byte memory acted on by data instructions.
///
/// Cells are zero-initialized. Capacity only ever grows: moving the cursor
/// right past the last cell doubles the capacity and zero-fills the new
/// half, preserving existing contents. Moving left of cell 0 is refused.
/// Cell arithmetic wraps modulo 256.
#[derive(Debug, Clone)]
pub struct Tape {
    cells: Vec<u8>,
    cursor: usize,
}

impl Default for Tape {
    fn default() -> Self {
        Self::new(DEFAULT_CELLS)
    }
}

impl Tape {
    /// Create a tape with `cells` zeroed cells (at least one).
    pub fn new(cells: usize) -> Self {
        Self {
            cells: vec![0u8; cells.max(1)],
            cursor: 0,
        }
    }

    #[inline(always)]
    pub fn read(&self) -> u8 {
        self.cells[self.cursor]
    }

    #[inline(always)]
    pub fn write(&mut self, value: u8) {
        self.cells[self.cursor] = value;
    }

    #[inline(always)]
    pub fn increment(&mut self) {
        let cell = &mut self.cells[self.cursor];
        *cell = cell.wrapping_add(1);
    }

    #[inline(always)]
    pub fn decrement(&mut self) {
        let cell = &mut self.cells[self.cursor];
        *cell = cell.wrapping_sub(1);
    }

    /// Move the cursor one cell right. Returns true if the tape grew.
    pub fn move_right(&mut self) -> bool {
        self.cursor += 1;
        if self.cursor == self.cells.len() {
            self.grow();
            true
        } else {
            false
        }
    }

    /// Move the cursor one cell left. The cursor is left untouched on
    /// underflow.
    pub fn move_left(&mut self) -> Result<(), Underflow> {
        self.cursor = self.cursor.checked_sub(1).ok_or(Underflow)?;
        Ok(())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Double the capacity, zero-filling the new half.
    fn grow(&mut self) {
        let new_len = self.cells.len() * 2;
        self.cells.resize(new_len, 0);
        tracing::trace!(capacity = new_len, "tape grew");
    }
}
