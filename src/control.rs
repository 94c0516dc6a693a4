/// One open loop: where its loop-open instruction sits in the instruction
/// cache, and whether its body is being skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub entry: usize,
    pub skipping: bool,
}

/// What the engine must do after a loop-close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Close {
    /// A skipped loop ended; carry on with the next instruction.
    Exit,
    /// Jump back to the loop-open at this cache position to retest its
    /// condition.
    Repeat(usize),
}

/// Stack of open loops.
///
/// The loop condition is only ever tested at the loop-open: an executed
/// loop-close always jumps back to its loop-open, which then either enters
/// the body again or starts skipping it. While skipping, only brackets are
/// processed, and every nested loop-open is skipped as well, so the top
/// frame is skipping exactly when any frame is.
#[derive(Debug, Default)]
pub struct ControlStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl ControlStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while passing over the body of a loop whose condition was false.
    #[inline(always)]
    pub fn is_skipping(&self) -> bool {
        self.frames.last().is_some_and(|frame| frame.skipping)
    }

    /// Process a loop-open at cache position `entry` with `cell` being the
    /// current tape value.
    pub fn open(&mut self, entry: usize, cell: u8) {
        let skipping = self.is_skipping() || cell == 0;
        self.frames.push(Frame { entry, skipping });
        self.max_depth = self.max_depth.max(self.frames.len());
    }

    /// Process a loop-close. Returns `None` when no loop is open.
    pub fn close(&mut self) -> Option<Close> {
        let frame = self.frames.pop()?;
        if frame.skipping {
            Some(Close::Exit)
        } else {
            Some(Close::Repeat(frame.entry))
        }
    }

    /// Number of open loops.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Deepest nesting seen so far.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}
