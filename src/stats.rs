use std::fmt;

/// Counters collected over one run of the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Tokens fetched from the instruction cache, including repeats.
    pub fetched: u64,
    /// Tokens dispatched (not skipped). Comments count.
    pub dispatched: u64,
    /// Tokens passed over inside skipped loop bodies.
    pub skipped: u64,
    pub bytes_written: u64,
    pub bytes_read: u64,
    /// Input instructions that hit end of stream.
    pub eof_reads: u64,
    pub peak_cells: usize,
    pub peak_cache_len: usize,
    pub compactions: u64,
    pub max_loop_depth: usize,
    /// Loops still open when the source ran out.
    pub unclosed_loops: usize,
}

impl RunStats {
    /// Share of fetched tokens that were skipped, between 0 and 1.
    pub fn skip_ratio(&self) -> f64 {
        if self.fetched == 0 {
            return 0.0;
        }
        self.skipped as f64 / self.fetched as f64
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run statistics:")?;
        writeln!(f, "  Fetched:           {}", self.fetched)?;
        writeln!(f, "  Dispatched:        {}", self.dispatched)?;
        writeln!(f, "  Skipped:           {} ({:.1}%)", self.skipped, self.skip_ratio() * 100.0)?;
        writeln!(f, "  Bytes written:     {}", self.bytes_written)?;
        writeln!(f, "  Bytes read:        {} ({} at EOF)", self.bytes_read, self.eof_reads)?;
        writeln!(f, "  Peak tape cells:   {}", self.peak_cells)?;
        writeln!(f, "  Peak cache length: {}", self.peak_cache_len)?;
        writeln!(f, "  Compactions:       {}", self.compactions)?;
        writeln!(f, "  Max loop depth:    {}", self.max_loop_depth)?;
        write!(f, "  Unclosed loops:    {}", self.unclosed_loops)
    }
}
