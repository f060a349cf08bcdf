/// Per-run tallies. Only the engine mutates these.
#[derive(Debug, Clone, Default)]
pub struct RunCounters {
    successful_submits: u32,
    max_jobs: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl RunCounters {
    pub fn new(max_jobs: u32) -> Self {
        Self {
            max_jobs,
            ..Self::default()
        }
    }

    pub fn successful_submits(&self) -> u32 {
        self.successful_submits
    }

    pub fn max_jobs(&self) -> u32 {
        self.max_jobs
    }

    pub fn ceiling_reached(&self) -> bool {
        self.successful_submits >= self.max_jobs
    }

    /// Counts a confirmed submission. Returns false, leaving the count unchanged, once the
    /// ceiling has been reached.
    pub fn record_submit(&mut self) -> bool {
        if self.ceiling_reached() {
            return false;
        }
        self.successful_submits += 1;
        true
    }
}
