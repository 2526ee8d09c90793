/// Per-invocation sync report accumulator.
///
/// One value is created per entry point, threaded through the run and
/// returned to the caller. Lines are mirrored to the process logger so a
/// run is also visible on stderr.
#[derive(Debug, Default)]
pub struct SyncLog {
    lines: Vec<String>,
}

impl SyncLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::info!(target: "sloper", "{}", line);
        self.lines.push(line);
    }

    pub fn warn(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::warn!(target: "sloper", "{}", line);
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Outcome counters for one entity pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncStats {
    pub inserted: usize,
    pub updated: usize,
    pub aliased: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncStats {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.aliased + self.skipped + self.failed
    }

    /// Number of records that produced or refreshed a local entity.
    pub fn synced(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn summarize(&self, log: &mut SyncLog, what: &str) {
        log.info(format!(
            "{}: {} inserted, {} updated, {} aliased, {} skipped, {} failed ({} total)",
            what, self.inserted, self.updated, self.aliased, self.skipped, self.failed,
            self.total()
        ));
    }
}
