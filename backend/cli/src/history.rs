use nitrilens_core::{AnalysisResult, ConcentrationUnit, HistoryEntry, HistoryStats};

/// Successful analyses of the current session. Never written to disk.
#[derive(Debug, Default)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &AnalysisResult, unit: ConcentrationUnit) -> &HistoryEntry {
        self.entries.push(HistoryEntry::from_result(result, unit));
        &self.entries[self.entries.len() - 1]
    }

    /// Up to `n` most recent entries, oldest first.
    pub fn recent(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats::compute(&self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
