// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

/// Which kind of pass produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Every live record
    Full,
    /// Records touched within the trailing window, tombstones included
    Incremental,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one sync pass over one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub kind: &'static str,
    pub mode: SyncMode,
    /// Records read from the authoritative store
    pub total: usize,
    /// Documents acknowledged by the index
    pub succeeded: usize,
    /// Documents rejected, unencodable, or in a batch that ran out of retries
    pub failed: usize,
    /// Batches pushed
    pub batches: usize,
    /// Batches that still failed after retrying
    pub failed_batches: usize,
}

impl SyncReport {
    pub fn empty(kind: &'static str, mode: SyncMode) -> Self {
        Self {
            kind,
            mode,
            total: 0,
            succeeded: 0,
            failed: 0,
            batches: 0,
            failed_batches: 0,
        }
    }

    /// Check if every document reached the index
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
