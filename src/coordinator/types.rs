// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for the search engine coordinator.

/// Engine lifecycle state.
///
/// Use [`super::SearchEngine::state()`] to check current state or
/// [`super::SearchEngine::state_receiver()`] to watch for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Just built, not yet started
    Created,
    /// Checking configuration before the first sync
    Starting,
    /// Pushing every live record into the index
    FullSync,
    /// Ready to serve searches
    Ready,
    /// Incremental sync loop active
    Running,
    /// Graceful shutdown in progress
    ShuttingDown,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Starting => write!(f, "Starting"),
            Self::FullSync => write!(f, "FullSync"),
            Self::Ready => write!(f, "Ready"),
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
        }
    }
}
