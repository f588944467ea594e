//! Reader configuration.

use strata_common::{Result, error::Error};

/// Default upper bound on the number of rows in one batch.
pub const DEFAULT_MAX_BATCH_ROWS: usize = 10_000;

/// Configuration shared by every reader of one reader tree.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Defer decoding of projected, unfiltered top-level children until their lazy
    /// vectors are loaded. When disabled, every child is extracted eagerly.
    pub lazy_loading: bool,
    /// Measure per-child filter selectivity and cost.
    pub track_selectivity: bool,
    /// Maximum number of rows requested by a single `next` call.
    pub max_batch_rows: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            lazy_loading: true,
            track_selectivity: true,
            max_batch_rows: DEFAULT_MAX_BATCH_ROWS,
        }
    }
}

impl ReaderConfig {
    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_rows == 0 {
            return Err(Error::invalid_arg(
                "max_batch_rows",
                "must be greater than 0",
            ));
        }
        if self.max_batch_rows > u32::MAX as usize {
            return Err(Error::invalid_arg(
                "max_batch_rows",
                "row indices within a batch must fit in u32",
            ));
        }
        Ok(())
    }

    /// Eager variant of this configuration (no lazy vectors).
    pub fn eager(mut self) -> Self {
        self.lazy_loading = false;
        self
    }
}
