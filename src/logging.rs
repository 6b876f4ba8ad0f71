// src/logging.rs

use tracing::Level;

/// Initializes the global tracing subscriber. Embedding apps typically want
/// `verbose` in debug builds; release builds keep warnings and errors.
pub fn init(verbose: bool) {
    let max_level = if verbose { Level::DEBUG } else { Level::WARN };

    // Ignore the error when a subscriber is already installed; tests and
    // embedders may both call this.
    let _ = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .try_init();
}
