use std::path::PathBuf;

/// Explicit configuration passed into a [`crate::Debugger`] at construction.
///
/// The core never reads a global or an environment variable for a
/// behavioural flag; every flag it needs arrives through this struct.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Disables colour in anything the core hands back for display; the
    /// core itself never prints, but passes this through to callers that
    /// format its output.
    pub no_color: bool,

    /// Extra search path for library sources the oracle can't find next to
    /// the compile unit's recorded path.
    pub stdlib_path: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }
}
