/// Limits for compiling bindings and planning calls
/// ## Fields
/// - `max_rounds`:
///   How many rounds of default expansion a compile pass may take before it's considered
///   divergent and aborted.
/// - `max_depth`:
///   Nesting level at which a non-empty array literal is rejected.
///   The top-level array of an argument is the first level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub max_rounds: usize,
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_rounds: 32,
            max_depth: 32,
        }
    }
}
