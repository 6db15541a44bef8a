//! Runtime overrides applied after loading.
//!
//! ```text
//! ConfigLoader.load()  →  WeftConfig (files + env)
//!                              │
//!                              ▼
//!                     ConfigResolver.apply()   (CLI flags)
//!                              │
//!                              ▼
//!                     WeftConfig (final)
//! ```

use super::WeftConfig;

/// Applies overrides to a loaded configuration.
///
/// Only values the resolver actually carries should be applied.
pub trait ConfigResolver {
    /// Applies overrides to `config`.
    fn apply(&self, config: &mut WeftConfig);
}

/// Resolver that makes no changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpResolver;

impl ConfigResolver for NoOpResolver {
    fn apply(&self, _config: &mut WeftConfig) {}
}
