//! Progress flags - named booleans raised on scene entry.
//!
//! Flags are written only by the interpreter while entering a scene that
//! lists them in `onEnterSetFlags`. Hosts get read-only access and use the
//! flags to pick which scene a world hotspot should load.

use std::collections::BTreeSet;

/// Process-lifetime flag store. Unknown flags read as `false`.
#[derive(Debug, Clone, Default)]
pub struct FlagStore {
    raised: BTreeSet<String>,
}

impl FlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a flag
    pub fn is_set(&self, flag: &str) -> bool {
        self.raised.contains(flag)
    }

    /// True when every listed flag is set
    pub fn all_set(&self, flags: &[&str]) -> bool {
        flags.iter().all(|f| self.is_set(f))
    }

    /// Raised flags, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.raised.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.raised.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raised.is_empty()
    }

    /// Raise a flag. Returns `true` the first time, `false` if it was
    /// already set (raising is idempotent).
    pub(crate) fn raise(&mut self, flag: &str) -> bool {
        if self.raised.insert(flag.to_string()) {
            tracing::info!("Flag raised: {}", flag);
            true
        } else {
            tracing::debug!("Flag already set: {}", flag);
            false
        }
    }
}
