//! Per-option reconciliation policy.

use ahash::AHashMap;
use bitflags::bitflags;

use crate::types::SettingName;

bitflags! {
    /// Behavior flags attached to an option name.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct OptionFlags: u8 {
        /// Once set, the option persists even when it disappears from the
        /// desired snapshot. Its disappearance is never reported as removal.
        const STICKY = 1 << 0;
        /// A change to this option invalidates enough engine state that a
        /// partial update is not safe - force a full settings replace.
        const FULL_RELOAD = 1 << 1;
        /// The row-collection shape heuristic applies to this option.
        const ROW_DATA = 1 << 2;
    }
}

/// Maps option names to their reconciliation flags. Unknown options carry
/// no flags and are compared by plain value/reference equality.
#[derive(Debug, Default)]
pub struct OptionPolicy {
    flags: AHashMap<SettingName, OptionFlags>,
}

impl OptionPolicy {
    /// Policy with no flagged options at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The conventional policy: the `data` option carries the row-data
    /// heuristic.
    pub fn standard() -> Self {
        Self::empty().with("data", OptionFlags::ROW_DATA)
    }

    /// Add flags for an option (merged with any existing flags).
    pub fn with(mut self, name: impl Into<SettingName>, flags: OptionFlags) -> Self {
        *self.flags.entry(name.into()).or_default() |= flags;
        self
    }

    pub fn flags_for(&self, name: &str) -> OptionFlags {
        self.flags.get(name).copied().unwrap_or_default()
    }

    pub fn is_sticky(&self, name: &str) -> bool {
        self.flags_for(name).contains(OptionFlags::STICKY)
    }

    pub fn forces_full_reload(&self, name: &str) -> bool {
        self.flags_for(name).contains(OptionFlags::FULL_RELOAD)
    }

    pub fn is_row_data(&self, name: &str) -> bool {
        self.flags_for(name).contains(OptionFlags::ROW_DATA)
    }

    /// The option carrying the `ROW_DATA` flag, if any. By convention at
    /// most one option does.
    pub fn row_data_key(&self) -> Option<&str> {
        self.flags
            .iter()
            .find(|(_, flags)| flags.contains(OptionFlags::ROW_DATA))
            .map(|(name, _)| name.as_str())
    }
}
