//! Tag delta computation
//!
//! The service treats tags as key → value with overwrite-on-add, so a changed
//! value is re-added rather than removed first.

use crate::types::Tags;
use serde::{Deserialize, Serialize};

/// Minimal change moving live tags to desired tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDelta {
    /// Pairs to apply (new keys and changed values)
    pub add: Tags,
    /// Keys to remove (present live, absent from desired)
    pub remove: Vec<String>,
}

impl TagDelta {
    /// Compute the delta from `live` to `desired`
    #[must_use]
    pub fn between(live: &Tags, desired: &Tags) -> Self {
        let remove = live
            .keys()
            .filter(|key| !desired.contains_key(*key))
            .cloned()
            .collect();
        let add = desired
            .iter()
            .filter(|(key, value)| live.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self { add, remove }
    }

    /// Nothing to change
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}
