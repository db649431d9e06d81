use std::collections::HashMap;

/// Last known liveness per channel. Memory only, so a restart while a
/// channel is live announces it once more.
#[derive(Debug, Default)]
pub struct StreamStateTracker {
    live: HashMap<String, bool>,
}

impl StreamStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful status query and reports whether it is an
    /// offline→live transition.
    ///
    /// | previous          | now     | returns | new state |
    /// |-------------------|---------|---------|-----------|
    /// | unknown / offline | live    | `true`  | live      |
    /// | live              | live    | `false` | live      |
    /// | any               | offline | `false` | offline   |
    ///
    /// Failed queries must not be recorded; they leave the state unchanged.
    pub fn observe(&mut self, channel: &str, is_live: bool) -> bool {
        let was_live = self.live.insert(channel.to_string(), is_live).unwrap_or(false);
        is_live && !was_live
    }

    pub fn is_live(&self, channel: &str) -> bool {
        self.live.get(channel).copied().unwrap_or(false)
    }
}
