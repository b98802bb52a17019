//! Channel group model.

use serde::Serialize;

/// Group id meaning "no group".
pub const GROUP_NONE: i64 = 0;

/// A named ordering bucket for channels. TV and radio keep separate
/// group sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelGroup {
    /// Store-assigned id; -1 until persisted.
    pub id: i64,
    pub name: String,
    pub sort_order: i32,
    pub radio: bool,
}

impl ChannelGroup {
    pub fn new(name: &str, sort_order: i32, radio: bool) -> Self {
        Self {
            id: -1,
            name: name.to_string(),
            sort_order,
            radio,
        }
    }
}
