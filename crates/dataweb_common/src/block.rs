//! Block state as displayed on an instrument's dataweb screen.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection state of a block's underlying PV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    Connected,
    Disconnected,
}

/// A single configured block with its current archive state.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub status: BlockStatus,
    pub value: Value,
    pub alarm: String,
    pub visibility: bool,
    pub units: String,
}

impl Block {
    pub fn new(
        name: impl Into<String>,
        status: BlockStatus,
        value: Value,
        alarm: impl Into<String>,
        visibility: bool,
        units: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            value,
            alarm: alarm.into(),
            visibility,
            units: units.into(),
        }
    }

    /// A block with no live archive data behind it.
    pub fn disconnected(name: impl Into<String>) -> Self {
        Self::new(name, BlockStatus::Disconnected, Value::Null, "", true, "")
    }

    pub fn is_connected(&self) -> bool {
        self.status == BlockStatus::Connected
    }

    /// The wire form served to dataweb clients.
    ///
    /// Units are folded into the value string; a unitless block keeps its
    /// raw value untouched so numbers stay numbers.
    pub fn details(&self) -> BlockDetails {
        let value = if self.units.is_empty() {
            self.value.clone()
        } else {
            Value::String(format!("{} {}", render_value(&self.value), self.units))
        };

        BlockDetails {
            status: self.status,
            value,
            alarm: self.alarm.clone(),
            visibility: self.visibility,
        }
    }
}

/// Serialized block state: what a dataweb screen actually receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDetails {
    pub status: BlockStatus,
    pub value: Value,
    pub alarm: String,
    pub visibility: bool,
}

/// Render a JSON value the way it reads on screen (no quotes on strings).
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_details_without_units_keeps_raw_value() {
        let block = Block::new("Temp1", BlockStatus::Connected, json!(1.5), "NONE", true, "");
        let details = block.details();
        assert_eq!(details.value, json!(1.5));
        assert_eq!(details.alarm, "NONE");
        assert!(details.visibility);
    }

    #[test]
    fn test_details_appends_units() {
        let block = Block::new("Temp1", BlockStatus::Connected, json!(1.5), "NONE", true, "K");
        assert_eq!(block.details().value, json!("1.5 K"));
    }

    #[test]
    fn test_string_value_not_double_quoted() {
        let block = Block::new(
            "Title",
            BlockStatus::Connected,
            json!("run 42"),
            "",
            true,
            "s",
        );
        assert_eq!(block.details().value, json!("run 42 s"));
    }

    #[test]
    fn test_disconnected_block() {
        let block = Block::disconnected("Spare");
        assert!(!block.is_connected());
        assert_eq!(block.details().value, Value::Null);
    }

    #[test]
    fn test_status_serializes_as_word() {
        let json = serde_json::to_string(&BlockStatus::Disconnected).unwrap();
        assert_eq!(json, "\"Disconnected\"");
    }
}
