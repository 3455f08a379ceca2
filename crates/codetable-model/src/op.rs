//! Pending operations.
//!
//! A batch is an ordered list of proposed edits. Order is semantically
//! significant: the conflict checker replays operations in array order, and
//! the commit step applies them in array order.

use crate::entry::{Code, EntryType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One proposed edit inside a batch.
///
/// Action-specific required fields live on the variant: a `Change` carries
/// its `old_word` by construction, so "missing old word" is a decode-time
/// rejection, not a conflict the checker has to report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PendingOperation {
    Create {
        word: String,
        code: Code,
        #[serde(rename = "type")]
        entry_type: EntryType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remark: Option<String>,
    },
    Change {
        old_word: String,
        word: String,
        code: Code,
        #[serde(rename = "type")]
        entry_type: EntryType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remark: Option<String>,
    },
    Delete {
        word: String,
        code: Code,
        #[serde(rename = "type")]
        entry_type: EntryType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remark: Option<String>,
    },
}

impl PendingOperation {
    pub const fn action(&self) -> OpAction {
        match self {
            Self::Create { .. } => OpAction::Create,
            Self::Change { .. } => OpAction::Change,
            Self::Delete { .. } => OpAction::Delete,
        }
    }

    pub fn code(&self) -> &Code {
        match self {
            Self::Create { code, .. } | Self::Change { code, .. } | Self::Delete { code, .. } => {
                code
            }
        }
    }

    /// The word this operation is "about": the created word, the new word of
    /// a change, or the deleted word.
    pub fn word(&self) -> &str {
        match self {
            Self::Create { word, .. } | Self::Change { word, .. } | Self::Delete { word, .. } => {
                word
            }
        }
    }

    pub const fn entry_type(&self) -> EntryType {
        match self {
            Self::Create { entry_type, .. }
            | Self::Change { entry_type, .. }
            | Self::Delete { entry_type, .. } => *entry_type,
        }
    }

    pub const fn explicit_weight(&self) -> Option<i64> {
        match self {
            Self::Create { weight, .. } | Self::Change { weight, .. } => *weight,
            Self::Delete { .. } => None,
        }
    }

    /// The (word, code) pair this operation removes from its code, if any:
    /// a Delete removes its target, a Change vacates its old word.
    pub fn removes(&self) -> Option<(&str, &Code)> {
        match self {
            Self::Create { .. } => None,
            Self::Change { old_word, code, .. } => Some((old_word, code)),
            Self::Delete { word, code, .. } => Some((word, code)),
        }
    }

    /// The (word, code) pair this operation introduces, if any: a Create adds
    /// its word, a Change adds its new word.
    pub fn introduces(&self) -> Option<(&str, &Code)> {
        match self {
            Self::Create { word, code, .. } | Self::Change { word, code, .. } => {
                Some((word, code))
            }
            Self::Delete { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpAction {
    Create,
    Change,
    Delete,
}

impl OpAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Change => "change",
            Self::Delete => "delete",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Create => "新增",
            Self::Change => "修改",
            Self::Delete => "删除",
        }
    }
}

impl fmt::Display for OpAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordering constraint recorded when a conflict was resolved in-batch: the
/// operation at `depends_on` neutralizes the conflict of the operation at
/// `dependent`, so it must come first for the batch to commit cleanly.
///
/// Edges are metadata for display; the commit step applies operations
/// strictly in array order and batch authors are responsible for ordering
/// consistently with the edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub dependent: usize,
    pub depends_on: usize,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> Code {
        Code::new(s).unwrap()
    }

    #[test]
    fn operation_serde_is_action_tagged() {
        let op = PendingOperation::Create {
            word: "茹果".to_string(),
            code: code("rjgl"),
            entry_type: EntryType::Phrase,
            weight: None,
            remark: None,
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["action"], "create");
        assert_eq!(json["type"], "phrase");
        assert!(json.get("weight").is_none());
    }

    #[test]
    fn change_without_old_word_is_rejected_at_decode() {
        let err = serde_json::from_str::<PendingOperation>(
            r#"{"action":"change","word":"茹果","code":"rjgl","type":"phrase"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn removes_and_introduces() {
        let op = PendingOperation::Change {
            old_word: "如果".to_string(),
            word: "茹果".to_string(),
            code: code("rjgl"),
            entry_type: EntryType::Phrase,
            weight: None,
            remark: None,
        };
        assert_eq!(op.removes().unwrap().0, "如果");
        assert_eq!(op.introduces().unwrap().0, "茹果");

        let del = PendingOperation::Delete {
            word: "如果".to_string(),
            code: code("rjgl"),
            entry_type: EntryType::Phrase,
            remark: None,
        };
        assert_eq!(del.removes().unwrap().0, "如果");
        assert!(del.introduces().is_none());
    }
}
