use serde::{Deserialize, Serialize};

/// The provenance record attached to a commit.
///
/// Tasks travel with commits verbatim: a merge commit carries the task
/// supplied by the caller at merge time, never a blend of its parents'.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Creation date, seconds since the Unix epoch.
    pub date: i64,
    /// Who performed the operation.
    pub owner: String,
    /// Caller-assigned identifier, grouping related commits.
    pub uid: u64,
    /// Free-form messages, in the order they were appended.
    pub messages: Vec<String>,
}

impl Task {
    /// Create a task with no messages.
    pub fn new(date: i64, owner: impl Into<String>, uid: u64) -> Self {
        Self {
            date,
            owner: owner.into(),
            uid,
            messages: Vec::new(),
        }
    }

    /// Append a message, builder style.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_appends_messages_in_order() {
        let task = Task::new(1_700_000_000, "alice", 7)
            .with_message("first")
            .with_message("second");
        assert_eq!(task.owner, "alice");
        assert_eq!(task.uid, 7);
        assert_eq!(task.messages, vec!["first", "second"]);
    }

    #[test]
    fn serde_roundtrip() {
        let task = Task::new(42, "bob", 1).with_message("hello");
        let json = serde_json::to_string(&task).unwrap();
        let parsed: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(task, parsed);
    }
}
