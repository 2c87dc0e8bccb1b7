use serde::{Deserialize, Serialize};
use std::fmt;

pub mod store;

/// Marks an assistant turn that reports a failure instead of a query.
pub const ERROR_PREFIX: &str = "ERROR: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn error(message: impl AsRef<str>) -> Self {
        Self::assistant(format!("{ERROR_PREFIX}{}", message.as_ref()))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_error(&self) -> bool {
        self.role == Role::Assistant && self.content.starts_with(ERROR_PREFIX)
    }

    pub fn log_line(&self) -> String {
        format!("{}: {}", self.role.as_str().to_ascii_uppercase(), self.content)
    }
}

/// Ordered, append-only conversation log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn render_log(&self) -> String {
        self.turns
            .iter()
            .map(Turn::log_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Vec<Turn>> for History {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

#[cfg(test)]
mod tests {
    use super::{History, Role, Turn};

    #[test]
    fn error_turn_is_assistant_with_prefix() {
        let turn = Turn::error("model unavailable");
        assert_eq!(turn.role(), Role::Assistant);
        assert_eq!(turn.content(), "ERROR: model unavailable");
        assert!(turn.is_error());
        assert!(!Turn::assistant("select 1").is_error());
    }

    #[test]
    fn render_log_uppercases_roles_one_turn_per_line() {
        let history = History::from(vec![
            Turn::user("count rows"),
            Turn::assistant("select count(*) from t"),
        ]);
        assert_eq!(
            history.render_log(),
            "USER: count rows\nASSISTANT: select count(*) from t"
        );
    }

    #[test]
    fn serializes_as_plain_array_of_role_content_pairs() {
        let history = History::from(vec![Turn::user("hi")]);
        let text = serde_json::to_string(&history).expect("history should serialize");
        assert_eq!(text, r#"[{"role":"user","content":"hi"}]"#);
    }
}
