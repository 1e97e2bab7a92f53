use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckLevel {
    Allow,
    Warn,
    Error,
}

impl CheckLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckLevel::Allow => "allow",
            CheckLevel::Warn => "warning",
            CheckLevel::Error => "error",
        }
    }

    pub fn is_reported(&self) -> bool {
        !matches!(self, CheckLevel::Allow)
    }
}

impl Default for CheckLevel {
    fn default() -> Self {
        Self::Warn
    }
}
