use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Faculty,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "attemptstatus", rename_all = "kebab-case")]
pub(crate) enum AttemptStatus {
    InProgress,
    Submitted,
    Invalid,
}

impl AttemptStatus {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, Self::Submitted | Self::Invalid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "violationkind", rename_all = "kebab-case")]
pub(crate) enum ViolationKind {
    TabBlur,
    VisibilityHidden,
    FullscreenExit,
    ReturnTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum QuestionKind {
    Single,
    Mcq,
    Text,
}
