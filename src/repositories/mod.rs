pub(crate) mod attempts;
pub(crate) mod exams;
pub(crate) mod proctor_events;
pub(crate) mod retake_grants;
pub(crate) mod users;
