pub(crate) mod attempt_timing;
pub(crate) mod eligibility;
pub(crate) mod exam_rules;
pub(crate) mod scoring;
