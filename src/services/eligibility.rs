use crate::db::models::AssignmentCriteria;

/// The profile slice the matcher looks at. Faculty/admin accounts simply
/// leave everything unset.
#[derive(Debug, Clone, Default)]
pub(crate) struct StudentProfile {
    pub(crate) college: Option<String>,
    pub(crate) year: Option<i32>,
    pub(crate) department: Option<String>,
    pub(crate) section: Option<i32>,
}

/// Decides whether an exam is visible/startable for a student. Every
/// criterion is optional; the ones that are set must all pass.
pub(crate) fn matches(criteria: &AssignmentCriteria, student: &StudentProfile) -> bool {
    if let (Some(wanted), Some(actual)) = (&criteria.college, &student.college) {
        if norm(wanted) != norm(actual) {
            return false;
        }
    }

    if !criteria.year.is_empty() {
        match student.year {
            Some(year) if criteria.year.contains(&year) => {}
            _ => return false,
        }
    }

    if !criteria.department.is_empty() {
        let Some(department) = &student.department else {
            return false;
        };
        let department = norm(department);
        if !criteria.department.iter().any(|entry| norm(entry) == department) {
            return false;
        }
    }

    if !criteria.section.is_empty() {
        match student.section {
            Some(section) if criteria.section.contains(&section) => {}
            _ => return false,
        }
    }

    true
}

fn norm(value: &str) -> String {
    value.trim().to_lowercase()
}
