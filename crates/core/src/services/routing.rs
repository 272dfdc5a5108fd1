//! Enrollment routing policy.

use academy_db::entities::enrollment_request::RoutingPath;
use chrono::{Datelike, NaiveDate};

/// Facts about a student that decide who acts on an enrollment request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingInput {
    /// At least one guardian link exists and is confirmed.
    pub has_confirmed_guardian: bool,
    /// At least one guardian link exists, confirmed or not.
    pub has_linked_guardian: bool,
    /// Whole years of age, when the date of birth is known.
    pub age: Option<u32>,
    /// Whether the student is flagged as needing a guardian.
    pub requires_guardian: bool,
}

/// Decides the enrollment path for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPolicy {
    adult_age: u32,
}

impl RoutingPolicy {
    /// Create a policy with the given adult age threshold.
    #[must_use]
    pub const fn new(adult_age: u32) -> Self {
        Self { adult_age }
    }

    /// Adult age threshold in whole years.
    #[must_use]
    pub const fn adult_age(&self) -> u32 {
        self.adult_age
    }

    /// Pick the path; the first matching rule wins.
    #[must_use]
    pub fn route(&self, input: &RoutingInput) -> RoutingPath {
        if input.has_confirmed_guardian {
            return RoutingPath::ParentPayment;
        }

        let is_adult = input.age.is_some_and(|age| age >= self.adult_age);
        if is_adult || !input.requires_guardian {
            return RoutingPath::StudentPayment;
        }

        let is_minor = input.age.is_some_and(|age| age < self.adult_age);
        if is_minor && !input.has_linked_guardian {
            return RoutingPath::ParentRegistration;
        }

        RoutingPath::AdminReview
    }
}

/// Whole years between `date_of_birth` and `today`.
#[must_use]
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    fn minor() -> RoutingInput {
        RoutingInput {
            age: Some(16),
            requires_guardian: true,
            ..RoutingInput::default()
        }
    }

    #[test]
    fn test_confirmed_guardian_wins() {
        let policy = RoutingPolicy::new(18);
        let input = RoutingInput {
            has_confirmed_guardian: true,
            has_linked_guardian: true,
            age: Some(30),
            requires_guardian: false,
        };
        assert_eq!(policy.route(&input), RoutingPath::ParentPayment);
    }

    #[test]
    fn test_adult_pays_themselves() {
        let policy = RoutingPolicy::new(18);
        let input = RoutingInput {
            age: Some(18),
            ..minor()
        };
        assert_eq!(policy.route(&input), RoutingPath::StudentPayment);
    }

    #[test]
    fn test_no_guardian_requirement_pays_themselves() {
        let policy = RoutingPolicy::new(18);
        let input = RoutingInput {
            age: None,
            requires_guardian: false,
            ..RoutingInput::default()
        };
        assert_eq!(policy.route(&input), RoutingPath::StudentPayment);
    }

    #[test]
    fn test_minor_without_guardian_needs_registration() {
        let policy = RoutingPolicy::new(18);
        assert_eq!(policy.route(&minor()), RoutingPath::ParentRegistration);
    }

    #[test]
    fn test_minor_with_unconfirmed_guardian_goes_to_review() {
        let policy = RoutingPolicy::new(18);
        let input = RoutingInput {
            has_linked_guardian: true,
            ..minor()
        };
        assert_eq!(policy.route(&input), RoutingPath::AdminReview);
    }

    #[test]
    fn test_unknown_age_goes_to_review() {
        let policy = RoutingPolicy::new(18);
        let input = RoutingInput {
            age: None,
            ..minor()
        };
        assert_eq!(policy.route(&input), RoutingPath::AdminReview);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let policy = RoutingPolicy::new(16);
        assert_eq!(policy.route(&minor()), RoutingPath::StudentPayment);
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let dob = date(2008, 6, 15);
        assert_eq!(age_on(dob, date(2024, 6, 14)), Some(15));
        assert_eq!(age_on(dob, date(2024, 6, 15)), Some(16));
        assert_eq!(age_on(dob, date(2007, 1, 1)), None);
    }
}
