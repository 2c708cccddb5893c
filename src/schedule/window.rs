use chrono::{DateTime, Duration, Utc};

/// The bounded interval during which a posted task can be joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipationWindow {
    pub opened_at: DateTime<Utc>,
    pub deadline_minutes: i64,
}

impl ParticipationWindow {
    pub fn new(opened_at: DateTime<Utc>, deadline_minutes: i64) -> Self {
        Self {
            opened_at,
            deadline_minutes: deadline_minutes.max(0),
        }
    }

    pub fn closes_at(&self) -> DateTime<Utc> {
        self.opened_at + Duration::minutes(self.deadline_minutes)
    }

    /// Inclusive at both ends.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        now >= self.opened_at && now <= self.closes_at()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.closes_at()
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let remaining = self.closes_at() - now;
        if remaining < Duration::zero() {
            Duration::zero()
        } else {
            remaining
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn opened() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = ParticipationWindow::new(opened(), 10);
        assert!(window.is_open(opened()));
        assert!(window.is_open(opened() + Duration::minutes(10)));
        assert!(!window.is_open(opened() + Duration::minutes(10) + Duration::seconds(1)));
        assert!(!window.is_open(opened() - Duration::seconds(1)));
    }

    #[test]
    fn test_remaining_never_negative() {
        let window = ParticipationWindow::new(opened(), 10);
        assert_eq!(window.remaining(opened() + Duration::minutes(4)), Duration::minutes(6));
        assert_eq!(window.remaining(opened() + Duration::hours(1)), Duration::zero());
        assert!(window.is_expired(opened() + Duration::minutes(11)));
    }

    #[test]
    fn test_negative_deadline_is_clamped() {
        let window = ParticipationWindow::new(opened(), -5);
        assert_eq!(window.closes_at(), opened());
    }
}
