//! Helpers for manipulating status condition lists.
//!
//! Semantics follow `meta.SetStatusCondition` from apimachinery: the
//! transition time only moves when the status of a condition changes.

use chrono::{SubsecRound, Utc};

use crate::constants::conditions::{STATUS_FALSE, STATUS_TRUE};
use crate::crds::Condition;

/// Insert or update `new` in `conditions`, keyed by type.
///
/// Returns true if the list changed.
pub fn set_status_condition(conditions: &mut Vec<Condition>, mut new: Condition) -> bool {
    let Some(existing) = conditions.iter_mut().find(|c| c.type_ == new.type_) else {
        if new.last_transition_time.is_none() {
            new.last_transition_time = Some(Utc::now().trunc_subsecs(0));
        }
        conditions.push(new);
        return true;
    };

    let mut changed = false;

    if existing.status != new.status {
        existing.status = new.status;
        existing.last_transition_time = Some(
            new.last_transition_time
                .unwrap_or_else(|| Utc::now().trunc_subsecs(0)),
        );
        changed = true;
    }

    if existing.reason != new.reason {
        existing.reason = new.reason;
        changed = true;
    }

    if existing.message != new.message {
        existing.message = new.message;
        changed = true;
    }

    if existing.observed_generation != new.observed_generation {
        existing.observed_generation = new.observed_generation;
        changed = true;
    }

    changed
}

/// Remove the condition of the given type. Returns true if one was removed.
pub fn remove_status_condition(conditions: &mut Vec<Condition>, type_: &str) -> bool {
    let before = conditions.len();
    conditions.retain(|c| c.type_ != type_);
    conditions.len() != before
}

pub fn find_status_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

pub fn is_status_condition_true(conditions: &[Condition], type_: &str) -> bool {
    is_status_condition_present_and_equal(conditions, type_, STATUS_TRUE)
}

pub fn is_status_condition_false(conditions: &[Condition], type_: &str) -> bool {
    is_status_condition_present_and_equal(conditions, type_, STATUS_FALSE)
}

pub fn is_status_condition_present_and_equal(
    conditions: &[Condition],
    type_: &str,
    status: &str,
) -> bool {
    find_status_condition(conditions, type_).is_some_and(|c| c.status == status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::conditions::*;
    use chrono::{DateTime, TimeZone};

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_set_appends_with_transition_time() {
        let mut conditions = Vec::new();
        let changed = set_status_condition(
            &mut conditions,
            Condition::new(TYPE_AVAILABLE, STATUS_UNKNOWN, REASON_RECONCILING, "Starting reconciliation"),
        );
        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert!(conditions[0].last_transition_time.is_some());
    }

    #[test]
    fn test_set_keeps_explicit_transition_time() {
        let mut conditions = Vec::new();
        let mut cond = Condition::new(TYPE_AVAILABLE, STATUS_TRUE, REASON_RECONCILING, "ok");
        cond.last_transition_time = Some(fixed_time());
        set_status_condition(&mut conditions, cond);
        assert_eq!(conditions[0].last_transition_time, Some(fixed_time()));
    }

    #[test]
    fn test_same_status_does_not_move_transition_time() {
        let mut conditions = vec![Condition {
            last_transition_time: Some(fixed_time()),
            ..Condition::new(TYPE_AVAILABLE, STATUS_TRUE, REASON_RECONCILING, "old message")
        }];

        let changed = set_status_condition(
            &mut conditions,
            Condition::new(TYPE_AVAILABLE, STATUS_TRUE, REASON_RECONCILING, "new message"),
        );

        assert!(changed);
        assert_eq!(conditions[0].message, "new message");
        assert_eq!(conditions[0].last_transition_time, Some(fixed_time()));
    }

    #[test]
    fn test_status_change_moves_transition_time() {
        let mut conditions = vec![Condition {
            last_transition_time: Some(fixed_time()),
            ..Condition::new(TYPE_AVAILABLE, STATUS_UNKNOWN, REASON_RECONCILING, "Starting reconciliation")
        }];

        set_status_condition(
            &mut conditions,
            Condition::new(TYPE_AVAILABLE, STATUS_TRUE, REASON_RECONCILING, "done"),
        );

        assert_eq!(conditions[0].status, STATUS_TRUE);
        assert!(conditions[0].last_transition_time.unwrap() > fixed_time());
    }

    #[test]
    fn test_identical_condition_is_not_a_change() {
        let cond = Condition::new(TYPE_DEGRADED, STATUS_TRUE, REASON_FINALIZING, "done")
            .with_observed_generation(Some(2));
        let mut conditions = Vec::new();
        assert!(set_status_condition(&mut conditions, cond.clone()));
        assert!(!set_status_condition(&mut conditions, cond));
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn test_observed_generation_update_is_a_change() {
        let mut conditions = Vec::new();
        let cond = Condition::new(TYPE_AVAILABLE, STATUS_TRUE, REASON_RECONCILING, "ok");
        set_status_condition(&mut conditions, cond.clone().with_observed_generation(Some(1)));
        assert!(set_status_condition(&mut conditions, cond.with_observed_generation(Some(2))));
        assert_eq!(conditions[0].observed_generation, Some(2));
    }

    #[test]
    fn test_conditions_are_keyed_by_type() {
        let mut conditions = Vec::new();
        set_status_condition(
            &mut conditions,
            Condition::new(TYPE_AVAILABLE, STATUS_TRUE, REASON_RECONCILING, "ok"),
        );
        set_status_condition(
            &mut conditions,
            Condition::new(TYPE_DEGRADED, STATUS_UNKNOWN, REASON_FINALIZING, "finalizing"),
        );
        assert_eq!(conditions.len(), 2);
        assert!(is_status_condition_true(&conditions, TYPE_AVAILABLE));
        assert!(!is_status_condition_true(&conditions, TYPE_DEGRADED));
        assert!(is_status_condition_present_and_equal(&conditions, TYPE_DEGRADED, STATUS_UNKNOWN));
        assert!(!is_status_condition_false(&conditions, "Missing"));
    }

    #[test]
    fn test_remove_status_condition() {
        let mut conditions = vec![
            Condition::new(TYPE_AVAILABLE, STATUS_TRUE, REASON_RECONCILING, "ok"),
            Condition::new(TYPE_DEGRADED, STATUS_FALSE, REASON_FINALIZING, ""),
        ];
        assert!(remove_status_condition(&mut conditions, TYPE_DEGRADED));
        assert!(!remove_status_condition(&mut conditions, TYPE_DEGRADED));
        assert!(find_status_condition(&conditions, TYPE_DEGRADED).is_none());
        assert!(find_status_condition(&conditions, TYPE_AVAILABLE).is_some());
    }
}
