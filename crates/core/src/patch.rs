//! Partial updates: copy the supplied fields of a patch onto a stored record.
//!
//! A field left out of the request (or sent as `null`) keeps its stored value.

use crate::types::{
    AttendancePatch, Company, CompanyPatch, Meeting, MeetingParticipant, MeetingPatch,
    Participant, ParticipantPatch, Topic, TopicPatch,
};

pub trait ApplyPatch<P> {
    fn apply_patch(&mut self, patch: P);
}

/// Overwrites `slot` when a value was supplied.
pub fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Same as [`merge`] for nullable columns.
pub fn merge_optional<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

impl ApplyPatch<CompanyPatch> for Company {
    fn apply_patch(&mut self, patch: CompanyPatch) {
        merge(&mut self.name, patch.name);
        merge(&mut self.inn, patch.inn);
        merge_optional(&mut self.address, patch.address);
    }
}

impl ApplyPatch<ParticipantPatch> for Participant {
    fn apply_patch(&mut self, patch: ParticipantPatch) {
        merge(&mut self.full_name, patch.full_name);
        merge_optional(&mut self.email, patch.email);
        merge_optional(&mut self.position, patch.position);
    }
}

impl ApplyPatch<MeetingPatch> for Meeting {
    fn apply_patch(&mut self, patch: MeetingPatch) {
        merge(&mut self.title, patch.title);
        merge_optional(&mut self.description, patch.description);
        merge(&mut self.scheduled_at, patch.scheduled_at);
        merge_optional(&mut self.location, patch.location);
    }
}

impl ApplyPatch<TopicPatch> for Topic {
    fn apply_patch(&mut self, patch: TopicPatch) {
        merge(&mut self.title, patch.title);
        merge_optional(&mut self.description, patch.description);
    }
}

impl ApplyPatch<AttendancePatch> for MeetingParticipant {
    fn apply_patch(&mut self, patch: AttendancePatch) {
        self.present = patch.present;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn company() -> Company {
        Company {
            id: "c-1".into(),
            name: "Acme".into(),
            inn: "7707083893".into(),
            address: Some("Moscow".into()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_patch_keeps_record() {
        let mut record = company();
        record.apply_patch(CompanyPatch::default());
        assert_eq!(record, company());
    }

    #[test]
    fn supplied_fields_are_copied() {
        let mut record = company();
        record.apply_patch(CompanyPatch {
            name: Some("Acme Holding".into()),
            inn: None,
            address: Some("Kazan".into()),
        });
        assert_eq!(record.name, "Acme Holding");
        assert_eq!(record.inn, "7707083893");
        assert_eq!(record.address.as_deref(), Some("Kazan"));
        assert_eq!(record.id, "c-1");
    }

    #[test]
    fn null_optional_does_not_clear_value() {
        let mut slot = Some(3);
        merge_optional(&mut slot, None);
        assert_eq!(slot, Some(3));

        let mut empty: Option<i32> = None;
        merge_optional(&mut empty, Some(7));
        assert_eq!(empty, Some(7));
    }

    #[test]
    fn meeting_reschedule_only_touches_date() {
        let mut meeting = Meeting {
            id: "m-1".into(),
            company_id: "c-1".into(),
            title: "AGM".into(),
            description: None,
            scheduled_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            location: Some("HQ".into()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let moved = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        meeting.apply_patch(MeetingPatch {
            scheduled_at: Some(moved),
            ..MeetingPatch::default()
        });
        assert_eq!(meeting.scheduled_at, moved);
        assert_eq!(meeting.title, "AGM");
        assert_eq!(meeting.location.as_deref(), Some("HQ"));
    }
}
