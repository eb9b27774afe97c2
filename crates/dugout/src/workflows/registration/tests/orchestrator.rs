use std::sync::Arc;

use super::common::*;
use crate::workflows::registration::domain::{
    AthleteId, EntryId, EntryStatus, TeamId, UserId,
};
use crate::workflows::registration::orchestrator::{
    DeclineCommand, DraftCommand, DraftOrchestrator,
};
use crate::workflows::registration::repository::{
    DraftPoolRepository, NotificationKind, TeamDirectory,
};
use crate::workflows::registration::store::DraftPoolError;
use crate::workflows::registration::PaymentMethod;

fn waiting_entry(harness: &Harness) -> EntryId {
    let completed = completed(
        falcons_event(),
        registration_form(),
        PaymentMethod::InPerson,
    );
    harness
        .service
        .register(completed)
        .expect("registers")
        .entry
        .entry_id
}

fn draft_command(entry_id: EntryId) -> DraftCommand {
    DraftCommand {
        team_id: TeamId(FALCONS.to_string()),
        entry_id,
        acted_by: UserId(OWNER.to_string()),
        target_team_id: None,
    }
}

#[test]
fn draft_creates_roster_record_with_back_reference() {
    let harness = harness();
    let entry_id = waiting_entry(&harness);

    let player = harness
        .service
        .draft(draft_command(entry_id.clone()))
        .expect("drafts");

    assert_eq!(player.team_id, TeamId(FALCONS.to_string()));
    assert_eq!(player.player_name, "Riley Parker");
    assert_eq!(player.source_entry_id, entry_id);
    assert_eq!(player.guardian_id, Some(UserId(GUARDIAN.to_string())));

    let roster = harness
        .teams
        .roster(&TeamId(FALCONS.to_string()))
        .expect("roster");
    assert_eq!(roster.len(), 1);
}

#[test]
fn draft_stamps_entry_and_updates_profile() {
    let harness = harness();
    let entry_id = waiting_entry(&harness);

    harness
        .service
        .draft(draft_command(entry_id.clone()))
        .expect("drafts");

    let entry = harness
        .pool
        .fetch(&TeamId(FALCONS.to_string()), &entry_id)
        .expect("fetch")
        .expect("entry present");
    assert_eq!(entry.status, EntryStatus::Drafted);
    assert!(entry.drafted_at.is_some());
    assert_eq!(entry.drafted_by, Some(UserId(OWNER.to_string())));
    assert_eq!(entry.drafted_to_team_id, Some(TeamId(FALCONS.to_string())));
    assert_eq!(entry.drafted_to_team_name.as_deref(), Some("Falcons"));

    let profile = harness
        .athletes
        .profile(&AthleteId("ath-riley".to_string()))
        .expect("profile present");
    assert_eq!(profile.team_id, Some(TeamId(FALCONS.to_string())));
}

#[test]
fn draft_emits_guardian_and_actor_notifications() {
    let harness = harness();
    let entry_id = waiting_entry(&harness);
    let before = harness.notifications.events().len();

    harness
        .service
        .draft(draft_command(entry_id))
        .expect("drafts");

    let events = harness.notifications.events();
    let new: Vec<_> = events.iter().skip(before).collect();
    assert_eq!(new.len(), 2);
    assert_eq!(new[0].kind, NotificationKind::PlayerDrafted);
    assert_eq!(new[0].recipient, UserId(GUARDIAN.to_string()));
    assert!(new[0].body.contains("Falcons"));
    assert_eq!(new[1].kind, NotificationKind::ActionConfirmed);
    assert_eq!(new[1].recipient, UserId(OWNER.to_string()));
}

#[test]
fn second_draft_attempt_is_invalid_state_with_one_roster_record() {
    let harness = harness();
    let entry_id = waiting_entry(&harness);

    harness
        .service
        .draft(draft_command(entry_id.clone()))
        .expect("first draft succeeds");
    match harness.service.draft(draft_command(entry_id)) {
        Err(DraftPoolError::InvalidState { .. }) => {}
        other => panic!("expected invalid state, got {other:?}"),
    }

    let roster = harness
        .teams
        .roster(&TeamId(FALCONS.to_string()))
        .expect("roster");
    assert_eq!(roster.len(), 1, "exactly one roster record");
}

#[test]
fn decline_after_draft_is_invalid_state() {
    let harness = harness();
    let entry_id = waiting_entry(&harness);

    harness
        .service
        .draft(draft_command(entry_id.clone()))
        .expect("drafts");
    match harness.service.decline(DeclineCommand {
        team_id: TeamId(FALCONS.to_string()),
        entry_id,
        reason: "changed my mind".to_string(),
        acted_by: UserId(OWNER.to_string()),
    }) {
        Err(DraftPoolError::InvalidState { .. }) => {}
        other => panic!("expected invalid state, got {other:?}"),
    }
}

#[test]
fn draft_with_explicit_target_team_overrides_entry_team() {
    let harness = harness();
    harness.teams.add_team(comets());
    let entry_id = waiting_entry(&harness);

    let player = harness
        .service
        .draft(DraftCommand {
            team_id: TeamId(FALCONS.to_string()),
            entry_id: entry_id.clone(),
            acted_by: UserId(OWNER.to_string()),
            target_team_id: Some(TeamId(COMETS.to_string())),
        })
        .expect("drafts to override team");

    assert_eq!(player.team_id, TeamId(COMETS.to_string()));
    let entry = harness
        .pool
        .fetch(&TeamId(FALCONS.to_string()), &entry_id)
        .expect("fetch")
        .expect("entry present");
    assert_eq!(entry.drafted_to_team_id, Some(TeamId(COMETS.to_string())));
    assert_eq!(entry.drafted_to_team_name.as_deref(), Some("Comets"));
}

#[test]
fn draft_missing_entry_is_entry_not_found() {
    let harness = harness();
    match harness
        .service
        .draft(draft_command(EntryId("dp-missing".to_string())))
    {
        Err(DraftPoolError::EntryNotFound) => {}
        other => panic!("expected entry not found, got {other:?}"),
    }
}

#[test]
fn draft_to_unknown_target_is_team_not_found() {
    let harness = harness();
    let entry_id = waiting_entry(&harness);

    match harness.service.draft(DraftCommand {
        team_id: TeamId(FALCONS.to_string()),
        entry_id: entry_id.clone(),
        acted_by: UserId(OWNER.to_string()),
        target_team_id: Some(TeamId("team-gone".to_string())),
    }) {
        Err(DraftPoolError::TeamNotFound) => {}
        other => panic!("expected team not found, got {other:?}"),
    }

    // The failed resolution left the entry waiting for a retry.
    let entry = harness
        .pool
        .fetch(&TeamId(FALCONS.to_string()), &entry_id)
        .expect("fetch")
        .expect("entry present");
    assert_eq!(entry.status, EntryStatus::Waiting);
}

#[test]
fn decline_stamps_reason_and_creates_no_roster_record() {
    let harness = harness();
    let entry_id = waiting_entry(&harness);
    let before = harness.notifications.events().len();

    let entry = harness
        .service
        .decline(DeclineCommand {
            team_id: TeamId(FALCONS.to_string()),
            entry_id,
            reason: "Roster full".to_string(),
            acted_by: UserId(OWNER.to_string()),
        })
        .expect("declines");

    assert_eq!(entry.status, EntryStatus::Declined);
    assert_eq!(entry.declined_reason.as_deref(), Some("Roster full"));
    assert!(entry.declined_at.is_some());
    assert_eq!(entry.declined_by, Some(UserId(OWNER.to_string())));

    let roster = harness
        .teams
        .roster(&TeamId(FALCONS.to_string()))
        .expect("roster");
    assert!(roster.is_empty());

    let events = harness.notifications.events();
    let guardian_note = events
        .iter()
        .skip(before)
        .find(|note| note.kind == NotificationKind::RegistrationDeclined)
        .expect("guardian notified");
    assert_eq!(guardian_note.recipient, UserId(GUARDIAN.to_string()));
    assert!(guardian_note.body.contains("Roster full"));
}

#[test]
fn notification_failure_does_not_fail_the_draft() {
    let harness = harness();
    let entry_id = waiting_entry(&harness);

    let orchestrator = DraftOrchestrator::new(
        harness.pool.clone(),
        harness.teams.clone(),
        harness.athletes.clone(),
        Arc::new(FailingNotifications),
    );
    orchestrator
        .draft(draft_command(entry_id.clone()))
        .expect("draft survives notification failure");

    let entry = harness
        .pool
        .fetch(&TeamId(FALCONS.to_string()), &entry_id)
        .expect("fetch")
        .expect("entry present");
    assert_eq!(entry.status, EntryStatus::Drafted);
}

#[test]
fn independent_athlete_draft_updates_selected_team() {
    let harness = harness();
    let adult = crate::workflows::registration::AthleteProfile {
        athlete_id: AthleteId("ath-jordan".to_string()),
        full_name: "Jordan Wells".to_string(),
        date_of_birth: chrono::NaiveDate::from_ymd_opt(1998, 6, 2).expect("valid date"),
        username: Some("jwells".to_string()),
        guardian_id: None,
        account_id: UserId("user-jordan".to_string()),
        team_id: None,
    };
    let profiles = MemoryAthletes::with_profiles(vec![adult]);
    let harness = harness_with(harness.teams.clone(), Arc::new(profiles));

    let mut form = registration_form();
    form.athlete_id = Some(AthleteId("ath-jordan".to_string()));
    form.player_name = "Jordan Wells".to_string();
    form.player_dob = chrono::NaiveDate::from_ymd_opt(1998, 6, 2);
    form.registered_by = UserId("user-jordan".to_string());
    form.independent_athlete = true;
    let completed = completed(hornets_event(), form, PaymentMethod::Free);
    // The Hornets are the owner's only basketball team, so the free entry
    // auto-drafts immediately.
    let outcome = harness.service.register(completed).expect("registers");
    assert!(outcome.auto_drafted.is_some());

    assert_eq!(
        harness.athletes.selected_team(&UserId("user-jordan".to_string())),
        Some(TeamId(HORNETS.to_string()))
    );
    let roster_player = outcome.auto_drafted.expect("rostered");
    assert_eq!(roster_player.guardian_id, None);
}
