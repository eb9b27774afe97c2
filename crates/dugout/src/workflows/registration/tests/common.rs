use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::registration::domain::{
    AthleteId, AthleteProfile, DraftPoolEntry, EmergencyContact, EntryId, EntryStatus,
    EventListing, PaymentMethod, RegistrationOrder, RosterPlayerRecord, TeamId, TeamSummary,
    UserId,
};
use crate::workflows::registration::repository::{
    AthleteDirectory, DraftPoolRepository, Notification, NotificationError, NotificationSink,
    RegistrationLedger, RepositoryError, TeamDirectory,
};
use crate::workflows::registration::workflow::{
    CompletedRegistration, RegistrationForm, RegistrationService, RegistrationWorkflow,
};
use crate::workflows::registration::registration_router;

pub(super) const OWNER: &str = "owner-1";
pub(super) const GUARDIAN: &str = "guardian-1";
pub(super) const FALCONS: &str = "team-falcons";
pub(super) const COMETS: &str = "team-comets";
pub(super) const HORNETS: &str = "team-hornets";

pub(super) fn falcons() -> TeamSummary {
    TeamSummary {
        team_id: TeamId(FALCONS.to_string()),
        owner_id: UserId(OWNER.to_string()),
        name: "Falcons".to_string(),
        sport: "football".to_string(),
        age_group: "10U".to_string(),
    }
}

pub(super) fn comets() -> TeamSummary {
    TeamSummary {
        team_id: TeamId(COMETS.to_string()),
        owner_id: UserId(OWNER.to_string()),
        name: "Comets".to_string(),
        sport: "football".to_string(),
        age_group: "10U".to_string(),
    }
}

pub(super) fn hornets() -> TeamSummary {
    TeamSummary {
        team_id: TeamId(HORNETS.to_string()),
        owner_id: UserId(OWNER.to_string()),
        name: "Hornets".to_string(),
        sport: "basketball".to_string(),
        age_group: "10U".to_string(),
    }
}

pub(super) fn stingers() -> TeamSummary {
    TeamSummary {
        team_id: TeamId("team-stingers".to_string()),
        owner_id: UserId(OWNER.to_string()),
        name: "Stingers".to_string(),
        sport: "basketball".to_string(),
        age_group: "10U".to_string(),
    }
}

pub(super) fn falcons_event() -> EventListing {
    EventListing {
        team_id: TeamId(FALCONS.to_string()),
        sport: "football".to_string(),
        age_group: "10U".to_string(),
        fee_cents: 5000,
        requires_waiver: true,
        earliest_birthdate: NaiveDate::from_ymd_opt(2014, 1, 1),
        latest_birthdate: NaiveDate::from_ymd_opt(2016, 12, 31),
        min_plan_deposit_cents: Some(1000),
    }
}

pub(super) fn hornets_event() -> EventListing {
    EventListing {
        team_id: TeamId(HORNETS.to_string()),
        sport: "basketball".to_string(),
        age_group: "10U".to_string(),
        fee_cents: 0,
        requires_waiver: false,
        earliest_birthdate: None,
        latest_birthdate: None,
        min_plan_deposit_cents: None,
    }
}

pub(super) fn riley() -> AthleteProfile {
    AthleteProfile {
        athlete_id: AthleteId("ath-riley".to_string()),
        full_name: "Riley Parker".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(2015, 4, 12).expect("valid date"),
        username: Some("riley.p".to_string()),
        guardian_id: Some(UserId(GUARDIAN.to_string())),
        account_id: UserId(GUARDIAN.to_string()),
        team_id: None,
    }
}

pub(super) fn registration_form() -> RegistrationForm {
    RegistrationForm {
        athlete_id: Some(AthleteId("ath-riley".to_string())),
        player_name: "Riley Parker".to_string(),
        player_dob: NaiveDate::from_ymd_opt(2015, 4, 12),
        player_username: Some("riley.p".to_string()),
        contact_name: "Dana Parker".to_string(),
        contact_email: "dana.parker@example.com".to_string(),
        contact_phone: Some("555-0142".to_string()),
        registered_by: UserId(GUARDIAN.to_string()),
        independent_athlete: false,
        preferred_position: Some("quarterback".to_string()),
        emergency_contact: Some(EmergencyContact {
            name: "Dana Parker".to_string(),
            phone: "555-0142".to_string(),
            relationship: Some("parent".to_string()),
        }),
        medical_info: None,
        uniform_sizes: None,
        notes: Some("Played flag football last season".to_string()),
    }
}

/// Drive the step machine end to end so service tests can start from a
/// finished workflow.
pub(super) fn completed(
    event: EventListing,
    form: RegistrationForm,
    method: PaymentMethod,
) -> CompletedRegistration {
    let mut workflow = RegistrationWorkflow::new(event);
    let player_name = form.player_name.clone();
    let step = workflow.submit_form(form).expect("form accepted");
    if step == crate::workflows::registration::RegistrationStep::Waiver {
        workflow.sign_waiver(&player_name).expect("waiver accepted");
    }
    workflow.choose_payment(method).expect("payment accepted")
}

pub(super) fn paypal() -> PaymentMethod {
    PaymentMethod::Paypal {
        order_id: "PAYPAL-ORDER-1".to_string(),
        transaction_id: "PAYPAL-TXN-1".to_string(),
    }
}

#[derive(Default)]
pub(super) struct MemoryDraftPool {
    records: Mutex<HashMap<EntryId, DraftPoolEntry>>,
}

impl MemoryDraftPool {
    pub(super) fn all(&self) -> Vec<DraftPoolEntry> {
        self.records
            .lock()
            .expect("pool mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl DraftPoolRepository for MemoryDraftPool {
    fn insert(&self, entry: DraftPoolEntry) -> Result<DraftPoolEntry, RepositoryError> {
        let mut guard = self.records.lock().expect("pool mutex poisoned");
        if guard.contains_key(&entry.entry_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(entry.entry_id.clone(), entry.clone());
        Ok(entry)
    }

    fn fetch(
        &self,
        team_id: &TeamId,
        entry_id: &EntryId,
    ) -> Result<Option<DraftPoolEntry>, RepositoryError> {
        let guard = self.records.lock().expect("pool mutex poisoned");
        Ok(guard
            .get(entry_id)
            .filter(|entry| &entry.team_id == team_id)
            .cloned())
    }

    fn update(&self, entry: DraftPoolEntry) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("pool mutex poisoned");
        if !guard.contains_key(&entry.entry_id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(entry.entry_id.clone(), entry);
        Ok(())
    }

    fn resolve_waiting(&self, entry: DraftPoolEntry) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("pool mutex poisoned");
        let stored = guard.get(&entry.entry_id).ok_or(RepositoryError::NotFound)?;
        if stored.status != EntryStatus::Waiting {
            return Err(RepositoryError::StaleStatus);
        }
        guard.insert(entry.entry_id.clone(), entry);
        Ok(())
    }

    fn waiting_by_team(&self, team_id: &TeamId) -> Result<Vec<DraftPoolEntry>, RepositoryError> {
        let guard = self.records.lock().expect("pool mutex poisoned");
        Ok(guard
            .values()
            .filter(|entry| &entry.team_id == team_id && entry.is_waiting())
            .cloned()
            .collect())
    }

    fn waiting_by_owner(
        &self,
        owner_id: &UserId,
        sport: Option<&str>,
        age_group: Option<&str>,
    ) -> Result<Vec<DraftPoolEntry>, RepositoryError> {
        let guard = self.records.lock().expect("pool mutex poisoned");
        Ok(guard
            .values()
            .filter(|entry| &entry.owner_id == owner_id && entry.is_waiting())
            .filter(|entry| {
                sport
                    .map(|sport| entry.sport.eq_ignore_ascii_case(sport))
                    .unwrap_or(true)
            })
            .filter(|entry| {
                age_group
                    .map(|age| entry.age_group.eq_ignore_ascii_case(age))
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    fn entries_by_athlete(
        &self,
        athlete_id: &AthleteId,
    ) -> Result<Vec<DraftPoolEntry>, RepositoryError> {
        let guard = self.records.lock().expect("pool mutex poisoned");
        Ok(guard
            .values()
            .filter(|entry| entry.athlete_id.as_ref() == Some(athlete_id))
            .cloned()
            .collect())
    }
}

/// Repository double that refuses every call, for fail-closed tests.
pub(super) struct UnavailableDraftPool;

impl DraftPoolRepository for UnavailableDraftPool {
    fn insert(&self, _entry: DraftPoolEntry) -> Result<DraftPoolEntry, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn fetch(
        &self,
        _team_id: &TeamId,
        _entry_id: &EntryId,
    ) -> Result<Option<DraftPoolEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn update(&self, _entry: DraftPoolEntry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn resolve_waiting(&self, _entry: DraftPoolEntry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn waiting_by_team(&self, _team_id: &TeamId) -> Result<Vec<DraftPoolEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn waiting_by_owner(
        &self,
        _owner_id: &UserId,
        _sport: Option<&str>,
        _age_group: Option<&str>,
    ) -> Result<Vec<DraftPoolEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn entries_by_athlete(
        &self,
        _athlete_id: &AthleteId,
    ) -> Result<Vec<DraftPoolEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryTeams {
    teams: Mutex<HashMap<TeamId, TeamSummary>>,
    events: Mutex<HashMap<TeamId, EventListing>>,
    rosters: Mutex<Vec<RosterPlayerRecord>>,
}

impl MemoryTeams {
    pub(super) fn with_teams(teams: Vec<TeamSummary>) -> Self {
        let directory = Self::default();
        {
            let mut guard = directory.teams.lock().expect("teams mutex poisoned");
            for team in teams {
                guard.insert(team.team_id.clone(), team);
            }
        }
        directory
    }

    pub(super) fn add_team(&self, team: TeamSummary) {
        self.teams
            .lock()
            .expect("teams mutex poisoned")
            .insert(team.team_id.clone(), team);
    }

    pub(super) fn add_event(&self, event: EventListing) {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .insert(event.team_id.clone(), event);
    }

    pub(super) fn roster_records(&self) -> Vec<RosterPlayerRecord> {
        self.rosters.lock().expect("roster mutex poisoned").clone()
    }
}

impl TeamDirectory for MemoryTeams {
    fn fetch_team(&self, team_id: &TeamId) -> Result<Option<TeamSummary>, RepositoryError> {
        let guard = self.teams.lock().expect("teams mutex poisoned");
        Ok(guard.get(team_id).cloned())
    }

    fn teams_by_owner(&self, owner_id: &UserId) -> Result<Vec<TeamSummary>, RepositoryError> {
        let guard = self.teams.lock().expect("teams mutex poisoned");
        Ok(guard
            .values()
            .filter(|team| &team.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn open_event(&self, team_id: &TeamId) -> Result<Option<EventListing>, RepositoryError> {
        let guard = self.events.lock().expect("events mutex poisoned");
        Ok(guard.get(team_id).cloned())
    }

    fn insert_player(
        &self,
        player: RosterPlayerRecord,
    ) -> Result<RosterPlayerRecord, RepositoryError> {
        let mut guard = self.rosters.lock().expect("roster mutex poisoned");
        guard.push(player.clone());
        Ok(player)
    }

    fn roster(&self, team_id: &TeamId) -> Result<Vec<RosterPlayerRecord>, RepositoryError> {
        let guard = self.rosters.lock().expect("roster mutex poisoned");
        Ok(guard
            .iter()
            .filter(|player| &player.team_id == team_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryAthletes {
    profiles: Mutex<HashMap<AthleteId, AthleteProfile>>,
    selected_teams: Mutex<HashMap<UserId, TeamId>>,
}

impl MemoryAthletes {
    pub(super) fn with_profiles(profiles: Vec<AthleteProfile>) -> Self {
        let directory = Self::default();
        {
            let mut guard = directory.profiles.lock().expect("profile mutex poisoned");
            for profile in profiles {
                guard.insert(profile.athlete_id.clone(), profile);
            }
        }
        directory
    }

    pub(super) fn profile(&self, athlete_id: &AthleteId) -> Option<AthleteProfile> {
        self.profiles
            .lock()
            .expect("profile mutex poisoned")
            .get(athlete_id)
            .cloned()
    }

    pub(super) fn selected_team(&self, account_id: &UserId) -> Option<TeamId> {
        self.selected_teams
            .lock()
            .expect("selected mutex poisoned")
            .get(account_id)
            .cloned()
    }
}

impl AthleteDirectory for MemoryAthletes {
    fn fetch_athlete(
        &self,
        athlete_id: &AthleteId,
    ) -> Result<Option<AthleteProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("profile mutex poisoned");
        Ok(guard.get(athlete_id).cloned())
    }

    fn assign_team(
        &self,
        athlete_id: &AthleteId,
        team_id: &TeamId,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.profiles.lock().expect("profile mutex poisoned");
        let profile = guard.get_mut(athlete_id).ok_or(RepositoryError::NotFound)?;
        profile.team_id = Some(team_id.clone());
        Ok(())
    }

    fn set_selected_team(
        &self,
        account_id: &UserId,
        team_id: &TeamId,
    ) -> Result<(), RepositoryError> {
        self.selected_teams
            .lock()
            .expect("selected mutex poisoned")
            .insert(account_id.clone(), team_id.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    orders: Mutex<Vec<RegistrationOrder>>,
}

impl MemoryLedger {
    pub(super) fn orders(&self) -> Vec<RegistrationOrder> {
        self.orders.lock().expect("ledger mutex poisoned").clone()
    }
}

impl RegistrationLedger for MemoryLedger {
    fn record(&self, order: RegistrationOrder) -> Result<RegistrationOrder, RepositoryError> {
        let mut guard = self.orders.lock().expect("ledger mutex poisoned");
        guard.push(order.clone());
        Ok(order)
    }
}

/// Ledger double that refuses writes, for abort-before-entry tests.
pub(super) struct UnavailableLedger;

impl RegistrationLedger for UnavailableLedger {
    fn record(&self, _order: RegistrationOrder) -> Result<RegistrationOrder, RepositoryError> {
        Err(RepositoryError::Unavailable("ledger offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifications {
    events: Mutex<Vec<Notification>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationSink for MemoryNotifications {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Sink double whose transport always fails.
pub(super) struct FailingNotifications;

impl NotificationSink for FailingNotifications {
    fn notify(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("push service down".to_string()))
    }
}

pub(super) type TestService =
    RegistrationService<MemoryDraftPool, MemoryTeams, MemoryAthletes, MemoryLedger, MemoryNotifications>;

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) pool: Arc<MemoryDraftPool>,
    pub(super) teams: Arc<MemoryTeams>,
    pub(super) athletes: Arc<MemoryAthletes>,
    pub(super) orders: Arc<MemoryLedger>,
    pub(super) notifications: Arc<MemoryNotifications>,
}

/// Default league: one football team and one basketball team under the same
/// owner, so football registrations are auto-draft eligible until a second
/// football team is added.
pub(super) fn harness() -> Harness {
    let teams = Arc::new(MemoryTeams::with_teams(vec![falcons(), hornets()]));
    teams.add_event(falcons_event());
    teams.add_event(hornets_event());
    harness_with(teams, Arc::new(MemoryAthletes::with_profiles(vec![riley()])))
}

pub(super) fn harness_with(teams: Arc<MemoryTeams>, athletes: Arc<MemoryAthletes>) -> Harness {
    let pool = Arc::new(MemoryDraftPool::default());
    let orders = Arc::new(MemoryLedger::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = Arc::new(RegistrationService::new(
        pool.clone(),
        teams.clone(),
        athletes.clone(),
        orders.clone(),
        notifications.clone(),
    ));
    Harness {
        service,
        pool,
        teams,
        athletes,
        orders,
        notifications,
    }
}

pub(super) fn registration_router_with_service(service: Arc<TestService>) -> axum::Router {
    registration_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_conflict_response(response: &Response) {
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
