use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use dugout::workflows::registration::{
    AthleteDirectory, AthleteId, AthleteProfile, DraftPoolEntry, DraftPoolRepository, EntryId,
    EntryStatus, EventListing, Notification, NotificationError, NotificationSink,
    RegistrationLedger, RegistrationOrder, RepositoryError, RosterPlayerRecord, TeamDirectory,
    TeamId, TeamSummary, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Key of the owner-scoped secondary index: owner id plus lowercased sport
/// and age group, so owner-wide queue reads never scan every team.
type OwnerKey = (String, String, String);

#[derive(Default)]
pub(crate) struct InMemoryDraftPool {
    records: Mutex<HashMap<EntryId, DraftPoolEntry>>,
    owner_index: Mutex<BTreeMap<OwnerKey, Vec<EntryId>>>,
}

fn owner_key(entry: &DraftPoolEntry) -> OwnerKey {
    (
        entry.owner_id.0.clone(),
        entry.sport.to_ascii_lowercase(),
        entry.age_group.to_ascii_lowercase(),
    )
}

impl InMemoryDraftPool {
    fn unindex(&self, entry: &DraftPoolEntry) {
        let mut index = self.owner_index.lock().expect("index mutex poisoned");
        if let Some(ids) = index.get_mut(&owner_key(entry)) {
            ids.retain(|id| id != &entry.entry_id);
        }
    }
}

impl DraftPoolRepository for InMemoryDraftPool {
    fn insert(&self, entry: DraftPoolEntry) -> Result<DraftPoolEntry, RepositoryError> {
        let mut records = self.records.lock().expect("pool mutex poisoned");
        if records.contains_key(&entry.entry_id) {
            return Err(RepositoryError::Conflict);
        }
        self.owner_index
            .lock()
            .expect("index mutex poisoned")
            .entry(owner_key(&entry))
            .or_default()
            .push(entry.entry_id.clone());
        records.insert(entry.entry_id.clone(), entry.clone());
        Ok(entry)
    }

    fn fetch(
        &self,
        team_id: &TeamId,
        entry_id: &EntryId,
    ) -> Result<Option<DraftPoolEntry>, RepositoryError> {
        let records = self.records.lock().expect("pool mutex poisoned");
        Ok(records
            .get(entry_id)
            .filter(|entry| &entry.team_id == team_id)
            .cloned())
    }

    fn update(&self, entry: DraftPoolEntry) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().expect("pool mutex poisoned");
        if !records.contains_key(&entry.entry_id) {
            return Err(RepositoryError::NotFound);
        }
        records.insert(entry.entry_id.clone(), entry);
        Ok(())
    }

    fn resolve_waiting(&self, entry: DraftPoolEntry) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().expect("pool mutex poisoned");
        let stored = records
            .get(&entry.entry_id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != EntryStatus::Waiting {
            return Err(RepositoryError::StaleStatus);
        }
        records.insert(entry.entry_id.clone(), entry.clone());
        drop(records);
        self.unindex(&entry);
        Ok(())
    }

    fn waiting_by_team(&self, team_id: &TeamId) -> Result<Vec<DraftPoolEntry>, RepositoryError> {
        let records = self.records.lock().expect("pool mutex poisoned");
        Ok(records
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
        let sport = sport.map(|value| value.to_ascii_lowercase());
        let age_group = age_group.map(|value| value.to_ascii_lowercase());

        // Collect matching ids before touching the records lock; insert
        // acquires the two locks in the opposite order.
        let ids: Vec<EntryId> = {
            let index = self.owner_index.lock().expect("index mutex poisoned");
            index
                .iter()
                .filter(|((owner, indexed_sport, indexed_age), _)| {
                    owner == &owner_id.0
                        && sport.as_ref().map(|s| indexed_sport == s).unwrap_or(true)
                        && age_group.as_ref().map(|a| indexed_age == a).unwrap_or(true)
                })
                .flat_map(|(_, ids)| ids.iter().cloned())
                .collect()
        };

        let records = self.records.lock().expect("pool mutex poisoned");
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id))
            .filter(|entry| entry.is_waiting())
            .cloned()
            .collect())
    }

    fn entries_by_athlete(
        &self,
        athlete_id: &AthleteId,
    ) -> Result<Vec<DraftPoolEntry>, RepositoryError> {
        let records = self.records.lock().expect("pool mutex poisoned");
        Ok(records
            .values()
            .filter(|entry| entry.athlete_id.as_ref() == Some(athlete_id))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryTeamDirectory {
    teams: Mutex<HashMap<TeamId, TeamSummary>>,
    events: Mutex<HashMap<TeamId, EventListing>>,
    rosters: Mutex<Vec<RosterPlayerRecord>>,
}

impl InMemoryTeamDirectory {
    pub(crate) fn add_team(&self, team: TeamSummary) {
        self.teams
            .lock()
            .expect("teams mutex poisoned")
            .insert(team.team_id.clone(), team);
    }

    pub(crate) fn add_event(&self, event: EventListing) {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .insert(event.team_id.clone(), event);
    }
}

impl TeamDirectory for InMemoryTeamDirectory {
    fn fetch_team(&self, team_id: &TeamId) -> Result<Option<TeamSummary>, RepositoryError> {
        Ok(self
            .teams
            .lock()
            .expect("teams mutex poisoned")
            .get(team_id)
            .cloned())
    }

    fn teams_by_owner(&self, owner_id: &UserId) -> Result<Vec<TeamSummary>, RepositoryError> {
        Ok(self
            .teams
            .lock()
            .expect("teams mutex poisoned")
            .values()
            .filter(|team| &team.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn open_event(&self, team_id: &TeamId) -> Result<Option<EventListing>, RepositoryError> {
        Ok(self
            .events
            .lock()
            .expect("events mutex poisoned")
            .get(team_id)
            .cloned())
    }

    fn insert_player(
        &self,
        player: RosterPlayerRecord,
    ) -> Result<RosterPlayerRecord, RepositoryError> {
        self.rosters
            .lock()
            .expect("roster mutex poisoned")
            .push(player.clone());
        Ok(player)
    }

    fn roster(&self, team_id: &TeamId) -> Result<Vec<RosterPlayerRecord>, RepositoryError> {
        Ok(self
            .rosters
            .lock()
            .expect("roster mutex poisoned")
            .iter()
            .filter(|player| &player.team_id == team_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryAthleteDirectory {
    profiles: Mutex<HashMap<AthleteId, AthleteProfile>>,
    selected_teams: Mutex<HashMap<UserId, TeamId>>,
}

impl InMemoryAthleteDirectory {
    pub(crate) fn add_profile(&self, profile: AthleteProfile) {
        self.profiles
            .lock()
            .expect("profile mutex poisoned")
            .insert(profile.athlete_id.clone(), profile);
    }
}

impl AthleteDirectory for InMemoryAthleteDirectory {
    fn fetch_athlete(
        &self,
        athlete_id: &AthleteId,
    ) -> Result<Option<AthleteProfile>, RepositoryError> {
        Ok(self
            .profiles
            .lock()
            .expect("profile mutex poisoned")
            .get(athlete_id)
            .cloned())
    }

    fn assign_team(
        &self,
        athlete_id: &AthleteId,
        team_id: &TeamId,
    ) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.lock().expect("profile mutex poisoned");
        let profile = profiles
            .get_mut(athlete_id)
            .ok_or(RepositoryError::NotFound)?;
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
pub(crate) struct InMemoryRegistrationLedger {
    orders: Mutex<Vec<RegistrationOrder>>,
}

impl RegistrationLedger for InMemoryRegistrationLedger {
    fn record(&self, order: RegistrationOrder) -> Result<RegistrationOrder, RepositoryError> {
        self.orders
            .lock()
            .expect("ledger mutex poisoned")
            .push(order.clone());
        Ok(order)
    }
}

const NOTIFICATION_BUFFER_CAPACITY: usize = 256;

/// Bounded in-memory sink: oldest notifications are evicted once the buffer
/// fills, the ring-buffer replacement for a global unbounded toast queue.
pub(crate) struct BufferedNotificationSink {
    events: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl Default for BufferedNotificationSink {
    fn default() -> Self {
        Self::with_capacity(NOTIFICATION_BUFFER_CAPACITY)
    }
}

impl BufferedNotificationSink {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

impl NotificationSink for BufferedNotificationSink {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        let mut events = self.events.lock().expect("notification mutex poisoned");
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(notification);
        Ok(())
    }
}

/// Demo league: one owner running a single 10U football team and two 10U
/// basketball teams, one guardian-linked athlete, and one independent adult.
pub(crate) fn seed_demo_league(
    teams: &InMemoryTeamDirectory,
    athletes: &InMemoryAthleteDirectory,
) {
    let owner = UserId("owner-pat".to_string());

    teams.add_team(TeamSummary {
        team_id: TeamId("team-falcons".to_string()),
        owner_id: owner.clone(),
        name: "Falcons".to_string(),
        sport: "football".to_string(),
        age_group: "10U".to_string(),
    });
    teams.add_event(EventListing {
        team_id: TeamId("team-falcons".to_string()),
        sport: "football".to_string(),
        age_group: "10U".to_string(),
        fee_cents: 5000,
        requires_waiver: true,
        earliest_birthdate: NaiveDate::from_ymd_opt(2014, 1, 1),
        latest_birthdate: NaiveDate::from_ymd_opt(2016, 12, 31),
        min_plan_deposit_cents: Some(1000),
    });

    for (id, name) in [("team-hornets", "Hornets"), ("team-stingers", "Stingers")] {
        teams.add_team(TeamSummary {
            team_id: TeamId(id.to_string()),
            owner_id: owner.clone(),
            name: name.to_string(),
            sport: "basketball".to_string(),
            age_group: "10U".to_string(),
        });
        teams.add_event(EventListing {
            team_id: TeamId(id.to_string()),
            sport: "basketball".to_string(),
            age_group: "10U".to_string(),
            fee_cents: 0,
            requires_waiver: false,
            earliest_birthdate: None,
            latest_birthdate: None,
            min_plan_deposit_cents: None,
        });
    }

    athletes.add_profile(AthleteProfile {
        athlete_id: AthleteId("ath-riley".to_string()),
        full_name: "Riley Parker".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(2015, 4, 12).expect("valid date"),
        username: Some("riley.p".to_string()),
        guardian_id: Some(UserId("guardian-dana".to_string())),
        account_id: UserId("guardian-dana".to_string()),
        team_id: None,
    });
    athletes.add_profile(AthleteProfile {
        athlete_id: AthleteId("ath-jordan".to_string()),
        full_name: "Jordan Wells".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1998, 6, 2).expect("valid date"),
        username: Some("jwells".to_string()),
        guardian_id: None,
        account_id: UserId("user-jordan".to_string()),
        team_id: None,
    });
}
