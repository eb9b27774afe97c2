use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    AthleteId, AthleteProfile, DraftPoolEntry, EntryId, EventListing, RegistrationOrder,
    RosterPlayerRecord, TeamId, TeamSummary, UserId,
};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("entry status changed since it was read")]
    StaleStatus,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction over the draft pool. Implementations back onto a
/// document store; the in-memory variants exist for the service binary and
/// tests.
pub trait DraftPoolRepository: Send + Sync {
    fn insert(&self, entry: DraftPoolEntry) -> Result<DraftPoolEntry, RepositoryError>;

    fn fetch(
        &self,
        team_id: &TeamId,
        entry_id: &EntryId,
    ) -> Result<Option<DraftPoolEntry>, RepositoryError>;

    /// Replace the stored entry. Payment updates go through here; the caller
    /// is responsible for having validated the current status.
    fn update(&self, entry: DraftPoolEntry) -> Result<(), RepositoryError>;

    /// Commit a terminal transition: replace the stored entry only if the
    /// stored status is still `waiting`. Returns `StaleStatus` when another
    /// actor resolved the entry first. This is the compare-and-set that
    /// closes the two-coaches draft race.
    fn resolve_waiting(&self, entry: DraftPoolEntry) -> Result<(), RepositoryError>;

    /// All `waiting` entries for one team.
    fn waiting_by_team(&self, team_id: &TeamId) -> Result<Vec<DraftPoolEntry>, RepositoryError>;

    /// All `waiting` entries across an owner's teams, optionally narrowed by
    /// sport and age group. Served from an owner-scoped index rather than a
    /// scan over every team.
    fn waiting_by_owner(
        &self,
        owner_id: &UserId,
        sport: Option<&str>,
        age_group: Option<&str>,
    ) -> Result<Vec<DraftPoolEntry>, RepositoryError>;

    /// Every entry referencing the athlete, any status.
    fn entries_by_athlete(
        &self,
        athlete_id: &AthleteId,
    ) -> Result<Vec<DraftPoolEntry>, RepositoryError>;
}

/// Team, roster, and event lookups.
pub trait TeamDirectory: Send + Sync {
    fn fetch_team(&self, team_id: &TeamId) -> Result<Option<TeamSummary>, RepositoryError>;

    fn teams_by_owner(&self, owner_id: &UserId) -> Result<Vec<TeamSummary>, RepositoryError>;

    fn open_event(&self, team_id: &TeamId) -> Result<Option<EventListing>, RepositoryError>;

    fn insert_player(
        &self,
        player: RosterPlayerRecord,
    ) -> Result<RosterPlayerRecord, RepositoryError>;

    fn roster(&self, team_id: &TeamId) -> Result<Vec<RosterPlayerRecord>, RepositoryError>;
}

/// Canonical athlete profile access. Only real state lives here; waiting and
/// declined registration states are read from the pool.
pub trait AthleteDirectory: Send + Sync {
    fn fetch_athlete(
        &self,
        athlete_id: &AthleteId,
    ) -> Result<Option<AthleteProfile>, RepositoryError>;

    fn assign_team(&self, athlete_id: &AthleteId, team_id: &TeamId)
        -> Result<(), RepositoryError>;

    /// For self-registered adults: the account's own selected-team field.
    fn set_selected_team(&self, account_id: &UserId, team_id: &TeamId)
        -> Result<(), RepositoryError>;
}

/// Persistence for registration orders. Must succeed before a draft-pool
/// entry may be created.
pub trait RegistrationLedger: Send + Sync {
    fn record(&self, order: RegistrationOrder) -> Result<RegistrationOrder, RepositoryError>;
}

/// Notification payload handed to the sink. Delivery is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RegistrationReceived,
    PlayerDrafted,
    RegistrationDeclined,
    ActionConfirmed,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::RegistrationReceived => "registration_received",
            NotificationKind::PlayerDrafted => "player_drafted",
            NotificationKind::RegistrationDeclined => "registration_declined",
            NotificationKind::ActionConfirmed => "action_confirmed",
        }
    }
}

/// Outbound notification hook. Failures are logged by callers and never
/// abort the state transition that triggered them.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Notification dispatch error. Non-fatal by contract.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
