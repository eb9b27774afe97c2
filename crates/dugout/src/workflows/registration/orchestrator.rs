use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::domain::{
    DraftPoolEntry, EntryId, EntryStatus, PlayerId, RosterPlayerRecord, TeamId, UserId,
};
use super::repository::{
    AthleteDirectory, DraftPoolRepository, Notification, NotificationKind, NotificationSink,
    RepositoryError, TeamDirectory,
};
use super::store::DraftPoolError;

static PLAYER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_player_id() -> PlayerId {
    let id = PLAYER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PlayerId(format!("pl-{id:06}"))
}

/// Draft a waiting entry onto a roster. `target_team_id` lets owners who run
/// multiple teams pick one at draft time; otherwise the entry's own team is
/// used.
#[derive(Debug, Clone)]
pub struct DraftCommand {
    pub team_id: TeamId,
    pub entry_id: EntryId,
    pub acted_by: UserId,
    pub target_team_id: Option<TeamId>,
}

/// Close out a waiting entry without rostering the athlete.
#[derive(Debug, Clone)]
pub struct DeclineCommand {
    pub team_id: TeamId,
    pub entry_id: EntryId,
    pub reason: String,
    pub acted_by: UserId,
}

/// Executes the terminal transitions from a `waiting` draft-pool entry to a
/// roster player record (`drafted`) or a closed-out entry (`declined`),
/// keeping the entry, the athlete's canonical profile, and downstream
/// notifications consistent.
pub struct DraftOrchestrator<D, T, P, N> {
    pool: Arc<D>,
    teams: Arc<T>,
    athletes: Arc<P>,
    notifications: Arc<N>,
}

impl<D, T, P, N> DraftOrchestrator<D, T, P, N>
where
    D: DraftPoolRepository,
    T: TeamDirectory,
    P: AthleteDirectory,
    N: NotificationSink,
{
    pub fn new(pool: Arc<D>, teams: Arc<T>, athletes: Arc<P>, notifications: Arc<N>) -> Self {
        Self {
            pool,
            teams,
            athletes,
            notifications,
        }
    }

    /// Promote a waiting entry to a roster player record.
    ///
    /// The terminal status is committed through the repository's
    /// compare-and-set before the roster record is written, so two
    /// concurrent drafts of the same entry yield exactly one record; the
    /// loser observes `InvalidState`.
    pub fn draft(&self, command: DraftCommand) -> Result<RosterPlayerRecord, DraftPoolError> {
        let entry = self
            .pool
            .fetch(&command.team_id, &command.entry_id)?
            .ok_or(DraftPoolError::EntryNotFound)?;
        if !entry.is_waiting() {
            return Err(DraftPoolError::InvalidState {
                found: entry.status,
            });
        }

        let target_id = command
            .target_team_id
            .unwrap_or_else(|| entry.team_id.clone());
        let target = self
            .teams
            .fetch_team(&target_id)?
            .ok_or(DraftPoolError::TeamNotFound)?;

        let now = Utc::now();
        let mut resolved = entry.clone();
        resolved.status = EntryStatus::Drafted;
        resolved.drafted_at = Some(now);
        resolved.drafted_by = Some(command.acted_by.clone());
        resolved.drafted_to_team_id = Some(target.team_id.clone());
        resolved.drafted_to_team_name = Some(target.name.clone());

        self.pool
            .resolve_waiting(resolved)
            .map_err(|err| match err {
                RepositoryError::StaleStatus => DraftPoolError::InvalidState {
                    found: EntryStatus::Drafted,
                },
                other => DraftPoolError::Repository(other),
            })?;

        let player = self.teams.insert_player(RosterPlayerRecord {
            player_id: next_player_id(),
            team_id: target.team_id.clone(),
            athlete_id: entry.athlete_id.clone(),
            player_name: entry.player_name.clone(),
            date_of_birth: entry.player_dob,
            preferred_position: entry.preferred_position.clone(),
            guardian_id: if entry.independent_athlete {
                None
            } else {
                Some(entry.registered_by.clone())
            },
            emergency_contact: entry.emergency_contact.clone(),
            medical_info: entry.medical_info.clone(),
            source_entry_id: entry.entry_id.clone(),
            joined_at: now,
        })?;

        if let Some(athlete_id) = &entry.athlete_id {
            self.athletes.assign_team(athlete_id, &target.team_id)?;
        }
        if entry.independent_athlete {
            self.athletes
                .set_selected_team(&entry.registered_by, &target.team_id)?;
        }

        self.send_or_log(Notification {
            recipient: entry.registered_by.clone(),
            kind: NotificationKind::PlayerDrafted,
            title: format!("{} joined {}", entry.player_name, target.name),
            body: format!(
                "{} has been drafted to the {} {} roster.",
                entry.player_name, target.name, target.sport
            ),
            metadata: entry_metadata(&entry, Some(&player)),
        });
        self.send_or_log(Notification {
            recipient: command.acted_by.clone(),
            kind: NotificationKind::ActionConfirmed,
            title: format!("Drafted {}", entry.player_name),
            body: format!("{} was added to {}.", entry.player_name, target.name),
            metadata: entry_metadata(&entry, Some(&player)),
        });

        Ok(player)
    }

    /// Close out a waiting entry with a reason. No roster record is created
    /// and the athlete's profile is untouched; the declined state is served
    /// from the entry itself.
    pub fn decline(&self, command: DeclineCommand) -> Result<DraftPoolEntry, DraftPoolError> {
        let entry = self
            .pool
            .fetch(&command.team_id, &command.entry_id)?
            .ok_or(DraftPoolError::EntryNotFound)?;
        if !entry.is_waiting() {
            return Err(DraftPoolError::InvalidState {
                found: entry.status,
            });
        }

        let mut resolved = entry.clone();
        resolved.status = EntryStatus::Declined;
        resolved.declined_at = Some(Utc::now());
        resolved.declined_by = Some(command.acted_by.clone());
        resolved.declined_reason = Some(command.reason.clone());

        self.pool
            .resolve_waiting(resolved.clone())
            .map_err(|err| match err {
                RepositoryError::StaleStatus => DraftPoolError::InvalidState {
                    found: EntryStatus::Declined,
                },
                other => DraftPoolError::Repository(other),
            })?;

        self.send_or_log(Notification {
            recipient: entry.registered_by.clone(),
            kind: NotificationKind::RegistrationDeclined,
            title: format!("Registration declined for {}", entry.player_name),
            body: format!(
                "The registration for {} was declined: {}",
                entry.player_name, command.reason
            ),
            metadata: entry_metadata(&entry, None),
        });
        self.send_or_log(Notification {
            recipient: command.acted_by,
            kind: NotificationKind::ActionConfirmed,
            title: format!("Declined {}", entry.player_name),
            body: format!(
                "The registration for {} was closed out: {}",
                entry.player_name, command.reason
            ),
            metadata: entry_metadata(&entry, None),
        });

        Ok(resolved)
    }

    /// Delivery is best-effort; roster placement never depends on it.
    fn send_or_log(&self, notification: Notification) {
        if let Err(err) = self.notifications.notify(notification) {
            warn!(error = %err, "notification delivery failed");
        }
    }
}

fn entry_metadata(
    entry: &DraftPoolEntry,
    player: Option<&RosterPlayerRecord>,
) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("entry_id".to_string(), entry.entry_id.0.clone());
    metadata.insert("team_id".to_string(), entry.team_id.0.clone());
    metadata.insert("sport".to_string(), entry.sport.clone());
    if let Some(player) = player {
        metadata.insert("player_id".to_string(), player.player_id.0.clone());
    }
    metadata
}
