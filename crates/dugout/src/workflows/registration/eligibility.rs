use std::sync::Arc;

use super::domain::{AthleteId, EntryStatus};
use super::repository::{AthleteDirectory, DraftPoolRepository, RepositoryError, TeamDirectory};

/// Outcome of the registration gate for one athlete + sport pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EligibilityDecision {
    Eligible,
    AlreadyRostered { team_name: String, sport: String },
    AlreadyWaiting { team_name: String, sport: String },
}

impl EligibilityDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, EligibilityDecision::Eligible)
    }

    /// Human-readable denial copy naming the conflicting team, or `None`
    /// when the athlete may register.
    pub fn denial_reason(&self) -> Option<String> {
        match self {
            EligibilityDecision::Eligible => None,
            EligibilityDecision::AlreadyRostered { team_name, sport } => Some(format!(
                "already on the {team_name} roster for {sport} this season"
            )),
            EligibilityDecision::AlreadyWaiting { team_name, sport } => Some(format!(
                "already has a pending {sport} registration with {team_name}"
            )),
        }
    }
}

/// Read-only gate deciding whether a new registration is permitted.
///
/// Fails closed: a lookup error propagates to the caller, which must block
/// the registration and surface the failure. Registration proceeds only on a
/// positive `Eligible`.
pub struct EligibilityChecker<D, T, P> {
    pool: Arc<D>,
    teams: Arc<T>,
    athletes: Arc<P>,
}

impl<D, T, P> EligibilityChecker<D, T, P>
where
    D: DraftPoolRepository,
    T: TeamDirectory,
    P: AthleteDirectory,
{
    pub fn new(pool: Arc<D>, teams: Arc<T>, athletes: Arc<P>) -> Self {
        Self {
            pool,
            teams,
            athletes,
        }
    }

    pub fn check(
        &self,
        athlete_id: &AthleteId,
        sport: &str,
    ) -> Result<EligibilityDecision, RepositoryError> {
        if let Some(profile) = self.athletes.fetch_athlete(athlete_id)? {
            if let Some(team_id) = &profile.team_id {
                // An assignment pointing at a team we cannot resolve is
                // ambiguous evidence, not absence of a conflict.
                let team = self
                    .teams
                    .fetch_team(team_id)?
                    .ok_or(RepositoryError::NotFound)?;
                if team.sport.eq_ignore_ascii_case(sport) {
                    return Ok(EligibilityDecision::AlreadyRostered {
                        team_name: team.name,
                        sport: team.sport,
                    });
                }
            }
        }

        for entry in self.pool.entries_by_athlete(athlete_id)? {
            if entry.status != EntryStatus::Waiting {
                continue;
            }
            if entry.sport.eq_ignore_ascii_case(sport) {
                let team_name = self
                    .teams
                    .fetch_team(&entry.team_id)?
                    .map(|team| team.name)
                    .unwrap_or_else(|| entry.team_id.0.clone());
                return Ok(EligibilityDecision::AlreadyWaiting {
                    team_name,
                    sport: entry.sport,
                });
            }
        }

        Ok(EligibilityDecision::Eligible)
    }
}
