use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use super::autodraft::eligible_for_auto_draft;
use super::domain::{
    AthleteId, AthleteRegistrationStatus, DraftPoolEntry, EmergencyContact, EntryId, EntryStatus,
    MedicalInfo, PaymentStatus, TeamId, UniformSizes, UserId,
};
use super::repository::{
    AthleteDirectory, DraftPoolRepository, RepositoryError, TeamDirectory,
};

/// Errors raised by draft-pool mutations. Shared with the orchestrator so
/// the whole subsystem speaks one taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum DraftPoolError {
    #[error("draft pool entry not found")]
    EntryNotFound,
    #[error("team not found")]
    TeamNotFound,
    #[error("entry is {} and can no longer be modified", found.label())]
    InvalidState { found: EntryStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

static ENTRY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_entry_id() -> EntryId {
    let id = ENTRY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EntryId(format!("dp-{id:06}"))
}

/// Everything the registration workflow hands over to open a draft-pool
/// entry. Computed fields (balance, auto-draft flag, timestamps, status) are
/// filled in by `create`.
#[derive(Debug, Clone)]
pub struct DraftPoolSubmission {
    pub team_id: TeamId,
    pub athlete_id: Option<AthleteId>,
    pub player_name: String,
    pub player_dob: Option<NaiveDate>,
    pub player_username: Option<String>,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub registered_by: UserId,
    pub independent_athlete: bool,
    pub payment_status: PaymentStatus,
    pub amount_paid_cents: i64,
    pub total_amount_cents: i64,
    pub waiver_signed: bool,
    pub preferred_position: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_info: Option<MedicalInfo>,
    pub uniform_sizes: Option<UniformSizes>,
    pub notes: Option<String>,
}

/// Partial payment update recorded by a coach while an entry is waiting.
/// The payment status is derived from the new balance unless the patch
/// overrides it explicitly.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PaymentPatch {
    pub amount_paid_cents: Option<i64>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

/// Owns draft-pool entries: creation, queue listings, payment updates, and
/// the read-side registration status view.
pub struct DraftPoolStore<D, T, P> {
    pool: Arc<D>,
    teams: Arc<T>,
    athletes: Arc<P>,
}

impl<D, T, P> DraftPoolStore<D, T, P>
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

    /// Insert a new `waiting` entry. Computes the remaining balance and
    /// snapshots `eligible_for_auto_draft` from the owner's current sibling
    /// teams. Promotion of fully-paid auto-draftable entries is driven by
    /// the registration service, which owns the orchestrator.
    pub fn create(&self, submission: DraftPoolSubmission) -> Result<DraftPoolEntry, DraftPoolError> {
        let team = self
            .teams
            .fetch_team(&submission.team_id)?
            .ok_or(DraftPoolError::TeamNotFound)?;
        let siblings = self.teams.teams_by_owner(&team.owner_id)?;
        let auto_draft = eligible_for_auto_draft(&siblings, &team);

        let entry = DraftPoolEntry {
            entry_id: next_entry_id(),
            team_id: team.team_id.clone(),
            owner_id: team.owner_id.clone(),
            sport: team.sport.clone(),
            age_group: team.age_group.clone(),
            athlete_id: submission.athlete_id,
            player_name: submission.player_name,
            player_dob: submission.player_dob,
            player_username: submission.player_username,
            contact_name: submission.contact_name,
            contact_email: submission.contact_email,
            contact_phone: submission.contact_phone,
            registered_by: submission.registered_by,
            independent_athlete: submission.independent_athlete,
            payment_status: submission.payment_status,
            amount_paid_cents: submission.amount_paid_cents,
            total_amount_cents: submission.total_amount_cents,
            remaining_balance_cents: submission.total_amount_cents - submission.amount_paid_cents,
            status: EntryStatus::Waiting,
            eligible_for_auto_draft: auto_draft,
            waiver_signed: submission.waiver_signed,
            preferred_position: submission.preferred_position,
            emergency_contact: submission.emergency_contact,
            medical_info: submission.medical_info,
            uniform_sizes: submission.uniform_sizes,
            notes: submission.notes,
            created_at: Utc::now(),
            drafted_at: None,
            drafted_by: None,
            drafted_to_team_id: None,
            drafted_to_team_name: None,
            declined_at: None,
            declined_by: None,
            declined_reason: None,
        };

        Ok(self.pool.insert(entry)?)
    }

    /// Waiting entries for one team, oldest-first. Coaches work the queue in
    /// FIFO order; resolution order is unconstrained.
    pub fn list_by_team(&self, team_id: &TeamId) -> Result<Vec<DraftPoolEntry>, DraftPoolError> {
        let mut entries = self.pool.waiting_by_team(team_id)?;
        sort_fifo(&mut entries);
        Ok(entries)
    }

    /// Waiting entries across all of an owner's teams, merge-sorted by
    /// creation time, optionally narrowed by sport and age group.
    pub fn list_by_owner(
        &self,
        owner_id: &UserId,
        sport: Option<&str>,
        age_group: Option<&str>,
    ) -> Result<Vec<DraftPoolEntry>, DraftPoolError> {
        let mut entries = self.pool.waiting_by_owner(owner_id, sport, age_group)?;
        sort_fifo(&mut entries);
        Ok(entries)
    }

    /// Record a payment against a waiting entry. Recomputes the balance and
    /// derives the payment status: a cleared balance is `paid_full`, a
    /// positive balance with anything paid is `paid_partial`, otherwise the
    /// prior status stands. An explicit status in the patch wins.
    pub fn update_payment(
        &self,
        team_id: &TeamId,
        entry_id: &EntryId,
        patch: PaymentPatch,
    ) -> Result<DraftPoolEntry, DraftPoolError> {
        let mut entry = self
            .pool
            .fetch(team_id, entry_id)?
            .ok_or(DraftPoolError::EntryNotFound)?;
        if !entry.is_waiting() {
            return Err(DraftPoolError::InvalidState {
                found: entry.status,
            });
        }

        if let Some(amount_paid) = patch.amount_paid_cents {
            entry.amount_paid_cents = amount_paid;
        }
        if let Some(notes) = patch.notes {
            entry.notes = Some(notes);
        }
        entry.remaining_balance_cents = entry.total_amount_cents - entry.amount_paid_cents;

        entry.payment_status = match patch.payment_status {
            Some(explicit) => explicit,
            None if entry.remaining_balance_cents <= 0 => PaymentStatus::PaidFull,
            None if entry.amount_paid_cents > 0 => PaymentStatus::PaidPartial,
            None => entry.payment_status,
        };

        self.pool.update(entry.clone())?;
        Ok(entry)
    }

    /// Read-side view of an athlete's registration state, derived from the
    /// pool and the canonical roster assignment. Replaces the source
    /// system's denormalized status copy on the profile.
    pub fn registration_status(
        &self,
        athlete_id: &AthleteId,
    ) -> Result<AthleteRegistrationStatus, DraftPoolError> {
        let mut entries = self.pool.entries_by_athlete(athlete_id)?;
        sort_fifo(&mut entries);

        if let Some(waiting) = entries.iter().find(|entry| entry.is_waiting()) {
            return Ok(AthleteRegistrationStatus::Waiting {
                entry_id: waiting.entry_id.clone(),
                team_id: waiting.team_id.clone(),
                sport: waiting.sport.clone(),
            });
        }

        if let Some(profile) = self.athletes.fetch_athlete(athlete_id)? {
            if let Some(team_id) = profile.team_id {
                return Ok(AthleteRegistrationStatus::Drafted { team_id });
            }
        }

        // Most recent resolution wins for the declined view.
        if let Some(declined) = entries
            .iter()
            .rev()
            .find(|entry| entry.status == EntryStatus::Declined)
        {
            return Ok(AthleteRegistrationStatus::Declined {
                entry_id: declined.entry_id.clone(),
                reason: declined.declined_reason.clone(),
            });
        }

        Ok(AthleteRegistrationStatus::None)
    }
}

/// Oldest-first with the entry id as tie-breaker so the ordering is total.
pub(crate) fn sort_fifo(entries: &mut [DraftPoolEntry]) {
    entries.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });
}
