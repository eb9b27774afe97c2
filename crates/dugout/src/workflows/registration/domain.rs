use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for draft-pool entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub String);

/// Identifier wrapper for teams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub String);

/// Identifier wrapper for athlete profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AthleteId(pub String);

/// Identifier wrapper for user accounts (guardians, coaches, owners).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for roster player records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

/// Identifier wrapper for registration orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

/// Canonical identity record for an athlete. Owned by the guardian account
/// or, for independent adults, the athlete's own account. The roster
/// assignment is the only registration-related state it carries; waiting and
/// declined states are read from the draft pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub athlete_id: AthleteId,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub username: Option<String>,
    pub guardian_id: Option<UserId>,
    pub account_id: UserId,
    pub team_id: Option<TeamId>,
}

impl AthleteProfile {
    /// Independent athletes register under their own adult account.
    pub fn is_independent(&self) -> bool {
        self.guardian_id.is_none()
    }
}

/// Team descriptor used for eligibility checks and auto-draft decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team_id: TeamId,
    pub owner_id: UserId,
    pub name: String,
    pub sport: String,
    pub age_group: String,
}

/// The open registration offer for a team: what it costs, whether a waiver
/// is required, and which birthdates the age group admits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventListing {
    pub team_id: TeamId,
    pub sport: String,
    pub age_group: String,
    pub fee_cents: i64,
    pub requires_waiver: bool,
    pub earliest_birthdate: Option<NaiveDate>,
    pub latest_birthdate: Option<NaiveDate>,
    pub min_plan_deposit_cents: Option<i64>,
}

/// Payment progress tracked on a draft-pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    PayInPerson,
    PaidPartial,
    PaidFull,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::PayInPerson => "pay_in_person",
            PaymentStatus::PaidPartial => "paid_partial",
            PaymentStatus::PaidFull => "paid_full",
        }
    }
}

/// Lifecycle status of a draft-pool entry. Transitions away from `Waiting`
/// exactly once; entries never reopen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Waiting,
    Drafted,
    Declined,
}

impl EntryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EntryStatus::Waiting => "waiting",
            EntryStatus::Drafted => "drafted",
            EntryStatus::Declined => "declined",
        }
    }
}

/// Payment channel chosen at registration time. Each variant carries exactly
/// the fields that channel needs, so partially-populated payment records
/// cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum PaymentMethod {
    Paypal {
        order_id: String,
        transaction_id: String,
    },
    InPerson,
    PaymentPlan {
        initial_amount_cents: i64,
    },
    Free,
}

impl PaymentMethod {
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Paypal { .. } => "paypal",
            PaymentMethod::InPerson => "in_person",
            PaymentMethod::PaymentPlan { .. } => "payment_plan",
            PaymentMethod::Free => "free",
        }
    }
}

/// Emergency contact snapshot captured with a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relationship: Option<String>,
}

/// Optional medical disclosures carried with a registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalInfo {
    pub allergies: Option<String>,
    pub conditions: Option<String>,
    pub physician_phone: Option<String>,
}

/// Uniform sizing preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformSizes {
    pub jersey: Option<String>,
    pub shorts: Option<String>,
}

/// One pending registration awaiting coach or commissioner action for one
/// team. Created by the registration workflow, mutated by payment updates
/// while `waiting`, and terminally resolved to `drafted` or `declined`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPoolEntry {
    pub entry_id: EntryId,
    pub team_id: TeamId,
    pub owner_id: UserId,
    pub sport: String,
    pub age_group: String,
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
    pub remaining_balance_cents: i64,
    pub status: EntryStatus,
    pub eligible_for_auto_draft: bool,
    pub waiver_signed: bool,
    pub preferred_position: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_info: Option<MedicalInfo>,
    pub uniform_sizes: Option<UniformSizes>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub drafted_at: Option<DateTime<Utc>>,
    pub drafted_by: Option<UserId>,
    pub drafted_to_team_id: Option<TeamId>,
    pub drafted_to_team_name: Option<String>,
    pub declined_at: Option<DateTime<Utc>>,
    pub declined_by: Option<UserId>,
    pub declined_reason: Option<String>,
}

impl DraftPoolEntry {
    pub fn is_waiting(&self) -> bool {
        self.status == EntryStatus::Waiting
    }

    /// Sanitized listing view for coach-facing queue screens.
    pub fn status_view(&self) -> EntryStatusView {
        EntryStatusView {
            entry_id: self.entry_id.clone(),
            team_id: self.team_id.clone(),
            player_name: self.player_name.clone(),
            status: self.status.label(),
            payment_status: self.payment_status.label(),
            amount_paid_cents: self.amount_paid_cents,
            remaining_balance_cents: self.remaining_balance_cents,
            eligible_for_auto_draft: self.eligible_for_auto_draft,
            created_at: self.created_at,
        }
    }
}

/// Sanitized representation of a draft-pool entry's exposed state.
#[derive(Debug, Clone, Serialize)]
pub struct EntryStatusView {
    pub entry_id: EntryId,
    pub team_id: TeamId,
    pub player_name: String,
    pub status: &'static str,
    pub payment_status: &'static str,
    pub amount_paid_cents: i64,
    pub remaining_balance_cents: i64,
    pub eligible_for_auto_draft: bool,
    pub created_at: DateTime<Utc>,
}

/// The authoritative "on a team" record, created only by a successful draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPlayerRecord {
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub athlete_id: Option<AthleteId>,
    pub player_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub preferred_position: Option<String>,
    pub guardian_id: Option<UserId>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_info: Option<MedicalInfo>,
    pub source_entry_id: EntryId,
    pub joined_at: DateTime<Utc>,
}

/// Financial record for one registration: how much was charged, through
/// which channel, and the resulting status. Gateway identifiers are opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationOrder {
    pub order_id: OrderId,
    pub team_id: TeamId,
    pub registered_by: UserId,
    pub player_name: String,
    pub method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub amount_paid_cents: i64,
    pub total_amount_cents: i64,
    pub confirmation_code: String,
    pub created_at: DateTime<Utc>,
}

/// Read-side registration status for profile-owning UIs, derived from the
/// draft pool and the canonical roster assignment instead of a denormalized
/// copy on the profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AthleteRegistrationStatus {
    None,
    Waiting {
        entry_id: EntryId,
        team_id: TeamId,
        sport: String,
    },
    Drafted {
        team_id: TeamId,
    },
    Declined {
        entry_id: EntryId,
        reason: Option<String>,
    },
}
