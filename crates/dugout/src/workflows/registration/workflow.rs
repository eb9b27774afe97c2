use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::warn;

use super::domain::{
    AthleteId, AthleteRegistrationStatus, DraftPoolEntry, EmergencyContact, EntryId, EventListing,
    MedicalInfo, OrderId, PaymentMethod, PaymentStatus, RegistrationOrder, RosterPlayerRecord,
    TeamId, UniformSizes, UserId,
};
use super::eligibility::EligibilityChecker;
use super::orchestrator::{DeclineCommand, DraftCommand, DraftOrchestrator};
use super::repository::{
    AthleteDirectory, DraftPoolRepository, Notification, NotificationKind, NotificationSink,
    RegistrationLedger, RepositoryError, TeamDirectory,
};
use super::store::{DraftPoolError, DraftPoolStore, DraftPoolSubmission, PaymentPatch};

/// Malformed registration input.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("step out of order: expected {expected}")]
    OutOfOrder { expected: &'static str },
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("contact email '{found}' is not a valid address")]
    InvalidEmail { found: String },
    #[error("athlete birthdate {found} is outside the {age_group} age window")]
    OutsideAgeRange { found: NaiveDate, age_group: String },
    #[error("waiver signature must match the athlete name '{expected}'")]
    WaiverMismatch { expected: String },
}

/// Payment-channel rejections at finalization time.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("event charges {total_cents} cents; free completion is not available")]
    PaymentRequired { total_cents: i64 },
    #[error("event is free; no payment channel is needed")]
    EventIsFree,
    #[error(
        "payment plan deposit of {found_cents} cents is outside the allowed range {min_cents}..={max_cents}"
    )]
    PlanDepositOutOfRange {
        min_cents: i64,
        max_cents: i64,
        found_cents: i64,
    },
    #[error("payment gateway capture incomplete: {0}")]
    Gateway(String),
}

/// Error raised by the registration workflow and its finalization service.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error("registration blocked: {reason}")]
    Ineligible { reason: String },
    #[error(transparent)]
    DraftPool(#[from] DraftPoolError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Steps of the guardian-facing registration sequence. The waiver step is
/// skipped entirely when the event does not require one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    Form,
    Waiver,
    Payment,
    Confirmation,
}

impl RegistrationStep {
    pub const fn label(self) -> &'static str {
        match self {
            RegistrationStep::Form => "form",
            RegistrationStep::Waiver => "waiver",
            RegistrationStep::Payment => "payment",
            RegistrationStep::Confirmation => "confirmation",
        }
    }
}

/// Everything collected on the athlete-information step.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegistrationForm {
    pub athlete_id: Option<AthleteId>,
    pub player_name: String,
    pub player_dob: Option<NaiveDate>,
    pub player_username: Option<String>,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub registered_by: UserId,
    pub independent_athlete: bool,
    pub preferred_position: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_info: Option<MedicalInfo>,
    pub uniform_sizes: Option<UniformSizes>,
    pub notes: Option<String>,
}

/// Resolved charge for the chosen payment channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTerms {
    pub status: PaymentStatus,
    pub amount_paid_cents: i64,
    pub total_amount_cents: i64,
}

/// Output of a completed workflow, ready for finalization.
#[derive(Debug, Clone)]
pub struct CompletedRegistration {
    pub event: EventListing,
    pub form: RegistrationForm,
    pub waiver_signed: bool,
    pub method: PaymentMethod,
    pub terms: PaymentTerms,
}

/// Pure state machine over `{form, waiver?, payment, confirmation}`. All IO
/// (eligibility, persistence, notifications) happens in
/// `RegistrationService`; the machine only validates and sequences input.
#[derive(Debug, Clone)]
pub struct RegistrationWorkflow {
    event: EventListing,
    step: RegistrationStep,
    form: Option<RegistrationForm>,
    waiver_signed: bool,
}

impl RegistrationWorkflow {
    pub fn new(event: EventListing) -> Self {
        Self {
            event,
            step: RegistrationStep::Form,
            form: None,
            waiver_signed: false,
        }
    }

    pub fn step(&self) -> RegistrationStep {
        self.step
    }

    pub fn event(&self) -> &EventListing {
        &self.event
    }

    /// Validate and accept the athlete-information form, advancing to the
    /// waiver step when the event requires one, else straight to payment.
    pub fn submit_form(
        &mut self,
        form: RegistrationForm,
    ) -> Result<RegistrationStep, ValidationError> {
        if self.step != RegistrationStep::Form {
            return Err(ValidationError::OutOfOrder {
                expected: self.step.label(),
            });
        }

        if form.player_name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "player_name",
            });
        }
        if form.contact_name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "contact_name",
            });
        }
        let email = form.contact_email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingField {
                field: "contact_email",
            });
        }
        if !email.contains('@') {
            return Err(ValidationError::InvalidEmail {
                found: form.contact_email.clone(),
            });
        }

        self.validate_age(&form)?;

        self.step = if self.event.requires_waiver {
            RegistrationStep::Waiver
        } else {
            RegistrationStep::Payment
        };
        self.form = Some(form);
        Ok(self.step)
    }

    fn validate_age(&self, form: &RegistrationForm) -> Result<(), ValidationError> {
        let window = (self.event.earliest_birthdate, self.event.latest_birthdate);
        if window == (None, None) {
            return Ok(());
        }
        let dob = form.player_dob.ok_or(ValidationError::MissingField {
            field: "player_dob",
        })?;
        let too_old = self
            .event
            .earliest_birthdate
            .map(|earliest| dob < earliest)
            .unwrap_or(false);
        let too_young = self
            .event
            .latest_birthdate
            .map(|latest| dob > latest)
            .unwrap_or(false);
        if too_old || too_young {
            return Err(ValidationError::OutsideAgeRange {
                found: dob,
                age_group: self.event.age_group.clone(),
            });
        }
        Ok(())
    }

    /// Accept the signed waiver acknowledgment. The typed signature must
    /// match the athlete's name.
    pub fn sign_waiver(&mut self, signature: &str) -> Result<RegistrationStep, ValidationError> {
        if self.step != RegistrationStep::Waiver {
            return Err(ValidationError::OutOfOrder {
                expected: self.step.label(),
            });
        }
        let expected = self
            .form
            .as_ref()
            .map(|form| form.player_name.clone())
            .unwrap_or_default();
        if !signature.trim().eq_ignore_ascii_case(expected.trim()) {
            return Err(ValidationError::WaiverMismatch { expected });
        }
        self.waiver_signed = true;
        self.step = RegistrationStep::Payment;
        Ok(self.step)
    }

    /// Resolve the chosen payment channel against the event total and
    /// produce the completed registration. On a rejection the machine stays
    /// on the payment step so another channel can be chosen.
    pub fn choose_payment(
        &mut self,
        method: PaymentMethod,
    ) -> Result<CompletedRegistration, RegistrationError> {
        if self.step != RegistrationStep::Payment {
            return Err(ValidationError::OutOfOrder {
                expected: self.step.label(),
            }
            .into());
        }

        let terms = payment_terms(&self.event, &method)?;
        let form = self
            .form
            .clone()
            .ok_or(ValidationError::MissingField { field: "form" })?;

        self.step = RegistrationStep::Confirmation;
        Ok(CompletedRegistration {
            event: self.event.clone(),
            form,
            waiver_signed: self.waiver_signed,
            method,
            terms,
        })
    }
}

/// Channel-specific charge derivation. A zero-total event admits only the
/// free completion; paid events require a real channel.
fn payment_terms(event: &EventListing, method: &PaymentMethod) -> Result<PaymentTerms, PaymentError> {
    let total = event.fee_cents;

    if total == 0 {
        return match method {
            PaymentMethod::Free => Ok(PaymentTerms {
                status: PaymentStatus::PaidFull,
                amount_paid_cents: 0,
                total_amount_cents: 0,
            }),
            _ => Err(PaymentError::EventIsFree),
        };
    }

    match method {
        PaymentMethod::Free => Err(PaymentError::PaymentRequired { total_cents: total }),
        PaymentMethod::Paypal {
            order_id,
            transaction_id,
        } => {
            if order_id.trim().is_empty() || transaction_id.trim().is_empty() {
                return Err(PaymentError::Gateway(
                    "capture returned no order or transaction id".to_string(),
                ));
            }
            Ok(PaymentTerms {
                status: PaymentStatus::PaidFull,
                amount_paid_cents: total,
                total_amount_cents: total,
            })
        }
        PaymentMethod::InPerson => Ok(PaymentTerms {
            status: PaymentStatus::PayInPerson,
            amount_paid_cents: 0,
            total_amount_cents: total,
        }),
        PaymentMethod::PaymentPlan {
            initial_amount_cents,
        } => {
            let min = event.min_plan_deposit_cents.unwrap_or(1);
            if *initial_amount_cents < min || *initial_amount_cents > total {
                return Err(PaymentError::PlanDepositOutOfRange {
                    min_cents: min,
                    max_cents: total,
                    found_cents: *initial_amount_cents,
                });
            }
            let status = if *initial_amount_cents >= total {
                PaymentStatus::PaidFull
            } else {
                PaymentStatus::PaidPartial
            };
            Ok(PaymentTerms {
                status,
                amount_paid_cents: *initial_amount_cents,
                total_amount_cents: total,
            })
        }
    }
}

static ORDER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CONFIRMATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_order_id() -> OrderId {
    let id = ORDER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OrderId(format!("ord-{id:06}"))
}

fn next_confirmation_code() -> String {
    let id = CONFIRMATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("REG-{id:06}")
}

/// Result of a finalized registration. When the auto-draft shortcut fired,
/// `entry` reflects the drafted state and `auto_drafted` carries the new
/// roster record.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub entry: DraftPoolEntry,
    pub order: RegistrationOrder,
    pub confirmation_code: String,
    pub auto_drafted: Option<RosterPlayerRecord>,
}

/// Facade composing the eligibility checker, draft-pool store, orchestrator,
/// order ledger, and notification sink. The HTTP router and the CLI drive
/// everything through this one type.
pub struct RegistrationService<D, T, P, O, N> {
    pool: Arc<D>,
    teams: Arc<T>,
    store: DraftPoolStore<D, T, P>,
    orchestrator: DraftOrchestrator<D, T, P, N>,
    checker: EligibilityChecker<D, T, P>,
    orders: Arc<O>,
    notifications: Arc<N>,
}

impl<D, T, P, O, N> RegistrationService<D, T, P, O, N>
where
    D: DraftPoolRepository,
    T: TeamDirectory,
    P: AthleteDirectory,
    O: RegistrationLedger,
    N: NotificationSink,
{
    pub fn new(
        pool: Arc<D>,
        teams: Arc<T>,
        athletes: Arc<P>,
        orders: Arc<O>,
        notifications: Arc<N>,
    ) -> Self {
        let store = DraftPoolStore::new(pool.clone(), teams.clone(), athletes.clone());
        let orchestrator = DraftOrchestrator::new(
            pool.clone(),
            teams.clone(),
            athletes.clone(),
            notifications.clone(),
        );
        let checker = EligibilityChecker::new(pool.clone(), teams.clone(), athletes);
        Self {
            pool,
            teams,
            store,
            orchestrator,
            checker,
            orders,
            notifications,
        }
    }

    /// The registration gate. Re-run whenever the selected athlete or the
    /// target event's sport changes; a lookup failure blocks registration.
    pub fn check_eligibility(
        &self,
        athlete_id: &AthleteId,
        sport: &str,
    ) -> Result<super::eligibility::EligibilityDecision, RepositoryError> {
        self.checker.check(athlete_id, sport)
    }

    pub fn open_event(&self, team_id: &TeamId) -> Result<Option<EventListing>, RepositoryError> {
        self.teams.open_event(team_id)
    }

    /// Finalize a completed registration. In order: re-run the eligibility
    /// gate, persist the order record, create the draft-pool entry, emit
    /// notifications, then apply the auto-draft shortcut when the entry is
    /// both flagged and fully paid. Order persistence failing aborts the
    /// whole flow with no entry created.
    pub fn register(
        &self,
        completed: CompletedRegistration,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        if let Some(athlete_id) = &completed.form.athlete_id {
            let decision = self.checker.check(athlete_id, &completed.event.sport)?;
            if let Some(reason) = decision.denial_reason() {
                return Err(RegistrationError::Ineligible { reason });
            }
        }

        let confirmation_code = next_confirmation_code();
        let order = self.orders.record(RegistrationOrder {
            order_id: next_order_id(),
            team_id: completed.event.team_id.clone(),
            registered_by: completed.form.registered_by.clone(),
            player_name: completed.form.player_name.clone(),
            method: completed.method.clone(),
            payment_status: completed.terms.status,
            amount_paid_cents: completed.terms.amount_paid_cents,
            total_amount_cents: completed.terms.total_amount_cents,
            confirmation_code: confirmation_code.clone(),
            created_at: Utc::now(),
        })?;

        let entry = self.store.create(DraftPoolSubmission {
            team_id: completed.event.team_id.clone(),
            athlete_id: completed.form.athlete_id.clone(),
            player_name: completed.form.player_name.clone(),
            player_dob: completed.form.player_dob,
            player_username: completed.form.player_username.clone(),
            contact_name: completed.form.contact_name.clone(),
            contact_email: completed.form.contact_email.clone(),
            contact_phone: completed.form.contact_phone.clone(),
            registered_by: completed.form.registered_by.clone(),
            independent_athlete: completed.form.independent_athlete,
            payment_status: completed.terms.status,
            amount_paid_cents: completed.terms.amount_paid_cents,
            total_amount_cents: completed.terms.total_amount_cents,
            waiver_signed: completed.waiver_signed,
            preferred_position: completed.form.preferred_position.clone(),
            emergency_contact: completed.form.emergency_contact.clone(),
            medical_info: completed.form.medical_info.clone(),
            uniform_sizes: completed.form.uniform_sizes.clone(),
            notes: completed.form.notes.clone(),
        })?;

        self.send_registration_notices(&completed, &entry, &confirmation_code);

        let auto_drafted = if entry.eligible_for_auto_draft
            && entry.payment_status == PaymentStatus::PaidFull
        {
            Some(self.orchestrator.draft(DraftCommand {
                team_id: entry.team_id.clone(),
                entry_id: entry.entry_id.clone(),
                acted_by: entry.registered_by.clone(),
                target_team_id: None,
            })?)
        } else {
            None
        };

        let entry = if auto_drafted.is_some() {
            self.pool
                .fetch(&entry.team_id, &entry.entry_id)
                .map_err(RegistrationError::Repository)?
                .unwrap_or(entry)
        } else {
            entry
        };

        Ok(RegistrationOutcome {
            entry,
            order,
            confirmation_code,
            auto_drafted,
        })
    }

    pub fn list_team_pool(&self, team_id: &TeamId) -> Result<Vec<DraftPoolEntry>, DraftPoolError> {
        self.store.list_by_team(team_id)
    }

    pub fn list_owner_pool(
        &self,
        owner_id: &UserId,
        sport: Option<&str>,
        age_group: Option<&str>,
    ) -> Result<Vec<DraftPoolEntry>, DraftPoolError> {
        self.store.list_by_owner(owner_id, sport, age_group)
    }

    pub fn update_payment(
        &self,
        team_id: &TeamId,
        entry_id: &EntryId,
        patch: PaymentPatch,
    ) -> Result<DraftPoolEntry, DraftPoolError> {
        self.store.update_payment(team_id, entry_id, patch)
    }

    pub fn draft(&self, command: DraftCommand) -> Result<RosterPlayerRecord, DraftPoolError> {
        self.orchestrator.draft(command)
    }

    pub fn decline(&self, command: DeclineCommand) -> Result<DraftPoolEntry, DraftPoolError> {
        self.orchestrator.decline(command)
    }

    pub fn registration_status(
        &self,
        athlete_id: &AthleteId,
    ) -> Result<AthleteRegistrationStatus, DraftPoolError> {
        self.store.registration_status(athlete_id)
    }

    /// Guardian and team-owner notices with copy reflecting the payment
    /// path. Best-effort, never fails the registration.
    fn send_registration_notices(
        &self,
        completed: &CompletedRegistration,
        entry: &DraftPoolEntry,
        confirmation_code: &str,
    ) {
        let payment_line = match &completed.method {
            PaymentMethod::Free => "No fee was due for this event.".to_string(),
            PaymentMethod::Paypal { .. } => format!(
                "Payment of {} cents was received online.",
                completed.terms.amount_paid_cents
            ),
            PaymentMethod::InPerson => format!(
                "{} cents will be collected in person.",
                completed.terms.total_amount_cents
            ),
            PaymentMethod::PaymentPlan { .. } => format!(
                "Payment plan started: {} cents paid, {} cents remaining.",
                completed.terms.amount_paid_cents,
                completed.terms.total_amount_cents - completed.terms.amount_paid_cents
            ),
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("entry_id".to_string(), entry.entry_id.0.clone());
        metadata.insert(
            "confirmation_code".to_string(),
            confirmation_code.to_string(),
        );
        metadata.insert("channel".to_string(), completed.method.label().to_string());

        self.send_or_log(Notification {
            recipient: completed.form.registered_by.clone(),
            kind: NotificationKind::RegistrationReceived,
            title: format!("Registration received for {}", entry.player_name),
            body: format!(
                "{} is in the draft pool for {}. Confirmation code {}. {}",
                entry.player_name, entry.sport, confirmation_code, payment_line
            ),
            metadata: metadata.clone(),
        });
        self.send_or_log(Notification {
            recipient: entry.owner_id.clone(),
            kind: NotificationKind::RegistrationReceived,
            title: format!("New registration: {}", entry.player_name),
            body: format!(
                "{} registered for your {} {} team. {}",
                entry.player_name, entry.age_group, entry.sport, payment_line
            ),
            metadata,
        });
    }

    fn send_or_log(&self, notification: Notification) {
        if let Err(err) = self.notifications.notify(notification) {
            warn!(error = %err, "notification delivery failed");
        }
    }
}
