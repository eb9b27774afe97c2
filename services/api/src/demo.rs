use crate::infra::{
    seed_demo_league, BufferedNotificationSink, InMemoryAthleteDirectory, InMemoryDraftPool,
    InMemoryRegistrationLedger, InMemoryTeamDirectory,
};
use clap::Args;
use dugout::error::AppError;
use dugout::workflows::registration::{
    AthleteId, DeclineCommand, DraftCommand, DraftPoolError, EntryStatusView, PaymentMethod,
    PaymentPatch, RegistrationError, RegistrationForm, RegistrationService, RegistrationStep,
    RegistrationWorkflow, TeamDirectory, TeamId, UserId,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the seeded football registration fee, in cents
    #[arg(long)]
    pub(crate) football_fee_cents: Option<i64>,
}

type DemoService = RegistrationService<
    InMemoryDraftPool,
    InMemoryTeamDirectory,
    InMemoryAthleteDirectory,
    InMemoryRegistrationLedger,
    BufferedNotificationSink,
>;

fn lift(err: DraftPoolError) -> AppError {
    AppError::from(RegistrationError::from(err))
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let pool = Arc::new(InMemoryDraftPool::default());
    let teams = Arc::new(InMemoryTeamDirectory::default());
    let athletes = Arc::new(InMemoryAthleteDirectory::default());
    let orders = Arc::new(InMemoryRegistrationLedger::default());
    let notifications = Arc::new(BufferedNotificationSink::default());
    seed_demo_league(&teams, &athletes);

    let service: Arc<DemoService> = Arc::new(RegistrationService::new(
        pool,
        teams.clone(),
        athletes,
        orders,
        notifications.clone(),
    ));

    let owner = UserId("owner-pat".to_string());
    let falcons = TeamId("team-falcons".to_string());
    let hornets = TeamId("team-hornets".to_string());

    println!("Dugout registration demo");

    // A fully-paid registration for the owner's only football team promotes
    // straight to the roster.
    let mut football_event = service
        .open_event(&falcons)
        .map_err(|err| lift(DraftPoolError::Repository(err)))?
        .expect("seeded football event");
    if let Some(fee) = args.football_fee_cents {
        football_event.fee_cents = fee;
    }

    println!(
        "\nRegistering Riley Parker for Falcons football ({} cents, online payment)",
        football_event.fee_cents
    );
    let mut workflow = RegistrationWorkflow::new(football_event.clone());
    let step = workflow
        .submit_form(riley_form())
        .map_err(RegistrationError::from)?;
    if step == RegistrationStep::Waiver {
        workflow
            .sign_waiver("Riley Parker")
            .map_err(RegistrationError::from)?;
    }
    let method = if football_event.fee_cents == 0 {
        PaymentMethod::Free
    } else {
        PaymentMethod::Paypal {
            order_id: "DEMO-ORDER-1".to_string(),
            transaction_id: "DEMO-TXN-1".to_string(),
        }
    };
    let completed = workflow.choose_payment(method)?;
    let outcome = service.register(completed)?;
    println!("- confirmation code: {}", outcome.confirmation_code);
    println!("- entry status: {}", outcome.entry.status.label());
    match &outcome.auto_drafted {
        Some(player) => println!("- auto-drafted onto the roster as {}", player.player_id.0),
        None => println!("- waiting for a coach in the draft pool"),
    }

    // A payment-plan registration stays in the pool for coach review.
    println!("\nRegistering Casey Brooks on a payment plan (2000 of 5000 cents)");
    let mut workflow = RegistrationWorkflow::new(football_event);
    let mut form = riley_form();
    form.athlete_id = None;
    form.player_name = "Casey Brooks".to_string();
    form.player_dob = chrono::NaiveDate::from_ymd_opt(2015, 9, 3);
    form.contact_name = "Morgan Brooks".to_string();
    form.contact_email = "morgan.brooks@example.com".to_string();
    let step = workflow.submit_form(form).map_err(RegistrationError::from)?;
    if step == RegistrationStep::Waiver {
        workflow
            .sign_waiver("Casey Brooks")
            .map_err(RegistrationError::from)?;
    }
    let completed = workflow.choose_payment(PaymentMethod::PaymentPlan {
        initial_amount_cents: 2000,
    })?;
    let casey = service.register(completed)?;
    println!(
        "- {} remaining on the plan, status {}",
        casey.entry.remaining_balance_cents,
        casey.entry.payment_status.label()
    );

    // An independent adult registering for basketball; two sibling teams
    // means no auto-draft even though the free event is fully paid.
    println!("\nRegistering Jordan Wells (independent) for Hornets basketball");
    let basketball_event = service
        .open_event(&hornets)
        .map_err(|err| lift(DraftPoolError::Repository(err)))?
        .expect("seeded basketball event");
    let mut workflow = RegistrationWorkflow::new(basketball_event);
    let mut form = riley_form();
    form.athlete_id = Some(AthleteId("ath-jordan".to_string()));
    form.player_name = "Jordan Wells".to_string();
    form.player_dob = chrono::NaiveDate::from_ymd_opt(1998, 6, 2);
    form.contact_name = "Jordan Wells".to_string();
    form.contact_email = "jordan.wells@example.com".to_string();
    form.registered_by = UserId("user-jordan".to_string());
    form.independent_athlete = true;
    workflow.submit_form(form).map_err(RegistrationError::from)?;
    let completed = workflow.choose_payment(PaymentMethod::Free)?;
    let jordan = service.register(completed)?;
    println!(
        "- entry {} is {} (auto-draft eligible: {})",
        jordan.entry.entry_id.0,
        jordan.entry.status.label(),
        jordan.entry.eligible_for_auto_draft
    );

    println!("\nOwner-wide draft pool (oldest first):");
    let queue = service
        .list_owner_pool(&owner, None, None)
        .map_err(lift)?;
    for entry in &queue {
        print_entry(&entry.status_view());
    }

    println!("\nCoach records Casey's remaining balance in person");
    let updated = service
        .update_payment(
            &falcons,
            &casey.entry.entry_id,
            PaymentPatch {
                amount_paid_cents: Some(5000),
                payment_status: None,
                notes: Some("paid at practice".to_string()),
            },
        )
        .map_err(lift)?;
    println!(
        "- payment status {}, remaining {}",
        updated.payment_status.label(),
        updated.remaining_balance_cents
    );

    println!("\nCoach drafts Casey and declines Jordan");
    let player = service
        .draft(DraftCommand {
            team_id: falcons.clone(),
            entry_id: casey.entry.entry_id.clone(),
            acted_by: owner.clone(),
            target_team_id: None,
        })
        .map_err(lift)?;
    println!("- Casey rostered as {}", player.player_id.0);
    let declined = service
        .decline(DeclineCommand {
            team_id: hornets.clone(),
            entry_id: jordan.entry.entry_id.clone(),
            reason: "Tryouts are full for this season".to_string(),
            acted_by: owner.clone(),
        })
        .map_err(lift)?;
    println!(
        "- Jordan declined: {}",
        declined.declined_reason.as_deref().unwrap_or("(no reason)")
    );

    let queue = service
        .list_owner_pool(&owner, None, None)
        .map_err(lift)?;
    println!("\nDraft pool after coach actions: {} waiting", queue.len());

    println!("\nFalcons roster:");
    for player in teams.roster(&falcons).map_err(|err| lift(err.into()))? {
        println!("- {} ({})", player.player_name, player.player_id.0);
    }

    println!("\nNotifications delivered:");
    for note in notifications.events() {
        println!("- [{}] to {}: {}", note.kind.label(), note.recipient.0, note.title);
    }

    Ok(())
}

fn riley_form() -> RegistrationForm {
    RegistrationForm {
        athlete_id: Some(AthleteId("ath-riley".to_string())),
        player_name: "Riley Parker".to_string(),
        player_dob: chrono::NaiveDate::from_ymd_opt(2015, 4, 12),
        player_username: Some("riley.p".to_string()),
        contact_name: "Dana Parker".to_string(),
        contact_email: "dana.parker@example.com".to_string(),
        contact_phone: Some("555-0142".to_string()),
        registered_by: UserId("guardian-dana".to_string()),
        independent_athlete: false,
        preferred_position: Some("quarterback".to_string()),
        emergency_contact: None,
        medical_info: None,
        uniform_sizes: None,
        notes: None,
    }
}

fn print_entry(view: &EntryStatusView) {
    println!(
        "- {} | {} | {} | paid {} of {}",
        view.entry_id.0,
        view.player_name,
        view.payment_status,
        view.amount_paid_cents,
        view.amount_paid_cents + view.remaining_balance_cents
    );
}
