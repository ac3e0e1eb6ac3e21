//! End-to-end workflow tests over the SQLite repositories.
//!
//! Exercises the full participant journey: score submission and approval,
//! study plan with skill requests, staff feedback with grants, completion,
//! and package purchase with verification.

use chrono::{DateTime, Duration, Months, Utc};

use prepflow_core::event::EventBus;
use prepflow_core::service::billing::BillingService;
use prepflow_core::service::score_ledger::{ScoreLedgerService, ScorePolicy};
use prepflow_core::service::study_plan::StudyPlanService;
use prepflow_core::subscription::SubscriptionWindows;
use prepflow_infra::sqlite::package::SqlitePackageRepository;
use prepflow_infra::sqlite::plan::SqlitePlanRepository;
use prepflow_infra::sqlite::pool::DatabasePool;
use prepflow_infra::sqlite::score::SqliteScoreRepository;
use prepflow_infra::sqlite::skill_catalog::SqliteSkillCatalog;
use prepflow_infra::sqlite::subscription::SqliteSubscriptionWindows;
use prepflow_infra::sqlite::transaction::SqliteTransactionRepository;
use prepflow_types::billing::{
    CreatePackageRequest, Facility, PurchaseRequest, TransactionDecision, TransactionStatus,
};
use prepflow_types::error::{EligibilityReason, WorkflowError};
use prepflow_types::ids::{ParticipantId, StaffId};
use prepflow_types::plan::{DailyDuration, PlanStatus, SubmitPlanRequest, TargetDuration};
use prepflow_types::score::{ScoreDecision, SubmitScoreRequest};
use prepflow_types::skill::{Skill, SkillId};

async fn test_pool() -> DatabasePool {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    std::mem::forget(dir);
    DatabasePool::new(&url).await.unwrap()
}

fn scores(pool: &DatabasePool) -> ScoreLedgerService<SqliteScoreRepository> {
    ScoreLedgerService::new(
        SqliteScoreRepository::new(pool.clone()),
        EventBus::new(16),
        ScorePolicy::default(),
    )
}

fn plans(
    pool: &DatabasePool,
) -> StudyPlanService<SqlitePlanRepository, SqliteScoreRepository, SqliteSkillCatalog> {
    StudyPlanService::new(
        SqlitePlanRepository::new(pool.clone()),
        SqliteScoreRepository::new(pool.clone()),
        SqliteSkillCatalog::new(pool.clone()),
        EventBus::new(16),
    )
}

fn billing(
    pool: &DatabasePool,
) -> BillingService<
    SqliteTransactionRepository,
    SqlitePackageRepository,
    SqlitePlanRepository,
    SqliteScoreRepository,
    SqliteSubscriptionWindows,
> {
    BillingService::new(
        SqliteTransactionRepository::new(pool.clone()),
        SqlitePackageRepository::new(pool.clone()),
        SqlitePlanRepository::new(pool.clone()),
        SqliteScoreRepository::new(pool.clone()),
        SqliteSubscriptionWindows::new(pool.clone()),
        EventBus::new(16),
    )
}

async fn seed_catalog(pool: &DatabasePool) {
    let catalog = SqliteSkillCatalog::new(pool.clone());
    catalog
        .seed(&[
            Skill {
                id: SkillId::new("reading.inference"),
                category: "reading".to_string(),
                label: "Inference questions".to_string(),
            },
            Skill {
                id: SkillId::new("reading.vocabulary"),
                category: "reading".to_string(),
                label: "Vocabulary in context".to_string(),
            },
            Skill {
                id: SkillId::new("listening.detail"),
                category: "listening".to_string(),
                label: "Detail questions".to_string(),
            },
        ])
        .await
        .unwrap();
}

/// Submit and approve a score, returning the participant.
async fn approved_participant(pool: &DatabasePool, now: DateTime<Utc>) -> ParticipantId {
    let participant = ParticipantId::new();
    let ledger = scores(pool);
    let submission = ledger
        .submit(
            SubmitScoreRequest {
                participant_id: participant,
                test_name: "TOEFL ITP".to_string(),
                score: 520,
                document_ref: "doc-ref".to_string(),
            },
            now,
        )
        .await
        .unwrap();
    ledger
        .decide(
            &submission.id,
            &StaffId::new(),
            ScoreDecision::Approve {
                valid_until: now + Duration::days(180),
            },
            now,
        )
        .await
        .unwrap();
    participant
}

fn plan_request(participant: ParticipantId) -> SubmitPlanRequest {
    SubmitPlanRequest {
        participant_id: participant,
        target_score: 550,
        target_duration: TargetDuration::ThreeMonths,
        weekly_frequency: 4,
        daily_duration: DailyDuration::OneToTwoHours,
        skill_ids: vec![SkillId::new("reading.inference"), SkillId::new("listening.detail")],
    }
}

#[tokio::test]
async fn full_journey_score_to_subscription() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();
    let staff = StaffId::new();

    let participant = approved_participant(&pool, now).await;

    // Plan submission passes the score gate.
    let plan_service = plans(&pool);
    let plan = plan_service.submit(plan_request(participant), now).await.unwrap();
    assert_eq!(plan.status, PlanStatus::Pending);

    // Purchase is still gated until feedback lands.
    let billing_service = billing(&pool);
    let gate = billing_service.check_eligibility(&participant, now).await.unwrap();
    assert_eq!(gate.reason, Some(EligibilityReason::NoFeedbackYet));

    // Feedback activates the plan window.
    plan_service
        .give_feedback(
            &plan.id,
            &staff,
            &[SkillId::new("reading.inference"), SkillId::new("reading.vocabulary")],
            now,
        )
        .await
        .unwrap();
    let active = plan_service.get_active(&participant).await.unwrap().unwrap();
    assert_eq!(active.status, PlanStatus::FeedbackGiven);
    assert_eq!(active.end_date, Some(now + Months::new(3)));

    // Reconciliation: one honored, one dropped, one added.
    let reconciliation = plan_service.reconciliation(&plan.id).await.unwrap();
    assert_eq!(reconciliation.honored.len(), 1);
    assert_eq!(reconciliation.dropped.len(), 1);
    assert_eq!(reconciliation.added.len(), 1);

    // Package purchase and verification.
    let package = billing_service
        .create_package(
            CreatePackageRequest {
                name: "Intensive".to_string(),
                price: 250_000,
                validity_months: 3,
                facilities: vec![Facility::GroupClass, Facility::MockTest],
            },
            now,
        )
        .await
        .unwrap();

    let transaction = billing_service
        .purchase(
            PurchaseRequest {
                participant_id: participant,
                package_id: package.id,
                proof_ref: "proof-ref".to_string(),
                amount: 250_000,
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(transaction.status, TransactionStatus::Pending);
    assert!(transaction.code.starts_with("TRX-"));

    let verified = billing_service
        .verify(
            &transaction.id,
            &staff,
            TransactionDecision::Approve { remark: None },
            now,
        )
        .await
        .unwrap();
    assert_eq!(verified.status, TransactionStatus::Approved);
    assert_eq!(verified.decision_remark.as_deref(), Some("Payment verified"));

    let window = SqliteSubscriptionWindows::new(pool.clone())
        .latest_for(&participant)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(window.starts_at, now);
    assert_eq!(window.ends_at, now + Months::new(3));
}

#[tokio::test]
async fn plan_submission_blocked_without_approved_score() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();

    let err = plans(&pool)
        .submit(plan_request(ParticipantId::new()), now)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Ineligible(EligibilityReason::NoValidScore)
    ));
}

#[tokio::test]
async fn plan_submission_blocked_after_score_expiry() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();
    let participant = approved_participant(&pool, now).await;

    // Fast-forward past the 180-day validity window.
    let later = now + Duration::days(181);
    let err = plans(&pool)
        .submit(plan_request(participant), later)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Ineligible(EligibilityReason::NoValidScore)
    ));
}

#[tokio::test]
async fn second_plan_conflicts_while_first_is_active() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();
    let participant = approved_participant(&pool, now).await;

    let plan_service = plans(&pool);
    plan_service.submit(plan_request(participant), now).await.unwrap();

    let err = plan_service
        .submit(plan_request(participant), now)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Conflict(_)));
}

#[tokio::test]
async fn rejected_plan_frees_the_active_slot() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();
    let participant = approved_participant(&pool, now).await;

    let plan_service = plans(&pool);
    let plan = plan_service.submit(plan_request(participant), now).await.unwrap();
    plan_service.reject(&plan.id, "targets are unrealistic").await.unwrap();

    assert!(plan_service.get_active(&participant).await.unwrap().is_none());
    let resubmitted = plan_service.submit(plan_request(participant), now).await.unwrap();
    assert_ne!(resubmitted.id, plan.id);
}

#[tokio::test]
async fn feedback_is_write_once() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();
    let participant = approved_participant(&pool, now).await;

    let plan_service = plans(&pool);
    let plan = plan_service.submit(plan_request(participant), now).await.unwrap();
    let staff = StaffId::new();
    plan_service
        .give_feedback(&plan.id, &staff, &[SkillId::new("reading.inference")], now)
        .await
        .unwrap();

    let err = plan_service
        .give_feedback(&plan.id, &staff, &[SkillId::new("listening.detail")], now)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));
}

#[tokio::test]
async fn unknown_skill_fails_the_whole_submission() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();
    let participant = approved_participant(&pool, now).await;

    let mut request = plan_request(participant);
    request.skill_ids.push(SkillId::new("speaking.ghost"));
    let err = plans(&pool).submit(request, now).await.unwrap_err();
    match err {
        WorkflowError::Validation(msg) => assert!(msg.contains("speaking.ghost")),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn completion_waits_for_the_end_date() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();
    let participant = approved_participant(&pool, now).await;

    let plan_service = plans(&pool);
    let plan = plan_service.submit(plan_request(participant), now).await.unwrap();
    plan_service
        .give_feedback(&plan.id, &StaffId::new(), &[SkillId::new("reading.inference")], now)
        .await
        .unwrap();

    let err = plan_service.mark_completed(&plan.id, now).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));

    let after_end = now + Months::new(3) + Duration::days(1);
    let completed = plan_service.mark_completed(&plan.id, after_end).await.unwrap();
    assert_eq!(completed.status, PlanStatus::Completed);
    assert!(!completed.is_active);

    // Idempotent on an already-completed plan.
    let again = plan_service.mark_completed(&plan.id, after_end).await.unwrap();
    assert_eq!(again.status, PlanStatus::Completed);
}

#[tokio::test]
async fn purchase_amount_must_match_price_exactly() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();
    let participant = approved_participant(&pool, now).await;

    let plan_service = plans(&pool);
    let plan = plan_service.submit(plan_request(participant), now).await.unwrap();
    plan_service
        .give_feedback(&plan.id, &StaffId::new(), &[SkillId::new("reading.inference")], now)
        .await
        .unwrap();

    let billing_service = billing(&pool);
    let package = billing_service
        .create_package(
            CreatePackageRequest {
                name: "Basic".to_string(),
                price: 100_000,
                validity_months: 1,
                facilities: vec![Facility::GroupClass],
            },
            now,
        )
        .await
        .unwrap();

    let err = billing_service
        .purchase(
            PurchaseRequest {
                participant_id: participant,
                package_id: package.id,
                proof_ref: "proof".to_string(),
                amount: 99_999,
            },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

#[tokio::test]
async fn second_verification_has_no_window_effect() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();
    let participant = approved_participant(&pool, now).await;
    let staff = StaffId::new();

    let plan_service = plans(&pool);
    let plan = plan_service.submit(plan_request(participant), now).await.unwrap();
    plan_service
        .give_feedback(&plan.id, &staff, &[SkillId::new("reading.inference")], now)
        .await
        .unwrap();

    let billing_service = billing(&pool);
    let package = billing_service
        .create_package(
            CreatePackageRequest {
                name: "Basic".to_string(),
                price: 100_000,
                validity_months: 2,
                facilities: vec![Facility::GroupClass],
            },
            now,
        )
        .await
        .unwrap();
    let transaction = billing_service
        .purchase(
            PurchaseRequest {
                participant_id: participant,
                package_id: package.id,
                proof_ref: "proof".to_string(),
                amount: 100_000,
            },
            now,
        )
        .await
        .unwrap();

    billing_service
        .verify(&transaction.id, &staff, TransactionDecision::Approve { remark: None }, now)
        .await
        .unwrap();

    // Re-deciding in either direction fails and leaves the window alone.
    let err = billing_service
        .verify(
            &transaction.id,
            &staff,
            TransactionDecision::Reject { remark: "changed my mind".to_string() },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState(_)));

    let window = SqliteSubscriptionWindows::new(pool.clone())
        .latest_for(&participant)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(window.ends_at, now + Months::new(2));
}

#[tokio::test]
async fn rejected_transaction_stores_remark_and_grants_no_window() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();
    let participant = approved_participant(&pool, now).await;
    let staff = StaffId::new();

    let plan_service = plans(&pool);
    let plan = plan_service.submit(plan_request(participant), now).await.unwrap();
    plan_service
        .give_feedback(&plan.id, &staff, &[SkillId::new("reading.inference")], now)
        .await
        .unwrap();

    let billing_service = billing(&pool);
    let package = billing_service
        .create_package(
            CreatePackageRequest {
                name: "Basic".to_string(),
                price: 100_000,
                validity_months: 2,
                facilities: vec![Facility::GroupClass],
            },
            now,
        )
        .await
        .unwrap();
    let transaction = billing_service
        .purchase(
            PurchaseRequest {
                participant_id: participant,
                package_id: package.id,
                proof_ref: "proof".to_string(),
                amount: 100_000,
            },
            now,
        )
        .await
        .unwrap();

    let rejected = billing_service
        .verify(
            &transaction.id,
            &staff,
            TransactionDecision::Reject { remark: "proof illegible".to_string() },
            now,
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, TransactionStatus::Rejected);
    assert_eq!(rejected.decision_remark.as_deref(), Some("proof illegible"));
    assert_eq!(rejected.decided_at, Some(now));

    // No subscription window comes out of a rejection.
    let window = SqliteSubscriptionWindows::new(pool.clone())
        .latest_for(&participant)
        .await
        .unwrap();
    assert!(window.is_none());
}

#[tokio::test]
async fn purchase_blocked_before_feedback_names_the_right_stage() {
    let pool = test_pool().await;
    seed_catalog(&pool).await;
    let now = Utc::now();

    let billing_service = billing(&pool);

    // No score at all.
    let nobody = ParticipantId::new();
    let gate = billing_service.check_eligibility(&nobody, now).await.unwrap();
    assert_eq!(gate.reason, Some(EligibilityReason::NoValidScore));

    // Approved score but no plan feedback yet.
    let participant = approved_participant(&pool, now).await;
    let gate = billing_service.check_eligibility(&participant, now).await.unwrap();
    assert_eq!(gate.reason, Some(EligibilityReason::NoFeedbackYet));
}
