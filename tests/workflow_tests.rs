//! Workflow engine behavior, driven through the service over the in-memory
//! store so no database is needed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use districthr::auth::context::ActorContext;
use districthr::error::WorkflowError;
use districthr::external::audit::NoopAuditSink;
use districthr::external::directory::StaticDirectory;
use districthr::external::recommend::{NoopRecommender, SubstituteRecommender};
use districthr::model::employee::Employee;
use districthr::model::leave_request::{LeaveRequest, LeaveStatus};
use districthr::model::leave_type::LeaveType;
use districthr::model::role::Role;
use districthr::model::substitute::SubstituteMatch;
use districthr::model::timecard::{ApprovalStage, CardKind, TimeCardStatus};
use districthr::store::memory::MemoryStore;
use districthr::store::{TimeCardFilter, WorkflowStore};
use districthr::workflow::WorkflowService;
use districthr::workflow::leave::CreateLeaveInput;
use districthr::workflow::machine::ManualEntry;

const DISTRICT: u64 = 10;
const OTHER_DISTRICT: u64 = 20;
const EMPLOYEE: u64 = 1000;
const SUBSTITUTE: u64 = 2000;

fn employee(id: u64, district_id: u64, is_substitute: bool) -> Employee {
    Employee {
        id,
        district_id,
        user_id: Some(id),
        first_name: "Test".to_string(),
        last_name: format!("Employee{id}"),
        email: format!("employee{id}@district.k12.us"),
        is_substitute,
        status: "active".to_string(),
    }
}

fn setup_with_recommender(
    recommender: Arc<dyn SubstituteRecommender>,
) -> (WorkflowService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.add_leave_type(LeaveType {
        id: 2,
        district_id: DISTRICT,
        name: "Sick Leave".to_string(),
        is_paid: true,
    });
    store.add_leave_type(LeaveType {
        id: 3,
        district_id: DISTRICT,
        name: "Unpaid Leave".to_string(),
        is_paid: false,
    });

    let directory = Arc::new(StaticDirectory::new());
    directory.add_employee(employee(EMPLOYEE, DISTRICT, false));
    directory.add_employee(employee(SUBSTITUTE, DISTRICT, true));
    directory.add_employee(employee(3000, OTHER_DISTRICT, false));

    let service = WorkflowService::new(
        store.clone(),
        directory,
        recommender,
        Arc::new(NoopAuditSink),
        Duration::from_millis(200),
    );
    (service, store)
}

fn setup() -> (WorkflowService, Arc<MemoryStore>) {
    setup_with_recommender(Arc::new(NoopRecommender))
}

fn admin() -> ActorContext {
    ActorContext {
        user_id: 1,
        username: "admin".to_string(),
        district_id: DISTRICT,
        role: Role::Admin,
        employee_id: None,
    }
}

fn foreign_admin() -> ActorContext {
    ActorContext {
        user_id: 99,
        username: "other-admin".to_string(),
        district_id: OTHER_DISTRICT,
        role: Role::Admin,
        employee_id: None,
    }
}

fn employee_ctx(employee_id: u64) -> ActorContext {
    ActorContext {
        user_id: employee_id,
        username: format!("user{employee_id}"),
        district_id: DISTRICT,
        role: Role::Employee,
        employee_id: Some(employee_id),
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn manual_entry(employee_id: u64) -> ManualEntry {
    ManualEntry {
        employee_id,
        kind: CardKind::Regular,
        work_date: d(2024, 1, 8),
        clock_in: None,
        clock_out: None,
        break_start: None,
        break_end: None,
        total_hours: Some(8.0),
        notes: None,
    }
}

fn leave_input(start: NaiveDate, end: NaiveDate, substitute_required: bool) -> CreateLeaveInput {
    CreateLeaveInput {
        employee_id: Some(EMPLOYEE),
        leave_type_id: 2,
        start_date: start,
        end_date: end,
        reason: Some("medical".to_string()),
        substitute_required,
    }
}

async fn create_leave(svc: &WorkflowService) -> LeaveRequest {
    svc.create_leave_request(&admin(), leave_input(d(2024, 1, 1), d(2024, 1, 7), false))
        .await
        .unwrap()
        .request
}

// ---- leave creation ----

#[tokio::test]
async fn full_week_leave_creates_five_preliminary_cards() {
    let (svc, _) = setup();

    // Mon Jan 1 2024 through Sun Jan 7 2024
    let created = svc
        .create_leave_request(&admin(), leave_input(d(2024, 1, 1), d(2024, 1, 7), false))
        .await
        .unwrap();

    assert_eq!(created.request.status, LeaveStatus::Pending);
    assert_eq!(created.time_cards.len(), 5);
    let dates: Vec<NaiveDate> = created.time_cards.iter().map(|c| c.work_date).collect();
    assert!(!dates.contains(&d(2024, 1, 6)));
    assert!(!dates.contains(&d(2024, 1, 7)));
    for card in &created.time_cards {
        assert_eq!(card.status, TimeCardStatus::Draft);
        assert_eq!(card.stage, ApprovalStage::Secretary);
        assert!(card.preliminary_entry);
        assert!(!card.approved);
        assert!(card.is_paid_leave);
        assert_eq!(card.leave_type_name.as_deref(), Some("Sick Leave"));
        assert_eq!(card.total_hours, 8.0);
        assert_eq!(card.leave_request_id, Some(created.request.id));
    }
}

#[tokio::test]
async fn weekend_only_leave_creates_no_cards() {
    let (svc, _) = setup();
    let created = svc
        .create_leave_request(&admin(), leave_input(d(2024, 1, 6), d(2024, 1, 7), false))
        .await
        .unwrap();
    assert!(created.time_cards.is_empty());
}

#[tokio::test]
async fn inverted_date_range_is_rejected_before_any_card_exists() {
    let (svc, store) = setup();
    let err = svc
        .create_leave_request(&admin(), leave_input(d(2024, 1, 5), d(2024, 1, 1), false))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));

    let (cards, total) = store
        .list_time_cards(DISTRICT, &TimeCardFilter::default())
        .await
        .unwrap();
    assert!(cards.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn unknown_leave_type_is_rejected() {
    let (svc, _) = setup();
    let err = svc
        .create_leave_request(
            &admin(),
            CreateLeaveInput {
                leave_type_id: 999,
                ..leave_input(d(2024, 1, 1), d(2024, 1, 5), false)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

#[tokio::test]
async fn employee_cannot_file_leave_for_someone_else() {
    let (svc, _) = setup();
    let err = svc
        .create_leave_request(
            &employee_ctx(SUBSTITUTE),
            leave_input(d(2024, 1, 1), d(2024, 1, 5), false),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

// ---- leave approval ----

#[tokio::test]
async fn approving_leave_advances_every_preliminary_card_without_duplicates() {
    let (svc, _) = setup();
    let request = create_leave(&svc).await;

    let approved = svc.approve_leave_request(&admin(), request.id).await.unwrap();

    assert_eq!(approved.request.status, LeaveStatus::Approved);
    assert_eq!(approved.time_cards.len(), 5);
    for card in &approved.time_cards {
        assert_eq!(card.status, TimeCardStatus::SecretarySubmitted);
        assert_eq!(card.stage, ApprovalStage::Employee);
        assert!(!card.preliminary_entry);
        assert!(card.approved);
        assert!(card.submitted_at.is_some());
    }

    // No duplicates were created alongside the advanced cards.
    let (cards, total) = svc
        .list_time_cards(
            &admin(),
            &TimeCardFilter {
                leave_request_id: Some(request.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(total, 5);
    assert_eq!(cards.len(), 5);
}

#[tokio::test]
async fn approving_leave_regenerates_cards_when_none_exist() {
    let (svc, store) = setup();
    let request = create_leave(&svc).await;

    // Simulate the creation step having been skipped or repaired out of band.
    let removed = store
        .delete_preliminary_cards(DISTRICT, request.id)
        .await
        .unwrap();
    assert_eq!(removed, 5);

    let approved = svc.approve_leave_request(&admin(), request.id).await.unwrap();

    assert_eq!(approved.time_cards.len(), 5);
    for card in &approved.time_cards {
        // Regenerated directly in the post-submission state.
        assert_eq!(card.status, TimeCardStatus::SecretarySubmitted);
        assert_eq!(card.stage, ApprovalStage::Employee);
        assert!(!card.preliminary_entry);
        assert!(card.approved);
    }
}

#[tokio::test]
async fn leave_request_closes_exactly_once() {
    let (svc, _) = setup();
    let request = create_leave(&svc).await;

    svc.approve_leave_request(&admin(), request.id).await.unwrap();

    let again = svc.approve_leave_request(&admin(), request.id).await.unwrap_err();
    assert!(matches!(again, WorkflowError::InvalidState { .. }));
    let reject = svc.reject_leave_request(&admin(), request.id).await.unwrap_err();
    assert!(matches!(reject, WorkflowError::InvalidState { .. }));
}

// ---- leave rejection ----

#[tokio::test]
async fn rejecting_leave_removes_only_preliminary_drafts() {
    let (svc, _) = setup();
    let request = create_leave(&svc).await;

    let (cards, _) = svc
        .list_time_cards(
            &admin(),
            &TimeCardFilter {
                leave_request_id: Some(request.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // One card advances independently before the rejection lands.
    let advanced = svc
        .submit_for_approval(&admin(), cards[0].id, None)
        .await
        .unwrap();

    let rejected = svc.reject_leave_request(&admin(), request.id).await.unwrap();
    assert_eq!(rejected.request.status, LeaveStatus::Rejected);
    assert_eq!(rejected.removed_preliminary, 4);

    let (survivors, total) = svc
        .list_time_cards(
            &admin(),
            &TimeCardFilter {
                leave_request_id: Some(request.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(survivors[0].id, advanced.id);
    assert_eq!(survivors[0].status, TimeCardStatus::SecretarySubmitted);
}

// ---- approval state machine ----

#[tokio::test]
async fn cards_walk_the_pipeline_in_fixed_order() {
    let (svc, _) = setup();
    let ctx = admin();
    let card = svc.create_time_card(&ctx, manual_entry(EMPLOYEE)).await.unwrap();

    let card = svc.submit_for_approval(&ctx, card.id, None).await.unwrap();
    assert_eq!(card.status, TimeCardStatus::SecretarySubmitted);
    assert_eq!(card.stage, ApprovalStage::Employee);
    assert!(card.submitted_at.is_some());

    let card = svc.approve_by_employee(&ctx, card.id, None).await.unwrap();
    assert_eq!(card.status, TimeCardStatus::EmployeeApproved);
    assert_eq!(card.stage, ApprovalStage::Admin);
    assert!(card.employee_approved_at.is_some());

    let card = svc.approve_by_admin(&ctx, card.id, None).await.unwrap();
    assert_eq!(card.status, TimeCardStatus::AdminApproved);
    assert_eq!(card.stage, ApprovalStage::Payroll);
    assert!(card.admin_approved_at.is_some());

    let card = svc.process_by_payroll(&ctx, card.id, None).await.unwrap();
    assert_eq!(card.status, TimeCardStatus::PayrollProcessed);
    assert_eq!(card.stage, ApprovalStage::Payroll);
    assert!(card.payroll_processed_at.is_some());

    // Terminal: nothing moves anymore, not even reject.
    let err = svc.reject(&ctx, card.id, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState { .. }));
}

#[tokio::test]
async fn out_of_order_approval_fails_and_leaves_the_card_unchanged() {
    let (svc, _) = setup();
    let ctx = admin();
    let card = svc.create_time_card(&ctx, manual_entry(EMPLOYEE)).await.unwrap();

    let err = svc.approve_by_admin(&ctx, card.id, None).await.unwrap_err();
    match err {
        WorkflowError::InvalidState { expected, actual, .. } => {
            assert!(expected.contains("admin"));
            assert!(actual.contains("secretary"));
        }
        other => panic!("expected InvalidState, got {other:?}"),
    }

    let unchanged = svc.get_time_card(&ctx, card.id).await.unwrap();
    assert_eq!(unchanged.status, TimeCardStatus::Draft);
    assert_eq!(unchanged.stage, ApprovalStage::Secretary);
}

#[tokio::test]
async fn rejection_keeps_the_stage_for_audit() {
    let (svc, _) = setup();
    let ctx = admin();
    let card = svc.create_time_card(&ctx, manual_entry(EMPLOYEE)).await.unwrap();
    let card = svc.submit_for_approval(&ctx, card.id, None).await.unwrap();
    let card = svc.approve_by_employee(&ctx, card.id, None).await.unwrap();

    let card = svc
        .reject(&ctx, card.id, Some("hours do not match schedule".to_string()))
        .await
        .unwrap();
    assert_eq!(card.status, TimeCardStatus::Rejected);
    assert_eq!(card.stage, ApprovalStage::Admin);
    assert_eq!(card.rejected_by, Some(ctx.user_id));
    assert!(card.rejected_at.is_some());
    assert_eq!(card.notes.as_deref(), Some("hours do not match schedule"));
}

#[tokio::test]
async fn concurrent_payroll_processing_has_exactly_one_winner() {
    let (svc, _) = setup();
    let ctx = admin();
    let card = svc.create_time_card(&ctx, manual_entry(EMPLOYEE)).await.unwrap();
    svc.submit_for_approval(&ctx, card.id, None).await.unwrap();
    svc.approve_by_employee(&ctx, card.id, None).await.unwrap();
    svc.approve_by_admin(&ctx, card.id, None).await.unwrap();

    let (a, b) = tokio::join!(
        svc.process_by_payroll(&ctx, card.id, None),
        svc.process_by_payroll(&ctx, card.id, None),
    );

    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(
        loser,
        WorkflowError::InvalidState { .. } | WorkflowError::Conflict
    ));

    let card = svc.get_time_card(&ctx, card.id).await.unwrap();
    assert_eq!(card.status, TimeCardStatus::PayrollProcessed);
}

// ---- lock overlay ----

#[tokio::test]
async fn locked_card_refuses_every_transition_until_unlocked() {
    let (svc, _) = setup();
    let ctx = admin();
    let card = svc.create_time_card(&ctx, manual_entry(EMPLOYEE)).await.unwrap();

    let locked = svc
        .lock_card(&ctx, card.id, "payroll period closed".to_string())
        .await
        .unwrap();
    assert!(locked.locked);
    assert_eq!(locked.locked_by, Some(ctx.user_id));

    for result in [
        svc.submit_for_approval(&ctx, card.id, None).await,
        svc.approve_by_employee(&ctx, card.id, None).await,
        svc.approve_by_admin(&ctx, card.id, None).await,
        svc.process_by_payroll(&ctx, card.id, None).await,
        svc.reject(&ctx, card.id, None).await,
    ] {
        assert!(matches!(result.unwrap_err(), WorkflowError::Locked { .. }));
    }

    let unlocked = svc.unlock_card(&ctx, card.id).await.unwrap();
    assert!(!unlocked.locked);
    assert!(unlocked.lock_reason.is_none());

    svc.submit_for_approval(&ctx, card.id, None).await.unwrap();
}

#[tokio::test]
async fn relocking_is_idempotent() {
    let (svc, _) = setup();
    let ctx = admin();
    let card = svc.create_time_card(&ctx, manual_entry(EMPLOYEE)).await.unwrap();

    let first = svc
        .lock_card(&ctx, card.id, "payroll period closed".to_string())
        .await
        .unwrap();
    let second = svc
        .lock_card(&ctx, card.id, "payroll period closed".to_string())
        .await
        .unwrap();

    assert!(second.locked);
    assert_eq!(second.locked_by, first.locked_by);
    assert_eq!(second.lock_reason, first.lock_reason);
    assert_eq!(second.status, first.status);
    assert_eq!(second.stage, first.stage);
}

// ---- district isolation ----

#[tokio::test]
async fn cross_district_access_looks_like_not_found() {
    let (svc, _) = setup();
    let card = svc
        .create_time_card(&admin(), manual_entry(EMPLOYEE))
        .await
        .unwrap();

    let read = svc.get_time_card(&foreign_admin(), card.id).await.unwrap_err();
    assert!(matches!(
        read,
        WorkflowError::TenantMismatch { .. } | WorkflowError::NotFound { .. }
    ));
    // The rendered message must not reveal that the record exists.
    assert_eq!(read.to_string(), "time card not found");

    let transition = svc
        .submit_for_approval(&foreign_admin(), card.id, None)
        .await
        .unwrap_err();
    assert!(matches!(
        transition,
        WorkflowError::TenantMismatch { .. } | WorkflowError::NotFound { .. }
    ));

    // The record is untouched.
    let card = svc.get_time_card(&admin(), card.id).await.unwrap();
    assert_eq!(card.status, TimeCardStatus::Draft);
}

#[tokio::test]
async fn cross_district_leave_requests_are_hidden() {
    let (svc, _) = setup();
    let request = create_leave(&svc).await;

    let err = svc
        .approve_leave_request(&foreign_admin(), request.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::TenantMismatch { .. } | WorkflowError::NotFound { .. }
    ));

    let request = svc.get_leave_request(&admin(), request.id).await.unwrap();
    assert_eq!(request.status, LeaveStatus::Pending);
}

// ---- substitute recommendation ----

struct FixedRecommender(Vec<SubstituteMatch>);

#[async_trait]
impl SubstituteRecommender for FixedRecommender {
    async fn rank(
        &self,
        _request: &LeaveRequest,
        _candidates: &[Employee],
    ) -> Result<Vec<SubstituteMatch>, WorkflowError> {
        Ok(self.0.clone())
    }
}

struct SlowRecommender;

#[async_trait]
impl SubstituteRecommender for SlowRecommender {
    async fn rank(
        &self,
        _request: &LeaveRequest,
        _candidates: &[Employee],
    ) -> Result<Vec<SubstituteMatch>, WorkflowError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
}

struct FailingRecommender;

#[async_trait]
impl SubstituteRecommender for FailingRecommender {
    async fn rank(
        &self,
        _request: &LeaveRequest,
        _candidates: &[Employee],
    ) -> Result<Vec<SubstituteMatch>, WorkflowError> {
        Err(WorkflowError::External("model endpoint down".to_string()))
    }
}

#[tokio::test]
async fn top_recommendation_creates_one_assignment() {
    let (svc, _) = setup_with_recommender(Arc::new(FixedRecommender(vec![
        SubstituteMatch {
            substitute_id: SUBSTITUTE,
            match_score: 0.92,
            reasons: vec!["subject match".to_string()],
        },
    ])));

    let created = svc
        .create_leave_request(&admin(), leave_input(d(2024, 1, 1), d(2024, 1, 5), true))
        .await
        .unwrap();

    let assignment = created.assignment.expect("assignment should be created");
    assert_eq!(assignment.substitute_employee_id, SUBSTITUTE);
    assert_eq!(assignment.status, "assigned");
    assert_eq!(assignment.leave_request_id, created.request.id);
    assert!(created.recommendation_note.is_none());
}

#[tokio::test]
async fn recommendation_failure_never_fails_leave_creation() {
    let (svc, _) = setup_with_recommender(Arc::new(FailingRecommender));

    let created = svc
        .create_leave_request(&admin(), leave_input(d(2024, 1, 1), d(2024, 1, 5), true))
        .await
        .unwrap();

    assert!(created.assignment.is_none());
    assert!(created.recommendation_note.is_some());
    assert_eq!(created.time_cards.len(), 5);
}

#[tokio::test]
async fn slow_recommendation_is_bounded_by_the_timeout() {
    let (svc, _) = setup_with_recommender(Arc::new(SlowRecommender));

    let started = std::time::Instant::now();
    let created = svc
        .create_leave_request(&admin(), leave_input(d(2024, 1, 1), d(2024, 1, 5), true))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(created.assignment.is_none());
    assert!(created.recommendation_note.is_some());
}

#[tokio::test]
async fn noop_recommender_changes_nothing_but_the_assignment() {
    let (svc, _) = setup();

    let created = svc
        .create_leave_request(&admin(), leave_input(d(2024, 1, 1), d(2024, 1, 5), true))
        .await
        .unwrap();

    assert!(created.assignment.is_none());
    assert_eq!(created.time_cards.len(), 5);
    assert_eq!(created.request.status, LeaveStatus::Pending);
}
