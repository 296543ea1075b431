//! Spreadsheet, code editor and calendar service tests.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::{actor, admin, balanced_locks, user, Mocks, Org};
use officehub::domain::{
    Actor, CalendarEvent, CellUpdate, Cells, CodeDocument, EventChanges, Language, NewEvent,
    Permission, Spreadsheet, TimeWindow,
};
use officehub::errors::AppError;
use mockall::Sequence;
use officehub::infra::{LockToken, MockLockManager, MockReminderQueue};
use officehub::services::{
    CalendarManager, CalendarService, CodeManager, CodeService, DocumentChanges,
    SpreadsheetManager, SpreadsheetService,
};

// Spreadsheets

fn sheet(owner: &Actor) -> Spreadsheet {
    let now = Utc::now();
    Spreadsheet {
        id: Uuid::new_v4(),
        tenant_id: owner.tenant_id,
        owner_id: owner.user_id,
        name: "Budget".into(),
        rows: 10,
        cols: 5,
        cells: Cells::new(),
        created_at: now,
        updated_at: now,
    }
}

fn update(address: &str, value: &str) -> CellUpdate {
    CellUpdate {
        address: address.into(),
        value: value.into(),
    }
}

#[tokio::test]
async fn test_set_cells_under_lock() {
    let owner = actor(Uuid::new_v4());
    let mut stored = sheet(&owner);
    stored.cells.insert("A1".into(), "old".into());
    let sheet_id = stored.id;

    let mut mocks = Mocks::default();
    mocks
        .spreadsheets
        .expect_find()
        .returning(move |_, _| Ok(Some(stored.clone())));
    mocks.spreadsheets.expect_update().times(1).returning(Ok);

    let service = SpreadsheetManager::new(mocks.into_uow(), balanced_locks(1));
    let updated = service
        .set_cells(&owner, sheet_id, vec![update("A1", ""), update("b2", "42")])
        .await
        .unwrap();

    assert!(!updated.cells.contains_key("A1"));
    assert_eq!(updated.cells.get("B2").map(String::as_str), Some("42"));
}

#[tokio::test]
async fn test_out_of_grid_batch_releases_lock() {
    let owner = actor(Uuid::new_v4());
    let stored = sheet(&owner);
    let sheet_id = stored.id;

    let mut mocks = Mocks::default();
    mocks
        .spreadsheets
        .expect_find()
        .returning(move |_, _| Ok(Some(stored.clone())));
    mocks.spreadsheets.expect_update().never();

    let service = SpreadsheetManager::new(mocks.into_uow(), balanced_locks(1));
    let result = service
        .set_cells(&owner, sheet_id, vec![update("A1", "ok"), update("Z99", "no")])
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_foreign_sheet_hidden_without_edit_permission() {
    let tenant = Uuid::new_v4();
    let owner = actor(tenant);
    let stranger = actor(tenant);
    let stored = sheet(&owner);
    let sheet_id = stored.id;

    let mut mocks = Mocks::default();
    Org::team(&stranger, &[]).install(&mut mocks.units);
    mocks
        .spreadsheets
        .expect_find()
        .returning(move |_, _| Ok(Some(stored.clone())));

    let service = SpreadsheetManager::new(mocks.into_uow(), balanced_locks(0));

    assert!(matches!(
        service.get_sheet(&stranger, sheet_id).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_editor_may_edit_but_not_delete() {
    let tenant = Uuid::new_v4();
    let owner = actor(tenant);
    let editor = actor(tenant);
    let stored = sheet(&owner);
    let sheet_id = stored.id;

    let mut mocks = Mocks::default();
    Org::team(&editor, &[Permission::SpreadsheetEdit]).install(&mut mocks.units);
    mocks
        .spreadsheets
        .expect_find()
        .returning(move |_, _| Ok(Some(stored.clone())));
    mocks.spreadsheets.expect_update().returning(Ok);
    mocks.spreadsheets.expect_delete().never();

    let service = SpreadsheetManager::new(mocks.into_uow(), balanced_locks(1));

    let renamed = service
        .rename_sheet(&editor, sheet_id, "Forecast".into())
        .await
        .unwrap();
    assert_eq!(renamed.name, "Forecast");

    assert!(matches!(
        service.delete_sheet(&editor, sheet_id).await,
        Err(AppError::Forbidden)
    ));
}

#[tokio::test]
async fn test_rename_runs_under_sheet_lock() {
    let owner = actor(Uuid::new_v4());
    let stored = sheet(&owner);
    let sheet_id = stored.id;
    let resource = format!("spreadsheet:{}", sheet_id);

    // a concurrent cell write must not be overwritten by a stale row
    let mut seq = Sequence::new();
    let mut locks = MockLockManager::new();
    let mut mocks = Mocks::default();
    locks
        .expect_acquire()
        .withf(move |r| r == resource)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|r| {
            Ok(LockToken {
                key: format!("lock:{}", r),
                lock_id: "rename".into(),
            })
        });
    mocks
        .spreadsheets
        .expect_find()
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_, _| Ok(Some(stored.clone())));
    mocks
        .spreadsheets
        .expect_update()
        .withf(|sheet| sheet.name == "Forecast")
        .times(1)
        .in_sequence(&mut seq)
        .returning(Ok);
    locks
        .expect_release()
        .withf(|token| token.lock_id == "rename")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let service = SpreadsheetManager::new(mocks.into_uow(), Arc::new(locks));
    let renamed = service
        .rename_sheet(&owner, sheet_id, "  Forecast ".into())
        .await
        .unwrap();

    assert_eq!(renamed.name, "Forecast");
}

#[tokio::test]
async fn test_create_sheet_validates_dimensions() {
    let owner = actor(Uuid::new_v4());
    let service = SpreadsheetManager::new(Mocks::default().into_uow(), balanced_locks(0));

    assert!(matches!(
        service.create_sheet(&owner, "Big".into(), 1001, 5).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        service.create_sheet(&owner, "   ".into(), 10, 5).await,
        Err(AppError::Validation(_))
    ));
}

// Code documents

fn document(owner: &Actor) -> CodeDocument {
    let now = Utc::now();
    CodeDocument {
        id: Uuid::new_v4(),
        tenant_id: owner.tenant_id,
        owner_id: owner.user_id,
        name: "main.rs".into(),
        language: Language::Rust,
        content: "fn main() {}".into(),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_owner_updates_document() {
    let owner = actor(Uuid::new_v4());
    let stored = document(&owner);
    let document_id = stored.id;

    let mut mocks = Mocks::default();
    mocks
        .code
        .expect_find()
        .returning(move |_, _| Ok(Some(stored.clone())));
    mocks.code.expect_update().returning(Ok);

    let service = CodeManager::new(mocks.into_uow());
    let changes = DocumentChanges {
        name: None,
        language: Some(Language::Python),
        content: Some("print('hi')".into()),
    };
    let updated = service
        .update_document(&owner, document_id, changes)
        .await
        .unwrap();

    assert_eq!(updated.language, Language::Python);
    assert_eq!(updated.content, "print('hi')");
    assert_eq!(updated.name, "main.rs");
}

#[tokio::test]
async fn test_admin_deletes_any_document() {
    let tenant = Uuid::new_v4();
    let stored = document(&actor(tenant));
    let document_id = stored.id;

    let mut mocks = Mocks::default();
    mocks
        .code
        .expect_find()
        .returning(move |_, _| Ok(Some(stored.clone())));
    mocks.code.expect_delete().times(1).returning(|_, _| Ok(()));

    let service = CodeManager::new(mocks.into_uow());
    assert!(service
        .delete_document(&admin(tenant), document_id)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_list_documents_scoped_to_owner() {
    let me = actor(Uuid::new_v4());
    let my_id = me.user_id;

    let mut mocks = Mocks::default();
    Org::team(&me, &[]).install(&mut mocks.units);
    mocks
        .code
        .expect_list()
        .withf(move |_, owner| *owner == Some(my_id))
        .returning(|_, _| Ok(Vec::new()));

    let service = CodeManager::new(mocks.into_uow());
    assert!(service.list_documents(&me).await.unwrap().is_empty());
}

// Calendar

fn new_event(starts_in: Duration, remind: Option<i32>) -> NewEvent {
    let starts_at = Utc::now() + starts_in;
    NewEvent {
        title: " Planning ".into(),
        description: None,
        location: Some("Room 4".into()),
        starts_at,
        ends_at: starts_at + Duration::hours(1),
        all_day: false,
        remind_before_minutes: remind,
    }
}

#[tokio::test]
async fn test_create_event_schedules_reminder() {
    let me = actor(Uuid::new_v4());

    let mut mocks = Mocks::default();
    mocks.calendar.expect_create().returning(Ok);

    let mut reminders = MockReminderQueue::new();
    reminders
        .expect_schedule()
        .withf(|job, run_at| job.remind_at == *run_at && job.title == "Planning")
        .times(1)
        .returning(|_, _| Ok(()));

    let service = CalendarManager::new(mocks.into_uow(), Arc::new(reminders));
    let event = service
        .create_event(&me, new_event(Duration::days(1), Some(15)))
        .await
        .unwrap();

    assert_eq!(event.title, "Planning");
    assert_eq!(event.owner_id, me.user_id);
}

#[tokio::test]
async fn test_queue_failure_keeps_event() {
    let me = actor(Uuid::new_v4());

    let mut mocks = Mocks::default();
    mocks.calendar.expect_create().returning(Ok);

    let mut reminders = MockReminderQueue::new();
    reminders
        .expect_schedule()
        .returning(|_, _| Err(AppError::internal("queue down")));

    let service = CalendarManager::new(mocks.into_uow(), Arc::new(reminders));
    let result = service
        .create_event(&me, new_event(Duration::days(1), Some(15)))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_event_without_reminder_is_not_queued() {
    let me = actor(Uuid::new_v4());

    let mut mocks = Mocks::default();
    mocks.calendar.expect_create().returning(Ok);
    let mut reminders = MockReminderQueue::new();
    reminders.expect_schedule().never();

    let service = CalendarManager::new(mocks.into_uow(), Arc::new(reminders));
    service
        .create_event(&me, new_event(Duration::days(1), None))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_event_ending_before_start_rejected() {
    let me = actor(Uuid::new_v4());
    let mut event = new_event(Duration::days(1), None);
    event.ends_at = event.starts_at - Duration::minutes(5);

    let service = CalendarManager::new(
        Mocks::default().into_uow(),
        Arc::new(MockReminderQueue::new()),
    );

    assert!(matches!(
        service.create_event(&me, event).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_rescheduling_requeues_reminder() {
    let me = actor(Uuid::new_v4());
    let starts_at = Utc::now() + Duration::days(2);
    let stored = CalendarEvent {
        id: Uuid::new_v4(),
        tenant_id: me.tenant_id,
        owner_id: me.user_id,
        title: "Review".into(),
        description: None,
        location: None,
        starts_at,
        ends_at: starts_at + Duration::hours(1),
        all_day: false,
        remind_before_minutes: Some(30),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let event_id = stored.id;
    let moved_to = starts_at + Duration::hours(3);

    let mut mocks = Mocks::default();
    mocks
        .calendar
        .expect_find()
        .returning(move |_, _| Ok(Some(stored.clone())));
    mocks.calendar.expect_update().returning(Ok);

    let mut reminders = MockReminderQueue::new();
    reminders
        .expect_schedule()
        .withf(move |job, _| job.starts_at == moved_to)
        .times(1)
        .returning(|_, _| Ok(()));

    let service = CalendarManager::new(mocks.into_uow(), Arc::new(reminders));
    let changes = EventChanges {
        starts_at: Some(moved_to),
        ends_at: Some(moved_to + Duration::hours(1)),
        ..Default::default()
    };
    let updated = service.update_event(&me, event_id, changes).await.unwrap();

    assert_eq!(updated.starts_at, moved_to);
}

#[tokio::test]
async fn test_reading_other_calendar_needs_share_permission() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);
    let colleague = Uuid::new_v4();

    let mut mocks = Mocks::default();
    Org::team(&me, &[]).join(0, colleague).install(&mut mocks.units);
    mocks.calendar.expect_list().never();

    let service = CalendarManager::new(mocks.into_uow(), Arc::new(MockReminderQueue::new()));
    let result = service
        .list_events(&me, Some(colleague), TimeWindow::default())
        .await;

    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_share_permission_opens_reachable_calendar() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);
    let colleague = Uuid::new_v4();

    let mut mocks = Mocks::default();
    Org::team(&me, &[Permission::CalendarShare])
        .join(0, colleague)
        .install(&mut mocks.units);
    mocks
        .users
        .expect_find_by_id()
        .returning(|tenant_id, id| Ok(Some(user(tenant_id, id))));
    mocks
        .calendar
        .expect_list()
        .withf(move |_, owner, _| *owner == colleague)
        .returning(|_, _, _| Ok(Vec::new()));

    let service = CalendarManager::new(mocks.into_uow(), Arc::new(MockReminderQueue::new()));
    let events = service
        .list_events(&me, Some(colleague), TimeWindow::default())
        .await
        .unwrap();

    assert!(events.is_empty());
}
