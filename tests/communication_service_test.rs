//! Messaging, phone and remote-desktop service tests.

mod common;

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use uuid::Uuid;

use common::{actor, balanced_locks, unit, user, Mocks, Org, TestUnitOfWork};
use officehub::domain::{
    kinds, Actor, CallStatus, ChatMessage, Conversation, ConversationDetails, Frame, FrameFormat,
    InputEvent, Participant, Permission, PhoneCall, RemoteSession, SessionStatus,
};
use officehub::errors::AppError;
use officehub::infra::{LockToken, MockLockManager, NotificationHub};
use officehub::types::PaginationParams;
use officehub::services::{
    ChatManager, ChatService, NotificationManager, NotificationService, PhoneManager,
    PhoneService, RemoteManager, RemoteService,
};

fn notifier(uow: &Arc<TestUnitOfWork>, hub: &Arc<NotificationHub>) -> Arc<dyn NotificationService> {
    Arc::new(NotificationManager::new(uow.clone(), hub.clone()))
}

/// Users resolve to plain members of `tenant`; notifications are stored as given.
fn resolving_users(mocks: &mut Mocks) {
    mocks
        .users
        .expect_find_by_id()
        .returning(|tenant_id, id| Ok(Some(user(tenant_id, id))));
    mocks
        .users
        .expect_find_many()
        .returning(|tenant_id, ids| Ok(ids.into_iter().map(|id| user(tenant_id, id)).collect()));
    mocks.notifications.expect_create().returning(Ok);
}

/// Caller in one unit, `other` in an unlinked sibling unit.
fn split_org(me: &Actor, other: Uuid, permissions: &[Permission]) -> Org {
    let root = unit(me.tenant_id, "Company", None);
    let sales = unit(me.tenant_id, "Sales", Some(root.id));
    let support = unit(me.tenant_id, "Support", Some(root.id));

    Org {
        memberships: vec![(sales.id, me.user_id), (support.id, other)],
        grants: permissions.iter().map(|p| (sales.id, *p)).collect(),
        units: vec![root, sales, support],
        links: Vec::new(),
    }
}

// Phone

#[tokio::test]
async fn test_dial_rings_callee() {
    let tenant = Uuid::new_v4();
    let caller = actor(tenant);
    let callee = Uuid::new_v4();

    let mut mocks = Mocks::default();
    Org::team(&caller, &[Permission::PhoneCall])
        .join(0, callee)
        .install(&mut mocks.units);
    resolving_users(&mut mocks);
    mocks.phone.expect_live_call_for().returning(|_, _| Ok(None));
    mocks.phone.expect_create().returning(Ok);

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let mut ringing = hub.subscribe(callee);
    let service = PhoneManager::new(uow.clone(), notifier(&uow, &hub), balanced_locks(2));

    let call = service.dial(&caller, callee).await.unwrap();
    assert_eq!(call.call.status, CallStatus::Ringing);

    let event = ringing.recv().await.unwrap();
    assert_eq!(event.kind, kinds::PHONE_INCOMING);
    assert!(event.notification_id.is_some());
    assert_eq!(event.payload["caller_id"], caller.user_id.to_string());
}

#[tokio::test]
async fn test_dial_busy_callee_conflicts() {
    let tenant = Uuid::new_v4();
    let caller = actor(tenant);
    let callee = Uuid::new_v4();

    let mut mocks = Mocks::default();
    Org::team(&caller, &[Permission::PhoneCall])
        .join(0, callee)
        .install(&mut mocks.units);
    resolving_users(&mut mocks);
    mocks
        .phone
        .expect_live_call_for()
        .returning(|tenant_id, user_id| {
            Ok(Some(PhoneCall::dial(tenant_id, Uuid::new_v4(), user_id).unwrap()))
        });
    mocks.phone.expect_create().never();

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let service = PhoneManager::new(uow.clone(), notifier(&uow, &hub), balanced_locks(2));

    let result = service.dial(&caller, callee).await;
    assert!(matches!(result, Err(AppError::StateConflict(_))));
}

#[tokio::test]
async fn test_dial_without_permission_is_forbidden() {
    let tenant = Uuid::new_v4();
    let caller = actor(tenant);
    let callee = Uuid::new_v4();

    let mut mocks = Mocks::default();
    Org::team(&caller, &[]).join(0, callee).install(&mut mocks.units);

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let service = PhoneManager::new(uow.clone(), notifier(&uow, &hub), balanced_locks(0));

    assert!(matches!(
        service.dial(&caller, callee).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        service.dial(&caller, caller.user_id).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_only_callee_answers() {
    let tenant = Uuid::new_v4();
    let caller = actor(tenant);
    let callee = actor(tenant);
    let call = PhoneCall::dial(tenant, caller.user_id, callee.user_id).unwrap();
    let call_id = call.id;

    let mut mocks = Mocks::default();
    mocks
        .phone
        .expect_find()
        .returning(move |_, _| Ok(Some(call.clone())));
    mocks
        .phone
        .expect_update()
        .withf(|_, expected| *expected == CallStatus::Ringing)
        .returning(|call, _| Ok(call));
    mocks.notifications.expect_create().returning(Ok);

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let mut caller_events = hub.subscribe(caller.user_id);
    let service = PhoneManager::new(uow.clone(), notifier(&uow, &hub), balanced_locks(0));

    assert!(matches!(
        service.answer(&caller, call_id).await,
        Err(AppError::Forbidden)
    ));

    let answered = service.answer(&callee, call_id).await.unwrap();
    assert_eq!(answered.call.status, CallStatus::Active);

    let event = caller_events.recv().await.unwrap();
    assert_eq!(event.kind, kinds::PHONE_UPDATED);
    assert_eq!(event.payload["status"], "active");

    // outsiders cannot see the call at all
    assert!(matches!(
        service.get_call(&actor(tenant), call_id).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_dial_holds_both_lines_even_when_busy() {
    let tenant = Uuid::new_v4();
    let caller = actor(tenant);
    let callee = Uuid::new_v4();
    let caller_line = format!("phone:{}", caller.user_id);
    let callee_line = format!("phone:{}", callee);

    let mut mocks = Mocks::default();
    Org::team(&caller, &[Permission::PhoneCall])
        .join(0, callee)
        .install(&mut mocks.units);
    resolving_users(&mut mocks);
    mocks
        .phone
        .expect_live_call_for()
        .returning(|tenant_id, user_id| {
            Ok(Some(PhoneCall::dial(tenant_id, user_id, Uuid::new_v4()).unwrap()))
        });
    mocks.phone.expect_create().never();

    let mut locks = MockLockManager::new();
    for line in [caller_line, callee_line] {
        locks
            .expect_acquire()
            .withf(move |r| r == line)
            .times(1)
            .returning(|r| {
                Ok(LockToken {
                    key: format!("lock:{}", r),
                    lock_id: r.to_string(),
                })
            });
    }
    locks.expect_release().times(2).returning(|_| Ok(()));

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let service = PhoneManager::new(uow.clone(), notifier(&uow, &hub), Arc::new(locks));

    assert!(matches!(
        service.dial(&caller, callee).await,
        Err(AppError::StateConflict(_))
    ));
}

#[tokio::test]
async fn test_answer_loses_to_concurrent_change() {
    let tenant = Uuid::new_v4();
    let caller = actor(tenant);
    let callee = actor(tenant);
    let call = PhoneCall::dial(tenant, caller.user_id, callee.user_id).unwrap();
    let call_id = call.id;

    let mut mocks = Mocks::default();
    mocks
        .phone
        .expect_find()
        .returning(move |_, _| Ok(Some(call.clone())));
    // the caller hung up between our read and our write
    mocks
        .phone
        .expect_update()
        .withf(|call, expected| {
            call.status == CallStatus::Active && *expected == CallStatus::Ringing
        })
        .times(1)
        .returning(|_, _| Err(AppError::state_conflict("The call changed meanwhile, reload it")));
    mocks.notifications.expect_create().never();

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let service = PhoneManager::new(uow.clone(), notifier(&uow, &hub), balanced_locks(0));

    assert!(matches!(
        service.answer(&callee, call_id).await,
        Err(AppError::StateConflict(_))
    ));
}

// Messaging

#[tokio::test]
async fn test_conversation_blocked_by_org_rules() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);
    let other = Uuid::new_v4();

    let mut mocks = Mocks::default();
    split_org(&me, other, &[]).install(&mut mocks.units);
    resolving_users(&mut mocks);
    mocks.chat.expect_create_conversation().never();

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let service = ChatManager::new(uow.clone(), notifier(&uow, &hub));

    let result = service.start_conversation(&me, vec![other], None).await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_broadcast_permission_bypasses_org_rules() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);
    let other = Uuid::new_v4();

    let mut mocks = Mocks::default();
    split_org(&me, other, &[Permission::ChatBroadcast]).install(&mut mocks.units);
    resolving_users(&mut mocks);
    mocks.chat.expect_find_direct().returning(|_, _, _| Ok(None));
    mocks
        .chat
        .expect_create_conversation()
        .returning(|conversation, participant_ids| {
            Ok(ConversationDetails {
                conversation,
                participant_ids,
            })
        });

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let service = ChatManager::new(uow.clone(), notifier(&uow, &hub));

    let details = service
        .start_conversation(&me, vec![other], None)
        .await
        .unwrap();

    assert!(!details.conversation.is_group);
    assert_eq!(details.participant_ids.len(), 2);
    assert!(details.participant_ids.contains(&other));
}

fn conversation(tenant: Uuid, created_by: Uuid) -> Conversation {
    let now = Utc::now();
    Conversation {
        id: Uuid::new_v4(),
        tenant_id: tenant,
        title: None,
        is_group: false,
        created_by,
        created_at: now,
        updated_at: now,
    }
}

/// `conversation` with `members` joined, installed on the chat mock.
fn joined(mocks: &mut Mocks, conversation: Conversation, members: &[Uuid]) {
    let conversation_id = conversation.id;
    let participants: Vec<Participant> = members
        .iter()
        .map(|user_id| Participant {
            conversation_id,
            user_id: *user_id,
            joined_at: conversation.created_at,
            last_read_at: None,
        })
        .collect();
    mocks
        .chat
        .expect_find_conversation()
        .returning(move |_, _| Ok(Some(conversation.clone())));
    mocks
        .chat
        .expect_participants()
        .returning(move |_| Ok(participants.clone()));
}

fn message(conversation_id: Uuid, sender_id: Uuid, body: &str) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4(),
        conversation_id,
        sender_id,
        body: body.into(),
        created_at: Utc::now(),
        edited_at: None,
        deleted_at: None,
    }
}

#[tokio::test]
async fn test_message_pushed_to_everyone_but_sender() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let room = conversation(tenant, me.user_id);
    let room_id = room.id;

    let mut mocks = Mocks::default();
    joined(&mut mocks, room, &[me.user_id, alice, bob]);
    mocks.chat.expect_insert_message().times(1).returning(Ok);
    mocks.notifications.expect_create().times(2).returning(Ok);

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let mut mine = hub.subscribe(me.user_id);
    let mut alice_events = hub.subscribe(alice);
    let mut bob_events = hub.subscribe(bob);
    let service = ChatManager::new(uow.clone(), notifier(&uow, &hub));

    let sent = service
        .send_message(&me, room_id, "  hello team ".into())
        .await
        .unwrap();
    assert_eq!(sent.body, "hello team");

    for events in [&mut alice_events, &mut bob_events] {
        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, kinds::CHAT_MESSAGE);
        assert_eq!(event.payload["message_id"], sent.id.to_string());
        assert_eq!(event.payload["preview"], "hello team");
    }
    assert!(mine.try_recv().is_err());
}

#[tokio::test]
async fn test_only_sender_edits_or_deletes() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);
    let other = actor(tenant);
    let room = conversation(tenant, me.user_id);
    let room_id = room.id;
    let theirs = message(room_id, other.user_id, "their words");
    let message_id = theirs.id;

    let mut mocks = Mocks::default();
    joined(&mut mocks, room, &[me.user_id, other.user_id]);
    mocks
        .chat
        .expect_find_message()
        .returning(move |_, _| Ok(Some(theirs.clone())));
    mocks
        .chat
        .expect_update_message()
        .withf(|m| m.body == "fixed" && m.edited_at.is_some())
        .times(1)
        .returning(Ok);

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let service = ChatManager::new(uow.clone(), notifier(&uow, &hub));

    assert!(matches!(
        service
            .edit_message(&me, room_id, message_id, "mine now".into())
            .await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        service.delete_message(&me, room_id, message_id).await,
        Err(AppError::Forbidden)
    ));

    let edited = service
        .edit_message(&other, room_id, message_id, "fixed".into())
        .await
        .unwrap();
    assert_eq!(edited.body, "fixed");
}

#[tokio::test]
async fn test_history_hides_deleted_bodies() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);
    let room = conversation(tenant, me.user_id);
    let room_id = room.id;
    let kept = message(room_id, me.user_id, "still here");
    let mut gone = message(room_id, me.user_id, "regret");
    gone.deleted_at = Some(Utc::now());

    let mut mocks = Mocks::default();
    joined(&mut mocks, room, &[me.user_id]);
    mocks
        .chat
        .expect_history()
        .returning(move |_, _| Ok((vec![gone.clone(), kept.clone()], 2)));

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let service = ChatManager::new(uow.clone(), notifier(&uow, &hub));

    let page = service
        .history(&me, room_id, &PaginationParams::default())
        .await
        .unwrap();

    assert_eq!(page.meta.total, 2);
    assert_eq!(page.data[0].body, "");
    assert!(page.data[0].deleted_at.is_some());
    assert_eq!(page.data[1].body, "still here");
}

#[tokio::test]
async fn test_direct_conversation_reused() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);
    let other = Uuid::new_v4();
    let existing = conversation(tenant, other);
    let existing_id = existing.id;

    let mut mocks = Mocks::default();
    Org::team(&me, &[]).join(0, other).install(&mut mocks.units);
    resolving_users(&mut mocks);
    mocks
        .chat
        .expect_find_direct()
        .times(1)
        .returning(move |_, _, _| Ok(Some(existing.clone())));
    mocks.chat.expect_create_conversation().never();

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let service = ChatManager::new(uow.clone(), notifier(&uow, &hub));

    let details = service
        .start_conversation(&me, vec![other], None)
        .await
        .unwrap();

    assert_eq!(details.conversation.id, existing_id);
    assert_eq!(details.participant_ids.len(), 2);
}

#[tokio::test]
async fn test_leave_conversation() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);
    let other = Uuid::new_v4();
    let room = conversation(tenant, other);
    let room_id = room.id;
    let me_id = me.user_id;

    let mut mocks = Mocks::default();
    joined(&mut mocks, room, &[me.user_id, other]);
    mocks
        .chat
        .expect_remove_participant()
        .withf(move |conversation_id, user_id| *conversation_id == room_id && *user_id == me_id)
        .times(1)
        .returning(|_, _| Ok(true));

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let service = ChatManager::new(uow.clone(), notifier(&uow, &hub));

    service.leave_conversation(&me, room_id).await.unwrap();

    // strangers learn nothing about the room
    assert!(matches!(
        service.leave_conversation(&actor(tenant), room_id).await,
        Err(AppError::NotFound)
    ));
}

// Remote desktop

fn active_session(tenant: Uuid, controller: Uuid, host: Uuid) -> RemoteSession {
    let mut session = RemoteSession::request(tenant, controller, host).unwrap();
    session.status = SessionStatus::Active;
    session.started_at = Some(Utc::now());
    session
}

fn png_frame(width: u32, height: u32) -> Frame {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 16]);
    Frame {
        format: FrameFormat::Png,
        width,
        height,
        data: STANDARD.encode(bytes),
    }
}

#[tokio::test]
async fn test_input_relayed_to_host() {
    let tenant = Uuid::new_v4();
    let controller = actor(tenant);
    let host = actor(tenant);
    let session = active_session(tenant, controller.user_id, host.user_id);
    let session_id = session.id;

    let mut mocks = Mocks::default();
    mocks
        .remote_sessions
        .expect_find()
        .returning(move |_, _| Ok(Some(session.clone())));

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let mut host_events = hub.subscribe(host.user_id);
    let service = RemoteManager::new(uow.clone(), notifier(&uow, &hub));

    let delivered = service
        .send_input(&controller, session_id, InputEvent::MouseMove { x: 10, y: 20 })
        .await
        .unwrap();
    assert_eq!(delivered, 1);

    let event = host_events.recv().await.unwrap();
    assert_eq!(event.kind, kinds::REMOTE_INPUT);
    assert!(event.notification_id.is_none());
    assert_eq!(event.payload["event"]["type"], "mouse_move");

    // the host never sends input to itself
    assert!(matches!(
        service
            .send_input(&host, session_id, InputEvent::MouseMove { x: 1, y: 1 })
            .await,
        Err(AppError::Forbidden)
    ));
}

#[tokio::test]
async fn test_frame_records_screen_size() {
    let tenant = Uuid::new_v4();
    let controller = actor(tenant);
    let host = actor(tenant);
    let session = active_session(tenant, controller.user_id, host.user_id);
    let session_id = session.id;

    let mut mocks = Mocks::default();
    mocks
        .remote_sessions
        .expect_find()
        .returning(move |_, _| Ok(Some(session.clone())));
    mocks
        .remote_sessions
        .expect_update()
        .withf(|s, expected| {
            *expected == SessionStatus::Active
                && s.screen_width == Some(800)
                && s.screen_height == Some(600)
        })
        .times(1)
        .returning(|s, _| Ok(s));

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let mut controller_events = hub.subscribe(controller.user_id);
    let service = RemoteManager::new(uow.clone(), notifier(&uow, &hub));

    let delivered = service
        .send_frame(&host, session_id, png_frame(800, 600))
        .await
        .unwrap();
    assert_eq!(delivered, 1);

    let event = controller_events.recv().await.unwrap();
    assert_eq!(event.kind, kinds::REMOTE_FRAME);
    assert_eq!(event.payload["frame"]["width"], 800);
}

#[tokio::test]
async fn test_request_session_needs_remote_control() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);
    let host = Uuid::new_v4();

    let mut mocks = Mocks::default();
    Org::team(&me, &[Permission::PhoneCall])
        .join(0, host)
        .install(&mut mocks.units);
    mocks.remote_sessions.expect_create().never();

    let uow = mocks.into_uow();
    let hub = Arc::new(NotificationHub::default());
    let service = RemoteManager::new(uow.clone(), notifier(&uow, &hub));

    assert!(matches!(
        service.request_session(&me, host).await,
        Err(AppError::Forbidden)
    ));
}
