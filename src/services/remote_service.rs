//! Remote desktop brokerage.
//!
//! Pairs a controller with a host and relays input events and screen
//! frames between them over the push channel. Capture and injection happen
//! in the host agent; nothing here touches a display.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::access;
use super::NotificationService;
use crate::domain::{kinds, Actor, Frame, InputEvent, Permission, PushEvent, RemoteSession};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Ask `host_id` for control of their screen
    async fn request_session(&self, actor: &Actor, host_id: Uuid) -> AppResult<RemoteSession>;
    async fn accept_session(&self, actor: &Actor, id: Uuid) -> AppResult<RemoteSession>;
    async fn reject_session(&self, actor: &Actor, id: Uuid) -> AppResult<RemoteSession>;
    async fn close_session(&self, actor: &Actor, id: Uuid) -> AppResult<RemoteSession>;
    async fn get_session(&self, actor: &Actor, id: Uuid) -> AppResult<RemoteSession>;
    async fn list_sessions(&self, actor: &Actor) -> AppResult<Vec<RemoteSession>>;

    /// Relay an input event to the host; returns sockets reached
    async fn send_input(&self, actor: &Actor, id: Uuid, event: InputEvent) -> AppResult<usize>;
    /// Relay a screen frame to the controller; returns sockets reached
    async fn send_frame(&self, actor: &Actor, id: Uuid, frame: Frame) -> AppResult<usize>;
}

pub struct RemoteManager<U: UnitOfWork> {
    uow: Arc<U>,
    notifications: Arc<dyn NotificationService>,
}

impl<U: UnitOfWork> RemoteManager<U> {
    pub fn new(uow: Arc<U>, notifications: Arc<dyn NotificationService>) -> Self {
        Self { uow, notifications }
    }

    async fn involved(&self, actor: &Actor, id: Uuid) -> AppResult<RemoteSession> {
        let session = self
            .uow
            .remote_sessions()
            .find(actor.tenant_id, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !session.involves(actor.user_id) {
            return Err(AppError::NotFound);
        }
        Ok(session)
    }

    async fn transition<F>(&self, actor: &Actor, id: Uuid, change: F) -> AppResult<RemoteSession>
    where
        F: FnOnce(&mut RemoteSession) -> AppResult<()> + Send,
    {
        let mut session = self.involved(actor, id).await?;
        let expected = session.status;
        change(&mut session)?;
        let session = self
            .uow
            .remote_sessions()
            .update(session, expected)
            .await?;

        let payload = json!({
            "session_id": session.id,
            "status": session.status,
            "by": actor.user_id,
        });
        if let Err(e) = self
            .notifications
            .notify(
                actor.tenant_id,
                session.peer_of(actor.user_id),
                kinds::REMOTE_UPDATED,
                payload,
            )
            .await
        {
            tracing::error!(session_id = %session.id, error = %e, "Failed to notify session peer");
        }

        tracing::info!(session_id = %session.id, status = %session.status, "Remote session updated");
        Ok(session)
    }
}

#[async_trait]
impl<U: UnitOfWork> RemoteService for RemoteManager<U> {
    async fn request_session(&self, actor: &Actor, host_id: Uuid) -> AppResult<RemoteSession> {
        let session = RemoteSession::request(actor.tenant_id, actor.user_id, host_id)?;

        access::require_permission(self.uow.as_ref(), actor, Permission::RemoteControl).await?;
        access::require_reachable(self.uow.as_ref(), actor, host_id).await?;

        let session = self.uow.remote_sessions().create(session).await?;

        let payload = json!({
            "session_id": session.id,
            "controller_id": session.controller_id,
        });
        if let Err(e) = self
            .notifications
            .notify(actor.tenant_id, host_id, kinds::REMOTE_REQUEST, payload)
            .await
        {
            tracing::error!(session_id = %session.id, error = %e, "Failed to notify host");
        }

        tracing::info!(
            session_id = %session.id,
            host = %host_id,
            controller = %actor.user_id,
            "Remote session requested"
        );
        Ok(session)
    }

    async fn accept_session(&self, actor: &Actor, id: Uuid) -> AppResult<RemoteSession> {
        let by = actor.user_id;
        self.transition(actor, id, move |s| s.accept(by)).await
    }

    async fn reject_session(&self, actor: &Actor, id: Uuid) -> AppResult<RemoteSession> {
        let by = actor.user_id;
        self.transition(actor, id, move |s| s.reject(by)).await
    }

    async fn close_session(&self, actor: &Actor, id: Uuid) -> AppResult<RemoteSession> {
        let by = actor.user_id;
        self.transition(actor, id, move |s| s.close(by)).await
    }

    async fn get_session(&self, actor: &Actor, id: Uuid) -> AppResult<RemoteSession> {
        self.involved(actor, id).await
    }

    async fn list_sessions(&self, actor: &Actor) -> AppResult<Vec<RemoteSession>> {
        self.uow
            .remote_sessions()
            .list_for_user(actor.tenant_id, actor.user_id)
            .await
    }

    async fn send_input(&self, actor: &Actor, id: Uuid, event: InputEvent) -> AppResult<usize> {
        let session = self.involved(actor, id).await?;
        session.check_input(actor.user_id, &event)?;

        let payload = json!({
            "session_id": session.id,
            "event": event,
        });
        let delivered = self.notifications.relay(
            session.host_id,
            PushEvent::transient(kinds::REMOTE_INPUT, payload),
        );
        if delivered == 0 {
            tracing::debug!(session_id = %session.id, "Host agent not connected, input dropped");
        }
        Ok(delivered)
    }

    async fn send_frame(&self, actor: &Actor, id: Uuid, frame: Frame) -> AppResult<usize> {
        let mut session = self.involved(actor, id).await?;
        session.check_frame(actor.user_id, &frame)?;

        // the last frame size bounds the controller's pointer coordinates
        let size = (frame.width as i32, frame.height as i32);
        if (session.screen_width, session.screen_height) != (Some(size.0), Some(size.1)) {
            session.screen_width = Some(size.0);
            session.screen_height = Some(size.1);
            let expected = session.status;
            session = self
                .uow
                .remote_sessions()
                .update(session, expected)
                .await?;
        }

        let payload = json!({
            "session_id": session.id,
            "frame": frame,
            "captured_at": Utc::now(),
        });
        Ok(self.notifications.relay(
            session.controller_id,
            PushEvent::transient(kinds::REMOTE_FRAME, payload),
        ))
    }
}
