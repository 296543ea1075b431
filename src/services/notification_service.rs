//! Notification service - stored inbox plus live push.
//!
//! `notify` writes the notification row first and then publishes it to the
//! user's open sockets; `relay` pushes transient events that are never
//! stored (remote-desktop input and frames).

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{Actor, Notification, PushEvent};
use crate::errors::{AppError, AppResult};
use crate::infra::{NotificationHub, UnitOfWork};
use crate::types::{Paginated, PaginationParams};

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Persist a notification for `user_id`, then push it if they are online
    async fn notify(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        kind: &str,
        payload: serde_json::Value,
    ) -> AppResult<Notification>;

    /// Push a transient event; returns the number of sockets reached
    fn relay(&self, user_id: Uuid, event: PushEvent) -> usize;

    /// Open a live event stream for the caller
    fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<PushEvent>;

    /// Drop the caller's channel once its last socket closed
    fn disconnect(&self, user_id: Uuid);

    async fn list(
        &self,
        actor: &Actor,
        unread_only: bool,
        params: &PaginationParams,
    ) -> AppResult<Paginated<Notification>>;

    async fn mark_read(&self, actor: &Actor, id: Uuid) -> AppResult<()>;

    /// Returns how many notifications changed
    async fn mark_all_read(&self, actor: &Actor) -> AppResult<u64>;
}

pub struct NotificationManager<U: UnitOfWork> {
    uow: Arc<U>,
    hub: Arc<NotificationHub>,
}

impl<U: UnitOfWork> NotificationManager<U> {
    pub fn new(uow: Arc<U>, hub: Arc<NotificationHub>) -> Self {
        Self { uow, hub }
    }
}

#[async_trait]
impl<U: UnitOfWork> NotificationService for NotificationManager<U> {
    async fn notify(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        kind: &str,
        payload: serde_json::Value,
    ) -> AppResult<Notification> {
        let stored = self
            .uow
            .notifications()
            .create(Notification::new(tenant_id, user_id, kind, payload))
            .await?;

        let delivered = self.hub.publish(user_id, PushEvent::from(&stored));
        tracing::debug!(
            user_id = %user_id,
            kind = %kind,
            delivered,
            "Notification stored"
        );
        Ok(stored)
    }

    fn relay(&self, user_id: Uuid, event: PushEvent) -> usize {
        self.hub.publish(user_id, event)
    }

    fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<PushEvent> {
        self.hub.subscribe(user_id)
    }

    fn disconnect(&self, user_id: Uuid) {
        self.hub.prune(user_id);
        tracing::debug!(user_id = %user_id, online = self.hub.connected_users(), "Push socket closed");
    }

    async fn list(
        &self,
        actor: &Actor,
        unread_only: bool,
        params: &PaginationParams,
    ) -> AppResult<Paginated<Notification>> {
        let (items, total) = self
            .uow
            .notifications()
            .list(actor.user_id, unread_only, params)
            .await?;
        Ok(Paginated::from_params(items, params, total))
    }

    async fn mark_read(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        if self.uow.notifications().mark_read(actor.user_id, id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    async fn mark_all_read(&self, actor: &Actor) -> AppResult<u64> {
        self.uow.notifications().mark_all_read(actor.user_id).await
    }
}
