//! Phone service - simulated calls between users of one tenant.
//!
//! Placing a call holds the line locks of both parties, so two dials can
//! never both find the same user free.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::access;
use super::NotificationService;
use crate::domain::{kinds, Actor, Permission, PhoneCall, PhoneCallResponse};
use crate::errors::{AppError, AppResult};
use crate::infra::{LockManager, LockToken, UnitOfWork};
use crate::types::{Paginated, PaginationParams};

#[async_trait]
pub trait PhoneService: Send + Sync {
    async fn dial(&self, actor: &Actor, callee_id: Uuid) -> AppResult<PhoneCallResponse>;
    async fn answer(&self, actor: &Actor, call_id: Uuid) -> AppResult<PhoneCallResponse>;
    async fn reject(&self, actor: &Actor, call_id: Uuid) -> AppResult<PhoneCallResponse>;
    async fn hang_up(&self, actor: &Actor, call_id: Uuid) -> AppResult<PhoneCallResponse>;
    async fn get_call(&self, actor: &Actor, call_id: Uuid) -> AppResult<PhoneCallResponse>;
    async fn history(
        &self,
        actor: &Actor,
        params: &PaginationParams,
    ) -> AppResult<Paginated<PhoneCallResponse>>;
}

pub struct PhoneManager<U: UnitOfWork> {
    uow: Arc<U>,
    notifications: Arc<dyn NotificationService>,
    locks: Arc<dyn LockManager>,
}

fn line_resource(user_id: Uuid) -> String {
    format!("phone:{}", user_id)
}

impl<U: UnitOfWork> PhoneManager<U> {
    pub fn new(
        uow: Arc<U>,
        notifications: Arc<dyn NotificationService>,
        locks: Arc<dyn LockManager>,
    ) -> Self {
        Self {
            uow,
            notifications,
            locks,
        }
    }

    /// Lock both lines, lowest user id first so crossed dials cannot deadlock.
    async fn lock_lines(&self, a: Uuid, b: Uuid) -> AppResult<[LockToken; 2]> {
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.locks.acquire(&line_resource(first)).await?;
        match self.locks.acquire(&line_resource(second)).await {
            Ok(second) => Ok([first, second]),
            Err(e) => {
                self.unlock(first).await;
                Err(e)
            }
        }
    }

    async fn unlock(&self, token: LockToken) {
        if let Err(e) = self.locks.release(token).await {
            tracing::warn!(error = %e, "Failed to release phone line lock");
        }
    }

    /// Busy check and insert; callers hold both line locks.
    async fn place_call(&self, call: PhoneCall) -> AppResult<PhoneCall> {
        let phone = self.uow.phone();
        if phone.live_call_for(call.tenant_id, call.callee_id).await?.is_some() {
            return Err(AppError::state_conflict("The callee is already on a call"));
        }
        if phone.live_call_for(call.tenant_id, call.caller_id).await?.is_some() {
            return Err(AppError::state_conflict("You are already on a call"));
        }
        phone.create(call).await
    }

    async fn involved_call(&self, actor: &Actor, call_id: Uuid) -> AppResult<PhoneCall> {
        let call = self
            .uow
            .phone()
            .find(actor.tenant_id, call_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !call.involves(actor.user_id) {
            return Err(AppError::NotFound);
        }
        Ok(call)
    }

    /// Store a state change and tell the other party about it.
    async fn transition<F>(&self, actor: &Actor, call_id: Uuid, change: F) -> AppResult<PhoneCallResponse>
    where
        F: FnOnce(&mut PhoneCall) -> AppResult<()> + Send,
    {
        let mut call = self.involved_call(actor, call_id).await?;
        let expected = call.status;
        change(&mut call)?;
        let call = self.uow.phone().update(call, expected).await?;

        let peer = call.peer_of(actor.user_id);
        let payload = json!({
            "call_id": call.id,
            "status": call.status,
            "by": actor.user_id,
        });
        if let Err(e) = self
            .notifications
            .notify(actor.tenant_id, peer, kinds::PHONE_UPDATED, payload)
            .await
        {
            tracing::error!(call_id = %call.id, error = %e, "Failed to notify call peer");
        }

        tracing::debug!(call_id = %call.id, status = %call.status, "Call updated");
        Ok(PhoneCallResponse::from(call))
    }
}

#[async_trait]
impl<U: UnitOfWork> PhoneService for PhoneManager<U> {
    async fn dial(&self, actor: &Actor, callee_id: Uuid) -> AppResult<PhoneCallResponse> {
        let call = PhoneCall::dial(actor.tenant_id, actor.user_id, callee_id)?;

        access::require_permission(self.uow.as_ref(), actor, Permission::PhoneCall).await?;
        access::require_reachable(self.uow.as_ref(), actor, callee_id).await?;

        let tokens = self.lock_lines(actor.user_id, callee_id).await?;
        let placed = self.place_call(call).await;
        for token in tokens {
            self.unlock(token).await;
        }
        let call = placed?;

        let payload = json!({
            "call_id": call.id,
            "caller_id": call.caller_id,
        });
        if let Err(e) = self
            .notifications
            .notify(actor.tenant_id, callee_id, kinds::PHONE_INCOMING, payload)
            .await
        {
            tracing::error!(call_id = %call.id, error = %e, "Failed to ring callee");
        }

        tracing::info!(call_id = %call.id, caller = %call.caller_id, callee = %call.callee_id, "Call placed");
        Ok(PhoneCallResponse::from(call))
    }

    async fn answer(&self, actor: &Actor, call_id: Uuid) -> AppResult<PhoneCallResponse> {
        let by = actor.user_id;
        self.transition(actor, call_id, move |call| call.answer(by))
            .await
    }

    async fn reject(&self, actor: &Actor, call_id: Uuid) -> AppResult<PhoneCallResponse> {
        let by = actor.user_id;
        self.transition(actor, call_id, move |call| call.reject(by))
            .await
    }

    async fn hang_up(&self, actor: &Actor, call_id: Uuid) -> AppResult<PhoneCallResponse> {
        let by = actor.user_id;
        self.transition(actor, call_id, move |call| call.hang_up(by))
            .await
    }

    async fn get_call(&self, actor: &Actor, call_id: Uuid) -> AppResult<PhoneCallResponse> {
        self.involved_call(actor, call_id)
            .await
            .map(PhoneCallResponse::from)
    }

    async fn history(
        &self,
        actor: &Actor,
        params: &PaginationParams,
    ) -> AppResult<Paginated<PhoneCallResponse>> {
        let (calls, total) = self
            .uow
            .phone()
            .history(actor.tenant_id, actor.user_id, params)
            .await?;
        Ok(Paginated::from_params(calls, params, total).map(PhoneCallResponse::from))
    }
}
