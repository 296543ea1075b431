//! Service Container - Centralized service access with parallel execution support.
//!
//! Builds every service over one shared [`Persistence`] unit of work and
//! hands them out as trait objects, so handlers never see concrete types.

use std::future::Future;
use std::sync::Arc;

use super::{
    AuthService, CalendarService, ChatService, CodeService, NotificationService, PhoneService,
    RemoteService, SpreadsheetService, UnitService, UserService,
};
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::{LockManager, NotificationHub, Persistence, ReminderQueue};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
///
/// Provides centralized access to all application services.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;
    fn users(&self) -> Arc<dyn UserService>;
    fn units(&self) -> Arc<dyn UnitService>;
    fn calendar(&self) -> Arc<dyn CalendarService>;
    fn chat(&self) -> Arc<dyn ChatService>;
    fn spreadsheets(&self) -> Arc<dyn SpreadsheetService>;
    fn phone(&self) -> Arc<dyn PhoneService>;
    fn code(&self) -> Arc<dyn CodeService>;
    fn remote(&self) -> Arc<dyn RemoteService>;
    fn notifications(&self) -> Arc<dyn NotificationService>;
}

/// Infrastructure shared by services beyond the database
#[derive(Clone)]
pub struct Backends {
    /// Distributed lock for sheet writes, phone lines and unit moves
    pub locks: Arc<dyn LockManager>,
    /// In-process push channels
    pub hub: Arc<NotificationHub>,
    /// Calendar reminder queue
    pub reminders: Arc<dyn ReminderQueue>,
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth: Arc<dyn AuthService>,
    users: Arc<dyn UserService>,
    units: Arc<dyn UnitService>,
    calendar: Arc<dyn CalendarService>,
    chat: Arc<dyn ChatService>,
    spreadsheets: Arc<dyn SpreadsheetService>,
    phone: Arc<dyn PhoneService>,
    code: Arc<dyn CodeService>,
    remote: Arc<dyn RemoteService>,
    notifications: Arc<dyn NotificationService>,
}

impl Services {
    /// Create service container from database connection and config
    pub fn from_connection(
        db: sea_orm::DatabaseConnection,
        config: Config,
        backends: Backends,
    ) -> Self {
        use super::{
            Authenticator, CalendarManager, ChatManager, CodeManager, NotificationManager,
            PhoneManager, RemoteManager, SpreadsheetManager, UnitManager, UserManager,
        };

        let uow = Arc::new(Persistence::new(db));
        let notifications: Arc<dyn NotificationService> =
            Arc::new(NotificationManager::new(uow.clone(), backends.hub));

        Self {
            auth: Arc::new(Authenticator::new(uow.clone(), config)),
            users: Arc::new(UserManager::new(uow.clone())),
            units: Arc::new(UnitManager::new(uow.clone(), backends.locks.clone())),
            calendar: Arc::new(CalendarManager::new(uow.clone(), backends.reminders)),
            chat: Arc::new(ChatManager::new(uow.clone(), notifications.clone())),
            spreadsheets: Arc::new(SpreadsheetManager::new(uow.clone(), backends.locks.clone())),
            phone: Arc::new(PhoneManager::new(
                uow.clone(),
                notifications.clone(),
                backends.locks,
            )),
            code: Arc::new(CodeManager::new(uow.clone())),
            remote: Arc::new(RemoteManager::new(uow, notifications.clone())),
            notifications,
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.users.clone()
    }

    fn units(&self) -> Arc<dyn UnitService> {
        self.units.clone()
    }

    fn calendar(&self) -> Arc<dyn CalendarService> {
        self.calendar.clone()
    }

    fn chat(&self) -> Arc<dyn ChatService> {
        self.chat.clone()
    }

    fn spreadsheets(&self) -> Arc<dyn SpreadsheetService> {
        self.spreadsheets.clone()
    }

    fn phone(&self) -> Arc<dyn PhoneService> {
        self.phone.clone()
    }

    fn code(&self) -> Arc<dyn CodeService> {
        self.code.clone()
    }

    fn remote(&self) -> Arc<dyn RemoteService> {
        self.remote.clone()
    }

    fn notifications(&self) -> Arc<dyn NotificationService> {
        self.notifications.clone()
    }
}

/// Parallel execution utilities for running independent operations concurrently.
pub mod parallel {
    use super::*;
    use tokio::try_join;

    /// Execute two independent async operations in parallel.
    ///
    /// If either operation fails, the error is returned immediately.
    pub async fn join2<F1, F2, T1, T2>(f1: F1, f2: F2) -> AppResult<(T1, T2)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
    {
        try_join!(f1, f2)
    }

    /// Execute three independent async operations in parallel.
    pub async fn join3<F1, F2, F3, T1, T2, T3>(
        f1: F1,
        f2: F2,
        f3: F3,
    ) -> AppResult<(T1, T2, T3)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
        F3: Future<Output = AppResult<T3>>,
    {
        try_join!(f1, f2, f3)
    }

    /// Execute a collection of homogeneous async operations in parallel.
    ///
    /// Results come back in input order. Every future runs to completion;
    /// the first error in input order is returned.
    pub async fn join_all<F, T>(futures: Vec<F>) -> AppResult<Vec<T>>
    where
        F: Future<Output = AppResult<T>>,
    {
        let results = futures::future::join_all(futures).await;
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[tokio::test]
    async fn test_parallel_join2() {
        async fn op1() -> AppResult<i32> {
            Ok(1)
        }
        async fn op2() -> AppResult<&'static str> {
            Ok("two")
        }

        let (a, b) = parallel::join2(op1(), op2()).await.unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, "two");
    }

    #[tokio::test]
    async fn test_parallel_join_all() {
        let futures: Vec<_> = (0..5).map(|i| async move { Ok(i) as AppResult<i32> }).collect();
        let results = parallel::join_all(futures).await.unwrap();
        assert_eq!(results, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_parallel_join_all_reports_failure() {
        let futures: Vec<_> = (0..3)
            .map(|i| async move {
                if i == 1 {
                    Err(AppError::NotFound)
                } else {
                    Ok(i)
                }
            })
            .collect();
        let result = parallel::join_all(futures).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }
}
