//! Query helpers shared by the stores.

use sea_orm::{
    ConnectionTrait, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, Select, SqlErr,
};

use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

/// Run `select` as one page, returning the rows and the total row count.
pub(crate) async fn fetch_page<E, C>(
    select: Select<E>,
    db: &C,
    params: &PaginationParams,
) -> AppResult<(Vec<E::Model>, u64)>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Sized + Send + Sync,
    C: ConnectionTrait,
{
    let paginator = select.paginate(db, params.limit());
    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(params.page_index()).await?;
    Ok((rows, total))
}

/// Map `unique_violation` to a conflict; pass every other error through.
pub(crate) fn conflict_on_unique(err: DbErr, entity: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict(entity),
        _ => err.into(),
    }
}
