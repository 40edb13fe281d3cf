use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{self, ReadScope};
use crate::errors::AppError;
use crate::realtime::Table;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RestQuery {
    pub user_id: Option<String>,
    pub portfolio_id: Option<String>,
    pub limit: Option<i64>,
}

impl RestQuery {
    fn scope(self) -> ReadScope {
        ReadScope {
            user_id: self.user_id.filter(|u| !u.is_empty()),
            portfolio_id: self.portfolio_id.filter(|p| !p.is_empty()),
            limit: self.limit,
        }
    }
}

fn parse_table(name: &str) -> Result<Table, AppError> {
    name.parse::<Table>().map_err(|_| AppError::UnknownTable(name.to_string()))
}

/// GET /rest/:table: rows in the table's fixed order.
pub async fn list(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): Query<RestQuery>,
) -> Result<Json<Value>, AppError> {
    let table = parse_table(&table)?;
    let rows = db::read_rows(&state.db, table, &query.scope()).await?;

    Ok(Json(json!({ "success": true, "data": rows })))
}

/// GET /rest/:table/latest: first row in the table's order, 404 when empty.
pub async fn latest(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): Query<RestQuery>,
) -> Result<Json<Value>, AppError> {
    let table = parse_table(&table)?;
    let scope = ReadScope {
        limit: Some(1),
        ..query.scope()
    };

    let row = db::read_rows(&state.db, table, &scope)
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NoRows)?;

    Ok(Json(json!({ "success": true, "data": row })))
}
