use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, ErrorKind},
    utils::{Claims, parse_iso_date},
};

use super::model::{BalanceSummary, Expense, ExpenseInfo, NewExpense, equal_split_balances};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    pub group_id: Uuid,
    pub amount: f64,
    pub description: String,
    pub category: Option<String>,
    pub payer_id: Option<Uuid>,
    pub date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn parse_bound(value: &Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    match value {
        Some(s) => parse_iso_date(s)
            .map(Some)
            .ok_or_else(|| ErrorKind::ValidationDateInvalid.into()),
        None => Ok(None),
    }
}

/// An expense amount must be a finite number strictly greater than zero.
fn validate_amount(amount: f64) -> Result<(), AppError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(ErrorKind::ExpenseAmountInvalid.into())
    }
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.trim().is_empty() {
        Err(ErrorKind::ExpenseDescriptionRequired.into())
    } else {
        Ok(())
    }
}

#[axum::debug_handler]
pub async fn create_expense(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseInfo>), AppError> {
    validate_amount(req.amount)?;
    validate_description(&req.description)?;
    let date = parse_iso_date(&req.date).ok_or(ErrorKind::ValidationDateInvalid)?;

    // el pagador es quien llama salvo que se atribuya a otro miembro
    let payer_id = req.payer_id.unwrap_or(claims.sub);

    let expense = Expense::create(
        &state.pool,
        req.group_id,
        payer_id,
        NewExpense {
            amount: req.amount,
            description: req.description,
            category: req.category,
            date,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[axum::debug_handler]
pub async fn list_group_expenses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<ExpenseInfo>>, AppError> {
    let start = parse_bound(&query.start_date)?;
    let end = parse_bound(&query.end_date)?;
    let expenses = Expense::list_for_group(&state.pool, group_id, claims.sub, start, end).await?;
    Ok(Json(expenses))
}

#[axum::debug_handler]
pub async fn group_balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<BalanceSummary>, AppError> {
    let members = Expense::group_roster(&state.pool, group_id, claims.sub).await?;
    let expenses = Expense::list_for_group(&state.pool, group_id, claims.sub, None, None).await?;
    Ok(Json(equal_split_balances(&members, &expenses)))
}

#[axum::debug_handler]
pub async fn delete_expense(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    Expense::delete(&state.pool, id, claims.sub).await?;
    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_amounts_always_fail_validation() {
        for amount in [0.0, -0.01, -30.0] {
            let err = validate_amount(amount).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ExpenseAmountInvalid);
        }
    }

    #[test]
    fn non_finite_amounts_fail_validation() {
        for amount in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(validate_amount(amount).is_err());
        }
    }

    #[test]
    fn positive_amounts_pass_validation() {
        assert!(validate_amount(0.01).is_ok());
        assert!(validate_amount(30.0).is_ok());
    }

    #[test]
    fn blank_descriptions_are_rejected() {
        for description in ["", "   ", "\t\n"] {
            let err = validate_description(description).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ExpenseDescriptionRequired);
        }
        assert!(validate_description("Alquiler").is_ok());
    }
}
