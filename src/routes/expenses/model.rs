use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, ErrorKind};
use crate::policy::GroupAccess;
use crate::routes::groups::model::PersonRef;

#[derive(Debug, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Uuid,
    pub payer_id: Uuid,
    pub amount: f64,
    pub description: String,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Expense as served to clients, with the payer resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseInfo {
    pub id: Uuid,
    pub group_id: Uuid,
    pub amount: f64,
    pub description: String,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub payer: PersonRef,
}

#[derive(Debug, FromRow)]
struct ExpenseInfoRow {
    id: Uuid,
    group_id: Uuid,
    amount: f64,
    description: String,
    category: Option<String>,
    date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    payer_id: Uuid,
    payer_name: String,
    payer_email: String,
}

impl From<ExpenseInfoRow> for ExpenseInfo {
    fn from(row: ExpenseInfoRow) -> Self {
        Self {
            id: row.id,
            group_id: row.group_id,
            amount: row.amount,
            description: row.description,
            category: row.category,
            date: row.date,
            created_at: row.created_at,
            payer: PersonRef {
                id: row.payer_id,
                name: row.payer_name,
                email: row.payer_email,
            },
        }
    }
}

pub struct NewExpense {
    pub amount: f64,
    pub description: String,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
}

const INFO_SELECT: &str = "SELECT e.id, e.group_id, e.amount, e.description, e.category, \
        e.date, e.created_at, \
        p.id AS payer_id, p.name AS payer_name, p.email AS payer_email \
     FROM expenses e \
     JOIN users p ON p.id = e.payer_id";

impl Expense {
    /// The membership check runs against the resolved payer, who may differ
    /// from the caller when the expense is attributed to another member.
    pub async fn create(
        pool: &PgPool,
        group_id: Uuid,
        payer_id: Uuid,
        new: NewExpense,
    ) -> Result<ExpenseInfo, AppError> {
        let access = GroupAccess::load(pool, group_id)
            .await?
            .ok_or(ErrorKind::GroupNotFound)?;
        if !access.is_member(payer_id) {
            return Err(ErrorKind::ExpenseNotMember.into());
        }

        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO expenses (id, group_id, payer_id, amount, description, category, date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(group_id)
        .bind(payer_id)
        .bind(new.amount)
        .bind(&new.description)
        .bind(new.category.as_deref())
        .bind(new.date)
        .fetch_one(pool)
        .await?;

        Self::fetch_info(pool, id).await
    }

    /// Group expenses in the inclusive date window, most recent first
    /// (opposite order from events).
    pub async fn list_for_group(
        pool: &PgPool,
        group_id: Uuid,
        user_id: Uuid,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExpenseInfo>, AppError> {
        let access = GroupAccess::load(pool, group_id)
            .await?
            .ok_or(ErrorKind::GroupNotFound)?;
        if !access.is_member(user_id) {
            return Err(ErrorKind::ExpenseNotMember.into());
        }

        let rows: Vec<ExpenseInfoRow> = sqlx::query_as(&format!(
            "{INFO_SELECT} \
             WHERE e.group_id = $1 \
               AND ($2::timestamptz IS NULL OR e.date >= $2) \
               AND ($3::timestamptz IS NULL OR e.date <= $3) \
             ORDER BY e.date DESC"
        ))
        .bind(group_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(ExpenseInfo::from).collect())
    }

    pub async fn delete(pool: &PgPool, expense_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let expense: Option<Expense> = sqlx::query_as(
            "SELECT id, group_id, payer_id, amount, description, category, date, created_at \
             FROM expenses WHERE id = $1",
        )
        .bind(expense_id)
        .fetch_optional(pool)
        .await?;
        let expense = expense.ok_or(ErrorKind::ExpenseNotFound)?;

        let access = GroupAccess::load(pool, expense.group_id)
            .await?
            .ok_or(ErrorKind::ExpenseNotFound)?;
        // la pertenencia se comprueba antes que el permiso de borrado
        if !access.is_member(user_id) {
            return Err(ErrorKind::ExpenseNotMember.into());
        }
        if !access.is_payer_or_owner(expense.payer_id, user_id) {
            return Err(ErrorKind::ExpenseOnlyPayerOrOwnerCanDelete.into());
        }

        sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(expense_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Roster with names, for the balance summary.
    pub async fn group_roster(
        pool: &PgPool,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<PersonRef>, AppError> {
        let access = GroupAccess::load(pool, group_id)
            .await?
            .ok_or(ErrorKind::GroupNotFound)?;
        if !access.is_member(user_id) {
            return Err(ErrorKind::ExpenseNotMember.into());
        }

        #[derive(FromRow)]
        struct Row {
            id: Uuid,
            name: String,
            email: String,
        }
        let rows: Vec<Row> = sqlx::query_as(
            "SELECT u.id, u.name, u.email \
             FROM group_members gm \
             JOIN users u ON u.id = gm.user_id \
             WHERE gm.group_id = $1 \
             ORDER BY u.name",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| PersonRef {
                id: r.id,
                name: r.name,
                email: r.email,
            })
            .collect())
    }

    async fn fetch_info(pool: &PgPool, expense_id: Uuid) -> Result<ExpenseInfo, AppError> {
        let row: ExpenseInfoRow = sqlx::query_as(&format!("{INFO_SELECT} WHERE e.id = $1"))
            .bind(expense_id)
            .fetch_one(pool)
            .await?;
        Ok(row.into())
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberBalance {
    pub user_id: Uuid,
    pub name: String,
    pub paid: f64,
    pub share: f64,
    pub balance: f64,
}

#[derive(Debug, Serialize)]
pub struct BalanceSummary {
    pub total: f64,
    pub balances: Vec<MemberBalance>,
}

/// Equal-split settlement over a roster: each expense is shared evenly among
/// all current members, and a member's balance is what they paid minus their
/// share. Pure function over the lists, independent of the ledger itself.
pub fn equal_split_balances(members: &[PersonRef], expenses: &[ExpenseInfo]) -> BalanceSummary {
    let total: f64 = expenses.iter().map(|e| e.amount).sum();
    if members.is_empty() {
        return BalanceSummary {
            total,
            balances: Vec::new(),
        };
    }

    let mut balances: Vec<MemberBalance> = members
        .iter()
        .map(|m| MemberBalance {
            user_id: m.id,
            name: m.name.clone(),
            paid: 0.0,
            share: 0.0,
            balance: 0.0,
        })
        .collect();

    for expense in expenses {
        let share = expense.amount / members.len() as f64;
        for balance in balances.iter_mut() {
            if balance.user_id == expense.payer.id {
                balance.paid += expense.amount;
            }
            balance.share += share;
        }
    }

    for balance in balances.iter_mut() {
        balance.balance = balance.paid - balance.share;
    }

    BalanceSummary { total, balances }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(name: &str) -> PersonRef {
        PersonRef {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@piso.com", name),
        }
    }

    fn expense(payer: &PersonRef, amount: f64) -> ExpenseInfo {
        ExpenseInfo {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            amount,
            description: "gasto".into(),
            category: None,
            date: Utc::now(),
            created_at: Utc::now(),
            payer: PersonRef {
                id: payer.id,
                name: payer.name.clone(),
                email: payer.email.clone(),
            },
        }
    }

    #[test]
    fn equal_split_balances_out_to_zero() {
        let ana = person("ana");
        let bea = person("bea");
        let members = vec![
            PersonRef { id: ana.id, name: ana.name.clone(), email: ana.email.clone() },
            PersonRef { id: bea.id, name: bea.name.clone(), email: bea.email.clone() },
        ];
        let expenses = vec![expense(&ana, 30.0), expense(&bea, 10.0)];

        let summary = equal_split_balances(&members, &expenses);
        assert_eq!(summary.total, 40.0);

        let ana_balance = summary.balances.iter().find(|b| b.user_id == ana.id).unwrap();
        let bea_balance = summary.balances.iter().find(|b| b.user_id == bea.id).unwrap();
        assert_eq!(ana_balance.paid, 30.0);
        assert_eq!(ana_balance.share, 20.0);
        assert_eq!(ana_balance.balance, 10.0);
        assert_eq!(bea_balance.balance, -10.0);

        let sum: f64 = summary.balances.iter().map(|b| b.balance).sum();
        assert!(sum.abs() < 1e-9);
    }

    #[test]
    fn expenses_by_departed_payers_still_count_toward_shares() {
        let ana = person("ana");
        let ex_member = person("carlos");
        let members = vec![PersonRef {
            id: ana.id,
            name: ana.name.clone(),
            email: ana.email.clone(),
        }];
        let expenses = vec![expense(&ex_member, 12.0)];

        let summary = equal_split_balances(&members, &expenses);
        assert_eq!(summary.total, 12.0);
        // el pagador ya no está en el grupo: nadie recibe el abono, pero la
        // parte proporcional sí se reparte
        assert_eq!(summary.balances[0].paid, 0.0);
        assert_eq!(summary.balances[0].share, 12.0);
    }

    #[test]
    fn empty_roster_produces_no_balances() {
        let ana = person("ana");
        let summary = equal_split_balances(&[], &[expense(&ana, 5.0)]);
        assert_eq!(summary.total, 5.0);
        assert!(summary.balances.is_empty());
    }
}
