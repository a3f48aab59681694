use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, ErrorKind};
use crate::policy::GroupAccess;

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_MEMBER: &str = "member";

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_ACCEPTED: &str = "ACCEPTED";

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub rules: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInvitationRequest {
    pub group_id: Uuid,
    pub invitee_email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRulesRequest {
    pub rules: String,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: Uuid,
    pub group_id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Pending invitation as listed to the invitee, with the group and inviter
/// resolved the way the web client expects them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationInfo {
    pub id: Uuid,
    pub invitee_email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub group: GroupRef,
    pub inviter: PersonRef,
}

#[derive(Debug, Serialize)]
pub struct GroupRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, FromRow)]
struct InvitationRow {
    id: Uuid,
    invitee_email: String,
    status: String,
    created_at: DateTime<Utc>,
    group_id: Uuid,
    group_name: String,
    inviter_id: Uuid,
    inviter_name: String,
    inviter_email: String,
}

impl From<InvitationRow> for InvitationInfo {
    fn from(row: InvitationRow) -> Self {
        Self {
            id: row.id,
            invitee_email: row.invitee_email,
            status: row.status,
            created_at: row.created_at,
            group: GroupRef {
                id: row.group_id,
                name: row.group_name,
            },
            inviter: PersonRef {
                id: row.inviter_id,
                name: row.inviter_name,
                email: row.inviter_email,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberEntry {
    pub id: Uuid,
    pub role: String,
    pub user: PersonRef,
}

#[derive(Debug, FromRow)]
struct MemberRow {
    id: Uuid,
    role: String,
    user_id: Uuid,
    user_name: String,
    user_email: String,
}

impl From<MemberRow> for MemberEntry {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id,
            role: row.role,
            user: PersonRef {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
            },
        }
    }
}

impl Group {
    /// Creating a group also seats the owner as its first member, in one
    /// transaction.
    pub async fn create(pool: &PgPool, owner_id: Uuid, name: &str) -> Result<Self, AppError> {
        let mut tx = pool.begin().await?;

        let group: Group = sqlx::query_as(
            "INSERT INTO groups (id, name, owner_id) VALUES ($1, $2, $3) \
             RETURNING id, name, owner_id, rules, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO group_members (id, group_id, user_id, role) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(group.id)
            .bind(owner_id)
            .bind(ROLE_OWNER)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(group)
    }

    /// A user only sees groups where a membership row exists for them.
    pub async fn list_mine(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, AppError> {
        let groups = sqlx::query_as(
            "SELECT g.id, g.name, g.owner_id, g.rules, g.created_at \
             FROM groups g \
             JOIN group_members gm ON gm.group_id = g.id \
             WHERE gm.user_id = $1 \
             ORDER BY g.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(groups)
    }

    pub async fn list_members(
        pool: &PgPool,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<MemberEntry>, AppError> {
        let access = GroupAccess::load(pool, group_id)
            .await?
            .ok_or(ErrorKind::GroupNotFound)?;
        if !access.is_member(user_id) {
            return Err(ErrorKind::GroupNotMember.into());
        }

        let rows: Vec<MemberRow> = sqlx::query_as(
            "SELECT gm.id, gm.role, u.id AS user_id, u.name AS user_name, u.email AS user_email \
             FROM group_members gm \
             JOIN users u ON u.id = gm.user_id \
             WHERE gm.group_id = $1 \
             ORDER BY gm.role, u.name",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(MemberEntry::from).collect())
    }

    /// Invitations go first, then members, then the group itself; the three
    /// deletes commit as one unit so a half-deleted group is never observable.
    pub async fn delete(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let access = GroupAccess::load(pool, group_id)
            .await?
            .ok_or(ErrorKind::GroupNotFound)?;
        if !access.is_owner(user_id) {
            return Err(ErrorKind::GroupOnlyOwnerCanDelete.into());
        }

        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM invitations WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM group_members WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn rules(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<String, AppError> {
        let access = GroupAccess::load(pool, group_id)
            .await?
            .ok_or(ErrorKind::GroupNotFound)?;
        if !access.is_member(user_id) {
            return Err(ErrorKind::GroupNotMember.into());
        }

        let (rules,): (String,) = sqlx::query_as("SELECT rules FROM groups WHERE id = $1")
            .bind(group_id)
            .fetch_one(pool)
            .await?;
        Ok(rules)
    }

    pub async fn update_rules(
        pool: &PgPool,
        group_id: Uuid,
        user_id: Uuid,
        rules: &str,
    ) -> Result<Self, AppError> {
        let access = GroupAccess::load(pool, group_id)
            .await?
            .ok_or(ErrorKind::GroupNotFound)?;
        if !access.is_owner(user_id) {
            return Err(ErrorKind::GroupOnlyOwnerCanUpdateRules.into());
        }

        let group = sqlx::query_as(
            "UPDATE groups SET rules = $2 WHERE id = $1 \
             RETURNING id, name, owner_id, rules, created_at",
        )
        .bind(group_id)
        .bind(rules)
        .fetch_one(pool)
        .await?;
        Ok(group)
    }
}

impl Invitation {
    /// Pending invitations addressed to this email, newest first.
    pub async fn list_for_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Vec<InvitationInfo>, AppError> {
        let rows: Vec<InvitationRow> = sqlx::query_as(
            "SELECT i.id, i.invitee_email, i.status, i.created_at, \
                    g.id AS group_id, g.name AS group_name, \
                    u.id AS inviter_id, u.name AS inviter_name, u.email AS inviter_email \
             FROM invitations i \
             JOIN groups g ON g.id = i.group_id \
             JOIN users u ON u.id = i.inviter_id \
             WHERE i.invitee_email = $1 AND i.status = $2 \
             ORDER BY i.created_at DESC",
        )
        .bind(email.to_lowercase())
        .bind(STATUS_PENDING)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(InvitationInfo::from).collect())
    }

    pub async fn send(
        pool: &PgPool,
        inviter_id: Uuid,
        group_id: Uuid,
        invitee_email: &str,
    ) -> Result<Self, AppError> {
        let access = GroupAccess::load(pool, group_id)
            .await?
            .ok_or(ErrorKind::GroupNotFound)?;
        if !access.is_owner(inviter_id) {
            return Err(ErrorKind::GroupOnlyOwnerCanInvite.into());
        }

        let invitation = sqlx::query_as(
            "INSERT INTO invitations (id, group_id, inviter_id, invitee_email, status) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, group_id, inviter_id, invitee_email, status, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(group_id)
        .bind(inviter_id)
        .bind(invitee_email.to_lowercase())
        .bind(STATUS_PENDING)
        .fetch_one(pool)
        .await?;
        Ok(invitation)
    }

    /// Accepting marks the invitation ACCEPTED and seats the member in a
    /// single transaction. The lookup filters on PENDING, so an invitation
    /// that was already resolved reports as not found. The membership insert
    /// is an upsert: re-accepting never errors or duplicates the row.
    pub async fn accept(
        pool: &PgPool,
        invitation_id: Uuid,
        user_id: Uuid,
        user_email: &str,
    ) -> Result<(), AppError> {
        let invitation: Option<Invitation> = sqlx::query_as(
            "SELECT id, group_id, inviter_id, invitee_email, status, created_at \
             FROM invitations WHERE id = $1 AND status = $2",
        )
        .bind(invitation_id)
        .bind(STATUS_PENDING)
        .fetch_optional(pool)
        .await?;

        let invitation = invitation.ok_or(ErrorKind::InvitationNotFound)?;
        if !invitee_matches(&invitation.invitee_email, user_email) {
            return Err(ErrorKind::InvitationNotYours.into());
        }

        let mut tx = pool.begin().await?;
        sqlx::query("UPDATE invitations SET status = $2 WHERE id = $1")
            .bind(invitation.id)
            .bind(STATUS_ACCEPTED)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO group_members (id, group_id, user_id, role) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (group_id, user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(invitation.group_id)
        .bind(user_id)
        .bind(ROLE_MEMBER)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Invitations are tied to an email address, not a user id; the comparison
/// must never fail on letter case alone.
fn invitee_matches(invitee_email: &str, user_email: &str) -> bool {
    invitee_email.to_lowercase() == user_email.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitee_matching_ignores_case() {
        assert!(invitee_matches("Ana@Piso.com", "ana@piso.com"));
        assert!(invitee_matches("a@x.com", "A@X.COM"));
        assert!(!invitee_matches("ana@piso.com", "bea@piso.com"));
    }
}
