use sqlx::PgPool;
use uuid::Uuid;

/// Snapshot of a group's ownership and roster, loaded once per request.
/// Every ledger operation evaluates its authorization against this instead of
/// re-deriving membership ad hoc.
#[derive(Debug, Clone)]
pub struct GroupAccess {
    pub group_id: Uuid,
    pub owner_id: Uuid,
    pub member_ids: Vec<Uuid>,
}

impl GroupAccess {
    /// Returns `None` when the group does not exist. Existence is always
    /// checked before authorization.
    pub async fn load(pool: &PgPool, group_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let owner_id: Option<(Uuid,)> =
            sqlx::query_as("SELECT owner_id FROM groups WHERE id = $1")
                .bind(group_id)
                .fetch_optional(pool)
                .await?;

        let Some((owner_id,)) = owner_id else {
            return Ok(None);
        };

        let member_ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM group_members WHERE group_id = $1")
                .bind(group_id)
                .fetch_all(pool)
                .await?;

        Ok(Some(Self {
            group_id,
            owner_id,
            member_ids: member_ids.into_iter().map(|(id,)| id).collect(),
        }))
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.member_ids.contains(&user_id)
    }

    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn is_creator_or_owner(&self, creator_id: Uuid, user_id: Uuid) -> bool {
        creator_id == user_id || self.is_owner(user_id)
    }

    pub fn is_payer_or_owner(&self, payer_id: Uuid, user_id: Uuid) -> bool {
        payer_id == user_id || self.is_owner(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(owner: Uuid, members: Vec<Uuid>) -> GroupAccess {
        GroupAccess {
            group_id: Uuid::new_v4(),
            owner_id: owner,
            member_ids: members,
        }
    }

    #[test]
    fn membership_is_roster_membership() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let acc = access(owner, vec![owner, member]);

        assert!(acc.is_member(owner));
        assert!(acc.is_member(member));
        assert!(!acc.is_member(stranger));
    }

    #[test]
    fn ownership_is_not_a_membership_role() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let acc = access(owner, vec![owner, member]);

        assert!(acc.is_owner(owner));
        assert!(!acc.is_owner(member));
    }

    #[test]
    fn creator_or_owner_covers_both_sides() {
        let owner = Uuid::new_v4();
        let creator = Uuid::new_v4();
        let other = Uuid::new_v4();
        let acc = access(owner, vec![owner, creator, other]);

        assert!(acc.is_creator_or_owner(creator, creator));
        assert!(acc.is_creator_or_owner(creator, owner));
        assert!(!acc.is_creator_or_owner(creator, other));
    }

    #[test]
    fn payer_or_owner_covers_both_sides() {
        let owner = Uuid::new_v4();
        let payer = Uuid::new_v4();
        let other = Uuid::new_v4();
        let acc = access(owner, vec![owner, payer, other]);

        assert!(acc.is_payer_or_owner(payer, payer));
        assert!(acc.is_payer_or_owner(payer, owner));
        assert!(!acc.is_payer_or_owner(payer, other));
    }
}
