/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Named multi-signature roles.
//!
//! A [`Role`] is a set of member actors and a threshold. A transaction that assumes a role in its
//! envelope is granted the role's actor (`role:<name>`) by the [`Roles`](crate::chain::Stage::Roles)
//! stage if at least `min_sigs` members have authorized it. Accounts can then be owned by a role
//! instead of by a single key.
//!
//! ## Genesis
//!
//! Genesis entries for this module have the key `"role"` and a value of the form
//! `name:min_sigs:address,address,...`, where each address is base64url (unpadded) and names a signer
//! actor.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    chain::signatures::SIGS,
    context::ExecutionContext,
    dispatcher::{Handler, TxResult},
    errors::HandlerError,
    store::{pluggables::KVGetError, KVStore, View},
    types::{
        data_types::{Actor, Address, ModuleTag},
        transaction::Transaction,
    },
};

pub const ROLES: &str = "roles";

/// The `app` of the actor granted for a role whose threshold is met.
pub const ROLE_ACTOR_APP: &str = "role";

const GENESIS_KEY: &str = "role";
const ROLE_PREFIX: &[u8] = b"roles/role/";

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Role {
    pub name: String,
    pub min_sigs: u32,
    pub members: Vec<Actor>,
}

impl Role {
    /// The actor that stands for this role once its threshold is met.
    pub fn actor(&self) -> Actor {
        role_actor(&self.name)
    }

    /// Whether at least `min_sigs` distinct members are among `permissions`.
    pub fn is_satisfied_by(&self, permissions: &[Actor]) -> bool {
        let signed = self
            .members
            .iter()
            .filter(|member| permissions.contains(member))
            .count();
        signed >= self.min_sigs as usize
    }

    fn validate(&self) -> Result<(), HandlerError> {
        if self.name.is_empty() {
            return Err(HandlerError::rejected("role name is empty"));
        }
        if self.min_sigs == 0 || self.min_sigs as usize > self.members.len() {
            return Err(HandlerError::rejected(format!(
                "role {} needs between 1 and {} signatures, not {}",
                self.name,
                self.members.len(),
                self.min_sigs
            )));
        }
        Ok(())
    }
}

pub fn role_actor(name: &str) -> Actor {
    Actor::new(ROLE_ACTOR_APP, Address::new(name.as_bytes().to_vec()))
}

/// Load the role called `name`, if it exists.
pub fn load_role<K: KVStore>(view: &View<K>, name: &str) -> Result<Option<Role>, KVGetError> {
    super::read(view, &role_key(name))
}

fn role_key(name: &str) -> Vec<u8> {
    let mut key = ROLE_PREFIX.to_vec();
    key.extend_from_slice(name.as_bytes());
    key
}

/// Transactions understood by the roles module.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum RolesTx {
    CreateRole {
        name: String,
        min_sigs: u32,
        members: Vec<Actor>,
    },
}

#[derive(Default)]
pub struct RolesHandler;

impl RolesHandler {
    pub fn new() -> RolesHandler {
        RolesHandler
    }

    fn create<K: KVStore>(view: &mut View<K>, role: Role) -> Result<(), HandlerError> {
        role.validate()?;
        if load_role(view, &role.name)?.is_some() {
            return Err(HandlerError::rejected(format!(
                "role {} already exists",
                role.name
            )));
        }
        super::write(view, &role_key(&role.name), &role)?;
        Ok(())
    }

    fn execute<K: KVStore>(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, HandlerError> {
        let RolesTx::CreateRole {
            name,
            min_sigs,
            members,
        } = RolesTx::try_from_slice(&tx.envelope.payload.body).map_err(|err| {
            HandlerError::rejected(format!("undecodable roles transaction: {}", err))
        })?;

        if ctx.permissions().is_empty() {
            return Err(HandlerError::rejected("creating a role requires a signer"));
        }

        let log = format!("created role {} ({} of {})", name, min_sigs, members.len());
        Self::create(
            view,
            Role {
                name,
                min_sigs,
                members,
            },
        )?;
        Ok(TxResult::new(Vec::new(), log))
    }
}

impl<K: KVStore> Handler<K> for RolesHandler {
    fn module(&self) -> ModuleTag {
        ModuleTag::from(ROLES)
    }

    fn init_state(
        &self,
        _ctx: &ExecutionContext,
        view: &mut View<K>,
        key: &str,
        value: &str,
    ) -> Result<String, HandlerError> {
        if key != GENESIS_KEY {
            return Err(HandlerError::rejected(format!(
                "unknown genesis key {:?}",
                key
            )));
        }
        let role = parse_genesis_role(value)?;
        let log = format!("created role {}", role.name);
        Self::create(view, role)?;
        Ok(log)
    }

    fn check_tx(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, HandlerError> {
        self.execute(ctx, view, tx)
    }

    fn deliver_tx(
        &self,
        ctx: &ExecutionContext,
        view: &mut View<K>,
        tx: &Transaction,
    ) -> Result<TxResult, HandlerError> {
        self.execute(ctx, view, tx)
    }
}

fn parse_genesis_role(value: &str) -> Result<Role, HandlerError> {
    let mut parts = value.splitn(3, ':');
    let (Some(name), Some(min_sigs), Some(members)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(HandlerError::rejected(format!(
            "expected name:min_sigs:members, got {:?}",
            value
        )));
    };

    let min_sigs = min_sigs
        .parse::<u32>()
        .map_err(|err| HandlerError::rejected(format!("invalid min_sigs {:?}: {}", min_sigs, err)))?;
    let members = members
        .split(',')
        .filter(|member| !member.is_empty())
        .map(|member| {
            Address::from_base64url(member)
                .map(|address| Actor::new(SIGS, address))
                .map_err(|err| {
                    HandlerError::rejected(format!("invalid address {:?}: {}", member, err))
                })
        })
        .collect::<Result<Vec<Actor>, HandlerError>>()?;

    Ok(Role {
        name: name.to_string(),
        min_sigs,
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_value_parses_into_role() {
        let a = Address::new(vec![1; 20]);
        let b = Address::new(vec![2; 20]);
        let value = format!("admins:2:{},{}", a, b);
        let role = parse_genesis_role(&value).unwrap();
        assert_eq!(role.name, "admins");
        assert_eq!(role.min_sigs, 2);
        assert_eq!(role.members, vec![Actor::new(SIGS, a.clone()), Actor::new(SIGS, b)]);

        assert!(role.is_satisfied_by(&role.members));
        assert!(!role.is_satisfied_by(&[Actor::new(SIGS, a)]));
    }

    #[test]
    fn malformed_genesis_values_are_rejected() {
        assert!(parse_genesis_role("admins:2").is_err());
        assert!(parse_genesis_role("admins:two:").is_err());
        assert!(parse_genesis_role("admins:1:not base64!").is_err());
    }
}
