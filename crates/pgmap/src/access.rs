//! Capability tokens for table CRUD.
//!
//! A [`SchemaMapper`](crate::SchemaMapper) holds the set of trusted caller identities
//! configured by the host. The host asks the mapper for an [`AccessToken`] on behalf
//! of an identity it has authenticated; every CRUD entry point then validates that
//! token. Tokens cannot be built outside this crate and are bound to the mapper that
//! issued them.

use crate::error::{OrmError, OrmResult};
use std::collections::BTreeSet;
use std::sync::RwLock;
use uuid::Uuid;

/// Proof that a trusted identity was granted CRUD access by a specific mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    identity: String,
    mapper_id: Uuid,
}

impl AccessToken {
    pub(crate) fn new(identity: String, mapper_id: Uuid) -> Self {
        Self {
            identity,
            mapper_id,
        }
    }

    /// The identity this token was issued for.
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

/// Trusted identities for one mapper instance.
#[derive(Debug)]
pub(crate) struct TrustedCallers {
    mapper_id: Uuid,
    identities: RwLock<BTreeSet<String>>,
}

impl TrustedCallers {
    pub(crate) fn new(identities: impl IntoIterator<Item = String>) -> Self {
        Self {
            mapper_id: Uuid::new_v4(),
            identities: RwLock::new(identities.into_iter().collect()),
        }
    }

    pub(crate) fn mapper_id(&self) -> Uuid {
        self.mapper_id
    }

    pub(crate) fn contains(&self, identity: &str) -> bool {
        self.identities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(identity)
    }

    pub(crate) fn list(&self) -> Vec<String> {
        self.identities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub(crate) fn revoke(&self, identity: &str) -> bool {
        self.identities
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(identity)
    }

    pub(crate) fn issue(&self, identity: &str) -> OrmResult<AccessToken> {
        if !self.contains(identity) {
            return Err(OrmError::access_denied(format!(
                "'{identity}' is not a trusted caller"
            )));
        }
        Ok(AccessToken::new(identity.to_string(), self.mapper_id))
    }

    /// Fail closed unless `token` came from this mapper and its identity is still trusted.
    pub(crate) fn verify(&self, token: &AccessToken) -> OrmResult<()> {
        if token.mapper_id != self.mapper_id {
            return Err(OrmError::access_denied(format!(
                "token for '{}' was issued by another mapper",
                token.identity
            )));
        }
        if !self.contains(&token.identity) {
            return Err(OrmError::access_denied(format!(
                "'{}' is no longer a trusted caller",
                token.identity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callers(ids: &[&str]) -> TrustedCallers {
        TrustedCallers::new(ids.iter().map(|s| s.to_string()))
    }

    #[test]
    fn issues_only_for_trusted_identities() {
        let trusted = callers(&["handlers/users"]);
        let token = trusted.issue("handlers/users").unwrap();
        assert_eq!(token.identity(), "handlers/users");
        assert!(trusted.verify(&token).is_ok());

        assert!(trusted.issue("handlers/other").unwrap_err().is_access_denied());
    }

    #[test]
    fn empty_trust_list_denies_everyone() {
        let trusted = callers(&[]);
        assert!(trusted.issue("anyone").is_err());
    }

    #[test]
    fn tokens_do_not_cross_mappers() {
        let a = callers(&["svc"]);
        let b = callers(&["svc"]);
        let token = a.issue("svc").unwrap();
        assert!(b.verify(&token).unwrap_err().is_access_denied());
    }

    #[test]
    fn revocation_invalidates_issued_tokens() {
        let trusted = callers(&["svc", "cron"]);
        let token = trusted.issue("svc").unwrap();
        assert!(trusted.revoke("svc"));
        assert!(!trusted.revoke("svc"));
        assert!(trusted.verify(&token).is_err());
        assert_eq!(trusted.list(), vec!["cron"]);
    }
}
