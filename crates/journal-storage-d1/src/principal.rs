use async_trait::async_trait;
use tokio::sync::RwLock;

/// An authenticated identity under which remote records are scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Resolves the principal remote operations run as.
///
/// Queried on every operation, so sign-in and sign-out take effect immediately.
#[async_trait]
pub trait PrincipalProvider: Send + Sync {
    async fn current_principal(&self) -> Option<Principal>;
}

/// Principal held in memory and switched by the auth layer.
#[derive(Debug, Default)]
pub struct SessionPrincipal {
    current: RwLock<Option<Principal>>,
}

impl SessionPrincipal {
    pub fn new(principal: Option<Principal>) -> Self {
        Self {
            current: RwLock::new(principal),
        }
    }

    pub async fn sign_in(&self, principal: Principal) {
        *self.current.write().await = Some(principal);
    }

    pub async fn sign_out(&self) {
        *self.current.write().await = None;
    }
}

#[async_trait]
impl PrincipalProvider for SessionPrincipal {
    async fn current_principal(&self) -> Option<Principal> {
        self.current.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let session = SessionPrincipal::default();
        assert_eq!(session.current_principal().await, None);

        session.sign_in(Principal::new("user-1")).await;
        assert_eq!(session.current_principal().await, Some(Principal::new("user-1")));

        session.sign_out().await;
        assert_eq!(session.current_principal().await, None);
    }
}
