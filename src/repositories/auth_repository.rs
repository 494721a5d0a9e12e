use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AuthRepository, CurrentUser};
use crate::errors::ServiceError;

#[derive(Debug, Default)]
pub struct InMemoryAuthRepository {
    user: RwLock<Option<CurrentUser>>,
}

impl InMemoryAuthRepository {
    pub fn new(user: Option<CurrentUser>) -> Self {
        Self {
            user: RwLock::new(user),
        }
    }

    pub fn signed_in(id: impl Into<String>) -> Self {
        Self::new(Some(CurrentUser {
            id: id.into(),
            email: None,
        }))
    }

    pub async fn sign_out(&self) {
        *self.user.write().await = None;
    }
}

#[async_trait]
impl AuthRepository for InMemoryAuthRepository {
    async fn current_user(&self) -> Result<Option<CurrentUser>, ServiceError> {
        Ok(self.user.read().await.clone())
    }
}
