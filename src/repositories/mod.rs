use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::cart::RawCartEntry;

pub mod auth_repository;
pub mod cart_repository;

pub use auth_repository::InMemoryAuthRepository;
pub use cart_repository::InMemoryCartRepository;

/// Read/clear access to the shopping cart.
///
/// Checkout only snapshots the cart and clears it after a confirmed order.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn snapshot(&self) -> Result<Vec<RawCartEntry>, ServiceError>;

    async fn clear(&self) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// The signed-in user, if any. Session handling lives elsewhere.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn current_user(&self) -> Result<Option<CurrentUser>, ServiceError>;
}
