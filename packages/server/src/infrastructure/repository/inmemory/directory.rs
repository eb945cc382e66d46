//! インメモリ実装の UserDirectory

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, UserDirectory, UserId, UserProjection};

/// インメモリ実装の UserDirectory
pub struct InMemoryUserDirectory {
    users: Arc<Mutex<HashMap<String, UserProjection>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Seed one user record (startup wiring and tests).
    pub async fn insert_user(&self, user: UserProjection) {
        let mut users = self.users.lock().await;
        users.insert(user.id.clone(), user);
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user_by_id(
        &self,
        user: &UserId,
    ) -> Result<Option<UserProjection>, RepositoryError> {
        let users = self.users.lock().await;
        Ok(users.get(user.as_str()).cloned())
    }
}
