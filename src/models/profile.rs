use serde::Deserialize;
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Stored wallet material for a user, keyed by the identity provider's id
#[derive(Clone, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub classic_address: Option<String>,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub seed: Option<String>,
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("id", &self.id)
            .field("classic_address", &self.classic_address)
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("seed", &self.seed.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
