use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account holder. Credentials live with the identity provider, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Spendable balance in minor currency units. Never negative.
    pub wallet: i64,
}

impl User {
    pub fn new(name: impl Into<String>, wallet: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            wallet,
        }
    }

    pub fn can_afford(&self, amount: i64) -> bool {
        self.wallet >= amount
    }
}
