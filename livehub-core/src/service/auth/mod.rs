pub mod jwt;

use async_trait::async_trait;

use crate::{models::Identity, Result};

pub use jwt::{Claims, JwtService};

/// Turns a bearer credential into a verified identity
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity>;
}
