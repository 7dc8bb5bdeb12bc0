mod realtime;
mod repository;
mod reshape;
mod schema;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{LikeOutcome, TipFilter, TipKey, TipRow};

pub use realtime::RealtimeClient;
pub use repository::Repository;
pub use reshape::{reshape, Reshaped};

/// A backend that stores tips and like counters.
#[async_trait]
pub trait TipSource: Send + Sync {
    /// Active tips, optionally narrowed by situation and language.
    async fn fetch_all(&self, filter: &TipFilter) -> Result<Vec<TipRow>>;

    async fn increment_like(&self, key: &TipKey) -> Result<LikeOutcome>;

    /// Zero when the tip does not exist.
    async fn get_like_count(&self, key: &TipKey) -> Result<i64>;

    async fn increment_display_count(&self, key: &TipKey) -> Result<()>;
}
