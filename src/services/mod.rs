// Service exports
pub mod appwrite;
pub mod cache;
pub mod directory;
pub mod exchange;
pub mod notifier;
pub mod pool;
pub mod postgres;
pub mod reaper;
pub mod store;

pub use appwrite::{AppwriteClient, AppwriteCollections, AppwriteError};
pub use cache::{CacheStats, CompatibilityCache, PairKey};
pub use directory::{ArtworkCatalog, DirectoryError, ProfileDirectory, StaticDirectory};
pub use exchange::{ExchangeService, Submission};
pub use notifier::{LogNotifier, Notifier, NotifyError, WebhookNotifier};
pub use pool::{MatchingPool, PoolSettings};
pub use postgres::PgStore;
pub use reaper::spawn_reaper;
pub use store::{ExchangeStore, MemoryStore, StoreError};
