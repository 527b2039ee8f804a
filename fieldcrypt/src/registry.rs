//! Registry of named cipher strategies.

use dashmap::DashMap;
use std::sync::Arc;

use crate::strategy::CryptoStrategy;

/// Case-insensitive mapping from strategy name to strategy instance.
///
/// Strategies are registered at startup and looked up when an entity schema is
/// first scanned. Registration and lookup are safe to interleave from any
/// number of threads.
///
/// # Example
///
/// ```
/// use fieldcrypt::registry::StrategyRegistry;
/// use fieldcrypt::strategy::AesStrategy;
///
/// let registry = StrategyRegistry::new();
/// registry.register(AesStrategy::new("1234567890123456")?);
///
/// assert!(registry.lookup("aes").is_some());
/// assert!(registry.lookup("rot13").is_none());
/// # Ok::<(), fieldcrypt::error::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: DashMap<String, Arc<dyn CryptoStrategy>>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy under the uppercase form of its name.
    ///
    /// A previous registration with the same name is replaced.
    pub fn register(&self, strategy: impl CryptoStrategy + 'static) {
        self.register_shared(Arc::new(strategy));
    }

    /// Registers an already shared strategy.
    pub fn register_shared(&self, strategy: Arc<dyn CryptoStrategy>) {
        let key = strategy.name().to_uppercase();
        if self.strategies.insert(key.clone(), strategy).is_some() {
            tracing::debug!(strategy = %key, "replaced crypto strategy");
        } else {
            tracing::debug!(strategy = %key, "registered crypto strategy");
        }
    }

    /// Looks up a strategy by name, ignoring case.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn CryptoStrategy>> {
        self.strategies.get(&name.to_uppercase()).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Returns the number of registered strategies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
