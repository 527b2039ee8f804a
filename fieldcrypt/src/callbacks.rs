//! Host lifecycle attachment points.
//!
//! A host data mapper exposes four ordered callback slots. Adapters implement
//! [`Callbacks`] over the host's own registration API; [`CallbackChain`] is a
//! ready-made in-process implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::statement::Statement;

/// Lifecycle stage a callback is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Before rows are inserted
    BeforeCreate,
    /// Before rows are updated
    BeforeUpdate,
    /// Before a read query is executed
    BeforeQuery,
    /// After rows are scanned into the destination
    AfterQuery,
}

impl Hook {
    /// Every stage, in lifecycle order.
    pub const ALL: [Self; 4] =
        [Self::BeforeCreate, Self::BeforeUpdate, Self::BeforeQuery, Self::AfterQuery];

    /// Returns the stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeCreate => "before_create",
            Self::BeforeUpdate => "before_update",
            Self::BeforeQuery => "before_query",
            Self::AfterQuery => "after_query",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A callback invoked with the in-flight statement.
pub type Callback = Arc<dyn Fn(&mut Statement<'_>) -> Result<(), Error> + Send + Sync>;

/// Registration point for lifecycle callbacks.
pub trait Callbacks {
    /// Appends `callback` to the `hook` slot under `name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateCallback` if `name` is already taken in that slot.
    fn register(&mut self, hook: Hook, name: &str, callback: Callback) -> Result<(), Error>;
}

/// Something that installs callbacks into a host.
pub trait Plugin {
    /// Returns the plugin name.
    fn name(&self) -> &str;

    /// Installs the plugin's callbacks.
    ///
    /// # Errors
    ///
    /// Returns the first registration error.
    fn initialize(&self, callbacks: &mut dyn Callbacks) -> Result<(), Error>;
}

/// Ordered callback slots; the first failing callback aborts its slot.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use fieldcrypt::callbacks::{CallbackChain, Callbacks, Hook};
/// use fieldcrypt::statement::{Dest, Statement};
///
/// let mut chain = CallbackChain::new();
/// chain.register(Hook::BeforeQuery, "noop", Arc::new(|_stmt: &mut Statement<'_>| Ok(())))?;
///
/// let mut stmt = Statement::new(Dest::None);
/// chain.run(Hook::BeforeQuery, &mut stmt)?;
/// # Ok::<(), fieldcrypt::error::Error>(())
/// ```
#[derive(Default)]
pub struct CallbackChain {
    slots: HashMap<Hook, Vec<(String, Callback)>>,
}

impl CallbackChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a plugin's callbacks.
    ///
    /// # Errors
    ///
    /// Returns the plugin's registration error.
    pub fn use_plugin(&mut self, plugin: &dyn Plugin) -> Result<(), Error> {
        tracing::debug!(plugin = plugin.name(), "initializing plugin");
        plugin.initialize(self)
    }

    /// Runs the `hook` slot in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first callback error; later callbacks do not run.
    pub fn run(&self, hook: Hook, stmt: &mut Statement<'_>) -> Result<(), Error> {
        let Some(slot) = self.slots.get(&hook) else {
            return Ok(());
        };

        for (name, callback) in slot {
            tracing::trace!(%hook, callback = name.as_str(), "running callback");
            if let Err(err) = callback(&mut *stmt) {
                tracing::debug!(%hook, callback = name.as_str(), error = %err, "callback failed");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Returns the callback names of a slot in registration order.
    #[must_use]
    pub fn names(&self, hook: Hook) -> Vec<&str> {
        self.slots
            .get(&hook)
            .map(|slot| slot.iter().map(|(name, _)| name.as_str()).collect())
            .unwrap_or_default()
    }
}

impl Callbacks for CallbackChain {
    fn register(&mut self, hook: Hook, name: &str, callback: Callback) -> Result<(), Error> {
        let slot = self.slots.entry(hook).or_default();
        if slot.iter().any(|(existing, _)| existing == name) {
            return Err(Error::DuplicateCallback(format!("{hook}/{name}")));
        }
        slot.push((name.to_string(), callback));
        Ok(())
    }
}

impl fmt::Debug for CallbackChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for hook in Hook::ALL {
            map.entry(&hook, &self.names(hook));
        }
        map.finish()
    }
}
