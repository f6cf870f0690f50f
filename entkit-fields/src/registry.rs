//! Field value handler registry.
//!
//! Providers declare a configuration of `field type -> method name`. The
//! registry merges those declarations into a catalog keyed by provider
//! name, in registration order, the first time it is queried. Resolution
//! always picks the first provider that claims a type and implements the
//! configured method.

use entkit_model::FieldValue;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Arguments handed to a handler for one field item.
#[derive(Debug, Clone, Copy)]
pub struct FieldCall<'a> {
    pub field_type: &'a str,
    /// The raw stored item (usually an object of storage columns).
    pub item: &'a Value,
    pub field_name: &'a str,
    /// Position of the item within the field.
    pub delta: usize,
    /// Extra caller-supplied arguments, passed through untouched.
    pub args: &'a [Value],
}

/// A provider of field value handlers.
pub trait FieldValueHandler: Send + Sync {
    /// Provider identity. Two providers with the same name are merged, the
    /// later declaration replacing the earlier one's configuration.
    fn name(&self) -> &str;

    /// Field types this provider decodes, each mapped to a method name.
    fn configuration(&self) -> Vec<(String, String)>;

    /// Whether `method` exists on this provider. Configured methods that do
    /// not exist are skipped during resolution.
    fn has_method(&self, method: &str) -> bool;

    /// Decodes one item with `method`. `None` means the item has no value.
    fn call(&self, method: &str, call: &FieldCall<'_>) -> Option<FieldValue>;
}

/// A resolved handler: a provider and the method to dispatch to.
#[derive(Clone)]
pub struct Handler {
    provider: Arc<dyn FieldValueHandler>,
    method: String,
}

impl Handler {
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn invoke(&self, call: &FieldCall<'_>) -> Option<FieldValue> {
        self.provider.call(&self.method, call)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("provider", &self.provider.name())
            .field("method", &self.method)
            .finish()
    }
}

struct CatalogEntry {
    provider: Arc<dyn FieldValueHandler>,
    configuration: Vec<(String, String)>,
}

/// Process-wide catalog of field value handlers.
///
/// The catalog is built at most once, on the first query or an explicit
/// [`prepare`](Self::prepare). Zero handlers is a valid prepared state.
pub struct HandlerRegistry {
    providers: Vec<Arc<dyn FieldValueHandler>>,
    catalog: OnceLock<Vec<CatalogEntry>>,
}

impl HandlerRegistry {
    pub fn new(providers: Vec<Arc<dyn FieldValueHandler>>) -> Self {
        Self {
            providers,
            catalog: OnceLock::new(),
        }
    }

    /// A registry with no providers.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Adds a provider. Providers added after preparation are ignored.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn FieldValueHandler>) -> Self {
        if self.is_prepared() {
            warn!("provider {} registered after preparation; ignored", provider.name());
        } else {
            self.providers.push(provider);
        }
        self
    }

    pub fn is_prepared(&self) -> bool {
        self.catalog.get().is_some()
    }

    /// Builds the catalog if it has not been built yet. Idempotent.
    pub fn prepare(&self) {
        self.catalog();
    }

    /// True iff at least one handler is registered for `field_type`.
    pub fn handles_type(&self, field_type: &str) -> bool {
        self.handlers(field_type).next().is_some()
    }

    /// The first registered handler for `field_type`.
    pub fn resolve(&self, field_type: &str) -> Option<Handler> {
        self.handlers(field_type).next()
    }

    /// Every handler claiming `field_type`, in registration order.
    pub fn handlers_for(&self, field_type: &str) -> Vec<Handler> {
        self.handlers(field_type).collect()
    }

    /// Decodes one item with the first handler for its type. `None` when no
    /// handler claims the type or the handler yields no value.
    pub fn handle(&self, call: &FieldCall<'_>) -> Option<FieldValue> {
        self.resolve(call.field_type)?.invoke(call)
    }

    /// Field types with at least one handler, sorted.
    pub fn field_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .catalog()
            .iter()
            .flat_map(|entry| entry.configuration.iter().map(|(t, _)| t.clone()))
            .collect();
        types.sort();
        types.dedup();
        types.retain(|t| self.handles_type(t));
        types
    }

    fn handlers<'a>(&'a self, field_type: &'a str) -> impl Iterator<Item = Handler> + 'a {
        self.catalog().iter().filter_map(move |entry| {
            let method = entry
                .configuration
                .iter()
                .find(|(t, _)| t == field_type)
                .map(|(_, m)| m)?;
            entry.provider.has_method(method).then(|| Handler {
                provider: Arc::clone(&entry.provider),
                method: method.clone(),
            })
        })
    }

    fn catalog(&self) -> &[CatalogEntry] {
        self.catalog.get_or_init(|| build_catalog(&self.providers))
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("providers", &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("prepared", &self.is_prepared())
            .finish()
    }
}

fn build_catalog(providers: &[Arc<dyn FieldValueHandler>]) -> Vec<CatalogEntry> {
    let mut catalog: Vec<CatalogEntry> = Vec::with_capacity(providers.len());
    for provider in providers {
        let configuration = provider.configuration();
        debug!(
            "registering handler provider {} ({} field types)",
            provider.name(),
            configuration.len()
        );
        match catalog.iter_mut().find(|e| e.provider.name() == provider.name()) {
            Some(existing) => {
                warn!("handler provider {} declared twice; keeping the later configuration", provider.name());
                existing.provider = Arc::clone(provider);
                existing.configuration = configuration;
            }
            None => catalog.push(CatalogEntry {
                provider: Arc::clone(provider),
                configuration,
            }),
        }
    }
    info!("field handler registry prepared with {} providers", catalog.len());
    catalog
}
