//! Validation engine
//!
//! Runs the fixed pipeline over a container and its subtree: historic
//! documents are skipped, cached results are reused, then built-in
//! structural checks, the container's own rules, custom validations,
//! extension property validations and finally the children contribute
//! messages, in that order.

use modelkit_core::{
    extension, ChangeListener, ExtValue, ListenerSet, MessageList, PartContainer, ValidationContext,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::ValidationCache;
use crate::custom::CustomValidationRegistry;
use crate::rules;

/// Validation engine with an optional result cache and a custom validation
/// registry
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    cache: Option<Arc<ValidationCache>>,
    custom: Arc<CustomValidationRegistry>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationEngine {
    /// Engine without a cache and without custom validations. Every call
    /// validates afresh.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: None,
            custom: Arc::new(CustomValidationRegistry::new()),
        }
    }

    /// Engine caching results in `cache`, which is subscribed to `listeners`
    /// so that change events evict stale entries. Only containers whose
    /// events reach `listeners` should be validated through it.
    #[must_use]
    pub fn with_cache(cache: Arc<ValidationCache>, listeners: &ListenerSet) -> Self {
        listeners.add(Arc::clone(&cache) as Arc<dyn ChangeListener>);
        Self {
            cache: Some(cache),
            ..Self::new()
        }
    }

    /// Use `registry` for custom validations
    #[must_use]
    pub fn with_custom_validations(mut self, registry: Arc<CustomValidationRegistry>) -> Self {
        self.custom = registry;
        self
    }

    #[must_use]
    pub fn cache(&self) -> Option<&Arc<ValidationCache>> {
        self.cache.as_ref()
    }

    #[must_use]
    pub fn custom_validations(&self) -> &Arc<CustomValidationRegistry> {
        &self.custom
    }

    /// Validate `container` and its subtree.
    ///
    /// With a cache, results of containers attached to a document are kept
    /// until a change event evicts them. Detached containers fire no events
    /// and are always validated afresh.
    #[must_use]
    pub fn validate(&self, container: &dyn PartContainer, context: &ValidationContext<'_>) -> MessageList {
        let core = container.core();
        if core.is_historic() {
            return MessageList::new();
        }

        let instance = container.instance();
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(instance)) {
            return cached;
        }

        let mut messages = rules::validate_labels(container, context.supported_locales());
        container.validate_this(context, &mut messages);
        self.run_custom_validations(container, context, &mut messages);
        Self::run_extension_validations(container, &mut messages);

        for child in core.children() {
            messages.extend(self.validate(child, context));
        }

        if let (Some(cache), Some(scope)) = (&self.cache, core.scope()) {
            cache.insert(instance, scope.key(), core.ancestors().to_vec(), messages.clone());
        }
        debug!(kind = container.kind(), instance = %instance, messages = messages.len(), "Validated container");
        messages
    }

    fn run_custom_validations(
        &self,
        container: &dyn PartContainer,
        context: &ValidationContext<'_>,
        messages: &mut MessageList,
    ) {
        for validation in self.custom.for_kind(container.kind()) {
            match validation.validate(container, context) {
                Ok(Some(found)) => messages.extend(found),
                Ok(None) => {}
                Err(e) => warn!(
                    validation = validation.name(),
                    kind = container.kind(),
                    error = %e,
                    "Custom validation failed"
                ),
            }
        }
    }

    fn run_extension_validations(container: &dyn PartContainer, messages: &mut MessageList) {
        let Some(registry) = container.core().registry() else {
            return;
        };
        for definition in registry.definitions_for(container.kind()) {
            let id = definition.property_id();
            let value = extension::value(container, id).unwrap_or(ExtValue::Null);
            match definition.validate(container, &value) {
                Ok(found) => messages.extend(found),
                Err(e) => warn!(
                    property = id,
                    kind = container.kind(),
                    error = %e,
                    "Extension property validation failed"
                ),
            }
        }
    }
}
