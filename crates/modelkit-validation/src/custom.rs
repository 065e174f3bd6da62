//! Externally registered validations bound to a container kind

use modelkit_core::{MessageList, PartContainer, ValidationContext};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{Error, Result};

/// A validation contributed from outside the container's own rules.
///
/// Returning `Ok(None)` contributes nothing. Errors are logged by the engine
/// and do not affect other validations.
pub trait CustomValidation: Send + Sync {
    /// Unique name among validations of the same kind
    fn name(&self) -> &str;

    /// Container kind the validation applies to
    fn extended_kind(&self) -> &str;

    /// Validate one container
    ///
    /// # Errors
    ///
    /// Any failure of the validation itself.
    fn validate(
        &self,
        container: &dyn PartContainer,
        context: &ValidationContext<'_>,
    ) -> anyhow::Result<Option<MessageList>>;
}

type ValidateFn = dyn Fn(&dyn PartContainer, &ValidationContext<'_>) -> anyhow::Result<Option<MessageList>>
    + Send
    + Sync;

/// Custom validation backed by a closure
pub struct FnValidation {
    name: String,
    kind: String,
    validate: Box<ValidateFn>,
}

impl FnValidation {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        validate: impl Fn(&dyn PartContainer, &ValidationContext<'_>) -> anyhow::Result<Option<MessageList>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            validate: Box::new(validate),
        }
    }
}

impl std::fmt::Debug for FnValidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnValidation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl CustomValidation for FnValidation {
    fn name(&self) -> &str {
        &self.name
    }

    fn extended_kind(&self) -> &str {
        &self.kind
    }

    fn validate(
        &self,
        container: &dyn PartContainer,
        context: &ValidationContext<'_>,
    ) -> anyhow::Result<Option<MessageList>> {
        (self.validate)(container, context)
    }
}

/// Custom validations grouped by container kind, in registration order
#[derive(Default)]
pub struct CustomValidationRegistry {
    by_kind: RwLock<HashMap<String, Vec<Arc<dyn CustomValidation>>>>,
}

impl CustomValidationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validation
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateValidation`] when a validation with the same
    /// name is already registered for the kind.
    pub fn register(&self, validation: impl CustomValidation + 'static) -> Result<()> {
        let kind = validation.extended_kind().to_string();
        let mut by_kind = self.by_kind.write().unwrap_or_else(PoisonError::into_inner);
        let validations = by_kind.entry(kind.clone()).or_default();
        if validations.iter().any(|v| v.name() == validation.name()) {
            return Err(Error::duplicate_validation(kind, validation.name()));
        }
        validations.push(Arc::new(validation));
        Ok(())
    }

    /// Validations registered for `kind`
    #[must_use]
    pub fn for_kind(&self, kind: &str) -> Vec<Arc<dyn CustomValidation>> {
        self.by_kind
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of registered validations
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_kind
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CustomValidationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomValidationRegistry")
            .field("validations", &self.len())
            .finish()
    }
}
