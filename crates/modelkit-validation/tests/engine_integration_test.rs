//! Integration tests for modelkit-validation
//!
//! These tests verify the validation pipeline end to end: built-in rules,
//! container rules, custom validations, extension validators and caching.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use modelkit_core::{
    labels, ContainerCore, DocumentScope, EmptyProject, ExtValue, ExtensionProperty,
    ExtensionPropertyRegistry, LabelSupport, ListenerSet, Locale, Message, MessageList, ModelPart,
    PartContainer, PartId, Severity, ValidationContext,
};
use modelkit_validation::{
    rules::{DESCRIPTION_COUNT_MISMATCH, LABEL_COUNT_MISMATCH, UNSUPPORTED_LOCALE},
    CustomValidationRegistry, FnValidation, ValidationCache, ValidationEngine,
};

struct Form {
    core: ContainerCore,
    title: String,
    labels: LabelSupport,
}

impl Form {
    fn new() -> Self {
        Self {
            core: ContainerCore::object().with_parts::<Field>(),
            title: String::new(),
            labels: LabelSupport::new(),
        }
    }

    fn set_title(&mut self, title: &str) {
        let mut current = std::mem::take(&mut self.title);
        self.core.update(&mut current, title.to_string(), "title");
        self.title = current;
    }
}

impl PartContainer for Form {
    fn core(&self) -> &ContainerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ContainerCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        "Form"
    }

    fn label_support(&self) -> Option<&LabelSupport> {
        Some(&self.labels)
    }

    fn label_support_mut(&mut self) -> Option<&mut LabelSupport> {
        Some(&mut self.labels)
    }

    fn validate_this(&self, _context: &ValidationContext<'_>, messages: &mut MessageList) {
        if self.title.is_empty() {
            messages.add(
                Message::error("FORM_TITLE_MISSING", "Form has no title")
                    .with_ref(self.property_ref("title")),
            );
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Field {
    core: ContainerCore,
}

impl ModelPart for Field {
    const TAG: &'static str = "Field";

    fn with_id(id: PartId) -> Self {
        Self {
            core: ContainerCore::part(id),
        }
    }
}

impl PartContainer for Field {
    fn core(&self) -> &ContainerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ContainerCore {
        &mut self.core
    }

    fn kind(&self) -> &'static str {
        Self::TAG
    }

    fn validate_this(&self, _context: &ValidationContext<'_>, messages: &mut MessageList) {
        messages.add(Message::info("FIELD_SEEN", "Field visited").with_ref(self.object_ref()));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn project() -> EmptyProject {
    EmptyProject {
        name: "forms".into(),
        locales: vec![Locale::new("en")],
    }
}

fn attached_form(registry: ExtensionPropertyRegistry, historic: bool) -> (Form, Arc<ListenerSet>) {
    let listeners = Arc::new(ListenerSet::new());
    let mut scope = DocumentScope::with_listeners(Arc::new(registry), Arc::clone(&listeners))
        .with_locales(vec![Locale::new("en")]);
    if historic {
        scope = scope.historic();
    }
    let mut form = Form::new();
    form.labels.ensure_locales(&[Locale::new("en")]);
    form.core_mut().attach(Arc::new(scope), Vec::new());
    (form, listeners)
}

#[test]
fn test_pipeline_collects_own_and_child_messages() {
    let cache = Arc::new(ValidationCache::new());
    let (mut form, listeners) = attached_form(ExtensionPropertyRegistry::new(), false);
    form.core_mut().new_part::<Field>().unwrap();

    let engine = ValidationEngine::with_cache(Arc::clone(&cache), &listeners);
    let project = project();
    let messages = engine.validate(&form, &ValidationContext::new(&project));

    let codes: Vec<&str> = messages.iter().map(|m| m.code.as_str()).collect();
    assert_eq!(codes, vec!["FORM_TITLE_MISSING", "FIELD_SEEN"]);
    assert!(messages.has_errors());
    assert!(messages
        .by_code("FORM_TITLE_MISSING")
        .unwrap()
        .refers_to_property(form.instance(), "title"));
}

#[test]
fn test_label_rules_warn_about_locale_mismatch() {
    let mut form = Form::new();
    form.set_title("Claim");
    labels::set_label(&mut form, &Locale::new("fr"), "Sinistre", "Sinistres");

    let engine = ValidationEngine::new();
    let project = project();
    let messages = engine.validate(&form, &ValidationContext::new(&project));

    assert!(messages.by_code(DESCRIPTION_COUNT_MISMATCH).is_some());
    assert!(messages.by_code(LABEL_COUNT_MISMATCH).is_none());
    assert!(messages.by_code(UNSUPPORTED_LOCALE).is_some());
    assert_eq!(messages.max_severity(), Some(Severity::Warning));
}

#[test]
fn test_failing_custom_validation_does_not_blank_others() {
    let custom = Arc::new(CustomValidationRegistry::new());
    custom
        .register(FnValidation::new("broken", "Form", |_, _| {
            Err(anyhow::anyhow!("plugin exploded"))
        }))
        .unwrap();
    custom
        .register(FnValidation::new("nothing", "Form", |_, _| Ok(None)))
        .unwrap();
    custom
        .register(FnValidation::new("policy", "Form", |container, _| {
            Ok(Some(
                std::iter::once(
                    Message::warning("FORM_POLICY", "Checked by policy")
                        .with_ref(container.object_ref()),
                )
                .collect(),
            ))
        }))
        .unwrap();

    let mut form = Form::new();
    form.set_title("Claim");
    form.labels.ensure_locales(&[Locale::new("en")]);

    let engine = ValidationEngine::new().with_custom_validations(custom);
    let project = project();
    let messages = engine.validate(&form, &ValidationContext::new(&project));

    assert_eq!(messages.len(), 1);
    assert_eq!(messages.iter().next().unwrap().code, "FORM_POLICY");
}

#[test]
fn test_extension_validator_contributes_messages() {
    let registry = ExtensionPropertyRegistry::new();
    registry
        .register(
            ExtensionProperty::integer("maxFields", "Form")
                .with_default(0_i64)
                .with_validator(|container, value| {
                    let mut messages = MessageList::new();
                    if value.as_integer().unwrap_or_default() < 1 {
                        messages.add(
                            Message::error("MAX_FIELDS", "maxFields must be positive")
                                .with_ref(container.property_ref("maxFields")),
                        );
                    }
                    Ok(messages)
                }),
        )
        .unwrap();
    let cache = Arc::new(ValidationCache::new());
    let (mut form, listeners) = attached_form(registry, false);
    form.set_title("Claim");

    let engine = ValidationEngine::with_cache(Arc::clone(&cache), &listeners);
    let project = project();
    let context = ValidationContext::new(&project);
    assert!(engine.validate(&form, &context).by_code("MAX_FIELDS").is_some());

    modelkit_core::extension::set_value(&mut form, "maxFields", ExtValue::Integer(3)).unwrap();
    assert!(engine.validate(&form, &context).is_empty());
}

#[test]
fn test_cached_results_are_evicted_by_changes() {
    let cache = Arc::new(ValidationCache::new());
    let (mut form, listeners) = attached_form(ExtensionPropertyRegistry::new(), false);
    let counter = Arc::new(AtomicUsize::new(0));
    let runs = Arc::clone(&counter);
    let custom = Arc::new(CustomValidationRegistry::new());
    custom
        .register(FnValidation::new("count", "Form", move |_, _| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }))
        .unwrap();

    let engine =
        ValidationEngine::with_cache(Arc::clone(&cache), &listeners).with_custom_validations(custom);
    let project = project();
    let context = ValidationContext::new(&project);

    let first = engine.validate(&form, &context);
    let second = engine.validate(&form, &context);
    assert_eq!(first, second);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(cache.contains(form.instance()));

    form.set_title("Claim");
    assert!(!cache.contains(form.instance()));
    let third = engine.validate(&form, &context);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!(third.by_code("FORM_TITLE_MISSING").is_none());
}

#[test]
fn test_child_change_evicts_parent_result() {
    let cache = Arc::new(ValidationCache::new());
    let (mut form, listeners) = attached_form(ExtensionPropertyRegistry::new(), false);
    form.set_title("Claim");
    let engine = ValidationEngine::with_cache(Arc::clone(&cache), &listeners);
    let project = project();
    let context = ValidationContext::new(&project);

    assert!(engine.validate(&form, &context).is_empty());
    form.core_mut().new_part::<Field>().unwrap();
    assert_eq!(engine.validate(&form, &context).len(), 1);
}

#[test]
fn test_historic_documents_validate_to_nothing() {
    let cache = Arc::new(ValidationCache::new());
    let (form, listeners) = attached_form(ExtensionPropertyRegistry::new(), true);
    let engine = ValidationEngine::with_cache(Arc::clone(&cache), &listeners);
    let project = project();

    assert!(engine.validate(&form, &ValidationContext::new(&project)).is_empty());
    assert!(cache.is_empty());
}

#[test]
fn test_messages_serialize_for_reports() {
    let form = Form::new();
    let engine = ValidationEngine::new();
    let project = project();
    let messages = engine.validate(&form, &ValidationContext::new(&project));

    let json = serde_json::to_value(&messages).unwrap();
    let text = json.to_string();
    assert!(text.contains("\"severity\":\"error\""), "{text}");
}

#[test]
fn test_engine_without_cache_sees_every_change() {
    let (mut form, _listeners) = attached_form(ExtensionPropertyRegistry::new(), false);
    let engine = ValidationEngine::new();
    assert!(engine.cache().is_none());
    let project = project();
    let context = ValidationContext::new(&project);

    assert!(engine.validate(&form, &context).by_code("FORM_TITLE_MISSING").is_some());
    form.set_title("Claim");
    assert!(engine.validate(&form, &context).by_code("FORM_TITLE_MISSING").is_none());
}
