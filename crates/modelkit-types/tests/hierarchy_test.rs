//! Integration tests for modelkit-types
//!
//! Component types are read from XML, resolved through a project context and
//! validated through the validation engine.

use modelkit_core::{Locale, MessageList, PartContainer, ProjectContext, ValidationContext};
use modelkit_types::{
    component, rules, ComponentType, ContextLookup, HierarchyType, TypeHierarchy, TypeMember,
};
use modelkit_validation::ValidationEngine;

struct Project {
    types: Vec<ComponentType>,
    dependents: Vec<ComponentType>,
    locales: Vec<Locale>,
}

impl Project {
    fn new(types: Vec<ComponentType>) -> Self {
        Self {
            types,
            dependents: Vec::new(),
            locales: Vec::new(),
        }
    }

    fn get(&self, name: &str) -> &ComponentType {
        self.types
            .iter()
            .chain(&self.dependents)
            .find(|t| t.qualified_name() == name)
            .unwrap()
    }

    fn validate(&self, name: &str) -> MessageList {
        ValidationEngine::new().validate(self.get(name), &ValidationContext::new(self))
    }
}

impl ProjectContext for Project {
    fn project_name(&self) -> &str {
        "policies"
    }

    fn supported_locales(&self) -> &[Locale] {
        &self.locales
    }

    fn find_object(&self, qualified_name: &str) -> Option<&dyn PartContainer> {
        self.types
            .iter()
            .find(|t| t.qualified_name() == qualified_name)
            .map(|t| t as &dyn PartContainer)
    }

    fn objects(&self) -> Vec<&dyn PartContainer> {
        self.types.iter().map(|t| t as &dyn PartContainer).collect()
    }

    fn dependent_objects(&self) -> Vec<&dyn PartContainer> {
        self.dependents.iter().map(|t| t as &dyn PartContainer).collect()
    }
}

fn load(qualified_name: &str, xml: &str) -> ComponentType {
    let mut ty = ComponentType::new();
    modelkit_xml::load_into(&mut ty, xml.as_bytes(), qualified_name).unwrap();
    ty.core_mut().set_qualified_name(qualified_name);
    ty
}

fn plain(qualified_name: &str, supertype: Option<&str>) -> ComponentType {
    let xml = match supertype {
        Some(supertype) => format!(r#"<ComponentType supertype="{supertype}"/>"#),
        None => "<ComponentType/>".to_string(),
    };
    load(qualified_name, &xml)
}

fn names(types: &[&ComponentType]) -> Vec<String> {
    types.iter().map(|t| t.qualified_name().to_string()).collect()
}

#[test]
fn test_cyclic_chain_terminates_and_reports_once_per_type() {
    let project = Project::new(vec![
        plain("p.A", Some("p.B")),
        plain("p.B", Some("p.C")),
        plain("p.C", Some("p.A")),
    ]);
    let lookup = ContextLookup::new(&project);
    let a = project.get("p.A");
    let hierarchy = a.supertype_hierarchy(&lookup);

    assert!(hierarchy.contains_cycle());
    assert_eq!(names(&hierarchy.all_supertypes(a)), vec!["p.B", "p.C"]);

    for name in ["p.A", "p.B", "p.C"] {
        let messages = project.validate(name);
        let cycles: Vec<_> = messages.all_by_code(rules::SUPERTYPE_CYCLE).collect();
        assert_eq!(cycles.len(), 1, "{name}: {messages:?}");
        let ty = project.get(name);
        assert!(cycles[0].refers_to_property(ty.instance(), component::PROPERTY_SUPERTYPE));
        assert_eq!(cycles[0].refs.len(), 1);
    }
}

#[test]
fn test_override_candidates_on_cyclic_chain_are_finite() {
    let project = Project::new(vec![
        load(
            "p.R",
            r#"<ComponentType supertype="p.S">
                 <Attribute id="r1" name="premium" datatype="Money"/>
               </ComponentType>"#,
        ),
        load(
            "p.S",
            r#"<ComponentType supertype="p.T">
                 <Attribute id="s1" name="sum" datatype="Money"/>
                 <Attribute id="s2" name="premium" datatype="Money"/>
               </ComponentType>"#,
        ),
        load(
            "p.T",
            r#"<ComponentType supertype="p.R">
                 <Attribute id="t1" name="sum" datatype="Money"/>
                 <Attribute id="t2" name="rate" datatype="Decimal"/>
               </ComponentType>"#,
        ),
    ]);
    let lookup = ContextLookup::new(&project);
    let r = project.get("p.R");
    let hierarchy = r.supertype_hierarchy(&lookup);

    let candidates: Vec<&str> = hierarchy
        .override_attribute_candidates(r)
        .into_iter()
        .map(TypeMember::name)
        .collect();
    assert_eq!(candidates, vec!["sum", "rate"]);
    assert_eq!(hierarchy.all_attributes(r).len(), 5);
}

#[test]
fn test_three_level_override_collapses_to_nearest() {
    let project = Project::new(vec![
        load(
            "p.Home",
            r#"<ComponentType supertype="p.Property">
                 <Attribute id="h1" name="limit" datatype="Money" overrides="true"/>
               </ComponentType>"#,
        ),
        load(
            "p.Property",
            r#"<ComponentType supertype="p.Policy">
                 <Attribute id="pr1" name="limit" datatype="Money" overrides="true"/>
                 <Attribute id="pr2" name="address" datatype="String"/>
               </ComponentType>"#,
        ),
        load(
            "p.Policy",
            r#"<ComponentType>
                 <Attribute id="po1" name="limit" datatype="Money"/>
               </ComponentType>"#,
        ),
    ]);
    let lookup = ContextLookup::new(&project);
    let home = project.get("p.Home");
    let hierarchy = home.supertype_hierarchy(&lookup);

    let visible = hierarchy.all_attributes_respecting_override(home);
    let ids: Vec<&str> = visible.iter().map(|a| a.id().as_str()).collect();
    assert_eq!(ids, vec!["h1", "pr2"]);

    let found = hierarchy.find_attribute(home, "address").unwrap();
    assert_eq!(found.id().as_str(), "pr2");
    assert!(project.validate("p.Home").is_empty());
}

#[test]
fn test_dangling_override_and_missing_supertype() {
    let project = Project::new(vec![load(
        "p.Orphan",
        r#"<ComponentType supertype="p.Missing">
             <Attribute id="o1" name="limit" datatype="Money" overrides="true"/>
           </ComponentType>"#,
    )]);

    let messages = project.validate("p.Orphan");
    let orphan = project.get("p.Orphan");
    let limit = orphan.attribute("limit").unwrap();

    assert!(messages
        .by_code(rules::SUPERTYPE_NOT_FOUND)
        .unwrap()
        .refers_to_property(orphan.instance(), component::PROPERTY_SUPERTYPE));
    assert!(messages
        .by_code(rules::OVERRIDDEN_ATTRIBUTE_NOT_FOUND)
        .unwrap()
        .refers_to(limit.instance()));
    assert!(messages.by_code(rules::SUPERTYPE_CYCLE).is_none());
}

#[test]
fn test_concrete_type_must_implement_inherited_abstract_methods() {
    let base = r#"<ComponentType abstract="true">
        <Method id="m1" name="premium" datatype="Money" abstract="true">
          <Parameter id="p1" name="base" datatype="Money"/>
        </Method>
        <Method id="m2" name="tax" datatype="Money" abstract="true"/>
      </ComponentType>"#;
    let project = Project::new(vec![
        load("p.Base", base),
        load(
            "p.Partial",
            r#"<ComponentType supertype="p.Base">
                 <Method id="m3" name="tax" datatype="Money" overrides="true"/>
                 <Method id="m4" name="premium" datatype="Money" overrides="true">
                   <Parameter id="p2" name="base" datatype="Decimal"/>
                 </Method>
               </ComponentType>"#,
        ),
        load(
            "p.Complete",
            r#"<ComponentType supertype="p.Partial">
                 <Method id="m5" name="premium" datatype="Money" overrides="true">
                   <Parameter id="p3" name="value" datatype="Money"/>
                 </Method>
               </ComponentType>"#,
        ),
    ]);

    assert!(project.validate("p.Base").is_empty());

    let partial = project.validate("p.Partial");
    let missing: Vec<&str> = partial
        .all_by_code(rules::ABSTRACT_METHOD_NOT_IMPLEMENTED)
        .map(|m| m.text.as_str())
        .collect();
    assert_eq!(missing.len(), 1);
    assert!(missing[0].contains("premium(Money)"), "{missing:?}");

    assert!(project
        .validate("p.Complete")
        .by_code(rules::ABSTRACT_METHOD_NOT_IMPLEMENTED)
        .is_none());
}

#[test]
fn test_member_rules_run_for_every_part() {
    let project = Project::new(vec![
        load("p.Coverage", "<ComponentType/>"),
        load(
            "p.Policy",
            r#"<ComponentType>
                 <Attribute id="a1" name="sum" datatype="Money"/>
                 <Attribute id="a2" name="sum" datatype="Money"/>
                 <Attribute id="a3" name="9lives" datatype=""/>
                 <Method id="m1" name="calc" datatype="Money">
                   <Parameter id="p1" name="x" datatype="Integer"/>
                   <Parameter id="p2" name="x" datatype="Integer"/>
                 </Method>
                 <Association id="s1" target="p.Coverage" targetRole="coverages" minCardinality="1" maxCardinality="*"/>
                 <Association id="s2" target="p.Nothing" targetRole="things" minCardinality="3" maxCardinality="2"/>
               </ComponentType>"#,
        ),
    ]);

    let messages = project.validate("p.Policy");
    let codes: Vec<&str> = messages.iter().map(|m| m.code.as_str()).collect();
    assert_eq!(
        codes,
        vec![
            rules::DUPLICATE_ATTRIBUTE_NAME,
            rules::INVALID_NAME,
            rules::DATATYPE_MISSING,
            rules::DUPLICATE_PARAMETER_NAME,
            rules::ASSOCIATION_TARGET_NOT_FOUND,
            rules::INVALID_CARDINALITY,
        ]
    );
}

#[test]
fn test_subtype_hierarchy_spans_dependent_projects() {
    let mut project = Project::new(vec![
        plain("base.Policy", None),
        plain("base.Motor", Some("base.Policy")),
        plain("base.Unrelated", None),
    ]);
    project.dependents = vec![
        plain("ext.Car", Some("base.Motor")),
        plain("ext.Truck", Some("base.Motor")),
    ];
    let lookup = ContextLookup::new(&project);
    let policy = project.get("base.Policy");
    let hierarchy: TypeHierarchy<'_, ComponentType> = policy.subtype_hierarchy(&lookup);

    assert!(!hierarchy.contains_cycle());
    assert_eq!(
        names(&hierarchy.all_subtypes_of(policy)),
        vec!["base.Motor", "ext.Car", "ext.Truck"]
    );
    assert!(!hierarchy.is_part_of_hierarchy("base.Unrelated"));

    let motor = project.get("base.Motor");
    assert_eq!(names(&hierarchy.subtypes_of(motor)), vec!["ext.Car", "ext.Truck"]);
    assert!(hierarchy.is_supertype_of(Some(policy), Some(project.get("ext.Car"))));
    assert!(!hierarchy.is_subtype_of(None, Some(policy)));
}

#[test]
fn test_reload_keeps_member_identity() {
    let mut ty = load(
        "p.Policy",
        r#"<ComponentType><Attribute id="a1" name="sum" datatype="Money"/></ComponentType>"#,
    );
    let before = ty.attribute("sum").unwrap().instance();

    modelkit_xml::load_into(
        &mut ty,
        br#"<ComponentType>
              <Attribute id="a1" name="sum" datatype="Decimal"/>
              <Attribute name="rate" datatype="Decimal"/>
            </ComponentType>"#,
        "p.Policy",
    )
    .unwrap();

    let sum = ty.attribute("sum").unwrap();
    assert_eq!(sum.instance(), before);
    assert_eq!(sum.datatype(), "Decimal");
    let rate = ty.attribute("rate").unwrap();
    assert!(!rate.id().as_str().is_empty());
    assert_ne!(rate.id().as_str(), "a1");
}

#[test]
fn test_override_on_a_cycle_does_not_find_itself() {
    let project = Project::new(vec![
        load(
            "p.A",
            r#"<ComponentType supertype="p.B">
                 <Attribute id="a1" name="limit" datatype="Money" overrides="true"/>
               </ComponentType>"#,
        ),
        load(
            "p.B",
            r#"<ComponentType supertype="p.A">
                 <Attribute id="b1" name="rate" datatype="Money"/>
               </ComponentType>"#,
        ),
        load(
            "p.C",
            r#"<ComponentType supertype="p.D">
                 <Attribute id="c1" name="rate" datatype="Money" overrides="true"/>
               </ComponentType>"#,
        ),
        load(
            "p.D",
            r#"<ComponentType supertype="p.C">
                 <Attribute id="d1" name="rate" datatype="Money"/>
               </ComponentType>"#,
        ),
    ]);

    let a = project.validate("p.A");
    assert!(a.by_code(rules::SUPERTYPE_CYCLE).is_some());
    assert!(a
        .by_code(rules::OVERRIDDEN_ATTRIBUTE_NOT_FOUND)
        .unwrap()
        .refers_to(project.get("p.A").attribute("limit").unwrap().instance()));

    let c = project.validate("p.C");
    assert!(c.by_code(rules::OVERRIDDEN_ATTRIBUTE_NOT_FOUND).is_none());
}
