//! Member queries over a resolved hierarchy
//!
//! All queries walk `ty` and then its supertypes nearest first, reusing the
//! hierarchy's cycle-safe supertype walk.

use std::collections::HashSet;

use crate::hierarchy::TypeHierarchy;
use crate::lookup::{HierarchyType, TypeMember};

/// A member found by name
#[derive(Debug)]
pub enum Member<'a, T: HierarchyType> {
    Attribute(&'a T::Attribute),
    Method(&'a T::Method),
}

impl<T: HierarchyType> Member<'_, T> {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Member::Attribute(attribute) => attribute.name(),
            Member::Method(method) => method.name(),
        }
    }
}

impl<'a, T: HierarchyType> TypeHierarchy<'a, T> {
    /// Own attributes followed by each supertype's, nearest first
    #[must_use]
    pub fn all_attributes(&self, ty: &T) -> Vec<&'a T::Attribute> {
        self.all_supertypes_incl_self(ty)
            .into_iter()
            .flat_map(HierarchyType::attributes)
            .collect()
    }

    /// Own methods followed by each supertype's, nearest first
    #[must_use]
    pub fn all_methods(&self, ty: &T) -> Vec<&'a T::Method> {
        self.all_supertypes_incl_self(ty)
            .into_iter()
            .flat_map(HierarchyType::methods)
            .collect()
    }

    /// Like [`all_attributes`](Self::all_attributes), but an inherited
    /// attribute is left out when a nearer attribute with the same name is
    /// marked as overriding. Applied along the whole chain, an override
    /// chain collapses to its nearest member.
    #[must_use]
    pub fn all_attributes_respecting_override(&self, ty: &T) -> Vec<&'a T::Attribute> {
        let mut overridden: HashSet<String> = HashSet::new();
        let mut result = Vec::new();
        for level in self.all_supertypes_incl_self(ty) {
            for attribute in level.attributes() {
                if overridden.contains(attribute.name()) {
                    continue;
                }
                if attribute.overrides() {
                    overridden.insert(attribute.name().to_string());
                }
                result.push(attribute);
            }
        }
        result
    }

    /// Nearest attribute named `name`
    #[must_use]
    pub fn find_attribute(&self, ty: &T, name: &str) -> Option<&'a T::Attribute> {
        self.all_supertypes_incl_self(ty)
            .into_iter()
            .find_map(|level| level.attributes().into_iter().find(|a| a.name() == name))
    }

    /// Nearest method named `name`
    #[must_use]
    pub fn find_method(&self, ty: &T, name: &str) -> Option<&'a T::Method> {
        self.all_supertypes_incl_self(ty)
            .into_iter()
            .find_map(|level| level.methods().into_iter().find(|m| m.name() == name))
    }

    /// Nearest attribute or method named `name`; within one type attributes
    /// are searched before methods
    #[must_use]
    pub fn find_member(&self, ty: &T, name: &str) -> Option<Member<'a, T>> {
        self.all_supertypes_incl_self(ty).into_iter().find_map(|level| {
            level
                .attributes()
                .into_iter()
                .find(|a| a.name() == name)
                .map(Member::Attribute)
                .or_else(|| {
                    level
                        .methods()
                        .into_iter()
                        .find(|m| m.name() == name)
                        .map(Member::Method)
                })
        })
    }

    /// Inherited methods `ty` could override.
    ///
    /// A signature declared by `ty` itself or by a nearer supertype shadows
    /// every farther declaration, so each signature is reported at most once
    /// and the nearest declaration wins. With `abstract_only`, only abstract
    /// declarations are reported, yet concrete ones still shadow farther
    /// abstract ones: the result is the set of abstract methods left
    /// unimplemented.
    #[must_use]
    pub fn override_candidates(&self, ty: &T, abstract_only: bool) -> Vec<&'a T::Method> {
        self.candidates(ty, HierarchyType::methods, abstract_only)
    }

    /// Inherited attributes `ty` could override, nearest declaration first
    #[must_use]
    pub fn override_attribute_candidates(&self, ty: &T) -> Vec<&'a T::Attribute> {
        self.candidates(ty, HierarchyType::attributes, false)
    }

    fn candidates<M: TypeMember + 'a>(
        &self,
        ty: &T,
        members: impl Fn(&'a T) -> Vec<&'a M>,
        abstract_only: bool,
    ) -> Vec<&'a M> {
        let Some(own) = self.resolve(ty) else {
            return Vec::new();
        };
        let mut seen: HashSet<String> = members(own).iter().map(|m| m.signature()).collect();
        let mut result = Vec::new();
        for ancestor in self.supertypes(ty) {
            for member in members(ancestor) {
                if !seen.insert(member.signature()) {
                    continue;
                }
                if abstract_only && !member.is_abstract() {
                    continue;
                }
                result.push(member);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::TypeIndex;

    #[derive(Debug)]
    struct Attr {
        name: &'static str,
        overrides: bool,
    }

    impl TypeMember for Attr {
        fn name(&self) -> &str {
            self.name
        }

        fn overrides(&self) -> bool {
            self.overrides
        }
    }

    #[derive(Debug)]
    struct Op {
        name: &'static str,
        params: &'static str,
        is_abstract: bool,
    }

    impl TypeMember for Op {
        fn name(&self) -> &str {
            self.name
        }

        fn signature(&self) -> String {
            format!("{}({})", self.name, self.params)
        }

        fn overrides(&self) -> bool {
            false
        }

        fn is_abstract(&self) -> bool {
            self.is_abstract
        }
    }

    #[derive(Debug, Default)]
    struct Ty {
        name: &'static str,
        supertype: Option<&'static str>,
        attributes: Vec<Attr>,
        methods: Vec<Op>,
    }

    impl HierarchyType for Ty {
        type Attribute = Attr;
        type Method = Op;

        fn qualified_name(&self) -> &str {
            self.name
        }

        fn supertype_ref(&self) -> Option<&str> {
            self.supertype
        }

        fn is_abstract(&self) -> bool {
            self.methods.iter().any(|m| m.is_abstract)
        }

        fn attributes(&self) -> Vec<&Attr> {
            self.attributes.iter().collect()
        }

        fn methods(&self) -> Vec<&Op> {
            self.methods.iter().collect()
        }
    }

    fn attr(name: &'static str, overrides: bool) -> Attr {
        Attr { name, overrides }
    }

    fn op(name: &'static str, params: &'static str, is_abstract: bool) -> Op {
        Op {
            name,
            params,
            is_abstract,
        }
    }

    fn three_levels() -> [Ty; 3] {
        [
            Ty {
                name: "A",
                supertype: Some("B"),
                attributes: vec![attr("x", true), attr("a", false)],
                methods: vec![op("calc", "int", false)],
            },
            Ty {
                name: "B",
                supertype: Some("C"),
                attributes: vec![attr("x", true), attr("b", false)],
                methods: vec![op("calc", "int", true), op("other", "", true)],
            },
            Ty {
                name: "C",
                supertype: None,
                attributes: vec![attr("x", false), attr("c", false)],
                methods: vec![op("calc", "int", true), op("calc", "string", true), op("done", "", false)],
            },
        ]
    }

    #[test]
    fn test_all_attributes_nearest_first() {
        let types = three_levels();
        let index = TypeIndex::new(&types);
        let hierarchy = TypeHierarchy::supertype_hierarchy(&types[0], &index);

        let names: Vec<&str> = hierarchy.all_attributes(&types[0]).iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["x", "a", "x", "b", "x", "c"]);
        assert_eq!(hierarchy.all_methods(&types[0]).len(), 6);
    }

    #[test]
    fn test_override_chain_collapses_to_nearest() {
        let types = three_levels();
        let index = TypeIndex::new(&types);
        let hierarchy = TypeHierarchy::supertype_hierarchy(&types[0], &index);

        let visible = hierarchy.all_attributes_respecting_override(&types[0]);
        let names: Vec<&str> = visible.iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["x", "a", "b", "c"]);
        assert!(std::ptr::eq(visible[0], &types[0].attributes[0]));
    }

    #[test]
    fn test_find_member_walks_outward() {
        let types = three_levels();
        let index = TypeIndex::new(&types);
        let hierarchy = TypeHierarchy::supertype_hierarchy(&types[0], &index);

        let found = hierarchy.find_attribute(&types[0], "c").unwrap();
        assert!(std::ptr::eq(found, &types[2].attributes[1]));
        assert!(hierarchy.find_attribute(&types[0], "zzz").is_none());
        assert!(matches!(hierarchy.find_member(&types[0], "done"), Some(Member::Method(_))));
        assert_eq!(hierarchy.find_member(&types[0], "b").map(|m| m.name().to_string()).as_deref(), Some("b"));
        assert!(hierarchy.find_method(&types[1], "calc").unwrap().is_abstract);
    }

    #[test]
    fn test_override_candidates_deduplicate_by_signature() {
        let types = three_levels();
        let index = TypeIndex::new(&types);
        let hierarchy = TypeHierarchy::supertype_hierarchy(&types[0], &index);

        let all: Vec<String> = hierarchy
            .override_candidates(&types[0], false)
            .iter()
            .map(|m| m.signature())
            .collect();
        assert_eq!(all, vec!["other()", "calc(string)", "done()"]);

        let unimplemented: Vec<String> = hierarchy
            .override_candidates(&types[0], true)
            .iter()
            .map(|m| m.signature())
            .collect();
        assert_eq!(unimplemented, vec!["other()", "calc(string)"]);
    }

    #[test]
    fn test_concrete_override_hides_farther_abstract_declaration() {
        let types = [
            Ty {
                name: "Leaf",
                supertype: Some("Mid"),
                ..Ty::default()
            },
            Ty {
                name: "Mid",
                supertype: Some("Top"),
                methods: vec![op("run", "", false)],
                ..Ty::default()
            },
            Ty {
                name: "Top",
                methods: vec![op("run", "", true)],
                ..Ty::default()
            },
        ];
        let index = TypeIndex::new(&types);
        let hierarchy = TypeHierarchy::supertype_hierarchy(&types[0], &index);
        assert!(hierarchy.override_candidates(&types[0], true).is_empty());
        assert_eq!(hierarchy.override_candidates(&types[0], false).len(), 1);
    }

    #[test]
    fn test_cyclic_chain_yields_finite_candidates() {
        let types = [
            Ty {
                name: "R",
                supertype: Some("S"),
                attributes: vec![attr("r", false)],
                ..Ty::default()
            },
            Ty {
                name: "S",
                supertype: Some("R"),
                attributes: vec![attr("s", false), attr("r", false)],
                ..Ty::default()
            },
        ];
        let index = TypeIndex::new(&types);
        let hierarchy = TypeHierarchy::supertype_hierarchy(&types[0], &index);

        assert!(hierarchy.contains_cycle());
        let candidates: Vec<&str> = hierarchy
            .override_attribute_candidates(&types[0])
            .iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(candidates, vec!["s"]);
        assert_eq!(hierarchy.all_attributes(&types[0]).len(), 3);
    }
}
