#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # modelkit-types
//!
//! Type hierarchy resolution and the component type model family.
//!
//! ## Hierarchies
//!
//! [`TypeHierarchy`] resolves the supertype chain or the subtype tree of a
//! root type through a [`TypeLookup`]. Supertype references are plain
//! qualified names, so nothing prevents them from forming cycles; every
//! walk keeps a visited set and the hierarchy reports
//! [`contains_cycle`](TypeHierarchy::contains_cycle) instead of recursing
//! forever.
//!
//! ## Component types
//!
//! [`ComponentType`] is a root object with [`Attribute`], [`Method`] and
//! [`Association`] parts. Its validation resolves the type's hierarchy
//! through the project and reports unresolved or cyclic supertypes,
//! unimplemented abstract methods and dangling attribute overrides.

pub mod association;
pub mod attribute;
pub mod component;
pub mod hierarchy;
pub mod lookup;
pub mod members;
pub mod method;
pub mod rules;

pub use association::{Association, MaxCardinality};
pub use attribute::Attribute;
pub use component::ComponentType;
pub use hierarchy::{SupertypeChain, TypeHierarchy};
pub use lookup::{ContextLookup, HierarchyType, TypeIndex, TypeLookup, TypeMember};
pub use members::Member;
pub use method::{Method, Parameter};
