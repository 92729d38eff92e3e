// SPDX-License-Identifier: Apache-2.0
//! Injected type metamodel: classification and property access seams.
//!
//! The core never introspects host types. Callers supply a [`TypeClassifier`]
//! that maps type names to a [`TypeKind`] and enumerates properties, and
//! implement [`DomainObject`] on their live objects so the graph builder can
//! read property values. Both seams are explicit trait objects; there is no
//! ambient registry.

use std::fmt;
use std::rc::Rc;

use crate::ident::Atom;

/// Classification of a runtime type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum TypeKind {
    /// A type with a declared local identifier; versioned per instance.
    Entity,
    /// A type whose identity derives from its owner and structural path.
    ValueObject,
    /// A terminal value compared atomically; never a graph node of its own.
    Primitive,
}

/// Declared shape of one property.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ValueKind {
    /// A primitive value compared by value semantics.
    Atom,
    /// A single reference to another entity or value object.
    Reference,
    /// An ordered sequence of atoms or references.
    List,
    /// An unordered collection of atoms or references.
    Set,
    /// An atom-keyed mapping to atoms or references.
    Map,
}

/// One property in a type's declared property list.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PropertyDef {
    /// Property name, unique within its declaring type.
    pub name: String,
    /// Declared shape of the property's values.
    pub kind: ValueKind,
}

impl PropertyDef {
    /// Constructs a property definition.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Shared handle to a live domain object.
///
/// `Rc` handles let host models express cyclic object graphs directly; the
/// traversal never relies on pointer identity, only on structural ids.
pub type ObjectHandle = Rc<dyn DomainObject>;

/// Read surface of one live domain object.
pub trait DomainObject {
    /// Declared type name, resolvable through the [`TypeClassifier`].
    fn type_name(&self) -> &str;

    /// Reads the named property.
    ///
    /// Returns [`PropertyValue::Absent`] for properties without a value; the
    /// builder omits those from the node state entirely.
    fn property(&self, name: &str) -> PropertyValue;
}

/// Type classification service consumed by the identity model and builder.
pub trait TypeClassifier {
    /// Classifies a runtime type by its declared name.
    fn classify(&self, type_name: &str) -> TypeKind;

    /// Enumerates the declared properties of a type, in declaration order.
    ///
    /// The returned order drives traversal and therefore diff output order;
    /// implementations must keep it stable.
    fn properties(&self, type_name: &str) -> Vec<PropertyDef>;

    /// Reads an entity instance's declared id value.
    ///
    /// `None` means the id is absent or null, which the identity model
    /// reports as [`IdentityError::MissingEntityId`](crate::IdentityError).
    fn declared_id(&self, object: &dyn DomainObject) -> Option<Atom>;
}

/// Value of one property as read from a live object.
#[derive(Clone)]
pub enum PropertyValue {
    /// No value; the property is omitted from the node state.
    Absent,
    /// A primitive value.
    Atom(Atom),
    /// A reference to another domain object.
    Object(ObjectHandle),
    /// An ordered sequence of values.
    List(Vec<PropertyValue>),
    /// An unordered collection of values.
    Set(Vec<PropertyValue>),
    /// An atom-keyed mapping of values.
    Map(Vec<(Atom, PropertyValue)>),
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Atom(a) => f.debug_tuple("Atom").field(a).finish(),
            Self::Object(o) => f.debug_tuple("Object").field(&o.type_name()).finish(),
            Self::List(vs) => f.debug_tuple("List").field(vs).finish(),
            Self::Set(vs) => f.debug_tuple("Set").field(vs).finish(),
            Self::Map(kvs) => f.debug_tuple("Map").field(kvs).finish(),
        }
    }
}

impl From<Atom> for PropertyValue {
    fn from(value: Atom) -> Self {
        Self::Atom(value)
    }
}
