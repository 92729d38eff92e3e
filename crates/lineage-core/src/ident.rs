// SPDX-License-Identifier: Apache-2.0
//! Structural identity for graph nodes: atoms, property paths, and [`GlobalId`].
//!
//! Every vertex of an audited object graph carries a `GlobalId` that is a pure
//! function of the object and the route by which it was reached. Entities are
//! identified by their declared local id; value objects borrow identity from
//! their owning entity plus a structural path; value objects with no entity
//! root fall back to a type-plus-path identity.

use std::fmt;

use thiserror::Error;

use crate::metamodel::{DomainObject, TypeClassifier, TypeKind};

/// Primitive (terminal) value as seen by the diff engine.
///
/// Atoms compare by value, never by host-object identity. The variant set is
/// closed: anything the host model cannot express as one of these must be
/// modelled as a value object instead.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Atom {
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer value.
    Int(i64),
    /// UTF-8 text value.
    Text(String),
    /// Opaque binary value.
    Bytes(bytes::Bytes),
}

impl Atom {
    /// Convenience constructor for text atoms.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Bytes(v) => write!(f, "0x{}", hex::encode(v)),
        }
    }
}

impl From<bool> for Atom {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Atom {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Atom {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Slash-separated structural route from an owner to an embedded value object.
///
/// Segments are property names, list indices, or map keys, e.g. `"address"`,
/// `"phones/2"`, `"entries/home"`. Paths are immutable; the extension methods
/// return new values.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyPath(String);

impl PropertyPath {
    /// Returns the empty root path.
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Returns `true` if this is the root (empty) path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns this path extended with a property-name segment.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        self.extend(name)
    }

    /// Returns this path extended with a list-index segment.
    #[must_use]
    pub fn index(&self, ix: usize) -> Self {
        self.extend(&ix.to_string())
    }

    /// Returns this path extended with a map-key segment.
    #[must_use]
    pub fn key(&self, key: &Atom) -> Self {
        self.extend(&key.to_string())
    }

    /// Returns the path as its canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn extend(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self(segment.to_owned())
        } else {
            Self(format!("{}/{segment}", self.0))
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of an entity instance: declared type plus its declared local id.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceId {
    /// Declared type name of the entity.
    pub type_name: String,
    /// The entity's declared identifier value.
    pub local_id: Atom,
}

/// Identity of a value object embedded under an owning entity.
///
/// The owner is always an [`GlobalId::Instance`]; the path records the dotted
/// and indexed route from the owner to this value object.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueObjectId {
    /// Global id of the owning entity.
    pub owner: Box<GlobalId>,
    /// Structural route from the owner to this value object.
    pub path: PropertyPath,
}

/// Identity of a value object with no entity root.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnboundedValueObjectId {
    /// Declared type name of the value object.
    pub type_name: String,
    /// Structural route from the traversal root.
    pub path: PropertyPath,
}

/// Canonical, structurally-comparable identity for a graph node.
///
/// Two ids are equal iff variant and fields are equal. Ids are never mutated
/// after creation; graphs, diffs, and snapshots all key on this type.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GlobalId {
    /// An entity instance identified by its declared local id.
    Instance(InstanceId),
    /// A value object owned by an entity.
    ValueObject(ValueObjectId),
    /// A value object with no entity root.
    UnboundedValueObject(UnboundedValueObjectId),
}

impl GlobalId {
    /// Constructs an entity instance id.
    #[must_use]
    pub fn instance(type_name: impl Into<String>, local_id: impl Into<Atom>) -> Self {
        Self::Instance(InstanceId {
            type_name: type_name.into(),
            local_id: local_id.into(),
        })
    }

    /// Constructs a value object id under `owner`.
    ///
    /// The owner must be an entity instance id; value objects never own other
    /// value objects directly (nesting is expressed through the path).
    #[must_use]
    pub fn value_object(owner: GlobalId, path: PropertyPath) -> Self {
        debug_assert!(
            matches!(owner, Self::Instance(_)),
            "value object owner must be an entity instance id"
        );
        Self::ValueObject(ValueObjectId {
            owner: Box::new(owner),
            path,
        })
    }

    /// Constructs an unbounded value object id.
    #[must_use]
    pub fn unbounded_value_object(type_name: impl Into<String>, path: PropertyPath) -> Self {
        Self::UnboundedValueObject(UnboundedValueObjectId {
            type_name: type_name.into(),
            path,
        })
    }

    /// Returns `true` for entity instance ids.
    #[must_use]
    pub fn is_instance(&self) -> bool {
        matches!(self, Self::Instance(_))
    }

    /// Returns the owning entity id for owned value objects.
    #[must_use]
    pub fn owner(&self) -> Option<&GlobalId> {
        match self {
            Self::ValueObject(vo) => Some(&vo.owner),
            Self::Instance(_) | Self::UnboundedValueObject(_) => None,
        }
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(id) => write!(f, "{}/{}", id.type_name, id.local_id),
            Self::ValueObject(id) => write!(f, "{}#{}", id.owner, id.path),
            Self::UnboundedValueObject(id) => write!(f, "{}#/{}", id.type_name, id.path),
        }
    }
}

/// Failure to assign a [`GlobalId`] to an object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// An entity's declared id property is absent or null.
    #[error("entity `{type_name}` has no declared id value")]
    MissingEntityId {
        /// Type name of the offending entity.
        type_name: String,
    },
}

/// Traversal context carried while classifying reachable objects.
///
/// `owner` is the global id of the closest enclosing entity (if any); `path`
/// is the structural route from that entity (or from the traversal root when
/// no entity encloses the object).
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct OwnerContext {
    /// Global id of the closest enclosing entity.
    pub owner: Option<GlobalId>,
    /// Structural route from the owner (or the traversal root).
    pub path: PropertyPath,
}

impl OwnerContext {
    /// Context for a traversal root: no owner, empty path.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }
}

/// Assigns a [`GlobalId`] to `object` given its traversal context.
///
/// Pure function of object plus context: entities resolve their declared id
/// through the classifier; value objects derive identity from the context.
/// A classifier verdict of `Primitive` is a host-model inconsistency (atoms
/// are not domain objects) and is treated as a value object.
pub fn classify_object(
    classifier: &dyn TypeClassifier,
    object: &dyn DomainObject,
    ctx: &OwnerContext,
) -> Result<GlobalId, IdentityError> {
    let type_name = object.type_name();
    match classifier.classify(type_name) {
        TypeKind::Entity => {
            let local_id =
                classifier
                    .declared_id(object)
                    .ok_or_else(|| IdentityError::MissingEntityId {
                        type_name: type_name.to_owned(),
                    })?;
            Ok(GlobalId::instance(type_name, local_id))
        }
        TypeKind::ValueObject | TypeKind::Primitive => match &ctx.owner {
            Some(owner) => Ok(GlobalId::value_object(owner.clone(), ctx.path.clone())),
            None => Ok(GlobalId::unbounded_value_object(type_name, ctx.path.clone())),
        },
    }
}
