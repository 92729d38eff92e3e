// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use lineage_core::{
    Atom, DomainObject, PropertyDef, PropertyValue, TypeClassifier, TypeKind, ValueKind,
};

/// Classifier for the Person/Address fixture domain.
///
/// `Person` is an entity keyed by its `id` property; `Address` is a value
/// object owned by the person that embeds it.
pub struct FixtureClassifier;

impl TypeClassifier for FixtureClassifier {
    fn classify(&self, type_name: &str) -> TypeKind {
        match type_name {
            "Person" => TypeKind::Entity,
            "i64" => TypeKind::Primitive,
            _ => TypeKind::ValueObject,
        }
    }

    fn properties(&self, type_name: &str) -> Vec<PropertyDef> {
        match type_name {
            "Person" => vec![
                PropertyDef::new("id", ValueKind::Atom),
                PropertyDef::new("name", ValueKind::Atom),
                PropertyDef::new("boss", ValueKind::Reference),
                PropertyDef::new("address", ValueKind::Reference),
                PropertyDef::new("phones", ValueKind::List),
                PropertyDef::new("tags", ValueKind::Set),
                PropertyDef::new("emails", ValueKind::Map),
            ],
            "Address" => vec![
                PropertyDef::new("city", ValueKind::Atom),
                PropertyDef::new("street", ValueKind::Atom),
            ],
            _ => vec![],
        }
    }

    fn declared_id(&self, object: &dyn DomainObject) -> Option<Atom> {
        match object.property("id") {
            PropertyValue::Atom(a) => Some(a),
            _ => None,
        }
    }
}

/// Mutable fixture object with dynamic fields.
pub struct FixtureObj {
    type_name: &'static str,
    fields: RefCell<BTreeMap<String, PropertyValue>>,
}

impl FixtureObj {
    pub fn new(type_name: &'static str) -> Rc<Self> {
        Rc::new(Self {
            type_name,
            fields: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn set(&self, name: &str, value: PropertyValue) {
        self.fields.borrow_mut().insert(name.to_owned(), value);
    }

    pub fn clear(&self, name: &str) {
        self.fields.borrow_mut().remove(name);
    }
}

impl DomainObject for FixtureObj {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn property(&self, name: &str) -> PropertyValue {
        self.fields
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or(PropertyValue::Absent)
    }
}

pub fn person(id: i64, name: &str) -> Rc<FixtureObj> {
    let p = FixtureObj::new("Person");
    p.set("id", PropertyValue::Atom(Atom::Int(id)));
    p.set("name", PropertyValue::Atom(Atom::text(name)));
    p
}

pub fn address(city: &str) -> Rc<FixtureObj> {
    let a = FixtureObj::new("Address");
    a.set("city", PropertyValue::Atom(Atom::text(city)));
    a
}
