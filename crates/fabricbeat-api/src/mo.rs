// Managed-object tree model
//
// Every APIC read returns `{"totalCount": "...", "imdata": [...]}` where
// each `imdata` element is a single-key object keyed by the MO's class:
// `{"fvAEPg": {"attributes": {...}, "children": [...]}}`. The class key
// is folded into the record here, at the fetch boundary, so downstream
// code never probes for unknown keys.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, de};

/// Response envelope for class and MO queries.
///
/// `imdata` may legitimately be empty — zero matching objects is a
/// valid, non-fatal outcome, not an error.
#[derive(Debug, Deserialize)]
pub struct ClassResponse {
    #[serde(default, rename = "totalCount")]
    pub total_count: Option<String>,
    #[serde(default)]
    pub imdata: Vec<ManagedObject>,
}

/// One node of the controller's object tree: a class name, a flat
/// string-to-string attribute map, and nested children of the same
/// shape. Children reference their parent only by nesting.
///
/// Never mutated after decode; the join engine builds its own indices
/// from these trees and leaves them untouched.
#[derive(Debug, Clone)]
pub struct ManagedObject {
    class: String,
    attributes: HashMap<String, String>,
    children: Vec<ManagedObject>,
}

#[derive(Debug, Deserialize)]
struct MoBody {
    #[serde(default)]
    attributes: HashMap<String, String>,
    #[serde(default)]
    children: Vec<ManagedObject>,
}

impl<'de> Deserialize<'de> for ManagedObject {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = HashMap::<String, MoBody>::deserialize(deserializer)?;
        let Some((class, body)) = map.into_iter().next() else {
            return Err(de::Error::custom("managed object record has no class key"));
        };
        Ok(Self {
            class,
            attributes: body.attributes,
            children: body.children,
        })
    }
}

impl ManagedObject {
    /// The object's class name (the wire-level key, e.g. `fvAEPg`).
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Look up a single attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The object's distinguished name, when present.
    pub fn dn(&self) -> Option<&str> {
        self.attr("dn")
    }

    /// The object's `name` attribute, when present.
    pub fn name(&self) -> Option<&str> {
        self.attr("name")
    }

    /// The object's relative name, when present.
    pub fn rn(&self) -> Option<&str> {
        self.attr("rn")
    }

    /// All immediate children, in response order.
    pub fn children(&self) -> &[ManagedObject] {
        &self.children
    }

    /// Immediate children of one class, in response order.
    pub fn children_of<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a ManagedObject> {
        self.children.iter().filter(move |c| c.class == class)
    }

    /// First immediate child of one class.
    pub fn child_of(&self, class: &str) -> Option<&ManagedObject> {
        self.children.iter().find(|c| c.class == class)
    }
}
