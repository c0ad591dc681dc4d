// src/pipeline/walk.rs

//! Component discovery inside composed page JSON.

use serde_json::{Map, Value};

/// Field marking an object as an embedded component.
pub const REF_FIELD: &str = "_ref";

/// Path segments that precede a component name inside a reference.
const COMPONENT_SEGMENTS: [&str; 2] = ["/_components/", "/components/"];

/// A component found while walking a composed page.
#[derive(Debug, Clone, Copy)]
pub struct ComponentRef<'a> {
    /// The component reference, e.g. `foo.com/_components/article/instances/x`
    pub reference: &'a str,
    /// The whole component object, reference included
    pub node: &'a Map<String, Value>,
}

impl<'a> ComponentRef<'a> {
    /// Component type name encoded in the reference.
    pub fn name(&self) -> Option<&'a str> {
        component_name(self.reference)
    }

    /// Component data with the reference field removed.
    pub fn data(&self) -> Map<String, Value> {
        self.node
            .iter()
            .filter(|(key, _)| key.as_str() != REF_FIELD)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Extract the component type name from a reference.
///
/// `foo.com/_components/article/instances/abc@published` yields `article`.
pub fn component_name(reference: &str) -> Option<&str> {
    let rest = COMPONENT_SEGMENTS
        .iter()
        .find_map(|segment| reference.split_once(segment).map(|(_, rest)| rest))?;
    let name = rest.split(['/', '@', '.']).next()?;
    (!name.is_empty()).then_some(name)
}

/// Walk `root` depth-first and yield every component in pre-order.
///
/// The walk is lazy; calling this again restarts it from the top.
pub fn walk_components(root: &Value) -> Components<'_> {
    Components { stack: vec![root] }
}

/// Iterator returned by [`walk_components`].
#[derive(Debug, Clone)]
pub struct Components<'a> {
    stack: Vec<&'a Value>,
}

impl<'a> Iterator for Components<'a> {
    type Item = ComponentRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(value) = self.stack.pop() {
            match value {
                Value::Object(map) => {
                    // Reverse so children come off the stack in document order.
                    self.stack.extend(map.values().rev());
                    if let Some(reference) = map.get(REF_FIELD).and_then(Value::as_str) {
                        return Some(ComponentRef {
                            reference,
                            node: map,
                        });
                    }
                }
                Value::Array(items) => self.stack.extend(items.iter().rev()),
                _ => {}
            }
        }
        None
    }
}
