//! Notational payload of a measure
//!
//! Only the structural skeleton is interpreted: staves, layers and the
//! multi-rest. Every other layer element is carried verbatim so that a
//! load/save cycle does not lose notation the editor does not model.

use serde::{Deserialize, Serialize};

/// MEI `staff` inside a measure
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Staff {
    pub n: u32,
    pub layers: Vec<Layer>,
}

impl Staff {
    /// Minimal placeholder content carrying a multi-rest: staff 1, layer 1
    pub fn with_multi_rest(num: u32) -> Self {
        Self {
            n: 1,
            layers: vec![Layer {
                n: 1,
                elements: vec![LayerElement::MultiRest { num }],
            }],
        }
    }
}

/// MEI `layer` inside a staff
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Layer {
    pub n: u32,
    pub elements: Vec<LayerElement>,
}

impl Layer {
    pub fn new(n: u32) -> Self {
        Self { n, elements: Vec::new() }
    }
}

/// Content of a layer
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum LayerElement {
    /// `multiRest@num`
    MultiRest { num: u32 },
    /// Any other element, kept as serialized XML
    Other { name: String, xml: String },
}
