//! Data requests: a definition layout, the IDs it travels under, and the
//! output slot the dispatcher fills in.

use std::fmt;

use serde::Serialize;

use crate::ids::{DefinitionId, RequestId};
use crate::native::DataType;

/// One `(name, type)` entry of a data definition, e.g.
/// `("PLANE ALTITUDE", "feet")` or `("TITLE", "String256")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub type_name: String,
}

impl Definition {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// `true` when the type name contains "string" in any case.
    pub fn is_string(&self) -> bool {
        self.type_name.to_ascii_lowercase().contains("string")
    }

    /// Native datatype used when registering this field.
    pub fn data_type(&self) -> DataType {
        if self.is_string() {
            DataType::String256
        } else {
            DataType::Float64
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.name, self.type_name)
    }
}

/// Value stored in a request's output slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutData {
    Float(f64),
    Bytes(Vec<u8>),
}

impl OutData {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OutData::Float(v) => Some(*v),
            OutData::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            OutData::Bytes(b) => Some(b),
            OutData::Float(_) => None,
        }
    }
}

/// An asynchronously resolved read of simulator state.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub request_id: RequestId,
    pub definition_id: DefinitionId,
    pub definitions: Vec<Definition>,
    /// Packet ID of the most recent send, for exception correlation.
    pub last_sent_id: Option<u32>,
    pub out_data: Option<OutData>,
}

impl Request {
    pub fn new(
        request_id: RequestId,
        definition_id: DefinitionId,
        definitions: Vec<Definition>,
    ) -> Self {
        Self {
            request_id,
            definition_id,
            definitions,
            last_sent_id: None,
            out_data: None,
        }
    }

    pub fn first_definition(&self) -> Option<&Definition> {
        self.definitions.first()
    }

    /// Payload is decoded as a string when the first field is a string.
    pub fn expects_string(&self) -> bool {
        self.first_definition().is_some_and(Definition::is_string)
    }

    pub fn is_resolved(&self) -> bool {
        self.out_data.is_some()
    }

    /// Decode an object-data payload into the output slot.
    ///
    /// String requests keep the bytes up to the first NUL.  Numeric
    /// requests read one `f64` per declared field and keep only the first.
    /// Returns `false` (slot untouched) when the payload holds no `f64`.
    pub fn store_payload(&mut self, payload: &[u8]) -> bool {
        if self.expects_string() {
            self.out_data = Some(OutData::Bytes(crate::recv::read_c_string(payload)));
            return true;
        }
        let values = crate::recv::read_f64_array(payload, self.definitions.len());
        match values.first() {
            Some(&first) => {
                self.out_data = Some(OutData::Float(first));
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
