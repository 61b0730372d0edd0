// Self-describing hierarchical container model
// Scopes hold ordered string attributes, named dimensions and array
// variables; a dataset is a root scope plus named groups.  Persisted as
// JSON.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use super::{ContainerError, Result};
use crate::burst::Samples;

/// A scalar string-valued attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// A named dimension.  Name and length live in one object so the pairing
/// can never drift when dimensions are added across groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

/// A multidimensional array variable addressed by named dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub data: Samples,
}

/// One container scope: ordered attributes, dimensions and variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl Scope {
    /// Set an attribute, replacing in place if the name already exists.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Define a dimension, reusing an existing definition of the same name
    /// and length.  Redefining a name at a different length is an error.
    pub fn define_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        if let Some(existing) = self.dimensions.iter().find(|d| d.name == name) {
            if existing.len != len {
                return Err(ContainerError::DimensionMismatch {
                    name: name.to_string(),
                    existing: existing.len,
                    requested: len,
                });
            }
            return Ok(());
        }

        self.dimensions.push(Dimension {
            name: name.to_string(),
            len,
        });
        Ok(())
    }

    pub fn dimension_len(&self, name: &str) -> Option<usize> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.len)
    }

    /// Add a variable, validating that every referenced dimension is
    /// defined and that the data length matches the dimension product.
    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        let mut expected = 1usize;
        for dim in &variable.dimensions {
            let len = self.dimension_len(dim).ok_or_else(|| {
                ContainerError::UndefinedDimension {
                    variable: variable.name.clone(),
                    dimension: dim.clone(),
                }
            })?;
            expected *= len;
        }

        if expected != variable.data.len() {
            return Err(ContainerError::VariableShapeMismatch {
                variable: variable.name.clone(),
                expected,
                actual: variable.data.len(),
            });
        }

        self.variables.push(variable);
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// A named group: one scope within a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(flatten)]
    pub scope: Scope,
}

/// The container root: a scope of its own plus ordered named groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(flatten)]
    pub root: Scope,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or fetch) a named group.
    pub fn create_group(&mut self, name: &str) -> &mut Group {
        if let Some(idx) = self.groups.iter().position(|g| g.name == name) {
            return &mut self.groups[idx];
        }

        self.groups.push(Group {
            name: name.to_string(),
            scope: Scope::default(),
        });
        self.groups.last_mut().unwrap()
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}
