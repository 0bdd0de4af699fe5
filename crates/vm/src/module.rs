//! A module: the operations of one (module type, module) pair.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::RegistrationError;
use crate::operation::{Operation, Properties};

pub struct Module {
    name: String,
    module_type: u8,
    module: u8,
    operations: FxHashMap<(u16, u8), Box<dyn Operation>>,
    properties: Properties,
}

impl Module {
    pub fn new(name: impl Into<String>, module_type: u8, module: u8) -> Self {
        Self {
            name: name.into(),
            module_type,
            module,
            operations: FxHashMap::default(),
            properties: Properties::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module_type(&self) -> u8 {
        self.module_type
    }

    pub fn module(&self) -> u8 {
        self.module
    }

    /// The (module type, module) pair this module answers to.
    pub fn id(&self) -> (u8, u8) {
        (self.module_type, self.module)
    }

    /// Register an operation at (opcode, overload).
    pub fn add_opcode(
        &mut self,
        opcode: u16,
        overload: u8,
        operation: impl Operation + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        if self.operations.contains_key(&(opcode, overload)) {
            return Err(RegistrationError::Duplicate {
                module: self.name.clone(),
                opcode,
                overload,
            });
        }
        self.operations.insert((opcode, overload), Box::new(operation));
        Ok(self)
    }

    pub fn get(&self, opcode: u16, overload: u8) -> Option<&dyn Operation> {
        self.operations.get(&(opcode, overload)).map(|op| op.as_ref())
    }

    pub fn get_mut(&mut self, opcode: u16, overload: u8) -> Option<&mut (dyn Operation + 'static)> {
        self.operations.get_mut(&(opcode, overload)).map(|op| op.as_mut())
    }

    /// Operations sorted by (opcode, overload).
    pub fn operations(&self) -> Vec<((u16, u8), &dyn Operation)> {
        let mut ops: Vec<_> = self
            .operations
            .iter()
            .map(|(&id, op)| (id, op.as_ref()))
            .collect();
        ops.sort_by_key(|(id, _)| *id);
        ops
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: i32) -> Option<i32> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: i32, value: i32) -> &mut Self {
        self.properties.set(key, value);
        self
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("module_type", &self.module_type)
            .field("module", &self.module)
            .field("operations", &self.operations.len())
            .field("properties", &self.properties)
            .finish()
    }
}
