//! The registry: every attached module, keyed by (module type, module).

use rustc_hash::FxHashMap;

use opvm_common::OpcodeKey;

use crate::builtins;
use crate::error::RegistrationError;
use crate::module::Module;
use crate::operation::Operation;

/// Maps opcode keys to operations.
///
/// A registry is built once and passed by reference to the fetch loop.
/// [`Registry::new`] starts empty, so tests can build isolated tables.
#[derive(Debug, Default)]
pub struct Registry {
    modules: FxHashMap<(u8, u8), Module>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in modules.
    pub fn with_builtins() -> Result<Self, RegistrationError> {
        let mut registry = Self::new();
        builtins::install(&mut registry)?;
        Ok(registry)
    }

    pub fn attach(&mut self, module: Module) -> Result<&mut Self, RegistrationError> {
        let (module_type, number) = module.id();
        if self.modules.contains_key(&(module_type, number)) {
            return Err(RegistrationError::DuplicateModule {
                module_type,
                module: number,
            });
        }
        self.modules.insert((module_type, number), module);
        Ok(self)
    }

    pub fn module(&self, module_type: u8, module: u8) -> Option<&Module> {
        self.modules.get(&(module_type, module))
    }

    pub fn module_mut(&mut self, module_type: u8, module: u8) -> Option<&mut Module> {
        self.modules.get_mut(&(module_type, module))
    }

    /// The operation that handles `key`.
    pub fn lookup(&self, key: &OpcodeKey) -> Option<&dyn Operation> {
        self.modules
            .get(&key.module_id())?
            .get(key.opcode, key.overload)
    }

    /// A property of the operation at `key`, falling back to its module.
    pub fn property(&self, key: &OpcodeKey, prop: i32) -> Option<i32> {
        let module = self.modules.get(&key.module_id())?;
        module
            .get(key.opcode, key.overload)
            .and_then(|op| op.property(prop))
            .or_else(|| module.property(prop))
    }

    /// Diagnostic name such as `Sys:halt<1:4:0, 0>`.
    pub fn describe(&self, key: &OpcodeKey) -> String {
        match self.modules.get(&key.module_id()) {
            Some(module) => match module.get(key.opcode, key.overload) {
                Some(op) => format!("{}:{}{}", module.name(), op.name(), key),
                None => format!("{}:unknown{}", module.name(), key),
            },
            None => format!("unknown{key}"),
        }
    }

    /// Find the variant of `key` (same module type, opcode and overload) in
    /// whichever module reports `prop == value`.
    pub fn lookup_variant(&self, key: &OpcodeKey, prop: i32, value: i32) -> Option<OpcodeKey> {
        let mut candidates: Vec<_> = self
            .modules
            .values()
            .filter(|module| module.module_type() == key.module_type)
            .collect();
        candidates.sort_by_key(|module| module.module());
        candidates.into_iter().find_map(|module| {
            let variant =
                OpcodeKey::new(key.module_type, module.module(), key.opcode, key.overload);
            let handles = module.get(key.opcode, key.overload).is_some();
            (handles && self.property(&variant, prop) == Some(value)).then_some(variant)
        })
    }

    /// Every registered operation, sorted by key.
    pub fn operations(&self) -> Vec<(OpcodeKey, &Module, &dyn Operation)> {
        let mut entries: Vec<_> = self
            .modules
            .values()
            .flat_map(|module| {
                module.operations().into_iter().map(move |((opcode, overload), op)| {
                    (
                        OpcodeKey::new(module.module_type(), module.module(), opcode, overload),
                        module,
                        op,
                    )
                })
            })
            .collect();
        entries.sort_by_key(|(key, ..)| *key);
        entries
    }

    pub fn len(&self) -> usize {
        self.modules.values().map(Module::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
