//! Opcode identity: which module and which overload handles an instruction.

use std::fmt;

/// Identifies the operation that handles a fetched instruction.
///
/// An opcode is only unique inside its module, and a module is only unique
/// inside its module type. The overload distinguishes prototypes of the same
/// opcode that take different operand lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpcodeKey {
    /// Module type (0 for control flow, 1 for general functions, ...).
    pub module_type: u8,
    /// Module number inside the module type.
    pub module: u8,
    /// Opcode number inside the module.
    pub opcode: u16,
    /// Overload (prototype) number.
    pub overload: u8,
}

impl OpcodeKey {
    /// Create a new key.
    pub const fn new(module_type: u8, module: u8, opcode: u16, overload: u8) -> Self {
        Self {
            module_type,
            module,
            opcode,
            overload,
        }
    }

    /// The (module type, module) pair used to locate the owning module.
    pub const fn module_id(&self) -> (u8, u8) {
        (self.module_type, self.module)
    }

    /// The (opcode, overload) pair used to locate an operation inside its module.
    pub const fn op_id(&self) -> (u16, u8) {
        (self.opcode, self.overload)
    }
}

impl fmt::Display for OpcodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}:{}:{}, {}>",
            self.module_type, self.module, self.opcode, self.overload
        )
    }
}

/// Built-in module numbers as (module type, module).
pub const MODULE_JMP: (u8, u8) = (0, 1);
pub const MODULE_SEL: (u8, u8) = (0, 2);
pub const MODULE_SYS: (u8, u8) = (1, 4);
pub const MODULE_STR: (u8, u8) = (1, 10);
pub const MODULE_MEM: (u8, u8) = (1, 11);

/// Script mnemonics for the built-in operations, as
/// (name, module type, module, opcode).
pub const MNEMONICS: &[(&str, u8, u8, u16)] = &[
    ("goto", 0, 1, 0),
    ("goto_if", 0, 1, 1),
    ("goto_unless", 0, 1, 2),
    ("goto_on", 0, 1, 3),
    ("gosub", 0, 1, 5),
    ("ret", 0, 1, 10),
    ("select", 0, 2, 1),
    ("halt", 1, 4, 0),
    ("wait", 1, 4, 100),
    ("abs", 1, 4, 1000),
    ("max", 1, 4, 1001),
    ("min", 1, 4, 1002),
    ("strcpy", 1, 10, 0),
    ("strlen", 1, 10, 2),
    ("strcmp", 1, 10, 3),
    ("strcat", 1, 10, 4),
    ("itoa", 1, 10, 12),
    ("setarray", 1, 11, 0),
    ("setrng", 1, 11, 1),
    ("sum", 1, 11, 100),
];

/// The key for a mnemonic and overload.
pub fn from_mnemonic(name: &str, overload: u8) -> Option<OpcodeKey> {
    MNEMONICS
        .iter()
        .find(|(n, ..)| *n == name)
        .map(|&(_, t, m, o)| OpcodeKey::new(t, m, o, overload))
}

/// The mnemonic of a key, ignoring its overload.
pub fn mnemonic(key: &OpcodeKey) -> Option<&'static str> {
    MNEMONICS
        .iter()
        .find(|&&(_, t, m, o)| (t, m, o) == (key.module_type, key.module, key.opcode))
        .map(|(n, ..)| *n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        assert_eq!(OpcodeKey::new(1, 10, 200, 1).to_string(), "<1:10:200, 1>");
    }

    #[test]
    fn ids_split_key() {
        let key = OpcodeKey::new(0, 1, 3, 0);
        assert_eq!(key.module_id(), (0, 1));
        assert_eq!(key.op_id(), (3, 0));
    }

    #[test]
    fn ordering_is_by_module_first() {
        let a = OpcodeKey::new(0, 2, 0, 0);
        let b = OpcodeKey::new(1, 0, 0, 0);
        assert!(a < b);
    }

    #[test]
    fn mnemonic_lookup() {
        assert_eq!(from_mnemonic("sum", 0), Some(OpcodeKey::new(1, 11, 100, 0)));
        assert_eq!(from_mnemonic("setrng", 1), Some(OpcodeKey::new(1, 11, 1, 1)));
        assert_eq!(from_mnemonic("nope", 0), None);
        assert_eq!(mnemonic(&OpcodeKey::new(0, 1, 5, 0)), Some("gosub"));
        assert_eq!(mnemonic(&OpcodeKey::new(9, 9, 9, 0)), None);
    }

    #[test]
    fn mnemonics_are_unique() {
        for (i, (name, t, m, o)) in MNEMONICS.iter().enumerate() {
            for (other, t2, m2, o2) in &MNEMONICS[i + 1..] {
                assert_ne!(name, other);
                assert_ne!((t, m, o), (t2, m2, o2));
            }
        }
    }
}
