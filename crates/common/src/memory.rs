//! Integer and string memory banks plus the store register.
//!
//! This is the narrow read/write interface the dispatch engine has into
//! interpreter state. Every location is a (bank, index) pair.

use std::fmt;

use crate::error::MemoryError;

/// Number of cells in every bank.
pub const BANK_SIZE: usize = 2000;

/// Integer memory banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntBank {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    Z,
    L,
}

/// All integer banks, in storage order.
pub const ALL_INT_BANKS: [IntBank; 9] = [
    IntBank::A,
    IntBank::B,
    IntBank::C,
    IntBank::D,
    IntBank::E,
    IntBank::F,
    IntBank::G,
    IntBank::Z,
    IntBank::L,
];

impl IntBank {
    /// Bank from its letter (`'A'` for `intA`).
    pub fn from_letter(letter: char) -> Option<Self> {
        ALL_INT_BANKS
            .iter()
            .copied()
            .find(|bank| bank.letter() == letter)
    }

    /// The bank letter.
    pub fn letter(self) -> char {
        match self {
            IntBank::A => 'A',
            IntBank::B => 'B',
            IntBank::C => 'C',
            IntBank::D => 'D',
            IntBank::E => 'E',
            IntBank::F => 'F',
            IntBank::G => 'G',
            IntBank::Z => 'Z',
            IntBank::L => 'L',
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// String memory banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrBank {
    S,
    M,
    K,
}

/// All string banks, in storage order.
pub const ALL_STR_BANKS: [StrBank; 3] = [StrBank::S, StrBank::M, StrBank::K];

impl StrBank {
    /// Bank from its letter (`'S'` for `strS`).
    pub fn from_letter(letter: char) -> Option<Self> {
        ALL_STR_BANKS
            .iter()
            .copied()
            .find(|bank| bank.letter() == letter)
    }

    /// The bank letter.
    pub fn letter(self) -> char {
        match self {
            StrBank::S => 'S',
            StrBank::M => 'M',
            StrBank::K => 'K',
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// A resolved integer memory location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntLocation {
    pub bank: IntBank,
    pub index: usize,
}

impl IntLocation {
    pub fn new(bank: IntBank, index: usize) -> Self {
        Self { bank, index }
    }

    /// The location `offset` cells further along the same bank.
    pub fn offset(self, offset: usize) -> Self {
        Self {
            bank: self.bank,
            index: self.index + offset,
        }
    }
}

impl fmt::Display for IntLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "int{}[{}]", self.bank.letter(), self.index)
    }
}

/// A resolved string memory location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrLocation {
    pub bank: StrBank,
    pub index: usize,
}

impl StrLocation {
    pub fn new(bank: StrBank, index: usize) -> Self {
        Self { bank, index }
    }
}

impl fmt::Display for StrLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "str{}[{}]", self.bank.letter(), self.index)
    }
}

/// Interpreter memory.
#[derive(Debug, Clone)]
pub struct Memory {
    ints: Vec<Vec<i32>>,
    strs: Vec<Vec<String>>,
    store: i32,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Zeroed memory with empty strings.
    pub fn new() -> Self {
        Self {
            ints: vec![vec![0; BANK_SIZE]; ALL_INT_BANKS.len()],
            strs: vec![vec![String::new(); BANK_SIZE]; ALL_STR_BANKS.len()],
            store: 0,
        }
    }

    pub fn int(&self, loc: IntLocation) -> Result<i32, MemoryError> {
        self.ints[loc.bank.slot()]
            .get(loc.index)
            .copied()
            .ok_or(MemoryError::IntOutOfRange(loc))
    }

    pub fn set_int(&mut self, loc: IntLocation, value: i32) -> Result<(), MemoryError> {
        let cell = self.ints[loc.bank.slot()]
            .get_mut(loc.index)
            .ok_or(MemoryError::IntOutOfRange(loc))?;
        *cell = value;
        Ok(())
    }

    pub fn string(&self, loc: StrLocation) -> Result<&str, MemoryError> {
        self.strs[loc.bank.slot()]
            .get(loc.index)
            .map(String::as_str)
            .ok_or(MemoryError::StrOutOfRange(loc))
    }

    pub fn set_string(
        &mut self,
        loc: StrLocation,
        value: impl Into<String>,
    ) -> Result<(), MemoryError> {
        let cell = self.strs[loc.bank.slot()]
            .get_mut(loc.index)
            .ok_or(MemoryError::StrOutOfRange(loc))?;
        *cell = value.into();
        Ok(())
    }

    /// The store register, which receives the result of value-producing operations.
    pub fn store(&self) -> i32 {
        self.store
    }

    pub fn set_store(&mut self, value: i32) {
        self.store = value;
    }
}
