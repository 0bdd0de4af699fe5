//! opvm dispatch engine: decode, evaluate and invoke opcode handlers.
//!
//! An instruction's operand tokens are parsed by the operation registered
//! for its opcode key, evaluated left to right against machine state, and
//! handed to a native handler function:
//! - [`operand`]: descriptors for one parameter slot (constants, references,
//!   repeated groups, empty slots)
//! - [`handler::Handler`]: a descriptor list bound to a typed function, with
//!   the signature checked when it is built
//! - [`special::SpecialCase`]: control flow operations that read the raw
//!   instruction
//! - [`Registry`] / [`Module`]: opcode key to operation lookup
//! - [`Machine`]: interpreter state and the fetch loop
//!
//! # Usage
//!
//! ```
//! use opvm_common::{Instruction, OpcodeKey, Program};
//! use opvm_vm::handler::Handler;
//! use opvm_vm::operand::INT_C;
//! use opvm_vm::{Exit, Machine, Module, Registry};
//!
//! let mut module = Module::new("Math", 1, 9);
//! let sum3 = Handler::new("Sum3", &[INT_C, INT_C, INT_C], |_, (a, b, c): (i32, i32, i32)| {
//!     a + b + c
//! })
//! .unwrap();
//! module.add_opcode(0, 0, sum3).unwrap();
//! let mut registry = Registry::with_builtins().unwrap();
//! registry.attach(module).unwrap();
//!
//! let key = OpcodeKey::new(1, 9, 0, 0);
//! let program = Program::new(vec![Instruction::call(key, ["1", "2", "3"])]);
//! let mut machine = Machine::new();
//! assert_eq!(machine.run(&registry, &program).unwrap(), Exit::EndOfProgram);
//! assert_eq!(machine.store(), 6);
//! ```

pub mod builtins;
pub mod config;
pub mod error;
pub mod execute;
pub mod handler;
pub mod long_op;
pub mod machine;
pub mod module;
pub mod operand;
pub mod operation;
pub mod registry;
pub mod special;
pub mod validate;

pub use config::{ConfigError, MachineConfig, UnknownOpcodePolicy};
pub use error::{ParseError, RegistrationError, RuntimeError, ValidationError};
pub use execute::{Exit, Step};
pub use long_op::{LongOperation, Progress};
pub use machine::Machine;
pub use module::Module;
pub use operation::{Operation, Properties};
pub use registry::Registry;
pub use validate::validate;

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::handler::Handler;
    use crate::operand::{Operand, EMPTY, INT_C, INT_C_LIST, INT_REF, STR_C};
    use proptest::prelude::*;

    /// One operand slot and a value it can be given.
    #[derive(Debug, Clone)]
    enum Slot {
        Int(i32),
        Str(String),
        Ref(usize),
        Empty,
        List(Vec<i32>),
    }

    impl Slot {
        fn operand(&self) -> &'static dyn Operand {
            match self {
                Slot::Int(_) => INT_C,
                Slot::Str(_) => STR_C,
                Slot::Ref(_) => INT_REF,
                Slot::Empty => EMPTY,
                Slot::List(_) => INT_C_LIST,
            }
        }

        fn tokens(&self) -> Vec<String> {
            match self {
                Slot::Int(n) => vec![n.to_string()],
                Slot::Str(s) => vec![format!("\"{s}\"")],
                Slot::Ref(i) => vec![format!("intA[{i}]")],
                Slot::Empty => vec![],
                Slot::List(xs) => std::iter::once(xs.len().to_string())
                    .chain(xs.iter().map(i32::to_string))
                    .collect(),
            }
        }
    }

    fn arb_slot() -> impl Strategy<Value = Slot> {
        prop_oneof![
            any::<i32>().prop_map(Slot::Int),
            "[a-z]{0,6}".prop_map(Slot::Str),
            (0usize..2000).prop_map(Slot::Ref),
            Just(Slot::Empty),
            prop::collection::vec(-100i32..100, 0..5).prop_map(Slot::List),
        ]
    }

    proptest! {
        #[test]
        fn parse_consumes_sum_of_slots(slots in prop::collection::vec(arb_slot(), 0..6)) {
            let operands: Vec<_> = slots.iter().map(Slot::operand).collect();
            let tokens: Vec<String> = slots.iter().flat_map(Slot::tokens).collect();
            let op = Handler::variadic("shape", &operands, |_, _args: Vec<operand::Value>| ());

            prop_assert!(op.parse(&tokens).is_ok());

            let mut extra = tokens.clone();
            extra.push("0".to_string());
            let is_trailing = matches!(op.parse(&extra), Err(ParseError::TrailingTokens { .. }));
            prop_assert!(is_trailing);

            if !tokens.is_empty() {
                let short = &tokens[..tokens.len() - 1];
                prop_assert!(op.parse(short).is_err());
            }
        }

        #[test]
        fn dispatch_passes_values_in_order(values in prop::collection::vec(any::<i32>(), 0..8)) {
            let tokens: Vec<String> = values.iter().map(i32::to_string).collect();
            let operands = vec![INT_C; values.len()];
            let expected = values.clone();
            let op = Handler::variadic("order", &operands, move |_, args: Vec<operand::Value>| {
                let got: Vec<i32> = args
                    .into_iter()
                    .filter_map(|v| match v {
                        operand::Value::Int(n) => Some(n),
                        _ => None,
                    })
                    .collect();
                i32::from(got == expected)
            });
            let exprs = op.parse(&tokens).unwrap();
            let mut machine = Machine::new();
            op.dispatch(&mut machine, &exprs).unwrap();
            prop_assert_eq!(machine.store(), 1);
        }
    }
}
