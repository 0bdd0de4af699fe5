//! Generic N-ary handler: an ordered descriptor list bound to a handler function.
//!
//! The handler's parameter types are described by [`FromArgs`], which is
//! implemented for tuples of [`FromValue`] types. [`Handler::new`] compares the
//! descriptor list's value kinds with the tuple's kinds once, when the
//! operation is built, and refuses to build a mismatched operation.
//!
//! ```
//! use opvm_vm::handler::Handler;
//! use opvm_vm::operand::INT_C;
//!
//! let sum3 = Handler::new("Sum3", &[INT_C, INT_C, INT_C], |_, (a, b, c): (i32, i32, i32)| {
//!     a + b + c
//! })
//! .unwrap();
//! # let _ = sum3;
//! ```

use std::fmt;

use opvm_common::Expression;

use crate::error::{ParseError, RegistrationError, RuntimeError};
use crate::machine::Machine;
use crate::operand::{ExprCursor, IntRef, Operand, Signature, StrRef, TokenCursor, Value, ValueKind};
use crate::operation::{Operation, Properties};

/// A handler parameter type.
pub trait FromValue: Sized {
    fn kind() -> ValueKind;

    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for i32 {
    fn kind() -> ValueKind {
        ValueKind::Int
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn kind() -> ValueKind {
        ValueKind::Str
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl FromValue for IntRef {
    fn kind() -> ValueKind {
        ValueKind::IntRef
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::IntRef(r) => Some(r),
            _ => None,
        }
    }
}

impl FromValue for StrRef {
    fn kind() -> ValueKind {
        ValueKind::StrRef
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::StrRef(r) => Some(r),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn kind() -> ValueKind {
        ValueKind::List(Box::new(T::kind()))
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::List(values) => values.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

/// A handler's full parameter list.
pub trait FromArgs: Sized {
    fn signature() -> Signature;

    fn from_args(args: Vec<Value>) -> Option<Self>;
}

macro_rules! impl_from_args {
    ($($ty:ident $var:ident),*) => {
        impl<$($ty: FromValue),*> FromArgs for ($($ty,)*) {
            fn signature() -> Signature {
                Signature(vec![$($ty::kind()),*])
            }

            #[allow(unused_mut)]
            fn from_args(args: Vec<Value>) -> Option<Self> {
                let mut args = args.into_iter();
                $(let $var = $ty::from_value(args.next()?)?;)*
                if args.next().is_some() {
                    return None;
                }
                Some(($($var,)*))
            }
        }
    };
}

impl_from_args!();
impl_from_args!(A a);
impl_from_args!(A a, B b);
impl_from_args!(A a, B b, C c);
impl_from_args!(A a, B b, C c, D d);
impl_from_args!(A a, B b, C c, D d, E e);
impl_from_args!(A a, B b, C c, D d, E e, F f);
impl_from_args!(A a, B b, C c, D d, E e, F f, G g);
impl_from_args!(A a, B b, C c, D d, E e, F f, G g, H h);
impl_from_args!(A a, B b, C c, D d, E e, F f, G g, H h, I i);
impl_from_args!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j);
impl_from_args!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k);
impl_from_args!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k, L l);

/// What a handler may return.
pub trait HandlerOutput {
    /// Whether the value goes to the store register.
    const STORES: bool;

    fn into_store(self) -> Result<Option<i32>, RuntimeError>;
}

impl HandlerOutput for () {
    const STORES: bool = false;

    fn into_store(self) -> Result<Option<i32>, RuntimeError> {
        Ok(None)
    }
}

impl HandlerOutput for i32 {
    const STORES: bool = true;

    fn into_store(self) -> Result<Option<i32>, RuntimeError> {
        Ok(Some(self))
    }
}

impl<T, E> HandlerOutput for Result<T, E>
where
    T: HandlerOutput,
    E: Into<RuntimeError>,
{
    const STORES: bool = T::STORES;

    fn into_store(self) -> Result<Option<i32>, RuntimeError> {
        self.map_err(Into::into)?.into_store()
    }
}

type HandlerFn = Box<dyn Fn(&mut Machine, Vec<Value>) -> Result<Option<i32>, RuntimeError>>;

/// The kinds a descriptor list passes to its handler. Empty slots pass nothing.
fn argument_signature(operands: &[&'static dyn Operand]) -> Signature {
    Signature(
        operands
            .iter()
            .map(|operand| operand.kind())
            .filter(|kind| *kind != ValueKind::Empty)
            .collect(),
    )
}

/// An [`Operation`] built from descriptors plus a handler function.
pub struct Handler {
    name: String,
    operands: Vec<&'static dyn Operand>,
    func: HandlerFn,
    advances: bool,
    stores: bool,
    properties: Properties,
}

impl Handler {
    /// Bind `func` to `operands`, checking that the handler's parameter
    /// tuple takes exactly the values the descriptors produce.
    pub fn new<A, R, F>(
        name: impl Into<String>,
        operands: &[&'static dyn Operand],
        func: F,
    ) -> Result<Self, RegistrationError>
    where
        A: FromArgs + 'static,
        R: HandlerOutput + 'static,
        F: Fn(&mut Machine, A) -> R + 'static,
    {
        let name = name.into();
        let declared = argument_signature(operands);
        let handler = A::signature();
        if declared != handler {
            return Err(RegistrationError::SignatureMismatch {
                name,
                declared,
                handler,
            });
        }

        let fault_name = name.clone();
        let func: HandlerFn = Box::new(move |machine, args| {
            let args = A::from_args(args).ok_or_else(|| {
                RuntimeError::fault(
                    fault_name.as_str(),
                    "argument kinds changed after registration",
                )
            })?;
            func(machine, args).into_store()
        });
        Ok(Self {
            name,
            operands: operands.to_vec(),
            func,
            advances: true,
            stores: R::STORES,
            properties: Properties::new(),
        })
    }

    /// Bind a handler that takes the evaluated values as-is, for operations
    /// whose parameter list is not a fixed tuple.
    pub fn variadic<R, F>(
        name: impl Into<String>,
        operands: &[&'static dyn Operand],
        func: F,
    ) -> Self
    where
        R: HandlerOutput + 'static,
        F: Fn(&mut Machine, Vec<Value>) -> R + 'static,
    {
        Self {
            name: name.into(),
            operands: operands.to_vec(),
            func: Box::new(move |machine, args| func(machine, args).into_store()),
            advances: true,
            stores: R::STORES,
            properties: Properties::new(),
        }
    }

    /// The handler moves the instruction pointer itself, or leaves it for a
    /// long operation to finish.
    pub fn no_advance(mut self) -> Self {
        self.advances = false;
        self
    }

    pub fn with_property(mut self, key: i32, value: i32) -> Self {
        self.properties.set(key, value);
        self
    }

    pub fn set_property(&mut self, key: i32, value: i32) -> &mut Self {
        self.properties.set(key, value);
        self
    }

    pub fn operands(&self) -> &[&'static dyn Operand] {
        &self.operands
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("signature", &Signature::of(&self.operands).to_string())
            .field("advances", &self.advances)
            .field("stores", &self.stores)
            .field("properties", &self.properties)
            .finish()
    }
}

impl Operation for Handler {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn advances_instruction_pointer(&self) -> bool {
        self.advances
    }

    fn stores_result(&self) -> bool {
        self.stores
    }

    fn signature(&self) -> Option<Signature> {
        Some(Signature::of(&self.operands))
    }

    fn parse(&self, tokens: &[String]) -> Result<Vec<Expression>, ParseError> {
        let mut cursor = TokenCursor::new(tokens);
        let mut exprs = Vec::with_capacity(self.operands.len());
        for operand in &self.operands {
            operand.parse(&mut cursor, &mut exprs)?;
        }
        if !cursor.is_exhausted() {
            return Err(ParseError::TrailingTokens {
                expected: cursor.position(),
                found: tokens.len(),
            });
        }
        Ok(exprs)
    }

    fn dispatch(&self, machine: &mut Machine, exprs: &[Expression]) -> Result<(), RuntimeError> {
        let mut cursor = ExprCursor::new(exprs);
        let mut args = Vec::with_capacity(self.operands.len());
        for operand in &self.operands {
            let value = operand
                .evaluate(machine, &mut cursor)
                .map_err(|source| RuntimeError::Evaluate {
                    name: self.name.clone(),
                    source,
                })?;
            if value != Value::Empty {
                args.push(value);
            }
        }

        if let Some(value) = (self.func)(machine, args)? {
            machine.set_store(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::{EMPTY, INT_C, INT_C_LIST, INT_REF, STR_C, STR_REF};
    use opvm_common::{EvalError, IntBank, IntLocation};

    fn toks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn run(op: &Handler, machine: &mut Machine, items: &[&str]) -> Result<(), RuntimeError> {
        let exprs = op.parse(&toks(items)).map_err(|source| RuntimeError::Parse {
            key: opvm_common::OpcodeKey::new(0, 0, 0, 0),
            name: op.name().to_string(),
            source,
        })?;
        op.dispatch(machine, &exprs)
    }

    #[test]
    fn sum3_writes_store() {
        let op = Handler::new("Sum3", &[INT_C, INT_C, INT_C], |_, (a, b, c): (i32, i32, i32)| {
            a + b + c
        })
        .unwrap();
        assert!(op.stores_result());
        let mut machine = Machine::new();
        run(&op, &mut machine, &["1", "2", "3"]).unwrap();
        assert_eq!(machine.store(), 6);
    }

    #[test]
    fn void_handler_leaves_store() {
        let op = Handler::new("set", &[INT_REF, INT_C], |m, (dst, v): (IntRef, i32)| dst.set(m, v))
            .unwrap();
        assert!(!op.stores_result());
        let mut machine = Machine::new();
        machine.set_store(11);
        run(&op, &mut machine, &["intA[2]", "5"]).unwrap();
        assert_eq!(machine.store(), 11);
        assert_eq!(machine.memory().int(IntLocation::new(IntBank::A, 2)), Ok(5));
    }

    #[test]
    fn signature_mismatch_is_rejected() {
        let err = Handler::new("bad", &[STR_REF, STR_C], |_, (_n,): (i32,)| ()).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::SignatureMismatch {
                name: "bad".to_string(),
                declared: Signature(vec![ValueKind::StrRef, ValueKind::Str]),
                handler: Signature(vec![ValueKind::Int]),
            }
        );
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let result = Handler::new("bad", &[INT_C, INT_C], |_, (a,): (i32,)| a);
        assert!(matches!(result, Err(RegistrationError::SignatureMismatch { .. })));
    }

    #[test]
    fn list_parameter_matches_repeated() {
        let op = Handler::new("count", &[INT_C_LIST], |_, (xs,): (Vec<i32>,)| xs.len() as i32)
            .unwrap();
        let mut machine = Machine::new();
        run(&op, &mut machine, &["2", "8", "9"]).unwrap();
        assert_eq!(machine.store(), 2);
    }

    #[test]
    fn all_empty_dispatches_with_no_arguments() {
        let op = Handler::new("nothing", &[EMPTY, EMPTY], |_, (): ()| 7).unwrap();
        assert_eq!(op.parse(&[]).unwrap().len(), 0);
        let mut machine = Machine::new();
        run(&op, &mut machine, &[]).unwrap();
        assert_eq!(machine.store(), 7);
    }

    #[test]
    fn too_many_tokens() {
        let op = Handler::new("one", &[INT_C], |_, (a,): (i32,)| a).unwrap();
        assert_eq!(
            op.parse(&toks(&["1", "2"])),
            Err(ParseError::TrailingTokens {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn too_few_tokens() {
        let op = Handler::new("two", &[INT_C, STR_C], |_, (_a, _b): (i32, String)| ()).unwrap();
        assert_eq!(
            op.parse(&toks(&["1"])),
            Err(ParseError::MissingToken { position: 1 })
        );
    }

    #[test]
    fn evaluate_error_names_operation() {
        let op = Handler::new("div", &[INT_C], |_, (a,): (i32,)| a).unwrap();
        let mut machine = Machine::new();
        assert_eq!(
            run(&op, &mut machine, &["1 / 0"]),
            Err(RuntimeError::Evaluate {
                name: "div".to_string(),
                source: EvalError::DivisionByZero,
            })
        );
    }

    #[test]
    fn handler_errors_propagate() {
        let op = Handler::new("fail", &[], |_, (): ()| -> Result<(), RuntimeError> {
            Err(RuntimeError::fault("fail", "nope"))
        })
        .unwrap();
        let mut machine = Machine::new();
        assert_eq!(run(&op, &mut machine, &[]), Err(RuntimeError::fault("fail", "nope")));
    }

    #[test]
    fn variadic_receives_raw_values() {
        let op = Handler::variadic("count_all", &[INT_C, STR_C], |_, args: Vec<Value>| {
            args.len() as i32
        });
        let mut machine = Machine::new();
        run(&op, &mut machine, &["1", "\"x\""]).unwrap();
        assert_eq!(machine.store(), 2);
    }

    #[test]
    fn builders_set_policy_and_properties() {
        let mut op = Handler::new("h", &[], |_, (): ()| ())
            .unwrap()
            .no_advance()
            .with_property(1, 0);
        op.set_property(1, 1).set_property(2, 5);
        assert!(!op.advances_instruction_pointer());
        assert_eq!(op.property(1), Some(1));
        assert_eq!(op.property(2), Some(5));
        assert_eq!(op.property(3), None);
        assert_eq!(
            op.signature(),
            Some(Signature(vec![]))
        );
    }
}
