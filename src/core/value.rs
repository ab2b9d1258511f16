//! The in-memory value representation.
//!
//! `Value` is the Rust rendition of the spec's "object graph": a tagged
//! union wide enough to hold everything a JSON document can express plus
//! the handful of non-JSON primitives and typed instances this crate knows
//! how to round-trip. Arrays, objects, and ref-strategy instances carry
//! their payload behind `Rc<RefCell<_>>` so that shared subtrees and cycles
//! are real Rust aliasing, not just bookkeeping in a side table.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A type participating in the type registry.
///
/// Built-ins (`Date`, `RegExp`, `Map`, ...) and user-registered types both
/// implement this trait. It is object-safe so the registry can hold
/// `Box<dyn Instance>` / `Rc<RefCell<dyn Instance>>` values without knowing
/// their concrete type ahead of time — the Rust rendition of the "erased
/// payload types" the spec's design notes call for.
pub trait Instance: fmt::Debug {
    /// The registry id this instance matches, e.g. `"Date"` or `"Map"`.
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_boxed(&self) -> Box<dyn Instance>;
}

impl Clone for Box<dyn Instance> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

pub type ObjectData = Vec<(String, Value)>;

/// The object graph's value type.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// Always finite. NaN/±Infinity are represented as an `Instance`
    /// (`NonFiniteNumber`) so that `Value::Number` never needs a sentinel.
    Number(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<ObjectData>>),
    /// Ref-strategy typed instance: identity-bearing, may appear in cycles.
    Instance(Rc<RefCell<dyn Instance>>),
    /// Value-strategy typed instance: always inlined, never deduplicated.
    InstanceValue(Box<dyn Instance>),
    /// The absent value (JS `undefined`). Distinct from `Null`.
    Undefined,
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(fields: ObjectData) -> Value {
        Value::Object(Rc::new(RefCell::new(fields)))
    }

    pub fn instance<T: Instance + 'static>(inst: T) -> Value {
        Value::Instance(Rc::new(RefCell::new(inst)))
    }

    pub fn instance_value<T: Instance + 'static>(inst: T) -> Value {
        Value::InstanceValue(Box::new(inst))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Structural equality, following `Rc` contents rather than pointer
    /// identity — used by round-trip tests, not by the codec itself (which
    /// tracks identity separately via `Rc::as_ptr`).
    pub fn structurally_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) | (Undefined, Undefined) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Array(a), Array(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.structurally_eq(y))
            }
            (Object(a), Object(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter().any(|(k2, v2)| k == k2 && v.structurally_eq(v2))
                    })
            }
            (Instance(a), Instance(b)) => instance_eq(&*a.borrow(), &*b.borrow()),
            (InstanceValue(a), InstanceValue(b)) => instance_eq(a.as_ref(), b.as_ref()),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other)
    }
}

fn instance_eq(a: &dyn Instance, b: &dyn Instance) -> bool {
    // Built-ins implement PartialEq on their concrete type; compare through
    // Debug formatting as a conservative, type-erased fallback so arbitrary
    // user instances still get a meaningful equality check in tests.
    a.type_name() == b.type_name() && format!("{:?}", a) == format!("{:?}", b)
}
