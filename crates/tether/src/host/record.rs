//! Records - host structs with fields and two method sets
//!
//! A record type describes itself once through [`Record::record_type`]:
//! fields in declaration order (exported or not), value-receiver methods
//! (`Fn(&T, A)`) and reference-receiver methods (`Fn(&mut T, A)`).
//!
//! Ownership follows one rule: a [`RecordValue`] is a value and is never
//! mutated; projecting it promotes an addressable copy. A [`Shared`] record
//! (and its erased form [`RecordRef`]) is a reference; every projection of it
//! observes and mutates the same referent.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use tether_sdk::{BridgeError, BridgeResult, Realm};

use super::coercion::convert;
use super::function::{signature_of, HostFunction, HostOutcome};
use super::typed::{single_results, single_return, FromHost, HostKind, HostParams, HostResults, HostReturn, IntoHost};
use super::types::{HostType, Signature};
use super::{HostValue, Pointer};

/// A host struct the bridge can project.
///
/// `Default` supplies the zero value given to a missing record argument.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Default)]
/// struct Counter { count: i64, label: String }
///
/// impl Record for Counter {
///     const NAME: &'static str = "Counter";
///
///     fn record_type() -> RecordType<Self> {
///         RecordType::new()
///             .field("Count", |c: &Counter| c.count)
///             .private_field("label", |c: &Counter| c.label.clone())
///             .method("Get", |c: &Counter, (): ()| c.count)
///             .method_mut("Inc", |c: &mut Counter, (by,): (i64,)| c.count += by)
///     }
/// }
/// ```
pub trait Record: Clone + Default + 'static {
    /// Type name, used for coercion and diagnostics
    const NAME: &'static str;

    /// Fields and methods of the type
    fn record_type() -> RecordType<Self>;
}

type FieldGetter<T> = Rc<dyn Fn(&T) -> HostValue>;
type ValueMethod<T> = Rc<dyn Fn(&dyn Realm, &T, Vec<HostValue>) -> BridgeResult<HostOutcome>>;
type PointerMethod<T> = Rc<dyn Fn(&dyn Realm, &mut T, Vec<HostValue>) -> BridgeResult<HostOutcome>>;

struct FieldDef<T> {
    name: &'static str,
    exported: bool,
    get: FieldGetter<T>,
}

struct MethodDef<B> {
    name: &'static str,
    signature: Signature,
    body: B,
}

/// Field and method descriptor of a record type.
pub struct RecordType<T> {
    fields: Vec<FieldDef<T>>,
    value_methods: Vec<MethodDef<ValueMethod<T>>>,
    pointer_methods: Vec<MethodDef<PointerMethod<T>>>,
}

impl<T: 'static> RecordType<T> {
    /// Empty descriptor
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            value_methods: Vec::new(),
            pointer_methods: Vec::new(),
        }
    }

    /// Declare an exported field
    pub fn field<V: IntoHost>(self, name: &'static str, get: impl Fn(&T) -> V + 'static) -> Self {
        self.push_field(name, true, get)
    }

    /// Declare a field that is not visible to foreign code
    pub fn private_field<V: IntoHost>(self, name: &'static str, get: impl Fn(&T) -> V + 'static) -> Self {
        self.push_field(name, false, get)
    }

    fn push_field<V: IntoHost>(mut self, name: &'static str, exported: bool, get: impl Fn(&T) -> V + 'static) -> Self {
        self.fields.push(FieldDef {
            name,
            exported,
            get: Rc::new(move |t| get(t).into_host()),
        });
        self
    }

    /// Declare a value-receiver method
    pub fn method<A, R>(self, name: &'static str, f: impl Fn(&T, A) -> R + 'static) -> Self
    where
        A: HostParams,
        R: HostReturn,
    {
        self.method_in_realm(name, move |_realm: &dyn Realm, t: &T, args: A| f(t, args))
    }

    /// Declare a value-receiver method that reaches the realm it is called in,
    /// e.g. to invoke a foreign callback argument
    pub fn method_in_realm<A, R>(mut self, name: &'static str, f: impl Fn(&dyn Realm, &T, A) -> R + 'static) -> Self
    where
        A: HostParams,
        R: HostReturn,
    {
        self.value_methods.push(MethodDef {
            name,
            signature: signature_of::<A, R>(),
            body: Rc::new(move |realm, t, args| Ok(f(realm, t, A::from_args(args)?).into_outcome())),
        });
        self
    }

    /// Declare a reference-receiver method
    pub fn method_mut<A, R>(self, name: &'static str, f: impl Fn(&mut T, A) -> R + 'static) -> Self
    where
        A: HostParams,
        R: HostReturn,
    {
        self.method_mut_in_realm(name, move |_realm: &dyn Realm, t: &mut T, args: A| f(t, args))
    }

    /// Reference-receiver form of [`RecordType::method_in_realm`].
    ///
    /// The record stays mutably borrowed for the whole call: anything the
    /// method calls back into that touches the same record fails with
    /// [`BridgeError::Borrowed`].
    pub fn method_mut_in_realm<A, R>(
        mut self,
        name: &'static str,
        f: impl Fn(&dyn Realm, &mut T, A) -> R + 'static,
    ) -> Self
    where
        A: HostParams,
        R: HostReturn,
    {
        self.pointer_methods.push(MethodDef {
            name,
            signature: signature_of::<A, R>(),
            body: Rc::new(move |realm, t, args| Ok(f(realm, t, A::from_args(args)?).into_outcome())),
        });
        self
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Method names, value-receiver set first
    pub fn method_names(&self) -> Vec<&'static str> {
        self.value_methods
            .iter()
            .map(|m| m.name)
            .chain(self.pointer_methods.iter().map(|m| m.name))
            .collect()
    }
}

impl<T: 'static> Default for RecordType<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Current value of one record field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    /// Declared field name
    pub name: &'static str,
    /// Whether foreign code may see the field
    pub exported: bool,
    /// Field value
    pub value: HostValue,
}

// ============================================================================
// Type-erased record storage
// ============================================================================

pub(crate) trait RecordCell {
    fn type_name(&self) -> &'static str;
    fn fields(&self) -> BridgeResult<Vec<FieldValue>>;
    fn duplicate(&self) -> BridgeResult<Rc<dyn RecordCell>>;
    fn bind_methods(self: Rc<Self>) -> Vec<HostFunction>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

fn borrowed<T: Record>() -> BridgeError {
    BridgeError::Borrowed(T::NAME.to_string())
}

impl<T: Record> RecordCell for RefCell<T> {
    fn type_name(&self) -> &'static str {
        T::NAME
    }

    fn fields(&self) -> BridgeResult<Vec<FieldValue>> {
        let value = self.try_borrow().map_err(|_| borrowed::<T>())?;
        Ok(T::record_type()
            .fields
            .iter()
            .map(|f| FieldValue {
                name: f.name,
                exported: f.exported,
                value: (f.get)(&*value),
            })
            .collect())
    }

    fn duplicate(&self) -> BridgeResult<Rc<dyn RecordCell>> {
        let value = T::clone(&*self.try_borrow().map_err(|_| borrowed::<T>())?);
        Ok(Rc::new(RefCell::new(value)))
    }

    fn bind_methods(self: Rc<Self>) -> Vec<HostFunction> {
        let ty = T::record_type();
        let mut bound = Vec::with_capacity(ty.value_methods.len() + ty.pointer_methods.len());

        for method in ty.value_methods {
            let cell = Rc::clone(&self);
            let body = method.body;
            bound.push(HostFunction::new(method.name, method.signature, move |realm, args| {
                // Value receiver: runs on a copy taken at call time
                let receiver = T::clone(&*cell.try_borrow().map_err(|_| borrowed::<T>())?);
                body(realm, &receiver, args)
            }));
        }

        for method in ty.pointer_methods {
            let cell = Rc::clone(&self);
            let body = method.body;
            bound.push(HostFunction::new(method.name, method.signature, move |realm, args| {
                let mut receiver = cell.try_borrow_mut().map_err(|_| borrowed::<T>())?;
                body(realm, &mut *receiver, args)
            }));
        }

        bound
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

// ============================================================================
// RecordValue / RecordRef
// ============================================================================

/// A record held by value.
#[derive(Clone)]
pub struct RecordValue {
    cell: Rc<dyn RecordCell>,
}

impl RecordValue {
    /// Wrap a record value
    pub fn new<T: Record>(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
        }
    }

    /// Record type name
    pub fn type_name(&self) -> &'static str {
        self.cell.type_name()
    }

    /// Copy the record out as its concrete type
    pub fn get<T: Record>(&self) -> Option<T> {
        let cell = self.cell.as_any().downcast_ref::<RefCell<T>>()?;
        let value = cell.try_borrow().ok()?;
        Some(T::clone(&*value))
    }

    /// All fields in declaration order
    pub fn fields(&self) -> BridgeResult<Vec<FieldValue>> {
        self.cell.fields()
    }

    /// Value of a field by declared name
    pub fn field(&self, name: &str) -> Option<HostValue> {
        self.fields()
            .ok()?
            .into_iter()
            .find(|f| f.name == name)
            .map(|f| f.value)
    }

    /// Addressable copy: a new shared record initialised from this value
    pub fn promote(&self) -> BridgeResult<RecordRef> {
        Ok(RecordRef {
            cell: self.cell.duplicate()?,
        })
    }
}

impl PartialEq for RecordValue {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({})", self.type_name())
    }
}

/// A shared record with its concrete type erased.
#[derive(Clone)]
pub struct RecordRef {
    cell: Rc<dyn RecordCell>,
}

impl RecordRef {
    /// Record type name
    pub fn type_name(&self) -> &'static str {
        self.cell.type_name()
    }

    /// Whether both refer to the same record
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> BridgeResult<RecordValue> {
        Ok(RecordValue {
            cell: self.cell.duplicate()?,
        })
    }

    /// All fields in declaration order
    pub fn fields(&self) -> BridgeResult<Vec<FieldValue>> {
        self.cell.fields()
    }

    /// Methods bound to this record: value-receiver set, then reference-receiver set
    pub fn methods(&self) -> Vec<HostFunction> {
        Rc::clone(&self.cell).bind_methods()
    }

    /// Recover the typed handle
    pub fn downcast<T: Record>(&self) -> Option<Shared<T>> {
        Rc::clone(&self.cell)
            .into_any()
            .downcast::<RefCell<T>>()
            .ok()
            .map(Shared)
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordRef({})", self.type_name())
    }
}

impl HostKind for RecordValue {
    fn host_type() -> HostType {
        HostType::Any
    }
}

impl IntoHost for RecordValue {
    fn into_host(self) -> HostValue {
        HostValue::Record(self)
    }
}

impl FromHost for RecordValue {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Record(v) => Ok(v),
            HostValue::Pointer(Pointer::Record(r)) => r.snapshot(),
            other => Err(BridgeError::mismatch("record", other.kind_name())),
        }
    }
}

impl HostKind for RecordRef {
    fn host_type() -> HostType {
        HostType::Any
    }
}

impl IntoHost for RecordRef {
    fn into_host(self) -> HostValue {
        HostValue::Pointer(Pointer::Record(self))
    }
}

impl FromHost for RecordRef {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match value {
            HostValue::Pointer(Pointer::Record(r)) => Ok(r),
            HostValue::Record(v) => v.promote(),
            other => Err(BridgeError::mismatch("record pointer", other.kind_name())),
        }
    }
}

// ============================================================================
// Typed handles
// ============================================================================

/// Shared, addressable record.
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T: Record> Shared<T> {
    /// Allocate a shared record
    pub fn new(value: T) -> Self {
        Shared(Rc::new(RefCell::new(value)))
    }

    /// Borrow the record
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutably borrow the record
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Whether both handles point at the same record
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Erase the concrete type
    pub fn as_record_ref(&self) -> RecordRef {
        RecordRef {
            cell: Rc::clone(&self.0) as Rc<dyn RecordCell>,
        }
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(Rc::clone(&self.0))
    }
}

impl<T: Record + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(v) => write!(f, "Shared({:?})", *v),
            Err(_) => write!(f, "Shared(<borrowed>)"),
        }
    }
}

impl<T: Record> HostKind for Shared<T> {
    fn host_type() -> HostType {
        HostType::Pointer(T::NAME)
    }
}

impl<T: Record> IntoHost for Shared<T> {
    fn into_host(self) -> HostValue {
        HostValue::Pointer(Pointer::Record(self.as_record_ref()))
    }
}

impl<T: Record> FromHost for Shared<T> {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match convert(value, &Self::host_type())? {
            HostValue::Pointer(Pointer::Record(r)) => r
                .downcast()
                .ok_or_else(|| BridgeError::mismatch(T::NAME, r.type_name())),
            HostValue::Nil | HostValue::Pointer(Pointer::Nil) => Ok(Shared::new(T::default())),
            other => Err(BridgeError::mismatch(format!("*{}", T::NAME), other.kind_name())),
        }
    }
}

/// Record passed by value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Owned<T>(pub T);

impl<T: Record> HostKind for Owned<T> {
    fn host_type() -> HostType {
        HostType::Record(T::NAME)
    }
}

impl<T: Record> IntoHost for Owned<T> {
    fn into_host(self) -> HostValue {
        HostValue::record(self.0)
    }
}

impl<T: Record> FromHost for Owned<T> {
    fn from_host(value: HostValue) -> BridgeResult<Self> {
        match convert(value, &Self::host_type())? {
            HostValue::Record(v) => v
                .get()
                .map(Owned)
                .ok_or_else(|| BridgeError::mismatch(T::NAME, v.type_name())),
            HostValue::Nil => Ok(Owned(T::default())),
            other => Err(BridgeError::mismatch(T::NAME, other.kind_name())),
        }
    }
}

impl<T: Record> HostReturn for Shared<T> {
    single_return!();
}

impl<T: Record> HostResults for Shared<T> {
    single_results!();
}

impl<T: Record> HostReturn for Owned<T> {
    single_return!();
}

impl<T: Record> HostResults for Owned<T> {
    single_results!();
}

impl HostReturn for RecordValue {
    single_return!();
}

impl HostResults for RecordValue {
    single_results!();
}

impl HostReturn for RecordRef {
    single_return!();
}

impl HostResults for RecordRef {
    single_results!();
}

// ============================================================================
// Interfaces
// ============================================================================

/// A record held behind an interface: only the interface's methods are visible.
#[derive(Clone)]
pub struct InterfaceValue {
    name: &'static str,
    methods: Rc<[&'static str]>,
    target: RecordRef,
}

impl InterfaceValue {
    /// Interface over an existing shared record
    pub fn new(name: &'static str, methods: &[&'static str], target: RecordRef) -> Self {
        Self {
            name,
            methods: Rc::from(methods),
            target,
        }
    }

    /// Interface over a shared record
    pub fn from_shared<T: Record>(name: &'static str, methods: &[&'static str], value: &Shared<T>) -> Self {
        Self::new(name, methods, value.as_record_ref())
    }

    /// Interface over a record value; holds its own addressable copy
    pub fn from_value<T: Record>(name: &'static str, methods: &[&'static str], value: T) -> Self {
        Self::new(name, methods, Shared::new(value).as_record_ref())
    }

    /// Interface name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Method names the interface declares
    pub fn method_names(&self) -> &[&'static str] {
        &self.methods
    }

    /// Record behind the interface
    pub fn target(&self) -> &RecordRef {
        &self.target
    }

    /// Bound methods of the target that the interface declares
    pub fn methods(&self) -> Vec<HostFunction> {
        self.target
            .methods()
            .into_iter()
            .filter(|m| self.methods.iter().any(|name| *name == m.name()))
            .collect()
    }
}

impl PartialEq for InterfaceValue {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.target.ptr_eq(&other.target)
    }
}

impl fmt::Debug for InterfaceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interface({} = {})", self.name, self.target.type_name())
    }
}
