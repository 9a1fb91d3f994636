//! Runtime values of the exercise language.
//!
//! Primitives are stored inline; objects live behind `Rc<RefCell<..>>` and
//! compare by identity. Strings are indexed by Unicode scalar value.

use std::cell::{OnceCell, Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::ast::FunctionDef;
use super::interpreter::{EvalResult, Interpreter};
use super::number::{number_to_string, string_to_number};
use super::scope::Scope;

/// Built-in function body: `(interpreter, this, arguments)`.
pub type NativeFn = fn(&mut Interpreter, &Value, &[Value]) -> EvalResult<Value>;

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

struct StrInner {
    text: Box<str>,
    char_len: usize,
    /// Byte offset of every char, built on first indexed access of non-ASCII text.
    offsets: OnceCell<Box<[u32]>>,
}

/// Immutable shared string with O(1) indexing by Unicode scalar value.
#[derive(Clone)]
pub struct JsString(Rc<StrInner>);

impl JsString {
    pub fn new(text: impl Into<Box<str>>) -> Self {
        let text = text.into();
        let char_len = if text.is_ascii() {
            text.len()
        } else {
            text.chars().count()
        };
        Self(Rc::new(StrInner {
            text,
            char_len,
            offsets: OnceCell::new(),
        }))
    }

    pub fn as_str(&self) -> &str {
        &self.0.text
    }

    /// Length in Unicode scalar values.
    pub fn char_len(&self) -> usize {
        self.0.char_len
    }

    fn is_single_byte(&self) -> bool {
        self.0.char_len == self.0.text.len()
    }

    fn offsets(&self) -> &[u32] {
        self.0.offsets.get_or_init(|| {
            self.0
                .text
                .char_indices()
                .map(|(i, _)| i as u32)
                .collect::<Vec<_>>()
                .into_boxed_slice()
        })
    }

    /// Byte offset of the char at `index`; the text length when past the end.
    pub fn byte_offset(&self, index: usize) -> usize {
        if index >= self.0.char_len {
            return self.0.text.len();
        }
        if self.is_single_byte() {
            index
        } else {
            self.offsets()[index] as usize
        }
    }

    /// Char index of a byte offset that lies on a char boundary.
    pub fn char_index(&self, byte: usize) -> usize {
        if self.is_single_byte() {
            return byte.min(self.0.text.len());
        }
        match self.offsets().binary_search(&(byte as u32)) {
            Ok(i) => i,
            Err(i) => i,
        }
    }

    pub fn char_at(&self, index: usize) -> Option<char> {
        if index >= self.0.char_len {
            return None;
        }
        let start = self.byte_offset(index);
        self.0.text[start..].chars().next()
    }

    /// Text between two char indices (clamped, `start <= end` required).
    pub fn slice_chars(&self, start: usize, end: usize) -> &str {
        let start = self.byte_offset(start);
        let end = self.byte_offset(end).max(start);
        &self.0.text[start..end]
    }

    pub fn ptr_eq(&self, other: &JsString) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for JsString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0.text
    }
}

impl std::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0.text
    }
}

impl PartialEq for JsString {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0.text == other.0.text
    }
}

impl Eq for JsString {}

impl Hash for JsString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.text.hash(state)
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0.text, f)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.text)
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString::new(s)
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString::new(s)
    }
}

impl From<&Rc<str>> for JsString {
    fn from(s: &Rc<str>) -> Self {
        JsString::new(&**s)
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(JsString),
    Object(ObjRef),
}

impl Value {
    pub fn string(s: impl Into<JsString>) -> Value {
        Value::String(s.into())
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        self.as_object().is_some_and(|o| o.is_function())
    }

    pub fn is_array(&self) -> bool {
        self.as_object().is_some_and(|o| o.is_array())
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(obj) => {
                if obj.is_function() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Object(obj) => write!(f, "[{}]", obj.class_name()),
        }
    }
}

/// `Object.is`: NaN equals NaN, +0 and -0 differ.
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            (x.is_nan() && y.is_nan()) || x.to_bits() == y.to_bits()
        }
        _ => strict_equals(a, b),
    }
}

/// SameValueZero (`includes`, Map and Set keys): NaN equals NaN, +0 equals -0.
pub fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => (x.is_nan() && y.is_nan()) || x == y,
        _ => strict_equals(a, b),
    }
}

/// `===`.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
        _ => false,
    }
}

/// `==` with the host coercion rules.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(x), Value::String(s)) | (Value::String(s), Value::Number(x)) => {
            *x == string_to_number(s)
        }
        (Value::Bool(x), other) | (other, Value::Bool(x)) => {
            loose_equals(&Value::Number(if *x { 1.0 } else { 0.0 }), other)
        }
        (Value::Object(_), Value::Object(_)) => strict_equals(a, b),
        (Value::Object(_), prim) | (prim, Value::Object(_)) => {
            let obj = if matches!(a, Value::Object(_)) { a } else { b };
            loose_equals(&Value::String(to_js_string(obj)), prim)
        }
        _ => strict_equals(a, b),
    }
}

/// `ToNumber` without user-defined conversions.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Object(_) => string_to_number(&to_js_string(value)),
    }
}

/// `ToString` without user-defined conversions.
pub fn to_js_string(value: &Value) -> JsString {
    match value {
        Value::String(s) => s.clone(),
        other => JsString::from(display_string(other, &mut Vec::new())),
    }
}

fn display_string(value: &Value, seen: &mut Vec<*const RefCell<JsObject>>) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(*n),
        Value::String(s) => s.to_string(),
        Value::Object(obj) => {
            let ptr = Rc::as_ptr(&obj.0);
            if seen.contains(&ptr) {
                return String::new();
            }
            let inner = obj.borrow();
            match &inner.kind {
                ObjectKind::Array(items) => {
                    seen.push(ptr);
                    let parts: Vec<String> = items
                        .iter()
                        .map(|item| match item {
                            Value::Undefined | Value::Null => String::new(),
                            other => display_string(other, seen),
                        })
                        .collect();
                    seen.pop();
                    parts.join(",")
                }
                ObjectKind::Function(f) => f.source_text(),
                ObjectKind::Error(e) => {
                    if e.message.is_empty() {
                        e.name.to_string()
                    } else {
                        format!("{}: {}", e.name, e.message)
                    }
                }
                ObjectKind::RegExp(re) => format!("/{}/{}", re.source, re.flags),
                ObjectKind::Map(_) => "[object Map]".to_string(),
                ObjectKind::Set(_) => "[object Set]".to_string(),
                ObjectKind::Ordinary => "[object Object]".to_string(),
            }
        }
    }
}

/// Primitive description used in error messages, e.g. `string 'abc'`.
pub fn describe_for_error(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string '{}'", s),
        Value::Number(n) => format!("number '{}'", number_to_string(*n)),
        Value::Bool(b) => format!("boolean '{}'", b),
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Object(obj) => format!("#<{}>", obj.class_name()),
    }
}

// ---------------------------------------------------------------------------
// Property keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum PropertyKey {
    Index(usize),
    Name(JsString),
    /// Name taken from program text; converted to a [`JsString`] only when stored.
    Static(Rc<str>),
}

impl PropertyKey {
    pub fn from_static(name: &Rc<str>) -> PropertyKey {
        match array_index(name) {
            Some(i) => PropertyKey::Index(i),
            None => PropertyKey::Static(name.clone()),
        }
    }

    pub fn from_str(name: &str) -> PropertyKey {
        match array_index(name) {
            Some(i) => PropertyKey::Index(i),
            None => PropertyKey::Name(JsString::from(name)),
        }
    }

    pub fn from_value(value: &Value) -> PropertyKey {
        match value {
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < 4_294_967_295.0 => {
                PropertyKey::Index(*n as usize)
            }
            Value::String(s) => match array_index(s) {
                Some(i) => PropertyKey::Index(i),
                None => PropertyKey::Name(s.clone()),
            },
            other => PropertyKey::from_str(&to_js_string(other)),
        }
    }

    pub fn to_js_string(&self) -> JsString {
        match self {
            PropertyKey::Index(i) => JsString::from(i.to_string()),
            PropertyKey::Name(name) => name.clone(),
            PropertyKey::Static(name) => JsString::from(name),
        }
    }

    /// Non-index key text.
    pub fn name(&self) -> Option<&str> {
        match self {
            PropertyKey::Name(name) => Some(name.as_str()),
            PropertyKey::Static(name) => Some(name),
            PropertyKey::Index(_) => None,
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(i) => write!(f, "{}", i),
            PropertyKey::Name(name) => write!(f, "{}", name),
            PropertyKey::Static(name) => write!(f, "{}", name),
        }
    }
}

/// Canonical array index (`"0"`, `"17"`, but not `"01"` or `"-1"`).
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || key.len() > 10 || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    let n: u64 = key.parse().ok()?;
    if n < 4_294_967_295 {
        Some(n as usize)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Function {
    Closure {
        def: Rc<FunctionDef>,
        env: Rc<Scope>,
    },
    Native {
        name: Rc<str>,
        call: NativeFn,
        construct: Option<NativeFn>,
        length: u32,
    },
    Bound {
        target: Value,
        this: Value,
        args: Vec<Value>,
    },
}

impl Function {
    pub fn name(&self) -> String {
        match self {
            Function::Closure { def, .. } => def.name.to_string(),
            Function::Native { name, .. } => name.to_string(),
            Function::Bound { target, .. } => {
                let inner = target
                    .as_object()
                    .and_then(|o| o.function().map(|f| f.name()))
                    .unwrap_or_default();
                format!("bound {}", inner)
            }
        }
    }

    pub fn length(&self) -> usize {
        match self {
            Function::Closure { def, .. } => def.arity(),
            Function::Native { length, .. } => *length as usize,
            Function::Bound { target, args, .. } => target
                .as_object()
                .and_then(|o| o.function().map(|f| f.length()))
                .unwrap_or(0)
                .saturating_sub(args.len()),
        }
    }

    /// `Function.prototype.toString`.
    pub fn source_text(&self) -> String {
        match self {
            Function::Closure { def, .. } => def.source.to_string(),
            Function::Native { name, .. } => format!("function {}() {{ [native code] }}", name),
            Function::Bound { .. } => "function () { [native code] }".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ErrorData {
    pub name: JsString,
    pub message: JsString,
    pub stack: JsString,
}

#[derive(Clone)]
pub struct RegExpData {
    pub source: JsString,
    pub flags: JsString,
    pub regex: Rc<regex::Regex>,
    pub last_index: usize,
}

impl RegExpData {
    pub fn global(&self) -> bool {
        self.flags.contains('g')
    }

    pub fn sticky(&self) -> bool {
        self.flags.contains('y')
    }
}

/// Key of a Map or Set entry under SameValueZero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Undefined,
    Null,
    Bool(bool),
    Number(u64),
    String(JsString),
    Object(usize),
}

impl MapKey {
    pub fn from_value(value: &Value) -> MapKey {
        match value {
            Value::Undefined => MapKey::Undefined,
            Value::Null => MapKey::Null,
            Value::Bool(b) => MapKey::Bool(*b),
            Value::Number(n) => {
                let normalized = if n.is_nan() {
                    f64::NAN
                } else if *n == 0.0 {
                    0.0
                } else {
                    *n
                };
                MapKey::Number(normalized.to_bits())
            }
            Value::String(s) => MapKey::String(s.clone()),
            Value::Object(obj) => MapKey::Object(Rc::as_ptr(&obj.0) as usize),
        }
    }
}

pub enum ObjectKind {
    Ordinary,
    Array(Vec<Value>),
    Function(Function),
    Error(ErrorData),
    /// Entries keep the original key value next to the value.
    Map(IndexMap<MapKey, (Value, Value)>),
    Set(IndexMap<MapKey, Value>),
    RegExp(RegExpData),
}

pub struct JsObject {
    pub kind: ObjectKind,
    /// Own enumerable data properties.
    pub props: IndexMap<JsString, Value>,
    pub frozen: bool,
    /// Function that created this object through `new`, if user-defined.
    pub constructor: Option<Value>,
}

impl JsObject {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            props: IndexMap::new(),
            frozen: false,
            constructor: None,
        }
    }

    /// Own enumerable string keys in host order: integer keys ascending, then insertion order.
    pub fn own_keys(&self) -> Vec<JsString> {
        let mut keys = Vec::new();
        if let ObjectKind::Array(items) = &self.kind {
            keys.extend((0..items.len()).map(|i| JsString::from(i.to_string())));
        }
        let mut indexed: Vec<(usize, &JsString)> = self
            .props
            .keys()
            .filter_map(|k| array_index(k).map(|i| (i, k)))
            .collect();
        if indexed.is_empty() {
            keys.extend(self.props.keys().cloned());
            return keys;
        }
        indexed.sort_by_key(|(i, _)| *i);
        keys.extend(indexed.into_iter().map(|(_, k)| k.clone()));
        keys.extend(
            self.props
                .keys()
                .filter(|k| array_index(k).is_none())
                .cloned(),
        );
        keys
    }

    pub fn class_name(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error(_) => "Error",
            ObjectKind::Map(_) => "Map",
            ObjectKind::Set(_) => "Set",
            ObjectKind::RegExp(_) => "RegExp",
        }
    }
}

/// Shared handle to a heap object; equality is identity.
#[derive(Clone)]
pub struct ObjRef(Rc<RefCell<JsObject>>);

impl ObjRef {
    pub fn borrow(&self) -> Ref<'_, JsObject> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, JsObject> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &ObjRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_ptr(&self) -> *const RefCell<JsObject> {
        Rc::as_ptr(&self.0)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Array(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Function(_))
    }

    pub fn is_ordinary(&self) -> bool {
        matches!(self.0.borrow().kind, ObjectKind::Ordinary)
    }

    pub fn function(&self) -> Option<Function> {
        match &self.0.borrow().kind {
            ObjectKind::Function(f) => Some(f.clone()),
            _ => None,
        }
    }

    /// Snapshot of array elements.
    pub fn array_items(&self) -> Option<Vec<Value>> {
        match &self.0.borrow().kind {
            ObjectKind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.0.borrow().class_name()
    }
}

// ---------------------------------------------------------------------------
// Heap bookkeeping
// ---------------------------------------------------------------------------

/// Tracks every object and scope of one realm so reference cycles created by
/// user code (closures stored in their own scope, self-referencing objects)
/// are broken when the realm is torn down.
#[derive(Default)]
pub struct Heap {
    objects: Vec<Weak<RefCell<JsObject>>>,
    scopes: Vec<Weak<Scope>>,
    compact_at: usize,
}

const MIN_COMPACT: usize = 4096;

impl Heap {
    pub fn alloc(&mut self, object: JsObject) -> ObjRef {
        let rc = Rc::new(RefCell::new(object));
        self.objects.push(Rc::downgrade(&rc));
        self.maybe_compact();
        ObjRef(rc)
    }

    pub fn track_scope(&mut self, scope: &Rc<Scope>) {
        self.scopes.push(Rc::downgrade(scope));
        self.maybe_compact();
    }

    fn maybe_compact(&mut self) {
        let size = self.objects.len() + self.scopes.len();
        if size < self.compact_at.max(MIN_COMPACT) {
            return;
        }
        self.objects.retain(|w| w.strong_count() > 0);
        self.scopes.retain(|w| w.strong_count() > 0);
        self.compact_at = (self.objects.len() + self.scopes.len()) * 2;
    }

    /// Empty every live object and scope, then release them.
    pub fn sweep(&mut self) {
        let objects: Vec<Rc<RefCell<JsObject>>> =
            self.objects.drain(..).filter_map(|w| w.upgrade()).collect();
        let scopes: Vec<Rc<Scope>> = self.scopes.drain(..).filter_map(|w| w.upgrade()).collect();
        let mut released: Vec<ObjectKind> = Vec::with_capacity(objects.len());
        let mut released_props = Vec::with_capacity(objects.len());
        for object in &objects {
            if let Ok(mut inner) = object.try_borrow_mut() {
                released.push(std::mem::replace(&mut inner.kind, ObjectKind::Ordinary));
                released_props.push(std::mem::take(&mut inner.props));
                inner.constructor = None;
            }
        }
        for scope in &scopes {
            scope.clear();
        }
        // Every object is still held by `objects`, so these drops are shallow.
        drop(released);
        drop(released_props);
        drop(scopes);
        drop(objects);
    }

    #[cfg(test)]
    pub fn tracked_objects(&self) -> usize {
        self.objects.iter().filter(|w| w.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_indexing() {
        let s = JsString::from("héllo😀");
        assert_eq!(s.char_len(), 6);
        assert_eq!(s.char_at(1), Some('é'));
        assert_eq!(s.char_at(5), Some('😀'));
        assert_eq!(s.char_at(6), None);
        assert_eq!(s.slice_chars(1, 3), "él");
        assert_eq!(s.char_index(s.byte_offset(5)), 5);
    }

    #[test]
    fn test_equality_flavours() {
        let nan = Value::Number(f64::NAN);
        let zero = Value::Number(0.0);
        let neg_zero = Value::Number(-0.0);
        assert!(same_value(&nan, &nan));
        assert!(!same_value(&zero, &neg_zero));
        assert!(same_value_zero(&zero, &neg_zero));
        assert!(!strict_equals(&nan, &nan));
        assert!(strict_equals(&zero, &neg_zero));
        assert!(loose_equals(&Value::Null, &Value::Undefined));
        assert!(loose_equals(&Value::string("1"), &Value::Number(1.0)));
        assert!(loose_equals(&Value::Bool(true), &Value::string("1")));
        assert!(!loose_equals(&Value::Null, &Value::Number(0.0)));
    }

    #[test]
    fn test_to_number_and_string() {
        assert_eq!(to_number(&Value::string(" 12 ")), 12.0);
        assert!(to_number(&Value::Undefined).is_nan());
        assert_eq!(to_number(&Value::Null), 0.0);
        assert_eq!(to_js_string(&Value::Number(1.5)).as_str(), "1.5");
        assert_eq!(to_js_string(&Value::Bool(false)).as_str(), "false");
    }

    #[test]
    fn test_own_keys_order() {
        let mut heap = Heap::default();
        let obj = heap.alloc(JsObject::new(ObjectKind::Ordinary));
        {
            let mut inner = obj.borrow_mut();
            inner.props.insert("b".into(), Value::Number(1.0));
            inner.props.insert("2".into(), Value::Number(2.0));
            inner.props.insert("a".into(), Value::Number(3.0));
            inner.props.insert("1".into(), Value::Number(4.0));
        }
        let keys: Vec<String> = obj.borrow().own_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["1", "2", "b", "a"]);
    }

    #[test]
    fn test_object_handle_inspection() {
        let mut heap = Heap::default();
        let list = heap.alloc(JsObject::new(ObjectKind::Array(vec![Value::Number(1.0)])));
        assert!(list.is_array());
        assert!(!list.is_ordinary() && !list.is_function());
        assert_eq!(list.class_name(), "Array");
        assert_eq!(list.array_items().map(|items| items.len()), Some(1));
        assert!(list.function().is_none());

        let plain = heap.alloc(JsObject::new(ObjectKind::Ordinary));
        plain.borrow_mut().props.insert("name".into(), Value::Bool(true));
        assert!(plain.is_ordinary());
        assert!(plain.array_items().is_none());
        assert!(matches!(plain.borrow().props.get("name"), Some(Value::Bool(true))));
    }

    #[test]
    fn test_array_index_canonical_form() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("042"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("4294967295"), None);
    }

    #[test]
    fn test_map_key_normalizes_zero_and_nan() {
        assert_eq!(
            MapKey::from_value(&Value::Number(0.0)),
            MapKey::from_value(&Value::Number(-0.0))
        );
        assert_eq!(
            MapKey::from_value(&Value::Number(f64::NAN)),
            MapKey::from_value(&Value::Number(0.0 / 0.0))
        );
    }

    #[test]
    fn test_sweep_breaks_cycles() {
        let mut heap = Heap::default();
        let a = heap.alloc(JsObject::new(ObjectKind::Ordinary));
        a.borrow_mut()
            .props
            .insert("self".into(), Value::Object(a.clone()));
        let weak = Rc::downgrade(&a.0);
        drop(a);
        assert!(weak.upgrade().is_some());
        heap.sweep();
        assert!(weak.upgrade().is_none());
    }
}
