//! The abstract value model.
//!
//! `Value` mirrors `shv::chainpack::RpcValue` from the original C++
//! implementation: a tagged variant plus an optional pair of meta-data maps
//! that travel with it through both wire formats. Unlike the original, which
//! shares `AbstractValueData` through a reference-counted pointer, this
//! implementation uses plain value semantics (`Clone` deep-copies) — observational
//! equivalence rather than sharing semantics, simpler to reason about across
//! a `Send`/`Sync` boundary.

use std::fmt;

/// Milliseconds between the Unix epoch and 2018-02-02T00:00:00Z, the offset
/// used when packing `DateTime` into the ChainPack binary wire form.
pub const SHV_EPOCH_MSEC: i64 = 1_517_529_600_000;

/// Sentinel for an uninitialized timezone quarter-hour offset.
const TZ_INVALID: i8 = -64;

/// A decimal number stored as `mantissa * 10^-precision`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decimal {
    mantissa: i64,
    precision: i16,
}

impl Decimal {
    pub fn new(mantissa: i64, precision: i16) -> Decimal {
        Decimal { mantissa, precision }
    }

    pub fn mantissa(&self) -> i64 {
        self.mantissa
    }

    pub fn precision(&self) -> i16 {
        self.precision
    }

    /// A `Decimal` with zero mantissa and nonzero precision is the
    /// default-initialized invalid marker.
    pub fn is_valid(&self) -> bool {
        !(self.mantissa == 0 && self.precision != 0)
    }

    pub fn from_double(mut n: f64, precision: i16) -> Decimal {
        let mut p = precision;
        while p > 0 {
            n *= 10.0;
            p -= 1;
        }
        Decimal::new((n + n.signum() * 0.5) as i64, precision)
    }

    pub fn to_double(&self) -> f64 {
        let mut ret = self.mantissa as f64;
        let mut prec = self.precision;
        if prec > 0 {
            while prec > 0 {
                ret /= 10.0;
                prec -= 1;
            }
        } else {
            while prec < 0 {
                ret *= 10.0;
                prec += 1;
            }
        }
        ret
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.mantissa == other.mantissa && self.precision == other.precision
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_double())
    }
}

/// Absolute point in time with an attached UTC-offset tag, mirroring
/// `RpcValue::DateTime`'s `MsTz { tz: 7 bits, msec: 57 bits }` bitfield.
#[derive(Debug, Clone, Copy)]
pub struct DateTime {
    msec_since_epoch: i64,
    tz_quarter_hours: i8,
}

impl DateTime {
    pub fn from_epoch_msec(msec_since_epoch: i64, utc_offset_min: i32) -> DateTime {
        DateTime {
            msec_since_epoch,
            tz_quarter_hours: (utc_offset_min / 15) as i8,
        }
    }

    pub fn invalid() -> DateTime {
        DateTime { msec_since_epoch: 0, tz_quarter_hours: TZ_INVALID }
    }

    pub fn is_valid(&self) -> bool {
        self.tz_quarter_hours != TZ_INVALID
    }

    pub fn msec_since_epoch(&self) -> i64 {
        self.msec_since_epoch
    }

    pub fn utc_offset_min(&self) -> i32 {
        self.tz_quarter_hours as i32 * 15
    }

    pub fn tz_quarter_hours(&self) -> i8 {
        self.tz_quarter_hours
    }
}

impl Default for DateTime {
    fn default() -> Self {
        DateTime::invalid()
    }
}

impl PartialEq for DateTime {
    fn eq(&self, other: &Self) -> bool {
        self.msec_since_epoch == other.msec_since_epoch
            && self.tz_quarter_hours == other.tz_quarter_hours
    }
}

/// Insertion-ordered mapping with overwrite-on-duplicate-key semantics.
#[derive(Debug, Clone, Default)]
pub struct OrderedMap<K: PartialEq, V> {
    entries: Vec<(K, V)>,
}

impl<K: PartialEq + Clone, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        OrderedMap { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Overwrites the value in place if `key` is already present, else
    /// appends — preserving first-insertion order.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl<K: PartialEq + Clone, V: PartialEq> PartialEq for OrderedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries
            .iter()
            .all(|(k, v)| other.get(k).map(|ov| ov == v).unwrap_or(false))
    }
}

impl<K: PartialEq + Clone, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = OrderedMap::new();
        for (k, v) in iter {
            m.insert(k, v);
        }
        m
    }
}

pub type Map = OrderedMap<String, Value>;
pub type IMap = OrderedMap<u32, Value>;
pub type List = Vec<Value>;

/// Homogeneous primitive element type carried by an `Array`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Null,
    Bool,
    Int,
    UInt,
    Double,
    Decimal,
    DateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub element_type: ElementType,
    pub elements: Vec<Value>,
}

impl ElementType {
    pub fn matches(&self, ty: Type) -> bool {
        matches!(
            (self, ty),
            (ElementType::Null, Type::Null)
                | (ElementType::Bool, Type::Bool)
                | (ElementType::Int, Type::Int)
                | (ElementType::UInt, Type::UInt)
                | (ElementType::Double, Type::Double)
                | (ElementType::Decimal, Type::Decimal)
                | (ElementType::DateTime, Type::DateTime)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Null => "Null",
            ElementType::Bool => "Bool",
            ElementType::Int => "Int",
            ElementType::UInt => "UInt",
            ElementType::Double => "Double",
            ElementType::Decimal => "Decimal",
            ElementType::DateTime => "DateTime",
        }
    }
}

impl Array {
    pub fn new(element_type: ElementType) -> Array {
        Array { element_type, elements: Vec::new() }
    }

    /// Appends `v`, rejecting it if its type doesn't match the array's
    /// declared `element_type` — constructing an `Array` from a heterogeneous
    /// `Vec<Value>` is a programmer error, not a recoverable state.
    pub fn push_checked(&mut self, v: Value) -> crate::error::Result<()> {
        if !self.element_type.matches(v.type_()) {
            return Err(crate::error::Error::UnsupportedArrayType(v.type_().name()));
        }
        self.elements.push(v);
        Ok(())
    }

    /// Builds an `Array` from a homogeneous `Vec<T>`, guessing `element_type`
    /// from `T` itself rather than inspecting values at runtime. Only the
    /// types [`GuessElementType`] is implemented for are accepted at compile
    /// time, so this never fails the way `push_checked` can.
    pub fn from_values<T>(items: Vec<T>) -> Array
    where
        T: GuessElementType + Into<Value>,
    {
        Array { element_type: T::element_type(), elements: items.into_iter().map(Into::into).collect() }
    }
}

/// Out-of-band tags that travel with a `Value`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaData {
    imap: IMap,
    smap: Map,
}

impl MetaData {
    pub fn new() -> MetaData {
        MetaData::default()
    }

    pub fn from_maps(imap: IMap, smap: Map) -> MetaData {
        MetaData { imap, smap }
    }

    pub fn is_empty(&self) -> bool {
        self.imap.is_empty() && self.smap.is_empty()
    }

    pub fn i_values(&self) -> &IMap {
        &self.imap
    }

    pub fn s_values(&self) -> &Map {
        &self.smap
    }

    pub fn value_i(&self, key: u32) -> Option<&Value> {
        self.imap.get(&key)
    }

    pub fn value_s(&self, key: &str) -> Option<&Value> {
        self.smap.get(&key.to_string())
    }

    pub fn set_value_i(&mut self, key: u32, val: Value) {
        self.imap.insert(key, val);
    }

    pub fn set_value_s(&mut self, key: impl Into<String>, val: Value) {
        self.smap.insert(key.into(), val);
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Data {
    Invalid,
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Decimal(Decimal),
    DateTime(DateTime),
    Blob(Vec<u8>),
    String(String),
    List(List),
    Map(Map),
    IMap(IMap),
    Array(Array),
}

/// Discriminant mirroring `RpcValue::Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Invalid,
    Null,
    Bool,
    Int,
    UInt,
    Double,
    Decimal,
    DateTime,
    Blob,
    String,
    List,
    Map,
    IMap,
    Array,
}

impl Type {
    pub fn name(&self) -> &'static str {
        match self {
            Type::Invalid => "Invalid",
            Type::Null => "Null",
            Type::Bool => "Bool",
            Type::Int => "Int",
            Type::UInt => "UInt",
            Type::Double => "Double",
            Type::Decimal => "Decimal",
            Type::DateTime => "DateTime",
            Type::Blob => "Blob",
            Type::String => "String",
            Type::List => "List",
            Type::Map => "Map",
            Type::IMap => "IMap",
            Type::Array => "Array",
        }
    }
}

/// The dynamic value carried by both wire formats.
#[derive(Debug, Clone)]
pub struct Value {
    data: Data,
    meta: Option<Box<MetaData>>,
}

impl Value {
    fn from_data(data: Data) -> Value {
        Value { data, meta: None }
    }

    pub fn invalid() -> Value {
        Value::from_data(Data::Invalid)
    }

    pub fn null() -> Value {
        Value::from_data(Data::Null)
    }

    pub fn type_(&self) -> Type {
        match &self.data {
            Data::Invalid => Type::Invalid,
            Data::Null => Type::Null,
            Data::Bool(_) => Type::Bool,
            Data::Int(_) => Type::Int,
            Data::UInt(_) => Type::UInt,
            Data::Double(_) => Type::Double,
            Data::Decimal(_) => Type::Decimal,
            Data::DateTime(_) => Type::DateTime,
            Data::Blob(_) => Type::Blob,
            Data::String(_) => Type::String,
            Data::List(_) => Type::List,
            Data::Map(_) => Type::Map,
            Data::IMap(_) => Type::IMap,
            Data::Array(_) => Type::Array,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.data, Data::Invalid)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.data, Data::Null)
    }

    pub fn is_default(&self) -> bool {
        matches!(self.data, Data::Invalid)
    }

    /// Convenience for diagnostics/logging, mirroring `RpcValue::toCpon()`.
    /// Not used by either wire codec.
    pub fn to_cpon_string(&self) -> String {
        crate::cpon::to_string(self)
    }

    /// Whether `self`, any meta-data value attached to it, or anything
    /// nested inside it (list/map/imap element) is `Invalid`. Backs the
    /// strict writer entry points, which refuse to serialize such a value —
    /// the lenient default still writes `Invalid` as `Null` regardless of
    /// this check.
    pub fn contains_invalid(&self) -> bool {
        if matches!(self.data, Data::Invalid) {
            return true;
        }
        if let Some(meta) = &self.meta {
            if meta.i_values().iter().any(|(_, v)| v.contains_invalid()) || meta.s_values().iter().any(|(_, v)| v.contains_invalid()) {
                return true;
            }
        }
        match &self.data {
            Data::List(items) => items.iter().any(Value::contains_invalid),
            Data::Map(m) => m.iter().any(|(_, v)| v.contains_invalid()),
            Data::IMap(m) => m.iter().any(|(_, v)| v.contains_invalid()),
            _ => false,
        }
    }

    // --- meta-data -------------------------------------------------------

    pub fn meta(&self) -> Option<&MetaData> {
        self.meta.as_deref()
    }

    pub fn meta_value_i(&self, key: u32) -> Option<&Value> {
        self.meta.as_ref().and_then(|m| m.value_i(key))
    }

    pub fn meta_value_s(&self, key: &str) -> Option<&Value> {
        self.meta.as_ref().and_then(|m| m.value_s(key))
    }

    pub fn set_meta(&mut self, meta: MetaData) {
        self.meta = if meta.is_empty() { None } else { Some(Box::new(meta)) };
    }

    pub fn set_meta_value_i(&mut self, key: u32, val: Value) {
        self.meta.get_or_insert_with(|| Box::new(MetaData::new())).set_value_i(key, val);
    }

    pub fn set_meta_value_s(&mut self, key: impl Into<String>, val: Value) {
        self.meta.get_or_insert_with(|| Box::new(MetaData::new())).set_value_s(key, val);
    }

    pub fn with_meta(mut self, meta: MetaData) -> Value {
        self.set_meta(meta);
        self
    }

    // --- typed accessors (return a type-appropriate default on mismatch) --

    pub fn as_bool(&self) -> bool {
        match &self.data {
            Data::Bool(b) => *b,
            Data::Int(n) => *n != 0,
            Data::UInt(n) => *n != 0,
            _ => false,
        }
    }

    pub fn as_int(&self) -> i64 {
        match &self.data {
            Data::Int(n) => *n,
            Data::UInt(n) => *n as i64,
            Data::Double(d) => *d as i64,
            Data::Decimal(d) => d.to_double() as i64,
            Data::Bool(b) => *b as i64,
            _ => 0,
        }
    }

    pub fn as_uint(&self) -> u64 {
        match &self.data {
            Data::UInt(n) => *n,
            Data::Int(n) => *n as u64,
            Data::Bool(b) => *b as u64,
            _ => 0,
        }
    }

    pub fn as_double(&self) -> f64 {
        match &self.data {
            Data::Double(d) => *d,
            Data::Int(n) => *n as f64,
            Data::UInt(n) => *n as f64,
            Data::Decimal(d) => d.to_double(),
            _ => 0.0,
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        match &self.data {
            Data::Decimal(d) => *d,
            _ => Decimal::default(),
        }
    }

    pub fn as_date_time(&self) -> DateTime {
        match &self.data {
            Data::DateTime(dt) => *dt,
            _ => DateTime::invalid(),
        }
    }

    pub fn as_str(&self) -> &str {
        match &self.data {
            Data::String(s) => s.as_str(),
            _ => "",
        }
    }

    pub fn as_blob(&self) -> &[u8] {
        match &self.data {
            Data::Blob(b) => b.as_slice(),
            _ => &[],
        }
    }

    pub fn as_list(&self) -> &[Value] {
        match &self.data {
            Data::List(l) => l.as_slice(),
            _ => &[],
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match &self.data {
            Data::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_imap(&self) -> Option<&IMap> {
        match &self.data {
            Data::IMap(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match &self.data {
            Data::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn count(&self) -> usize {
        match &self.data {
            Data::List(l) => l.len(),
            Data::Map(m) => m.len(),
            Data::IMap(m) => m.len(),
            Data::Array(a) => a.elements.len(),
            Data::String(s) => s.len(),
            Data::Blob(b) => b.len(),
            _ => 0,
        }
    }

    // --- container access --------------------------------------------------

    pub fn at_index(&self, ix: usize) -> Value {
        match &self.data {
            Data::List(l) => l.get(ix).cloned().unwrap_or_else(Value::invalid),
            Data::Array(a) => a.elements.get(ix).cloned().unwrap_or_else(Value::invalid),
            _ => Value::invalid(),
        }
    }

    pub fn at_key(&self, key: &str) -> Value {
        match &self.data {
            Data::Map(m) => m.get(&key.to_string()).cloned().unwrap_or_else(Value::invalid),
            _ => Value::invalid(),
        }
    }

    pub fn at_ikey(&self, key: u32) -> Value {
        match &self.data {
            Data::IMap(m) => m.get(&key).cloned().unwrap_or_else(Value::invalid),
            _ => Value::invalid(),
        }
    }

    /// Extends a `List` with `Null`s up to `ix` if needed, then overwrites.
    pub fn set_index(&mut self, ix: usize, val: Value) {
        if let Data::List(l) = &mut self.data {
            if ix >= l.len() {
                l.resize_with(ix + 1, Value::null);
            }
            l[ix] = val;
        }
    }

    pub fn set_key(&mut self, key: impl Into<String>, val: Value) {
        if let Data::Map(m) = &mut self.data {
            m.insert(key.into(), val);
        }
    }

    pub fn set_ikey(&mut self, key: u32, val: Value) {
        if let Data::IMap(m) = &mut self.data {
            m.insert(key, val);
        }
    }

    pub fn append(&mut self, val: Value) {
        if let Data::List(l) = &mut self.data {
            l.push(val);
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.meta == other.meta
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::invalid()
    }
}

/// Renders as Cpon text, mirroring `RpcValue::toStdString()`. Used at the
/// ambient logging call sites in `rpc::framing`, not by either wire codec
/// itself.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cpon_string())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::null()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::from_data(Data::Bool(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::from_data(Data::Int(v as i64))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::from_data(Data::Int(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::from_data(Data::UInt(v as u64))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::from_data(Data::UInt(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::from_data(Data::Double(v))
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::from_data(Data::Decimal(v))
    }
}

impl From<DateTime> for Value {
    fn from(v: DateTime) -> Self {
        Value::from_data(Data::DateTime(v))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::from_data(Data::Blob(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::from_data(Data::String(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::from_data(Data::String(v.to_owned()))
    }
}

impl From<List> for Value {
    fn from(v: List) -> Self {
        Value::from_data(Data::List(v))
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::from_data(Data::Map(v))
    }
}

impl From<IMap> for Value {
    fn from(v: IMap) -> Self {
        Value::from_data(Data::IMap(v))
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Value::from_data(Data::Array(v))
    }
}

/// Constructors exposed internally by the codecs to build a `Value` of a
/// given `Data` variant without going through `From` (used for UInt/Int/List
/// etc. produced while decoding).
pub(crate) mod build {
    use super::*;

    pub fn null() -> Value {
        Value::from_data(Data::Null)
    }
    pub fn bool_(b: bool) -> Value {
        Value::from_data(Data::Bool(b))
    }
    pub fn int(n: i64) -> Value {
        Value::from_data(Data::Int(n))
    }
    pub fn uint(n: u64) -> Value {
        Value::from_data(Data::UInt(n))
    }
    pub fn double(n: f64) -> Value {
        Value::from_data(Data::Double(n))
    }
    pub fn decimal(d: Decimal) -> Value {
        Value::from_data(Data::Decimal(d))
    }
    pub fn date_time(dt: DateTime) -> Value {
        Value::from_data(Data::DateTime(dt))
    }
    pub fn blob(b: Vec<u8>) -> Value {
        Value::from_data(Data::Blob(b))
    }
    pub fn string(s: String) -> Value {
        Value::from_data(Data::String(s))
    }
    pub fn list(l: List) -> Value {
        Value::from_data(Data::List(l))
    }
    pub fn map(m: Map) -> Value {
        Value::from_data(Data::Map(m))
    }
    pub fn imap(m: IMap) -> Value {
        Value::from_data(Data::IMap(m))
    }
    pub fn array(a: Array) -> Value {
        Value::from_data(Data::Array(a))
    }
}

/// `element_type` guessing for templated array construction.
pub trait GuessElementType {
    fn element_type() -> ElementType;
}

macro_rules! impl_guess {
    ($t:ty, $variant:ident) => {
        impl GuessElementType for $t {
            fn element_type() -> ElementType {
                ElementType::$variant
            }
        }
    };
}

impl_guess!(i64, Int);
impl_guess!(u64, UInt);
impl_guess!(bool, Bool);
impl_guess!(DateTime, DateTime);
impl_guess!(Decimal, Decimal);
impl_guess!(f64, Double);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_invalid_marker() {
        let d = Decimal::new(0, 2);
        assert!(!d.is_valid());
        let d = Decimal::new(0, 0);
        assert!(d.is_valid());
    }

    #[test]
    fn decimal_round_trip_double() {
        let d = Decimal::new(1224, 2);
        assert!((d.to_double() - 12.24).abs() < 1e-9);
    }

    #[test]
    fn ordered_map_preserves_insertion_order_and_overwrites() {
        let mut m: Map = OrderedMap::new();
        m.insert("b".to_string(), Value::from(1i64));
        m.insert("a".to_string(), Value::from(2i64));
        m.insert("b".to_string(), Value::from(3i64));
        let keys: Vec<_> = m.keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(m.get(&"b".to_string()).unwrap().as_int(), 3);
    }

    #[test]
    fn meta_data_round_trips_through_value() {
        let mut v = Value::from(42i64);
        v.set_meta_value_i(8, Value::from(1i64));
        v.set_meta_value_s("shvPath", Value::from("foo/bar"));
        assert_eq!(v.meta_value_i(8).unwrap().as_int(), 1);
        assert_eq!(v.meta_value_s("shvPath").unwrap().as_str(), "foo/bar");
    }

    #[test]
    fn equality_is_structural_and_meta_inclusive() {
        let a = Value::from(1i64);
        let mut b = Value::from(1i64);
        assert_eq!(a, b);
        b.set_meta_value_i(1, Value::from(2i64));
        assert_ne!(a, b);
    }

    #[test]
    fn array_from_values_guesses_element_type_from_t() {
        let a = Array::from_values(vec![1i64, -2, 3]);
        assert_eq!(a.element_type, ElementType::Int);
        assert_eq!(a.elements.len(), 3);
        assert_eq!(a.elements[1].as_int(), -2);

        let a = Array::from_values(vec![true, false]);
        assert_eq!(a.element_type, ElementType::Bool);
    }
}
