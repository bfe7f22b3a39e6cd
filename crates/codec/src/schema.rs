//! Field descriptors and schema introspection
//!
//! A record type declares its wire layout by implementing [`WireRecord`]. The
//! declaration is collected level by level: the root ancestor first, then each
//! descendant. [`SchemaIntrospector::describe`] orders every level by its
//! declared order values and concatenates the levels ancestor-first, so base
//! fields always land on the wire before derived ones.
//!
//! ```rust,ignore
//! impl WireRecord for OrgClientMessage {
//!     const NAME: &'static str = "OrgClientMessage";
//!
//!     fn declare(schema: &mut SchemaBuilder<Self>) {
//!         schema.extends(|m| &m.n3, |m| &mut m.n3);
//!         schema.field(0, "command", |m| &m.command, |m| &mut m.command);
//!         schema
//!             .field(3, "command_args", |m| &m.command_args, |m| &mut m.command_args)
//!             .prefix(LengthPrefix::U16)
//!             .present_when(Presence::field("command").equals_any([0, 5, 13]));
//!     }
//! }
//! ```

use crate::desc::TypeDesc;
use crate::value::{Value, WireType};
use aoproto_core::{CodecError, LengthPrefix, Result};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A record type with a declared wire layout
pub trait WireRecord: Default + Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    const NAME: &'static str;

    fn declare(schema: &mut SchemaBuilder<Self>);
}

/// Sub-range of a flags register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRange {
    pub shift: u8,
    pub width: u8,
}

impl BitRange {
    pub const fn new(shift: u8, width: u8) -> Self {
        Self { shift, width }
    }

    /// A single-bit flag
    pub const fn bit(index: u8) -> Self {
        Self::new(index, 1)
    }

    /// Mask of the range before shifting
    pub fn mask(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// Mask of the range in register position
    pub fn register_mask(&self) -> u64 {
        self.mask().checked_shl(self.shift as u32).unwrap_or(0)
    }

    pub fn end(&self) -> u16 {
        self.shift as u16 + self.width as u16
    }

    pub fn extract(&self, register: u64) -> u64 {
        register.checked_shr(self.shift as u32).unwrap_or(0) & self.mask()
    }

    /// Replace this range of `register` with `value`
    pub fn insert(&self, register: u64, value: u64) -> u64 {
        let placed = (value & self.mask()).checked_shl(self.shift as u32).unwrap_or(0);
        (register & !self.register_mask()) | placed
    }

    pub fn overlaps(&self, other: &BitRange) -> bool {
        self.register_mask() & other.register_mask() != 0
    }
}

/// Role of a field in a flags group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagsRole {
    /// Occupies the wire position of the group's integer. With a bit range the
    /// carrier's own value is that range; without one it is the whole register.
    Carrier {
        group: &'static str,
        bits: Option<BitRange>,
    },
    /// Packs its value into the group's register and emits nothing itself
    Contributor { group: &'static str, bits: BitRange },
}

impl FlagsRole {
    pub fn group(&self) -> &'static str {
        match self {
            Self::Carrier { group, .. } | Self::Contributor { group, .. } => group,
        }
    }
}

/// What a presence condition looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceSource {
    /// Value of an earlier sibling field
    Field(&'static str),
    /// Register value of a flags group whose carrier has already been processed
    Group(&'static str),
}

type PresenceTest = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Condition under which a field is on the wire at all
#[derive(Clone)]
pub struct Presence {
    source: PresenceSource,
    test: PresenceTest,
    description: String,
}

/// Half-built presence condition: the source is chosen, the test is not
pub struct PresenceSubject {
    source: PresenceSource,
}

impl Presence {
    /// Condition on an earlier, unconditional sibling field
    ///
    /// The encoder tests the sibling's value on the source record while the
    /// decoder tests the value it just read, so a sibling that may itself be
    /// absent is rejected when the codec is built.
    pub fn field(name: &'static str) -> PresenceSubject {
        PresenceSubject {
            source: PresenceSource::Field(name),
        }
    }

    pub fn group(name: &'static str) -> PresenceSubject {
        PresenceSubject {
            source: PresenceSource::Group(name),
        }
    }

    pub fn source(&self) -> PresenceSource {
        self.source
    }

    pub fn evaluate(&self, value: &Value) -> bool {
        (self.test)(value)
    }
}

impl fmt::Debug for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Presence({:?} {})", self.source, self.description)
    }
}

impl PresenceSubject {
    /// Present when the source equals any of `values`
    pub fn equals_any(self, values: impl IntoIterator<Item = i64>) -> Presence {
        let values: Vec<i64> = values.into_iter().collect();
        let description = format!("in {:?}", values);
        self.build(description, move |v| v.as_int().map_or(false, |v| values.contains(&v)))
    }

    /// Present unless the source equals one of `values`
    pub fn not_equals_any(self, values: impl IntoIterator<Item = i64>) -> Presence {
        let values: Vec<i64> = values.into_iter().collect();
        let description = format!("not in {:?}", values);
        self.build(description, move |v| v.as_int().map_or(true, |v| !values.contains(&v)))
    }

    /// Present when every bit of `mask` is set in the source
    pub fn bits_set(self, mask: u64) -> Presence {
        let description = format!("has bits {:#x}", mask);
        self.build(description, move |v| {
            v.as_int().map_or(false, |v| (v as u64) & mask == mask)
        })
    }

    /// Present when `test` holds for the source value
    pub fn matches<F>(self, test: F) -> Presence
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.build("matches custom predicate".into(), test)
    }

    fn build<F>(self, description: String, test: F) -> Presence
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Presence {
            source: self.source,
            test: Arc::new(test),
            description,
        }
    }
}

type Reader<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;
type Writer<T> = Arc<dyn Fn(&mut T, Value) -> Result<()> + Send + Sync>;

/// Schema of a single field
///
/// Carries the declared type and wire metadata plus typed accessors used by the
/// generic encode/decode loop.
pub struct FieldDescriptor<T> {
    order: i32,
    name: &'static str,
    ty: TypeDesc,
    role: Option<FlagsRole>,
    presence: Option<Presence>,
    level: &'static str,
    invalid: Option<String>,
    read: Reader<T>,
    write: Writer<T>,
}

impl<T> Clone for FieldDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            order: self.order,
            name: self.name,
            ty: self.ty.clone(),
            role: self.role.clone(),
            presence: self.presence.clone(),
            level: self.level,
            invalid: self.invalid.clone(),
            read: Arc::clone(&self.read),
            write: Arc::clone(&self.write),
        }
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("order", &self.order)
            .field("name", &self.name)
            .field("type", &self.ty)
            .field("role", &self.role)
            .field("presence", &self.presence)
            .field("level", &self.level)
            .finish()
    }
}

impl<T: 'static> FieldDescriptor<T> {
    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_desc(&self) -> &TypeDesc {
        &self.ty
    }

    pub fn flags_role(&self) -> Option<&FlagsRole> {
        self.role.as_ref()
    }

    pub fn presence(&self) -> Option<&Presence> {
        self.presence.as_ref()
    }

    /// Name of the type level that declared this field
    pub fn declared_in(&self) -> &'static str {
        self.level
    }

    /// Group this field carries on the wire, if any
    pub fn carrier_of(&self) -> Option<&'static str> {
        match self.role {
            Some(FlagsRole::Carrier { group, .. }) => Some(group),
            _ => None,
        }
    }

    /// Group this field packs its value into, if any
    pub fn contributes_to(&self) -> Option<&'static str> {
        match self.role {
            Some(FlagsRole::Contributor { group, .. }) => Some(group),
            _ => None,
        }
    }

    /// Contributors never emit bytes of their own
    pub fn is_wire_emitting(&self) -> bool {
        self.contributes_to().is_none()
    }

    pub(crate) fn invalid_reason(&self) -> Option<&str> {
        self.invalid.as_deref()
    }

    pub fn read(&self, target: &T) -> Value {
        (self.read)(target)
    }

    pub fn write(&self, target: &mut T, value: Value) -> Result<()> {
        (self.write)(target, value)
    }

    /// Mark this field as the carrier of `group`
    pub fn carrier(&mut self, group: &'static str) -> &mut Self {
        self.set_role(FlagsRole::Carrier { group, bits: None })
    }

    /// Mark this field as the carrier of `group`, owning `bits` of the register itself
    pub fn carrier_bits(&mut self, group: &'static str, bits: BitRange) -> &mut Self {
        self.set_role(FlagsRole::Carrier {
            group,
            bits: Some(bits),
        })
    }

    /// Pack this field into `bits` of `group`'s register
    pub fn contributes(&mut self, group: &'static str, bits: BitRange) -> &mut Self {
        self.set_role(FlagsRole::Contributor { group, bits })
    }

    pub fn present_when(&mut self, presence: Presence) -> &mut Self {
        if self.presence.is_some() {
            self.invalid = Some("declares more than one presence condition".into());
        }
        self.presence = Some(presence);
        self
    }

    /// Override the length prefix of a text, byte block or list field
    pub fn prefix(&mut self, prefix: LengthPrefix) -> &mut Self {
        match self.ty.with_prefix(prefix) {
            Some(ty) => self.ty = ty,
            None => {
                self.invalid = Some(format!("{:?} prefix is not valid for {}", prefix, self.ty));
            }
        }
        self
    }

    /// Override the length prefix of a list field's elements
    pub fn element_prefix(&mut self, prefix: LengthPrefix) -> &mut Self {
        let updated = match &self.ty {
            TypeDesc::List { element, prefix: outer } => element.with_prefix(prefix).map(|element| {
                TypeDesc::List {
                    element: Box::new(element),
                    prefix: *outer,
                }
            }),
            _ => None,
        };
        match updated {
            Some(ty) => self.ty = ty,
            None => {
                self.invalid = Some(format!("{:?} element prefix is not valid for {}", prefix, self.ty));
            }
        }
        self
    }

    fn set_role(&mut self, role: FlagsRole) -> &mut Self {
        if self.role.is_some() {
            self.invalid = Some("declares more than one flags role".into());
        }
        self.role = Some(role);
        self
    }

    /// Re-target this descriptor at a type that embeds `T`
    fn project<D: 'static>(
        self,
        lens: Arc<dyn Fn(&D) -> &T + Send + Sync>,
        lens_mut: Arc<dyn Fn(&mut D) -> &mut T + Send + Sync>,
    ) -> FieldDescriptor<D> {
        let read = self.read;
        let write = self.write;
        FieldDescriptor {
            order: self.order,
            name: self.name,
            ty: self.ty,
            role: self.role,
            presence: self.presence,
            level: self.level,
            invalid: self.invalid,
            read: Arc::new(move |outer: &D| read(lens(outer))),
            write: Arc::new(move |outer: &mut D, value| write(lens_mut(outer), value)),
        }
    }
}

/// Fields declared by one type in an inheritance chain
#[derive(Debug)]
struct SchemaLevel<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
}

/// Collects the declaration of a record type
pub struct SchemaBuilder<T> {
    ancestors: Vec<SchemaLevel<T>>,
    own: SchemaLevel<T>,
    errors: Vec<String>,
}

impl<T: 'static> SchemaBuilder<T> {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            ancestors: Vec::new(),
            own: SchemaLevel {
                type_name,
                fields: Vec::new(),
            },
            errors: Vec::new(),
        }
    }

    /// Inherit the full declaration of `P`, which `T` embeds
    ///
    /// Must be called once, before any field of this level is declared.
    pub fn extends<P, L, M>(&mut self, lens: L, lens_mut: M) -> &mut Self
    where
        P: WireRecord,
        L: Fn(&T) -> &P + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut P + Send + Sync + 'static,
    {
        if !self.ancestors.is_empty() {
            self.errors.push(format!("extends more than one base ({})", P::NAME));
            return self;
        }
        if !self.own.fields.is_empty() {
            self.errors
                .push(format!("extends {} after declaring its own fields", P::NAME));
            return self;
        }

        let mut parent = SchemaBuilder::<P>::new(P::NAME);
        P::declare(&mut parent);

        let lens: Arc<dyn Fn(&T) -> &P + Send + Sync> = Arc::new(lens);
        let lens_mut: Arc<dyn Fn(&mut T) -> &mut P + Send + Sync> = Arc::new(lens_mut);

        self.errors.extend(parent.errors);
        for level in parent.ancestors.into_iter().chain(std::iter::once(parent.own)) {
            let fields = level
                .fields
                .into_iter()
                .map(|field| field.project(Arc::clone(&lens), Arc::clone(&lens_mut)))
                .collect();
            self.ancestors.push(SchemaLevel {
                type_name: level.type_name,
                fields,
            });
        }
        self
    }

    /// Declare a field of this level at wire `order`
    pub fn field<F, G, M>(&mut self, order: i32, name: &'static str, get: G, get_mut: M) -> &mut FieldDescriptor<T>
    where
        F: WireType,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        let descriptor = FieldDescriptor {
            order,
            name,
            ty: F::type_desc(),
            role: None,
            presence: None,
            level: self.own.type_name,
            invalid: None,
            read: Arc::new(move |target: &T| get(target).to_value()),
            write: Arc::new(move |target: &mut T, value| {
                *get_mut(target) = F::from_value(value)?;
                Ok(())
            }),
        };
        self.own.fields.push(descriptor);
        let last = self.own.fields.len() - 1;
        &mut self.own.fields[last]
    }

    pub(crate) fn finish(self) -> Result<TypeSchema<T>> {
        let type_name = self.own.type_name;
        if let Some(error) = self.errors.into_iter().next() {
            return Err(CodecError::schema(type_name, error));
        }

        let mut fields = Vec::new();
        for mut level in self.ancestors.into_iter().chain(std::iter::once(self.own)) {
            let mut names = HashSet::new();
            for field in &level.fields {
                if !names.insert(field.name) {
                    return Err(CodecError::schema(
                        type_name,
                        format!("{} declares field '{}' twice", level.type_name, field.name),
                    ));
                }
                if let Some(reason) = field.invalid_reason() {
                    return Err(CodecError::schema(
                        type_name,
                        format!("{}.{} {}", level.type_name, field.name, reason),
                    ));
                }
            }
            // Stable: equal orders keep declaration order
            level.fields.sort_by_key(|field| field.order);
            fields.extend(level.fields.into_iter().map(Arc::new));
        }

        Ok(TypeSchema { type_name, fields })
    }
}

/// Ordered field descriptors of one concrete type
pub struct TypeSchema<T> {
    type_name: &'static str,
    fields: Vec<Arc<FieldDescriptor<T>>>,
}

impl<T: 'static> TypeSchema<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[Arc<FieldDescriptor<T>>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Wire position of the last field named `name` before `before`
    pub fn position_before(&self, name: &str, before: usize) -> Option<usize> {
        self.fields[..before.min(self.fields.len())]
            .iter()
            .rposition(|field| field.name() == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name() == name)
    }

    /// Field names in wire order
    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|field| field.name()).collect()
    }
}

impl<T> fmt::Debug for TypeSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSchema")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Produces the ordered field list of a record type
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    pub fn describe<T: WireRecord>() -> Result<TypeSchema<T>> {
        let mut builder = SchemaBuilder::new(T::NAME);
        T::declare(&mut builder);
        builder.finish()
    }
}
