//! Type codec builder
//!
//! Turns a [`TypeSchema`] into an encode routine and a decode routine. Both are
//! driven by the same compiled plan: one step per field descriptor, with every
//! codec, flags role and presence condition resolved up front. Schema mistakes
//! surface here, once, as build errors; the routines themselves only ever fail
//! on data.
//!
//! Flags groups
//! ------------
//! A group has exactly one carrier and any number of contributors. On encode
//! the contributors declared before the carrier merge their value into the
//! group register at their own position; the carrier merges its own value and
//! any later contributors, then writes the register. On decode the carrier
//! reads the register and assigns it back to every earlier contributor; later
//! contributors extract their bits when they are reached.

use crate::codec::{Codec, CodecRef};
use crate::context::SerializationContext;
use crate::desc::{IntRepr, TypeDesc};
use crate::resolver::CodecResolver;
use crate::schema::{BitRange, FieldDescriptor, FlagsRole, Presence, PresenceSource, SchemaIntrospector, TypeSchema, WireRecord};
use crate::stream::{StreamReader, StreamWriter};
use crate::value::Value;
use aoproto_core::{CodecError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Build the codec of a record type from its declared schema
pub fn build_record<T: WireRecord>(resolver: &CodecResolver) -> Result<CodecRef> {
    let schema = SchemaIntrospector::describe::<T>()?;
    TypeCodecBuilder::new(resolver).build(&schema)
}

enum Action {
    /// Encode and decode through a resolved codec
    Wire(CodecRef),
    Contribute {
        group: &'static str,
        bits: BitRange,
        signed: bool,
        carrier: usize,
    },
    Carry {
        group: &'static str,
        repr: IntRepr,
        bits: Option<BitRange>,
        codec: CodecRef,
        /// Contributors that come before the carrier
        earlier: Vec<usize>,
        /// Contributors that come after the carrier
        later: Vec<usize>,
    },
}

enum Condition {
    Sibling { index: usize, presence: Presence },
    Group { group: &'static str, presence: Presence },
}

struct Step<T> {
    field: Arc<FieldDescriptor<T>>,
    action: Action,
    condition: Option<Condition>,
}

/// Compiled per-field program of one record type
pub struct Plan<T> {
    type_name: &'static str,
    steps: Vec<Step<T>>,
}

impl<T> Plan<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<T> fmt::Debug for Plan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("type_name", &self.type_name)
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl<T: 'static> Plan<T> {
    fn is_present(&self, step: &Step<T>, target: &T, ctx: &SerializationContext<'_>) -> bool {
        match &step.condition {
            None => true,
            Some(Condition::Sibling { index, presence }) => {
                presence.evaluate(&self.steps[*index].field.read(target))
            }
            Some(Condition::Group { group, presence }) => {
                let register = ctx.group(group).map_or(Value::Null, |r| Value::Int(r as i64));
                presence.evaluate(&register)
            }
        }
    }

    /// Merge a contributor's current value into its group register
    fn contribute(&self, index: usize, source: &T, ctx: &mut SerializationContext<'_>) -> Result<()> {
        let step = &self.steps[index];
        if let Action::Contribute { group, bits, signed, .. } = step.action {
            let value = step.field.read(source).expect_int(step.field.name())?;
            let raw = pack(value, bits.width, signed, step.field.name())?;
            ctx.merge_group(group, raw, Some(bits));
        }
        Ok(())
    }

    /// Assign a contributor's bits of `register` back to the record
    fn assign(&self, index: usize, target: &mut T, register: u64) -> Result<()> {
        let step = &self.steps[index];
        if let Action::Contribute { bits, signed, .. } = step.action {
            let raw = bits.extract(register);
            let value = if signed { sign_extend(raw, bits.width) } else { raw as i64 };
            step.field.write(target, Value::Int(value))?;
        }
        Ok(())
    }
}

/// Encode routine of a record type
pub struct RecordEncoder<T> {
    plan: Arc<Plan<T>>,
}

impl<T: 'static> RecordEncoder<T> {
    pub fn encode(&self, writer: &mut StreamWriter, ctx: &mut SerializationContext<'_>, source: &T) -> Result<()> {
        let plan = &*self.plan;
        for (index, step) in plan.steps.iter().enumerate() {
            if !plan.is_present(step, source, ctx) {
                trace!("{}.{} absent, skipped", plan.type_name, step.field.name());
                continue;
            }

            match &step.action {
                Action::Wire(codec) => codec.encode(writer, ctx, &step.field.read(source))?,
                Action::Contribute { carrier, .. } => {
                    // Later contributors are merged by their carrier
                    if index < *carrier {
                        plan.contribute(index, source, ctx)?;
                    }
                }
                Action::Carry {
                    group,
                    repr,
                    bits,
                    codec,
                    later,
                    ..
                } => {
                    let own = step.field.read(source).expect_int(step.field.name())?;
                    match bits {
                        Some(range) => {
                            let raw = pack(own, range.width, repr.is_signed(), step.field.name())?;
                            ctx.merge_group(*group, raw, Some(*range));
                        }
                        None => {
                            ctx.merge_group(*group, own as u64 & repr.mask(), None);
                        }
                    }
                    for &contributor in later {
                        plan.contribute(contributor, source, ctx)?;
                    }
                    let register = ctx.group(group).unwrap_or(0);
                    codec.encode(writer, ctx, &Value::Int(register_value(register, *repr)))?;
                }
            }
        }
        Ok(())
    }
}

/// Decode routine of a record type
pub struct RecordDecoder<T> {
    plan: Arc<Plan<T>>,
}

impl<T: Default + 'static> RecordDecoder<T> {
    pub fn decode(&self, reader: &mut StreamReader, ctx: &mut SerializationContext<'_>) -> Result<T> {
        let plan = &*self.plan;
        let mut target = T::default();
        for (index, step) in plan.steps.iter().enumerate() {
            if !plan.is_present(step, &target, ctx) {
                trace!("{}.{} absent, left at default", plan.type_name, step.field.name());
                continue;
            }

            match &step.action {
                Action::Wire(codec) => {
                    let value = codec.decode(reader, ctx)?;
                    step.field.write(&mut target, value)?;
                }
                Action::Contribute { group, carrier, .. } => {
                    // Earlier contributors are assigned by their carrier
                    if index > *carrier {
                        let register = ctx.group(group).unwrap_or(0);
                        plan.assign(index, &mut target, register)?;
                    }
                }
                Action::Carry {
                    group,
                    repr,
                    bits,
                    codec,
                    earlier,
                    ..
                } => {
                    let wire = codec.decode(reader, ctx)?;
                    let register = wire.expect_int(step.field.name())? as u64 & repr.mask();
                    ctx.set_group(*group, register);

                    let own = match bits {
                        Some(range) if repr.is_signed() => sign_extend(range.extract(register), range.width),
                        Some(range) => range.extract(register) as i64,
                        None => register_value(register, *repr),
                    };
                    step.field.write(&mut target, Value::Int(own))?;
                    for &contributor in earlier {
                        plan.assign(contributor, &mut target, register)?;
                    }
                }
            }
        }
        Ok(target)
    }
}

/// Codec of a record type, as cached by the resolver
pub struct RecordCodec<T> {
    name: &'static str,
    encoder: RecordEncoder<T>,
    decoder: RecordDecoder<T>,
}

impl<T> fmt::Debug for RecordCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCodec").field("name", &self.name).finish()
    }
}

impl<T: WireRecord> Codec for RecordCodec<T> {
    fn name(&self) -> &str {
        self.name
    }

    fn encode(&self, writer: &mut StreamWriter, ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()> {
        let record = value
            .as_record::<T>()
            .ok_or_else(|| CodecError::mismatch(self.name, value.kind()))?;
        ctx.enter_record();
        let result = self.encoder.encode(writer, ctx, record);
        ctx.leave_record();
        result
    }

    fn decode(&self, reader: &mut StreamReader, ctx: &mut SerializationContext<'_>) -> Result<Value> {
        ctx.enter_record();
        let result = self.decoder.decode(reader, ctx);
        ctx.leave_record();
        result.map(Value::record)
    }
}

/// Compiles schemas into record codecs, resolving field codecs through a resolver
pub struct TypeCodecBuilder<'r> {
    resolver: &'r CodecResolver,
}

impl<'r> TypeCodecBuilder<'r> {
    pub fn new(resolver: &'r CodecResolver) -> Self {
        Self { resolver }
    }

    pub fn build_encoder<T: WireRecord>(&self, schema: &TypeSchema<T>) -> Result<RecordEncoder<T>> {
        Ok(RecordEncoder {
            plan: self.compile(schema)?,
        })
    }

    pub fn build_decoder<T: WireRecord>(&self, schema: &TypeSchema<T>) -> Result<RecordDecoder<T>> {
        Ok(RecordDecoder {
            plan: self.compile(schema)?,
        })
    }

    /// Encoder and decoder sharing one plan, wrapped as a codec
    pub fn build<T: WireRecord>(&self, schema: &TypeSchema<T>) -> Result<CodecRef> {
        let plan = self.compile(schema)?;
        Ok(Arc::new(RecordCodec::<T> {
            name: schema.type_name(),
            encoder: RecordEncoder { plan: Arc::clone(&plan) },
            decoder: RecordDecoder { plan },
        }))
    }

    /// Validate a schema and resolve every field codec
    pub fn compile<T: WireRecord>(&self, schema: &TypeSchema<T>) -> Result<Arc<Plan<T>>> {
        let type_name = schema.type_name();
        let fields = schema.fields();
        let carriers = find_carriers(schema)?;

        let mut contributors: HashMap<&'static str, Vec<usize>> = HashMap::new();
        let mut steps = Vec::with_capacity(fields.len());

        for (index, field) in fields.iter().enumerate() {
            let condition = match field.presence() {
                Some(presence) => Some(compile_condition(schema, &carriers, index, presence.clone())?),
                None => None,
            };

            let action = match field.flags_role().cloned() {
                Some(FlagsRole::Contributor { group, bits }) => {
                    let Some(&(carrier, carrier_repr)) = carriers.get(group) else {
                        return Err(CodecError::UnknownFlagsGroup {
                            type_name: type_name.to_string(),
                            field: field.name().to_string(),
                            group: group.to_string(),
                        });
                    };
                    if condition.is_some() {
                        return Err(CodecError::schema(
                            type_name,
                            format!("contributor '{}' cannot have a presence condition", field.name()),
                        ));
                    }
                    let repr = int_repr_of(type_name, field)?;
                    if bits.width == 0 || bits.end() > carrier_repr.bits() as u16 {
                        return Err(CodecError::schema(
                            type_name,
                            format!(
                                "bits {}..{} of '{}' do not fit the {}-bit register of group '{}'",
                                bits.shift,
                                bits.end(),
                                field.name(),
                                carrier_repr.bits(),
                                group
                            ),
                        ));
                    }
                    let claimed = contributors.entry(group).or_default();
                    for &other in claimed.iter() {
                        if let Some(FlagsRole::Contributor { bits: other_bits, .. }) = fields[other].flags_role() {
                            if bits.overlaps(other_bits) {
                                return Err(CodecError::schema(
                                    type_name,
                                    format!(
                                        "'{}' and '{}' overlap in group '{}'",
                                        fields[other].name(),
                                        field.name(),
                                        group
                                    ),
                                ));
                            }
                        }
                    }
                    claimed.push(index);
                    Action::Contribute {
                        group,
                        bits,
                        signed: repr.is_signed(),
                        carrier,
                    }
                }
                Some(FlagsRole::Carrier { group, bits }) => {
                    if condition.is_some() {
                        return Err(CodecError::schema(
                            type_name,
                            format!("carrier '{}' cannot have a presence condition", field.name()),
                        ));
                    }
                    let repr = int_repr_of(type_name, field)?;
                    if let Some(range) = bits {
                        if range.width == 0 || range.end() > repr.bits() as u16 {
                            return Err(CodecError::schema(
                                type_name,
                                format!("carrier bits of '{}' exceed its {}-bit type", field.name(), repr.bits()),
                            ));
                        }
                    }
                    // The register goes on the wire at the carrier's full width,
                    // whatever codec the field type itself would use
                    let register_desc = TypeDesc::Primitive(repr.primitive_name());
                    Action::Carry {
                        group,
                        repr,
                        bits,
                        codec: self.resolver.resolve_field(&register_desc, false)?,
                        earlier: Vec::new(),
                        later: Vec::new(),
                    }
                }
                None => {
                    let guarded = condition.is_some();
                    Action::Wire(self.resolver.resolve_field(field.type_desc(), guarded)?)
                }
            };

            steps.push(Step {
                field: Arc::clone(field),
                action,
                condition,
            });
        }

        // Hand each carrier its contributors, split around its own position
        for (group, members) in contributors {
            let (carrier, _) = carriers[group];
            let carrier_bits = match fields[carrier].flags_role() {
                Some(FlagsRole::Carrier { bits, .. }) => *bits,
                _ => None,
            };
            for &member in &members {
                if let (Some(own), Some(FlagsRole::Contributor { bits, .. })) =
                    (carrier_bits, fields[member].flags_role())
                {
                    if own.overlaps(bits) {
                        return Err(CodecError::schema(
                            type_name,
                            format!(
                                "'{}' overlaps the bits owned by carrier '{}'",
                                fields[member].name(),
                                fields[carrier].name()
                            ),
                        ));
                    }
                }
            }
            if let Action::Carry { earlier, later, .. } = &mut steps[carrier].action {
                earlier.extend(members.iter().copied().filter(|&m| m < carrier));
                later.extend(members.iter().copied().filter(|&m| m > carrier));
            }
        }

        debug!("Compiled {} with {} fields", type_name, steps.len());
        Ok(Arc::new(Plan { type_name, steps }))
    }
}

/// Locate the carrier of every group, rejecting duplicates
fn find_carriers<T: 'static>(schema: &TypeSchema<T>) -> Result<HashMap<&'static str, (usize, IntRepr)>> {
    let mut carriers = HashMap::new();
    for (index, field) in schema.fields().iter().enumerate() {
        if let Some(group) = field.carrier_of() {
            let repr = int_repr_of(schema.type_name(), field)?;
            if carriers.insert(group, (index, repr)).is_some() {
                return Err(CodecError::schema(
                    schema.type_name(),
                    format!("flags group '{}' has more than one carrier", group),
                ));
            }
        }
    }
    Ok(carriers)
}

fn compile_condition<T: 'static>(
    schema: &TypeSchema<T>,
    carriers: &HashMap<&'static str, (usize, IntRepr)>,
    index: usize,
    presence: Presence,
) -> Result<Condition> {
    let type_name = schema.type_name();
    let field = &schema.fields()[index];
    match presence.source() {
        PresenceSource::Field(name) => {
            let Some(sibling) = schema.position_before(name, index) else {
                return Err(CodecError::schema(
                    type_name,
                    format!("presence of '{}' depends on '{}', which is not an earlier field", field.name(), name),
                ));
            };
            // An absent sibling decodes as its default, which need not match
            // the value the encoder tested
            if schema.fields()[sibling].presence().is_some() {
                return Err(CodecError::schema(
                    type_name,
                    format!("presence of '{}' depends on '{}', which is itself conditional", field.name(), name),
                ));
            }
            // A contributor is only assigned on decode once its carrier is read
            if let Some(group) = schema.fields()[sibling].contributes_to() {
                if carriers.get(group).map_or(false, |&(carrier, _)| carrier > index) {
                    return Err(CodecError::schema(
                        type_name,
                        format!(
                            "presence of '{}' depends on '{}', whose carrier comes later",
                            field.name(),
                            name
                        ),
                    ));
                }
            }
            Ok(Condition::Sibling {
                index: sibling,
                presence,
            })
        }
        PresenceSource::Group(group) => match carriers.get(group) {
            None => Err(CodecError::UnknownFlagsGroup {
                type_name: type_name.to_string(),
                field: field.name().to_string(),
                group: group.to_string(),
            }),
            Some(&(carrier, _)) if carrier > index => Err(CodecError::schema(
                type_name,
                format!("presence of '{}' depends on group '{}', whose carrier comes later", field.name(), group),
            )),
            Some(_) => Ok(Condition::Group { group, presence }),
        },
    }
}

fn int_repr_of<T: 'static>(type_name: &str, field: &FieldDescriptor<T>) -> Result<IntRepr> {
    field.type_desc().int_repr().ok_or_else(|| {
        CodecError::schema(
            type_name,
            format!("flags field '{}' has non-integer type {}", field.name(), field.type_desc()),
        )
    })
}

/// Check that `value` fits `width` bits and return its raw bit pattern
fn pack(value: i64, width: u8, signed: bool, field: &str) -> Result<u64> {
    let fits = match (signed, width) {
        (_, 64) => true,
        (true, w) => {
            let half = 1i128 << (w - 1);
            (-half..half).contains(&(value as i128))
        }
        (false, w) => value >= 0 && (value as u64) >> w == 0,
    };
    if !fits {
        return Err(CodecError::InvalidData(format!(
            "{} does not fit the {} bits of '{}'",
            value, width, field
        )));
    }
    Ok(value as u64 & BitRange::new(0, width).mask())
}

fn sign_extend(raw: u64, width: u8) -> i64 {
    if width == 0 || width >= 64 {
        return raw as i64;
    }
    let shift = 64 - width as u32;
    ((raw << shift) as i64) >> shift
}

/// Register contents as the integer value of a field of width `repr`
fn register_value(register: u64, repr: IntRepr) -> i64 {
    let masked = register & repr.mask();
    if repr.is_signed() {
        sign_extend(masked, repr.bits())
    } else {
        masked as i64
    }
}
