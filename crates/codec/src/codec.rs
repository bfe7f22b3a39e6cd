//! The codec interface shared by leaf and composite codecs

use crate::context::SerializationContext;
use crate::stream::{StreamReader, StreamWriter};
use crate::value::Value;
use aoproto_core::Result;
use std::fmt;
use std::sync::Arc;

/// Paired encode/decode routine for one wire type
pub trait Codec: Send + Sync + fmt::Debug {
    /// Name of the type this codec handles
    fn name(&self) -> &str;

    fn encode(&self, writer: &mut StreamWriter, ctx: &mut SerializationContext<'_>, value: &Value) -> Result<()>;

    fn decode(&self, reader: &mut StreamReader, ctx: &mut SerializationContext<'_>) -> Result<Value>;
}

pub type CodecRef = Arc<dyn Codec>;
