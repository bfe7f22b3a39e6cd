//! Per-call serialization state

use crate::resolver::CodecResolver;
use crate::schema::BitRange;
use aoproto_config::CodecConfig;
use std::collections::HashMap;

type Registers = HashMap<&'static str, u64>;

/// Mutable state of a single encode or decode call
///
/// Holds the resolver for lookups made while the call is running and the flags
/// group registers. Each record being processed gets its own register frame, so
/// a nested record or list element never sees its parent's groups.
pub struct SerializationContext<'r> {
    resolver: &'r CodecResolver,
    frames: Vec<Registers>,
}

impl<'r> SerializationContext<'r> {
    pub fn new(resolver: &'r CodecResolver) -> Self {
        Self {
            resolver,
            frames: vec![Registers::new()],
        }
    }

    pub fn resolver(&self) -> &'r CodecResolver {
        self.resolver
    }

    pub fn config(&self) -> &'r CodecConfig {
        self.resolver.config()
    }

    /// Open a fresh register frame for a record
    pub fn enter_record(&mut self) {
        self.frames.push(Registers::new());
    }

    /// Drop the innermost record's registers
    pub fn leave_record(&mut self) {
        // The root frame lives as long as the context
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of records currently open
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    fn current(&mut self) -> &mut Registers {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn set_group(&mut self, name: &'static str, value: u64) {
        self.current().insert(name, value);
    }

    pub fn group(&self, name: &str) -> Option<u64> {
        self.frames.last().and_then(|frame| frame.get(name).copied())
    }

    /// Merge a contribution into a group register and return the new register
    ///
    /// With a bit range the contribution replaces that range; without one it is
    /// OR-ed into the whole register.
    pub fn merge_group(&mut self, name: &'static str, value: u64, bits: Option<BitRange>) -> u64 {
        let register = self.current().entry(name).or_insert(0);
        *register = match bits {
            Some(range) => range.insert(*register, value),
            None => *register | value,
        };
        *register
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_positional_and_or() {
        let resolver = CodecResolver::new();
        let mut ctx = SerializationContext::new(&resolver);

        assert_eq!(ctx.merge_group("g", 0b101, Some(BitRange::new(0, 3))), 0b101);
        assert_eq!(ctx.merge_group("g", 0b11, Some(BitRange::new(3, 2))), 0b11_101);
        assert_eq!(ctx.merge_group("g", 0x100, None), 0x100 | 0b11_101);
        // Positional assignment overwrites the range
        assert_eq!(ctx.merge_group("g", 0, Some(BitRange::new(0, 3))), 0x100 | 0b11_000);
        assert_eq!(ctx.group("g"), Some(0x100 | 0b11_000));
        assert_eq!(ctx.group("other"), None);
    }

    #[test]
    fn test_frames_are_isolated() {
        let resolver = CodecResolver::new();
        let mut ctx = SerializationContext::new(&resolver);
        ctx.set_group("g", 7);

        ctx.enter_record();
        assert_eq!(ctx.depth(), 1);
        assert_eq!(ctx.group("g"), None);
        ctx.set_group("g", 9);
        ctx.leave_record();

        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.group("g"), Some(7));

        // Leaving the root frame is a no-op
        ctx.leave_record();
        assert_eq!(ctx.group("g"), Some(7));
    }
}
