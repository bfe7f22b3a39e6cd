//! Forward-only primitive streams
//!
//! [`StreamWriter`] and [`StreamReader`] are the only things that touch raw
//! bytes. Every read checks the remaining length first, so a short buffer
//! surfaces as [`CodecError::TruncatedStream`] instead of a panic.

use aoproto_core::{ByteOrder, CodecError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

macro_rules! write_fixed {
    ($name:ident, $ty:ty, $be:ident, $le:ident) => {
        #[inline]
        pub fn $name(&mut self, val: $ty) {
            match self.order {
                ByteOrder::Big => self.buf.$be(val),
                ByteOrder::Little => self.buf.$le(val),
            }
        }
    };
}

macro_rules! read_fixed {
    ($name:ident, $ty:ty, $be:ident, $le:ident) => {
        #[inline]
        pub fn $name(&mut self) -> Result<$ty> {
            self.ensure(std::mem::size_of::<$ty>())?;
            Ok(match self.order {
                ByteOrder::Big => self.buf.$be(),
                ByteOrder::Little => self.buf.$le(),
            })
        }
    };
}

/// Sequential writer over a growable buffer
#[derive(Debug)]
pub struct StreamWriter {
    buf: BytesMut,
    order: ByteOrder,
}

impl StreamWriter {
    pub fn new(order: ByteOrder) -> Self {
        Self::with_capacity(order, 64)
    }

    pub fn with_capacity(order: ByteOrder, capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            order,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    #[inline]
    pub fn write_u8(&mut self, val: u8) {
        self.buf.put_u8(val);
    }

    #[inline]
    pub fn write_i8(&mut self, val: i8) {
        self.buf.put_i8(val);
    }

    #[inline]
    pub fn write_bool(&mut self, val: bool) {
        self.buf.put_u8(val as u8);
    }

    write_fixed!(write_u16, u16, put_u16, put_u16_le);
    write_fixed!(write_i16, i16, put_i16, put_i16_le);
    write_fixed!(write_u32, u32, put_u32, put_u32_le);
    write_fixed!(write_i32, i32, put_i32, put_i32_le);
    write_fixed!(write_u64, u64, put_u64, put_u64_le);
    write_fixed!(write_i64, i64, put_i64, put_i64_le);
    write_fixed!(write_f32, f32, put_f32, put_f32_le);

    /// Write a raw byte block with no length information
    #[inline]
    pub fn write_bytes(&mut self, val: &[u8]) {
        self.buf.put_slice(val);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Sequential reader over an immutable buffer
#[derive(Debug)]
pub struct StreamReader {
    buf: Bytes,
    order: ByteOrder,
}

impl StreamReader {
    pub fn new(data: impl Into<Bytes>, order: ByteOrder) -> Self {
        Self {
            buf: data.into(),
            order,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(CodecError::TruncatedStream {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    #[inline]
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    read_fixed!(read_u16, u16, get_u16, get_u16_le);
    read_fixed!(read_i16, i16, get_i16, get_i16_le);
    read_fixed!(read_u32, u32, get_u32, get_u32_le);
    read_fixed!(read_i32, i32, get_i32, get_i32_le);
    read_fixed!(read_u64, u64, get_u64, get_u64_le);
    read_fixed!(read_i64, i64, get_i64, get_i64_le);
    read_fixed!(read_f32, f32, get_f32, get_f32_le);

    /// Read exactly `len` raw bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    /// Read bytes up to and including the next zero byte, returning them without the terminator
    pub fn read_until_nul(&mut self) -> Result<Bytes> {
        match self.buf.iter().position(|&b| b == 0) {
            Some(end) => {
                let bytes = self.buf.copy_to_bytes(end);
                self.buf.advance(1);
                Ok(bytes)
            }
            None => Err(CodecError::TruncatedStream {
                needed: self.buf.remaining() + 1,
                remaining: self.buf.remaining(),
            }),
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_eof(&self) -> bool {
        !self.buf.has_remaining()
    }
}
