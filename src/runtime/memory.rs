//! Linear memory
//!
//! A single byte-addressable, bounds-checked mutable store per instance.
//! Every access validates its full byte range with overflow-safe arithmetic
//! before touching the data; an out-of-range access is a fault, never
//! undefined behavior. Multi-byte values are little-endian.

use super::{Fault, InstantiationError, Value};
use crate::ast::{AccessWidth, Segment, Sign, ValueType};
use std::convert::TryFrom;

/// A linear memory instance.
///
/// Size is fixed at instantiation; only the contents mutate.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a memory of `initial` bytes, zero-filled.
    pub fn new(initial: u32) -> Self {
        Memory {
            data: vec![0u8; initial as usize],
        }
    }

    /// Apply initialization segments in declaration order. Each segment's
    /// bytes are copied verbatim; a later segment overwrites any overlap
    /// with an earlier one.
    pub fn init(&mut self, segments: &[Segment]) -> Result<(), InstantiationError> {
        for segment in segments {
            let offset = segment.offset as usize;
            let end = offset
                .checked_add(segment.data.len())
                .filter(|&end| end <= self.data.len())
                .ok_or(InstantiationError::SegmentOutOfBounds {
                    offset: segment.offset,
                    len: segment.data.len(),
                    size: self.data.len(),
                })?;
            self.data[offset..end].copy_from_slice(&segment.data);
        }
        Ok(())
    }

    /// Current size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Coerce an already-evaluated address operand to an unsigned byte
    /// offset. Integer addresses reinterpret their bit pattern as unsigned;
    /// float addresses must be finite, non-negative whole-valued numbers.
    pub fn address(value: &Value) -> Result<u64, Fault> {
        match value {
            Value::I32(v) => Ok(*v as u32 as u64),
            Value::I64(v) => Ok(*v as u64),
            Value::F32(v) => float_address(f64::from(*v)),
            Value::F64(v) => float_address(*v),
        }
    }

    /// Typed load: read `kind` at `addr`. Integer loads narrower than the
    /// kind extend per `sign`; float loads are always natural width. Access
    /// widths the validator would reject (wider than the kind) read the
    /// kind's natural width.
    pub fn load(&self, addr: u64, width: AccessWidth, kind: ValueType, sign: Sign) -> Result<Value, Fault> {
        match kind {
            ValueType::I32 => {
                let v = match width {
                    AccessWidth::W8 => {
                        let b = self.read_bytes::<1>(addr)?[0];
                        match sign {
                            Sign::Signed => b as i8 as i32,
                            Sign::Unsigned => b as i32,
                        }
                    }
                    AccessWidth::W16 => {
                        let raw = u16::from_le_bytes(self.read_bytes::<2>(addr)?);
                        match sign {
                            Sign::Signed => raw as i16 as i32,
                            Sign::Unsigned => raw as i32,
                        }
                    }
                    _ => u32::from_le_bytes(self.read_bytes::<4>(addr)?) as i32,
                };
                Ok(Value::I32(v))
            }
            ValueType::I64 => {
                let v = match width {
                    AccessWidth::W8 => {
                        let b = self.read_bytes::<1>(addr)?[0];
                        match sign {
                            Sign::Signed => b as i8 as i64,
                            Sign::Unsigned => b as i64,
                        }
                    }
                    AccessWidth::W16 => {
                        let raw = u16::from_le_bytes(self.read_bytes::<2>(addr)?);
                        match sign {
                            Sign::Signed => raw as i16 as i64,
                            Sign::Unsigned => raw as i64,
                        }
                    }
                    AccessWidth::W32 => {
                        let raw = u32::from_le_bytes(self.read_bytes::<4>(addr)?);
                        match sign {
                            Sign::Signed => raw as i32 as i64,
                            Sign::Unsigned => raw as i64,
                        }
                    }
                    AccessWidth::W64 => u64::from_le_bytes(self.read_bytes::<8>(addr)?) as i64,
                };
                Ok(Value::I64(v))
            }
            ValueType::F32 => {
                let raw = u32::from_le_bytes(self.read_bytes::<4>(addr)?);
                Ok(Value::F32(f32::from_bits(raw)))
            }
            ValueType::F64 => {
                let raw = u64::from_le_bytes(self.read_bytes::<8>(addr)?);
                Ok(Value::F64(f64::from_bits(raw)))
            }
        }
    }

    /// Typed store: write `value` at `addr`, wrapping integers to `width`
    /// bytes. The value's kind must match the operation's declared kind.
    pub fn store(&mut self, addr: u64, width: AccessWidth, kind: ValueType, value: Value) -> Result<(), Fault> {
        if value.typ() != kind {
            return Err(Fault::TypeMismatch {
                operand: 1,
                expected: kind.to_string(),
                actual: value.typ(),
            });
        }
        match value {
            Value::I32(v) => match width {
                AccessWidth::W8 => self.write_bytes(addr, &(v as u8).to_le_bytes()),
                AccessWidth::W16 => self.write_bytes(addr, &(v as u16).to_le_bytes()),
                _ => self.write_bytes(addr, &(v as u32).to_le_bytes()),
            },
            Value::I64(v) => match width {
                AccessWidth::W8 => self.write_bytes(addr, &(v as u8).to_le_bytes()),
                AccessWidth::W16 => self.write_bytes(addr, &(v as u16).to_le_bytes()),
                AccessWidth::W32 => self.write_bytes(addr, &(v as u32).to_le_bytes()),
                AccessWidth::W64 => self.write_bytes(addr, &(v as u64).to_le_bytes()),
            },
            Value::F32(v) => self.write_bytes(addr, &v.to_bits().to_le_bytes()),
            Value::F64(v) => self.write_bytes(addr, &v.to_bits().to_le_bytes()),
        }
    }

    /// Validate that `addr..addr+len` lies inside the data, with overflow
    /// checks on the range arithmetic.
    #[inline]
    fn check_bounds(&self, addr: u64, len: usize) -> Result<usize, Fault> {
        let start = usize::try_from(addr).map_err(|_| Fault::MemoryBounds {
            addr,
            len,
            size: self.data.len(),
        })?;
        let end = start.checked_add(len).ok_or(Fault::MemoryBounds {
            addr,
            len,
            size: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(Fault::MemoryBounds {
                addr,
                len,
                size: self.data.len(),
            });
        }
        Ok(start)
    }

    fn read_bytes<const N: usize>(&self, addr: u64) -> Result<[u8; N], Fault> {
        let start = self.check_bounds(addr, N)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.data[start..start + N]);
        Ok(buf)
    }

    fn write_bytes(&mut self, addr: u64, bytes: &[u8]) -> Result<(), Fault> {
        let start = self.check_bounds(addr, bytes.len())?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

fn float_address(v: f64) -> Result<u64, Fault> {
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 || v >= u64::MAX as f64 {
        return Err(Fault::MemoryAddress(format!("{v} is not a valid address")));
    }
    Ok(v as u64)
}
