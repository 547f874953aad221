//! Byte packing helpers shared by the query and ping clients.
//!
//! All offset arithmetic for outgoing and incoming packets goes through
//! [`PacketWriter`] and [`PacketReader`] so it can be tested without sockets.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::error::ProbeError;

#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn put_u16_be(&mut self, value: u16) -> &mut Self {
        // Writing into a Vec cannot fail.
        let _ = self.buf.write_u16::<BigEndian>(value);
        self
    }

    pub fn put_u32_be(&mut self, value: u32) -> &mut Self {
        let _ = self.buf.write_u32::<BigEndian>(value);
        self
    }

    pub fn put_i32_be(&mut self, value: i32) -> &mut Self {
        let _ = self.buf.write_i32::<BigEndian>(value);
        self
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Minecraft VarInt: 7 bits per byte, least significant group first.
    pub fn put_varint(&mut self, value: i32) -> &mut Self {
        let mut value = value as u32;
        loop {
            if value & !0x7F == 0 {
                self.buf.push(value as u8);
                return self;
            }
            self.buf.push(((value & 0x7F) | 0x80) as u8);
            value >>= 7;
        }
    }

    /// VarInt length prefix followed by the UTF-8 bytes.
    pub fn put_string(&mut self, value: &str) -> &mut Self {
        self.put_varint(value.len() as i32);
        self.put_bytes(value.as_bytes())
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

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Wraps the written body in a VarInt length prefix.
    pub fn into_frame(self) -> Vec<u8> {
        let mut frame = PacketWriter::with_capacity(self.buf.len() + 5);
        frame.put_varint(self.buf.len() as i32);
        frame.put_bytes(&self.buf);
        frame.into_inner()
    }
}

pub struct PacketReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(data) }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn get_u8(&mut self) -> Result<u8, ProbeError> {
        self.cursor.read_u8().map_err(|_| truncated(1))
    }

    pub fn get_u16_be(&mut self) -> Result<u16, ProbeError> {
        self.cursor.read_u16::<BigEndian>().map_err(|_| truncated(2))
    }

    pub fn get_u32_be(&mut self) -> Result<u32, ProbeError> {
        self.cursor.read_u32::<BigEndian>().map_err(|_| truncated(4))
    }

    pub fn get_i32_be(&mut self) -> Result<i32, ProbeError> {
        self.cursor.read_i32::<BigEndian>().map_err(|_| truncated(4))
    }

    pub fn get_varint(&mut self) -> Result<i32, ProbeError> {
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.get_u8()?;
            value |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(value as i32);
            }
        }
        Err(ProbeError::parse("VarInt is longer than 5 bytes"))
    }

    pub fn get_bytes(&mut self, len: usize) -> Result<&'a [u8], ProbeError> {
        if self.remaining() < len {
            return Err(truncated(len));
        }
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ProbeError> {
        self.get_bytes(len).map(|_| ())
    }

    /// Bytes up to the next NUL; the terminator is consumed but not returned.
    pub fn get_cstring(&mut self) -> Result<&'a [u8], ProbeError> {
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        let rest = &data[start.min(data.len())..];
        match rest.iter().position(|&b| b == 0) {
            Some(end) => {
                self.cursor.set_position((start + end + 1) as u64);
                Ok(&rest[..end])
            }
            None => Err(ProbeError::parse("missing NUL terminator")),
        }
    }

    /// Like [`get_cstring`](Self::get_cstring), but an unterminated string
    /// runs to the end of the packet.
    pub fn get_cstring_or_rest(&mut self) -> &'a [u8] {
        match self.get_cstring() {
            Ok(bytes) => bytes,
            Err(_) => self.rest(),
        }
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position(data.len() as u64);
        &data[start.min(data.len())..]
    }
}

fn truncated(wanted: usize) -> ProbeError {
    ProbeError::parse(format!("packet truncated, needed {} more byte(s)", wanted))
}
