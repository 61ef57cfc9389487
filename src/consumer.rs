// ABOUTME: The event-consumer trait both decoders push into.
// ABOUTME: Also provides an owned Event type and a Vec<Event> recorder.

use crate::error::Result;

/// Element type announced by an array-start event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Elements may be any value.
    Any,
    /// Elements arrive as `on_byte` events (a CBOR byte string).
    Byte,
}

/// Receives decode events, in order, synchronously.
///
/// Any method may return an error. The decoder then stops, latches that exact
/// error and returns it from the current and every later feed call.
///
/// String arguments borrow either the caller's fragment or the decoder's carry
/// buffer and are only valid for the duration of the call.
///
/// The narrow integer and `f32` events default to widening into the 64-bit
/// events, so a minimal consumer only implements the required methods.
pub trait Consumer {
    /// An object begins. `len` is the declared pair count, if any.
    fn on_object_start(&mut self, len: Option<usize>) -> Result<()>;

    fn on_object_finished(&mut self) -> Result<()>;

    /// An array begins. `len` is the declared element count, if any.
    fn on_array_start(&mut self, len: Option<usize>, elem: ElementType) -> Result<()>;

    fn on_array_finished(&mut self) -> Result<()>;

    fn on_key(&mut self, key: &str) -> Result<()>;

    fn on_string(&mut self, value: &str) -> Result<()>;

    fn on_bool(&mut self, value: bool) -> Result<()>;

    fn on_nil(&mut self) -> Result<()>;

    fn on_i8(&mut self, value: i8) -> Result<()> {
        self.on_i64(value.into())
    }

    fn on_i16(&mut self, value: i16) -> Result<()> {
        self.on_i64(value.into())
    }

    fn on_i32(&mut self, value: i32) -> Result<()> {
        self.on_i64(value.into())
    }

    fn on_i64(&mut self, value: i64) -> Result<()>;

    fn on_u8(&mut self, value: u8) -> Result<()> {
        self.on_u64(value.into())
    }

    fn on_u16(&mut self, value: u16) -> Result<()> {
        self.on_u64(value.into())
    }

    fn on_u32(&mut self, value: u32) -> Result<()> {
        self.on_u64(value.into())
    }

    fn on_u64(&mut self, value: u64) -> Result<()>;

    fn on_f32(&mut self, value: f32) -> Result<()> {
        self.on_f64(value.into())
    }

    fn on_f64(&mut self, value: f64) -> Result<()>;

    /// One byte of a byte string, between an `ElementType::Byte` array start and finish.
    fn on_byte(&mut self, value: u8) -> Result<()>;
}

impl<C: Consumer + ?Sized> Consumer for &mut C {
    fn on_object_start(&mut self, len: Option<usize>) -> Result<()> {
        (**self).on_object_start(len)
    }
    fn on_object_finished(&mut self) -> Result<()> {
        (**self).on_object_finished()
    }
    fn on_array_start(&mut self, len: Option<usize>, elem: ElementType) -> Result<()> {
        (**self).on_array_start(len, elem)
    }
    fn on_array_finished(&mut self) -> Result<()> {
        (**self).on_array_finished()
    }
    fn on_key(&mut self, key: &str) -> Result<()> {
        (**self).on_key(key)
    }
    fn on_string(&mut self, value: &str) -> Result<()> {
        (**self).on_string(value)
    }
    fn on_bool(&mut self, value: bool) -> Result<()> {
        (**self).on_bool(value)
    }
    fn on_nil(&mut self) -> Result<()> {
        (**self).on_nil()
    }
    fn on_i8(&mut self, value: i8) -> Result<()> {
        (**self).on_i8(value)
    }
    fn on_i16(&mut self, value: i16) -> Result<()> {
        (**self).on_i16(value)
    }
    fn on_i32(&mut self, value: i32) -> Result<()> {
        (**self).on_i32(value)
    }
    fn on_i64(&mut self, value: i64) -> Result<()> {
        (**self).on_i64(value)
    }
    fn on_u8(&mut self, value: u8) -> Result<()> {
        (**self).on_u8(value)
    }
    fn on_u16(&mut self, value: u16) -> Result<()> {
        (**self).on_u16(value)
    }
    fn on_u32(&mut self, value: u32) -> Result<()> {
        (**self).on_u32(value)
    }
    fn on_u64(&mut self, value: u64) -> Result<()> {
        (**self).on_u64(value)
    }
    fn on_f32(&mut self, value: f32) -> Result<()> {
        (**self).on_f32(value)
    }
    fn on_f64(&mut self, value: f64) -> Result<()> {
        (**self).on_f64(value)
    }
    fn on_byte(&mut self, value: u8) -> Result<()> {
        (**self).on_byte(value)
    }
}

/// An owned decode event, as recorded by `Vec<Event>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ObjectStart(Option<usize>),
    ObjectFinished,
    ArrayStart(Option<usize>, ElementType),
    ArrayFinished,
    Key(String),
    String(String),
    Bool(bool),
    Nil,
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Byte(u8),
}

/// Records every event verbatim, preserving integer and float widths.
impl Consumer for Vec<Event> {
    fn on_object_start(&mut self, len: Option<usize>) -> Result<()> {
        self.push(Event::ObjectStart(len));
        Ok(())
    }
    fn on_object_finished(&mut self) -> Result<()> {
        self.push(Event::ObjectFinished);
        Ok(())
    }
    fn on_array_start(&mut self, len: Option<usize>, elem: ElementType) -> Result<()> {
        self.push(Event::ArrayStart(len, elem));
        Ok(())
    }
    fn on_array_finished(&mut self) -> Result<()> {
        self.push(Event::ArrayFinished);
        Ok(())
    }
    fn on_key(&mut self, key: &str) -> Result<()> {
        self.push(Event::Key(key.to_owned()));
        Ok(())
    }
    fn on_string(&mut self, value: &str) -> Result<()> {
        self.push(Event::String(value.to_owned()));
        Ok(())
    }
    fn on_bool(&mut self, value: bool) -> Result<()> {
        self.push(Event::Bool(value));
        Ok(())
    }
    fn on_nil(&mut self) -> Result<()> {
        self.push(Event::Nil);
        Ok(())
    }
    fn on_i8(&mut self, value: i8) -> Result<()> {
        self.push(Event::I8(value));
        Ok(())
    }
    fn on_i16(&mut self, value: i16) -> Result<()> {
        self.push(Event::I16(value));
        Ok(())
    }
    fn on_i32(&mut self, value: i32) -> Result<()> {
        self.push(Event::I32(value));
        Ok(())
    }
    fn on_i64(&mut self, value: i64) -> Result<()> {
        self.push(Event::I64(value));
        Ok(())
    }
    fn on_u8(&mut self, value: u8) -> Result<()> {
        self.push(Event::U8(value));
        Ok(())
    }
    fn on_u16(&mut self, value: u16) -> Result<()> {
        self.push(Event::U16(value));
        Ok(())
    }
    fn on_u32(&mut self, value: u32) -> Result<()> {
        self.push(Event::U32(value));
        Ok(())
    }
    fn on_u64(&mut self, value: u64) -> Result<()> {
        self.push(Event::U64(value));
        Ok(())
    }
    fn on_f32(&mut self, value: f32) -> Result<()> {
        self.push(Event::F32(value));
        Ok(())
    }
    fn on_f64(&mut self, value: f64) -> Result<()> {
        self.push(Event::F64(value));
        Ok(())
    }
    fn on_byte(&mut self, value: u8) -> Result<()> {
        self.push(Event::Byte(value));
        Ok(())
    }
}
