//! Arrays, array buffers and `Uint8Array` views

use otter_v8_sys::*;

use crate::context::Context;
use crate::error::{V8Error, V8Result};
use crate::isolate::Isolate;
use crate::object::{Object, value_refinement};
use crate::value::Value;

/// A JavaScript array.
pub struct Array {
    object: Object,
}

value_refinement!(Array, object: Object);

impl Array {
    /// Create an array of `length` holes
    pub fn new(ctx: &Context, length: u32) -> V8Result<Array> {
        let guard = ctx.inner().enter()?;
        // SAFETY: guard keeps the context open
        let ptr = unsafe { otter_v8_array_new(guard.ptr(), length) };
        drop(guard);
        // SAFETY: tracked in ctx
        let value = unsafe { Value::from_raw(ptr, Some(ctx.inner()), ctx.isolate()) };
        Ok(Array::from_value(value))
    }

    /// The `length` property
    pub fn length(&self) -> u32 {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the array alive
        unsafe { otter_v8_array_length(self.raw()) }
    }
}

/// A JavaScript `ArrayBuffer`.
///
/// # Example
///
/// ```no_run
/// use otter_v8_core::{ArrayBuffer, Context, Isolate};
///
/// let ctx = Context::new(&Isolate::new()).unwrap();
/// let buf = ArrayBuffer::from_bytes(&ctx, &[1, 2, 3]).unwrap();
/// buf.put_bytes(1, &[9]).unwrap();
/// assert_eq!(buf.get_bytes(), vec![1, 9, 3]);
/// ```
pub struct ArrayBuffer {
    object: Object,
}

value_refinement!(ArrayBuffer, object: Object);

impl ArrayBuffer {
    /// Create a zero-filled buffer of `length` bytes
    pub fn new(ctx: &Context, length: usize) -> V8Result<ArrayBuffer> {
        let guard = ctx.inner().enter()?;
        // SAFETY: guard keeps the context open
        let ptr = unsafe { otter_v8_array_buffer_new(guard.ptr(), length) };
        drop(guard);
        // SAFETY: tracked in ctx
        let value = unsafe { Value::from_raw(ptr, Some(ctx.inner()), ctx.isolate()) };
        Ok(ArrayBuffer::from_value(value))
    }

    /// Create a buffer holding a copy of `bytes`
    pub fn from_bytes(ctx: &Context, bytes: &[u8]) -> V8Result<ArrayBuffer> {
        let buffer = Self::new(ctx, bytes.len())?;
        buffer.put_bytes(0, bytes)?;
        Ok(buffer)
    }

    /// Length in bytes
    pub fn byte_length(&self) -> usize {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the buffer alive
        unsafe { otter_v8_array_buffer_byte_length(self.raw()) }
    }

    /// Fresh copy of the buffer's contents
    pub fn get_bytes(&self) -> Vec<u8> {
        let _guard = self.enter_live();
        // SAFETY: guard keeps the buffer alive
        let len = unsafe { otter_v8_array_buffer_byte_length(self.raw()) };
        let mut bytes = vec![0u8; len];
        // SAFETY: bytes has room for len bytes
        unsafe { otter_v8_array_buffer_copy_bytes(self.raw(), bytes.as_mut_ptr(), len) };
        bytes
    }

    /// Copy `src` into the buffer starting at `offset`
    pub fn put_bytes(&self, offset: usize, src: &[u8]) -> V8Result<()> {
        let _guard = self.enter()?;
        // SAFETY: guard keeps the buffer alive
        let capacity = unsafe { otter_v8_array_buffer_byte_length(self.raw()) };
        let in_bounds = offset
            .checked_add(src.len())
            .is_some_and(|end| end <= capacity);
        if !in_bounds {
            return Err(V8Error::OutOfBounds {
                offset,
                len: src.len(),
                capacity,
            });
        }
        // SAFETY: the range was checked against the backing store
        unsafe { otter_v8_array_buffer_put_bytes(self.raw(), offset, src.as_ptr(), src.len()) };
        Ok(())
    }
}

/// A JavaScript `Uint8Array`.
pub struct Uint8Array {
    object: Object,
}

value_refinement!(Uint8Array, object: Object);

impl Uint8Array {
    /// Create a view of `length` bytes of `buffer` starting at `offset`
    pub fn new(buffer: &ArrayBuffer, offset: usize, length: usize) -> V8Result<Uint8Array> {
        let guard = buffer.enter()?;
        let capacity = buffer.byte_length();
        if offset.checked_add(length).is_none_or(|end| end > capacity) {
            return Err(V8Error::OutOfBounds {
                offset,
                len: length,
                capacity,
            });
        }
        // SAFETY: guard keeps the buffer alive; the view fits inside it
        let ptr = unsafe { otter_v8_uint8_array_new(buffer.raw(), offset, length) };
        drop(guard);
        // SAFETY: tracked with the buffer
        let value = unsafe { buffer.derive(ptr) };
        Ok(Uint8Array::from_value(value))
    }

    /// Create an array holding a copy of `bytes` over a fresh buffer
    pub fn from_bytes(iso: &Isolate, bytes: &[u8]) -> V8Result<Uint8Array> {
        Value::new(iso, bytes)?.into_uint8_array()
    }

    /// Copy of the viewed bytes
    pub fn bytes(&self) -> Vec<u8> {
        self.uint8_array()
    }

    /// The underlying buffer
    pub fn buffer(&self) -> V8Result<ArrayBuffer> {
        let guard = self.enter()?;
        // SAFETY: guard keeps the view alive
        let ptr = unsafe { otter_v8_uint8_array_buffer(self.raw()) };
        drop(guard);
        // SAFETY: tracked with the view
        let value = unsafe { self.derive(ptr) };
        Ok(ArrayBuffer::from_value(value))
    }
}
