use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::{bytes_of, cast_slice, Pod};
use log::debug;

use super::{BufferDescriptor, BufferId, BufferKind, RenderDevice, RenderError};

/// Uniform buffer holding exactly one `T`.
#[derive(Debug)]
pub struct ConstantBuffer<T: Pod> {
    buffer: BufferId,
    _marker: PhantomData<T>,
}

impl<T: Pod> ConstantBuffer<T> {
    pub fn new<D: RenderDevice + ?Sized>(
        device: &mut D,
        label: &str,
    ) -> Result<Self, RenderError> {
        let buffer = device.create_buffer(&BufferDescriptor {
            label: label.to_string(),
            size: size_of::<T>() as u64,
            kind: BufferKind::Uniform,
        })?;
        Ok(Self {
            buffer,
            _marker: PhantomData,
        })
    }

    /// Replaces the buffer contents with `data`.
    pub fn update_data<D: RenderDevice + ?Sized>(
        &self,
        device: &mut D,
        data: &T,
    ) -> Result<(), RenderError> {
        device.write_buffer(self.buffer, 0, bytes_of(data))
    }

    pub fn id(&self) -> BufferId {
        self.buffer
    }
}

/// Storage buffer holding an array of `T` that grows to fit each upload.
#[derive(Debug)]
pub struct StructuredBuffer<T: Pod> {
    label: String,
    buffer: BufferId,
    capacity: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> StructuredBuffer<T> {
    /// Allocates room for `capacity` records (at least one, since empty
    /// storage bindings are invalid).
    pub fn new<D: RenderDevice + ?Sized>(
        device: &mut D,
        label: &str,
        capacity: usize,
    ) -> Result<Self, RenderError> {
        let capacity = capacity.max(1);
        let buffer = Self::allocate(device, label, capacity)?;
        Ok(Self {
            label: label.to_string(),
            buffer,
            capacity,
            len: 0,
            _marker: PhantomData,
        })
    }

    fn allocate<D: RenderDevice + ?Sized>(
        device: &mut D,
        label: &str,
        capacity: usize,
    ) -> Result<BufferId, RenderError> {
        device.create_buffer(&BufferDescriptor {
            label: label.to_string(),
            size: (capacity * size_of::<T>()) as u64,
            kind: BufferKind::Storage,
        })
    }

    /// Uploads `data` as the complete contents, reallocating when it no
    /// longer fits.
    pub fn update_data<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        data: &[T],
    ) -> Result<(), RenderError> {
        if data.len() > self.capacity {
            debug!(
                "growing {} from {} to {} records",
                self.label,
                self.capacity,
                data.len()
            );
            let buffer = Self::allocate(device, &self.label, data.len())?;
            device.destroy_buffer(self.buffer)?;
            self.buffer = buffer;
            self.capacity = data.len();
        }
        self.len = data.len();
        if data.is_empty() {
            return Ok(());
        }
        device.write_buffer(self.buffer, 0, cast_slice(data))
    }

    pub fn id(&self) -> BufferId {
        self.buffer
    }

    /// Number of records written by the last upload.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
