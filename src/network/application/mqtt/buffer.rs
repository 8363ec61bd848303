//! Scatter-gather packet buffer backed by a chunked arena.
//!
//! A [`Buffer`] holds one or more encoded packets as an ordered list of
//! segments. Segments either live in arena chunks owned by the buffer or borrow
//! caller memory for the lifetime `'a`. Chunks are never reallocated once
//! created, so an [`Extent`] handed out by [`Buffer::allocate`] stays valid
//! until [`Buffer::reset`].

use alloc::boxed::Box;
use alloc::vec::Vec;
use log::debug;

use super::error::Error;

/// Smallest chunk the arena allocates.
pub const MIN_CHUNK_SIZE: usize = 1024;

/// Granularity at which extents are carved from a chunk.
pub const ALIGNMENT: usize = core::mem::size_of::<usize>();

/// Handle to a byte range carved from the arena.
///
/// The handle refers to its chunk by index. `capacity` is the size that was
/// reserved; `len` is how much of it is part of the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    chunk: usize,
    offset: usize,
    len: usize,
    capacity: usize,
}

impl Extent {
    /// Number of valid bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` for a zero-length extent.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes reserved for this extent.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Shorten the visible range; the reservation is kept.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }
}

/// Payload bytes handed to an encoder.
///
/// `Copied` bytes are copied into the arena and may be dropped as soon as the
/// call returns. `Borrowed` bytes are linked in place and must outlive the
/// buffer, which the `'a` lifetime enforces.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'p, 'a> {
    /// Copy the bytes into the buffer.
    Copied(&'p [u8]),
    /// Reference the bytes without copying.
    Borrowed(&'a [u8]),
}

impl Payload<'_, '_> {
    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        match self {
            Payload::Copied(bytes) | Payload::Borrowed(bytes) => bytes.len(),
        }
    }

    /// `true` when there are no payload bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        match self {
            Payload::Copied(bytes) | Payload::Borrowed(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Segment<'a> {
    Arena(Extent),
    Borrowed(&'a [u8]),
}

/// An ordered chain of byte segments forming one or more wire packets.
///
/// # Examples
///
/// ```rust
/// use libiot_dp::network::application::mqtt::{Buffer, Payload};
///
/// let tail = b"world";
/// let mut buffer = Buffer::new();
/// buffer.append(Payload::Copied(b"hello ")).unwrap();
/// buffer.append(Payload::Borrowed(tail)).unwrap();
///
/// assert_eq!(buffer.len(), 11);
/// assert_eq!(buffer.to_vec(), b"hello world");
/// ```
#[derive(Debug, Default)]
pub struct Buffer<'a> {
    chunks: Vec<Box<[u8]>>,
    /// Bytes already carved from the newest chunk.
    used: usize,
    segments: Vec<Segment<'a>>,
    buffered_bytes: usize,
}

impl<'a> Buffer<'a> {
    /// Create an empty buffer. No memory is allocated until the first extent.
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            used: 0,
            segments: Vec::new(),
            buffered_bytes: 0,
        }
    }

    /// Drop every segment and release all arena chunks.
    pub fn reset(&mut self) {
        self.segments.clear();
        self.chunks.clear();
        self.used = 0;
        self.buffered_bytes = 0;
    }

    /// Total number of bytes in the linked segments.
    pub fn len(&self) -> usize {
        self.buffered_bytes
    }

    /// `true` when no segment is linked.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of arena chunks currently held.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Carve `size` bytes from the arena without linking them.
    ///
    /// The returned extent is zero-filled. Write into it with
    /// [`extent_mut`](Self::extent_mut), then link it with
    /// [`append_extent`](Self::append_extent).
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] when a new chunk cannot be allocated.
    pub fn allocate(&mut self, size: usize) -> Result<Extent, Error> {
        let aligned = size
            .checked_add(ALIGNMENT - 1)
            .ok_or(Error::OutOfMemory)?
            & !(ALIGNMENT - 1);

        let fits = self
            .chunks
            .last()
            .is_some_and(|chunk| chunk.len() - self.used >= aligned);
        if !fits {
            let chunk_size = aligned.max(MIN_CHUNK_SIZE);
            let mut chunk = Vec::new();
            chunk
                .try_reserve_exact(chunk_size)
                .map_err(|_| Error::OutOfMemory)?;
            chunk.resize(chunk_size, 0);
            self.chunks
                .try_reserve(1)
                .map_err(|_| Error::OutOfMemory)?;
            self.chunks.push(chunk.into_boxed_slice());
            self.used = 0;
            debug!("mqtt buffer: new chunk of {} bytes", chunk_size);
        }

        let extent = Extent {
            chunk: self.chunks.len() - 1,
            offset: self.used,
            len: size,
            capacity: size,
        };
        self.used += aligned;
        Ok(extent)
    }

    /// Mutable view of an extent's valid bytes.
    ///
    /// # Errors
    ///
    /// [`Error::Internal`] if the extent does not belong to this buffer's
    /// current arena (for example after a reset).
    pub fn extent_mut(&mut self, extent: &Extent) -> Result<&mut [u8], Error> {
        self.chunks
            .get_mut(extent.chunk)
            .and_then(|chunk| chunk.get_mut(extent.offset..extent.offset + extent.len))
            .ok_or(Error::Internal)
    }

    fn extent_bytes(&self, extent: &Extent) -> &[u8] {
        self.chunks
            .get(extent.chunk)
            .and_then(|chunk| chunk.get(extent.offset..extent.offset + extent.len))
            .unwrap_or(&[])
    }

    /// Link an extent at the end of the chain.
    pub fn append_extent(&mut self, extent: Extent) -> Result<(), Error> {
        self.segments
            .try_reserve(1)
            .map_err(|_| Error::OutOfMemory)?;
        self.buffered_bytes += extent.len;
        self.segments.push(Segment::Arena(extent));
        Ok(())
    }

    /// Append payload bytes, copying or borrowing them as requested.
    ///
    /// Empty payloads are accepted and link nothing.
    pub fn append(&mut self, payload: Payload<'_, 'a>) -> Result<(), Error> {
        match payload {
            Payload::Copied(bytes) => {
                if bytes.is_empty() {
                    return Ok(());
                }
                let extent = self.allocate(bytes.len())?;
                self.extent_mut(&extent)?.copy_from_slice(bytes);
                self.append_extent(extent)
            }
            Payload::Borrowed(bytes) => {
                if bytes.is_empty() {
                    return Ok(());
                }
                self.segments
                    .try_reserve(1)
                    .map_err(|_| Error::OutOfMemory)?;
                self.buffered_bytes += bytes.len();
                self.segments.push(Segment::Borrowed(bytes));
                Ok(())
            }
        }
    }

    /// Iterate over the segments as byte slices, in wire order.
    pub fn slices(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.segments.iter().map(move |segment| match segment {
            Segment::Arena(extent) => self.extent_bytes(extent),
            Segment::Borrowed(bytes) => *bytes,
        })
    }

    /// Slices covering the bytes from `offset` to the end, for a resumed send.
    pub fn slices_from(&self, offset: usize) -> Vec<&[u8]> {
        let mut skip = offset;
        let mut out = Vec::with_capacity(self.segments.len());
        for slice in self.slices() {
            if skip >= slice.len() {
                skip -= slice.len();
                continue;
            }
            out.push(&slice[skip..]);
            skip = 0;
        }
        out
    }

    /// Copy all linked bytes into one contiguous vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.buffered_bytes);
        for slice in self.slices() {
            out.extend_from_slice(slice);
        }
        out
    }

    /// First byte of the chain, which is the packet type of the head packet.
    pub(crate) fn head_byte(&self) -> Option<u8> {
        self.slices().next().and_then(|slice| slice.first().copied())
    }

    /// The first segment when it lives in the arena.
    pub(crate) fn head_extent(&self) -> Option<Extent> {
        match self.segments.first()? {
            Segment::Arena(extent) => Some(*extent),
            Segment::Borrowed(_) => None,
        }
    }

    /// Change the visible length of the first segment within its reservation.
    pub(crate) fn resize_head(&mut self, len: usize) -> Result<(), Error> {
        let Some(Segment::Arena(extent)) = self.segments.first_mut() else {
            return Err(Error::Internal);
        };
        if len > extent.capacity {
            return Err(Error::Internal);
        }
        self.buffered_bytes = self.buffered_bytes - extent.len + len;
        extent.len = len;
        Ok(())
    }

    /// Last byte of the chain when it lives in the arena.
    pub(crate) fn last_byte_mut(&mut self) -> Option<&mut u8> {
        let Segment::Arena(extent) = *self.segments.last()? else {
            return None;
        };
        self.extent_mut(&extent).ok()?.last_mut()
    }
}
