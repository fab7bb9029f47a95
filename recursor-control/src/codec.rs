//! Native integer codec for v3 length fields
//!
//! The Recursor writes its length fields as a raw C `size_t`: the width is the
//! word size of the machine it was built for and the byte order is that
//! machine's native order. There is no negotiation on the wire, so the only
//! way to interoperate is to assume the server shares our own layout and to
//! detect that layout at run time.
//!
//! Consequently a client and a Recursor built for different architectures
//! (for example this client on a 64-bit host talking to a 32-bit Recursor)
//! cannot talk to each other over the v3 protocol. Such pairs are unsupported;
//! the length width on the wire always follows this machine's `usize`.

use crate::{ControlError, Result};

/// Byte order of a native integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Detect the byte order of this machine
    ///
    /// Writes the 16-bit probe `0x0001` in native order and inspects its first
    /// byte.
    #[must_use]
    pub const fn native() -> Self {
        if 0x0001_u16.to_ne_bytes()[0] == 1 {
            Self::Little
        } else {
            Self::Big
        }
    }
}

/// Width and byte order used to encode v3 length fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeLayout {
    width: usize,
    order: ByteOrder,
}

impl NativeLayout {
    /// Build a layout from an explicit width and byte order
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::UnsupportedPlatform`] if `width` is not 4 or 8.
    pub const fn new(width: usize, order: ByteOrder) -> Result<Self> {
        match width {
            4 | 8 => Ok(Self { width, order }),
            _ => Err(ControlError::UnsupportedPlatform(width)),
        }
    }

    /// The layout of a `size_t` on this machine
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::UnsupportedPlatform`] if the native word size is
    /// neither 4 nor 8 bytes.
    pub const fn detect() -> Result<Self> {
        Self::new(std::mem::size_of::<usize>(), ByteOrder::native())
    }

    /// Number of bytes in an encoded length
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Byte order of an encoded length
    #[must_use]
    pub const fn order(&self) -> ByteOrder {
        self.order
    }

    /// Encode `length` as a native `size_t`
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::LengthOverflow`] if `length` does not fit into
    /// the layout's width.
    pub fn encode_length(&self, length: usize) -> Result<Vec<u8>> {
        let overflow = || ControlError::LengthOverflow {
            length: length as u64,
            width: self.width,
        };

        if self.width == 4 {
            let value = u32::try_from(length).map_err(|_| overflow())?;
            Ok(match self.order {
                ByteOrder::Little => value.to_le_bytes().to_vec(),
                ByteOrder::Big => value.to_be_bytes().to_vec(),
            })
        } else {
            let value = u64::try_from(length).map_err(|_| overflow())?;
            Ok(match self.order {
                ByteOrder::Little => value.to_le_bytes().to_vec(),
                ByteOrder::Big => value.to_be_bytes().to_vec(),
            })
        }
    }

    /// Decode a native `size_t` from the start of `bytes`
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::ShortRead`] if `bytes` holds fewer than
    /// [`Self::width`] bytes.
    pub fn decode_length(&self, bytes: &[u8]) -> Result<u64> {
        let short = || ControlError::ShortRead {
            expected: self.width,
            received: bytes.len(),
        };

        if self.width == 4 {
            let raw: [u8; 4] = bytes
                .get(..4)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(short)?;
            Ok(u64::from(match self.order {
                ByteOrder::Little => u32::from_le_bytes(raw),
                ByteOrder::Big => u32::from_be_bytes(raw),
            }))
        } else {
            let raw: [u8; 8] = bytes
                .get(..8)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(short)?;
            Ok(match self.order {
                ByteOrder::Little => u64::from_le_bytes(raw),
                ByteOrder::Big => u64::from_be_bytes(raw),
            })
        }
    }
}
