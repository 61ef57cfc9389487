// ABOUTME: CBOR initial-byte constants, resource limits and decoder configuration.
// ABOUTME: Type codes map directly to the CBOR major/minor layout of RFC 8949.

/// CBOR major types (high 3 bits of the initial byte).
pub mod major {
    pub const UNSIGNED: u8 = 0;
    pub const NEGATIVE: u8 = 1;
    pub const BYTES: u8 = 2;
    pub const TEXT: u8 = 3;
    pub const ARRAY: u8 = 4;
    pub const MAP: u8 = 5;
    pub const TAG: u8 = 6;
    pub const SIMPLE: u8 = 7;

    /// Extract the major type from an initial byte.
    #[inline]
    pub const fn of(code: u8) -> u8 {
        code >> 5
    }
}

/// CBOR minor values (low 5 bits of the initial byte).
pub mod minor {
    pub const MASK: u8 = 0x1f;

    /// Largest argument carried directly in the initial byte.
    pub const DIRECT_MAX: u8 = 23;

    pub const LEN_8: u8 = 24;
    pub const LEN_16: u8 = 25;
    pub const LEN_32: u8 = 26;
    pub const LEN_64: u8 = 27;

    pub const INDEFINITE: u8 = 31;

    /// Extract the minor value from an initial byte.
    #[inline]
    pub const fn of(code: u8) -> u8 {
        code & MASK
    }

    /// Number of big-endian bytes following the initial byte, if any.
    ///
    /// Returns `None` for the reserved values 28-30 and for 31.
    #[inline]
    pub const fn argument_width(minor: u8) -> Option<usize> {
        match minor {
            LEN_8 => Some(1),
            LEN_16 => Some(2),
            LEN_32 => Some(4),
            LEN_64 => Some(8),
            _ => None,
        }
    }
}

/// Full initial bytes of major type 7.
pub mod simple {
    pub const FALSE: u8 = 0xf4;
    pub const TRUE: u8 = 0xf5;
    pub const NULL: u8 = 0xf6;
    pub const UNDEFINED: u8 = 0xf7;
    pub const HALF_FLOAT: u8 = 0xf9;
    pub const SINGLE_FLOAT: u8 = 0xfa;
    pub const DOUBLE_FLOAT: u8 = 0xfb;
    pub const BREAK: u8 = 0xff;
}

/// Default resource limits.
pub mod limits {
    /// Maximum aggregate nesting depth
    pub const MAX_DEPTH: usize = 512;

    /// Maximum string or literal length in bytes
    pub const MAX_STRING_LENGTH: usize = 10_000_000;

    /// Frame stack capacity reserved up front
    pub const STACK_CAPACITY: usize = 32;
}

/// Configuration options shared by both decoders.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Maximum number of simultaneously open aggregates
    pub max_depth: usize,
    /// Maximum bytes held for a single string, number or byte string
    pub max_string_length: usize,
    /// Initial capacity of the frame stack
    pub stack_capacity: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: limits::MAX_DEPTH,
            max_string_length: limits::MAX_STRING_LENGTH,
            stack_capacity: limits::STACK_CAPACITY,
        }
    }
}
