//! Common External Message Interface (cEMI) implementation.
//!
//! cEMI provides the standardized interface for KNX communication, encapsulating
//! KNX telegrams within KNXnet/IP frames. This module handles parsing and building
//! of cEMI frames, including `L_Data` frames for group communication.
//!
//! ## Overview
//!
//! The cEMI protocol layer sits between KNXnet/IP (transport) and the KNX
//! application layer. It defines how to encode KNX telegrams for transmission
//! over IP networks.
//!
//! ## Frame Structure
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Message Code (1 byte)                    │
//! ├──────────────────────────────────────────┤
//! │ Additional Info Length (1 byte)          │
//! ├──────────────────────────────────────────┤
//! │ Additional Info (variable)               │
//! ├──────────────────────────────────────────┤
//! │ Service Information (L_Data)             │
//! │  ├─ Control Field 1 (1 byte)             │
//! │  ├─ Control Field 2 (1 byte)             │
//! │  ├─ Source Address (2 bytes)             │
//! │  ├─ Destination Address (2 bytes)        │
//! │  ├─ NPDU Length (1 byte)                 │
//! │  ├─ TPCI/APCI (1-2 bytes)                │
//! │  └─ Data (variable)                      │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use knx_tunnel::protocol::cemi::{CEMIFrame, LDataFrame};
//!
//! // Parse a complete cEMI frame
//! let cemi = CEMIFrame::parse(&frame_data)?;
//!
//! // Extract L_Data if this is a data frame
//! if cemi.is_ldata() {
//!     let ldata = cemi.as_ldata()?;
//!
//!     if ldata.is_group_write() {
//!         let addr = ldata.destination_group().unwrap();
//!         // Process group write...
//!     }
//! }
//! ```

use crate::addressing::{GroupAddress, IndividualAddress};
use crate::error::{KnxError, Result};
use crate::protocol::constants::{CEMIMessageCode, Priority};

/// cEMI Additional Information Type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdditionalInfoType {
    /// PL medium information
    PlMediumInfo = 0x01,
    /// RF medium information
    RfMediumInfo = 0x02,
    /// Busmonitor error flags
    BusmonitorErrorFlags = 0x03,
    /// Relative timestamp
    RelativeTimestamp = 0x04,
    /// Time delay
    TimeDelay = 0x05,
    /// Extended relative timestamp
    ExtendedRelativeTimestamp = 0x06,
    /// `BiBat` information
    BiBatInfo = 0x07,
}

/// Control Field 1 of `L_Data` frame
///
/// ```text
/// Bit 7: Frame Type (0=extended, 1=standard)
/// Bit 6: Reserved
/// Bit 5: Repeat (0=repeat, 1=do not repeat)
/// Bit 4: System Broadcast (0=system, 1=broadcast)
/// Bit 3-2: Priority (00=system, 01=normal, 10=urgent, 11=low)
/// Bit 1: Acknowledge Request (0=no ack, 1=ack requested)
/// Bit 0: Confirm (0=no error, 1=error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlField1 {
    raw: u8,
}

impl From<u8> for ControlField1 {
    #[inline(always)]
    fn from(raw: u8) -> Self {
        Self { raw }
    }
}

impl From<ControlField1> for u8 {
    #[inline(always)]
    fn from(ctrl: ControlField1) -> u8 {
        ctrl.raw
    }
}

impl ControlField1 {
    /// Get raw byte value
    #[inline(always)]
    pub const fn raw(self) -> u8 {
        self.raw
    }

    /// Check if frame is standard (true) or extended (false)
    #[inline(always)]
    pub const fn is_standard_frame(self) -> bool {
        (self.raw & 0x80) != 0
    }

    /// Check if repeat flag is set (do not repeat if true)
    #[inline(always)]
    pub const fn do_not_repeat(self) -> bool {
        (self.raw & 0x20) != 0
    }

    /// Check if this is a system broadcast
    #[inline(always)]
    pub const fn is_broadcast(self) -> bool {
        (self.raw & 0x10) != 0
    }

    /// Get priority
    #[inline(always)]
    pub const fn priority(self) -> Priority {
        Priority::from_u8((self.raw >> 2) & 0x03)
    }

    /// Check if acknowledge is requested
    #[inline(always)]
    pub const fn ack_requested(self) -> bool {
        (self.raw & 0x02) != 0
    }

    /// Check if confirm error flag is set
    #[inline(always)]
    pub const fn has_error(self) -> bool {
        (self.raw & 0x01) != 0
    }

    /// Create a new Control Field 1
    pub const fn new(
        standard_frame: bool,
        do_not_repeat: bool,
        broadcast: bool,
        priority: Priority,
        ack_requested: bool,
        has_error: bool,
    ) -> Self {
        let mut raw = 0u8;

        if standard_frame {
            raw |= 0x80;
        }
        if do_not_repeat {
            raw |= 0x20;
        }
        if broadcast {
            raw |= 0x10;
        }
        raw |= (priority.to_u8() & 0x03) << 2;
        if ack_requested {
            raw |= 0x02;
        }
        if has_error {
            raw |= 0x01;
        }

        Self { raw }
    }
}

impl Default for ControlField1 {
    #[inline]
    fn default() -> Self {
        // Standard frame, do not repeat, broadcast, low priority, no ack, no error
        // Pre-calculated: 0b10111100 = 0xBC
        // Bit 7: 1 = standard frame
        // Bit 5: 1 = do not repeat
        // Bit 4: 1 = broadcast
        // Bits 3-2: 11 = low priority
        // Bit 1: 0 = no ack
        // Bit 0: 0 = no error
        Self { raw: 0xBC }
    }
}

/// Control Field 2 of `L_Data` frame
///
/// ```text
/// Bit 7: Destination Address Type (0=individual, 1=group)
/// Bit 6-4: Hop Count (0-7)
/// Bit 3-0: Extended Frame Format (0000=standard)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlField2 {
    raw: u8,
}

impl From<u8> for ControlField2 {
    #[inline(always)]
    fn from(raw: u8) -> Self {
        Self { raw }
    }
}

impl From<ControlField2> for u8 {
    #[inline(always)]
    fn from(ctrl: ControlField2) -> u8 {
        ctrl.raw
    }
}

impl ControlField2 {
    /// Get raw byte value
    #[inline(always)]
    pub const fn raw(self) -> u8 {
        self.raw
    }

    /// Check if destination is group address (true) or individual (false)
    #[inline(always)]
    pub const fn is_group_address(self) -> bool {
        (self.raw & 0x80) != 0
    }

    /// Get hop count (0-7)
    #[inline(always)]
    pub const fn hop_count(self) -> u8 {
        (self.raw >> 4) & 0x07
    }

    /// Get extended frame format
    #[inline(always)]
    pub const fn extended_format(self) -> u8 {
        self.raw & 0x0F
    }

    /// Create a new Control Field 2
    pub const fn new(is_group: bool, hop_count: u8, extended_format: u8) -> Self {
        let mut raw = 0u8;

        if is_group {
            raw |= 0x80;
        }
        raw |= (hop_count & 0x07) << 4;
        raw |= extended_format & 0x0F;

        Self { raw }
    }
}

impl Default for ControlField2 {
    #[inline]
    fn default() -> Self {
        // Group address, hop count 6, standard format
        // Pre-calculated: 0b11100000 = 0xE0
        // Bit 7: 1 = group address
        // Bits 6-4: 110 = hop count 6
        // Bits 3-0: 0000 = standard format
        Self { raw: 0xE0 }
    }
}

/// TPCI (Transport Layer Protocol Control Information)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tpci {
    /// Unnumbered Data Packet (UDP)
    UnnumberedData,
    /// Numbered Data Packet (NDP) with sequence number
    NumberedData {
        /// Sequence number (0-15)
        sequence: u8,
    },
    /// Unnumbered Control Packet (UCP)
    UnnumberedControl,
    /// Numbered Control Packet (NCP) with sequence number
    NumberedControl {
        /// Sequence number (0-15)
        sequence: u8,
    },
}

impl Tpci {
    /// Parse TPCI from the first byte of TPCI/APCI field
    pub const fn from_byte(byte: u8) -> Self {
        let tpci = (byte >> 6) & 0x03;
        match tpci {
            0b00 => Self::UnnumberedData,
            0b01 => {
                let sequence = (byte >> 2) & 0x0F;
                Self::NumberedData { sequence }
            }
            0b10 => Self::UnnumberedControl,
            0b11 => {
                let sequence = (byte >> 2) & 0x0F;
                Self::NumberedControl { sequence }
            }
            _ => Self::UnnumberedData, // Unreachable but needed for const
        }
    }

    /// Check if this is a data packet
    pub const fn is_data(self) -> bool {
        matches!(self, Self::UnnumberedData | Self::NumberedData { .. })
    }
}

/// APCI (Application Layer Protocol Control Information)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apci {
    /// Group Value Read (`A_GroupValue_Read`)
    GroupValueRead,
    /// Group Value Response (`A_GroupValue_Response`)
    GroupValueResponse,
    /// Group Value Write (`A_GroupValue_Write`)
    GroupValueWrite,
    /// Individual Address Write
    IndividualAddressWrite,
    /// Individual Address Read
    IndividualAddressRead,
    /// Individual Address Response
    IndividualAddressResponse,
    /// ADC Read
    AdcRead,
    /// ADC Response
    AdcResponse,
    /// Memory Read
    MemoryRead,
    /// Memory Response
    MemoryResponse,
    /// Memory Write
    MemoryWrite,
    /// Device Descriptor Read
    DeviceDescriptorRead,
    /// Device Descriptor Response
    DeviceDescriptorResponse,
    /// Unknown/Unsupported APCI
    Unknown(u16),
}

impl Apci {
    /// Parse APCI from TPCI/APCI bytes
    ///
    /// The APCI is encoded in the lower 10 bits across two bytes:
    /// - byte1 (TPCI byte): bits 1-0 contain APCI bits 9-8
    /// - byte2 (APCI byte): bits 7-6 contain APCI bits 7-6
    ///
    /// For data values ≤6 bits, bits 5-0 of byte2 contain the actual data value.
    pub const fn from_bytes(byte1: u8, byte2: u8) -> Self {
        // Extract APCI: byte1[1:0] << 8 | byte2[7:6] << 6
        // We mask byte2 to get only the command bits (7-6), ignoring data bits (5-0)
        let apci = ((byte1 as u16 & 0x03) << 8) | (byte2 as u16 & 0xC0);

        match apci {
            0x000 => Self::GroupValueRead,
            0x040 => Self::GroupValueResponse,
            0x080 => Self::GroupValueWrite,
            0x0C0 => Self::IndividualAddressWrite,
            0x100 => Self::IndividualAddressRead,
            0x140 => Self::IndividualAddressResponse,
            0x180 => Self::AdcRead,
            0x1C0 => Self::AdcResponse,
            0x200 => Self::MemoryRead,
            0x240 => Self::MemoryResponse,
            0x280 => Self::MemoryWrite,
            0x300 => Self::DeviceDescriptorRead,
            0x340 => Self::DeviceDescriptorResponse,
            _ => Self::Unknown(apci),
        }
    }

    /// Convert APCI to u16 value
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::GroupValueRead => 0x000,
            Self::GroupValueResponse => 0x040,
            Self::GroupValueWrite => 0x080,
            Self::IndividualAddressWrite => 0x0C0,
            Self::IndividualAddressRead => 0x100,
            Self::IndividualAddressResponse => 0x140,
            Self::AdcRead => 0x180,
            Self::AdcResponse => 0x1C0,
            Self::MemoryRead => 0x200,
            Self::MemoryResponse => 0x240,
            Self::MemoryWrite => 0x280,
            Self::DeviceDescriptorRead => 0x300,
            Self::DeviceDescriptorResponse => 0x340,
            Self::Unknown(val) => val,
        }
    }
}

/// cEMI `L_Data` frame
///
/// This is the most common cEMI frame type, used for transmitting
/// KNX telegrams over KNXnet/IP.
#[derive(Debug, Clone)]
pub struct LDataFrame<'a> {
    /// Control field 1
    pub ctrl1: ControlField1,
    /// Control field 2
    pub ctrl2: ControlField2,
    /// Source address (individual)
    pub source: IndividualAddress,
    /// Destination address (individual or group)
    pub destination_raw: u16,
    /// NPDU length: APCI (1 byte) + application data, not counting TPCI
    pub npdu_length: u8,
    /// TPCI
    pub tpci: Tpci,
    /// APCI
    pub apci: Apci,
    /// Application data
    pub data: &'a [u8],
    /// Raw APCI byte, kept to recover a short-packed value that `data`
    /// cannot represent (it is empty when the value is packed into the
    /// APCI byte itself)
    apci_byte: u8,
}

impl<'a> LDataFrame<'a> {
    /// Minimum size of `L_Data` frame (without additional data bytes)
    /// Control1 + Control2 + Source(2) + Dest(2) + `NPDUlen` + TPCI + APCI = 9 bytes
    pub const MIN_SIZE: usize = 9;

    /// Parse `L_Data` frame from bytes
    ///
    /// # Errors
    ///
    /// Returns error if buffer is too small or frame is invalid
    #[inline(always)]
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(KnxError::malformed_frame("buffer too small for cEMI frame"));
        }

        let ctrl1 = ControlField1::from(data[0]);
        let ctrl2 = ControlField2::from(data[1]);
        let source = IndividualAddress::from(u16::from_be_bytes([data[2], data[3]]));
        let destination_raw = u16::from_be_bytes([data[4], data[5]]);
        let npdu_length = data[6];

        // TPCI/APCI is at least 1 byte, could be 2
        let tpci_byte = data[7];
        let tpci = Tpci::from_byte(tpci_byte);

        // For data frames, parse APCI
        let (apci, apci_byte, data_start) = if tpci.is_data() {
            // SAFETY: Bounds checked above - data.len() >= MIN_SIZE = 9.
            // Index 8 is within bounds (< 9). Using get_unchecked avoids redundant
            // bounds check in this hot path for KNX frame processing.
            let apci_byte = unsafe { *data.get_unchecked(8) };
            let apci = Apci::from_bytes(tpci_byte, apci_byte);
            (apci, apci_byte, 9)
        } else {
            (Apci::Unknown(0), 0, 8)
        };

        // NPDU length counts APCI (1 byte) + data, not the preceding TPCI byte.
        // TPCI sits at position 7, so the frame runs 8 (TPCI consumed) + npdu_length
        // bytes further.
        let npdu_end = 8 + npdu_length as usize;

        if data.len() < npdu_end {
            return Err(KnxError::malformed_frame("invalid cEMI frame length"));
        }

        let app_data = &data[data_start..npdu_end];

        Ok(Self {
            ctrl1,
            ctrl2,
            source,
            destination_raw,
            npdu_length,
            tpci,
            apci,
            data: app_data,
            apci_byte,
        })
    }

    /// Get the application value, regardless of whether the gateway sent it
    /// packed into the APCI byte or as separate NPDU data bytes
    ///
    /// A group write/response whose value fits in the 2-bit short form (see
    /// [`LDataRequest::build`]) carries it in `apci_byte` instead of `data`,
    /// so `data` alone is empty for those frames; this method normalizes
    /// both forms into a single owned buffer.
    pub fn value(&self) -> Vec<u8> {
        if self.data.is_empty() && self.npdu_length == 1 {
            vec![extract_6bit_value(self.apci_byte)]
        } else {
            self.data.to_vec()
        }
    }

    /// Get destination as group address (if applicable)
    #[inline]
    pub fn destination_group(&self) -> Option<GroupAddress> {
        self.ctrl2
            .is_group_address()
            .then(|| GroupAddress::from(self.destination_raw))
    }

    /// Get destination as individual address (if applicable)
    #[inline]
    pub fn destination_individual(&self) -> Option<IndividualAddress> {
        (!self.ctrl2.is_group_address()).then(|| IndividualAddress::from(self.destination_raw))
    }

    /// Check if this is a group value write
    #[inline(always)]
    pub const fn is_group_write(&self) -> bool {
        matches!(self.apci, Apci::GroupValueWrite)
    }

    /// Check if this is a group value read
    #[inline(always)]
    pub const fn is_group_read(&self) -> bool {
        matches!(self.apci, Apci::GroupValueRead)
    }

    /// Check if this is a group value response
    #[inline(always)]
    pub const fn is_group_response(&self) -> bool {
        matches!(self.apci, Apci::GroupValueResponse)
    }
}

/// cEMI Frame wrapper
///
/// Represents a complete cEMI frame with message code and payload.
#[derive(Debug)]
pub struct CEMIFrame<'a> {
    /// Message code
    pub message_code: CEMIMessageCode,
    /// Raw frame data (including message code)
    data: &'a [u8],
}

impl<'a> CEMIFrame<'a> {
    /// Minimum cEMI frame size (message code + add info length)
    pub const MIN_SIZE: usize = 2;

    /// Parse a cEMI frame from bytes
    ///
    /// # Errors
    ///
    /// Returns error if buffer is too small or message code is invalid
    #[inline(always)]
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(KnxError::malformed_frame("buffer too small for cEMI frame"));
        }

        let message_code = CEMIMessageCode::from_u8(data[0])
            .ok_or_else(|| KnxError::malformed_frame("unknown cEMI message code"))?;

        Ok(Self { message_code, data })
    }

    /// Get the message code
    #[inline(always)]
    pub const fn message_code(&self) -> CEMIMessageCode {
        self.message_code
    }

    /// Get additional info length
    #[inline(always)]
    pub fn additional_info_length(&self) -> u8 {
        // SAFETY: parse() guarantees data.len() >= MIN_SIZE = 2 during construction.
        // Index 1 is always valid (< 2). This eliminates bounds checking for a
        // frequently called accessor method in cEMI frame processing.
        unsafe { *self.data.get_unchecked(1) }
    }

    /// Get the service information (skipping message code and additional info)
    ///
    /// This returns the `L_Data` payload for data frames.
    #[inline]
    pub fn service_info(&self) -> Result<&[u8]> {
        let add_info_len = self.additional_info_length();
        let service_start = 2 + add_info_len as usize;

        if self.data.len() < service_start {
            return Err(KnxError::malformed_frame("invalid cEMI frame length"));
        }

        Ok(&self.data[service_start..])
    }

    /// Parse as `L_Data` frame (for `L_Data.req`, `L_Data.ind`, `L_Data.con`)
    ///
    /// # Errors
    ///
    /// Returns error if this is not an `L_Data` frame or parsing fails
    pub fn as_ldata(&self) -> Result<LDataFrame<'a>> {
        match self.message_code {
            CEMIMessageCode::LDataReq | CEMIMessageCode::LDataInd | CEMIMessageCode::LDataCon => {
                // Get additional info length
                let add_info_len = self.additional_info_length();
                let service_start = 2 + add_info_len as usize;

                if self.data.len() < service_start {
                    return Err(KnxError::malformed_frame("invalid cEMI frame length"));
                }

                // Parse directly from data with correct lifetime
                LDataFrame::parse(&self.data[service_start..])
            }
            _ => Err(KnxError::malformed_frame("unknown cEMI message code")),
        }
    }

    /// Check if this is an `L_Data` frame
    pub const fn is_ldata(&self) -> bool {
        matches!(
            self.message_code,
            CEMIMessageCode::LDataReq | CEMIMessageCode::LDataInd | CEMIMessageCode::LDataCon
        )
    }
}

/// Outbound `L_Data` cEMI frame builder for group communication
///
/// Mirrors [`LDataFrame`] but owns the fields needed to construct a frame to
/// send rather than borrow one that was received.
#[derive(Debug, Clone, Copy)]
pub struct LDataRequest<'a> {
    /// cEMI message code (`L_Data.req` for outbound frames)
    pub message_code: CEMIMessageCode,
    /// Control field 1
    pub ctrl1: ControlField1,
    /// Control field 2
    pub ctrl2: ControlField2,
    /// Source individual address
    pub source: IndividualAddress,
    /// Destination group address
    pub destination: GroupAddress,
    /// APCI command
    pub apci: Apci,
    /// Application data (empty for `A_GroupValue_Read`)
    pub data: &'a [u8],
}

impl<'a> LDataRequest<'a> {
    /// Build an `A_GroupValue_Write` request
    pub fn group_write(source: IndividualAddress, destination: GroupAddress, data: &'a [u8]) -> Self {
        Self {
            message_code: CEMIMessageCode::LDataReq,
            ctrl1: ControlField1::default(),
            ctrl2: ControlField2::default(),
            source,
            destination,
            apci: Apci::GroupValueWrite,
            data,
        }
    }

    /// Build an `A_GroupValue_Read` request
    pub fn group_read(source: IndividualAddress, destination: GroupAddress) -> Self {
        Self {
            message_code: CEMIMessageCode::LDataReq,
            ctrl1: ControlField1::default(),
            ctrl2: ControlField2::default(),
            source,
            destination,
            apci: Apci::GroupValueRead,
            data: &[],
        }
    }

    /// Build an `A_GroupValue_Response` request
    pub fn group_response(source: IndividualAddress, destination: GroupAddress, data: &'a [u8]) -> Self {
        Self {
            message_code: CEMIMessageCode::LDataReq,
            ctrl1: ControlField1::default(),
            ctrl2: ControlField2::default(),
            source,
            destination,
            apci: Apci::GroupValueResponse,
            data,
        }
    }

    /// Encode this request into `buf`, returning the number of bytes written
    ///
    /// A single data byte that fits in 2 bits is packed directly into the
    /// APCI byte (the "short APDU" form); gateways require this encoding for
    /// 1-bit group writes such as switching. Anything else is carried as
    /// separate NPDU data bytes following TPCI/APCI.
    ///
    /// # Errors
    ///
    /// Returns `MalformedFrame` if `buf` is too small.
    pub fn build(&self, buf: &mut [u8]) -> Result<usize> {
        let short_packable = self.data.len() == 1 && (self.data[0] & 0x03) == self.data[0];

        let total_len = if short_packable { 11 } else { 11 + self.data.len() };

        if buf.len() < total_len {
            return Err(KnxError::malformed_frame("buffer too small for cEMI frame"));
        }

        buf[0] = self.message_code.to_u8();
        buf[1] = 0x00; // no additional info
        buf[2] = self.ctrl1.raw();
        buf[3] = self.ctrl2.raw();
        buf[4..6].copy_from_slice(&self.source.raw().to_be_bytes());
        buf[6..8].copy_from_slice(&self.destination.raw().to_be_bytes());
        buf[9] = 0x00; // TPCI: unnumbered data

        if short_packable {
            buf[8] = 1; // NPDU length: APCI only, no separate data byte
            buf[10] = (self.apci.to_u16() as u8) | self.data[0];
        } else {
            buf[8] = 1 + self.data.len() as u8;
            buf[10] = self.apci.to_u16() as u8;
            buf[11..11 + self.data.len()].copy_from_slice(self.data);
        }

        Ok(total_len)
    }
}

/// Helper function to extract data value from 6-bit encoded value in APCI
///
/// For small data (≤6 bits), the value is encoded directly in the APCI byte.
/// This is common for boolean values and small integers. Bits 7-6 belong to
/// the APCI command itself and must not be mistaken for data.
pub const fn extract_6bit_value(apci_byte: u8) -> u8 {
    apci_byte & 0x2F
}
