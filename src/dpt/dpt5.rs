//! DPT 5.xxx - 8-bit Unsigned Value (1 byte)
//!
//! 8-bit unsigned datapoint types represent values from 0 to 255
//! with different scaling and interpretations.
//!
//! ## Format
//!
//! - 8 bits: unsigned value (0-255)
//!
//! ## Common Subtypes
//!
//! - **5.001** - Percentage (0-100%)
//! - **5.003** - Angle (0-360°)
//! - **5.004** - Percentage 0-255 (0-255)
//! - **5.005** - Ratio (0-255)
//! - **5.006** - Tariff (0-254)
//! - **5.010** - Counter pulses (0-255)
//!
//! ## Example
//!
//! ```rust,no_run
//! use knx_tunnel::dpt::{Dpt5, DptEncode, DptDecode};
//!
//! let mut buf = [0u8; 1];
//!
//! // Encode percentage (0-100%)
//! let len = Dpt5::Percentage.encode(75, &mut buf)?;  // [0xBF] = 191
//!
//! // Decode
//! let value = Dpt5::Percentage.decode(&buf[..len])?;  // 75
//! # Ok::<(), knx_tunnel::KnxError>(())
//! ```

use crate::error::{KnxError, Result};
use crate::dpt::{DptEncode, DptDecode};

/// DPT 5.xxx 8-bit unsigned types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dpt5 {
    /// DPT 5.001 - Percentage (0-100%)
    Percentage,
    /// DPT 5.003 - Angle (0-360°)
    Angle,
    /// DPT 5.004 - Percentage 0-255 (0-255)
    PercentU8,
    /// DPT 5.005 - Ratio (0-255)
    Ratio,
    /// DPT 5.006 - Tariff (0-254)
    Tariff,
    /// DPT 5.010 - Counter pulses (0-255)
    Counter,
}

impl Dpt5 {
    /// Get the DPT identifier string (e.g., "5.001")
    pub const fn identifier(&self) -> &'static str {
        match self {
            Dpt5::Percentage => "5.001",
            Dpt5::Angle => "5.003",
            Dpt5::PercentU8 => "5.004",
            Dpt5::Ratio => "5.005",
            Dpt5::Tariff => "5.006",
            Dpt5::Counter => "5.010",
        }
    }

    /// Get the unit string for this DPT
    pub const fn unit(&self) -> &'static str {
        match self {
            Dpt5::Percentage => "%",
            Dpt5::Angle => "°",
            Dpt5::PercentU8 => "",
            Dpt5::Ratio => "",
            Dpt5::Tariff => "",
            Dpt5::Counter => "pulses",
        }
    }

    /// Get the valid range for this DPT (min, max)
    pub const fn range(&self) -> (u16, u16) {
        match self {
            Dpt5::Percentage => (0, 100),
            Dpt5::Angle => (0, 360),
            Dpt5::PercentU8 => (0, 255),
            Dpt5::Ratio => (0, 255),
            Dpt5::Tariff => (0, 254),
            Dpt5::Counter => (0, 255),
        }
    }

    /// Encode a value to raw byte
    ///
    /// For scaled types (Percentage, Angle), this performs the scaling.
    #[inline]
    fn encode_scaled(&self, value: u16) -> Result<u8> {
        let (min, max) = self.range();

        if value > max {
            return Err(KnxError::out_of_range(format!("DPT5 value {value} exceeds {max}")));
        }

        let scaled = match self {
            Dpt5::Percentage => {
                // 0-100% -> 0-255
                // scaled = value * 255 / 100
                ((u32::from(value) * 255) / 100) as u8
            }
            Dpt5::Angle => {
                // 0-360° -> 0-255
                // scaled = value * 255 / 360
                ((u32::from(value) * 255) / 360) as u8
            }
            // Direct mapping for others
            Dpt5::PercentU8 | Dpt5::Ratio | Dpt5::Counter | Dpt5::Tariff => {
                if value < min || value > max {
                    return Err(KnxError::out_of_range(format!("DPT5 value {value} out of range")));
                }
                value as u8
            }
        };

        Ok(scaled)
    }

    /// Decode raw byte to value
    ///
    /// For scaled types (Percentage, Angle), this performs the inverse scaling.
    #[inline]
    fn decode_scaled(&self, raw: u8) -> Result<u16> {
        let value = match self {
            Dpt5::Percentage => {
                // 0-255 -> 0-100%
                // value = raw * 100 / 255
                ((u32::from(raw) * 100) / 255) as u16
            }
            Dpt5::Angle => {
                // 0-255 -> 0-360°
                // value = raw * 360 / 255
                ((u32::from(raw) * 360) / 255) as u16
            }
            Dpt5::Tariff => {
                // Tariff has max 254
                if raw > 254 {
                    return Err(KnxError::out_of_range(format!("tariff raw value {raw} exceeds 254")));
                }
                u16::from(raw)
            }
            // Direct mapping for others
            Dpt5::PercentU8 | Dpt5::Ratio | Dpt5::Counter => u16::from(raw),
        };

        Ok(value)
    }
}

impl DptEncode<u16> for Dpt5 {
    fn encode(&self, value: u16, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(KnxError::malformed_frame("buffer too small for DPT5"));
        }
        buf[0] = self.encode_scaled(value)?;
        Ok(1)
    }
}

impl DptDecode<u16> for Dpt5 {
    fn decode(&self, data: &[u8]) -> Result<u16> {
        if data.is_empty() {
            return Err(KnxError::malformed_frame("empty DPT5 data"));
        }

        self.decode_scaled(data[0])
    }
}

impl Dpt5 {
    /// Encode a value to a byte
    ///
    /// This is a convenience method that returns the encoded byte directly.
    /// Use this instead of the trait method.
    ///
    /// # Arguments
    /// * `value` - The value to encode
    ///
    /// # Returns
    /// The encoded byte value
    ///
    /// # Errors
    /// Returns `DptValueOutOfRange` if value is outside valid range
    pub fn encode_to_byte(&self, value: u16) -> Result<u8> {
        self.encode_scaled(value)
    }
}
