//! Convenience macros for working with KNX addresses.

/// Creates a [`GroupAddress`](crate::addressing::GroupAddress) from 3-level notation.
///
/// # Examples
///
/// ```
/// use knx_tunnel::ga;
///
/// let addr = ga!(1 / 2 / 3);
/// assert_eq!(addr.to_string(), "1/2/3");
/// ```
///
/// # Compile-Time Validation
///
/// ```compile_fail
/// use knx_tunnel::ga;
/// let addr = ga!(32 / 0 / 0); // main group must be 0-31
/// ```
#[macro_export]
macro_rules! ga {
    ($main:literal / $middle:literal / $sub:literal) => {{
        const _: () = {
            if $main > 31 {
                panic!("Main group must be 0-31");
            }
            if $middle > 7 {
                panic!("Middle group must be 0-7");
            }
            if $sub > 255 {
                panic!("Sub group must be 0-255");
            }
        };

        const RAW: u16 = (($main & 0x1F) << 11) | (($middle & 0x07) << 8) | ($sub & 0xFF);
        $crate::addressing::GroupAddress::from(RAW)
    }};
}
