//! Value checks shared by the configuration validator.
//!
//! Each check returns the accepted range as its error, ready to be placed in
//! an error message.

use std::ops::RangeInclusive;

/// Range of valid GPIB primary addresses.
pub const PAD_RANGE: RangeInclusive<u32> = 0..=30;

/// Range of valid GPIB secondary addresses when secondary addressing is enabled.
/// A secondary address of 0 disables secondary addressing.
pub const SAD_RANGE: RangeInclusive<u32> = 0x60..=0x7e;

/// Validates a GPIB primary address.
///
/// # Arguments
///
/// * `pad` - The primary address to validate.
///
/// # Returns
///
/// * `Ok(())` if the address is within 0-30.
/// * `Err(&'static str)` otherwise.
pub fn is_valid_pad(pad: u32) -> Result<(), &'static str> {
    is_in_range(pad, PAD_RANGE).map_err(|_| "0-30")
}

/// Validates a GPIB secondary address.
///
/// # Arguments
///
/// * `sad` - The secondary address to validate.
///
/// # Returns
///
/// * `Ok(())` if the address is 0 (disabled) or within 96-126.
/// * `Err(&'static str)` otherwise.
pub fn is_valid_sad(sad: u32) -> Result<(), &'static str> {
    if sad == 0 {
        return Ok(());
    }
    is_in_range(sad, SAD_RANGE).map_err(|_| "0 or 96-126")
}

/// Validates if a given value is within a specified numeric range.
///
/// # Arguments
///
/// * `value` - The value to validate.
/// * `range` - The inclusive range to validate against.
///
/// # Returns
///
/// * `Ok(())` if the value is within the range.
/// * `Err(&'static str)` if the value is outside the range.
pub fn is_in_range<T: PartialOrd>(value: T, range: RangeInclusive<T>) -> Result<(), &'static str> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err("Value is outside the specified range")
    }
}

/// Validates if a given string is not empty or blank.
pub fn is_not_empty(value: &str) -> Result<(), &'static str> {
    if !value.trim().is_empty() {
        Ok(())
    } else {
        Err("Value cannot be empty")
    }
}
