/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::imagex_error::{err_exit_code, ExitCode, ImagexError, Result};

/// Helper function to catch panics and convert them into the appropriate ImagexError
pub fn catch_unwind_result<R>(
    f: impl FnOnce() -> std::result::Result<R, ImagexError>,
) -> std::result::Result<R, ImagexError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => r,
        Err(err) => {
            if let Some(message) = err.downcast_ref::<&str>() {
                Err(ImagexError::new(ExitCode::AssertionFailure, *message))
            } else if let Some(message) = err.downcast_ref::<String>() {
                Err(ImagexError::new(ExitCode::AssertionFailure, message))
            } else {
                Err(ImagexError::new(
                    ExitCode::AssertionFailure,
                    "unknown panic",
                ))
            }
        }
    }
}

#[inline(always)]
pub const fn b_short(v1: u8, v2: u8) -> u16 {
    ((v1 as u16) << 8) + v2 as u16
}

/// low nibble
#[inline(always)]
pub const fn rbits(c: u8, n: usize) -> u8 {
    return c & (0xFF >> (8 - n));
}

/// high nibble
#[inline(always)]
pub const fn lbits(c: u8, n: usize) -> u8 {
    return c >> (8 - n);
}

/// ceiling of the integer division
#[inline(always)]
pub const fn div_ceil(numerator: u32, denominator: u32) -> u32 {
    (numerator + denominator - 1) / denominator
}

/// verifies that `amount` bytes starting at `hpos` are inside the segment
pub fn ensure_space(segment: &[u8], hpos: usize, amount: usize) -> Result<()> {
    if hpos + amount > segment.len() {
        return err_exit_code(
            ExitCode::InvalidSegment,
            format!(
                "segment too small, need {0} bytes at offset {1} but only {2} present",
                amount,
                hpos,
                segment.len()
            ),
        );
    }

    Ok(())
}

#[cfg(test)]
pub fn get_rand_from_seed(seed: [u8; 32]) -> rand_chacha::ChaCha12Rng {
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    ChaCha12Rng::from_seed(seed)
}

#[test]
fn nibbles() {
    assert_eq!(lbits(0xA3, 4), 0xA);
    assert_eq!(rbits(0xA3, 4), 0x3);
    assert_eq!(b_short(0x12, 0x34), 0x1234);
}

#[test]
fn ceiling_division() {
    assert_eq!(div_ceil(16, 8), 2);
    assert_eq!(div_ceil(17, 8), 3);
    assert_eq!(div_ceil(1, 16), 1);
}

#[test]
fn ensure_space_reports_short_segment() {
    let segment = [0u8; 4];
    assert!(ensure_space(&segment, 2, 2).is_ok());
    assert_eq!(
        ensure_space(&segment, 3, 2).unwrap_err().exit_code(),
        ExitCode::InvalidSegment
    );
}
