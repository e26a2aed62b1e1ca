/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use log::debug;

use crate::imagex_error::{err_exit_code, ExitCode, Result};

/// Big-endian bit reader over the entropy-coded data of a scan.
///
/// Bits are kept left aligned in a 64 bit register so that the next bit to be read
/// is always the top bit. Byte stuffing (0xFF followed by 0x00) is removed while
/// refilling, so callers only ever see the coded bits.
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    bits: u64,
    bits_left: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            position: 0,
            bits: 0,
            bits_left: 0,
        }
    }

    /// number of bits that can still be read, counting the ones in the register
    pub fn remaining_bits(&self) -> usize {
        self.bits_left as usize + 8 * (self.data.len() - self.position)
    }

    /// Returns the next `bits_to_peek` bits (at most 16) without consuming them.
    #[inline(always)]
    pub fn peek(&mut self, bits_to_peek: u32) -> Result<u16> {
        debug_assert!(bits_to_peek <= 16);

        if bits_to_peek == 0 {
            return Ok(0);
        }

        if self.bits_left < bits_to_peek {
            self.fill_register(bits_to_peek)?;
        }

        Ok((self.bits >> (64 - bits_to_peek)) as u16)
    }

    /// Consumes bits that were previously made available by peek.
    #[inline(always)]
    pub fn advance(&mut self, bits: u32) {
        debug_assert!(bits <= self.bits_left);

        self.bits = self.bits.wrapping_shl(bits);
        self.bits_left -= bits;
    }

    #[inline(always)]
    pub fn read(&mut self, bits_to_read: u32) -> Result<u16> {
        let value = self.peek(bits_to_read)?;
        self.advance(bits_to_read);
        Ok(value)
    }

    /// Reads a `bit_length` bit value in the JPEG signed-magnitude encoding (the EXTEND
    /// procedure of F.2.2.1 in ITU T.81): if the top bit is set the value is taken as is,
    /// otherwise it represents the negative value `raw - (2^bit_length - 1)`.
    #[inline(always)]
    pub fn read_signed_magnitude(&mut self, bit_length: u32) -> Result<i32> {
        if bit_length == 0 {
            return Ok(0);
        }

        let raw = i32::from(self.peek(bit_length)?);
        let negative = (self.bits >> 63) == 0;
        self.advance(bit_length);

        if negative {
            Ok(raw - ((1 << bit_length) - 1))
        } else {
            Ok(raw)
        }
    }

    /// Loads whole bytes into the register until at least `bits_to_read` bits are
    /// available, skipping the 0x00 that follows every 0xFF in the entropy-coded data.
    fn fill_register(&mut self, bits_to_read: u32) -> Result<()> {
        while self.bits_left <= 56 && self.position < self.data.len() {
            let b = self.data[self.position];
            self.position += 1;

            if b == 0xFF {
                match self.data.get(self.position) {
                    Some(0) => {
                        // escaped 0xff
                        self.position += 1;
                    }
                    Some(&next) => {
                        // fill bytes or a marker end the coded data
                        self.position -= 1;
                        debug!(
                            "entropy-coded data ends at FF {0:X}, {1} bytes not read",
                            next,
                            self.data.len() - self.position
                        );
                        let data = self.data;
                        self.data = &data[..self.position];
                        break;
                    }
                    None => {
                        // a single trailing 0xff is treated as data, the scanner already cut the range at the next marker
                    }
                }
            }

            self.bits |= u64::from(b) << (56 - self.bits_left);
            self.bits_left += 8;
        }

        if self.bits_left < bits_to_read {
            return err_exit_code(
                ExitCode::ShortRead,
                format!(
                    "bitstream exhausted, needed {0} bits but only {1} left",
                    bits_to_read, self.bits_left
                ),
            );
        }

        Ok(())
    }
}
