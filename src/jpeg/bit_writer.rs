/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use std::mem;

use super::huffman_table::HuffmanTable;
use crate::consts::*;

/// Writes varying sized bits for coding JPEG test streams. Escapes 0xff -> [0xff,0]
pub struct BitWriter {
    data_buffer: Vec<u8>,
    fill_register: u64,
    current_bit: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter {
            current_bit: 64,
            fill_register: 0,
            data_buffer: Vec::new(),
        }
    }

    /// flushes whole bytes from the register into the data buffer
    fn flush_whole_bytes(&mut self) {
        while self.current_bit <= 56 {
            let b = (self.fill_register >> 56) as u8;
            if b != 0xff {
                self.data_buffer.push(b);
            } else {
                self.data_buffer.extend_from_slice(&[0xff, 0]);
            }

            self.fill_register <<= 8;
            self.current_bit += 8;
        }
    }

    pub fn write(&mut self, val: u32, new_bits: u32) {
        debug_assert!(
            new_bits <= 32 && u64::from(val) < (1u64 << new_bits),
            "value {0} should fit into the number of {1} bits provided",
            val,
            new_bits
        );

        if new_bits == 0 {
            return;
        }

        self.fill_register |= u64::from(val) << (self.current_bit - new_bits);
        self.current_bit -= new_bits;

        self.flush_whole_bytes();
    }

    /// writes the code assigned to `symbol` in the table
    pub fn write_symbol(&mut self, table: &HuffmanTable, symbol: u8) {
        let (len, code, _) = table
            .codes()
            .into_iter()
            .find(|&(_, _, s)| s == symbol)
            .unwrap_or_else(|| panic!("symbol {0:X} not in table", symbol));

        self.write(u32::from(code), u32::from(len));
    }

    /// writes the `category` magnitude bits of a coefficient
    pub fn write_magnitude(&mut self, value: i32, category: u8) {
        let raw = if value >= 0 {
            value
        } else {
            value + (1 << category) - 1
        };
        self.write(raw as u32, u32::from(category));
    }

    /// Huffman codes one block given its DC difference and the AC coefficients
    /// in zig-zag order (index 0 is ignored).
    pub fn encode_block(
        &mut self,
        dc_table: &HuffmanTable,
        ac_table: &HuffmanTable,
        dc_diff: i32,
        zigzag: &[i32; BLOCK_SIZE],
    ) {
        let category = value_category(dc_diff);
        self.write_symbol(dc_table, category);
        self.write_magnitude(dc_diff, category);

        let last = (1..BLOCK_SIZE).rev().find(|&i| zigzag[i] != 0).unwrap_or(0);

        let mut run = 0;
        for &coef in &zigzag[1..=last] {
            if coef == 0 {
                run += 1;
                continue;
            }

            while run >= 16 {
                self.write_symbol(ac_table, 0xF0);
                run -= 16;
            }

            let category = value_category(coef);
            self.write_symbol(ac_table, (run << 4) | category);
            self.write_magnitude(coef, category);
            run = 0;
        }

        if last < BLOCK_SIZE - 1 {
            self.write_symbol(ac_table, 0x00);
        }
    }

    /// pads the last byte with ones, as encoders do before a marker
    pub fn pad(&mut self) {
        while (self.current_bit & 7) != 0 {
            self.write(1, 1);
        }
    }

    pub fn detach_buffer(&mut self) -> Vec<u8> {
        self.pad();
        self.flush_whole_bytes();

        mem::take(&mut self.data_buffer)
    }
}

/// number of magnitude bits needed for `value`
pub fn value_category(value: i32) -> u8 {
    (32 - value.unsigned_abs().leading_zeros()) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::jpeg::bit_reader::BitReader;

    // write a test pattern with an escape and see if it matches
    #[test]
    fn write_simple() {
        let arr = [0x12, 0x34, 0x45, 0x67, 0x89, 0xff, 00, 0xee];

        let mut b = BitWriter::new();

        b.write(1, 4);
        b.write(2, 4);
        b.write(3, 4);
        b.write(4, 4);
        b.write(4, 4);
        b.write(0x56, 8);
        b.write(0x78, 8);
        b.write(0x9f, 8);
        b.write(0xfe, 8);
        b.write(0xe, 4);

        let w = b.detach_buffer();

        assert_eq!(w[..], arr);
    }

    // magnitudes written here come back through the signed-magnitude reader
    #[test]
    fn roundtrip_magnitudes() {
        let values: Vec<i32> = (-2047..=2047).filter(|v| *v != 0).collect();

        let mut b = BitWriter::new();
        for &v in &values {
            b.write_magnitude(v, value_category(v));
        }
        let buf = b.detach_buffer();

        let mut r = BitReader::new(&buf);
        for &v in &values {
            assert_eq!(
                r.read_signed_magnitude(u32::from(value_category(v)))
                    .unwrap(),
                v
            );
        }
    }

    #[test]
    fn categories() {
        assert_eq!(value_category(0), 0);
        assert_eq!(value_category(1), 1);
        assert_eq!(value_category(-1), 1);
        assert_eq!(value_category(-10), 4);
        assert_eq!(value_category(1024), 11);
    }
}
