/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use log::debug;

use super::bit_reader::BitReader;
use crate::helpers::*;
use crate::imagex_error::{err_exit_code, AddContext, ExitCode, Result};

/// longest code length allowed by JPEG
pub const MAX_CODE_LENGTH: usize = 16;

/// Decoded meaning of a Huffman code: the high nibble of the symbol byte is the number
/// of zero coefficients preceding the value, the low nibble the bit length of the value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub num_preceding_zeroes: u8,
    pub value_bit_length: u8,
}

impl Symbol {
    pub fn from_byte(b: u8) -> Self {
        Symbol {
            num_preceding_zeroes: lbits(b, 4),
            value_bit_length: rbits(b, 4),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TableClass {
    DC = 0,
    AC = 1,
}

/// Canonical Huffman table as transmitted in a DHT segment.
///
/// Codes of the same length are assigned consecutive values, so for every length we only
/// keep the first code, how many codes there are, and where their symbols start.
#[derive(Clone, Debug)]
pub struct HuffmanTable {
    class: TableClass,
    id: u8,
    first_code: [u16; MAX_CODE_LENGTH + 1],
    code_count: [u16; MAX_CODE_LENGTH + 1],
    symbol_offset: [u16; MAX_CODE_LENGTH + 1],
    symbols: Vec<u8>,

    /// lengths with at least one code, in ascending order, so decoding only probes these
    valid_code_lengths: Vec<u8>,
}

impl HuffmanTable {
    /// Constructs from the format encoded by JPEG
    ///
    /// Tree consists of a 16 byte table with the number of codes for each bit length,
    /// followed by the actual symbols for that length appended together. Returns the
    /// table and the number of bytes consumed from the segment.
    pub fn construct_from_segment(
        class: TableClass,
        id: u8,
        segment: &[u8],
    ) -> Result<(Self, usize)> {
        let clen_offset = 0;
        let cval_offset = MAX_CODE_LENGTH;

        ensure_space(segment, clen_offset, MAX_CODE_LENGTH).context()?;

        let mut table = HuffmanTable {
            class,
            id,
            first_code: [0; MAX_CODE_LENGTH + 1],
            code_count: [0; MAX_CODE_LENGTH + 1],
            symbol_offset: [0; MAX_CODE_LENGTH + 1],
            symbols: Vec::new(),
            valid_code_lengths: Vec::new(),
        };

        let mut k = 0;
        let mut code: u32 = 0;

        for i in 0..MAX_CODE_LENGTH {
            let len = i + 1;
            let count = usize::from(segment[clen_offset + i]);

            ensure_space(segment, cval_offset, k + count).context()?;

            if code + count as u32 > (1u32 << len) {
                return err_exit_code(
                    ExitCode::InvalidSegment,
                    "invalid huffman code layout, too many codes for a given length",
                );
            }

            table.first_code[len] = code as u16;
            table.code_count[len] = count as u16;
            table.symbol_offset[len] = k as u16;

            if count > 0 {
                table.valid_code_lengths.push(len as u8);
            }

            table
                .symbols
                .extend_from_slice(&segment[cval_offset + k..cval_offset + k + count]);

            k += count;
            code += count as u32;
            code <<= 1;
        }

        if table.symbols.is_empty() {
            return err_exit_code(ExitCode::InvalidSegment, "huffman table without codes");
        }

        Ok((table, cval_offset + k))
    }

    pub fn class(&self) -> TableClass {
        self.class
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn valid_code_lengths(&self) -> &[u8] {
        &self.valid_code_lengths
    }

    /// returns the symbol for the `code` of the given bit length, if there is one
    #[inline(always)]
    pub fn lookup(&self, code_length: u8, code: u16) -> Option<Symbol> {
        let len = usize::from(code_length);
        if len == 0 || len > MAX_CODE_LENGTH || code < self.first_code[len] {
            return None;
        }

        let index = code - self.first_code[len];
        if index >= self.code_count[len] {
            return None;
        }

        let b = self.symbols[usize::from(self.symbol_offset[len] + index)];
        Some(Symbol::from_byte(b))
    }

    /// Reads the next code from the bitstream, probing the valid code lengths from
    /// shortest to longest.
    pub fn decode_symbol(&self, bit_reader: &mut BitReader) -> Result<Symbol> {
        for &code_length in &self.valid_code_lengths {
            let code = bit_reader.peek(u32::from(code_length)).context()?;
            if let Some(symbol) = self.lookup(code_length, code) {
                bit_reader.advance(u32::from(code_length));
                return Ok(symbol);
            }
        }

        err_exit_code(
            ExitCode::HuffmanCodeNotFound,
            format!(
                "no code found in {0:?} huffman table {1}",
                self.class, self.id
            ),
        )
    }

    /// every (code length, code, symbol byte) in the table, in code order
    #[cfg(test)]
    pub fn codes(&self) -> Vec<(u8, u16, u8)> {
        let mut codes = Vec::new();
        for &len in &self.valid_code_lengths {
            let l = usize::from(len);
            for i in 0..self.code_count[l] {
                codes.push((
                    len,
                    self.first_code[l] + i,
                    self.symbols[usize::from(self.symbol_offset[l] + i)],
                ));
            }
        }
        codes
    }
}

/// Parses a DHT segment, which can define several tables back to back.
pub fn parse_dht(segment: &[u8]) -> Result<Vec<HuffmanTable>> {
    let mut tables = Vec::new();
    let mut hpos = 0;

    while hpos < segment.len() {
        let lval = lbits(segment[hpos], 4);
        let rval = rbits(segment[hpos], 4);
        if lval >= 2 || rval >= 4 {
            return err_exit_code(
                ExitCode::InvalidSegment,
                format!("DHT has invalid class {0} or index {1}", lval, rval),
            );
        }

        hpos += 1;

        let class = if lval == 0 {
            TableClass::DC
        } else {
            TableClass::AC
        };

        let (table, consumed) =
            HuffmanTable::construct_from_segment(class, rval, &segment[hpos..]).context()?;

        debug!(
            "DHT {0:?} table {1} with {2} codes",
            class,
            rval,
            table.symbols.len()
        );

        tables.push(table);
        hpos += consumed;
    }

    Ok(tables)
}
