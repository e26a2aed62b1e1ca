/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use byteorder::{BigEndian, ByteOrder};
use log::debug;

use crate::consts::*;
use crate::helpers::*;
use crate::imagex_error::{err_exit_code, AddContext, ExitCode, Result};

/// Quantization table with its 64 entries in natural (row * 8 + column) order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantizationTable {
    id: u8,
    table: [u16; BLOCK_SIZE],
}

impl QuantizationTable {
    /// builds the table from entries transmitted in zig-zag order
    pub fn from_zigzag(id: u8, zigzag: &[u16; BLOCK_SIZE]) -> Self {
        let mut table = [0u16; BLOCK_SIZE];
        for (i, &q) in zigzag.iter().enumerate() {
            table[usize::from(ZIGZAG_TO_NATURAL[i])] = q;
        }

        QuantizationTable { id, table }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn get_quantization_table(&self) -> &[u16; BLOCK_SIZE] {
        &self.table
    }

    #[cfg(test)]
    pub fn get(&self, row: usize, column: usize) -> u16 {
        self.table[row * BLOCK_DIM + column]
    }
}

/// Parses a DQT segment, which can define several tables back to back.
pub fn parse_dqt(segment: &[u8]) -> Result<Vec<QuantizationTable>> {
    let mut tables = Vec::new();
    let mut hpos = 0;

    while hpos < segment.len() {
        let precision = lbits(segment[hpos], 4);
        let id = rbits(segment[hpos], 4);

        if precision >= 2 {
            return err_exit_code(
                ExitCode::InvalidQuantizationPrecision,
                format!("DQT table {0} has precision {1}", id, precision),
            );
        }

        if usize::from(id) >= MAX_COMPONENTS {
            return err_exit_code(
                ExitCode::InvalidSegment,
                format!("DQT has invalid index {0}", id),
            );
        }

        hpos += 1;

        let mut zigzag = [0u16; BLOCK_SIZE];
        if precision == 0 {
            ensure_space(segment, hpos, BLOCK_SIZE).context()?;

            // 8 bit precision
            for (i, q) in zigzag.iter_mut().enumerate() {
                *q = u16::from(segment[hpos + i]);
            }

            hpos += BLOCK_SIZE;
        } else {
            ensure_space(segment, hpos, 2 * BLOCK_SIZE).context()?;

            // 16 bit precision
            BigEndian::read_u16_into(&segment[hpos..hpos + 2 * BLOCK_SIZE], &mut zigzag);

            hpos += 2 * BLOCK_SIZE;
        }

        debug!(
            "DQT table {0} with {1} bit precision, DC quantizer {2}",
            id,
            if precision == 0 { 8 } else { 16 },
            zigzag[0]
        );

        tables.push(QuantizationTable::from_zigzag(id, &zigzag));
    }

    Ok(tables)
}
