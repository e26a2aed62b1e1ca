/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use log::{debug, warn};

use super::bit_reader::BitReader;
use super::data_unit::CoefficientStore;
use super::frame_header::FrameHeader;
use super::huffman_table::{HuffmanTable, TableClass};
use super::jpg::Scan;
use crate::consts::*;
use crate::imagex_error::{err_exit_code, AddContext, ExitCode, Result};

/// largest DC difference category for 8 bit samples
const MAX_DC_CATEGORY: u8 = 11;

/// largest AC coefficient category for 8 bit samples
const MAX_AC_CATEGORY: u8 = 10;

/// Component of the scan with every reference resolved
struct ScanComponentState<'a> {
    /// index of the component in the frame
    component: usize,
    dc_table: &'a HuffmanTable,
    ac_table: &'a HuffmanTable,
}

/// Checks that everything the scan refers to exists before any bit is decoded.
fn resolve_components<'a>(
    frame: &FrameHeader,
    scan: &'a Scan,
    store: &mut CoefficientStore,
) -> Result<Vec<ScanComponentState<'a>>> {
    let mut resolved = Vec::with_capacity(scan.header.components.len());

    for sc in &scan.header.components {
        let component = match frame.component_index(sc.component_id) {
            Some(c) => c,
            None => {
                return err_exit_code(
                    ExitCode::ComponentNotFound,
                    format!("scan references undeclared component {0}", sc.component_id),
                );
            }
        };

        let dc_table = match scan.huffman_table(TableClass::DC, sc.dc_table) {
            Some(t) => t,
            None => {
                return err_exit_code(
                    ExitCode::HuffmanTableNotFound,
                    format!(
                        "component {0} uses DC table {1} which is not defined",
                        sc.component_id, sc.dc_table
                    ),
                );
            }
        };

        let ac_table = match scan.huffman_table(TableClass::AC, sc.ac_table) {
            Some(t) => t,
            None => {
                return err_exit_code(
                    ExitCode::HuffmanTableNotFound,
                    format!(
                        "component {0} uses AC table {1} which is not defined",
                        sc.component_id, sc.ac_table
                    ),
                );
            }
        };

        let q_table_index = frame.components[component].q_table_index;
        let quantization_table = match scan.quantization_table(q_table_index) {
            Some(q) => q,
            None => {
                return err_exit_code(
                    ExitCode::QuantizationTableNotFound,
                    format!(
                        "component {0} uses quantization table {1} which is not defined",
                        sc.component_id, q_table_index
                    ),
                );
            }
        };

        store.quantization_tables[component] = Some(quantization_table.clone());

        resolved.push(ScanComponentState {
            component,
            dc_table,
            ac_table,
        });
    }

    Ok(resolved)
}

/// Decodes the entropy-coded data of one scan into the coefficient store.
///
/// Interleaved scans walk every MCU of the frame and decode the data units of the
/// components they contain, in `data_unit_sequence` order. A scan with a single component
/// walks that component's own block grid in raster order instead.
pub fn decode_scan_coefficients(
    frame: &FrameHeader,
    scan: &Scan,
    store: &mut CoefficientStore,
) -> Result<()> {
    if scan.restart_interval != 0 {
        return err_exit_code(
            ExitCode::RestartIntervalUnsupported,
            format!("restart interval {0} not supported", scan.restart_interval),
        );
    }

    let components = resolve_components(frame, scan, store).context()?;

    let mut bit_reader = BitReader::new(&scan.data);

    // DC predictors start at zero for every scan
    let mut lastdc = [0i32; MAX_COMPONENTS];

    if scan.header.is_interleaved() {
        // position of each frame component within the scan, if present
        let mut slot_of_component = [None; MAX_COMPONENTS];
        for (slot, c) in components.iter().enumerate() {
            slot_of_component[c.component] = Some(slot);
        }

        let per_mcu = frame.data_units_per_mcu();
        for mcu in 0..frame.mcu_count() {
            for (k, &component) in frame.data_unit_sequence.iter().enumerate() {
                let slot = match slot_of_component[component] {
                    Some(s) => s,
                    None => continue,
                };

                let state = &components[slot];
                let data_unit = &mut store.data_units[mcu * per_mcu + k];
                decode_block_seq(
                    &mut bit_reader,
                    state.dc_table,
                    state.ac_table,
                    &mut lastdc[slot],
                    &mut data_unit.zigzag,
                )
                .context()?;
            }
        }
    } else {
        let state = &components[0];
        let info = &frame.components[state.component];

        for by in 0..info.ncv {
            for bx in 0..info.nch {
                let index = frame.data_unit_index(state.component, bx, by);
                decode_block_seq(
                    &mut bit_reader,
                    state.dc_table,
                    state.ac_table,
                    &mut lastdc[0],
                    &mut store.data_units[index].zigzag,
                )
                .context()?;
            }
        }
    }

    let leftover = bit_reader.remaining_bits();
    if leftover >= 8 {
        warn!("{0} bits of entropy-coded data left after the last MCU", leftover);
    } else {
        debug!("scan decoded, {0} padding bits", leftover);
    }

    Ok(())
}

/// Decodes one data unit: the DC difference added to the component's predictor,
/// then the run-length coded AC coefficients up to end of block.
pub fn decode_block_seq(
    bit_reader: &mut BitReader,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    lastdc: &mut i32,
    block: &mut [i32; BLOCK_SIZE],
) -> Result<()> {
    *block = [0; BLOCK_SIZE];

    // decode dc
    let dc = dc_table.decode_symbol(bit_reader)?;
    if dc.num_preceding_zeroes != 0 || dc.value_bit_length > MAX_DC_CATEGORY {
        return err_exit_code(
            ExitCode::InvalidSymbol,
            format!(
                "invalid DC symbol {0:X}{1:X}",
                dc.num_preceding_zeroes, dc.value_bit_length
            ),
        );
    }

    let diff = bit_reader.read_signed_magnitude(u32::from(dc.value_bit_length))?;
    *lastdc = lastdc.wrapping_add(diff);
    block[0] = *lastdc;

    // decode ac
    let mut bpos: usize = 1;
    while bpos < BLOCK_SIZE {
        let symbol = ac_table.decode_symbol(bit_reader)?;
        let z = usize::from(symbol.num_preceding_zeroes);

        match symbol.value_bit_length {
            0 if z == 0 => {
                // EOB, everything after stays zero
                break;
            }
            0 if z == 15 => {
                // ZRL
                bpos += 16;
                if bpos > BLOCK_SIZE {
                    return err_exit_code(
                        ExitCode::McuEndNotFound,
                        "zero run goes past the end of the block",
                    );
                }
            }
            s if s == 0 || s > MAX_AC_CATEGORY => {
                return err_exit_code(
                    ExitCode::InvalidSymbol,
                    format!("invalid AC symbol {0:X}{1:X}", z, s),
                );
            }
            s => {
                bpos += z;
                if bpos >= BLOCK_SIZE {
                    return err_exit_code(
                        ExitCode::McuEndNotFound,
                        format!("coefficient index {0} past the end of the block", bpos),
                    );
                }

                block[bpos] = bit_reader.read_signed_magnitude(u32::from(s))?;
                bpos += 1;
            }
        }
    }

    Ok(())
}
