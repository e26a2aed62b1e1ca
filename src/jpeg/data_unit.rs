/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use std::ops::Range;

use super::frame_header::FrameHeader;
use super::quantization_table::QuantizationTable;
use crate::consts::*;

/// The 64 quantized coefficients of one 8x8 block of a component, in zig-zag order
/// as they appear in the bitstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataUnit {
    /// index of the component in the frame
    pub component: usize,
    pub zigzag: [i32; BLOCK_SIZE],
}

impl DataUnit {
    pub fn new(component: usize) -> Self {
        DataUnit {
            component,
            zigzag: [0; BLOCK_SIZE],
        }
    }

    /// coefficients in natural (row * 8 + column) order
    pub fn reorder(&self) -> [i32; BLOCK_SIZE] {
        let mut table = [0; BLOCK_SIZE];
        for (i, &c) in self.zigzag.iter().enumerate() {
            table[usize::from(ZIGZAG_TO_NATURAL[i])] = c;
        }
        table
    }
}

/// A group of data units that together cover one MCU of the image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mcu {
    pub top_pixel: u32,
    pub left_pixel: u32,
    pub data_units: Range<usize>,
}

/// All data units of a frame in MCU order, along with the quantization table each
/// component was coded with. Scans fill it in place so that a frame split over several
/// scans ends up with every component's coefficients.
#[derive(Clone, Debug)]
pub struct CoefficientStore {
    pub data_units: Vec<DataUnit>,

    /// quantization table of each component, set by the scan that coded it
    pub quantization_tables: Vec<Option<QuantizationTable>>,
}

impl CoefficientStore {
    pub fn new(frame: &FrameHeader) -> Self {
        let mut data_units = Vec::with_capacity(frame.mcu_count() * frame.data_units_per_mcu());
        for _ in 0..frame.mcu_count() {
            data_units.extend(
                frame
                    .data_unit_sequence
                    .iter()
                    .map(|&component| DataUnit::new(component)),
            );
        }

        CoefficientStore {
            data_units,
            quantization_tables: vec![None; frame.components.len()],
        }
    }

    /// the MCUs of the frame in raster order
    pub fn mcus(frame: &FrameHeader) -> impl Iterator<Item = Mcu> + '_ {
        let per_mcu = frame.data_units_per_mcu();
        (0..frame.mcu_count()).map(move |i| {
            let row = (i / frame.scan_width_in_mcu as usize) as u32;
            let col = (i % frame.scan_width_in_mcu as usize) as u32;
            Mcu {
                top_pixel: row * frame.mcu_pixel_height(),
                left_pixel: col * frame.mcu_pixel_width(),
                data_units: i * per_mcu..(i + 1) * per_mcu,
            }
        })
    }
}
