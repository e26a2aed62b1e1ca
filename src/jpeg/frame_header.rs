/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use byteorder::{BigEndian, ByteOrder};
use log::info;

use super::component_info::ComponentInfo;
use crate::consts::*;
use crate::enabled_features::EnabledFeatures;
use crate::helpers::*;
use crate::imagex_error::{err_exit_code, AddContext, ExitCode, Result};

/// largest sampling factor allowed by JPEG
const MAX_SAMPLING_FACTOR: u32 = 4;

/// Geometry of a baseline frame as declared by its SOF0 segment, together with
/// everything derived from it that the scans need to walk the MCUs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// bits per sample, always 8 for baseline
    pub precision: u8,

    /// image height in pixels
    pub lines: u32,

    /// image width in pixels
    pub samples_per_line: u32,

    /// components in declaration order
    pub components: Vec<ComponentInfo>,

    pub mcu_width_in_data_units: u32,
    pub mcu_height_in_data_units: u32,

    pub scan_width_in_mcu: u32,
    pub scan_height_in_mcu: u32,

    /// index into `components` for each data unit of an interleaved MCU, in coding order
    pub data_unit_sequence: Vec<usize>,
}

impl FrameHeader {
    /// Parses the payload of a SOF0 segment.
    pub fn parse_sof0(segment: &[u8], enabled_features: &EnabledFeatures) -> Result<Self> {
        ensure_space(segment, 0, 6).context()?;

        // check data precision, only 8 bit is allowed
        let precision = segment[0];
        if precision != 8 {
            return err_exit_code(
                ExitCode::UnsupportedJpeg,
                format!("{0} bit data precision is not supported", precision),
            );
        }

        // image size, height & component count
        let lines = u32::from(BigEndian::read_u16(&segment[1..3]));
        let samples_per_line = u32::from(BigEndian::read_u16(&segment[3..5]));

        if lines == 0 || samples_per_line == 0 {
            return err_exit_code(ExitCode::UnsupportedJpeg, "image dimensions can't be zero");
        }

        if lines > enabled_features.max_jpeg_height
            || samples_per_line > enabled_features.max_jpeg_width
        {
            return err_exit_code(
                ExitCode::UnsupportedJpeg,
                format!(
                    "image dimensions larger than {0}x{1}",
                    enabled_features.max_jpeg_width, enabled_features.max_jpeg_height
                ),
            );
        }

        let cmpc = usize::from(segment[5]);
        if cmpc == 0 || cmpc > MAX_COMPONENTS {
            return err_exit_code(
                ExitCode::UnsupportedJpeg,
                format!(
                    "image has {0} components, 1 to {1} are supported",
                    cmpc, MAX_COMPONENTS
                ),
            );
        }

        if segment.len() != 6 + 3 * cmpc {
            return err_exit_code(ExitCode::InvalidSegment, "size mismatch in sof marker");
        }

        // components contained in image
        let mut components: Vec<ComponentInfo> = Vec::with_capacity(cmpc);
        for c in segment[6..].chunks_exact(3) {
            let id = c[0];
            if components.iter().any(|x| x.id == id) {
                return err_exit_code(
                    ExitCode::InvalidSegment,
                    format!("component {0} declared twice", id),
                );
            }

            let sfh = u32::from(lbits(c[1], 4));
            let sfv = u32::from(rbits(c[1], 4));
            if sfh == 0 || sfv == 0 || sfh > MAX_SAMPLING_FACTOR || sfv > MAX_SAMPLING_FACTOR {
                return err_exit_code(
                    ExitCode::SamplingFactorUnsupported,
                    format!("component {0} has sampling factors {1}x{2}", id, sfh, sfv),
                );
            }

            let q_table_index = c[2];
            if usize::from(q_table_index) >= MAX_COMPONENTS {
                return err_exit_code(
                    ExitCode::InvalidSegment,
                    format!("quantization table index {0} too big", q_table_index),
                );
            }

            components.push(ComponentInfo {
                id,
                q_table_index,
                sfh,
                sfv,
                upscale_h: 1,
                upscale_v: 1,
                bch: 0,
                bcv: 0,
                nch: 0,
                ncv: 0,
            });
        }

        // a single component is never interleaved, so its MCU is always one data unit
        if components.len() == 1 {
            components[0].sfh = 1;
            components[0].sfv = 1;
        }

        Self::from_components(precision, lines, samples_per_line, components)
    }

    /// Derives the MCU layout once the components are known.
    ///
    /// An interleaved MCU spans `h_max × v_max` data units, as in A.2.2 of ITU T.81,
    /// not `h_max / h_min`. The two only differ when every component shares a sampling
    /// factor above one, e.g. all components at 2x2 give a 16x16 MCU here.
    fn from_components(
        precision: u8,
        lines: u32,
        samples_per_line: u32,
        mut components: Vec<ComponentInfo>,
    ) -> Result<Self> {
        let h_max = components.iter().map(|c| c.sfh).max().unwrap_or(1);
        let v_max = components.iter().map(|c| c.sfv).max().unwrap_or(1);

        let mcu_width_in_data_units = h_max;
        let mcu_height_in_data_units = v_max;

        let scan_width_in_mcu = div_ceil(samples_per_line, mcu_width_in_data_units * 8);
        let scan_height_in_mcu = div_ceil(lines, mcu_height_in_data_units * 8);

        let mut data_unit_sequence = Vec::new();

        for (i, c) in components.iter_mut().enumerate() {
            if h_max % c.sfh != 0 || v_max % c.sfv != 0 {
                return err_exit_code(
                    ExitCode::SamplingFactorUnsupported,
                    format!(
                        "component {0} sampling {1}x{2} doesn't divide the maximum {3}x{4}",
                        c.id, c.sfh, c.sfv, h_max, v_max
                    ),
                );
            }

            c.upscale_h = h_max / c.sfh;
            c.upscale_v = v_max / c.sfv;

            c.bch = scan_width_in_mcu * c.sfh;
            c.bcv = scan_height_in_mcu * c.sfv;
            c.nch = div_ceil(div_ceil(samples_per_line * c.sfh, h_max), 8);
            c.ncv = div_ceil(div_ceil(lines * c.sfv, v_max), 8);

            let mcu_area = mcu_width_in_data_units * mcu_height_in_data_units;
            let count = mcu_area / (c.upscale_h * c.upscale_v);
            data_unit_sequence.extend(std::iter::repeat(i).take(count as usize));
        }

        info!(
            "frame {0}x{1}, {2} components, MCU {3}x{4} data units, {5}x{6} MCUs",
            samples_per_line,
            lines,
            components.len(),
            mcu_width_in_data_units,
            mcu_height_in_data_units,
            scan_width_in_mcu,
            scan_height_in_mcu
        );

        Ok(FrameHeader {
            precision,
            lines,
            samples_per_line,
            components,
            mcu_width_in_data_units,
            mcu_height_in_data_units,
            scan_width_in_mcu,
            scan_height_in_mcu,
            data_unit_sequence,
        })
    }

    /// position of the component with the given JPEG id in `components`
    pub fn component_index(&self, id: u8) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }

    pub fn mcu_count(&self) -> usize {
        self.scan_width_in_mcu as usize * self.scan_height_in_mcu as usize
    }

    pub fn mcu_pixel_width(&self) -> u32 {
        self.mcu_width_in_data_units * BLOCK_DIM as u32
    }

    pub fn mcu_pixel_height(&self) -> u32 {
        self.mcu_height_in_data_units * BLOCK_DIM as u32
    }

    pub fn data_units_per_mcu(&self) -> usize {
        self.data_unit_sequence.len()
    }

    /// offset within an MCU of the first data unit belonging to `component`
    fn first_data_unit(&self, component: usize) -> usize {
        self.components[..component]
            .iter()
            .map(|c| c.mbs() as usize)
            .sum()
    }

    /// Index in MCU order of the data unit at block column `bx`, block row `by`
    /// of the component's own block grid.
    pub fn data_unit_index(&self, component: usize, bx: u32, by: u32) -> usize {
        let c = &self.components[component];
        let mcu = (by / c.sfv) as usize * self.scan_width_in_mcu as usize + (bx / c.sfh) as usize;

        mcu * self.data_units_per_mcu()
            + self.first_data_unit(component)
            + ((by % c.sfv) * c.sfh + bx % c.sfh) as usize
    }

    /// For the `k`th data unit of an MCU, returns its component and the pixel offset
    /// of its top left corner within the MCU once upsampled.
    pub fn data_unit_origin(&self, k: usize) -> (usize, u32, u32) {
        let component = self.data_unit_sequence[k];
        let c = &self.components[component];
        let local = (k - self.first_data_unit(component)) as u32;

        let x = (local % c.sfh) * BLOCK_DIM as u32 * c.upscale_h;
        let y = (local / c.sfh) * BLOCK_DIM as u32 * c.upscale_v;
        (component, x, y)
    }
}
