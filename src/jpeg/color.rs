/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use log::debug;

use super::data_unit::CoefficientStore;
use super::frame_header::FrameHeader;
use super::idct::{dequantize, inverse_dct};
use crate::consts::*;
use crate::imagex_error::{AddContext, Result};
use crate::raster::{Raster, RGBA_CHANNELS};

/// number of components that map onto output channels
pub const MAX_COLOR_CHANNELS: usize = 3;

/// How the decoded components map onto RGB.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    /// one component, copied into R, G and B
    Grayscale,

    /// JFIF luma and chroma
    YCbCr,

    /// components are already R, G and B (Adobe transform 0)
    Rgb,
}

/// One full resolution sample plane per component, before the level shift.
struct Planes {
    width: usize,
    height: usize,
    samples: Vec<Vec<i16>>,
}

impl Planes {
    fn new(width: usize, height: usize, count: usize) -> Self {
        Planes {
            width,
            height,
            samples: vec![vec![0; width * height]; count],
        }
    }

    /// Writes a spatial block with its top left at (`left`, `top`), replicating each sample
    /// into an `upscale_h` x `upscale_v` rectangle.
    fn upsample_block(
        &mut self,
        plane: usize,
        left: usize,
        top: usize,
        spatial: &[i32; BLOCK_SIZE],
        upscale_h: usize,
        upscale_v: usize,
    ) {
        let stride = self.width;
        let samples = &mut self.samples[plane];

        for r in 0..BLOCK_DIM {
            for c in 0..BLOCK_DIM {
                let v = spatial[r * BLOCK_DIM + c].clamp(i16::MIN.into(), i16::MAX.into()) as i16;

                for dy in 0..upscale_v {
                    let row = (top + r * upscale_v + dy) * stride;
                    let start = row + left + c * upscale_h;
                    samples[start..start + upscale_h].fill(v);
                }
            }
        }
    }
}

/// Dequantizes and transforms every data unit of the frame, upsamples the subsampled
/// components and converts the result to RGBA.
///
/// Components without a quantization table were never coded and stay zero. When
/// `crop_to_frame` is false the raster covers every MCU, so it can be larger than the
/// frame's declared size.
pub fn render(
    frame: &FrameHeader,
    store: &CoefficientStore,
    color_space: ColorSpace,
    crop_to_frame: bool,
) -> Result<Raster> {
    let plane_width = frame.scan_width_in_mcu as usize * frame.mcu_pixel_width() as usize;
    let plane_height = frame.scan_height_in_mcu as usize * frame.mcu_pixel_height() as usize;

    let channels = frame.components.len().min(MAX_COLOR_CHANNELS);
    let mut planes = Planes::new(plane_width, plane_height, channels);

    for mcu in CoefficientStore::mcus(frame) {
        let first = mcu.data_units.start;
        for k in mcu.data_units {
            let (component, x, y) = frame.data_unit_origin(k - first);
            if component >= channels {
                continue;
            }

            let q = match &store.quantization_tables[component] {
                Some(q) => q,
                None => continue,
            };

            let mut table = store.data_units[k].reorder();
            dequantize(&mut table, q);
            let spatial = inverse_dct(&table);

            let info = &frame.components[component];
            planes.upsample_block(
                component,
                (mcu.left_pixel + x) as usize,
                (mcu.top_pixel + y) as usize,
                &spatial,
                info.upscale_h as usize,
                info.upscale_v as usize,
            );
        }
    }

    let (width, height) = if crop_to_frame {
        (frame.samples_per_line, frame.lines)
    } else {
        (plane_width as u32, plane_height as u32)
    };

    debug!(
        "converting {0}x{1} {2:?} planes to a {3}x{4} raster",
        plane_width, plane_height, color_space, width, height
    );

    Raster::new(width, height, convert(&planes, color_space, width, height)).context()
}

#[inline(always)]
fn level_shift(v: f32) -> u8 {
    (v + 128.0).round().clamp(0.0, 255.0) as u8
}

/// JFIF conversion, luma and chroma centered around zero
#[inline(always)]
pub fn ycbcr_to_rgb(y: i16, cb: i16, cr: i16) -> [u8; 3] {
    let y = f32::from(y);
    let cb = f32::from(cb);
    let cr = f32::from(cr);

    [
        level_shift(y + 1.402 * cr),
        level_shift(y - 0.344136 * cb - 0.714136 * cr),
        level_shift(y + 1.772 * cb),
    ]
}

fn convert(planes: &Planes, color_space: ColorSpace, width: u32, height: u32) -> Vec<u8> {
    let mut out =
        Vec::with_capacity(width as usize * height as usize * usize::from(RGBA_CHANNELS));

    // a missing chroma plane decodes as zero chroma
    let sample = |plane: usize, i: usize| -> i16 {
        planes.samples.get(plane).map_or(0, |p| p[i])
    };

    for y in 0..height as usize {
        let row = y * planes.width;
        for x in 0..width as usize {
            let i = row + x;

            let rgb = match color_space {
                ColorSpace::Grayscale => {
                    let v = level_shift(f32::from(sample(0, i)));
                    [v, v, v]
                }
                ColorSpace::YCbCr => ycbcr_to_rgb(sample(0, i), sample(1, i), sample(2, i)),
                ColorSpace::Rgb => [
                    level_shift(f32::from(sample(0, i))),
                    level_shift(f32::from(sample(1, i))),
                    level_shift(f32::from(sample(2, i))),
                ],
            };

            out.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
    }

    debug_assert!(planes.height >= height as usize);
    out
}
