/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use std::io::{Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::imagex_error::{err_exit_code, AddContext, ExitCode, ImagexError, Result};

/// bytes per RGBA pixel
pub const RGBA_CHANNELS: u8 = 4;

/// Decoded image as 8 bit RGBA, row by row from the top left.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixel_bytes: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32, pixel_bytes: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * usize::from(RGBA_CHANNELS);
        if pixel_bytes.len() != expected {
            return err_exit_code(
                ExitCode::AssertionFailure,
                format!(
                    "{0}x{1} raster needs {2} bytes, got {3}",
                    width,
                    height,
                    expected,
                    pixel_bytes.len()
                ),
            );
        }

        Ok(Raster {
            width,
            height,
            pixel_bytes,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_bytes(&self) -> &[u8] {
        &self.pixel_bytes
    }

    pub fn into_pixel_bytes(self) -> Vec<u8> {
        self.pixel_bytes
    }

    /// the pixels as RGBA quadruples
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.pixel_bytes)
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels()[y as usize * self.width as usize + x as usize]
    }

    /// Writes the raw `.rgba` layout: big-endian width and height followed by the pixels.
    pub fn write_rgba<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(self.width).context()?;
        writer.write_u32::<BigEndian>(self.height).context()?;
        writer.write_all(&self.pixel_bytes).context()?;
        Ok(())
    }
}

/// The `.xdat` interchange layout read by the viewer: little-endian width and height,
/// one byte each for channel count and bit depth, two zero bytes, then the samples.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Xdat {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub bit_depth: u8,
    pub pixel_bytes: Vec<u8>,
}

impl Xdat {
    pub fn from_raster(raster: &Raster) -> Self {
        Xdat {
            width: raster.width(),
            height: raster.height(),
            channels: RGBA_CHANNELS,
            bit_depth: 8,
            pixel_bytes: raster.pixel_bytes().to_vec(),
        }
    }

    /// bytes of sample data after the header, rows padded to whole bytes
    fn data_size(width: u32, height: u32, channels: u8, bit_depth: u8) -> Result<u64> {
        u64::from(width)
            .checked_mul(u64::from(channels) * u64::from(bit_depth))
            .map(|bits_per_row| (bits_per_row + 7) / 8)
            .and_then(|bytes_per_row| bytes_per_row.checked_mul(u64::from(height)))
            .ok_or_else(|| {
                ImagexError::new(
                    ExitCode::SyntaxError,
                    format!(
                        "xdat size {0}x{1} with {2} channels of {3} bits overflows",
                        width, height, channels, bit_depth
                    ),
                )
            })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.width).context()?;
        writer.write_u32::<LittleEndian>(self.height).context()?;
        writer
            .write_all(&[self.channels, self.bit_depth, 0, 0])
            .context()?;
        writer.write_all(&self.pixel_bytes).context()?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let width = reader.read_u32::<LittleEndian>().context()?;
        let height = reader.read_u32::<LittleEndian>().context()?;

        let mut header = [0u8; 4];
        reader.read_exact(&mut header).context()?;
        let channels = header[0];
        let bit_depth = header[1];

        if channels == 0 || bit_depth == 0 {
            return err_exit_code(
                ExitCode::SyntaxError,
                format!(
                    "xdat with {0} channels of {1} bits",
                    channels, bit_depth
                ),
            );
        }

        let data_size = Self::data_size(width, height, channels, bit_depth)?;

        // allocation follows the bytes actually present
        let mut pixel_bytes = Vec::new();
        reader
            .by_ref()
            .take(data_size)
            .read_to_end(&mut pixel_bytes)
            .context()?;

        if (pixel_bytes.len() as u64) < data_size {
            return err_exit_code(
                ExitCode::ShortRead,
                format!(
                    "xdat needs {0} bytes of samples, only {1} present",
                    data_size,
                    pixel_bytes.len()
                ),
            );
        }

        Ok(Xdat {
            width,
            height,
            channels,
            bit_depth,
            pixel_bytes,
        })
    }
}
