/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

//! Assembles small baseline JPEG files for tests.

use super::bit_writer::BitWriter;
use super::huffman_table::{HuffmanTable, TableClass};
use super::jpeg_code;
use super::quantization_table::QuantizationTable;
use crate::consts::*;

/// DC table where each of the 16 possible categories has a 5 bit code
pub fn dc_table_payload() -> Vec<u8> {
    let mut p = vec![0u8; 16];
    p[4] = 16;
    p.extend(0..16u8);
    p
}

/// AC table where every byte value is a symbol, so that invalid combinations can be coded too
pub fn ac_table_payload() -> Vec<u8> {
    let mut p = vec![0u8; 16];
    p[7] = 255;
    p[8] = 1;
    p.extend(0..=255u8);
    p
}

pub fn test_huffman_tables() -> (HuffmanTable, HuffmanTable) {
    let (dc, _) =
        HuffmanTable::construct_from_segment(TableClass::DC, 0, &dc_table_payload()).unwrap();
    let (ac, _) =
        HuffmanTable::construct_from_segment(TableClass::AC, 0, &ac_table_payload()).unwrap();
    (dc, ac)
}

/// quantization table of all ones, so coefficients go into the IDCT unchanged
pub fn unit_quantization_table() -> QuantizationTable {
    QuantizationTable::from_zigzag(0, &[1; BLOCK_SIZE])
}

fn write_segment(out: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    out.extend_from_slice(&[0xFF, marker]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
}

/// Builds a single frame baseline JPEG. Every component uses quantization
/// table 0 and Huffman tables 0.
pub struct JpegBuilder {
    width: u16,
    height: u16,

    /// (id, sampling factors byte)
    components: Vec<(u8, u8)>,
    quantization: [u8; BLOCK_SIZE],

    /// absolute coefficients in zig-zag order, in coding order
    blocks: Vec<[i32; BLOCK_SIZE]>,

    /// segments written right after SOI
    segments: Vec<(u8, Vec<u8>)>,
    restart_interval: u16,

    frame_marker: u8,
    huffman_tables: bool,
    quantization_tables: bool,

    /// None for no scan at all
    scan_layout: Option<ScanLayout>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum ScanLayout {
    /// one scan with every component
    Interleaved,

    /// one scan per component, blocks taken in coding order
    PerComponent,
}

impl JpegBuilder {
    pub fn new(width: u16, height: u16, components: &[(u8, u8)]) -> Self {
        JpegBuilder {
            width,
            height,
            components: components.to_vec(),
            quantization: [1; BLOCK_SIZE],
            blocks: Vec::new(),
            segments: Vec::new(),
            restart_interval: 0,
            frame_marker: jpeg_code::SOF0,
            huffman_tables: true,
            quantization_tables: true,
            scan_layout: Some(ScanLayout::Interleaved),
        }
    }

    pub fn frame_marker(mut self, marker: u8) -> Self {
        self.frame_marker = marker;
        self
    }

    pub fn without_huffman_tables(mut self) -> Self {
        self.huffman_tables = false;
        self
    }

    pub fn without_quantization_tables(mut self) -> Self {
        self.quantization_tables = false;
        self
    }

    pub fn scan_layout(mut self, layout: Option<ScanLayout>) -> Self {
        self.scan_layout = layout;
        self
    }

    pub fn quantization(mut self, zigzag: [u8; BLOCK_SIZE]) -> Self {
        self.quantization = zigzag;
        self
    }

    pub fn block(mut self, zigzag: [i32; BLOCK_SIZE]) -> Self {
        self.blocks.push(zigzag);
        self
    }

    /// adds a block with only a DC coefficient
    pub fn dc_block(self, dc: i32) -> Self {
        let mut b = [0; BLOCK_SIZE];
        b[0] = dc;
        self.block(b)
    }

    pub fn segment(mut self, marker: u8, payload: &[u8]) -> Self {
        self.segments.push((marker, payload.to_vec()));
        self
    }

    pub fn restart_interval(mut self, interval: u16) -> Self {
        self.restart_interval = interval;
        self
    }

    /// the component index of each block, in coding order
    fn block_components(&self) -> Vec<usize> {
        let per_mcu: Vec<usize> = if self.components.len() == 1 {
            vec![0]
        } else {
            self.components
                .iter()
                .enumerate()
                .flat_map(|(i, &(_, s))| {
                    std::iter::repeat(i).take(usize::from(s >> 4) * usize::from(s & 15))
                })
                .collect()
        };

        per_mcu.iter().copied().cycle().take(self.blocks.len()).collect()
    }

    /// the entropy-coded data for the blocks of the given components
    pub fn entropy_coded_data(&self, components: &[usize]) -> Vec<u8> {
        let (dc, ac) = test_huffman_tables();
        let mut predictors = [0i32; MAX_COMPONENTS];
        let mut w = BitWriter::new();

        for (block, component) in self.blocks.iter().zip(self.block_components()) {
            if !components.contains(&component) {
                continue;
            }

            let diff = block[0] - predictors[component];
            predictors[component] = block[0];
            w.encode_block(&dc, &ac, diff, block);
        }

        w.detach_buffer()
    }

    fn write_scan(&self, out: &mut Vec<u8>, components: &[usize]) {
        let mut sos = vec![components.len() as u8];
        for &c in components {
            sos.extend_from_slice(&[self.components[c].0, 0x00]);
        }
        sos.extend_from_slice(&[0, 63, 0]);
        write_segment(out, jpeg_code::SOS, &sos);

        out.extend(self.entropy_coded_data(components));
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0xFF, jpeg_code::SOI];

        for (marker, payload) in &self.segments {
            write_segment(&mut out, *marker, payload);
        }

        if self.quantization_tables {
            let mut dqt = vec![0x00];
            dqt.extend_from_slice(&self.quantization);
            write_segment(&mut out, jpeg_code::DQT, &dqt);
        }

        if self.huffman_tables {
            let mut dht = vec![0x00];
            dht.extend(dc_table_payload());
            dht.push(0x10);
            dht.extend(ac_table_payload());
            write_segment(&mut out, jpeg_code::DHT, &dht);
        }

        if self.restart_interval != 0 {
            write_segment(
                &mut out,
                jpeg_code::DRI,
                &self.restart_interval.to_be_bytes(),
            );
        }

        let mut sof = vec![8];
        sof.extend_from_slice(&self.height.to_be_bytes());
        sof.extend_from_slice(&self.width.to_be_bytes());
        sof.push(self.components.len() as u8);
        for &(id, sampling) in &self.components {
            sof.extend_from_slice(&[id, sampling, 0]);
        }
        write_segment(&mut out, self.frame_marker, &sof);

        let all: Vec<usize> = (0..self.components.len()).collect();
        match self.scan_layout {
            Some(ScanLayout::Interleaved) => self.write_scan(&mut out, &all),
            Some(ScanLayout::PerComponent) => {
                for c in all {
                    self.write_scan(&mut out, &[c]);
                }
            }
            None => {}
        }

        out.extend_from_slice(&[0xFF, jpeg_code::EOI]);
        out
    }
}
