/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use log::{debug, info, warn};

use super::color::{render, ColorSpace, MAX_COLOR_CHANNELS};
use super::data_unit::CoefficientStore;
use super::ecs_decoder::decode_scan_coefficients;
use super::frame_header::FrameHeader;
use super::huffman_table::{parse_dht, HuffmanTable, TableClass};
use super::marker_scanner::{scan_markers, ImageUnit, SegmentType};
use super::metadata::{parse_app_segment, Metadata};
use super::quantization_table::{parse_dqt, QuantizationTable};
use super::scan_header::ScanHeader;
use crate::enabled_features::EnabledFeatures;
use crate::helpers::{b_short, ensure_space};
use crate::imagex_error::{err_exit_code, AddContext, ExitCode, Result, Warning};
use crate::raster::Raster;

/// number of table ids per class for both Huffman and quantization tables
const MAX_TABLE_IDS: usize = 4;

/// One SOS segment with its entropy-coded data and the tables that were in effect
/// when it started.
#[derive(Clone, Debug)]
pub struct Scan {
    pub header: ScanHeader,

    /// indexed by `[TableClass][id]`
    pub huffman_tables: [[Option<HuffmanTable>; MAX_TABLE_IDS]; 2],
    pub quantization_tables: [Option<QuantizationTable>; MAX_TABLE_IDS],

    /// restart interval from the last DRI, zero if none
    pub restart_interval: u16,

    /// entropy-coded bytes, still byte-stuffed
    pub data: Vec<u8>,
}

impl Scan {
    pub fn huffman_table(&self, class: TableClass, id: u8) -> Option<&HuffmanTable> {
        self.huffman_tables[class as usize]
            .get(usize::from(id))
            .and_then(|t| t.as_ref())
    }

    pub fn quantization_table(&self, id: u8) -> Option<&QuantizationTable> {
        self.quantization_tables
            .get(usize::from(id))
            .and_then(|t| t.as_ref())
    }
}

/// A SOF0 frame header with the scans that follow it.
#[derive(Clone, Debug)]
pub struct Frame {
    pub header: FrameHeader,
    pub scans: Vec<Scan>,
}

/// Table definitions seen so far in the image unit. A later definition of the same
/// class and id replaces the earlier one.
#[derive(Default)]
struct TablesInScope {
    huffman_tables: [[Option<HuffmanTable>; MAX_TABLE_IDS]; 2],
    quantization_tables: [Option<QuantizationTable>; MAX_TABLE_IDS],
    restart_interval: u16,
}

/// A parsed JPEG image: its frames, scans and metadata. Constructing it checks the
/// structure of the file, the entropy-coded data is only decoded by the `decode_*` calls.
#[derive(Clone, Debug)]
pub struct Jpg {
    metadata: Vec<Metadata>,
    frames: Vec<Frame>,
    warnings: Vec<Warning>,
    enabled_features: EnabledFeatures,
}

impl Jpg {
    /// Parses the first complete image in `data`.
    pub fn read(data: &[u8], enabled_features: &EnabledFeatures) -> Result<Jpg> {
        match scan_markers(data).first() {
            Some(unit) => Jpg::from_unit(data, unit, enabled_features),
            None => err_exit_code(ExitCode::NoImageFound, "no SOI..EOI image in buffer"),
        }
    }

    /// Parses every complete image in `data`, in the order they appear. A broken image
    /// doesn't prevent the ones after it from being returned.
    pub fn read_all(data: &[u8], enabled_features: &EnabledFeatures) -> Vec<Result<Jpg>> {
        scan_markers(data)
            .iter()
            .map(|unit| Jpg::from_unit(data, unit, enabled_features))
            .collect()
    }

    /// Builds the container from the markers of one image unit found by `scan_markers`.
    pub fn from_unit(
        data: &[u8],
        unit: &ImageUnit,
        enabled_features: &EnabledFeatures,
    ) -> Result<Jpg> {
        let mut metadata = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut warnings = Vec::new();
        let mut tables = TablesInScope::default();

        for (i, marker) in unit.markers.iter().enumerate() {
            let payload = marker.payload(data);

            match marker.segment_type {
                SegmentType::SOF0 => {
                    let header = FrameHeader::parse_sof0(payload, enabled_features).context()?;
                    frames.push(Frame {
                        header,
                        scans: Vec::new(),
                    });
                }
                SegmentType::SOFn(code) => {
                    return err_exit_code(
                        ExitCode::UnsupportedFrameType,
                        format!("frame type FF {0:X} is not baseline DCT", code),
                    );
                }
                SegmentType::DHT => {
                    for t in parse_dht(payload).context()? {
                        let (class, id) = (t.class() as usize, usize::from(t.id()));
                        tables.huffman_tables[class][id] = Some(t);
                    }
                }
                SegmentType::DQT => {
                    for q in parse_dqt(payload).context()? {
                        let id = usize::from(q.id());
                        tables.quantization_tables[id] = Some(q);
                    }
                }
                SegmentType::DRI => {
                    ensure_space(payload, 0, 2).context()?;
                    tables.restart_interval = b_short(payload[0], payload[1]);
                    debug!("restart interval {0}", tables.restart_interval);
                }
                SegmentType::SOS => {
                    let frame = match frames.last_mut() {
                        Some(f) => f,
                        None => {
                            return err_exit_code(ExitCode::NoFrame, "scan before any frame header");
                        }
                    };

                    if tables.huffman_tables.iter().flatten().all(|t| t.is_none()) {
                        return err_exit_code(
                            ExitCode::NoHuffmanTables,
                            "no Huffman table defined before the scan",
                        );
                    }

                    if tables.quantization_tables.iter().all(|t| t.is_none()) {
                        return err_exit_code(
                            ExitCode::NoQuantizationTables,
                            "no quantization table defined before the scan",
                        );
                    }

                    let header = ScanHeader::parse_sos(payload).context()?;

                    // entropy-coded data runs up to the next marker, or the EOI
                    let ecs_end = unit
                        .markers
                        .get(i + 1)
                        .map_or(unit.range.end - 2, |m| m.start_offset());
                    let ecs = &data[marker.end_offset()..ecs_end];

                    debug!(
                        "scan {0} at {1}: {2} components, {3} bytes of entropy-coded data",
                        frame.scans.len(),
                        marker.start_offset(),
                        header.components.len(),
                        ecs.len()
                    );

                    frame.scans.push(Scan {
                        header,
                        huffman_tables: tables.huffman_tables.clone(),
                        quantization_tables: tables.quantization_tables.clone(),
                        restart_interval: tables.restart_interval,
                        data: ecs.to_vec(),
                    });
                }
                SegmentType::RST(n) => {
                    debug!("restart marker {0} at {1}", n, marker.start_offset());
                }
                SegmentType::APP(n) => {
                    metadata.push(parse_app_segment(n, payload, &mut warnings));
                }
                SegmentType::COM => {
                    metadata.push(Metadata::Comment(payload.to_vec()));
                }
                SegmentType::Other(code) => {
                    debug!("keeping FF {0:X} with {1} bytes uninterpreted", code, payload.len());
                    metadata.push(Metadata::Other {
                        marker: code,
                        data: payload.to_vec(),
                    });
                }
                SegmentType::SOI | SegmentType::EOI => {}
            }
        }

        if frames.is_empty() {
            return err_exit_code(ExitCode::NoFrame, "no SOF0 frame header found");
        }

        for (i, frame) in frames.iter().enumerate() {
            if frame.scans.is_empty() {
                return err_exit_code(ExitCode::NoScan, format!("frame {0} has no scan", i));
            }

            for c in frame.header.components.iter().skip(MAX_COLOR_CHANNELS) {
                warn!("component {0} of frame {1} is not rendered", c.id, i);
                warnings.push(Warning::IgnoredComponent { component_id: c.id });
            }
        }

        info!(
            "image at {0}..{1}: {2} frames, {3} scans, {4} metadata segments, {5} warnings",
            unit.range.start,
            unit.range.end,
            frames.len(),
            frames.iter().map(|f| f.scans.len()).sum::<usize>(),
            metadata.len(),
            warnings.len()
        );

        Ok(Jpg {
            metadata,
            frames,
            warnings,
            enabled_features: enabled_features.clone(),
        })
    }

    /// width declared by the first frame
    pub fn width(&self) -> u32 {
        self.frames[0].header.samples_per_line
    }

    /// height declared by the first frame
    pub fn height(&self) -> u32 {
        self.frames[0].header.lines
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// number of scans over all frames
    pub fn scan_count(&self) -> usize {
        self.frames.iter().map(|f| f.scans.len()).sum()
    }

    /// How the components of a frame map onto RGB.
    pub fn color_space(&self, frame: &FrameHeader) -> ColorSpace {
        let adobe_rgb = self
            .metadata
            .iter()
            .filter_map(Metadata::adobe_transform)
            .any(|t| t == 0);

        match frame.components.len() {
            1 => ColorSpace::Grayscale,
            n if n >= MAX_COLOR_CHANNELS && adobe_rgb => ColorSpace::Rgb,
            _ => ColorSpace::YCbCr,
        }
    }

    /// Decodes the first frame.
    pub fn decode(&self) -> Result<Raster> {
        self.decode_frame(0)
    }

    /// Decodes every scan of the frame into one set of coefficients and renders it.
    pub fn decode_frame(&self, index: usize) -> Result<Raster> {
        let frame = match self.frames.get(index) {
            Some(f) => f,
            None => {
                return err_exit_code(
                    ExitCode::SyntaxError,
                    format!("frame {0} requested, image has {1}", index, self.frames.len()),
                );
            }
        };

        let mut store = CoefficientStore::new(&frame.header);
        for scan in &frame.scans {
            decode_scan_coefficients(&frame.header, scan, &mut store).context()?;
        }

        self.render(&frame.header, &store)
    }

    /// Decodes a single scan on its own, `index` counting scans over all frames.
    /// Components the scan doesn't code come out as zero coefficients.
    pub fn decode_scan(&self, index: usize) -> Result<Raster> {
        let found = self
            .frames
            .iter()
            .flat_map(|f| f.scans.iter().map(move |s| (&f.header, s)))
            .nth(index);

        let (header, scan) = match found {
            Some(x) => x,
            None => {
                return err_exit_code(
                    ExitCode::SyntaxError,
                    format!("scan {0} requested, image has {1}", index, self.scan_count()),
                );
            }
        };

        let mut store = CoefficientStore::new(header);
        decode_scan_coefficients(header, scan, &mut store).context()?;

        self.render(header, &store)
    }

    fn render(&self, header: &FrameHeader, store: &CoefficientStore) -> Result<Raster> {
        render(
            header,
            store,
            self.color_space(header),
            self.enabled_features.crop_to_frame,
        )
        .context()
    }
}
