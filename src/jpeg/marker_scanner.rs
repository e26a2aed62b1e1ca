/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use std::ops::Range;

use log::{debug, warn};

use super::jpeg_code;
use crate::helpers::b_short;

/// The kind of segment introduced by a marker
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SegmentType {
    SOI,
    EOI,
    SOF0,
    /// start of frame for any coding process other than baseline DCT
    SOFn(u8),
    DHT,
    DQT,
    DRI,
    SOS,
    /// restart marker 0..7
    RST(u8),
    /// application segment 0..15
    APP(u8),
    COM,
    /// any other length-prefixed marker, kept uninterpreted
    Other(u8),
}

impl SegmentType {
    /// maps the byte following 0xFF onto a segment type. Returns None for stuffing (0x00),
    /// fill bytes (0xFF) and reserved codes that don't introduce a segment.
    pub fn from_code(code: u8) -> Option<SegmentType> {
        match code {
            jpeg_code::SOI => Some(SegmentType::SOI),
            jpeg_code::EOI => Some(SegmentType::EOI),
            jpeg_code::SOF0 => Some(SegmentType::SOF0),
            jpeg_code::DHT => Some(SegmentType::DHT),
            jpeg_code::DQT => Some(SegmentType::DQT),
            jpeg_code::DRI => Some(SegmentType::DRI),
            jpeg_code::SOS => Some(SegmentType::SOS),
            jpeg_code::COM => Some(SegmentType::COM),
            jpeg_code::RST0..=jpeg_code::RST7 => Some(SegmentType::RST(code - jpeg_code::RST0)),
            jpeg_code::APP0..=jpeg_code::APP15 => Some(SegmentType::APP(code - jpeg_code::APP0)),
            jpeg_code::JPG | jpeg_code::DAC => Some(SegmentType::Other(code)),
            0xC1..=0xCF => Some(SegmentType::SOFn(code)),
            0xC0..=0xFE => Some(SegmentType::Other(code)),
            _ => None,
        }
    }

    /// the marker byte that follows 0xFF
    pub fn code(self) -> u8 {
        match self {
            SegmentType::SOI => jpeg_code::SOI,
            SegmentType::EOI => jpeg_code::EOI,
            SegmentType::SOF0 => jpeg_code::SOF0,
            SegmentType::DHT => jpeg_code::DHT,
            SegmentType::DQT => jpeg_code::DQT,
            SegmentType::DRI => jpeg_code::DRI,
            SegmentType::SOS => jpeg_code::SOS,
            SegmentType::COM => jpeg_code::COM,
            SegmentType::RST(n) => jpeg_code::RST0 + n,
            SegmentType::APP(n) => jpeg_code::APP0 + n,
            SegmentType::SOFn(c) | SegmentType::Other(c) => c,
        }
    }

    /// SOI, EOI and the restart markers stand alone, everything else carries a
    /// 2 byte big-endian length
    pub fn has_length(self) -> bool {
        !matches!(
            self,
            SegmentType::SOI | SegmentType::EOI | SegmentType::RST(_)
        )
    }
}

/// One marker occurrence in the byte stream. Offsets are absolute within the scanned buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Marker {
    pub segment_type: SegmentType,
    pub payload_offset: usize,
    pub payload_length: usize,
}

impl Marker {
    /// offset of the 0xFF byte that introduces this marker
    pub fn start_offset(&self) -> usize {
        self.payload_offset - if self.segment_type.has_length() { 4 } else { 2 }
    }

    /// offset of the first byte after the payload
    pub fn end_offset(&self) -> usize {
        self.payload_offset + self.payload_length
    }

    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.payload_offset..self.end_offset()]
    }
}

/// A complete SOI..EOI image found in the buffer, with the markers between the two.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUnit {
    /// from the SOI marker up to and including the EOI marker
    pub range: Range<usize>,
    pub markers: Vec<Marker>,
}

/// Splits a buffer into the JPEG images it contains.
///
/// Length-prefixed payloads are skipped as a whole, so an embedded thumbnail inside an
/// application segment never shows up as an image of its own. Bytes between segments
/// (entropy-coded data, stuffing, fill bytes) are walked looking for the next marker.
/// Anomalies are logged and skipped rather than failing the whole buffer, since a
/// damaged image shouldn't hide the other images in the stream.
pub fn scan_markers(data: &[u8]) -> Vec<ImageUnit> {
    let mut units = Vec::new();
    let mut current: Option<(usize, Vec<Marker>)> = None;

    let mut pos = 0;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let code = data[pos + 1];
        let segment_type = match SegmentType::from_code(code) {
            Some(t) => t,
            None => {
                if code != 0x00 && code != 0xFF {
                    debug!("skipping unrecognized marker FF {0:02X} at {1}", code, pos);
                }
                pos += 1;
                continue;
            }
        };

        match segment_type {
            SegmentType::SOI => {
                if current.is_some() {
                    warn!("SOI at {0} before EOI, discarding incomplete image", pos);
                }
                current = Some((pos, Vec::new()));
                pos += 2;
            }
            SegmentType::EOI => {
                match current.take() {
                    Some((start, markers)) => {
                        debug!(
                            "image found at {0}..{1} with {2} markers",
                            start,
                            pos + 2,
                            markers.len()
                        );
                        units.push(ImageUnit {
                            range: start..pos + 2,
                            markers,
                        });
                    }
                    None => {
                        debug!("EOI at {0} without SOI", pos);
                    }
                }
                pos += 2;
            }
            SegmentType::RST(_) => {
                if let Some((_, markers)) = current.as_mut() {
                    markers.push(Marker {
                        segment_type,
                        payload_offset: pos + 2,
                        payload_length: 0,
                    });
                }
                pos += 2;
            }
            _ => {
                if pos + 4 > data.len() {
                    warn!("marker {0:?} at {1} truncated", segment_type, pos);
                    break;
                }

                let raw_length = usize::from(b_short(data[pos + 2], data[pos + 3]));
                if raw_length < 2 {
                    warn!(
                        "marker {0:?} at {1} has invalid length {2}",
                        segment_type, pos, raw_length
                    );
                    pos += 2;
                    continue;
                }

                let marker = Marker {
                    segment_type,
                    payload_offset: pos + 4,
                    payload_length: raw_length - 2,
                };

                if marker.end_offset() > data.len() {
                    warn!(
                        "segment {0:?} at {1} runs past the end of the buffer",
                        segment_type, pos
                    );
                    break;
                }

                match current.as_mut() {
                    Some((_, markers)) => {
                        debug!(
                            "segment {0:?} at {1} length {2}",
                            segment_type, pos, marker.payload_length
                        );
                        markers.push(marker);
                    }
                    None => {
                        debug!("segment {0:?} at {1} outside of an image", segment_type, pos);
                    }
                }

                pos = marker.end_offset();
            }
        }
    }

    if current.is_some() {
        warn!("buffer ended before EOI, discarding incomplete image");
    }

    units
}
