/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use byteorder::{BigEndian, ByteOrder};
use log::{debug, warn};

use super::jpeg_code;
use crate::imagex_error::Warning;

const JFIF_IDENTIFIER: &[u8] = b"JFIF\0";
const JFXX_IDENTIFIER: &[u8] = b"JFXX\0";
const EXIF_IDENTIFIER: &[u8] = b"Exif\0\0";
const ADOBE_IDENTIFIER: &[u8] = b"Adobe";

/// JFIF header from APP0
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JfifHeader {
    pub version_major: u8,
    pub version_minor: u8,

    /// 0 = aspect ratio only, 1 = dots per inch, 2 = dots per cm
    pub density_units: u8,
    pub x_density: u16,
    pub y_density: u16,

    pub thumbnail_width: u8,
    pub thumbnail_height: u8,

    /// packed RGB, as much of `3 * width * height` as the segment holds
    pub thumbnail: Vec<u8>,
}

/// A segment that doesn't take part in decoding, kept for callers that want it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Metadata {
    Jfif(JfifHeader),

    /// JFIF extension (APP0 "JFXX"), usually a thumbnail in another format
    JfifExtension { extension_code: u8, data: Vec<u8> },

    /// TIFF structure following the APP1 "Exif" identifier, tags are not interpreted
    Exif(Vec<u8>),

    /// APP14 "Adobe", the transform flag says how three or four components are encoded
    Adobe { version: u16, transform: u8 },

    Comment(Vec<u8>),

    /// application segment we don't interpret, `marker` is the full marker byte
    Application { marker: u8, data: Vec<u8> },

    /// any other length-prefixed segment that isn't used for decoding
    Other { marker: u8, data: Vec<u8> },
}

impl Metadata {
    /// the transform flag of an Adobe segment
    pub fn adobe_transform(&self) -> Option<u8> {
        match self {
            Metadata::Adobe { transform, .. } => Some(*transform),
            _ => None,
        }
    }
}

/// Interprets an APPn payload. Problems never fail the image, they degrade to a raw
/// `Application` entry and a warning.
pub fn parse_app_segment(app: u8, payload: &[u8], warnings: &mut Vec<Warning>) -> Metadata {
    let marker = jpeg_code::APP0 + app;

    let parsed = match marker {
        jpeg_code::APP0 if payload.starts_with(JFIF_IDENTIFIER) => {
            parse_jfif(marker, &payload[JFIF_IDENTIFIER.len()..], warnings)
        }
        jpeg_code::APP0 if payload.starts_with(JFXX_IDENTIFIER) => {
            let body = &payload[JFXX_IDENTIFIER.len()..];
            body.split_first()
                .map(|(&extension_code, data)| Metadata::JfifExtension {
                    extension_code,
                    data: data.to_vec(),
                })
        }
        jpeg_code::APP1 if payload.starts_with(EXIF_IDENTIFIER) => {
            Some(Metadata::Exif(payload[EXIF_IDENTIFIER.len()..].to_vec()))
        }
        jpeg_code::APP14 if payload.starts_with(ADOBE_IDENTIFIER) => {
            // version, flags0, flags1, transform
            let body = &payload[ADOBE_IDENTIFIER.len()..];
            if body.len() >= 7 {
                Some(Metadata::Adobe {
                    version: BigEndian::read_u16(&body[0..2]),
                    transform: body[6],
                })
            } else {
                None
            }
        }
        _ => {
            warn!("FF {0:X}: no interpretation for this application segment", marker);
            warnings.push(Warning::UnsupportedMetadata { marker });
            return Metadata::Application {
                marker,
                data: payload.to_vec(),
            };
        }
    };

    match parsed {
        Some(m) => {
            debug!("FF {0:X}: {1:?}", marker, MetadataKind(&m));
            m
        }
        None => {
            warn!("FF {0:X}: metadata segment truncated", marker);
            warnings.push(Warning::TruncatedMetadata { marker });
            Metadata::Application {
                marker,
                data: payload.to_vec(),
            }
        }
    }
}

fn parse_jfif(marker: u8, body: &[u8], warnings: &mut Vec<Warning>) -> Option<Metadata> {
    if body.len() < 9 {
        return None;
    }

    let thumbnail_width = body[7];
    let thumbnail_height = body[8];

    let expected = 3 * usize::from(thumbnail_width) * usize::from(thumbnail_height);
    let available = &body[9..];
    if available.len() != expected {
        warn!(
            "FF {0:X}: thumbnail needs {1} bytes, segment has {2}",
            marker,
            expected,
            available.len()
        );
        warnings.push(Warning::ThumbnailSizeMismatch {
            marker,
            expected,
            actual: available.len(),
        });
    }

    Some(Metadata::Jfif(JfifHeader {
        version_major: body[0],
        version_minor: body[1],
        density_units: body[2],
        x_density: BigEndian::read_u16(&body[3..5]),
        y_density: BigEndian::read_u16(&body[5..7]),
        thumbnail_width,
        thumbnail_height,
        thumbnail: available[..available.len().min(expected)].to_vec(),
    }))
}

/// Debug formatting that leaves out the raw payload bytes
struct MetadataKind<'a>(&'a Metadata);

impl std::fmt::Debug for MetadataKind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Metadata::Jfif(j) => write!(
                f,
                "JFIF {0}.{1:02} density {2}x{3} unit {4}, thumbnail {5}x{6}",
                j.version_major,
                j.version_minor,
                j.x_density,
                j.y_density,
                j.density_units,
                j.thumbnail_width,
                j.thumbnail_height
            ),
            Metadata::JfifExtension {
                extension_code,
                data,
            } => write!(f, "JFXX code {0:X} with {1} bytes", extension_code, data.len()),
            Metadata::Exif(data) => write!(f, "Exif with {0} bytes", data.len()),
            Metadata::Adobe { version, transform } => {
                write!(f, "Adobe version {0} transform {1}", version, transform)
            }
            Metadata::Comment(data) => write!(f, "comment with {0} bytes", data.len()),
            Metadata::Application { data, .. } | Metadata::Other { data, .. } => {
                write!(f, "{0} raw bytes", data.len())
            }
        }
    }
}
