/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

//! Decoder for baseline JPEG/JFIF images, written from scratch without any platform codec.
//!
//! `decode_jpeg` turns the first image in a buffer into an RGBA `Raster`. `Jpg` gives access
//! to the parsed structure (frames, scans, metadata, non-fatal warnings) and can decode
//! individual frames and scans.

// Don't allow any unsafe code by default. Since this code has to potentially deal with
// badly/maliciously formatted images, we want this extra level of safety.
#![forbid(unsafe_code)]
#![forbid(non_ascii_idents)]
#![forbid(unused_extern_crates)]
#![forbid(unused_import_braces)]
#![forbid(macro_use_extern_crate)]

mod consts;
mod helpers;
mod jpeg;
mod raster;

mod enabled_features;
mod imagex_error;

pub use enabled_features::EnabledFeatures;
pub use helpers::catch_unwind_result;
pub use imagex_error::{ExitCode, ImagexError, Result, Warning};
pub use jpeg::jpg::{Frame, Jpg, Scan};
pub use jpeg::marker_scanner::{scan_markers, ImageUnit, Marker, SegmentType};
pub use jpeg::metadata::{JfifHeader, Metadata};
pub use jpeg::{
    ColorSpace, ComponentInfo, FrameHeader, HuffmanTable, QuantizationTable, ScanComponent,
    ScanHeader, Symbol, TableClass,
};
pub use raster::{Raster, Xdat, RGBA_CHANNELS};

use crate::imagex_error::AddContext;

static PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the version string of the library, useful for logging which build decoded an image.
pub fn get_version_string() -> String {
    format!("imagex-{0}", PACKAGE_VERSION)
}

/// Decodes the first image found in `data` into an RGBA raster.
pub fn decode_jpeg(data: &[u8], enabled_features: &EnabledFeatures) -> Result<Raster> {
    let jpg = Jpg::read(data, enabled_features).context()?;
    jpg.decode().context()
}

/// Decodes every image in `data`, for instance a file followed by a second stream.
/// Each image succeeds or fails on its own.
pub fn decode_all_jpegs(data: &[u8], enabled_features: &EnabledFeatures) -> Vec<Result<Raster>> {
    Jpg::read_all(data, enabled_features)
        .into_iter()
        .map(|jpg| jpg.and_then(|j| j.decode()))
        .collect()
}
