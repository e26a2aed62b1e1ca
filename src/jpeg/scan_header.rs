/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use log::debug;

use crate::consts::*;
use crate::helpers::*;
use crate::imagex_error::{err_exit_code, AddContext, ExitCode, Result};

/// One component coded by a scan and the Huffman tables it uses. The ids are kept as
/// transmitted, they are resolved against the frame and the tables in scope when decoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScanComponent {
    pub component_id: u8,
    pub dc_table: u8,
    pub ac_table: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanHeader {
    pub components: Vec<ScanComponent>,

    /// spectral selection start and end, 0 and 63 for baseline
    pub spectral_start: u8,
    pub spectral_end: u8,

    /// successive approximation high and low bit, 0 for baseline
    pub approximation_high: u8,
    pub approximation_low: u8,
}

impl ScanHeader {
    /// Parses the payload of an SOS segment.
    pub fn parse_sos(segment: &[u8]) -> Result<Self> {
        ensure_space(segment, 0, 1).context()?;

        let cs_cmpc = usize::from(segment[0]);
        if cs_cmpc == 0 || cs_cmpc > MAX_COMPONENTS {
            return err_exit_code(
                ExitCode::InvalidSegment,
                format!("{0} components in scan", cs_cmpc),
            );
        }

        let mut hpos = 1;
        ensure_space(segment, hpos, 2 * cs_cmpc + 3).context()?;

        let mut components = Vec::with_capacity(cs_cmpc);
        for _ in 0..cs_cmpc {
            let component_id = segment[hpos];
            if components
                .iter()
                .any(|c: &ScanComponent| c.component_id == component_id)
            {
                return err_exit_code(
                    ExitCode::InvalidSegment,
                    format!("component {0} appears twice in scan", component_id),
                );
            }

            components.push(ScanComponent {
                component_id,
                dc_table: lbits(segment[hpos + 1], 4),
                ac_table: rbits(segment[hpos + 1], 4),
            });
            hpos += 2;
        }

        let header = ScanHeader {
            components,
            spectral_start: segment[hpos],
            spectral_end: segment[hpos + 1],
            approximation_high: lbits(segment[hpos + 2], 4),
            approximation_low: rbits(segment[hpos + 2], 4),
        };

        if header.spectral_start != 0
            || header.spectral_end != 63
            || header.approximation_high != 0
            || header.approximation_low != 0
        {
            // only meaningful for progressive frames, which are rejected at the SOF
            debug!(
                "ignoring spectral selection {0}..{1} and approximation {2}/{3} in scan",
                header.spectral_start,
                header.spectral_end,
                header.approximation_high,
                header.approximation_low
            );
        }

        Ok(header)
    }

    pub fn is_interleaved(&self) -> bool {
        self.components.len() > 1
    }
}
