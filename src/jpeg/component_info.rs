/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    /// jpeg internal id
    pub id: u8,

    /// quantization table
    pub q_table_index: u8,

    /// sample factor horizontal
    pub sfh: u32,

    /// sample factor vertical
    pub sfv: u32,

    /// how many output pixels each sample covers horizontally
    pub upscale_h: u32,

    /// how many output pixels each sample covers vertically
    pub upscale_v: u32,

    /// block count horizontal (interleaved)
    pub bch: u32,

    /// block count vertical (interleaved)
    pub bcv: u32,

    /// block count horizontal (non interleaved)
    pub nch: u32,

    /// block count vertical (non interleaved)
    pub ncv: u32,
}

impl ComponentInfo {
    /// data units of this component in every MCU
    pub fn mbs(&self) -> u32 {
        self.sfh * self.sfv
    }
}
