/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

/// number of samples along one side of a data unit
pub const BLOCK_DIM: usize = 8;

/// coefficients in a data unit
pub const BLOCK_SIZE: usize = BLOCK_DIM * BLOCK_DIM;

/// maximum number of components a JPEG frame can declare
pub const MAX_COMPONENTS: usize = 4;

/// Returns the (row, column) of the cell visited at `index` when an `n`x`n` grid is
/// walked in zig-zag order.
///
/// The walk visits the anti-diagonals (cells with the same row + column) in order, with
/// even diagonals walked bottom-left to top-right and odd diagonals top-right to bottom-left.
pub const fn zigzag_row_col(index: usize, n: usize) -> (usize, usize) {
    // find the diagonal that contains the index
    let mut diagonal = 0;
    let mut start = 0;
    loop {
        let len = if diagonal < n {
            diagonal + 1
        } else {
            2 * n - 1 - diagonal
        };

        if index < start + len {
            break;
        }

        start += len;
        diagonal += 1;
    }

    let offset = index - start;
    let row_min = if diagonal >= n { diagonal - n + 1 } else { 0 };
    let row_max = if diagonal < n { diagonal } else { n - 1 };

    let row = if diagonal % 2 == 0 {
        row_max - offset
    } else {
        row_min + offset
    };

    (row, diagonal - row)
}

const fn calc_zigzag_to_natural() -> [u8; BLOCK_SIZE] {
    let mut table = [0u8; BLOCK_SIZE];
    let mut i = 0;
    while i < BLOCK_SIZE {
        let (row, col) = zigzag_row_col(i, BLOCK_DIM);
        table[i] = (row * BLOCK_DIM + col) as u8;
        i += 1;
    }
    table
}

const fn calc_natural_to_zigzag() -> [u8; BLOCK_SIZE] {
    let mut table = [0u8; BLOCK_SIZE];
    let mut i = 0;
    while i < BLOCK_SIZE {
        table[ZIGZAG_TO_NATURAL[i] as usize] = i as u8;
        i += 1;
    }
    table
}

/// zig-zag index -> natural (row * 8 + column) index
pub const ZIGZAG_TO_NATURAL: [u8; BLOCK_SIZE] = calc_zigzag_to_natural();

/// natural (row * 8 + column) index -> zig-zag index
pub const NATURAL_TO_ZIGZAG: [u8; BLOCK_SIZE] = calc_natural_to_zigzag();
