/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use std::sync::OnceLock;

use bytemuck::cast;
use wide::f32x8;

use super::quantization_table::QuantizationTable;
use crate::consts::*;

/// Cosine basis of the 8 point inverse DCT, `basis[i][k] = C(k) cos((2i+1)k pi/16)`
/// with `C(0) = 1/sqrt(2)` and `C(k) = 1` otherwise.
struct IdctBasis {
    scalar: [[f32; BLOCK_DIM]; BLOCK_DIM],

    /// column k of the basis as a vector, used for the row pass
    columns: [f32x8; BLOCK_DIM],
}

fn basis() -> &'static IdctBasis {
    static BASIS: OnceLock<IdctBasis> = OnceLock::new();

    BASIS.get_or_init(|| {
        let mut scalar = [[0f32; BLOCK_DIM]; BLOCK_DIM];
        for (i, row) in scalar.iter_mut().enumerate() {
            for (k, v) in row.iter_mut().enumerate() {
                let c = if k == 0 {
                    std::f64::consts::FRAC_1_SQRT_2
                } else {
                    1.0
                };
                *v = (c * (((2 * i + 1) * k) as f64 * std::f64::consts::PI / 16.0).cos()) as f32;
            }
        }

        let mut columns = [f32x8::splat(0.0); BLOCK_DIM];
        for (k, column) in columns.iter_mut().enumerate() {
            let mut c = [0f32; BLOCK_DIM];
            for (i, v) in c.iter_mut().enumerate() {
                *v = scalar[i][k];
            }
            *column = f32x8::from(c);
        }

        IdctBasis { scalar, columns }
    })
}

/// Multiplies each coefficient by its quantizer, both in natural order.
#[inline(always)]
pub fn dequantize(table: &mut [i32; BLOCK_SIZE], quantization_table: &QuantizationTable) {
    for (c, &q) in table
        .iter_mut()
        .zip(quantization_table.get_quantization_table().iter())
    {
        *c = c.wrapping_mul(i32::from(q));
    }
}

/// Transforms a dequantized block in natural order into spatial samples, still centered
/// around zero (level shift not applied). Results are rounded to the nearest integer.
///
/// Separable version of `f(r,c) = 1/4 sum_kr sum_kc basis[r][kr] basis[c][kc] F(kr,kc)`:
/// the row pass transforms the horizontal frequencies of each row with eight lanes at once,
/// the column pass then combines the rows.
pub fn inverse_dct(table: &[i32; BLOCK_SIZE]) -> [i32; BLOCK_SIZE] {
    let b = basis();

    let mut rows = [f32x8::splat(0.0); BLOCK_DIM];
    for (kr, row) in rows.iter_mut().enumerate() {
        let coefficients = &table[kr * BLOCK_DIM..(kr + 1) * BLOCK_DIM];

        // most high frequency rows are empty
        if coefficients.iter().all(|&c| c == 0) {
            continue;
        }

        let mut acc = f32x8::splat(0.0);
        for (kc, &coef) in coefficients.iter().enumerate() {
            if coef != 0 {
                acc += f32x8::splat(coef as f32) * b.columns[kc];
            }
        }
        *row = acc;
    }

    let mut out = [f32x8::splat(0.0); BLOCK_DIM];
    for (r, o) in out.iter_mut().enumerate() {
        let mut acc = f32x8::splat(0.0);
        for (kr, row) in rows.iter().enumerate() {
            acc += f32x8::splat(b.scalar[r][kr]) * *row;
        }
        *o = acc * f32x8::splat(0.25);
    }

    let samples: [f32; BLOCK_SIZE] = cast(out);

    let mut result = [0i32; BLOCK_SIZE];
    for (r, s) in result.iter_mut().zip(samples.iter()) {
        *r = s.round() as i32;
    }
    result
}
