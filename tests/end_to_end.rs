/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use std::io::Cursor;

use imagex::{
    decode_all_jpegs, decode_jpeg, scan_markers, ColorSpace, EnabledFeatures, ExitCode, Jpg,
    Metadata, Raster, SegmentType, Warning, Xdat,
};
use rstest::rstest;

/// packs bits MSB first and escapes 0xFF bytes the way entropy-coded data requires
struct BitPacker {
    out: Vec<u8>,
    acc: u32,
    bits: u32,
}

impl BitPacker {
    fn new() -> Self {
        BitPacker {
            out: Vec::new(),
            acc: 0,
            bits: 0,
        }
    }

    fn put(&mut self, value: u32, bits: u32) {
        for i in (0..bits).rev() {
            self.acc = (self.acc << 1) | ((value >> i) & 1);
            self.bits += 1;
            if self.bits == 8 {
                let b = self.acc as u8;
                self.out.push(b);
                if b == 0xFF {
                    self.out.push(0x00);
                }
                self.acc = 0;
                self.bits = 0;
            }
        }
    }

    /// DC table 0 gives category `c` the 5 bit code `c`
    fn dc(&mut self, diff: i32) {
        let category = 32 - diff.unsigned_abs().leading_zeros();
        self.put(category, 5);
        self.magnitude(diff, category);
    }

    /// AC table 0 has EOB = 00, (0,1) = 01 and ZRL = 10
    fn ac_one(&mut self, positive: bool) {
        self.put(0b01, 2);
        self.put(u32::from(positive), 1);
    }

    fn eob(&mut self) {
        self.put(0b00, 2);
    }

    fn magnitude(&mut self, value: i32, category: u32) {
        if category == 0 {
            return;
        }
        let raw = if value < 0 {
            value + (1 << category) - 1
        } else {
            value
        };
        self.put(raw as u32, category);
    }

    fn finish(mut self) -> Vec<u8> {
        while self.bits != 0 {
            self.put(1, 1);
        }
        self.out
    }
}

fn segment(out: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    out.extend_from_slice(&[0xFF, marker]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
}

/// DQT for table 0, 8 bit entries, in zig-zag order
fn dqt(zigzag: &[u8; 64]) -> Vec<u8> {
    let mut p = vec![0x00];
    p.extend_from_slice(zigzag);
    p
}

/// DC tables for the given ids and AC table 0
fn dht(dc_ids: &[u8]) -> Vec<u8> {
    let mut p = Vec::new();
    for &id in dc_ids {
        p.push(id);
        let mut counts = [0u8; 16];
        counts[4] = 16;
        p.extend_from_slice(&counts);
        p.extend(0..16u8);
    }

    p.push(0x10);
    let mut counts = [0u8; 16];
    counts[1] = 3;
    p.extend_from_slice(&counts);
    p.extend_from_slice(&[0x00, 0x01, 0xF0]);
    p
}

fn sof(marker: u8, width: u16, height: u16, components: &[(u8, u8)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut p = vec![8];
    p.extend_from_slice(&height.to_be_bytes());
    p.extend_from_slice(&width.to_be_bytes());
    p.push(components.len() as u8);
    for &(id, sampling) in components {
        p.extend_from_slice(&[id, sampling, 0]);
    }
    segment(&mut out, marker, &p);
    out
}

/// scan header naming each component with its (DC << 4 | AC) table byte
fn sos(components: &[(u8, u8)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut p = vec![components.len() as u8];
    for &(id, tables) in components {
        p.extend_from_slice(&[id, tables]);
    }
    p.extend_from_slice(&[0, 63, 0]);
    segment(&mut out, 0xDA, &p);
    out
}

/// a complete image with unit quantization, one scan over every listed component
fn image(width: u16, height: u16, components: &[(u8, u8)], ecs: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    segment(&mut out, 0xDB, &dqt(&[1; 64]));
    segment(&mut out, 0xC4, &dht(&[0]));
    out.extend(sof(0xC0, width, height, components));

    let scan: Vec<(u8, u8)> = components.iter().map(|&(id, _)| (id, 0x00)).collect();
    out.extend(sos(&scan));
    out.extend_from_slice(ecs);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// 8x8 4:4:4 image where Y, Cb and Cr are -28, -20 and 30 everywhere
fn solid_color_image() -> Vec<u8> {
    let mut bits = BitPacker::new();
    for dc in [-224, -160, 240] {
        bits.dc(dc);
        bits.eob();
    }
    image(8, 8, &[(1, 0x11), (2, 0x11), (3, 0x11)], &bits.finish())
}

fn gray_image(width: u16, height: u16, dcs: &[i32]) -> Vec<u8> {
    let mut bits = BitPacker::new();
    let mut previous = 0;
    for &dc in dcs {
        bits.dc(dc - previous);
        bits.eob();
        previous = dc;
    }
    image(width, height, &[(1, 0x11)], &bits.finish())
}

#[test]
fn solid_color_end_to_end() {
    let raster = decode_jpeg(&solid_color_image(), &EnabledFeatures::default()).unwrap();

    assert_eq!((raster.width(), raster.height()), (8, 8));
    assert!(raster.pixels().iter().all(|&p| p == [142, 85, 65, 255]));
}

#[test]
fn horizontal_cosine() {
    // first horizontal frequency only, scaled up by its quantizer
    let mut quantization = [1u8; 64];
    quantization[1] = 64;

    let mut bits = BitPacker::new();
    bits.dc(0);
    bits.ac_one(true);
    bits.eob();

    let mut data = vec![0xFF, 0xD8];
    segment(&mut data, 0xDB, &dqt(&quantization));
    segment(&mut data, 0xC4, &dht(&[0]));
    data.extend(sof(0xC0, 8, 8, &[(1, 0x11)]));
    data.extend(sos(&[(1, 0x00)]));
    data.extend(bits.finish());
    data.extend_from_slice(&[0xFF, 0xD9]);

    let raster = decode_jpeg(&data, &EnabledFeatures::default()).unwrap();

    let expected = [139, 137, 134, 130, 126, 122, 119, 117];
    for y in 0..8 {
        for (x, &v) in expected.iter().enumerate() {
            assert_eq!(raster.pixel(x as u32, y), [v, v, v, 255], "at {0},{1}", x, y);
        }
    }
}

#[rstest]
fn gray_levels(#[values(-1024, -512, 0, 80, 1016)] dc: i32) {
    let raster = decode_jpeg(&gray_image(8, 8, &[dc]), &EnabledFeatures::default()).unwrap();

    let v = (dc / 8 + 128).clamp(0, 255) as u8;
    assert!(raster.pixels().iter().all(|&p| p == [v, v, v, 255]));
}

#[test]
fn dc_prediction_across_blocks() {
    // three blocks side by side, each coded as a difference to the previous one
    let raster = decode_jpeg(&gray_image(24, 8, &[40, 16, 32]), &EnabledFeatures::default())
        .unwrap();

    assert_eq!(raster.pixel(0, 0), [133, 133, 133, 255]);
    assert_eq!(raster.pixel(8, 0), [130, 130, 130, 255]);
    assert_eq!(raster.pixel(23, 7), [132, 132, 132, 255]);
}

#[rstest]
#[case(true, (12, 3))]
#[case(false, (16, 8))]
fn crop_to_frame(#[case] crop: bool, #[case] size: (u32, u32)) {
    let features = EnabledFeatures {
        crop_to_frame: crop,
        ..EnabledFeatures::default()
    };

    let raster = decode_jpeg(&gray_image(12, 3, &[0, 0]), &features).unwrap();
    assert_eq!((raster.width(), raster.height()), size);
}

#[test]
fn marker_scan_boundary() {
    // the length field counts itself, so a 2 byte payload has length 4
    let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x12, 0x34, 0xFF, 0xD9];

    let units = scan_markers(&data);
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].markers.len(), 1);
    assert_eq!(units[0].markers[0].segment_type, SegmentType::APP(0));
    assert_eq!(units[0].markers[0].payload_length, 2);
    assert_eq!(units[0].markers[0].payload(&data), &[0x12, 0x34]);
}

#[test]
fn missing_dc_table() {
    let mut bits = BitPacker::new();
    bits.dc(0);
    bits.eob();

    let mut data = vec![0xFF, 0xD8];
    segment(&mut data, 0xDB, &dqt(&[1; 64]));
    segment(&mut data, 0xC4, &dht(&[0, 1]));
    data.extend(sof(0xC0, 8, 8, &[(1, 0x11)]));
    data.extend(sos(&[(1, 0x30)]));
    data.extend(bits.finish());
    data.extend_from_slice(&[0xFF, 0xD9]);

    // the structure is fine, the reference only fails once the scan is decoded
    let jpg = Jpg::read(&data, &EnabledFeatures::default()).unwrap();
    assert_eq!(
        jpg.decode().unwrap_err().exit_code(),
        ExitCode::HuffmanTableNotFound
    );
}

#[rstest]
#[case::empty_entropy_data(image(8, 8, &[(1, 0x11)], &[]), ExitCode::ShortRead)]
#[case::too_few_blocks(gray_image(16, 8, &[0]), ExitCode::ShortRead)]
#[case::no_image(vec![0x12, 0x34, 0xFF, 0xD8], ExitCode::NoImageFound)]
#[case::huge(gray_image(20000, 8, &[0]), ExitCode::UnsupportedJpeg)]
fn decode_errors(#[case] data: Vec<u8>, #[case] expected: ExitCode) {
    assert_eq!(
        decode_jpeg(&data, &EnabledFeatures::default())
            .unwrap_err()
            .exit_code(),
        expected
    );
}

#[test]
fn progressive_is_rejected() {
    let mut data = vec![0xFF, 0xD8];
    segment(&mut data, 0xDB, &dqt(&[1; 64]));
    segment(&mut data, 0xC4, &dht(&[0]));
    data.extend(sof(0xC2, 8, 8, &[(1, 0x11)]));
    data.extend(sos(&[(1, 0x00)]));
    data.extend_from_slice(&[0x00, 0xFF, 0xD9]);

    assert_eq!(
        decode_jpeg(&data, &EnabledFeatures::default())
            .unwrap_err()
            .exit_code(),
        ExitCode::UnsupportedFrameType
    );
}

#[test]
fn metadata_and_warnings() {
    let solid = solid_color_image();

    // insert a JFIF header with a thumbnail that is one byte short, and a comment
    let mut jfif = b"JFIF\0".to_vec();
    jfif.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 1, 1, 0xAA, 0xBB]);

    let mut data = vec![0xFF, 0xD8];
    segment(&mut data, 0xE0, &jfif);
    segment(&mut data, 0xFE, b"imagex");
    data.extend_from_slice(&solid[2..]);

    let jpg = Jpg::read(&data, &EnabledFeatures::default()).unwrap();
    assert_eq!(
        jpg.warnings(),
        &[Warning::ThumbnailSizeMismatch {
            marker: 0xE0,
            expected: 3,
            actual: 2
        }]
    );

    assert!(matches!(&jpg.metadata()[0], Metadata::Jfif(j) if j.thumbnail == vec![0xAA, 0xBB]));
    assert_eq!(jpg.metadata()[1], Metadata::Comment(b"imagex".to_vec()));
    assert_eq!(jpg.color_space(&jpg.frames()[0].header), ColorSpace::YCbCr);

    let raster = jpg.decode().unwrap();
    assert_eq!(raster.pixel(0, 0), [142, 85, 65, 255]);
}

#[test]
fn concatenated_streams() {
    let mut data = solid_color_image();
    data.extend_from_slice(&[0x00, 0x00]);
    data.extend(gray_image(8, 8, &[80]));

    let rasters = decode_all_jpegs(&data, &EnabledFeatures::default());
    assert_eq!(rasters.len(), 2);
    assert_eq!(rasters[0].as_ref().unwrap().pixel(0, 0), [142, 85, 65, 255]);
    assert_eq!(rasters[1].as_ref().unwrap().pixel(0, 0), [138, 138, 138, 255]);

    // decode_jpeg only looks at the first one
    let first = decode_jpeg(&data, &EnabledFeatures::default()).unwrap();
    assert_eq!(first.pixel(7, 7), [142, 85, 65, 255]);
}

#[test]
fn xdat_output() {
    let raster = decode_jpeg(&gray_image(8, 8, &[0]), &EnabledFeatures::default()).unwrap();

    let mut out = Vec::new();
    Xdat::from_raster(&raster).write_to(&mut out).unwrap();
    assert_eq!(&out[..12], &[8, 0, 0, 0, 8, 0, 0, 0, 4, 8, 0, 0]);
    assert_eq!(out.len(), 12 + 8 * 8 * 4);

    let read = Xdat::read_from(&mut Cursor::new(&out)).unwrap();
    let back = Raster::new(read.width, read.height, read.pixel_bytes).unwrap();
    assert_eq!(back, raster);
}

/// reads a file from the images directory
fn read_file(filename: &str) -> Vec<u8> {
    use std::io::Read;

    let filename = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("images")
        .join(filename);
    let mut f = std::fs::File::open(filename).unwrap();

    let mut content = Vec::new();
    f.read_to_end(&mut content).unwrap();

    content
}

/// inserts 0xFF fill bytes in front of the EOI, which any marker may carry
fn with_fill_bytes(mut data: Vec<u8>, fill: usize) -> Vec<u8> {
    let eoi = data.len() - 2;
    assert_eq!(&data[eoi..], &[0xFF, 0xD9]);
    data.splice(eoi..eoi, std::iter::repeat(0xFF).take(fill));
    data
}

fn assert_close(actual: [u8; 4], expected: [u8; 3], x: u32, y: u32) {
    for c in 0..3 {
        assert!(
            (i32::from(actual[c]) - i32::from(expected[c])).abs() <= 2,
            "pixel ({0},{1}) is {2:?}, expected about {3:?}",
            x,
            y,
            actual,
            expected
        );
    }
    assert_eq!(actual[3], 255);
}

/// 2x2 grayscale written by an external encoder with the annex K tables
#[rstest]
fn external_grayscale(#[values(0, 2)] fill: usize) {
    let data = with_fill_bytes(read_file("gray_2x2.jpg"), fill);

    let jpg = Jpg::read(&data, &EnabledFeatures::default()).unwrap();
    let frame = &jpg.frames()[0];
    assert_eq!(jpg.color_space(&frame.header), ColorSpace::Grayscale);
    assert_eq!(frame.scans[0].data.len(), 1 + fill);

    let raster = jpg.decode().unwrap();
    assert_eq!((raster.width(), raster.height()), (2, 2));
    assert!(raster.pixels().iter().all(|&p| p == [128, 128, 128, 255]));
}

/// 16x16 4:2:0 logo with optimized tables from an external encoder
#[rstest]
fn external_subsampled(#[values(0, 2)] fill: usize) {
    let data = with_fill_bytes(read_file("python_logo.jpg"), fill);

    let raster = decode_jpeg(&data, &EnabledFeatures::default()).unwrap();
    assert_eq!((raster.width(), raster.height()), (16, 16));

    for &(x, y, expected) in &[
        (0, 0, [0, 2, 8]),
        (5, 1, [219, 255, 255]),
        (4, 4, [62, 125, 169]),
        (12, 4, [255, 224, 74]),
        (3, 9, [16, 57, 87]),
        (4, 8, [17, 4, 0]),
        (9, 13, [255, 255, 132]),
        (15, 15, [0, 1, 6]),
    ] {
        assert_close(raster.pixel(x, y), expected, x, y);
    }
}
