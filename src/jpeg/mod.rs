//! Module for decoding baseline JPEG images into pixels.
//!
//! Markers are located first, then each segment is parsed into the frame, scan and table
//! structures held by `Jpg`. The entropy-coded data is only decoded when pixels are
//! requested: Huffman decoding into coefficient blocks, dequantization, inverse DCT,
//! and finally upsampling and color conversion into an RGBA raster.

mod bit_reader;
mod color;
mod component_info;
mod data_unit;
mod ecs_decoder;
mod frame_header;
mod huffman_table;
mod idct;
pub mod jpeg_code;
pub mod jpg;
pub mod marker_scanner;
pub mod metadata;
mod quantization_table;
mod scan_header;

#[cfg(test)]
mod bit_writer;
#[cfg(test)]
mod jpeg_builder;

pub use color::ColorSpace;
pub use component_info::ComponentInfo;
pub use frame_header::FrameHeader;
pub use huffman_table::{HuffmanTable, Symbol, TableClass};
pub use quantization_table::QuantizationTable;
pub use scan_header::{ScanComponent, ScanHeader};
