/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use std::fmt::Display;
use std::io::ErrorKind;
use std::num::TryFromIntError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
#[non_exhaustive]
/// Well-defined errors for malformed or unsupported input found while decoding
pub enum ExitCode {
    /// Assertion failure, which probably indicates a bug in the library.
    AssertionFailure = 1,

    /// The entropy-coded data or a segment ended before the expected number of bytes/bits.
    ShortRead = 3,

    /// The frame uses a coding process other than baseline DCT (progressive, lossless, arithmetic...)
    UnsupportedFrameType = 8,

    /// A component uses a sampling factor that doesn't evenly divide the frame maximum.
    SamplingFactorUnsupported = 10,

    /// An error was returned by an IO operation.
    OsError = 33,

    /// The JPEG uses a non-standard or out of range header value that we don't decode.
    UnsupportedJpeg = 42,

    /// The image unit contains no SOF0 frame header, or a scan appears before any frame.
    NoFrame = 50,

    /// A frame has no scans.
    NoScan = 51,

    /// No Huffman table was defined before the scan.
    NoHuffmanTables = 52,

    /// No quantization table was defined before the scan.
    NoQuantizationTables = 53,

    /// A scan references a component id that the frame doesn't declare.
    ComponentNotFound = 60,

    /// A scan references a DC or AC Huffman table id that is not in scope.
    HuffmanTableNotFound = 61,

    /// A component references a quantization table id that is not in scope.
    QuantizationTableNotFound = 62,

    /// None of the valid code lengths matched a code in the Huffman table.
    HuffmanCodeNotFound = 70,

    /// A run of zeroes pushed the coefficient index past the end of the block.
    McuEndNotFound = 71,

    /// The decoded Huffman symbol is not a valid run/size combination.
    InvalidSymbol = 72,

    /// A segment's payload doesn't match its declared layout.
    InvalidSegment = 80,

    /// A quantization table declares a precision other than 8 or 16 bits.
    InvalidQuantizationPrecision = 81,

    /// The image uses restart intervals, which are not decoded.
    RestartIntervalUnsupported = 82,

    /// The buffer doesn't contain any complete SOI..EOI image.
    NoImageFound = 90,

    /// error occured while casting an integer to a smaller type, most likely
    /// means that the JPEG contains invalid data
    IntegerCastOverflow = 1000,

    /// Caller passed in invalid parameters
    SyntaxError = 1006,

    /// The file to be read was not found (only used by utility exe)
    FileNotFound = 1007,
}

impl Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl ExitCode {
    /// Converts the error code into an integer for use as a process exit code.
    pub fn as_integer_error_code(self) -> i32 {
        self as i32
    }
}

/// Since errors are rare and stop everything, we want them to be as lightweight as possible.
#[derive(Debug, Clone)]
struct ImagexErrorInternal {
    exit_code: ExitCode,
    message: String,
}

/// Standard error returned by the imagex library
#[derive(Debug, Clone)]
pub struct ImagexError {
    i: Box<ImagexErrorInternal>,
}

pub type Result<T> = std::result::Result<T, ImagexError>;

impl Display for ImagexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{0}: {1}", self.i.exit_code, self.i.message)
    }
}

impl ImagexError {
    /// Creates a new ImagexError with the specified exit code and message.
    pub fn new(exit_code: ExitCode, message: impl AsRef<str>) -> ImagexError {
        ImagexError {
            i: Box::new(ImagexErrorInternal {
                exit_code,
                message: message.as_ref().to_owned(),
            }),
        }
    }

    /// Returns the exit code of the error to classify the error
    pub fn exit_code(&self) -> ExitCode {
        self.i.exit_code
    }

    /// Returns the message of the error, which is a human-readable description of the error.
    pub fn message(&self) -> &str {
        &self.i.message
    }

    /// Adds context to the error by appending the current location in the code. This
    /// allows for building a callstack of where the error occurred.
    #[cold]
    #[inline(never)]
    #[track_caller]
    pub fn add_context(&mut self) {
        self.i
            .message
            .push_str(&format!("\n at {}", std::panic::Location::caller()));
    }
}

#[cold]
#[track_caller]
pub fn err_exit_code<T>(error_code: ExitCode, message: impl AsRef<str>) -> Result<T> {
    let mut e = ImagexError::new(error_code, message.as_ref());
    e.add_context();
    return Err(e);
}

pub trait AddContext<T> {
    #[track_caller]
    fn context(self) -> Result<T>;
}

impl<T, E: Into<ImagexError>> AddContext<T> for core::result::Result<T, E> {
    #[track_caller]
    fn context(self) -> Result<T> {
        match self {
            Ok(x) => Ok(x),
            Err(e) => {
                let mut e = e.into();
                e.add_context();
                Err(e)
            }
        }
    }
}

impl std::error::Error for ImagexError {}

/// Non-fatal conditions found while building the container. These never stop decoding
/// and several of them can be present at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The thumbnail dimensions in a JFIF header don't match the bytes that follow.
    ThumbnailSizeMismatch {
        marker: u8,
        expected: usize,
        actual: usize,
    },

    /// An application segment was too short for its identifier's fixed fields.
    TruncatedMetadata { marker: u8 },

    /// An application segment with an identifier we don't interpret.
    UnsupportedMetadata { marker: u8 },

    /// A component that doesn't map onto an output channel.
    IgnoredComponent { component_id: u8 },
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::ThumbnailSizeMismatch {
                marker,
                expected,
                actual,
            } => write!(
                f,
                "FF {0:X}: thumbnail needs {1} bytes, segment has {2}",
                marker, expected, actual
            ),
            Warning::TruncatedMetadata { marker } => {
                write!(f, "FF {0:X}: metadata segment truncated", marker)
            }
            Warning::UnsupportedMetadata { marker } => {
                write!(f, "FF {0:X}: metadata not supported", marker)
            }
            Warning::IgnoredComponent { component_id } => {
                write!(f, "component {0} ignored in output", component_id)
            }
        }
    }
}

fn get_io_error_exit_code(e: &std::io::Error) -> ExitCode {
    if e.kind() == ErrorKind::UnexpectedEof {
        ExitCode::ShortRead
    } else {
        ExitCode::OsError
    }
}

impl From<TryFromIntError> for ImagexError {
    #[track_caller]
    fn from(e: TryFromIntError) -> Self {
        let mut e = ImagexError::new(ExitCode::IntegerCastOverflow, e.to_string());
        e.add_context();
        e
    }
}

/// translates std::io::Error into ImagexError
impl From<std::io::Error> for ImagexError {
    #[track_caller]
    fn from(e: std::io::Error) -> Self {
        match e.get_ref().and_then(|inner| inner.downcast_ref::<ImagexError>()) {
            Some(le) => {
                return le.clone();
            }
            None => {
                let mut le = ImagexError::new(get_io_error_exit_code(&e), e.to_string());
                le.add_context();
                le
            }
        }
    }
}

/// translates ImagexError into std::io::Error, which involves putting into a Box and using Other
impl From<ImagexError> for std::io::Error {
    fn from(e: ImagexError) -> Self {
        return std::io::Error::new(std::io::ErrorKind::Other, e);
    }
}

#[test]
fn test_error_translation() {
    // test wrapping inside an io error
    fn my_std_error() -> core::result::Result<(), std::io::Error> {
        Err(ImagexError::new(ExitCode::SyntaxError, "test error").into())
    }

    let e: ImagexError = my_std_error().unwrap_err().into();
    assert_eq!(e.exit_code(), ExitCode::SyntaxError);
    assert_eq!(e.message(), "test error");

    // an IO error should be translated into an OsError
    let e: ImagexError = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found").into();
    assert_eq!(e.exit_code(), ExitCode::OsError);

    let e: ImagexError = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof").into();
    assert_eq!(e.exit_code(), ExitCode::ShortRead);
}

#[test]
fn test_context_appends_location() {
    fn inner() -> Result<()> {
        err_exit_code(ExitCode::McuEndNotFound, "overflow")
    }

    let e = inner().context().unwrap_err();
    assert_eq!(e.exit_code(), ExitCode::McuEndNotFound);
    assert!(e.message().starts_with("overflow"));
    assert_eq!(e.message().matches("\n at ").count(), 2);
}
