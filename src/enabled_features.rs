/// Features that are enabled in the decoder. Turn off for potential compatibility issues.
#[derive(Debug, Clone)]
pub struct EnabledFeatures {
    /// maximum jpeg width
    pub max_jpeg_width: u32,

    /// maximum jpeg height
    pub max_jpeg_height: u32,

    /// Crop the decoded raster to the width and height declared in the frame header.
    ///
    /// When disabled, the raster covers every decoded MCU, so its size is rounded
    /// up to a multiple of the MCU size.
    pub crop_to_frame: bool,
}

impl Default for EnabledFeatures {
    fn default() -> Self {
        Self {
            max_jpeg_width: 16386,
            max_jpeg_height: 16386,
            crop_to_frame: true,
        }
    }
}

impl EnabledFeatures {
    /// parameters that allow everything
    #[allow(dead_code)]
    pub fn all() -> Self {
        Self {
            max_jpeg_width: u32::MAX,
            max_jpeg_height: u32::MAX,
            crop_to_frame: true,
        }
    }
}
