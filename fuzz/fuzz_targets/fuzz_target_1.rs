#![no_main]

use imagex::{catch_unwind_result, decode_all_jpegs, EnabledFeatures};

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // keep allocations bounded for huge declared dimensions
    let features = EnabledFeatures {
        max_jpeg_width: 2048,
        max_jpeg_height: 2048,
        ..EnabledFeatures::default()
    };

    let r = catch_unwind_result(|| {
        for raster in decode_all_jpegs(data, &features).into_iter().flatten() {
            assert_eq!(
                raster.pixel_bytes().len(),
                raster.width() as usize * raster.height() as usize * 4
            );
        }
        Ok(())
    });

    // a panic anywhere in the decoder is a bug, errors are fine
    if let Err(e) = r {
        assert_ne!(e.exit_code(), imagex::ExitCode::AssertionFailure, "{0}", e);
    }
});
