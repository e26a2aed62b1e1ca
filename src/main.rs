/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{stdout, BufWriter, IsTerminal, Read, Write};

use imagex::{
    get_version_string, EnabledFeatures, ExitCode, ImagexError, Jpg, Raster, Result, Xdat,
};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

const USAGE: &str = "usage: imagex_util [-v] [--dump] [--no-crop] [--overwrite] \
[--max-width N] [--max-height N] [--scan N] [--format xdat|rgba] <input.jpg> [output]";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    Xdat,
    Rgba,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "xdat" => Ok(OutputFormat::Xdat),
            "rgba" => Ok(OutputFormat::Rgba),
            _ => Err(format!("unknown output format {0}", s)),
        }
    }
}

struct Options {
    verbose: bool,
    dump: bool,
    overwrite: bool,
    scan: Option<usize>,
    format: OutputFormat,
    enabled_features: EnabledFeatures,
    input: OsString,
    output: Option<OsString>,
}

fn syntax_error(e: impl std::fmt::Display) -> ImagexError {
    ImagexError::new(ExitCode::SyntaxError, format!("{0}\n{1}", e, USAGE))
}

fn parse_options() -> Result<Options> {
    let mut args = pico_args::Arguments::from_env();

    let mut enabled_features = EnabledFeatures::default();
    if args.contains("--no-crop") {
        enabled_features.crop_to_frame = false;
    }
    if let Some(x) = args
        .opt_value_from_str("--max-width")
        .map_err(syntax_error)?
    {
        enabled_features.max_jpeg_width = x;
    }
    if let Some(x) = args
        .opt_value_from_str("--max-height")
        .map_err(syntax_error)?
    {
        enabled_features.max_jpeg_height = x;
    }

    let verbose = args.contains(["-v", "--verbose"]);
    let dump = args.contains("--dump");
    let overwrite = args.contains("--overwrite");
    let scan = args.opt_value_from_str("--scan").map_err(syntax_error)?;
    let format = args
        .opt_value_from_str("--format")
        .map_err(syntax_error)?
        .unwrap_or(OutputFormat::Xdat);

    let mut free = args.finish().into_iter();
    let input = match free.next() {
        Some(i) => i,
        None => return Err(syntax_error("input filename is needed")),
    };
    let output = free.next();

    if let Some(extra) = free.next() {
        return Err(syntax_error(format!(
            "unexpected argument {0}",
            extra.to_string_lossy()
        )));
    }

    if output.is_none() && !dump {
        return Err(syntax_error("output filename is needed unless --dump is given"));
    }

    Ok(Options {
        verbose,
        dump,
        overwrite,
        scan,
        format,
        enabled_features,
        input,
        output,
    })
}

fn dump(jpg: &Jpg) {
    println!("{0}x{1}, {2} scans", jpg.width(), jpg.height(), jpg.scan_count());

    for (i, frame) in jpg.frames().iter().enumerate() {
        let s = format!("{0:?}", frame.header);
        println!("frame {0}: {1}", i, s.replace("},", "},\r\n"));
        println!("color space {0:?}", jpg.color_space(&frame.header));

        for scan in &frame.scans {
            println!(
                "  scan {0:?}, restart interval {1}, {2} bytes",
                scan.header,
                scan.restart_interval,
                scan.data.len()
            );
        }
    }

    for m in jpg.metadata() {
        let s = format!("{0:?}", m);
        // payloads can be large, only show the start
        println!("metadata: {0}", s.chars().take(160).collect::<String>());
    }

    for w in jpg.warnings() {
        println!("warning: {0}", w);
    }
}

fn write_output(raster: &Raster, options: &Options, output: &OsString) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(options.overwrite)
        .truncate(options.overwrite)
        .create_new(!options.overwrite)
        .open(output)?;

    let mut writer = BufWriter::new(file);
    match options.format {
        OutputFormat::Xdat => Xdat::from_raster(raster).write_to(&mut writer)?,
        OutputFormat::Rgba => raster.write_rgba(&mut writer)?,
    }
    writer.flush()?;

    Ok(())
}

// wrap main so that errors get printed nicely without a panic
fn main_with_result() -> Result<()> {
    let options = parse_options()?;

    // only output the log if we are connected to a console (otherwise if there is redirection we would corrupt the file)
    if stdout().is_terminal() {
        let level = if options.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        if let Err(e) = SimpleLogger::new().with_level(level).init() {
            eprintln!("logger not installed: {0}", e);
        }
    }

    info!("{0}", get_version_string());

    let mut input_data = Vec::new();
    File::open(&options.input)
        .map_err(|e| ImagexError::new(ExitCode::FileNotFound, e.to_string()))?
        .read_to_end(&mut input_data)?;

    let jpg = Jpg::read(&input_data, &options.enabled_features)?;

    if options.dump {
        dump(&jpg);
    }

    if let Some(output) = &options.output {
        let raster = match options.scan {
            Some(i) => jpg.decode_scan(i)?,
            None => jpg.decode()?,
        };

        info!(
            "decoded {0}x{1} raster from {2} bytes",
            raster.width(),
            raster.height(),
            input_data.len()
        );

        write_output(&raster, &options, output)?;
    }

    Ok(())
}

fn main() {
    match main_with_result() {
        Ok(_) => {}
        Err(e) => {
            eprintln!(
                "error code: {0} {1} {2}",
                e.exit_code(),
                e.exit_code().as_integer_error_code(),
                e.message()
            );
            std::process::exit(e.exit_code().as_integer_error_code());
        }
    }
}
