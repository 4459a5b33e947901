// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use argh::FromArgs;
use gopro_dataset_core::transform;

mod util;

/** IMU to camera transform
Inverts an IMU-from-camera rigid transform and prints it column-major, ready for the imuToCamera calibration field
*/
#[derive(FromArgs)]
struct Opts {
    /// 16 comma-separated row-major values, eg. "1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1". Defaults to the built-in GoPro calibration
    #[argh(option, short = 'm')]
    matrix: Option<String>,

    /// debug logging
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn run(opts: &Opts) -> gopro_dataset_core::Result<String> {
    let values = match &opts.matrix {
        Some(csv) => transform::parse_values(csv)?,
        None => transform::DEFAULT_IMU_FROM_CAMERA.to_vec(),
    };
    let m = transform::matrix_from_row_major(&values)?;
    ::log::debug!("Input matrix:{}", m);

    let inv = transform::invert_rigid(&m)?;
    Ok(transform::column_major_csv(&inv))
}

fn main() {
    let opts: Opts = argh::from_env();
    util::init_logging(opts.verbose);
    log_panics::init();
    ::log::debug!("imu-to-camera {}", util::get_version());

    match run(&opts) {
        Ok(txt) => println!("{txt}"),
        Err(e) => {
            ::log::error!("{}", e);
            std::process::exit(1);
        }
    }
}
