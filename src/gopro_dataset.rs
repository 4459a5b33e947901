// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

pub use gopro_dataset_core as core;
pub mod util;
pub mod rendering;
pub mod pipeline;
mod cli;

fn main() {
    let opts: cli::Opts = argh::from_env();

    util::init_logging(opts.verbose);
    log_panics::init();
    ::log::debug!("gopro-dataset {}", util::get_version());

    if let Err(e) = cli::run(opts) {
        ::log::error!("{}", e);
        std::process::exit(1);
    }
}
