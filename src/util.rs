// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use simplelog::{ ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode };

pub fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();

    // Fails only if a logger is already installed
    let _ = TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto);
}

pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
