// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use nalgebra::Matrix4;

use crate::{ DatasetError, Result };

/// Default IMU-from-camera calibration, row-major.
pub const DEFAULT_IMU_FROM_CAMERA: [f64; 16] = [
    -0.999997,    0.00187569,  0.00184115,  -0.000269638,
    -0.00184106,  4.99428e-05, -0.999998,   -0.00853536,
    -0.00187578, -0.999998,    -4.64894e-05, -0.00305681,
     0.0,         0.0,          0.0,          1.0,
];

pub fn matrix_from_row_major(values: &[f64]) -> Result<Matrix4<f64>> {
    if values.len() != 16 {
        return Err(DatasetError::InvalidCalibration(format!("expected 16 matrix values, got {}", values.len())));
    }
    Ok(Matrix4::from_row_slice(values))
}

pub fn parse_values(csv: &str) -> Result<Vec<f64>> {
    csv.split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| DatasetError::InvalidCalibration(format!("invalid matrix value \"{}\": {e}", v.trim()))))
        .collect()
}

pub fn invert_rigid(m: &Matrix4<f64>) -> Result<Matrix4<f64>> {
    m.try_inverse().ok_or(DatasetError::SingularMatrix)
}

/// Flattens the matrix column by column into a comma-separated list.
pub fn column_major_csv(m: &Matrix4<f64>) -> String {
    // nalgebra stores matrices column-major already
    m.as_slice().iter().map(|v| format!("{v:?}")).collect::<Vec<_>>().join(",")
}
