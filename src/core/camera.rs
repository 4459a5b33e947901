// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use std::path::Path;
use nalgebra::Matrix4;
use serde::{ Serialize, Deserialize };

use crate::{ DatasetError, Result };

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraParameters {
    pub distortion_coefficients: [f64; 4],
    pub distortion_model: String,
    pub focal_length_x: f64,
    pub focal_length_y: f64,
    pub principal_point_x: f64,
    pub principal_point_y: f64,
}

/// Intrinsics and IMU extrinsics attached to every frame line.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraCalibration {
    pub camera_ind: u32,
    pub camera_parameters: CameraParameters,
    pub imu_to_camera: [[f64; 4]; 4], // row-major
}

impl Default for CameraCalibration {
    // GoPro HERO wide lens, downscaled by 3
    fn default() -> Self {
        Self {
            camera_ind: 0,
            camera_parameters: CameraParameters {
                distortion_coefficients: [-0.004973, 0.03975, -0.0374, 0.006239],
                distortion_model: "KANNALA_BRANDT4".into(),
                focal_length_x: 284.929992675781,
                focal_length_y: 285.165496826172,
                principal_point_x: 416.4547119140625,
                principal_point_y: 395.77349853515625,
            },
            imu_to_camera: [
                [ 0.01486, 0.9995,  -0.02577,  0.06522 ],
                [-0.9998,  0.01496,  0.003756, -0.0207 ],
                [ 0.00414, 0.02571,  0.9996,  -0.008054],
                [ 0.0,     0.0,      0.0,      1.0     ],
            ],
        }
    }
}

impl CameraCalibration {
    pub fn from_json(json: &str) -> Result<Self> {
        let cal: Self = serde_json::from_str(json)?;
        cal.validate()?;
        Ok(cal)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| DatasetError::InputRead { path: path.display().to_string(), source })?;
        let cal = Self::from_json(&data)?;
        log::info!("Loaded camera calibration from {} ({})", path.display(), cal.camera_parameters.distortion_model);
        Ok(cal)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.camera_parameters;
        if !(p.focal_length_x > 0.0 && p.focal_length_y > 0.0) {
            return Err(DatasetError::InvalidCalibration(format!("focal lengths must be positive, got {} and {}", p.focal_length_x, p.focal_length_y)));
        }
        if self.imu_to_camera[3] != [0.0, 0.0, 0.0, 1.0] {
            return Err(DatasetError::InvalidCalibration("imuToCamera must be a homogeneous transform with [0, 0, 0, 1] as the last row".into()));
        }
        if crate::transform::invert_rigid(&self.imu_to_camera_matrix()).is_err() {
            return Err(DatasetError::InvalidCalibration("imuToCamera is singular".into()));
        }
        Ok(())
    }

    pub fn imu_to_camera_matrix(&self) -> Matrix4<f64> {
        Matrix4::from_fn(|r, c| self.imu_to_camera[r][c])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_dataset_keys() {
        let v = serde_json::to_value(CameraCalibration::default()).unwrap();
        assert_eq!(v["cameraInd"], 0);
        assert_eq!(v["cameraParameters"]["distortionModel"], "KANNALA_BRANDT4");
        assert_eq!(v["cameraParameters"]["focalLengthX"], 284.929992675781);
        assert_eq!(v["cameraParameters"]["principalPointY"], 395.77349853515625);
        assert_eq!(v["imuToCamera"][1][0], -0.9998);
        assert_eq!(v["imuToCamera"][3][3], 1.0);
    }

    #[test]
    fn round_trips_through_config_file() {
        let mut cal = CameraCalibration::default();
        cal.camera_parameters.focal_length_x = 900.0;
        let json = serde_json::to_string_pretty(&cal).unwrap();
        assert_eq!(CameraCalibration::from_json(&json).unwrap(), cal);
    }

    #[test]
    fn rejects_bad_calibration() {
        let mut cal = CameraCalibration::default();
        cal.camera_parameters.focal_length_y = 0.0;
        assert!(matches!(CameraCalibration::from_json(&serde_json::to_string(&cal).unwrap()), Err(DatasetError::InvalidCalibration(_))));

        let mut cal = CameraCalibration::default();
        cal.imu_to_camera[3][0] = 0.5;
        assert!(CameraCalibration::from_json(&serde_json::to_string(&cal).unwrap()).is_err());
    }

    #[test]
    fn rejects_singular_extrinsics() {
        let mut cal = CameraCalibration::default();
        cal.imu_to_camera[2] = [0.0, 0.0, 0.0, 0.1];
        match cal.validate() {
            Err(DatasetError::InvalidCalibration(msg)) => assert!(msg.contains("singular")),
            other => panic!("expected an invalid calibration, got {other:?}"),
        }
        assert!(CameraCalibration::default().validate().is_ok());
    }

    #[test]
    fn matrix_is_row_major() {
        let m = CameraCalibration::default().imu_to_camera_matrix();
        assert_eq!(m[(0, 3)], 0.06522);
        assert_eq!(m[(2, 1)], 0.02571);
    }
}
