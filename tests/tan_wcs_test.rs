//! End-to-end TAN WCS fits against a simulated camera: the fitted linear model
//! must reproduce the camera's undistorted astrometry across the whole detector.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use tanwcs::native::angular_separation;
use tanwcs::{
    fit_cd_matrix, fit_tan_wcs, fit_tan_wcs_with_distortion, Astrometry, Detector,
    DetectorPlacement, HeaderValue, ObservationMetadata, PixelSample, Pointing,
    RadialDistortion, SimulatedCamera, TanFitConfig, WcsError,
};

const EPOCH: f64 = 2000.0;
/// Required agreement between the fitted WCS and the camera, arcsec.
const TOLERANCE_ARCSEC: f64 = 0.001;

fn arcsec(rad: f64) -> f64 {
    rad.to_degrees() * 3600.0
}

/// A 4k × 4k CCD off-axis in a wide-field camera with mild barrel distortion.
fn setup(
    obs_ra: f64,
    obs_dec: f64,
    rot_sky: f64,
) -> (SimulatedCamera, Detector, ObservationMetadata) {
    let detector = Detector::new("R:2,2 S:1,1", 4000, 4072);
    let camera = SimulatedCamera::new(10_310.0)
        .with_detector(
            detector.name.clone(),
            DetectorPlacement::centered([42.3, -17.8], 0.01, detector.width, detector.height),
        )
        .with_distortion(RadialDistortion::new(-2.5e-6, 1.0e-10))
        .with_parity_flip(true)
        .with_refraction_offset(3.0e-5, -1.2e-4);
    let obs = ObservationMetadata {
        ra_deg: obs_ra,
        dec_deg: obs_dec,
        rot_sky_pos_deg: rot_sky,
        mjd: 49250.0,
    };
    (camera, detector, obs)
}

/// 9 × 9 pixels spanning the full 4000 × 4072 detector, edges included.
fn dense_grid() -> Vec<(f64, f64)> {
    let mut pixels = Vec::new();
    for x in (0..=4000).step_by(500) {
        for y in (0..=4072).step_by(509) {
            pixels.push((x as f64, y as f64));
        }
    }
    pixels
}

#[test]
fn test_fit_matches_camera_on_dense_grid() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    for &(ra, dec, rot) in &[
        (25.0, -10.0, 0.0),
        (145.0, -35.0, 37.0),
        (359.99, 1.0, -120.0),
        (210.0, 88.5, 271.5),
    ] {
        let (camera, detector, obs) = setup(ra, dec, rot);
        let wcs = fit_tan_wcs(&detector, &camera, &obs, EPOCH, &TanFitConfig::default())
            .expect("fit should succeed");

        let pixels = dense_grid();
        assert_eq!(pixels.last(), Some(&(4000.0, 4072.0)));
        let truth = camera
            .pixel_to_sky(&pixels, &detector, &obs, EPOCH, false)
            .unwrap();

        let mut worst: f64 = 0.0;
        for (&(x, y), &(ra_t, dec_t)) in pixels.iter().zip(&truth) {
            let (ra_w, dec_w) = wcs.pixel_to_sky(x, y).unwrap();
            let sep = arcsec(angular_separation(
                ra_w.to_radians(),
                dec_w.to_radians(),
                ra_t,
                dec_t,
            ));
            worst = worst.max(sep);
        }
        println!(
            "pointing ({}, {}) rot {}: scale {:.4}\"/px, worst {:.2e}\"",
            ra,
            dec,
            rot,
            wcs.pixel_scale_arcsec(),
            worst
        );
        assert!(
            worst < TOLERANCE_ARCSEC,
            "pointing ({}, {}) rot {}: worst separation {}\"",
            ra,
            dec,
            rot,
            worst
        );
    }
}

#[test]
fn test_crval_is_refracted_pointing() {
    let (camera, detector, obs) = setup(145.0, -35.0, 37.0);
    let wcs = fit_tan_wcs(&detector, &camera, &obs, EPOCH, &TanFitConfig::default()).unwrap();

    let (ra_obs, dec_obs) = camera
        .observed_from_icrs(obs.ra_rad(), obs.dec_rad(), &obs, EPOCH)
        .unwrap();
    assert!((wcs.crval_deg[0] - ra_obs.to_degrees()).abs() < 1e-12);
    assert!((wcs.crval_deg[1] - dec_obs.to_degrees()).abs() < 1e-12);
    assert_eq!(wcs.equinox, EPOCH);

    // CRPIX sits where the camera puts the refracted pointing
    let crpix = camera
        .sky_to_pixel(&[(ra_obs, dec_obs)], &detector, &obs, EPOCH, false)
        .unwrap();
    assert!((wcs.crpix[0] - crpix[0].0).abs() < 1e-9);
    assert!((wcs.crpix[1] - crpix[0].1).abs() < 1e-9);
}

#[test]
fn test_parity_flip_changes_cd_sign() {
    let (camera, detector, obs) = setup(25.0, -10.0, 0.0);
    let flipped = fit_tan_wcs(&detector, &camera, &obs, EPOCH, &TanFitConfig::default()).unwrap();
    let camera = camera.with_parity_flip(false);
    let direct = fit_tan_wcs(&detector, &camera, &obs, EPOCH, &TanFitConfig::default()).unwrap();

    assert!(flipped.cd_determinant() < 0.0);
    assert!(direct.cd_determinant() > 0.0);
    assert!((flipped.pixel_scale_arcsec() - direct.pixel_scale_arcsec()).abs() < 1e-9);
}

/// The camera's undistorted sky is an exact TAN, so the grid spacing cannot move the fit.
#[test]
fn test_grid_spacing_irrelevant_for_exact_tan_camera() {
    let (camera, detector, obs) = setup(145.0, -35.0, 37.0);
    let coarse = fit_tan_wcs(&detector, &camera, &obs, EPOCH, &TanFitConfig::default()).unwrap();
    let fine_config = TanFitConfig {
        grid_step_fraction: 0.1,
        ..Default::default()
    };
    let fine = fit_tan_wcs(&detector, &camera, &obs, EPOCH, &fine_config).unwrap();

    assert_eq!(coarse.crpix, fine.crpix);
    assert_eq!(coarse.crval_deg, fine.crval_deg);
    let scale = coarse.cd_determinant().abs().sqrt();
    for r in 0..2 {
        for c in 0..2 {
            assert!((coarse.cd_matrix[r][c] - fine.cd_matrix[r][c]).abs() < 1e-9 * scale);
        }
    }
}

#[test]
fn test_distorted_wcs_matches_camera_on_raw_pixels() {
    let (camera, detector, obs) = setup(145.0, -35.0, 37.0);
    let distorted =
        fit_tan_wcs_with_distortion(&detector, &camera, &obs, EPOCH, &TanFitConfig::default())
            .unwrap();
    assert_eq!((distorted.width, distorted.height), (4000, 4072));

    let mut rng = StdRng::seed_from_u64(42);
    let pixels: Vec<(f64, f64)> = (0..200)
        .map(|_| (rng.random::<f64>() * 4000.0, rng.random::<f64>() * 4072.0))
        .collect();
    let truth = camera
        .pixel_to_sky(&pixels, &detector, &obs, EPOCH, true)
        .unwrap();

    for (&(x, y), &(ra_t, dec_t)) in pixels.iter().zip(&truth) {
        let (ra, dec) = distorted.pixel_to_sky(x, y).unwrap();
        let sep = arcsec(angular_separation(ra.to_radians(), dec.to_radians(), ra_t, dec_t));
        assert!(sep < TOLERANCE_ARCSEC, "({}, {}): {}\"", x, y, sep);

        let (x2, y2) = distorted.sky_to_pixel(ra, dec).unwrap();
        assert!((x2 - x).abs() < 1e-6 && (y2 - y).abs() < 1e-6);
    }

    // The distortion is not negligible: the linear model alone is off at the corners
    let (ra_lin, dec_lin) = distorted.seed.pixel_to_sky(0.0, 0.0).unwrap();
    let (ra_d, dec_d) = distorted.pixel_to_sky(0.0, 0.0).unwrap();
    let sep = arcsec(angular_separation(
        ra_lin.to_radians(),
        dec_lin.to_radians(),
        ra_d.to_radians(),
        dec_d.to_radians(),
    ));
    assert!(sep > 1.0, "distortion only {}\"", sep);
}

#[test]
fn test_header_output() {
    let (camera, detector, obs) = setup(25.0, -10.0, 0.0);
    let wcs = fit_tan_wcs(&detector, &camera, &obs, EPOCH, &TanFitConfig::default()).unwrap();

    let cards = wcs.header_cards();
    assert_eq!(cards.len(), 12);
    let lookup = |key: &str| {
        cards
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap()
    };
    assert_eq!(lookup("RADECSYS"), HeaderValue::Text("ICRS"));
    assert_eq!(lookup("CTYPE1"), HeaderValue::Text("RA---TAN"));
    assert_eq!(lookup("CTYPE2"), HeaderValue::Text("DEC--TAN"));
    assert_eq!(lookup("EQUINOX"), HeaderValue::Real(EPOCH));
    assert_eq!(lookup("CRPIX1"), HeaderValue::Real(wcs.crpix[0]));
    assert_eq!(lookup("CRVAL2"), HeaderValue::Real(wcs.crval_deg[1]));
    assert_eq!(lookup("CD2_1"), HeaderValue::Real(wcs.cd_matrix[1][0]));
}

#[test]
fn test_degenerate_samples_are_rejected() {
    let pointing = Pointing::from_degrees(145.0, -35.0).unwrap();
    // Every sample on the reference column: dx = 0 throughout
    let samples: Vec<PixelSample> = (0..5)
        .map(|k| PixelSample {
            x: 100.0,
            y: 500.0 * k as f64,
            ra: 145.0_f64.to_radians(),
            dec: (-35.0 + 0.01 * k as f64).to_radians(),
        })
        .collect();
    let err = fit_cd_matrix(&samples, [100.0, 0.0], &pointing, &TanFitConfig::default())
        .unwrap_err();
    assert!(matches!(err, WcsError::SingularFit { .. }), "{:?}", err);
}

#[test]
fn test_invalid_config_is_rejected_before_camera_calls() {
    let (camera, _, obs) = setup(25.0, -10.0, 0.0);
    let unknown = Detector::new("R:9,9 S:9,9", 4000, 4072);
    for fraction in [2.0, 1e-10] {
        let config = TanFitConfig {
            grid_step_fraction: fraction,
            ..Default::default()
        };
        let err = fit_tan_wcs(&unknown, &camera, &obs, EPOCH, &config).unwrap_err();
        assert!(matches!(err, WcsError::InvalidConfig(_)), "{}: {:?}", fraction, err);
    }
}
