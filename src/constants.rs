//! Physical and model constants for the SGP4/SDP4 theory.
//!
//! NORAD mean elements are fitted against WGS '72, so every value here
//! is the WGS '72 one (not WGS84). Distances inside the propagators are
//! in Earth radii (`AE`) and time in minutes.

/// Pi
pub const PI: f64 = std::f64::consts::PI;

/// Two pi
pub const TAU: f64 = std::f64::consts::TAU;

/// Degrees to radians
pub const DEG2RAD: f64 = PI / 180.0;

/// Radians to degrees
pub const RAD2DEG: f64 = 180.0 / PI;

/// Distance unit of the propagators (Earth radii)
pub const AE: f64 = 1.0;

/// Earth equatorial radius (km) — WGS '72
pub const XKMPER: f64 = 6378.135;

/// Earth flattening — WGS '72
pub const FLATTENING: f64 = 1.0 / 298.26;

/// Square of the first eccentricity of the reference ellipsoid, f(2 - f)
pub const E2: f64 = FLATTENING * (2.0 - FLATTENING);

/// Earth gravitational parameter (km³/s²) — WGS '72
pub const GE: f64 = 398600.8;

/// J2 zonal harmonic — WGS '72
pub const J2: f64 = 1.0826158e-3;

/// J3 zonal harmonic — WGS '72
pub const J3: f64 = -2.53881e-6;

/// J4 zonal harmonic — WGS '72
pub const J4: f64 = -1.65597e-6;

/// ½ J2 AE²
pub const CK2: f64 = J2 / 2.0;

/// -⅜ J4 AE⁴
pub const CK4: f64 = -3.0 * J4 / 8.0;

/// J3 as used by the long-period terms
pub const XJ3: f64 = J3;

/// sqrt(GE) in ER^(3/2)/min, i.e. sqrt(3600 GE / XKMPER³)
pub const XKE: f64 = 0.07436691613317341;

/// Upper bound of the drag density function (ER)
pub const QO: f64 = AE + 120.0 / XKMPER;

/// Density function parameter s (ER)
pub const S: f64 = AE + 78.0 / XKMPER;

/// (QO - S)⁴ (ER⁴)
pub const QOMS2T: f64 = (QO - S) * (QO - S) * (QO - S) * (QO - S);

/// Minutes per solar day
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Seconds per solar day
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Earth rotations per sidereal day
pub const OMEGA_E: f64 = 1.00273790934;

/// Earth rotation rate (rad/s)
pub const EARTH_ROTATION_RAD_S: f64 = TAU * OMEGA_E / SECONDS_PER_DAY;

/// ER → km
pub const KM_PER_ER: f64 = XKMPER / AE;

/// ER/min → km/s
pub const KMS_PER_ER_MIN: f64 = KM_PER_ER * MINUTES_PER_DAY / SECONDS_PER_DAY;

/// Orbital period (minutes) above which the deep-space model is used.
pub const DEEP_SPACE_PERIOD_MIN: f64 = 225.0;

/// Perigee altitude (km) below which the drag equations are truncated.
pub const SIMPLIFIED_PERIGEE_KM: f64 = 220.0;

/// Kepler iteration tolerance (rad)
pub const KEPLER_TOLERANCE: f64 = 1.0e-6;

/// Kepler iteration cap
pub const KEPLER_MAX_ITER: usize = 10;

/// Geodetic latitude refinement tolerance (rad)
pub const GEODETIC_TOLERANCE: f64 = 1.0e-7;

/// Geodetic latitude refinement cap
pub const GEODETIC_MAX_ITER: usize = 10;

/// Normalize angle to [0, 2π).
pub fn fmod2p(angle: f64) -> f64 {
    let a = angle % TAU;
    let a = if a < 0.0 { a + TAU } else { a };
    // -1e-17 + TAU rounds up to TAU
    if a >= TAU { 0.0 } else { a }
}
