//! Spacetrack Report #3 verification vectors and end-to-end flows.

use approx::assert_relative_eq;
use chrono::{TimeZone, Utc};

use orbit_predict::constants::*;
use orbit_predict::sdp4::ResonanceKind;
use orbit_predict::time::{add_minutes, epoch_from_year_day};
use orbit_predict::{
    propagate_fleet, ElementSet, GeodeticCoordinates, GroundStation, InertialState,
    LookAngleOptions, PropagationError, Propagator, PropagatorKind, RawElements, Tle,
};

const LINE1_88888: &str = "1 88888U          80275.98708465  .00073094  13844-3  66816-4 0    87";
const LINE2_88888: &str = "2 88888  72.8435 115.9689 0086731  52.6988 110.5714 16.05824518  1058";
const LINE1_11801: &str = "1 11801U          80230.29629788  .01431103  00000-0  14311-1 0    13";
const LINE2_11801: &str = "2 11801  46.7916 230.4354 7318036  47.4722  10.4117  2.28537848    13";
// Molniya 2-14, from the Vallado et al. (2006) verification set
const LINE1_08195: &str = "1 08195U 75081A   06176.33215444  .00000099  00000-0  11873-3 0   813";
const LINE2_08195: &str = "2 08195  64.1586 279.0717 6877146 264.7651  20.2257  2.00491383225656";

fn propagator(line1: &str, line2: &str) -> Propagator {
    let tle = Tle::parse(line1, line2).unwrap();
    Propagator::new(tle.to_element_set().unwrap())
}

fn raw(year: i32, day: f64, elements: [f64; 7]) -> RawElements {
    let [inc, raan, ecc, argp, ma, n, bstar] = elements;
    RawElements {
        epoch: epoch_from_year_day(year, day).unwrap(),
        inclination_deg: inc,
        raan_deg: raan,
        eccentricity: ecc,
        arg_perigee_deg: argp,
        mean_anomaly_deg: ma,
        mean_motion_rev_day: n,
        bstar,
        mean_motion_dot: 0.0,
    }
}

fn assert_state(s: &InertialState, r: [f64; 3], v: [f64; 3], r_tol: f64, v_tol: f64) {
    for i in 0..3 {
        assert_relative_eq!(s.r[i], r[i], epsilon = r_tol);
        assert_relative_eq!(s.v[i], v[i], epsilon = v_tol);
    }
}

// ── SGP4: satellite 88888 ──

#[test]
fn test_88888_epoch_vector() {
    let p = propagator(LINE1_88888, LINE2_88888);
    assert_eq!(p.kind(), PropagatorKind::NearEarth);
    let s = p.propagate(0.0).unwrap();
    assert_state(
        &s,
        [2328.97, -5995.22, 1719.97],
        [2.91207, -0.98342, -7.09082],
        1e-2,
        1e-4,
    );
}

#[test]
fn test_88888_after_six_hours() {
    let s = propagator(LINE1_88888, LINE2_88888).propagate(360.0).unwrap();
    assert_state(
        &s,
        [2456.10705566, -6071.93853760, 1222.89727783],
        [2.67938992, -0.44829041, -7.22879231],
        1e-2,
        1e-5,
    );
}

// ── SDP4: satellite 11801 ──

#[test]
fn test_11801_epoch_vector() {
    let p = propagator(LINE1_11801, LINE2_11801);
    assert_eq!(p.kind(), PropagatorKind::DeepSpace);
    assert!(p.resonance().is_none());
    let s = p.propagate(0.0).unwrap();
    assert_state(
        &s,
        [7473.37066, 428.95261, 5828.74786],
        [5.10715413, 6.44468284, -0.18613096],
        1e-2,
        1e-5,
    );
}

#[test]
fn test_11801_after_six_hours() {
    let s = propagator(LINE1_11801, LINE2_11801).propagate(360.0).unwrap();
    assert_state(
        &s,
        [-3305.22537, 32410.86328, -24697.17675],
        [-1.30113538, -1.15131518, -0.28333528],
        1e-2,
        1e-5,
    );
}

// ── Resonant deep-space orbits ──

#[test]
fn test_08195_half_day_resonance() {
    let p = propagator(LINE1_08195, LINE2_08195);
    assert_eq!(p.kind(), PropagatorKind::DeepSpace);
    assert_eq!(p.resonance(), Some(ResonanceKind::HalfDay));

    let s = p.propagate(0.0).unwrap();
    assert_state(
        &s,
        [2349.89483350, -14785.93811562, 0.02119378],
        [2.721488096, -3.256811655, 4.498416672],
        2e-2,
        1e-5,
    );

    let s = p.propagate(120.0).unwrap();
    assert_state(
        &s,
        [15223.91713658, -17852.95881713, 25280.39558224],
        [1.079041732, 0.875187372, 2.485682813],
        2e-2,
        1e-5,
    );

    // Still inside the first 720-minute integrator step
    let s = p.propagate(240.0).unwrap();
    let expected = [19752.78050009, -8600.07130543, 37522.72921847];
    for i in 0..3 {
        assert_relative_eq!(s.r[i], expected[i], epsilon = 2e-2);
    }
}

#[test]
fn test_geostationary_synchronous_resonance_stays_on_station() {
    let geo = raw(2024, 100.5, [0.05, 80.0, 0.0002, 150.0, 200.0, 1.00271, 0.0]);
    let el = ElementSet::new(geo).unwrap();
    let p = Propagator::new(el);
    assert_eq!(p.resonance(), Some(ResonanceKind::Synchronous));

    for t in [-10_000.0, -1440.0, 0.0, 600.0, 610.0, 1440.0, 20_000.0] {
        let r = p.propagate(t).unwrap().r_mag();
        assert!(r > 42_140.0 && r < 42_190.0, "t={t} r={r}");
    }
}

// ── Properties ──

#[test]
fn test_selection_boundary() {
    assert_eq!(PropagatorKind::for_period(225.0), PropagatorKind::NearEarth);
    assert_eq!(PropagatorKind::for_period(225.0001), PropagatorKind::DeepSpace);
}

#[test]
fn test_radius_between_perigee_and_apogee() {
    let p = propagator(LINE1_11801, LINE2_11801);
    let el = *p.elements();
    for i in 0..=48 {
        let r = p.propagate(i as f64 * 30.0).unwrap().r_mag();
        assert!(r > el.perigee_radius_km() - 50.0, "t={} r={r}", i * 30);
        assert!(r < el.apogee_radius_km() + 50.0, "t={} r={r}", i * 30);
    }
}

#[test]
fn test_decay_scenario() {
    // Perigee about 500 km below the surface
    let el = ElementSet::new(raw(2024, 1.0, [51.6, 30.0, 0.1, 90.0, 0.0, 16.5, 1e-4])).unwrap();
    assert!(el.perigee_radius_km() < XKMPER);
    let p = Propagator::new(el);
    assert!(matches!(p.propagate(0.0), Err(PropagationError::Decayed { .. })));
}

#[test]
fn test_invalid_eccentricity_rejected() {
    let mut r = raw(2024, 1.0, [51.6, 30.0, 0.1, 90.0, 0.0, 15.5, 1e-4]);
    r.eccentricity = 1.2;
    assert!(ElementSet::new(r).is_err());
}

#[test]
fn test_geodetic_round_trip() {
    let t = Utc.with_ymd_and_hms(2025, 7, 4, 16, 20, 0).unwrap();
    for (lat, lon, alt_m) in [(37.77, -122.42, 16.0), (-77.85, 166.67, 24.0), (0.0, 180.0, 0.0)] {
        let site = GeodeticCoordinates::from_degrees(lat, lon, alt_m);
        let back = InertialState::from_geodetic(&site, t).to_geodetic();
        assert_relative_eq!(back.latitude, site.latitude, epsilon = 1e-6);
        assert_relative_eq!(back.altitude, site.altitude, epsilon = 1e-6);
        let dlon = (back.longitude - site.longitude).abs();
        assert!(dlon < 1e-6 || (TAU - dlon) < 1e-6, "dlon={dlon}");
    }
}

#[test]
fn test_subsatellite_track_stays_within_inclination() {
    let p = propagator(LINE1_88888, LINE2_88888);
    let inc_deg = p.elements().inclination() * RAD2DEG;
    for i in 0..=24 {
        let t = add_minutes(&p.elements().epoch(), i as f64 * 15.0).unwrap();
        let geo = p.geodetic_at(t).unwrap();
        assert!(geo.latitude_deg().abs() < inc_deg + 0.5, "{geo}");
        assert!(geo.altitude > 150.0 && geo.altitude < 450.0, "{geo}");
        assert!((0.0..TAU).contains(&geo.longitude));
    }
}

#[test]
fn test_look_angles_end_to_end() {
    let p = propagator(LINE1_88888, LINE2_88888);
    let plain = GroundStation::new(51.48, 0.0, 46.0);
    let refracted = plain.with_options(LookAngleOptions { refraction: true });
    let epoch = p.elements().epoch();

    let mut seen_above = false;
    for i in 0..(24 * 60) {
        let t = add_minutes(&epoch, i as f64).unwrap();
        let a = plain.look_angle_at(&p, t).unwrap();
        let b = refracted.look_angle_at(&p, t).unwrap();

        assert!((0.0..TAU).contains(&a.azimuth));
        assert!((-PI / 2.0..=PI / 2.0).contains(&a.elevation));
        assert!((-PI / 2.0..=PI / 2.0).contains(&b.elevation));
        // Meeus' fit dips slightly negative within ~0.1° of zenith
        assert!(b.elevation >= a.elevation - 1e-5);
        assert!(a.range_km > 0.0);
        // Relative speed of a LEO satellite never exceeds about 8 km/s
        assert!(a.range_rate_km_s.abs() < 8.5);
        seen_above |= a.is_visible();
    }
    assert!(seen_above);
}

#[test]
fn test_fleet_propagation() {
    let fleet = vec![
        (88888, propagator(LINE1_88888, LINE2_88888)),
        (11801, propagator(LINE1_11801, LINE2_11801)),
    ];
    let offsets = [0.0, 360.0];
    let results = propagate_fleet(&fleet, &offsets);
    assert_eq!(results.len(), 2);

    for ((id, states), (fid, prop)) in results.iter().zip(&fleet) {
        assert_eq!(id, fid);
        for (state, t) in states.iter().zip(offsets) {
            assert_eq!(state.as_ref().unwrap(), &prop.propagate(t).unwrap());
        }
    }
}
