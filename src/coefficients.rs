//! Time-invariant SGP4 perturbation coefficients.
//!
//! Everything here depends only on the element set, so it is computed once
//! per satellite and shared by every propagation call. The deep-space model
//! reuses the same drag and J2 secular terms and adds its lunar-solar terms
//! on top (see `sdp4`).
//!
//! Units: Earth radii and minutes.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::elements::ElementSet;

/// Below this eccentricity the `c3` and `xmcof` terms (which carry a 1/e)
/// are dropped; both are O(e) in the final position.
const MIN_ECC_FOR_C3: f64 = 1.0e-4;

/// Secular and drag coefficients derived from an [`ElementSet`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerturbationCoefficients {
    /// cos(i₀)
    pub cosio: f64,
    /// sin(i₀)
    pub sinio: f64,
    /// cos²(i₀)
    pub theta2: f64,
    /// 3cos²(i₀) - 1
    pub x3thm1: f64,
    /// 1 - cos²(i₀)
    pub x1mth2: f64,
    /// 7cos²(i₀) - 1
    pub x7thm1: f64,
    /// e₀²
    pub eosq: f64,
    /// 1 - e₀²
    pub betao2: f64,
    /// sqrt(1 - e₀²)
    pub betao: f64,
    /// Recovered semi-major axis (ER)
    pub aodp: f64,
    /// Recovered mean motion (rad/min)
    pub xnodp: f64,
    /// Perigee altitude (km)
    pub perigee_km: f64,
    /// Drag density parameter s (ER), possibly lowered for low perigees
    pub s4: f64,
    /// (q₀ - s)⁴ (ER⁴), possibly adjusted for low perigees
    pub qoms24: f64,
    pub tsi: f64,
    pub eta: f64,
    pub etasq: f64,
    pub eeta: f64,
    pub coef: f64,
    pub coef1: f64,
    pub c1: f64,
    pub c3: f64,
    pub c4: f64,
    pub c5: f64,
    /// Mean anomaly rate (rad/min)
    pub xmdot: f64,
    /// Argument of perigee rate (rad/min)
    pub omgdot: f64,
    /// Node rate (rad/min)
    pub xnodot: f64,
    pub xnodcf: f64,
    pub t2cof: f64,
    pub xlcof: f64,
    pub aycof: f64,
    pub omgcof: f64,
    pub xmcof: f64,
    pub delmo: f64,
    pub sinmo: f64,
    pub d2: f64,
    pub d3: f64,
    pub d4: f64,
    pub t3cof: f64,
    pub t4cof: f64,
    pub t5cof: f64,
    /// Perigee below 220 km: higher-order drag terms are not used.
    pub simplified: bool,
}

impl PerturbationCoefficients {
    /// Derive all coefficients. Pure arithmetic; orbital feasibility is
    /// checked later, at propagation time.
    pub fn new(el: &ElementSet) -> Self {
        let e0 = el.eccentricity();
        let bstar = el.bstar();

        let (sinio, cosio) = el.inclination().sin_cos();
        let theta2 = cosio * cosio;
        let x3thm1 = 3.0 * theta2 - 1.0;
        let x1mth2 = 1.0 - theta2;
        let x7thm1 = 7.0 * theta2 - 1.0;
        let eosq = e0 * e0;
        let betao2 = 1.0 - eosq;
        let betao = betao2.sqrt();

        let aodp = el.semi_major_axis();
        let xnodp = el.recovered_mean_motion();

        let perigee_km = XKMPER * (aodp * (1.0 - e0) - AE);
        let simplified = aodp * (1.0 - e0) / AE < SIMPLIFIED_PERIGEE_KM / XKMPER + AE;

        // Perigee below 156 km: lower s and rescale (q₀ - s)⁴.
        let (s4, qoms24) = if perigee_km < 156.0 {
            let s4_km = if perigee_km <= 98.0 { 20.0 } else { perigee_km - 78.0 };
            let qoms24 = ((120.0 - s4_km) * AE / XKMPER).powi(4);
            (s4_km / XKMPER + AE, qoms24)
        } else {
            (S, QOMS2T)
        };

        let pinvsq = 1.0 / (aodp * aodp * betao2 * betao2);
        let tsi = 1.0 / (aodp - s4);
        let eta = aodp * e0 * tsi;
        let etasq = eta * eta;
        let eeta = e0 * eta;
        let psisq = (1.0 - etasq).abs();
        let coef = qoms24 * tsi.powi(4);
        let coef1 = coef / psisq.powf(3.5);

        let c2 = coef1
            * xnodp
            * (aodp * (1.0 + 1.5 * etasq + eeta * (4.0 + etasq))
                + 0.75 * CK2 * tsi / psisq * x3thm1 * (8.0 + 3.0 * etasq * (8.0 + etasq)));
        let c1 = bstar * c2;

        let a3ovk2 = -XJ3 / CK2 * AE.powi(3);
        let c3 = if e0 > MIN_ECC_FOR_C3 {
            coef * tsi * a3ovk2 * xnodp * AE * sinio / e0
        } else {
            0.0
        };

        let c4 = 2.0
            * xnodp
            * coef1
            * aodp
            * betao2
            * (eta * (2.0 + 0.5 * etasq) + e0 * (0.5 + 2.0 * etasq)
                - 2.0 * CK2 * tsi / (aodp * psisq)
                    * (-3.0 * x3thm1 * (1.0 - 2.0 * eeta + etasq * (1.5 - 0.5 * eeta))
                        + 0.75
                            * x1mth2
                            * (2.0 * etasq - eeta * (1.0 + etasq))
                            * (2.0 * el.arg_perigee()).cos()));
        let c5 = 2.0 * coef1 * aodp * betao2 * (1.0 + 2.75 * (etasq + eeta) + eeta * etasq);

        let theta4 = theta2 * theta2;
        let temp1 = 3.0 * CK2 * pinvsq * xnodp;
        let temp2 = temp1 * CK2 * pinvsq;
        let temp3 = 1.25 * CK4 * pinvsq * pinvsq * xnodp;

        let xmdot = xnodp
            + 0.5 * temp1 * betao * x3thm1
            + 0.0625 * temp2 * betao * (13.0 - 78.0 * theta2 + 137.0 * theta4);
        let x1m5th = 1.0 - 5.0 * theta2;
        let omgdot = -0.5 * temp1 * x1m5th
            + 0.0625 * temp2 * (7.0 - 114.0 * theta2 + 395.0 * theta4)
            + temp3 * (3.0 - 36.0 * theta2 + 49.0 * theta4);
        let xhdot1 = -temp1 * cosio;
        let xnodot = xhdot1
            + (0.5 * temp2 * (4.0 - 19.0 * theta2) + 2.0 * temp3 * (3.0 - 7.0 * theta2)) * cosio;

        let omgcof = bstar * c3 * el.arg_perigee().cos();
        let xmcof = if e0 > MIN_ECC_FOR_C3 {
            -(2.0 / 3.0) * coef * bstar * AE / eeta
        } else {
            0.0
        };
        let xnodcf = 3.5 * betao2 * xhdot1 * c1;
        let t2cof = 1.5 * c1;
        // Guard the 1/(1 + cos i) singularity for retrograde equatorial orbits.
        let one_plus_cos = if (1.0 + cosio).abs() > 1.5e-12 { 1.0 + cosio } else { 1.5e-12 };
        let xlcof = 0.125 * a3ovk2 * sinio * (3.0 + 5.0 * cosio) / one_plus_cos;
        let aycof = 0.25 * a3ovk2 * sinio;
        let delmo = (1.0 + eta * el.mean_anomaly().cos()).powi(3);
        let sinmo = el.mean_anomaly().sin();

        let (d2, d3, d4, t3cof, t4cof, t5cof) = if simplified {
            (0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
        } else {
            let c1sq = c1 * c1;
            let d2 = 4.0 * aodp * tsi * c1sq;
            let temp = d2 * tsi * c1 / 3.0;
            let d3 = (17.0 * aodp + s4) * temp;
            let d4 = 0.5 * temp * aodp * tsi * (221.0 * aodp + 31.0 * s4) * c1;
            let t3cof = d2 + 2.0 * c1sq;
            let t4cof = 0.25 * (3.0 * d3 + c1 * (12.0 * d2 + 10.0 * c1sq));
            let t5cof =
                0.2 * (3.0 * d4 + 12.0 * c1 * d3 + 6.0 * d2 * d2 + 15.0 * c1sq * (2.0 * d2 + c1sq));
            (d2, d3, d4, t3cof, t4cof, t5cof)
        };

        log::debug!(
            "Derived coefficients: perigee {:.1} km, c1 {:.3e}, simplified {}",
            perigee_km,
            c1,
            simplified
        );

        PerturbationCoefficients {
            cosio,
            sinio,
            theta2,
            x3thm1,
            x1mth2,
            x7thm1,
            eosq,
            betao2,
            betao,
            aodp,
            xnodp,
            perigee_km,
            s4,
            qoms24,
            tsi,
            eta,
            etasq,
            eeta,
            coef,
            coef1,
            c1,
            c3,
            c4,
            c5,
            xmdot,
            omgdot,
            xnodot,
            xnodcf,
            t2cof,
            xlcof,
            aycof,
            omgcof,
            xmcof,
            delmo,
            sinmo,
            d2,
            d3,
            d4,
            t3cof,
            t4cof,
            t5cof,
            simplified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::tests::raw_88888;
    use crate::elements::RawElements;
    use approx::assert_relative_eq;

    fn coefficients(raw: RawElements) -> PerturbationCoefficients {
        PerturbationCoefficients::new(&ElementSet::new(raw).unwrap())
    }

    #[test]
    fn test_88888_perigee_is_simplified() {
        // ~198 km perigee: truncated drag, but standard density constants
        let c = coefficients(raw_88888());
        assert!(c.simplified);
        assert!(c.perigee_km > 156.0 && c.perigee_km < 220.0, "perigee={}", c.perigee_km);
        assert_eq!(c.s4, S);
        assert_eq!(c.qoms24, QOMS2T);
        assert_eq!(c.d2, 0.0);
        assert_eq!(c.t3cof, 0.0);
    }

    #[test]
    fn test_higher_orbit_keeps_drag_polynomial() {
        let mut raw = raw_88888();
        raw.mean_motion_rev_day = 15.5;
        let c = coefficients(raw);
        assert!(!c.simplified);
        assert!(c.perigee_km > 220.0, "perigee={}", c.perigee_km);
        assert!(c.d2 > 0.0);
        assert_relative_eq!(c.t3cof, c.d2 + 2.0 * c.c1 * c.c1, epsilon = 1e-20);
    }

    #[test]
    fn test_secular_rates_signs() {
        // 72.8° prograde orbit: node regresses, mean anomaly advances at ~n.
        let c = coefficients(raw_88888());
        assert!(c.xnodot < 0.0);
        assert_relative_eq!(c.xmdot, c.xnodp, max_relative = 1e-2);
        assert_relative_eq!(c.t2cof, 1.5 * c.c1, epsilon = 1e-18);
        assert_relative_eq!(c.x3thm1, 3.0 * c.theta2 - 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_low_perigee_adjusts_drag_constants() {
        // ~16.6 rev/day circular orbit: perigee around 130 km
        let mut raw = raw_88888();
        raw.eccentricity = 0.0005;
        raw.mean_motion_rev_day = 16.6;
        let c = coefficients(raw);
        assert!(c.perigee_km < 156.0 && c.perigee_km > 98.0, "perigee={}", c.perigee_km);
        assert!(c.simplified);
        assert_relative_eq!(c.s4, (c.perigee_km - 78.0) / XKMPER + AE, epsilon = 1e-12);
        assert!(c.qoms24 > QOMS2T);
        assert_eq!(c.d2, 0.0);
        assert_eq!(c.t5cof, 0.0);
    }

    #[test]
    fn test_very_low_perigee_clamps_s4() {
        let mut raw = raw_88888();
        raw.eccentricity = 0.0;
        raw.mean_motion_rev_day = 16.9;
        let c = coefficients(raw);
        assert!(c.perigee_km <= 98.0, "perigee={}", c.perigee_km);
        assert_relative_eq!(c.s4, 20.0 / XKMPER + AE, epsilon = 1e-12);
        assert_eq!(c.c3, 0.0);
        assert_eq!(c.xmcof, 0.0);
    }
}
