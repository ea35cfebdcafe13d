//! SGP4 near-earth secular update (orbital period ≤ 225 minutes).
//!
//! Advances the mean elements for secular gravity and atmospheric drag.
//! The Kepler solve and short-period corrections are shared with the
//! deep-space model and live in [`crate::propagator`].

use serde::{Deserialize, Serialize};

use crate::coefficients::PerturbationCoefficients;
use crate::constants::XKE;
use crate::elements::ElementSet;
use crate::propagator::PerturbedElements;

/// Near-earth propagator: an element set plus its derived coefficients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NearEarthPropagator {
    elements: ElementSet,
    coefficients: PerturbationCoefficients,
}

impl NearEarthPropagator {
    pub fn new(elements: ElementSet) -> Self {
        let coefficients = PerturbationCoefficients::new(&elements);
        NearEarthPropagator {
            elements,
            coefficients,
        }
    }

    pub fn elements(&self) -> &ElementSet {
        &self.elements
    }

    pub fn coefficients(&self) -> &PerturbationCoefficients {
        &self.coefficients
    }

    /// Mean elements at `tsince` minutes from epoch, after secular gravity
    /// and drag.
    ///
    /// In simplified mode (perigee below 220 km) the drag polynomial is
    /// truncated after the `c1` terms and the `c3`/`c5` periodic corrections
    /// are left out.
    pub fn secular_update(&self, tsince: f64) -> PerturbedElements {
        let el = &self.elements;
        let c = &self.coefficients;
        let bstar = el.bstar();

        let xmdf = el.mean_anomaly() + c.xmdot * tsince;
        let omgadf = el.arg_perigee() + c.omgdot * tsince;
        let xnoddf = el.raan() + c.xnodot * tsince;
        let tsq = tsince * tsince;
        let xnode = xnoddf + c.xnodcf * tsq;

        let mut omega = omgadf;
        let mut xmp = xmdf;
        let mut tempa = 1.0 - c.c1 * tsince;
        let mut tempe = bstar * c.c4 * tsince;
        let mut templ = c.t2cof * tsq;

        if !c.simplified {
            let delomg = c.omgcof * tsince;
            let delm = c.xmcof * ((1.0 + c.eta * xmdf.cos()).powi(3) - c.delmo);
            let temp = delomg + delm;
            xmp = xmdf + temp;
            omega = omgadf - temp;

            let tcube = tsq * tsince;
            let tfour = tsince * tcube;
            tempa -= c.d2 * tsq + c.d3 * tcube + c.d4 * tfour;
            tempe += bstar * c.c5 * (xmp.sin() - c.sinmo);
            templ += c.t3cof * tcube + tfour * (c.t4cof + tsince * c.t5cof);
        }

        let a = c.aodp * tempa * tempa;

        PerturbedElements {
            inclination: el.inclination(),
            arg_perigee: omega,
            eccentricity: el.eccentricity() - tempe,
            semi_major_axis: a,
            mean_longitude: xmp + omega + xnode + c.xnodp * templ,
            raan: xnode,
            mean_motion: XKE / a.powf(1.5),
        }
    }
}
