//! SDP4 deep-space secular and periodic update (orbital period > 225 minutes).
//!
//! On top of the SGP4 secular terms this adds:
//! - lunar and solar secular drift of e, i, Ω, ω and M
//! - lunar and solar long-period periodics (Lyddane form below 0.2 rad)
//! - geopotential resonance for 12-hour (e ≥ 0.5) and 24-hour orbits,
//!   integrated numerically in 720-minute steps
//!
//! The resonance integrator always starts again from epoch, so
//! [`DeepSpacePropagator::secular_update`] is a pure function of `tsince`.

use serde::{Deserialize, Serialize};

use crate::coefficients::PerturbationCoefficients;
use crate::constants::*;
use crate::elements::ElementSet;
use crate::propagator::PerturbedElements;
use crate::time::days_since_1950;

// ── Lunar-solar constants ──

const ZNS: f64 = 1.19459e-5;
const C1SS: f64 = 2.9864797e-6;
const ZES: f64 = 0.01675;
const ZNL: f64 = 1.5835218e-4;
const C1L: f64 = 4.7968065e-7;
const ZEL: f64 = 0.05490;
const ZCOSIS: f64 = 0.91744867;
const ZSINIS: f64 = 0.39785416;
const ZSINGS: f64 = -0.98088458;
const ZCOSGS: f64 = 0.1945905;

// ── Resonance constants ──

const Q22: f64 = 1.7891679e-6;
const Q31: f64 = 2.1460748e-6;
const Q33: f64 = 2.2123015e-7;
const G22: f64 = 5.7686396;
const G32: f64 = 0.95240898;
const G44: f64 = 1.8014998;
const G52: f64 = 1.0508330;
const G54: f64 = 4.4108898;
const ROOT22: f64 = 1.7891679e-6;
const ROOT32: f64 = 3.7393792e-7;
const ROOT44: f64 = 7.3636953e-9;
const ROOT52: f64 = 1.1428639e-7;
const ROOT54: f64 = 2.1765803e-9;
const FASX2: f64 = 0.13130908;
const FASX4: f64 = 2.8843198;
const FASX6: f64 = 0.37448087;

/// Earth rotation rate relative to the mean equinox (rad/min)
const THDT: f64 = 4.3752691e-3;

/// Resonance integrator step (minutes)
const STEP: f64 = 720.0;
const STEP2: f64 = STEP * STEP / 2.0;

/// Below this inclination (rad) the periodics are applied in Lyddane form.
const LYDDANE_INCLINATION: f64 = 0.2;

/// Below this inclination (rad) the node terms are dropped.
const NODE_TERM_INCLINATION: f64 = 5.2359877e-2;

/// Orbital geometry of the Sun or Moon as seen by the satellite's mean orbit.
struct Perturber {
    zcosg: f64,
    zsing: f64,
    zcosi: f64,
    zsini: f64,
    zcosh: f64,
    zsinh: f64,
    cc: f64,
    zn: f64,
    ze: f64,
}

/// Secular rates (rad/min or 1/min) from one or both perturbers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct SecularRates {
    sse: f64,
    ssi: f64,
    ssl: f64,
    ssh: f64,
    ssg: f64,
}

/// Long-period periodic amplitudes of one perturber.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct PeriodicTerms {
    e2: f64,
    e3: f64,
    i2: f64,
    i3: f64,
    l2: f64,
    l3: f64,
    l4: f64,
    gh2: f64,
    gh3: f64,
    gh4: f64,
    h2: f64,
    h3: f64,
    /// Mean anomaly of the perturber at epoch
    zm0: f64,
    zn: f64,
    ze: f64,
}

/// Periodic offsets at one instant.
#[derive(Debug, Clone, Copy, Default)]
struct PeriodicOffsets {
    e: f64,
    i: f64,
    l: f64,
    gh: f64,
    h: f64,
}

impl PeriodicTerms {
    fn at(&self, t: f64) -> PeriodicOffsets {
        let zm = self.zm0 + self.zn * t;
        let zf = zm + 2.0 * self.ze * zm.sin();
        let sinzf = zf.sin();
        let f2 = 0.5 * sinzf * sinzf - 0.25;
        let f3 = -0.5 * sinzf * zf.cos();
        PeriodicOffsets {
            e: self.e2 * f2 + self.e3 * f3,
            i: self.i2 * f2 + self.i3 * f3,
            l: self.l2 * f2 + self.l3 * f3 + self.l4 * sinzf,
            gh: self.gh2 * f2 + self.gh3 * f3 + self.gh4 * sinzf,
            h: self.h2 * f2 + self.h3 * f3,
        }
    }
}

/// Which geopotential resonance, if any, the orbit is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResonanceKind {
    /// Geosynchronous (about one revolution per day)
    Synchronous,
    /// 12-hour, eccentric (Molniya-type)
    HalfDay,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum ResonanceTerms {
    Synchronous {
        del1: f64,
        del2: f64,
        del3: f64,
    },
    HalfDay {
        d2201: f64,
        d2211: f64,
        d3210: f64,
        d3222: f64,
        d4410: f64,
        d4422: f64,
        d5220: f64,
        d5232: f64,
        d5421: f64,
        d5433: f64,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Resonance {
    terms: ResonanceTerms,
    /// Resonant longitude at epoch
    xlamo: f64,
    xfact: f64,
    /// Mean motion at epoch (rad/min)
    xnq: f64,
    /// Argument of perigee at epoch
    omegaq: f64,
    omgdot: f64,
}

impl Resonance {
    fn kind(&self) -> ResonanceKind {
        match self.terms {
            ResonanceTerms::Synchronous { .. } => ResonanceKind::Synchronous,
            ResonanceTerms::HalfDay { .. } => ResonanceKind::HalfDay,
        }
    }

    /// First and second derivatives of mean motion at (`xli`, `atime`).
    fn dot_terms(&self, xli: f64, atime: f64) -> (f64, f64) {
        match self.terms {
            ResonanceTerms::Synchronous { del1, del2, del3 } => {
                let xndot = del1 * (xli - FASX2).sin()
                    + del2 * (2.0 * (xli - FASX4)).sin()
                    + del3 * (3.0 * (xli - FASX6)).sin();
                let xnddt = del1 * (xli - FASX2).cos()
                    + 2.0 * del2 * (2.0 * (xli - FASX4)).cos()
                    + 3.0 * del3 * (3.0 * (xli - FASX6)).cos();
                (xndot, xnddt)
            }
            ResonanceTerms::HalfDay {
                d2201,
                d2211,
                d3210,
                d3222,
                d4410,
                d4422,
                d5220,
                d5232,
                d5421,
                d5433,
            } => {
                let xomi = self.omegaq + self.omgdot * atime;
                let x2omi = xomi + xomi;
                let x2li = xli + xli;
                let xndot = d2201 * (x2omi + xli - G22).sin()
                    + d2211 * (xli - G22).sin()
                    + d3210 * (xomi + xli - G32).sin()
                    + d3222 * (-xomi + xli - G32).sin()
                    + d4410 * (x2omi + x2li - G44).sin()
                    + d4422 * (x2li - G44).sin()
                    + d5220 * (xomi + xli - G52).sin()
                    + d5232 * (-xomi + xli - G52).sin()
                    + d5421 * (xomi + x2li - G54).sin()
                    + d5433 * (-xomi + x2li - G54).sin();
                let xnddt = d2201 * (x2omi + xli - G22).cos()
                    + d2211 * (xli - G22).cos()
                    + d3210 * (xomi + xli - G32).cos()
                    + d3222 * (-xomi + xli - G32).cos()
                    + d5220 * (xomi + xli - G52).cos()
                    + d5232 * (-xomi + xli - G52).cos()
                    + 2.0
                        * (d4410 * (x2omi + x2li - G44).cos()
                            + d4422 * (x2li - G44).cos()
                            + d5421 * (xomi + x2li - G54).cos()
                            + d5433 * (-xomi + x2li - G54).cos());
                (xndot, xnddt)
            }
        }
    }

    /// Integrate from epoch to `t`; returns (mean motion, resonant longitude).
    fn integrate(&self, t: f64) -> (f64, f64) {
        if !t.is_finite() {
            return (f64::NAN, f64::NAN);
        }
        let delt = if t >= 0.0 { STEP } else { -STEP };
        let mut atime = 0.0;
        let mut xli = self.xlamo;
        let mut xni = self.xnq;

        loop {
            let (xndot, xnddt) = self.dot_terms(xli, atime);
            let xldot = xni + self.xfact;
            let xnddt = xnddt * xldot;

            if (t - atime).abs() >= STEP {
                xli += xldot * delt + xndot * STEP2;
                xni += xndot * delt + xnddt * STEP2;
                atime += delt;
            } else {
                let ft = t - atime;
                let xn = xni + xndot * ft + xnddt * ft * ft * 0.5;
                let xl = xli + xldot * ft + xndot * ft * ft * 0.5;
                return (xn, xl);
            }
        }
    }
}

/// Deep-space propagator: SGP4 coefficients plus lunar-solar and resonance terms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeepSpacePropagator {
    elements: ElementSet,
    coefficients: PerturbationCoefficients,
    /// Greenwich sidereal angle at epoch (rad)
    thgr: f64,
    secular: SecularRates,
    solar: PeriodicTerms,
    lunar: PeriodicTerms,
    resonance: Option<Resonance>,
}

impl DeepSpacePropagator {
    pub fn new(elements: ElementSet) -> Self {
        let c = PerturbationCoefficients::new(&elements);
        let ds50 = days_since_1950(&elements.epoch());
        let thgr = fmod2p(1.72944494 + 6.3003880987 * ds50);

        let (sinq, cosq) = elements.raan().sin_cos();
        let (solar_body, lunar_body, zmos, zmol) = perturbers(ds50, sinq, cosq);

        let (solar_rates, mut solar) = lunar_solar_terms(&elements, &c, &solar_body);
        let (lunar_rates, mut lunar) = lunar_solar_terms(&elements, &c, &lunar_body);
        solar.zm0 = zmos;
        lunar.zm0 = zmol;

        let secular = SecularRates {
            sse: solar_rates.sse + lunar_rates.sse,
            ssi: solar_rates.ssi + lunar_rates.ssi,
            ssl: solar_rates.ssl + lunar_rates.ssl,
            ssh: solar_rates.ssh + lunar_rates.ssh,
            ssg: solar_rates.ssg + lunar_rates.ssg,
        };

        let resonance = resonance_terms(&elements, &c, &secular, thgr);

        log::debug!(
            "Deep-space init: thgr {:.6} rad, resonance {:?}",
            thgr,
            resonance.as_ref().map(Resonance::kind)
        );

        DeepSpacePropagator {
            elements,
            coefficients: c,
            thgr,
            secular,
            solar,
            lunar,
            resonance,
        }
    }

    pub fn elements(&self) -> &ElementSet {
        &self.elements
    }

    pub fn coefficients(&self) -> &PerturbationCoefficients {
        &self.coefficients
    }

    /// Resonance regime chosen at construction.
    pub fn resonance(&self) -> Option<ResonanceKind> {
        self.resonance.as_ref().map(Resonance::kind)
    }

    /// Mean elements at `tsince` minutes from epoch after secular gravity,
    /// drag, lunar-solar secular and periodic terms and resonance.
    pub fn secular_update(&self, tsince: f64) -> PerturbedElements {
        let el = &self.elements;
        let c = &self.coefficients;
        let s = &self.secular;
        let t = tsince;

        let xmdf = el.mean_anomaly() + c.xmdot * t;
        let mut omgadf = el.arg_perigee() + c.omgdot * t;
        let xnoddf = el.raan() + c.xnodot * t;
        let tsq = t * t;
        let mut xnode = xnoddf + c.xnodcf * tsq;
        let tempa = 1.0 - c.c1 * t;
        let tempe = el.bstar() * c.c4 * t;
        let templ = c.t2cof * tsq;

        // Lunar-solar secular
        let mut xll = xmdf + s.ssl * t;
        omgadf += s.ssg * t;
        xnode += s.ssh * t;
        let mut em = el.eccentricity() + s.sse * t;
        let mut xinc = el.inclination() + s.ssi * t;
        if xinc < 0.0 {
            xinc = -xinc;
            xnode += PI;
            omgadf -= PI;
        }

        let mut xn = c.xnodp;
        if let Some(res) = &self.resonance {
            let (xni, xli) = res.integrate(t);
            xn = xni;
            let temp = -xnode + self.thgr + t * THDT;
            xll = match res.terms {
                ResonanceTerms::Synchronous { .. } => xli - omgadf + temp,
                ResonanceTerms::HalfDay { .. } => xli + temp + temp,
            };
        }

        let a = (XKE / xn).powf(2.0 / 3.0) * tempa * tempa;
        em -= tempe;
        let mut xmam = xll + c.xnodp * templ;

        // Lunar-solar periodics
        let (sinis, cosis) = xinc.sin_cos();
        let sol = self.solar.at(t);
        let lun = self.lunar.at(t);
        let pe = sol.e + lun.e;
        let pinc = sol.i + lun.i;
        let pl = sol.l + lun.l;
        let mut pgh = sol.gh + lun.gh;
        let mut ph = sol.h + lun.h;

        xinc += pinc;
        em += pe;

        if el.inclination() >= LYDDANE_INCLINATION {
            ph /= c.sinio;
            pgh -= c.cosio * ph;
            omgadf += pgh;
            xnode += ph;
            xmam += pl;
        } else {
            let (sinok, cosok) = xnode.sin_cos();
            let alfdp = sinis * sinok + ph * cosok + pinc * cosis * sinok;
            let betdp = sinis * cosok - ph * sinok + pinc * cosis * cosok;
            xnode = fmod2p(xnode);
            let xls = xmam + omgadf + cosis * xnode + pl + pgh - pinc * xnode * sinis;
            let xnoh = xnode;
            xnode = fmod2p(alfdp.atan2(betdp));
            // Keep the node on the same branch as before the correction.
            if (xnoh - xnode).abs() > PI {
                if xnode < xnoh {
                    xnode += TAU;
                } else {
                    xnode -= TAU;
                }
            }
            xmam += pl;
            omgadf = xls - xmam - xinc.cos() * xnode;
        }

        PerturbedElements {
            inclination: xinc,
            arg_perigee: omgadf,
            eccentricity: em,
            semi_major_axis: a,
            mean_longitude: xmam + omgadf + xnode,
            raan: xnode,
            mean_motion: XKE / a.powf(1.5),
        }
    }
}

/// Solar and lunar geometry at epoch, plus their mean anomalies.
fn perturbers(ds50: f64, sinq: f64, cosq: f64) -> (Perturber, Perturber, f64, f64) {
    // Days since 1900 Jan 0.5
    let day = ds50 + 18261.5;

    let xnodce = 4.5236020 - 9.2422029e-4 * day;
    let (stem, ctem) = xnodce.sin_cos();
    let zcosil = 0.91375164 - 0.03568096 * ctem;
    let zsinil = (1.0 - zcosil * zcosil).sqrt();
    let zsinhl = 0.089683511 * stem / zsinil;
    let zcoshl = (1.0 - zsinhl * zsinhl).sqrt();
    let c = 4.7199672 + 0.22997150 * day;
    let gam = 5.8351514 + 0.0019443680 * day;
    let zmol = fmod2p(c - gam);
    let zx = (0.39785416 * stem / zsinil).atan2(zcoshl * ctem + 0.91744867 * zsinhl * stem);
    let zx = gam + zx - xnodce;
    let (zsingl, zcosgl) = zx.sin_cos();
    let zmos = fmod2p(6.2565837 + 0.017201977 * day);

    let sun = Perturber {
        zcosg: ZCOSGS,
        zsing: ZSINGS,
        zcosi: ZCOSIS,
        zsini: ZSINIS,
        zcosh: cosq,
        zsinh: sinq,
        cc: C1SS,
        zn: ZNS,
        ze: ZES,
    };
    let moon = Perturber {
        zcosg: zcosgl,
        zsing: zsingl,
        zcosi: zcosil,
        zsini: zsinil,
        zcosh: zcoshl * cosq + zsinhl * sinq,
        zsinh: sinq * zcoshl - cosq * zsinhl,
        cc: C1L,
        zn: ZNL,
        ze: ZEL,
    };
    (sun, moon, zmos, zmol)
}

/// Secular rates and periodic amplitudes induced by one perturber.
fn lunar_solar_terms(
    el: &ElementSet,
    c: &PerturbationCoefficients,
    p: &Perturber,
) -> (SecularRates, PeriodicTerms) {
    let (sing, cosg) = el.arg_perigee().sin_cos();
    let eq = el.eccentricity();
    let xnoi = 1.0 / c.xnodp;
    let (cosio, sinio, eosq, betao, betao2) = (c.cosio, c.sinio, c.eosq, c.betao, c.betao2);

    let a1 = p.zcosg * p.zcosh + p.zsing * p.zcosi * p.zsinh;
    let a3 = -p.zsing * p.zcosh + p.zcosg * p.zcosi * p.zsinh;
    let a7 = -p.zcosg * p.zsinh + p.zsing * p.zcosi * p.zcosh;
    let a8 = p.zsing * p.zsini;
    let a9 = p.zsing * p.zsinh + p.zcosg * p.zcosi * p.zcosh;
    let a10 = p.zcosg * p.zsini;
    let a2 = cosio * a7 + sinio * a8;
    let a4 = cosio * a9 + sinio * a10;
    let a5 = -sinio * a7 + cosio * a8;
    let a6 = -sinio * a9 + cosio * a10;

    let x1 = a1 * cosg + a2 * sing;
    let x2 = a3 * cosg + a4 * sing;
    let x3 = -a1 * sing + a2 * cosg;
    let x4 = -a3 * sing + a4 * cosg;
    let x5 = a5 * sing;
    let x6 = a6 * sing;
    let x7 = a5 * cosg;
    let x8 = a6 * cosg;

    let z31 = 12.0 * x1 * x1 - 3.0 * x3 * x3;
    let z32 = 24.0 * x1 * x2 - 6.0 * x3 * x4;
    let z33 = 12.0 * x2 * x2 - 3.0 * x4 * x4;
    let z1 = 3.0 * (a1 * a1 + a2 * a2) + z31 * eosq;
    let z2 = 6.0 * (a1 * a3 + a2 * a4) + z32 * eosq;
    let z3 = 3.0 * (a3 * a3 + a4 * a4) + z33 * eosq;
    let z11 = -6.0 * a1 * a5 + eosq * (-24.0 * x1 * x7 - 6.0 * x3 * x5);
    let z12 = -6.0 * (a1 * a6 + a3 * a5)
        + eosq * (-24.0 * (x2 * x7 + x1 * x8) - 6.0 * (x3 * x6 + x4 * x5));
    let z13 = -6.0 * a3 * a6 + eosq * (-24.0 * x2 * x8 - 6.0 * x4 * x6);
    let z21 = 6.0 * a2 * a5 + eosq * (24.0 * x1 * x5 - 6.0 * x3 * x7);
    let z22 = 6.0 * (a4 * a5 + a2 * a6)
        + eosq * (24.0 * (x2 * x5 + x1 * x6) - 6.0 * (x4 * x7 + x3 * x8));
    let z23 = 6.0 * a4 * a6 + eosq * (24.0 * x2 * x6 - 6.0 * x4 * x8);
    let z1 = z1 + z1 + betao2 * z31;
    let z2 = z2 + z2 + betao2 * z32;
    let z3 = z3 + z3 + betao2 * z33;

    let s3 = p.cc * xnoi;
    let s2 = -0.5 * s3 / betao;
    let s4 = s3 * betao;
    let s1 = -15.0 * eq * s4;
    let s5 = x1 * x3 + x2 * x4;
    let s6 = x2 * x3 + x1 * x4;
    let s7 = x2 * x4 - x1 * x3;

    let se = s1 * p.zn * s5;
    let si = s2 * p.zn * (z11 + z13);
    let sl = -p.zn * s3 * (z1 + z3 - 14.0 - 6.0 * eosq);
    let sgh = s4 * p.zn * (z31 + z33 - 6.0);
    let sh = if el.inclination() < NODE_TERM_INCLINATION {
        0.0
    } else {
        -p.zn * s2 * (z21 + z23)
    };
    let sh_over_sinio = if sh == 0.0 { 0.0 } else { sh / sinio };

    let rates = SecularRates {
        sse: se,
        ssi: si,
        ssl: sl,
        ssh: sh_over_sinio,
        ssg: sgh - cosio * sh_over_sinio,
    };
    let periodics = PeriodicTerms {
        e2: 2.0 * s1 * s6,
        e3: 2.0 * s1 * s7,
        i2: 2.0 * s2 * z12,
        i3: 2.0 * s2 * (z13 - z11),
        l2: -2.0 * s3 * z2,
        l3: -2.0 * s3 * (z3 - z1),
        l4: -2.0 * s3 * (-21.0 - 9.0 * eosq) * p.ze,
        gh2: 2.0 * s4 * z32,
        gh3: 2.0 * s4 * (z33 - z31),
        gh4: -18.0 * s4 * p.ze,
        h2: -2.0 * s2 * z22,
        h3: -2.0 * s2 * (z23 - z21),
        zm0: 0.0,
        zn: p.zn,
        ze: p.ze,
    };
    (rates, periodics)
}

/// Resonance setup for synchronous and 12-hour orbits; `None` otherwise.
fn resonance_terms(
    el: &ElementSet,
    c: &PerturbationCoefficients,
    s: &SecularRates,
    thgr: f64,
) -> Option<Resonance> {
    let xnq = c.xnodp;
    let eq = el.eccentricity();
    let aqnv = 1.0 / c.aodp;
    let (cosio, sinio, theta2, eosq) = (c.cosio, c.sinio, c.theta2, c.eosq);

    let synchronous = xnq > 0.0034906585 && xnq < 0.0052359877;
    let half_day = (0.00826..=0.00924).contains(&xnq) && eq >= 0.5;

    let (terms, xlamo, bfact) = if synchronous {
        let g200 = 1.0 + eosq * (-2.5 + 0.8125 * eosq);
        let g310 = 1.0 + 2.0 * eosq;
        let g300 = 1.0 + eosq * (-6.0 + 6.60937 * eosq);
        let f220 = 0.75 * (1.0 + cosio) * (1.0 + cosio);
        let f311 = 0.9375 * sinio * sinio * (1.0 + 3.0 * cosio) - 0.75 * (1.0 + cosio);
        let f330 = 1.875 * (1.0 + cosio).powi(3);
        let del1 = 3.0 * xnq * xnq * aqnv * aqnv;
        let terms = ResonanceTerms::Synchronous {
            del1: del1 * f311 * g310 * Q31 * aqnv,
            del2: 2.0 * del1 * f220 * g200 * Q22,
            del3: 3.0 * del1 * f330 * g300 * Q33 * aqnv,
        };
        let xlamo = el.mean_anomaly() + el.raan() + el.arg_perigee() - thgr;
        let bfact = c.xmdot + c.omgdot + c.xnodot - THDT + s.ssl + s.ssg + s.ssh;
        (terms, xlamo, bfact)
    } else if half_day {
        let eoc = eq * eosq;
        let g201 = -0.306 - (eq - 0.64) * 0.440;
        let (g211, g310, g322, g410, g422, g520) = if eq <= 0.65 {
            (
                3.616 - 13.247 * eq + 16.290 * eosq,
                -19.302 + 117.390 * eq - 228.419 * eosq + 156.591 * eoc,
                -18.9068 + 109.7927 * eq - 214.6334 * eosq + 146.5816 * eoc,
                -41.122 + 242.694 * eq - 471.094 * eosq + 313.953 * eoc,
                -146.407 + 841.880 * eq - 1629.014 * eosq + 1083.435 * eoc,
                -532.114 + 3017.977 * eq - 5740.0 * eosq + 3708.276 * eoc,
            )
        } else {
            let g520 = if eq <= 0.715 {
                1464.74 - 4664.75 * eq + 3763.64 * eosq
            } else {
                -5149.66 + 29936.92 * eq - 54087.36 * eosq + 31324.56 * eoc
            };
            (
                -72.099 + 331.819 * eq - 508.738 * eosq + 266.724 * eoc,
                -346.844 + 1582.851 * eq - 2415.925 * eosq + 1246.113 * eoc,
                -342.585 + 1554.908 * eq - 2366.899 * eosq + 1215.972 * eoc,
                -1052.797 + 4758.686 * eq - 7193.992 * eosq + 3651.957 * eoc,
                -3581.69 + 16178.11 * eq - 24462.77 * eosq + 12422.52 * eoc,
                g520,
            )
        };
        let (g533, g521, g532) = if eq < 0.7 {
            (
                -919.2277 + 4988.61 * eq - 9064.77 * eosq + 5542.21 * eoc,
                -822.71072 + 4568.6173 * eq - 8491.4146 * eosq + 5337.524 * eoc,
                -853.666 + 4690.25 * eq - 8624.77 * eosq + 5341.4 * eoc,
            )
        } else {
            (
                -37995.78 + 161616.52 * eq - 229838.2 * eosq + 109377.94 * eoc,
                -51752.104 + 218913.95 * eq - 309468.16 * eosq + 146349.42 * eoc,
                -40023.88 + 170470.89 * eq - 242699.48 * eosq + 115605.82 * eoc,
            )
        };

        let sini2 = sinio * sinio;
        let f220 = 0.75 * (1.0 + 2.0 * cosio + theta2);
        let f221 = 1.5 * sini2;
        let f321 = 1.875 * sinio * (1.0 - 2.0 * cosio - 3.0 * theta2);
        let f322 = -1.875 * sinio * (1.0 + 2.0 * cosio - 3.0 * theta2);
        let f441 = 35.0 * sini2 * f220;
        let f442 = 39.3750 * sini2 * sini2;
        let f522 = 9.84375
            * sinio
            * (sini2 * (1.0 - 2.0 * cosio - 5.0 * theta2)
                + 0.33333333 * (-2.0 + 4.0 * cosio + 6.0 * theta2));
        let f523 = sinio
            * (4.92187512 * sini2 * (-2.0 - 4.0 * cosio + 10.0 * theta2)
                + 6.56250012 * (1.0 + 2.0 * cosio - 3.0 * theta2));
        let f542 = 29.53125
            * sinio
            * (2.0 - 8.0 * cosio + theta2 * (-12.0 + 8.0 * cosio + 10.0 * theta2));
        let f543 = 29.53125
            * sinio
            * (-2.0 - 8.0 * cosio + theta2 * (12.0 + 8.0 * cosio - 10.0 * theta2));

        let xno2 = xnq * xnq;
        let ainv2 = aqnv * aqnv;
        let mut temp1 = 3.0 * xno2 * ainv2;
        let mut temp = temp1 * ROOT22;
        let d2201 = temp * f220 * g201;
        let d2211 = temp * f221 * g211;
        temp1 *= aqnv;
        temp = temp1 * ROOT32;
        let d3210 = temp * f321 * g310;
        let d3222 = temp * f322 * g322;
        temp1 *= aqnv;
        temp = 2.0 * temp1 * ROOT44;
        let d4410 = temp * f441 * g410;
        let d4422 = temp * f442 * g422;
        temp1 *= aqnv;
        temp = temp1 * ROOT52;
        let d5220 = temp * f522 * g520;
        let d5232 = temp * f523 * g532;
        temp = 2.0 * temp1 * ROOT54;
        let d5421 = temp * f542 * g521;
        let d5433 = temp * f543 * g533;

        let terms = ResonanceTerms::HalfDay {
            d2201,
            d2211,
            d3210,
            d3222,
            d4410,
            d4422,
            d5220,
            d5232,
            d5421,
            d5433,
        };
        let xlamo = el.mean_anomaly() + 2.0 * el.raan() - 2.0 * thgr;
        let bfact = c.xmdot + 2.0 * c.xnodot - 2.0 * THDT + s.ssl + 2.0 * s.ssh;
        (terms, xlamo, bfact)
    } else {
        return None;
    };

    Some(Resonance {
        terms,
        xlamo,
        xfact: bfact - xnq,
        xnq,
        omegaq: el.arg_perigee(),
        omgdot: c.omgdot,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::elements::tests::raw_11801;
    use crate::elements::RawElements;
    use crate::time::epoch_from_year_day;
    use approx::assert_relative_eq;

    /// Eccentric 12-hour orbit at the critical inclination.
    pub(crate) fn raw_molniya() -> RawElements {
        RawElements {
            epoch: epoch_from_year_day(2024, 100.5).unwrap(),
            inclination_deg: 63.4,
            raan_deg: 100.0,
            eccentricity: 0.72,
            arg_perigee_deg: 270.0,
            mean_anomaly_deg: 10.0,
            mean_motion_rev_day: 2.00614,
            bstar: 1.0e-4,
            mean_motion_dot: 0.0,
        }
    }

    /// Near-equatorial geostationary orbit.
    pub(crate) fn raw_geo() -> RawElements {
        RawElements {
            epoch: epoch_from_year_day(2024, 100.5).unwrap(),
            inclination_deg: 0.05,
            raan_deg: 80.0,
            eccentricity: 0.0002,
            arg_perigee_deg: 150.0,
            mean_anomaly_deg: 200.0,
            mean_motion_rev_day: 1.00271,
            bstar: 0.0,
            mean_motion_dot: 0.0,
        }
    }

    fn deep(raw: RawElements) -> DeepSpacePropagator {
        DeepSpacePropagator::new(ElementSet::new(raw).unwrap())
    }

    #[test]
    fn test_resonance_classification() {
        assert_eq!(deep(raw_11801()).resonance(), None);
        assert_eq!(deep(raw_molniya()).resonance(), Some(ResonanceKind::HalfDay));
        assert_eq!(deep(raw_geo()).resonance(), Some(ResonanceKind::Synchronous));
    }

    #[test]
    fn test_low_eccentricity_12h_orbit_is_not_resonant() {
        let mut raw = raw_molniya();
        raw.eccentricity = 0.3;
        assert_eq!(deep(raw).resonance(), None);
    }

    #[test]
    fn test_sidereal_angle_at_epoch_in_range() {
        let p = deep(raw_11801());
        assert!((0.0..TAU).contains(&p.thgr));
    }

    #[test]
    fn test_secular_update_is_pure() {
        let p = deep(raw_molniya());
        let later = p.secular_update(5000.0);
        let _ = p.secular_update(-3000.0);
        let again = p.secular_update(5000.0);
        assert_eq!(later.mean_longitude, again.mean_longitude);
        assert_eq!(later.mean_motion, again.mean_motion);
    }

    #[test]
    fn test_resonance_integrator_steps_both_ways() {
        let p = deep(raw_geo());
        let res = p.resonance.unwrap();

        // Inside the first step the integrator is a plain Taylor expansion.
        let (xn0, xl0) = res.integrate(0.0);
        assert_eq!(xn0, res.xnq);
        assert_eq!(xl0, res.xlamo);

        for t in [-10_000.0, -721.0, 359.0, 1440.0, 20_000.0] {
            let (xn, xl) = res.integrate(t);
            assert!(xn.is_finite() && xl.is_finite());
            // A GEO mean motion stays within a fraction of a percent.
            assert_relative_eq!(xn, res.xnq, max_relative = 1e-2);
        }
    }

    #[test]
    fn test_resonance_integrator_stops_on_non_finite_time() {
        let p = deep(raw_geo());
        let res = p.resonance.unwrap();
        for t in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let (xn, xl) = res.integrate(t);
            assert!(xn.is_nan() && xl.is_nan());
        }
        assert!(p.secular_update(f64::INFINITY).mean_motion.is_nan());
    }

    #[test]
    fn test_lunar_solar_drift_is_small() {
        let p = deep(raw_11801());
        let m = p.secular_update(1440.0);
        assert!((m.eccentricity - 0.7318036).abs() < 0.01, "e={}", m.eccentricity);
        assert!((m.inclination - 46.7916 * DEG2RAD).abs() < 0.01, "i={}", m.inclination);
    }

    #[test]
    fn test_lyddane_branch_keeps_node_continuous() {
        let p = deep(raw_geo());
        let a = p.secular_update(600.0).raan;
        let b = p.secular_update(610.0).raan;
        assert!((a - b).abs() < 0.1, "node jumped from {a} to {b}");
    }
}
