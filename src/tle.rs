//! Two-Line Element (TLE) set parser.
//!
//! Parses standard NORAD/Space-Track TLE format (2-line and 3-line with name).
//! Supports batch parsing of multi-TLE files and conversion to a validated
//! [`ElementSet`] ready for propagation.
//!
//! # TLE Format Reference
//! ```text
//! Line 0 (optional): Satellite Name (up to 24 chars)
//! Line 1: 1 NNNNNC NNNNNAAA NNNNN.NNNNNNNN +.NNNNNNNN +NNNNN-N +NNNNN-N N NNNNN
//! Line 2: 2 NNNNN NNN.NNNN NNN.NNNN NNNNNNN NNN.NNNN NNN.NNNN NN.NNNNNNNNNNNNNN
//! ```
//!
//! # Example
//! ```
//! use orbit_predict::tle::Tle;
//!
//! let line1 = "1 88888U          80275.98708465  .00073094  13844-3  66816-4 0    87";
//! let line2 = "2 88888  72.8435 115.9689 0086731  52.6988 110.5714 16.05824518  1058";
//!
//! let tle = Tle::parse(line1, line2).unwrap();
//! assert_eq!(tle.norad_id, 88888);
//! assert!(tle.to_element_set().is_ok());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::MINUTES_PER_DAY;
use crate::elements::{ElementError, ElementSet, RawElements};
use crate::time::epoch_from_year_day;

/// TLE parsing errors.
#[derive(Error, Debug)]
pub enum TleError {
    #[error("Line 1 must start with '1', got '{0}'")]
    InvalidLine1Start(char),

    #[error("Line 2 must start with '2', got '{0}'")]
    InvalidLine2Start(char),

    #[error("Line 1 length must be 69 characters, got {0}")]
    InvalidLine1Length(usize),

    #[error("Line 2 length must be 69 characters, got {0}")]
    InvalidLine2Length(usize),

    #[error("Line {0} contains non-ASCII characters")]
    NonAscii(u8),

    #[error("NORAD IDs don't match between lines: {0} vs {1}")]
    NoradIdMismatch(u32, u32),

    #[error("Checksum failed on line {line}: expected {expected}, computed {computed}")]
    ChecksumFailed {
        line: u8,
        expected: u8,
        computed: u8,
    },

    #[error("Failed to parse field '{field}': {source}")]
    ParseField {
        field: &'static str,
        source: std::num::ParseFloatError,
    },

    #[error("Failed to parse integer field '{field}': {source}")]
    ParseIntField {
        field: &'static str,
        source: std::num::ParseIntError,
    },

    #[error("Failed to parse implied-decimal field '{0}'")]
    ImpliedDecimal(String),

    #[error(transparent)]
    Elements(#[from] ElementError),

    #[error("No TLEs found in input")]
    Empty,
}

/// A parsed Two-Line Element set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tle {
    /// Satellite name (from line 0, if present).
    pub name: Option<String>,
    /// NORAD catalog number.
    pub norad_id: u32,
    /// International designator (launch year, launch number, piece).
    pub intl_designator: String,
    /// Classification (U=unclassified, C=classified, S=secret).
    pub classification: char,
    /// Epoch year (full 4-digit year; two-digit years below 57 are 20xx).
    pub epoch_year: u16,
    /// Epoch day of year (fractional, 1.0 = Jan 1 00:00 UTC).
    pub epoch_day: f64,
    /// Epoch as an instant.
    pub epoch: DateTime<Utc>,
    /// First derivative of mean motion (rev/day²) / 2.
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion (rev/day³) / 6.
    pub mean_motion_ddot: f64,
    /// B* drag term (1/Earth radii).
    pub bstar: f64,
    /// Ephemeris type (usually 0).
    pub ephemeris_type: u8,
    /// Element set number.
    pub element_set: u16,
    /// Inclination (degrees).
    pub inclination_deg: f64,
    /// Right ascension of ascending node (degrees).
    pub raan_deg: f64,
    /// Eccentricity (dimensionless).
    pub eccentricity: f64,
    /// Argument of perigee (degrees).
    pub arg_perigee_deg: f64,
    /// Mean anomaly (degrees).
    pub mean_anomaly_deg: f64,
    /// Mean motion (revolutions per day).
    pub mean_motion_rev_day: f64,
    /// Revolution number at epoch.
    pub rev_number: u32,
}

impl Tle {
    /// Parse a TLE from two lines (without satellite name).
    pub fn parse(line1: &str, line2: &str) -> Result<Self, TleError> {
        Self::parse_with_name(None, line1, line2)
    }

    /// Parse a TLE from three lines (with satellite name on line 0).
    pub fn parse_3line(line0: &str, line1: &str, line2: &str) -> Result<Self, TleError> {
        let name = line0.trim().to_string();
        Self::parse_with_name(Some(name), line1, line2)
    }

    /// Parse with optional name.
    fn parse_with_name(name: Option<String>, line1: &str, line2: &str) -> Result<Self, TleError> {
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();

        if !line1.is_ascii() {
            return Err(TleError::NonAscii(1));
        }
        if !line2.is_ascii() {
            return Err(TleError::NonAscii(2));
        }
        if line1.len() > 69 {
            return Err(TleError::InvalidLine1Length(line1.len()));
        }
        if line2.len() > 69 {
            return Err(TleError::InvalidLine2Length(line2.len()));
        }

        // Trailing blanks may have been stripped by the source; pad them back
        let l1: String = format!("{:<69}", line1);
        let l2: String = format!("{:<69}", line2);

        // Validate line numbers
        let c1 = l1.as_bytes()[0] as char;
        let c2 = l2.as_bytes()[0] as char;
        if c1 != '1' {
            return Err(TleError::InvalidLine1Start(c1));
        }
        if c2 != '2' {
            return Err(TleError::InvalidLine2Start(c2));
        }

        // Verify checksums
        verify_checksum(&l1, 1)?;
        verify_checksum(&l2, 2)?;

        // ── Parse Line 1 ──
        let norad_id_1 = parse_int::<u32>(&l1[2..7], "norad_id (line 1)")?;

        let classification = l1.as_bytes()[7] as char;
        let intl_designator = l1[9..17].trim().to_string();

        let epoch_year_2d = parse_int::<u16>(&l1[18..20], "epoch_year")?;
        let epoch_year = if epoch_year_2d >= 57 {
            1900 + epoch_year_2d
        } else {
            2000 + epoch_year_2d
        };
        let epoch_day = parse_float(&l1[20..32], "epoch_day")?;
        let epoch = epoch_from_year_day(epoch_year as i32, epoch_day).ok_or(ElementError::Epoch {
            year: epoch_year as i32,
            day: epoch_day,
        })?;

        let mean_motion_dot = parse_float(&l1[33..43], "mean_motion_dot")?;
        let mean_motion_ddot = parse_implied_decimal(&l1[44..52])?;
        let bstar = parse_implied_decimal(&l1[53..61])?;

        let ephemeris_type = parse_int_or_blank::<u8>(&l1[62..63], "ephemeris_type")?;
        let element_set = parse_int_or_blank::<u16>(&l1[64..68], "element_set")?;

        // ── Parse Line 2 ──
        let norad_id_2 = parse_int::<u32>(&l2[2..7], "norad_id (line 2)")?;
        if norad_id_1 != norad_id_2 {
            return Err(TleError::NoradIdMismatch(norad_id_1, norad_id_2));
        }

        let inclination_deg = parse_float(&l2[8..16], "inclination")?;
        let raan_deg = parse_float(&l2[17..25], "raan")?;

        // Eccentricity has implied leading decimal point
        let eccentricity = parse_float(&format!("0.{}", l2[26..33].trim()), "eccentricity")?;

        let arg_perigee_deg = parse_float(&l2[34..42], "arg_perigee")?;
        let mean_anomaly_deg = parse_float(&l2[43..51], "mean_anomaly")?;
        let mean_motion_rev_day = parse_float(&l2[52..63], "mean_motion")?;

        let rev_number = parse_int_or_blank::<u32>(&l2[63..68], "rev_number")?;

        Ok(Tle {
            name,
            norad_id: norad_id_1,
            intl_designator,
            classification,
            epoch_year,
            epoch_day,
            epoch,
            mean_motion_dot,
            mean_motion_ddot,
            bstar,
            ephemeris_type,
            element_set,
            inclination_deg,
            raan_deg,
            eccentricity,
            arg_perigee_deg,
            mean_anomaly_deg,
            mean_motion_rev_day,
            rev_number,
        })
    }

    /// Parse a string containing multiple TLEs (2-line or 3-line format).
    ///
    /// Handles mixed formats: lines starting with '1' begin a 2-line TLE,
    /// other non-empty lines are treated as satellite names (line 0).
    pub fn parse_batch(input: &str) -> Result<Vec<Self>, TleError> {
        let lines: Vec<&str> = input
            .lines()
            .map(|l| l.trim_end())
            .filter(|l| !l.is_empty())
            .collect();

        if lines.is_empty() {
            return Err(TleError::Empty);
        }

        let mut tles = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            if lines[i].starts_with('1') && i + 1 < lines.len() && lines[i + 1].starts_with('2') {
                // 2-line TLE
                tles.push(Tle::parse(lines[i], lines[i + 1])?);
                i += 2;
            } else if i + 2 < lines.len()
                && lines[i + 1].starts_with('1')
                && lines[i + 2].starts_with('2')
            {
                // 3-line TLE (line 0 is name)
                tles.push(Tle::parse_3line(lines[i], lines[i + 1], lines[i + 2])?);
                i += 3;
            } else {
                // Skip unrecognized lines
                i += 1;
            }
        }

        if tles.is_empty() {
            return Err(TleError::Empty);
        }

        Ok(tles)
    }

    /// Element values as written in the TLE (degrees, rev/day).
    pub fn to_raw_elements(&self) -> RawElements {
        RawElements {
            epoch: self.epoch,
            inclination_deg: self.inclination_deg,
            raan_deg: self.raan_deg,
            eccentricity: self.eccentricity,
            arg_perigee_deg: self.arg_perigee_deg,
            mean_anomaly_deg: self.mean_anomaly_deg,
            mean_motion_rev_day: self.mean_motion_rev_day,
            bstar: self.bstar,
            mean_motion_dot: self.mean_motion_dot,
        }
    }

    /// Validated element set in radians and rad/min.
    pub fn to_element_set(&self) -> Result<ElementSet, TleError> {
        Ok(ElementSet::new(self.to_raw_elements())?)
    }

    /// Orbital period from the unrecovered TLE mean motion (minutes).
    pub fn period_minutes(&self) -> f64 {
        MINUTES_PER_DAY / self.mean_motion_rev_day
    }
}

impl std::fmt::Display for Tle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (NORAD {}) — epoch {}, {:.1}° inc, {:.4} ecc, {:.2} rev/day",
            self.name.as_deref().unwrap_or("UNKNOWN"),
            self.norad_id,
            self.epoch.format("%Y-%m-%dT%H:%M:%SZ"),
            self.inclination_deg,
            self.eccentricity,
            self.mean_motion_rev_day,
        )
    }
}

fn parse_float(s: &str, field: &'static str) -> Result<f64, TleError> {
    s.trim()
        .parse::<f64>()
        .map_err(|source| TleError::ParseField { field, source })
}

fn parse_int<T>(s: &str, field: &'static str) -> Result<T, TleError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    s.trim()
        .parse::<T>()
        .map_err(|source| TleError::ParseIntField { field, source })
}

/// Bookkeeping fields are often left blank; blank reads as zero.
fn parse_int_or_blank<T>(s: &str, field: &'static str) -> Result<T, TleError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError> + Default,
{
    if s.trim().is_empty() {
        return Ok(T::default());
    }
    parse_int(s, field)
}

/// Parse the TLE "implied decimal" format: " NNNNN-N" → float.
///
/// Examples: " 16538-4" → 0.16538e-4, "-11606-4" → -0.11606e-4
fn parse_implied_decimal(s: &str) -> Result<f64, TleError> {
    let s = s.trim();
    if s.is_empty() || s == "00000-0" || s == "00000+0" {
        return Ok(0.0);
    }

    // Exponent sign: last + or - that isn't the leading sign
    let exp_pos = s
        .bytes()
        .enumerate()
        .skip(1)
        .filter(|&(_, b)| b == b'+' || b == b'-')
        .map(|(i, _)| i)
        .last();

    let (mantissa_str, exp_str) = match exp_pos {
        Some(pos) => (&s[..pos], &s[pos..]),
        None => (s, "+0"),
    };

    // Add implied leading "0."
    let sign = if mantissa_str.starts_with('-') { "-" } else { "" };
    let digits = mantissa_str.trim_start_matches(['+', '-', ' ']);

    format!("{}0.{}e{}", sign, digits, exp_str)
        .parse::<f64>()
        .map_err(|_| TleError::ImpliedDecimal(s.to_string()))
}

fn verify_checksum(line: &str, number: u8) -> Result<(), TleError> {
    // Blank checksum column is accepted as 0
    let expected = match line.as_bytes()[68] {
        b @ b'0'..=b'9' => b - b'0',
        _ => 0,
    };
    let computed = compute_checksum(&line[..68]);
    if expected != computed {
        return Err(TleError::ChecksumFailed {
            line: number,
            expected,
            computed,
        });
    }
    Ok(())
}

/// Compute TLE checksum (mod-10 of sum of digits, '-' counts as 1).
fn compute_checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}
