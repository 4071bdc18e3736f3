//! Map projections for projected elevation maps.
//!
//! Two projection families are supported, selected by a name string:
//!
//! - `Lambert I`, `Lambert II`, `Lambert IIe`, `Lambert III`, `Lambert IV`,
//!   `Lambert 93` - the French Lambert conformal conic zones
//! - `UTM {zone}{N|S}` with zone in `[1, 60]`, or `UTM {lon0}{N|S}` with an
//!   explicit central longitude - Universal Transverse Mercator
//!
//! Forward projection maps geodetic `(latitude, longitude)` to projected
//! `(x, y)` in meters; the inverse maps back.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Iteration cutoff for the inverse isometric latitude.
const ISO_EPSILON: f64 = f32::EPSILON as f64;

/// A French Lambert conformal conic zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambertZone {
    I,
    II,
    IIe,
    III,
    IV,
    /// Lambert 93 / RGF93.
    L93,
}

/// The hemisphere of a UTM projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
}

/// A supported map projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// French Lambert conformal conic.
    Lambert(LambertZone),
    /// Universal Transverse Mercator, by central longitude.
    Utm {
        /// Central longitude of the zone, in degrees.
        longitude_0: f64,
        hemisphere: Hemisphere,
    },
}

impl Projection {
    /// Project geodetic coordinates to flat ones, in meters.
    pub fn project(&self, latitude: f64, longitude: f64) -> (f64, f64) {
        match self {
            Projection::Lambert(zone) => lambert_project(zone.parameters(), latitude, longitude),
            Projection::Utm {
                longitude_0,
                hemisphere,
            } => utm_project(latitude, longitude, *longitude_0, *hemisphere),
        }
    }

    /// Unproject flat coordinates back to geodetic ones, in degrees.
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Lambert(zone) => lambert_unproject(zone.parameters(), x, y),
            Projection::Utm {
                longitude_0,
                hemisphere,
            } => utm_unproject(x, y, *longitude_0, *hemisphere),
        }
    }
}

impl FromStr for Projection {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        let bad = || Error::BadProjection(name.to_string());
        let mut words = name.split_whitespace();

        match words.next() {
            Some("Lambert") => {
                let zone = match words.next().ok_or_else(bad)? {
                    "I" => LambertZone::I,
                    "II" => LambertZone::II,
                    "IIe" => LambertZone::IIe,
                    "III" => LambertZone::III,
                    "IV" => LambertZone::IV,
                    "93" => LambertZone::L93,
                    _ => return Err(bad()),
                };
                if words.next().is_some() {
                    return Err(bad());
                }
                Ok(Projection::Lambert(zone))
            }
            Some("UTM") => {
                let token = words.next().ok_or_else(bad)?;
                if words.next().is_some() || token.len() < 2 || !token.is_ascii() {
                    return Err(bad());
                }
                let (value, suffix) = token.split_at(token.len() - 1);
                let hemisphere = match suffix {
                    "N" => Hemisphere::North,
                    "S" => Hemisphere::South,
                    _ => return Err(bad()),
                };
                let longitude_0 = if let Ok(zone) = value.parse::<i32>() {
                    if !(1..=60).contains(&zone) {
                        return Err(bad());
                    }
                    f64::from(6 * zone - 183)
                } else {
                    value.parse::<f64>().map_err(|_| bad())?
                };
                Ok(Projection::Utm {
                    longitude_0,
                    hemisphere,
                })
            }
            _ => Err(bad()),
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Lambert(zone) => {
                let tag = match zone {
                    LambertZone::I => "I",
                    LambertZone::II => "II",
                    LambertZone::IIe => "IIe",
                    LambertZone::III => "III",
                    LambertZone::IV => "IV",
                    LambertZone::L93 => "93",
                };
                write!(f, "Lambert {}", tag)
            }
            Projection::Utm {
                longitude_0,
                hemisphere,
            } => {
                let suffix = match hemisphere {
                    Hemisphere::North => 'N',
                    Hemisphere::South => 'S',
                };
                let zone = (longitude_0 + 183.0) / 6.0;
                if zone.fract() == 0.0 && (1.0..=60.0).contains(&zone) {
                    write!(f, "UTM {}{}", zone as i32, suffix)
                } else {
                    write!(f, "UTM {}{}", longitude_0, suffix)
                }
            }
        }
    }
}

/// Parameters of a Lambert conformal conic zone.
///
/// Values from IGN NTG_71; the Lambert 93 row was recomputed for RGF93.
struct LambertParameters {
    e: f64,
    n: f64,
    c: f64,
    lambda_c: f64,
    xs: f64,
    ys: f64,
}

impl LambertZone {
    fn parameters(&self) -> &'static LambertParameters {
        static PARAMETERS: [LambertParameters; 6] = [
            LambertParameters {
                e: 0.08248325676,
                n: 0.7604059656,
                c: 11603796.98,
                lambda_c: 0.04079234433,
                xs: 600000.0,
                ys: 5657616.674,
            },
            LambertParameters {
                e: 0.08248325676,
                n: 0.7289686274,
                c: 11745793.39,
                lambda_c: 0.04079234433,
                xs: 600000.0,
                ys: 6199695.768,
            },
            LambertParameters {
                e: 0.08248325676,
                n: 0.7289686274,
                c: 11745793.39,
                lambda_c: 0.04079234433,
                xs: 600000.0,
                ys: 8199695.768,
            },
            LambertParameters {
                e: 0.08248325676,
                n: 0.6959127966,
                c: 11947992.52,
                lambda_c: 0.04079234433,
                xs: 600000.0,
                ys: 6791905.085,
            },
            LambertParameters {
                e: 0.08248325676,
                n: 0.6712679322,
                c: 12136281.99,
                lambda_c: 0.04079234433,
                xs: 234.358,
                ys: 7239161.542,
            },
            LambertParameters {
                e: 0.08181919112,
                n: 0.7253743710,
                c: 11755528.70,
                lambda_c: 0.05235987756,
                xs: 700000.0,
                ys: 12657560.145,
            },
        ];
        match self {
            LambertZone::I => &PARAMETERS[0],
            LambertZone::II => &PARAMETERS[1],
            LambertZone::IIe => &PARAMETERS[2],
            LambertZone::III => &PARAMETERS[3],
            LambertZone::IV => &PARAMETERS[4],
            LambertZone::L93 => &PARAMETERS[5],
        }
    }
}

/// Isometric latitude (IGN NTG_71, ALG0001).
fn latitude_to_iso(latitude: f64, e: f64) -> f64 {
    let phi = latitude.to_radians();
    let s = phi.sin();
    ((0.25 * std::f64::consts::PI + 0.5 * phi).tan()
        * ((1.0 - e * s) / (1.0 + e * s)).powf(0.5 * e))
    .ln()
}

/// Geographic latitude from the isometric one (IGN NTG_71, ALG0002).
fn iso_to_latitude(iso: f64, e: f64) -> f64 {
    let exp_iso = iso.exp();
    let mut phi0 = 2.0 * exp_iso.atan() - 0.5 * std::f64::consts::PI;
    loop {
        let s = phi0.sin();
        let phi1 = 2.0 * (((1.0 + e * s) / (1.0 - e * s)).powf(0.5 * e) * exp_iso).atan()
            - 0.5 * std::f64::consts::PI;
        if (phi1 - phi0).abs() <= ISO_EPSILON {
            return phi1.to_degrees();
        }
        phi0 = phi1;
    }
}

/// Forward Lambert projection (IGN NTG_71, ALG0003).
fn lambert_project(p: &LambertParameters, latitude: f64, longitude: f64) -> (f64, f64) {
    let iso = latitude_to_iso(latitude, p.e);
    let cenl = p.c * (-p.n * iso).exp();
    let theta = p.n * (longitude.to_radians() - p.lambda_c);
    (p.xs + cenl * theta.sin(), p.ys - cenl * theta.cos())
}

/// Inverse Lambert projection (IGN NTG_71, ALG0004).
fn lambert_unproject(p: &LambertParameters, x: f64, y: f64) -> (f64, f64) {
    let dx = x - p.xs;
    let dy = y - p.ys;
    let r = (dx * dx + dy * dy).sqrt();
    let gamma = dx.atan2(-dy);
    let longitude = (p.lambda_c + gamma / p.n).to_degrees();
    let iso = -(r / p.c).ln() / p.n;
    (iso_to_latitude(iso, p.e), longitude)
}

/// UTM constants: WGS84 ellipsoid, standard scale and offsets.
struct UtmConstants {
    radius: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
    n: f64,
}

fn utm_constants() -> UtmConstants {
    let a = 6_378_137.0;
    let f = 1.0 / 298.257223563;
    let n = f / (2.0 - f);
    let radius = a / (1.0 + n) * (1.0 + n * n * (0.25 + 0.0625 * n * n));
    UtmConstants {
        radius,
        alpha: [
            n * (0.5 + n * (-2.0 / 3.0 + 5.0 / 16.0 * n)),
            n * n * (13.0 / 48.0 - 3.0 / 5.0 * n),
            61.0 / 240.0 * n * n * n,
        ],
        beta: [
            n * (0.5 + n * (-2.0 / 3.0 + 37.0 / 96.0 * n)),
            n * n * (1.0 / 48.0 + 1.0 / 15.0 * n),
            17.0 / 480.0 * n * n * n,
        ],
        delta: [
            n * (2.0 + n * (-2.0 / 3.0 - 2.0 * n)),
            n * n * (7.0 / 3.0 - 8.0 / 5.0 * n),
            56.0 / 15.0 * n * n * n,
        ],
        n,
    }
}

const UTM_K0: f64 = 0.9996;
const UTM_E0: f64 = 5e5;

fn utm_false_northing(hemisphere: Hemisphere) -> f64 {
    match hemisphere {
        Hemisphere::North => 0.0,
        Hemisphere::South => 1e7,
    }
}

/// Forward transverse Mercator series.
fn utm_project(latitude: f64, longitude: f64, longitude_0: f64, hemisphere: Hemisphere) -> (f64, f64) {
    let k = utm_constants();

    let c = 2.0 * k.n.sqrt() / (1.0 + k.n);
    let s = latitude.to_radians().sin();
    let t = (s.atanh() - c * (c * s).atanh()).sinh();
    let dl = (longitude - longitude_0).to_radians();
    let zeta = t.atan2(dl.cos());
    let eta = (dl.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut xs = 0.0;
    let mut ys = 0.0;
    for (i, alpha) in k.alpha.iter().enumerate() {
        let w = 2.0 * (i + 1) as f64;
        xs += alpha * (w * zeta).cos() * (w * eta).sinh();
        ys += alpha * (w * zeta).sin() * (w * eta).cosh();
    }
    (
        UTM_E0 + UTM_K0 * k.radius * (eta + xs),
        utm_false_northing(hemisphere) + UTM_K0 * k.radius * (zeta + ys),
    )
}

/// Inverse transverse Mercator series.
fn utm_unproject(x: f64, y: f64, longitude_0: f64, hemisphere: Hemisphere) -> (f64, f64) {
    let k = utm_constants();

    let zeta0 = (y - utm_false_northing(hemisphere)) / (UTM_K0 * k.radius);
    let eta0 = (x - UTM_E0) / (UTM_K0 * k.radius);
    let mut zeta = zeta0;
    let mut eta = eta0;
    for (i, beta) in k.beta.iter().enumerate() {
        let w = 2.0 * (i + 1) as f64;
        zeta -= beta * (w * zeta0).sin() * (w * eta0).cosh();
        eta -= beta * (w * zeta0).cos() * (w * eta0).sinh();
    }
    let chi = (zeta.sin() / eta.cosh()).asin();
    let mut s = 0.0;
    for (i, delta) in k.delta.iter().enumerate() {
        let w = 2.0 * (i + 1) as f64;
        s += delta * (w * chi).sin();
    }
    let latitude = (chi + s).to_degrees();
    let longitude = longitude_0 + eta.sinh().atan2(zeta.cos()).to_degrees();
    (latitude, longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lambert() {
        assert_eq!(
            "Lambert I".parse::<Projection>().unwrap(),
            Projection::Lambert(LambertZone::I)
        );
        assert_eq!(
            "Lambert IIe".parse::<Projection>().unwrap(),
            Projection::Lambert(LambertZone::IIe)
        );
        assert_eq!(
            "Lambert 93".parse::<Projection>().unwrap(),
            Projection::Lambert(LambertZone::L93)
        );
        assert!("Lambert".parse::<Projection>().is_err());
        assert!("Lambert V".parse::<Projection>().is_err());
        assert!("Lambert I extra".parse::<Projection>().is_err());
    }

    #[test]
    fn test_parse_utm() {
        assert_eq!(
            "UTM 31N".parse::<Projection>().unwrap(),
            Projection::Utm {
                longitude_0: 3.0,
                hemisphere: Hemisphere::North
            }
        );
        assert_eq!(
            "UTM 1S".parse::<Projection>().unwrap(),
            Projection::Utm {
                longitude_0: -177.0,
                hemisphere: Hemisphere::South
            }
        );
        assert_eq!(
            "UTM 4.5N".parse::<Projection>().unwrap(),
            Projection::Utm {
                longitude_0: 4.5,
                hemisphere: Hemisphere::North
            }
        );
        assert!("UTM 0N".parse::<Projection>().is_err());
        assert!("UTM 61N".parse::<Projection>().is_err());
        assert!("UTM 31X".parse::<Projection>().is_err());
        assert!("UTM".parse::<Projection>().is_err());
        assert!("Mercator 31N".parse::<Projection>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for name in ["Lambert I", "Lambert IIe", "Lambert 93", "UTM 31N", "UTM 1S", "UTM 4.5N"] {
            let projection: Projection = name.parse().unwrap();
            assert_eq!(projection.to_string(), name);
        }
    }

    #[test]
    fn test_utm_central_meridian_on_equator() {
        let utm: Projection = "UTM 31N".parse().unwrap();
        let (x, y) = utm.project(0.0, 3.0);
        assert!((x - 500_000.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);

        let utm: Projection = "UTM 31S".parse().unwrap();
        let (_, y) = utm.project(0.0, 3.0);
        assert!((y - 1e7).abs() < 1e-6);
    }

    #[test]
    fn test_utm_roundtrip() {
        let utm: Projection = "UTM 31N".parse().unwrap();
        for (lat, lon) in [(45.5, 3.5), (0.1, 0.5), (60.0, 5.9), (-12.3, 2.1)] {
            let (x, y) = utm.project(lat, lon);
            let (lat1, lon1) = utm.unproject(x, y);
            assert!((lat1 - lat).abs() < 1e-7, "lat {} vs {}", lat1, lat);
            assert!((lon1 - lon).abs() < 1e-7, "lon {} vs {}", lon1, lon);
        }
    }

    #[test]
    fn test_lambert_central_meridian() {
        // On the central meridian the easting equals the false easting.
        let lambert: Projection = "Lambert 93".parse().unwrap();
        let (x, _) = lambert.project(46.5, 3.0);
        assert!((x - 700_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_lambert_roundtrip() {
        for name in ["Lambert I", "Lambert II", "Lambert IIe", "Lambert III", "Lambert IV", "Lambert 93"] {
            let lambert: Projection = name.parse().unwrap();
            for (lat, lon) in [(48.85, 2.35), (45.5, 3.5), (43.3, 5.4)] {
                let (x, y) = lambert.project(lat, lon);
                let (lat1, lon1) = lambert.unproject(x, y);
                assert!((lat1 - lat).abs() < 1e-6, "{}: lat {} vs {}", name, lat1, lat);
                assert!((lon1 - lon).abs() < 1e-6, "{}: lon {} vs {}", name, lon1, lon);
            }
        }
    }

    #[test]
    fn test_lambert_northing_grows_with_latitude() {
        let lambert: Projection = "Lambert 93".parse().unwrap();
        let (_, y_south) = lambert.project(43.0, 3.0);
        let (_, y_north) = lambert.project(49.0, 3.0);
        assert!(y_north > y_south);
    }
}
