//! Coordinate reference systems the reference datasets are published in.
//!
//! Input points are always WGS84 lon/lat, so only forward transforms out of
//! WGS84 are needed.

use geo::Point;
use serde_json::Value;

use crate::error::{Error, Result};

/// Reference systems tract, zone and USDA files may be published in
pub const SUPPORTED_CRS: &str = "EPSG:4326, OGC:CRS84, EPSG:4269, EPSG:3857";

/// Web Mercator sphere radius (meters)
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude bound of the square Web Mercator world
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// EPSG:4326 / OGC:CRS84, lon/lat degrees
    Wgs84,
    /// EPSG:4269, lon/lat degrees; used by TIGER/Line tract files
    Nad83,
    /// EPSG:3857, meters
    WebMercator,
}

impl Crs {
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Crs::Wgs84),
            4269 => Some(Crs::Nad83),
            3857 | 900913 | 102100 | 102113 => Some(Crs::WebMercator),
            _ => None,
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::Nad83 => 4269,
            Crs::WebMercator => 3857,
        }
    }

    /// Parse a CRS name such as `EPSG:4269`, `urn:ogc:def:crs:EPSG::3857`
    /// or `urn:ogc:def:crs:OGC:1.3:CRS84`.
    pub fn from_name(name: &str) -> Result<Self> {
        let upper = name.trim().to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Ok(Crs::Wgs84);
        }
        upper
            .rsplit(':')
            .next()
            .and_then(|code| code.parse::<u32>().ok())
            .and_then(Self::from_epsg)
            .ok_or_else(|| Error::UnsupportedCrs(name.to_string()))
    }

    /// Read the CRS of a GeoParquet column (PROJJSON object, string or null).
    ///
    /// A missing or null CRS means OGC:CRS84.
    pub fn from_geoparquet(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Crs::Wgs84),
            Some(Value::String(name)) => Self::from_name(name),
            Some(Value::Object(projjson)) => {
                let id = projjson.get("id").ok_or_else(|| {
                    Error::UnsupportedCrs("PROJJSON without an id".to_string())
                })?;
                let authority = id.get("authority").and_then(Value::as_str).unwrap_or("");
                let code = id.get("code").and_then(|c| match c {
                    Value::Number(n) => n.as_u64().map(|n| n.to_string()),
                    Value::String(s) => Some(s.clone()),
                    _ => None,
                });
                match code {
                    Some(code) => Self::from_name(&format!("{}:{}", authority, code)),
                    None => Err(Error::UnsupportedCrs(id.to_string())),
                }
            }
            Some(other) => Err(Error::UnsupportedCrs(other.to_string())),
        }
    }

    /// Project a WGS84 lon/lat point into this CRS.
    ///
    /// NAD83 and WGS84 differ by around a meter in the conterminous US, well
    /// below tract boundary precision, so the datum shift is the identity.
    pub fn project(&self, point: Point<f64>) -> Point<f64> {
        match self {
            Crs::Wgs84 | Crs::Nad83 => point,
            Crs::WebMercator => {
                let lat = point.y().clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
                let x = EARTH_RADIUS * point.x().to_radians();
                let y = EARTH_RADIUS
                    * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0)
                        .tan()
                        .ln();
                Point::new(x, y)
            }
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_name_variants() {
        assert_eq!(Crs::from_name("EPSG:4269").unwrap(), Crs::Nad83);
        assert_eq!(Crs::from_name("urn:ogc:def:crs:EPSG::3857").unwrap(), Crs::WebMercator);
        assert_eq!(Crs::from_name("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(), Crs::Wgs84);
        assert!(Crs::from_name("EPSG:2232").is_err());
    }

    #[test]
    fn test_from_geoparquet_projjson() {
        let projjson = json!({
            "type": "GeographicCRS",
            "name": "NAD83",
            "id": { "authority": "EPSG", "code": 4269 }
        });
        assert_eq!(Crs::from_geoparquet(Some(&projjson)).unwrap(), Crs::Nad83);
        assert_eq!(Crs::from_geoparquet(None).unwrap(), Crs::Wgs84);
        assert_eq!(Crs::from_geoparquet(Some(&Value::Null)).unwrap(), Crs::Wgs84);
    }

    #[test]
    fn test_web_mercator_projection() {
        let origin = Crs::WebMercator.project(Point::new(0.0, 0.0));
        assert!(origin.x().abs() < 1e-9 && origin.y().abs() < 1e-9);

        let edge = Crs::WebMercator.project(Point::new(180.0, 0.0));
        assert!((edge.x() - 20_037_508.342_789_244).abs() < 1e-6);

        let denver = Crs::WebMercator.project(Point::new(-104.99, 39.74));
        assert!((denver.x() - -11_687_433.34).abs() < 0.01);
        assert!((denver.y() - 4_828_231.41).abs() < 0.01);
    }

    #[test]
    fn test_unsupported_crs_names_the_supported_ones() {
        // Texas state plane, feet
        let err = Crs::from_name("EPSG:2277").unwrap_err();
        assert!(matches!(&err, Error::UnsupportedCrs(name) if name == "EPSG:2277"));
        assert!(err.to_string().contains(SUPPORTED_CRS));

        let projjson = json!({
            "type": "ProjectedCRS",
            "id": { "authority": "EPSG", "code": 26914 }
        });
        assert!(matches!(
            Crs::from_geoparquet(Some(&projjson)),
            Err(Error::UnsupportedCrs(_))
        ));
    }

    #[test]
    fn test_geographic_is_identity() {
        let p = Point::new(-104.99, 39.74);
        assert_eq!(Crs::Nad83.project(p), p);
        assert_eq!(Crs::Wgs84.project(p), p);
    }
}
