use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ephemeris::time::datetime_to_julian_day;
use crate::ephemeris::{CelestialBody, EphemerisBackend, GeoLocation, Position, PositionSource};
use crate::error::TransitError;
use crate::houses::{compute_cusps, HouseSystem, HouseSystemKind, QUADRANT_LATITUDE_LIMIT};

/// A birth chart: cusps and the position of every body at birth. Built
/// once and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatalChart {
    pub birth: DateTime<Utc>,
    pub location: GeoLocation,
    pub houses: HouseSystem,
    pub house_kind: HouseSystemKind,
    pub positions: BTreeMap<CelestialBody, Position>,
}

impl NatalChart {
    /// Assemble a chart from cusps and positions computed elsewhere.
    pub fn from_parts(
        birth: DateTime<Utc>,
        location: GeoLocation,
        house_kind: HouseSystemKind,
        houses: HouseSystem,
        positions: BTreeMap<CelestialBody, Position>,
    ) -> Result<Self, TransitError> {
        validate_location(&location)?;
        Ok(Self {
            birth,
            location,
            houses,
            house_kind,
            positions,
        })
    }

    pub fn position(&self, body: CelestialBody) -> Option<&Position> {
        self.positions.get(&body)
    }

    /// Natal house of a longitude.
    pub fn house_of(&self, longitude: f64) -> u8 {
        self.houses.house_of(longitude)
    }
}

fn validate_location(location: &GeoLocation) -> Result<(), TransitError> {
    if !location.lat.is_finite() || !(-90.0..=90.0).contains(&location.lat) {
        return Err(TransitError::InvalidInput {
            message: format!("latitude {} is outside [-90, 90]", location.lat),
        });
    }
    if !location.lon.is_finite() || !(-180.0..=180.0).contains(&location.lon) {
        return Err(TransitError::InvalidInput {
            message: format!("longitude {} is outside [-180, 180]", location.lon),
        });
    }
    Ok(())
}

pub struct NatalChartBuilder<'a, P: ?Sized> {
    source: &'a P,
    house_kind: HouseSystemKind,
    cusp_backend: Option<&'a dyn EphemerisBackend>,
}

impl<'a, P: PositionSource + ?Sized> NatalChartBuilder<'a, P> {
    pub fn new(source: &'a P) -> Self {
        Self {
            source,
            house_kind: HouseSystemKind::default(),
            cusp_backend: None,
        }
    }

    pub fn house_system(mut self, kind: HouseSystemKind) -> Self {
        self.house_kind = kind;
        self
    }

    /// Take cusps from the backend's own house engine when it has one.
    pub fn backend_cusps(mut self, backend: &'a dyn EphemerisBackend) -> Self {
        self.cusp_backend = Some(backend);
        self
    }

    pub fn build(
        &self,
        birth: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
    ) -> Result<NatalChart, TransitError> {
        self.build_with(self.house_kind, birth, latitude, longitude)
    }

    /// Like [`build`](Self::build), but falls back to Equal houses when the
    /// configured system is undefined at the birth latitude.
    pub fn build_with_fallback(
        &self,
        birth: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
    ) -> Result<NatalChart, TransitError> {
        match self.build(birth, latitude, longitude) {
            Err(TransitError::GeodeticRange { system, .. }) => {
                log::warn!(
                    "{} houses undefined at latitude {:.2}; using equal houses",
                    system,
                    latitude
                );
                self.build_with(HouseSystemKind::Equal, birth, latitude, longitude)
            }
            other => other,
        }
    }

    fn build_with(
        &self,
        kind: HouseSystemKind,
        birth: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
    ) -> Result<NatalChart, TransitError> {
        let location = GeoLocation {
            lat: latitude,
            lon: longitude,
        };
        validate_location(&location)?;
        if kind.is_latitude_limited() && latitude.abs() > QUADRANT_LATITUDE_LIMIT {
            return Err(TransitError::GeodeticRange {
                system: kind.to_string(),
                latitude,
                limit: QUADRANT_LATITUDE_LIMIT,
            });
        }

        let jd = datetime_to_julian_day(birth);
        let cusps = match self
            .cusp_backend
            .and_then(|backend| backend.house_cusps(jd, latitude, longitude, kind))
        {
            Some(cusps) => cusps?,
            None => compute_cusps(kind, jd, latitude, longitude)?,
        };
        let houses = HouseSystem::new(cusps)?;

        let mut positions = BTreeMap::new();
        for body in CelestialBody::ALL {
            positions.insert(body, self.source.position_of(body, birth)?);
        }

        log::debug!(
            "Natal chart for {} at ({:.4}, {:.4}): {} houses, ASC {:.2}",
            birth,
            latitude,
            longitude,
            kind,
            houses.ascendant()
        );

        Ok(NatalChart {
            birth,
            location,
            houses,
            house_kind: kind,
            positions,
        })
    }
}
