//! Approximate location handling.
//!
//! Raw coordinates are sensitive: they are held only in memory for the
//! lifetime of one request, are redacted from `Debug`, and are not
//! `Serialize`. Everything that leaves the relay refers to a location through
//! the coarse, digit-free phrase returned by [`Coordinates::region`].

/// A validated latitude/longitude pair.
#[derive(Clone, Copy, PartialEq)]
pub struct Coordinates {
    lat: f64,
    lon: f64,
}

impl Coordinates {
    /// Validate a pair; non-finite or out-of-range values are rejected.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let lon_ok = lon.is_finite() && (-180.0..=180.0).contains(&lon);
        (lat_ok && lon_ok).then_some(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// A coarse natural-language description of where these coordinates fall.
    pub fn region(&self) -> &'static str {
        REGIONS
            .iter()
            .find(|r| r.contains(self.lat, self.lon))
            .map(|r| r.phrase)
            .unwrap_or(UNKNOWN_REGION)
    }
}

impl std::fmt::Debug for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinates")
            .field("lat", &"[REDACTED]")
            .field("lon", &"[REDACTED]")
            .finish()
    }
}

/// Phrase used when coordinates fall outside every known region.
pub const UNKNOWN_REGION: &str = "your area";

struct Region {
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
    phrase: &'static str,
}

impl Region {
    fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat) && (self.lon_min..=self.lon_max).contains(&lon)
    }
}

// Ordered most specific first; the last entry is a catch-all for India.
#[rustfmt::skip]
const REGIONS: &[Region] = &[
    Region { lat_min: 22.0, lat_max: 29.5, lon_min: 89.7, lon_max: 97.5, phrase: "the Brahmaputra valley and north-eastern hills" },
    Region { lat_min: 17.8, lat_max: 22.6, lon_min: 81.3, lon_max: 87.6, phrase: "the eastern coastal plains of Odisha" },
    Region { lat_min: 21.5, lat_max: 27.5, lon_min: 84.0, lon_max: 89.7, phrase: "the lower Gangetic plains" },
    Region { lat_min: 32.5, lat_max: 37.1, lon_min: 72.5, lon_max: 80.5, phrase: "the western Himalayan region" },
    Region { lat_min: 24.0, lat_max: 32.5, lon_min: 73.5, lon_max: 84.0, phrase: "the northern Indo-Gangetic plains" },
    Region { lat_min: 20.0, lat_max: 30.0, lon_min: 68.0, lon_max: 73.5, phrase: "the western arid and coastal region" },
    Region { lat_min: 8.0, lat_max: 20.0, lon_min: 72.5, lon_max: 75.5, phrase: "the western coastal belt" },
    Region { lat_min: 8.0, lat_max: 17.8, lon_min: 78.0, lon_max: 84.5, phrase: "the south-eastern coastal plains" },
    Region { lat_min: 12.0, lat_max: 24.0, lon_min: 73.5, lon_max: 82.0, phrase: "the Deccan plateau and central highlands" },
    Region { lat_min: 6.0, lat_max: 37.5, lon_min: 68.0, lon_max: 97.5, phrase: "your part of India" },
];
