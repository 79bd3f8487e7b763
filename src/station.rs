// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Receiver metadata attached to observed and elemental waveforms.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    /// Network code.
    pub network: String,
    /// Station code.
    pub station: String,
    /// Location code (often empty).
    pub location: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Station {
    /// Create a station with an empty location code.
    pub fn new(network: &str, station: &str, latitude: f64, longitude: f64) -> Self {
        Station {
            network: network.to_string(),
            station: station.to_string(),
            location: String::new(),
            latitude,
            longitude,
        }
    }

    /// `network.station.location` identifier.
    pub fn id(&self) -> String {
        format!("{}.{}.{}", self.network, self.station, self.location)
    }
}

/// Hypocenter of the event being inverted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Origin {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Depth below the surface in meters.
    pub depth_in_m: f64,
}

impl Origin {
    /// Great-circle distance (m) and azimuth (degrees clockwise from north) to a station.
    ///
    /// Uses a spherical Earth; azimuth is normalized to `[0, 360)`.
    pub fn distance_azimuth(&self, station: &Station) -> (f64, f64) {
        let (lat1, lon1) = (self.latitude.to_radians(), self.longitude.to_radians());
        let (lat2, lon2) = (station.latitude.to_radians(), station.longitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let distance = 2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin();

        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        let azimuth = y.atan2(x).to_degrees().rem_euclid(360.0);

        (distance, azimuth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_id() {
        let mut s = Station::new("AK", "BPAW", 64.0, -149.0);
        assert_eq!(s.id(), "AK.BPAW.");
        s.location = "00".to_string();
        assert_eq!(s.id(), "AK.BPAW.00");
    }

    #[test]
    fn due_east_on_equator() {
        let origin = Origin {
            latitude: 0.0,
            longitude: 0.0,
            depth_in_m: 10_000.0,
        };
        let station = Station::new("XX", "E", 0.0, 1.0);
        let (dist, az) = origin.distance_azimuth(&station);
        let expected = EARTH_RADIUS_M * 1f64.to_radians();
        assert!((dist - expected).abs() < 1e-6);
        assert!((az - 90.0).abs() < 1e-9);
    }

    #[test]
    fn due_south_azimuth() {
        let origin = Origin {
            latitude: 10.0,
            longitude: 20.0,
            depth_in_m: 0.0,
        };
        let station = Station::new("XX", "S", 5.0, 20.0);
        let (_, az) = origin.distance_azimuth(&station);
        assert!((az - 180.0).abs() < 1e-9);
    }

    #[test]
    fn coincident_points() {
        let origin = Origin {
            latitude: 61.0,
            longitude: -150.0,
            depth_in_m: 0.0,
        };
        let station = Station::new("XX", "O", 61.0, -150.0);
        let (dist, az) = origin.distance_azimuth(&station);
        assert_eq!(dist, 0.0);
        assert_eq!(az, 0.0);
    }
}
