//! Map viewport state: where the map is centered, the single position
//! marker, and the XYZ tile provider used to draw it.

use std::f64::consts::PI;

use tracing::debug;

use crate::{
    config::MapConfig,
    model::{Coordinate, WeatherResult},
};

pub const DEFAULT_CENTER: Coordinate = Coordinate::new(51.505, -0.09);
pub const DEFAULT_ZOOM: u8 = 13;
/// Zoom applied whenever the map recenters on a weather result.
pub const RECENTER_ZOOM: u8 = 13;
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// Web Mercator stops being defined past this latitude.
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;
const MAX_ZOOM: u8 = 19;

/// Index of one tile in an XYZ tile pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl Tile {
    /// Tile containing `coord` at zoom `z`.
    pub fn containing(coord: Coordinate, z: u8) -> Self {
        let z = z.min(MAX_ZOOM);
        let n = f64::from(1u32 << z);

        let lon = (coord.longitude + 180.0).rem_euclid(360.0) - 180.0;
        let lat = coord.latitude.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();

        let x = ((lon + 180.0) / 360.0 * n).floor();
        let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * n).floor();

        let max = n - 1.0;
        Self {
            x: x.clamp(0.0, max) as u32,
            y: y.clamp(0.0, max) as u32,
            z,
        }
    }
}

/// An XYZ tile service plus the attribution it requires.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSource {
    pub url_template: String,
    pub attribution: String,
}

impl TileSource {
    pub fn tile_url(&self, tile: Tile) -> String {
        self.url_template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

impl Default for TileSource {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_TILE_URL.to_string(),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    center: Coordinate,
    zoom: u8,
    marker: Option<Coordinate>,
    tiles: TileSource,
}

impl MapView {
    pub fn new(center: Coordinate, zoom: u8, tiles: TileSource) -> Self {
        Self {
            center,
            zoom: zoom.min(MAX_ZOOM),
            marker: None,
            tiles,
        }
    }

    pub fn from_config(cfg: &MapConfig) -> Self {
        Self::new(
            Coordinate::new(cfg.latitude, cfg.longitude),
            cfg.zoom,
            TileSource {
                url_template: cfg.tile_url.clone(),
                attribution: cfg.attribution.clone(),
            },
        )
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn marker(&self) -> Option<Coordinate> {
        self.marker
    }

    pub fn tiles(&self) -> &TileSource {
        &self.tiles
    }

    /// Follow a new weather result: recenter on its coordinate and move the
    /// marker there. Results without a coordinate leave the view untouched.
    ///
    /// Returns whether the view moved.
    pub fn sync(&mut self, weather: &WeatherResult) -> bool {
        let Some(coord) = weather.coord else {
            debug!(location = %weather.name, "weather result has no coordinate; map unchanged");
            return false;
        };

        debug!(%coord, "updating map center");
        self.center = coord;
        self.zoom = RECENTER_ZOOM;
        self.marker = Some(coord);
        true
    }

    pub fn center_tile(&self) -> Tile {
        Tile::containing(self.center, self.zoom)
    }

    pub fn center_tile_url(&self) -> String {
        self.tiles.tile_url(self.center_tile())
    }

    /// openstreetmap.org link showing the current viewport and marker.
    pub fn share_link(&self) -> String {
        let view = format!(
            "#map={}/{:.5}/{:.5}",
            self.zoom, self.center.latitude, self.center.longitude
        );
        match self.marker {
            Some(m) => format!(
                "https://www.openstreetmap.org/?mlat={:.5}&mlon={:.5}{view}",
                m.latitude, m.longitude
            ),
            None => format!("https://www.openstreetmap.org/{view}"),
        }
    }
}

impl Default for MapView {
    fn default() -> Self {
        Self::new(DEFAULT_CENTER, DEFAULT_ZOOM, TileSource::default())
    }
}
