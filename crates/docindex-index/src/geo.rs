//! Geo index for one geo field.
//!
//! Points are stored as 52-bit interleaved geohashes (26 bits per axis)
//! alongside the parsed coordinates.

use std::collections::{BTreeMap, HashMap};

use docindex_types::DocId;

use crate::error::IndexError;

pub const LON_MIN: f64 = -180.0;
pub const LON_MAX: f64 = 180.0;
pub const LAT_MIN: f64 = -85.05112878;
pub const LAT_MAX: f64 = 85.05112878;

const STEP_BITS: u32 = 26;

fn quantize(value: f64, min: f64, max: f64) -> u64 {
    let scale = (1u64 << STEP_BITS) as f64;
    let cell = ((value - min) / (max - min) * scale) as u64;
    cell.min((1u64 << STEP_BITS) - 1)
}

/// Interleave longitude (even bits) and latitude (odd bits) cells.
pub fn encode_geohash(lon: f64, lat: f64) -> u64 {
    let x = quantize(lon, LON_MIN, LON_MAX);
    let y = quantize(lat, LAT_MIN, LAT_MAX);
    (0..STEP_BITS).fold(0u64, |hash, i| {
        hash | (((x >> i) & 1) << (2 * i)) | (((y >> i) & 1) << (2 * i + 1))
    })
}

fn parse_coord(raw: &str, what: &str, min: f64, max: f64) -> Result<f64, IndexError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| IndexError::InvalidGeo(format!("{} {:?} is not a number", what, raw)))?;
    if !(min..=max).contains(&value) {
        return Err(IndexError::InvalidGeo(format!(
            "{} {} out of range [{}, {}]",
            what, value, min, max
        )));
    }
    Ok(value)
}

/// Point index keyed by geohash.
#[derive(Debug, Default)]
pub struct GeoIndex {
    cells: BTreeMap<u64, Vec<DocId>>,
    points: HashMap<DocId, (f64, f64, u64)>,
}

impl GeoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and insert a point given as longitude and latitude strings.
    ///
    /// A document has at most one point per field; adding again moves it.
    pub fn add_strings(&mut self, doc_id: DocId, lon: &str, lat: &str) -> Result<u64, IndexError> {
        let lon = parse_coord(lon, "longitude", LON_MIN, LON_MAX)?;
        let lat = parse_coord(lat, "latitude", LAT_MIN, LAT_MAX)?;
        Ok(self.add(doc_id, lon, lat))
    }

    pub fn add(&mut self, doc_id: DocId, lon: f64, lat: f64) -> u64 {
        self.remove(doc_id);
        let hash = encode_geohash(lon, lat);
        self.cells.entry(hash).or_default().push(doc_id);
        self.points.insert(doc_id, (lon, lat, hash));
        hash
    }

    pub fn remove(&mut self, doc_id: DocId) -> bool {
        let Some((_, _, hash)) = self.points.remove(&doc_id) else {
            return false;
        };
        if let Some(docs) = self.cells.get_mut(&hash) {
            docs.retain(|id| *id != doc_id);
            if docs.is_empty() {
                self.cells.remove(&hash);
            }
        }
        true
    }

    /// Stored `(lon, lat)` of a document.
    pub fn position(&self, doc_id: DocId) -> Option<(f64, f64)> {
        self.points.get(&doc_id).map(|(lon, lat, _)| (*lon, *lat))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
