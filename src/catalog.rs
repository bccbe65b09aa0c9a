use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Page size used when a search does not ask for one.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub path: String,
}

/// Static hotel record as it appears in the catalog data file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hotel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub created: i64,
    pub modified: i64,
    pub address1: String,
    pub airport_code: String,
    pub amenity_mask: u64,
    pub city: String,
    pub confidence_rating: i32,
    pub country_code: String,
    pub deep_link: String,
    pub high_rate: f64,
    pub hotel_id: i64,
    pub hotel_in_destination: bool,
    pub hotel_rating: f64,
    pub location: Location,
    pub location_description: String,
    pub low_rate: f64,
    pub metadata: Metadata,
    pub postal_code: String,
    pub property_category: i32,
    pub proximity_distance: f64,
    pub proximity_unit: String,
    pub rate_currency_code: String,
    pub short_description: String,
    pub state_province_code: String,
    pub thumb_nail_url: String,
    pub trip_advisor_rating: f64,
    pub trip_advisor_rating_url: String,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    hotels: Vec<Hotel>,
}

/// Optional filters for [`HotelCatalog::search`]. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParams {
    pub name: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub amenity_mask: Option<u64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl SearchParams {
    fn matches(&self, hotel: &Hotel, name_lower: Option<&str>, city_lower: Option<&str>) -> bool {
        if let Some(needle) = name_lower
            && !hotel.name.to_lowercase().contains(needle)
        {
            return false;
        }
        if let Some(city) = city_lower
            && hotel.city.to_lowercase() != city
        {
            return false;
        }
        if let Some(cc) = &self.country_code
            && hotel.country_code != *cc
        {
            return false;
        }
        if self.min_rate.is_some_and(|min| hotel.low_rate < min) {
            return false;
        }
        if self.max_rate.is_some_and(|max| hotel.high_rate > max) {
            return false;
        }
        if self.min_rating.is_some_and(|min| hotel.hotel_rating < min) {
            return false;
        }
        if self.max_rating.is_some_and(|max| hotel.hotel_rating > max) {
            return false;
        }
        if let Some(mask) = self.amenity_mask
            && hotel.amenity_mask & mask != mask
        {
            return false;
        }
        true
    }
}

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "error reading catalog: {e}"),
            CatalogError::Parse(e) => write!(f, "error parsing catalog: {e}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io(e) => Some(e),
            CatalogError::Parse(e) => Some(e),
        }
    }
}

/// Read-only hotel lookup table. Built once, never mutated, shared freely.
#[derive(Debug, Default)]
pub struct HotelCatalog {
    hotels: Vec<Hotel>,
    /// hotel id → position in `hotels`
    index: HashMap<String, usize>,
}

impl HotelCatalog {
    pub fn from_hotels(hotels: Vec<Hotel>) -> Self {
        let mut index = HashMap::with_capacity(hotels.len());
        for (pos, hotel) in hotels.iter().enumerate() {
            // First occurrence wins on duplicate ids.
            index.entry(hotel.id.clone()).or_insert(pos);
        }
        Self { hotels, index }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json).map_err(CatalogError::Parse)?;
        Ok(Self::from_hotels(file.hotels))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(CatalogError::Io)?;
        Self::from_json(&raw)
    }

    pub fn lookup(&self, hotel_id: &str) -> Option<&Hotel> {
        self.index.get(hotel_id).map(|&pos| &self.hotels[pos])
    }

    pub fn hotels(&self) -> &[Hotel] {
        &self.hotels
    }

    pub fn len(&self) -> usize {
        self.hotels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hotels.is_empty()
    }

    /// Linear filter in catalog order, then `offset`/`limit` paging.
    pub fn search(&self, params: &SearchParams) -> Vec<Hotel> {
        let name_lower = params.name.as_ref().map(|n| n.to_lowercase());
        let city_lower = params.city.as_ref().map(|c| c.to_lowercase());
        let limit = match params.limit {
            Some(0) | None => DEFAULT_SEARCH_LIMIT,
            Some(n) => n,
        };
        self.hotels
            .iter()
            .filter(|h| params.matches(h, name_lower.as_deref(), city_lower.as_deref()))
            .skip(params.offset.unwrap_or(0))
            .take(limit)
            .cloned()
            .collect()
    }
}
