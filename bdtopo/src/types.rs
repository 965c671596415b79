//! Types de données pour le crate bdtopo

use geo::{BoundingRect, EuclideanDistance, MultiPolygon, Point, Rect};
use geojson::JsonObject;
use serde_json::Value;

use crate::BdtopoError;

/// Résultat du parsing d'une réponse WFS
#[derive(Debug)]
pub struct ParseResult {
    /// Bâtiments valides
    pub buildings: BuildingCollection,

    /// Features ignorées (mode `skip_corrupted`)
    pub errors: Vec<BdtopoError>,
}

/// Options du parser GeoJSON
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Ignorer les features corrompues au lieu d'échouer
    pub skip_corrupted: bool,

    /// EPSG à utiliser quand la réponse ne déclare pas de CRS
    pub default_epsg: u32,

    /// Attribut portant l'identifiant unique
    pub id_field: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            skip_corrupted: true,
            default_epsg: 2154,
            id_field: "cleabs".to_string(),
        }
    }
}

/// Un bâtiment : emprise au sol et attributs BD TOPO
#[derive(Debug, Clone)]
pub struct Building {
    /// Identifiant unique (cleabs)
    pub id: String,

    /// Emprise, toujours normalisée en MultiPolygon
    pub geometry: MultiPolygon,

    /// Attributs bruts de la feature
    pub properties: JsonObject,
}

impl Building {
    /// Retourne un attribut sous forme texte (None si absent ou null)
    pub fn property_str(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Distance euclidienne d'un point à l'emprise (0 si le point est dedans)
    pub fn distance_to(&self, point: &Point) -> f64 {
        point.euclidean_distance(&self.geometry)
    }
}

/// Informations de projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    /// Code EPSG
    pub epsg: u32,

    /// Nom court
    pub name: &'static str,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            epsg: 2154, // Lambert-93 par défaut
            name: "LAMB93",
        }
    }
}

/// Collection de bâtiments dans une projection donnée
///
/// Remplacée en bloc à chaque récupération, jamais modifiée en place.
#[derive(Debug, Clone, Default)]
pub struct BuildingCollection {
    buildings: Vec<Building>,
    projection: Projection,
}

impl BuildingCollection {
    pub fn new(buildings: Vec<Building>, projection: Projection) -> Self {
        Self {
            buildings,
            projection,
        }
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn get(&self, index: usize) -> Option<&Building> {
        self.buildings.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Building> {
        self.buildings.iter()
    }

    /// Emprise totale de la collection (None si vide)
    pub fn bounds(&self) -> Option<Rect> {
        self.buildings
            .iter()
            .filter_map(|b| b.geometry.bounding_rect())
            .reduce(|acc, r| {
                Rect::new(
                    (acc.min().x.min(r.min().x), acc.min().y.min(r.min().y)),
                    (acc.max().x.max(r.max().x), acc.max().y.max(r.max().y)),
                )
            })
    }

    /// Bâtiment le plus proche d'un point : (index, distance)
    ///
    /// En cas d'égalité, le premier dans l'ordre de la collection l'emporte.
    pub fn nearest(&self, point: &Point) -> Option<(usize, f64)> {
        self.buildings
            .iter()
            .enumerate()
            .map(|(i, b)| (i, b.distance_to(point)))
            .fold(None, |best, (i, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((i, d)),
            })
    }

    /// Sous-collection d'un seul bâtiment
    pub fn subset(&self, index: usize) -> Option<BuildingCollection> {
        let building = self.buildings.get(index)?.clone();
        Some(Self::new(vec![building], self.projection))
    }
}

impl<'a> IntoIterator for &'a BuildingCollection {
    type Item = &'a Building;
    type IntoIter = std::slice::Iter<'a, Building>;

    fn into_iter(self) -> Self::IntoIter {
        self.buildings.iter()
    }
}
