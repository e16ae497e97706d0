//! Vegetation index catalog

use serde::{Deserialize, Serialize};

/// Supported vegetation indices computed from Sentinel-2 bands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum VegetationIndex {
    Ndvi,
    Ndre,
    Msavi,
}

/// Descriptive metadata for an index, served by the catalog endpoint
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub formula: &'static str,
    pub best_for: &'static str,
    pub limitation: &'static str,
    pub palette: [&'static str; 3],
    pub range: [f64; 2],
}

impl VegetationIndex {
    pub const ALL: [VegetationIndex; 3] =
        [VegetationIndex::Ndvi, VegetationIndex::Ndre, VegetationIndex::Msavi];

    pub fn as_str(&self) -> &'static str {
        match self {
            VegetationIndex::Ndvi => "NDVI",
            VegetationIndex::Ndre => "NDRE",
            VegetationIndex::Msavi => "MSAVI",
        }
    }

    pub fn parse(value: &str) -> Option<VegetationIndex> {
        match value.to_ascii_uppercase().as_str() {
            "NDVI" => Some(VegetationIndex::Ndvi),
            "NDRE" => Some(VegetationIndex::Ndre),
            "MSAVI" => Some(VegetationIndex::Msavi),
            _ => None,
        }
    }

    pub fn info(&self) -> IndexInfo {
        match self {
            VegetationIndex::Ndvi => IndexInfo {
                code: "NDVI",
                name: "Normalized Difference Vegetation Index",
                formula: "(B8 - B4) / (B8 + B4)",
                best_for: "Continuous crop monitoring, general use",
                limitation: "Saturates over dense canopies (NDVI > 0.8)",
                palette: ["red", "yellow", "green"],
                range: [-1.0, 1.0],
            },
            VegetationIndex::Ndre => IndexInfo {
                code: "NDRE",
                name: "Normalized Difference Red Edge",
                formula: "(B8 - B5) / (B8 + B5)",
                best_for: "Chlorophyll detection in dense canopies, late stages (R3-R6)",
                limitation: "Requires a red-edge band (modern sensors only)",
                palette: ["brown", "yellow", "darkgreen"],
                range: [-1.0, 1.0],
            },
            VegetationIndex::Msavi => IndexInfo {
                code: "MSAVI",
                name: "Modified Soil Adjusted Vegetation Index",
                formula: "(2*NIR + 1 - sqrt((2*NIR+1)^2 - 8*(NIR-Red))) / 2",
                best_for: "Early stages (V2-V6) with exposed soil, sparse vegetation",
                limitation: "More expensive to compute",
                palette: ["red", "orange", "darkgreen"],
                range: [-1.0, 1.0],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(VegetationIndex::parse("ndvi"), Some(VegetationIndex::Ndvi));
        assert_eq!(VegetationIndex::parse("NdRe"), Some(VegetationIndex::Ndre));
        assert_eq!(VegetationIndex::parse("evi"), None);
    }
}
