//! Crop catalog: base temperatures, phenological stage tables and
//! NDVI calibration bands used by the GDD and productivity services.

use serde::{Deserialize, Serialize};

/// Supported crops
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Crop {
    Corn,
    Soybean,
    Wheat,
    Cotton,
    Sugarcane,
    Rice,
    Coffee,
    Orange,
}

/// A phenological stage reached at a cumulative GDD threshold
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PhenologicalStage {
    pub name: &'static str,
    pub gdd_threshold: f64,
    pub description: &'static str,
}

/// NDVI-to-yield calibration band
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CalibrationBand {
    pub ndvi_min: f64,
    pub ndvi_max: f64,
    pub yield_low: f64,
    pub yield_high: f64,
    pub label: &'static str,
}

impl CalibrationBand {
    /// Point estimate at the band midpoint
    pub fn midpoint(&self) -> f64 {
        (self.yield_low + self.yield_high) / 2.0
    }
}

impl Crop {
    pub const ALL: [Crop; 8] = [
        Crop::Corn,
        Crop::Soybean,
        Crop::Wheat,
        Crop::Cotton,
        Crop::Sugarcane,
        Crop::Rice,
        Crop::Coffee,
        Crop::Orange,
    ];

    /// Crops with yield calibration bands
    pub const WITH_CALIBRATION: [Crop; 4] = [Crop::Corn, Crop::Soybean, Crop::Wheat, Crop::Cotton];

    pub fn as_str(&self) -> &'static str {
        match self {
            Crop::Corn => "corn",
            Crop::Soybean => "soybean",
            Crop::Wheat => "wheat",
            Crop::Cotton => "cotton",
            Crop::Sugarcane => "sugarcane",
            Crop::Rice => "rice",
            Crop::Coffee => "coffee",
            Crop::Orange => "orange",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Crop::Corn => "Corn",
            Crop::Soybean => "Soybean",
            Crop::Wheat => "Wheat",
            Crop::Cotton => "Cotton",
            Crop::Sugarcane => "Sugarcane",
            Crop::Rice => "Rice",
            Crop::Coffee => "Coffee",
            Crop::Orange => "Orange",
        }
    }

    pub fn parse(value: &str) -> Option<Crop> {
        match value.to_ascii_lowercase().as_str() {
            "corn" | "milho" => Some(Crop::Corn),
            "soybean" | "soja" => Some(Crop::Soybean),
            "wheat" | "trigo" => Some(Crop::Wheat),
            "cotton" | "algodao" => Some(Crop::Cotton),
            "sugarcane" | "cana" => Some(Crop::Sugarcane),
            "rice" | "arroz" => Some(Crop::Rice),
            "coffee" | "cafe" => Some(Crop::Coffee),
            "orange" | "laranja" => Some(Crop::Orange),
            _ => None,
        }
    }

    /// Base temperature for GDD accumulation (°C)
    pub fn base_temperature(&self) -> f64 {
        match self {
            Crop::Corn => 10.0,
            Crop::Soybean => 7.0,
            Crop::Wheat => 5.0,
            Crop::Cotton => 12.0,
            Crop::Sugarcane => 18.0,
            Crop::Rice => 10.0,
            Crop::Coffee => 8.0,
            Crop::Orange => 12.0,
        }
    }

    /// Maximum plausible yield (t/ha), used to clamp model predictions
    pub fn max_yield(&self) -> f64 {
        match self {
            Crop::Corn => 16.0,
            Crop::Soybean => 6.0,
            Crop::Wheat => 9.0,
            Crop::Cotton => 7.0,
            Crop::Sugarcane => 120.0,
            Crop::Rice => 12.0,
            Crop::Coffee => 4.0,
            Crop::Orange => 50.0,
        }
    }

    /// Phenological stages, ordered by cumulative GDD threshold
    pub fn phenological_stages(&self) -> &'static [PhenologicalStage] {
        match self {
            Crop::Corn => &[
                PhenologicalStage { name: "Emergence", gdd_threshold: 100.0, description: "Seedlings emerging from the soil" },
                PhenologicalStage { name: "V3 (3 leaves)", gdd_threshold: 200.0, description: "Early vegetative stage" },
                PhenologicalStage { name: "V6 (6 leaves)", gdd_threshold: 350.0, description: "Vegetative growth" },
                PhenologicalStage { name: "Flowering (R1)", gdd_threshold: 800.0, description: "Start of flowering, critical for irrigation" },
                PhenologicalStage { name: "Grain fill (R3)", gdd_threshold: 1100.0, description: "Grain filling phase" },
                PhenologicalStage { name: "Physiological maturity (R6)", gdd_threshold: 1400.0, description: "Ready for harvest" },
            ],
            Crop::Soybean => &[
                PhenologicalStage { name: "Emergence (VE)", gdd_threshold: 70.0, description: "Seedlings emerging" },
                PhenologicalStage { name: "V3 (3 trifoliates)", gdd_threshold: 150.0, description: "Vegetative stage" },
                PhenologicalStage { name: "V6 (6 trifoliates)", gdd_threshold: 300.0, description: "Vegetative growth" },
                PhenologicalStage { name: "Flowering (R1)", gdd_threshold: 600.0, description: "First open flower" },
                PhenologicalStage { name: "Full pod (R3)", gdd_threshold: 900.0, description: "Pods with visible seeds" },
                PhenologicalStage { name: "Beginning maturity (R7)", gdd_threshold: 1200.0, description: "Yellowing seeds" },
            ],
            Crop::Wheat => &[
                PhenologicalStage { name: "Emergence", gdd_threshold: 80.0, description: "Seedlings emerging" },
                PhenologicalStage { name: "Tillering", gdd_threshold: 250.0, description: "Start of tillering" },
                PhenologicalStage { name: "Booting", gdd_threshold: 400.0, description: "Stem elongation" },
                PhenologicalStage { name: "Flowering", gdd_threshold: 550.0, description: "Flowering, frost sensitive" },
                PhenologicalStage { name: "Grain fill", gdd_threshold: 800.0, description: "Grain formation" },
                PhenologicalStage { name: "Maturity", gdd_threshold: 1100.0, description: "Ready for harvest" },
            ],
            Crop::Cotton => &[
                PhenologicalStage { name: "Emergence", gdd_threshold: 50.0, description: "Seedlings emerging" },
                PhenologicalStage { name: "White flower", gdd_threshold: 400.0, description: "First open flower" },
                PhenologicalStage { name: "Colored flower", gdd_threshold: 600.0, description: "Active flowering" },
                PhenologicalStage { name: "Open boll", gdd_threshold: 1100.0, description: "Bolls beginning to open" },
                PhenologicalStage { name: "Harvest", gdd_threshold: 1400.0, description: "Ready for harvest" },
            ],
            Crop::Sugarcane => &[
                PhenologicalStage { name: "Emergence", gdd_threshold: 150.0, description: "Sprouting" },
                PhenologicalStage { name: "Tillering", gdd_threshold: 500.0, description: "Tiller formation" },
                PhenologicalStage { name: "Grand growth", gdd_threshold: 1000.0, description: "Rapid growth phase" },
                PhenologicalStage { name: "Lodging", gdd_threshold: 1500.0, description: "Start of lodging" },
                PhenologicalStage { name: "Maturity", gdd_threshold: 2000.0, description: "Sugar accumulated" },
            ],
            Crop::Rice => &[
                PhenologicalStage { name: "Emergence", gdd_threshold: 60.0, description: "Seedlings emerging" },
                PhenologicalStage { name: "Tillering", gdd_threshold: 200.0, description: "Start of tillering" },
                PhenologicalStage { name: "Flowering", gdd_threshold: 450.0, description: "Flowering" },
                PhenologicalStage { name: "Milk stage", gdd_threshold: 700.0, description: "Milky grain" },
                PhenologicalStage { name: "Maturity", gdd_threshold: 1000.0, description: "Ready for harvest" },
            ],
            Crop::Coffee => &[
                PhenologicalStage { name: "Floral budding", gdd_threshold: 100.0, description: "Floral bud break" },
                PhenologicalStage { name: "Main flowering", gdd_threshold: 400.0, description: "Intense flowering" },
                PhenologicalStage { name: "Green fruit", gdd_threshold: 800.0, description: "Fruit development" },
                PhenologicalStage { name: "Ripening fruit", gdd_threshold: 1200.0, description: "Color change" },
                PhenologicalStage { name: "Harvest", gdd_threshold: 1500.0, description: "Ripe cherry" },
            ],
            Crop::Orange => &[
                PhenologicalStage { name: "Budding", gdd_threshold: 150.0, description: "New flush" },
                PhenologicalStage { name: "Flowering", gdd_threshold: 400.0, description: "Flowering" },
                PhenologicalStage { name: "Small fruit", gdd_threshold: 600.0, description: "Physiological drop" },
                PhenologicalStage { name: "Fruit growth", gdd_threshold: 1000.0, description: "Size increase" },
                PhenologicalStage { name: "Maturity", gdd_threshold: 1400.0, description: "Ripe fruit" },
            ],
        }
    }

    /// NDVI calibration bands (t/ha), highest band first.
    /// Only the four calibrated annual crops have them.
    pub fn calibration_bands(&self) -> Option<&'static [CalibrationBand]> {
        match self {
            Crop::Corn => Some(&[
                CalibrationBand { ndvi_min: 0.8, ndvi_max: 1.0, yield_low: 12.0, yield_high: 14.0, label: "Excellent" },
                CalibrationBand { ndvi_min: 0.6, ndvi_max: 0.8, yield_low: 8.0, yield_high: 12.0, label: "Good" },
                CalibrationBand { ndvi_min: 0.4, ndvi_max: 0.6, yield_low: 5.0, yield_high: 8.0, label: "Average" },
                CalibrationBand { ndvi_min: 0.0, ndvi_max: 0.4, yield_low: 0.0, yield_high: 5.0, label: "Low" },
            ]),
            Crop::Soybean => Some(&[
                CalibrationBand { ndvi_min: 0.8, ndvi_max: 1.0, yield_low: 4.0, yield_high: 5.0, label: "Excellent" },
                CalibrationBand { ndvi_min: 0.6, ndvi_max: 0.8, yield_low: 2.5, yield_high: 4.0, label: "Good" },
                CalibrationBand { ndvi_min: 0.4, ndvi_max: 0.6, yield_low: 1.5, yield_high: 2.5, label: "Average" },
                CalibrationBand { ndvi_min: 0.0, ndvi_max: 0.4, yield_low: 0.0, yield_high: 1.5, label: "Low" },
            ]),
            Crop::Wheat => Some(&[
                CalibrationBand { ndvi_min: 0.8, ndvi_max: 1.0, yield_low: 6.0, yield_high: 8.0, label: "Excellent" },
                CalibrationBand { ndvi_min: 0.6, ndvi_max: 0.8, yield_low: 4.0, yield_high: 6.0, label: "Good" },
                CalibrationBand { ndvi_min: 0.4, ndvi_max: 0.6, yield_low: 2.0, yield_high: 4.0, label: "Average" },
                CalibrationBand { ndvi_min: 0.0, ndvi_max: 0.4, yield_low: 0.0, yield_high: 2.0, label: "Low" },
            ]),
            Crop::Cotton => Some(&[
                CalibrationBand { ndvi_min: 0.8, ndvi_max: 1.0, yield_low: 4.5, yield_high: 6.0, label: "Excellent" },
                CalibrationBand { ndvi_min: 0.6, ndvi_max: 0.8, yield_low: 3.0, yield_high: 4.5, label: "Good" },
                CalibrationBand { ndvi_min: 0.4, ndvi_max: 0.6, yield_low: 1.5, yield_high: 3.0, label: "Average" },
                CalibrationBand { ndvi_min: 0.0, ndvi_max: 0.4, yield_low: 0.0, yield_high: 1.5, label: "Low" },
            ]),
            _ => None,
        }
    }

    /// Find the calibration band containing an NDVI value
    pub fn calibration_band_for(&self, ndvi: f64) -> Option<&'static CalibrationBand> {
        self.calibration_bands()?
            .iter()
            .find(|band| ndvi >= band.ndvi_min && ndvi <= band.ndvi_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_english_and_portuguese_names() {
        assert_eq!(Crop::parse("corn"), Some(Crop::Corn));
        assert_eq!(Crop::parse("milho"), Some(Crop::Corn));
        assert_eq!(Crop::parse("SOJA"), Some(Crop::Soybean));
        assert_eq!(Crop::parse("banana"), None);
    }

    #[test]
    fn stages_are_sorted_by_threshold() {
        for crop in Crop::ALL {
            let stages = crop.phenological_stages();
            for pair in stages.windows(2) {
                assert!(
                    pair[0].gdd_threshold < pair[1].gdd_threshold,
                    "{:?} stages out of order",
                    crop
                );
            }
        }
    }

    #[test]
    fn calibration_bands_cover_unit_interval() {
        for crop in Crop::WITH_CALIBRATION {
            let bands = crop.calibration_bands().unwrap();
            for ndvi in [0.0, 0.15, 0.4, 0.55, 0.7, 0.85, 1.0] {
                assert!(
                    crop.calibration_band_for(ndvi).is_some(),
                    "{:?} missing band for {}",
                    crop,
                    ndvi
                );
            }
            // bands are contiguous and descending
            for pair in bands.windows(2) {
                assert!((pair[0].ndvi_min - pair[1].ndvi_max).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn band_midpoint_inside_interval() {
        let band = Crop::Corn.calibration_band_for(0.75).unwrap();
        assert_eq!(band.label, "Good");
        assert!(band.midpoint() >= band.yield_low && band.midpoint() <= band.yield_high);
    }
}
