use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Square feet in one square metre.
pub const SQM_TO_SQFT: f64 = 10.764;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StockError {
    #[error("invalid tile size or quality combination: {size}, {quality}")]
    UnknownTile { size: String, quality: String },
    #[error("{0} must not be blank")]
    BlankField(&'static str),
}

/// Floor area covered by one box of tiles.
///
/// 600x1200 boxes of ECO and REJ grade hold three tiles instead of two.
pub fn sqm_per_box(size: &str, quality: &str) -> Result<f64, StockError> {
    let sqm = match size {
        "600x600" => 1.44,
        "600x1200" if matches!(quality, "ECO" | "REJ") => 2.16,
        "600x1200" => 1.44,
        "800x1600" => 2.56,
        "1200x1800" => 4.32,
        _ => {
            return Err(StockError::UnknownTile {
                size: size.to_string(),
                quality: quality.to_string(),
            })
        }
    };
    Ok(sqm)
}

/// Square metres in `boxes` boxes, rounded to two decimals.
pub fn boxes_to_sqm(size: &str, quality: &str, boxes: u32) -> Result<f64, StockError> {
    Ok(round2(f64::from(boxes) * sqm_per_box(size, quality)?))
}

pub fn sqm_to_sqft(sqm: f64) -> f64 {
    round2(sqm * SQM_TO_SQFT)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One batch of boxes coming off a production line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub size: String,
    pub thickness_mm: u32,
    pub quality: String,
    pub plant_code: String,
    pub boxes: u32,
}

impl ProductionRecord {
    /// Ledger key, e.g. `600x1200_9mm_ECO_P1`.
    pub fn stock_key(&self) -> String {
        format!(
            "{}_{}mm_{}_{}",
            self.size, self.thickness_mm, self.quality, self.plant_code
        )
    }

    fn validate(&self) -> Result<(), StockError> {
        if self.quality.trim().is_empty() {
            return Err(StockError::BlankField("quality"));
        }
        if self.plant_code.trim().is_empty() {
            return Err(StockError::BlankField("plant_code"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StockLevel {
    pub boxes: u64,
    pub sqm: f64,
    pub sqft: f64,
}

/// In-memory running totals per stock key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StockLedger {
    levels: BTreeMap<String, StockLevel>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch to its key's totals and returns the key with the new level.
    /// A rejected batch leaves the ledger untouched.
    pub fn add_production(
        &mut self,
        record: &ProductionRecord,
    ) -> Result<(String, StockLevel), StockError> {
        record.validate()?;
        let sqm = boxes_to_sqm(&record.size, &record.quality, record.boxes)?;
        let sqft = sqm_to_sqft(sqm);

        let key = record.stock_key();
        let level = self.levels.entry(key.clone()).or_default();
        level.boxes = level.boxes.saturating_add(u64::from(record.boxes));
        level.sqm = round2(level.sqm + sqm);
        level.sqft = round2(level.sqft + sqft);
        Ok((key, *level))
    }

    pub fn levels(&self) -> &BTreeMap<String, StockLevel> {
        &self.levels
    }

    pub fn get(&self, key: &str) -> Option<&StockLevel> {
        self.levels.get(key)
    }

    pub fn reset(&mut self) {
        self.levels.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
