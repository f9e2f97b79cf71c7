use std::io::Read;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SolarNpvError;
use crate::types::Kwp;
use crate::SolarNpvResult;

// ---------------------------------------------------------------------------
// Capacity bands
// ---------------------------------------------------------------------------

/// Ascending upper capacity thresholds (kWp). Band `i` covers sizes in
/// `(thresholds[i-1], thresholds[i]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityBands {
    thresholds: Vec<Kwp>,
}

impl CapacityBands {
    pub fn new(thresholds: Vec<Kwp>) -> SolarNpvResult<Self> {
        if thresholds.is_empty() {
            return Err(SolarNpvError::TableFormat(
                "at least one capacity threshold is required".into(),
            ));
        }
        if thresholds[0] <= Decimal::ZERO {
            return Err(SolarNpvError::TableFormat(format!(
                "capacity thresholds must be positive, found {}",
                thresholds[0]
            )));
        }
        if let Some(w) = thresholds.windows(2).find(|w| w[0] >= w[1]) {
            return Err(SolarNpvError::TableFormat(format!(
                "capacity thresholds must be strictly ascending ({} then {})",
                w[0], w[1]
            )));
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &[Kwp] {
        &self.thresholds
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Number of thresholds strictly below `size`. A size equal to a
    /// threshold stays in the lower band.
    pub fn band_index(&self, size: Kwp) -> Option<usize> {
        let index = self.thresholds.iter().filter(|t| **t < size).count();
        (index < self.thresholds.len()).then_some(index)
    }
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

/// One row of a rate schedule: a date key and a rate (p/kWh) per band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub key: NaiveDate,
    pub rates: Vec<Decimal>,
}

/// How the first column of a schedule file is keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKey {
    /// `YYYY-MM`, one row per eligibility month
    Month,
    /// `YYYY-MM-DD`, row applies from this date onwards
    EffectiveDate,
}

impl RowKey {
    fn parse(self, raw: &str) -> SolarNpvResult<NaiveDate> {
        let raw = raw.trim();
        let parsed = match self {
            RowKey::Month => NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"),
            RowKey::EffectiveDate => NaiveDate::parse_from_str(raw, "%Y-%m-%d"),
        };
        parsed.map_err(|e| SolarNpvError::TableFormat(format!("invalid row key '{raw}': {e}")))
    }
}

/// A tariff schedule: capacity bands by date-keyed rows, in pence per kWh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSchedule {
    pub name: String,
    pub key: RowKey,
    pub bands: CapacityBands,
    rows: Vec<ScheduleRow>,
}

impl RateSchedule {
    pub fn new(
        name: &str,
        key: RowKey,
        bands: CapacityBands,
        rows: Vec<ScheduleRow>,
    ) -> SolarNpvResult<Self> {
        if rows.is_empty() {
            return Err(SolarNpvError::TableFormat(format!(
                "{name} schedule has no rows"
            )));
        }
        for row in &rows {
            if row.rates.len() != bands.len() {
                return Err(SolarNpvError::TableFormat(format!(
                    "{name} schedule row {} has {} rates for {} bands",
                    row.key,
                    row.rates.len(),
                    bands.len()
                )));
            }
            if row.rates.iter().any(|r| r.is_sign_negative()) {
                return Err(SolarNpvError::TableFormat(format!(
                    "{name} schedule row {} has a negative rate",
                    row.key
                )));
            }
        }
        if let Some(w) = rows.windows(2).find(|w| w[0].key >= w[1].key) {
            return Err(SolarNpvError::TableFormat(format!(
                "{name} schedule rows must be strictly ascending ({} then {})",
                w[0].key, w[1].key
            )));
        }
        Ok(Self {
            name: name.to_string(),
            key,
            bands,
            rows,
        })
    }

    /// Parse a schedule from CSV. Lines starting with `#` are ignored; the
    /// header holds the key column name followed by the band thresholds.
    pub fn from_csv<R: Read>(name: &str, key: RowKey, reader: R) -> SolarNpvResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let thresholds = headers
            .iter()
            .skip(1)
            .map(|h| {
                Decimal::from_str(h).map_err(|e| {
                    SolarNpvError::TableFormat(format!(
                        "{name} schedule: invalid capacity threshold '{h}': {e}"
                    ))
                })
            })
            .collect::<SolarNpvResult<Vec<_>>>()?;
        let bands = CapacityBands::new(thresholds)?;

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let mut fields = record.iter();
            let key_field = fields.next().ok_or_else(|| {
                SolarNpvError::TableFormat(format!("{name} schedule: empty record"))
            })?;
            let row_key = key.parse(key_field)?;
            let rates = fields
                .map(|f| {
                    Decimal::from_str(f).map_err(|e| {
                        SolarNpvError::TableFormat(format!(
                            "{name} schedule row {row_key}: invalid rate '{f}': {e}"
                        ))
                    })
                })
                .collect::<SolarNpvResult<Vec<_>>>()?;
            rows.push(ScheduleRow { key: row_key, rates });
        }

        Self::new(name, key, bands, rows)
    }

    pub fn rows(&self) -> &[ScheduleRow] {
        &self.rows
    }

    /// Band for `size`, or a lookup error when it exceeds the top threshold.
    pub fn band_for(&self, size: Kwp) -> SolarNpvResult<usize> {
        if size <= Decimal::ZERO {
            return Err(self.lookup_error(format!("system size {size} kWp is not positive")));
        }
        self.bands.band_index(size).ok_or_else(|| {
            self.lookup_error(format!(
                "system size {size} kWp exceeds the largest band ({} kWp)",
                self.bands.thresholds()[self.bands.len() - 1]
            ))
        })
    }

    /// Rate for the row whose key falls in the same calendar month as `date`.
    pub fn rate_for_month(&self, date: NaiveDate, band: usize) -> SolarNpvResult<Decimal> {
        let target = (date.year(), date.month());
        let index = self
            .rows
            .binary_search_by_key(&target, |r| (r.key.year(), r.key.month()))
            .map_err(|_| {
                self.lookup_error(format!(
                    "no rates for {} (table covers {} to {})",
                    date.format("%Y-%m"),
                    self.first_key().format("%Y-%m"),
                    self.last_key().format("%Y-%m")
                ))
            })?;
        self.cell(&self.rows[index], band)
    }

    /// Rate from the last row whose effective date is on or before `date`.
    pub fn rate_in_effect(&self, date: NaiveDate, band: usize) -> SolarNpvResult<Decimal> {
        let count = self.rows.iter().filter(|r| r.key <= date).count();
        let row_index = count.checked_sub(1).ok_or_else(|| {
            self.lookup_error(format!(
                "{date} precedes the first effective date {}",
                self.first_key()
            ))
        })?;
        self.cell(&self.rows[row_index], band)
    }

    fn cell(&self, row: &ScheduleRow, band: usize) -> SolarNpvResult<Decimal> {
        row.rates.get(band).copied().ok_or_else(|| {
            self.lookup_error(format!("band {band} is outside row {}", row.key))
        })
    }

    fn first_key(&self) -> NaiveDate {
        self.rows[0].key
    }

    fn last_key(&self) -> NaiveDate {
        self.rows[self.rows.len() - 1].key
    }

    fn lookup_error(&self, reason: String) -> SolarNpvError {
        SolarNpvError::TariffLookup {
            schedule: self.name.clone(),
            reason,
        }
    }
}
