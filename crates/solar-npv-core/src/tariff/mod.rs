pub mod schedule;

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SolarNpvError;
use crate::types::{Kwp, Rate};
use crate::SolarNpvResult;

pub use schedule::{CapacityBands, RateSchedule, RowKey, ScheduleRow};

const BUNDLED_RECENT: &str = include_str!("../../data/fits_recent.csv");
const BUNDLED_RETROFIT: &str = include_str!("../../data/fits_retrofit.csv");

pub const RECENT_FILE_NAME: &str = "fits_recent.csv";
pub const RETROFIT_FILE_NAME: &str = "fits_retrofit.csv";

/// Installations commissioned on or after this date use the recent schedule.
pub const RECENT_SCHEDULE_CUTOFF: NaiveDate = match NaiveDate::from_ymd_opt(2012, 4, 1) {
    Some(date) => date,
    None => panic!("recent schedule cutoff is not a valid date"),
};

/// The applicable tariff for one installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffQuote {
    pub schedule: String,
    pub band_index: usize,
    /// Upper threshold of the selected band, kWp
    pub band_upper_kwp: Kwp,
    /// Tabulated rate, pence per kWh
    pub pence_per_kwh: Rate,
    /// Rate in currency units per kWh (pence / 100)
    pub rate: Rate,
}

/// Both feed-in tariff schedules plus the date that separates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffTables {
    pub recent: RateSchedule,
    pub retrofit: RateSchedule,
    pub cutoff: NaiveDate,
}

impl TariffTables {
    pub fn new(recent: RateSchedule, retrofit: RateSchedule) -> Self {
        Self {
            recent,
            retrofit,
            cutoff: RECENT_SCHEDULE_CUTOFF,
        }
    }

    /// Tables compiled into the binary.
    pub fn bundled() -> SolarNpvResult<Self> {
        let recent = RateSchedule::from_csv("recent", RowKey::Month, BUNDLED_RECENT.as_bytes())?;
        let retrofit =
            RateSchedule::from_csv("retrofit", RowKey::EffectiveDate, BUNDLED_RETROFIT.as_bytes())?;
        Ok(Self::new(recent, retrofit))
    }

    /// Load `fits_recent.csv` and `fits_retrofit.csv` from a directory.
    pub fn from_dir(dir: &Path) -> SolarNpvResult<Self> {
        let open = |name: &str| {
            let path = dir.join(name);
            File::open(&path).map_err(|e| {
                SolarNpvError::TableFormat(format!("cannot open '{}': {e}", path.display()))
            })
        };
        let recent = RateSchedule::from_csv("recent", RowKey::Month, open(RECENT_FILE_NAME)?)?;
        let retrofit =
            RateSchedule::from_csv("retrofit", RowKey::EffectiveDate, open(RETROFIT_FILE_NAME)?)?;
        debug!(dir = %dir.display(), "loaded tariff tables");
        Ok(Self::new(recent, retrofit))
    }

    /// Select the schedule, band and row for an installation.
    pub fn quote(&self, commissioning_date: NaiveDate, size: Kwp) -> SolarNpvResult<TariffQuote> {
        let (schedule, band, pence) = if commissioning_date >= self.cutoff {
            let band = self.recent.band_for(size)?;
            let pence = self.recent.rate_for_month(commissioning_date, band)?;
            (&self.recent, band, pence)
        } else {
            let band = self.retrofit.band_for(size)?;
            let pence = self.retrofit.rate_in_effect(commissioning_date, band)?;
            (&self.retrofit, band, pence)
        };
        let quote = TariffQuote {
            schedule: schedule.name.clone(),
            band_index: band,
            band_upper_kwp: schedule.bands.thresholds()[band],
            pence_per_kwh: pence,
            rate: pence / dec!(100),
        };
        debug!(
            schedule = %quote.schedule,
            band = quote.band_index,
            pence = %quote.pence_per_kwh,
            "identified feed-in tariff"
        );
        Ok(quote)
    }

    /// Applicable tariff as a fraction (rate / 100).
    pub fn identify_fit(&self, commissioning_date: NaiveDate, size: Kwp) -> SolarNpvResult<Rate> {
        self.quote(commissioning_date, size).map(|q| q.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bundled_tables_load() {
        let tables = TariffTables::bundled().unwrap();
        assert_eq!(tables.recent.rows().len(), 84);
        assert_eq!(tables.retrofit.rows().len(), 4);
        assert_eq!(tables.recent.bands, tables.retrofit.bands);
    }

    #[test]
    fn test_recent_schedule_lookup() {
        let tables = TariffTables::bundled().unwrap();
        let q = tables.quote(date(2018, 6, 9), dec!(3)).unwrap();
        assert_eq!(q.schedule, "recent");
        assert_eq!(q.band_index, 0);
        assert_eq!(q.pence_per_kwh, dec!(3.93));
        assert_eq!(q.rate, dec!(0.0393));
    }

    #[test]
    fn test_cutoff_date_uses_recent_schedule() {
        let tables = TariffTables::bundled().unwrap();
        assert_eq!(RECENT_SCHEDULE_CUTOFF, date(2012, 4, 1));
        assert_eq!(tables.cutoff, RECENT_SCHEDULE_CUTOFF);
        assert_eq!(
            tables.identify_fit(date(2012, 4, 1), dec!(4)).unwrap(),
            dec!(0.21)
        );
        assert_eq!(tables.quote(date(2012, 3, 31), dec!(4)).unwrap().schedule, "retrofit");
    }

    #[test]
    fn test_retrofit_schedule_lookup() {
        let tables = TariffTables::bundled().unwrap();
        assert_eq!(
            tables.identify_fit(date(2011, 5, 20), dec!(3)).unwrap(),
            dec!(0.454)
        );
        assert_eq!(
            tables.identify_fit(date(2012, 1, 10), dec!(2.5)).unwrap(),
            dec!(0.21)
        );
        // 4-10 kWp band changed on 2010-04-01
        assert_eq!(
            tables.identify_fit(date(2010, 4, 1), dec!(6)).unwrap(),
            dec!(0.396)
        );
    }

    #[test]
    fn test_lookup_out_of_range() {
        let tables = TariffTables::bundled().unwrap();
        assert!(matches!(
            tables.identify_fit(date(2019, 4, 1), dec!(3)),
            Err(SolarNpvError::TariffLookup { .. })
        ));
        assert!(matches!(
            tables.identify_fit(date(2009, 7, 14), dec!(3)),
            Err(SolarNpvError::TariffLookup { .. })
        ));
        assert!(matches!(
            tables.identify_fit(date(2018, 6, 9), dec!(5000.5)),
            Err(SolarNpvError::TariffLookup { .. })
        ));
    }
}
