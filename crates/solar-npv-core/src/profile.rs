use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SolarNpvError;
use crate::types::Kwh;
use crate::SolarNpvResult;

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

/// UK region used to select a typical-year generation profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    EastOfEngland,
    EastMidlands,
    GreaterLondon,
    NorthEast,
    NorthWest,
    NorthernIreland,
    ScottishHighlandsAndIsles,
    ScotlandExclHighlandsAndIsles,
    SouthEast,
    SouthWest,
    Wales,
    WestMidlands,
    YorkshireAndTheHumber,
}

impl Region {
    /// Regions in identifier order (0..=12).
    pub const ALL: [Region; 13] = [
        Region::EastOfEngland,
        Region::EastMidlands,
        Region::GreaterLondon,
        Region::NorthEast,
        Region::NorthWest,
        Region::NorthernIreland,
        Region::ScottishHighlandsAndIsles,
        Region::ScotlandExclHighlandsAndIsles,
        Region::SouthEast,
        Region::SouthWest,
        Region::Wales,
        Region::WestMidlands,
        Region::YorkshireAndTheHumber,
    ];

    pub fn from_id(id: i64) -> SolarNpvResult<Self> {
        usize::try_from(id)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(SolarNpvError::InvalidRegion(id))
    }

    pub fn id(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::EastOfEngland => "East of England",
            Region::EastMidlands => "East Midlands",
            Region::GreaterLondon => "Greater London",
            Region::NorthEast => "North East",
            Region::NorthWest => "North West",
            Region::NorthernIreland => "Northern Ireland",
            Region::ScottishHighlandsAndIsles => "Scottish Highlands and Isles",
            Region::ScotlandExclHighlandsAndIsles => "Scotland excl. Highlands and Isles",
            Region::SouthEast => "South East",
            Region::SouthWest => "South West",
            Region::Wales => "Wales",
            Region::WestMidlands => "West Midlands",
            Region::YorkshireAndTheHumber => "Yorkshire and the Humber",
        }
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Typical generation per kWp for each calendar month, January first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProfile(pub [Kwh; 12]);

impl MonthlyProfile {
    /// Generation factor for a calendar month (1 = January).
    pub fn for_month(&self, month: u32) -> SolarNpvResult<Kwh> {
        month
            .checked_sub(1)
            .and_then(|i| self.0.get(i as usize))
            .copied()
            .ok_or_else(|| SolarNpvError::DateError(format!("month {month} is not in 1..=12")))
    }

    pub fn annual_total(&self) -> Kwh {
        self.0.iter().copied().sum()
    }
}

/// Monthly generation profiles for all 13 regions.
///
/// The calculator borrows this table rather than reading a global, so tests
/// can substitute their own figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalProfiles {
    profiles: [MonthlyProfile; 13],
}

impl RegionalProfiles {
    pub fn new(profiles: [MonthlyProfile; 13]) -> SolarNpvResult<Self> {
        for (id, profile) in profiles.iter().enumerate() {
            if profile.0.iter().any(|f| f.is_sign_negative()) {
                return Err(SolarNpvError::InvalidInput {
                    field: format!("profiles[{id}]"),
                    reason: "Generation factors must be non-negative".into(),
                });
            }
        }
        Ok(Self { profiles })
    }

    /// PVGIS typical-year figures in kWh per kWp per month.
    pub fn builtin() -> Self {
        Self {
            profiles: [
                MonthlyProfile([dec!(28.0), dec!(43.6), dec!(81.5), dec!(106.0), dec!(117.0), dec!(114.0), dec!(118.0), dec!(105.0), dec!(84.5), dec!(56.8), dec!(33.3), dec!(28.4)]),
                MonthlyProfile([dec!(28.9), dec!(45.5), dec!(81.4), dec!(105.0), dec!(118.0), dec!(115.0), dec!(117.0), dec!(106.0), dec!(85.5), dec!(57.8), dec!(35.7), dec!(29.4)]),
                MonthlyProfile([dec!(31.5), dec!(45.8), dec!(86.1), dec!(115.0), dec!(123.0), dec!(124.0), dec!(129.0), dec!(109.0), dec!(89.7), dec!(60.6), dec!(35.3), dec!(28.0)]),
                MonthlyProfile([dec!(25.0), dec!(43.5), dec!(80.3), dec!(108.0), dec!(125.0), dec!(113.0), dec!(113.0), dec!(98.8), dec!(82.3), dec!(55.8), dec!(28.7), dec!(19.6)]),
                MonthlyProfile([dec!(24.9), dec!(42.2), dec!(80.7), dec!(111.0), dec!(126.0), dec!(126.0), dec!(121.0), dec!(107.0), dec!(80.8), dec!(51.5), dec!(29.9), dec!(22.4)]),
                MonthlyProfile([dec!(24.8), dec!(39.8), dec!(74.4), dec!(107.0), dec!(121.0), dec!(114.0), dec!(107.0), dec!(93.7), dec!(75.1), dec!(49.3), dec!(30.1), dec!(20.9)]),
                MonthlyProfile([dec!(13.2), dec!(35.5), dec!(71.8), dec!(103.0), dec!(121.0), dec!(107.0), dec!(103.0), dec!(88.6), dec!(74.6), dec!(48.1), dec!(17.0), dec!(8.76)]),
                MonthlyProfile([dec!(24.4), dec!(43.2), dec!(79.0), dec!(106.0), dec!(126.0), dec!(112.0), dec!(113.0), dec!(100.0), dec!(82.3), dec!(54.3), dec!(28.9), dec!(17.1)]),
                MonthlyProfile([dec!(29.1), dec!(42.2), dec!(84.4), dec!(113.0), dec!(120.0), dec!(121.0), dec!(125.0), dec!(105.0), dec!(87.7), dec!(59.0), dec!(33.6), dec!(26.2)]),
                MonthlyProfile([dec!(32.4), dec!(48.2), dec!(89.2), dec!(116.0), dec!(123.0), dec!(125.0), dec!(119.0), dec!(107.0), dec!(93.4), dec!(60.9), dec!(37.3), dec!(29.2)]),
                MonthlyProfile([dec!(27.3), dec!(40.2), dec!(76.1), dec!(100.0), dec!(109.0), dec!(110.0), dec!(106.0), dec!(91.3), dec!(76.3), dec!(49.9), dec!(29.8), dec!(22.0)]),
                MonthlyProfile([dec!(31.8), dec!(44.8), dec!(86.1), dec!(112.0), dec!(122.0), dec!(124.0), dec!(125.0), dec!(107.0), dec!(87.4), dec!(58.5), dec!(33.5), dec!(27.7)]),
                MonthlyProfile([dec!(31.8), dec!(48.4), dec!(88.5), dec!(115.0), dec!(130.0), dec!(126.0), dec!(129.0), dec!(115.0), dec!(93.3), dec!(64.2), dec!(38.0), dec!(31.8)]),
            ],
        }
    }

    pub fn profile(&self, region: Region) -> &MonthlyProfile {
        &self.profiles[region.id()]
    }

    /// Look up a profile by raw region identifier.
    pub fn identify_profile(&self, id: i64) -> SolarNpvResult<&MonthlyProfile> {
        Region::from_id(id).map(|region| self.profile(region))
    }
}

impl Default for RegionalProfiles {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Uniform profile, handy for substitute tables.
pub fn flat_profile(factor: Kwh) -> MonthlyProfile {
    MonthlyProfile([factor; 12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_scottish_highlands_profile() {
        let profiles = RegionalProfiles::builtin();
        let p = profiles.identify_profile(6).unwrap();
        assert_eq!(
            p.0,
            [
                dec!(13.2),
                dec!(35.5),
                dec!(71.8),
                dec!(103.0),
                dec!(121.0),
                dec!(107.0),
                dec!(103.0),
                dec!(88.6),
                dec!(74.6),
                dec!(48.1),
                dec!(17.0),
                dec!(8.76)
            ]
        );
    }

    #[test]
    fn test_region_out_of_range() {
        let profiles = RegionalProfiles::builtin();
        assert!(matches!(
            profiles.identify_profile(13),
            Err(SolarNpvError::InvalidRegion(13))
        ));
        assert!(matches!(
            profiles.identify_profile(-1),
            Err(SolarNpvError::InvalidRegion(-1))
        ));
    }

    #[test]
    fn test_region_ids_round_trip() {
        for (i, region) in Region::ALL.iter().enumerate() {
            assert_eq!(region.id(), i);
            assert_eq!(Region::from_id(i as i64).unwrap(), *region);
        }
        assert_eq!(Region::from_id(1).unwrap().name(), "East Midlands");
    }

    #[test]
    fn test_for_month_bounds() {
        let p = RegionalProfiles::builtin();
        let east_midlands = p.profile(Region::EastMidlands);
        assert_eq!(east_midlands.for_month(1).unwrap(), dec!(28.9));
        assert_eq!(east_midlands.for_month(12).unwrap(), dec!(29.4));
        assert!(east_midlands.for_month(0).is_err());
        assert!(east_midlands.for_month(13).is_err());
    }

    #[test]
    fn test_annual_total() {
        let p = RegionalProfiles::builtin();
        assert_eq!(p.profile(Region::EastMidlands).annual_total(), dec!(925.2));
        assert_eq!(flat_profile(dec!(10)).annual_total(), dec!(120));
    }

    #[test]
    fn test_substitute_profiles_reject_negative_factors() {
        let mut rows = [flat_profile(dec!(10)); 13];
        assert!(RegionalProfiles::new(rows).is_ok());
        rows[4] = flat_profile(Decimal::NEGATIVE_ONE);
        assert!(RegionalProfiles::new(rows).is_err());
    }
}
