//! Versioned tax-rules data pack
//!
//! One pack per (country, year), stored as JSON. The field names follow the
//! published pack schema (camelCase). Region keys deserialize into
//! [`RegionMap`], which sets unrecognised keys aside for the validator instead
//! of rejecting the whole document.

use std::ops::{Deref, DerefMut};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::region::Region;

/// One marginal-rate tier. `up_to = None` marks the unbounded top bracket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    #[serde(rename = "upTo", default)]
    pub up_to: Option<f64>,
    pub rate: f64,
}

impl Bracket {
    #[must_use]
    pub const fn new(up_to: Option<f64>, rate: f64) -> Self {
        Self { up_to, rate }
    }
}

/// Map keyed by [`Region`] that remembers keys which did not name a region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMap<V> {
    entries: FxHashMap<Region, V>,
    unknown_keys: Vec<String>,
}

impl<V> RegionMap<V> {
    /// Keys present in the source document that are not region keys, sorted
    #[must_use]
    pub fn unknown_keys(&self) -> &[String] {
        &self.unknown_keys
    }
}

impl<V> Default for RegionMap<V> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
            unknown_keys: Vec::new(),
        }
    }
}

impl<V> Deref for RegionMap<V> {
    type Target = FxHashMap<Region, V>;

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl<V> DerefMut for RegionMap<V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entries
    }
}

impl<V: Serialize> Serialize for RegionMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for RegionMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = FxHashMap::<String, V>::deserialize(deserializer)?;
        let mut map = RegionMap::default();
        for (key, value) in raw {
            match key.parse::<Region>() {
                Ok(region) => {
                    map.entries.insert(region, value);
                }
                Err(_) => map.unknown_keys.push(key),
            }
        }
        map.unknown_keys.sort();
        Ok(map)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Provenance block. Every field is optional at parse time so that a pack with
/// gaps still loads and the validator can report all of them at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackMeta {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<SourceRef>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrpfGeneral {
    #[serde(default)]
    pub state_brackets: Vec<Bracket>,
    #[serde(default)]
    pub autonomous_brackets_by_region: RegionMap<Vec<Bracket>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrpfSavings {
    #[serde(default)]
    pub brackets: Vec<Bracket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrpfForal {
    #[serde(default)]
    pub brackets_by_region: RegionMap<Vec<Bracket>>,
    #[serde(default)]
    pub savings_brackets_by_region: RegionMap<Vec<Bracket>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Irpf {
    #[serde(default)]
    pub general: IrpfGeneral,
    #[serde(default)]
    pub savings: IrpfSavings,
    #[serde(default)]
    pub foral: IrpfForal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BonusMode {
    /// Flat percentage reduction of the computed wealth-tax quota
    FixedPct,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WealthBonus {
    pub mode: BonusMode,
    #[serde(default)]
    pub pct: f64,
}

/// Regional Impuesto sobre el Patrimonio rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WealthRules {
    #[serde(default)]
    pub min_exempt: f64,
    #[serde(default)]
    pub brackets: Vec<Bracket>,
    #[serde(default)]
    pub bonus: Option<WealthBonus>,
}

/// Impuesto de Solidaridad de las Grandes Fortunas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsgfRules {
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub min_exempt: f64,
    #[serde(default)]
    pub brackets: Vec<Bracket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wealth {
    #[serde(default)]
    pub regions: RegionMap<WealthRules>,
    #[serde(default)]
    pub isgf: IsgfRules,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxPack {
    #[serde(default)]
    pub meta: PackMeta,
    #[serde(default)]
    pub irpf: Irpf,
    #[serde(default)]
    pub wealth: Wealth,
}

/// Savings-base schedule a region resolves to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SavingsRegime<'a> {
    Foral(&'a [Bracket]),
    Common(&'a [Bracket]),
}

impl<'a> SavingsRegime<'a> {
    #[must_use]
    pub fn brackets(&self) -> &'a [Bracket] {
        match self {
            SavingsRegime::Foral(b) | SavingsRegime::Common(b) => b,
        }
    }

    #[must_use]
    pub fn system(&self) -> super::region::TaxSystem {
        match self {
            SavingsRegime::Foral(_) => super::region::TaxSystem::Foral,
            SavingsRegime::Common(_) => super::region::TaxSystem::Common,
        }
    }
}

/// Wealth-tax rules for a region, or an explicit absence of data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WealthRegime<'a> {
    Covered(&'a WealthRules),
    NotCovered,
}

impl TaxPack {
    /// Foral savings brackets win when the pack has a non-empty list for the
    /// region; everything else falls back to the common schedule.
    #[must_use]
    pub fn savings_regime(&self, region: Region) -> SavingsRegime<'_> {
        match self.irpf.foral.savings_brackets_by_region.get(&region) {
            Some(brackets) if !brackets.is_empty() => SavingsRegime::Foral(brackets),
            _ => SavingsRegime::Common(&self.irpf.savings.brackets),
        }
    }

    #[must_use]
    pub fn wealth_rules(&self, region: Region) -> WealthRegime<'_> {
        match self.wealth.regions.get(&region) {
            Some(rules) => WealthRegime::Covered(rules),
            None => WealthRegime::NotCovered,
        }
    }

    #[must_use]
    pub fn autonomous_brackets(&self, region: Region) -> Option<&[Bracket]> {
        self.irpf
            .general
            .autonomous_brackets_by_region
            .get(&region)
            .map(Vec::as_slice)
    }

    /// Unrecognised region keys, each with the path of the map holding it
    pub(crate) fn unknown_region_keys(&self) -> Vec<(&'static str, &str)> {
        let maps: [(&'static str, &[String]); 4] = [
            (
                "irpf.general.autonomousBracketsByRegion",
                self.irpf.general.autonomous_brackets_by_region.unknown_keys(),
            ),
            (
                "irpf.foral.bracketsByRegion",
                self.irpf.foral.brackets_by_region.unknown_keys(),
            ),
            (
                "irpf.foral.savingsBracketsByRegion",
                self.irpf.foral.savings_brackets_by_region.unknown_keys(),
            ),
            ("wealth.regions", self.wealth.regions.unknown_keys()),
        ];
        maps.into_iter()
            .flat_map(|(path, keys)| keys.iter().map(move |key| (path, key.as_str())))
            .collect()
    }

    /// Regions with an autonomous IRPF schedule, sorted by display label
    #[must_use]
    pub fn region_options(&self) -> Vec<(Region, &'static str)> {
        let mut options: Vec<_> = self
            .irpf
            .general
            .autonomous_brackets_by_region
            .keys()
            .map(|r| (*r, r.label()))
            .collect();
        options.sort_by(|a, b| a.1.cmp(b.1));
        options
    }
}
