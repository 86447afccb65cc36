use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Spanish tax regions as they appear as keys in a tax pack.
///
/// País Vasco is split into its three foral territories, each with its own
/// schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    Andalucia,
    Aragon,
    Asturias,
    IllesBalears,
    Canarias,
    Cantabria,
    CastillaLaMancha,
    CastillaYLeon,
    Cataluna,
    ComunitatValenciana,
    Extremadura,
    Galicia,
    Madrid,
    Murcia,
    LaRioja,
    Ceuta,
    Melilla,
    Navarra,
    PaisVascoAlava,
    PaisVascoBizkaia,
    PaisVascoGipuzkoa,
}

/// Which IRPF framework a region falls under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxSystem {
    Common,
    Foral,
}

impl Region {
    pub const ALL: [Region; 21] = [
        Region::Andalucia,
        Region::Aragon,
        Region::Asturias,
        Region::IllesBalears,
        Region::Canarias,
        Region::Cantabria,
        Region::CastillaLaMancha,
        Region::CastillaYLeon,
        Region::Cataluna,
        Region::ComunitatValenciana,
        Region::Extremadura,
        Region::Galicia,
        Region::Madrid,
        Region::Murcia,
        Region::LaRioja,
        Region::Ceuta,
        Region::Melilla,
        Region::Navarra,
        Region::PaisVascoAlava,
        Region::PaisVascoBizkaia,
        Region::PaisVascoGipuzkoa,
    ];

    /// Territories with their own (foral) IRPF schedules
    pub const FORAL: [Region; 4] = [
        Region::Navarra,
        Region::PaisVascoAlava,
        Region::PaisVascoBizkaia,
        Region::PaisVascoGipuzkoa,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Region::Andalucia => "andalucia",
            Region::Aragon => "aragon",
            Region::Asturias => "asturias",
            Region::IllesBalears => "illes-balears",
            Region::Canarias => "canarias",
            Region::Cantabria => "cantabria",
            Region::CastillaLaMancha => "castilla-la-mancha",
            Region::CastillaYLeon => "castilla-y-leon",
            Region::Cataluna => "cataluna",
            Region::ComunitatValenciana => "comunitat-valenciana",
            Region::Extremadura => "extremadura",
            Region::Galicia => "galicia",
            Region::Madrid => "madrid",
            Region::Murcia => "murcia",
            Region::LaRioja => "la-rioja",
            Region::Ceuta => "ceuta",
            Region::Melilla => "melilla",
            Region::Navarra => "navarra",
            Region::PaisVascoAlava => "pais-vasco-alava",
            Region::PaisVascoBizkaia => "pais-vasco-bizkaia",
            Region::PaisVascoGipuzkoa => "pais-vasco-gipuzkoa",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Region::Andalucia => "Andalucía",
            Region::Aragon => "Aragón",
            Region::Asturias => "Asturias",
            Region::IllesBalears => "Illes Balears",
            Region::Canarias => "Canarias",
            Region::Cantabria => "Cantabria",
            Region::CastillaLaMancha => "Castilla-La Mancha",
            Region::CastillaYLeon => "Castilla y León",
            Region::Cataluna => "Cataluña",
            Region::ComunitatValenciana => "Comunitat Valenciana",
            Region::Extremadura => "Extremadura",
            Region::Galicia => "Galicia",
            Region::Madrid => "Madrid",
            Region::Murcia => "Región de Murcia",
            Region::LaRioja => "La Rioja",
            Region::Ceuta => "Ceuta",
            Region::Melilla => "Melilla",
            Region::Navarra => "Navarra",
            Region::PaisVascoAlava => "País Vasco (Álava)",
            Region::PaisVascoBizkaia => "País Vasco (Bizkaia)",
            Region::PaisVascoGipuzkoa => "País Vasco (Gipuzkoa)",
        }
    }

    #[must_use]
    pub fn tax_system(self) -> TaxSystem {
        if Self::FORAL.contains(&self) {
            TaxSystem::Foral
        } else {
            TaxSystem::Common
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Region {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Region::ALL
            .iter()
            .copied()
            .find(|r| r.key() == needle)
            .ok_or_else(|| DataError::UnknownRegion(s.to_string()))
    }
}

/// The 17 autonomous communities a complete pack must cover.
///
/// Each entry maps to the pack keys that represent it; País Vasco needs all
/// three territories. Ceuta and Melilla are autonomous cities and optional.
pub const AUTONOMOUS_COMMUNITIES: [(&str, &[Region]); 17] = [
    ("Andalucía", &[Region::Andalucia]),
    ("Aragón", &[Region::Aragon]),
    ("Asturias", &[Region::Asturias]),
    ("Illes Balears", &[Region::IllesBalears]),
    ("Canarias", &[Region::Canarias]),
    ("Cantabria", &[Region::Cantabria]),
    ("Castilla-La Mancha", &[Region::CastillaLaMancha]),
    ("Castilla y León", &[Region::CastillaYLeon]),
    ("Cataluña", &[Region::Cataluna]),
    ("Comunitat Valenciana", &[Region::ComunitatValenciana]),
    ("Extremadura", &[Region::Extremadura]),
    ("Galicia", &[Region::Galicia]),
    ("Madrid", &[Region::Madrid]),
    ("Región de Murcia", &[Region::Murcia]),
    ("La Rioja", &[Region::LaRioja]),
    ("Navarra", &[Region::Navarra]),
    (
        "País Vasco",
        &[
            Region::PaisVascoAlava,
            Region::PaisVascoBizkaia,
            Region::PaisVascoGipuzkoa,
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trips_through_from_str() {
        for region in Region::ALL {
            assert_eq!(region.key().parse::<Region>().unwrap(), region);
        }
    }

    #[test]
    fn test_serde_key_matches_key() {
        for region in Region::ALL {
            let json = serde_json::to_string(&region).unwrap();
            assert_eq!(json, format!("\"{}\"", region.key()));
        }
    }

    #[test]
    fn test_unknown_region_is_an_error() {
        let err = "atlantis".parse::<Region>().unwrap_err();
        assert!(matches!(err, DataError::UnknownRegion(k) if k == "atlantis"));
    }

    #[test]
    fn test_foral_system() {
        assert_eq!(Region::Navarra.tax_system(), TaxSystem::Foral);
        assert_eq!(Region::PaisVascoBizkaia.tax_system(), TaxSystem::Foral);
        assert_eq!(Region::Madrid.tax_system(), TaxSystem::Common);
    }

    #[test]
    fn test_communities_cover_every_non_city_region() {
        let covered: Vec<Region> = AUTONOMOUS_COMMUNITIES
            .iter()
            .flat_map(|(_, keys)| keys.iter().copied())
            .collect();
        assert_eq!(covered.len(), 19);
        for region in Region::ALL {
            let is_city = matches!(region, Region::Ceuta | Region::Melilla);
            assert_eq!(covered.contains(&region), !is_city, "{region}");
        }
    }
}
