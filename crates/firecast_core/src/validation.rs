//! Tax pack quality checks
//!
//! Validators never fail; they return human-readable findings so an operator
//! can fix every problem of a pack in one pass.

use crate::model::{AUTONOMOUS_COMMUNITIES, Bracket, Region, TaxPack};

/// Check that every region key names a region, that every autonomous
/// community has IRPF and wealth entries and that the foral territories carry
/// both foral schedules.
#[must_use]
pub fn validate_coverage(pack: &TaxPack) -> Vec<String> {
    let mut errors: Vec<String> = pack
        .unknown_region_keys()
        .into_iter()
        .map(|(path, key)| format!("Unknown region key '{key}' in {path}"))
        .collect();

    for (community, regions) in AUTONOMOUS_COMMUNITIES {
        for region in regions {
            let has_irpf = pack
                .autonomous_brackets(*region)
                .is_some_and(|b| !b.is_empty());
            if !has_irpf {
                errors.push(format!(
                    "Missing IRPF autonomous coverage for {community} ({region})"
                ));
            }
            if !pack.wealth.regions.contains_key(region) {
                errors.push(format!(
                    "Missing wealth tax coverage for {community} ({region})"
                ));
            }
        }
    }

    let foral = &pack.irpf.foral;
    for region in Region::FORAL {
        if foral.brackets_by_region.get(&region).is_none_or(Vec::is_empty) {
            errors.push(format!("Missing foral IRPF general brackets for {region}"));
        }
        if foral
            .savings_brackets_by_region
            .get(&region)
            .is_none_or(Vec::is_empty)
        {
            errors.push(format!("Missing foral IRPF savings brackets for {region}"));
        }
    }

    errors
}

/// Check provenance metadata, then append coverage findings.
#[must_use]
pub fn validate_metadata(pack: &TaxPack) -> Vec<String> {
    let meta = &pack.meta;
    let mut errors = Vec::new();

    let required: [(&str, bool); 5] = [
        ("country", meta.country.as_deref().is_some_and(|s| !s.trim().is_empty())),
        ("year", meta.year.is_some()),
        ("version", meta.version.as_deref().is_some_and(|s| !s.trim().is_empty())),
        ("publishedAt", meta.published_at.is_some()),
        ("reviewedAt", meta.reviewed_at.is_some()),
    ];
    for (field, present) in required {
        if !present {
            errors.push(format!("Missing required meta field: {field}"));
        }
    }

    for (field, value) in [
        ("publishedAt", &meta.published_at),
        ("reviewedAt", &meta.reviewed_at),
    ] {
        if let Some(value) = value
            && !is_iso_date(value)
        {
            errors.push(format!(
                "Invalid date in meta.{field}: {value:?} (expected YYYY-MM-DD)"
            ));
        }
    }

    match meta.sources.as_deref() {
        None | Some([]) => errors.push("meta.sources must be a non-empty list".to_string()),
        Some(sources) => {
            for (idx, source) in sources.iter().enumerate() {
                if source.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
                    errors.push(format!("meta.sources[{idx}] is missing a title"));
                }
                match source.url.as_deref() {
                    Some(url) if url.starts_with("http") => {}
                    Some(url) => errors.push(format!(
                        "meta.sources[{idx}] url must start with http: {url:?}"
                    )),
                    None => errors.push(format!("meta.sources[{idx}] is missing a url")),
                }
            }
        }
    }

    errors.extend(validate_coverage(pack));
    errors
}

fn is_iso_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    shape_ok && value.parse::<jiff::civil::Date>().is_ok()
}

/// Check every bracket list in the pack for well-formedness.
///
/// A list is well formed when its `upTo` values are positive and strictly
/// increasing, only the final bracket is unbounded, and every rate lies in
/// `[0, 1]`. Empty lists are left to [`validate_coverage`].
#[must_use]
pub fn validate_brackets(pack: &TaxPack) -> Vec<String> {
    let mut errors = Vec::new();
    let irpf = &pack.irpf;

    check_schedule("irpf.general.stateBrackets", &irpf.general.state_brackets, &mut errors);
    check_schedule("irpf.savings.brackets", &irpf.savings.brackets, &mut errors);

    for region in Region::ALL {
        if let Some(brackets) = irpf.general.autonomous_brackets_by_region.get(&region) {
            let name = format!("irpf.general.autonomousBracketsByRegion.{region}");
            check_schedule(&name, brackets, &mut errors);
        }
        if let Some(brackets) = irpf.foral.brackets_by_region.get(&region) {
            let name = format!("irpf.foral.bracketsByRegion.{region}");
            check_schedule(&name, brackets, &mut errors);
        }
        if let Some(brackets) = irpf.foral.savings_brackets_by_region.get(&region) {
            let name = format!("irpf.foral.savingsBracketsByRegion.{region}");
            check_schedule(&name, brackets, &mut errors);
        }
        if let Some(rules) = pack.wealth.regions.get(&region) {
            let name = format!("wealth.regions.{region}.brackets");
            check_schedule(&name, &rules.brackets, &mut errors);
        }
    }

    check_schedule("wealth.isgf.brackets", &pack.wealth.isgf.brackets, &mut errors);
    errors
}

fn check_schedule(name: &str, brackets: &[Bracket], errors: &mut Vec<String>) {
    let Some((last, bounded)) = brackets.split_last() else {
        return;
    };

    let mut previous = 0.0;
    for (idx, bracket) in bounded.iter().enumerate() {
        match bracket.up_to {
            None => errors.push(format!(
                "{name}: bracket {} is unbounded but not last",
                idx + 1
            )),
            Some(upper) if upper <= previous => errors.push(format!(
                "{name}: bracket {} upTo {upper} does not exceed {previous}",
                idx + 1
            )),
            Some(upper) => previous = upper,
        }
    }
    if let Some(upper) = last.up_to {
        errors.push(format!(
            "{name}: last bracket must have upTo null, found {upper}"
        ));
    }

    for (idx, bracket) in brackets.iter().enumerate() {
        if !(0.0..=1.0).contains(&bracket.rate) {
            errors.push(format!(
                "{name}: bracket {} rate {} is outside [0, 1]",
                idx + 1,
                bracket.rate
            ));
        }
    }
}
