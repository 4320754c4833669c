//! §4.8 step 3 `node_cost`: a route-type-specific scoring table over an
//! OSM candidate's category tags, grounded on `original_source`'s
//! `finder/osm_values.py` `OSMValue` subclasses (`Tram`, `Subway`,
//! `Rail`, `Bus`, `Ferry`, `Trolleybus`, `Monorail` — the subset that
//! maps onto a [`RouteType`] variant; everything else falls back to the
//! base class's empty table, i.e. [`FALLBACK_SCORE`] unless no bad
//! value applies).

use std::collections::HashMap;

use gtfs_structures::RouteType;

struct ScoringTable {
    good: &'static [(&'static str, &'static str, f64)],
    bad: &'static [(&'static str, &'static str)],
}

const TRAM: ScoringTable = ScoringTable {
    good: &[
        ("tram", "yes", 0.0),
        ("light_rail", "yes", 1.0),
        ("station", "light_rail", 1.0),
        ("railway", "tram_stop", 0.0),
        ("railway", "halt", 2.0),
        ("railway", "station", 2.0),
        ("railway", "platform", 2.0),
        ("train", "yes", 2.0),
    ],
    bad: &[("tram", "no")],
};

const SUBWAY: ScoringTable = ScoringTable {
    good: &[
        ("subway", "yes", 0.0),
        ("train", "yes", 1.0),
        ("station", "subway", 0.0),
        ("station", "train", 1.0),
        ("railway", "halt", 0.0),
        ("railway", "station", 1.0),
        ("railway", "platform", 1.0),
    ],
    bad: &[("subway", "no")],
};

const RAIL: ScoringTable = ScoringTable {
    good: &[
        ("train", "yes", 0.0),
        ("station", "train", 0.0),
        ("railway", "halt", 0.0),
        ("railway", "station", 1.0),
        ("railway", "platform", 1.0),
    ],
    bad: &[("train", "no")],
};

const BUS: ScoringTable = ScoringTable {
    good: &[
        ("bus", "yes", 0.0),
        ("amenity", "bus_station", 0.0),
        ("highway", "bus_stop", 0.0),
        ("highway", "platform", 1.0),
        ("trolleybus", "yes", 2.0),
    ],
    bad: &[("bus", "no")],
};

const FERRY: ScoringTable = ScoringTable {
    good: &[("ferry", "yes", 0.0), ("amenity", "ferry_terminal", 0.0)],
    bad: &[("ferry", "no")],
};

const TROLLEYBUS: ScoringTable = ScoringTable {
    good: &[
        ("trolleybus", "yes", 0.0),
        ("bus", "yes", 1.0),
        ("amenity", "bus_station", 1.0),
        ("highway", "bus_stop", 1.0),
        ("highway", "platform", 1.0),
    ],
    bad: &[("trolleybus", "no")],
};

const MONORAIL: ScoringTable = ScoringTable {
    good: &[
        ("monorail", "yes", 0.0),
        ("station", "monorail", 1.0),
        ("railway", "halt", 1.0),
        ("railway", "platform", 1.0),
        ("railway", "station", 2.0),
        ("light_rail", "yes", 2.0),
    ],
    bad: &[("monorail", "no")],
};

const DEFAULT: ScoringTable = ScoringTable { good: &[], bad: &[] };

/// the score assigned when no entry in the route type's good-value
/// table matches (§4.8 step 3's "the best match scores 0", everything
/// below that degrades toward this default).
const FALLBACK_SCORE: f64 = 4.0;

/// small additive penalty applied once per missing/unknown optional
/// tag (§4.8 step 3).
const OPTIONAL_TAG_PENALTY: f64 = 0.5;

fn table_for(route_type: RouteType) -> &'static ScoringTable {
    match route_type {
        RouteType::Tramway => &TRAM,
        RouteType::Subway => &SUBWAY,
        RouteType::Rail => &RAIL,
        RouteType::Bus => &BUS,
        RouteType::Ferry => &FERRY,
        RouteType::Trolleybus => &TROLLEYBUS,
        RouteType::Monorail => &MONORAIL,
        _ => &DEFAULT,
    }
}

/// §4.8 step 3: `node_cost` from `tags`, scored against `route_type`'s
/// table, plus optional-tag penalties. `f64::INFINITY` means the
/// candidate is unusable and should be dropped before it ever reaches
/// the resolver.
pub fn node_cost(
    route_type: RouteType,
    tags: &HashMap<&str, &str>,
    ref_ifopt: Option<&str>,
    wheelchair: Option<&str>,
) -> f64 {
    let table = table_for(route_type);
    for &(key, bad_value) in table.bad {
        if tags.get(key) == Some(&bad_value) {
            return f64::INFINITY;
        }
    }
    let mut score = table
        .good
        .iter()
        .find(|&&(key, value, _)| tags.get(key) == Some(&value))
        .map(|&(_, _, score)| score)
        .unwrap_or(FALLBACK_SCORE);

    let missing_or_unknown = |tag: Option<&str>| match tag {
        Some(v) => v.eq_ignore_ascii_case("unknown"),
        None => true,
    };
    if missing_or_unknown(ref_ifopt) {
        score += OPTIONAL_TAG_PENALTY;
    }
    if missing_or_unknown(wheelchair) {
        score += OPTIONAL_TAG_PENALTY;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_tram_value_is_unusable() {
        let tags = HashMap::from([("tram", "no")]);
        assert_eq!(node_cost(RouteType::Tramway, &tags, Some("x"), Some("yes")), f64::INFINITY);
    }

    #[test]
    fn best_match_scores_zero_plus_no_penalty() {
        let tags = HashMap::from([("tram", "yes")]);
        assert_eq!(node_cost(RouteType::Tramway, &tags, Some("DE:1234"), Some("yes")), 0.0);
    }

    #[test]
    fn missing_optional_tags_add_penalties() {
        let tags = HashMap::from([("tram", "yes")]);
        assert_eq!(node_cost(RouteType::Tramway, &tags, None, None), 1.0);
    }

    #[test]
    fn unmatched_route_type_uses_fallback_score() {
        let tags = HashMap::from([("amenity", "bench")]);
        assert_eq!(node_cost(RouteType::Bus, &tags, Some("x"), Some("yes")), FALLBACK_SCORE);
    }
}
