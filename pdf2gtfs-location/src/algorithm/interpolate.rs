//! §4.9 step 4: fills in the coordinates of missing vertices along a
//! resolved route. Grounded on
//! `original_source/.../locate/finder/__init__.py`'s
//! `_interpolate_intermediate_node_locations`/`_interpolate_end_node_locations`
//! (linear interpolation between two located runs, then extrapolation
//! by the last known travel vector at either end — the start is
//! handled by reversing the slice and reapplying the same forward
//! extrapolation, exactly as the original does).

/// evenly distributes positions between two located points over a run
/// of consecutive missing ones.
fn fill_intermediate_gaps(locations: &mut [Option<(f64, f64)>], first: usize, last: usize) {
    let mut prev = first;
    let mut idx = first + 1;
    while idx <= last {
        if locations[idx].is_some() {
            prev = idx;
            idx += 1;
            continue;
        }
        let gap_start = idx;
        while locations[idx].is_none() {
            idx += 1;
        }
        let gap_end = idx;
        let steps = gap_end - prev;
        let (plat, plon) = locations[prev].expect("prev is always a located index");
        let (nlat, nlon) = locations[gap_end].expect("gap_end is always a located index");
        for (k, i) in (gap_start..gap_end).enumerate() {
            let t = (k + 1) as f64 / steps as f64;
            locations[i] = Some((plat + (nlat - plat) * t, plon + (nlon - plon) * t));
        }
        prev = gap_end;
    }
}

/// walks forward, tracking the travel vector between the two most
/// recently located points, and fills any `None` it meets by adding
/// that vector to the previous (possibly just-filled) point.
fn extrapolate_forward(locations: &mut [Option<(f64, f64)>]) {
    let mut prev: Option<(f64, f64)> = None;
    let mut delta = (0.0, 0.0);
    for loc in locations.iter_mut() {
        match (*loc, prev) {
            (Some(cur), Some(p)) => {
                delta = (cur.0 - p.0, cur.1 - p.1);
                prev = Some(cur);
            }
            (Some(cur), None) => prev = Some(cur),
            (None, Some(p)) => {
                let next = (p.0 + delta.0, p.1 + delta.1);
                *loc = Some(next);
                prev = Some(next);
            }
            (None, None) => {}
        }
    }
}

/// §4.9 step 4: `locations[i]` is the resolved `(lat, lon)` for stop
/// `i`, or `None` if it landed on the missing vertex. Interior gaps
/// are spread evenly between their bounding located stops; gaps at
/// either end are extrapolated along the nearest known travel vector.
/// A no-op if fewer than two stops have a known location.
pub fn interpolate_missing_locations(locations: &mut [Option<(f64, f64)>]) {
    let Some(first) = locations.iter().position(Option::is_some) else {
        return;
    };
    let Some(last) = locations.iter().rposition(Option::is_some) else {
        return;
    };
    if first == last {
        return;
    }

    fill_intermediate_gaps(locations, first, last);
    extrapolate_forward(locations);

    let mut reversed: Vec<Option<(f64, f64)>> = locations.iter().rev().copied().collect();
    extrapolate_forward(&mut reversed);
    for (i, v) in reversed.into_iter().rev().enumerate() {
        locations[i] = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: (f64, f64), b: (f64, f64)) {
        assert!((a.0 - b.0).abs() < 1e-4, "{a:?} vs {b:?}");
        assert!((a.1 - b.1).abs() < 1e-4, "{a:?} vs {b:?}");
    }

    #[test]
    fn single_gap_lands_at_the_midpoint() {
        let mut locations = vec![Some((48.00, 7.85)), None, Some((48.02, 7.88))];
        interpolate_missing_locations(&mut locations);
        assert_close(locations[1].unwrap(), (48.01, 7.865));
    }

    #[test]
    fn trailing_gap_extrapolates_the_last_travel_vector() {
        let mut locations = vec![Some((48.00, 7.85)), Some((48.01, 7.86)), None];
        interpolate_missing_locations(&mut locations);
        assert_close(locations[2].unwrap(), (48.02, 7.87));
    }

    #[test]
    fn leading_gap_extrapolates_backward() {
        let mut locations = vec![None, Some((48.01, 7.86)), Some((48.02, 7.87))];
        interpolate_missing_locations(&mut locations);
        assert_close(locations[0].unwrap(), (48.00, 7.85));
    }

    #[test]
    fn fewer_than_two_located_stops_is_a_no_op() {
        let mut locations = vec![None, Some((48.0, 7.85)), None];
        interpolate_missing_locations(&mut locations);
        assert_eq!(locations, vec![None, Some((48.0, 7.85)), None]);
    }
}
