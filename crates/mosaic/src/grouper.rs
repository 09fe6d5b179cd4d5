//! Partition scene acquisitions into mosaic groups.
//!
//! A single greedy scan over the chronologically sorted dates. Proximity is
//! measured in whole calendar months with the day-of-month ignored, so
//! Jan 31 → Feb 1 counts as one month and Jan 1 → Feb 28 also counts as
//! one. This is a known approximation and is kept as is.

use chrono::{Datelike, NaiveDate};
use common::config::GroupingConfig;
use common::{Error, MosaicGroup, SceneRecord};
use tracing::debug;

/// Grouping thresholds. All values must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupingParams {
    pub gap_tolerance_months: u32,
    pub min_group_size: u32,
    pub max_group_size: u32,
}

impl GroupingParams {
    pub fn validate(&self) -> Result<(), Error> {
        let checks = [
            ("gap_tolerance_months", self.gap_tolerance_months),
            ("min_group_size", self.min_group_size),
            ("max_group_size", self.max_group_size),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(Error::InvalidParameter(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

impl Default for GroupingParams {
    fn default() -> Self {
        Self {
            gap_tolerance_months: 2,
            min_group_size: 10,
            max_group_size: 15,
        }
    }
}

impl From<&GroupingConfig> for GroupingParams {
    fn from(config: &GroupingConfig) -> Self {
        Self {
            gap_tolerance_months: config.gap_tolerance_months,
            min_group_size: config.min_group_size,
            max_group_size: config.max_group_size,
        }
    }
}

/// Whole calendar months from `from` to `to`, ignoring the day of month.
pub fn month_diff(from: NaiveDate, to: NaiveDate) -> i64 {
    let years = i64::from(to.year()) - i64::from(from.year());
    let months = i64::from(to.month()) - i64::from(from.month());
    years * 12 + months
}

/// Partition `scenes` into eligible mosaic groups.
///
/// Scenes are stably sorted by date first; the input is left untouched.
/// Every returned group holds between `min_group_size` and `max_group_size`
/// dates, and no date lands in more than one group.
pub fn group_into_mosaics(
    scenes: &[SceneRecord],
    params: &GroupingParams,
) -> Result<Vec<MosaicGroup>, Error> {
    params.validate()?;

    let mut ordered: Vec<&SceneRecord> = scenes.iter().collect();
    ordered.sort_by_key(|scene| scene.date);

    let max_len = params.max_group_size as usize;
    let mut groups = Vec::new();
    let mut buffer: Vec<NaiveDate> = Vec::with_capacity(max_len);

    for scene in ordered {
        let Some(&last) = buffer.last() else {
            buffer.push(scene.date);
            continue;
        };

        let within_gap = month_diff(last, scene.date) <= i64::from(params.gap_tolerance_months);
        if within_gap && buffer.len() < max_len {
            buffer.push(scene.date);
        } else {
            let closed = std::mem::replace(&mut buffer, vec![scene.date]);
            emit_if_eligible(closed, params, &mut groups);
        }
    }
    emit_if_eligible(buffer, params, &mut groups);

    debug!(
        "Grouped {} scenes into {} mosaics (gap<={}mo, size {}..={})",
        scenes.len(),
        groups.len(),
        params.gap_tolerance_months,
        params.min_group_size,
        params.max_group_size
    );

    Ok(groups)
}

fn emit_if_eligible(dates: Vec<NaiveDate>, params: &GroupingParams, groups: &mut Vec<MosaicGroup>) {
    if dates.len() < params.min_group_size as usize {
        if !dates.is_empty() {
            debug!("Discarding run of {} dates (below minimum)", dates.len());
        }
        return;
    }
    if let Some(group) = MosaicGroup::from_dates(dates) {
        groups.push(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn scene(d: NaiveDate) -> SceneRecord {
        SceneRecord::new(d, 5.0, "Sentinel-2")
    }

    fn spaced(start: NaiveDate, count: usize, step_days: i64) -> Vec<SceneRecord> {
        (0..count)
            .map(|i| scene(start + Duration::days(step_days * i as i64)))
            .collect()
    }

    #[test]
    fn test_month_diff_ignores_day_of_month() {
        assert_eq!(month_diff(date(2024, 1, 31), date(2024, 2, 1)), 1);
        assert_eq!(month_diff(date(2024, 1, 1), date(2024, 1, 31)), 0);
        assert_eq!(month_diff(date(2023, 11, 15), date(2024, 2, 1)), 3);
        assert_eq!(month_diff(date(2024, 1, 30), date(2024, 2, 1)), 1);
    }

    #[test]
    fn test_max_group_size_splits_dense_run() {
        let scenes = spaced(date(2024, 1, 1), 25, 3);

        let groups = group_into_mosaics(&scenes, &GroupingParams::default()).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 15);
        assert_eq!(groups[1].len(), 10);
        assert_eq!(groups[0].start_date, date(2024, 1, 1));
        assert_eq!(groups[0].end_date, date(2024, 1, 1) + Duration::days(42));
        assert_eq!(groups[1].start_date, date(2024, 1, 1) + Duration::days(45));
        assert_eq!(groups[1].end_date, date(2024, 1, 1) + Duration::days(72));
    }

    #[test]
    fn test_small_run_is_discarded() {
        let scenes = spaced(date(2024, 5, 1), 8, 5);
        let groups = group_into_mosaics(&scenes, &GroupingParams::default()).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_gap_beyond_tolerance_separates_clusters() {
        let mut scenes = spaced(date(2024, 1, 1), 12, 3);
        // Last date of the first cluster is Feb 3; June is four months later.
        scenes.extend(spaced(date(2024, 6, 3), 12, 3));

        let groups = group_into_mosaics(&scenes, &GroupingParams::default()).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 12);
        assert_eq!(groups[1].len(), 12);
        assert_eq!(groups[0].end_date, date(2024, 2, 3));
        assert_eq!(groups[1].start_date, date(2024, 6, 3));
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        let groups = group_into_mosaics(&[], &GroupingParams::default()).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_zero_parameters_rejected() {
        let zero_min = GroupingParams {
            min_group_size: 0,
            ..GroupingParams::default()
        };
        assert!(matches!(
            group_into_mosaics(&[], &zero_min),
            Err(Error::InvalidParameter(_))
        ));

        let zero_max = GroupingParams {
            max_group_size: 0,
            ..GroupingParams::default()
        };
        assert!(group_into_mosaics(&[], &zero_max).is_err());

        let zero_gap = GroupingParams {
            gap_tolerance_months: 0,
            ..GroupingParams::default()
        };
        assert!(group_into_mosaics(&[], &zero_gap).is_err());
    }

    #[test]
    fn test_unsorted_input_with_duplicates() {
        let mut scenes = spaced(date(2024, 3, 1), 10, 2);
        scenes.push(scene(date(2024, 3, 5)));
        scenes.reverse();
        let original = scenes.clone();

        let params = GroupingParams {
            min_group_size: 11,
            ..GroupingParams::default()
        };
        let groups = group_into_mosaics(&scenes, &params).unwrap();

        assert_eq!(scenes, original, "input must not be reordered");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 11);
        assert!(groups[0].dates.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(
            groups[0].dates.iter().filter(|d| **d == date(2024, 3, 5)).count(),
            2
        );
    }

    #[test]
    fn test_month_boundary_looseness_is_preserved() {
        // 59 days apart but only one calendar month.
        let scenes = vec![scene(date(2024, 1, 1)), scene(date(2024, 2, 29))];
        let params = GroupingParams {
            gap_tolerance_months: 1,
            min_group_size: 2,
            max_group_size: 5,
        };
        let groups = group_into_mosaics(&scenes, &params).unwrap();
        assert_eq!(groups.len(), 1);

        // 30 days apart but two calendar months.
        let scenes = vec![scene(date(2024, 1, 31)), scene(date(2024, 3, 1))];
        assert!(group_into_mosaics(&scenes, &params).unwrap().is_empty());
    }

    #[test]
    fn test_closing_group_starts_next_with_current_date() {
        // A rejected date seeds the next buffer even when the old one is discarded.
        let mut scenes = spaced(date(2024, 1, 1), 3, 1);
        scenes.extend(spaced(date(2024, 9, 1), 4, 1));
        let params = GroupingParams {
            gap_tolerance_months: 2,
            min_group_size: 4,
            max_group_size: 10,
        };
        let groups = group_into_mosaics(&scenes, &params).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].start_date, date(2024, 9, 1));
        assert_eq!(groups[0].len(), 4);
    }

    fn arb_scenes() -> impl Strategy<Value = Vec<SceneRecord>> {
        prop::collection::vec(0i64..1500, 0..80).prop_map(|offsets| {
            offsets
                .into_iter()
                .map(|o| scene(date(2020, 1, 1) + Duration::days(o)))
                .collect()
        })
    }

    fn arb_params() -> impl Strategy<Value = GroupingParams> {
        (1u32..4, 1u32..12, 1u32..20).prop_map(|(gap, min, max)| GroupingParams {
            gap_tolerance_months: gap,
            min_group_size: min,
            max_group_size: max,
        })
    }

    proptest! {
        #[test]
        fn prop_group_sizes_within_bounds(scenes in arb_scenes(), params in arb_params()) {
            let groups = group_into_mosaics(&scenes, &params).unwrap();
            for group in &groups {
                prop_assert!(group.len() >= params.min_group_size as usize);
                prop_assert!(group.len() <= params.max_group_size as usize);
                prop_assert_eq!(group.start_date, group.dates[0]);
                prop_assert_eq!(group.end_date, *group.dates.last().unwrap());
            }
        }

        #[test]
        fn prop_consecutive_dates_within_tolerance(scenes in arb_scenes(), params in arb_params()) {
            let groups = group_into_mosaics(&scenes, &params).unwrap();
            for group in &groups {
                for pair in group.dates.windows(2) {
                    prop_assert!(pair[0] <= pair[1]);
                    prop_assert!(month_diff(pair[0], pair[1]) <= i64::from(params.gap_tolerance_months));
                }
            }
        }

        #[test]
        fn prop_groups_are_ordered_subsequence(scenes in arb_scenes(), params in arb_params()) {
            let groups = group_into_mosaics(&scenes, &params).unwrap();
            let mut sorted: Vec<NaiveDate> = scenes.iter().map(|s| s.date).collect();
            sorted.sort();

            let emitted: Vec<NaiveDate> = groups.iter().flat_map(|g| g.dates.iter().copied()).collect();
            prop_assert!(emitted.len() <= sorted.len());

            let mut cursor = sorted.iter();
            for d in &emitted {
                prop_assert!(cursor.any(|s| s == d), "emitted dates must follow sorted input order");
            }
            for pair in groups.windows(2) {
                prop_assert!(pair[0].end_date <= pair[1].start_date);
            }
        }

        #[test]
        fn prop_grouping_is_deterministic(scenes in arb_scenes(), params in arb_params()) {
            let first = group_into_mosaics(&scenes, &params).unwrap();
            let second = group_into_mosaics(&scenes, &params).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
