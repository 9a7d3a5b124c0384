use approx::assert_relative_eq;
use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scenario_rollup::aggregate::{Granularity, MetricSummary, Summary, merge_inner};
use scenario_rollup::filter::region_filter;
use scenario_rollup::loader::load_scenario_file;
use scenario_rollup::schema::{TrackedMetric, parse_timestamp, summary_column_names};
use scenario_rollup::{CombinedDataset, RegionRange, SimulationRecord, aggregate_scenario};
use std::collections::BTreeMap;

use crate::utils::{uniform_row, write_simulation_file};

/// Load one CSV of simulation rows through the loader into a dataset
fn load_rows(scenario: &str, rows: &[String]) -> CombinedDataset {
    let dir = tempfile::tempdir().unwrap();
    write_simulation_file(dir.path(), "high_death_1.csv", rows);
    let batches =
        load_scenario_file(&dir.path().join("high_death_1.csv"), &region_filter(&RegionRange::default()))
            .unwrap();
    CombinedDataset::from_batches(scenario, &batches, 1).unwrap()
}

fn day(offset: i64) -> NaiveDateTime {
    parse_timestamp("2020-03-01").unwrap() + Duration::days(offset)
}

fn random_dataset(rng: &mut StdRng, runs: i64, days: i64, counties: &[i64]) -> CombinedDataset {
    let mut records = Vec::new();
    for sim in 1..=runs {
        for d in 0..days {
            for &geoid in counties {
                let mut record = SimulationRecord::uniform(geoid, sim, day(d), 0.0);
                for metric in TrackedMetric::ALL {
                    let value = if rng.random_bool(0.05) {
                        None
                    } else {
                        Some(rng.random_range(0.0..500.0))
                    };
                    record = record.with_metric(metric, value);
                }
                records.push(record);
            }
        }
    }
    CombinedDataset::from_records("Random", &records).unwrap()
}

#[test]
fn quartiles_are_ordered_and_bracket_the_median() {
    let mut rng = StdRng::seed_from_u64(20200401);
    for _ in 0..20 {
        let runs = rng.random_range(1..12);
        let dataset = random_dataset(&mut rng, runs, 4, &[6001, 6037, 6075]);
        let summary = aggregate_scenario(&dataset, true).unwrap();

        for table in [&summary.statewide, summary.county.as_ref().unwrap()] {
            assert_eq!(table.columns, summary_column_names());
            for row in &table.rows {
                for stats in row.values.chunks(4) {
                    let (mean, median, q25, q75) = (stats[0], stats[1], stats[2], stats[3]);
                    assert!(q25 <= median && median <= q75, "{stats:?}");
                    assert!(mean.is_finite());
                }
            }
        }
        assert_eq!(summary.statewide.num_rows(), 4);
        assert_eq!(summary.county.unwrap().num_rows(), 12);
    }
}

#[test]
fn statewide_mean_equals_sum_of_county_means() {
    let mut rng = StdRng::seed_from_u64(7);
    let dataset = random_dataset(&mut rng, 5, 3, &[6001, 6003, 6005]);
    let summary = aggregate_scenario(&dataset, true).unwrap();
    let county = summary.county.unwrap();

    for (i, row) in summary.statewide.rows.iter().enumerate() {
        let county_total: f64 = county
            .rows
            .iter()
            .filter(|r| r.time == row.time)
            .map(|r| r.values[0])
            .sum();
        assert_relative_eq!(
            summary.statewide.value(i, "hosp_occup_mean").unwrap(),
            county_total,
            epsilon = 1e-9
        );
    }
}

#[test]
fn merge_of_disjoint_timestamps_is_empty() {
    let summary = Summary {
        mean: 1.0,
        median: 1.0,
        q25: 1.0,
        q75: 1.0,
    };
    let early = MetricSummary {
        metric: TrackedMetric::HospitalOccupancy,
        granularity: Granularity::Statewide,
        groups: BTreeMap::from([((0, None), summary)]),
    };
    let late = MetricSummary {
        metric: TrackedMetric::IcuOccupancy,
        granularity: Granularity::Statewide,
        groups: BTreeMap::from([((86_400, None), summary)]),
    };

    let merged = merge_inner("Disjoint", &[early, late]).unwrap();
    assert_eq!(merged.num_rows(), 0);
    assert_eq!(merged.dropped_groups, 2);
    assert_eq!(merged.columns.len(), 8);
}

#[test]
fn single_run_statistics_collapse_to_the_value() {
    let records = vec![
        SimulationRecord::uniform(6001, 3, day(0), 7.0),
        SimulationRecord::uniform(6002, 3, day(0), 5.0),
    ];
    let dataset = CombinedDataset::from_records("One", &records).unwrap();
    let table = aggregate_scenario(&dataset, false).unwrap().statewide;
    assert_eq!(table.rows[0].values, vec![12.0; 24]);
}

#[test]
fn nan_cells_in_input_files_are_left_out_of_run_totals() {
    // columns: geoid,sim_num,time,hosp_curr,incidH,icu_curr,incidICU,incidI,incidD,comp
    let dataset = load_rows(
        "Nan",
        &[
            "6001,1,2020-03-01,1,1,1,1,4,1,x".to_string(),
            "6003,1,2020-03-01,1,1,1,1,NaN,1,x".to_string(),
            "6001,2,2020-03-01,1,1,1,1,10,1,x".to_string(),
            "6001,1,2020-03-02,1,1,1,1,NaN,1,x".to_string(),
            "6001,2,2020-03-02,1,1,1,1,NaN,1,x".to_string(),
        ],
    );
    let table = aggregate_scenario(&dataset, false).unwrap().statewide;

    assert_eq!(table.num_rows(), 2);
    assert_relative_eq!(table.value(0, "new_infect_mean").unwrap(), 7.0);
    assert_relative_eq!(table.value(0, "new_infect_q25").unwrap(), 5.5);
    assert_relative_eq!(table.value(0, "hosp_occup_mean").unwrap(), 1.5);
    let row = table.find_row(day(1), None).unwrap();
    assert_relative_eq!(table.value(row, "new_infect_mean").unwrap(), 0.0);
    assert_relative_eq!(table.value(row, "new_deaths_mean").unwrap(), 1.0);
}

#[test]
fn timestamp_missing_from_one_metric_is_dropped_from_the_merged_table() {
    // opposite infinities leave hosp_curr without a usable run total on 2020-03-02
    let dataset = load_rows(
        "Gap",
        &[
            uniform_row(6001, 1, "2020-03-01", 3.0),
            "6001,1,2020-03-02,inf,2,2,2,2,2,x".to_string(),
            "6003,1,2020-03-02,-inf,2,2,2,2,2,x".to_string(),
            uniform_row(6001, 1, "2020-03-03", 5.0),
        ],
    );
    let summary = aggregate_scenario(&dataset, true).unwrap();

    let statewide = &summary.statewide;
    assert_eq!(statewide.dropped_groups, 1);
    let times: Vec<_> = statewide.rows.iter().map(|r| r.time).collect();
    assert_eq!(times, vec![day(0), day(2)]);
    assert_eq!(statewide.columns, summary_column_names());
    assert_relative_eq!(statewide.value(1, "icu_admit_median").unwrap(), 5.0);

    // per-county totals are single infinities, so every county group survives
    let county = summary.county.unwrap();
    assert_eq!(county.dropped_groups, 0);
    assert_eq!(county.num_rows(), 4);
    let row = county.find_row(day(1), Some(6003)).unwrap();
    assert_eq!(county.value(row, "hosp_occup_mean"), Some(f64::NEG_INFINITY));
    assert_relative_eq!(county.value(row, "new_infect_mean").unwrap(), 2.0);
}
