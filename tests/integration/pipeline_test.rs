use std::fs;

use approx::assert_relative_eq;
use scenario_rollup::{Pipeline, RollupError, SkipReason};

use crate::utils::{Fixture, csv_value, read_lines, uniform_row, write_simulation_file};

/// Two runs whose statewide totals are 10 and 20 on one day, plus rows outside the region
fn stage_two_runs(fixture: &Fixture, dir: &str) {
    let dir = fixture.input().join(dir);
    write_simulation_file(
        &dir,
        "high_death_1.csv",
        &[
            uniform_row(6001, 1, "2020-03-01", 4.0),
            uniform_row(6003, 1, "2020-03-01", 6.0),
            uniform_row(7001, 1, "2020-03-01", 1000.0),
        ],
    );
    write_simulation_file(
        &dir,
        "high_death_2.csv",
        &[
            uniform_row(6001, 2, "2020-03-01", 5.0),
            uniform_row(6003, 2, "2020-03-01", 15.0),
            uniform_row(5999, 2, "2020-03-01", 1000.0),
        ],
    );
    fs::write(dir.join("run_metadata.csv"), "not,simulation,output\n").unwrap();
}

#[test]
fn missing_scenario_is_skipped_and_the_rest_published() {
    let fixture = Fixture::new();
    stage_two_runs(&fixture, "a");
    fixture.write_credentials("jhumodelaggregates");

    let config = fixture.config(&[("Scenario A", "a"), ("Scenario B", "b")]);
    let publisher = fixture.publisher(&config).unwrap();
    let report = Pipeline::new(&config).run(&publisher).unwrap();

    assert_eq!(report.loaded, vec!["Scenario A"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "Scenario B");
    assert!(matches!(report.skipped[0].1, SkipReason::MissingDirectory(_)));

    let written = fixture.data_dir().join("Scenario_A.csv");
    assert_eq!(report.written, vec![written.clone()]);
    assert!(!fixture.data_dir().join("Scenario_B.csv").exists());
    assert!(!fixture.data_dir().join("Scenario_A.county.csv").exists());

    assert_eq!(
        report.published,
        vec!["latest/Scenario_A.csv", "20200401/Scenario_A.csv"]
    );
    assert_eq!(
        fs::read(fixture.object("latest/Scenario_A.csv")).unwrap(),
        fs::read(&written).unwrap()
    );
    assert!(fixture.object("20200401/Scenario_A.csv").exists());
}

#[test]
fn statewide_statistics_use_per_run_totals() {
    let fixture = Fixture::new();
    stage_two_runs(&fixture, "a");
    fixture.write_credentials("jhumodelaggregates");

    let config = fixture.config(&[("A", "a")]);
    let publisher = fixture.publisher(&config).unwrap();
    Pipeline::new(&config).run(&publisher).unwrap();

    let lines = read_lines(&fixture.data_dir().join("A.csv"));
    assert_eq!(lines.len(), 2);
    let header = &lines[0];
    assert!(header.starts_with("time,hosp_occup_mean,hosp_occup_median,hosp_occup_q25,hosp_occup_q75,hosp_admit_mean"));
    assert!(header.ends_with("new_deaths_q75"));
    assert_eq!(header.split(',').count(), 25);

    let row = &lines[1];
    assert!(row.starts_with("2020-03-01,"));
    for metric in ["hosp_occup", "icu_admit", "new_deaths"] {
        assert_relative_eq!(csv_value(header, row, &format!("{metric}_mean")), 15.0);
        assert_relative_eq!(csv_value(header, row, &format!("{metric}_median")), 15.0);
        assert_relative_eq!(csv_value(header, row, &format!("{metric}_q25")), 12.5);
        assert_relative_eq!(csv_value(header, row, &format!("{metric}_q75")), 17.5);
    }
}

#[test]
fn county_tables_are_sorted_by_time_then_geoid() {
    let fixture = Fixture::new();
    let dir = fixture.input().join("a");
    write_simulation_file(
        &dir,
        "high_death_1.csv",
        &[
            uniform_row(6003, 1, "2020-03-02", 3.0),
            uniform_row(6001, 1, "2020-03-02", 1.0),
            uniform_row(6003, 1, "2020-03-01", 2.0),
            uniform_row(6001, 1, "2020-03-01", 4.0),
        ],
    );
    fixture.write_credentials("jhumodelaggregates");

    let mut config = fixture.config(&[("A", "a")]);
    config.include_counties = true;
    let publisher = fixture.publisher(&config).unwrap();
    let report = Pipeline::new(&config).run(&publisher).unwrap();

    let county = fixture.data_dir().join("A.county.csv");
    assert_eq!(
        report.written,
        vec![fixture.data_dir().join("A.csv"), county.clone()]
    );
    assert!(fixture.object("latest/A.county.csv").exists());

    let lines = read_lines(&county);
    assert!(lines[0].starts_with("time,geoid,hosp_occup_mean"));
    let keys: Vec<String> = lines[1..]
        .iter()
        .map(|l| l.split(',').take(2).collect::<Vec<_>>().join(","))
        .collect();
    assert_eq!(
        keys,
        vec![
            "2020-03-01,6001",
            "2020-03-01,6003",
            "2020-03-02,6001",
            "2020-03-02,6003"
        ]
    );
    assert_relative_eq!(csv_value(&lines[0], &lines[2], "hosp_occup_mean"), 2.0);

    let statewide = read_lines(&fixture.data_dir().join("A.csv"));
    assert_relative_eq!(csv_value(&statewide[0], &statewide[1], "hosp_occup_mean"), 6.0);
    assert_relative_eq!(csv_value(&statewide[0], &statewide[2], "hosp_occup_mean"), 4.0);
}

#[test]
fn credential_bucket_mismatch_stops_before_any_output() {
    let fixture = Fixture::new();
    stage_two_runs(&fixture, "a");
    fixture.write_credentials("some-other-bucket");

    let config = fixture.config(&[("A", "a")]);
    let err = fixture.publisher(&config).unwrap_err();
    assert!(err.is_config());
    assert!(matches!(err, RollupError::Config(ref msg) if msg.contains("some-other-bucket")));

    assert!(!fixture.output().exists());
    assert!(!fixture.store_root().exists());
}

#[test]
fn no_loadable_scenarios_is_fatal() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.input().join("a")).unwrap();
    fixture.write_credentials("jhumodelaggregates");

    let config = fixture.config(&[("A", "a"), ("B", "b")]);
    let publisher = fixture.publisher(&config).unwrap();
    let err = Pipeline::new(&config).run(&publisher).unwrap_err();
    assert!(matches!(err, RollupError::NoScenarios(ref names) if names.len() == 2));
    assert!(err.is_config());
    assert!(!fixture.store_root().exists());
}

#[test]
fn a_failing_scenario_prevents_publication() {
    let fixture = Fixture::new();
    stage_two_runs(&fixture, "a");
    write_simulation_file(
        &fixture.input().join("bad"),
        "high_death_1.csv",
        &[uniform_row(6001, 1, "sometime in march", 1.0)],
    );
    fixture.write_credentials("jhumodelaggregates");

    let config = fixture.config(&[("A", "a"), ("Bad", "bad")]);
    let publisher = fixture.publisher(&config).unwrap();
    let err = Pipeline::new(&config).run(&publisher).unwrap_err();
    assert!(matches!(err, RollupError::ScenarioFailures(ref names) if names == &["Bad".to_string()]));
    assert!(!fixture.store_root().exists());
}

#[test]
fn start_from_csvs_republishes_existing_files() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.data_dir()).unwrap();
    fs::write(fixture.data_dir().join("Old.csv"), "time,x\n2020-03-01,1.0\n").unwrap();
    fs::write(fixture.data_dir().join("notes.txt"), "ignored").unwrap();
    fixture.write_credentials("jhumodelaggregates");

    // input directory does not exist; nothing is read
    let mut config = fixture.config(&[("A", "a")]);
    config.start_from_csvs = true;
    let publisher = fixture.publisher(&config).unwrap();
    let report = Pipeline::new(&config).run(&publisher).unwrap();

    assert!(report.loaded.is_empty());
    assert_eq!(report.published, vec!["latest/Old.csv", "20200401/Old.csv"]);
    assert_eq!(
        fs::read_to_string(fixture.object("20200401/Old.csv")).unwrap(),
        "time,x\n2020-03-01,1.0\n"
    );
    assert!(!fixture.object("latest/notes.txt").exists());
}

#[test]
fn actuals_are_written_and_published_when_requested() {
    let fixture = Fixture::new();
    stage_two_runs(&fixture, "a");
    fixture.write_credentials("jhumodelaggregates");
    let actuals = fixture.root.path().join("covid19data.csv");
    fs::write(
        &actuals,
        "County Name,Most Recent Date,COVID-19 Positive Patients,Suspected COVID-19 Positive Patients,ICU COVID-19 Positive Patients,ICU COVID-19 Suspected Patients\n\
         Alameda,2020-04-01,10,5,3,1\n",
    )
    .unwrap();

    let config = fixture.config(&[("A", "a")]);
    let publisher = fixture.publisher(&config).unwrap();
    let report = Pipeline::new(&config)
        .with_actuals(&actuals)
        .run(&publisher)
        .unwrap();

    assert!(
        report
            .written
            .contains(&fixture.data_dir().join("actual_hosp_data.csv"))
    );
    let lines = read_lines(&fixture.object("latest/actual_hosp_data.csv"));
    assert_eq!(lines.len(), 7);
    assert_eq!(lines.last().unwrap(), "2020-04-01,10.0,3.0,15.0,4.0");
}
