use std::io::Write;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use tl_graph::{
    load_graph_params, render_all, run_requests, BatchConfig, BatchSummary, GraphOutcome,
    GraphReport, StatisticKind, SummaryRenderer, THRESHOLD_COUNT,
};

const HEADER: &str = "excel_file,outcome,oname,oLL,oUL,variable,vname,filter1,f1op,f1criteria,\
                      filter2,f2op,f2criteria,filter3,f3op,f3criteria,filter4,f4op,f4criteria,\
                      plot_type,min_n,graphtype";

/// 100 patients, age uniform in [40, 90], death more likely when older.
fn write_cohort(dir: &Path) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let mut file = std::fs::File::create(dir.join("cohort.csv")).unwrap();
    writeln!(file, "id,age,sex,died,pain,ward").unwrap();
    for id in 0..100 {
        let age: f64 = rng.random_range(40.0..=90.0);
        let died = u8::from(rng.random_bool((age - 30.0) / 80.0));
        let pain = if id % 10 == 0 { "NA".to_string() } else { (id % 7).to_string() };
        let ward = if id % 2 == 0 { "A" } else { "B" };
        writeln!(file, "{id},{age:.2},2,{died},{pain},{ward}").unwrap();
    }
    writeln!(file, "100,60,2,0,3,A").unwrap();
}

fn write_params(dir: &Path, rows: &[&str]) -> std::path::PathBuf {
    let path = dir.join("graphs.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    path
}

fn run(rows: &[&str]) -> Vec<GraphReport> {
    let dir = tempfile::tempdir().unwrap();
    write_cohort(dir.path());
    let params = load_graph_params(&write_params(dir.path(), rows)).unwrap();
    run_requests(&params.requests(), &BatchConfig::default())
}

fn reason(report: &GraphReport) -> &str {
    match &report.outcome {
        GraphOutcome::Skipped(reason) | GraphOutcome::Failed(reason) => reason,
        GraphOutcome::Computed(_) => panic!("{} was computed", report.name),
    }
}

#[test]
fn mortality_by_age_proportion() {
    let reports = run(&["cohort.csv,died,mortality,NA,NA,age,Age,NA,,,NA,,,NA,,,NA,,,3,10,p"]);
    let graph = reports[0].graph().expect("graph computed");
    let result = &graph.result;

    assert_eq!(result.kind, StatisticKind::Proportion);
    assert_eq!(result.n, 101);
    assert_eq!(result.points.len(), THRESHOLD_COUNT);

    let thresholds = result.thresholds();
    assert!(thresholds[0] >= 40.0 && thresholds[THRESHOLD_COUNT - 1] <= 90.0);
    assert!(thresholds.windows(2).all(|w| w[0] < w[1]));

    for point in &result.points {
        for value in [point.above, point.below].into_iter().flatten() {
            assert!((0.0..=1.0).contains(&value));
        }
        assert_eq!(point.above.is_some(), point.n_above >= 10);
        assert_eq!(point.below.is_some(), point.n_below >= 10);
    }
    // Each end of the range has a single patient on one side.
    assert!(result.points[0].below.is_none());
    assert!(result.points[THRESHOLD_COUNT - 1].above.is_none());
    // At the minimum every patient is above.
    assert_eq!(result.points[0].above, Some(result.overall));

    assert!(result.interval.lower <= result.overall && result.overall <= result.interval.upper);
    assert_eq!(graph.y_bounds().map(|b| (b.lower, b.upper)), Some((0.0, 1.0)));
    assert_eq!(graph.figure_name(), "age_p_died_plot3.png");
    assert_eq!(graph.y_label(), "Proportion of patients mortality");
}

#[test]
fn constant_predictor_gives_degenerate_sweep() {
    let reports = run(&["cohort.csv,pain,Pain,NA,NA,sex,Sex,NA,,,NA,,,NA,,,NA,,,3,1,c"]);
    let result = &reports[0].graph().expect("graph computed").result;

    // Rows with missing pain are dropped first.
    assert_eq!(result.n, 91);
    for point in &result.points {
        assert_eq!(point.threshold, 2.0);
        assert_eq!(point.n_above, 91);
        assert_eq!(point.n_below, 91);
        assert_eq!(point.above, Some(result.overall));
        assert_eq!(point.below, Some(result.overall));
    }
}

#[test]
fn batch_continues_past_bad_graphs() {
    let reports = run(&[
        // No patient has sex == 1.
        "cohort.csv,died,mortality,NA,NA,age,Age,sex,==,1,NA,,,NA,,,NA,,,3,10,p",
        // Unknown outcome column.
        "cohort.csv,mortality,mortality,NA,NA,age,Age,NA,,,NA,,,NA,,,NA,,,3,10,p",
        // Unknown graph type.
        "cohort.csv,died,mortality,NA,NA,age,Age,NA,,,NA,,,NA,,,NA,,,3,10,x",
        // Dataset file does not exist.
        "other.csv,died,mortality,NA,NA,age,Age,NA,,,NA,,,NA,,,NA,,,3,10,p",
        // Pain is not binary.
        "cohort.csv,pain,Pain,NA,NA,age,Age,NA,,,NA,,,NA,,,NA,,,3,10,p",
        // Filter on a column the dataset lacks is ignored.
        "cohort.csv,pain,Pain,0,10,age,Age,smoker,==,1,ward,==,A,NA,,,NA,,,2,5,m",
    ]);

    assert_eq!(reports.len(), 6);
    assert_eq!(reason(&reports[0]), "Dataset is empty after applying filters");
    assert!(reason(&reports[1]).contains("'mortality'"));
    assert!(reason(&reports[2]).contains("Invalid graph type 'x'"));
    assert!(reason(&reports[3]).contains("other.csv"));
    assert!(reason(&reports[4]).contains("0/1"));

    let graph = reports[5].graph().expect("graph computed");
    assert_eq!(graph.skipped_filters, vec!["smoker".to_string()]);
    // Even ids in ward A, minus those with missing pain, plus the extra patient.
    assert_eq!(graph.result.n, 41);
    assert_eq!(graph.result.kind, StatisticKind::Median);

    assert_eq!(
        BatchSummary::of(&reports),
        BatchSummary {
            computed: 1,
            skipped: 5,
            failed: 0
        }
    );
}

#[test]
fn runs_are_reproducible_and_order_independent() {
    let rows = [
        "cohort.csv,pain,Pain,NA,NA,age,Age,NA,,,NA,,,NA,,,NA,,,3,5,c",
        "cohort.csv,pain,Pain,NA,NA,age,Age,NA,,,NA,,,NA,,,NA,,,3,5,m",
    ];
    let dir = tempfile::tempdir().unwrap();
    write_cohort(dir.path());
    let params = load_graph_params(&write_params(dir.path(), &rows)).unwrap();
    let requests = params.requests();

    let parallel = run_requests(&requests, &BatchConfig::default());
    let sequential = run_requests(
        &requests,
        &BatchConfig {
            parallel: false,
            ..Default::default()
        },
    );
    assert_eq!(parallel, sequential);

    let reseeded = run_requests(
        &requests,
        &BatchConfig {
            seed: 99,
            ..Default::default()
        },
    );
    let interval = |reports: &[GraphReport]| reports[0].graph().map(|g| g.result.interval);
    assert_ne!(interval(&parallel), interval(&reseeded));
}

#[test]
fn headless_summary_lists_every_graph() {
    let reports = run(&[
        "cohort.csv,died,mortality,NA,NA,age,Age,NA,,,NA,,,NA,,,NA,,,1,10,p",
        "cohort.csv,died,mortality,NA,NA,age,Age,sex,==,1,NA,,,NA,,,NA,,,3,10,p",
    ]);
    let mut renderer = SummaryRenderer::new(Vec::new());
    assert_eq!(render_all(&mut renderer, &reports), 1);
    renderer.write_problems(&reports).unwrap();
    let text = String::from_utf8(renderer.into_inner()).unwrap();

    assert!(text.contains("== mortality by Age Threshold (age_p_died_plot1.png) =="));
    assert!(text.contains("skipped age_p_died_plot3.png: Dataset is empty after applying filters"));
}
