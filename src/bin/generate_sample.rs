use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Write a synthetic cohort and a matching graph parameter file.
#[derive(Parser, Debug)]
struct Args {
    /// Output directory
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Number of patients
    #[arg(long, default_value_t = 500)]
    rows: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

struct Cohort {
    id: Vec<i64>,
    age: Vec<f64>,
    sex: Vec<i64>,
    bmi: Vec<Option<f64>>,
    pain: Vec<f64>,
    died: Vec<i64>,
}

fn generate(rows: usize, rng: &mut Xoshiro256PlusPlus) -> Result<Cohort> {
    let bmi_dist = Normal::<f64>::new(27.0, 4.5)?;
    let pain_noise = Normal::<f64>::new(0.0, 1.2)?;

    let mut cohort = Cohort {
        id: Vec::with_capacity(rows),
        age: Vec::with_capacity(rows),
        sex: Vec::with_capacity(rows),
        bmi: Vec::with_capacity(rows),
        pain: Vec::with_capacity(rows),
        died: Vec::with_capacity(rows),
    };

    for i in 0..rows {
        let age: f64 = rng.random_range(40.0..=90.0);
        let sex = if rng.random_bool(0.55) { 2 } else { 1 };
        let bmi: f64 = bmi_dist.sample(rng).clamp(16.0, 50.0);
        // Pain rises with BMI, on a 0..10 scale.
        let pain = (2.0 + 0.15 * (bmi - 20.0) + pain_noise.sample(rng)).clamp(0.0, 10.0);
        // Mortality risk climbs steeply in the late seventies.
        let risk = 1.0 / (1.0 + (-(age - 78.0) / 5.0).exp());
        let died = i64::from(rng.random_bool(risk * 0.8));

        cohort.id.push(i as i64 + 1);
        cohort.age.push((age * 10.0).round() / 10.0);
        cohort.sex.push(sex);
        cohort.bmi.push((!rng.random_bool(0.05)).then(|| (bmi * 10.0).round() / 10.0));
        cohort.pain.push((pain * 10.0).round() / 10.0);
        cohort.died.push(died);
    }
    Ok(cohort)
}

fn write_parquet(cohort: &Cohort, path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("age", DataType::Float64, false),
        Field::new("sex", DataType::Int64, false),
        Field::new("bmi", DataType::Float64, true),
        Field::new("pain", DataType::Float64, false),
        Field::new("died", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(cohort.id.clone())),
            Arc::new(Float64Array::from(cohort.age.clone())),
            Arc::new(Int64Array::from(cohort.sex.clone())),
            Arc::new(Float64Array::from(cohort.bmi.clone())),
            Arc::new(Float64Array::from(cohort.pain.clone())),
            Arc::new(Int64Array::from(cohort.died.clone())),
        ],
    )
    .context("Failed to create RecordBatch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Graph definitions exercising every graph type and plot side. The last row
/// filters on a sex code nobody has, so it is reported as skipped.
fn write_params(data_file: &str, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "excel_file", "outcome", "oname", "oLL", "oUL", "variable", "vname",
        "filter1", "f1op", "f1criteria", "filter2", "f2op", "f2criteria",
        "filter3", "f3op", "f3criteria", "filter4", "f4op", "f4criteria",
        "plot_type", "min_n", "graphtype",
    ])?;
    let rows = [
        ["died", "mortality", "NA", "NA", "age", "Age (years)", "NA", "", "", "3", "20", "p"],
        ["died", "mortality", "NA", "NA", "age", "Age (years)", "sex", "==", "2", "1", "20", "p"],
        ["pain", "pain score", "0", "10", "bmi", "BMI", "age", ">=", "60", "3", "15", "c"],
        ["pain", "pain score", "0", "10", "bmi", "BMI", "NA", "", "", "2", "15", "m"],
        ["pain", "pain score", "NA", "NA", "age", "Age (years)", "sex", "==", "3", "3", "10", "c"],
    ];
    for row in rows {
        let [outcome, oname, o_ll, o_ul, variable, vname, filter, op, criterion, plot_type, min_n, graphtype] =
            row;
        writer.write_record([
            data_file, outcome, oname, o_ll, o_ul, variable, vname, filter, op, criterion,
            "NA", "", "", "NA", "", "", "NA", "", "", plot_type, min_n, graphtype,
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(args.seed);

    let cohort = generate(args.rows, &mut rng)?;

    std::fs::create_dir_all(&args.out_dir)?;
    let data_name = "sample_cohort.parquet";
    let data_path = args.out_dir.join(data_name);
    write_parquet(&cohort, &data_path)?;
    let params_path = args.out_dir.join("sample_graphs.csv");
    write_params(data_name, &params_path)?;

    println!(
        "Wrote {} patients to {} and graph parameters to {}",
        args.rows,
        data_path.display(),
        params_path.display()
    );
    Ok(())
}
