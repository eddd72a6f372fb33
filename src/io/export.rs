//! CSV export for environment step results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepResult;

/// Column header for CSV telemetry export.
const HEADER: &str = "timestep,renewable_kw,load_kw,price_import_per_kwh,\
                       price_export_per_kwh,safe_battery_kw,\
                       battery_kw,grid_kw,soc,temperature_c,unmet_kwh,curtailed_kwh,\
                       clip_kwh,grid_cost,degradation_cost,penalty_cost,reward,\
                       safety_reason,done";

/// Exports step results to a CSV file at the given path.
///
/// Writes a header row followed by one data row per step. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `results` - Step results of one or more episodes
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes step results as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in results {
        let d = &r.diagnostics;
        let sd = &d.safety_decision;
        wtr.write_record(&[
            d.timestep.to_string(),
            format!("{:.4}", d.renewable_kw),
            format!("{:.4}", d.load_kw),
            format!("{:.5}", d.price_import_per_kwh),
            format!("{:.5}", d.price_export_per_kwh),
            format!("{:.4}", sd.safe_battery_kw),
            format!("{:.4}", d.realized_battery_kw),
            format!("{:.4}", d.realized_grid_kw),
            format!("{:.6}", d.soc),
            format!("{:.4}", d.temperature_c),
            format!("{:.6}", d.unmet_energy_kwh),
            format!("{:.6}", d.curtailed_energy_kwh),
            format!("{:.6}", d.clip_energy_kwh),
            format!("{:.6}", r.costs.grid_cost),
            format!("{:.6}", r.costs.degradation_cost),
            format!("{:.6}", r.costs.penalty_cost),
            format!("{:.6}", r.reward),
            sd.reason.to_string(),
            r.done.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::StaticProfile;
    use crate::sim::controller::RandomPolicy;
    use crate::sim::engine::Environment;
    use crate::sim::types::MicrogridParams;
    use crate::evaluation::rollout;

    fn results(seed: u64) -> Vec<StepResult> {
        let mut params = MicrogridParams::default();
        params.env.horizon = 12;
        let mut policy = RandomPolicy::new(&params.battery, seed);
        let mut env = Environment::new(params, StaticProfile::constant(40.0, 90.0, 0.15)).unwrap();
        rollout(&mut env, &mut policy, seed).unwrap()
    }

    fn render(results: &[StepResult]) -> String {
        let mut buf = Vec::new();
        write_csv(results, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_matches_schema() {
        let out = render(&results(1));
        assert_eq!(
            out.lines().next().unwrap(),
            "timestep,renewable_kw,load_kw,price_import_per_kwh,price_export_per_kwh,\
             safe_battery_kw,battery_kw,grid_kw,soc,temperature_c,unmet_kwh,curtailed_kwh,\
             clip_kwh,grid_cost,degradation_cost,penalty_cost,reward,safety_reason,done"
        );
    }

    #[test]
    fn row_count_matches_step_count() {
        let out = render(&results(2));
        // 1 header + 12 data rows
        assert_eq!(out.lines().count(), 13);
        assert!(out.lines().last().unwrap().ends_with(",true"));
    }

    #[test]
    fn deterministic_output() {
        assert_eq!(render(&results(3)), render(&results(3)));
    }

    #[test]
    fn numeric_columns_parse() {
        let out = render(&results(4));
        let mut rdr = csv::Reader::from_reader(out.as_bytes());
        assert_eq!(rdr.headers().unwrap().len(), 19);
        for rec in rdr.records() {
            let rec = rec.unwrap();
            for i in 1..17 {
                assert!(rec[i].parse::<f64>().is_ok(), "column {i} should parse as f64");
            }
            assert!(rec[18].parse::<bool>().is_ok());
        }
    }
}
