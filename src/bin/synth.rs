//! Write a seeded synthetic wager export to stdout.
//!
//! Usage: synth [rows] [seed] > data.csv

use anyhow::Result;

use tipfilter::synth::synthetic_table;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let rows: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(1000);
    let seed: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(42);

    let table = synthetic_table(rows, seed);
    let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
    writer.write_record(&table.headers)?;
    for record in &table.records {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}
