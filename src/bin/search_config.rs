//! Write the search settings file, creating it with defaults when absent.
//!
//! Usage: search_config [path]
//!
//! An existing file is read back (missing keys defaulted, minimums clamped)
//! and rewritten in canonical form.

use anyhow::Result;

use tipfilter::config::ConfigStore;

fn main() -> Result<()> {
    let store = match std::env::args().nth(1) {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::from_env(),
    };
    let settings = store.load();
    store.save(&settings)?;
    println!("{}", settings.to_json());
    eprintln!("wrote {}", store.path().display());
    Ok(())
}
