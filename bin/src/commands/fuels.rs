//! Fuels command implementation.
//!
//! Lists the fuel types offered for selection.

use anyhow::Result;
use carburantes_lib::prelude::*;

/// Print the fuel catalog, or only its basic preset.
pub(crate) fn list_fuels(basic_only: bool) -> Result<()> {
    let catalog = FuelCatalog::global();
    let fuels: Vec<_> = if basic_only {
        catalog.basic().collect()
    } else {
        catalog.all().collect()
    };

    println!("{:<28} {:<8}", "NAME", "BASIC");
    println!("{}", "-".repeat(36));

    for fuel in &fuels {
        let marker = if fuel.is_basic() { "yes" } else { "" };
        println!("{:<28} {:<8}", fuel.name(), marker);
    }

    println!("\nTotal: {} fuel types", fuels.len());
    Ok(())
}
