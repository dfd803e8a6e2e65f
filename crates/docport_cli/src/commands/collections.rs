//! Collections command.

use super::Target;

/// Lists non-system collections.
pub fn run(target: &Target, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let service = target.connect()?;
    let names = service.collections()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    println!("Collections in {} ({}):", target.database, names.len());
    for name in names {
        println!("  {name}");
    }
    Ok(())
}
