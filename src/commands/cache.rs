// Cache commands.

use crate::cache::{CacheStore, paths};
use crate::cli::CacheCommands;
use crate::error::{HerdError, Result};

pub fn run(command: CacheCommands) -> Result<()> {
    match command {
        CacheCommands::Clear => clear(),
    }
}

fn clear() -> Result<()> {
    let path = paths::cache_path().ok_or(HerdError::MissingProjectDirs)?;
    CacheStore::new(path).clear()?;
    println!("Cache cleared");
    Ok(())
}
