// GitHub access module.
// Everything that talks to GitHub goes through the gh CLI as a subprocess.

pub mod exec;
pub mod pages;
pub mod runner;
pub mod types;

pub use exec::CommandOutput;
pub use runner::GhRunner;
pub use types::*;
