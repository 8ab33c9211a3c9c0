//! Settings come from a TOML file (see `settings/`), selectable with
//! `--settings <path>`.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
