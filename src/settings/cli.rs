use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "tollgate", version, about = "JWT access/refresh token service")]
pub struct Cli {
    /// Path to a settings TOML file. Defaults to settings/dev.toml in debug builds.
    #[arg(long)]
    pub settings: Option<String>,
}
