use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Issues and rotates user sessions")]
pub struct Cli {
    /// Path to a settings file, overriding the build default.
    #[arg(long)]
    pub settings: Option<String>,
}
