//! Writes the web app's config.js from environment variables so credentials
//! never land in the repository.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use stash::config::{WebConfig, DEFAULT_SUPABASE_URL};

#[derive(Parser, Debug)]
#[command(
    name = "generate-config",
    about = "Generate web/config.js from environment variables"
)]
struct GenerateCli {
    /// Supabase project url
    #[arg(long, env = "SUPABASE_URL", default_value = DEFAULT_SUPABASE_URL)]
    supabase_url: String,

    /// Supabase anon (public) key
    #[arg(long, env = "SUPABASE_ANON_KEY", default_value = "")]
    supabase_anon_key: String,

    /// Supabase auth user id the web app reads saves for
    #[arg(long, env = "USER_ID", default_value = "")]
    user_id: String,

    /// Where to write the generated file
    #[arg(default_value = "web/config.js")]
    output: PathBuf,
}

impl GenerateCli {
    fn web_config(&self) -> WebConfig {
        WebConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = GenerateCli::parse();
    let config = cli.web_config();
    if config.supabase_anon_key.is_empty() || config.user_id.is_empty() {
        eprintln!("warning: SUPABASE_ANON_KEY or USER_ID is not set");
    }

    if let Some(parent) = cli.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    std::fs::write(&cli.output, config.render())
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    println!("Wrote config.js from environment variables");
    Ok(())
}
