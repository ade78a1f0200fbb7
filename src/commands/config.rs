use anyhow::Result;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::{RawSettings, Settings, default_config_path};
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    ui::header("Settings");

    let path = match &ctx.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    println!();
    ui::kv("Settings file", &path.display().to_string());
    if !path.exists() {
        ui::dim("Not found; using the environment only");
    }
    println!();

    let raw = RawSettings::load(ctx.config.as_deref())?;
    for (key, value) in raw.redacted() {
        ui::kv(key, &value);
    }

    println!();
    match Settings::try_from(raw) {
        Ok(_) => ui::success("Settings are valid"),
        Err(e) => ui::warn(&format!("Settings are incomplete: {e}")),
    }
    Ok(())
}
