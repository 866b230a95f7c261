use crate::core::config::ErrorCorrection;
use crate::core::error::QrForgeError;
use crate::core::workspace::ArtifactPrefix;
use crate::pipeline::codec::{QrPngCodec, RgbColor};
use crate::pipeline::input::WorkItem;
use crate::pipeline::orchestrator::run_single;
use crate::pipeline::producer::{Outcome, Producer};
use crate::plugins::{RunContext, single_outcome_error};
use colored::Colorize;
use regex::Regex;
use std::sync::OnceLock;

pub const CUSTOM_KIND: &str = "custom";

#[derive(clap::Args, Debug)]
pub struct CustomCli {
    /// Payload to encode.
    pub value: String,
    /// Foreground colour: a name (red, blue, ...) or hex (#f00, #ff0000).
    pub color: Option<String>,
    /// Background colour, same syntax as the foreground.
    #[clap(long)]
    pub background: Option<String>,
}

fn hex_pattern() -> &'static Regex {
    static HEX: OnceLock<Regex> = OnceLock::new();
    HEX.get_or_init(|| {
        Regex::new(r"^#?(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("static hex pattern")
    })
}

pub fn parse_color(input: &str) -> Result<RgbColor, QrForgeError> {
    let s = input.trim();
    let named = match s.to_ascii_lowercase().as_str() {
        "black" => Some([0, 0, 0]),
        "white" => Some([255, 255, 255]),
        "red" => Some([255, 0, 0]),
        "green" => Some([0, 255, 0]),
        "blue" => Some([0, 0, 255]),
        "yellow" => Some([255, 255, 0]),
        "purple" => Some([128, 0, 128]),
        "orange" => Some([255, 165, 0]),
        "gray" | "grey" => Some([128, 128, 128]),
        _ => None,
    };
    if let Some(rgb) = named {
        return Ok(RgbColor(rgb));
    }

    if !hex_pattern().is_match(s) {
        return Err(QrForgeError::InvalidInput(format!(
            "unsupported color format: {}",
            s
        )));
    }
    let hex = s.trim_start_matches('#');
    let hex: String = if hex.len() == 3 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex.to_string()
    };

    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|e| QrForgeError::InvalidInput(format!("bad color channel in {}: {}", s, e)))
    };
    Ok(RgbColor([channel(0)?, channel(2)?, channel(4)?]))
}

/// Unparseable colours fall back to `default` with a warning.
fn color_or(input: Option<&str>, default: RgbColor) -> RgbColor {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(s) => parse_color(s).unwrap_or_else(|e| {
            tracing::warn!(color = s, error = %e, "ignoring colour");
            default
        }),
    }
}

pub fn run_custom_cli(ctx: &RunContext, cli: CustomCli) -> Result<(), QrForgeError> {
    let item = WorkItem::new(&cli.value, Some(CUSTOM_KIND), 0)?;
    ctx.workspace.ensure_output_dir()?;

    let codec = QrPngCodec::from_config(&ctx.config.codec)
        .with_ec_level(ErrorCorrection::High)
        .with_colors(
            color_or(cli.color.as_deref(), RgbColor::BLACK),
            color_or(cli.background.as_deref(), RgbColor::WHITE),
        );
    let producer =
        Producer::new(&ctx.store, &codec, &ctx.workspace).with_prefix(ArtifactPrefix::Custom);

    let outcome = run_single(&producer, item);
    ctx.record_events(&[outcome.to_event("custom")]);
    if let Some(err) = single_outcome_error(&outcome) {
        return Err(err);
    }

    let payload = serde_json::to_value(&outcome)?;
    ctx.emit("custom", outcome.outcome.status(), payload, || {
        match &outcome.outcome {
            Outcome::Produced { artifact_path } => println!(
                "{} {}",
                "Custom QR generated at:".bright_green(),
                artifact_path.display()
            ),
            Outcome::Skipped { artifact_path } => println!(
                "{} {}",
                "Found in DB, QR at:".bright_cyan(),
                artifact_path.display()
            ),
            Outcome::Failed { .. } => {}
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_colours_are_case_insensitive() {
        assert_eq!(parse_color("Red").unwrap(), RgbColor([255, 0, 0]));
        assert_eq!(parse_color(" grey ").unwrap(), RgbColor([128, 128, 128]));
    }

    #[test]
    fn six_digit_hex_with_or_without_hash() {
        assert_eq!(parse_color("#1a2B3c").unwrap(), RgbColor([0x1a, 0x2b, 0x3c]));
        assert_eq!(parse_color("ff8000").unwrap(), RgbColor([255, 128, 0]));
    }

    #[test]
    fn three_digit_hex_expands() {
        assert_eq!(parse_color("#f0a").unwrap(), RgbColor([0xff, 0x00, 0xaa]));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("chartreuse").is_err());
        assert!(parse_color("#gggggg").is_err());
    }

    #[test]
    fn unparseable_colour_falls_back_to_default() {
        assert_eq!(color_or(Some("nope"), RgbColor::BLACK), RgbColor::BLACK);
        assert_eq!(color_or(Some("  "), RgbColor::WHITE), RgbColor::WHITE);
        assert_eq!(color_or(Some("blue"), RgbColor::BLACK), RgbColor([0, 0, 255]));
    }
}
