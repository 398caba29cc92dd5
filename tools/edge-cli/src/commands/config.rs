//! Configuration management commands.

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::CliConfig;
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Get { key } => get_config(&key, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    if let Some(ref path) = ctx.config_path {
        ctx.output.kv("file", &path.display().to_string());
    } else {
        ctx.output.warn("No config file found, showing defaults");
    }

    let site = &ctx.config.site_config;

    ctx.output.info("");
    ctx.output.info("[site]");
    if let Some(ref url) = site.site.url {
        ctx.output.kv("url", url);
    }
    ctx.output.kv("output", &site.site.output.to_string());

    ctx.output.info("");
    ctx.output.info("[adapter]");
    ctx.output.kv("kind", &site.adapter.kind.to_string());
    ctx.output.kv("streaming", &site.adapter.streaming.to_string());
    ctx.output.kv("fallback", &format!("{:?}", site.adapter.fallback).to_lowercase());

    if !site.bindings.is_empty() {
        ctx.output.info("");
        ctx.output.info("[[bindings]]");
        for binding in &site.bindings {
            ctx.output.list_item(&format!("{} ({})", binding.name, binding.kind));
        }
    }

    if let Some(ref name) = ctx.config.deploy.app_name {
        ctx.output.info("");
        ctx.output.info("[deploy]");
        ctx.output.kv("app_name", name);
    }

    if !ctx.config.environments.is_empty() {
        ctx.output.info("");
        ctx.output.info("Environments:");
        let mut names: Vec<&String> = ctx.config.environments.keys().collect();
        names.sort();
        for env in names {
            ctx.output.list_item(env);
        }
    }

    Ok(())
}

async fn get_config(key: &str, ctx: &Context) -> Result<()> {
    let value = get_config_value(&ctx.config, key)?;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({ "key": key, "value": value }));
    } else {
        println!("{}", value);
    }

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if let Err(e) = ctx.config.site_config.validate() {
        errors.push(e.to_string());
    }

    // Overrides are validated as the effective config they produce.
    for name in ctx.config.environments.keys() {
        let effective = ctx.config.for_environment(name);
        if let Err(e) = effective.site_config.validate() {
            errors.push(format!("environments.{}: {}", name, e));
        }
    }

    // A shape check against an empty build surfaces binding and output
    // mode problems without needing a manifest.
    let adapter = edge_adapter::adapter_for(ctx.config.site_config.clone());
    let shape = adapter.negotiate_output_shape();
    if let Err(e) = shape.check_output(ctx.config.site_config.output()) {
        errors.push(e.to_string());
    }
    for binding in &ctx.config.site_config.bindings {
        if !shape.supports_binding(binding.kind) {
            errors.push(format!(
                "{} cannot provide {} binding '{}'",
                shape.host, binding.kind, binding.name
            ));
        }
    }

    if ctx.config.site_config.site.url.is_none() {
        warnings.push("site.url is not set; entries cannot build absolute URLs".to_string());
    }
    if ctx.config.site_config.adapter.streaming && !shape.streaming.can_stream() {
        warnings.push(format!(
            "adapter.streaming is enabled but {} buffers every response",
            shape.host
        ));
    }

    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}

fn get_config_value(config: &CliConfig, key: &str) -> Result<String> {
    let parts: Vec<&str> = key.split('.').collect();
    let site = &config.site_config;

    match parts.as_slice() {
        ["site", "url"] => Ok(site
            .site
            .url
            .as_ref()
            .map(|u| format!("\"{}\"", u))
            .unwrap_or_else(|| "null".to_string())),
        ["site", "output"] => Ok(format!("\"{}\"", site.site.output)),
        ["adapter", "kind"] => Ok(format!("\"{}\"", site.adapter.kind)),
        ["adapter", "streaming"] => Ok(site.adapter.streaming.to_string()),
        ["adapter", "fallback"] => Ok(serde_json::to_string(&site.adapter.fallback)?),
        ["bindings"] => Ok(serde_json::to_string(&site.bindings)?),
        ["deploy", "app_name"] => Ok(config
            .deploy
            .app_name
            .as_ref()
            .map(|n| format!("\"{}\"", n))
            .unwrap_or_else(|| "null".to_string())),
        ["deploy", "manifest"] => Ok(config
            .deploy
            .manifest
            .as_ref()
            .map(|m| format!("\"{}\"", m))
            .unwrap_or_else(|| "null".to_string())),
        _ => bail!("Unknown config key: {}", key),
    }
}
