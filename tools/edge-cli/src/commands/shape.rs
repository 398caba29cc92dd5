//! Print the output shape the configured adapter negotiates.

use anyhow::Result;
use edge_adapter::adapter_for;

use super::ShapeArgs;
use crate::context::Context;

/// Run the shape command.
pub async fn run(args: ShapeArgs, ctx: &Context) -> Result<()> {
    let config = match args.env.as_deref() {
        Some(env) => ctx.config.for_environment(env),
        None => ctx.config.clone(),
    };

    let spec = adapter_for(config.site_config).negotiate_output_shape();
    if ctx.output.is_json() || !ctx.output.is_verbose() {
        println!("{}", spec.to_json()?);
        return Ok(());
    }

    ctx.output.header(&format!("Output shape for {}", spec.host));
    let signatures: Vec<String> = spec
        .accepted_signatures
        .iter()
        .map(ToString::to_string)
        .collect();
    ctx.output.kv("signatures", &signatures.join(", "));
    ctx.output.kv("streaming", &format!("{:?}", spec.streaming));
    ctx.output.kv(
        "output",
        &spec
            .required_output
            .map_or_else(|| "static or server".to_string(), |m| m.to_string()),
    );
    ctx.output.kv("module format", &spec.module_format);
    let kinds: Vec<String> = spec.binding_kinds.iter().map(ToString::to_string).collect();
    ctx.output.kv("bindings", &kinds.join(", "));
    println!("{}", spec.to_json()?);

    Ok(())
}
