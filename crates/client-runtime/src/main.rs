//! # schema-check
//!
//! ```text
//! schema-check <schema.json>                                  verify the document
//! schema-check <schema.json> <Service.method> '<params json>' validate one call
//! ```
//!
//! Exits non-zero when the document does not load or the params are invalid.

use anyhow::{bail, Context, Result};
use rc_01_type_registry::{SchemaDocument, TypeRegistry};
use rc_02_validator::Validator;
use rc_telemetry::{init_telemetry, TelemetryConfig};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env().with_service_name("schema-check"))?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (path, call) = match args.as_slice() {
        [path] => (path, None),
        [path, target, params] => (path, Some((target, params))),
        _ => bail!("usage: schema-check <schema.json> [<Service.method> <params-json>]"),
    };

    let document = SchemaDocument::from_path(path)
        .with_context(|| format!("Failed to read schema document {}", path))?;
    let registry = TypeRegistry::from_document(&document)
        .with_context(|| format!("Schema document {} does not verify", path))?;

    info!(
        types = registry.type_count(),
        methods = registry.method_count(),
        services = registry.service_names().len(),
        "Schema verified"
    );
    println!(
        "{}: {} types, {} services, {} methods",
        path,
        registry.type_count(),
        registry.service_names().len(),
        registry.method_count()
    );

    let Some((target, params)) = call else {
        return Ok(());
    };
    let Some((service, method)) = target.split_once('.') else {
        bail!("call must be written Service.method, got {}", target);
    };
    let params: Value =
        serde_json::from_str(params).context("Params are not valid JSON")?;

    let validator = Validator::new(Arc::new(registry));
    if validator.validate_call(service, method, &params)? {
        println!("{}: params valid", target);
        return Ok(());
    }
    match validator.last_error() {
        Some(failure) => bail!("{}: params invalid: {}", target, failure),
        None => bail!("{}: params invalid", target),
    }
}
