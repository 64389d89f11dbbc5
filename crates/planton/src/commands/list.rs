use colored::Colorize;
use planton_core::{DeploymentComponent, Provider, SchemaRegistry};

pub fn handle(provider: Option<&str>) -> anyhow::Result<()> {
    let provider = provider
        .map(|p| p.parse::<Provider>().map_err(anyhow::Error::msg))
        .transpose()?;

    let registry = SchemaRegistry::builtin()?;
    let components = select(registry.components(), provider);

    if components.is_empty() {
        println!("{}", "No deployment components found".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("{:<28} {:<14} {:<40} {}", "KIND", "PROVIDER", "API VERSION", "IAC").bold()
    );
    for c in &components {
        let iac = c
            .iac
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{} {:<14} {:<40} {}",
            format!("{:<28}", c.kind).cyan(),
            c.provider.as_str(),
            c.api_version,
            iac
        );
    }
    println!();
    println!("{} kind(s)", components.len());
    Ok(())
}

/// Components of one provider (or all), ordered by provider then kind
fn select<'a>(
    components: impl Iterator<Item = &'a DeploymentComponent>,
    provider: Option<Provider>,
) -> Vec<&'a DeploymentComponent> {
    let mut selected: Vec<_> = components
        .filter(|c| provider.is_none_or(|p| c.provider == p))
        .collect();
    selected.sort_by(|a, b| (a.provider, &a.kind).cmp(&(b.provider, &b.kind)));
    selected
}
