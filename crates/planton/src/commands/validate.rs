use crate::args::ManifestArgs;
use crate::manifest;
use colored::Colorize;
use planton_core::{Violation, validate};

pub async fn handle(args: ManifestArgs) -> anyhow::Result<()> {
    println!("{}", "Validating manifest...".blue());

    let manifest = manifest::load(&args).await?;
    println!(
        "Kind: {} ({})",
        manifest.kind().cyan(),
        manifest.name()
    );

    let violations = validate(manifest.message());
    if violations.is_empty() {
        println!("{}", "✓ Manifest is valid".green().bold());
        return Ok(());
    }

    print_violations(&violations);
    std::process::exit(1);
}

pub fn print_violations(violations: &[Violation]) {
    eprintln!(
        "{}",
        format!("✗ {} validation error(s)", violations.len())
            .red()
            .bold()
    );
    for v in violations {
        eprintln!(
            "  • {}: {} {}",
            v.field_path.yellow(),
            v.message,
            format!("[{}]", v.rule_id).dimmed()
        );
    }
}
