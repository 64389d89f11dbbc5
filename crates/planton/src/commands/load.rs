use crate::args::ManifestArgs;
use crate::manifest;

pub async fn handle(args: ManifestArgs) -> anyhow::Result<()> {
    let manifest = manifest::load(&args).await?;
    print!("{}", manifest.to_yaml()?);
    Ok(())
}
