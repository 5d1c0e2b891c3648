use crate::cli::Cli;
use crate::error::Result;
use crate::registry::capability::{build_guidance_for, runtime_version_from_user_agent};

pub async fn run(cli: &Cli, runtime_version: Option<u32>, user_agent: Option<&str>) -> Result<()> {
    let config = cli.load_config()?;

    let version = runtime_version
        .or_else(|| user_agent.and_then(runtime_version_from_user_agent))
        .unwrap_or_else(|| config.runtime.effective_version());
    let guidance = build_guidance_for(version, config.runtime.effective_extension_id());

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "runtimeVersion": version,
                "guidance": guidance,
            })
        );
    } else {
        println!("{}", guidance);
    }

    Ok(())
}
