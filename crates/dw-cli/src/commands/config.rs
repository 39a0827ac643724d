//! `dw config-show` / `dw config-hash` — mirrors `mqk-cli`'s `config-hash`,
//! plus a `from_env()` summary since this engine's process config is a
//! layered env resolution (`DwConfig`) rather than only file-based YAML.

use anyhow::Result;

pub fn show() -> Result<()> {
    match dw_config::DwConfig::from_env() {
        Ok(cfg) => {
            println!("{:#?}", cfg);
            Ok(())
        }
        Err(e) => {
            eprintln!("config_error={e}");
            std::process::exit(1);
        }
    }
}

pub fn hash(paths: &[String]) -> Result<()> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = dw_config::load_layered_yaml(&path_refs)?;
    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}
