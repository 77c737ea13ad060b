use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Value of `#define NAME "value"` in a C header
fn define(contents: &str, name: &str) -> Option<String> {
    contents
        .lines()
        .filter_map(|l| l.trim().strip_prefix("#define"))
        .find(|rest| rest.split_whitespace().next() == Some(name))
        .and_then(|rest| rest.split('"').nth(1))
        .map(str::to_string)
}

/// Build stamp for the boot banner, in UTC
fn build_timestamp() -> anyhow::Result<String> {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
    Ok(ota_core::build_info::compile_timestamp(secs))
}

fn main() -> anyhow::Result<()> {
    // Necessary for ESP-IDF
    embuild::espidf::sysenv::output();

    println!("cargo:rerun-if-changed=wifi_config.h");
    // Stamp refreshes whenever the firmware sources change
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp()?);

    let wifi_config_path = "wifi_config.h";
    if Path::new(wifi_config_path).exists() {
        let contents = fs::read_to_string(wifi_config_path)?;
        for name in ["WIFI_SSID", "WIFI_PASSWORD", "OTA_PASSWORD"] {
            let value = define(&contents, name).unwrap_or_default();
            println!("cargo:rustc-env={}={}", name, value);
        }
    } else {
        println!("cargo:rustc-env=WIFI_SSID=");
        println!("cargo:rustc-env=WIFI_PASSWORD=");
        println!("cargo:rustc-env=OTA_PASSWORD=");
        println!("cargo:warning=wifi_config.h not found! Copy wifi_config.h.example to wifi_config.h and add your credentials.");
    }

    Ok(())
}
