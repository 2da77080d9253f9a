#[test]
fn sitepulse_version_contract() {
    let bin = assert_cmd::cargo::cargo_bin!("sitepulse");
    let out = std::process::Command::new(bin)
        .args(["version"])
        .env_remove("SITEPULSE_ENV_FILE")
        .output()
        .expect("run sitepulse version");

    assert!(out.status.success(), "sitepulse version failed");
    let s = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse version json");

    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["kind"].as_str(), Some("version"));
    assert_eq!(v["name"].as_str(), Some("sitepulse"));
    assert!(!v["version"].as_str().unwrap_or("").is_empty());
}

#[test]
fn sitepulse_version_text_output_contract() {
    let bin = assert_cmd::cargo::cargo_bin!("sitepulse");
    let out = std::process::Command::new(bin)
        .args(["version", "--output", "text"])
        .output()
        .expect("run sitepulse version --output text");

    assert!(out.status.success(), "sitepulse version failed");
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(
        s.trim_start().starts_with("sitepulse "),
        "expected text output to start with `sitepulse `"
    );
}
