use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn no_env(_: &str) -> Option<String> {
    None
}

fn temp_file(label: &str, contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("eholdings_mock_server_{label}_{suffix}.toml"));
    fs::write(&path, contents).expect("write settings");
    path
}

#[test]
fn missing_file_keeps_defaults() {
    let settings = load_settings_from(Path::new("/nonexistent/mock_server.toml"), no_env);
    assert_eq!(settings, Settings::default());
}

#[test]
fn file_values_override_defaults() {
    let path = temp_file(
        "file_values",
        "bind_addr = \"0.0.0.0:9000\"\nfixtures_path = \"fixtures.json\"\nresponse_delay_ms = 250\n",
    );

    let settings = load_settings_from(&path, no_env);

    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.fixtures_path.as_deref(), Some("fixtures.json"));
    assert_eq!(settings.response_delay_ms, 250);
    fs::remove_file(path).expect("cleanup");
}

#[test]
fn app_env_wins_over_alias_and_file() {
    let path = temp_file("env", "bind_addr = \"0.0.0.0:9000\"\n");
    let vars: HashMap<&str, &str> = HashMap::from([
        ("SERVER_BIND", "127.0.0.1:7000"),
        ("APP__BIND_ADDR", "127.0.0.1:7001"),
        ("APP__RESPONSE_DELAY_MS", "not-a-number"),
        ("APP__FIXTURES_PATH", " "),
    ]);

    let settings = load_settings_from(&path, |name| vars.get(name).map(|v| v.to_string()));

    assert_eq!(settings.server_bind, "127.0.0.1:7001");
    assert_eq!(settings.response_delay_ms, 0);
    assert_eq!(settings.fixtures_path, None);
    fs::remove_file(path).expect("cleanup");
}

#[test]
fn unparseable_file_is_ignored() {
    let path = temp_file("broken", "bind_addr = [");
    assert_eq!(load_settings_from(&path, no_env), Settings::default());
    fs::remove_file(path).expect("cleanup");
}
