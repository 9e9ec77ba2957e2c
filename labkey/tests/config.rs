mod common;

use std::{env, fs};

use anyhow::Result;
use labkey::{load_connections, Error};

const SERVERS: &str = r#"
default:
  email: foo@bar.com
  password: foobar
  project: home
  schema: study
  query_name: specimens
  columns: [gender, age]
  aliases:
    specimen_id/donor_sex: gender
  custom_columns:
    batch: 2024-01
servers:
  - host: http://lab-a.example.org/labkey/
    custom_columns:
      batch: 2024-01
      site: a
  - host: http://lab-b.example.org/labkey/
    email: other@bar.com
"#;

#[test]
fn loads_connections_through_environment_path() -> Result<()> {
    common::init_logging();
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("servers.yml"), SERVERS)?;
    env::set_var("LABKEY_CONFIG_TEST_DIR", dir.path());

    let connections = load_connections("$LABKEY_CONFIG_TEST_DIR/servers.yml")?;

    assert_eq!(connections.len(), 2);
    assert_eq!(connections[0].host().as_str(), "http://lab-a.example.org/labkey/");
    assert_eq!(connections[0].email(), "foo@bar.com");
    assert_eq!(connections[0].custom_columns().len(), 2);
    assert_eq!(connections[1].email(), "other@bar.com");
    assert_eq!(connections[1].custom_columns()["batch"], "2024-01");
    assert_eq!(connections[1].columns(), ["gender", "age"]);
    assert!(connections.iter().all(|c| !c.session().is_authenticated()));
    Ok(())
}

#[test]
fn unreadable_file_is_a_config_error() {
    let err = load_connections("/definitely/not/here/servers.yml").unwrap_err();
    assert!(matches!(err, Error::ConfigRead { .. }));
}

#[test]
fn malformed_yaml_is_a_config_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("servers.yml");
    fs::write(&path, "servers: [unterminated")?;

    let err = load_connections(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::ConfigParse(_)));
    Ok(())
}

#[test]
fn invalid_host_is_a_config_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("servers.yml");
    fs::write(&path, SERVERS.replace("http://lab-b.example.org/labkey/", "lab-b"))?;

    let err = load_connections(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::Config(msg) if msg.contains("servers[1]") && msg.contains("lab-b")));
    Ok(())
}
