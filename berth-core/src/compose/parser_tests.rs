//! Tests for the stack definition parser.

use super::*;

#[test]
fn test_parse_basic_definition() {
    let yaml = r#"
version: "3"
services:
  web:
    image: nginx:latest
    ports:
      - "8080:80"
"#;
    let def = ComposeParser::parse(yaml).unwrap();
    assert_eq!(def.version, "3");
    assert_eq!(def.services.len(), 1);
    assert!(def.services.contains_key("web"));

    let web = &def.services["web"];
    assert_eq!(web.image, "nginx:latest");
    assert_eq!(web.ports, vec!["8080:80"]);
    assert_eq!(web.restart_policy(), "unless-stopped");
}

#[test]
fn test_parse_numeric_version_and_ports() {
    let yaml = r#"
version: 3.8
services:
  api:
    image: api
    ports:
      - 9000
"#;
    let def = ComposeParser::parse(yaml).unwrap();
    assert_eq!(def.version, "3.8");
    assert_eq!(def.services["api"].ports, vec!["9000"]);
}

#[test]
fn test_parse_environment_list() {
    let yaml = r#"
services:
  app:
    image: myapp:latest
    environment:
      - ENV=prod
      - DEBUG=false
"#;
    let def = ComposeParser::parse(yaml).unwrap();
    let env = def.services["app"].environment.to_list();
    assert_eq!(env, vec!["ENV=prod", "DEBUG=false"]);
}

#[test]
fn test_parse_environment_map() {
    let yaml = r#"
services:
  app:
    image: myapp:latest
    environment:
      ENV: prod
      DEBUG: false
      WORKERS: 4
"#;
    let def = ComposeParser::parse(yaml).unwrap();
    let env = def.services["app"].environment.to_list();
    assert_eq!(env, vec!["ENV=prod", "DEBUG=false", "WORKERS=4"]);
}

#[test]
fn test_parse_preserves_declaration_order() {
    let yaml = r#"
services:
  zeta:
    image: a
  alpha:
    image: b
  mid:
    image: c
networks:
  frontend:
  backend:
    driver: bridge
"#;
    let def = ComposeParser::parse(yaml).unwrap();
    let keys: Vec<&str> = def.services.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    assert_eq!(def.attachment_network(), Some("frontend"));
    assert_eq!(def.networks["backend"].driver.as_deref(), Some("bridge"));
}

#[test]
fn test_parse_null_volume_bodies() {
    let yaml = r#"
services:
  db:
    image: postgres
volumes:
  data:
  cache: {}
"#;
    let def = ComposeParser::parse(yaml).unwrap();
    assert_eq!(def.volumes.len(), 2);
    assert!(def.volumes["data"].driver.is_none());
}

#[test]
fn test_parse_missing_services() {
    let yaml = r#"
version: "3"
networks:
  default: {}
"#;
    let err = ComposeParser::parse(yaml).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("services"));
}

#[test]
fn test_parse_invalid_yaml() {
    let err = ComposeParser::parse("services: [unclosed").unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_parse_non_mapping_document() {
    let err = ComposeParser::parse("- just\n- a list\n").unwrap_err();
    assert!(err.to_string().contains("mapping"));
}

#[test]
fn test_parse_leaves_nested_fields_unchecked() {
    // Malformed entries are the validator's concern, not the parser's.
    let yaml = r#"
services:
  web:
    image: nginx
    ports:
      - "not-a-port"
"#;
    let def = ComposeParser::parse(yaml).unwrap();
    assert_eq!(def.services["web"].ports, vec!["not-a-port"]);
    assert!(validate(&def).is_err());
}

#[test]
fn test_parse_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compose.yml");
    std::fs::write(&path, "services:\n  web:\n    image: nginx\n").unwrap();

    let def = ComposeParser::parse_file(&path).unwrap();
    assert_eq!(def.services["web"].image, "nginx");

    let missing = ComposeParser::parse_file(dir.path().join("nope.yml"));
    assert!(missing.unwrap_err().is_validation());
}
