//! Tests for configuration file loading

use crate::config::*;
use indoc::indoc;
use std::path::PathBuf;

fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

mod load_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "dvsync.toml",
            indoc! {r#"
                [connection]
                org_url = "https://contoso.crm.dynamics.com"
                tenant_id = "tenant"

                [tables]
                Customer = "account"

                [native_fields]
                replace_defaults = true
                LastLoginAt = "cr123_lastlogin"

                [apply]
                backup_solution = "CoreSolution"
                backup_dir = "backups"
                abort_on_backup_failure = true
            "#},
        );

        let config = FileConfig::load(&path).unwrap();

        assert_eq!(
            config.connection.org_url.as_deref(),
            Some("https://contoso.crm.dynamics.com")
        );
        assert_eq!(config.connection.client_id, None);
        assert_eq!(config.tables.get("customer"), Some("account"));
        assert!(config.native_fields.replace_defaults);
        assert_eq!(config.apply.backup_solution.as_deref(), Some("CoreSolution"));
        assert_eq!(config.apply.backup_dir, Some(PathBuf::from("backups")));
        assert!(config.apply.abort_on_backup_failure);

        let native = config.native_fields();
        assert_eq!(native.len(), 1);
        assert_eq!(native.substitute("lastloginat"), Some("cr123_lastlogin"));
        assert_eq!(native.substitute("CreatedAt"), None);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "dvsync.toml", "");

        let config = FileConfig::load(&path).unwrap();

        assert_eq!(config, FileConfig::default());
        assert_eq!(config.native_fields().substitute("CreatedAt"), Some("createdon"));
    }

    #[test]
    fn test_extra_native_fields_extend_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "dvsync.toml",
            indoc! {r#"
                [native_fields]
                ModifiedAt = "modifiedon"
            "#},
        );

        let native = FileConfig::load(&path).unwrap().native_fields();

        assert_eq!(native.substitute("ModifiedAt"), Some("modifiedon"));
        assert_eq!(native.substitute("UpdatedAt"), Some("modifiedon"));
    }

    #[test]
    fn test_secret_is_not_accepted_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "dvsync.toml",
            indoc! {r#"
                [connection]
                client_secret = "s3cr3t"
            "#},
        );

        assert!(FileConfig::load(&path).is_err());
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "broken.toml", "[tables\n");

        let error = format!("{:#}", FileConfig::load(&path).unwrap_err());
        assert!(error.contains("broken.toml"));
    }
}

mod discovery_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_existing_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let second = write(&dir, "second.toml", "[tables]\nCustomer = \"account\"\n");
        let candidates = vec![dir.path().join("absent.toml"), second.clone()];

        let (config, path) = FileConfig::discover_in(None, &candidates).unwrap();

        assert_eq!(path, Some(second));
        assert_eq!(config.tables.len(), 1);
    }

    #[test]
    fn test_no_candidates_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![dir.path().join("absent.toml")];

        let (config, path) = FileConfig::discover_in(None, &candidates).unwrap();

        assert_eq!(path, None);
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("missing.toml");

        assert!(FileConfig::discover_in(Some(&explicit), &[]).is_err());
    }
}

mod table_map_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_map_file_overrides_config_tables() {
        let dir = tempfile::tempdir().unwrap();
        let map = write(
            &dir,
            "map.json",
            r#"{"customer": "cr123_customer", "Invoice": "cr123_invoice"}"#,
        );
        let config = FileConfig {
            tables: dvsync_core::NameMap::new()
                .with_entry("Customer", "account")
                .with_entry("Region", "cr123_region"),
            ..FileConfig::default()
        };

        let overrides = config.table_overrides(Some(&map)).unwrap();

        assert_eq!(overrides.len(), 3);
        assert_eq!(overrides.get("Customer"), Some("cr123_customer"));
        assert_eq!(overrides.get("Invoice"), Some("cr123_invoice"));
        assert_eq!(overrides.get("Region"), Some("cr123_region"));
    }

    #[test]
    fn test_map_file_must_be_string_object() {
        let dir = tempfile::tempdir().unwrap();
        let map = write(&dir, "map.json", r#"["Customer"]"#);

        assert!(load_map_file(&map).is_err());
    }
}
