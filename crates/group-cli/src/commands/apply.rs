//! Apply command implementation

use std::fs;
use std::path::Path;

use colored::Colorize;
use group_core::DesiredStateStore;

use crate::context::Context;
use crate::error::{CliError, Result};

/// Create the group from `file`, or replace the spec of the stored group.
pub fn run_apply(ctx: &Context, file: &Path) -> Result<()> {
    let content = fs::read_to_string(file)
        .map_err(|e| CliError::user(format!("cannot read {}: {}", file.display(), e)))?;
    let desired = ctx.scheme().decode_group(&content)?;
    let store = ctx.store()?;
    let identity = desired.identity().to_string();

    let action = match store.get(&identity)? {
        None => {
            store.create(desired)?;
            "created".green()
        }
        Some(stored) if stored.deletion_requested() => {
            return Err(CliError::user(format!(
                "group '{}' is being deleted; wait for it to be released before applying again",
                identity
            )));
        }
        Some(stored) if stored.spec == desired.spec => "unchanged".dimmed(),
        Some(mut stored) => {
            stored.spec = desired.spec;
            store.update(&stored)?;
            "configured".yellow()
        }
    };

    println!("{} {}", identity.cyan(), action);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use group_core::OperatorConfig;
    use tempfile::TempDir;

    fn context(store_dir: &Path) -> Context {
        let mut config = OperatorConfig::default();
        config.controller.store_dir = store_dir.to_path_buf();
        Context::new(config)
    }

    fn write_doc(dir: &Path, comment: &str) -> std::path::PathBuf {
        let path = dir.join("team-x.toml");
        fs::write(
            &path,
            format!(
                r#"
apiVersion = "directory.group-operator.io/v1"
kind = "Group"

[metadata]
name = "team-x"

[spec]
comment = "{}"
members = ["uid=alice,ou=people,dc=example,dc=org"]
"#,
                comment
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn apply_creates_then_updates_spec() {
        let docs = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        let ctx = context(store_dir.path());

        run_apply(&ctx, &write_doc(docs.path(), "Team X")).unwrap();
        let store = ctx.store().unwrap();
        let created = store.get("team-x").unwrap().unwrap();
        assert_eq!(created.metadata.resource_version, 1);

        run_apply(&ctx, &write_doc(docs.path(), "Team X")).unwrap();
        assert_eq!(store.get("team-x").unwrap().unwrap(), created);

        run_apply(&ctx, &write_doc(docs.path(), "Renamed")).unwrap();
        let updated = store.get("team-x").unwrap().unwrap();
        assert_eq!(updated.spec.comment, "Renamed");
        assert_eq!(updated.metadata.uid, created.metadata.uid);
    }

    #[test]
    fn missing_file_is_a_user_error() {
        let store_dir = TempDir::new().unwrap();
        let ctx = context(store_dir.path());

        let err = run_apply(&ctx, Path::new("/nonexistent/team-x.toml")).unwrap_err();
        assert!(matches!(err, CliError::User { .. }));
    }
}
