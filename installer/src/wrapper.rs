//! Wrapper script generation for the SDK's command-line tools.
//!
//! The unpacked SDK ships its tools as top-level Python scripts. For each
//! eligible script this module writes a small shell wrapper that locates the
//! installed SDK through a shared locator script and execs the real tool with
//! the configured interpreter.

use crate::error::{ProvisionError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Interpreter directive at the top of every generated script.
pub const SHEBANG: &str = "#!/usr/bin/env bash";

/// Rules for discovering scripts and rendering wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptSettings {
    /// Extension of the scripts to wrap, without the leading dot.
    pub extension: String,
    /// Names starting with this prefix are private and skipped.
    pub private_prefix: String,
    /// File names that are never wrapped.
    pub excluded: Vec<String>,
    /// Name of the locator script.
    pub locator_name: String,
    /// Interpreter the wrappers exec.
    pub interpreter: String,
    /// Module imported by the locator to find the SDK root. The root is
    /// the directory above the module's top-level package.
    pub probe_module: String,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            extension: "py".to_owned(),
            private_prefix: "_".to_owned(),
            excluded: vec!["run_tests.py".to_owned()],
            locator_name: "_get_gae_dir".to_owned(),
            interpreter: "python".to_owned(),
            probe_module: "google.appengine".to_owned(),
        }
    }
}

/// A generated script: its name and where it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrapperScript {
    /// Script name (the tool name without extension).
    pub name: String,
    /// Path of the written script.
    pub path: Utf8PathBuf,
}

/// Return true when a top-level file named `file_name` should be wrapped.
///
/// # Examples
///
/// ```
/// use gae_installer::wrapper::{ScriptSettings, is_eligible};
///
/// let settings = ScriptSettings::default();
/// assert!(is_eligible("dev_appserver.py", &settings));
/// assert!(!is_eligible("run_tests.py", &settings));
/// assert!(!is_eligible("_python_runtime.py", &settings));
/// assert!(!is_eligible("README", &settings));
/// ```
#[must_use]
pub fn is_eligible(file_name: &str, settings: &ScriptSettings) -> bool {
    let has_extension = Utf8Path::new(file_name).extension() == Some(settings.extension.as_str());
    let is_private =
        !settings.private_prefix.is_empty() && file_name.starts_with(&settings.private_prefix);
    let is_excluded = settings.excluded.iter().any(|name| name == file_name);
    has_extension && !is_private && !is_excluded
}

/// List the names of the tools to wrap in `sdk_root`, sorted.
///
/// Only regular files at the top level are considered; the returned names
/// have the extension stripped.
///
/// # Errors
///
/// Returns [`ProvisionError::ScriptGeneration`] if the directory cannot be
/// read or holds a non-UTF-8 file name.
pub fn eligible_scripts(sdk_root: &Utf8Path, settings: &ScriptSettings) -> Result<Vec<String>> {
    let entries = sdk_root.read_dir_utf8().map_err(|e| {
        ProvisionError::ScriptGeneration(format!("failed to read {sdk_root}: {e}"))
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            ProvisionError::ScriptGeneration(format!("failed to read {sdk_root}: {e}"))
        })?;
        if !entry.path().is_file() || !is_eligible(entry.file_name(), settings) {
            continue;
        }
        if let Some(stem) = entry.path().file_stem() {
            names.push(stem.to_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Render the locator script, which prints the installed SDK root.
#[must_use]
pub fn locator_content(settings: &ScriptSettings) -> String {
    let probe = &settings.probe_module;
    // `<pkg>/<sub>/__init__.py` sits one level below the root per component.
    let depth = probe.split('.').count() + 1;
    let root = (0..depth).fold(format!("{probe}.__file__"), |path, _| {
        format!("os.path.dirname({path})")
    });
    format!(
        "{SHEBANG}\nexec {interpreter} -c 'import os, {probe}; print({root})'\n",
        interpreter = settings.interpreter,
    )
}

/// Render a forwarding wrapper.
///
/// The wrapper derives the tool name from its own file name, so every
/// wrapper has the same body.
#[must_use]
pub fn wrapper_content(settings: &ScriptSettings) -> String {
    format!(
        "{SHEBANG}\nexec {interpreter} \"$({locator})/$(basename \"$0\").{ext}\" \"$@\"\n",
        interpreter = settings.interpreter,
        locator = settings.locator_name,
        ext = settings.extension,
    )
}

/// Write the locator and one wrapper per eligible tool into `scripts_dir`.
///
/// The locator is always first; wrappers follow sorted by name. The
/// directory is created if missing and existing files are overwritten.
///
/// # Errors
///
/// Returns [`ProvisionError::ScriptGeneration`] if the SDK tree cannot be
/// listed or a script cannot be written.
pub fn generate_scripts(
    sdk_root: &Utf8Path,
    scripts_dir: &Utf8Path,
    settings: &ScriptSettings,
) -> Result<Vec<WrapperScript>> {
    let tools = eligible_scripts(sdk_root, settings)?;

    std::fs::create_dir_all(scripts_dir).map_err(|e| {
        ProvisionError::ScriptGeneration(format!("failed to create {scripts_dir}: {e}"))
    })?;

    let mut scripts = Vec::with_capacity(tools.len() + 1);
    scripts.push(write_script(
        scripts_dir,
        &settings.locator_name,
        &locator_content(settings),
    )?);

    let body = wrapper_content(settings);
    for tool in tools {
        if tool == settings.locator_name {
            log::warn!("skipping {tool}: name collides with the locator script");
            continue;
        }
        scripts.push(write_script(scripts_dir, &tool, &body)?);
    }

    Ok(scripts)
}

fn write_script(scripts_dir: &Utf8Path, name: &str, content: &str) -> Result<WrapperScript> {
    let path = scripts_dir.join(name);
    std::fs::write(&path, content)
        .map_err(|e| ProvisionError::ScriptGeneration(format!("failed to write {path}: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        // rwxr-xr-x
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
            ProvisionError::ScriptGeneration(format!("failed to set permissions on {path}: {e}"))
        })?;
    }

    log::debug!("wrote script {path}");
    Ok(WrapperScript {
        name: name.to_owned(),
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct SdkTree {
        _temp: TempDir,
        root: Utf8PathBuf,
        scripts_dir: Utf8PathBuf,
    }

    #[fixture]
    fn sdk_tree() -> SdkTree {
        let temp = TempDir::new().expect("failed to create temp dir");
        let base = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        let root = base.join("lib/google_appengine");
        std::fs::create_dir_all(root.join("lib")).expect("create tree");
        for name in [
            "dev_appserver.py",
            "appcfg.py",
            "run_tests.py",
            "_python_runtime.py",
            "README",
        ] {
            std::fs::write(root.join(name), "").expect("write file");
        }
        // A directory with a script-like name is not a script.
        std::fs::create_dir_all(root.join("bulkload.py")).expect("create dir");
        SdkTree {
            _temp: temp,
            root,
            scripts_dir: base.join("scripts"),
        }
    }

    #[rstest]
    #[case::tool("appcfg.py", true)]
    #[case::test_runner("run_tests.py", false)]
    #[case::private("_php_runtime.py", false)]
    #[case::other_extension("endpointscfg.sh", false)]
    #[case::no_extension("LICENSE", false)]
    #[case::extension_only_in_name("py", false)]
    fn eligibility(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_eligible(name, &ScriptSettings::default()), expected);
    }

    #[rstest]
    fn lists_only_eligible_files_sorted(sdk_tree: SdkTree) {
        let names = eligible_scripts(&sdk_tree.root, &ScriptSettings::default()).expect("list");
        assert_eq!(names, vec!["appcfg".to_owned(), "dev_appserver".to_owned()]);
    }

    #[rstest]
    fn locator_comes_first(sdk_tree: SdkTree) {
        let scripts =
            generate_scripts(&sdk_tree.root, &sdk_tree.scripts_dir, &ScriptSettings::default())
                .expect("generate");
        let names: Vec<_> = scripts.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["_get_gae_dir", "appcfg", "dev_appserver"]);
    }

    #[rstest]
    fn wrappers_forward_to_the_sdk(sdk_tree: SdkTree) {
        generate_scripts(&sdk_tree.root, &sdk_tree.scripts_dir, &ScriptSettings::default())
            .expect("generate");

        let wrapper = std::fs::read_to_string(sdk_tree.scripts_dir.join("appcfg")).expect("read");
        assert!(wrapper.starts_with("#!/usr/bin/env bash\n"));
        assert!(wrapper.contains("exec python \"$(_get_gae_dir)/$(basename \"$0\").py\" \"$@\""));

        let locator =
            std::fs::read_to_string(sdk_tree.scripts_dir.join("_get_gae_dir")).expect("read");
        assert!(locator.starts_with("#!/usr/bin/env bash\n"));
        assert!(locator.contains("import os, google.appengine;"));
    }

    #[rstest]
    #[case::top_level("google", "os.path.dirname(os.path.dirname(google.__file__))")]
    #[case::subpackage(
        "google.appengine",
        "os.path.dirname(os.path.dirname(os.path.dirname(google.appengine.__file__)))"
    )]
    fn locator_walks_up_past_the_probe_package(#[case] probe: &str, #[case] expected: &str) {
        let settings = ScriptSettings {
            probe_module: probe.to_owned(),
            ..ScriptSettings::default()
        };

        let locator = locator_content(&settings);

        assert!(
            locator.contains(&format!("import os, {probe}; print({expected})")),
            "unexpected locator: {locator}"
        );
    }

    #[cfg(unix)]
    #[rstest]
    fn scripts_are_executable(sdk_tree: SdkTree) {
        use std::os::unix::fs::PermissionsExt;

        let scripts =
            generate_scripts(&sdk_tree.root, &sdk_tree.scripts_dir, &ScriptSettings::default())
                .expect("generate");
        for script in scripts {
            let mode = std::fs::metadata(&script.path)
                .expect("metadata")
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755, "{} should be rwxr-xr-x", script.name);
        }
    }

    #[rstest]
    fn existing_scripts_dir_is_reused(sdk_tree: SdkTree) {
        std::fs::create_dir_all(&sdk_tree.scripts_dir).expect("create dir");
        std::fs::write(sdk_tree.scripts_dir.join("appcfg"), "stale").expect("write");

        generate_scripts(&sdk_tree.root, &sdk_tree.scripts_dir, &ScriptSettings::default())
            .expect("generate");

        let wrapper = std::fs::read_to_string(sdk_tree.scripts_dir.join("appcfg")).expect("read");
        assert_ne!(wrapper, "stale");
    }

    #[rstest]
    fn custom_settings_flow_into_the_wrappers(sdk_tree: SdkTree) {
        let settings = ScriptSettings {
            interpreter: "python2.7".to_owned(),
            excluded: Vec::new(),
            ..ScriptSettings::default()
        };
        let scripts =
            generate_scripts(&sdk_tree.root, &sdk_tree.scripts_dir, &settings).expect("generate");
        assert!(scripts.iter().any(|s| s.name == "run_tests"));

        let wrapper = std::fs::read_to_string(sdk_tree.scripts_dir.join("run_tests")).expect("read");
        assert!(wrapper.contains("exec python2.7 "));
    }

    #[test]
    fn missing_sdk_root_is_a_generation_error() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let base = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        let result = generate_scripts(
            &base.join("absent"),
            &base.join("scripts"),
            &ScriptSettings::default(),
        );
        assert!(matches!(result, Err(ProvisionError::ScriptGeneration(_))));
    }
}
