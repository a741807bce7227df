//! BDD tests for the end-to-end provisioning workflow.

use camino::Utf8PathBuf;
use gae_installer::artefact::extraction::ZipExtractor;
use gae_installer::config::{OutputTargets, ProvisionConfig};
use gae_installer::error::ProvisionError;
use gae_installer::output::Verbosity;
use gae_installer::provisioner::Provisioner;
use gae_installer::test_utils::{
    FIXTURE_TOOLS, ScriptedFetcher, ScriptedResponse, md5_hex, sdk_zip, test_config,
};
use gae_installer::wrapper::WrapperScript;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

const PACKAGE_DIR: &str = "google_appengine";

#[derive(Default)]
struct ProvisionWorld {
    _temp_dir: Option<tempfile::TempDir>,
    base: Option<Utf8PathBuf>,
    archive: Vec<u8>,
    version: Option<String>,
    responses: Vec<ScriptedResponse>,
    seed_cache: bool,
    leftover_output: bool,
    duplicate: bool,
    config: Option<ProvisionConfig>,
    requested: Vec<String>,
    result: Option<Result<Vec<WrapperScript>, ProvisionError>>,
}

impl ProvisionWorld {
    fn config(&self) -> &ProvisionConfig {
        self.config.as_ref().expect("installer has run")
    }

    fn scripts(&self) -> &[WrapperScript] {
        match self.result.as_ref().expect("result set") {
            Ok(scripts) => scripts,
            Err(err) => panic!("expected success, got {err}"),
        }
    }
}

#[fixture]
fn world() -> ProvisionWorld {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let base = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).expect("UTF-8 path");
    ProvisionWorld {
        _temp_dir: Some(temp_dir),
        base: Some(base),
        archive: sdk_zip(PACKAGE_DIR),
        ..Default::default()
    }
}

#[given("an empty cache for SDK version \"{version}\"")]
fn given_empty_cache(world: &mut ProvisionWorld, version: String) {
    world.version = Some(version);
}

#[given("the cache holds a valid archive")]
fn given_valid_cache(world: &mut ProvisionWorld) {
    world.seed_cache = true;
}

#[given("the featured location serves the archive")]
fn given_featured_archive(world: &mut ProvisionWorld) {
    world
        .responses
        .push(ScriptedResponse::archive(world.archive.clone()));
}

#[given("the featured location serves an HTML page")]
fn given_featured_html(world: &mut ProvisionWorld) {
    world.responses.push(ScriptedResponse::html_page());
}

#[given("the deprecated location serves the archive")]
fn given_deprecated_archive(world: &mut ProvisionWorld) {
    world
        .responses
        .push(ScriptedResponse::archive(world.archive.clone()));
}

#[given("the deprecated location serves a corrupted archive")]
fn given_deprecated_corrupted(world: &mut ProvisionWorld) {
    world
        .responses
        .push(ScriptedResponse::archive(b"truncated transfer".to_vec()));
}

#[given("the output directory already exists")]
fn given_leftover_output(world: &mut ProvisionWorld) {
    world.leftover_output = true;
}

#[given("legacy duplication is enabled")]
fn given_duplication(world: &mut ProvisionWorld) {
    world.duplicate = true;
}

#[when("the installer runs")]
fn when_installer_runs(world: &mut ProvisionWorld) {
    let base = world.base.clone().expect("base set");
    let version = world.version.clone().expect("version set");
    let mut config = test_config(&base, &version, &md5_hex(&world.archive));
    if world.duplicate {
        config.output.targets = OutputTargets::duplicated(
            base.join("build/lib"),
            base.join("build/lib.legacy"),
        );
    }

    if world.seed_cache {
        let cache = config.archive_cache();
        std::fs::create_dir_all(cache.dir()).expect("create cache dir");
        std::fs::write(cache.path(), &world.archive).expect("seed cache");
    }
    if world.leftover_output {
        std::fs::create_dir_all(config.output.targets.primary()).expect("create leftover");
    }

    let fetcher = ScriptedFetcher::new(std::mem::take(&mut world.responses));
    let mut stderr = Vec::new();
    let result =
        Provisioner::new(&config, &fetcher, &ZipExtractor, Verbosity::Normal).run(&mut stderr);

    world.requested = fetcher.requested();
    world.result = Some(result);
    world.config = Some(config);
}

#[then("the run succeeds")]
fn then_run_succeeds(world: &mut ProvisionWorld) {
    let _ = world.scripts();
}

#[then("the run fails with a checksum mismatch")]
fn then_checksum_mismatch(world: &mut ProvisionWorld) {
    let result = world.result.as_ref().expect("result set");
    assert!(
        matches!(result, Err(ProvisionError::ChecksumMismatch { .. })),
        "expected ChecksumMismatch, got {result:?}"
    );
}

#[then("the run fails because the output directory exists")]
fn then_output_exists(world: &mut ProvisionWorld) {
    let result = world.result.as_ref().expect("result set");
    assert!(
        matches!(result, Err(ProvisionError::OutputDirectoryExists { .. })),
        "expected OutputDirectoryExists, got {result:?}"
    );
}

#[then("no network request was made")]
fn then_no_network(world: &mut ProvisionWorld) {
    assert!(
        world.requested.is_empty(),
        "unexpected requests: {:?}",
        world.requested
    );
}

#[then("only the featured location was requested")]
fn then_only_featured(world: &mut ProvisionWorld) {
    assert_eq!(world.requested.len(), 1);
    assert!(world.requested[0].contains("/featured/"));
}

#[then("the deprecated location was requested")]
fn then_deprecated_requested(world: &mut ProvisionWorld) {
    assert_eq!(world.requested.len(), 2);
    assert!(world.requested[1].contains("/deprecated/196/"));
}

#[then("the marker file names \"{package}\"")]
fn then_marker_names(world: &mut ProvisionWorld, package: String) {
    let marker = world
        .config()
        .output
        .targets
        .primary()
        .join(format!("{package}.pth"));
    let content = std::fs::read_to_string(&marker).expect("read marker");
    assert_eq!(content.trim_end(), package);
}

#[then("one wrapper is generated per bundled tool plus the locator")]
fn then_wrapper_count(world: &mut ProvisionWorld) {
    assert_eq!(world.scripts().len(), FIXTURE_TOOLS.len() + 1);
    for script in world.scripts() {
        assert!(script.path.is_file(), "{} was not written", script.path);
    }
}

#[then("the locator script comes first")]
fn then_locator_first(world: &mut ProvisionWorld) {
    let scripts = world.scripts();
    assert_eq!(scripts[0].name, "_get_gae_dir");
    assert_eq!(
        scripts.iter().filter(|s| s.name == "_get_gae_dir").count(),
        1
    );
}

#[then("the test runner has no wrapper")]
fn then_no_test_runner(world: &mut ProvisionWorld) {
    assert!(world.scripts().iter().all(|s| s.name != "run_tests"));
    assert!(
        !world
            .config()
            .output
            .scripts_dir
            .join("run_tests")
            .exists()
    );
}

#[then("nothing is extracted")]
fn then_nothing_extracted(world: &mut ProvisionWorld) {
    let config = world.config();
    assert!(!config.output.targets.primary().exists());
    assert!(!config.archive_cache().path().exists());
}

#[then("both output directories hold the SDK")]
fn then_both_outputs(world: &mut ProvisionWorld) {
    let dirs: Vec<_> = world.config().output.targets.iter().collect();
    assert_eq!(dirs.len(), 2);
    for dir in dirs {
        assert!(dir.join(PACKAGE_DIR).join("dev_appserver.py").is_file());
        assert!(dir.join(format!("{PACKAGE_DIR}.pth")).is_file());
    }
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Fresh install downloads from the featured location"
)]
fn scenario_fresh_install(world: ProvisionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Valid cached archive skips the network"
)]
fn scenario_cached_archive(world: ProvisionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Deprecated release falls back before verification"
)]
fn scenario_deprecated_fallback(world: ProvisionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Checksum mismatch after fallback is fatal"
)]
fn scenario_mismatch_after_fallback(world: ProvisionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Leftover output directory aborts the build"
)]
fn scenario_leftover_output(world: ProvisionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Legacy duplication unpacks twice"
)]
fn scenario_legacy_duplication(world: ProvisionWorld) {
    let _ = world;
}
