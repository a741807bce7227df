//! Unit tests for unpacking and marker files.

use super::*;
use crate::artefact::extraction::{ExtractionError, MockArchiveExtractor, ZipExtractor};
use crate::config::OutputTargets;
use crate::test_utils::sdk_zip;
use rstest::{fixture, rstest};

struct Workspace {
    _temp: tempfile::TempDir,
    base: Utf8PathBuf,
    archive: Utf8PathBuf,
}

impl Workspace {
    fn output(&self, duplicate: bool) -> OutputSettings {
        let lib = self.base.join("build/lib");
        let targets = if duplicate {
            OutputTargets::duplicated(lib, self.base.join("build/lib.legacy"))
        } else {
            OutputTargets::single(lib)
        };
        OutputSettings {
            targets,
            scripts_dir: self.base.join("build/scripts"),
            package_dir: "google_appengine".to_owned(),
        }
    }
}

#[fixture]
fn workspace() -> Workspace {
    let temp = tempfile::tempdir().expect("temp dir");
    let base = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    let archive = base.join("google_appengine_1.9.6.zip");
    std::fs::write(&archive, sdk_zip("google_appengine")).expect("write archive");
    Workspace {
        _temp: temp,
        base,
        archive,
    }
}

#[rstest]
fn unpacks_and_writes_marker(workspace: Workspace) {
    let output = workspace.output(false);
    let mut stderr = Vec::new();

    let tree = unpack(
        &workspace.archive,
        &output,
        &ZipExtractor,
        Verbosity::Normal,
        &mut stderr,
    )
    .expect("unpack");

    assert!(tree.root().join("dev_appserver.py").is_file());
    assert!(tree.mirrors.is_empty());
    let marker =
        std::fs::read_to_string(tree.lib_dir.join("google_appengine.pth")).expect("read marker");
    assert_eq!(marker.trim_end(), "google_appengine");
    assert!(
        String::from_utf8(stderr)
            .expect("UTF-8")
            .contains("Extracting")
    );
}

#[rstest]
fn duplicates_into_legacy_dir(workspace: Workspace) {
    let output = workspace.output(true);
    let mut stderr = Vec::new();

    let tree = unpack(
        &workspace.archive,
        &output,
        &ZipExtractor,
        Verbosity::Quiet,
        &mut stderr,
    )
    .expect("unpack");

    assert_eq!(tree.mirrors.len(), 1);
    let legacy = &tree.mirrors[0];
    assert!(legacy.join("google_appengine/appcfg.py").is_file());
    assert!(legacy.join("google_appengine.pth").is_file());
    assert!(stderr.is_empty());
}

#[rstest]
#[case::primary(false, "build/lib")]
#[case::legacy(true, "build/lib.legacy")]
fn existing_target_is_fatal(workspace: Workspace, #[case] duplicate: bool, #[case] existing: &str) {
    let output = workspace.output(duplicate);
    std::fs::create_dir_all(workspace.base.join(existing)).expect("create leftover");
    let mut extractor = MockArchiveExtractor::new();
    extractor.expect_extract().never();
    let mut stderr = Vec::new();

    let result = unpack(
        &workspace.archive,
        &output,
        &extractor,
        Verbosity::Normal,
        &mut stderr,
    );

    match result {
        Err(ProvisionError::OutputDirectoryExists { path }) => {
            assert_eq!(path, workspace.base.join(existing));
        }
        other => panic!("expected OutputDirectoryExists, got {other:?}"),
    }
}

#[rstest]
fn extraction_failure_removes_partial_target(workspace: Workspace) {
    let output = workspace.output(false);
    let mut extractor = MockArchiveExtractor::new();
    extractor.expect_extract().times(1).returning(|_, dest| {
        std::fs::write(dest.join("half-written"), b"x").expect("write");
        Err(ExtractionError::EmptyArchive)
    });
    let mut stderr = Vec::new();

    let result = unpack(
        &workspace.archive,
        &output,
        &extractor,
        Verbosity::Normal,
        &mut stderr,
    );

    assert!(matches!(result, Err(ProvisionError::Extraction { .. })));
    assert!(!output.targets.primary().exists());
}

#[rstest]
fn legacy_failure_removes_completed_primary(workspace: Workspace) {
    let output = workspace.output(true);
    let mut extractor = MockArchiveExtractor::new();
    let mut seq = mockall::Sequence::new();
    extractor
        .expect_extract()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|archive, dest| ZipExtractor.extract(archive, dest));
    extractor
        .expect_extract()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(ExtractionError::EmptyArchive));
    let mut stderr = Vec::new();

    let result = unpack(
        &workspace.archive,
        &output,
        &extractor,
        Verbosity::Normal,
        &mut stderr,
    );

    assert!(matches!(result, Err(ProvisionError::Extraction { .. })));
    for target in output.targets.iter() {
        assert!(!target.exists(), "{target} was left behind");
    }

    let rerun = unpack(
        &workspace.archive,
        &output,
        &ZipExtractor,
        Verbosity::Quiet,
        &mut stderr,
    );
    assert!(rerun.is_ok(), "rerun failed: {rerun:?}");
}

#[rstest]
fn archive_without_package_dir_is_rejected(workspace: Workspace) {
    let output = OutputSettings {
        package_dir: "not_in_archive".to_owned(),
        ..workspace.output(false)
    };
    let mut stderr = Vec::new();

    let result = unpack(
        &workspace.archive,
        &output,
        &ZipExtractor,
        Verbosity::Normal,
        &mut stderr,
    );

    assert!(matches!(
        result,
        Err(ProvisionError::UnpackedTreeMissing { .. })
    ));
}

#[rstest]
fn open_adopts_an_existing_tree(workspace: Workspace) {
    let output = workspace.output(false);
    assert!(matches!(
        UnpackedTree::open(&output),
        Err(ProvisionError::UnpackedTreeMissing { .. })
    ));

    let mut stderr = Vec::new();
    let unpacked = unpack(
        &workspace.archive,
        &output,
        &ZipExtractor,
        Verbosity::Quiet,
        &mut stderr,
    )
    .expect("unpack");

    assert_eq!(UnpackedTree::open(&output).expect("open"), unpacked);
}

#[test]
fn marker_names_the_package_directory() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");

    let path = write_marker(&dir, "google_appengine").expect("write marker");

    assert_eq!(path.file_name(), Some("google_appengine.pth"));
    assert_eq!(
        std::fs::read_to_string(path).expect("read"),
        "google_appengine\n"
    );
}
