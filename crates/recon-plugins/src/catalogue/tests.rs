//! Unit tests for plugin discovery.

use std::fs;
use std::path::Path;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), "").expect("create plugin file");
}

#[fixture]
fn root() -> TempDir {
    let root = TempDir::new().expect("temp dir");
    let lite = root.path().join("lite");
    fs::create_dir_all(&lite).expect("create lite dir");
    for name in ["subdomains.py", "dns.py", "__init__.py", ".hidden", "whois.sh"] {
        touch(&lite, name);
    }
    fs::create_dir_all(lite.join("helpers")).expect("create nested dir");
    root
}

fn names(descriptors: &[PluginDescriptor]) -> Vec<&str> {
    descriptors.iter().map(PluginDescriptor::name).collect()
}

#[rstest]
fn resolve_filters_and_sorts(root: TempDir) {
    let catalogue = PluginCatalogue::new(root.path());
    let descriptors = catalogue.resolve(Profile::Lite).expect("resolve lite");
    assert_eq!(names(&descriptors), vec!["dns", "subdomains", "whois"]);
    assert!(descriptors.iter().all(|d| d.profile() == Profile::Lite));
}

#[rstest]
fn resolve_is_deterministic(root: TempDir) {
    let catalogue = PluginCatalogue::new(root.path());
    let first = catalogue.resolve(Profile::Lite).expect("first resolve");
    let second = catalogue.resolve(Profile::Lite).expect("second resolve");
    assert_eq!(first, second);
}

#[rstest]
fn missing_profile_directory_resolves_empty(root: TempDir) {
    let catalogue = PluginCatalogue::new(root.path());
    let descriptors = catalogue.resolve(Profile::Deep).expect("resolve deep");
    assert!(descriptors.is_empty());
}

#[test]
fn missing_root_resolves_empty() {
    let catalogue = PluginCatalogue::new("/nonexistent/recon/plugins");
    for profile in Profile::ALL {
        assert!(catalogue.resolve(profile).expect("resolve").is_empty());
    }
}

#[rstest]
fn duplicate_stems_keep_first_file_name(root: TempDir) {
    let lite = root.path().join("lite");
    touch(&lite, "dns.sh");
    let catalogue = PluginCatalogue::new(root.path());
    let descriptors = catalogue.resolve(Profile::Lite).expect("resolve lite");
    let dns = descriptors
        .iter()
        .find(|d| d.name() == "dns")
        .expect("dns descriptor");
    assert_eq!(dns.path(), lite.join("dns.py"));
    assert_eq!(names(&descriptors), vec!["dns", "subdomains", "whois"]);
}

#[rstest]
#[case::python("ports.py", Some("ports"))]
#[case::no_extension("ports", Some("ports"))]
#[case::dotted("ports.v2.py", Some("ports.v2"))]
#[case::private("_ports.py", None)]
#[case::hidden(".ports", None)]
fn plugin_name_derivation(#[case] file_name: &str, #[case] expected: Option<&str>) {
    assert_eq!(
        plugin_name(OsStr::new(file_name)).as_deref(),
        expected,
        "unexpected name for {file_name}"
    );
}

#[test]
fn directory_is_named_after_profile() {
    let catalogue = PluginCatalogue::new("/srv/plugins");
    assert_eq!(
        catalogue.directory(Profile::Deep),
        Path::new("/srv/plugins/deep")
    );
}
