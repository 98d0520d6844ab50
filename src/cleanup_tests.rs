use super::*;

fn product(dir: &Path, stem: &str) -> PathBuf {
    let descriptor = dir.join(format!("{stem}.dim"));
    fs::write(&descriptor, "<Dimap_Document/>").expect("write descriptor");
    let data = dir.join(format!("{stem}.data"));
    fs::create_dir_all(&data).expect("create data dir");
    fs::write(data.join("band.img"), b"raster").expect("write band");
    descriptor
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            entry
                .expect("entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

#[test]
fn removes_unprotected_products_with_their_data() {
    let dir = tempfile::tempdir().expect("temp dir");
    let keep = product(dir.path(), "20220623_20220701_Stack");
    product(dir.path(), "20220623_Orb");
    product(dir.path(), "20220701_Orb");
    fs::create_dir(dir.path().join("orphan.data")).expect("orphan data");
    fs::create_dir(dir.path().join(".graphs")).expect("graphs dir");
    fs::write(dir.path().join("manifest.json"), "[]").expect("manifest");

    let report = sweep(dir.path(), &BTreeSet::from([keep])).expect("sweep");
    assert_eq!(report.removed.len(), 5);
    assert_eq!(
        listing(dir.path()),
        vec![
            ".graphs",
            "20220623_20220701_Stack.data",
            "20220623_20220701_Stack.dim",
            "manifest.json",
        ]
    );
}

#[test]
fn second_sweep_changes_nothing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let keep = product(dir.path(), "final");
    product(dir.path(), "intermediate");
    let protected = BTreeSet::from([keep]);

    sweep(dir.path(), &protected).expect("first sweep");
    let after_first = listing(dir.path());
    let report = sweep(dir.path(), &protected).expect("second sweep");
    assert!(report.removed.is_empty());
    assert_eq!(listing(dir.path()), after_first);
}

#[test]
fn missing_output_dir_is_not_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let report = sweep(&dir.path().join("absent"), &BTreeSet::new()).expect("sweep");
    assert!(report.removed.is_empty());
}
