use std::{
    fs,
    io::{self, Read},
    path::Path,
};

pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let mut s = String::new();
    fs::File::open(path)
        .and_then(|mut f| f.read_to_string(&mut s))
        .map(|_| s)
}

/// Resolves an absolute logical path like `/sys/block/sda/stat` under `root`.
pub fn under_root(root: &Path, logical: &Path) -> std::path::PathBuf {
    root.join(logical.strip_prefix("/").unwrap_or(logical))
}

#[test]
fn test_under_root() {
    assert_eq!(
        under_root(Path::new("/"), Path::new("/sys/block/sda/stat")),
        Path::new("/sys/block/sda/stat")
    );
    assert_eq!(
        under_root(Path::new("/host"), Path::new("/sys/block/sda/stat")),
        Path::new("/host/sys/block/sda/stat")
    );
}
