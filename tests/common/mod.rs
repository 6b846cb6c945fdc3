use std::path::PathBuf;

fn test_temp_dir_path() -> PathBuf {
    let tmpdir = std::env::temp_dir();

    let make_file_path = |val| {
        let fname = format!("ibtax-test-{}", val);
        tmpdir.join(fname)
    };

    for val in 1..1000000 {
        let path = make_file_path(val);
        if !path.exists() {
            return path;
        }
    }
    panic!("Could not create temp directory path that does not already exist");
}

pub struct TestDir {
    pub path: PathBuf,
}

impl TestDir {
    pub fn new() -> TestDir {
        let path = test_temp_dir_path();
        std::fs::create_dir_all(&path).unwrap();
        TestDir { path }
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                eprintln!("Failed to clean up {:?}: {}", self.path, e);
            }
        }
    }
}
