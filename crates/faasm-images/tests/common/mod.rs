use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new(version: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("VERSION"), format!("{}\n", version)).unwrap();
        fs::create_dir_all(root.path().join("docker")).unwrap();
        Self { root }
    }

    #[allow(dead_code)]
    pub fn write_config(&self, content: &str) {
        fs::write(self.root.path().join("faasm-images.yaml"), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
