use std::path::PathBuf;

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

pub fn demos_root() -> PathBuf {
    workspace_root().join("demos").join("scripts-rhai")
}

pub fn demo_dir(name: &str) -> PathBuf {
    demos_root().join(name)
}

pub fn demo_script(name: &str) -> PathBuf {
    demo_dir(name).join("main.rhai")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_root_points_to_workspace() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }

    #[test]
    fn demos_root_points_to_demo_scripts() {
        assert!(demos_root().is_dir());
    }

    #[test]
    fn demo_script_joins_default_filename() {
        let path = demo_script("01-hello");
        assert!(path.ends_with("main.rhai"));
        assert!(path.is_file());
    }
}
