use std::path::PathBuf;

// Files like the exchange rate cache live in ~/.ibtax/
pub fn home_dir_file_path(fname: &PathBuf) -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Unable to determine home directory")?;
    let dir = home.join(".ibtax");
    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("Could not create {:?}: {}", dir, e))?;
    }
    Ok(dir.join(fname))
}

pub fn env_var_non_empty(name: &str) -> bool {
    match std::env::var(name) {
        Ok(v) => !v.is_empty(),
        Err(_) => false,
    }
}
