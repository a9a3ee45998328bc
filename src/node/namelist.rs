//! Display-name list loading

use std::fs;
use std::io;
use std::path::Path;

/// Read one display name per line, skipping blank lines.
pub fn load_name_list(path: &Path) -> io::Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("archas-name-list-{}.txt", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_loads_one_name_per_line() {
        let path = temp_file("Ona\nJonas\n\n  Ruta  \n");
        let names = load_name_list(&path).unwrap();
        assert_eq!(names, vec!["Ona", "Jonas", "Ruta"]);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_name_list(Path::new("/nonexistent/name_list.txt")).is_err());
    }
}
