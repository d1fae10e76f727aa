//! Files written from a snapshot: JSON, HTML, DOT and shell scripts.

use std::fs;
use std::path::Path;

use crate::error::ReportError;

pub mod dot;
pub mod html;
pub mod json;
pub mod recreate;
pub mod restore;
pub mod table;

pub fn write_file(path: &Path, contents: &str) -> Result<(), ReportError> {
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a shell script and marks it executable.
pub fn write_script(path: &Path, contents: &str) -> Result<(), ReportError> {
    write_file(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|source| {
            ReportError::Write {
                path: path.to_path_buf(),
                source,
            }
        })?;
    }

    Ok(())
}

/// Quotes a value for POSIX shells.
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub(crate) fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Sorted `key=value` pairs.
pub(crate) fn config_pairs<'a, I>(configs: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut pairs: Vec<String> = configs
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    pairs.sort();
    pairs
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("events"), "'events'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape("<b>\"a\" & 'b'</b>"),
            "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_write_script_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.sh");

        write_script(&path, "#!/bin/bash\n").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_write_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");

        match write_file(&path, "{}") {
            Err(ReportError::Write { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
