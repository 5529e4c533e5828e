//! Storage-name sanitization.
//!
//! [`sanitize_filename`] is deterministic and idempotent, and its output is
//! always usable as a single path component directly under the storage root.

use palisade_core::constants::{FALLBACK_FILENAME, MAX_FILENAME_BYTES};

/// Longest extension (including the dot) kept intact when a name is truncated.
const MAX_PRESERVED_EXTENSION_BYTES: usize = 16;

/// Device names Windows resolves regardless of extension.
const RESERVED_STEMS: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Sanitize a user-provided filename to prevent path traversal, null byte
/// injection, hidden files and other filesystem attacks.
pub fn sanitize_filename(filename: &str) -> String {
    // Last path component only, for either separator style.
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let mapped: String = base
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let collapsed = collapse_dots(&mapped);
    let trimmed = collapsed.trim_matches('.');
    let guarded = guard_reserved_stem(trimmed);
    let truncated = truncate_preserving_extension(&guarded, MAX_FILENAME_BYTES);

    if truncated.is_empty() || truncated == "." || truncated == ".." {
        return FALLBACK_FILENAME.to_string();
    }

    truncated
}

fn collapse_dots(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut previous_dot = false;
    for c in name.chars() {
        if c == '.' {
            if previous_dot {
                continue;
            }
            previous_dot = true;
        } else {
            previous_dot = false;
        }
        out.push(c);
    }
    out
}

fn guard_reserved_stem(name: &str) -> String {
    let stem = name.split('.').next().unwrap_or(name);
    if RESERVED_STEMS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
    {
        format!("_{}", name)
    } else {
        name.to_string()
    }
}

fn truncate_to_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn truncate_preserving_extension(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    match name.rfind('.') {
        Some(idx) if idx > 0 && name.len() - idx <= MAX_PRESERVED_EXTENSION_BYTES => {
            let extension = &name[idx..];
            let stem = truncate_to_boundary(&name[..idx], max_bytes - extension.len());
            format!("{}{}", stem.trim_end_matches('.'), extension)
        }
        _ => truncate_to_boundary(name, max_bytes)
            .trim_end_matches('.')
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_path_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd.txt"), "passwd.txt");
        assert_eq!(
            sanitize_filename("..\\..\\windows\\system32\\config.png"),
            "config.png"
        );
        assert_eq!(sanitize_filename("/absolute/path/photo.png"), "photo.png");
    }

    #[test]
    fn removes_null_bytes_and_control_chars() {
        assert_eq!(sanitize_filename("file\0.png"), "file.png");
        assert_eq!(sanitize_filename("fi\x01le\x7f.png"), "file.png");
        assert_eq!(sanitize_filename("photo.png\n"), "photo.png");
    }

    #[test]
    fn replaces_unsafe_chars() {
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename("a<b>c:d|e?f*.png"), "a_b_c_d_e_f_.png");
        // right-to-left override used to disguise extensions
        assert_eq!(sanitize_filename("image\u{202e}gnp.exe"), "image_gnp.exe");
    }

    #[test]
    fn strips_leading_and_trailing_dots() {
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_filename("...dots.png"), "dots.png");
        assert_eq!(sanitize_filename("photo.png."), "photo.png");
    }

    #[test]
    fn collapses_dot_runs() {
        assert_eq!(sanitize_filename("photo..png"), "photo.png");
        assert_eq!(sanitize_filename("a....b...png"), "a.b.png");
    }

    #[test]
    fn guards_reserved_device_names() {
        assert_eq!(sanitize_filename("CON.png"), "_CON.png");
        assert_eq!(sanitize_filename("nul"), "_nul");
        assert_eq!(sanitize_filename("console.png"), "console.png");
    }

    #[test]
    fn falls_back_when_nothing_survives() {
        for name in ["", ".", "..", "...", "../..", "/", "\\", "\0\x01", "dir/"] {
            assert_eq!(sanitize_filename(name), FALLBACK_FILENAME, "{:?}", name);
        }
    }

    #[test]
    fn preserves_normal_filenames() {
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("Résumé-2024_v2.PNG"), "Résumé-2024_v2.PNG");
    }

    #[test]
    fn truncates_keeping_extension() {
        let long_name = "a".repeat(300) + ".png";
        let result = sanitize_filename(&long_name);
        assert_eq!(result.len(), MAX_FILENAME_BYTES);
        assert!(result.ends_with(".png"));
    }

    #[test]
    fn truncates_on_char_boundary() {
        let long_name = "é".repeat(200) + ".png";
        let result = sanitize_filename(&long_name);
        assert!(result.len() <= MAX_FILENAME_BYTES);
        assert!(result.ends_with(".png"));
    }

    #[test]
    fn output_is_a_safe_component() {
        let inputs = [
            "../../etc/passwd",
            "..",
            "....//....//x.png",
            "a/../../b.png",
            "\0/../\0",
            ". .png",
            "-rf .png",
            "C:\\Windows\\..\\x.gif",
        ];
        for input in inputs {
            let out = sanitize_filename(input);
            assert!(!out.is_empty(), "{:?}", input);
            assert!(!out.contains("../"), "{:?} -> {:?}", input, out);
            assert!(!out.contains(".."), "{:?} -> {:?}", input, out);
            assert!(!out.starts_with('/'), "{:?} -> {:?}", input, out);
            assert!(!out.starts_with('.'), "{:?} -> {:?}", input, out);
            assert!(!out.contains('\0'), "{:?} -> {:?}", input, out);
            assert!(!out.contains('/') && !out.contains('\\'), "{:?}", input);
        }
    }

    #[test]
    fn is_idempotent() {
        let long = "x.".repeat(200) + "png";
        let inputs = [
            "photo.png",
            "../../etc/passwd.txt",
            " spaced name .png",
            "...",
            "CON.png",
            "_CON.png",
            "a..b",
            "é".repeat(200).as_str(),
            long.as_str(),
            "tab\tname.gif",
        ]
        .map(str::to_string);
        for input in inputs {
            let once = sanitize_filename(&input);
            assert_eq!(sanitize_filename(&once), once, "{:?}", input);
        }
    }
}
