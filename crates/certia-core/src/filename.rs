//! File name sanitisation
//!
//! Two policies over untrusted file names. Both split the name at the last
//! dot, keep the extension verbatim, clean the base name and cap the overall
//! length. They are total: any input string produces a usable name.

/// Longest file name either policy will produce, in characters.
pub const MAX_FILE_NAME_LEN: usize = 100;

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}

fn cap_length(base: &str, extension: &str) -> String {
    let budget = MAX_FILE_NAME_LEN.saturating_sub(extension.chars().count());
    let mut out: String = base.chars().take(budget).collect();
    out.push_str(extension);
    out
}

/// General sanitisation: keep alphanumerics and underscores in the base
/// name, drop everything else.
pub fn sanitise(name: &str) -> String {
    let (base, extension) = split_extension(name);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    cap_length(&cleaned, extension)
}

/// Storage-grade sanitisation for names that become blob keys: spaces and
/// underscores become dashes, the whole name is lower-cased, and the base
/// name keeps only alphanumerics, dashes and dots.
pub fn sanitise_for_storage(name: &str) -> String {
    let normalised: String = name
        .chars()
        .map(|c| match c {
            ' ' | '_' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    let (base, extension) = split_extension(&normalised);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '.')
        .collect();
    cap_length(&cleaned, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscored_names_pass_general_policy_unchanged() {
        assert_eq!(sanitise("t_e_s_t_12345.pdf"), "t_e_s_t_12345.pdf");
    }

    #[test]
    fn test_bare_extension_is_a_fixed_point() {
        assert_eq!(sanitise(".pdf"), ".pdf");
        assert_eq!(sanitise_for_storage(".pdf"), ".pdf");
    }

    #[test]
    fn test_general_policy_drops_hostile_characters() {
        assert_eq!(sanitise("../../etc/passwd.pdf"), "etcpasswd.pdf");
        assert_eq!(sanitise("a b\tc!.pdf"), "abc.pdf");
        assert_eq!(sanitise("no-extension"), "noextension");
    }

    #[test]
    fn test_storage_policy_dashes_and_lowercases() {
        assert_eq!(sanitise_for_storage("t_e_s_t_12345.pdf"), "t-e-s-t-12345.pdf");
        assert_eq!(sanitise_for_storage("My Report_final.PDF"), "my-report-final.pdf");
        assert_eq!(sanitise_for_storage("a.b.PDF"), "a.b.pdf");
    }

    #[test]
    fn test_storage_names_use_only_safe_characters() {
        for input in ["Weird £$% name!.Pdf", "emoji 🦀 file.zip", "..//..\\x.csv"] {
            let out = sanitise_for_storage(input);
            let (base, extension) = out
                .rfind('.')
                .map(|idx| out.split_at(idx))
                .unwrap_or((out.as_str(), ""));
            assert!(
                base.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.'),
                "unsafe base in {out:?}"
            );
            assert!(extension.chars().all(|c| !c.is_whitespace()));
            assert!(out.chars().count() <= MAX_FILE_NAME_LEN);
        }
    }

    #[test]
    fn test_long_names_are_capped_preserving_the_extension() {
        let long = format!("{}.pdf", "x".repeat(400));
        let out = sanitise(&long);
        assert_eq!(out.chars().count(), MAX_FILE_NAME_LEN);
        assert!(out.ends_with(".pdf"));

        let out = sanitise_for_storage(&long);
        assert_eq!(out.chars().count(), MAX_FILE_NAME_LEN);
        assert!(out.ends_with(".pdf"));
    }

    #[test]
    fn test_never_panics_on_degenerate_input() {
        for input in ["", ".", "...", "....pdf", "♥", "\u{0}\u{1}.bin"] {
            let _ = sanitise(input);
            let _ = sanitise_for_storage(input);
        }
    }
}
