/// Tokens from `protected` that do not occur verbatim in `output`.
pub fn missing_tokens<'a>(output: &str, protected: &'a [String]) -> Vec<&'a str> {
    protected
        .iter()
        .map(String::as_str)
        .filter(|t| !t.is_empty() && !output.contains(t))
        .collect()
}

/// Returns `output` when every protected token survived, `fallback` otherwise.
///
/// Fail-closed: a single dropped token reverts the whole output; there is no
/// partial repair.
pub fn enforce(output: &str, protected: &[String], fallback: &str) -> String {
    let missing = missing_tokens(output, protected);
    if missing.is_empty() {
        output.to_string()
    } else {
        tracing::warn!(?missing, "protected tokens dropped; reverting to template");
        fallback.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reverts_when_a_token_is_missing() {
        let original = "/imagine a cat --v 6.0";
        let got = enforce("/imagine an oil painting of a cat", &toks(&["--v 6.0"]), original);
        assert_eq!(got, original);
    }

    #[test]
    fn keeps_output_when_all_tokens_present() {
        let out = "/imagine an oil painting of a cat --ar 4:5 --v 6.0";
        assert_eq!(enforce(out, &toks(&["--v 6.0", "--ar 4:5"]), "orig"), out);
    }

    #[test]
    fn match_is_verbatim() {
        let protected = toks(&["--v 6.0"]);
        assert_eq!(missing_tokens("--V 6.0", &protected), vec!["--v 6.0"]);
        assert_eq!(missing_tokens("--v  6.0", &protected), vec!["--v 6.0"]);
    }

    #[test]
    fn no_tokens_means_no_constraint() {
        assert_eq!(enforce("anything", &[], "orig"), "anything");
        assert!(missing_tokens("anything", &toks(&[""])).is_empty());
    }
}
