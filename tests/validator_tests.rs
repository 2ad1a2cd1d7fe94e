//! Fix validation: the comparison cascade and its invariants.

use proptest::prelude::*;
use snippet_debugger::validator::{
    codes_match, extract_core_fix, first_differing_line, levenshtein, normalize, similarity,
    validate, MatchStrategy, ValidationRequest,
};

const SAME_BUGGY: &str = "public boolean same(String a, String b) {
    if (a == b) {
        return true;
    }
    return false;
}";

const SAME_FIXED: &str = "public boolean same(String a, String b) {
    if (a.equals(b)) {
        return true;
    }
    return false;
}";

fn snippet_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 =+;(){}/*#\"\n\t]{0,80}").expect("valid regex")
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_normalize_is_idempotent(code in snippet_strategy()) {
        let once = normalize(&code);
        let twice = normalize(once.as_str());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_code_matches_itself(code in snippet_strategy()) {
        let verdict = codes_match(&code, &code);
        prop_assert!(verdict.matched);
        prop_assert_eq!(verdict.strategy, MatchStrategy::Exact);
    }

    #[test]
    fn prop_similarity_is_symmetric(a in "[a-z ]{0,20}", b in "[a-z ]{0,20}") {
        prop_assert_eq!(levenshtein(&a, &b), levenshtein(&b, &a));
        let s = similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&s));
        prop_assert!((s - similarity(&b, &a)).abs() < f64::EPSILON);
    }
}

#[cfg(test)]
mod normalize_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_formatting_differences_vanish() {
        let a = "int  x = 1; // one\n\n/* note */\nRETURN x;";
        let b = "int x = 1;\nreturn x;";
        assert_eq!(normalize(a), normalize(b));
    }

    #[test]
    fn test_core_fix_drops_scaffolding() {
        assert_eq!(
            extract_core_fix(SAME_FIXED),
            "if (a.equals(b)) {\nreturn true;\nreturn false;"
        );
        assert_eq!(
            extract_core_fix("import java.util.List;\nclass A {\nint x = 1;\n}"),
            "int x = 1;"
        );
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(similarity("", ""), 1.0);
    }
}

#[cfg(test)]
mod cascade_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_equals_fix_is_rejected() {
        let verdict = codes_match(SAME_BUGGY, SAME_FIXED);
        assert!(!verdict.matched);
        assert_eq!(verdict.strategy.to_string(), "key-fix: reference-vs-value equality");
        assert_eq!(verdict.first_differing_line, Some(2));
        assert_eq!(
            verdict.message(),
            "Not quite there yet – something around line 2 looks off. \
             Double-check the condition or return value."
        );
    }

    #[test]
    fn test_formatting_only_difference_is_exact() {
        let reformatted = SAME_FIXED.replace("    ", "\t\t").replace("return", "RETURN");
        let verdict = codes_match(&reformatted, SAME_FIXED);
        assert!(verdict.matched);
        assert_eq!(verdict.strategy, MatchStrategy::Exact);
    }

    #[test]
    fn test_core_fix_ignores_wrapper() {
        let user = "if (a.equals(b)) {\n    return true;\n}\nreturn false;";
        let verdict = codes_match(user, SAME_FIXED);
        assert!(verdict.matched);
        assert_eq!(verdict.strategy, MatchStrategy::CoreFix);
    }

    #[test]
    fn test_key_fix_accepted() {
        let reference = "for (int i = 0; i < n; i++) {\n    total += values[i];\n}";
        let user = "for (int i=0; i < n; i++) {\n    total = total + values[i];\n}";
        let verdict = codes_match(user, reference);
        assert!(verdict.matched);
        assert_eq!(verdict.strategy, MatchStrategy::KeyFix("loop bound off-by-one"));
    }

    #[test]
    fn test_off_by_one_rejected() {
        let reference = "for (int i = 0; i < n; i++) {\n    total += values[i];\n}";
        let user = "for (int i = 0; i <= n; i++) {\n    total += values[i];\n}";
        let verdict = codes_match(user, reference);
        assert!(!verdict.matched);
        assert_eq!(verdict.strategy, MatchStrategy::KeyFix("loop bound off-by-one"));
        assert_eq!(verdict.first_differing_line, Some(1));
    }

    #[test]
    fn test_containment_accepts_extra_lines() {
        let verdict = codes_match("x = x + 1;\nlog(x);", "x = x + 1;");
        assert!(verdict.matched);
        assert_eq!(verdict.strategy, MatchStrategy::Containment);
    }

    #[test]
    fn test_deleted_fix_line_is_not_contained() {
        let gutted = "public boolean same(String a, String b) {\n    return true;\n    return false;\n}";
        let verdict = codes_match(gutted, SAME_FIXED);
        assert!(!verdict.matched, "dropping the condition must not pass as containment");
        assert_eq!(verdict.strategy.to_string(), "key-fix: reference-vs-value equality");

        let verdict = codes_match("return", SAME_FIXED);
        assert!(!verdict.matched, "a lone keyword is not the fix");
    }

    #[test]
    fn test_subset_without_key_fix_is_contained() {
        let verdict = codes_match("x = x + 1;", "x = x + 1;\nlog(x);");
        assert!(verdict.matched);
        assert_eq!(verdict.strategy, MatchStrategy::Containment);
    }

    #[test]
    fn test_close_enough_by_similarity() {
        let verdict = codes_match(
            "int total = a + b ;\nreturn total;",
            "int total = a + b;\nreturn total;",
        );
        assert!(verdict.matched);
        assert_eq!(verdict.strategy, MatchStrategy::Similarity);
        assert!(verdict.similarity >= 0.9);
    }

    #[test]
    fn test_unrelated_code_fails() {
        let verdict = codes_match("return 0;", "return a * b;");
        assert!(!verdict.matched);
        assert_eq!(verdict.strategy, MatchStrategy::None);
        assert_eq!(verdict.first_differing_line, Some(1));
    }

    #[test]
    fn test_first_differing_line_counts_extra_lines() {
        let user = normalize("a;\nb;");
        let reference = normalize("a;\nb;\nc;");
        assert_eq!(first_differing_line(&user, &reference), Some(3));
        assert_eq!(first_differing_line(&user, &user), None);
    }

    #[test]
    fn test_request_and_verdict_json() {
        let request: ValidationRequest =
            serde_json::from_str(r#"{"userCode": "x = 1;", "referenceCode": "x = 1;"}"#).unwrap();
        let verdict = codes_match(&request.user_code, &request.reference_code);
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["matched"], true);
        assert_eq!(json["strategy"], "exact");
        assert!(json.get("firstDifferingLine").is_none());
    }
}

#[cfg(test)]
mod broken_code_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(user: &str) -> ValidationRequest {
        ValidationRequest {
            user_code: user.to_string(),
            reference_code: SAME_FIXED.to_string(),
            broken_code: Some(SAME_BUGGY.to_string()),
        }
    }

    #[test]
    fn test_unchanged_code_is_refused() {
        let reformatted = SAME_BUGGY.replace("    ", "  ");
        let verdict = validate(&request(&reformatted));
        assert!(!verdict.matched);
        assert_eq!(verdict.strategy, MatchStrategy::Unchanged);
        assert_eq!(verdict.message(), "You need to fix the bug first!");
    }

    #[test]
    fn test_real_fix_passes_with_broken_code() {
        let verdict = validate(&request(SAME_FIXED));
        assert!(verdict.matched, "{verdict:?}");
        assert_eq!(verdict.strategy, MatchStrategy::Exact);
    }

    #[test]
    fn test_match_closer_to_broken_is_withdrawn() {
        let reference = "int total = a + b;\nreturn total;";
        let broken = "int total = a - b;\nreturn total;";
        let user = "int total = a - b ;\nreturn total;";
        assert!(codes_match(user, reference).matched, "similar enough on its own");

        let verdict = validate(&ValidationRequest {
            user_code: user.to_string(),
            reference_code: reference.to_string(),
            broken_code: Some(broken.to_string()),
        });
        assert!(!verdict.matched, "user code still looks like the broken snippet");
        assert_eq!(verdict.strategy.to_string(), "closer-to-broken");
    }

    #[test]
    fn test_broken_code_is_optional_on_the_wire() {
        let request: ValidationRequest =
            serde_json::from_str(r#"{"userCode": "a;", "referenceCode": "a;"}"#).unwrap();
        assert_eq!(request.broken_code, None);
        assert_eq!(validate(&request).strategy, MatchStrategy::Exact);
    }
}
