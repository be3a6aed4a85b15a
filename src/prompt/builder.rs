//! Prompt construction for free-text and structured commit messages.
//!
//! Both builders are pure: identical inputs give byte-identical output. The
//! diff is embedded verbatim; length is left to the model through an explicit
//! character budget.

use crate::schema::{FieldFlags, OptionalField};

use super::catalog::CommitTypeCatalog;

/// Build the prompt for a streamed, free-text commit message.
pub fn build_text_prompt(
    language: &str,
    max_length: u32,
    diff: &str,
    catalog: &CommitTypeCatalog,
) -> String {
    format!(
        r#"
As an expert programmer, please write a concise and clear commit message in {language} based on the following code changes (diff).

{diff}

Rules:
1.  The message must follow the conventional commit format.
2.  Choose the most appropriate commit type from this list: {types}.
3.  The entire commit message (header, body, footer) should be no more than {max_length} characters in total.
4.  Do not include any explanations or markdown formatting. Your entire response will be passed directly into git commit.
"#,
        types = catalog.render_names(),
    )
    .trim()
    .to_string()
}

/// Build the prompt for a schema-constrained commit message.
///
/// Every optional field gets a rule: an inclusion instruction when its flag
/// is set, an explicit exclusion instruction otherwise. A fixed type, when
/// given, replaces the "choose a type" rule.
pub fn build_structured_prompt(
    language: &str,
    max_length: u32,
    catalog: &CommitTypeCatalog,
    diff: &str,
    fields: FieldFlags,
    fixed_type: Option<&str>,
) -> String {
    let types = catalog.render_names();

    let type_rule = match fixed_type.map(str::trim).filter(|t| !t.is_empty()) {
        Some(fixed) => format!(
            "**type**: Use exactly this type: \"{fixed}\". Do not change it. (Allowed types: {types}.)"
        ),
        None => format!("**type**: Choose the most appropriate type from this list: {types}."),
    };

    let rules = [
        type_rule,
        field_rule(fields, OptionalField::Scope),
        format!(
            "**description**: Write a concise summary of the changes, no more than {max_length} characters."
        ),
        field_rule(fields, OptionalField::Body),
        field_rule(fields, OptionalField::Footer),
        "All fields you include must be strings.".to_string(),
    ];

    let numbered: Vec<String> = rules
        .iter()
        .enumerate()
        .map(|(idx, rule)| format!("{}.  {}", idx + 1, rule))
        .collect();

    format!(
        r#"
As an expert programmer, please generate a structured commit message in {language} based on the following code changes (diff).

{diff}

The output must be a valid JSON object with the following structure:
{skeleton}

Rules:
{rules}
"#,
        skeleton = json_skeleton(fields),
        rules = numbered.join("\n"),
    )
    .trim()
    .to_string()
}

fn field_rule(fields: FieldFlags, field: OptionalField) -> String {
    let name = field.name();
    if !fields.includes(field) {
        return format!(
            "**{name}**: Do not generate the \"{name}\" field. Omit it from the JSON object entirely."
        );
    }

    let instruction = match field {
        OptionalField::Scope => {
            "Identify a short noun describing the section of the codebase the changes apply to."
        }
        OptionalField::Body => "Provide a more detailed explanation of the changes.",
        OptionalField::Footer => "Reference any related issues or breaking changes.",
    };
    format!("**{name}**: (Optional) You may include this field. {instruction}")
}

/// JSON outline listing only the fields the model may produce.
fn json_skeleton(fields: FieldFlags) -> String {
    let mut lines = vec![r#"  "type": "<type>""#.to_string()];
    if fields.scope {
        lines.push(r#"  "scope": "<scope>""#.to_string());
    }
    lines.push(r#"  "description": "<description>""#.to_string());
    if fields.body {
        lines.push(r#"  "body": "<body>""#.to_string());
    }
    if fields.footer {
        lines.push(r#"  "footer": "<footer>""#.to_string());
    }
    format!("{{\n{}\n}}", lines.join(",\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::catalog::CommitType;

    const DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs\n+pub fn added() {}\n";

    fn flags(scope: bool, body: bool, footer: bool) -> FieldFlags {
        FieldFlags { scope, body, footer }
    }

    #[test]
    fn test_text_prompt_contains_diff_and_budget() {
        let prompt = build_text_prompt("en", 72, DIFF, &CommitTypeCatalog::Default);
        assert!(prompt.contains(DIFF.trim_end()));
        assert!(prompt.contains("72 characters"));
        assert!(prompt.contains("in en based on"));
    }

    #[test]
    fn test_text_prompt_is_trimmed() {
        let prompt = build_text_prompt("en", 50, DIFF, &CommitTypeCatalog::Default);
        assert_eq!(prompt, prompt.trim());
        assert!(prompt.starts_with("As an expert programmer"));
    }

    #[test]
    fn test_text_prompt_lists_default_types_in_order() {
        let prompt = build_text_prompt("en", 72, DIFF, &CommitTypeCatalog::Default);
        assert!(prompt.contains(
            "docs, style, refactor, perf, test, build, ci, chore, revert, feat, fix"
        ));
    }

    #[test]
    fn test_prompts_are_deterministic() {
        let catalog = CommitTypeCatalog::Default;
        assert_eq!(
            build_text_prompt("zh", 100, DIFF, &catalog),
            build_text_prompt("zh", 100, DIFF, &catalog)
        );
        assert_eq!(
            build_structured_prompt("zh", 100, &catalog, DIFF, flags(true, false, true), None),
            build_structured_prompt("zh", 100, &catalog, DIFF, flags(true, false, true), None)
        );
    }

    #[test]
    fn test_structured_prompt_excludes_disabled_fields_explicitly() {
        let prompt = build_structured_prompt(
            "en",
            72,
            &CommitTypeCatalog::Default,
            DIFF,
            flags(false, true, false),
            None,
        );
        assert!(prompt.contains(r#"Do not generate the "scope" field"#));
        assert!(prompt.contains(r#"Do not generate the "footer" field"#));
        assert!(!prompt.contains(r#"Do not generate the "body" field"#));
        assert!(prompt.contains("**body**: (Optional) You may include this field."));
        assert!(!prompt.contains(r#""scope": "<scope>""#));
        assert!(prompt.contains(r#""body": "<body>""#));
    }

    #[test]
    fn test_structured_prompt_always_emits_every_field_rule() {
        for bits in 0..8u8 {
            let fields = flags(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            let prompt = build_structured_prompt(
                "en",
                72,
                &CommitTypeCatalog::Default,
                DIFF,
                fields,
                None,
            );
            for name in ["**type**", "**scope**", "**description**", "**body**", "**footer**"] {
                assert!(prompt.contains(name), "{name} missing for {fields:?}");
            }
            assert!(prompt.contains("6.  All fields you include must be strings."));
        }
    }

    #[test]
    fn test_structured_prompt_fixed_type() {
        let prompt = build_structured_prompt(
            "en",
            72,
            &CommitTypeCatalog::Default,
            DIFF,
            flags(true, true, true),
            Some("fix"),
        );
        assert!(prompt.contains(r#"Use exactly this type: "fix". Do not change it."#));
        assert!(!prompt.contains("Choose the most appropriate type"));
        assert!(prompt.contains("feat, fix"));
    }

    #[test]
    fn test_structured_prompt_blank_fixed_type_is_ignored() {
        let prompt = build_structured_prompt(
            "en",
            72,
            &CommitTypeCatalog::Default,
            DIFF,
            flags(true, true, true),
            Some("  "),
        );
        assert!(prompt.contains("Choose the most appropriate type from this list"));
    }

    #[test]
    fn test_structured_prompt_custom_catalog_order() {
        let catalog = CommitTypeCatalog::Custom(vec![
            CommitType::new("wip", "Work in progress"),
            CommitType::new("feat", "Features"),
            CommitType::new("hotfix", "Hot fixes"),
        ]);
        let prompt =
            build_structured_prompt("en", 72, &catalog, DIFF, flags(false, false, false), None);
        assert!(prompt.contains("from this list: wip, feat, hotfix."));
    }

    #[test]
    fn test_structured_prompt_description_budget() {
        let prompt = build_structured_prompt(
            "en",
            64,
            &CommitTypeCatalog::Default,
            DIFF,
            flags(false, false, false),
            None,
        );
        assert!(prompt.contains("no more than 64 characters"));
        assert!(prompt.contains(DIFF.trim_end()));
    }

    #[test]
    fn test_json_skeleton_minimal() {
        assert_eq!(
            json_skeleton(flags(false, false, false)),
            "{\n  \"type\": \"<type>\",\n  \"description\": \"<description>\"\n}"
        );
    }
}
