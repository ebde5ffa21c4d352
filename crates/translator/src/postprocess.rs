const FENCE: &str = "```";

/// Language tags recognised right after an opening fence that also carries code.
const KNOWN_TAGS: &[&str] = &[
    "csharp", "c#", "cs", "c-sharp", "pascal", "delphi", "text", "plaintext",
];

/// Remove markdown code fences the model wraps around its answer.
///
/// Only the fence tokens go: a line holding nothing but a fence (optionally tagged) is
/// dropped, while code sharing a line with a fence is kept. Stray backticks and
/// whitespace are then trimmed from both ends. The result may be empty.
pub fn strip_code_fences(raw: &str) -> String {
    let kept: Vec<String> = raw.lines().filter_map(clean_line).collect();
    kept.join("\n")
        .trim_matches(|c: char| c == '`' || c.is_whitespace())
        .to_string()
}

fn clean_line(line: &str) -> Option<String> {
    if !line.contains(FENCE) {
        return Some(line.to_string());
    }
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];

    let body = match body.strip_prefix(FENCE) {
        Some(rest) if is_bare_tag(rest.trim_end()) => return None,
        Some(rest) => strip_known_tag(rest),
        None => body,
    };
    let cleaned = body.replace(FENCE, "");
    if cleaned.trim().is_empty() {
        return None;
    }
    Some(format!("{indent}{cleaned}"))
}

/// An info string on a fence-only line: a single word such as `csharp` or `c#`.
fn is_bare_tag(rest: &str) -> bool {
    rest.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '+' | '-' | '_' | '.'))
}

fn strip_known_tag(rest: &str) -> &str {
    let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (word, tail) = rest.split_at(word_end);
    if KNOWN_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(word)) {
        tail
    } else {
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_tagged_fence() {
        assert_eq!(strip_code_fences("```csharp\nfoo();\n```"), "foo();");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        assert_eq!(
            strip_code_fences("\n```\npublic class A\n{\n}\n```\n\n"),
            "public class A\n{\n}"
        );
    }

    #[test]
    fn keeps_inner_indentation_and_plain_output() {
        assert_eq!(
            strip_code_fences("void F()\n{\n    G();\n}"),
            "void F()\n{\n    G();\n}"
        );
    }

    #[test]
    fn inline_backticks_are_trimmed_at_edges_only() {
        assert_eq!(strip_code_fences("`x = \"`\";`"), "x = \"`\";");
    }

    #[test]
    fn single_line_fence_keeps_its_code() {
        assert_eq!(strip_code_fences("```x = 1;```"), "x = 1;");
    }

    #[test]
    fn tag_and_code_on_the_opening_line() {
        assert_eq!(
            strip_code_fences("```csharp public class A { }\n```"),
            "public class A { }"
        );
        assert_eq!(strip_code_fences("```CS var y = 2;```"), "var y = 2;");
    }

    #[test]
    fn unknown_word_after_fence_is_code() {
        assert_eq!(strip_code_fences("```return x;\n```"), "return x;");
    }

    #[test]
    fn indented_closing_fence_after_code_keeps_indent() {
        assert_eq!(
            strip_code_fences("```cs\nif (a)\n{\n    b();```\n}\n```"),
            "if (a)\n{\n    b();\n}"
        );
    }

    #[test]
    fn fence_only_reply_is_empty() {
        assert_eq!(strip_code_fences("```csharp\n```"), "");
        assert_eq!(strip_code_fences("  ```  \n``` "), "");
    }
}
