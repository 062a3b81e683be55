//! Reply formatting: Gemini markdown → Telegram HTML and Discord markdown.

use std::sync::LazyLock;

use regex::{Captures, Regex};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// A tag for a known HTML element, closed on the same line. Generic-looking
/// text such as `Vec<String>` or `<stdio.h>` is not a tag.
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    re(concat!(
        r"(?i)</?(?:a|abbr|b|blockquote|body|br|center|code|del|details|div|em|font|footer|",
        r"h[1-6]|head|header|hr|html|i|img|ins|kbd|li|mark|meta|ol|p|pre|s|section|small|",
        r"span|strike|strong|sub|summary|sup|table|tbody|td|tfoot|th|thead|title|tr|tt|u|ul)",
        r"\b[^<>\n]*>"
    ))
});
static SCRIPT_OR_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
});

static BOLD_STARS: LazyLock<Regex> = LazyLock::new(|| re(r"\*\*(.*?)\*\*"));
static BOLD_UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| re(r"__(.*?)__"));
static ITALIC_STAR: LazyLock<Regex> = LazyLock::new(|| re(r"\*(.*?)\*"));
static ITALIC_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| re(r"_(.*?)_"));
static LINK: LazyLock<Regex> = LazyLock::new(|| re(r"\[([^\]]+)\]\(([^)]+)\)"));

static ALLOWED_TAG: LazyLock<Regex> =
    LazyLock::new(|| re(r#"</?[bi]>|<a href="[^"<>]*">|</a>"#));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| re(r"<[^>]+>"));
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| re(r"\x00(\d+)\x00"));

static FENCE_RUN: LazyLock<Regex> = LazyLock::new(|| re(r"`{3,}"));
static CODE_HINT: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)(?:^|\n)(?:npm|yarn|node|python|curl|cd |git |const |let |fs\.|axios\.|require\(|import )")
});
static CODE_START: LazyLock<Regex> =
    LazyLock::new(|| re(r"const |let |function |require\(|import |fs\.|axios\."));
static JS_HINT: LazyLock<Regex> = LazyLock::new(|| re(r"import .* from|const .* = require"));
static PYTHON_HINT: LazyLock<Regex> = LazyLock::new(|| re(r"def |print\(|import os"));

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Convert Gemini markdown into the HTML subset Telegram accepts
/// (`<b>`, `<i>`, `<a href>`).
pub fn format_telegram_html(text: &str) -> String {
    // HTML the model wrote is dropped, not shown escaped.
    let text = text.replace('\0', "");
    let text = SCRIPT_OR_STYLE.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");

    let text = escape_html(&text);
    let text = BOLD_STARS.replace_all(&text, "<b>${1}</b>");
    let text = BOLD_UNDERSCORES.replace_all(&text, "<b>${1}</b>");
    let text = ITALIC_STAR.replace_all(&text, "<i>${1}</i>");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "<i>${1}</i>");
    let text = LINK.replace_all(&text, |caps: &Captures| {
        format!(
            r#"<a href="{}">{}</a>"#,
            caps[2].replace('"', "&quot;"),
            &caps[1]
        )
    });

    keep_only_allowed_tags(&text).trim().to_string()
}

fn keep_only_allowed_tags(html: &str) -> String {
    let mut saved: Vec<String> = Vec::new();
    let marked = ALLOWED_TAG.replace_all(html, |caps: &Captures| {
        saved.push(caps[0].to_string());
        format!("\x00{}\x00", saved.len() - 1)
    });
    let stripped = ANY_TAG.replace_all(&marked, "");

    // The strip pass can swallow one half of a pair, so only balanced pairs are restored.
    let surviving: Vec<usize> = PLACEHOLDER
        .captures_iter(&stripped)
        .filter_map(|caps| caps[1].parse().ok())
        .filter(|&i| i < saved.len())
        .collect();
    let keep = balanced_tags(&saved, &surviving);

    PLACEHOLDER
        .replace_all(&stripped, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .filter(|i| keep.contains(i))
                .and_then(|i| saved.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

/// `(is_closing, element)` for one of the allowed tags.
fn tag_kind(tag: &str) -> (bool, &str) {
    let closing = tag.starts_with("</");
    let name = tag
        .trim_start_matches('<')
        .trim_start_matches('/')
        .split(|c: char| c == '>' || c.is_whitespace())
        .next()
        .unwrap_or_default();
    (closing, name)
}

/// Indices (from `order`) of tags that open and close in properly nested pairs.
fn balanced_tags(tags: &[String], order: &[usize]) -> Vec<usize> {
    let mut open: Vec<usize> = Vec::new();
    let mut keep = Vec::new();

    for &i in order {
        let (closing, name) = tag_kind(&tags[i]);
        if !closing {
            open.push(i);
            continue;
        }
        match open.last() {
            Some(&top) if tag_kind(&tags[top]).1 == name => {
                open.pop();
                keep.push(top);
                keep.push(i);
            }
            _ => {}
        }
    }

    keep
}

/// Convert Gemini markdown into Discord markdown, fencing code the model
/// forgot to fence.
pub fn format_for_discord(text: &str) -> String {
    let cleaned = HTML_TAG.replace_all(text, "");
    let cleaned = FENCE_RUN.replace_all(&cleaned, "```");

    if looks_like_code(&cleaned) {
        if let Some(fenced) = fence_code(&cleaned) {
            return fenced;
        }
    }

    cleaned.trim().to_string()
}

/// True for unfenced text of more than three lines with a line starting like
/// a shell command or source code.
pub fn looks_like_code(text: &str) -> bool {
    CODE_HINT.is_match(text) && text.split('\n').count() > 3 && !text.trim().starts_with("```")
}

fn fence_code(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let start = lines.iter().position(|line| CODE_START.is_match(line))?;

    let prose = lines[..start].join("\n");
    let code = lines[start..].join("\n");
    let code = code.trim();
    let lang = infer_language(code);

    Some(
        format!("{}\n```{}\n{}\n```", prose.trim(), lang, code)
            .trim()
            .to_string(),
    )
}

pub fn infer_language(code: &str) -> &'static str {
    if PYTHON_HINT.is_match(code) {
        "python"
    } else if JS_HINT.is_match(code) {
        "js"
    } else {
        "sh"
    }
}
