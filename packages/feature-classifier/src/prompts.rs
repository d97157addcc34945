//! LLM prompts for feature classification and company identification.

use crate::types::feature::{ClassificationRequest, FeatureSpec};

/// Prompt for classifying a site against a feature schema.
pub const FEATURE_PROMPT: &str = r#"Role: Professional Market Researcher
Context: Analyzing companies for the "{landscape_name}" landscape.
Landscape definition: "{landscape_description}"

Task: Determine whether the website offers each of the features below, based ONLY on the website content.

{criteria}

Evaluation Rules:
1. Answer "Yes" only if the "Yes" indicators are found.
2. Answer "No" if the exclusion indicators are found or the feature is explicitly absent.
3. Answer "Unsure" if the text is vague or does not provide enough specific evidence.
4. Every feature listed above MUST appear in the output, using its exact name as the key.
5. Choose exactly one of "Yes", "No" or "Unsure" for each feature.

Return ONLY valid JSON in this exact format:
{
    "results": {
        "Feature Name": { "answer": "Yes" | "No" | "Unsure", "reason": "Max 10 words reason" }
    }
}

Features to answer: {feature_names}

Website Content:
{site_text}"#;

/// Prompt for identifying the company behind a website.
pub const IDENTITY_PROMPT: &str = r#"Task: Identify the official Company Name.
URL: {url}
Domain Hint: {domain}

Instructions:
1. Look at the Header area for brand names.
2. Look at the Footer for Copyright notices (e.g., "© 2024 [Company Name] Inc.").
3. If the brand name differs from the domain, prioritize the brand name found in the content.

Return JSON:
{
    "company_name": "The official name",
    "confidence_source": "header" | "footer" | "domain" | "content"
}

Content (Focusing on Header and Footer):
{head}
...
{tail}"#;

/// Prompt for extracting the main product a site sells.
pub const PRODUCT_PROMPT: &str = r#"Role: Expert Product Analyst
Task: Extract key product information from the website text below.
Context: "{landscape_name}" - "{landscape_description}"

Instructions:
1. Identify the main product name.
2. Write a concise description in one sentence.
3. List 3-8 core features actually mentioned on the page.

Return ONLY JSON:
{
    "product_name": "Name",
    "description": "Summary",
    "features": ["Feature 1", "Feature 2"]
}

Website URL: {url}
Website Text:
{site_text}"#;

/// Prompt used to check that a model answers at all.
pub const HEALTH_CHECK_PROMPT: &str = r#"Reply with this JSON object: {"status": "OK"}"#;

/// Longest prefix of `text` holding at most `max_chars` characters.
///
/// Never splits a UTF-8 code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Longest suffix of `text` holding at most `max_chars` characters.
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    match text.char_indices().rev().nth(max_chars - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Render the criteria rubric for a feature list.
pub fn format_criteria(features: &[&FeatureSpec]) -> String {
    features
        .iter()
        .map(|f| {
            format!(
                "FEATURE: {}\n- Definition: {}\n- \"Yes\" Indicators: {}\n- \"No\" Indicators/Exclusions: {}\n",
                f.name,
                or_none(&f.description),
                or_none(&f.indicators),
                or_none(&f.exclusions),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the classification prompt.
///
/// `features` should already be deduplicated; site text is truncated to
/// `max_site_chars` characters here.
pub fn format_feature_prompt(
    request: &ClassificationRequest<'_>,
    features: &[&FeatureSpec],
    max_site_chars: usize,
) -> String {
    let feature_names = features
        .iter()
        .map(|f| format!("\"{}\"", f.name))
        .collect::<Vec<_>>()
        .join(", ");

    fill(
        FEATURE_PROMPT,
        &[
            ("landscape_name", request.landscape_name),
            ("landscape_description", request.landscape_description),
            ("criteria", &format_criteria(features)),
            ("feature_names", &feature_names),
            ("site_text", truncate_chars(request.site_text, max_site_chars)),
        ],
    )
}

/// Format the company identity prompt from the head and tail of the site text.
pub fn format_identity_prompt(
    url: &str,
    domain: &str,
    site_text: &str,
    edge_chars: usize,
) -> String {
    fill(
        IDENTITY_PROMPT,
        &[
            ("url", url),
            ("domain", domain),
            ("head", truncate_chars(site_text, edge_chars)),
            ("tail", tail_chars(site_text, edge_chars)),
        ],
    )
}

/// Format the product extraction prompt; site text is cut to `max_chars`.
pub fn format_product_prompt(
    url: &str,
    landscape_name: &str,
    landscape_description: &str,
    site_text: &str,
    max_chars: usize,
) -> String {
    fill(
        PRODUCT_PROMPT,
        &[
            ("landscape_name", landscape_name),
            ("landscape_description", landscape_description),
            ("url", url),
            ("site_text", truncate_chars(site_text, max_chars)),
        ],
    )
}

/// Substitute `{name}` placeholders in one pass over `template`.
///
/// Substituted values are copied verbatim and never scanned again, so
/// user text containing `{site_text}` stays literal. Braces that do not
/// enclose a known name are kept as-is.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "(none given)"
    } else {
        text
    }
}
