use regex::Regex;
use std::collections::HashSet;

/// Escapes HTML in post bodies while leaving fenced code blocks (```)
/// untouched. Existing entities are decoded first so nothing ends up
/// double-escaped.
pub fn sanitize_body(input: &str) -> String {
    let mut code_blocks: Vec<String> = Vec::new();
    let code_block_regex = Regex::new(r"(?s)```[\s\S]*?```").unwrap();

    // Step 1: Extract code blocks with placeholders
    let with_placeholders = code_block_regex.replace_all(input, |caps: &regex::Captures| {
        code_blocks.push(caps[0].to_string());
        format!("__CODE_BLOCK_PLACEHOLDER_{}__", code_blocks.len() - 1)
    });

    // Step 2: Decode existing entities (normalize), then escape HTML
    let decoded = html_escape::decode_html_entities(&with_placeholders);
    let escaped = html_escape::encode_text(&decoded).to_string();

    // Step 3: Restore original code blocks
    let mut final_output = escaped;
    for (i, block) in code_blocks.iter().enumerate() {
        let placeholder = format!("__CODE_BLOCK_PLACEHOLDER_{}__", i);
        final_output = final_output.replacen(&placeholder, block, 1);
    }

    final_output
}

/// Strips all HTML tags from input (for titles, summaries, comment text).
pub fn strip_all_html(input: &str) -> String {
    ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}
