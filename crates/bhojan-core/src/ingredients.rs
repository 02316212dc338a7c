/// Split ingredient text on commas, trimming each entry and dropping empty ones.
///
/// Deliberately conservative: no splitting on newlines, semicolons or
/// parentheses, so an OCR'd label keeps its sub-ingredient groupings intact.
pub fn parse_ingredients(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
