const SEPARATORS: [char; 2] = ['_', '-'];

/// Keywords for a model file: the lowercase stem, then each `_`/`-`
/// separated part longer than two characters. No duplicates, stem first.
pub fn keywords_for_file(file_name: &str) -> Vec<String> {
    let stem = file_name
        .strip_suffix(crate::storage::artifacts::MODEL_EXT)
        .unwrap_or(file_name)
        .to_lowercase();
    if stem.is_empty() {
        return Vec::new();
    }

    let mut keywords = vec![stem.clone()];
    for part in stem.split(SEPARATORS) {
        if part.len() > 2 && !keywords.iter().any(|k| k == part) {
            keywords.push(part.to_string());
        }
    }
    keywords
}

/// Lowercases and trims manifest keywords, dropping empty ones.
pub fn normalize_keywords(raw: &[String]) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::with_capacity(raw.len());
    for keyword in raw {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    keywords
}
