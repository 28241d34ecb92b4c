//! Human-readable campaign slugs
//!
//! A campaign slug is `slugify(title)` followed by `-<id>`, where `id` is the
//! row id the database assigned. Two campaigns with the same title therefore
//! never share a slug, and the id can always be read back from the slug.

/// Longest slug base kept before the `-<id>` suffix
pub const MAX_BASE_LEN: usize = 60;

/// Base used when nothing of the title survives slugification
pub const EMPTY_BASE: &str = "kampanya";

/// Maps Turkish letters (and circumflexed vowels) to their ASCII counterparts
fn transliterate(ch: char) -> Option<&'static str> {
    let mapped = match ch {
        'ç' | 'Ç' => "c",
        'ğ' | 'Ğ' => "g",
        'ı' | 'İ' | 'î' | 'Î' => "i",
        'ö' | 'Ö' => "o",
        'ş' | 'Ş' => "s",
        'ü' | 'Ü' | 'û' | 'Û' => "u",
        'â' | 'Â' => "a",
        '&' => " ve ",
        _ => return None,
    };
    Some(mapped)
}

/// Converts a campaign title into a URL-safe slug base
///
/// Only `[a-z0-9-]` survives. Whitespace and dashes collapse into single
/// dashes, the result never starts or ends with a dash, and bases longer
/// than [`MAX_BASE_LEN`] are cut back to the last whole word.
///
/// # Examples
///
/// ```
/// use campaign_sieve::slugify;
///
/// assert_eq!(slugify("Market & Gıda Alışverişine 500 TL!"), "market-ve-gida-alisverisine-500-tl");
/// assert_eq!(slugify("!!!"), "kampanya");
/// ```
pub fn slugify(title: &str) -> String {
    let mut lowered = String::with_capacity(title.len());
    for ch in title.chars() {
        match transliterate(ch) {
            Some(ascii) => lowered.push_str(ascii),
            None => lowered.extend(ch.to_lowercase()),
        }
    }

    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for ch in lowered.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
        }
    }

    let slug = truncate_at_word(slug);
    if slug.is_empty() {
        EMPTY_BASE.to_string()
    } else {
        slug
    }
}

fn truncate_at_word(slug: String) -> String {
    // The slug is pure ASCII at this point, so byte offsets are char offsets.
    if slug.len() <= MAX_BASE_LEN {
        return slug;
    }

    if slug.as_bytes()[MAX_BASE_LEN] == b'-' {
        return slug[..MAX_BASE_LEN].to_string();
    }

    let head = &slug[..MAX_BASE_LEN];
    match head.rfind('-') {
        Some(cut) => head[..cut].to_string(),
        None => head.to_string(),
    }
}

/// Builds the final slug for a stored campaign row
///
/// # Arguments
///
/// * `title` - The campaign title
/// * `id` - The id the database assigned to the row
pub fn campaign_slug(title: &str, id: i64) -> String {
    format!("{}-{}", slugify(title), id)
}

/// Reads the row id back out of a campaign slug
///
/// Returns None if the slug does not end in `-<digits>`.
pub fn slug_id(slug: &str) -> Option<i64> {
    let (_, digits) = slug.rsplit_once('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turkish_characters() {
        assert_eq!(slugify("Örnek Kampanya"), "ornek-kampanya");
        assert_eq!(slugify("ÇĞİÖŞÜ çğıöşü"), "cgiosu-cgiosu");
        assert_eq!(slugify("Kâr Payı Hâlâ"), "kar-payi-hala");
    }

    #[test]
    fn test_ampersand_becomes_ve() {
        assert_eq!(slugify("Akaryakıt&Market"), "akaryakit-ve-market");
    }

    #[test]
    fn test_punctuation_is_dropped() {
        assert_eq!(slugify("%20 indirim, 3 taksit!"), "20-indirim-3-taksit");
        assert_eq!(slugify("e-ticaret -- fırsatı"), "e-ticaret-firsati");
    }

    #[test]
    fn test_empty_base() {
        assert_eq!(slugify(""), EMPTY_BASE);
        assert_eq!(slugify("   ---  "), EMPTY_BASE);
        assert_eq!(campaign_slug("???", 12), "kampanya-12");
    }

    #[test]
    fn test_long_title_is_cut_at_word() {
        let title = "Seçili üye işyerlerinde yapacağınız harcamalara özel toplam 1.500 TL'ye varan bonus fırsatı";
        let slug = slugify(title);
        assert!(slug.len() <= MAX_BASE_LEN);
        assert!(!slug.ends_with('-'));
        assert_eq!(
            slug,
            "secili-uye-isyerlerinde-yapacaginiz-harcamalara-ozel-toplam"
        );
    }

    #[test]
    fn test_long_word_without_dash() {
        let title = "a".repeat(80);
        assert_eq!(slugify(&title).len(), MAX_BASE_LEN);
    }

    #[test]
    fn test_campaign_slug_encodes_id() {
        let first = campaign_slug("Örnek Kampanya", 41);
        let second = campaign_slug("Örnek Kampanya", 42);
        assert_eq!(first, "ornek-kampanya-41");
        assert_ne!(first, second);
        assert_eq!(slug_id(&first), Some(41));
        assert_eq!(slug_id(&second), Some(42));
    }

    #[test]
    fn test_slug_id_rejects_non_numeric_suffix() {
        assert_eq!(slug_id("ornek-kampanya"), None);
        assert_eq!(slug_id("kampanya-"), None);
        assert_eq!(slug_id("12"), None);
        assert_eq!(slug_id(""), None);
    }
}
