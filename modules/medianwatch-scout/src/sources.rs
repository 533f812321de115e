/// Suburb slugs tracked by the scout — the south-eastern and inner-eastern
/// Melbourne markets, fixed at run start. Order matters: records are
/// appended to the report in this order within a session.
pub fn tracked_suburbs() -> Vec<&'static str> {
    vec![
        "box-hill-3128",
        "glen-waverley-3150",
        "mount-waverley-3149",
        "burwood-3125",
        "clayton-south-3169",
        "springvale-3171",
        "keysborough-3173",
        "dandenong-3175",
        "noble-park-3174",
        "wheelers-hill-3150",
        "vermont-south-3133",
        "doncaster-3108",
        "frankston-3199",
        "frankston-south-3199",
        "berwick-3806",
        "cranbourne-3977",
        "officer-3809",
        "pakenham-3810",
        "caulfield-3162",
        "bentleigh-east-3165",
        "forest-hill-3131",
        "bayswater-north-3153",
        "wantirna-south-3152",
        "wantirna-3152",
        "surrey-hills-3127",
        "balwyn-3103",
        "camberwell-3124",
        "kew-3101",
        "toorak-3142",
        "malvern-3144",
        "glen-iris-3146",
        "hawthorn-3122",
        "canterbury-3126",
        "brighton-3186",
    ]
}

/// Build the statistics page URL for a suburb slug.
pub fn suburb_url(base_url: &str, slug: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suburb_url_joins_base_and_slug() {
        assert_eq!(
            suburb_url("https://example.com/suburb/vic", "box-hill-3128"),
            "https://example.com/suburb/vic/box-hill-3128"
        );
        assert_eq!(
            suburb_url("https://example.com/suburb/vic/", "kew-3101"),
            "https://example.com/suburb/vic/kew-3101"
        );
    }

    #[test]
    fn tracked_list_has_no_duplicate_slugs() {
        let slugs = tracked_suburbs();
        let unique: std::collections::HashSet<_> = slugs.iter().collect();
        assert_eq!(unique.len(), slugs.len());
    }
}
