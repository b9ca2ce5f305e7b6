//! Platform adaptation engine.
//!
//! Turns one piece of content into one [`PlatformAdaptation`] per target platform, applying
//! each platform's structural limits:
//!
//! | platform  | title cap | hashtag cap | caption                                   |
//! |-----------|-----------|-------------|-------------------------------------------|
//! | youtube   | 100       | 15          | none                                      |
//! | tiktok    | 150       | 5           | title + hashtags                          |
//! | instagram | 100       | 30          | title + trimmed description + hashtags    |
//! | twitter   | 280       | 2           | title (first 250 chars) + hashtags, <= 280 |
//! | facebook  | -         | 10          | title + description                       |
//! | other     | -         | -           | title                                     |
//!
//! A Twitter caption that would run past 280 characters sheds hashtags from the end until it
//! fits; the `hashtags` list itself still carries the first two.
//!
//! Truncation always keeps the leading characters or hashtags in their original order. Caps
//! count Unicode scalar values. The engine is pure: the same input yields the same adaptation
//! for a platform no matter which other platforms are adapted alongside it or in what order.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::model::{
    GeneratedAssets, OptimizationResults, Platform, PlatformAdaptation, UnifiedContent,
};

const TWITTER_CAPTION_TITLE_CHARS: usize = 250;
const TWITTER_CAPTION_CAP: usize = 280;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptionStyle {
    None,
    TitleHashtags,
    TitleDescriptionHashtags,
    ShortTitleHashtags(usize),
    TitleDescription,
    TitleOnly,
}

#[derive(Debug, Clone, Copy)]
struct PlatformRules {
    title_cap: Option<usize>,
    hashtag_cap: Option<usize>,
    caption: CaptionStyle,
}

fn rules(platform: &Platform) -> PlatformRules {
    match platform {
        Platform::YouTube => PlatformRules {
            title_cap: Some(100),
            hashtag_cap: Some(15),
            caption: CaptionStyle::None,
        },
        Platform::TikTok => PlatformRules {
            title_cap: Some(150),
            hashtag_cap: Some(5),
            caption: CaptionStyle::TitleHashtags,
        },
        Platform::Instagram => PlatformRules {
            title_cap: Some(100),
            hashtag_cap: Some(30),
            caption: CaptionStyle::TitleDescriptionHashtags,
        },
        Platform::Twitter => PlatformRules {
            title_cap: Some(280),
            hashtag_cap: Some(2),
            caption: CaptionStyle::ShortTitleHashtags(TWITTER_CAPTION_TITLE_CHARS),
        },
        Platform::Facebook => PlatformRules {
            title_cap: None,
            hashtag_cap: Some(10),
            caption: CaptionStyle::TitleDescription,
        },
        Platform::Other(_) => PlatformRules {
            title_cap: None,
            hashtag_cap: None,
            caption: CaptionStyle::TitleOnly,
        },
    }
}

/// The values the engine adapts: optimized where the viral optimizer produced them, raw otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptationInput {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub category: Option<String>,
    pub duration_secs: Option<u32>,
}

impl AdaptationInput {
    pub fn resolve(
        content: &UnifiedContent,
        results: &OptimizationResults,
        assets: &GeneratedAssets,
    ) -> Self {
        let (title, description, tags) = match &results.viral {
            Some(viral) => (
                Some(viral.optimized_title.clone())
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| content.title.clone()),
                viral
                    .optimized_description
                    .clone()
                    .or_else(|| content.description.clone()),
                if viral.optimized_tags.is_empty() {
                    content.tags.clone()
                } else {
                    viral.optimized_tags.clone()
                },
            ),
            None => (
                content.title.clone(),
                content.description.clone(),
                content.tags.clone(),
            ),
        };

        AdaptationInput {
            title,
            description,
            tags,
            media_url: content.media_url.clone(),
            thumbnail_url: assets.thumbnails.first().cloned(),
            category: content.category.clone(),
            duration_secs: content.duration_secs,
        }
    }
}

fn hashtag_strip() -> &'static Regex {
    static STRIP: OnceLock<Regex> = OnceLock::new();
    STRIP.get_or_init(|| Regex::new(r"[^\p{L}\p{N}_]+").expect("hashtag pattern is valid"))
}

/// Renders a tag as `#tag`, or `None` if nothing usable remains.
pub fn normalize_hashtag(tag: &str) -> Option<String> {
    let body = hashtag_strip().replace_all(tag.trim().trim_start_matches('#'), "");
    if body.is_empty() {
        None
    } else {
        Some(format!("#{body}"))
    }
}

/// First `cap` characters of `s`, or all of it when uncapped.
pub fn truncate_chars(s: &str, cap: Option<usize>) -> String {
    match cap {
        Some(cap) => s.chars().take(cap).collect(),
        None => s.to_string(),
    }
}

fn join_nonempty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(sep)
}

/// Adapts content for a single platform.
pub fn adapt_for_platform(platform: &Platform, input: &AdaptationInput) -> PlatformAdaptation {
    let rules = rules(platform);

    let title = truncate_chars(&input.title, rules.title_cap);
    let title_truncated = title.chars().count() < input.title.chars().count();

    let all_tags: Vec<String> = input
        .tags
        .iter()
        .filter_map(|t| normalize_hashtag(t))
        .collect();
    let keep = rules.hashtag_cap.unwrap_or(all_tags.len()).min(all_tags.len());
    let hashtags_dropped = all_tags.len() - keep;
    let hashtags: Vec<String> = all_tags.into_iter().take(keep).collect();

    let description = input
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    let desc = description.as_deref().unwrap_or("");
    let tag_line = hashtags.join(" ");

    let mut metadata = BTreeMap::new();
    metadata.insert("title_truncated".to_string(), Value::Bool(title_truncated));
    metadata.insert("hashtags_dropped".to_string(), Value::from(hashtags_dropped));

    let caption = match rules.caption {
        CaptionStyle::None => None,
        CaptionStyle::TitleHashtags => {
            Some(join_nonempty(&[title.as_str(), tag_line.as_str()], " "))
        }
        CaptionStyle::TitleDescriptionHashtags => {
            Some(join_nonempty(&[title.as_str(), desc, tag_line.as_str()], "\n\n"))
        }
        CaptionStyle::ShortTitleHashtags(n) => {
            let short = truncate_chars(&title, Some(n));
            metadata.insert(
                "caption_title_chars".to_string(),
                Value::from(short.chars().count()),
            );
            let mut fitting = hashtags.len();
            let caption = loop {
                let tags = hashtags[..fitting].join(" ");
                let caption = join_nonempty(&[short.as_str(), tags.as_str()], " ");
                if fitting == 0 || caption.chars().count() <= TWITTER_CAPTION_CAP {
                    break caption;
                }
                fitting -= 1;
            };
            metadata.insert(
                "caption_hashtags_dropped".to_string(),
                Value::from(hashtags.len() - fitting),
            );
            Some(caption)
        }
        CaptionStyle::TitleDescription => Some(join_nonempty(&[title.as_str(), desc], "\n\n")),
        CaptionStyle::TitleOnly => Some(title.clone()),
    };

    match platform {
        Platform::YouTube => {
            if let Some(category) = &input.category {
                metadata.insert("category".to_string(), Value::from(category.clone()));
            }
        }
        Platform::TikTok => {
            if let Some(secs) = input.duration_secs {
                metadata.insert("duration_secs".to_string(), Value::from(secs));
            }
        }
        _ => {}
    }

    PlatformAdaptation {
        platform: platform.clone(),
        title,
        description,
        caption,
        hashtags,
        media_url: input.media_url.clone(),
        thumbnail_url: input.thumbnail_url.clone(),
        metadata,
    }
}

/// One adaptation per platform, keyed by platform.
pub fn adapt_all(
    platforms: &[Platform],
    input: &AdaptationInput,
) -> BTreeMap<Platform, PlatformAdaptation> {
    platforms
        .iter()
        .map(|p| (p.clone(), adapt_for_platform(p, input)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, tags: &[&str]) -> AdaptationInput {
        AdaptationInput {
            title: title.to_string(),
            description: Some("  Learn the basics.  ".to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            media_url: Some("https://cdn.example.com/v.mp4".to_string()),
            thumbnail_url: None,
            category: Some("education".to_string()),
            duration_secs: Some(30),
        }
    }

    #[test]
    fn hashtags_are_normalised() {
        assert_eq!(normalize_hashtag("#Rust"), Some("#Rust".into()));
        assert_eq!(normalize_hashtag(" open source "), Some("#opensource".into()));
        assert_eq!(normalize_hashtag("café_au-lait!"), Some("#café_aulait".into()));
        assert_eq!(normalize_hashtag("  #!! "), None);
    }

    #[test]
    fn youtube_keeps_title_and_description_without_caption() {
        let a = adapt_for_platform(&Platform::YouTube, &input("Test Video", &["a", "b"]));
        assert_eq!(a.title, "Test Video");
        assert_eq!(a.caption, None);
        assert_eq!(a.description.as_deref(), Some("Learn the basics."));
        assert_eq!(a.hashtags, vec!["#a", "#b"]);
        assert_eq!(a.metadata.get("category"), Some(&Value::from("education")));
    }

    #[test]
    fn tiktok_caption_is_title_plus_first_five_hashtags() {
        let tags = ["one", "two", "three", "four", "five", "six", "seven"];
        let a = adapt_for_platform(&Platform::TikTok, &input("Quick tip", &tags));
        assert_eq!(a.hashtags, vec!["#one", "#two", "#three", "#four", "#five"]);
        assert_eq!(
            a.caption.as_deref(),
            Some("Quick tip #one #two #three #four #five")
        );
        assert_eq!(a.metadata.get("hashtags_dropped"), Some(&Value::from(2)));
        assert_eq!(a.metadata.get("duration_secs"), Some(&Value::from(30)));
    }

    #[test]
    fn instagram_caption_joins_title_trimmed_description_and_hashtags() {
        let a = adapt_for_platform(&Platform::Instagram, &input("Morning", &["sun", "coffee"]));
        assert_eq!(
            a.caption.as_deref(),
            Some("Morning\n\nLearn the basics.\n\n#sun #coffee")
        );
    }

    #[test]
    fn twitter_caps_title_and_caption_title_separately() {
        let long = "x".repeat(400);
        let a = adapt_for_platform(&Platform::Twitter, &input(&long, &["a", "b", "c"]));
        assert_eq!(a.title.chars().count(), 280);
        assert_eq!(a.hashtags, vec!["#a", "#b"]);
        let caption = a.caption.unwrap();
        assert_eq!(caption, format!("{} #a #b", "x".repeat(250)));
        assert_eq!(a.metadata.get("title_truncated"), Some(&Value::Bool(true)));
        assert_eq!(a.metadata.get("caption_hashtags_dropped"), Some(&Value::from(0)));
    }

    #[test]
    fn twitter_caption_sheds_hashtags_that_would_overflow() {
        let title = "z".repeat(260);
        let first = "a".repeat(20);
        let second = "b".repeat(20);
        let a = adapt_for_platform(&Platform::Twitter, &input(&title, &[&first, &second]));
        assert_eq!(a.hashtags.len(), 2);
        let caption = a.caption.unwrap();
        assert!(caption.chars().count() <= 280);
        assert_eq!(caption, format!("{} #{first}", "z".repeat(250)));
        assert_eq!(a.metadata.get("caption_hashtags_dropped"), Some(&Value::from(1)));

        let huge = "h".repeat(300);
        let a = adapt_for_platform(&Platform::Twitter, &input("Short", &[&huge]));
        assert_eq!(a.caption.as_deref(), Some("Short"));
        assert_eq!(a.metadata.get("caption_hashtags_dropped"), Some(&Value::from(1)));
    }

    #[test]
    fn blank_optimized_title_falls_back_to_the_original() {
        use crate::model::{
            ContentStatus, OptimizationFlags, OptimizationResults, PublishStrategy, ViralAnalysis,
        };

        let content = UnifiedContent {
            id: "c1".into(),
            owner_id: "o1".into(),
            title: "Original".into(),
            description: None,
            media_url: None,
            media_kind: None,
            duration_secs: None,
            tags: vec!["kept".into()],
            category: None,
            niche: None,
            target_platforms: vec![Platform::YouTube],
            publish_strategy: PublishStrategy::Draft,
            scheduled_for: None,
            timezone: None,
            optimization: OptimizationFlags::default(),
            status: ContentStatus::Optimizing,
            orchestration_run_id: "r1".into(),
            created_at: chrono::Utc::now(),
        };
        let mut viral = ViralAnalysis {
            analysis_id: "v1".into(),
            score: 40.0,
            hooks: vec![],
            optimized_title: "   ".into(),
            optimized_description: None,
            optimized_tags: vec![],
            recommendations: vec![],
        };
        let results = OptimizationResults {
            viral: Some(viral.clone()),
            thumbnail: None,
            ad: None,
        };
        let resolved = AdaptationInput::resolve(&content, &results, &GeneratedAssets::default());
        assert_eq!(resolved.title, "Original");
        assert_eq!(resolved.tags, vec!["kept".to_string()]);

        viral.optimized_title = "Sharper".into();
        let results = OptimizationResults {
            viral: Some(viral),
            thumbnail: None,
            ad: None,
        };
        let resolved = AdaptationInput::resolve(&content, &results, &GeneratedAssets::default());
        assert_eq!(resolved.title, "Sharper");
    }

    #[test]
    fn facebook_is_title_plus_description_with_ten_hashtags() {
        let tags: Vec<String> = (0..12).map(|i| format!("t{i}")).collect();
        let refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let long = "y".repeat(500);
        let a = adapt_for_platform(&Platform::Facebook, &input(&long, &refs));
        assert_eq!(a.title.len(), 500);
        assert_eq!(a.hashtags.len(), 10);
        assert_eq!(a.hashtags.last().map(String::as_str), Some("#t9"));
        assert_eq!(a.caption, Some(format!("{long}\n\nLearn the basics.")));
    }

    #[test]
    fn unknown_platform_passes_through() {
        let tags: Vec<String> = (0..50).map(|i| format!("t{i}")).collect();
        let refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let a = adapt_for_platform(&Platform::from("mastodon"), &input("Hello", &refs));
        assert_eq!(a.caption.as_deref(), Some("Hello"));
        assert_eq!(a.hashtags.len(), 50);
    }

    #[test]
    fn adapt_all_is_order_independent() {
        let i = input("Same content", &["a", "b", "c"]);
        let forward = adapt_all(
            &[Platform::YouTube, Platform::TikTok, Platform::Twitter],
            &i,
        );
        let backward = adapt_all(
            &[Platform::Twitter, Platform::TikTok, Platform::YouTube],
            &i,
        );
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 3);
    }
}
